//! Core pipeline orchestration and domain logic for cs2stat.
//!
//! This crate ties together the identity source, the extraction oracle, and
//! storage into end-to-end runs (e.g., [`harvest`]). Each stage fans out over
//! a [`WorkerPool`]; assembly and aggregation are pure functions.

pub mod aggregation;
pub mod assembly;
pub mod discovery;
pub mod extraction;
pub mod pipeline;
pub mod players;
pub mod pool;
pub mod report;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregation::{aggregate_match, aggregate_matches};
pub use assembly::{assemble_match, assemble_matches};
pub use discovery::{dedup_locators, discover_matches};
pub use extraction::{TIE_PHRASE, extract_tables, is_tie};
pub use pipeline::{
    Collaborators, PipelineOutput, ProgressReporter, SilentProgress, harvest, run_pipeline,
};
pub use players::fetch_identities;
pub use pool::{JobOutcome, PoolOutput, WorkerPool};
pub use report::{RunSummary, Skip, StageReport};
