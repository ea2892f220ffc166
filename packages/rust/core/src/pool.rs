//! Bounded fan-out/fan-in worker pool.
//!
//! A fixed number of workers drain a closed job queue and publish one event
//! per job onto a result queue. The result queue is closed only after every
//! worker has been joined, so the collector sees every result and detects
//! completion by closure rather than by counting.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, error, warn};

use cs2stat_shared::{Cs2StatError, Result, RunContext, SkipReason};

/// What a job handler produced for one job.
#[derive(Debug)]
pub enum JobOutcome<R> {
    /// Zero or more results.
    Done(Vec<R>),
    /// The job was dropped; the pool keeps going.
    Skipped(SkipReason),
}

impl<R> JobOutcome<R> {
    pub fn one(result: R) -> Self {
        Self::Done(vec![result])
    }
}

/// Everything a pool run produced.
#[derive(Debug)]
pub struct PoolOutput<J, R> {
    /// Results from every job, in completion order.
    pub results: Vec<R>,
    /// Jobs a worker picked up and handed to the handler.
    pub attempted: usize,
    /// Jobs whose handler returned [`JobOutcome::Done`].
    pub completed: usize,
    /// Dropped jobs and why; includes jobs never started after cancellation.
    pub skipped: Vec<(J, SkipReason)>,
}

/// One message from a worker to the collector.
enum Event<J, R> {
    Done(Vec<R>),
    Skipped(J, SkipReason),
    Failed(J, Cs2StatError),
}

/// A pool of `workers` concurrent tasks for one pipeline stage.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    workers: usize,
}

impl WorkerPool {
    /// `workers` is clamped to at least one.
    pub fn new(name: &'static str, workers: usize) -> Self {
        Self {
            name,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `handler` over every job with bounded concurrency.
    ///
    /// Handler errors (`Err`) are hard failures: the run context is cancelled,
    /// remaining jobs are not started, and the first such error is returned
    /// once every worker has stopped. Skips never fail the run.
    pub async fn run<J, R, H, Fut>(
        &self,
        ctx: &RunContext,
        jobs: Vec<J>,
        handler: H,
    ) -> Result<PoolOutput<J, R>>
    where
        J: Clone + Debug + Send + 'static,
        R: Send + 'static,
        H: Fn(J, RunContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobOutcome<R>>> + Send + 'static,
    {
        let total = jobs.len();
        let mut output = PoolOutput {
            results: Vec::new(),
            attempted: 0,
            completed: 0,
            skipped: Vec::new(),
        };
        if total == 0 {
            return Ok(output);
        }

        // Both queues hold the whole input, so producers never wait on a full queue.
        let (job_tx, job_rx) = mpsc::channel::<J>(total);
        let (event_tx, mut event_rx) = mpsc::channel::<Event<J, R>>(total);

        for job in jobs {
            job_tx
                .try_send(job)
                .map_err(|e| Cs2StatError::validation(format!("job queue rejected job: {e}")))?;
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let handler = Arc::new(handler);
        let attempted = Arc::new(AtomicUsize::new(0));

        debug!(pool = self.name, workers = self.workers, jobs = total, "starting workers");

        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let job_rx = Arc::clone(&job_rx);
            let event_tx = event_tx.clone();
            let handler = Arc::clone(&handler);
            let attempted = Arc::clone(&attempted);
            let ctx = ctx.clone();
            let pool = self.name;

            handles.push(tokio::spawn(async move {
                loop {
                    let next = job_rx.lock().await.recv().await;
                    let Some(job) = next else { break };

                    let event = if let Err(e) = ctx.check() {
                        Event::Skipped(job, SkipReason::from_error(&e))
                    } else {
                        attempted.fetch_add(1, Ordering::SeqCst);
                        match handler(job.clone(), ctx.clone()).await {
                            Ok(JobOutcome::Done(results)) => Event::Done(results),
                            Ok(JobOutcome::Skipped(reason)) => Event::Skipped(job, reason),
                            Err(e) => {
                                ctx.cancel();
                                Event::Failed(job, e)
                            }
                        }
                    };

                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
                debug!(pool, worker_id, "worker finished");
            }));
        }

        // Barrier: the last sender is dropped only after every worker has exited.
        let pool = self.name;
        tokio::spawn(async move {
            for handle in handles {
                if let Err(e) = handle.await {
                    error!(pool, error = %e, "worker task failed");
                }
            }
            drop(event_tx);
        });

        let mut first_error = None;
        while let Some(event) = event_rx.recv().await {
            match event {
                Event::Done(results) => {
                    output.completed += 1;
                    output.results.extend(results);
                }
                Event::Skipped(job, reason) => {
                    warn!(pool = self.name, ?job, %reason, "job skipped");
                    output.skipped.push((job, reason));
                }
                Event::Failed(job, e) => {
                    error!(pool = self.name, ?job, error = %e, "job failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        output.attempted = attempted.load(Ordering::SeqCst);

        match first_error {
            Some(e) => Err(e),
            None => Ok(output),
        }
    }
}
