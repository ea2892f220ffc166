//! Selector-based readers for profile and match pages.

use scraper::{Html, Selector};
use url::Url;

use cs2stat_shared::{Cs2StatError, MatchPage, Result};

/// Match detail links on a profile page.
const MATCH_LINK_SELECTOR: &str = r#"a[href^="/app/match-details/"]"#;

/// Result banner on a match page.
const RESULT_PHRASE_SELECTOR: &str = "div.phrase";

/// Scoreboard rows on a match page.
const ROW_SELECTOR: &str = "table tbody tr";

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Both page kinds render their data in a table; no table means the page
/// did not load what we expect.
fn require_table(doc: &Html) -> Result<()> {
    if doc.select(&selector("table")).next().is_none() {
        return Err(Cs2StatError::parse("page has no table"));
    }
    Ok(())
}

/// Extract up to `limit` absolute match links from a profile page, in page order.
pub fn parse_match_links(html: &str, base: &Url, limit: usize) -> Result<Vec<String>> {
    let doc = Html::parse_document(html);
    require_table(&doc)?;

    let links = doc
        .select(&selector(MATCH_LINK_SELECTOR))
        .filter_map(|el| el.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_fragment(None);
            url.to_string()
        })
        .take(limit)
        .collect();

    Ok(links)
}

/// Extract the result phrase and every scoreboard row from a match page.
///
/// Rows are returned as-is, including rows with no cells.
pub fn parse_match_page(html: &str) -> Result<MatchPage> {
    let doc = Html::parse_document(html);
    require_table(&doc)?;

    let result_phrase = doc
        .select(&selector(RESULT_PHRASE_SELECTOR))
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .ok_or_else(|| Cs2StatError::parse("match page has no result phrase"))?;

    let cell_sel = selector("td");
    let rows = doc
        .select(&selector(ROW_SELECTOR))
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect()
        })
        .collect();

    Ok(MatchPage {
        result_phrase,
        rows,
    })
}
