use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

use crate::{
    normalize::handle,
    platform::{Measurement, Platform},
    scrape::{Scraper, capture_number, element_text},
};

const TARGET: &str = "codechef";

static SEL_SECTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("section.rating-data-section.problems-solved").unwrap());
static SEL_H3: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h3").unwrap());
static TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Total\s+Problems\s+Solved:\s*(\d+)").unwrap());
static PARENTHESIZED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\((\d+)\)").unwrap());

/// Reads the "problems solved" section of a profile page.
///
/// The count is rendered twice depending on page revision: as a labelled
/// heading, or as a parenthesized number in the section body.
pub fn parse_solved(html: &str) -> Option<u32> {
    let doc = Html::parse_document(html);
    let section = doc.select(&SEL_SECTION).next()?;

    section
        .select(&SEL_H3)
        .find_map(|h3| capture_number(&TOTAL, &element_text(h3)))
        .or_else(|| capture_number(&PARENTHESIZED, &section.text().collect::<String>()))
}

async fn fetch(scraper: &Scraper, user: &str) -> anyhow::Result<u32> {
    let url = format!("{}/users/{user}", scraper.endpoints.codechef);
    let html = scraper.get_text(url).await?;
    parse_solved(&html).ok_or_else(|| anyhow::anyhow!("problems-solved section not found"))
}

pub async fn probe(scraper: &Scraper, reference: &str) -> Measurement {
    let Some(user) = handle(reference, Platform::CodeChef.domain()) else {
        tracing::debug!(target: TARGET, "no username in {reference:?}");
        return None;
    };

    match fetch(scraper, &user).await {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(target: TARGET, "{user} ({reference:?}) err: {e}");
            None
        }
    }
}
