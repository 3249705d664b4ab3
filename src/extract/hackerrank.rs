use serde::Deserialize;

use crate::{
    normalize::handle,
    platform::{Measurement, Platform},
    scrape::Scraper,
};

const TARGET: &str = "hackerrank";

#[derive(Debug, Default, Deserialize)]
pub struct Badges {
    #[serde(default)]
    models: Vec<Badge>,
}

#[derive(Debug, Deserialize)]
struct Badge {
    #[serde(default)]
    solved: Option<u32>,
}

/// Sum of `solved` over every problem-solving badge.
///
/// A participant holds one badge per track, each crediting part of the total,
/// so the parts are summed rather than maxed.
pub fn total_solved(badges: &Badges) -> u32 {
    badges.models.iter().filter_map(|b| b.solved).sum()
}

async fn fetch(scraper: &Scraper, user: &str) -> reqwest::Result<u32> {
    let url = format!("{}/rest/hackers/{user}/badges", scraper.endpoints.hackerrank);
    let badges = scraper
        .client
        .get(url)
        .query(&[("limit", "1000"), ("filter", "categories:problem_solving")])
        .send()
        .await?
        .error_for_status()?
        .json::<Badges>()
        .await?;
    Ok(total_solved(&badges))
}

pub async fn probe(scraper: &Scraper, reference: &str) -> Measurement {
    let Some(user) = handle(reference, Platform::HackerRank.domain()) else {
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
