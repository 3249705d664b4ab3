//! Per-platform solved-count extractors.
//!
//! Every extractor is total: network errors, unexpected statuses and missing
//! markup are logged under the platform's target and come back as an unknown
//! [`Measurement`]. [`extract`] collapses that into the zero sentinel.

pub mod codechef;
pub mod github;
pub mod hackerrank;
pub mod leetcode;
pub mod skillrack;

use crate::{
    platform::{Measurement, Platform},
    scrape::Scraper,
};

/// Base URLs of every external source, without trailing slash.
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub leetcode: String,
    pub codechef: String,
    pub hackerrank: String,
    pub github_api: String,
    pub skillrack_mirror: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            leetcode: "https://leetcode.com".to_owned(),
            codechef: "https://www.codechef.com".to_owned(),
            hackerrank: "https://www.hackerrank.com".to_owned(),
            github_api: "https://api.github.com".to_owned(),
            skillrack_mirror: "https://skillrack.gururaja.in".to_owned(),
        }
    }
}

/// Measures one platform. `last_known` only matters for SkillRack, whose
/// result never drops below it.
pub async fn probe(
    scraper: &Scraper,
    platform: Platform,
    reference: &str,
    last_known: Option<u32>,
) -> Measurement {
    match platform {
        Platform::LeetCode => leetcode::probe(scraper, reference).await,
        Platform::SkillRack => skillrack::resilient(scraper, reference, last_known).await,
        Platform::CodeChef => codechef::probe(scraper, reference).await,
        Platform::HackerRank => hackerrank::probe(scraper, reference).await,
        Platform::GitHub => github::probe(scraper, reference).await,
    }
}

/// Solved count for one platform, `0` when it could not be measured.
pub async fn extract(scraper: &Scraper, platform: Platform, reference: &str) -> u32 {
    probe(scraper, platform, reference, None).await.unwrap_or(0)
}
