use reqwest::{StatusCode, header::ACCEPT};
use serde::de::IgnoredAny;

use crate::{
    normalize::handle,
    platform::{Measurement, Platform},
    scrape::Scraper,
};

const TARGET: &str = "github";

/// Repositories on the first listing page; no pagination.
async fn fetch(scraper: &Scraper, user: &str) -> anyhow::Result<u32> {
    let url = format!("{}/users/{user}/repos", scraper.endpoints.github_api);
    let mut request = scraper
        .client
        .get(url)
        .header(ACCEPT, "application/vnd.github+json");
    if let Some(token) = &scraper.config.github_token {
        request = request.bearer_auth(token);
    }

    let resp = request.send().await?;
    if resp.status() != StatusCode::OK {
        anyhow::bail!("status {}", resp.status());
    }
    let repos = resp.json::<Vec<IgnoredAny>>().await?;
    Ok(repos.len() as u32)
}

pub async fn probe(scraper: &Scraper, reference: &str) -> Measurement {
    let Some(user) = handle(reference, Platform::GitHub.domain()) else {
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
