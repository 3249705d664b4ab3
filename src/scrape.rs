use core::time::Duration;
use std::sync::LazyLock;

use rand::{Rng, seq::IndexedRandom};
use regex::Regex;
use reqwest::{Client as Request, IntoUrl, StatusCode};
use scraper::{ElementRef, Html};

use crate::extract::Endpoints;

pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

#[derive(Clone, Debug)]
pub struct ScrapeConfig {
    /// Whole-request timeout for every outbound call.
    pub timeout: Duration,
    /// Bounds of the randomized pause between two consecutive calls.
    pub pause_min: Duration,
    pub pause_max: Duration,
    pub github_token: Option<String>,
    /// Optional SkillRack mirror API, queried with `?url=<profile>`.
    pub skillrack_api: Option<String>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout: const { Duration::from_secs(12) },
            pause_min: const { Duration::from_millis(1000) },
            pause_max: const { Duration::from_millis(2000) },
            github_token: None,
            skillrack_api: None,
        }
    }
}

pub fn basic(timeout: Duration) -> reqwest::Result<Request> {
    let user_agent = *USER_AGENTS.choose(&mut rand::rng()).unwrap_or(&USER_AGENTS[0]);
    Request::builder()
        .connect_timeout(timeout.min(const { Duration::from_secs(8) }))
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

/// Everything an extractor needs: the client, where to go and how politely.
pub struct Scraper {
    pub client: Request,
    pub endpoints: Endpoints,
    pub config: ScrapeConfig,
}

impl Scraper {
    pub fn new(config: ScrapeConfig, endpoints: Endpoints) -> reqwest::Result<Self> {
        Ok(Self {
            client: basic(config.timeout)?,
            endpoints,
            config,
        })
    }

    /// Sleeps for a uniformly random duration within the configured bounds.
    pub async fn pause(&self) {
        let (lo, hi) = (self.config.pause_min, self.config.pause_max);
        if hi.is_zero() {
            return;
        }
        let ms = if lo < hi {
            rand::rng().random_range(lo.as_millis() as u64..=hi.as_millis() as u64)
        } else {
            hi.as_millis() as u64
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// GET returning the body, any non-success status being an error.
    pub async fn get_text<U: IntoUrl>(&self, url: U) -> reqwest::Result<String> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }

    /// GET returning the body only on `200 OK`.
    pub async fn get_ok_text<U: IntoUrl>(&self, url: U) -> anyhow::Result<String> {
        let resp = self.client.get(url).send().await?;
        match resp.status() {
            StatusCode::OK => Ok(resp.text().await?),
            status => anyhow::bail!("status {status}"),
        }
    }
}

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Text of an element with every text node trimmed and joined by one space.
pub fn element_text(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[inline]
pub fn page_text(html: &Html) -> String {
    element_text(html.root_element())
}

/// First run of digits in `s`.
pub fn first_number(s: &str) -> Option<u32> {
    NUMBER.find(s)?.as_str().parse().ok()
}

/// First capture group of `re` in `s`, as a count.
pub fn capture_number(re: &Regex, s: &str) -> Option<u32> {
    re.captures(s)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_trimmed_and_spaced() {
        let html = Html::parse_document("<div><p> Total </p><b>Solved:</b>\n  <span>42</span></div>");
        assert_eq!(page_text(&html), "Total Solved: 42");
    }

    #[test]
    fn numbers() {
        assert_eq!(first_number("abc 0012 and 7"), Some(12));
        assert_eq!(first_number("none"), None);
        let re = Regex::new(r"x=(\d+)").unwrap();
        assert_eq!(capture_number(&re, "y=1 x=99"), Some(99));
    }

    #[tokio::test]
    async fn zero_pause_returns_immediately() {
        let config = ScrapeConfig {
            pause_min: Duration::ZERO,
            pause_max: Duration::ZERO,
            ..ScrapeConfig::default()
        };
        let scraper = Scraper::new(config, Endpoints::default()).unwrap();
        tokio::time::timeout(Duration::from_millis(50), scraper.pause())
            .await
            .unwrap();
    }
}
