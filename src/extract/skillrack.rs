//! SkillRack, whose profile pages move and change shape often enough that no
//! single source can be trusted. Counts are resolved through [`crate::policy`].

use std::sync::LazyLock;

use compact_str::CompactString;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

use crate::{
    normalize::{is_url_shaped, last_segment, normalize},
    platform::Measurement,
    policy::{Resolution, Tier, resolve, settle},
    scrape::{Scraper, capture_number, element_text, first_number, page_text},
};

const TARGET: &str = "skillrack";

static USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:skillrack\.com|skillrack\.gururaja\.in)/(?:profile/)?([^/?#]+)").unwrap()
});
static SEL_STATISTIC: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.ui.six.small.statistics > div.statistic").unwrap());
static SEL_LABEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.label").unwrap());
static SEL_VALUE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.value").unwrap());
static SEL_BOLD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("strong, b").unwrap());
static OFFICIAL_FREE_TEXT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:Programs\s*Solved|Total\s*Solved)\D+(\d+)").unwrap());
static MIRROR_TOTAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Total\s*Solved\D+(\d+)").unwrap());
static SOLVED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)solved").unwrap());
static BOUNDED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{1,5}\b").unwrap());

/// Sources in trust order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// The profile page itself.
    Official,
    /// JSON mirror API fed with the cleaned profile URL.
    MirrorApi,
    /// Per-user page on the mirror site.
    MirrorPage,
}

impl Source {
    pub const TIERS: [Tier<Self>; 3] = [
        Tier { source: Self::Official, rank: 0 },
        Tier { source: Self::MirrorApi, rank: 1 },
        Tier { source: Self::MirrorPage, rank: 2 },
    ];
}

/// Segment after a SkillRack host, with or without scheme; otherwise the last
/// path segment of a URL, or the value itself.
pub fn username(reference: &str) -> Option<CompactString> {
    let clean = normalize(reference);
    if clean.is_empty() {
        return None;
    }
    let user = if let Some(m) = USER.captures(clean).and_then(|c| c.get(1)) {
        m.as_str()
    } else if is_url_shaped(clean) {
        last_segment(clean)?
    } else {
        clean
    };
    if user.contains(char::is_whitespace) {
        return None;
    }
    Some(CompactString::new(user))
}

/// The profile URL, when the reference is one with a host. A scheme-less
/// SkillRack address is taken as https.
fn profile_url(reference: &str) -> Option<Url> {
    let clean = normalize(reference);
    let url = if is_url_shaped(clean) {
        Url::parse(clean)
    } else if USER.is_match(clean) && !clean.contains(char::is_whitespace) {
        Url::parse(&format!("https://{clean}"))
    } else {
        return None;
    };
    url.ok().filter(|u| u.host().is_some())
}

/// Statistics block first, then a free-text search of the whole page.
pub fn parse_official(html: &str) -> Option<u32> {
    let doc = Html::parse_document(html);

    let structured = doc.select(&SEL_STATISTIC).find_map(|stat| {
        let label = element_text(stat.select(&SEL_LABEL).next()?);
        if !label.to_uppercase().contains("PROGRAMS SOLVED") {
            return None;
        }
        first_number(&element_text(stat.select(&SEL_VALUE).next()?))
    });

    structured.or_else(|| capture_number(&OFFICIAL_FREE_TEXT, &page_text(&doc)))
}

/// Labelled total, then a bold "solved" label's block, then the largest
/// bounded integer on the page.
///
/// The last step may pick up an unrelated number; it only runs when the page
/// has no recognisable structure at all.
pub fn parse_mirror(html: &str) -> Option<u32> {
    let doc = Html::parse_document(html);
    let text = page_text(&doc);

    if let Some(n) = capture_number(&MIRROR_TOTAL, &text) {
        return Some(n);
    }

    let labelled = doc
        .select(&SEL_BOLD)
        .filter(|b| SOLVED.is_match(&element_text(*b)))
        .find_map(|b| {
            let parent = b.parent().and_then(ElementRef::wrap)?;
            first_number(&element_text(parent))
        });
    if labelled.is_some() {
        return labelled;
    }

    BOUNDED
        .find_iter(&text)
        .filter_map(|m| m.as_str().parse::<u32>().ok())
        .max()
}

/// `solved` at the top level or under `result`, as a number or numeric string.
pub fn parse_api(body: &Value) -> Option<u32> {
    let solved = body
        .get("solved")
        .or_else(|| body.get("result")?.get("solved"))?;
    match solved {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

async fn official(scraper: &Scraper, url: Url) -> anyhow::Result<u32> {
    let html = scraper.get_text(url).await?;
    parse_official(&html).ok_or_else(|| anyhow::anyhow!("no programs-solved figure"))
}

async fn mirror_api(scraper: &Scraper, api: &str, profile: &str) -> anyhow::Result<u32> {
    let body = scraper
        .client
        .get(api)
        .query(&[("url", profile)])
        .send()
        .await?
        .error_for_status()?
        .json::<Value>()
        .await?;
    parse_api(&body).ok_or_else(|| anyhow::anyhow!("no solved field in {body}"))
}

async fn mirror_page(scraper: &Scraper, user: &str) -> anyhow::Result<u32> {
    let url = format!("{}/{user}", scraper.endpoints.skillrack_mirror);
    let html = scraper.get_ok_text(url).await?;
    parse_mirror(&html).ok_or_else(|| anyhow::anyhow!("no number on mirror page"))
}

fn logged(result: anyhow::Result<u32>, source: Source, reference: &str) -> Measurement {
    match result {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(target: TARGET, "{source:?} ({reference:?}) err: {e}");
            None
        }
    }
}

async fn attempt(scraper: &Scraper, reference: &str, user: &str, source: Source) -> Measurement {
    match source {
        Source::Official => {
            let url = profile_url(reference)?;
            logged(official(scraper, url).await, source, reference)
        }
        Source::MirrorApi => {
            let api = scraper.config.skillrack_api.as_deref()?;
            let url = profile_url(reference)?;
            logged(mirror_api(scraper, api, url.as_str()).await, source, reference)
        }
        Source::MirrorPage => {
            logged(mirror_page(scraper, user).await, source, reference)
        }
    }
}

/// Full resolution, with the per-source trail.
pub async fn resolve_with_trail(
    scraper: &Scraper,
    reference: &str,
    last_known: Option<u32>,
) -> Resolution<Source> {
    let Some(user) = username(reference) else {
        tracing::debug!(target: TARGET, "no username in {reference:?}");
        return Resolution {
            value: settle([], last_known),
            attempts: Vec::new(),
        };
    };
    let user = user.as_str();

    resolve(Source::TIERS.to_vec(), last_known, |source| {
        attempt(scraper, reference, user, source)
    })
    .await
}

/// Most trustworthy count, never below `last_known`.
pub async fn resilient(scraper: &Scraper, reference: &str, last_known: Option<u32>) -> Measurement {
    let r = resolve_with_trail(scraper, reference, last_known).await;
    tracing::debug!(target: TARGET, "{reference:?}: {:?} (last known {last_known:?}) -> {:?}", r.attempts, r.value);
    r.value
}
