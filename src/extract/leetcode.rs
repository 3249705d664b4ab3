use std::sync::LazyLock;

use compact_str::CompactString;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    normalize::{is_url_shaped, normalize},
    platform::{Measurement, Platform},
    scrape::{Scraper, capture_number},
};

const TARGET: &str = "leetcode";

const QUERY: &str = "query userStats($username: String!) { matchedUser(username: $username) { submitStats { acSubmissionNum { difficulty count } } } }";

static USER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/u/([^/?#]+)").unwrap());
static TOTAL_SOLVED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""totalSolved":\s*(\d+)"#).unwrap());

#[derive(Serialize)]
struct Payload<'a> {
    query: &'static str,
    variables: Variables<'a>,
}

#[derive(Serialize)]
struct Variables<'a> {
    username: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct Response {
    data: Option<Data>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    matched_user: Option<MatchedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUser {
    submit_stats: SubmitStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    ac_submission_num: Vec<AcCount>,
}

#[derive(Debug, Deserialize)]
struct AcCount {
    difficulty: CompactString,
    count: u32,
}

/// `…/u/<name>/` for profile addresses (with or without scheme), the value
/// itself otherwise.
pub fn username(reference: &str) -> Option<CompactString> {
    let clean = normalize(reference);
    if clean.is_empty() {
        return None;
    }
    let user = if is_url_shaped(clean) || clean.to_ascii_lowercase().contains(Platform::LeetCode.domain()) {
        USER.captures(clean)?.get(1)?.as_str()
    } else {
        clean
    };
    if user.contains(char::is_whitespace) {
        return None;
    }
    Some(CompactString::new(user))
}

/// The "All" row of the accepted-submission breakdown.
pub fn all_difficulties(resp: &Response) -> Option<u32> {
    resp.data
        .as_ref()?
        .matched_user
        .as_ref()?
        .submit_stats
        .ac_submission_num
        .iter()
        .find(|row| row.difficulty.eq_ignore_ascii_case("all"))
        .map(|row| row.count)
}

pub fn parse_profile(html: &str) -> Option<u32> {
    capture_number(&TOTAL_SOLVED, html)
}

async fn query(scraper: &Scraper, user: &str) -> reqwest::Result<Option<u32>> {
    let url = format!("{}/graphql", scraper.endpoints.leetcode);
    let payload = Payload {
        query: QUERY,
        variables: Variables { username: user },
    };
    let resp = scraper
        .client
        .post(url)
        .json(&payload)
        .send()
        .await?
        .error_for_status()?
        .json::<Response>()
        .await?;
    Ok(all_difficulties(&resp))
}

async fn profile(scraper: &Scraper, user: &str) -> anyhow::Result<u32> {
    let url = format!("{}/u/{user}/", scraper.endpoints.leetcode);
    let html = scraper.get_text(url).await?;
    parse_profile(&html).ok_or_else(|| anyhow::anyhow!("no totalSolved field"))
}

pub async fn probe(scraper: &Scraper, reference: &str) -> Measurement {
    let Some(user) = username(reference) else {
        tracing::debug!(target: TARGET, "no username in {reference:?}");
        return None;
    };

    match query(scraper, &user).await {
        Ok(Some(n)) => return Some(n),
        Ok(None) => tracing::debug!(target: TARGET, "{user}: no \"All\" row, trying profile page"),
        Err(e) => tracing::warn!(target: TARGET, "{user} ({reference:?}) graphql err: {e}"),
    }

    match profile(scraper, &user).await {
        Ok(n) => Some(n),
        Err(e) => {
            tracing::warn!(target: TARGET, "{user} ({reference:?}) profile err: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_from_url_or_handle() {
        assert_eq!(username("https://leetcode.com/u/Gfz6n0WdOg/").as_deref(), Some("Gfz6n0WdOg"));
        assert_eq!(username("Gfz6n0WdOg").as_deref(), Some("Gfz6n0WdOg"));
        assert_eq!(username("https://leetcode.com/problemset/"), None);
        assert_eq!(username(""), None);
    }

    #[test]
    fn scheme_less_and_spaced_references() {
        assert_eq!(username("leetcode.com/u/alice").as_deref(), Some("alice"));
        assert_eq!(username("www.LeetCode.com/u/alice/").as_deref(), Some("alice"));
        assert_eq!(username("leetcode.com/problemset/"), None);
        assert_eq!(username("not a handle"), None);
    }

    #[test]
    fn picks_all_row() {
        let resp: Response = serde_json::from_str(
            r#"{"data":{"matchedUser":{"submitStats":{"acSubmissionNum":[
                {"difficulty":"All","count":212},
                {"difficulty":"Easy","count":120},
                {"difficulty":"Medium","count":80}]}}}}"#,
        )
        .unwrap();
        assert_eq!(all_difficulties(&resp), Some(212));

        let missing: Response = serde_json::from_str(r#"{"data":{"matchedUser":null}}"#).unwrap();
        assert_eq!(all_difficulties(&missing), None);
    }

    #[test]
    fn profile_fallback_pattern() {
        assert_eq!(parse_profile(r#"{"props":{"totalSolved": 57,"x":1}}"#), Some(57));
        assert_eq!(parse_profile("<html></html>"), None);
    }
}
