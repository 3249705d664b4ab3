//! Motivational line generation.

use core::fmt::Write;

use reqwest::Client as Request;
use serde::{Deserialize, Serialize};

use crate::platform::PlatformCounts;

const TARGET: &str = "coach";

pub trait Generator {
    /// `false` when nothing is configured and callers should not even try.
    fn is_configured(&self) -> bool {
        true
    }

    fn generate(&self, prompt: &str) -> impl Future<Output = anyhow::Result<String>> + Send;
}

impl<G: Generator + Sync> Generator for Option<G> {
    fn is_configured(&self) -> bool {
        self.as_ref().is_some_and(Generator::is_configured)
    }

    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        match self {
            Some(g) => g.generate(prompt).await,
            None => anyhow::bail!("no generator configured"),
        }
    }
}

pub fn prompt(name: &str, deltas: &PlatformCounts) -> String {
    let mut s = format!(
        "Generate a short, personalized motivational message (<=50 words) for {name}, who solved {} problems today.\n",
        deltas.sum()
    );
    let breakdown = deltas
        .iter()
        .map(|(p, n)| format!("{p}:+{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(s, "{breakdown}.");
    s.push_str("Be specific, encouraging, and authentic with emojis. If 0, nudge gently.");
    s
}

#[derive(Clone, Debug)]
pub struct CoachConfig {
    pub api_key: String,
    pub model: String,
    pub endpoint: String,
}

impl CoachConfig {
    pub const DEFAULT_MODEL: &'static str = "gemini-2.0-flash-exp";
    pub const DEFAULT_ENDPOINT: &'static str = "https://generativelanguage.googleapis.com";
}

/// Gemini `generateContent` over REST.
pub struct Gemini {
    client: Request,
    config: CoachConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Text of the first candidate, trimmed.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect::<String>())
            .unwrap_or_default()
            .trim()
            .to_owned()
    }
}

impl Gemini {
    /// `client` should carry the per-request timeout.
    pub const fn new(client: Request, config: CoachConfig) -> Self {
        Self { client, config }
    }
}

impl Generator for Gemini {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let CoachConfig { api_key, model, endpoint } = &self.config;
        let url = format!("{endpoint}/v1beta/models/{model}:generateContent");
        let body = GenerateRequest {
            contents: [Content { parts: [Part { text: prompt }] }],
        };
        let resp = self
            .client
            .post(url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateResponse>()
            .await?;
        Ok(resp.text())
    }
}

/// Asks `generator` for a line; `None` on absence, error or empty text.
pub async fn generated_line<G: Generator>(generator: &G, name: &str, deltas: &PlatformCounts) -> Option<String> {
    if !generator.is_configured() {
        return None;
    }
    match generator.generate(&prompt(name, deltas)).await {
        Ok(text) if !text.trim().is_empty() => Some(text.trim().to_owned()),
        Ok(_) => {
            tracing::warn!(target: TARGET, "empty response for {name}");
            None
        }
        Err(e) => {
            tracing::warn!(target: TARGET, "generation for {name} failed: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Platform;

    #[test]
    fn prompt_lists_every_platform() {
        let p = prompt("Asha", &PlatformCounts([3, 1, 0, 2, 1]));
        assert!(p.contains("Asha, who solved 7 problems today"));
        for platform in Platform::ALL {
            assert!(p.contains(&format!("{platform}:+")));
        }
    }

    #[test]
    fn response_text() {
        let resp: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"  Keep going! "},{"text":"🚀\n"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(resp.text(), "Keep going! 🚀");
        assert_eq!(GenerateResponse::default().text(), "");
    }

    #[tokio::test]
    async fn absent_generator_is_not_called() {
        let none: Option<Gemini> = None;
        assert!(!none.is_configured());
        assert_eq!(generated_line(&none, "Asha", &PlatformCounts::ZERO).await, None);
    }
}
