use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    coach::{Generator, generated_line},
    platform::PlatformCounts,
};

/// Achievement tier of a day's total, highest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Achievement {
    Legend,
    OnFire,
    Strong,
    Progress,
    Rest,
}

impl Achievement {
    /// Inclusive lower bounds, evaluated top-down; the first match wins.
    const THRESHOLDS: [(u32, Self); 4] = [
        (15, Self::Legend),
        (10, Self::OnFire),
        (5, Self::Strong),
        (1, Self::Progress),
    ];

    pub fn for_total(total_today: u32) -> Self {
        Self::THRESHOLDS
            .into_iter()
            .find(|&(min, _)| total_today >= min)
            .map_or(Self::Rest, |(_, tier)| tier)
    }

    pub const fn badge(self) -> &'static str {
        match self {
            Self::Legend => "🏆 CODING LEGEND",
            Self::OnFire => "🔥 ON FIRE",
            Self::Strong => "⭐ STRONG PERFORMER",
            Self::Progress => "✅ MAKING PROGRESS",
            Self::Rest => "💤 REST DAY",
        }
    }

    /// Deterministic coach line, worded for this tier.
    pub fn fallback_line(self, name: &str, total: u32) -> String {
        match self {
            Self::Legend => format!("🏆 {name}, legendary grind today with {total}! Keep leading the pack! 🚀"),
            Self::OnFire => format!("🔥 {name}, awesome streak at {total}! Your momentum is elite! 💪"),
            Self::Strong => format!("⭐ Great job, {name}! {total} solved, consistency wins. Keep pushing! 💻"),
            Self::Progress => format!("✨ Nice steps today, {name}! {total} done, tomorrow go one more. 🚀"),
            Self::Rest => format!("💡 Fresh start awaits, {name}. One problem tomorrow: small steps, big gains! 🌟"),
        }
    }
}

/// Everything the mail sink renders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportPayload {
    pub name: String,
    pub date: NaiveDate,
    pub totals: PlatformCounts,
    pub deltas: PlatformCounts,
    pub total_today: u32,
    pub achievement: Achievement,
    pub badge: &'static str,
    pub motivation: String,
    /// Whether `motivation` came from the generator.
    pub generated: bool,
}

pub async fn assemble_report<G: Generator>(
    name: &str,
    date: NaiveDate,
    totals: PlatformCounts,
    deltas: PlatformCounts,
    generator: &G,
) -> ReportPayload {
    let total_today = deltas.sum();
    let achievement = Achievement::for_total(total_today);
    let generated = generated_line(generator, name, &deltas).await;

    ReportPayload {
        name: name.to_owned(),
        date,
        totals,
        deltas,
        total_today,
        achievement,
        badge: achievement.badge(),
        generated: generated.is_some(),
        motivation: generated.unwrap_or_else(|| achievement.fallback_line(name, total_today)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<&'static str, &'static str>);

    impl Generator for Fixed {
        async fn generate(&self, _: &str) -> anyhow::Result<String> {
            self.0.map(ToOwned::to_owned).map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()
    }

    #[test]
    fn tier_boundaries() {
        assert_eq!(Achievement::for_total(15), Achievement::Legend);
        assert_eq!(Achievement::for_total(40), Achievement::Legend);
        assert_eq!(Achievement::for_total(14), Achievement::OnFire);
        assert_eq!(Achievement::for_total(10), Achievement::OnFire);
        assert_eq!(Achievement::for_total(5), Achievement::Strong);
        assert_eq!(Achievement::for_total(4), Achievement::Progress);
        assert_eq!(Achievement::for_total(1), Achievement::Progress);
        assert_eq!(Achievement::for_total(0), Achievement::Rest);
    }

    #[tokio::test]
    async fn generated_text_is_used() {
        let r = assemble_report(
            "Ravi",
            date(),
            PlatformCounts([100, 20, 5, 9, 3]),
            PlatformCounts([6, 0, 0, 0, 0]),
            &Fixed(Ok("Six today, Ravi! 🔥")),
        )
        .await;
        assert_eq!(r.total_today, 6);
        assert_eq!(r.achievement, Achievement::Strong);
        assert_eq!(r.badge, "⭐ STRONG PERFORMER");
        assert_eq!(r.motivation, "Six today, Ravi! 🔥");
        assert!(r.generated);
    }

    #[tokio::test]
    async fn fallback_matches_tier_and_is_stable() {
        let deltas = PlatformCounts([10, 2, 1, 2, 0]);
        for generator in [Fixed(Err("quota")), Fixed(Ok("   "))] {
            let a = assemble_report("Mei", date(), deltas, deltas, &generator).await;
            let b = assemble_report("Mei", date(), deltas, deltas, &generator).await;
            assert_eq!(a.achievement, Achievement::Legend);
            assert!(!a.generated);
            assert_eq!(a.motivation, Achievement::Legend.fallback_line("Mei", 15));
            assert_eq!(a, b);
        }

        let none: Option<Fixed> = None;
        let rest = assemble_report("Mei", date(), deltas, PlatformCounts::ZERO, &none).await;
        assert_eq!(rest.achievement, Achievement::Rest);
        assert!(rest.motivation.starts_with("💡 Fresh start awaits, Mei."));
    }
}
