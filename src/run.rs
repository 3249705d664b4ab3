//! One daily pass over the roster.

use core::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::time::{Instant, timeout_at};

use crate::{
    coach::Generator,
    db::SnapshotStore,
    delta::{DailySnapshot, compute_daily_snapshot, previous_day},
    extract::probe,
    mail::{Delivery, ReportSink},
    platform::{Platform, PlatformCounts, Readings},
    report::{ReportPayload, assemble_report},
    roster::Participant,
    scrape::Scraper,
};

const TARGET: &str = "run";

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub date: NaiveDate,
    /// Compute and log only; nothing is persisted or mailed.
    pub dry_run: bool,
    /// Wall-clock budget of the whole run.
    pub deadline: Option<Duration>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub scraped: usize,
    pub failed: usize,
    pub skipped: usize,
    pub mailed: usize,
}

#[derive(Debug)]
pub struct MemberOutcome {
    pub snapshot: DailySnapshot,
    pub report: ReportPayload,
    pub delivery: Delivery,
}

/// Measures every platform of `participant` in order, pausing between
/// consecutive requests. Blank references are left unknown.
pub async fn read_platforms(scraper: &Scraper, participant: &Participant, yesterday: Option<&DailySnapshot>) -> Readings {
    let mut readings = Readings::default();
    let mut called = false;
    for p in Platform::ALL {
        let reference = participant.profiles[p].trim();
        if reference.is_empty() {
            continue;
        }
        if called {
            scraper.pause().await;
        }
        called = true;

        let last_known = yesterday.map(|y| y.totals[p]);
        readings[p] = probe(scraper, p, reference, last_known).await;
    }
    readings
}

/// Reads, settles, persists and mails one participant. The deadline bounds
/// only the reading phase; `Ok(None)` means it passed before anything was
/// written. Once a snapshot exists it is stored and mailed regardless.
pub async fn process_member<S, M, G>(
    scraper: &Scraper,
    store: &S,
    sink: &M,
    generator: &G,
    participant: &Participant,
    config: &RunConfig,
    deadline: Option<Instant>,
) -> anyhow::Result<Option<MemberOutcome>>
where
    S: SnapshotStore,
    M: ReportSink,
    G: Generator,
{
    let Participant { path, name, email, .. } = participant;

    let reading = async {
        let yesterday = store.snapshot(path, previous_day(config.date)).await?;
        let readings = read_platforms(scraper, participant, yesterday.as_ref()).await;
        anyhow::Ok((yesterday, readings))
    };
    let (yesterday, readings) = match deadline {
        Some(d) => match timeout_at(d, reading).await {
            Ok(r) => r?,
            Err(_) => return Ok(None),
        },
        None => reading.await?,
    };

    let baseline = yesterday.as_ref().map_or(PlatformCounts::ZERO, |y| y.totals);
    for p in readings.unknown() {
        tracing::debug!(target: TARGET, "{name}: {p} unknown, keeping {}", baseline[p]);
    }
    let totals = readings.settle(&baseline);
    let snapshot = compute_daily_snapshot(totals, yesterday.as_ref(), config.date, Utc::now());

    if !config.dry_run {
        store.upsert_snapshot(path, &snapshot).await?;
    }

    let report = assemble_report(name, config.date, snapshot.totals, snapshot.deltas, generator).await;

    let delivery = if config.dry_run {
        Delivery::Skipped
    } else {
        match sink.deliver(email, &report).await {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(target: TARGET, "\x1b[31mmail to {email} failed: {e:#}\x1b[0m");
                Delivery::Skipped
            }
        }
    };

    Ok(Some(MemberOutcome { snapshot, report, delivery }))
}

/// Processes every participant in order. A failing participant is logged and
/// counted. Once the deadline passes, the participant being read and all later
/// ones are skipped.
pub async fn run<S, M, G>(
    scraper: &Scraper,
    store: &S,
    sink: &M,
    generator: &G,
    participants: &[Participant],
    config: &RunConfig,
) -> RunSummary
where
    S: SnapshotStore,
    M: ReportSink,
    G: Generator,
{
    let deadline = config.deadline.map(|d| Instant::now() + d);
    let mut summary = RunSummary::default();

    for (i, participant) in participants.iter().enumerate() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            summary.skipped += participants.len() - i;
            tracing::warn!(target: TARGET, "\x1b[31mdeadline reached, {} participants skipped\x1b[0m", participants.len() - i);
            break;
        }

        tracing::info!(target: TARGET, "[{}/{}] {} ({})", i + 1, participants.len(), participant.name, participant.path);
        match process_member(scraper, store, sink, generator, participant, config, deadline).await {
            Ok(None) => {
                summary.skipped += 1;
                tracing::warn!(target: TARGET, "\x1b[31m{}: interrupted by deadline\x1b[0m", participant.name);
            }
            Ok(Some(outcome)) => {
                summary.scraped += 1;
                if outcome.delivery == Delivery::Sent {
                    summary.mailed += 1;
                }
                tracing::info!(
                    target: TARGET,
                    "\x1b[36m{}: {} | today +{} {}\x1b[0m",
                    participant.name,
                    outcome.snapshot.totals,
                    outcome.report.total_today,
                    outcome.report.badge,
                );
            }
            Err(e) => {
                summary.failed += 1;
                tracing::error!(target: TARGET, "\x1b[31m{} failed: {e:#}\x1b[0m", participant.name);
            }
        }
    }

    tracing::info!(
        target: TARGET,
        "\x1b[36mdone: {} scraped, {} failed, {} skipped, {} mailed\x1b[0m",
        summary.scraped, summary.failed, summary.skipped, summary.mailed,
    );
    summary
}
