mod print;

use core::time::Duration;
use std::path::PathBuf;

use chrono::NaiveDate;
use pulse::{
    coach::{CoachConfig, Gemini},
    db::{DbConfig, Store, constants},
    extract::Endpoints,
    mail::{MailConfig, Mailer},
    platform::Platform,
    run::RunConfig,
    scrape::{ScrapeConfig, Scraper},
};

#[derive(clap::Parser)]
#[command(version, about)]
struct Args {
    #[command(flatten)]
    scrape: ScrapeArgs,
    #[command(flatten)]
    db: DbArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ScrapeArgs {
    /// Per-request timeout
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 12, value_name = "secs")]
    timeout: u64,
    #[arg(long, env = "PAUSE_MIN_MS", default_value_t = 1000, value_name = "ms")]
    pause_min: u64,
    #[arg(long, env = "PAUSE_MAX_MS", default_value_t = 2000, value_name = "ms")]
    pause_max: u64,
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,
    /// SkillRack mirror API, queried with `?url=<profile>`
    #[arg(long, env = "SKILLRACK_MIRROR_API")]
    skillrack_api: Option<String>,
}

#[derive(clap::Args)]
struct DbArgs {
    #[arg(long, env = "DB_HOST", default_value = constants::HOST)]
    db_host: String,
    #[arg(long, env = "DB_USER", default_value = constants::USER)]
    db_user: String,
    #[arg(long, env = "DB_NAME", default_value = constants::DBNAME)]
    db_name: String,
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    db_password: Option<String>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Upsert a roster export into the store
    Sync {
        #[arg(value_name = "file")]
        roster: PathBuf,
    },
    /// Measure every member, store the day's snapshot and mail reports
    Scrape {
        /// Sync this roster export first
        #[arg(long, value_name = "file")]
        roster: Option<PathBuf>,
        /// Compute and log without writing or mailing
        #[arg(long)]
        dry_run: bool,
        /// Snapshot date, today by default
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, env = "RUN_DEADLINE_SECS", value_name = "secs")]
        deadline: Option<u64>,
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        gemini_api_key: Option<String>,
        #[arg(long, env = "GEMINI_MODEL", default_value = CoachConfig::DEFAULT_MODEL)]
        gemini_model: String,
        #[arg(long, env = "SMTP_FROM")]
        smtp_from: Option<String>,
        #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
        smtp_password: Option<String>,
        #[arg(long, env = "SMTP_RELAY", default_value = MailConfig::DEFAULT_RELAY)]
        smtp_relay: String,
    },
    /// Run one extractor and print what it measures
    Probe {
        platform: Platform,
        reference: String,
        /// Floor for SkillRack
        #[arg(long)]
        last_known: Option<u32>,
    },
    /// Rank members by their latest snapshot
    Leaderboard {
        /// Compare teams instead of members
        #[arg(long)]
        teams: bool,
    },
}

impl ScrapeArgs {
    fn config(&self) -> ScrapeConfig {
        ScrapeConfig {
            timeout: Duration::from_secs(self.timeout),
            pause_min: Duration::from_millis(self.pause_min),
            pause_max: Duration::from_millis(self.pause_max),
            github_token: self.github_token.clone().filter(|s| !s.is_empty()),
            skillrack_api: self.skillrack_api.clone().filter(|s| !s.is_empty()),
        }
    }
}

impl DbArgs {
    fn config(&self) -> DbConfig {
        DbConfig {
            host: self.db_host.clone(),
            user: self.db_user.clone(),
            dbname: self.db_name.clone(),
            password: self.db_password.clone(),
        }
    }

    async fn store(&self) -> anyhow::Result<Store> {
        let store = Store::connect(&self.config()).await?;
        store.migrate().await?;
        Ok(store)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use clap::Parser;

    pretty_env_logger::init_timed();

    let args = Args::parse();
    let scrape = args.scrape.config();

    match args.command {
        Commands::Sync { roster } => {
            let entries = pulse::roster::load(&roster)?;
            let store = args.db.store().await?;
            store.sync_roster(&entries).await?;
        }
        Commands::Scrape {
            roster,
            dry_run,
            date,
            deadline,
            gemini_api_key,
            gemini_model,
            smtp_from,
            smtp_password,
            smtp_relay,
        } => {
            let store = args.db.store().await?;
            if let Some(roster) = roster {
                let entries = pulse::roster::load(&roster)?;
                if dry_run {
                    tracing::info!("dry run: {} roster entries not synced", entries.len());
                } else {
                    store.sync_roster(&entries).await?;
                }
            }

            let participants = store.members().await?;
            tracing::info!("\x1b[36m{} members to process\x1b[0m", participants.len());

            let generator = match gemini_api_key.filter(|s| !s.is_empty()) {
                Some(api_key) => Some(Gemini::new(
                    pulse::scrape::basic(scrape.timeout)?,
                    CoachConfig {
                        api_key,
                        model: gemini_model,
                        endpoint: CoachConfig::DEFAULT_ENDPOINT.to_owned(),
                    },
                )),
                None => {
                    tracing::warn!("GEMINI_API_KEY not set, using fallback lines");
                    None
                }
            };
            let mailer = Mailer::new(&MailConfig {
                from: smtp_from,
                password: smtp_password,
                relay: smtp_relay,
                ..MailConfig::default()
            })?;
            let scraper = Scraper::new(scrape, Endpoints::default())?;
            let config = RunConfig {
                date: date.unwrap_or_else(|| chrono::Local::now().date_naive()),
                dry_run,
                deadline: deadline.map(Duration::from_secs),
            };

            let summary = pulse::run::run(&scraper, &store, &mailer, &generator, &participants, &config).await;
            if summary.failed > 0 {
                tracing::warn!("\x1b[31m{} members failed\x1b[0m", summary.failed);
            }
        }
        Commands::Probe { platform, reference, last_known } => {
            let scraper = Scraper::new(scrape, Endpoints::default())?;
            if platform == Platform::SkillRack {
                let resolution = pulse::extract::skillrack::resolve_with_trail(&scraper, &reference, last_known).await;
                for (source, measurement) in &resolution.attempts {
                    println!("  {source:?}: {}", print::measurement(*measurement));
                }
                println!("{platform} {reference}: {}", print::measurement(resolution.value));
            } else {
                let measurement = pulse::extract::probe(&scraper, platform, &reference, last_known).await;
                println!("{platform} {reference}: {}", print::measurement(measurement));
            }
        }
        Commands::Leaderboard { teams } => {
            let store = args.db.store().await?;
            let standings = store.standings().await?;
            if teams {
                print::teams(&pulse::leaderboard::team_comparison(&standings));
            } else {
                print::members(&pulse::leaderboard::leaderboard(&standings));
            }
        }
    }

    Ok(())
}
