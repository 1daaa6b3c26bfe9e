use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use watchfeed_common::{
    company_slug, normalize_profile_url, ConnectionPath, JobPreferences, MonitorConfig,
    MonitoredCompany, MonitoredPerson, WatchfeedError, WorkLocationType,
};
use watchfeed_monitor::fixture::FixtureScraper;
use watchfeed_monitor::{Monitor, MonitorDeps, PageScraper, PageVisit};
use watchfeed_store::{FeedStore, JsonFileStore, KeyValueStore, PathStore, WatchlistStore};

#[derive(Parser)]
#[command(name = "watchfeed", about = "Watchlist monitor for companies, people and connection paths")]
struct Cli {
    /// JSON store file (overrides WATCHFEED_STORE_PATH)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one monitoring cycle for a visited page, replaying a recorded scrape
    Visit {
        url: String,
        #[arg(long)]
        fixture: PathBuf,
    },
    /// Read and manage the activity feed
    #[command(subcommand)]
    Feed(FeedCommand),
    /// Manage watched companies, people and job preferences
    #[command(subcommand)]
    Watch(WatchCommand),
    /// Manage connection paths
    #[command(subcommand)]
    Path(PathCommand),
}

#[derive(Subcommand)]
enum FeedCommand {
    List {
        #[arg(long)]
        unread: bool,
    },
    Read { id: Uuid },
    Toggle { id: Uuid },
    Delete { id: Uuid },
    MarkAllRead,
    Stats,
}

#[derive(Subcommand)]
enum WatchCommand {
    AddCompany {
        /// Company page URL, e.g. https://www.linkedin.com/company/acme-corp/
        url: String,
        #[arg(long)]
        name: String,
        /// Defaults to the page slug
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        logo: Option<String>,
        #[arg(long)]
        no_alerts: bool,
        #[command(flatten)]
        preferences: PreferenceArgs,
    },
    AddPerson {
        url: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        id: Option<String>,
    },
    /// Remove a company or person by id
    Remove { id: String },
    List,
    /// Show global job preferences, or replace them when any flag is given
    Prefs {
        #[command(flatten)]
        preferences: PreferenceArgs,
    },
}

#[derive(Args, Default)]
struct PreferenceArgs {
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    locations: Vec<String>,
    /// remote, hybrid, on-site
    #[arg(long, value_delimiter = ',')]
    work_types: Vec<String>,
}

impl PreferenceArgs {
    fn into_preferences(self) -> Result<Option<JobPreferences>> {
        let work_location_types = self
            .work_types
            .iter()
            .map(|raw| {
                WorkLocationType::infer(raw)
                    .ok_or_else(|| WatchfeedError::Validation(format!("unknown work type: {raw}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let preferences = JobPreferences {
            keywords: self.keywords,
            locations: self.locations,
            work_location_types,
        };
        Ok((!preferences.is_empty()).then_some(preferences))
    }
}

#[derive(Subcommand)]
enum PathCommand {
    /// Import paths from a JSON array, replacing any with the same id
    Import { file: PathBuf },
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("watchfeed=info".parse()?))
        .init();

    let cli = Cli::parse();

    let config = MonitorConfig::from_env()?;
    let store_path = match cli.store {
        Some(path) => path,
        None => std::env::var("WATCHFEED_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("watchfeed.json")),
    };
    info!(store = %store_path.display(), "Using store");
    let kv: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(store_path));

    match cli.command {
        Command::Visit { url, fixture } => {
            config.log_effective();
            let scraper: Arc<dyn PageScraper> = Arc::new(FixtureScraper::load(&fixture).await?);
            let monitor = Monitor::new(
                MonitorDeps::builder()
                    .kv(kv)
                    .scraper(scraper)
                    .config(config)
                    .build(),
            )?;
            let report = monitor.handle_visit(&PageVisit::new(url)).await;
            println!("{report}");
        }
        Command::Feed(command) => run_feed(FeedStore::new(kv), command).await?,
        Command::Watch(command) => run_watch(WatchlistStore::new(kv), command).await?,
        Command::Path(command) => run_path(PathStore::new(kv), command).await?,
    }

    Ok(())
}

async fn run_feed(feed: FeedStore, command: FeedCommand) -> Result<()> {
    match command {
        FeedCommand::List { unread } => {
            let items = feed.list().await?;
            for item in items.iter().filter(|i| !unread || !i.read) {
                let marker = if item.read { " " } else { "*" };
                println!(
                    "{marker} {}  {}  [{}] {}",
                    item.id,
                    item.timestamp.format("%Y-%m-%d %H:%M"),
                    item.kind(),
                    item.headline()
                );
            }
        }
        FeedCommand::Read { id } => {
            if !feed.set_read(id, true).await? {
                bail!("no feed item {id}");
            }
        }
        FeedCommand::Toggle { id } => match feed.toggle_read(id).await? {
            Some(read) => println!("{id} is now {}", if read { "read" } else { "unread" }),
            None => bail!("no feed item {id}"),
        },
        FeedCommand::Delete { id } => {
            if !feed.delete(id).await? {
                bail!("no feed item {id}");
            }
        }
        FeedCommand::MarkAllRead => {
            let changed = feed.mark_all_read().await?;
            println!("Marked {changed} items read");
        }
        FeedCommand::Stats => println!("{}", feed.stats().await?),
    }
    Ok(())
}

async fn run_watch(watchlist: WatchlistStore, command: WatchCommand) -> Result<()> {
    match command {
        WatchCommand::AddCompany {
            url,
            name,
            id,
            logo,
            no_alerts,
            preferences,
        } => {
            let id = id
                .or_else(|| company_slug(&url))
                .unwrap_or_else(|| Uuid::new_v4().to_string());
            watchlist
                .upsert_company(MonitoredCompany {
                    id: id.clone(),
                    name,
                    company_url: url,
                    logo_url: logo,
                    job_alert_enabled: !no_alerts,
                    job_preferences: preferences.into_preferences()?,
                    last_checked: None,
                })
                .await?;
            println!("Watching company {id}");
        }
        WatchCommand::AddPerson { url, name, id } => {
            let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
            watchlist
                .upsert_person(MonitoredPerson {
                    id: id.clone(),
                    name,
                    profile_url: normalize_profile_url(&url),
                    last_checked: None,
                })
                .await?;
            println!("Watching person {id}");
        }
        WatchCommand::Remove { id } => {
            let removed = watchlist.remove_company(&id).await? | watchlist.remove_person(&id).await?;
            if !removed {
                bail!("nothing on the watchlist with id {id}");
            }
        }
        WatchCommand::List => {
            for company in watchlist.companies().await? {
                println!(
                    "company {:<20} {:<30} alerts={} last_checked={}",
                    company.id,
                    company.name,
                    company.job_alert_enabled,
                    company
                        .last_checked
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".into())
                );
            }
            for person in watchlist.people().await? {
                println!("person  {:<20} {:<30} {}", person.id, person.name, person.profile_url);
            }
        }
        WatchCommand::Prefs { preferences } => match preferences.into_preferences()? {
            Some(preferences) => {
                watchlist.set_global_preferences(&preferences).await?;
                println!("Global preferences updated");
            }
            None => {
                let current = watchlist.global_preferences().await?;
                println!("{}", serde_json::to_string_pretty(&current)?);
            }
        },
    }
    Ok(())
}

async fn run_path(paths: PathStore, command: PathCommand) -> Result<()> {
    match command {
        PathCommand::Import { file } => {
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let imported: Vec<ConnectionPath> = serde_json::from_str(&raw)
                .map_err(WatchfeedError::from)
                .with_context(|| format!("parsing {}", file.display()))?;
            let count = imported.len();
            for mut path in imported {
                path.recompute();
                path.last_updated = Utc::now();
                paths.save(path).await?;
            }
            println!("Imported {count} paths");
        }
        PathCommand::List => {
            for path in paths.list().await? {
                println!(
                    "{:<20} {:<30} {}/{}{}",
                    path.id,
                    path.target_name,
                    path.completed_steps,
                    path.total_steps,
                    if path.is_complete { " complete" } else { "" }
                );
            }
        }
    }
    Ok(())
}
