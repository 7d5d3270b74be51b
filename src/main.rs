use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use newsrelay::rss::HttpFeedFetcher;
use newsrelay::slack::SlackClient;
use newsrelay::store::JsonFilePendingStore;
use newsrelay::{
    purge_bot_history, Config, DigestJob, Publisher, RetentionPolicy, RetentionSweeper, Scheduler,
};

#[derive(Parser)]
#[command(name = "newsrelay", version, about = "RSS digest relay for Slack")]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Publish on schedule and sweep expired messages (default).
    Run,
    /// Run one publish cycle.
    Once {
        /// Print the messages instead of posting them.
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one retention sweep.
    Sweep,
    /// Delete every recorded message regardless of age.
    Purge,
    /// Delete the bot's messages from the history of every target channel.
    PurgeHistory {
        /// Number of recent messages inspected per channel.
        #[arg(long, default_value_t = 1000)]
        limit: u32,
    },
}

struct App {
    config: Config,
    client: Arc<SlackClient>,
    store: Arc<JsonFilePendingStore>,
}

impl App {
    fn new(config: Config) -> newsrelay::Result<Self> {
        let client = Arc::new(SlackClient::from_config(&config.slack)?);
        let store = Arc::new(JsonFilePendingStore::new(
            &config.storage.pending_deletes_path,
        ));
        Ok(Self {
            config,
            client,
            store,
        })
    }

    fn job(&self) -> newsrelay::Result<DigestJob> {
        let tz = self.config.schedule.tz()?;
        let source = Arc::new(HttpFeedFetcher::new(
            &self.config.feed.url,
            Duration::from_secs(self.config.feed.timeout_secs),
        )?);
        let publisher = Arc::new(Publisher::new(
            self.client.clone(),
            self.store.clone(),
            &self.config.message,
            tz,
        ));
        DigestJob::from_config(&self.config, source, publisher)
    }

    fn sweeper(&self) -> RetentionSweeper {
        RetentionSweeper::new(
            self.client.clone(),
            self.store.clone(),
            RetentionPolicy::from_config(&self.config.retention),
        )
    }

    async fn execute(&self, command: Command) -> newsrelay::Result<()> {
        match command {
            Command::Run if std::env::var_os("GITHUB_ACTIONS").is_some() => {
                info!("GITHUB_ACTIONS is set, running a single cycle");
                self.job()?.run_cycle(false).await?;
            }
            Command::Run => {
                let scheduler = Scheduler::new(
                    Arc::new(self.job()?),
                    Arc::new(self.sweeper()),
                    &self.config.schedule,
                )?;
                scheduler
                    .run(async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            error!("Failed to listen for shutdown signal: {}", e);
                            std::future::pending::<()>().await;
                        }
                    })
                    .await;
            }
            Command::Once { dry_run } => {
                let report = self.job()?.run_cycle(dry_run).await?;
                for message in &report.previews {
                    println!("{}\n", message.plain_text());
                }
            }
            Command::Sweep => {
                self.sweeper().sweep().await?;
            }
            Command::Purge => {
                self.sweeper().purge().await?;
            }
            Command::PurgeHistory { limit } => {
                let channels: Vec<String> = self
                    .config
                    .slack
                    .targets
                    .iter()
                    .map(|t| t.channel.clone())
                    .collect();
                purge_bot_history(
                    self.client.as_ref(),
                    &channels,
                    limit,
                    Duration::from_millis(self.config.retention.delete_delay_ms),
                )
                .await?;
            }
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load_with_env(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    // Initialize logging
    if let Err(e) = newsrelay::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        newsrelay::logging::init_console_only(&config.logging.level);
    }

    info!("newsrelay {}", env!("CARGO_PKG_VERSION"));

    let app = match App::new(config) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app.execute(cli.command.unwrap_or(Command::Run)).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
