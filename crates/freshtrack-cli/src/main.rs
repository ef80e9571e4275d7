use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use freshtrack_core::{
    Config, DailyJob, DailySchedule, ExpiryPipeline, Notifier, RunOutcome, Scheduler,
};
use freshtrack_mail::{DisabledTransport, MailTransport, SmtpMailer};
use freshtrack_server::AppState;
use freshtrack_store::{ProductStore, SqliteProductStore};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "freshtrack")]
#[command(version, about = "Food expiry tracker with daily email digests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Run the HTTP API together with the daily expiry check (default)
    Serve {
        /// Port to listen on, overrides PORT and the config file
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the expiry check once, right now
    Check {
        /// Print the digest instead of sending it
        #[arg(long)]
        dry_run: bool,
        /// Recipient, defaults to the configured notification address
        #[arg(long)]
        to: Option<String>,
    },
    /// Print tracked products, soonest expiry first
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "freshtrack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => serve(config, port).await,
        Commands::Check { dry_run, to } => check(config, dry_run, to).await,
        Commands::List => list(config).await,
    }
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn ProductStore>> {
    let path = &config.database.path;
    let store = SqliteProductStore::open(path)
        .with_context(|| format!("Failed to open product database {}", path.display()))?;
    info!("Using product database {}", path.display());
    Ok(Arc::new(store))
}

/// Build the pipeline; a missing mail setup degrades to failing sends
fn build_pipeline(config: &Config, store: Arc<dyn ProductStore>) -> anyhow::Result<ExpiryPipeline> {
    let transport: Arc<dyn MailTransport> = match config.mail.smtp_settings() {
        Ok(settings) => Arc::new(SmtpMailer::new(&settings).context("Invalid mail settings")?),
        Err(e) => {
            warn!("Email notifications disabled: {}", e);
            Arc::new(DisabledTransport::new(e.to_string()))
        }
    };

    let sender = config.mail.sender().unwrap_or("freshtrack@localhost");
    let notifier = Notifier::new(transport, sender);
    Ok(ExpiryPipeline::new(store, notifier, config.notifications.window()?))
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let pipeline = Arc::new(build_pipeline(&config, store)?);

    let mut scheduler = match &config.notifications.recipient {
        Some(recipient) => {
            let schedule = DailySchedule::new(config.notifications.notify_time()?);
            let mut scheduler = Scheduler::new(DailyJob::new(pipeline.clone(), recipient), schedule);
            scheduler.start();
            Some(scheduler)
        }
        None => {
            warn!("NOTIFICATION_EMAIL not set, daily expiry check disabled");
            None
        }
    };

    let port = port.unwrap_or(config.server.port);
    let result = freshtrack_server::serve(
        AppState::new(pipeline),
        port,
        freshtrack_server::shutdown_signal(),
    )
    .await;

    if let Some(scheduler) = scheduler.as_mut() {
        scheduler.stop().await;
    }

    result.context("HTTP server failed")
}

async fn check(config: Config, dry_run: bool, to: Option<String>) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let pipeline = build_pipeline(&config, store)?;
    let today = Local::now().date_naive();

    if dry_run {
        match pipeline.preview(today).await? {
            Some(digest) => println!("{}", digest.to_text()),
            None => println!(
                "No products expiring within {} days",
                pipeline.window().days()
            ),
        }
        return Ok(());
    }

    let recipient = to
        .or_else(|| config.notifications.recipient.clone())
        .context("No recipient: pass --to or set NOTIFICATION_EMAIL")?;

    match pipeline.run_scheduled(today, &recipient).await? {
        RunOutcome::NothingToSend => println!("Nothing to send"),
        RunOutcome::Sent {
            recipient,
            notified,
            marked,
        } => println!(
            "Sent digest for {} products to {} ({} marked)",
            notified.len(),
            recipient,
            marked
        ),
    }

    Ok(())
}

async fn list(config: Config) -> anyhow::Result<()> {
    let store = open_store(&config)?;
    let today = Local::now().date_naive();

    for product in store.list().await? {
        let days = freshtrack_core::days_until_expiry(product.expiry, today);
        let flag = if product.notification_sent { "notified" } else { "" };
        println!(
            "{}  {:<30} {:>5}d  {}  {}",
            product.expiry, product.name, days, product.id, flag
        );
    }

    Ok(())
}
