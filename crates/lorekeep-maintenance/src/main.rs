//! `lorekeep-maintenance`: scan, validate, replay, or integrity-check
//! campaign event logs stored in `PostgreSQL`.
//!
//! One result per campaign goes to stdout (text, or one JSON object per
//! line with `--json`). Logs, warnings and errors go to stderr. The exit
//! code is 1 when any campaign fails.

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lorekeep_core::LorekeepConfig;
use lorekeep_db::{PostgresConfig, PostgresPool};
use lorekeep_maintenance::{Flags, Maintenance, Options, resolve_campaign_ids};

/// Replay and integrity tooling for Lorekeep campaigns.
#[derive(Parser, Debug)]
#[command(name = "lorekeep-maintenance")]
#[command(about = "Scan, validate, replay, or integrity-check campaign event logs")]
struct Args {
    /// Campaign to process.
    #[arg(long)]
    campaign_id: Option<String>,

    /// Comma-separated campaigns to process.
    #[arg(long)]
    campaign_ids: Option<String>,

    /// Process every campaign with events.
    #[arg(long)]
    all_campaigns: bool,

    /// Count events without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Check snapshot events against their game system's rules.
    #[arg(long)]
    validate: bool,

    /// Replay into a scratch store and diff against live projections.
    #[arg(long)]
    integrity: bool,

    /// Only consider events after this sequence number.
    #[arg(long, default_value_t = 0)]
    after_seq: u64,

    /// Warnings printed per campaign (0 prints all). Defaults to the
    /// configured value, 25 out of the box.
    #[arg(long, allow_negative_numbers = true)]
    warnings_cap: Option<i64>,

    /// Fail a validate run that finds more invalid events than this.
    #[arg(long)]
    max_invalid: Option<u64>,

    /// Emit one JSON object per campaign.
    #[arg(long)]
    json: bool,

    /// `PostgreSQL` connection URL.
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<LorekeepConfig> {
    let mut config = match path {
        Some(path) => LorekeepConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => LorekeepConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let selection = resolve_campaign_ids(
        args.campaign_id.as_deref(),
        args.campaign_ids.as_deref(),
        args.all_campaigns,
    )?;
    let options = Options::from_flags(&Flags {
        dry_run: args.dry_run,
        validate: args.validate,
        integrity: args.integrity,
        after_seq: args.after_seq,
        warnings_cap: args
            .warnings_cap
            .or_else(|| i64::try_from(config.maintenance.warnings_cap).ok()),
        max_invalid: args.max_invalid,
    })?
    .with_page_size(config.maintenance.page_size);

    let url = args
        .database_url
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| config.database.url.clone());
    if url.trim().is_empty() {
        bail!("no database URL: pass --database-url, set DATABASE_URL, or configure database.url");
    }
    let pool = PostgresPool::connect(
        &PostgresConfig::new(&url)
            .with_max_connections(config.database.max_connections)
            .with_connect_timeout(Duration::from_secs(config.database.connect_timeout_secs)),
    )
    .await
    .context("connecting to PostgreSQL")?;

    let maintenance = Maintenance::new(
        Arc::new(pool.event_store()),
        Arc::new(pool.projection_store()),
        options,
    );
    let campaign_ids = maintenance.campaign_ids(&selection).await?;
    info!(campaigns = campaign_ids.len(), mode = %maintenance.options().mode, "maintenance starting");

    let multiple = campaign_ids.len() > 1;
    let mut failed = 0_usize;
    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    for campaign_id in campaign_ids {
        let result = maintenance.run_campaign(campaign_id).await;
        if result.is_error() {
            failed = failed.saturating_add(1);
        }
        let mut out = stdout.lock();
        if args.json {
            result.write_json(&mut out)?;
        } else {
            let prefix = if multiple {
                format!("[{campaign_id}] ")
            } else {
                String::new()
            };
            result.write_text(&mut out, &mut stderr.lock(), &prefix)?;
        }
        out.flush()?;
    }

    pool.close().await;
    info!(failed, "maintenance finished");
    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
