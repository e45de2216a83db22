//! CLI administration tool for snaplink.
//!
//! Provides housekeeping and inspection commands that work directly on the
//! database, without going through the HTTP API.
//!
//! # Usage
//!
//! ```bash
//! # Delete expired links and closed counter windows
//! cargo run --bin snaplink-admin -- purge
//!
//! # Same, without the confirmation prompt (cron)
//! cargo run --bin snaplink-admin -- purge --yes
//!
//! # View statistics
//! cargo run --bin snaplink-admin -- stats
//!
//! # Inspect one short code
//! cargo run --bin snaplink-admin -- lookup my-link
//!
//! # Check database connection and apply migrations
//! cargo run --bin snaplink-admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Reads the same variables as the server (see `snaplink::config`); only the
//! database, window and timeout settings matter here.

use snaplink::application::services::MaintenanceService;
use snaplink::config::{self, Config};
use snaplink::domain::clock::SystemClock;
use snaplink::infrastructure::persistence::{
    SqliteShortUrlRepository, SqliteWindowRepository, pool,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Confirm;
use sqlx::SqlitePool;
use std::sync::Arc;

type Maintenance = MaintenanceService<SqliteShortUrlRepository, SqliteWindowRepository>;

/// CLI tool for managing snaplink.
#[derive(Parser)]
#[command(name = "snaplink-admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Delete expired links and closed rate-limit windows
    Purge {
        /// Skip confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show statistics
    Stats,

    /// Show one short link
    Lookup {
        /// Short code to inspect
        code: String,
    },

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection and apply pending migrations
    Check,

    /// Show database info
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    let pool = pool::connect(
        &config.database_url,
        config.db_max_connections,
        config.store_timeout(),
    )
    .await
    .context("Failed to connect to database")?;

    match cli.command {
        Commands::Purge { yes } => purge(&maintenance(&config, &pool), yes).await?,
        Commands::Stats => stats(&maintenance(&config, &pool)).await?,
        Commands::Lookup { code } => lookup(&maintenance(&config, &pool), &config, &code).await?,
        Commands::Db { action } => handle_db_action(action, &pool).await?,
    }

    Ok(())
}

fn maintenance(config: &Config, pool: &SqlitePool) -> Maintenance {
    let pool = Arc::new(pool.clone());
    let policy = config.shorten_policy();

    MaintenanceService::new(
        Arc::new(SqliteShortUrlRepository::new(
            pool.clone(),
            config.store_timeout(),
        )),
        Arc::new(SqliteWindowRepository::new(pool, config.store_timeout())),
        Arc::new(SystemClock),
        &[policy.rate, policy.duplicate],
    )
}

/// Runs the cleanup sweep, asking first unless `--yes` was given.
async fn purge(service: &Maintenance, skip_confirm: bool) -> Result<()> {
    println!("{}", "🧹 Cleanup".bright_blue().bold());
    println!();

    if !skip_confirm {
        let confirmed = Confirm::new()
            .with_prompt("Delete expired links and closed rate-limit windows?")
            .default(false)
            .interact()?;

        if !confirmed {
            println!("{}", "❌ Cancelled".red());
            return Ok(());
        }
    }

    let report = service
        .purge()
        .await
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {}", e))?;

    println!(
        "  Expired links removed:  {}",
        report.expired_urls.to_string().bright_green().bold()
    );
    println!(
        "  Counter rows removed:   {}",
        report.stale_windows.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Displays link and click totals.
async fn stats(service: &Maintenance) -> Result<()> {
    println!("{}", "📊 Statistics".bright_blue().bold());
    println!();

    let summary = service
        .summary()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load statistics: {}", e))?;

    println!(
        "  Links:         {}",
        summary.total.to_string().bright_green().bold()
    );
    println!(
        "  Live links:    {}",
        summary.live.to_string().bright_green().bold()
    );
    println!(
        "  Expired links: {}",
        (summary.total - summary.live).to_string().yellow()
    );
    println!(
        "  Clicks:        {}",
        summary.clicks.to_string().bright_green().bold()
    );
    println!();

    Ok(())
}

/// Prints one mapping, including expired ones.
async fn lookup(service: &Maintenance, config: &Config, code: &str) -> Result<()> {
    let status = service
        .lookup(code)
        .await
        .map_err(|e| anyhow::anyhow!("Database error: {}", e))?
        .with_context(|| format!("Short code '{}' not found", code))?;

    let mapping = &status.short_url;
    let state = if status.live {
        "LIVE".green()
    } else {
        "EXPIRED".red()
    };

    println!("{}", "🔗 Short link".bright_blue().bold());
    println!();
    println!("  Code:       {}", mapping.code.cyan());
    println!(
        "  Short URL:  {}/{}",
        config.base_url.trim_end_matches('/'),
        mapping.code
    );
    println!("  Target:     {}", mapping.original_url.bright_white());
    println!(
        "  Created:    {}",
        mapping.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Expires:    {}",
        mapping.expires_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Clicks:     {}",
        mapping.click_count.to_string().bright_green().bold()
    );
    println!("  Status:     {}", state);
    println!();

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(action: DbAction, pool: &SqlitePool) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            sqlx::query("SELECT 1").fetch_one(pool).await?;
            pool::migrate(pool)
                .await
                .context("Failed to run migrations")?;

            println!("{}", "✅ Database connection OK, schema up to date".green().bold());
        }
        DbAction::Info => {
            println!("{}", "ℹ️  Database Information".bright_blue().bold());
            println!();

            let version: String = sqlx::query_scalar("SELECT sqlite_version()")
                .fetch_one(pool)
                .await?;

            println!("  SQLite: {}", version.bright_white());
            println!();
        }
    }

    Ok(())
}
