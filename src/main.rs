//! # News Digest
//!
//! A personal daily news digest. Scrapes the headline tables of a fixed set of
//! aggregator pages, caches the result as one JSON snapshot per day, and serves
//! it as a single local web page.
//!
//! ## Usage
//!
//! ```sh
//! news_digest -d ./data --sites sites.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Cache gate**: reuse today's snapshot if it is fresh
//! 2. **Crawl**: otherwise visit each site in order, retrying failed fetches
//! 3. **Snapshot**: write the flat article list to `news_<date>.json`
//! 4. **Serve**: group by site, render, and serve; open a browser once listening

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod browser;
mod cache;
mod cli;
mod config;
mod models;
mod outputs;
mod pipeline;
mod retry;
mod scrapers;
mod server;
mod utils;

use cache::DailyCacheGate;
use cli::Cli;
use outputs::snapshot::SnapshotStore;
use pipeline::{Origin, load_or_scrape};
use scrapers::HttpPageSource;
use server::AppState;
use utils::{ensure_writable_dir, today};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_digest starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    if let Err(e) = ensure_writable_dir(&args.data_dir).await {
        error!(
            path = %args.data_dir.display(),
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let site_list = config::load_sites(args.sites.as_deref()).await?;
    let source = HttpPageSource::new(
        &args.user_agent,
        args.request_timeout(),
        site_list.allowed_domains.clone(),
    )?;
    let gate = DailyCacheGate::new(SnapshotStore::new(&args.data_dir));

    let digest = match load_or_scrape(
        &source,
        &site_list.sites,
        &args.crawl_options(),
        &gate,
        today(),
        Utc::now(),
        args.refresh,
    )
    .await
    {
        Ok(digest) => digest,
        Err(e) => {
            error!(error = %e, "Error saving snapshot");
            return Err(e.into());
        }
    };

    match &digest.origin {
        Origin::Cache => info!("Using today's cached snapshot"),
        Origin::Scrape { failed_sites } if !failed_sites.is_empty() => {
            warn!(?failed_sites, "Some sites could not be scraped")
        }
        Origin::Scrape { .. } => {}
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = digest.grouped.article_count(),
        sites = digest.grouped.groups.len(),
        "Digest ready"
    );

    // ---- Serve ----
    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!(url = %args.local_url(), "Starting server");
    if !args.no_browser {
        browser::launch_detached(args.local_url());
    }

    server::serve(
        listener,
        AppState {
            date: digest.date,
            grouped: digest.grouped,
        },
    )
    .await?;

    Ok(())
}
