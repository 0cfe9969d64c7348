use anyhow::Context;
use clap::Parser;
use scout_engine::{FetchOutcome, SearchSession};
use scout_logging::{scout_info, scout_warn};

use super::config::{AppConfig, Cli};
use super::{logging, render};

pub async fn run_app() -> anyhow::Result<()> {
    let config = AppConfig::from(Cli::parse());
    logging::initialize(config.log_destination, config.log_level, &config.log_path);
    search(config).await
}

async fn search(config: AppConfig) -> anyhow::Result<()> {
    scout_info!(
        "searching {:?} for {:?}, {} page(s)",
        config.settings.base_url,
        config.query,
        config.pages
    );
    let session = SearchSession::with_github(config.settings.clone())
        .context("building search client")?;

    let stream = session.start_session(&config.query).await;
    let printer = tokio::spawn(async move {
        let mut stream = stream;
        let mut printed = 0usize;
        while let Some(snapshot) = stream.next().await {
            printed += 1;
            println!("--- update {printed}");
            for line in render::render(&snapshot) {
                println!("{line}");
            }
        }
    });

    // The session start fetched page 1 without moving the cursor, so a failed
    // start is recovered with a retry and the first load_more repeats page 1.
    let mut remaining = config.pages.saturating_sub(1);
    let mut retried = false;
    if !session.latest().is_some_and(|snapshot| snapshot.is_success()) {
        retried = true;
        session.retry(&config.query).await;
    }
    while remaining > 0 {
        match session.load_more(&config.query).await {
            FetchOutcome::Succeeded => remaining -= 1,
            FetchOutcome::Failed if !retried => {
                retried = true;
                if session.retry(&config.query).await == FetchOutcome::Succeeded {
                    remaining -= 1;
                }
            }
            outcome => {
                scout_warn!("stopping with {} page(s) left: {:?}", remaining, outcome);
                break;
            }
        }
    }

    let cached = session.cached_len();
    let cursor = session.cursor();
    drop(session);
    printer.await.context("printing results")?;
    scout_info!("done: {} repos cached, cursor at page {}", cached, cursor);
    Ok(())
}
