//! # feedcrawl
//!
//! Crawl one social video feed in a Chromium session and write the extracted
//! records to a JSON report.
//!
//! ## Usage
//!
//! ```sh
//! feedcrawl -n 20 foryou
//! feedcrawl --headed search "cute cats"
//! ```

use clap::Parser;
use feedcrawl::cli::Cli;
use feedcrawl::config::Settings;
use feedcrawl::feed::FeedProfile;
use feedcrawl::outputs::json;
use feedcrawl::utils::ensure_writable_dir;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

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
    info!("feedcrawl starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.command, limit = args.limit, ?args.config, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref()).await?;
    args.apply(&mut settings);
    let run_config = settings.run_config(args.limit);
    let profile = FeedProfile::new(args.feed(), &settings)?;
    let label = profile.kind.label();
    info!(feed = %profile.kind, ?settings.profile, settle = ?run_config.settle, "Configured run");

    // Early check: ensure output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let report = crawl(profile, run_config, &settings).await?;

    if report.items.is_empty() {
        warn!("Crawl finished without any items");
    }
    let path = json::write_report(&report, &args.output_dir, &label).await?;

    let elapsed = start_time.elapsed();
    info!(
        path = %path.display(),
        items = report.items.len(),
        media_unavailable = report.media_unavailable(),
        failures = report.failures.len(),
        elapsed_secs = elapsed.as_secs_f64(),
        "feedcrawl finished"
    );
    Ok(())
}

#[cfg(feature = "browser")]
async fn crawl(
    profile: FeedProfile,
    run_config: feedcrawl::RunConfig,
    settings: &Settings,
) -> Result<feedcrawl::CrawlReport, Box<dyn Error>> {
    use feedcrawl::crawler::Crawler;
    use feedcrawl::gateway::chromium::ChromiumPage;

    let page = ChromiumPage::launch(&settings.browser).await?;
    let mut crawler = Crawler::new(page, profile, run_config);
    let outcome = crawler.run().await;

    if let Err(e) = crawler.into_page().close().await {
        warn!(error = %e, "Failed to close browser");
    }
    Ok(outcome?)
}

#[cfg(not(feature = "browser"))]
async fn crawl(
    _profile: FeedProfile,
    _run_config: feedcrawl::RunConfig,
    _settings: &Settings,
) -> Result<feedcrawl::CrawlReport, Box<dyn Error>> {
    Err("feedcrawl was built without the `browser` feature; no page gateway is available".into())
}
