//! Crawl orchestration.
//!
//! One [`Crawler`] drives one page through a single run:
//!
//! ```text
//! Initializing -> Collecting -> Extracting -> Done
//!       \______________\_____________\______> Failed
//! ```
//!
//! 1. **Initializing**: reach the feed's entry page (for search, submit the
//!    query and wait for the first results or a challenge).
//! 2. **Collecting**: pass the challenge gate if the feed has one, then scroll
//!    until enough item containers are realized.
//! 3. **Extracting**: scroll each item into view, let it settle, extract it.
//!    Item-level problems are logged and recorded, never fatal, except a stale
//!    node on feeds that do not skip stale items.
//!
//! The three feeds differ only in their [`FeedProfile`]; the state machine is
//! shared.

pub mod challenge;
pub mod extract;
pub mod media;
pub mod pagination;

use crate::config::RunConfig;
use crate::error::{CrawlError, ExtractError, GatewayError};
use crate::feed::{Entry, FeedProfile};
use crate::gateway::{PageGateway, Scope};
use crate::locators::names;
use crate::models::{CrawlReport, FailureKind, ItemFailure};
use extract::Extractor;
use std::fmt;
use std::time::Instant;
use tracing::{error, info, instrument, warn};

pub use challenge::await_challenge_clearance;
pub use media::resolve_media;
pub use pagination::collect_item_handles;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlState {
    Initializing,
    Collecting,
    Extracting,
    Done,
    Failed,
}

impl fmt::Display for CrawlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CrawlState::Initializing => "initializing",
            CrawlState::Collecting => "collecting",
            CrawlState::Extracting => "extracting",
            CrawlState::Done => "done",
            CrawlState::Failed => "failed",
        })
    }
}

/// Owns one page session and crawls one feed with it.
pub struct Crawler<G> {
    page: G,
    profile: FeedProfile,
    config: RunConfig,
    state: CrawlState,
}

impl<G: PageGateway> Crawler<G> {
    pub fn new(page: G, profile: FeedProfile, config: RunConfig) -> Self {
        Self {
            page,
            profile,
            config,
            state: CrawlState::Initializing,
        }
    }

    pub fn state(&self) -> CrawlState {
        self.state
    }

    pub fn profile(&self) -> &FeedProfile {
        &self.profile
    }

    /// Give the page session back, e.g. to close the browser.
    pub fn into_page(self) -> G {
        self.page
    }

    /// Run the crawl once.
    ///
    /// Returns the extracted items in presentation order (at most
    /// `config.limit`) together with any per-item failures. A second call
    /// fails with [`CrawlError::AlreadyRan`].
    #[instrument(level = "info", skip_all, fields(feed = %self.profile.kind, limit = self.config.limit))]
    pub async fn run(&mut self) -> Result<CrawlReport, CrawlError> {
        if self.state != CrawlState::Initializing {
            return Err(CrawlError::AlreadyRan { state: self.state });
        }
        let t0 = Instant::now();

        match self.drive().await {
            Ok(report) => {
                self.state = CrawlState::Done;
                info!(
                    items = report.items.len(),
                    media_unavailable = report.media_unavailable(),
                    failures = report.failures.len(),
                    elapsed_ms = t0.elapsed().as_millis() as u64,
                    "Crawl complete"
                );
                Ok(report)
            }
            Err(e) => {
                error!(stage = %self.state, error = %e, "Crawl failed");
                self.state = CrawlState::Failed;
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<CrawlReport, CrawlError> {
        self.initialize().await?;

        self.state = CrawlState::Collecting;
        let caps = self.profile.capabilities;
        if caps.challenge_gate {
            let marker = self.profile.locators.get(names::CHALLENGE_MARKER)?;
            await_challenge_clearance(
                &mut self.page,
                marker,
                self.config.challenge_probe,
                self.config.challenge_max_wait,
            )
            .await?;
        }
        let handles =
            collect_item_handles(&mut self.page, &self.profile.locators, &caps, &self.config)
                .await?;

        self.state = CrawlState::Extracting;
        let extractor = Extractor::new(
            &self.profile.locators,
            self.config.media_wait,
            self.config.capture_markup,
        );
        let mut report = CrawlReport::default();

        for (index, handle) in handles.iter().enumerate() {
            info!(index, "Scrolling to element...");
            let outcome = match self.page.scroll_into_view(handle).await {
                Ok(()) => {
                    self.page.pause(self.config.settle).await;
                    extractor.extract(&mut self.page, handle).await
                }
                Err(source) if source.is_stale() => Err(ExtractError::Page {
                    name: names::CONTAINERS,
                    source,
                }),
                Err(source) => {
                    return Err(CrawlError::Page {
                        stage: CrawlState::Extracting,
                        item: Some(index),
                        source,
                    });
                }
            };

            match outcome {
                Ok(item) => report.items.push(item),
                Err(e) if e.is_stale() => {
                    if !caps.skip_stale_items {
                        let source = e.page_error().cloned().unwrap_or_else(|| {
                            GatewayError::StaleElement {
                                id: handle.id().to_string(),
                            }
                        });
                        return Err(CrawlError::Stale {
                            item: index,
                            source,
                        });
                    }
                    warn!(index, id = %handle, "Item went stale; skipping");
                    report.failures.push(ItemFailure {
                        index,
                        id: handle.id().to_string(),
                        kind: FailureKind::Stale,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!(index, id = %handle, error = %e, "Item extraction failed; skipping");
                    report.failures.push(ItemFailure {
                        index,
                        id: handle.id().to_string(),
                        kind: FailureKind::Extraction,
                        reason: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    #[instrument(level = "info", skip_all)]
    async fn initialize(&mut self) -> Result<(), CrawlError> {
        let init = |source| CrawlError::Page {
            stage: CrawlState::Initializing,
            item: None,
            source,
        };

        match &self.profile.entry {
            Entry::Navigate(url) => {
                info!(%url, "Loading feed");
                self.page.navigate(url).await.map_err(init)?;
                self.page.pause(self.config.settle).await;
            }
            Entry::Search { url, query } => {
                info!(%url, %query, "Loading search page");
                self.page.navigate(url).await.map_err(init)?;
                self.page.pause(self.config.settle).await;

                let table = &self.profile.locators;
                let input = self
                    .page
                    .find(Scope::Page, table.get(names::SEARCH_INPUT)?)
                    .await
                    .map_err(init)?
                    .ok_or(CrawlError::MissingElement {
                        stage: CrawlState::Initializing,
                        name: names::SEARCH_INPUT,
                    })?;
                self.page.submit_text(&input, query).await.map_err(init)?;

                let first_signs = [
                    table.get(names::CONTAINERS)?,
                    table.get(names::CHALLENGE_MARKER)?,
                ];
                match self
                    .page
                    .wait_present(Scope::Page, &first_signs, self.config.results_wait)
                    .await
                {
                    Ok(_) => info!("Search results are loading"),
                    Err(GatewayError::Timeout { waited }) => {
                        warn!(?waited, "No results or challenge seen yet; continuing")
                    }
                    Err(source) => return Err(init(source)),
                }
            }
        }
        Ok(())
    }
}
