//! Scroll-until-enough pagination.
//!
//! Each round counts the realized item containers; if there are fewer than the
//! limit it scrolls to the bottom (and, for feeds with a load-more control,
//! clicks it), pauses to let the page settle, and counts again.
//!
//! The loop is bounded two ways: a hard cap on rounds, and a stall guard that
//! treats the feed as exhausted once a configured number of rounds in a row
//! produce no new containers.

use crate::config::RunConfig;
use crate::error::{CrawlError, GatewayError};
use crate::feed::Capabilities;
use crate::gateway::{ElementHandle, PageGateway, Scope};
use crate::locators::{Locator, LocatorTable, names};
use itertools::Itertools;
use tracing::{debug, info, instrument, warn};

use super::CrawlState;

/// Collect up to `config.limit` item handles in presentation order.
///
/// Returns fewer than the limit when the feed stops growing or the round cap
/// is hit. With `require_results`, finding nothing after the first scroll
/// fails with [`CrawlError::NoMoreResults`].
#[instrument(level = "info", skip_all, fields(limit = config.limit))]
pub async fn collect_item_handles<G: PageGateway>(
    page: &mut G,
    table: &LocatorTable,
    capabilities: &Capabilities,
    config: &RunConfig,
) -> Result<Vec<ElementHandle>, CrawlError> {
    let limit = config.limit;
    if limit == 0 {
        return Ok(Vec::new());
    }

    let containers = table.get(names::CONTAINERS)?;
    let load_more = if capabilities.load_more {
        Some(table.get(names::SEARCH_LOAD_MORE)?)
    } else {
        None
    };

    // Always scroll at least once; an empty first count is not yet "no results".
    let max_rounds = config.max_scroll_rounds.max(1);

    let mut handles = count(page, containers).await?;
    let mut rounds = 0usize;
    let mut stalled = 0usize;

    loop {
        debug!(count = handles.len(), rounds, "Element count");

        if handles.len() >= limit {
            handles.truncate(limit);
            break;
        }
        if capabilities.require_results && rounds > 0 && handles.is_empty() {
            warn!(rounds, "Feed produced no items");
            return Err(CrawlError::NoMoreResults { rounds });
        }
        if stalled >= config.stall_rounds {
            info!(
                count = handles.len(),
                rounds, "Feed stopped growing; treating as exhausted"
            );
            break;
        }
        if rounds >= max_rounds {
            warn!(
                count = handles.len(),
                rounds, "Reached scroll round cap before limit"
            );
            break;
        }

        debug!("Scrolling...");
        page.scroll_to_bottom().await.map_err(collecting)?;
        if let Some(control) = load_more {
            match page
                .wait_present(Scope::Page, &[control], config.load_more_wait)
                .await
            {
                Ok(button) => page.click(&button).await.map_err(collecting)?,
                Err(GatewayError::Timeout { .. }) => debug!("No load-more control this round"),
                Err(e) => return Err(collecting(e)),
            }
        }
        page.pause(config.settle).await;
        rounds += 1;

        let previous = handles.len();
        handles = count(page, containers).await?;
        if handles.len() > previous {
            stalled = 0;
        } else {
            stalled += 1;
        }
    }

    info!(count = handles.len(), rounds, "Collected item handles");
    Ok(handles)
}

async fn count<G: PageGateway>(
    page: &mut G,
    containers: &Locator,
) -> Result<Vec<ElementHandle>, CrawlError> {
    let found = page
        .find_all(Scope::Page, containers)
        .await
        .map_err(collecting)?;
    Ok(found.into_iter().unique().collect())
}

fn collecting(source: GatewayError) -> CrawlError {
    CrawlError::Page {
        stage: CrawlState::Collecting,
        item: None,
        source,
    }
}
