//! Anti-automation challenge gate.
//!
//! The only point where the crawl expects a human: if the site poses a
//! challenge, the run blocks until someone solves it in the browser window or
//! the bound elapses.

use crate::error::{CrawlError, GatewayError};
use crate::gateway::{PageGateway, Scope};
use crate::locators::Locator;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Return once no challenge is posed or a posed one has been cleared.
///
/// Presence is checked with a short `probe` wait, so an unchallenged page costs
/// at most `probe`. A present marker must disappear within `max_wait`,
/// otherwise the run fails with [`CrawlError::ChallengeTimeout`].
#[instrument(level = "info", skip_all, fields(%marker, ?max_wait))]
pub async fn await_challenge_clearance<G: PageGateway>(
    page: &mut G,
    marker: &Locator,
    probe: Duration,
    max_wait: Duration,
) -> Result<(), CrawlError> {
    match page.wait_present(Scope::Page, &[marker], probe).await {
        Ok(_) => {}
        Err(GatewayError::Timeout { .. }) => {
            debug!("No challenge posed");
            return Ok(());
        }
        Err(source) => return Err(gate_error(source)),
    }

    warn!("Challenge detected; solve it in the browser window to continue");
    let t0 = Instant::now();
    match page.wait_absent(Scope::Page, marker, max_wait).await {
        Ok(()) => {
            info!(
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Challenge cleared"
            );
            Ok(())
        }
        Err(GatewayError::Timeout { waited }) => Err(CrawlError::ChallengeTimeout { waited }),
        Err(source) => Err(gate_error(source)),
    }
}

fn gate_error(source: GatewayError) -> CrawlError {
    CrawlError::Page {
        stage: super::CrawlState::Collecting,
        item: None,
        source,
    }
}
