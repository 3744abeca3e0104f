//! Two-stage lookup for an item's video source.
//!
//! Media elements attach to the DOM asynchronously, after the item container
//! itself is present, and render either as `<video><source src></video>` or as
//! a bare `<video src>`. A single bounded wait produces false negatives, so
//! the resolver waits for either form, and on timeout waits exactly once more
//! before reporting [`MediaError::Unavailable`].

use crate::error::{GatewayError, MediaError};
use crate::gateway::{ElementHandle, PageGateway, Scope};
use crate::locators::{LocatorTable, names};
use crate::models::Media;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Number of bounded waits before giving up.
pub const MEDIA_ATTEMPTS: u32 = 2;

/// Resolve the media link inside an item's media container.
///
/// Each attempt waits up to `wait` for the `media.source` or `media.video`
/// element and reads its `src`. An element without a usable `src` counts as a
/// failed attempt, since the player fills it in late as well.
#[instrument(level = "debug", skip_all, fields(container = %container))]
pub async fn resolve_media<G: PageGateway>(
    page: &mut G,
    table: &LocatorTable,
    container: &ElementHandle,
    wait: Duration,
) -> Result<Media, MediaError> {
    let source = table.get(names::MEDIA_SOURCE)?;
    let video = table.get(names::MEDIA_VIDEO)?;
    let alternatives = [source, video];
    let t0 = Instant::now();

    for attempt in 1..=MEDIA_ATTEMPTS {
        match page
            .wait_present(Scope::Within(container), &alternatives, wait)
            .await
        {
            Ok(element) => {
                let src = page
                    .attribute(&element, "src")
                    .await
                    .map_err(MediaError::Page)?;
                match src.filter(|s| !s.trim().is_empty()) {
                    Some(link) => {
                        debug!(attempt, %link, "Resolved media");
                        return Ok(Media::new(&link, element));
                    }
                    None => {
                        warn!(attempt, max = MEDIA_ATTEMPTS, "Media element has no src yet");
                        if attempt < MEDIA_ATTEMPTS {
                            page.pause(wait).await;
                        }
                    }
                }
            }
            Err(GatewayError::Timeout { .. }) => {
                warn!(
                    attempt,
                    max = MEDIA_ATTEMPTS,
                    ?wait,
                    "Media wait timed out"
                );
            }
            Err(e) => return Err(MediaError::Page(e)),
        }
    }

    warn!(
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "Media unavailable after retries"
    );
    Err(MediaError::Unavailable {
        attempts: MEDIA_ATTEMPTS,
    })
}
