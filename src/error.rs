//! Error types for the page gateway, the per-item extraction steps and the
//! crawl run as a whole.
//!
//! The split mirrors how failures are handled:
//!
//! - [`GatewayError`]: anything the driven page reports back (timeouts, stale
//!   nodes, CDP failures).
//! - [`MediaError`] and [`ExtractError`]: item-level, recovered by the
//!   orchestrator (partial record, skipped item or failure entry).
//! - [`CrawlError`]: run-level, surfaced to the caller with the stage and item
//!   index where it happened.

use crate::crawler::CrawlState;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a [`PageGateway`](crate::gateway::PageGateway).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// A bounded wait elapsed before its condition held.
    #[error("timed out after {waited:?}")]
    Timeout { waited: Duration },

    /// The node behind a handle was replaced or detached from the document.
    #[error("element {id} is no longer attached to the page")]
    StaleElement { id: String },

    /// The browser rejected or failed a command.
    #[error("browser error: {0}")]
    Browser(String),

    /// The browser session could not be started.
    #[error("failed to launch browser: {0}")]
    Launch(String),
}

impl GatewayError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GatewayError::Timeout { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, GatewayError::StaleElement { .. })
    }
}

/// A locator table lacks an entry a feed variant needs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("locator table has no entry for `{name}`")]
    Missing { name: String },
}

/// Outcome of the two-stage media lookup when no link was captured.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    /// Every bounded wait elapsed without a usable media element.
    #[error("media unavailable after {attempts} bounded waits")]
    Unavailable { attempts: u32 },

    /// The page failed for a reason other than a wait timing out.
    #[error(transparent)]
    Page(GatewayError),

    #[error(transparent)]
    Locator(#[from] LocatorError),
}

/// Failure to resolve one field of a feed item.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("no element matched `{name}`")]
    Missing { name: &'static str },

    #[error("element `{name}` has no `{attribute}` attribute")]
    MissingAttribute {
        name: &'static str,
        attribute: &'static str,
    },

    #[error("reading `{name}` failed: {source}")]
    Page {
        name: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    Locator(#[from] LocatorError),
}

impl ExtractError {
    /// Whether the failure came from the item's node being replaced mid-read.
    pub fn is_stale(&self) -> bool {
        matches!(self, ExtractError::Page { source, .. } if source.is_stale())
    }

    /// The gateway error behind this failure, if any.
    pub fn page_error(&self) -> Option<&GatewayError> {
        match self {
            ExtractError::Page { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Run-level failure; the crawler is left in [`CrawlState::Failed`].
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("challenge still present after waiting {waited:?}")]
    ChallengeTimeout { waited: Duration },

    #[error("no results after {rounds} scroll round(s)")]
    NoMoreResults { rounds: usize },

    #[error("{stage}: no element matched `{name}`")]
    MissingElement { stage: CrawlState, name: &'static str },

    #[error("{stage}{}: {source}", item_suffix(.item))]
    Page {
        stage: CrawlState,
        item: Option<usize>,
        #[source]
        source: GatewayError,
    },

    #[error("item {item} went stale: {source}")]
    Stale {
        item: usize,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error("crawler already ran (state: {state})")]
    AlreadyRan { state: CrawlState },
}

fn item_suffix(item: &Option<usize>) -> String {
    item.map(|i| format!(" (item {i})")).unwrap_or_default()
}
