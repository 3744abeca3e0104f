//! Feed variants as data.
//!
//! The three feeds share one crawl state machine. What differs is captured
//! here: which locator table applies, how the entry page is reached, and a
//! handful of [`Capabilities`] flags for the search feed's quirks.

use crate::config::Settings;
use crate::error::LocatorError;
use crate::locators::LocatorTable;
use crate::utils::slugify;
use std::fmt;

/// Which feed to crawl, with its entry parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedKind {
    ForYou,
    Hashtag(String),
    Search(String),
}

impl FeedKind {
    /// Short label used in logs and output file names.
    pub fn label(&self) -> String {
        match self {
            FeedKind::ForYou => "foryou".to_string(),
            FeedKind::Hashtag(tag) => format!("hashtag-{}", slugify(tag.trim_start_matches('#'))),
            FeedKind::Search(query) => format!("search-{}", slugify(query)),
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::ForYou => f.write_str("for-you"),
            FeedKind::Hashtag(tag) => write!(f, "hashtag {tag}"),
            FeedKind::Search(query) => write!(f, "search {query:?}"),
        }
    }
}

/// Variant-specific behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Wait out an anti-automation challenge before collecting.
    pub challenge_gate: bool,
    /// Invoke a "load more" control on every pagination round.
    pub load_more: bool,
    /// Skip items whose node was replaced between collection and extraction.
    pub skip_stale_items: bool,
    /// An empty feed after the first scroll is a failure, not an empty run.
    pub require_results: bool,
}

/// How the crawler reaches the first page of results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Navigate straight to a URL.
    Navigate(String),
    /// Navigate to a URL, then type `query` into the search box.
    Search { url: String, query: String },
}

/// Everything variant-specific a crawl needs.
#[derive(Debug, Clone)]
pub struct FeedProfile {
    pub kind: FeedKind,
    pub entry: Entry,
    pub locators: LocatorTable,
    pub capabilities: Capabilities,
}

impl FeedProfile {
    /// Build the profile for `kind` from settings: entry URLs plus built-in
    /// locators with any configured overrides merged on top.
    pub fn new(kind: FeedKind, settings: &Settings) -> Result<Self, LocatorError> {
        let urls = &settings.urls;
        let overrides = &settings.locators;
        let (entry, locators, capabilities) = match &kind {
            FeedKind::ForYou => (
                Entry::Navigate(urls.for_you.clone()),
                LocatorTable::for_you().merged(&overrides.for_you),
                Capabilities::default(),
            ),
            FeedKind::Hashtag(tag) => (
                Entry::Navigate(hashtag_url(&urls.hashtag, tag)),
                LocatorTable::hashtag().merged(&overrides.hashtag),
                Capabilities::default(),
            ),
            FeedKind::Search(query) => (
                Entry::Search {
                    url: urls.search.clone(),
                    query: query.clone(),
                },
                LocatorTable::search().merged(&overrides.search),
                Capabilities {
                    challenge_gate: true,
                    load_more: true,
                    skip_stale_items: true,
                    require_results: true,
                },
            ),
        };
        Self::with_locators(kind, entry, locators, capabilities)
    }

    /// Assemble a profile from explicit parts, validating the table.
    pub fn with_locators(
        kind: FeedKind,
        entry: Entry,
        locators: LocatorTable,
        capabilities: Capabilities,
    ) -> Result<Self, LocatorError> {
        locators.validate(&capabilities, &entry)?;
        Ok(Self {
            kind,
            entry,
            locators,
            capabilities,
        })
    }
}

/// Hashtag page URL: base followed by the percent-encoded tag without its `#`.
pub fn hashtag_url(base: &str, tag: &str) -> String {
    let tag = tag.trim().trim_start_matches('#');
    format!("{}{}", base, urlencoding::encode(tag))
}
