//! Logical-name to query-expression tables, one per feed variant.
//!
//! The crawler never hardcodes a query. Every lookup goes through a
//! [`LocatorTable`] by one of the names in [`names`]. The built-in tables hold
//! CSS selectors for the Chromium gateway; a settings file can override any
//! entry (see [`LocatorTable::merged`]).
//!
//! Item-relative entries (`author.*`, `caption.*`, …) are resolved inside the
//! element found by their parent entry, so they stay short.

use crate::error::LocatorError;
use crate::feed::{Capabilities, Entry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Logical names queried by the crawler.
pub mod names {
    pub const CONTAINERS: &str = "containers";

    pub const AUTHOR_UNIQUE_ID: &str = "author.unique_id";
    pub const AUTHOR_AVATAR: &str = "author.avatar";
    pub const AUTHOR_LINK: &str = "author.link";
    pub const AUTHOR_NICKNAME: &str = "author.nickname";

    pub const CAPTION_CONTAINER: &str = "caption.container";
    pub const CAPTION_TEXT: &str = "caption.text";
    pub const CAPTION_TAGS: &str = "caption.tags";
    pub const TAG_TEXT: &str = "tag.text";

    pub const MEDIA_CONTAINER: &str = "media.container";
    pub const MEDIA_SOURCE: &str = "media.source";
    pub const MEDIA_VIDEO: &str = "media.video";

    pub const METRICS_CONTAINER: &str = "metrics.container";
    pub const METRICS_LIKES: &str = "metrics.likes";
    pub const METRICS_COMMENTS: &str = "metrics.comments";
    pub const METRICS_SHARES: &str = "metrics.shares";

    pub const MUSIC_CONTAINER: &str = "music.container";
    pub const MUSIC_TITLE: &str = "music.title";
    pub const MUSIC_LINK: &str = "music.link";

    pub const CHALLENGE_MARKER: &str = "challenge.marker";
    pub const SEARCH_INPUT: &str = "search.input";
    pub const SEARCH_LOAD_MORE: &str = "search.load_more";

    /// Names every variant queries during extraction.
    pub const ITEM: &[&str] = &[
        CONTAINERS,
        AUTHOR_UNIQUE_ID,
        AUTHOR_AVATAR,
        AUTHOR_LINK,
        AUTHOR_NICKNAME,
        CAPTION_CONTAINER,
        CAPTION_TEXT,
        CAPTION_TAGS,
        TAG_TEXT,
        MEDIA_CONTAINER,
        MEDIA_SOURCE,
        MEDIA_VIDEO,
        METRICS_CONTAINER,
        METRICS_LIKES,
        METRICS_COMMENTS,
        METRICS_SHARES,
        MUSIC_CONTAINER,
        MUSIC_TITLE,
        MUSIC_LINK,
    ];
}

/// An opaque query expression resolved by the page gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(query: impl Into<String>) -> Self {
        Self(query.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read-only mapping from logical name to [`Locator`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocatorTable {
    entries: BTreeMap<String, Locator>,
}

impl LocatorTable {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), Locator::new(v)))
                .collect(),
        }
    }

    /// Look up a logical name.
    pub fn get(&self, name: &str) -> Result<&Locator, LocatorError> {
        self.entries.get(name).ok_or_else(|| LocatorError::Missing {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// This table with every entry of `overrides` laid over it.
    pub fn merged(mut self, overrides: &LocatorTable) -> Self {
        for (name, locator) in &overrides.entries {
            self.entries.insert(name.clone(), locator.clone());
        }
        self
    }

    /// Check that every name a feed with this entry rule and these
    /// capabilities will query is present.
    ///
    /// # Errors
    ///
    /// [`LocatorError::Missing`] naming the first absent entry.
    pub fn validate(
        &self,
        capabilities: &Capabilities,
        entry: &Entry,
    ) -> Result<(), LocatorError> {
        let mut required: Vec<&str> = names::ITEM.to_vec();
        if let Entry::Search { .. } = entry {
            required.extend([names::SEARCH_INPUT, names::CHALLENGE_MARKER]);
        }
        if capabilities.challenge_gate {
            required.push(names::CHALLENGE_MARKER);
        }
        if capabilities.load_more {
            required.push(names::SEARCH_LOAD_MORE);
        }
        match required.into_iter().find(|name| !self.contains(name)) {
            Some(name) => Err(LocatorError::Missing {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Item-relative entries shared by the recommendation and hashtag layouts.
    fn item_entries() -> Vec<(&'static str, &'static str)> {
        use names::*;
        vec![
            (
                AUTHOR_UNIQUE_ID,
                "div:nth-of-type(1) > div:nth-of-type(1) > div:nth-of-type(1) > a:nth-of-type(2) > h3",
            ),
            (
                AUTHOR_AVATAR,
                "div:nth-of-type(1) > div:nth-of-type(1) > div:nth-of-type(1) > a:nth-of-type(1) span img",
            ),
            (AUTHOR_LINK, "a:nth-of-type(1)"),
            (
                AUTHOR_NICKNAME,
                "div:nth-of-type(1) > div:nth-of-type(1) > div:nth-of-type(1) > a:nth-of-type(2) > h4",
            ),
            (
                CAPTION_CONTAINER,
                "div:nth-of-type(1) > div:nth-of-type(1) > div:nth-of-type(2)",
            ),
            (CAPTION_TEXT, "span:nth-of-type(1)"),
            (CAPTION_TAGS, "a"),
            (TAG_TEXT, "strong"),
            (
                MEDIA_CONTAINER,
                "div:nth-of-type(1) > div:nth-of-type(2) > div:nth-of-type(1)",
            ),
            (MEDIA_SOURCE, "video > source"),
            (MEDIA_VIDEO, "video[src]"),
            (
                METRICS_CONTAINER,
                "div:nth-of-type(1) > div:nth-of-type(2) > div:nth-of-type(2)",
            ),
            (METRICS_LIKES, "button:nth-of-type(1) > strong"),
            (METRICS_COMMENTS, "button:nth-of-type(2) > strong"),
            (METRICS_SHARES, "button:nth-of-type(3) > strong"),
            (MUSIC_CONTAINER, "div:nth-of-type(1) > div:nth-of-type(1) > h4"),
            (MUSIC_TITLE, "a:nth-of-type(1)"),
            (MUSIC_LINK, "a:nth-of-type(1)"),
            (
                CHALLENGE_MARKER,
                "#captcha_container, .captcha_verify_container",
            ),
        ]
    }

    /// Built-in table for the personalized recommendation feed.
    pub fn for_you() -> Self {
        let mut pairs = Self::item_entries();
        pairs.push((
            names::CONTAINERS,
            "#app > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(1) > div",
        ));
        Self::from_pairs(pairs)
    }

    /// Built-in table for a hashtag feed.
    pub fn hashtag() -> Self {
        let mut pairs = Self::item_entries();
        pairs.push((
            names::CONTAINERS,
            "#app > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(2) > div",
        ));
        Self::from_pairs(pairs)
    }

    /// Built-in table for the search results feed.
    pub fn search() -> Self {
        use names::*;
        let mut pairs = Self::item_entries();
        pairs.extend([
            (
                CONTAINERS,
                "#app > div:nth-of-type(3) > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(1) > div",
            ),
            (SEARCH_INPUT, "#app > div:nth-of-type(2) form input"),
            (
                SEARCH_LOAD_MORE,
                "#app > div:nth-of-type(3) > div:nth-of-type(2) > div:nth-of-type(2) > div:nth-of-type(2) > button",
            ),
            (
                AUTHOR_UNIQUE_ID,
                "div:nth-of-type(2) > div > a:nth-of-type(2) > span:nth-of-type(1)",
            ),
            (
                AUTHOR_AVATAR,
                "div:nth-of-type(2) > div > a:nth-of-type(1) > div > span > img",
            ),
            (AUTHOR_LINK, "div:nth-of-type(2) > div > a:nth-of-type(1)"),
            (
                AUTHOR_NICKNAME,
                "div:nth-of-type(2) > div > a:nth-of-type(2) > span:nth-of-type(2) > span:nth-of-type(1)",
            ),
        ]);
        Self::from_pairs(pairs)
    }
}

#[cfg(test)]
pub(crate) fn identity_table() -> LocatorTable {
    let mut all: Vec<&str> = names::ITEM.to_vec();
    all.extend([
        names::CHALLENGE_MARKER,
        names::SEARCH_INPUT,
        names::SEARCH_LOAD_MORE,
    ]);
    LocatorTable::from_pairs(all.into_iter().map(|n| (n, n)))
}
