//! Records extracted from a feed.
//!
//! This module defines the output of a crawl:
//! - Entity types: [`Author`], [`Tag`], [`Caption`], [`Music`], [`Media`], [`Metrics`]
//! - [`VideoItem`]: one feed entry, the unit of output
//! - [`CrawlReport`]: the ordered items of a run plus per-item failures
//!
//! Every entity is built once, during extraction of a single item, and never
//! changed afterwards. String fields are stored trimmed. Each entity keeps the
//! [`ElementHandle`] it was read from so callers can re-inspect the page; the
//! handle is never serialized.

use crate::gateway::ElementHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The account that posted a video.
///
/// Equality is by `unique_id` and `link` only.
#[derive(Debug, Clone, Serialize)]
pub struct Author {
    pub unique_id: String,
    pub avatar: String,
    pub link: String,
    pub nickname: String,
    #[serde(skip)]
    pub element: ElementHandle,
}

impl Author {
    pub fn new(
        unique_id: &str,
        avatar: &str,
        link: &str,
        nickname: &str,
        element: ElementHandle,
    ) -> Self {
        Self {
            unique_id: unique_id.trim().to_string(),
            avatar: avatar.trim().to_string(),
            link: link.trim().to_string(),
            nickname: nickname.trim().to_string(),
            element,
        }
    }
}

impl PartialEq for Author {
    fn eq(&self, other: &Self) -> bool {
        self.unique_id == other.unique_id && self.link == other.link
    }
}

impl Eq for Author {}

/// A hashtag link inside a caption.
#[derive(Debug, Clone, Serialize)]
pub struct Tag {
    pub link: String,
    pub text: String,
    #[serde(skip)]
    pub element: ElementHandle,
}

impl Tag {
    pub fn new(link: &str, text: &str, element: ElementHandle) -> Self {
        Self {
            link: link.trim().to_string(),
            text: text.trim().to_string(),
            element,
        }
    }
}

impl PartialEq for Tag {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link && self.text == other.text
    }
}

impl Eq for Tag {}

/// Caption text and its tags, in page order.
#[derive(Debug, Clone, Serialize)]
pub struct Caption {
    pub text: String,
    pub tags: Vec<Tag>,
    #[serde(skip)]
    pub element: ElementHandle,
}

impl Caption {
    pub fn new(text: &str, tags: Vec<Tag>, element: ElementHandle) -> Self {
        Self {
            text: text.trim().to_string(),
            tags,
            element,
        }
    }
}

impl PartialEq for Caption {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.tags == other.tags
    }
}

/// Sound attribution.
#[derive(Debug, Clone, Serialize)]
pub struct Music {
    pub title: String,
    pub link: String,
    #[serde(skip)]
    pub element: ElementHandle,
}

impl Music {
    pub fn new(title: &str, link: &str, element: ElementHandle) -> Self {
        Self {
            title: title.trim().to_string(),
            link: link.trim().to_string(),
            element,
        }
    }
}

impl PartialEq for Music {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title && self.link == other.link
    }
}

impl Eq for Music {}

/// The video source. The link is its only identity.
#[derive(Debug, Clone, Serialize)]
pub struct Media {
    pub link: String,
    #[serde(skip)]
    pub element: ElementHandle,
}

impl Media {
    pub fn new(link: &str, element: ElementHandle) -> Self {
        Self {
            link: link.trim().to_string(),
            element,
        }
    }
}

impl PartialEq for Media {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link
    }
}

impl Eq for Media {}

/// Engagement counters as displayed (e.g. `"1.2M"`), not normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub likes: String,
    pub comments: String,
    pub shares: String,
    /// When the counters were read.
    pub as_of: DateTime<Utc>,
    #[serde(skip)]
    pub element: ElementHandle,
}

impl Metrics {
    pub fn new(likes: &str, comments: &str, shares: &str, element: ElementHandle) -> Self {
        Self {
            likes: likes.trim().to_string(),
            comments: comments.trim().to_string(),
            shares: shares.trim().to_string(),
            as_of: Utc::now(),
            element,
        }
    }
}

/// Non-success marker on a [`VideoItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Media never attached; `media` and `metrics` are absent.
    MediaUnavailable,
}

/// One extracted feed entry.
///
/// Equality is by `id` only. When `status` is
/// [`ItemStatus::MediaUnavailable`], `media` and `metrics` are `None` and every
/// other field is populated.
#[derive(Debug, Clone, Serialize)]
pub struct VideoItem {
    /// Session-scoped identity of the item's page node.
    pub id: String,
    pub author: Author,
    pub caption: Caption,
    pub music: Music,
    pub media: Option<Media>,
    pub metrics: Option<Metrics>,
    pub status: Option<ItemStatus>,
    /// Inner HTML of the item container, when markup capture is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    #[serde(skip)]
    pub element: ElementHandle,
}

impl VideoItem {
    pub fn is_complete(&self) -> bool {
        self.status.is_none()
    }
}

impl PartialEq for VideoItem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for VideoItem {}

/// Why an item is missing from a report's `items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The node was replaced between collection and extraction.
    Stale,
    /// A required field could not be read.
    Extraction,
}

/// An item that was collected but not turned into a [`VideoItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Position in the collected sequence.
    pub index: usize,
    pub id: String,
    pub kind: FailureKind,
    pub reason: String,
}

/// Result of one crawl run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    /// Extracted items in presentation order.
    pub items: Vec<VideoItem>,
    pub failures: Vec<ItemFailure>,
}

impl CrawlReport {
    pub fn media_unavailable(&self) -> usize {
        self.items.iter().filter(|item| !item.is_complete()).count()
    }
}
