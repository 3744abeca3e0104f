//! # feedcrawl
//!
//! Extracts structured records from scroll-loaded social video feeds rendered
//! by a client-side web application: for every feed item, its author, caption
//! and hashtags, media link, engagement metrics and music attribution.
//!
//! ## Feeds
//!
//! - The personalized recommendation feed
//! - A hashtag feed
//! - A search-results feed (with a load-more control and, sometimes, an
//!   anti-automation challenge a human has to solve)
//!
//! ## Architecture
//!
//! A [`Crawler`](crawler::Crawler) owns one [`PageGateway`](gateway::PageGateway)
//! and runs once:
//! 1. **Initializing**: reach the feed's entry page
//! 2. **Collecting**: wait out any challenge, scroll until enough items exist
//! 3. **Extracting**: read each item through the feed's locator table
//!
//! Variant differences live in data ([`FeedProfile`](feed::FeedProfile)), not
//! in separate crawler types.

pub mod cli;
pub mod config;
pub mod crawler;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod locators;
pub mod models;
pub mod outputs;
pub mod utils;

pub use config::{RunConfig, Settings};
pub use crawler::{CrawlState, Crawler};
pub use error::{CrawlError, GatewayError};
pub use feed::{FeedKind, FeedProfile};
pub use models::{CrawlReport, VideoItem};
