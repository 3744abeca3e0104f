//! Run configuration and the optional YAML settings file.
//!
//! [`RunConfig`] is what the crawler itself consumes. [`Settings`] is the
//! on-disk form the binary loads: timings in milliseconds, entry URLs, browser
//! options and per-variant locator overrides. Every field has a default, so an
//! empty or missing file is valid.
//!
//! ```yaml
//! profile: dev
//! timings:
//!   media_wait_ms: 8000
//! browser:
//!   headless: false
//!   chrome_args: ["--start-maximized"]
//! locators:
//!   search:
//!     search.load_more: "button.load-more"
//! ```

use crate::locators::LocatorTable;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

/// Settle-time preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    /// Short settle pauses for local iteration.
    Dev,
    /// Conservative pauses for unattended runs.
    #[default]
    Prod,
}

impl Profile {
    pub fn settle(self) -> Duration {
        match self {
            Profile::Dev => Duration::from_millis(500),
            Profile::Prod => Duration::from_secs(2),
        }
    }
}

/// Everything the crawler needs besides the page and the feed profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Maximum number of items to return.
    pub limit: usize,
    /// Pause after navigation, each scroll, and each scroll-into-view.
    pub settle: Duration,
    /// Bound for each of the two media waits.
    pub media_wait: Duration,
    /// Bound for the initial challenge-marker presence check.
    pub challenge_probe: Duration,
    /// Bound for a posed challenge to be cleared.
    pub challenge_max_wait: Duration,
    /// Bound for first search results (or a challenge) to appear.
    pub results_wait: Duration,
    /// Bound for the load-more control to appear on each round.
    pub load_more_wait: Duration,
    /// Hard cap on pagination rounds.
    pub max_scroll_rounds: usize,
    /// Consecutive rounds without growth before the feed counts as exhausted.
    pub stall_rounds: usize,
    /// Keep each item container's inner HTML on the record.
    pub capture_markup: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Timings::default().run_config(15, Profile::default())
    }
}

/// Timing knobs as they appear in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Overrides the profile's settle pause when set.
    pub settle_ms: Option<u64>,
    pub media_wait_ms: u64,
    pub challenge_probe_ms: u64,
    pub challenge_max_wait_ms: u64,
    pub results_wait_ms: u64,
    pub load_more_wait_ms: u64,
    pub max_scroll_rounds: usize,
    pub stall_rounds: usize,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_ms: None,
            media_wait_ms: 10_000,
            challenge_probe_ms: 3_000,
            challenge_max_wait_ms: 60_000,
            results_wait_ms: 10_000,
            load_more_wait_ms: 5_000,
            max_scroll_rounds: 200,
            stall_rounds: 1,
        }
    }
}

impl Timings {
    pub fn run_config(&self, limit: usize, profile: Profile) -> RunConfig {
        RunConfig {
            limit,
            settle: self
                .settle_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| profile.settle()),
            media_wait: Duration::from_millis(self.media_wait_ms),
            challenge_probe: Duration::from_millis(self.challenge_probe_ms),
            challenge_max_wait: Duration::from_millis(self.challenge_max_wait_ms),
            results_wait: Duration::from_millis(self.results_wait_ms),
            load_more_wait: Duration::from_millis(self.load_more_wait_ms),
            max_scroll_rounds: self.max_scroll_rounds.max(1),
            stall_rounds: self.stall_rounds.max(1),
            capture_markup: false,
        }
    }
}

/// Entry points for the three feeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Urls {
    pub for_you: String,
    /// Prefix the hashtag is appended to.
    pub hashtag: String,
    /// Page holding the search box.
    pub search: String,
}

impl Default for Urls {
    fn default() -> Self {
        Self {
            for_you: "https://www.tiktok.com/foryou".to_string(),
            hashtag: "https://www.tiktok.com/tag/".to_string(),
            search: "https://www.tiktok.com/".to_string(),
        }
    }
}

/// Browser session options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    /// Chromium executable; auto-detected when unset.
    pub executable: Option<PathBuf>,
    /// Extra Chromium command-line switches.
    pub chrome_args: Vec<String>,
    /// Interval between presence checks during bounded waits.
    pub poll_interval_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            chrome_args: Vec::new(),
            poll_interval_ms: 250,
        }
    }
}

/// Per-variant locator overrides, merged over the built-in tables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorOverrides {
    pub for_you: LocatorTable,
    pub hashtag: LocatorTable,
    pub search: LocatorTable,
}

/// Contents of the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub profile: Profile,
    pub capture_markup: bool,
    pub timings: Timings,
    pub urls: Urls,
    pub browser: BrowserSettings,
    pub locators: LocatorOverrides,
}

impl Settings {
    /// Load settings from a YAML file; `None` yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML for
    /// [`Settings`].
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, Box<dyn Error>> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path).await?;
        let settings: Settings = serde_yaml::from_str(&raw)?;
        info!(path = %path.display(), profile = ?settings.profile, "Loaded settings");
        Ok(settings)
    }

    pub fn run_config(&self, limit: usize) -> RunConfig {
        RunConfig {
            capture_markup: self.capture_markup,
            ..self.timings.run_config(limit, self.profile)
        }
    }
}
