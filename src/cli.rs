//! Command-line interface definitions for feedcrawl.
//!
//! Global options can also come from environment variables; anything not
//! given on the command line falls back to the settings file, then to the
//! built-in defaults.

use crate::config::{Profile, Settings};
use crate::feed::FeedKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the feedcrawl binary.
///
/// # Examples
///
/// ```sh
/// # Ten items from the recommendation feed
/// feedcrawl -n 10 foryou
///
/// # Hashtag feed, short settle pauses, visible browser
/// feedcrawl --profile dev --headed hashtag dance
///
/// # Search feed with a settings file and a custom output directory
/// feedcrawl -c feedcrawl.yaml -o ./out search "cute cats"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Maximum number of items to extract
    #[arg(short = 'n', long, global = true, default_value_t = 15)]
    pub limit: usize,

    /// Optional path to a YAML settings file
    #[arg(short, long, global = true, env = "FEEDCRAWL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory the JSON report is written under
    #[arg(short, long, global = true, env = "FEEDCRAWL_OUTPUT_DIR", default_value = "./out")]
    pub output_dir: String,

    /// Settle-time preset (overrides the settings file)
    #[arg(long, global = true, value_enum)]
    pub profile: Option<Profile>,

    /// Explicit settle pause in milliseconds (overrides the preset)
    #[arg(long, global = true)]
    pub settle_ms: Option<u64>,

    /// Show the browser window (needed to solve a challenge by hand)
    #[arg(long, global = true)]
    pub headed: bool,

    /// Store each item's inner HTML in the report
    #[arg(long, global = true)]
    pub capture_markup: bool,
}

/// Which feed to crawl.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// The personalized recommendation feed
    #[command(name = "foryou")]
    ForYou,
    /// The feed for one hashtag (with or without the leading `#`)
    Hashtag { tag: String },
    /// Results for a search query
    Search { query: String },
}

impl Cli {
    pub fn feed(&self) -> FeedKind {
        match &self.command {
            Command::ForYou => FeedKind::ForYou,
            Command::Hashtag { tag } => FeedKind::Hashtag(tag.clone()),
            Command::Search { query } => FeedKind::Search(query.clone()),
        }
    }

    /// Apply command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(profile) = self.profile {
            settings.profile = profile;
        }
        if self.settle_ms.is_some() {
            settings.timings.settle_ms = self.settle_ms;
        }
        if self.headed {
            settings.browser.headless = false;
        }
        if self.capture_markup {
            settings.capture_markup = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(["feedcrawl", "--output-dir", "./json", "foryou"]);

        assert_eq!(cli.command, Command::ForYou);
        assert_eq!(cli.output_dir, "./json");
        assert_eq!(cli.limit, 15);
        assert!(cli.config.is_none());
        assert_eq!(cli.feed(), FeedKind::ForYou);
    }

    #[test]
    fn test_cli_short_flags_after_subcommand() {
        let cli = Cli::parse_from(["feedcrawl", "hashtag", "#dance", "-n", "3", "-o", "/tmp/out"]);

        assert_eq!(cli.limit, 3);
        assert_eq!(cli.output_dir, "/tmp/out");
        assert_eq!(cli.feed(), FeedKind::Hashtag("#dance".into()));
    }

    #[test]
    fn test_cli_search_query_with_spaces() {
        let cli = Cli::parse_from(["feedcrawl", "search", "cute cats", "--profile", "dev"]);

        assert_eq!(cli.feed(), FeedKind::Search("cute cats".into()));
        assert_eq!(cli.profile, Some(Profile::Dev));
    }

    #[test]
    fn test_cli_requires_a_feed() {
        assert!(Cli::try_parse_from(["feedcrawl", "-n", "3"]).is_err());
    }

    #[test]
    fn test_cli_overrides_settings() {
        let cli = Cli::parse_from([
            "feedcrawl",
            "--profile",
            "dev",
            "--settle-ms",
            "900",
            "--headed",
            "--capture-markup",
            "foryou",
        ]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);

        assert_eq!(settings.profile, Profile::Dev);
        assert!(!settings.browser.headless);
        let config = settings.run_config(cli.limit);
        assert_eq!(config.settle, Duration::from_millis(900));
        assert!(config.capture_markup);
    }

    #[test]
    fn test_cli_leaves_settings_alone_by_default() {
        let cli = Cli::parse_from(["feedcrawl", "foryou"]);
        let mut settings = Settings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, Settings::default());
    }
}
