//! Output writers for crawl reports.
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── 2026-10-16/
//!     ├── foryou_081503.json
//!     ├── hashtag-dance_093012.json
//!     └── search-cute-cats_101244.json
//! ```

pub mod json;
