//! # tvshelf-parser
//!
//! Turns the path of an episode file into a show/season/episode triple.
//!
//! Three naming conventions are tried in a fixed order, first match wins:
//!
//! 1. Plex-style folders: `Show Name (2020)/Season 01/<file with episode marker>`
//! 2. An embedded `S01E05` marker, with the show taken from the folders when
//!    the file sits in a season folder, otherwise from the filename prefix
//! 3. A `1x05` marker with the show taken from the filename prefix
//!
//! ```
//! use std::path::Path;
//! use tvshelf_parser::parse;
//!
//! let parsed = parse(Path::new(
//!     "/media/TV Shows/Firefly (2002)/Season 01/Firefly - S01E01 - Serenity.mkv",
//! ))
//! .unwrap();
//!
//! assert_eq!(parsed.show_name, "Firefly");
//! assert_eq!(parsed.year, Some(2002));
//! assert_eq!((parsed.season_number, parsed.episode_number), (1, 1));
//! assert_eq!(parsed.episode_title.as_deref(), Some("Serenity"));
//!
//! assert!(parse(Path::new("/media/random/holiday video.mkv")).is_none());
//! ```

pub mod model;
pub mod normalize;
mod patterns;
mod strategy;

pub use model::{Convention, ParsedFilename};
pub use normalize::{normalize_show_name, show_name_match_key};

use std::path::Path;

/// Parse an episode file path.
///
/// Returns `None` when no convention matches or when the match would yield
/// an empty show name or an episode number below 1. Never panics on odd
/// input (non-UTF-8 components are treated as unparseable).
pub fn parse(path: &Path) -> Option<ParsedFilename> {
    let parts = strategy::PathParts::from_path(path)?;

    strategy::directory_structure(&parts)
        .or_else(|| strategy::season_episode(&parts))
        .or_else(|| strategy::cross_notation(&parts))
}
