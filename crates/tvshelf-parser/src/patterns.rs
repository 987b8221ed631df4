//! Compiled regular expressions shared by the parse strategies.

use regex::Regex;
use std::sync::LazyLock;

/// `Season 01`, `season.1`, `Season_10`, `S01`.
pub static RE_SEASON_DIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:season[\s._-]*(\d{1,3})|s(\d{1,3}))$").unwrap()
});

/// `Specials` / `Special` folder, season 0.
pub static RE_SPECIALS_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^specials?$").unwrap());

/// `Show Name (2020)` show folder.
pub static RE_SHOW_YEAR_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\(((?:19|20)\d{2})\)\s*$").unwrap());

/// `S01E05`, `s1e5`, `S01.E05`, `S01 E05`; not glued to a preceding letter.
pub static RE_SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])s(\d{1,3})[\s._-]?e(\d{1,4})").unwrap()
});

/// `1x05`, `12x103`; not part of a larger number (e.g. `1920x1080`).
pub static RE_CROSS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^0-9a-z])(\d{1,2})x(\d{2,3})(?:[^0-9]|$)").unwrap()
});

/// `E05`, `Ep 05`, `Episode 5` on its own.
pub static RE_EPISODE_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z])(?:episode|ep|e)[\s._-]*(\d{1,4})(?:[^0-9]|$)").unwrap()
});

/// Leading bare episode number: `05 - Title`.
pub static RE_LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})(?:[\s._-]|$)").unwrap());

/// Extra episodes right after a marker: the `E02` of `S01E01E02`.
pub static RE_MULTI_EPISODE_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:[-._ ]?e\d{1,4})+").unwrap());

/// Trailing year on a show name: `Show 2019`, `Show (2019)`, `Show.[2019].`.
pub static RE_TRAILING_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)[\s._-]*[(\[]?((?:19|20)\d{2})[)\]]?[\s._-]*$").unwrap()
});

/// First release tag after an episode title; everything from here is dropped.
pub static RE_RELEASE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:^|[\s._\-\[(])(?:\d{3,4}p|4k|uhd|hdtv|web[\s._-]?dl|webrip|web|bluray|blu-ray|brrip|bdrip|dvdrip|remux|x26[45]|h\.?26[45]|hevc|avc|xvid|aac|ac3|eac3|dts|ddp?5[.\s]1|10bit|hdr|proper|repack|internal|multi)(?:[\s._\-\])]|$)",
    )
    .unwrap()
});
