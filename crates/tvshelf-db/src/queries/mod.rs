//! Database query modules, one per table:
//! - shows: show lookup, creation and folder/year backfill
//! - seasons: find-or-create by (show, season number)
//! - episodes: find-or-create by (season, episode number), title updates
//! - episode_files: file records, change detection inputs, missing-file marking
//! - scan_history: scan lifecycle rows

pub mod episode_files;
pub mod episodes;
pub mod scan_history;
pub mod seasons;
pub mod shows;
