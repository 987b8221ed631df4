//! The three naming conventions, tried in order by [`crate::parse`].

use std::path::Path;

use crate::model::{Convention, ParsedFilename};
use crate::normalize::{normalize_show_name, show_name_match_key};
use crate::patterns::*;

/// The path components the strategies look at.
pub(crate) struct PathParts<'a> {
    stem: &'a str,
    parent: Option<&'a str>,
    grandparent: Option<&'a str>,
}

impl<'a> PathParts<'a> {
    pub(crate) fn from_path(path: &'a Path) -> Option<Self> {
        let stem = path.file_stem()?.to_str()?;
        let parent_dir = path.parent();
        let name_of =
            |p: Option<&'a Path>| p.and_then(Path::file_name).and_then(|n| n.to_str());

        Some(Self {
            stem,
            parent: name_of(parent_dir),
            grandparent: name_of(parent_dir.and_then(Path::parent)),
        })
    }

    /// Season number when the file sits directly in a season folder.
    fn parent_season(&self) -> Option<u32> {
        self.parent.and_then(season_from_dir)
    }

    /// The folder most likely named after the show: the grandparent when
    /// the parent is a season folder, the parent otherwise.
    fn show_dir(&self) -> Option<&'a str> {
        if self.parent_season().is_some() {
            self.grandparent
        } else {
            self.parent
        }
    }
}

/// Where an episode marker sits in the stem.
struct Marker {
    season: Option<u32>,
    episode: u32,
    start: usize,
    end: usize,
}

struct ShowGuess {
    name: String,
    year: Option<i32>,
    folder_name: Option<String>,
}

fn season_from_dir(name: &str) -> Option<u32> {
    if RE_SPECIALS_DIR.is_match(name) {
        return Some(0);
    }
    let caps = RE_SEASON_DIR.captures(name)?;
    caps.get(1).or_else(|| caps.get(2))?.as_str().parse().ok()
}

/// Split a trailing 4-digit year off a raw name, normalizing what is left.
fn split_year(raw: &str) -> (String, Option<i32>) {
    if let Some(caps) = RE_TRAILING_YEAR.captures(raw) {
        let name = normalize_show_name(&caps[1]);
        if !name.is_empty() {
            return (name, caps[2].parse().ok());
        }
    }
    (normalize_show_name(raw), None)
}

/// Find the episode marker in a stem for the directory-structure convention.
fn any_episode_marker(stem: &str) -> Option<Marker> {
    if let Some(caps) = RE_SEASON_EPISODE.captures(stem) {
        let whole = caps.get(0)?;
        return Some(Marker {
            season: caps[1].parse().ok(),
            episode: caps[2].parse().ok()?,
            start: whole.start(),
            end: caps.get(2)?.end(),
        });
    }
    if let Some(caps) = RE_CROSS.captures(stem) {
        return Some(Marker {
            season: caps[1].parse().ok(),
            episode: caps[2].parse().ok()?,
            start: caps.get(0)?.start(),
            end: caps.get(2)?.end(),
        });
    }
    for re in [&*RE_EPISODE_ONLY, &*RE_LEADING_NUMBER] {
        if let Some(caps) = re.captures(stem) {
            return Some(Marker {
                season: None,
                episode: caps[1].parse().ok()?,
                start: caps.get(0)?.start(),
                end: caps.get(1)?.end(),
            });
        }
    }
    None
}

/// Best-effort episode title from the text following the marker.
fn episode_title(stem: &str, marker_end: usize) -> Option<String> {
    let after = stem.get(marker_end..)?;
    let after = RE_MULTI_EPISODE_TAIL
        .find(after)
        .map_or(after, |m| &after[m.end()..]);
    let cut = RE_RELEASE_TAG
        .find(after)
        .map_or(after, |m| &after[..m.start()]);

    let title = normalize_show_name(cut);
    (!title.is_empty()).then_some(title)
}

/// Show guessed from the folder layout.
fn show_from_dir(parts: &PathParts) -> Option<ShowGuess> {
    let dir = parts.show_dir()?;
    if season_from_dir(dir).is_some() {
        return None;
    }
    let (name, year) = split_year(dir);
    (!name.is_empty()).then(|| ShowGuess {
        name,
        year,
        folder_name: Some(dir.to_string()),
    })
}

/// Show guessed from the filename text before the marker.
///
/// The show folder is attached when its name agrees with the prefix, so
/// that a loose download directory never becomes a show's folder.
fn show_from_prefix(parts: &PathParts, prefix: &str) -> Option<ShowGuess> {
    let (name, mut year) = split_year(prefix);
    if name.is_empty() {
        return None;
    }

    let mut folder_name = None;
    if let Some(dir) = show_from_dir(parts) {
        if show_name_match_key(&dir.name) == show_name_match_key(&name) {
            year = year.or(dir.year);
            folder_name = dir.folder_name;
        }
    }

    Some(ShowGuess {
        name,
        year,
        folder_name,
    })
}

fn build(
    show: ShowGuess,
    season_number: u32,
    episode_number: u32,
    episode_title: Option<String>,
    convention: Convention,
) -> Option<ParsedFilename> {
    if episode_number < 1 || show.name.is_empty() {
        return None;
    }
    Some(ParsedFilename {
        show_name: show.name,
        folder_name: show.folder_name,
        season_number,
        episode_number,
        episode_title,
        year: show.year,
        convention,
    })
}

/// `Show Name (YYYY)/Season NN/<episode marker>`.
pub(crate) fn directory_structure(parts: &PathParts) -> Option<ParsedFilename> {
    let season = parts.parent_season()?;
    let show_dir = parts.grandparent?;
    let caps = RE_SHOW_YEAR_DIR.captures(show_dir)?;
    let marker = any_episode_marker(parts.stem)?;

    let show = ShowGuess {
        name: normalize_show_name(&caps[1]),
        year: caps[2].parse().ok(),
        folder_name: Some(show_dir.to_string()),
    };
    let title = episode_title(parts.stem, marker.end);
    build(show, season, marker.episode, title, Convention::DirectoryStructure)
}

/// `S01E05` anywhere in the filename.
pub(crate) fn season_episode(parts: &PathParts) -> Option<ParsedFilename> {
    let caps = RE_SEASON_EPISODE.captures(parts.stem)?;
    let marker = Marker {
        season: caps[1].parse().ok(),
        episode: caps[2].parse().ok()?,
        start: caps.get(0)?.start(),
        end: caps.get(2)?.end(),
    };
    let prefix = &parts.stem[..marker.start];

    let show = if parts.parent_season().is_some() {
        show_from_dir(parts).or_else(|| show_from_prefix(parts, prefix))
    } else {
        show_from_prefix(parts, prefix).or_else(|| show_from_dir(parts))
    }?;

    let title = episode_title(parts.stem, marker.end);
    build(show, marker.season?, marker.episode, title, Convention::SeasonEpisode)
}

/// `1x05` in the filename, show from the prefix.
pub(crate) fn cross_notation(parts: &PathParts) -> Option<ParsedFilename> {
    let caps = RE_CROSS.captures(parts.stem)?;
    let marker = Marker {
        season: caps[1].parse().ok(),
        episode: caps[2].parse().ok()?,
        start: caps.get(0)?.start(),
        end: caps.get(2)?.end(),
    };
    let prefix = &parts.stem[..marker.start];

    let show = show_from_prefix(parts, prefix).or_else(|| show_from_dir(parts))?;
    let title = episode_title(parts.stem, marker.end);
    build(show, marker.season?, marker.episode, title, Convention::CrossNotation)
}
