//! Show/season/episode resolution.
//!
//! Turns a parsed filename into the ids of its show, season and episode,
//! reusing cached entities and creating missing ones. Runs inside the
//! caller's batch transaction.

use rusqlite::Connection;
use tvshelf_common::{EpisodeId, Result, SeasonId, ShowId};
use tvshelf_db::queries::{episodes, seasons, shows};
use tvshelf_parser::{show_name_match_key, ParsedFilename};

use super::cache::{CachedEpisode, CachedShow, HierarchyCache};
use crate::config::MatchPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEpisode {
    pub show_id: ShowId,
    pub season_id: SeasonId,
    pub episode_id: EpisodeId,
}

pub fn resolve(
    conn: &Connection,
    cache: &mut HierarchyCache,
    parsed: &ParsedFilename,
    policy: &MatchPolicy,
) -> Result<ResolvedEpisode> {
    let show_id = resolve_show(conn, cache, parsed, policy)?;
    let season_id = resolve_season(conn, cache, show_id, parsed.season_number)?;
    let episode_id = resolve_episode(conn, cache, season_id, parsed)?;
    Ok(ResolvedEpisode {
        show_id,
        season_id,
        episode_id,
    })
}

/// Find the cached show a parse belongs to.
///
/// Folder name wins when enabled. Otherwise shows are matched on their
/// normalized title; among several, an exact year match is preferred, then
/// the closest year within `year_tolerance`, then the first one seen.
pub fn match_show<'a>(
    cache: &'a HierarchyCache,
    parsed: &ParsedFilename,
    policy: &MatchPolicy,
) -> Option<&'a CachedShow> {
    if policy.use_folder_name {
        if let Some(show) = parsed
            .folder_name
            .as_deref()
            .and_then(|folder| cache.show_by_folder(folder))
        {
            return Some(show);
        }
    }

    let candidates = cache.shows_by_key(&show_name_match_key(&parsed.show_name));
    if candidates.len() <= 1 {
        return candidates.into_iter().next();
    }

    let Some(year) = parsed.year else {
        return candidates.into_iter().next();
    };

    candidates
        .iter()
        .find(|s| s.year == Some(year))
        .or_else(|| {
            candidates
                .iter()
                .filter_map(|s| s.year.map(|y| (y.abs_diff(year), s)))
                .filter(|(diff, _)| *diff <= policy.year_tolerance)
                .min_by_key(|(diff, _)| *diff)
                .map(|(_, s)| s)
        })
        .or(candidates.first())
        .copied()
}

fn resolve_show(
    conn: &Connection,
    cache: &mut HierarchyCache,
    parsed: &ParsedFilename,
    policy: &MatchPolicy,
) -> Result<ShowId> {
    let Some(existing) = match_show(cache, parsed, policy).cloned() else {
        let show = shows::create_show(
            conn,
            &parsed.show_name,
            parsed.folder_name.as_deref(),
            parsed.year,
        )?;
        tracing::debug!(show = %show.title, id = %show.id, "Created show");
        cache.insert_show(CachedShow {
            id: show.id,
            title: show.title,
            folder_name: show.folder_name,
            year: show.year,
        });
        return Ok(show.id);
    };

    let folder = existing.folder_name.clone().or_else(|| parsed.folder_name.clone());
    let year = existing.year.or(parsed.year);
    if folder != existing.folder_name || year != existing.year {
        shows::backfill_show(conn, existing.id, parsed.folder_name.as_deref(), parsed.year)?;
        cache.update_show(CachedShow {
            folder_name: folder,
            year,
            ..existing.clone()
        });
    }
    Ok(existing.id)
}

fn resolve_season(
    conn: &Connection,
    cache: &mut HierarchyCache,
    show_id: ShowId,
    season_number: u32,
) -> Result<SeasonId> {
    if let Some(id) = cache.season(show_id, season_number) {
        return Ok(id);
    }
    let season = seasons::find_or_create_season(conn, show_id, season_number)?;
    cache.insert_season(show_id, season_number, season.id);
    Ok(season.id)
}

fn resolve_episode(
    conn: &Connection,
    cache: &mut HierarchyCache,
    season_id: SeasonId,
    parsed: &ParsedFilename,
) -> Result<EpisodeId> {
    let new_title = parsed.episode_title.as_deref().filter(|t| !t.trim().is_empty());

    let current = match cache.episode(season_id, parsed.episode_number) {
        Some(episode) => episode.clone(),
        None => {
            let episode = episodes::find_or_create_episode(
                conn,
                season_id,
                parsed.episode_number,
                new_title,
            )?;
            let cached = CachedEpisode {
                id: episode.id,
                title: episode.title,
            };
            cache.insert_episode(season_id, parsed.episode_number, cached.clone());
            cached
        }
    };

    if let Some(title) = new_title {
        if current.title.as_deref() != Some(title) {
            episodes::update_episode_title(conn, current.id, title)?;
            cache.insert_episode(
                season_id,
                parsed.episode_number,
                CachedEpisode {
                    id: current.id,
                    title: Some(title.to_string()),
                },
            );
        }
    }
    Ok(current.id)
}
