//! Parse result types.

/// Naming convention that produced a parse result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Convention {
    /// `Show (YYYY)/Season NN/...`
    DirectoryStructure,
    /// `S01E05` anywhere in the filename.
    SeasonEpisode,
    /// `1x05` in the filename.
    CrossNotation,
}

/// Structured identifiers recovered from an episode path.
///
/// Invariants: `episode_number >= 1`, `show_name` is non-empty and
/// normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedFilename {
    pub show_name: String,
    /// Raw name of the directory the show name was taken from, if any.
    pub folder_name: Option<String>,
    pub season_number: u32,
    pub episode_number: u32,
    pub episode_title: Option<String>,
    pub year: Option<i32>,
    pub convention: Convention,
}
