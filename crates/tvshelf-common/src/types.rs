//! Enums shared by the scanner, the store and the HTTP surface.
//!
//! Every enum has a stable lowercase string form used both for the database
//! columns and for JSON. `ScanStatus` is the exception: it is upper-case.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of scan requested by a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    /// Parse and resolve every discovered file.
    #[default]
    Full,
    /// Skip files whose stored size and modification time are unchanged.
    Incremental,
}

impl fmt::Display for ScanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

impl std::str::FromStr for ScanType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "incremental" => Ok(Self::Incremental),
            _ => Err(format!("Invalid scan type: {}", s)),
        }
    }
}

/// Persisted status of a scan. Terminal once it leaves `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(format!("Invalid scan status: {}", s)),
        }
    }
}

/// Phase of a live scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    Discovering,
    Parsing,
    Saving,
    Cleanup,
    Complete,
    Failed,
    Cancelled,
}

impl ScanPhase {
    /// Whether no further transitions can happen from this phase.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Discovering => "discovering",
            Self::Parsing => "parsing",
            Self::Saving => "saving",
            Self::Cleanup => "cleanup",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// A recoverable error recorded during a scan.
///
/// Accumulated in order, surfaced in live progress and persisted as JSON on
/// the scan history row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanError {
    pub phase: ScanPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub message: String,
}

impl ScanError {
    pub fn new(
        phase: ScanPhase,
        file_path: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            phase,
            file_path,
            message: message.into(),
        }
    }

    /// An error tied to one file.
    pub fn for_file(
        phase: ScanPhase,
        file_path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(phase, Some(file_path.into()), message)
    }

    /// A scan-level error with no file attached.
    pub fn fatal(phase: ScanPhase, message: impl Into<String>) -> Self {
        Self::new(phase, None, message)
    }
}

/// Quality marker of an episode file. New files start unverified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileQuality {
    #[default]
    Unverified,
    Verified,
    Broken,
}

impl fmt::Display for FileQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unverified => write!(f, "unverified"),
            Self::Verified => write!(f, "verified"),
            Self::Broken => write!(f, "broken"),
        }
    }
}

impl std::str::FromStr for FileQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unverified" => Ok(Self::Unverified),
            "verified" => Ok(Self::Verified),
            "broken" => Ok(Self::Broken),
            _ => Err(format!("Invalid file quality: {}", s)),
        }
    }
}

/// Follow-up action marker of an episode file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileAction {
    #[default]
    NeedsReview,
    Keep,
    Replace,
    /// The file disappeared from disk.
    Missing,
}

impl fmt::Display for FileAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedsReview => write!(f, "needs_review"),
            Self::Keep => write!(f, "keep"),
            Self::Replace => write!(f, "replace"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

impl std::str::FromStr for FileAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "needs_review" => Ok(Self::NeedsReview),
            "keep" => Ok(Self::Keep),
            "replace" => Ok(Self::Replace),
            "missing" => Ok(Self::Missing),
            _ => Err(format!("Invalid file action: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_status_serialization() {
        let json = serde_json::to_string(&ScanStatus::Running).unwrap();
        assert_eq!(json, "\"RUNNING\"");
        let back: ScanStatus = serde_json::from_str("\"FAILED\"").unwrap();
        assert_eq!(back, ScanStatus::Failed);
    }

    #[test]
    fn test_scan_status_terminal() {
        assert!(!ScanStatus::Running.is_terminal());
        assert!(ScanStatus::Completed.is_terminal());
        assert!(ScanStatus::Failed.is_terminal());
    }

    #[test]
    fn test_scan_type_parse() {
        assert_eq!("incremental".parse::<ScanType>().unwrap(), ScanType::Incremental);
        assert!("partial".parse::<ScanType>().is_err());
        assert_eq!(ScanType::default(), ScanType::Full);
    }

    #[test]
    fn test_phase_display_matches_serde() {
        for phase in [
            ScanPhase::Discovering,
            ScanPhase::Parsing,
            ScanPhase::Saving,
            ScanPhase::Cleanup,
            ScanPhase::Complete,
            ScanPhase::Failed,
            ScanPhase::Cancelled,
        ] {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{}\"", phase));
        }
    }

    #[test]
    fn test_file_action_roundtrip() {
        for action in [
            FileAction::NeedsReview,
            FileAction::Keep,
            FileAction::Replace,
            FileAction::Missing,
        ] {
            assert_eq!(action.to_string().parse::<FileAction>().unwrap(), action);
        }
        assert_eq!(FileQuality::default().to_string(), "unverified");
    }

    #[test]
    fn test_scan_error_json_omits_missing_path() {
        let err = ScanError::fatal(ScanPhase::Discovering, "Media path does not exist");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["phase"], "discovering");
        assert!(json.get("file_path").is_none());

        let err = ScanError::for_file(ScanPhase::Parsing, "/tv/x.mkv", "unrecognized");
        let back: ScanError = serde_json::from_value(serde_json::to_value(&err).unwrap()).unwrap();
        assert_eq!(back, err);
    }
}
