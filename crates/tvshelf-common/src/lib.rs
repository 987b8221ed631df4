//! tvshelf-common: shared types, constants, and utilities.
//!
//! This crate provides common functionality used across tvshelf:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for shows, seasons, episodes, files and scans
//! - **Core Types**: Scan type/status/phase enums and episode file markers
//! - **Path Utilities**: Media extension allow-list checks
//! - **Error Handling**: Common error types and result aliases
//!
//! # Examples
//!
//! ```
//! use tvshelf_common::{ShowId, ScanPhase, Error, Result};
//! use tvshelf_common::paths::is_media_file;
//! use std::path::Path;
//!
//! let show_id = ShowId::new();
//! assert_ne!(show_id, ShowId::new());
//!
//! assert_eq!(ScanPhase::Saving.to_string(), "saving");
//! assert!(is_media_file(Path::new("episode.mkv"), &[]));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("show"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
