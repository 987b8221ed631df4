//! Media file detection by extension.
//!
//! The scanner only considers files whose extension is on an allow-list.
//! Callers may pass their own list; an empty list means the built-in one.

use std::path::Path;

/// Built-in list of media file extensions considered by the scanner.
const MEDIA_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "ts", "m2ts", "webm", "mov", "wmv", "flv", "mpg", "mpeg",
];

/// Get the built-in list of media file extensions.
///
/// # Examples
///
/// ```
/// use tvshelf_common::paths::media_extensions;
///
/// assert!(media_extensions().contains(&"mkv"));
/// ```
pub fn media_extensions() -> &'static [&'static str] {
    MEDIA_EXTENSIONS
}

/// Check if a path has an allowed media extension.
///
/// Comparison is case-insensitive. Entries in `allowed` may carry a leading
/// dot. When `allowed` is empty the built-in list is used.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use tvshelf_common::paths::is_media_file;
///
/// assert!(is_media_file(Path::new("/tv/Show/S01E01.MKV"), &[]));
/// assert!(!is_media_file(Path::new("/tv/Show/S01E01.srt"), &[]));
/// assert!(is_media_file(Path::new("clip.rmvb"), &[".rmvb".to_string()]));
/// ```
pub fn is_media_file(path: &Path, allowed: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };
    let ext = ext.to_lowercase();

    if allowed.is_empty() {
        MEDIA_EXTENSIONS.contains(&ext.as_str())
    } else {
        allowed
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    }
}

/// Whether a file or directory name is hidden (dot-prefixed).
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}
