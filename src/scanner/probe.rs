//! Technical metadata probing.
//!
//! [`MediaProbe`] is the seam between the scanner and whatever extracts
//! container/codec details from a file. The default implementation shells
//! out to `ffprobe`.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command as StdCommand;
use tokio::process::Command;
use tvshelf_common::{Error, Result};
use tvshelf_db::models::MediaDetails;

#[async_trait]
pub trait MediaProbe: Send + Sync {
    /// Tool name, used in log lines and validation errors.
    fn name(&self) -> &str;

    /// Whether the probe can run on this host.
    fn is_available(&self) -> bool;

    async fn probe(&self, path: &Path) -> Result<MediaDetails>;
}

/// Probe backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    binary: PathBuf,
    configured: bool,
}

impl FfprobeProbe {
    /// Use `path` when given, otherwise look `ffprobe` up on `PATH`.
    pub fn new(path: Option<&Path>) -> Self {
        match path {
            Some(p) => Self {
                binary: p.to_path_buf(),
                configured: true,
            },
            None => Self {
                binary: PathBuf::from("ffprobe"),
                configured: false,
            },
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl MediaProbe for FfprobeProbe {
    fn name(&self) -> &str {
        "ffprobe"
    }

    fn is_available(&self) -> bool {
        if self.configured {
            self.binary.is_file()
        } else {
            which::which(&self.binary).is_ok()
        }
    }

    async fn probe(&self, path: &Path) -> Result<MediaDetails> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Error::tool("ffprobe", "executable not found")
                } else {
                    Error::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::tool("ffprobe", stderr.trim().to_string()));
        }

        parse_ffprobe_output(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Map ffprobe's JSON report onto [`MediaDetails`].
///
/// The first video and first audio stream win. The container is the first
/// entry of ffprobe's comma-separated `format_name`.
pub fn parse_ffprobe_output(json: &[u8]) -> Result<MediaDetails> {
    let output: FfprobeOutput = serde_json::from_slice(json)
        .map_err(|e| Error::tool("ffprobe", format!("unreadable output: {}", e)))?;

    let mut details = MediaDetails::default();
    if let Some(format) = output.format {
        details.container = format
            .format_name
            .as_deref()
            .and_then(|f| f.split(',').next())
            .map(String::from);
        details.duration_secs = format.duration.and_then(|d| d.parse().ok());
    }

    let video = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    if let Some(v) = video {
        details.video_codec = v.codec_name.clone();
        details.resolution_width = v.width;
        details.resolution_height = v.height;
    }
    details.audio_codec = output
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .and_then(|a| a.codec_name.clone());

    Ok(details)
}

/// Availability report for an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
}

/// Run `<binary> -version` and report what was found.
pub fn check_ffprobe(configured: Option<&Path>) -> ToolInfo {
    let binary = configured
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("ffprobe"));

    match StdCommand::new(&binary).arg("-version").output() {
        Ok(output) if output.status.success() => ToolInfo {
            name: "ffprobe".to_string(),
            available: true,
            version: String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(|s| s.to_string()),
            path: which::which(&binary).ok(),
        },
        _ => ToolInfo {
            name: "ffprobe".to_string(),
            available: false,
            version: None,
            path: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "hevc", "width": 1920, "height": 1080},
            {"index": 1, "codec_type": "audio", "codec_name": "eac3", "channels": 6},
            {"index": 2, "codec_type": "audio", "codec_name": "aac"},
            {"index": 3, "codec_type": "subtitle", "codec_name": "subrip"}
        ],
        "format": {
            "filename": "/tv/Firefly/S01E01.mkv",
            "format_name": "matroska,webm",
            "duration": "2584.123000",
            "size": "1234"
        }
    }"#;

    #[test]
    fn test_parse_ffprobe_output() {
        let d = parse_ffprobe_output(SAMPLE.as_bytes()).unwrap();
        assert_eq!(d.container.as_deref(), Some("matroska"));
        assert_eq!(d.video_codec.as_deref(), Some("hevc"));
        assert_eq!(d.audio_codec.as_deref(), Some("eac3"));
        assert_eq!(d.resolution_width, Some(1920));
        assert_eq!(d.resolution_height, Some(1080));
        assert!((d.duration_secs.unwrap() - 2584.123).abs() < 1e-6);
    }

    #[test]
    fn test_parse_audio_only() {
        let d = parse_ffprobe_output(
            br#"{"streams":[{"codec_type":"audio","codec_name":"flac"}],"format":{"format_name":"flac"}}"#,
        )
        .unwrap();
        assert_eq!(d.container.as_deref(), Some("flac"));
        assert_eq!(d.video_codec, None);
        assert_eq!(d.resolution_width, None);
        assert_eq!(d.duration_secs, None);
    }

    #[test]
    fn test_parse_garbage_is_tool_error() {
        let err = parse_ffprobe_output(b"not json").unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
    }

    #[test]
    fn test_configured_missing_binary_is_unavailable() {
        let probe = FfprobeProbe::new(Some(Path::new("/definitely/not/ffprobe")));
        assert!(!probe.is_available());
        assert!(!check_ffprobe(Some(Path::new("/definitely/not/ffprobe"))).available);
    }

    #[tokio::test]
    async fn test_probe_with_missing_binary_fails() {
        let probe = FfprobeProbe::new(Some(Path::new("/definitely/not/ffprobe")));
        let err = probe.probe(Path::new("/tv/a.mkv")).await.unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
    }
}
