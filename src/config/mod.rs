mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default search locations, first existing file wins.
const DEFAULT_PATHS: &[&str] = &[
    "./tvshelf.toml",
    "./config.toml",
    "~/.config/tvshelf/config.toml",
    "/etc/tvshelf/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    if config.database.path.is_relative() {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            config.database.path = dir.join(&config.database.path);
        }
    }
    for media_path in &mut config.library.media_paths {
        *media_path = expand(media_path);
    }

    Ok(config)
}

/// Load config from the given path, or the first default location that
/// exists, or fall back to built-in defaults.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    for path_str in DEFAULT_PATHS {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!(path = %path.display(), "Using config file");
            return load_config(path);
        }
    }

    Ok(Config::default())
}

fn expand(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}

/// Reject settings the scanner cannot run with.
fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }
    if config.scanner.batch_size == 0 {
        anyhow::bail!("scanner.batch_size must be at least 1");
    }
    if config.scanner.yield_interval == 0 {
        anyhow::bail!("scanner.yield_interval must be at least 1");
    }
    if config.scanner.probe_concurrency == 0 {
        anyhow::bail!("scanner.probe_concurrency must be at least 1");
    }
    if config.scanner.probe_timeout_secs == 0 {
        anyhow::bail!("scanner.probe_timeout_secs must be at least 1");
    }
    Ok(())
}

impl Config {
    /// Non-fatal problems worth reporting to the operator.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.library.media_paths.is_empty() {
            warnings.push(
                "No library.media_paths configured; scans will find nothing".to_string(),
            );
        }
        for path in &self.library.media_paths {
            if !path.exists() {
                warnings.push(format!("Media path does not exist: {}", path.display()));
            }
        }
        if let Some(ref ffprobe) = self.tools.ffprobe_path {
            if !ffprobe.exists() {
                warnings.push(format!(
                    "tools.ffprobe_path does not exist: {}",
                    ffprobe.display()
                ));
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.scanner.batch_size, 100);
        assert_eq!(config.scanner.yield_interval, 50);
        assert_eq!(config.scanner.probe_timeout_secs, 60);
        assert!(config.scanner.matching.use_folder_name);
        assert!(config.library.media_paths.is_empty());
    }

    #[test]
    fn test_full_config() {
        let file = write_config(
            r#"
[server]
host = "127.0.0.1"
port = 9000

[library]
media_paths = ["/media/TV Shows"]
extensions = ["mkv", "mp4"]

[scanner]
batch_size = 25
probe_timeout_secs = 5
skip_metadata = true

[scanner.matching]
year_tolerance = 1

[tools]
ffprobe_path = "/opt/ffmpeg/bin/ffprobe"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(
            config.library.media_paths,
            vec![PathBuf::from("/media/TV Shows")]
        );
        assert_eq!(config.library.extensions, vec!["mkv", "mp4"]);
        assert_eq!(config.scanner.batch_size, 25);
        assert_eq!(config.scanner.probe_timeout_secs, 5);
        assert!(config.scanner.skip_metadata);
        assert_eq!(config.scanner.matching.year_tolerance, 1);
        assert_eq!(
            config.tools.ffprobe_path,
            Some(PathBuf::from("/opt/ffmpeg/bin/ffprobe"))
        );
    }

    #[test]
    fn test_relative_db_path_resolves_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tvshelf.toml");
        std::fs::write(&path, "[database]\npath = \"data/library.db\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.database.path, dir.path().join("data/library.db"));
    }

    #[test]
    fn test_rejects_zero_values() {
        for bad in [
            "[server]\nport = 0\n",
            "[scanner]\nbatch_size = 0\n",
            "[scanner]\nyield_interval = 0\n",
            "[scanner]\nprobe_concurrency = 0\n",
            "[scanner]\nprobe_timeout_secs = 0\n",
        ] {
            let file = write_config(bad);
            assert!(load_config(file.path()).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[server\nport = ");
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_warnings() {
        let config = Config::default();
        assert_eq!(config.warnings().len(), 1);

        let mut config = Config::default();
        config.library.media_paths = vec![PathBuf::from("/definitely/not/here")];
        let warnings = config.warnings();
        assert!(warnings.iter().any(|w| w.contains("/definitely/not/here")));
    }
}
