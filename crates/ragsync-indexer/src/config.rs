//! Watcher configuration, built once at startup and passed by value

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use derive_setters::Setters;
use ragsync_domain::DEFAULT_CHUNK_SIZE;
use tracing::{info, warn};

use crate::watcher::ChangeFilter;
use crate::{Result, SyncError};

pub const DEFAULT_CONFIG_FILE: &str = "ragconfig.yml";
pub const DEFAULT_EMBED_SERVER_URL: &str = "http://server:8000/embed";
pub const DEFAULT_PROJECT: &str = "default";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_EMBED_CONCURRENCY: usize = 4;

/// Everything the watcher needs to run.
#[derive(Debug, Clone, PartialEq, Setters)]
#[setters(into)]
pub struct WatcherConfig {
    /// Root of the watched tree; index paths are relative to it
    pub watch_dir: PathBuf,
    /// Project tag stored with every chunk
    pub project: String,
    /// Ingestion endpoint, e.g. `http://server:8000/embed`
    pub embed_server_url: String,
    /// Allowed file suffixes, normalised to start with `.`
    pub watch_extensions: Vec<String>,
    /// Any path containing one of these substrings is ignored
    pub ignore_dirs: Vec<String>,
    /// Lines per chunk
    pub chunk_size: NonZeroUsize,
    /// Upper bound on each ingestion request
    pub request_timeout: Duration,
    /// How many embed requests one file sync keeps in flight
    pub embed_concurrency: usize,
    /// Sync every eligible file once before watching
    pub initial_sync: bool,
}

impl WatcherConfig {
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
            project: DEFAULT_PROJECT.to_string(),
            embed_server_url: DEFAULT_EMBED_SERVER_URL.to_string(),
            watch_extensions: Vec::new(),
            ignore_dirs: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            embed_concurrency: DEFAULT_EMBED_CONCURRENCY,
            initial_sync: false,
        }
    }

    /// Load from a YAML file layered under the process environment
    /// (`WATCH_DIR`, `PROJECT_NAME`, `EMBED_SERVER_URL`).
    pub fn load(path: &Path) -> Result<Self> {
        Self::from_sources(path, None)
    }

    /// Load from a YAML file layered under `env`, or under the process
    /// environment when `env` is `None`.
    pub fn from_sources(path: &Path, env: Option<HashMap<String, String>>) -> Result<Self> {
        if !path.exists() {
            return Err(SyncError::configuration(
                "config_file",
                format!("Config file not found: {}", path.display()),
            ));
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml).required(true))
            .add_source(Environment::default().source(env))
            .build()
            .map_err(|e| {
                SyncError::configuration_with_source(
                    "config_file",
                    format!("Could not load {}", path.display()),
                    e,
                )
            })?;

        Self::from_settings(&settings)
    }

    fn from_settings(settings: &Config) -> Result<Self> {
        let watch_dir = match settings.get_string("watch_dir") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => return Err(SyncError::configuration("WATCH_DIR", "WATCH_DIR is not set")),
        };

        let mut config = Self::new(watch_dir);

        if let Ok(project) = settings.get_string("project_name") {
            config.project = project;
        }
        if let Ok(url) = settings.get_string("embed_server_url") {
            config.embed_server_url = url;
        }

        config.watch_extensions = string_list(settings, "watch_extensions")?
            .into_iter()
            .map(normalize_extension)
            .collect();
        config.ignore_dirs = string_list(settings, "ignore_dirs")?;
        config.chunk_size = chunk_size(settings);

        if let Ok(secs) = settings.get_int("request_timeout_secs") {
            match u64::try_from(secs) {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => warn!(value = secs, "Ignoring non-positive request_timeout_secs"),
            }
        }
        if let Ok(n) = settings.get_int("embed_concurrency") {
            match usize::try_from(n) {
                Ok(n) if n > 0 => config.embed_concurrency = n,
                _ => warn!(value = n, "Ignoring non-positive embed_concurrency"),
            }
        }
        if let Ok(initial_sync) = settings.get_bool("initial_sync") {
            config.initial_sync = initial_sync;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the invariants the watcher relies on. Called by the loaders and
    /// again after CLI overrides are applied.
    pub fn validate(&self) -> Result<()> {
        if !self.watch_dir.exists() {
            return Err(SyncError::configuration(
                "WATCH_DIR",
                format!("Watch directory does not exist: {}", self.watch_dir.display()),
            ));
        }
        if !self.watch_dir.is_dir() {
            return Err(SyncError::configuration(
                "WATCH_DIR",
                format!("Watch path is not a directory: {}", self.watch_dir.display()),
            ));
        }
        if self.embed_concurrency == 0 {
            return Err(SyncError::configuration("embed_concurrency", "must be at least 1"));
        }
        if self.watch_extensions.is_empty() {
            warn!("No watch_extensions configured, no file will be indexed");
        }

        info!(
            watch_dir = %self.watch_dir.display(),
            project = %self.project,
            endpoint = %self.embed_server_url,
            chunk_size = self.chunk_size.get(),
            extensions = ?self.watch_extensions,
            ignore_dirs = ?self.ignore_dirs,
            "Watcher configuration loaded"
        );
        Ok(())
    }

    pub fn change_filter(&self) -> ChangeFilter {
        ChangeFilter::new(self.watch_extensions.clone(), self.ignore_dirs.clone())
    }
}

fn string_list(settings: &Config, key: &str) -> Result<Vec<String>> {
    match settings.get_array(key) {
        Ok(values) => values
            .into_iter()
            .map(|value| {
                value.into_string().map_err(|e| {
                    SyncError::configuration_with_source(key, "expected a list of strings", e)
                })
            })
            .collect(),
        Err(ConfigError::NotFound(_)) => Ok(Vec::new()),
        Err(e) => Err(SyncError::configuration_with_source(key, "expected a list of strings", e)),
    }
}

/// A missing chunk size uses the default; a malformed one is reported and
/// also falls back to the default instead of aborting startup.
fn chunk_size(settings: &Config) -> NonZeroUsize {
    match settings.get_int("chunk_size") {
        Ok(n) => match usize::try_from(n).ok().and_then(NonZeroUsize::new) {
            Some(size) => size,
            None => {
                warn!(value = n, fallback = DEFAULT_CHUNK_SIZE.get(), "Invalid chunk_size");
                DEFAULT_CHUNK_SIZE
            }
        },
        Err(ConfigError::NotFound(_)) => DEFAULT_CHUNK_SIZE,
        Err(e) => {
            warn!(error = %e, fallback = DEFAULT_CHUNK_SIZE.get(), "Malformed chunk_size");
            DEFAULT_CHUNK_SIZE
        }
    }
}

fn normalize_extension(ext: String) -> String {
    if ext.starts_with('.') { ext } else { format!(".{ext}") }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    const FIXTURE_YAML: &str = "\
watch_extensions:
  - .py
  - txt
ignore_dirs:
  - __pycache__
chunk_size: 2
";

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, body).unwrap();
        path
    }

    fn env(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
        Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }

    #[test]
    fn test_load_config_success() {
        let fixture = TempDir::new().unwrap();
        let config_path = write_config(&fixture, FIXTURE_YAML);
        let watch_dir = fixture.path().to_string_lossy().to_string();

        let actual = WatcherConfig::from_sources(
            &config_path,
            env(&[("WATCH_DIR", &watch_dir), ("PROJECT_NAME", "proj1")]),
        )
        .unwrap();

        let expected = WatcherConfig::new(fixture.path())
            .project("proj1")
            .watch_extensions(vec![".py".to_string(), ".txt".to_string()])
            .ignore_dirs(vec!["__pycache__".to_string()])
            .chunk_size(NonZeroUsize::new(2).unwrap());
        assert_eq!(actual, expected);
        assert_eq!(actual.embed_server_url, "http://server:8000/embed");
    }

    #[test]
    fn test_load_config_missing_watch_dir() {
        let fixture = TempDir::new().unwrap();
        let config_path = write_config(&fixture, "watch_extensions: []\n");

        let actual = WatcherConfig::from_sources(&config_path, env(&[("WATCH_DIR", "")]))
            .unwrap_err()
            .to_string();

        assert!(actual.contains("WATCH_DIR is not set"), "{actual}");
    }

    #[test]
    fn test_load_config_watch_dir_not_exists() {
        let fixture = TempDir::new().unwrap();
        let config_path = write_config(&fixture, "watch_extensions: []\n");

        let actual = WatcherConfig::from_sources(&config_path, env(&[("WATCH_DIR", "/not/exist")]))
            .unwrap_err()
            .to_string();

        assert!(actual.contains("does not exist"), "{actual}");
    }

    #[test]
    fn test_load_config_bad_yaml() {
        let fixture = TempDir::new().unwrap();
        let config_path = write_config(&fixture, "watch_extensions: [\n  - : :\n");
        let watch_dir = fixture.path().to_string_lossy().to_string();

        let actual = WatcherConfig::from_sources(&config_path, env(&[("WATCH_DIR", &watch_dir)]))
            .unwrap_err()
            .to_string();

        assert!(actual.contains("Could not load"), "{actual}");
    }

    #[test]
    fn test_load_config_missing_file() {
        let fixture = TempDir::new().unwrap();
        let actual = WatcherConfig::from_sources(&fixture.path().join("nope.yml"), env(&[]))
            .unwrap_err()
            .to_string();

        assert!(actual.contains("Config file not found"), "{actual}");
    }

    #[test]
    fn test_malformed_chunk_size_falls_back() {
        let fixture = TempDir::new().unwrap();
        let watch_dir = fixture.path().to_string_lossy().to_string();

        for body in ["chunk_size: lots\n", "chunk_size: 0\n", "chunk_size: -4\n"] {
            let config_path = write_config(&fixture, body);
            let actual =
                WatcherConfig::from_sources(&config_path, env(&[("WATCH_DIR", &watch_dir)]))
                    .unwrap()
                    .chunk_size;
            assert_eq!(actual, DEFAULT_CHUNK_SIZE, "{body}");
        }
    }

    #[test]
    fn test_env_overrides_file() {
        let fixture = TempDir::new().unwrap();
        let watch_dir = fixture.path().to_string_lossy().to_string();
        let config_path = write_config(
            &fixture,
            "project_name: from-file\nembed_server_url: http://file/embed\n",
        );

        let actual = WatcherConfig::from_sources(
            &config_path,
            env(&[
                ("WATCH_DIR", &watch_dir),
                ("PROJECT_NAME", "from-env"),
                ("EMBED_SERVER_URL", "http://env/embed"),
            ]),
        )
        .unwrap();

        assert_eq!(actual.project, "from-env");
        assert_eq!(actual.embed_server_url, "http://env/embed");
    }
}
