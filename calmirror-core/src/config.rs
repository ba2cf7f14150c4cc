//! Global calmirror configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::constants::{
    DEFAULT_ENROLLMENT_MARKER, DEFAULT_LOCK_TIMEOUT, DEFAULT_MAX_PAGES, DEFAULT_RETENTION_DAYS,
};
use crate::error::{MirrorError, MirrorResult};
use crate::provider::protocol::Params;
use crate::sync::SyncOptions;

static DEFAULT_PROVIDER: &str = "google";

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_enrollment_marker() -> String {
    DEFAULT_ENROLLMENT_MARKER.to_string()
}

fn default_retention_days() -> i64 {
    DEFAULT_RETENTION_DAYS
}

fn default_lock_timeout() -> String {
    humantime::format_duration(DEFAULT_LOCK_TIMEOUT).to_string()
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

/// Configuration at ~/.config/calmirror/config.toml
///
/// Every field can be overridden with a `CALMIRROR_<FIELD>` environment
/// variable, e.g. `CALMIRROR_LOCK_TIMEOUT=10s`.
#[derive(Deserialize, Clone, Debug)]
pub struct MirrorConfig {
    /// Name of the `calmirror-provider-<name>` binary to talk to.
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_enrollment_marker")]
    pub enrollment_marker: String,

    #[serde(default = "default_retention_days")]
    pub retention_days: i64,

    /// Human-readable duration, e.g. "3s" or "1m 30s".
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout: String,

    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Where the state file and lock file live. Defaults to the platform
    /// data directory.
    pub state_dir: Option<PathBuf>,

    /// Passed verbatim to the provider with every request.
    #[serde(default)]
    pub provider_config: Params,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        MirrorConfig {
            provider: default_provider(),
            enrollment_marker: default_enrollment_marker(),
            retention_days: default_retention_days(),
            lock_timeout: default_lock_timeout(),
            max_pages: default_max_pages(),
            state_dir: None,
            provider_config: Params::new(),
        }
    }
}

impl MirrorConfig {
    pub fn config_path() -> MirrorResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| MirrorError::Config("Could not determine config directory".into()))?
            .join("calmirror");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, writing a commented default file
    /// first if none exists.
    pub fn load() -> MirrorResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> MirrorResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("CALMIRROR")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| MirrorError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| MirrorError::Config(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> MirrorResult<()> {
        let contents = format!(
            "\
# calmirror configuration

# Provider binary (calmirror-provider-<name>) to use:
# provider = \"{DEFAULT_PROVIDER}\"

# Calendars whose description starts with this text receive copies of the
# primary calendar's events:
# enrollment_marker = \"{DEFAULT_ENROLLMENT_MARKER}\"

# Events older than this many days are not copied during a reset:
# retention_days = {DEFAULT_RETENTION_DAYS}

# How long a run waits for another run to finish:
# lock_timeout = \"{}\"

# Where sync state is kept:
# state_dir = \"~/.local/share/calmirror\"

# Settings passed to the provider:
# [provider_config]
# account = \"me@example.com\"
",
            default_lock_timeout()
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                MirrorError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| MirrorError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn lock_timeout(&self) -> MirrorResult<Duration> {
        humantime::parse_duration(&self.lock_timeout).map_err(|e| {
            MirrorError::Config(format!("Invalid lock_timeout '{}': {e}", self.lock_timeout))
        })
    }

    pub fn state_path(&self) -> MirrorResult<PathBuf> {
        match &self.state_dir {
            Some(dir) => Ok(PathBuf::from(
                shellexpand::tilde(&dir.to_string_lossy()).into_owned(),
            )),
            None => Ok(dirs::data_dir()
                .ok_or_else(|| MirrorError::Config("Could not determine data directory".into()))?
                .join("calmirror")),
        }
    }

    pub fn sync_options(&self) -> MirrorResult<SyncOptions> {
        if self.retention_days < 0 {
            return Err(MirrorError::Config(format!(
                "retention_days must not be negative (got {})",
                self.retention_days
            )));
        }

        Ok(SyncOptions {
            enrollment_marker: self.enrollment_marker.clone(),
            retention: chrono::Duration::days(self.retention_days),
            lock_timeout: self.lock_timeout()?,
            max_pages: self.max_pages.max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn load(contents: &str) -> MirrorConfig {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        MirrorConfig::load_from(&path).unwrap()
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = MirrorConfig::load_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.provider, "google");
        assert_eq!(config.enrollment_marker, DEFAULT_ENROLLMENT_MARKER);
        assert_eq!(config.lock_timeout().unwrap(), DEFAULT_LOCK_TIMEOUT);
        assert_eq!(config.max_pages, DEFAULT_MAX_PAGES);
    }

    #[test]
    fn test_default_file_is_all_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        MirrorConfig::create_default_config(&path).unwrap();

        let config = MirrorConfig::load_from(&path).unwrap();
        assert_eq!(config.retention_days, DEFAULT_RETENTION_DAYS);
        assert!(config.provider_config.is_empty());
    }

    #[test]
    fn test_values_and_provider_table() {
        let config = load(
            r#"
provider = "caldav"
enrollment_marker = "[mirror]"
retention_days = 30
lock_timeout = "1m 30s"
state_dir = "/var/lib/calmirror"

[provider_config]
account = "me@example.com"
"#,
        );

        let options = config.sync_options().unwrap();
        assert_eq!(options.enrollment_marker, "[mirror]");
        assert_eq!(options.retention, chrono::Duration::days(30));
        assert_eq!(options.lock_timeout, Duration::from_secs(90));
        assert_eq!(
            config.state_path().unwrap(),
            PathBuf::from("/var/lib/calmirror")
        );
        assert_eq!(
            config.provider_config.get("account"),
            Some(&json!("me@example.com"))
        );
    }

    #[test]
    fn test_invalid_lock_timeout_is_config_error() {
        let config = load("lock_timeout = \"soon\"\n");
        assert!(matches!(config.sync_options(), Err(MirrorError::Config(_))));
    }

    #[test]
    fn test_state_dir_expands_tilde() {
        let config = load("state_dir = \"~/mirror-state\"\n");
        let path = config.state_path().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.ends_with("mirror-state"));
    }
}
