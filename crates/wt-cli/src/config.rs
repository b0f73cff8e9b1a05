//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use wt_core::{ReconstructOptions, TimeBase, TimeBaseError};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// IANA timezone for local days. Defaults to the host zone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,

    /// Synthesize an end for a shift that is still open.
    pub auto_close: bool,

    /// Bound a synthesized end to the local day of its IN.
    pub auto_close_at_day_end: bool,

    /// Number of audit entries retained.
    pub audit_capacity: usize,

    /// Name recorded as the actor of audited actions.
    pub operator: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("timezone", &self.timezone)
            .field("auto_close", &self.auto_close)
            .field("auto_close_at_day_end", &self.auto_close_at_day_end)
            .field("audit_capacity", &self.audit_capacity)
            .finish_non_exhaustive()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let options = ReconstructOptions::default();
        Self {
            database_path: data_dir.join("wt.db"),
            timezone: None,
            auto_close: options.auto_close,
            auto_close_at_day_end: options.auto_close_at_day_end,
            audit_capacity: wt_db::DEFAULT_AUDIT_CAPACITY,
            operator: "admin".to_string(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (WT_*)
        figment = figment.merge(Env::prefixed("WT_"));

        figment.extract()
    }

    /// The configured timezone name, else the host zone, else UTC.
    pub fn timezone_name(&self) -> String {
        self.timezone
            .clone()
            .filter(|tz| !tz.trim().is_empty())
            .or_else(|| iana_time_zone::get_timezone().ok())
            .unwrap_or_else(|| "UTC".to_string())
    }

    pub fn timebase(&self) -> Result<TimeBase, TimeBaseError> {
        TimeBase::from_name(&self.timezone_name())
    }

    pub const fn reconstruct_options(&self) -> ReconstructOptions {
        ReconstructOptions {
            auto_close: self.auto_close,
            auto_close_at_day_end: self.auto_close_at_day_end,
        }
    }
}

/// Returns the platform-specific config directory for wt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("wt"))
}

/// Returns the platform-specific data directory for wt.
///
/// On Linux: `~/.local/share/wt`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("wt"))
}
