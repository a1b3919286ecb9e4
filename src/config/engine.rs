//! Engine configuration loaded from YAML or TOML.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use crate::error::{DprofError, Result};

/// Upper bound for the post-commit settle delay.
pub const MAX_SETTLE_DELAY_MS: u64 = 10_000;

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting config format from extension");
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// What to do with a saved adapter whose device path is not live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedAdapterPolicy {
    /// Map it to the first enumerated live adapter and log a warning.
    #[default]
    FirstLive,
    /// Fail reconciliation with `IdentityMismatch`.
    Refuse,
}

/// Tunables of the display engine.
///
/// # Example TOML
///
/// ```toml
/// settle_delay_ms = 250
/// include_virtual = true
/// unmatched_adapter = "refuse"
/// database = "~/profiles/displays.db"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Pause after a topology commit before touching secondary state.
    pub settle_delay_ms: u64,
    /// Include head-mounted and virtual displays in queries.
    pub include_virtual: bool,
    pub unmatched_adapter: UnmatchedAdapterPolicy,
    /// Snapshot database location; the data directory default when absent.
    pub database: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: 100,
            include_virtual: true,
            unmatched_adapter: UnmatchedAdapterPolicy::default(),
            database: None,
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.settle_delay_ms > MAX_SETTLE_DELAY_MS {
            return Err(DprofError::ConfigInvalid(format!(
                "settle_delay_ms must be at most {MAX_SETTLE_DELAY_MS}, got {}",
                self.settle_delay_ms
            )));
        }
        Ok(())
    }

    /// Database path with `~` expanded.
    pub fn database_path(&self) -> Result<Option<PathBuf>> {
        self.database.as_deref().map(expand_home).transpose()
    }
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    let text = path.to_string_lossy();
    if text != "~" && !text.starts_with("~/") {
        return Ok(path.to_path_buf());
    }
    let home = dirs::home_dir().ok_or_else(|| {
        DprofError::ConfigInvalid("Could not determine home directory".to_string())
    })?;
    let rest = text.strip_prefix("~/").unwrap_or("");
    Ok(if rest.is_empty() { home } else { home.join(rest) })
}

/// Default config file location: `<config dir>/dprof/config.toml`.
pub fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or_else(|| {
        DprofError::Other("Could not determine configuration directory".to_string())
    })?;
    Ok(config_dir.join("dprof").join("config.toml"))
}

/// Load the engine configuration.
///
/// An explicit path must exist. Without one the default location is used,
/// and a missing default file yields the defaults.
#[instrument]
pub fn load_engine_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return load_config(path);
    }
    let path = default_config_path()?;
    if path.exists() {
        load_config(&path)
    } else {
        debug!(path = %path.display(), "No config file, using defaults");
        Ok(EngineConfig::default())
    }
}

/// Load a configuration file, detecting the format from its extension.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<EngineConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_extension(path).ok_or_else(|| {
        DprofError::ConfigParse(format!(
            "Unknown config format for '{}': expected .yaml, .yml, or .toml",
            path.display()
        ))
    })?;

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DprofError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            DprofError::Io(e)
        }
    })?;
    debug!(bytes = content.len(), format = ?format, "Read config file");

    load_config_from_str(&content, format)
}

/// Parse and validate a configuration string.
pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<EngineConfig> {
    let config: EngineConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| DprofError::ConfigParse(format!("YAML: {e}")))?,
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| DprofError::ConfigParse(format!("TOML: {e}")))?
        }
    };
    config.validate()?;
    info!(
        settle_delay_ms = config.settle_delay_ms,
        include_virtual = config.include_virtual,
        unmatched_adapter = ?config.unmatched_adapter,
        "Configuration loaded"
    );
    Ok(config)
}

/// Render a configuration as TOML.
pub fn to_toml(config: &EngineConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| DprofError::ConfigParse(format!("TOML: {e}")))
}
