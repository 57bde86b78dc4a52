use std::{env, fmt, fs, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitoring::history::DEFAULT_HISTORY_LEN;
use crate::validation::TargetPolicy;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "SITEPULSE_CONFIG";

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to read config file {0}: {1}")]
    ReadFailed(path::PathBuf, #[source] std::io::Error),

    #[error("Failed to write config file {0}: {1}")]
    WriteFailed(path::PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("No config path available: neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub probe: ProbeConfig,
    pub scheduler: SchedulerConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Wall-clock bound on one check
    pub timeout_ms: u64,
    /// Latency samples kept per site
    pub history_len: usize,
    pub user_agent: String,
    /// Allow loopback/private hosts as probe targets
    pub allow_private_targets: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
    /// Sites checked at the same time during a sweep
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Libsql,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    /// LibSQL database file
    pub path: String,
    pub pool_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8080 }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            history_len: DEFAULT_HISTORY_LEN,
            user_agent: concat!("sitepulse/", env!("CARGO_PKG_VERSION")).into(),
            allow_private_targets: true,
        }
    }
}

impl ProbeConfig {
    pub fn target_policy(&self) -> TargetPolicy {
        TargetPolicy { allow_private_targets: self.allow_private_targets }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true, interval_seconds: 300, concurrency: 10 }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { backend: DatabaseBackend::Libsql, path: "sitepulse.db".into(), pool_size: 8 }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseBackend::Memory => f.write_str("memory"),
            DatabaseBackend::Libsql => f.write_str("libsql"),
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/sitepulse/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Some(config_home) = env::var_os("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::var_os("HOME") {
        path::PathBuf::from(home_dir).join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("sitepulse/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Configuration State:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Probe")?;
        write_1(f, "Timeout (ms)", &self.probe.timeout_ms)?;
        write_1(f, "History Length", &self.probe.history_len)?;
        write_1(f, "User Agent", &self.probe.user_agent)?;
        write_1(f, "Allow Private Targets", &self.probe.allow_private_targets)?;
        write_title_1(f, "Scheduler")?;
        write_1(f, "Enabled", &self.scheduler.enabled)?;
        write_1(f, "Interval (s)", &self.scheduler.interval_seconds)?;
        write_1(f, "Concurrency", &self.scheduler.concurrency)?;
        write_title_1(f, "Database")?;
        write_1(f, "Backend", &self.database.backend)?;
        write_1(f, "Path", &self.database.path)?;
        write_1(f, "Pool Size", &self.database.pool_size)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/sitepulse/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```rust,no_run
    /// use sitepulse_service::config;
    /// let cfg = config::Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), config::Error>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            normalize_toml_path(path::Path::new(&path))
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|err| Error::ReadFailed(config_path.clone(), err))?;
            Self::from_toml(&raw_string)?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            tracing::info!(path = %config_path.display(), "Wrote default configuration");
            config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, Error> {
        Ok(toml::from_str(raw)?)
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| Error::WriteFailed(parent.to_path_buf(), err))?;
        }

        fs::write(path, config_str).map_err(|err| Error::WriteFailed(path.to_path_buf(), err))
    }

    /// Reject values the probe and scheduler would refuse at runtime
    pub fn validate(&self) -> Result<(), Error> {
        crate::validation::validate_timeout_ms(self.probe.timeout_ms)
            .map_err(|e| Error::Invalid(e.to_string()))?;
        crate::monitoring::scheduler::validate_interval(self.scheduler.interval_seconds)
            .map_err(|e| Error::Invalid(e.to_string()))?;

        if self.scheduler.concurrency == 0 {
            return Err(Error::Invalid("scheduler.concurrency must be at least 1".into()));
        }
        if self.database.backend == DatabaseBackend::Libsql && self.database.path.trim().is_empty() {
            return Err(Error::Invalid("database.path is required for the libsql backend".into()));
        }

        Ok(())
    }
}
