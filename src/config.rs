//! Configuration management
//!
//! Settings come from an optional TOML file and from environment variables.
//! Credentials and the metrics sink are only read from the environment, and
//! environment values always win over the file.

use crate::error::{ModemError, Result};
use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEM_ADDRESS: &str = "https://192.168.100.1/HNAP1/";
pub const DEFAULT_LOG_FILE_NAME: &str = "modem_logs.txt";

/// Resolved runtime configuration, passed explicitly to every command
#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub modem_address: String,
    pub log_file: PathBuf,
    pub debug: bool,
    pub poll_interval: u64,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    /// Settings file the values were read from, if any
    pub source: Option<PathBuf>,
    /// Settings that fell back to a built-in default
    pub defaults: Vec<String>,
}

/// Settings file layout
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub modem: ModemConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub poll: PollConfig,

    #[serde(skip)]
    pub source: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModemConfig {
    /// HNAP endpoint of the modem
    pub address: Option<String>,

    /// Log file, or directory to place `modem_logs.txt` in
    pub log_destination: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollConfig {
    /// Seconds between polls in daemon mode
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
        }
    }
}

/// Connection settings for the InfluxDB v2 sink
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

// Default value functions
fn default_timeout() -> u64 {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_poll_interval() -> u64 {
    10
}

impl FileConfig {
    /// Load the settings file, or use defaults if none is found
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        let config_paths = vec![
            PathBuf::from("modem-logs.toml"),
            PathBuf::from("/etc/modem-logs/config.toml"),
            dirs::home_dir()
                .map(|h| h.join(".config/modem-logs/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.is_file() {
                return Self::read(path);
            }
        }

        Ok(Self::default())
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let mut file: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        file.source = Some(path.to_path_buf());
        Ok(file)
    }
}

impl Config {
    /// Resolve the configuration from the process environment
    pub fn from_env(file: FileConfig) -> Result<Self> {
        Self::from_lookup(file, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(file: FileConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = require(&lookup, "MODEM_USERNAME")?;
        let password = require(&lookup, "MODEM_PASSWORD")?;
        let debug = lookup("MODEM_DEBUG").is_some();
        let mut defaults = Vec::new();

        let modem_address = lookup("MODEM_ADDRESS")
            .or(file.modem.address)
            .unwrap_or_else(|| {
                defaults.push(format!(
                    "MODEM_ADDRESS not set, using default: {}",
                    DEFAULT_MODEM_ADDRESS
                ));
                DEFAULT_MODEM_ADDRESS.to_string()
            });

        let destination = lookup("MODEM_LOG_DESTINATION")
            .or(file.modem.log_destination)
            .unwrap_or_else(|| {
                defaults.push(
                    "MODEM_LOG_DESTINATION not set, using the current directory".to_string(),
                );
                ".".to_string()
            });
        let log_file = resolve_log_file(Path::new(&destination));

        let poll_interval = match lookup("MODEM_POLL_INTERVAL") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ModemError::Config(format!(
                    "MODEM_POLL_INTERVAL must be a number of seconds, got '{}'",
                    raw
                ))
            })?,
            None => file.poll.interval,
        };

        Ok(Self {
            username,
            password,
            modem_address,
            log_file,
            debug,
            poll_interval,
            http: file.http,
            logging: file.logging,
            source: file.source,
            defaults,
        })
    }

    /// Report where the settings came from; call once logging is up
    pub fn log_sources(&self) {
        match &self.source {
            Some(path) => tracing::debug!("Loaded config from: {}", path.display()),
            None => tracing::debug!("No config file found, using defaults"),
        }
        for note in &self.defaults {
            tracing::debug!("{}", note);
        }
        tracing::debug!("Log file: {}", self.log_file.display());
    }

    /// Level used when RUST_LOG is not set
    pub fn log_level(&self) -> &str {
        if self.debug {
            "debug"
        } else {
            &self.logging.level
        }
    }
}

impl InfluxConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            url: require(&lookup, "INFLUX_URL")?,
            token: require(&lookup, "INFLUX_TOKEN")?,
            org: require(&lookup, "INFLUX_ORG")?,
            bucket: require(&lookup, "INFLUX_BUCKET")?,
        })
    }
}

fn require<F>(lookup: &F, name: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).ok_or_else(|| ModemError::Config(format!("Must set {} env variable", name)))
}

/// A directory destination gets the default file name inside it
fn resolve_log_file(destination: &Path) -> PathBuf {
    if destination.is_dir() {
        destination.join(DEFAULT_LOG_FILE_NAME)
    } else {
        destination.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const CREDS: [(&str, &str); 2] = [("MODEM_USERNAME", "admin"), ("MODEM_PASSWORD", "pw")];

    #[test]
    fn test_defaults() {
        let cfg = Config::from_lookup(FileConfig::default(), lookup(&CREDS)).unwrap();

        assert_eq!(cfg.username, "admin");
        assert_eq!(cfg.modem_address, DEFAULT_MODEM_ADDRESS);
        assert_eq!(cfg.log_file, Path::new(".").join(DEFAULT_LOG_FILE_NAME));
        assert_eq!(cfg.poll_interval, 10);
        assert!(!cfg.debug);
        assert_eq!(cfg.log_level(), "info");
        assert!(cfg.source.is_none());
        assert_eq!(cfg.defaults.len(), 2);
        assert!(cfg.defaults[0].contains("MODEM_ADDRESS"));
        assert!(cfg.defaults[1].contains("MODEM_LOG_DESTINATION"));
    }

    #[test]
    fn test_no_defaults_recorded_when_everything_is_set() {
        let mut vars = CREDS.to_vec();
        vars.push(("MODEM_ADDRESS", "https://192.168.0.1/HNAP1/"));
        vars.push(("MODEM_LOG_DESTINATION", "/var/log/modem.txt"));
        let cfg = Config::from_lookup(FileConfig::default(), lookup(&vars)).unwrap();
        assert!(cfg.defaults.is_empty());
    }

    #[test]
    fn test_load_records_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[poll]\ninterval = 30\n").unwrap();

        let file = FileConfig::load(Some(&path)).unwrap();
        assert_eq!(file.poll.interval, 30);
        assert_eq!(file.source.as_deref(), Some(path.as_path()));

        let cfg = Config::from_lookup(file, lookup(&CREDS)).unwrap();
        assert_eq!(cfg.source, Some(path));
    }

    #[test]
    fn test_missing_password_names_variable() {
        let err = Config::from_lookup(FileConfig::default(), lookup(&[("MODEM_USERNAME", "admin")]))
            .unwrap_err();
        assert!(matches!(err, ModemError::Config(_)));
        assert!(err.to_string().contains("MODEM_PASSWORD"));
    }

    #[test]
    fn test_env_overrides_file() {
        let file: FileConfig = toml::from_str(
            r#"
            [modem]
            address = "https://10.0.0.1/HNAP1/"
            log_destination = "/var/log/modem.txt"

            [poll]
            interval = 60

            [logging]
            level = "warn"
            "#,
        )
        .unwrap();

        let mut vars = CREDS.to_vec();
        vars.push(("MODEM_ADDRESS", "https://192.168.0.1/HNAP1/"));
        vars.push(("MODEM_DEBUG", ""));
        let cfg = Config::from_lookup(file, lookup(&vars)).unwrap();

        assert_eq!(cfg.modem_address, "https://192.168.0.1/HNAP1/");
        assert_eq!(cfg.log_file, PathBuf::from("/var/log/modem.txt"));
        assert_eq!(cfg.poll_interval, 60);
        assert!(cfg.debug);
        assert_eq!(cfg.log_level(), "debug");
    }

    #[test]
    fn test_log_destination_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().to_string_lossy().into_owned();
        let mut vars: Vec<(&str, &str)> = CREDS.to_vec();
        vars.push(("MODEM_LOG_DESTINATION", dest.as_str()));

        let cfg = Config::from_lookup(FileConfig::default(), lookup(&vars)).unwrap();
        assert_eq!(cfg.log_file, dir.path().join(DEFAULT_LOG_FILE_NAME));
    }

    #[test]
    fn test_bad_poll_interval() {
        let mut vars = CREDS.to_vec();
        vars.push(("MODEM_POLL_INTERVAL", "soon"));
        let err = Config::from_lookup(FileConfig::default(), lookup(&vars)).unwrap_err();
        assert!(err.to_string().contains("MODEM_POLL_INTERVAL"));
    }

    #[test]
    fn test_influx_config() {
        let cfg = InfluxConfig::from_lookup(lookup(&[
            ("INFLUX_URL", "http://influx:8086"),
            ("INFLUX_TOKEN", "t"),
            ("INFLUX_ORG", "home"),
            ("INFLUX_BUCKET", "modem_stats"),
        ]))
        .unwrap();
        assert_eq!(cfg.bucket, "modem_stats");

        let err = InfluxConfig::from_lookup(lookup(&[("INFLUX_URL", "x")])).unwrap_err();
        assert!(err.to_string().contains("INFLUX_TOKEN"));
    }
}
