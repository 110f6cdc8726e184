//! Configuration types for the DDNS system
//!
//! Settings are layered: built-in defaults, then an optional JSON config
//! file, then environment variables. The result is validated once, before
//! any network I/O happens.

use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main DDNS configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Provider access key ID
    #[serde(default)]
    pub access_key_id: String,

    /// Provider access key secret
    /// ⚠️ NEVER log this value
    #[serde(default)]
    pub access_key_secret: String,

    /// Domain the record lives in (e.g. "example.com")
    #[serde(default)]
    pub domain_name: String,

    /// Record label (e.g. "@", "www")
    #[serde(default = "default_rr")]
    pub rr: String,

    /// Record type (e.g. "A")
    #[serde(default = "default_record_type")]
    pub record_type: String,

    /// TTL written with every update, in seconds
    #[serde(default = "default_ttl", deserialize_with = "deserialize_ttl")]
    pub ttl: u32,

    /// Location of the local IP cache
    #[serde(default = "default_ip_file")]
    pub ip_file: PathBuf,

    /// Log verbosity
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Provider API endpoint host
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Perform lookups but skip record updates
    #[serde(default)]
    pub dry_run: bool,
}

// Custom Debug implementation that hides the access key secret
impl std::fmt::Debug for DdnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DdnsConfig")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("domain_name", &self.domain_name)
            .field("rr", &self.rr)
            .field("record_type", &self.record_type)
            .field("ttl", &self.ttl)
            .field("ip_file", &self.ip_file)
            .field("log_level", &self.log_level)
            .field("endpoint", &self.endpoint)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Default for DdnsConfig {
    fn default() -> Self {
        Self {
            access_key_id: String::new(),
            access_key_secret: String::new(),
            domain_name: String::new(),
            rr: default_rr(),
            record_type: default_record_type(),
            ttl: default_ttl(),
            ip_file: default_ip_file(),
            log_level: default_log_level(),
            endpoint: default_endpoint(),
            dry_run: false,
        }
    }
}

impl DdnsConfig {
    /// Load configuration from defaults, an optional file and the process environment
    ///
    /// A config file path that does not exist is ignored. A file that exists
    /// but is not valid JSON is an error.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        Self::load_with(config_file, |key| std::env::var(key).ok())
    }

    /// Same as [`DdnsConfig::load`] with an explicit environment lookup
    pub fn load_with<F>(config_file: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match config_file {
            Some(path) if path.exists() => Self::from_file(path)?,
            Some(path) => {
                tracing::debug!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            Error::config(format!("Failed to load config file {}: {}", path.display(), e))
        })
    }

    /// Override fields from environment variables
    ///
    /// `DDNS_MODE=dry-run` additionally switches on dry-run mode.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ALIYUN_ACCESS_KEY_ID") {
            self.access_key_id = value;
        }
        if let Some(value) = lookup("ALIYUN_ACCESS_KEY_SECRET") {
            self.access_key_secret = value;
        }
        if let Some(value) = lookup("DDNS_DOMAIN_NAME") {
            self.domain_name = value;
        }
        if let Some(value) = lookup("DDNS_RR") {
            self.rr = value;
        }
        if let Some(value) = lookup("DDNS_RECORD_TYPE") {
            self.record_type = value;
        }
        if let Some(value) = lookup("DDNS_TTL") {
            self.ttl = parse_ttl(&value)?;
        }
        if let Some(value) = lookup("DDNS_IP_FILE") {
            self.ip_file = PathBuf::from(value);
        }
        if let Some(value) = lookup("DDNS_LOG_LEVEL") {
            self.log_level = value;
        }
        if let Some(value) = lookup("ALIYUN_DNS_ENDPOINT") {
            self.endpoint = value;
        }

        if lookup("DDNS_MODE").is_some_and(|mode| mode.eq_ignore_ascii_case("dry-run")) {
            self.dry_run = true;
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("access_key_id", &self.access_key_id),
            ("access_key_secret", &self.access_key_secret),
            ("domain_name", &self.domain_name),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(Error::config(format!("Missing required setting: {}", field)));
            }
        }

        if self.rr.is_empty() {
            return Err(Error::config("Record label (rr) cannot be empty"));
        }

        if self.record_type.is_empty() {
            return Err(Error::config("Record type cannot be empty"));
        }

        if self.ttl == 0 {
            return Err(Error::config("TTL must be a positive integer"));
        }

        if self.endpoint.is_empty() {
            return Err(Error::config("Provider endpoint cannot be empty"));
        }

        self.tracing_level()?;

        Ok(())
    }

    /// Map the configured log level to a tracing level
    ///
    /// Accepts the usual names case-insensitively, including `warning` and
    /// `critical`.
    pub fn tracing_level(&self) -> Result<tracing::Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(tracing::Level::TRACE),
            "debug" => Ok(tracing::Level::DEBUG),
            "info" => Ok(tracing::Level::INFO),
            "warn" | "warning" => Ok(tracing::Level::WARN),
            "error" | "critical" => Ok(tracing::Level::ERROR),
            _ => Err(Error::config(format!(
                "Log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                self.log_level
            ))),
        }
    }

    /// The record this configuration manages
    pub fn target(&self) -> RecordTarget {
        RecordTarget {
            domain: self.domain_name.clone(),
            rr: self.rr.clone(),
            record_type: self.record_type.clone(),
            ttl: self.ttl,
        }
    }
}

/// The single (domain, label, type) record a run reconciles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTarget {
    /// Domain name (e.g. "example.com")
    pub domain: String,
    /// Record label (e.g. "@", "www")
    pub rr: String,
    /// Record type (e.g. "A")
    pub record_type: String,
    /// TTL written with updates
    pub ttl: u32,
}

impl RecordTarget {
    /// Create a new record target
    pub fn new(
        domain: impl Into<String>,
        rr: impl Into<String>,
        record_type: impl Into<String>,
        ttl: u32,
    ) -> Self {
        Self {
            domain: domain.into(),
            rr: rr.into(),
            record_type: record_type.into(),
            ttl,
        }
    }
}

impl std::fmt::Display for RecordTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} ({})", self.rr, self.domain, self.record_type)
    }
}

fn parse_ttl(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(ttl) if ttl > 0 => Ok(ttl),
        _ => Err(Error::config(format!(
            "TTL must be a positive integer, got: {}",
            raw
        ))),
    }
}

/// TTL may be written as a number or as a numeric string
fn deserialize_ttl<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTtl {
        Number(i64),
        Text(String),
    }

    match RawTtl::deserialize(deserializer)? {
        RawTtl::Number(n) => u32::try_from(n).ok().filter(|ttl| *ttl > 0).ok_or_else(|| {
            serde::de::Error::custom(format!("TTL must be a positive integer, got: {}", n))
        }),
        RawTtl::Text(s) => parse_ttl(&s).map_err(serde::de::Error::custom),
    }
}

fn default_rr() -> String {
    "@".to_string()
}

fn default_record_type() -> String {
    "A".to_string()
}

fn default_ttl() -> u32 {
    600
}

fn default_ip_file() -> PathBuf {
    PathBuf::from("/tmp/ddns_current_ip.txt")
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_endpoint() -> String {
    "alidns.cn-shanghai.aliyuncs.com".to_string()
}
