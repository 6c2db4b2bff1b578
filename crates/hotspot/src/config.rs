//! Client configuration, loadable from TOML.
//!
//! ```toml
//! host = "10.5.50.1"
//! port = 8728
//! connect_timeout_ms = 5000
//! io_timeout_ms = 10000
//!
//! [[credentials]]
//! username = "hotel-api"
//! password = "..."
//!
//! [directory]
//! lookup = "filtered"
//!
//! [provision]
//! secret_length = 8
//! default_profile = "guest"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use hotspot_directory::{DirectoryConfig, ProvisionConfig};
use hotspot_protocol::FrameLimits;
use hotspot_session::{Credential, SessionConfig};
use serde::{Deserialize, Serialize};

/// Default router API port.
pub const DEFAULT_PORT: u16 = 8728;

/// Errors loading or validating a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Everything needed to reach and drive one router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Router hostname or IP address.
    pub host: String,

    /// Router API port. Default: 8728.
    pub port: u16,

    /// Credentials to try, in order.
    pub credentials: Vec<Credential>,

    /// TCP connect deadline in milliseconds. Default: 5000.
    pub connect_timeout_ms: u64,

    /// Per-sentence read/write deadline in milliseconds. Default: 10000.
    pub io_timeout_ms: u64,

    /// Incoming sentence limits.
    pub limits: FrameLimits,

    pub directory: DirectoryConfig,

    pub provision: ProvisionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            credentials: Vec::new(),
            connect_timeout_ms: 5_000,
            io_timeout_ms: session.io_timeout_ms,
            limits: session.limits,
            directory: DirectoryConfig::default(),
            provision: ProvisionConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file without validating it.
    ///
    /// For callers that fill in missing values (host, credentials) before
    /// handing the config to [`HotspotClient::from_config`](crate::HotspotClient::from_config).
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text)?;
        tracing::debug!(path = %path.display(), host = %config.host, "config read");
        Ok(config)
    }

    /// Checks the values a connection can't work without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".into()));
        }
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must not be 0".into()));
        }
        if self.credentials.is_empty() {
            return Err(ConfigError::Invalid("at least one credential is required".into()));
        }
        if let Some(c) = self.credentials.iter().find(|c| c.username.is_empty()) {
            return Err(ConfigError::Invalid(format!("credential with empty username: {c:?}")));
        }
        if self.connect_timeout_ms == 0 || self.io_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".into()));
        }
        if self.limits.max_word_len == 0 || self.limits.max_words == 0 {
            return Err(ConfigError::Invalid("frame limits must be non-zero".into()));
        }
        if self.provision.secret_length == 0 {
            return Err(ConfigError::Invalid("provision.secret_length must be non-zero".into()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// The session settings derived from this config.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            io_timeout_ms: self.io_timeout_ms,
            limits: self.limits,
        }
    }
}

#[cfg(test)]
mod tests {
    use hotspot_directory::LookupStrategy;

    use super::*;

    const SAMPLE: &str = r#"
        host = "10.5.50.1"
        io_timeout_ms = 2500

        [[credentials]]
        username = "hotel-api"
        password = "s3cret"

        [[credentials]]
        username = "admin"

        [directory]
        lookup = "filtered"

        [provision]
        secret_length = 8
    "#;

    #[test]
    fn test_from_toml_str_applies_defaults() {
        let config = ClientConfig::from_toml_str(SAMPLE).unwrap();

        assert_eq!(config.host, "10.5.50.1");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.session_config().io_timeout(), Duration::from_millis(2500));
        assert_eq!(config.credentials.len(), 2);
        assert_eq!(config.credentials[1].password, "");
        assert_eq!(config.directory.lookup, LookupStrategy::Filtered);
        assert_eq!(config.directory.menu, "/ip/hotspot");
        assert_eq!(config.provision.secret_length, 8);
        assert_eq!(config.provision.username_prefix, "room");
    }

    #[test]
    fn test_validate_requires_host() {
        let config = ClientConfig {
            credentials: vec![Credential::new("api", "x")],
            ..ClientConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(m)) if m.contains("host")));
    }

    #[test]
    fn test_validate_requires_credentials() {
        let result = ClientConfig::from_toml_str(r#"host = "10.5.50.1""#);
        assert!(matches!(result, Err(ConfigError::Invalid(m)) if m.contains("credential")));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ClientConfig {
            host: "10.5.50.1".into(),
            credentials: vec![Credential::new("api", "x")],
            io_timeout_ms: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_str_bad_syntax_is_parse_error() {
        let result = ClientConfig::from_toml_str("host = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_read_skips_validation_that_load_applies() {
        let path = std::env::temp_dir().join(format!("hotspot-config-{}.toml", std::process::id()));
        std::fs::write(&path, "host = \"10.5.50.1\"\nport = 8729\n").unwrap();

        let read = ClientConfig::read(&path);
        let loaded = ClientConfig::load(&path);
        std::fs::remove_file(&path).unwrap();

        let config = read.unwrap();
        assert_eq!(config.port, 8729);
        assert!(config.credentials.is_empty());
        assert!(matches!(loaded, Err(ConfigError::Invalid(m)) if m.contains("credential")));
    }

    #[test]
    fn test_load_missing_file_is_read_error() {
        let result = ClientConfig::load("/nonexistent/hotspot.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
