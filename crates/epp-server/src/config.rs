//! Configuration loading from disk.
//!
//! ```toml
//! [server]
//! listen_addr = "0.0.0.0:700"
//!
//! [session]
//! idle_timeout = "5m"
//! session_timeout = "10m"
//!
//! [tls]
//! certificate = "cert/server.crt"
//! private_key = "cert/server.key"
//! require_client_certificate = true
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub session: SessionSettings,
    pub tls: TlsSettings,
}

impl Settings {
    /// Loads and parses a TOML settings file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid TOML for this shape.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address to listen on. The standard EPP port is 700.
    pub listen_addr: String,
}

/// Per-session timeout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Maximum time with no traffic before a session is dropped.
    #[serde(default = "default_idle_timeout")]
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// Maximum lifetime of a single session.
    #[serde(default = "default_session_timeout")]
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: default_idle_timeout(),
            session_timeout: default_session_timeout(),
        }
    }
}

const fn default_idle_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

const fn default_session_timeout() -> Duration {
    Duration::from_secs(10 * 60)
}

/// TLS material locations and client-auth policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsSettings {
    /// PEM file with the server certificate chain.
    pub certificate: PathBuf,

    /// PEM file with the server private key.
    pub private_key: PathBuf,

    /// Require clients to present a certificate during the handshake.
    #[serde(default)]
    pub require_client_certificate: bool,
}

/// Settings loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path of the settings file.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid TOML for this shape.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path of the settings file.
        path: PathBuf,
        #[source]
        source: Box<toml::de::Error>,
    },
}

mod humantime_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complete_settings() {
        let settings: Settings = toml::from_str(
            r#"
            [server]
            listen_addr = "0.0.0.0:700"

            [session]
            idle_timeout = "90s"
            session_timeout = "1h"

            [tls]
            certificate = "cert/server.crt"
            private_key = "cert/server.key"
            require_client_certificate = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.server.listen_addr, "0.0.0.0:700");
        assert_eq!(settings.session.idle_timeout, Duration::from_secs(90));
        assert_eq!(settings.session.session_timeout, Duration::from_secs(3600));
        assert!(settings.tls.require_client_certificate);
    }

    #[test]
    fn session_section_is_optional_with_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [server]
            listen_addr = "127.0.0.1:7700"

            [tls]
            certificate = "a.crt"
            private_key = "a.key"
            "#,
        )
        .unwrap();

        assert_eq!(settings.session.idle_timeout, Duration::from_secs(300));
        assert_eq!(settings.session.session_timeout, Duration::from_secs(600));
        assert!(!settings.tls.require_client_certificate);
    }

    #[test]
    fn durations_round_trip_through_humantime() {
        let settings = SessionSettings {
            idle_timeout: Duration::from_secs(120),
            session_timeout: Duration::from_secs(600),
        };
        let rendered = toml::to_string(&settings).unwrap();
        assert!(rendered.contains("idle_timeout = \"2m\""));

        let parsed: SessionSettings = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.idle_timeout, settings.idle_timeout);
    }
}
