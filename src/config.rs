//! Configuration management for the ingest FTP daemon
//!
//! Settings come from an optional `config.toml`, layered under environment
//! variables prefixed with `INGEST_FTPD`, on top of built-in defaults.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// One account accepted by the built-in credential store.
#[derive(Debug, Deserialize, Clone)]
pub struct UserEntry {
    pub username: String,
    /// Lowercase hex MD5 of the password
    pub password_md5: String,
    /// Opaque handle used to name uploads and passed to the post-process hook
    pub identity: String,
}

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address to bind the control listener
    pub bind_address: String,

    /// Port for the control connection (0 picks an ephemeral port)
    pub control_port: u16,

    // ═══ STORAGE ═══
    /// Directory uploads are written under
    pub upload_root: String,

    /// Maximum upload size in MB
    pub max_file_size_mb: u64,

    // ═══ SESSION BEHAVIOR ═══
    /// Inactivity timeout applied to every socket read, write, accept and dial
    pub inactivity_timeout_secs: u64,

    /// Longest accepted command line, in bytes
    pub max_command_length: usize,

    /// Text sent after the 220 code when a client connects
    pub greeting: String,

    /// Program run as `<program> <args...> <identity> <filename>` after each upload
    #[serde(default)]
    pub post_process_command: Option<String>,

    /// Leading arguments for the post-process program, e.g. interpreter flags
    #[serde(default)]
    pub post_process_args: Vec<String>,

    // ═══ SHUTDOWN ═══
    pub shutdown_rounds: u32,
    pub shutdown_pause_ms: u64,

    #[serde(default)]
    pub users: Vec<UserEntry>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            control_port: 9021,
            upload_root: "./uploads".to_string(),
            max_file_size_mb: 100,
            inactivity_timeout_secs: 300,
            max_command_length: 512,
            greeting: "Ingest FTP Server Ready".to_string(),
            post_process_command: None,
            post_process_args: Vec::new(),
            shutdown_rounds: 4,
            shutdown_pause_ms: 500,
            users: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config", Self::environment())
    }

    /// Environment source: `INGEST_FTPD_<KEY>`, with `__` separating nested keys
    pub fn environment() -> Environment {
        Environment::with_prefix("INGEST_FTPD")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Load from an optional config file (`name` without extension) and `env`.
    pub fn load_from(name: &str, env: Environment) -> Result<Self, ConfigError> {
        let defaults = ServerConfig::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("control_port", defaults.control_port as i64)?
            .set_default("upload_root", defaults.upload_root)?
            .set_default("max_file_size_mb", defaults.max_file_size_mb as i64)?
            .set_default("inactivity_timeout_secs", defaults.inactivity_timeout_secs as i64)?
            .set_default("max_command_length", defaults.max_command_length as i64)?
            .set_default("greeting", defaults.greeting)?
            .set_default("shutdown_rounds", defaults.shutdown_rounds as i64)?
            .set_default("shutdown_pause_ms", defaults.shutdown_pause_ms as i64)?
            .add_source(File::with_name(name).required(false))
            .add_source(env)
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upload_root.is_empty() {
            return Err(ConfigError::Message("upload_root cannot be empty".into()));
        }

        if self.inactivity_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "inactivity_timeout_secs must be greater than 0".into(),
            ));
        }

        if self.max_command_length < 16 {
            return Err(ConfigError::Message(
                "max_command_length must be at least 16".into(),
            ));
        }

        if self.shutdown_rounds == 0 {
            return Err(ConfigError::Message(
                "shutdown_rounds must be greater than 0".into(),
            ));
        }

        if let Some(user) = self.users.iter().find(|u| u.identity.is_empty()) {
            return Err(ConfigError::Message(format!(
                "user {} has an empty identity",
                user.username
            )));
        }

        Ok(())
    }

    /// Get bind address and control port as socket address string
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    /// Get the upload root as PathBuf
    pub fn upload_root_path(&self) -> PathBuf {
        PathBuf::from(&self.upload_root)
    }

    /// Get the inactivity timeout as Duration
    pub fn inactivity_timeout(&self) -> Duration {
        Duration::from_secs(self.inactivity_timeout_secs)
    }

    /// Get maximum file size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }

    pub fn shutdown_pause(&self) -> Duration {
        Duration::from_millis(self.shutdown_pause_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_source(vars: &[(&str, &str)]) -> Environment {
        let map = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::environment().source(Some(map))
    }

    fn missing_file() -> String {
        let dir = tempfile::tempdir().unwrap();
        dir.path().join("absent").to_string_lossy().into_owned()
    }

    #[test]
    fn single_underscore_environment_override_applies() {
        let env = env_source(&[
            ("INGEST_FTPD_CONTROL_PORT", "2121"),
            ("INGEST_FTPD_SHUTDOWN_ROUNDS", "7"),
        ]);
        let config = ServerConfig::load_from(&missing_file(), env).unwrap();
        assert_eq!(config.control_port, 2121);
        assert_eq!(config.shutdown_rounds, 7);
        assert_eq!(config.greeting, ServerConfig::default().greeting);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = ServerConfig {
            inactivity_timeout_secs: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_identity_is_rejected() {
        let config = ServerConfig {
            users: vec![UserEntry {
                username: "alice".into(),
                password_md5: "x".into(),
                identity: String::new(),
            }],
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
