//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! A missing config file is not an error; every field has a default.

use notes_auth::DEFAULT_API_BASE_URL;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "notes-client";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
}

/// Remote API settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Upper bound for one command, refresh wait included
    pub wait_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_secs: 60,
            wait_timeout_secs: 120,
        }
    }
}

/// Where the credential pair is kept
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Overrides:
    /// - NOTES_API_URL replaces `api.base_url`
    /// - NOTES_CREDENTIALS_PATH replaces `credentials.path`
    pub fn load(path: &Path) -> common::Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };

        if let Ok(url) = std::env::var("NOTES_API_URL") {
            config.api.base_url = url;
        }
        if let Ok(p) = std::env::var("NOTES_CREDENTIALS_PATH") {
            config.credentials.path = Some(PathBuf::from(p));
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.api.base_url
            )));
        }
        if self.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.api.wait_timeout_secs == 0 {
            return Err(common::Error::Config(
                "wait_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.api.wait_timeout_secs)
    }

    /// Credential file location: configured path (with `~/` expanded) or
    /// `<config dir>/notes-client/credentials.json`.
    pub fn credentials_path(&self) -> common::Result<PathBuf> {
        match &self.credentials.path {
            Some(path) => expand_home(path),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR).join("credentials.json"))
                .ok_or(common::Error::NoPlatformDir("config")),
        }
    }

    /// Resolve config file path from CLI arg or NOTES_CONFIG env var.
    pub fn resolve_path(cli_path: Option<&Path>) -> PathBuf {
        if let Some(p) = cli_path {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("NOTES_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR).join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("notes-client.toml"))
    }
}

fn expand_home(path: &Path) -> common::Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .ok_or(common::Error::NoPlatformDir("home")),
        Err(_) => Ok(path.to_path_buf()),
    }
}
