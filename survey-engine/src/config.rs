//! Connection settings for the HTTP collaborators.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("survey-engine/{}", env!("CARGO_PKG_VERSION"))
}

/// Where the REST API and the authentication callback live, and how to reach them.
///
/// ```toml
/// api_base_url = "https://surveys.example.org"
/// auth_callback_url = "https://surveys.example.org/auth/callback/end-user-credentials"
/// request_timeout_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL the `/api/...` paths are appended to.
    pub api_base_url: String,

    /// Endpoint that mints a session for a participant.
    pub auth_callback_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl EngineConfig {
    /// Settings for a backend at `api_base_url`, with the auth callback at its default path.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into();
        let auth_callback_url = format!(
            "{}/auth/callback/end-user-credentials",
            api_base_url.trim_end_matches('/')
        );
        Self {
            api_base_url,
            auth_callback_url,
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }

    /// Load from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    /// Parse from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse config TOML")?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        for (name, url) in [
            ("api_base_url", &self.api_base_url),
            ("auth_callback_url", &self.auth_callback_url),
        ] {
            let url: reqwest::Url = url
                .parse()
                .with_context(|| format!("{name} is not a valid URL: {url:?}"))?;
            anyhow::ensure!(
                matches!(url.scheme(), "http" | "https"),
                "{name} must be an http(s) URL, got {url}"
            );
        }
        anyhow::ensure!(
            self.request_timeout_secs > 0,
            "request_timeout_secs must be positive"
        );
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Absolute URL for an API path such as `/api/pages/3`.
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in() {
        let config = EngineConfig::from_toml_str(
            r#"
            api_base_url = "https://surveys.example.org/"
            auth_callback_url = "https://surveys.example.org/auth/callback/end-user-credentials"
            "#,
        )
        .unwrap();

        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert!(config.user_agent.starts_with("survey-engine/"));
        assert_eq!(
            config.api_url("/api/pages/3"),
            "https://surveys.example.org/api/pages/3"
        );
    }

    #[test]
    fn new_derives_auth_callback() {
        let config = EngineConfig::new("http://localhost:3000/");
        assert_eq!(
            config.auth_callback_url,
            "http://localhost:3000/auth/callback/end-user-credentials"
        );
    }

    #[test]
    fn rejects_bad_urls() {
        let err = EngineConfig::from_toml_str(
            r#"
            api_base_url = "not a url"
            auth_callback_url = "https://surveys.example.org/auth"
            "#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("api_base_url"));

        assert!(
            EngineConfig::from_toml_str(
                r#"
                api_base_url = "ftp://surveys.example.org"
                auth_callback_url = "https://surveys.example.org/auth"
                "#,
            )
            .is_err()
        );
    }

    #[test]
    fn missing_required_field() {
        let err = EngineConfig::from_toml_str(r#"api_base_url = "https://a.example""#).unwrap_err();
        assert!(format!("{err:#}").contains("auth_callback_url"));
    }

    #[test]
    fn from_file_names_the_path() {
        let err = EngineConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(format!("{err:#}").contains("/definitely/not/here.toml"));
    }
}
