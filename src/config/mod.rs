//! Configuration and credential storage

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::auth::keepalive::DEFAULT_KEEPALIVE_PERIOD;
use crate::auth::tokens::DEFAULT_EXPIRY_MARGIN;

/// Application configuration
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the media server (e.g. `https://media.example.net/`)
    pub server_url: Option<String>,
    /// Login key posted to `/login` to open a session
    pub login_key: Option<String>,
    /// Token session tuning
    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Seconds between keep-alive staleness checks
    pub keepalive_secs: u64,
    /// Seconds shaved off the server-reported token lifetime
    pub expiry_margin_secs: u64,
    /// Re-check token staleness on every dispatched request
    pub refresh_on_dispatch: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            keepalive_secs: DEFAULT_KEEPALIVE_PERIOD.as_secs(),
            expiry_margin_secs: DEFAULT_EXPIRY_MARGIN.as_secs(),
            refresh_on_dispatch: true,
        }
    }
}

impl SessionSettings {
    pub fn keepalive_period(&self) -> Duration {
        Duration::from_secs(self.keepalive_secs.max(1))
    }

    pub fn expiry_margin(&self) -> Duration {
        Duration::from_secs(self.expiry_margin_secs)
    }
}

impl Config {
    /// Get config directory path
    fn config_dir() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "media-cli", "media-cli")
            .context("Could not determine config directory")?;
        Ok(proj_dirs.config_dir().to_path_buf())
    }

    /// Get config file path
    fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;

        // Set restrictive permissions on config file (contains the login key)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(path, perms).context("Failed to set config permissions")?;
        }

        Ok(())
    }

    /// Resolve the server URL, preferring an explicit override.
    pub fn server(&self, override_url: Option<&str>) -> Result<Url> {
        let raw = override_url
            .or(self.server_url.as_deref())
            .context("No server configured. Run 'media-cli login --server <URL>'.")?;
        parse_server_url(raw)
    }

    pub fn clear_credentials(&mut self) {
        self.login_key = None;
    }
}

/// Parse a server base URL, normalizing it to end in `/` so relative API
/// paths join beneath it.
pub fn parse_server_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim()).with_context(|| format!("Invalid server URL: {}", raw))?;
    anyhow::ensure!(
        matches!(url.scheme(), "http" | "https"),
        "Server URL must be http or https: {}",
        raw
    );
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_url_adds_trailing_slash() {
        let url = parse_server_url("http://media.local:5000").unwrap();
        assert_eq!(url.as_str(), "http://media.local:5000/");

        let url = parse_server_url("https://example.net/media?x=1").unwrap();
        assert_eq!(url.as_str(), "https://example.net/media/");
        assert_eq!(
            url.join("content/v1/catalog").unwrap().as_str(),
            "https://example.net/media/content/v1/catalog"
        );
    }

    #[test]
    fn test_parse_server_url_rejects_other_schemes() {
        assert!(parse_server_url("ftp://example.net").is_err());
        assert!(parse_server_url("not a url").is_err());
    }

    #[test]
    fn test_session_defaults_when_missing() {
        let config: Config = toml::from_str(r#"server_url = "http://localhost:5000""#).unwrap();
        assert_eq!(config.session.keepalive_secs, 30);
        assert_eq!(config.session.expiry_margin_secs, 5);
        assert!(config.session.refresh_on_dispatch);
        assert_eq!(config.session.keepalive_period(), DEFAULT_KEEPALIVE_PERIOD);
        assert_eq!(config.session.expiry_margin(), DEFAULT_EXPIRY_MARGIN);
    }

    #[test]
    fn test_partial_session_table() {
        let config: Config = toml::from_str(
            r#"
            [session]
            refresh_on_dispatch = false
            "#,
        )
        .unwrap();
        assert!(!config.session.refresh_on_dispatch);
        assert_eq!(config.session.keepalive_period(), Duration::from_secs(30));
    }

    #[test]
    fn test_server_override_wins() {
        let config = Config {
            server_url: Some("http://configured:5000".to_string()),
            ..Config::default()
        };
        let url = config.server(Some("http://override:8080")).unwrap();
        assert_eq!(url.host_str(), Some("override"));
        assert!(Config::default().server(None).is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir()
            .join(format!("media-cli-test-{}", std::process::id()))
            .join("config.toml");
        let config = Config {
            server_url: Some("http://localhost:5000/".to_string()),
            login_key: Some("secret".to_string()),
            session: SessionSettings::default(),
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.login_key.as_deref(), Some("secret"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
