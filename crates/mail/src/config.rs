//! Configuration loading for mail services
//!
//! OAuth credentials are loaded from (in order of priority):
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON file (Google Cloud Console format)
//! 3. Runtime environment variables (fallback)
//!
//! Service settings come from `courier.json` in the config directory, with
//! defaults for every field.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Credentials filename in the config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Service settings filename in the config directory
pub const SERVICE_CONFIG_FILE: &str = "courier.json";

/// Environment variable overriding the share link base URL
const APP_URL_ENV: &str = "COURIER_APP_URL";

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format (installed app)
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials using the following priority:
    /// 1. Compile-time embedded credentials
    /// 2. JSON file (~/.config/courier/google-credentials.json)
    /// 3. Runtime environment variables
    pub fn load() -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if let Some(path) = Self::default_credentials_path().filter(|p| p.exists()) {
            return Self::from_file(&path);
        }

        Self::from_env()
    }

    /// Build with: GOOGLE_CLIENT_ID=xxx GOOGLE_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("GOOGLE_CLIENT_ID")?;
        let client_secret = option_env!("GOOGLE_CLIENT_SECRET")?;

        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "installed" (desktop) and "web" credential types
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID")
            .context("GOOGLE_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET")
            .context("GOOGLE_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }

    /// Get the default credentials file path
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }
}

/// Tunables for retrieval and sharing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL that share links are built on
    pub app_url: String,
    /// Lifetime of cached folder pages
    pub cache_ttl_secs: u64,
    /// Page size used when a request does not specify one
    pub default_max_results: u32,
    /// Share lifetime when none is requested
    pub share_ttl_days: i64,
    /// SQLite file holding share records (defaults to the data directory)
    pub share_db_path: Option<PathBuf>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            app_url: "http://localhost:3000".to_string(),
            cache_ttl_secs: 5 * 60,
            default_max_results: 100,
            share_ttl_days: 7,
            share_db_path: None,
        }
    }
}

impl ServiceConfig {
    /// Load `courier.json` (or defaults) and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut cfg: Self = config::load_json_or_default(SERVICE_CONFIG_FILE)?;
        if let Ok(url) = std::env::var(APP_URL_ENV)
            && !url.is_empty()
        {
            cfg.app_url = url;
        }
        Ok(cfg)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn share_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.share_ttl_days)
    }

    /// Resolved share database path
    pub fn share_db_path(&self) -> Result<PathBuf> {
        match &self.share_db_path {
            Some(path) => Ok(path.clone()),
            None => config::data_path("shares.sqlite").context("Could not determine data directory"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_installed_credentials() {
        let json = r#"{
            "installed": {
                "client_id": "test-client-id.apps.googleusercontent.com",
                "client_secret": "test-secret",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }
        }"#;

        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "test-client-id.apps.googleusercontent.com");
        assert_eq!(creds.client_secret, "test-secret");
    }

    #[test]
    fn test_parse_web_credentials() {
        let json = r#"{ "web": { "client_id": "web-id", "client_secret": "web-secret" } }"#;
        let creds = GmailCredentials::from_json(json).unwrap();
        assert_eq!(creds.client_id, "web-id");
    }

    #[test]
    fn test_invalid_credentials_json() {
        assert!(GmailCredentials::from_json(r#"{ "other": {} }"#).is_err());
    }

    #[test]
    fn test_credentials_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("google-credentials.json");
        std::fs::write(
            &path,
            r#"{ "installed": { "client_id": "file-id", "client_secret": "file-secret" } }"#,
        )
        .unwrap();

        let creds = GmailCredentials::from_file(&path).unwrap();
        assert_eq!(creds.client_id, "file-id");
        assert_eq!(creds.client_secret, "file-secret");

        let err = GmailCredentials::from_file(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn test_service_config_defaults() {
        let cfg: ServiceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, ServiceConfig::default());
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(300));
        assert_eq!(cfg.share_ttl(), chrono::Duration::days(7));
    }

    #[test]
    fn test_service_config_partial_override() {
        let cfg: ServiceConfig =
            serde_json::from_str(r#"{ "app_url": "https://mail.example.com", "cache_ttl_secs": 30 }"#)
                .unwrap();
        assert_eq!(cfg.app_url, "https://mail.example.com");
        assert_eq!(cfg.cache_ttl_secs, 30);
        assert_eq!(cfg.default_max_results, 100);
    }

    #[test]
    fn test_explicit_share_db_path() {
        let cfg = ServiceConfig {
            share_db_path: Some(PathBuf::from("/tmp/shares.sqlite")),
            ..Default::default()
        };
        assert_eq!(cfg.share_db_path().unwrap(), PathBuf::from("/tmp/shares.sqlite"));
    }
}
