//! Gmail OAuth2 authentication
//!
//! Implements the OAuth2 authorization code flow with a loopback redirect,
//! token refresh, and token persistence in the config directory.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;

use crate::config::GmailCredentials;
use crate::error::AuthError;

/// Token file in the config directory
const TOKEN_FILE: &str = "gmail-tokens.json";

/// Tokens are treated as expired this long before their real expiry
const EXPIRY_BUFFER_MS: i64 = 5 * 60 * 1000;

/// Access/refresh token pair with expiry in epoch milliseconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expiry_date: Option<i64>,
}

impl TokenSet {
    /// Whether the access token can still be used at `now_ms`
    ///
    /// A token without a known expiry is never considered valid.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        !self.access_token.is_empty()
            && self
                .expiry_date
                .is_some_and(|expiry| expiry > now_ms + EXPIRY_BUFFER_MS)
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now().timestamp_millis())
    }
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token_set(self, previous_refresh: Option<&str>) -> TokenSet {
        TokenSet {
            access_token: self.access_token,
            // Google omits the refresh token on refresh responses
            refresh_token: self.refresh_token.or(previous_refresh.map(str::to_string)),
            expiry_date: self
                .expires_in
                .map(|secs| Utc::now().timestamp_millis() + secs * 1000),
        }
    }
}

/// OAuth2 configuration and token management for Gmail
pub struct GmailAuth {
    credentials: GmailCredentials,
    token_path: PathBuf,
}

impl GmailAuth {
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Read-only mailbox access
    const GMAIL_READONLY_SCOPE: &'static str = "https://www.googleapis.com/auth/gmail.readonly";

    /// Port range to try for the loopback redirect server
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    /// Create a GmailAuth storing tokens in the default config location
    pub fn new(credentials: GmailCredentials) -> Result<Self> {
        let token_path =
            config::config_path(TOKEN_FILE).context("Could not determine config directory")?;
        Ok(Self::with_token_path(credentials, token_path))
    }

    /// Create a GmailAuth storing tokens at an explicit path
    pub fn with_token_path(credentials: GmailCredentials, token_path: PathBuf) -> Self {
        Self {
            credentials,
            token_path,
        }
    }

    /// Build the consent URL for the given redirect URI
    pub fn authorization_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(Self::GMAIL_READONLY_SCOPE),
        )
    }

    /// Get a valid access token, refreshing it if needed
    ///
    /// Never starts an interactive flow; returns [`AuthError::NotAuthenticated`]
    /// when there is nothing to refresh.
    pub fn access_token(&self) -> Result<String> {
        let token = self.load_tokens().map_err(|_| AuthError::NotAuthenticated)?;
        if token.is_valid() {
            return Ok(token.access_token);
        }

        let refreshed = self.refresh(&token)?;
        self.save_tokens(&refreshed)?;
        Ok(refreshed.access_token)
    }

    /// Run the interactive authorization code flow and persist the tokens
    pub fn login(&self) -> Result<TokenSet> {
        let (listener, port) = self.bind_loopback()?;
        let redirect_uri = format!("http://localhost:{}", port);
        let auth_url = self.authorization_url(&redirect_uri);

        info!("Opening browser for Gmail authentication");
        eprintln!("If the browser doesn't open, visit: {}", auth_url);
        if let Err(e) = open::that(&auth_url) {
            warn!("Failed to open browser: {}", e);
        }

        let code = Self::wait_for_code(listener)?;
        let tokens = self.exchange_code(&code, &redirect_uri)?;
        self.save_tokens(&tokens)?;
        info!("Gmail authentication successful");
        Ok(tokens)
    }

    /// Exchange an authorization code for tokens
    pub fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<TokenSet> {
        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;
        Ok(token.into_token_set(None))
    }

    /// Obtain a fresh access token using the stored refresh token
    pub fn refresh(&self, tokens: &TokenSet) -> Result<TokenSet> {
        let refresh_token = tokens
            .refresh_token
            .as_deref()
            .ok_or(AuthError::NotAuthenticated)?;

        let mut response = ureq::post(Self::TOKEN_URL)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .map_err(|e| AuthError::Provider {
                message: format!("Failed to refresh access token: {}", e),
            })?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse refresh token response")?;
        Ok(token.into_token_set(Some(refresh_token)))
    }

    /// Whether a usable (or refreshable) token is stored
    pub fn is_authenticated(&self) -> bool {
        match self.load_tokens() {
            Ok(tokens) if tokens.is_valid() => true,
            Ok(tokens) => self
                .refresh(&tokens)
                .and_then(|t| self.save_tokens(&t))
                .is_ok(),
            Err(_) => false,
        }
    }

    /// Clear stored tokens (logout)
    pub fn logout(&self) -> Result<()> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path)?;
        }
        Ok(())
    }

    pub fn load_tokens(&self) -> Result<TokenSet> {
        let content = fs::read_to_string(&self.token_path)
            .with_context(|| format!("Failed to read {}", self.token_path.display()))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save_tokens(&self, tokens: &TokenSet) -> Result<()> {
        if let Some(parent) = self.token_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.token_path, serde_json::to_string_pretty(tokens)?)?;
        Ok(())
    }

    fn bind_loopback(&self) -> Result<(TcpListener, u16)> {
        (Self::PORT_RANGE_START..=Self::PORT_RANGE_END)
            .find_map(|port| {
                TcpListener::bind(("127.0.0.1", port))
                    .ok()
                    .map(|l| (l, port))
            })
            .with_context(|| {
                format!(
                    "Could not bind to any port in range {}-{}",
                    Self::PORT_RANGE_START,
                    Self::PORT_RANGE_END
                )
            })
    }

    /// Accept the redirect and pull the `code` (or `error`) query parameter
    fn wait_for_code(listener: TcpListener) -> Result<String> {
        let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

        let mut request_line = String::new();
        BufReader::new(&stream)
            .read_line(&mut request_line)
            .context("Failed to read request")?;

        // GET /?code=AUTH_CODE&scope=... HTTP/1.1
        let path = request_line.split_whitespace().nth(1).unwrap_or("/");
        let (code, error) = parse_callback(path);

        let (status, body) = if code.is_some() {
            ("200 OK", "Authentication successful! You can close this window.")
        } else {
            ("400 Bad Request", "Authentication failed. Please try again.")
        };
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        if let Some(err) = error {
            return Err(AuthError::Provider {
                message: format!("OAuth error: {}", err),
            }
            .into());
        }
        code.context("No authorization code received")
    }
}

fn parse_callback(path: &str) -> (Option<String>, Option<String>) {
    let Ok(url) = url::Url::parse(&format!("http://localhost{}", path)) else {
        return (None, None);
    };
    let find = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };
    (find("code"), find("error"))
}
