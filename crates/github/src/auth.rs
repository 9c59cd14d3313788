use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use pipeline_core::config::GitHubConfig;

use crate::error::GitHubError;

/// How the client authenticates, in order of preference.
#[derive(Clone, PartialEq)]
pub enum Credentials {
    App {
        app_id: String,
        installation_id: String,
        private_key: String,
    },
    Token(String),
}

impl Credentials {
    pub fn from_config(config: &GitHubConfig) -> Result<Self, GitHubError> {
        if config.has_app_credentials() {
            if let (Some(app_id), Some(installation_id), Some(private_key)) = (
                config.app_id.as_deref(),
                config.installation_id.as_deref(),
                config.private_key.as_deref(),
            ) {
                return Ok(Credentials::App {
                    app_id: app_id.trim().to_string(),
                    installation_id: installation_id.trim().to_string(),
                    private_key: normalize_private_key(private_key),
                });
            }
        }

        config
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| Credentials::Token(token.to_string()))
            .ok_or(GitHubError::MissingCredentials)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::App {
                app_id,
                installation_id,
                ..
            } => f
                .debug_struct("App")
                .field("app_id", app_id)
                .field("installation_id", installation_id)
                .finish_non_exhaustive(),
            Credentials::Token(_) => f.write_str("Token(***)"),
        }
    }
}

/// Keys pasted into CI variables often carry literal `\n` sequences instead of newlines.
pub fn normalize_private_key(raw: &str) -> String {
    raw.trim().replace("\\n", "\n")
}

/// Claims for the GitHub App JWT
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AppClaims {
    /// Issued a minute in the past for clock drift, valid for nine minutes.
    pub fn new(app_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            iat: (now - Duration::seconds(60)).timestamp(),
            exp: (now + Duration::seconds(540)).timestamp(),
            iss: app_id.to_string(),
        }
    }
}

/// Sign an RS256 JWT identifying the App.
pub fn app_jwt(app_id: &str, private_key: &str, now: DateTime<Utc>) -> Result<String, GitHubError> {
    let key = EncodingKey::from_rsa_pem(normalize_private_key(private_key).as_bytes())?;
    let token = encode(
        &Header::new(Algorithm::RS256),
        &AppClaims::new(app_id, now),
        &key,
    )?;
    Ok(token)
}

/// Response of `POST /app/installations/{id}/access_tokens`
#[derive(Debug, Deserialize)]
pub(crate) struct InstallationToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}
