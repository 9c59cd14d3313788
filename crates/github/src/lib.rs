pub mod auth;
pub mod client;
pub mod error;

pub use auth::{app_jwt, normalize_private_key, AppClaims, Credentials};
pub use client::GitHubClient;
pub use error::GitHubError;
