//! Resolved harness configuration.
//!
//! The harness never reads process-wide statics: scenarios build a
//! `HarnessConfig` (by hand or via `from_env`) and pass it down, so parallel
//! scenarios can target different servers and stores.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::HarnessError;
use crate::request::Credentials;

pub const DEFAULT_POSTS_PATH: &str = "/wp-json/wp/v2/posts";
pub const DEFAULT_USERS_PATH: &str = "/wp-json/wp/v2/users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub base_url: String,
    pub posts_path: String,
    pub users_path: String,
    /// Pre-encoded Basic token for the privileged account, if any.
    pub token: Option<String>,
    pub store_path: PathBuf,
}

impl HarnessConfig {
    /// Config with the default resource paths and no token.
    pub fn new(base_url: &str, store_path: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.to_string(),
            posts_path: DEFAULT_POSTS_PATH.to_string(),
            users_path: DEFAULT_USERS_PATH.to_string(),
            token: None,
            store_path: store_path.into(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Reads `CMS_BASE_URL`, `CMS_DB_PATH` (required) and `CMS_POSTS_PATH`,
    /// `CMS_USERS_PATH`, `CMS_TOKEN` (optional).
    pub fn from_env() -> Result<Self, HarnessError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HarnessError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| HarnessError::Config(format!("{key} is not set")))
        };
        Ok(Self {
            base_url: required("CMS_BASE_URL")?,
            posts_path: lookup("CMS_POSTS_PATH").unwrap_or_else(|| DEFAULT_POSTS_PATH.to_string()),
            users_path: lookup("CMS_USERS_PATH").unwrap_or_else(|| DEFAULT_USERS_PATH.to_string()),
            token: lookup("CMS_TOKEN").filter(|v| !v.is_empty()),
            store_path: PathBuf::from(required("CMS_DB_PATH")?),
        })
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.token.clone().map(Credentials::Basic)
    }
}

/// Base64 of `username:password`, ready for `Credentials::Basic`.
pub fn encode_basic(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{username}:{password}"))
}
