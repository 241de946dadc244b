//! Reusable request templates.
//!
//! A `RequestSpec` carries the base address, JSON content negotiation and an
//! optional authorization header. It never encodes credentials itself: the
//! caller hands over a ready-made token, so credential format stays a caller
//! policy (see `config::encode_basic`).

use crate::http::{HttpMethod, HttpRequest};

/// A pre-encoded credential value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Base64 of `username:password`.
    Basic(String),
    Bearer(String),
}

impl Credentials {
    pub fn header_value(&self) -> String {
        match self {
            Credentials::Basic(token) => format!("Basic {token}"),
            Credentials::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

/// Immutable request template shared by every call of a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    base_url: String,
    headers: Vec<(String, String)>,
}

/// Builds a request template. Without credentials the template is anonymous.
///
/// A malformed `base_url` is not detected here; it surfaces as a transport
/// error when a request is sent.
pub fn build_spec(base_url: &str, credentials: Option<&Credentials>) -> RequestSpec {
    let mut headers = vec![
        ("content-type".to_string(), "application/json".to_string()),
        ("accept".to_string(), "application/json".to_string()),
    ];
    if let Some(credentials) = credentials {
        headers.push(("authorization".to_string(), credentials.header_value()));
    }
    RequestSpec {
        base_url: base_url.trim_end_matches('/').to_string(),
        headers,
    }
}

impl RequestSpec {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn is_authenticated(&self) -> bool {
        self.headers.iter().any(|(name, _)| name == "authorization")
    }

    /// Materializes one request against `path` (relative to the base URL).
    pub fn request(&self, method: HttpMethod, path: &str, body: Option<String>) -> HttpRequest {
        HttpRequest {
            method,
            path: format!("{}{}", self.base_url, path),
            headers: self.headers.clone(),
            body,
        }
    }
}
