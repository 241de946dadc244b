//! Entity model for the posts and users resources.
//!
//! # Design
//! These types mirror the CMS's JSON but are defined independently of the
//! mock server; integration tests catch drift. Decoding is lenient: unknown
//! keys are ignored and every field the server may omit is an `Option`, so a
//! response missing a required field still decodes and is rejected later by
//! the facade with a precise `MissingField` error.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// Server-assigned integer identifier.
pub type EntityId = i64;

/// Lifecycle status of a post as the wire string the CMS uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PostStatus {
    Publish,
    Draft,
    Private,
    Trash,
    Pending,
    Future,
    /// Any status the harness does not model; preserved verbatim.
    Other(String),
}

impl PostStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PostStatus::Publish => "publish",
            PostStatus::Draft => "draft",
            PostStatus::Private => "private",
            PostStatus::Trash => "trash",
            PostStatus::Pending => "pending",
            PostStatus::Future => "future",
            PostStatus::Other(s) => s,
        }
    }
}

impl From<&str> for PostStatus {
    fn from(s: &str) -> Self {
        match s {
            "publish" => PostStatus::Publish,
            "draft" => PostStatus::Draft,
            "private" => PostStatus::Private,
            "trash" => PostStatus::Trash,
            "pending" => PostStatus::Pending,
            "future" => PostStatus::Future,
            other => PostStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for PostStatus {
    fn from(s: String) -> Self {
        PostStatus::from(s.as_str())
    }
}

impl From<PostStatus> for String {
    fn from(status: PostStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A text field the CMS returns both as stored (`raw`) and as rendered HTML.
///
/// `raw` is only present in authenticated (edit-context) responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub raw: Option<String>,
    #[serde(default)]
    pub rendered: Option<String>,
}

impl Rendered {
    /// The rendered HTML with paragraph wrapping removed.
    pub fn normalized(&self) -> Option<String> {
        self.rendered.as_deref().map(strip_paragraphs)
    }
}

/// A post as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub title: Option<Rendered>,
    #[serde(default)]
    pub content: Option<Rendered>,
    #[serde(default)]
    pub status: Option<PostStatus>,
    #[serde(default)]
    pub author: Option<EntityId>,
}

impl Post {
    pub fn raw_title(&self) -> Option<&str> {
        self.title.as_ref().and_then(|t| t.raw.as_deref())
    }

    pub fn rendered_title(&self) -> Option<&str> {
        self.title.as_ref().and_then(|t| t.rendered.as_deref())
    }

    pub fn raw_content(&self) -> Option<&str> {
        self.content.as_ref().and_then(|c| c.raw.as_deref())
    }

    pub fn rendered_content(&self) -> Option<&str> {
        self.content.as_ref().and_then(|c| c.rendered.as_deref())
    }

    /// Rendered content with paragraph wrapping stripped, comparable to the
    /// raw value held in the store.
    pub fn normalized_content(&self) -> Option<String> {
        self.content.as_ref().and_then(Rendered::normalized)
    }
}

/// Payload for creating or updating a post. Absent fields are omitted from
/// the JSON so an update only touches what is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
}

impl PostBody {
    pub fn new(title: &str, content: &str, status: PostStatus) -> Self {
        Self {
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            status: Some(status),
        }
    }
}

/// A user as returned by the API. Credentials never round-trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

/// Nested `data` object of an error envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorData {
    #[serde(default)]
    pub status: Option<u16>,
}

/// The structured failure body returned by the API.
///
/// `code` and `data.status` are stable; `message` is localized and compared
/// verbatim against the server's configured locale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<ErrorData>,
}

impl ErrorEnvelope {
    /// The nested status duplicating the HTTP status, when present.
    pub fn status(&self) -> Option<u16> {
        self.data.as_ref().and_then(|d| d.status)
    }

    /// Checks the stable parts of the envelope: `code` and nested status.
    pub fn expect(&self, code: &str, status: u16) -> Result<(), HarnessError> {
        if self.code != code {
            return Err(HarnessError::EnvelopeMismatch {
                field: "code",
                expected: code.to_string(),
                actual: self.code.clone(),
            });
        }
        if self.status() != Some(status) {
            return Err(HarnessError::EnvelopeMismatch {
                field: "data.status",
                expected: status.to_string(),
                actual: format!("{:?}", self.status()),
            });
        }
        Ok(())
    }

    /// Checks the localized message verbatim.
    pub fn expect_message(&self, message: &str) -> Result<(), HarnessError> {
        if self.message == message {
            return Ok(());
        }
        Err(HarnessError::EnvelopeMismatch {
            field: "message",
            expected: message.to_string(),
            actual: self.message.clone(),
        })
    }
}

/// An entity type exposed as a REST collection.
pub trait Resource: DeserializeOwned {
    /// Singular name used in error messages.
    const KIND: &'static str;

    fn id(&self) -> Option<EntityId>;
}

impl Resource for Post {
    const KIND: &'static str = "post";

    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

impl Resource for User {
    const KIND: &'static str = "user";

    fn id(&self) -> Option<EntityId> {
        self.id
    }
}

/// Undoes the CMS renderer's paragraph wrapping: drops the outer
/// `<p>…</p>` and turns each inner paragraph boundary back into a blank line.
/// Text without an outer wrapper is only trimmed.
pub fn strip_paragraphs(rendered: &str) -> String {
    let trimmed = rendered.trim();
    match trimmed
        .strip_prefix("<p>")
        .and_then(|inner| inner.strip_suffix("</p>"))
    {
        Some(inner) => inner.replace("</p>\n<p>", "\n\n").trim().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_decodes_ignoring_unknown_fields() {
        let json = r#"{
            "id": 42,
            "date": "2024-01-01T00:00:00",
            "type": "post",
            "title": {"raw": "Hello", "rendered": "Hello"},
            "content": {"raw": "Body", "rendered": "<p>Body</p>\n", "protected": false},
            "status": "publish",
            "author": 1
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, Some(42));
        assert_eq!(post.raw_title(), Some("Hello"));
        assert_eq!(post.rendered_content(), Some("<p>Body</p>\n"));
        assert_eq!(post.normalized_content().as_deref(), Some("Body"));
        assert_eq!(post.status, Some(PostStatus::Publish));
    }

    #[test]
    fn post_decodes_with_partial_fields() {
        let post: Post = serde_json::from_str(r#"{"title":{"rendered":"Only"}}"#).unwrap();
        assert!(post.id.is_none());
        assert!(post.raw_title().is_none());
        assert_eq!(post.rendered_title(), Some("Only"));
        assert!(post.content.is_none());
    }

    #[test]
    fn unknown_status_is_preserved() {
        let post: Post = serde_json::from_str(r#"{"status":"auto-draft"}"#).unwrap();
        assert_eq!(post.status, Some(PostStatus::Other("auto-draft".to_string())));
        let back = serde_json::to_value(&post.status).unwrap();
        assert_eq!(back, "auto-draft");
    }

    #[test]
    fn post_body_omits_absent_fields() {
        let body = PostBody {
            title: Some("Only title".to_string()),
            ..PostBody::default()
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["title"], "Only title");
        assert!(json.get("content").is_none());
        assert!(json.get("status").is_none());
    }

    #[test]
    fn post_body_serializes_status_as_wire_string() {
        let body = PostBody::new("T", "C", PostStatus::Private);
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["status"], "private");
    }

    #[test]
    fn user_ignores_credentials_and_extras() {
        let json = r#"{"id":3,"name":"tester","slug":"tester","avatar_urls":{},"password":"x"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, Some(3));
        assert_eq!(user.name.as_deref(), Some("tester"));
    }

    #[test]
    fn error_envelope_checks_code_and_status() {
        let json = r#"{"code":"rest_forbidden","message":"Нет","data":{"status":401}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.status(), Some(401));
        assert!(envelope.expect("rest_forbidden", 401).is_ok());
        assert!(envelope.expect_message("Нет").is_ok());

        let err = envelope.expect("rest_forbidden", 403).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::EnvelopeMismatch { field: "data.status", .. }
        ));
        let err = envelope.expect("rest_cannot_edit", 401).unwrap_err();
        assert!(matches!(err, HarnessError::EnvelopeMismatch { field: "code", .. }));
    }

    #[test]
    fn error_envelope_without_data_has_no_status() {
        let envelope: ErrorEnvelope =
            serde_json::from_str(r#"{"code":"x","message":"y"}"#).unwrap();
        assert_eq!(envelope.status(), None);
    }

    #[test]
    fn strip_paragraphs_removes_wrapping() {
        assert_eq!(strip_paragraphs("<p>Привет!</p>\n"), "Привет!");
        assert_eq!(strip_paragraphs(""), "");
        assert_eq!(strip_paragraphs("plain"), "plain");
    }

    #[test]
    fn strip_paragraphs_keeps_paragraph_breaks() {
        assert_eq!(strip_paragraphs("<p>a</p>\n<p>b</p>\n"), "a\n\nb");
        assert_eq!(strip_paragraphs("<p>a\n\nb</p>\n"), "a\n\nb");
        assert_eq!(strip_paragraphs("a <p>inline</p> b"), "a <p>inline</p> b");
    }
}
