//! Error types for the contract harness.
//!
//! # Design
//! Expected API failures (401, 404, 410, ...) are *not* errors here: they are
//! decoded into `ErrorEnvelope` values and handed back through `Outcome`.
//! `HarnessError` is reserved for everything that should fail the calling
//! scenario: transport trouble, a status or body that contradicts the declared
//! expectation, and divergence between the API and the store.

use thiserror::Error;

use crate::types::EntityId;

/// Every failure a harness operation can surface to its scenario.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Connection, TLS or body-read failure. Never retried.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The response status differs from the one the caller declared.
    #[error("expected HTTP {expected}, got HTTP {actual}: {body}")]
    UnexpectedStatus { expected: u16, actual: u16, body: String },

    /// The response body could not be decoded into the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A 2xx body decoded but a required field was null or absent.
    #[error("{entity} response is missing required field `{field}`")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },

    /// The response echoed a different identifier than the one requested.
    #[error("expected id {expected} in response, got {actual}")]
    IdMismatch { expected: EntityId, actual: EntityId },

    /// An error envelope decoded but its contents differ from expectations.
    #[error("error envelope {field}: expected {expected:?}, got {actual:?}")]
    EnvelopeMismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// `Outcome::into_entity` on an error, or `into_error` on an entity.
    #[error("expected {expected} outcome, got {actual}")]
    UnexpectedOutcome {
        expected: &'static str,
        actual: &'static str,
    },

    /// The backing store rejected a statement or could not be opened.
    #[error("store error: {0}")]
    Store(#[from] rusqlite::Error),

    /// A persisted field differs from the expected value.
    #[error("{entity} {id}: `{field}` expected {expected:?}, found {actual:?}")]
    Mismatch {
        entity: &'static str,
        id: EntityId,
        field: &'static str,
        expected: String,
        actual: String,
    },

    /// A row that should exist is absent.
    #[error("{entity} {id} not found in store")]
    Missing { entity: &'static str, id: EntityId },

    /// A fixture row could not be read back after its insert.
    #[error("{entity} `{key}` not found in store after insert")]
    SeedLost { entity: &'static str, key: String },

    /// A row that should be absent exists.
    #[error("{entity} {id} unexpectedly present in store")]
    UnexpectedRow { entity: &'static str, id: EntityId },

    /// An id expected in an API listing is not there.
    #[error("{entity} {id} not present in API listing")]
    NotListed { entity: &'static str, id: EntityId },

    /// An id that should be hidden from an API listing is there.
    #[error("{entity} {id} unexpectedly present in API listing")]
    UnexpectedlyListed { entity: &'static str, id: EntityId },

    /// A required configuration value is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),
}
