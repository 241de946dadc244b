//! Contract-verification harness for a CMS REST API (posts and users).
//!
//! # Overview
//! Builds authenticated request templates, runs typed CRUD calls against the
//! API, and cross-checks what the API reports against the CMS's own store.
//! The two views are queried independently, so a scenario passes only when
//! the HTTP contract and the persisted state agree.
//!
//! # Design
//! - `request::build_spec` produces an immutable `RequestSpec`; credentials
//!   arrive pre-encoded.
//! - `client::Endpoint` splits each operation into `build_*` / `parse_*`;
//!   `client::ApiClient` runs one blocking round-trip per call through a
//!   `http::Transport`.
//! - Expected failures come back as `ErrorEnvelope` values inside `Outcome`;
//!   everything else that contradicts the caller's declaration is a
//!   `HarnessError`.
//! - `store::Store` opens a fresh SQLite connection per query; `verify`
//!   compares its rows with API state.

pub mod client;
pub mod config;
pub mod error;
pub mod fixture;
pub mod http;
pub mod request;
pub mod store;
pub mod transport;
pub mod types;
pub mod verify;

pub use client::{ApiClient, Endpoint, Expect, Outcome};
pub use config::{encode_basic, HarnessConfig};
pub use error::HarnessError;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use request::{build_spec, Credentials, RequestSpec};
pub use store::{NewPost, NewUser, PostRow, Store, UserRow};
pub use transport::UreqTransport;
pub use types::{EntityId, ErrorEnvelope, Post, PostBody, PostStatus, Rendered, User};
pub use verify::{assert_listed, assert_not_listed, Consistency};

/// Installs a fmt subscriber filtered by `RUST_LOG`, or `cms_contract=<level>`.
///
/// Safe to call from every test: only the first call takes effect.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("cms_contract={level}")));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(filter)
        .try_init();
}
