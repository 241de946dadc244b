//! Typed CRUD operations over the CMS REST API.
//!
//! # Design
//! `Endpoint<R>` is stateless: it holds only a collection path. Each
//! operation is split into a `build_*` method producing an `HttpRequest` and
//! a `parse_*` method consuming an `HttpResponse`, so request shape and
//! response checks are unit-testable without I/O. `ApiClient` pairs the
//! endpoints with a `Transport` and runs exactly one round-trip per call.
//!
//! Success and failure bodies are structurally unrelated (entity vs. error
//! envelope), so the caller declares up front which one it expects via
//! `Expect`; the facade never guesses from the status code.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::request::RequestSpec;
use crate::types::{EntityId, ErrorEnvelope, Post, PostBody, PostStatus, Resource, User};

/// The caller's declared expectation for one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// The operation's success status (201 for create, 200 otherwise).
    Success,
    /// A specific failure status whose body is an error envelope.
    Failure(u16),
}

/// Result of an expectation-dispatched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Entity(T),
    Error(ErrorEnvelope),
}

impl<T> Outcome<T> {
    pub fn into_entity(self) -> Result<T, HarnessError> {
        match self {
            Outcome::Entity(entity) => Ok(entity),
            Outcome::Error(_) => Err(HarnessError::UnexpectedOutcome {
                expected: "entity",
                actual: "error envelope",
            }),
        }
    }

    pub fn into_error(self) -> Result<ErrorEnvelope, HarnessError> {
        match self {
            Outcome::Error(envelope) => Ok(envelope),
            Outcome::Entity(_) => Err(HarnessError::UnexpectedOutcome {
                expected: "error envelope",
                actual: "entity",
            }),
        }
    }
}

/// Build/parse pairs for one REST collection.
#[derive(Debug, Clone)]
pub struct Endpoint<R> {
    path: String,
    _entity: PhantomData<fn() -> R>,
}

impl<R: Resource> Endpoint<R> {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.trim_end_matches('/').to_string(),
            _entity: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn item_path(&self, id: EntityId) -> String {
        format!("{}/{id}", self.path)
    }

    pub fn build_list(&self, spec: &RequestSpec) -> HttpRequest {
        spec.request(HttpMethod::Get, &self.path, None)
    }

    pub fn build_get(&self, spec: &RequestSpec, id: EntityId) -> HttpRequest {
        spec.request(HttpMethod::Get, &self.item_path(id), None)
    }

    pub fn build_create<B: Serialize>(
        &self,
        spec: &RequestSpec,
        body: &B,
    ) -> Result<HttpRequest, HarnessError> {
        Ok(spec.request(HttpMethod::Post, &self.path, Some(encode(body)?)))
    }

    pub fn build_update<B: Serialize>(
        &self,
        spec: &RequestSpec,
        id: EntityId,
        body: &B,
    ) -> Result<HttpRequest, HarnessError> {
        Ok(spec.request(HttpMethod::Put, &self.item_path(id), Some(encode(body)?)))
    }

    pub fn build_delete(&self, spec: &RequestSpec, id: EntityId) -> HttpRequest {
        spec.request(HttpMethod::Delete, &self.item_path(id), None)
    }

    /// Requires 200 and a JSON array. Order is whatever the server chose.
    pub fn parse_list(&self, response: HttpResponse) -> Result<Vec<R>, HarnessError> {
        check_status(&response, 200)?;
        decode(&response.body)
    }

    /// Success requires 200 and the requested id echoed back.
    pub fn parse_get(
        &self,
        response: HttpResponse,
        id: EntityId,
        expect: Expect,
    ) -> Result<Outcome<R>, HarnessError> {
        parse_outcome(response, expect, 200, |entity: &R| echoed_id(entity, id))
    }

    /// Success requires 201 and a non-null server-assigned id.
    pub fn parse_create(
        &self,
        response: HttpResponse,
        expect: Expect,
    ) -> Result<Outcome<R>, HarnessError> {
        parse_outcome(response, expect, 201, |entity: &R| required_id(entity).map(drop))
    }

    /// Success requires 200 and the requested id echoed back.
    pub fn parse_update(
        &self,
        response: HttpResponse,
        id: EntityId,
        expect: Expect,
    ) -> Result<Outcome<R>, HarnessError> {
        parse_outcome(response, expect, 200, |entity: &R| echoed_id(entity, id))
    }
}

impl Endpoint<Post> {
    /// Success requires 200, the id echoed back and the post moved to `trash`.
    pub fn parse_delete(
        &self,
        response: HttpResponse,
        id: EntityId,
        expect: Expect,
    ) -> Result<Outcome<Post>, HarnessError> {
        parse_outcome(response, expect, 200, |post: &Post| {
            echoed_id(post, id)?;
            match &post.status {
                Some(PostStatus::Trash) => Ok(()),
                Some(other) => Err(HarnessError::Mismatch {
                    entity: Post::KIND,
                    id,
                    field: "status",
                    expected: PostStatus::Trash.to_string(),
                    actual: other.to_string(),
                }),
                None => Err(HarnessError::MissingField {
                    entity: Post::KIND,
                    field: "status",
                }),
            }
        })
    }
}

/// Executes typed operations against a live API.
pub struct ApiClient<T> {
    transport: T,
    posts: Endpoint<Post>,
    users: Endpoint<User>,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T, config: &HarnessConfig) -> Self {
        Self {
            transport,
            posts: Endpoint::new(&config.posts_path),
            users: Endpoint::new(&config.users_path),
        }
    }

    pub fn posts(&self) -> &Endpoint<Post> {
        &self.posts
    }

    pub fn users(&self) -> &Endpoint<User> {
        &self.users
    }

    pub fn create_post(
        &self,
        spec: &RequestSpec,
        body: &PostBody,
        expect: Expect,
    ) -> Result<Outcome<Post>, HarnessError> {
        let req = self.posts.build_create(spec, body)?;
        self.posts.parse_create(self.transport.send(&req)?, expect)
    }

    pub fn get_post(
        &self,
        spec: &RequestSpec,
        id: EntityId,
        expect: Expect,
    ) -> Result<Outcome<Post>, HarnessError> {
        let req = self.posts.build_get(spec, id);
        self.posts.parse_get(self.transport.send(&req)?, id, expect)
    }

    pub fn list_posts(&self, spec: &RequestSpec) -> Result<Vec<Post>, HarnessError> {
        let req = self.posts.build_list(spec);
        self.posts.parse_list(self.transport.send(&req)?)
    }

    pub fn update_post(
        &self,
        spec: &RequestSpec,
        id: EntityId,
        body: &PostBody,
        expect: Expect,
    ) -> Result<Outcome<Post>, HarnessError> {
        let req = self.posts.build_update(spec, id, body)?;
        self.posts.parse_update(self.transport.send(&req)?, id, expect)
    }

    pub fn delete_post(
        &self,
        spec: &RequestSpec,
        id: EntityId,
        expect: Expect,
    ) -> Result<Outcome<Post>, HarnessError> {
        let req = self.posts.build_delete(spec, id);
        self.posts.parse_delete(self.transport.send(&req)?, id, expect)
    }

    pub fn list_users(&self, spec: &RequestSpec) -> Result<Vec<User>, HarnessError> {
        let req = self.users.build_list(spec);
        self.users.parse_list(self.transport.send(&req)?)
    }

    pub fn get_user(
        &self,
        spec: &RequestSpec,
        id: EntityId,
        expect: Expect,
    ) -> Result<Outcome<User>, HarnessError> {
        let req = self.users.build_get(spec, id);
        self.users.parse_get(self.transport.send(&req)?, id, expect)
    }
}

/// Enforces the declared expectation, then decodes the matching shape.
fn parse_outcome<R, F>(
    response: HttpResponse,
    expect: Expect,
    success_status: u16,
    check: F,
) -> Result<Outcome<R>, HarnessError>
where
    R: DeserializeOwned,
    F: FnOnce(&R) -> Result<(), HarnessError>,
{
    match expect {
        Expect::Success => {
            check_status(&response, success_status)?;
            let entity: R = decode(&response.body)?;
            check(&entity)?;
            Ok(Outcome::Entity(entity))
        }
        Expect::Failure(status) => {
            check_status(&response, status)?;
            let envelope: ErrorEnvelope = decode(&response.body)?;
            if envelope.code.is_empty() {
                return Err(HarnessError::MissingField {
                    entity: "error envelope",
                    field: "code",
                });
            }
            match envelope.status() {
                None => Err(HarnessError::MissingField {
                    entity: "error envelope",
                    field: "data.status",
                }),
                Some(nested) if nested != status => Err(HarnessError::EnvelopeMismatch {
                    field: "data.status",
                    expected: status.to_string(),
                    actual: nested.to_string(),
                }),
                Some(_) => Ok(Outcome::Error(envelope)),
            }
        }
    }
}

fn check_status(response: &HttpResponse, expected: u16) -> Result<(), HarnessError> {
    if response.status == expected {
        return Ok(());
    }
    Err(HarnessError::UnexpectedStatus {
        expected,
        actual: response.status,
        body: response.body.clone(),
    })
}

fn required_id<R: Resource>(entity: &R) -> Result<EntityId, HarnessError> {
    entity.id().ok_or(HarnessError::MissingField {
        entity: R::KIND,
        field: "id",
    })
}

fn echoed_id<R: Resource>(entity: &R, expected: EntityId) -> Result<(), HarnessError> {
    let actual = required_id(entity)?;
    if actual != expected {
        return Err(HarnessError::IdMismatch { expected, actual });
    }
    Ok(())
}

fn encode<B: Serialize>(body: &B) -> Result<String, HarnessError> {
    serde_json::to_string(body).map_err(|e| HarnessError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, HarnessError> {
    serde_json::from_str(body).map_err(|e| HarnessError::Deserialization(e.to_string()))
}
