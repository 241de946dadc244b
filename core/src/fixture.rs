//! Out-of-band fixtures written straight to the store.
//!
//! Used only for entities the API cannot create without side effects
//! (users, posts owned by a specific author). The store returns no generated
//! id, so each seed re-queries by its unique key.

use tracing::info;
use uuid::Uuid;

use crate::error::HarnessError;
use crate::store::{NewPost, NewUser, PostRow, Store, UserRow};
use crate::types::EntityId;

/// `prefix` plus a random suffix, unique for the lifetime of a scenario.
pub fn unique_title(prefix: &str) -> String {
    format!("{prefix} {}", Uuid::new_v4().simple())
}

/// Inserts a post and reads it back by title.
///
/// The title must be unique in the store (see `unique_title`).
pub fn seed_post(store: &Store, post: &NewPost) -> Result<PostRow, HarnessError> {
    store.insert_post(post)?;
    let row = store
        .find_post_by_title(&post.title)?
        .ok_or_else(|| HarnessError::SeedLost {
            entity: "post",
            key: post.title.clone(),
        })?;
    info!(id = row.id, status = %row.status, "seeded post");
    Ok(row)
}

/// Inserts a user and reads it back by login.
pub fn seed_user(store: &Store, user: &NewUser) -> Result<UserRow, HarnessError> {
    store.insert_user(user)?;
    let row = store
        .find_user_by_login(&user.login)?
        .ok_or_else(|| HarnessError::SeedLost {
            entity: "user",
            key: user.login.clone(),
        })?;
    info!(id = row.id, login = %row.login, "seeded user");
    Ok(row)
}

pub fn remove_post(store: &Store, id: EntityId) -> Result<(), HarnessError> {
    store.delete_post(id)
}

pub fn remove_user(store: &Store, id: EntityId) -> Result<(), HarnessError> {
    store.delete_user(id)
}
