//! Cross-checks between API-observed state and the store.
//!
//! Every check re-reads the store through `Store`, so it always compares
//! against the latest committed row. Comparisons are exact; callers strip
//! server-side HTML wrapping (`types::strip_paragraphs`) beforehand, since the
//! store holds raw text while the API returns rendered markup.

use tracing::debug;

use crate::error::HarnessError;
use crate::store::{PostRow, Store, UserRow};
use crate::types::{EntityId, Post, PostStatus, Resource};

#[derive(Debug, Clone, Copy)]
pub struct Consistency<'s> {
    store: &'s Store,
}

impl<'s> Consistency<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self { store }
    }

    /// Requires the post row to exist with exactly these raw values.
    pub fn assert_persisted(
        &self,
        id: EntityId,
        title: &str,
        content: &str,
        status: &PostStatus,
    ) -> Result<PostRow, HarnessError> {
        let row = self.snapshot(id)?;
        field(id, "title", title, &row.title)?;
        field(id, "content", content, &row.content)?;
        field(id, "status", status.as_str(), row.status.as_str())?;
        debug!(id, "store matches expected post");
        Ok(row)
    }

    /// Requires that no post row exists for `id`.
    pub fn assert_absent(&self, id: EntityId) -> Result<(), HarnessError> {
        match self.store.find_post(id)? {
            None => Ok(()),
            Some(_) => Err(HarnessError::UnexpectedRow {
                entity: Post::KIND,
                id,
            }),
        }
    }

    /// Requires the row to still exist with exactly `status`.
    ///
    /// A soft delete must leave the row in place as `trash`; a missing row
    /// fails as `Missing`, never as a status mismatch.
    pub fn assert_status_transition(
        &self,
        id: EntityId,
        status: &PostStatus,
    ) -> Result<PostRow, HarnessError> {
        let row = self.snapshot(id)?;
        field(id, "status", status.as_str(), row.status.as_str())?;
        Ok(row)
    }

    /// Current row for `id`, which must exist.
    pub fn snapshot(&self, id: EntityId) -> Result<PostRow, HarnessError> {
        self.store.find_post(id)?.ok_or(HarnessError::Missing {
            entity: Post::KIND,
            id,
        })
    }

    /// Requires the row to be identical to an earlier snapshot.
    pub fn assert_unchanged(&self, before: &PostRow) -> Result<(), HarnessError> {
        let after = self.snapshot(before.id)?;
        field(before.id, "title", &before.title, &after.title)?;
        field(before.id, "content", &before.content, &after.content)?;
        field(before.id, "status", before.status.as_str(), after.status.as_str())?;
        field(
            before.id,
            "author",
            &before.author.to_string(),
            &after.author.to_string(),
        )?;
        Ok(())
    }

    pub fn assert_user_persisted(
        &self,
        id: EntityId,
        login: &str,
    ) -> Result<UserRow, HarnessError> {
        let row = self.store.find_user(id)?.ok_or(HarnessError::Missing {
            entity: "user",
            id,
        })?;
        if row.login != login {
            return Err(HarnessError::Mismatch {
                entity: "user",
                id,
                field: "login",
                expected: login.to_string(),
                actual: row.login,
            });
        }
        Ok(row)
    }

    /// Requires every post in an API listing to exist in the store.
    pub fn assert_subset_of_store(&self, listed: &[Post]) -> Result<(), HarnessError> {
        let stored: Vec<EntityId> = self.store.list_posts()?.iter().map(|row| row.id).collect();
        for post in listed {
            let id = post.id.ok_or(HarnessError::MissingField {
                entity: Post::KIND,
                field: "id",
            })?;
            if !stored.contains(&id) {
                return Err(HarnessError::Missing {
                    entity: Post::KIND,
                    id,
                });
            }
        }
        Ok(())
    }
}

/// Requires `id` to appear somewhere in a listing; position is irrelevant.
pub fn assert_listed<R: Resource>(listed: &[R], id: EntityId) -> Result<(), HarnessError> {
    if listed.iter().any(|entity| entity.id() == Some(id)) {
        return Ok(());
    }
    Err(HarnessError::NotListed { entity: R::KIND, id })
}

pub fn assert_not_listed<R: Resource>(listed: &[R], id: EntityId) -> Result<(), HarnessError> {
    if listed.iter().any(|entity| entity.id() == Some(id)) {
        return Err(HarnessError::UnexpectedlyListed { entity: R::KIND, id });
    }
    Ok(())
}

fn field(id: EntityId, name: &'static str, expected: &str, actual: &str) -> Result<(), HarnessError> {
    if expected == actual {
        return Ok(());
    }
    Err(HarnessError::Mismatch {
        entity: Post::KIND,
        id,
        field: name,
        expected: expected.to_string(),
        actual: actual.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{new_post, temp_store};
    use crate::store::NewUser;
    use crate::types::User;

    #[test]
    fn assert_persisted_reports_diverging_field() {
        let (_dir, store) = temp_store();
        store.insert_post(&new_post("Заголовок", PostStatus::Publish)).unwrap();
        let id = store.find_post_by_title("Заголовок").unwrap().unwrap().id;
        let check = Consistency::new(&store);

        check
            .assert_persisted(id, "Заголовок", "Контент созданной записи", &PostStatus::Publish)
            .unwrap();

        let err = check
            .assert_persisted(id, "Заголовок", "Контент созданной записи", &PostStatus::Draft)
            .unwrap_err();
        match err {
            HarnessError::Mismatch { field, expected, actual, .. } => {
                assert_eq!(field, "status");
                assert_eq!(expected, "draft");
                assert_eq!(actual, "publish");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn assert_persisted_on_missing_row() {
        let (_dir, store) = temp_store();
        let err = Consistency::new(&store)
            .assert_persisted(5, "t", "c", &PostStatus::Publish)
            .unwrap_err();
        assert!(matches!(err, HarnessError::Missing { id: 5, .. }));
    }

    #[test]
    fn assert_absent_and_status_transition() {
        let (_dir, store) = temp_store();
        let check = Consistency::new(&store);
        check.assert_absent(999_999).unwrap();

        store.insert_post(&new_post("trashed", PostStatus::Trash)).unwrap();
        let id = store.find_post_by_title("trashed").unwrap().unwrap().id;
        assert!(matches!(
            check.assert_absent(id),
            Err(HarnessError::UnexpectedRow { .. })
        ));
        check.assert_status_transition(id, &PostStatus::Trash).unwrap();

        store.delete_post(id).unwrap();
        assert!(matches!(
            check.assert_status_transition(id, &PostStatus::Trash),
            Err(HarnessError::Missing { .. })
        ));
    }

    #[test]
    fn assert_unchanged_detects_edits() {
        let (_dir, store) = temp_store();
        store.insert_post(&new_post("before", PostStatus::Publish)).unwrap();
        let check = Consistency::new(&store);
        let before = store.find_post_by_title("before").unwrap().unwrap();
        check.assert_unchanged(&before).unwrap();

        let edited = PostRow {
            title: "after".to_string(),
            ..before.clone()
        };
        assert!(matches!(
            check.assert_unchanged(&edited),
            Err(HarnessError::Mismatch { field: "title", .. })
        ));
    }

    #[test]
    fn assert_user_persisted_compares_login() {
        let (_dir, store) = temp_store();
        store
            .insert_user(&NewUser {
                login: "tester".to_string(),
                email: "t@example.com".to_string(),
                password: "pw".to_string(),
            })
            .unwrap();
        let id = store.find_user_by_login("tester").unwrap().unwrap().id;
        let check = Consistency::new(&store);
        check.assert_user_persisted(id, "tester").unwrap();
        assert!(matches!(
            check.assert_user_persisted(id, "other"),
            Err(HarnessError::Mismatch { field: "login", .. })
        ));
    }

    #[test]
    fn subset_of_store_rejects_unknown_ids() {
        let (_dir, store) = temp_store();
        store.insert_post(&new_post("x", PostStatus::Publish)).unwrap();
        let id = store.find_post_by_title("x").unwrap().unwrap().id;
        let check = Consistency::new(&store);

        let listed = vec![Post { id: Some(id), ..Post::default() }];
        check.assert_subset_of_store(&listed).unwrap();

        let listed = vec![Post { id: Some(id + 100), ..Post::default() }];
        assert!(matches!(
            check.assert_subset_of_store(&listed),
            Err(HarnessError::Missing { .. })
        ));
    }

    #[test]
    fn listing_checks_use_set_semantics() {
        let users = vec![
            User { id: Some(3), ..User::default() },
            User { id: Some(1), ..User::default() },
        ];
        assert_listed(&users, 1).unwrap();
        assert_not_listed(&users, 2).unwrap();
        assert!(matches!(
            assert_listed(&users, 2),
            Err(HarnessError::NotListed { entity: "user", id: 2 })
        ));
        assert!(matches!(
            assert_not_listed(&users, 3),
            Err(HarnessError::UnexpectedlyListed { .. })
        ));
    }
}
