//! Direct read/write access to the CMS's SQLite store, independent of the API.
//!
//! # Design
//! `Store` holds only the database path. Every operation opens its own
//! connection, runs one prepared statement and drops the connection before
//! returning, on success and error paths alike. Nothing is pooled or cached,
//! so each read reflects the latest committed row. The schema belongs to the
//! system under test: opening never creates the file or any table.
//!
//! Reads return `Option`/`Vec` so absence is an ordinary, assertable value.
//! Writes return nothing; callers recover generated ids by re-querying.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::HarnessError;
use crate::types::{EntityId, PostStatus};

/// A `wp_posts` row with raw (unrendered) values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: EntityId,
    pub author: EntityId,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
}

/// A `wp_users` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: EntityId,
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
}

/// Values for a direct post insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author: EntityId,
    pub title: String,
    pub content: String,
    pub status: PostStatus,
}

/// Values for a direct user insert. The password is hashed on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub password: String,
}

const POST_COLUMNS: &str = "ID, post_author, post_title, post_content, post_status";
const USER_COLUMNS: &str = "ID, user_login, user_email, user_pass, display_name";

#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection, HarnessError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(conn)
    }

    pub fn find_post(&self, id: EntityId) -> Result<Option<PostRow>, HarnessError> {
        let conn = self.connect()?;
        debug!(id, "store: find post");
        let row = conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM wp_posts WHERE ID = ?1"),
                params![id],
                post_from_row,
            )
            .optional()?;
        Ok(row)
    }

    /// The newest post with exactly this title.
    pub fn find_post_by_title(&self, title: &str) -> Result<Option<PostRow>, HarnessError> {
        let conn = self.connect()?;
        debug!(title, "store: find post by title");
        let row = conn
            .query_row(
                &format!(
                    "SELECT {POST_COLUMNS} FROM wp_posts WHERE post_title = ?1 ORDER BY ID DESC LIMIT 1"
                ),
                params![title],
                post_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn list_posts(&self) -> Result<Vec<PostRow>, HarnessError> {
        let conn = self.connect()?;
        debug!("store: list posts");
        let mut stmt = conn.prepare(&format!("SELECT {POST_COLUMNS} FROM wp_posts ORDER BY ID"))?;
        let rows = stmt
            .query_map([], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_post(&self, post: &NewPost) -> Result<(), HarnessError> {
        let conn = self.connect()?;
        debug!(title = %post.title, status = %post.status, "store: insert post");
        conn.execute(
            "INSERT INTO wp_posts (post_author, post_title, post_content, post_status)
             VALUES (?1, ?2, ?3, ?4)",
            params![post.author, post.title, post.content, post.status.as_str()],
        )?;
        Ok(())
    }

    pub fn delete_post(&self, id: EntityId) -> Result<(), HarnessError> {
        let conn = self.connect()?;
        debug!(id, "store: delete post");
        conn.execute("DELETE FROM wp_posts WHERE ID = ?1", params![id])?;
        Ok(())
    }

    pub fn find_user(&self, id: EntityId) -> Result<Option<UserRow>, HarnessError> {
        let conn = self.connect()?;
        debug!(id, "store: find user");
        let row = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM wp_users WHERE ID = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn find_user_by_login(&self, login: &str) -> Result<Option<UserRow>, HarnessError> {
        let conn = self.connect()?;
        debug!(login, "store: find user by login");
        let row = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM wp_users WHERE user_login = ?1"),
                params![login],
                user_from_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn list_users(&self) -> Result<Vec<UserRow>, HarnessError> {
        let conn = self.connect()?;
        debug!("store: list users");
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM wp_users ORDER BY ID"))?;
        let rows = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Inserts a user whose display name equals its login.
    pub fn insert_user(&self, user: &NewUser) -> Result<(), HarnessError> {
        let conn = self.connect()?;
        debug!(login = %user.login, "store: insert user");
        conn.execute(
            "INSERT INTO wp_users (user_login, user_email, user_pass, display_name)
             VALUES (?1, ?2, ?3, ?1)",
            params![user.login, user.email, hash_password(&user.password)],
        )?;
        Ok(())
    }

    pub fn delete_user(&self, id: EntityId) -> Result<(), HarnessError> {
        let conn = self.connect()?;
        debug!(id, "store: delete user");
        conn.execute("DELETE FROM wp_users WHERE ID = ?1", params![id])?;
        Ok(())
    }
}

/// Lowercase hex SHA-256, the format of the `user_pass` column.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        status: PostStatus::from(row.get::<_, String>(4)?),
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        login: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        display_name: row.get(4)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use tempfile::TempDir;

    use super::*;

    /// Creates the CMS tables in a fresh temp database.
    pub(crate) fn temp_store() -> (TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cms.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE wp_posts (
                ID INTEGER PRIMARY KEY AUTOINCREMENT,
                post_author INTEGER NOT NULL DEFAULT 0,
                post_title TEXT NOT NULL DEFAULT '',
                post_content TEXT NOT NULL DEFAULT '',
                post_status TEXT NOT NULL DEFAULT 'draft'
            );
            CREATE TABLE wp_users (
                ID INTEGER PRIMARY KEY AUTOINCREMENT,
                user_login TEXT NOT NULL UNIQUE,
                user_email TEXT NOT NULL DEFAULT '',
                user_pass TEXT NOT NULL DEFAULT '',
                display_name TEXT NOT NULL DEFAULT ''
            );",
        )
        .unwrap();
        (dir, Store::new(path))
    }

    pub(crate) fn new_post(title: &str, status: PostStatus) -> NewPost {
        NewPost {
            author: 1,
            title: title.to_string(),
            content: "Контент созданной записи".to_string(),
            status,
        }
    }

    #[test]
    fn missing_database_is_an_error_not_a_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("absent.db"));
        assert!(matches!(store.find_post(1), Err(HarnessError::Store(_))));
        assert!(!dir.path().join("absent.db").exists());
    }

    #[test]
    fn find_post_absent_is_none() {
        let (_dir, store) = temp_store();
        assert_eq!(store.find_post(999_999).unwrap(), None);
        assert_eq!(store.find_post_by_title("nope").unwrap(), None);
    }

    #[test]
    fn insert_then_find_by_title_recovers_id() {
        let (_dir, store) = temp_store();
        store.insert_post(&new_post("Созданная запись в бд", PostStatus::Publish)).unwrap();

        let row = store.find_post_by_title("Созданная запись в бд").unwrap().unwrap();
        assert_eq!(row.status, PostStatus::Publish);
        assert_eq!(row.content, "Контент созданной записи");
        assert_eq!(store.find_post(row.id).unwrap(), Some(row));
    }

    #[test]
    fn find_by_title_prefers_newest() {
        let (_dir, store) = temp_store();
        store.insert_post(&new_post("dup", PostStatus::Draft)).unwrap();
        store.insert_post(&new_post("dup", PostStatus::Private)).unwrap();
        let row = store.find_post_by_title("dup").unwrap().unwrap();
        assert_eq!(row.status, PostStatus::Private);
    }

    #[test]
    fn list_and_delete_posts() {
        let (_dir, store) = temp_store();
        store.insert_post(&new_post("a", PostStatus::Publish)).unwrap();
        store.insert_post(&new_post("b", PostStatus::Trash)).unwrap();
        let rows = store.list_posts().unwrap();
        assert_eq!(rows.len(), 2);

        store.delete_post(rows[0].id).unwrap();
        assert_eq!(store.find_post(rows[0].id).unwrap(), None);
        assert_eq!(store.list_posts().unwrap().len(), 1);
    }

    #[test]
    fn insert_user_hashes_password() {
        let (_dir, store) = temp_store();
        store
            .insert_user(&NewUser {
                login: "tester".to_string(),
                email: "tester@example.com".to_string(),
                password: "secret".to_string(),
            })
            .unwrap();

        let row = store.find_user_by_login("tester").unwrap().unwrap();
        assert_eq!(row.display_name, "tester");
        assert_eq!(row.password_hash, hash_password("secret"));
        assert_ne!(row.password_hash, "secret");
        assert_eq!(store.find_user(row.id).unwrap(), Some(row.clone()));
        assert_eq!(store.list_users().unwrap(), vec![row.clone()]);

        store.delete_user(row.id).unwrap();
        assert_eq!(store.find_user(row.id).unwrap(), None);
    }

    #[test]
    fn hash_password_is_hex_sha256() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
