//! SQLite schema and queries for the mock CMS.
//!
//! The tables mirror the subset of the WordPress schema the harness reads.
//! `wp_users.role` stands in for WordPress capabilities; rows inserted
//! without a role are subscribers.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};

pub const ADMIN_LOGIN: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";
pub const AUTHOR_LOGIN: &str = "author";
pub const AUTHOR_PASSWORD: &str = "author-password";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS wp_posts (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    post_author INTEGER NOT NULL DEFAULT 0,
    post_title TEXT NOT NULL DEFAULT '',
    post_content TEXT NOT NULL DEFAULT '',
    post_status TEXT NOT NULL DEFAULT 'draft'
);
CREATE TABLE IF NOT EXISTS wp_users (
    ID INTEGER PRIMARY KEY AUTOINCREMENT,
    user_login TEXT NOT NULL UNIQUE,
    user_email TEXT NOT NULL DEFAULT '',
    user_pass TEXT NOT NULL DEFAULT '',
    display_name TEXT NOT NULL DEFAULT '',
    role TEXT NOT NULL DEFAULT 'subscriber'
);";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Author,
    Subscriber,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::Administrator => "administrator",
            Role::Author => "author",
            Role::Subscriber => "subscriber",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "administrator" => Role::Administrator,
            "author" => Role::Author,
            _ => Role::Subscriber,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostRecord {
    pub id: i64,
    pub author: i64,
    pub title: String,
    pub content: String,
    pub status: String,
}

#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub login: String,
    pub display_name: String,
    pub role: Role,
}

/// Opens (creating if needed) the database and seeds the admin and author
/// accounts on first use.
pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    init(conn)
}

pub fn open_in_memory() -> rusqlite::Result<Connection> {
    init(Connection::open_in_memory()?)
}

fn init(conn: Connection) -> rusqlite::Result<Connection> {
    conn.execute_batch(SCHEMA)?;
    let users: i64 = conn.query_row("SELECT COUNT(*) FROM wp_users", [], |row| row.get(0))?;
    if users == 0 {
        insert_user(&conn, ADMIN_LOGIN, "admin@example.com", ADMIN_PASSWORD, Role::Administrator)?;
        insert_user(&conn, AUTHOR_LOGIN, "author@example.com", AUTHOR_PASSWORD, Role::Author)?;
    }
    Ok(conn)
}

pub fn insert_user(
    conn: &Connection,
    login: &str,
    email: &str,
    password: &str,
    role: Role,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO wp_users (user_login, user_email, user_pass, display_name, role)
         VALUES (?1, ?2, ?3, ?1, ?4)",
        params![login, email, hash_password(password), role.as_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns the account only when the password hash matches.
pub fn authenticate(
    conn: &Connection,
    login: &str,
    password: &str,
) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        "SELECT ID, user_login, display_name, role FROM wp_users
         WHERE user_login = ?1 AND user_pass = ?2",
        params![login, hash_password(password)],
        account_from_row,
    )
    .optional()
}

pub fn find_user(conn: &Connection, id: i64) -> rusqlite::Result<Option<Account>> {
    conn.query_row(
        "SELECT ID, user_login, display_name, role FROM wp_users WHERE ID = ?1",
        params![id],
        account_from_row,
    )
    .optional()
}

pub fn list_users(conn: &Connection) -> rusqlite::Result<Vec<Account>> {
    let mut stmt =
        conn.prepare("SELECT ID, user_login, display_name, role FROM wp_users ORDER BY ID")?;
    let rows = stmt.query_map([], account_from_row)?;
    rows.collect()
}

pub fn find_post(conn: &Connection, id: i64) -> rusqlite::Result<Option<PostRecord>> {
    conn.query_row(
        "SELECT ID, post_author, post_title, post_content, post_status FROM wp_posts WHERE ID = ?1",
        params![id],
        post_from_row,
    )
    .optional()
}

/// Published posts, newest first.
pub fn list_published(conn: &Connection) -> rusqlite::Result<Vec<PostRecord>> {
    let mut stmt = conn.prepare(
        "SELECT ID, post_author, post_title, post_content, post_status FROM wp_posts
         WHERE post_status = 'publish' ORDER BY ID DESC",
    )?;
    let rows = stmt.query_map([], post_from_row)?;
    rows.collect()
}

pub fn insert_post(
    conn: &Connection,
    author: i64,
    title: &str,
    content: &str,
    status: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO wp_posts (post_author, post_title, post_content, post_status)
         VALUES (?1, ?2, ?3, ?4)",
        params![author, title, content, status],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_post(conn: &Connection, post: &PostRecord) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE wp_posts SET post_title = ?2, post_content = ?3, post_status = ?4 WHERE ID = ?1",
        params![post.id, post.title, post.content, post.status],
    )?;
    Ok(())
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        author: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        status: row.get(4)?,
    })
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        login: row.get(1)?,
        display_name: row.get(2)?,
        role: Role::parse(&row.get::<_, String>(3)?),
    })
}
