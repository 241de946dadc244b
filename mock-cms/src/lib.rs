//! In-process stand-in for the CMS REST API (WordPress `wp/v2` subset).
//!
//! Serves posts and users out of the same SQLite file the harness reads
//! directly, answering with WordPress's status codes, error codes and ru_RU
//! messages. Authorization is always decided before any write.

pub mod db;

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{Path as UrlPath, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

use db::{Account, PostRecord, Role};

pub use db::{ADMIN_LOGIN, ADMIN_PASSWORD, AUTHOR_LOGIN, AUTHOR_PASSWORD};

pub const POSTS_PATH: &str = "/wp-json/wp/v2/posts";
pub const USERS_PATH: &str = "/wp-json/wp/v2/users";

const STATUSES: [&str; 6] = ["publish", "draft", "private", "trash", "pending", "future"];

pub type Db = Arc<Mutex<Connection>>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Text {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
    pub rendered: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub author: i64,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Text,
    pub content: Text,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Deserialize)]
pub struct PostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
}

/// A WordPress error envelope: `{code, message, data: {status}}`.
#[derive(Debug)]
pub struct WpError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl WpError {
    fn new(status: StatusCode, code: &'static str, message: &str) -> Self {
        Self {
            status,
            code,
            message: message.to_string(),
        }
    }

    fn invalid_post_id() -> Self {
        Self::new(StatusCode::NOT_FOUND, "rest_post_invalid_id", "Неверный ID записи.")
    }
}

impl IntoResponse for WpError {
    fn into_response(self) -> Response {
        let body = json!({
            "code": self.code,
            "message": self.message,
            "data": { "status": self.status.as_u16() },
        });
        (self.status, Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for WpError {
    fn from(err: rusqlite::Error) -> Self {
        tracing::error!(%err, "database error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "db_error", &err.to_string())
    }
}

/// Opens (or creates) the database file and builds the shared handle.
pub fn open_db(path: impl AsRef<Path>) -> rusqlite::Result<Db> {
    Ok(Arc::new(Mutex::new(db::open(path)?)))
}

pub fn memory_db() -> rusqlite::Result<Db> {
    Ok(Arc::new(Mutex::new(db::open_in_memory()?)))
}

pub fn app(db: Db) -> Router {
    Router::new()
        .route(POSTS_PATH, get(list_posts).post(create_post))
        .route(
            "/wp-json/wp/v2/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route(USERS_PATH, get(list_users))
        .route("/wp-json/wp/v2/users/{id}", get(get_user))
        .with_state(db)
}

pub async fn run(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app(db)).await
}

/// The user behind a `Basic` header. Bad or missing credentials are anonymous.
fn viewer(conn: &Connection, headers: &HeaderMap) -> Result<Option<Account>, WpError> {
    let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
    else {
        return Ok(None);
    };
    let Some(pair) = STANDARD
        .decode(token.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
    else {
        return Ok(None);
    };
    let Some((login, password)) = pair.split_once(':') else {
        return Ok(None);
    };
    Ok(db::authenticate(conn, login, password)?)
}

fn may_manage(account: &Account, post: &PostRecord) -> bool {
    account.role == Role::Administrator || account.id == post.author
}

/// 401 for anonymous viewers, 403 for users without rights over `post`.
fn require_manage(
    viewer: Option<&Account>,
    post: &PostRecord,
    code: &'static str,
    message: &str,
) -> Result<(), WpError> {
    match viewer {
        None => Err(WpError::new(StatusCode::UNAUTHORIZED, code, message)),
        Some(account) if !may_manage(account, post) => {
            Err(WpError::new(StatusCode::FORBIDDEN, code, message))
        }
        Some(_) => Ok(()),
    }
}

fn check_status(status: Option<&str>) -> Result<(), WpError> {
    match status {
        Some(s) if !STATUSES.contains(&s) => Err(WpError::new(
            StatusCode::BAD_REQUEST,
            "rest_invalid_param",
            "Неверный параметр: status",
        )),
        _ => Ok(()),
    }
}

/// One `<p>` per blank-line separated paragraph.
fn render_content(raw: &str) -> String {
    raw.trim()
        .split("\n\n")
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .map(|paragraph| format!("<p>{paragraph}</p>\n"))
        .collect()
}

/// Authenticated viewers get the edit context, which includes `raw` values.
fn post_view(post: &PostRecord, edit_context: bool) -> Post {
    Post {
        id: post.id,
        author: post.author,
        status: post.status.clone(),
        kind: "post".to_string(),
        title: Text {
            raw: edit_context.then(|| post.title.clone()),
            rendered: post.title.clone(),
        },
        content: Text {
            raw: edit_context.then(|| post.content.clone()),
            rendered: render_content(&post.content),
        },
    }
}

fn user_view(account: &Account) -> User {
    User {
        id: account.id,
        name: account.display_name.clone(),
        slug: account.login.clone(),
    }
}

async fn list_posts(State(db): State<Db>, headers: HeaderMap) -> Result<Json<Vec<Post>>, WpError> {
    let conn = db.lock().await;
    let edit_context = viewer(&conn, &headers)?.is_some();
    let posts = db::list_published(&conn)?;
    Ok(Json(posts.iter().map(|p| post_view(p, edit_context)).collect()))
}

async fn get_post(
    State(db): State<Db>,
    UrlPath(id): UrlPath<i64>,
    headers: HeaderMap,
) -> Result<Json<Post>, WpError> {
    let conn = db.lock().await;
    let viewer = viewer(&conn, &headers)?;
    let post = db::find_post(&conn, id)?.ok_or_else(WpError::invalid_post_id)?;
    if post.status != "publish" {
        require_manage(
            viewer.as_ref(),
            &post,
            "rest_forbidden",
            "Извините, вам не разрешено выполнять данное действие.",
        )?;
    }
    Ok(Json(post_view(&post, viewer.is_some())))
}

async fn create_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<PostInput>,
) -> Result<(StatusCode, Json<Post>), WpError> {
    const CANNOT_CREATE: &str =
        "Извините, вам не разрешено создавать записи от лица этого пользователя.";
    let conn = db.lock().await;
    let author = match viewer(&conn, &headers)? {
        None => {
            return Err(WpError::new(StatusCode::UNAUTHORIZED, "rest_cannot_create", CANNOT_CREATE))
        }
        Some(account) if account.role == Role::Subscriber => {
            return Err(WpError::new(StatusCode::FORBIDDEN, "rest_cannot_create", CANNOT_CREATE))
        }
        Some(account) => account,
    };

    let title = input.title.unwrap_or_default();
    let content = input.content.unwrap_or_default();
    if title.trim().is_empty() && content.trim().is_empty() {
        return Err(WpError::new(
            StatusCode::BAD_REQUEST,
            "empty_content",
            "Содержимое, заголовок и отрывок пусты.",
        ));
    }
    check_status(input.status.as_deref())?;
    let status = input.status.unwrap_or_else(|| "draft".to_string());

    let id = db::insert_post(&conn, author.id, &title, &content, &status)?;
    tracing::info!(id, author = author.id, %status, "post created");
    let post = db::find_post(&conn, id)?.ok_or_else(WpError::invalid_post_id)?;
    Ok((StatusCode::CREATED, Json(post_view(&post, true))))
}

async fn update_post(
    State(db): State<Db>,
    UrlPath(id): UrlPath<i64>,
    headers: HeaderMap,
    Json(input): Json<PostInput>,
) -> Result<Json<Post>, WpError> {
    let conn = db.lock().await;
    let mut post = db::find_post(&conn, id)?.ok_or_else(WpError::invalid_post_id)?;
    let viewer = viewer(&conn, &headers)?;
    require_manage(
        viewer.as_ref(),
        &post,
        "rest_cannot_edit",
        "Извините, вам не разрешено редактировать эту запись.",
    )?;
    check_status(input.status.as_deref())?;

    if let Some(title) = input.title {
        post.title = title;
    }
    if let Some(content) = input.content {
        post.content = content;
    }
    if let Some(status) = input.status {
        post.status = status;
    }
    db::update_post(&conn, &post)?;
    tracing::info!(id, "post updated");
    Ok(Json(post_view(&post, true)))
}

async fn delete_post(
    State(db): State<Db>,
    UrlPath(id): UrlPath<i64>,
    headers: HeaderMap,
) -> Result<Json<Post>, WpError> {
    let conn = db.lock().await;
    let mut post = db::find_post(&conn, id)?.ok_or_else(WpError::invalid_post_id)?;
    let viewer = viewer(&conn, &headers)?;
    require_manage(
        viewer.as_ref(),
        &post,
        "rest_cannot_delete",
        "Извините, вам не разрешено удалять эту запись.",
    )?;
    if post.status == "trash" {
        return Err(WpError::new(
            StatusCode::GONE,
            "rest_already_trashed",
            "Запись уже была удалена.",
        ));
    }

    post.status = "trash".to_string();
    db::update_post(&conn, &post)?;
    tracing::info!(id, "post trashed");
    Ok(Json(post_view(&post, true)))
}

async fn list_users(State(db): State<Db>) -> Result<Json<Vec<User>>, WpError> {
    let conn = db.lock().await;
    let users = db::list_users(&conn)?;
    Ok(Json(users.iter().map(user_view).collect()))
}

async fn get_user(State(db): State<Db>, UrlPath(id): UrlPath<i64>) -> Result<Json<User>, WpError> {
    let conn = db.lock().await;
    let account = db::find_user(&conn, id)?.ok_or_else(|| {
        WpError::new(StatusCode::NOT_FOUND, "rest_user_invalid_id", "Неверный ID пользователя.")
    })?;
    Ok(Json(user_view(&account)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(status: &str) -> PostRecord {
        PostRecord {
            id: 10,
            author: 2,
            title: "Title".to_string(),
            content: "Body".to_string(),
            status: status.to_string(),
        }
    }

    fn account(id: i64, role: Role) -> Account {
        Account {
            id,
            login: "u".to_string(),
            display_name: "u".to_string(),
            role,
        }
    }

    #[test]
    fn content_is_wrapped_in_paragraph() {
        assert_eq!(render_content("Привет!"), "<p>Привет!</p>\n");
        assert_eq!(render_content(""), "");
        assert_eq!(render_content("a\n\nb"), "<p>a</p>\n<p>b</p>\n");
    }

    #[test]
    fn raw_only_in_edit_context() {
        let view = serde_json::to_value(post_view(&record("publish"), false)).unwrap();
        assert!(view["title"].get("raw").is_none());
        assert_eq!(view["type"], "post");

        let view = serde_json::to_value(post_view(&record("publish"), true)).unwrap();
        assert_eq!(view["content"]["raw"], "Body");
        assert_eq!(view["content"]["rendered"], "<p>Body</p>\n");
    }

    #[test]
    fn manage_rules() {
        let post = record("private");
        assert!(require_manage(None, &post, "c", "m").is_err());
        assert!(require_manage(Some(&account(1, Role::Administrator)), &post, "c", "m").is_ok());
        assert!(require_manage(Some(&account(2, Role::Author)), &post, "c", "m").is_ok());
        let err = require_manage(Some(&account(3, Role::Author)), &post, "c", "m").unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(check_status(Some("publish")).is_ok());
        assert!(check_status(None).is_ok());
        assert_eq!(check_status(Some("bogus")).unwrap_err().status, StatusCode::BAD_REQUEST);
    }
}
