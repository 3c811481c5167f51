use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::jwt::AuthUser,
    bookmarks::{
        dto::{CreateBookmarkRequest, EditBookmarkRequest},
        repo::Bookmark,
    },
    error::ApiError,
    state::AppState,
};

pub(crate) fn is_valid_link(link: &str) -> bool {
    lazy_static! {
        static ref LINK_RE: Regex = Regex::new(r"^https?://\S+$").unwrap();
    }
    LINK_RE.is_match(link)
}

pub fn bookmark_routes() -> Router<AppState> {
    Router::new()
        .route("/bookmarks", get(list_bookmarks))
        .route("/bookmarks/create", post(create_bookmark))
        .route(
            "/bookmarks/:id",
            get(get_bookmark).patch(edit_bookmark).delete(delete_bookmark),
        )
}

#[instrument(skip(state))]
pub async fn list_bookmarks(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Bookmark>>, ApiError> {
    let bookmarks = Bookmark::list_by_user(&state.db, user_id).await?;
    Ok(Json(bookmarks))
}

#[instrument(skip(state))]
pub async fn get_bookmark(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Bookmark>, ApiError> {
    // Single-record reads are not owner-scoped; listing and mutation are.
    let bookmark = Bookmark::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Bookmark"))?;
    Ok(Json(bookmark))
}

#[instrument(skip(state, payload))]
pub async fn create_bookmark(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateBookmarkRequest>,
) -> Result<(StatusCode, Json<Bookmark>), ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::Validation("Title must not be empty".into()));
    }
    if !is_valid_link(&payload.link) {
        return Err(ApiError::Validation("Invalid link".into()));
    }

    let bookmark = Bookmark::create(
        &state.db,
        user_id,
        &payload.title,
        payload.description.as_deref(),
        &payload.link,
    )
    .await?;

    info!(bookmark_id = %bookmark.id, user_id = %user_id, "bookmark created");
    Ok((StatusCode::CREATED, Json(bookmark)))
}

#[instrument(skip(state, payload))]
pub async fn edit_bookmark(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditBookmarkRequest>,
) -> Result<StatusCode, ApiError> {
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(ApiError::Validation("Title must not be empty".into()));
        }
    }
    if let Some(link) = &payload.link {
        if !is_valid_link(link) {
            return Err(ApiError::Validation("Invalid link".into()));
        }
    }

    // Ownership is confirmed before the write, never after.
    let bookmark = Bookmark::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Bookmark"))?;
    if bookmark.user_id != user_id {
        warn!(bookmark_id = %id, user_id = %user_id, "edit denied, not owner");
        return Err(ApiError::Forbidden);
    }

    Bookmark::update(
        &state.db,
        id,
        payload.title.as_deref(),
        payload.description.as_deref(),
        payload.link.as_deref(),
    )
    .await?;

    info!(bookmark_id = %id, user_id = %user_id, "bookmark updated");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_bookmark(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let bookmark = Bookmark::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Bookmark"))?;
    if bookmark.user_id != user_id {
        warn!(bookmark_id = %id, user_id = %user_id, "delete denied, not owner");
        return Err(ApiError::Forbidden);
    }

    Bookmark::delete(&state.db, id).await?;

    info!(bookmark_id = %id, user_id = %user_id, "bookmark deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::User;
    use crate::config::{AppConfig, JwtConfig};
    use crate::state::clean_db;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    async fn test_state() -> AppState {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for db tests");
        let db = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect to test database");
        let config = Arc::new(AppConfig {
            database_url: url,
            jwt: JwtConfig {
                secret: "test-secret".into(),
                ttl_minutes: 15,
            },
        });
        AppState { db, config }
    }

    #[tokio::test]
    #[ignore = "requires a live, migrated database"]
    async fn only_the_owner_can_edit_or_delete() {
        let state = test_state().await;
        clean_db(&state.db).await.expect("clean");

        let alice = User::create(&state.db, "alice@example.com", "hash")
            .await
            .unwrap();
        let bob = User::create(&state.db, "bob@example.com", "hash").await.unwrap();
        let bookmark = Bookmark::create(&state.db, alice.id, "t", None, "http://e.com")
            .await
            .unwrap();

        // Bob is authenticated but not the owner: both mutations are denied.
        let patch = edit_bookmark(
            State(state.clone()),
            AuthUser(bob.id),
            Path(bookmark.id),
            Json(EditBookmarkRequest {
                title: Some("hijacked".into()),
                description: None,
                link: None,
            }),
        )
        .await;
        assert!(matches!(patch, Err(ApiError::Forbidden)));

        let delete = delete_bookmark(State(state.clone()), AuthUser(bob.id), Path(bookmark.id)).await;
        assert!(matches!(delete, Err(ApiError::Forbidden)));

        // The record is untouched.
        let unchanged = Bookmark::find_by_id(&state.db, bookmark.id)
            .await
            .unwrap()
            .expect("bookmark still present");
        assert_eq!(unchanged.title, "t");

        // Alice performs the same operations and succeeds.
        let patch = edit_bookmark(
            State(state.clone()),
            AuthUser(alice.id),
            Path(bookmark.id),
            Json(EditBookmarkRequest {
                title: Some("renamed".into()),
                description: None,
                link: None,
            }),
        )
        .await;
        assert_eq!(patch.unwrap(), StatusCode::NO_CONTENT);

        let delete = delete_bookmark(State(state.clone()), AuthUser(alice.id), Path(bookmark.id)).await;
        assert_eq!(delete.unwrap(), StatusCode::NO_CONTENT);
        assert!(Bookmark::find_by_id(&state.db, bookmark.id)
            .await
            .unwrap()
            .is_none());

        clean_db(&state.db).await.expect("clean");
    }

    #[test]
    fn link_validation() {
        assert!(is_valid_link("http://e.com"));
        assert!(is_valid_link("https://example.com/path?q=1"));
        assert!(!is_valid_link(""));
        assert!(!is_valid_link("example.com"));
        assert!(!is_valid_link("ftp://example.com"));
        assert!(!is_valid_link("http://bad host"));
    }
}
