//! HTTP handlers, per spec §6. Thin: all decisions live in
//! `NoteCoordinator`; handlers only translate between wire shapes and the
//! core API and map errors via `AppError`.

use std::sync::Arc;

use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use note_core::NoteCoordinator;
use note_core::NoteError;

use crate::dto::list_response;
use crate::dto::FolderTreeResponse;
use crate::dto::ListQuery;
use crate::dto::SaveRequest;
use crate::dto::SaveResponse;
use crate::error::AppError;

pub fn router(coordinator: Arc<NoteCoordinator>) -> Router {
    Router::new()
        .route("/notes", get(list_or_search))
        .route("/notes/folder-tree", get(folder_tree))
        .route("/notes/save", post(save))
        .route("/notes/:title/history", get(history))
        .with_state(coordinator)
}

async fn list_or_search(
    State(coordinator): State<Arc<NoteCoordinator>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<crate::dto::ListResponse>, AppError> {
    let (items, total_count) = match &query.keyword {
        Some(keyword) if !keyword.is_empty() => {
            coordinator.search(keyword, query.page, query.size).await?
        }
        _ => coordinator.list(query.page, query.size).await?,
    };
    Ok(Json(list_response(items, total_count, query.page, query.size, query.keyword.as_deref())))
}

async fn folder_tree(State(coordinator): State<Arc<NoteCoordinator>>) -> Result<Json<FolderTreeResponse>, AppError> {
    let data = coordinator.get_tree().await?;
    Ok(Json(FolderTreeResponse {
        success: true,
        data,
        message: "ok".to_string(),
    }))
}

async fn save(
    State(coordinator): State<Arc<NoteCoordinator>>,
    Json(request): Json<SaveRequest>,
) -> Result<Json<SaveResponse>, AppError> {
    let outcome = coordinator
        .save(&request.title, &request.content, &request.user_name, request.last_hash.as_deref())
        .await?;
    Ok(Json(outcome.into()))
}

async fn history(
    State(coordinator): State<Arc<NoteCoordinator>>,
    Path(title): Path<String>,
) -> Result<Json<note_core::NoteHistory>, AppError> {
    let history = coordinator
        .get_history(&title)
        .await?
        .ok_or_else(|| NoteError::NotFound(title.clone()))?;
    Ok(Json(history))
}
