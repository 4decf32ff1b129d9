use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use note_core::GitContentStore;
use note_core::NoteCoordinator;
use note_core::SqliteMetadataStore;
use note_core::TantivySearchIndex;
use note_server::routes::router;
use tower::ServiceExt;

async fn test_app() -> (axum::Router, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cs = Arc::new(GitContentStore::open_or_init(dir.path().join("repo")).unwrap());
    let ms = Arc::new(SqliteMetadataStore::open(&dir.path().join("db").join("notes.db")).await.unwrap());
    let si = Arc::new(TantivySearchIndex::open_or_create(&dir.path().join("index"), Default::default()).unwrap());
    let coordinator = Arc::new(NoteCoordinator::new(cs, ms, si));
    (router(coordinator), dir)
}

#[tokio::test]
async fn save_then_list_round_trips() {
    let (app, _dir) = test_app().await;

    let save_request = Request::builder()
        .method("POST")
        .uri("/notes/save")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"title": "Meeting", "content": "hello", "user_name": "alice"}).to_string(),
        ))
        .unwrap();
    let response = app.clone().oneshot(save_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let list_request = Request::builder().uri("/notes").body(Body::empty()).unwrap();
    let response = app.oneshot(list_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["metadata"]["total_count"], 1);
    assert_eq!(value["items"][0]["title"], "Meeting");
}

#[tokio::test]
async fn conflicting_save_returns_409_with_conflict_data() {
    let (app, _dir) = test_app().await;

    let first = Request::builder()
        .method("POST")
        .uri("/notes/save")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"title": "Meeting", "content": "hello", "user_name": "alice"}).to_string(),
        ))
        .unwrap();
    app.clone().oneshot(first).await.unwrap();

    let stale = Request::builder()
        .method("POST")
        .uri("/notes/save")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "title": "Meeting",
                "content": "hi",
                "user_name": "bob",
                "last_hash": "deadbeef",
            })
            .to_string(),
        ))
        .unwrap();
    let response = app.oneshot(stale).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["error_code"], "NOTE_CONFLICT");
    assert_eq!(value["conflict_data"]["server_content"], "hello");
}

#[tokio::test]
async fn history_for_unknown_title_is_404() {
    let (app, _dir) = test_app().await;
    let request = Request::builder().uri("/notes/Nobody/history").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn folder_tree_lists_saved_notes() {
    let (app, _dir) = test_app().await;
    let save_request = Request::builder()
        .method("POST")
        .uri("/notes/save")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({"title": "Agenda", "content": "x", "user_name": "alice"}).to_string(),
        ))
        .unwrap();
    app.clone().oneshot(save_request).await.unwrap();

    let request = Request::builder().uri("/notes/folder-tree").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["data"][0]["name"], "Agenda");
}
