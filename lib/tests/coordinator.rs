use std::sync::Arc;

use note_core::content_store::GitContentStore;
use note_core::metadata_store::SqliteMetadataStore;
use note_core::model::SaveAction;
use note_core::search_index::TantivySearchIndex;
use note_core::NoteCoordinator;
use note_core::NoteError;

async fn fixture() -> (NoteCoordinator, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let cs = Arc::new(GitContentStore::open_or_init(dir.path().join("repo")).unwrap());
    let ms = Arc::new(SqliteMetadataStore::open_in_memory().await.unwrap());
    let si = Arc::new(TantivySearchIndex::open_or_create(&dir.path().join("index"), Default::default()).unwrap());
    (NoteCoordinator::new(cs, ms, si), dir)
}

#[tokio::test]
async fn save_creates_then_updates() {
    let (coordinator, _dir) = fixture().await;

    let created = coordinator.save("Alpha", "first body", "alice", None).await.unwrap();
    assert_eq!(created.action, SaveAction::Created);
    assert_eq!(created.file_name, "Alpha.md");

    let updated = coordinator
        .save("Alpha", "second body", "bob", Some(created.commit_hash.as_str()))
        .await
        .unwrap();
    assert_eq!(updated.action, SaveAction::Updated);
    assert_ne!(updated.commit_hash, created.commit_hash);

    let (notes, total) = coordinator.list(1, 10).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(notes[0].last_modified_by, "bob");
}

#[tokio::test]
async fn save_rejects_invalid_titles() {
    let (coordinator, _dir) = fixture().await;

    let err = coordinator.save("", "x", "alice", None).await.unwrap_err();
    assert!(matches!(err, NoteError::Validation(_)));

    let err = coordinator.save("a/../b", "x", "alice", None).await.unwrap_err();
    assert!(matches!(err, NoteError::Validation(_)));
}

#[tokio::test]
async fn save_conflict_surfaces_full_detail() {
    let (coordinator, _dir) = fixture().await;

    let created = coordinator.save("Beta", "line one\n", "alice", None).await.unwrap();

    // bob saves on top of the same base, changing a disjoint line so a
    // real three-way merge would usually succeed... but we overlap the
    // exact same line to force a conflict.
    coordinator
        .save("Beta", "line one changed by bob\n", "bob", Some(created.commit_hash.as_str()))
        .await
        .unwrap();

    let err = coordinator
        .save(
            "Beta",
            "line one changed by carol\n",
            "carol",
            Some(created.commit_hash.as_str()),
        )
        .await
        .unwrap_err();

    match err {
        NoteError::Conflict { title, detail } => {
            assert_eq!(title, "Beta");
            assert_eq!(detail.modified_by, "bob");
            assert!(detail.server_content.contains("bob"));
        }
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn save_auto_merges_disjoint_changes() {
    let (coordinator, _dir) = fixture().await;

    let created = coordinator
        .save("Gamma", "line one\nline two\nline three\n", "alice", None)
        .await
        .unwrap();

    coordinator
        .save(
            "Gamma",
            "line one EDITED\nline two\nline three\n",
            "bob",
            Some(created.commit_hash.as_str()),
        )
        .await
        .unwrap();

    let outcome = coordinator
        .save(
            "Gamma",
            "line one\nline two\nline three EDITED\n",
            "carol",
            Some(created.commit_hash.as_str()),
        )
        .await
        .unwrap();
    assert_eq!(outcome.action, SaveAction::Updated);
}

#[tokio::test]
async fn search_falls_back_to_list_on_empty_keyword() {
    let (coordinator, _dir) = fixture().await;
    coordinator.save("Delta", "hello world", "alice", None).await.unwrap();

    let (notes, total) = coordinator.search("", 1, 10).await.unwrap();
    assert_eq!(total, 1);
    assert_eq!(notes[0].title, "Delta");
}

#[tokio::test]
async fn search_matches_indexed_content() {
    let (coordinator, _dir) = fixture().await;
    coordinator.save("Epsilon", "a note about rust programming", "alice", None).await.unwrap();
    coordinator.save("Zeta", "a note about baking bread", "alice", None).await.unwrap();

    // Background indexing is detached; give it a moment to land.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let (notes, _total) = coordinator.search("rust", 1, 10).await.unwrap();
    assert!(notes.iter().any(|n| n.title == "Epsilon"));
}

#[tokio::test]
async fn history_orders_newest_first_with_initial_sentinel() {
    let (coordinator, _dir) = fixture().await;
    let created = coordinator.save("Eta", "v1\n", "alice", None).await.unwrap();
    coordinator
        .save("Eta", "v2\n", "alice", Some(created.commit_hash.as_str()))
        .await
        .unwrap();

    let history = coordinator.get_history("Eta").await.unwrap().expect("note exists");
    assert_eq!(history.git_history.len(), 2);
    let oldest = history.git_history.last().unwrap();
    assert_eq!(oldest.diff.as_deref(), Some(note_core::model::INITIAL_COMMIT_DIFF));
}

#[tokio::test]
async fn history_missing_note_returns_none() {
    let (coordinator, _dir) = fixture().await;
    assert!(coordinator.get_history("Nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn tree_reflects_saved_notes() {
    let (coordinator, _dir) = fixture().await;
    coordinator.save("Theta", "content", "alice", None).await.unwrap();

    let tree = coordinator.get_tree().await.unwrap();
    assert!(tree.iter().any(|n| n.name == "Theta"));
}
