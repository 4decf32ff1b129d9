use std::sync::Arc;

use note_core::content_store::GitContentStore;
use note_core::contracts::MetadataStore;
use note_core::metadata_store::SqliteMetadataStore;
use note_core::model::UseStatus;
use note_core::search_index::TantivySearchIndex;
use note_core::Reconciler;

async fn fixture() -> (
    Arc<GitContentStore>,
    Arc<SqliteMetadataStore>,
    Arc<TantivySearchIndex>,
    tempfile::TempDir,
) {
    let dir = tempfile::tempdir().unwrap();
    let cs = Arc::new(GitContentStore::open_or_init(dir.path().join("repo")).unwrap());
    let ms = Arc::new(SqliteMetadataStore::open_in_memory().await.unwrap());
    let si = Arc::new(TantivySearchIndex::open_or_create(&dir.path().join("index"), Default::default()).unwrap());
    (cs, ms, si, dir)
}

#[tokio::test]
async fn discovers_notes_with_no_metadata_row() {
    let (cs, ms, si, _dir) = fixture().await;
    cs.write_and_commit("Orphan.md", "content", "alice", "Save/Update note: Orphan").await.unwrap();

    Reconciler::new(cs.clone(), ms.clone(), si.clone()).run().await.unwrap();

    let row = ms.find_by_title("Orphan").await.unwrap().expect("reconciled row");
    assert_eq!(row.use_status, UseStatus::Usable);
    assert_eq!(row.last_modified_by, "SYSTEM");
}

#[tokio::test]
async fn disables_rows_whose_file_vanished() {
    let (cs, ms, si, dir) = fixture().await;
    cs.write_and_commit("Gone.md", "content", "alice", "Save/Update note: Gone").await.unwrap();
    Reconciler::new(cs.clone(), ms.clone(), si.clone()).run().await.unwrap();
    assert!(ms.find_by_title("Gone").await.unwrap().is_some());

    std::fs::remove_file(dir.path().join("repo").join("Gone.md")).unwrap();
    Reconciler::new(cs.clone(), ms.clone(), si.clone()).run().await.unwrap();

    let row = ms.find_by_title("Gone").await.unwrap().expect("row kept, soft-deleted");
    assert_eq!(row.use_status, UseStatus::Disabled);
}

#[tokio::test]
async fn running_twice_in_a_row_is_a_no_op() {
    let (cs, ms, si, _dir) = fixture().await;
    cs.write_and_commit("Stable.md", "content", "alice", "Save/Update note: Stable").await.unwrap();

    Reconciler::new(cs.clone(), ms.clone(), si.clone()).run().await.unwrap();
    let first = ms.find_by_title("Stable").await.unwrap().unwrap();

    Reconciler::new(cs.clone(), ms.clone(), si.clone()).run().await.unwrap();
    let second = ms.find_by_title("Stable").await.unwrap().unwrap();

    assert_eq!(first.last_commit_hash, second.last_commit_hash);
    assert_eq!(first.updated_at, second.updated_at);
}
