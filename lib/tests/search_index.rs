use std::collections::HashMap;

use note_core::contracts::SearchIndex;
use note_core::search_index::TantivySearchIndex;

#[tokio::test]
async fn search_expands_configured_synonyms() {
    let dir = tempfile::tempdir().unwrap();
    let synonyms = HashMap::from([("smartphone".to_string(), vec!["cellphone".to_string()])]);
    let index = TantivySearchIndex::open_or_create(&dir.path().join("index"), synonyms).unwrap();

    index
        .update_document("Upgrade", "time to buy a new smartphone before the trip")
        .await
        .unwrap();

    // "cellphone" never appears in the indexed text; only the configured
    // synonym expansion (spec ss4.7 point 3) makes this match.
    let hits = index.search("cellphone", 10).await.unwrap();
    assert_eq!(hits, vec!["Upgrade".to_string()]);
}

#[tokio::test]
async fn search_without_synonym_match_returns_no_hits() {
    let dir = tempfile::tempdir().unwrap();
    let synonyms = HashMap::from([("smartphone".to_string(), vec!["cellphone".to_string()])]);
    let index = TantivySearchIndex::open_or_create(&dir.path().join("index"), synonyms).unwrap();

    index.update_document("Recipe", "a note about baking bread").await.unwrap();

    let hits = index.search("cellphone", 10).await.unwrap();
    assert!(hits.is_empty());
}
