//! The Reconciler (RC): re-derives MS and SI from CS as ground truth. See
//! `spec.md` ss4.2.
//!
//! Grounded in the `notelog` reference example's `index_notes_with_channel`,
//! which scans the notes directory, diffs it against the existing DB rows,
//! and deletes DB rows whose file vanished from disk.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use itertools::Itertools;
use tracing::info;
use tracing::warn;

use crate::contracts::ContentStore;
use crate::contracts::MetadataStore;
use crate::contracts::SearchIndex;
use crate::error::NoteResult;
use crate::model::title_from_file_stem;
use crate::model::Note;
use crate::model::UseStatus;
use crate::model::SYSTEM_USER;

pub struct Reconciler {
    content_store: Arc<dyn ContentStore>,
    metadata_store: Arc<dyn MetadataStore>,
    search_index: Arc<dyn SearchIndex>,
}

impl Reconciler {
    pub fn new(
        content_store: Arc<dyn ContentStore>,
        metadata_store: Arc<dyn MetadataStore>,
        search_index: Arc<dyn SearchIndex>,
    ) -> Self {
        Self {
            content_store,
            metadata_store,
            search_index,
        }
    }

    /// Runs the full reconciliation algorithm of spec ss4.2. Idempotent:
    /// running it twice in a row with no intervening CS change is a no-op
    /// (testable property 5).
    pub async fn run(&self) -> NoteResult<()> {
        let files = self.content_store.enumerate_markdown_files().await?;
        let existing = self.metadata_store.scan_usable().await?;

        let mut by_path: HashMap<String, Note> = HashMap::new();
        let mut by_title: HashMap<String, Note> = HashMap::new();
        for note in existing {
            by_path.insert(note.file_path.clone(), note.clone());
            by_title.insert(note.title.clone(), note);
        }

        // Tie-break duplicate titles on lexicographically-smallest path,
        // per spec ss4.2 "Tie-breaks".
        let mut seen_titles: HashMap<String, String> = HashMap::new();
        let mut candidate_files = Vec::new();
        for path in files.iter().sorted() {
            let title = title_for_path(path);
            match seen_titles.get(&title) {
                Some(first_path) => {
                    warn!(title, duplicate_path = %path, registered_path = %first_path, "duplicate title on disk, skipping");
                }
                None => {
                    seen_titles.insert(title.clone(), path.clone());
                    candidate_files.push((title, path.clone()));
                }
            }
        }

        let mut upserts = Vec::new();
        for (title, relative_path) in &candidate_files {
            let last_commit_hash = self.content_store.last_commit_hash(relative_path).await?;

            if let Some(row) = by_path.get(relative_path) {
                if row.last_commit_hash != last_commit_hash || row.use_status != UseStatus::Usable {
                    let mut updated = row.clone();
                    updated.last_commit_hash = last_commit_hash;
                    updated.use_status = UseStatus::Usable;
                    updated.updated_at = Utc::now();
                    upserts.push(updated);
                }
            } else if let Some(row) = by_title.get(title) {
                // Same title, file moved to a new path (spec ss4.2 step 3).
                let mut updated = row.clone();
                updated.file_path = relative_path.clone();
                updated.last_commit_hash = last_commit_hash;
                updated.use_status = UseStatus::Usable;
                updated.updated_at = Utc::now();
                upserts.push(updated);
            } else {
                let now = Utc::now();
                upserts.push(Note {
                    id: title.clone(),
                    title: title.clone(),
                    file_path: relative_path.clone(),
                    last_commit_hash,
                    last_modified_by: SYSTEM_USER.to_string(),
                    created_at: now,
                    updated_at: now,
                    use_status: UseStatus::Usable,
                });
            }
        }

        let present_paths: std::collections::HashSet<&String> =
            candidate_files.iter().map(|(_, p)| p).collect();
        let disabled_titles: Vec<String> = by_path
            .values()
            .filter(|row| !present_paths.contains(&row.file_path))
            .map(|row| row.title.clone())
            .collect();

        // Step 6: every upsert and disable lands in one transaction, per
        // spec ss4.2 — a crash or pool error mid-reconciliation leaves MS
        // untouched rather than partially reconciled.
        self.metadata_store
            .reconcile_transaction(upserts, disabled_titles.clone())
            .await?;

        for title in &disabled_titles {
            if let Err(err) = self.search_index.delete_by_title(title).await {
                warn!(title, %err, "failed to remove orphaned title from search index");
            }
        }

        self.rebuild_search_index(&candidate_files).await;

        info!(file_count = candidate_files.len(), "reconciliation complete");
        Ok(())
    }

    async fn rebuild_search_index(&self, candidate_files: &[(String, String)]) {
        for (title, relative_path) in candidate_files {
            match self.content_store.read_current_content(relative_path).await {
                Ok(content) => {
                    if let Err(err) = self.search_index.update_document(title, &content).await {
                        warn!(title, %err, "failed to index note during reconciliation");
                    }
                }
                Err(err) => {
                    warn!(title, %err, "failed to read note content during reconciliation");
                }
            }
        }
    }
}

fn title_for_path(relative_path: &str) -> String {
    let stem = Path::new(relative_path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| relative_path.to_string());
    title_from_file_stem(&stem)
}
