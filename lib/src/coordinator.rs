//! The Note Coordinator (NC): the public contract of the core. See
//! `spec.md` ss4.1/ss4.3/ss4.4/ss4.5.

use std::sync::Arc;

use chrono::Utc;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::content_store::diff_or_failure;
use crate::contracts::ContentStore;
use crate::contracts::MetadataStore;
use crate::contracts::SearchIndex;
use crate::error::NoteError;
use crate::error::NoteResult;
use crate::model::file_name_for_title;
use crate::model::CommitRecord;
use crate::model::ConflictDetail;
use crate::model::Note;
use crate::model::NoteHistory;
use crate::model::SaveAction;
use crate::model::SaveOutcome;
use crate::model::TreeNode;
use crate::model::UseStatus;
use crate::reconciler::Reconciler;
use crate::tree;

const MAX_SEARCH_HITS: usize = 100;

pub struct NoteCoordinator {
    content_store: Arc<dyn ContentStore>,
    metadata_store: Arc<dyn MetadataStore>,
    search_index: Arc<dyn SearchIndex>,
}

impl NoteCoordinator {
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

    /// Runs the startup/on-demand reconciliation procedure, per spec ss4.2.
    pub async fn reconcile(&self) -> NoteResult<()> {
        Reconciler::new(
            self.content_store.clone(),
            self.metadata_store.clone(),
            self.search_index.clone(),
        )
        .run()
        .await
    }

    /// The save pipeline, per spec ss4.1 and SPEC_FULL's "richer
    /// implementation" merge policy.
    pub async fn save(
        &self,
        title: &str,
        content: &str,
        user_name: &str,
        last_hash: Option<&str>,
    ) -> NoteResult<SaveOutcome> {
        validate_title(title)?;
        let file_name = file_name_for_title(title);
        let existing = self.metadata_store.find_by_title(title).await?;

        let mut content_to_commit = content.to_string();
        let mut expected_hash_for_update: Option<String> = None;

        if let Some(row) = &existing {
            if let Some(client_hash) = last_hash {
                if row.last_commit_hash != client_hash {
                    let server_content = self.content_store.read_current_content(&row.file_path).await?;

                    let ancestor = if client_hash.is_empty() {
                        String::new()
                    } else {
                        self.content_store
                            .read_content_at(client_hash, &row.file_path)
                            .await
                            .unwrap_or_default()
                    };

                    let merge = self
                        .content_store
                        .merge_three_way(&ancestor, content, &server_content)
                        .await?;

                    if merge.has_conflict {
                        return Err(NoteError::Conflict {
                            title: title.to_string(),
                            detail: Box::new(ConflictDetail {
                                server_last_hash: row.last_commit_hash.clone(),
                                server_content,
                                modified_by: row.last_modified_by.clone(),
                                updated_at: row.updated_at,
                            }),
                        });
                    }

                    info!(title, "auto-merged concurrent edit");
                    content_to_commit = merge.merged_text;
                }
            }
            expected_hash_for_update = Some(row.last_commit_hash.clone());
        }

        let message = format!("Save/Update note: {title}");
        let new_hash = self
            .content_store
            .write_and_commit(&file_name, &content_to_commit, user_name, &message)
            .await?;

        let action = if let Some(expected_hash) = expected_hash_for_update {
            let applied = self
                .metadata_store
                .update_after_commit(title, &expected_hash, &new_hash, user_name)
                .await?;
            if !applied {
                // Someone else's write landed between our read and our
                // commit (spec ss9's documented race). Surface it as a
                // fresh conflict rather than silently overwriting.
                let row = self
                    .metadata_store
                    .find_by_title(title)
                    .await?
                    .ok_or_else(|| NoteError::internal("row vanished mid-save"))?;
                let server_content = self.content_store.read_current_content(&file_name).await?;
                return Err(NoteError::Conflict {
                    title: title.to_string(),
                    detail: Box::new(ConflictDetail {
                        server_last_hash: row.last_commit_hash,
                        server_content,
                        modified_by: row.last_modified_by,
                        updated_at: row.updated_at,
                    }),
                });
            }
            SaveAction::Updated
        } else {
            let now = Utc::now();
            self.metadata_store
                .insert(Note {
                    id: title.to_string(),
                    title: title.to_string(),
                    file_path: file_name.clone(),
                    last_commit_hash: new_hash.clone(),
                    last_modified_by: user_name.to_string(),
                    created_at: now,
                    updated_at: now,
                    use_status: UseStatus::Usable,
                })
                .await?;
            SaveAction::Created
        };

        self.spawn_background_index(title.to_string(), content_to_commit);

        Ok(SaveOutcome {
            action,
            commit_hash: new_hash,
            file_name,
            author_name: user_name.to_string(),
        })
    }

    /// Enqueues a background SI update without delaying the save response,
    /// per spec ss4.1 step 6 / ss5 "Background indexing".
    fn spawn_background_index(&self, title: String, content: String) {
        let search_index = self.search_index.clone();
        tokio::spawn(async move {
            if let Err(err) = search_index.update_document(&title, &content).await {
                error!(title, %err, "background search index update failed");
            }
        });
    }

    pub async fn list(&self, page: i64, size: i64) -> NoteResult<(Vec<Note>, i64)> {
        validate_page_size(page, size)?;
        self.metadata_store.list_page((page - 1) * size, size).await
    }

    /// Hybrid search, per spec ss4.3.
    pub async fn search(&self, keyword: &str, page: i64, size: i64) -> NoteResult<(Vec<Note>, i64)> {
        validate_page_size(page, size)?;
        if keyword.trim().is_empty() {
            return self.list(page, size).await;
        }
        let si_titles = self.search_index.search(keyword, MAX_SEARCH_HITS).await.unwrap_or_else(|err| {
            warn!(%err, "search index query failed, falling back to title-only match");
            Vec::new()
        });
        self.metadata_store
            .search_page(Some(keyword), &si_titles, (page - 1) * size, size)
            .await
    }

    /// History assembly with concurrent per-commit diff extraction, per
    /// spec ss4.4.
    pub async fn get_history(&self, title: &str) -> NoteResult<Option<NoteHistory>> {
        let Some(row) = self.metadata_store.find_by_title(title).await? else {
            return Ok(None);
        };

        let commits = self.content_store.file_history(&row.file_path).await?;

        let mut join_set = tokio::task::JoinSet::new();
        for (index, commit) in commits.iter().cloned().enumerate() {
            let content_store = self.content_store.clone();
            let file_path = row.file_path.clone();
            join_set.spawn(async move {
                let diff = diff_or_failure(content_store.diff(&commit.hash, &file_path).await);
                (index, CommitRecord { diff: Some(diff), ..commit })
            });
        }

        let mut with_diffs: Vec<Option<CommitRecord>> = vec![None; commits.len()];
        while let Some(result) = join_set.join_next().await {
            let (index, commit) = result?;
            with_diffs[index] = Some(commit);
        }
        let git_history = with_diffs.into_iter().flatten().collect();

        Ok(Some(NoteHistory {
            metadata: row,
            git_history,
        }))
    }

    /// Folder tree assembly, per spec ss4.5.
    pub async fn get_tree(&self) -> NoteResult<Vec<TreeNode>> {
        let root = self.content_store.root().to_path_buf();
        tokio::task::spawn_blocking(move || tree::build_tree(&root)).await?
    }
}

fn validate_title(title: &str) -> NoteResult<()> {
    if title.trim().is_empty() {
        return Err(NoteError::Validation("title must not be empty".to_string()));
    }
    if title.contains('/') || title.contains('\\') || title.contains('\0') {
        return Err(NoteError::Validation(
            "title must not contain path separators".to_string(),
        ));
    }
    if title.split('/').any(|segment| segment == "..") {
        return Err(NoteError::Validation("title must not traverse directories".to_string()));
    }
    Ok(())
}

fn validate_page_size(page: i64, size: i64) -> NoteResult<()> {
    if page < 1 {
        return Err(NoteError::Validation("page must be >= 1".to_string()));
    }
    if size < 1 {
        return Err(NoteError::Validation("size must be >= 1".to_string()));
    }
    Ok(())
}
