//! The three narrow contracts the Note Coordinator depends on, per spec
//! ss9 "Polymorphism": capabilities for CS, MS and SI are expressed as
//! traits so the coordinator never depends on a concrete backend. Each
//! concrete adapter (`GitContentStore`, `SqliteMetadataStore`,
//! `TantivySearchIndex`) implements the matching trait by delegating to its
//! own inherent methods.

use async_trait::async_trait;

use crate::content_store::MergeResult;
use crate::error::NoteResult;
use crate::model::CommitRecord;
use crate::model::Note;

/// ss4.6: write-and-commit, read-current-content, enumerate-files,
/// per-path commit history, patch between two revisions, three-way merge.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn write_and_commit(
        &self,
        path: &str,
        content: &str,
        author: &str,
        message: &str,
    ) -> NoteResult<String>;

    async fn read_current_content(&self, path: &str) -> NoteResult<String>;

    async fn file_history(&self, path: &str) -> NoteResult<Vec<CommitRecord>>;

    async fn diff(&self, hash: &str, path: &str) -> NoteResult<String>;

    async fn merge_three_way(&self, base: &str, local: &str, remote: &str) -> NoteResult<MergeResult>;

    async fn last_commit_hash(&self, path: &str) -> NoteResult<String>;

    async fn enumerate_markdown_files(&self) -> NoteResult<Vec<String>>;

    /// Reads `path`'s content as of `hash`, used by the coordinator to
    /// recover the merge ancestor for `merge_three_way` (spec ss4.1 step 3,
    /// "ancestor = content at `last_hash`"). Not part of the minimal ss4.6
    /// contract, but required by the richer merge-capable save pipeline.
    async fn read_content_at(&self, hash: &str, path: &str) -> NoteResult<String>;

    /// The working-directory root, used by the folder-tree builder (ss4.5).
    fn root(&self) -> &std::path::Path;
}

#[async_trait]
impl ContentStore for crate::content_store::GitContentStore {
    async fn write_and_commit(
        &self,
        path: &str,
        content: &str,
        author: &str,
        message: &str,
    ) -> NoteResult<String> {
        Self::write_and_commit(self, path, content, author, message).await
    }

    async fn read_current_content(&self, path: &str) -> NoteResult<String> {
        Self::read_current_content(self, path).await
    }

    async fn file_history(&self, path: &str) -> NoteResult<Vec<CommitRecord>> {
        Self::file_history(self, path).await
    }

    async fn diff(&self, hash: &str, path: &str) -> NoteResult<String> {
        Self::diff(self, hash, path).await
    }

    async fn merge_three_way(&self, base: &str, local: &str, remote: &str) -> NoteResult<MergeResult> {
        Self::merge_three_way(self, base, local, remote).await
    }

    async fn last_commit_hash(&self, path: &str) -> NoteResult<String> {
        Self::last_commit_hash(self, path).await
    }

    async fn enumerate_markdown_files(&self) -> NoteResult<Vec<String>> {
        Self::enumerate_markdown_files(self).await
    }

    async fn read_content_at(&self, hash: &str, path: &str) -> NoteResult<String> {
        Self::read_content_at(self, hash, path).await
    }

    fn root(&self) -> &std::path::Path {
        Self::root(self)
    }
}

/// ss2/ss3: query by title, prefix/substring search, pagination, bulk scan,
/// plus the conditional update recommended by ss9 to tighten the optimistic
/// concurrency race.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn find_by_title(&self, title: &str) -> NoteResult<Option<Note>>;

    async fn insert(&self, note: Note) -> NoteResult<()>;

    /// Conditional update: succeeds only if the row's `last_commit_hash`
    /// still equals `expected_hash`. Returns `false` (no rows affected)
    /// rather than erroring, so the coordinator can treat a late race as a
    /// second conflict per ss9/SPEC_FULL ss9.
    async fn update_after_commit(
        &self,
        title: &str,
        expected_hash: &str,
        new_hash: &str,
        modified_by: &str,
    ) -> NoteResult<bool>;

    async fn list_page(&self, offset: i64, limit: i64) -> NoteResult<(Vec<Note>, i64)>;

    async fn search_page(
        &self,
        title_substring: Option<&str>,
        si_titles: &[String],
        offset: i64,
        limit: i64,
    ) -> NoteResult<(Vec<Note>, i64)>;

    async fn scan_usable(&self) -> NoteResult<Vec<Note>>;

    /// Applies the Reconciler's full set of upserts and disables in a
    /// single `sqlx::Transaction`, committed once at the end, per spec
    /// ss4.2 step 6 ("Commit MS changes in one transaction"). A mid-run
    /// crash or pool error leaves MS untouched rather than partially
    /// reconciled.
    async fn reconcile_transaction(&self, upserts: Vec<Note>, disabled_titles: Vec<String>) -> NoteResult<()>;
}

/// ss4.7: update-document, delete-by-term, search.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn update_document(&self, title: &str, content: &str) -> NoteResult<()>;

    async fn delete_by_title(&self, title: &str) -> NoteResult<()>;

    async fn search(&self, keyword: &str, limit: usize) -> NoteResult<Vec<String>>;
}
