//! Shared data model: the metadata record, commit/diff records, conflict
//! detail and the folder-tree node. See `spec.md` ss3.

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// `USABLE` notes are visible through the public contract; `DISABLED` rows
/// are soft-deleted by the Reconciler when their file disappeared from the
/// Content Store. Never hard-deleted, per spec ss3 lifecycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum UseStatus {
    Usable,
    Disabled,
}

impl UseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Usable => "USABLE",
            Self::Disabled => "DISABLED",
        }
    }
}

/// The system account used for rows the Reconciler inserts on its own
/// initiative, per spec ss4.2 step 3.
pub const SYSTEM_USER: &str = "SYSTEM";

/// The metadata record kept in the Metadata Store, keyed by `title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub file_path: String,
    pub last_commit_hash: String,
    pub last_modified_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub use_status: UseStatus,
}

/// A commit touching a note's file, as reported by the Content Store.
/// `diff` is populated lazily by history assembly (ss4.4); it is `None`
/// until that stage fills it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub diff: Option<String>,
}

/// Sentinel diff text for a commit with no parent, per spec ss3/ss4.4.
pub const INITIAL_COMMIT_DIFF: &str = "Initial Commit (New File)";

pub fn diff_extraction_failed(reason: impl std::fmt::Display) -> String {
    format!("Diff extraction failed: {reason}")
}

/// Emitted when optimistic concurrency fails. Always fully populated, per
/// spec ss3: "Never partial."
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictDetail {
    pub server_last_hash: String,
    pub server_content: String,
    pub modified_by: String,
    pub updated_at: DateTime<Utc>,
}

/// The kind of a folder-tree node, per spec ss3/ss4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeType {
    Folder,
    Note,
}

/// A node in the folder view returned by `get_tree`. `children` is `None`
/// for notes and `Some` (possibly empty) for folders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub parent_id: Option<String>,
    pub path: String,
    pub order: usize,
    pub children: Option<Vec<TreeNode>>,
}

/// Outcome of a successful save, per spec ss4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub action: SaveAction,
    pub commit_hash: String,
    pub file_name: String,
    pub author_name: String,
}

/// A note's full revision history with per-commit diffs, per spec ss4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteHistory {
    pub metadata: Note,
    pub git_history: Vec<CommitRecord>,
}

/// `note + ".md"` derivation used throughout, kept in one place so the
/// coordinator, reconciler and tree builder agree on it.
pub fn file_name_for_title(title: &str) -> String {
    format!("{title}.md")
}

pub fn title_from_file_stem(stem: &str) -> String {
    stem.to_string()
}
