//! Coordination core for a git-backed collaborative note service: the
//! Content Store, Metadata Store, Search Index, Reconciler and Note
//! Coordinator described in `spec.md`. No HTTP code lives here; see the
//! `note-server` crate for the HTTP boundary.

pub mod content_store;
pub mod contracts;
pub mod coordinator;
pub mod error;
pub mod metadata_store;
pub mod model;
pub mod reconciler;
pub mod search_index;
pub mod tree;

pub use content_store::GitContentStore;
pub use contracts::ContentStore;
pub use contracts::MetadataStore;
pub use contracts::SearchIndex;
pub use coordinator::NoteCoordinator;
pub use error::NoteError;
pub use error::NoteResult;
pub use metadata_store::SqliteMetadataStore;
pub use reconciler::Reconciler;
pub use search_index::TantivySearchIndex;

pub use model::CommitRecord;
pub use model::ConflictDetail;
pub use model::NodeType;
pub use model::Note;
pub use model::NoteHistory;
pub use model::SaveAction;
pub use model::SaveOutcome;
pub use model::TreeNode;
pub use model::UseStatus;
