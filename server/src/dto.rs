//! Wire DTOs for the HTTP surface, per spec §6. Kept separate from
//! `note_core::model` so the core never depends on the HTTP response shape.

use note_core::ConflictDetail;
use note_core::Note;
use note_core::SaveOutcome;
use note_core::TreeNode;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub keyword: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_size() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct PageMetadata {
    pub total_count: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub size: i64,
    pub next_link: Option<String>,
    pub prev_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub status: &'static str,
    pub metadata: PageMetadata,
    pub items: Vec<Note>,
}

pub fn list_response(items: Vec<Note>, total_count: i64, page: i64, size: i64, keyword: Option<&str>) -> ListResponse {
    let total_pages = if total_count == 0 { 1 } else { (total_count + size - 1) / size };
    let keyword_suffix = keyword
        .filter(|k| !k.is_empty())
        .map(|k| format!("&keyword={k}"))
        .unwrap_or_default();

    let prev_link = (page > 1).then(|| format!("/notes?page={}&size={size}{keyword_suffix}", page - 1));
    let next_link = (page < total_pages).then(|| format!("/notes?page={}&size={size}{keyword_suffix}", page + 1));

    ListResponse {
        status: "success",
        metadata: PageMetadata {
            total_count,
            total_pages,
            current_page: page,
            size,
            next_link,
            prev_link,
        },
        items,
    }
}

#[derive(Debug, Serialize)]
pub struct FolderTreeResponse {
    pub success: bool,
    pub data: Vec<TreeNode>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub title: String,
    pub content: String,
    pub user_name: String,
    pub last_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub status: &'static str,
    pub action: note_core::SaveAction,
    pub commit_hash: String,
    pub file_name: String,
    pub author_name: String,
}

impl From<SaveOutcome> for SaveResponse {
    fn from(outcome: SaveOutcome) -> Self {
        Self {
            status: "success",
            action: outcome.action,
            commit_hash: outcome.commit_hash,
            file_name: outcome.file_name,
            author_name: outcome.author_name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConflictResponse {
    pub error_code: &'static str,
    pub message: String,
    pub conflict_data: ConflictDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub detail: String,
}

