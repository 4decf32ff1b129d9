//! The Metadata Store (MS): a relational table keyed by note title. See
//! `spec.md` ss2/ss3/ss4.2/ss4.3.
//!
//! Grounded in the retrieval pack's `notelog` example, which keeps a
//! `sqlx::Pool<Sqlite>` of note rows (`filepath`, indexed metadata) and
//! scans it during reconciliation-style re-indexing.

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::Row;
use sqlx::SqlitePool;

use crate::contracts::MetadataStore;
use crate::error::NoteResult;
use crate::model::Note;
use crate::model::UseStatus;

pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Opens (creating if absent) the single-file SQLite database at
    /// `db_path`, per spec ss6 "MS at `<data>/db/<name>.db`".
    pub async fn open(db_path: &std::path::Path) -> NoteResult<Self> {
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new().max_connections(8).connect(&url).await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                title TEXT PRIMARY KEY,
                file_path TEXT NOT NULL UNIQUE,
                last_commit_hash TEXT NOT NULL DEFAULT '',
                last_modified_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                use_status TEXT NOT NULL DEFAULT 'USABLE'
            )
            "#,
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn open_in_memory() -> NoteResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect("sqlite::memory:")
            .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notes (
                title TEXT PRIMARY KEY,
                file_path TEXT NOT NULL UNIQUE,
                last_commit_hash TEXT NOT NULL DEFAULT '',
                last_modified_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                use_status TEXT NOT NULL DEFAULT 'USABLE'
            )
            "#,
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

fn row_to_note(row: &sqlx::sqlite::SqliteRow) -> Note {
    let use_status: String = row.get("use_status");
    Note {
        id: row.get("title"),
        title: row.get("title"),
        file_path: row.get("file_path"),
        last_commit_hash: row.get("last_commit_hash"),
        last_modified_by: row.get("last_modified_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        use_status: if use_status == "USABLE" {
            UseStatus::Usable
        } else {
            UseStatus::Disabled
        },
    }
}

#[async_trait::async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn find_by_title(&self, title: &str) -> NoteResult<Option<Note>> {
        let row = sqlx::query("SELECT * FROM notes WHERE title = ?")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_note))
    }

    async fn insert(&self, note: Note) -> NoteResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notes
                (title, file_path, last_commit_hash, last_modified_by, created_at, updated_at, use_status)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&note.title)
        .bind(&note.file_path)
        .bind(&note.last_commit_hash)
        .bind(&note.last_modified_by)
        .bind(note.created_at)
        .bind(note.updated_at)
        .bind(note.use_status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_after_commit(
        &self,
        title: &str,
        expected_hash: &str,
        new_hash: &str,
        modified_by: &str,
    ) -> NoteResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE notes
            SET last_commit_hash = ?, last_modified_by = ?, updated_at = ?
            WHERE title = ? AND last_commit_hash = ?
            "#,
        )
        .bind(new_hash)
        .bind(modified_by)
        .bind(Utc::now())
        .bind(title)
        .bind(expected_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_page(&self, offset: i64, limit: i64) -> NoteResult<(Vec<Note>, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notes WHERE use_status = 'USABLE'")
            .fetch_one(&self.pool)
            .await?;
        let rows = sqlx::query(
            "SELECT * FROM notes WHERE use_status = 'USABLE' ORDER BY updated_at DESC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok((rows.iter().map(row_to_note).collect(), total))
    }

    async fn search_page(
        &self,
        title_substring: Option<&str>,
        si_titles: &[String],
        offset: i64,
        limit: i64,
    ) -> NoteResult<(Vec<Note>, i64)> {
        // SQLite has no array bind parameters, so the SI title set is
        // spliced in as `?` placeholders built to match its length. The
        // substring filter is matched case-insensitively per spec ss4.3.
        let placeholders = si_titles.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
        let title_clause = if si_titles.is_empty() {
            "title LIKE ? ESCAPE '\\'".to_string()
        } else {
            format!("(title LIKE ? ESCAPE '\\' OR title IN ({placeholders}))")
        };
        let like_pattern = format!("%{}%", escape_like(title_substring.unwrap_or("")));

        let count_sql = format!("SELECT COUNT(*) FROM notes WHERE use_status = 'USABLE' AND {title_clause}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(&like_pattern);
        for t in si_titles {
            count_query = count_query.bind(t);
        }
        let total: i64 = count_query.fetch_one(&self.pool).await?;

        let select_sql = format!(
            "SELECT * FROM notes WHERE use_status = 'USABLE' AND {title_clause} ORDER BY updated_at DESC LIMIT ? OFFSET ?"
        );
        let mut select_query = sqlx::query(&select_sql).bind(&like_pattern);
        for t in si_titles {
            select_query = select_query.bind(t);
        }
        select_query = select_query.bind(limit).bind(offset);
        let rows = select_query.fetch_all(&self.pool).await?;
        Ok((rows.iter().map(row_to_note).collect(), total))
    }

    async fn scan_usable(&self) -> NoteResult<Vec<Note>> {
        let rows = sqlx::query("SELECT * FROM notes WHERE use_status = 'USABLE'")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_note).collect())
    }

    async fn reconcile_transaction(&self, upserts: Vec<Note>, disabled_titles: Vec<String>) -> NoteResult<()> {
        let mut tx = self.pool.begin().await?;

        for note in &upserts {
            sqlx::query(
                r#"
                INSERT INTO notes
                    (title, file_path, last_commit_hash, last_modified_by, created_at, updated_at, use_status)
                VALUES (?, ?, ?, ?, ?, ?, 'USABLE')
                ON CONFLICT(title) DO UPDATE SET
                    file_path = excluded.file_path,
                    last_commit_hash = excluded.last_commit_hash,
                    updated_at = excluded.updated_at,
                    use_status = 'USABLE'
                "#,
            )
            .bind(&note.title)
            .bind(&note.file_path)
            .bind(&note.last_commit_hash)
            .bind(&note.last_modified_by)
            .bind(note.created_at)
            .bind(note.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        for title in &disabled_titles {
            sqlx::query("UPDATE notes SET use_status = 'DISABLED' WHERE title = ?")
                .bind(title)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn escape_like(input: &str) -> String {
    input.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}
