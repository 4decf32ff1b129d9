//! The Content Store (CS): a versioned, commit-addressable file repository
//! rooted at a local directory. See `spec.md` ss4.6.
//!
//! Grounded in the teacher's own git backend (`git.rs`/`git_subprocess.rs`
//! wrap `git2::Repository`/`git2::Signature`) and in the `gitnotes`
//! reference example, which commits one markdown file per note with
//! `git2::Index`/`git2::Signature::now`/`repository.commit`.

use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use tracing::instrument;
use tracing::warn;

use crate::error::NoteError;
use crate::error::NoteResult;
use crate::model::diff_extraction_failed;
use crate::model::CommitRecord;
use crate::model::INITIAL_COMMIT_DIFF;

/// A single file-content blob plus the commit author, used for both the
/// read side and the merge primitive.
#[derive(Debug, Clone, Default)]
pub struct MergeResult {
    pub has_conflict: bool,
    pub merged_text: String,
}

/// Git-backed implementation of the Content Store contract.
///
/// `git2::Repository` is `Send` but not `Sync`, and must not be held across
/// an `.await` point, so every operation reopens the repository inside a
/// `spawn_blocking` closure. Writes are additionally serialized through
/// `write_lock`, the "single writer lock inside the CS adapter" required by
/// spec ss5.
pub struct GitContentStore {
    root: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl GitContentStore {
    /// Opens the repository at `root`, creating it (and an initial empty
    /// commit-less working tree) if it doesn't exist yet, per ss4.6
    /// "Initialization: if the repository directory lacks a store, create
    /// one."
    pub fn open_or_init(root: impl Into<PathBuf>) -> NoteResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        match git2::Repository::open(&root) {
            Ok(_) => {}
            Err(_) => {
                git2::Repository::init(&root)?;
            }
        }
        Ok(Self {
            root,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    #[instrument(skip(self, content), fields(path, author))]
    pub async fn write_and_commit(
        &self,
        path: &str,
        content: &str,
        author: &str,
        message: &str,
    ) -> NoteResult<String> {
        let _guard = self.write_lock.lock().await;
        let root = self.root.clone();
        let path = path.to_string();
        let content = content.to_string();
        let author = author.to_string();
        let message = message.to_string();
        tokio::task::spawn_blocking(move || {
            write_and_commit_blocking(&root, &path, &content, &author, &message)
        })
        .await?
    }

    pub async fn read_current_content(&self, path: &str) -> NoteResult<String> {
        let abs = self.root.join(path);
        match tokio::fs::read_to_string(&abs).await {
            Ok(content) => Ok(content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn file_history(&self, path: &str) -> NoteResult<Vec<CommitRecord>> {
        let root = self.root.clone();
        let path = path.to_string();
        tokio::task::spawn_blocking(move || file_history_blocking(&root, &path)).await?
    }

    /// Reads `path`'s blob content as recorded by commit `hash`.
    pub async fn read_content_at(&self, hash: &str, path: &str) -> NoteResult<String> {
        let root = self.root.clone();
        let hash = hash.to_string();
        let path = path.to_string();
        tokio::task::spawn_blocking(move || read_content_at_blocking(&root, &hash, &path)).await?
    }

    /// Diff of `hash` against its parent, restricted to `path`. The initial
    /// commit (no parent) returns the sentinel per spec ss4.6.
    pub async fn diff(&self, hash: &str, path: &str) -> NoteResult<String> {
        let root = self.root.clone();
        let hash = hash.to_string();
        let path = path.to_string();
        tokio::task::spawn_blocking(move || diff_blocking(&root, &hash, &path)).await?
    }

    /// Line-level three-way merge equivalent to `merge-file -p`: the result
    /// is the merged text plus a flag that's `true` when conflict markers
    /// (`<<<<<<<` / `=======` / `>>>>>>>`) are embedded in it.
    pub async fn merge_three_way(
        &self,
        base: &str,
        local: &str,
        remote: &str,
    ) -> NoteResult<MergeResult> {
        let root = self.root.clone();
        let base = base.to_string();
        let local = local.to_string();
        let remote = remote.to_string();
        tokio::task::spawn_blocking(move || merge_three_way_blocking(&root, &base, &local, &remote))
            .await?
    }

    pub async fn last_commit_hash(&self, path: &str) -> NoteResult<String> {
        let history = self.file_history(path).await?;
        Ok(history.into_iter().next().map(|c| c.hash).unwrap_or_default())
    }

    /// Enumerates `**/*.md` files in the working tree, relative to `root`,
    /// POSIX-separated, skipping `.git` and the hidden/`__pycache__`
    /// directories excluded from the folder view (spec ss4.5).
    pub async fn enumerate_markdown_files(&self) -> NoteResult<Vec<String>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || enumerate_markdown_files_blocking(&root)).await?
    }
}

fn is_skipped_dir_name(name: &str) -> bool {
    name == ".git" || name == "__pycache__" || name.starts_with('.')
}

fn enumerate_markdown_files_blocking(root: &Path) -> NoteResult<Vec<String>> {
    let mut out = Vec::new();
    for entry in walkdir::WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            if e.file_type().is_dir() {
                e.path() == root
                    || !is_skipped_dir_name(&e.file_name().to_string_lossy())
            } else {
                true
            }
        })
    {
        let entry = entry.map_err(|err| NoteError::io(err))?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "md") {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .replace('\\', "/");
            out.push(relative);
        }
    }
    out.sort();
    Ok(out)
}

fn write_and_commit_blocking(
    root: &Path,
    path: &str,
    content: &str,
    author: &str,
    message: &str,
) -> NoteResult<String> {
    let repo = git2::Repository::open(root)?;

    let abs_path = root.join(path);
    if let Some(parent) = abs_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Write via a temp file then rename so a reader never observes a
    // partially-written note.
    let mut tmp = tempfile::NamedTempFile::new_in(abs_path.parent().unwrap_or(root))?;
    use std::io::Write;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(&abs_path)
        .map_err(|err| NoteError::io(err.error))?;

    let mut index = repo.index()?;
    index.add_path(Path::new(path))?;
    index.write()?;
    let tree_oid = index.write_tree()?;
    let tree = repo.find_tree(tree_oid)?;

    let signature = git2::Signature::now(author, &format!("{author}@notes.local"))?;

    let parent_commit = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent_commit.iter().collect();

    let commit_oid = repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )?;
    Ok(commit_oid.to_string())
}

fn commit_touches_path(repo: &git2::Repository, commit: &git2::Commit, path: &str) -> NoteResult<bool> {
    let tree = commit.tree()?;
    let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
    let mut opts = git2::DiffOptions::new();
    opts.pathspec(path);
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;
    Ok(diff.deltas().len() > 0)
}

fn file_history_blocking(root: &Path, path: &str) -> NoteResult<Vec<CommitRecord>> {
    let repo = git2::Repository::open(root)?;
    let mut records = Vec::new();

    let head = match repo.head() {
        Ok(head) => head,
        Err(_) => return Ok(records),
    };
    let mut revwalk = repo.revwalk()?;
    revwalk.push(head.target().ok_or_else(|| NoteError::internal("detached HEAD without target"))?)?;
    revwalk.set_sorting(git2::Sort::TIME)?;

    for oid in revwalk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        if !commit_touches_path(&repo, &commit, path)? {
            continue;
        }
        let when = commit.author().when();
        let timestamp: DateTime<Utc> = Utc
            .timestamp_opt(when.seconds(), 0)
            .single()
            .unwrap_or_else(Utc::now);
        records.push(CommitRecord {
            hash: commit.id().to_string(),
            author: commit.author().name().unwrap_or_default().to_string(),
            timestamp,
            message: commit.message().unwrap_or_default().trim().to_string(),
            diff: None,
        });
    }
    // revwalk with Sort::TIME is already newest-first.
    Ok(records)
}

fn read_content_at_blocking(root: &Path, hash: &str, path: &str) -> NoteResult<String> {
    let repo = git2::Repository::open(root)?;
    let oid = git2::Oid::from_str(hash).map_err(NoteError::from)?;
    let commit = repo.find_commit(oid)?;
    let tree = commit.tree()?;
    let entry = tree
        .get_path(Path::new(path))
        .map_err(|_| NoteError::NotFound(path.to_string()))?;
    let blob = repo.find_blob(entry.id())?;
    Ok(String::from_utf8_lossy(blob.content()).into_owned())
}

fn diff_blocking(root: &Path, hash: &str, path: &str) -> NoteResult<String> {
    let repo = git2::Repository::open(root)?;
    let oid = git2::Oid::from_str(hash).map_err(NoteError::from)?;
    let commit = repo.find_commit(oid)?;
    let tree = commit.tree()?;

    let parent_tree = match commit.parent(0) {
        Ok(parent) => Some(parent.tree()?),
        Err(_) => return Ok(INITIAL_COMMIT_DIFF.to_string()),
    };

    let mut opts = git2::DiffOptions::new();
    opts.pathspec(path);
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))?;

    let mut buf = Vec::new();
    diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
        let prefix = match line.origin() {
            '+' | '-' | ' ' => line.origin().to_string(),
            _ => String::new(),
        };
        buf.extend_from_slice(prefix.as_bytes());
        buf.extend_from_slice(line.content());
        true
    })?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Synthesizes an `IndexEntry` around a fresh blob so `merge_file_from_index`
/// can be used for a plain three-way text merge that isn't tied to any real
/// tree entry, matching the pattern in the reference example that builds a
/// synthetic ancestor entry for add/add conflicts.
fn synthetic_entry(repo: &git2::Repository, content: &str, path: &str) -> NoteResult<git2::IndexEntry> {
    let blob = repo.blob(content.as_bytes())?;
    Ok(git2::IndexEntry {
        ctime: git2::IndexTime::new(0, 0),
        mtime: git2::IndexTime::new(0, 0),
        dev: 0,
        ino: 0,
        mode: 0o100644,
        uid: 0,
        gid: 0,
        file_size: content.len() as u32,
        id: blob,
        flags: 0,
        flags_extended: 0,
        path: path.as_bytes().to_vec(),
    })
}

fn merge_three_way_blocking(
    root: &Path,
    base: &str,
    local: &str,
    remote: &str,
) -> NoteResult<MergeResult> {
    let repo = git2::Repository::open(root)?;
    let ancestor = synthetic_entry(&repo, base, "note.md")?;
    let ours = synthetic_entry(&repo, local, "note.md")?;
    let theirs = synthetic_entry(&repo, remote, "note.md")?;

    let mut opts = git2::MergeFileOptions::new();
    opts.ancestor_label("base").our_label("local").their_label("remote");

    let result = repo.merge_file_from_index(&ancestor, &ours, &theirs, Some(&mut opts))?;
    let merged_text = String::from_utf8_lossy(result.content()).into_owned();
    let has_conflict = merged_text.contains("<<<<<<<");
    if has_conflict {
        warn!("three-way merge produced conflict markers");
    }
    Ok(MergeResult {
        has_conflict,
        merged_text,
    })
}

pub fn diff_or_failure(result: NoteResult<String>) -> String {
    match result {
        Ok(text) => text,
        Err(err) => diff_extraction_failed(err),
    }
}
