//! Folder-tree assembly. See `spec.md` ss4.5.

use std::path::Path;

use crate::error::NoteResult;
use crate::model::NodeType;
use crate::model::TreeNode;

fn is_hidden_or_cache(name: &str) -> bool {
    name.starts_with('.') || name == "__pycache__"
}

fn derive_id(relative_path: &Path) -> String {
    relative_path
        .to_string_lossy()
        .replace('\\', "/")
        .to_lowercase()
        .replace(' ', "-")
}

/// Recursively builds the folder tree rooted at `dir`. `dir` itself is not
/// represented as a node; its direct children become the top-level list.
pub fn build_tree(root: &Path) -> NoteResult<Vec<TreeNode>> {
    build_children(root, root, None)
}

fn build_children(root: &Path, dir: &Path, parent_id: Option<&str>) -> NoteResult<Vec<TreeNode>> {
    let mut folder_entries = Vec::new();
    let mut note_entries = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let name = entry.file_name().to_string_lossy().into_owned();

        if file_type.is_dir() {
            if is_hidden_or_cache(&name) {
                continue;
            }
            folder_entries.push((name, entry.path()));
        } else if file_type.is_file() {
            if entry.path().extension().is_some_and(|e| e == "md") {
                note_entries.push((name, entry.path()));
            }
        }
    }

    folder_entries.sort_by(|a, b| a.0.cmp(&b.0));
    note_entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut nodes = Vec::with_capacity(folder_entries.len() + note_entries.len());
    let mut order = 0usize;

    for (name, path) in folder_entries {
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let id = derive_id(relative);
        let children = build_children(root, &path, Some(&id))?;
        nodes.push(TreeNode {
            id: id.clone(),
            name,
            node_type: NodeType::Folder,
            parent_id: parent_id.map(str::to_string),
            path: relative.to_string_lossy().replace('\\', "/"),
            order,
            children: Some(children),
        });
        order += 1;
    }

    for (name, path) in note_entries {
        let relative = path.strip_prefix(root).unwrap_or(&path);
        let id = derive_id(relative);
        let stem = Path::new(&name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(name);
        nodes.push(TreeNode {
            id,
            name: stem,
            node_type: NodeType::Note,
            parent_id: parent_id.map(str::to_string),
            path: relative.to_string_lossy().replace('\\', "/"),
            order,
            children: None,
        });
        order += 1;
    }

    Ok(nodes)
}
