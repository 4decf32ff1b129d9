use note_core::model::NodeType;
use note_core::tree::build_tree;

#[test]
fn folders_sort_before_notes_and_both_alphabetically() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::create_dir_all(root.join("Work")).unwrap();
    std::fs::create_dir_all(root.join("Personal")).unwrap();
    std::fs::write(root.join("Zebra.md"), "z").unwrap();
    std::fs::write(root.join("Apple.md"), "a").unwrap();
    std::fs::write(root.join("Work").join("Task.md"), "t").unwrap();

    let nodes = build_tree(root).unwrap();

    let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["Personal", "Work", "Apple", "Zebra"]);

    let folders: Vec<_> = nodes.iter().filter(|n| n.node_type == NodeType::Folder).collect();
    assert_eq!(folders.len(), 2);
    for (index, folder) in folders.iter().enumerate() {
        assert_eq!(folder.order, index);
    }

    let work = nodes.iter().find(|n| n.name == "Work").unwrap();
    let children = work.children.as_ref().expect("folder has children");
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].name, "Task");
    assert_eq!(children[0].parent_id, Some(work.id.clone()));
}

#[test]
fn hidden_and_cache_directories_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::create_dir_all(root.join(".git")).unwrap();
    std::fs::create_dir_all(root.join("__pycache__")).unwrap();
    std::fs::write(root.join("Visible.md"), "v").unwrap();

    let nodes = build_tree(root).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name, "Visible");
}

#[test]
fn non_markdown_files_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    std::fs::write(root.join("notes.md"), "n").unwrap();
    std::fs::write(root.join("image.png"), []).unwrap();

    let nodes = build_tree(root).unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].name, "notes");
}
