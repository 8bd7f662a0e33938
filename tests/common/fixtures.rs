//! Listing fixtures shared by the integration tests

use crater_files::services::listing::{DirectoryLister, FileEntry, FixtureLister, ListingScope};
use crater_files::view::file_tree::{ApplyResult, FileTree, NodeId};

/// Storage with one account space, an empty public space and a user space
pub fn lab_storage() -> FixtureLister {
    FixtureLister::new()
        .with_listing(
            "",
            vec![
                FileEntry::dir("q-lab1", 3),
                FileEntry::dir("public", 0),
                FileEntry::dir("u-alice", 1),
            ],
        )
        .with_listing(
            "q-lab1",
            vec![
                FileEntry::file("b.txt", 12),
                FileEntry::dir("a", 0),
                FileEntry::dir("checkpoints", 1),
            ],
        )
        .with_listing(
            "q-lab1/checkpoints",
            vec![FileEntry::file("epoch-10.pt", 1 << 20)],
        )
        .with_listing("u-alice", vec![FileEntry::file("notes.md", 42)])
}

/// JSON form of a small storage, as read by `--fixture`
pub const FIXTURE_JSON: &str = r#"{
    "": [
        {"name": "sugon-gpu-incoming", "isdir": true, "size": 1, "modifytime": "2024-05-01T08:00:00Z"},
        {"name": "accounting", "isdir": true, "size": 0, "modifytime": null}
    ],
    "/sugon-gpu-incoming/": [
        {"name": "README", "isdir": false, "size": 2048, "modifytime": "2024-05-01T08:00:00Z"}
    ]
}"#;

/// Mount `tree` against `lister` and assert the top-level listing applied
pub async fn mount(tree: &mut FileTree, lister: &dyn DirectoryLister) {
    let outcome = tree.mount().run(lister).await;
    assert_eq!(tree.apply(outcome), ApplyResult::Applied);
}

pub fn files_tree() -> FileTree {
    FileTree::new(ListingScope::Files)
}

pub fn id(path: &str) -> NodeId {
    NodeId::new(path)
}
