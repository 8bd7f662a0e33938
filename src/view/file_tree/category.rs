//! Naming and ordering rules for listings
//!
//! Top-level entries of the storage root are spaces; their labels depend on
//! which kind of space the name denotes. Every listing is ordered directories
//! first, then by name.

use crate::services::listing::{FileEntry, ListingScope};
use std::cmp::Ordering;

/// Old name of the public space, still served by some deployments
pub const LEGACY_PUBLIC_ALIAS: &str = "sugon-gpu-incoming";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceCategory {
    Public,
    Account,
    User,
}

impl SpaceCategory {
    /// Classify a top-level space by its raw name
    pub fn classify(name: &str, scope: ListingScope) -> Self {
        match scope {
            ListingScope::Admin => match name {
                "admin-public" => SpaceCategory::Public,
                "admin-account" => SpaceCategory::Account,
                _ => SpaceCategory::User,
            },
            ListingScope::Files | ListingScope::RwFiles => {
                if name == "public" || name == LEGACY_PUBLIC_ALIAS {
                    SpaceCategory::Public
                } else if name.starts_with('q') || name.starts_with("accou") {
                    SpaceCategory::Account
                } else {
                    SpaceCategory::User
                }
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpaceCategory::Public => "public space",
            SpaceCategory::Account => "account space",
            SpaceCategory::User => "user space",
        }
    }
}

/// Label shown for a top-level space
pub fn space_display_name(name: &str, scope: ListingScope) -> String {
    SpaceCategory::classify(name, scope).label().to_string()
}

/// Locale-style name comparison: case-insensitive, raw order breaks ties
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Order of the top-level listing: by raw name only
pub fn sort_top_level(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| compare_names(&a.name, &b.name));
}

/// Order of a directory listing: directories first, then by name
pub fn sort_listing(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => compare_names(&a.name, &b.name),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_public_names() {
        assert_eq!(space_display_name("public", ListingScope::Files), "public space");
        assert_eq!(
            space_display_name(LEGACY_PUBLIC_ALIAS, ListingScope::RwFiles),
            "public space"
        );
    }

    #[test]
    fn test_account_names() {
        assert_eq!(space_display_name("q-lab1", ListingScope::Files), "account space");
        assert_eq!(space_display_name("account", ListingScope::Files), "account space");
        assert_eq!(space_display_name("accounting", ListingScope::Files), "account space");
    }

    #[test]
    fn test_user_names() {
        assert_eq!(space_display_name("u-alice", ListingScope::Files), "user space");
        assert_eq!(space_display_name("acc", ListingScope::Files), "user space");
        assert_eq!(space_display_name("Public", ListingScope::Files), "user space");
    }

    #[test]
    fn test_admin_scope_names() {
        assert_eq!(
            SpaceCategory::classify("admin-public", ListingScope::Admin),
            SpaceCategory::Public
        );
        assert_eq!(
            SpaceCategory::classify("admin-account", ListingScope::Admin),
            SpaceCategory::Account
        );
        // The portal rules do not apply to the admin view
        assert_eq!(
            SpaceCategory::classify("public", ListingScope::Admin),
            SpaceCategory::User
        );
    }

    #[test]
    fn test_top_level_ignores_kind() {
        let mut entries = vec![
            FileEntry::dir("u-bob", 1),
            FileEntry::file("README", 10),
            FileEntry::dir("public", 0),
        ];
        sort_top_level(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["public", "README", "u-bob"]);
    }

    #[test]
    fn test_listing_directories_first() {
        let mut entries = vec![
            FileEntry::file("b.txt", 1),
            FileEntry::dir("z", 0),
            FileEntry::file("a.txt", 1),
            FileEntry::dir("a", 0),
        ];
        sort_listing(&mut entries);
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "z", "a.txt", "b.txt"]);
    }

    #[test]
    fn test_compare_names_case_then_raw() {
        assert_eq!(compare_names("Data", "data"), Ordering::Less);
        assert_eq!(compare_names("alpha", "Beta"), Ordering::Less);
        assert_eq!(compare_names("same", "same"), Ordering::Equal);
    }

    fn entry_strategy() -> impl Strategy<Value = FileEntry> {
        ("[a-zA-Z0-9._-]{1,8}", any::<bool>(), 0u64..5).prop_map(|(name, is_dir, size)| {
            if is_dir {
                FileEntry::dir(name, size)
            } else {
                FileEntry::file(name, size)
            }
        })
    }

    proptest! {
        #[test]
        fn prop_directories_precede_files(mut entries in prop::collection::vec(entry_strategy(), 0..32)) {
            sort_listing(&mut entries);

            let first_file = entries.iter().position(|e| !e.is_dir).unwrap_or(entries.len());
            prop_assert!(entries[first_file..].iter().all(|e| !e.is_dir));

            for pair in entries.windows(2) {
                if pair[0].is_dir == pair[1].is_dir {
                    prop_assert_ne!(compare_names(&pair[0].name, &pair[1].name), Ordering::Greater);
                }
            }
        }

        #[test]
        fn prop_top_level_sorted_by_raw_name(mut entries in prop::collection::vec(entry_strategy(), 0..32)) {
            sort_top_level(&mut entries);
            for pair in entries.windows(2) {
                prop_assert_ne!(compare_names(&pair[0].name, &pair[1].name), Ordering::Greater);
            }
        }

        #[test]
        fn prop_every_name_gets_one_of_three_labels(name in "[a-z-]{0,12}") {
            let label = space_display_name(&name, ListingScope::Files);
            let expected = if name == "public" || name == LEGACY_PUBLIC_ALIAS {
                "public space"
            } else if name.starts_with('q') || name.starts_with("accou") {
                "account space"
            } else {
                "user space"
            };
            prop_assert_eq!(label, expected);
        }
    }
}
