use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::io;
use std::str::FromStr;

/// One entry of a remote directory listing
///
/// For directories `size` is the number of children the server counted, not a
/// byte size. Missing, `null` or mistyped fields decode to their empty value,
/// so one bad entry never fails the whole listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "isdir", default, deserialize_with = "lenient_bool")]
    pub is_dir: bool,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub size: u64,
    #[serde(rename = "modifytime", default, deserialize_with = "lenient_string")]
    pub modified_at: String,
}

impl FileEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: false,
            size,
            modified_at: String::new(),
        }
    }

    pub fn dir(name: impl Into<String>, child_count: u64) -> Self {
        Self {
            name: name.into(),
            is_dir: true,
            size: child_count,
            modified_at: String::new(),
        }
    }

    pub fn with_modified_at(mut self, modified_at: impl Into<String>) -> Self {
        self.modified_at = modified_at.into();
        self
    }

    /// Entries without a name cannot be addressed and are skipped
    pub fn is_unnamed(&self) -> bool {
        self.name.is_empty()
    }

    /// Number of children reported by the server (always 0 for files)
    pub fn child_count(&self) -> u64 {
        if self.is_dir {
            self.size
        } else {
            0
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_bool().unwrap_or(false))
}

/// Negative, fractional or non-numeric counts become 0
fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(Value::deserialize(deserializer)?.as_u64().unwrap_or(0))
}

/// Which family of listing endpoints to talk to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingScope {
    /// Read-only view of the spaces the user can see
    #[default]
    Files,
    /// Spaces the user can write to
    RwFiles,
    /// Administrator view over every space
    Admin,
}

impl ListingScope {
    /// Path segments of the endpoint, relative to the API base URL
    pub fn route_segments(self) -> &'static [&'static str] {
        match self {
            ListingScope::Files => &["ss", "files"],
            ListingScope::RwFiles => &["ss", "rwfiles"],
            ListingScope::Admin => &["ss", "admin", "files"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListingScope::Files => "files",
            ListingScope::RwFiles => "rwfiles",
            ListingScope::Admin => "admin",
        }
    }
}

impl fmt::Display for ListingScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "files" => Ok(ListingScope::Files),
            "rwfiles" => Ok(ListingScope::RwFiles),
            "admin" => Ok(ListingScope::Admin),
            other => Err(format!(
                "unknown scope '{other}' (expected files, rwfiles or admin)"
            )),
        }
    }
}

/// Source of directory listings
///
/// `path` is relative to the storage root with `/` separators; the empty path
/// lists the top-level spaces.
#[async_trait]
pub trait DirectoryLister: Send + Sync {
    /// List the entries of one directory, in server order
    ///
    /// # Errors
    ///
    /// Returns an error if the listing cannot be fetched or decoded.
    async fn list_directory(&self, path: &str) -> io::Result<Vec<FileEntry>>;
}
