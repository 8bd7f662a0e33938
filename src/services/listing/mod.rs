// Directory listing layer for the remote file tree
//
// The tree only talks to a `DirectoryLister`. Production uses the Crater
// storage API through `HttpLister`, wrapped in a `ListingManager` that
// deduplicates in-flight requests and caches listings. Tests and offline
// demos plug in a `FixtureLister` instead.

pub mod backend;
pub mod fixture;
pub mod http;
pub mod manager;

pub use backend::{DirectoryLister, FileEntry, ListingScope};
pub use fixture::{FixtureConfig, FixtureLister, ListingMetrics};
pub use http::HttpLister;
pub use manager::ListingManager;
