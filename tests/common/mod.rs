// Shared helpers for integration tests; not every test file uses every helper
#![allow(dead_code)]

pub mod fixtures;
pub mod mock_api;
