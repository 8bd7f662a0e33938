//! Asynchronous services and external integrations
//!
//! This module contains the code that deals with the storage API, I/O, and
//! the channel that brings async results back to the UI thread.

pub mod async_bridge;
pub mod listing;
pub mod log_dirs;
pub mod tracing_setup;
