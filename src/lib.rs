// Lazy remote file tree for Crater storage - exposes all modules for testing

pub mod app;
pub mod config;
pub mod services;
pub mod view;
