//! Gramcast - Instagram publishing from the command line
//!
//! This library provides core functionality for connecting Instagram
//! accounts over OAuth and publishing media through the Graph API's
//! asynchronous container pipeline.

pub mod config;
pub mod db;
pub mod error;
pub mod instagram;
pub mod logging;
pub mod service;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use error::{ApiError, GramcastError, Result};
pub use types::{Account, MediaKind, Post, PostStatus};
