//! sitewatch - periodic content change monitor
//!
//! Watches a list of web pages, local files and SFTP files, reduces each one
//! to normalized text, hashes it, and records a change whenever the digest
//! differs from the one stored on the previous check.
//!
//! # Architecture
//!
//! - [`config`] - Configuration loading and validation
//! - [`fetcher`] - HTTP, local file and SFTP retrieval with retry
//! - [`parser`] - Content type detection and the extraction cascade
//! - [`hasher`] - Content digests
//! - [`diff`] - Change decision
//! - [`entities`] - Reference-list entity tagging
//! - [`pipeline`] - One check of one resource
//! - [`scheduler`] - Check cycles and report triggers
//! - [`storage`] - State Store and Change Log files
//! - [`report`] - Daily and weekly HTML reports
//! - [`metrics`] - Prometheus counters
//! - [`models`] - Core data structures
//! - [`utils`] - Text helpers, retry policy and fetch errors
//!
//! # Example
//!
//! ```no_run
//! use sitewatch::config::Config;
//! use sitewatch::models::Resource;
//! use sitewatch::pipeline::CheckPipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let pipeline = CheckPipeline::from_config(&config)?;
//!     let report = pipeline
//!         .check(&Resource::new("https://example.com/"), None)
//!         .await;
//!     println!("{report:?}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod diff;
pub mod entities;
pub mod error;
pub mod fetcher;
pub mod hasher;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, SitewatchErrorTrait};
    pub use crate::hasher::{ContentHasher, HashAlgorithm};
    pub use crate::models::{ChangeLogEntry, Resource, ResourceState};
    pub use crate::pipeline::{CheckPipeline, CheckReport};
    pub use crate::scheduler::Scheduler;
    pub use crate::storage::{ChangeLog, StateStore};
}

pub use models::{ChangeLogEntry, Resource, ResourceState};
