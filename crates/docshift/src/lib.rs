// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # docshift
//!
//! `docshift` is a CLI tool and library for Elasticsearch-style document
//! stores: single-document and index operations, cursor ("scroll") walks over
//! full result sets, and scroll-driven migrations between clusters.
//!
//! ## Migration
//!
//! A migration opens a scroll on the source sorted by the store's internal
//! document order, transforms every page concurrently, and writes each page
//! to the destination as one bulk request of `create` operations. Documents
//! keep their ids, and ids that already exist at the destination are reported
//! per document without aborting the run.
//!
//! ```bash
//! docshift run --config migration.yaml
//! docshift run --config migration.yaml --dry-run
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! source:
//!   url: http://localhost:9200
//!   index: articles_v1
//!   type: article
//!
//! destination:
//!   url: http://localhost:9201
//!   index: articles_v2
//!   type: article
//!
//! options:
//!   page_size: 500
//!   scroll_delay: 200ms
//! ```

#![warn(missing_docs)]

pub mod bulk;
pub mod client;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod scroll;
pub mod transform;

pub use bulk::{BulkAction, BulkRequest, BulkResponse};
pub use client::StoreClient;
pub use config::{EndpointConfig, MigrationConfig, MigrationOptions};
pub use error::{Error, Result};
pub use pipeline::{migrate, MigrationStats, Pipeline};
pub use scroll::{walk, Hit, Page, Scroll, ScrollOptions};
pub use transform::{DocumentTransform, FieldMapper, Identity};
