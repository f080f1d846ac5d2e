//! Bulk loader that materializes radio airplay CSV exports as a Neo4j
//! property graph.
//!
//! Every node and relationship is merged on a natural key, so reprocessing
//! the same source file never duplicates entities. Uniqueness constraints
//! are declared up front ([`schema`]), each CSV row is mapped into typed
//! node/edge descriptors ([`mapper`]), and the descriptors are applied in
//! chunk-sized transactions ([`loader`]) that survive per-record errors.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod mapper;
pub mod model;
pub mod schema;
pub mod source;
pub mod upsert;

pub use error::{LoadError, Result};
