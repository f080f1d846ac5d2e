//! Schema guard: uniqueness constraints over every loaded label.
//!
//! Constraints are declared once at startup, before any chunk runs. A
//! missing constraint would let concurrent merges race into duplicates,
//! so any failure other than "already exists" aborts the run.

use neo4rs::{query, Graph};
use tracing::{debug, info};

use crate::error::{is_already_exists, LoadError, Result};
use crate::model::Label;

/// Name of the uniqueness constraint declared for a label.
pub fn constraint_name(label: Label) -> &'static str {
    match label {
        Label::Radio => "radio_id_unique",
        Label::Track => "track_isrc_unique",
        Label::Artist => "artist_spotify_id_unique",
        Label::Album => "album_name_unique",
        Label::Genre => "genre_name_unique",
    }
}

/// Cypher declaring the uniqueness constraint for a label's key property.
pub fn constraint_cypher(label: Label) -> String {
    format!(
        "CREATE CONSTRAINT {} IF NOT EXISTS FOR (n:{}) REQUIRE n.{} IS UNIQUE",
        constraint_name(label),
        label.name(),
        label.key_property()
    )
}

/// Outcome of the constraint pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct SchemaReport {
    /// Constraints created or verified by `IF NOT EXISTS`.
    pub ensured: usize,
    /// Constraints the server reported as already existing.
    pub preexisting: usize,
}

/// Ensures every label's uniqueness constraint exists.
///
/// Idempotent: `IF NOT EXISTS` makes re-runs no-ops, and servers that
/// still report "already exists" are tolerated. Any other failure is a
/// fatal [`LoadError::Setup`] — partial constraint application leaves the
/// graph unsafe to ingest into.
pub async fn ensure_constraints(graph: &Graph) -> Result<SchemaReport> {
    let mut report = SchemaReport::default();
    for label in Label::ALL {
        let cypher = constraint_cypher(label);
        debug!(constraint = constraint_name(label), "schema.ensure");
        match graph.run(query(&cypher)).await {
            Ok(()) => report.ensured += 1,
            Err(err) if is_already_exists(&err) => {
                debug!(
                    constraint = constraint_name(label),
                    "schema.already_exists"
                );
                report.preexisting += 1;
            }
            Err(source) => {
                return Err(LoadError::Setup {
                    constraint: constraint_name(label).to_string(),
                    source,
                })
            }
        }
    }
    info!(
        ensured = report.ensured,
        preexisting = report.preexisting,
        "schema.constraints_ready"
    );
    Ok(report)
}
