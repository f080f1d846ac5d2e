//! Upsert engine: applies one mapped record inside an open transaction.
//!
//! Every node is merged on its natural key with `ON CREATE SET`, so
//! attributes stick only at first creation. Every edge is merged on its
//! (source, type, destination) triple after both endpoints exist. The
//! caller owns the transaction; a failure here surfaces as a record-level
//! error and the transaction's fate is the caller's decision.

use std::collections::HashMap;

use neo4rs::{query, BoltType, Query, Txn};

use crate::model::{EdgeSpec, Label, MappedRecord, NodeSpec, RelType};

/// Cypher merging one node of the given label on its key property.
/// `$props` only lands when the merge creates the node.
pub fn node_merge_cypher(label: Label) -> String {
    format!(
        "MERGE (n:{} {{{}: $key}}) ON CREATE SET n += $props",
        label.name(),
        label.key_property()
    )
}

/// Cypher merging one edge between endpoints matched by natural key.
/// `MERGE` on the relationship pattern makes re-creation a no-op.
pub fn edge_merge_cypher(src: Label, rel: RelType, dst: Label) -> String {
    format!(
        "MATCH (a:{} {{{}: $src}}) MATCH (b:{} {{{}: $dst}}) MERGE (a)-[:{}]->(b)",
        src.name(),
        src.key_property(),
        dst.name(),
        dst.key_property(),
        rel.name()
    )
}

fn node_query(node: &NodeSpec) -> Query {
    let props: HashMap<String, BoltType> = node
        .props
        .iter()
        .cloned()
        .map(|(name, value)| (name.to_string(), value.into()))
        .collect();
    query(&node_merge_cypher(node.label))
        .param("key", node.key.as_str())
        .param("props", props)
}

fn edge_query(edge: &EdgeSpec) -> Query {
    query(&edge_merge_cypher(edge.src.label, edge.rel, edge.dst.label))
        .param("src", edge.src.key.as_str())
        .param("dst", edge.dst.key.as_str())
}

/// Applies one record's descriptors in the caller's transaction.
///
/// All nodes are merged before any edge, so edges never reference a
/// missing endpoint. On error the transaction is left poisoned server-side
/// and must be rolled back by the caller.
pub async fn apply_record(
    txn: &mut Txn,
    mapped: &MappedRecord,
) -> std::result::Result<(), neo4rs::Error> {
    for node in &mapped.nodes {
        txn.run(node_query(node)).await?;
    }
    for edge in &mapped.edges {
        txn.run(edge_query(edge)).await?;
    }
    Ok(())
}
