//! Graph vocabulary and record descriptors.
//!
//! A mapped record is a small set of [`NodeSpec`]s and [`EdgeSpec`]s.
//! Nodes are addressed by (label, natural key); edges reference their
//! endpoints the same way, so descriptors stay independent of store ids.

use neo4rs::BoltType;

/// Node labels materialized by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// A radio station, keyed by station id.
    Radio,
    /// A track, keyed by ISRC code.
    Track,
    /// An artist, keyed by platform artist id.
    Artist,
    /// An album, keyed by name.
    Album,
    /// A genre, keyed by name.
    Genre,
}

impl Label {
    /// Every label, in the order their constraints are declared.
    pub const ALL: [Label; 5] = [
        Label::Radio,
        Label::Track,
        Label::Artist,
        Label::Album,
        Label::Genre,
    ];

    /// Cypher label name.
    pub fn name(self) -> &'static str {
        match self {
            Label::Radio => "Radio",
            Label::Track => "Track",
            Label::Artist => "Artist",
            Label::Album => "Album",
            Label::Genre => "Genre",
        }
    }

    /// Property holding the natural key that uniquely identifies a node
    /// of this label.
    pub fn key_property(self) -> &'static str {
        match self {
            Label::Radio => "id",
            Label::Track => "isrc",
            Label::Artist => "spotifyId",
            Label::Album => "name",
            Label::Genre => "name",
        }
    }
}

/// Relationship types between the loaded labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelType {
    /// Radio → Track.
    Plays,
    /// Track → Artist.
    ComposedBy,
    /// Track → Album.
    PartOf,
    /// Artist → Artist.
    RelatedTo,
    /// Track → Genre.
    HasGenre,
}

impl RelType {
    /// Cypher relationship type name.
    pub fn name(self) -> &'static str {
        match self {
            RelType::Plays => "PLAYS",
            RelType::ComposedBy => "COMPOSED_BY",
            RelType::PartOf => "PART_OF",
            RelType::RelatedTo => "RELATED_TO",
            RelType::HasGenre => "HAS_GENRE",
        }
    }
}

/// A property value carried by a node at creation time.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// String property.
    Str(String),
    /// Integer property.
    Int(i64),
    /// List-of-strings property.
    List(Vec<String>),
}

impl From<PropValue> for BoltType {
    fn from(value: PropValue) -> Self {
        match value {
            PropValue::Str(s) => s.into(),
            PropValue::Int(i) => i.into(),
            PropValue::List(items) => items.into(),
        }
    }
}

/// One node to merge: label, natural key value, and on-create properties.
///
/// Properties apply only when the merge creates the node; an existing
/// node keeps whatever attributes it was first created with.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    /// Label of the node.
    pub label: Label,
    /// Value of the label's key property.
    pub key: String,
    /// Properties set at first creation.
    pub props: Vec<(&'static str, PropValue)>,
}

impl NodeSpec {
    /// Node with a key and no on-create properties.
    pub fn bare(label: Label, key: impl Into<String>) -> Self {
        NodeSpec {
            label,
            key: key.into(),
            props: Vec::new(),
        }
    }
}

/// Reference to a node by label and natural key, used as an edge endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    /// Label of the referenced node.
    pub label: Label,
    /// Value of the label's key property.
    pub key: String,
}

impl NodeRef {
    /// Builds a reference.
    pub fn new(label: Label, key: impl Into<String>) -> Self {
        NodeRef {
            label,
            key: key.into(),
        }
    }
}

/// One directed edge to merge between two nodes identified by natural
/// keys. Re-merging the same (src, type, dst) triple is a no-op.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeSpec {
    /// Source endpoint.
    pub src: NodeRef,
    /// Relationship type.
    pub rel: RelType,
    /// Destination endpoint.
    pub dst: NodeRef,
}

impl EdgeSpec {
    /// Builds an edge descriptor.
    pub fn new(src: NodeRef, rel: RelType, dst: NodeRef) -> Self {
        EdgeSpec { src, rel, dst }
    }
}

/// Everything a single source record materializes in the graph.
///
/// Nodes are ordered before the edges that reference them; the upsert
/// engine applies them in this order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedRecord {
    /// Nodes named by the record.
    pub nodes: Vec<NodeSpec>,
    /// Edges between those nodes.
    pub edges: Vec<EdgeSpec>,
}
