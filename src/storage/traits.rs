//! Storage trait definitions

use crate::graph::{CoMention, Containment, MentionRecord, NodeId, NodeRecord, OwnerId};
use crate::taxonomy::MentionType;
use crate::vocabulary::VocabularySource;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid SQL identifier: {0}")]
    InvalidIdentifier(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of an insert-if-absent on the node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeInsert {
    Created(NodeId),
    /// Another writer got there first
    Existing(NodeId),
}

impl NodeInsert {
    pub fn id(&self) -> NodeId {
        match self {
            NodeInsert::Created(id) | NodeInsert::Existing(id) => *id,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, NodeInsert::Created(_))
    }
}

/// Row counts, optionally for one owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: u64,
    pub mentions: u64,
    pub links: u64,
    pub relationships: u64,
}

/// Reads distinct surface strings for the vocabulary.
pub trait VocabularyStore: Send + Sync {
    /// Distinct non-null, non-blank values of `source.column`.
    fn fetch_terms(&self, source: &VocabularySource) -> StorageResult<Vec<String>>;
}

/// Write access inside one open transaction.
///
/// Every insert is conditioned on absence and reports whether a row was
/// actually added. Implementations never commit or roll back.
pub trait GraphCursor {
    /// Node id for a case-insensitive name within `(type, owner)`.
    ///
    /// Names compare by [`name_key`](crate::graph::name_key).
    fn find_node(
        &mut self,
        name: &str,
        node_type: &MentionType,
        owner: OwnerId,
    ) -> StorageResult<Option<NodeId>>;

    /// Insert a node unless its identity already exists.
    fn insert_node(
        &mut self,
        name: &str,
        node_type: &MentionType,
        owner: OwnerId,
    ) -> StorageResult<NodeInsert>;

    fn insert_mention(&mut self, mention: &MentionRecord) -> StorageResult<bool>;

    fn insert_link(&mut self, link: &CoMention) -> StorageResult<bool>;

    fn insert_relationship(&mut self, relationship: &Containment) -> StorageResult<bool>;
}

/// Read-only queries over the tagged graph.
///
/// Implementations must be thread-safe (Send + Sync) to support
/// concurrent access from request handlers.
pub trait GraphStore: Send + Sync {
    fn get_node(&self, id: NodeId) -> StorageResult<Option<NodeRecord>>;

    /// Nodes of one owner whose name matches case-insensitively.
    fn find_nodes_by_name(
        &self,
        name: &str,
        owner: OwnerId,
        node_type: Option<&MentionType>,
    ) -> StorageResult<Vec<NodeRecord>>;

    /// Mention rows of a node, newest note first.
    fn mentions_for_node(&self, id: NodeId) -> StorageResult<Vec<MentionRecord>>;

    /// Co-mention links originating at a node.
    fn links_from(&self, id: NodeId) -> StorageResult<Vec<CoMention>>;

    /// Containment edges where the node is parent or child.
    fn relationships_for(&self, id: NodeId) -> StorageResult<Vec<Containment>>;

    fn stats(&self, owner: Option<OwnerId>) -> StorageResult<GraphStats>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: GraphStore + Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
