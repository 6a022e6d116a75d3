//! Canonical entity nodes

use crate::taxonomy::MentionType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row id of a node
pub type NodeId = i64;
/// Id of the note a mention was found in
pub type NoteId = i64;
/// Tenant id; every node belongs to exactly one owner
pub type OwnerId = i64;

/// Case-folded form of a node name, stored alongside the name and used for lookups.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Identity of a node: lower-cased trimmed name, type, and owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub name: String,
    pub node_type: MentionType,
    pub owner: OwnerId,
}

impl NodeKey {
    pub fn new(name: &str, node_type: &MentionType, owner: OwnerId) -> Self {
        Self {
            name: name_key(name),
            node_type: node_type.clone(),
            owner,
        }
    }
}

/// A persisted node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    /// Surface form of the first mention that created the node
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: MentionType,
    pub owner: OwnerId,
    pub created_at: DateTime<Utc>,
}

impl NodeRecord {
    pub fn key(&self) -> NodeKey {
        NodeKey::new(&self.name, &self.node_type, self.owner)
    }
}
