//! Mention rows and the edges derived from them

use super::node::{NodeId, NoteId};
use crate::taxonomy::{MentionType, Provenance};
use serde::{Deserialize, Serialize};

/// Relationship type of a containment edge
pub const LOCATED_IN: &str = "located_in";

/// One occurrence of a node in a note, by character span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MentionRecord {
    pub node_id: NodeId,
    pub note_id: NoteId,
    pub start_pos: usize,
    pub end_pos: usize,
    pub mention_type: MentionType,
    pub source: Provenance,
    pub confidence: f64,
}

/// Directed co-mention link; written in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoMention {
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    pub note_id: NoteId,
}

impl CoMention {
    pub fn reversed(&self) -> Self {
        Self {
            source_node_id: self.target_node_id,
            target_node_id: self.source_node_id,
            note_id: self.note_id,
        }
    }
}

/// Parent location contains child entity, as asserted by one note.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Containment {
    pub parent_node_id: NodeId,
    pub child_node_id: NodeId,
    pub relationship_type: String,
    pub note_id: NoteId,
}

impl Containment {
    pub fn located_in(parent_node_id: NodeId, child_node_id: NodeId, note_id: NoteId) -> Self {
        Self {
            parent_node_id,
            child_node_id,
            relationship_type: LOCATED_IN.to_string(),
            note_id,
        }
    }
}
