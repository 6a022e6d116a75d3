//! Node deduplication and edge derivation for one tagged note

use super::edge::{CoMention, Containment, MentionRecord};
use super::node::{NodeId, NodeKey, NoteId, OwnerId};
use crate::resolve::ResolvedMention;
use crate::storage::{GraphCursor, NodeInsert, StorageResult};
use crate::taxonomy::{MentionType, Provenance};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Whether a tagged node was created by this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    New,
    Existing,
}

/// Per-mention summary returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedNode {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: MentionType,
    pub status: NodeStatus,
    pub source: Provenance,
    pub confidence: f64,
}

/// Rows actually added by one write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WriteSummary {
    pub nodes_created: usize,
    pub nodes_reused: usize,
    pub mentions: usize,
    pub links: usize,
    pub relationships: usize,
}

/// Writes the resolved mentions of one note through a cursor.
///
/// Holds the request's node cache; create one per note and drop it after.
/// Never commits or rolls back.
pub struct GraphWriter {
    note_id: NoteId,
    owner: OwnerId,
    cache: HashMap<NodeKey, (NodeId, NodeStatus)>,
    summary: WriteSummary,
}

impl GraphWriter {
    pub fn new(note_id: NoteId, owner: OwnerId) -> Self {
        Self {
            note_id,
            owner,
            cache: HashMap::new(),
            summary: WriteSummary::default(),
        }
    }

    pub fn summary(&self) -> &WriteSummary {
        &self.summary
    }

    /// Map every mention to a node, record it, and derive co-mention and
    /// containment edges. Returns one summary per mention, in order.
    pub fn write<C: GraphCursor + ?Sized>(
        &mut self,
        mentions: &[ResolvedMention],
        cursor: &mut C,
    ) -> StorageResult<Vec<TaggedNode>> {
        let mut tagged = Vec::with_capacity(mentions.len());
        // Distinct nodes in first-mention order, with their type
        let mut distinct: Vec<(NodeId, &MentionType)> = Vec::new();

        for mention in mentions {
            let (id, status) = self.node_for(mention, cursor)?;

            let added = cursor.insert_mention(&MentionRecord {
                node_id: id,
                note_id: self.note_id,
                start_pos: mention.start,
                end_pos: mention.end,
                mention_type: mention.mention_type.clone(),
                source: mention.provenance,
                confidence: mention.confidence,
            })?;
            if added {
                self.summary.mentions += 1;
            }

            if !distinct.iter().any(|(seen, _)| *seen == id) {
                distinct.push((id, &mention.mention_type));
            }

            tagged.push(TaggedNode {
                id,
                name: mention.text.clone(),
                node_type: mention.mention_type.clone(),
                status,
                source: mention.provenance,
                confidence: mention.confidence,
            });
        }

        self.link_co_mentions(&distinct, cursor)?;
        self.link_containment(&distinct, cursor)?;

        info!(
            note_id = self.note_id,
            owner = self.owner,
            mentions = tagged.len(),
            nodes_created = self.summary.nodes_created,
            nodes_reused = self.summary.nodes_reused,
            links = self.summary.links,
            relationships = self.summary.relationships,
            "note tagged"
        );
        Ok(tagged)
    }

    fn node_for<C: GraphCursor + ?Sized>(
        &mut self,
        mention: &ResolvedMention,
        cursor: &mut C,
    ) -> StorageResult<(NodeId, NodeStatus)> {
        let key = NodeKey::new(&mention.text, &mention.mention_type, self.owner);
        if let Some(&cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let (name, node_type) = (&mention.text, &mention.mention_type);
        let resolved = match cursor.find_node(name, node_type, self.owner)? {
            Some(id) => (id, NodeStatus::Existing),
            None => match cursor.insert_node(name, node_type, self.owner)? {
                NodeInsert::Created(id) => (id, NodeStatus::New),
                NodeInsert::Existing(id) => (id, NodeStatus::Existing),
            },
        };

        match resolved.1 {
            NodeStatus::New => self.summary.nodes_created += 1,
            NodeStatus::Existing => self.summary.nodes_reused += 1,
        }
        debug!(
            name = %name,
            node_type = %node_type,
            id = resolved.0,
            status = ?resolved.1,
            "node resolved"
        );

        self.cache.insert(key, resolved);
        Ok(resolved)
    }

    /// Both directions of every unordered pair of distinct nodes.
    fn link_co_mentions<C: GraphCursor + ?Sized>(
        &mut self,
        distinct: &[(NodeId, &MentionType)],
        cursor: &mut C,
    ) -> StorageResult<()> {
        for (i, &(a, _)) in distinct.iter().enumerate() {
            for &(b, _) in &distinct[i + 1..] {
                let link = CoMention {
                    source_node_id: a,
                    target_node_id: b,
                    note_id: self.note_id,
                };
                for directed in [link, link.reversed()] {
                    if cursor.insert_link(&directed)? {
                        self.summary.links += 1;
                    }
                }
            }
        }
        Ok(())
    }

    /// The first location contains every distinct non-location node.
    fn link_containment<C: GraphCursor + ?Sized>(
        &mut self,
        distinct: &[(NodeId, &MentionType)],
        cursor: &mut C,
    ) -> StorageResult<()> {
        let Some(&(primary, _)) = distinct.iter().find(|(_, t)| t.is_location()) else {
            return Ok(());
        };

        for &(child, node_type) in distinct {
            if node_type.is_location() {
                continue;
            }
            let containment = Containment::located_in(primary, child, self.note_id);
            if cursor.insert_relationship(&containment)? {
                self.summary.relationships += 1;
            }
        }
        Ok(())
    }
}
