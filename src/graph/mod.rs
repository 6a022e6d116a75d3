//! The tagged graph: nodes, mention rows, derived edges, and the writer

mod edge;
mod node;
mod writer;

pub use edge::{CoMention, Containment, MentionRecord, LOCATED_IN};
pub use node::{name_key, NodeId, NodeKey, NodeRecord, NoteId, OwnerId};
pub use writer::{GraphWriter, NodeStatus, TaggedNode, WriteSummary};
