//! lorelink: Campaign-Note Entity Tagger
//!
//! Finds mentions of people, items, spells, monsters, and locations in
//! free-form tabletop campaign notes and records them in a per-owner graph.
//!
//! # Core Concepts
//!
//! - **Vocabulary**: known names per label, matched exactly and case-insensitively
//! - **Classifier**: an ordered rule cascade over syntax for names the vocabulary misses
//! - **Nodes**: one per (name, type, owner), created lazily and reused across notes
//! - **Edges**: co-mention links between nodes of a note, plus containment in
//!   the note's first location
//!
//! # Example
//!
//! ```
//! use lorelink::{HeuristicAnalyzer, NlpEngine, MentionResolver, VocabularyIndex};
//!
//! let document = HeuristicAnalyzer::new()
//!     .analyze("Aria cast Fireball and then traveled to the Sunken Keep")
//!     .unwrap();
//! let mentions = MentionResolver::default().resolve(&document, &VocabularyIndex::new());
//! assert_eq!(mentions.len(), 3);
//! ```

pub mod config;
pub mod graph;
pub mod http;
pub mod mcp;
pub mod nlp;
pub mod pipeline;
pub mod resolve;
pub mod storage;
pub mod taxonomy;
pub mod vocabulary;

pub use config::{Config, ConfigError};
pub use graph::{
    name_key, CoMention, Containment, GraphWriter, MentionRecord, NodeId, NodeRecord, NodeStatus,
    NoteId, OwnerId, TaggedNode,
};
pub use nlp::{Document, EntitySpan, HeuristicAnalyzer, NlpEngine, NlpError, PartOfSpeech, Token};
pub use pipeline::{Pipeline, Readiness, TagError, TagRequest, TagService, VocabularyStatus};
pub use resolve::{MentionResolver, ResolvedMention, RuleClassifier};
pub use storage::{
    GraphCursor, GraphStats, GraphStore, OpenStore, SqliteStore, StorageError, StorageResult,
    VocabularyStore,
};
pub use taxonomy::{Label, MentionType, Provenance};
pub use vocabulary::{VocabularyError, VocabularyIndex, VocabularySource, VocabularySources};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
