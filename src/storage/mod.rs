//! Storage backends for lorelink
//!
//! The tagger writes through a `GraphCursor` handed out by a transaction
//! boundary, reads vocabulary through `VocabularyStore`, and serves queries
//! through `GraphStore`. The implementation is `SqliteStore`.

mod sqlite;
mod traits;

pub use sqlite::{SqliteCursor, SqliteStore, CATALOG_TABLES};
pub use traits::{
    GraphCursor, GraphStats, GraphStore, NodeInsert, OpenStore, StorageError, StorageResult,
    VocabularyStore,
};
