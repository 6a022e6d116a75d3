//! Vocabulary of known entity names
//!
//! Sources name the tables that hold known names per taxonomy label; the
//! index compiles them into a phrase matcher run over every document.

mod index;
mod sources;

pub use index::{VocabularyHit, VocabularyIndex};
pub use sources::{is_plain_identifier, SourceFilter, VocabularySource, VocabularySources};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that leave the vocabulary unbuilt.
#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("vocabulary source unreadable: {0}")]
    Store(#[from] StorageError),

    #[error("invalid vocabulary source: {0}")]
    InvalidSource(String),
}
