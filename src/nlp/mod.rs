//! NLP seam: the document model and the engines that produce it
//!
//! The pipeline treats tokenization, tagging, parsing, and generic entity
//! recognition as a black box behind [`NlpEngine`]. An external engine's
//! output can be supplied as JSON ([`Document::from_json`]); the built-in
//! [`HeuristicAnalyzer`] covers the case where no model is available.

mod document;
mod heuristic;
mod tokenize;

pub use document::{dep, generic, Document, EntitySpan, NlpError, PartOfSpeech, Token};
pub use heuristic::{verb_lemma, HeuristicAnalyzer};
pub use tokenize::{normalized_words, tokenize, RawToken};

/// Produces an annotated [`Document`] from raw text.
///
/// Implementations must be thread-safe: one engine serves every request.
pub trait NlpEngine: Send + Sync {
    /// Short identifier used in logs and status output
    fn name(&self) -> &str;

    /// Tokenize, tag, parse, and recognize entities in `text`.
    fn analyze(&self, text: &str) -> Result<Document, NlpError>;
}
