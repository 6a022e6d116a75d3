//! Annotated document model produced by an NLP engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generic recognizer labels the pipeline gives meaning to.
pub mod generic {
    pub const PERSON: &str = "PERSON";
    pub const GPE: &str = "GPE";
    pub const LOC: &str = "LOC";
    pub const FAC: &str = "FAC";
    pub const EVENT: &str = "EVENT";
    pub const ORG: &str = "ORG";
    pub const PRODUCT: &str = "PRODUCT";
    pub const WORK_OF_ART: &str = "WORK_OF_ART";
    pub const LAW: &str = "LAW";
    pub const LANGUAGE: &str = "LANGUAGE";
    pub const CARDINAL: &str = "CARDINAL";
    pub const ORDINAL: &str = "ORDINAL";
    pub const MONEY: &str = "MONEY";
    pub const QUANTITY: &str = "QUANTITY";
    pub const PERCENT: &str = "PERCENT";
    pub const TIME: &str = "TIME";
    pub const DATE: &str = "DATE";
    pub const MISC: &str = "MISC";

    /// Numeric and temporal categories that never fall back to a raw mention.
    pub const NUMERIC_OR_TEMPORAL: [&str; 7] =
        [CARDINAL, ORDINAL, MONEY, QUANTITY, PERCENT, TIME, DATE];

    pub fn is_numeric_or_temporal(label: &str) -> bool {
        NUMERIC_OR_TEMPORAL.contains(&label)
    }
}

/// Dependency labels the classifier inspects.
pub mod dep {
    pub const ROOT: &str = "ROOT";
    pub const NSUBJ: &str = "nsubj";
    pub const DOBJ: &str = "dobj";
    pub const POBJ: &str = "pobj";
    pub const POSS: &str = "poss";
    pub const ATTR: &str = "attr";
    pub const PREP: &str = "prep";
    pub const CONJ: &str = "conj";
    pub const DET: &str = "det";
    pub const COMPOUND: &str = "compound";
    pub const AMOD: &str = "amod";
    pub const CASE: &str = "case";
    pub const PUNCT: &str = "punct";
    pub const DEP: &str = "dep";
}

/// Universal part-of-speech tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartOfSpeech {
    Noun,
    Propn,
    Verb,
    Aux,
    Adp,
    Det,
    Pron,
    Adj,
    Adv,
    Cconj,
    Num,
    Part,
    Punct,
    #[serde(other)]
    X,
}

impl PartOfSpeech {
    pub fn is_nominal(&self) -> bool {
        matches!(self, PartOfSpeech::Noun | PartOfSpeech::Propn)
    }
}

/// One token with its syntactic annotations.
///
/// Offsets are character (not byte) positions into the document text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub lemma: String,
    pub pos: PartOfSpeech,
    /// Dependency relation to `head`
    pub dep: String,
    /// Index of the governing token; a root points at itself
    pub head: usize,
}

/// A generic named-entity span over tokens `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Errors raised while producing or validating a document.
#[derive(Debug, Error)]
pub enum NlpError {
    #[error("analysis failed: {0}")]
    Analysis(String),

    #[error("malformed document: {0}")]
    Malformed(String),

    #[error("document parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The output of an NLP engine: text, tokens, and generic entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub entities: Vec<EntitySpan>,
}

impl Document {
    /// Parse a document produced by an external engine and check its indices.
    pub fn from_json(json: &str) -> Result<Self, NlpError> {
        let doc: Document = serde_json::from_str(json)?;
        doc.validate()?;
        Ok(doc)
    }

    /// Check that heads, entity ranges, and offsets stay in bounds.
    pub fn validate(&self) -> Result<(), NlpError> {
        let chars = self.text.chars().count();
        for (i, token) in self.tokens.iter().enumerate() {
            if token.head >= self.tokens.len() {
                return Err(NlpError::Malformed(format!(
                    "token {} has head {} outside the document",
                    i, token.head
                )));
            }
            if token.start > token.end || token.end > chars {
                return Err(NlpError::Malformed(format!(
                    "token {} has offsets {}..{} outside the text",
                    i, token.start, token.end
                )));
            }
        }
        for entity in &self.entities {
            if entity.start >= entity.end || entity.end > self.tokens.len() {
                return Err(NlpError::Malformed(format!(
                    "entity {} spans tokens {}..{}",
                    entity.label, entity.start, entity.end
                )));
            }
        }
        Ok(())
    }

    /// Character span covered by tokens `[start, end)`.
    pub fn char_span(&self, start: usize, end: usize) -> (usize, usize) {
        (self.tokens[start].start, self.tokens[end - 1].end)
    }

    /// Text between two character offsets.
    pub fn slice_chars(&self, start: usize, end: usize) -> String {
        self.text.chars().skip(start).take(end.saturating_sub(start)).collect()
    }

    /// Root of a token range: the first token whose head lies outside it.
    pub fn span_root(&self, start: usize, end: usize) -> usize {
        (start..end)
            .find(|&i| {
                let head = self.tokens[i].head;
                head == i || head < start || head >= end
            })
            .unwrap_or(end - 1)
    }

    /// Walk up from a token's head through adpositions to the governing word.
    ///
    /// "traveled to the Keep" resolves the governor of "Keep" to "traveled".
    pub fn governing_word(&self, index: usize) -> usize {
        let mut current = self.tokens[index].head;
        let mut steps = 0;
        while self.tokens[current].pos == PartOfSpeech::Adp
            && self.tokens[current].head != current
            && steps < self.tokens.len()
        {
            current = self.tokens[current].head;
            steps += 1;
        }
        current
    }
}
