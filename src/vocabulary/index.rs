//! Case-insensitive exact-phrase matcher over document tokens

use super::sources::VocabularySources;
use super::VocabularyError;
use crate::nlp::{normalized_words, Document};
use crate::storage::VocabularyStore;
use crate::taxonomy::Label;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
struct TrieNode {
    children: HashMap<String, usize>,
    label: Option<Label>,
}

/// A vocabulary match over document tokens `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VocabularyHit {
    pub start: usize,
    pub end: usize,
    pub label: Label,
}

impl VocabularyHit {
    fn len(&self) -> usize {
        self.end - self.start
    }
}

/// Token trie of known names, keyed by lower-cased token text.
///
/// Built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct VocabularyIndex {
    nodes: Vec<TrieNode>,
    counts: BTreeMap<Label, usize>,
}

impl Default for VocabularyIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VocabularyIndex {
    /// An index with no phrases.
    pub fn new() -> Self {
        Self {
            nodes: vec![TrieNode::default()],
            counts: BTreeMap::new(),
        }
    }

    /// Build from `(label, phrase)` pairs; earlier pairs win on conflicts.
    pub fn from_terms<'a>(terms: impl IntoIterator<Item = (Label, &'a str)>) -> Self {
        let mut index = Self::new();
        for (label, phrase) in terms {
            index.insert(label, phrase);
        }
        index
    }

    /// Load every source through `store` and compile the index.
    pub fn build(
        store: &dyn VocabularyStore,
        sources: &VocabularySources,
    ) -> Result<Self, VocabularyError> {
        sources.validate().map_err(VocabularyError::InvalidSource)?;

        let mut index = Self::new();
        for (label, label_sources) in sources.iter() {
            for source in label_sources {
                let terms = store.fetch_terms(source)?;
                debug!(
                    label = %label,
                    source = %source,
                    terms = terms.len(),
                    "loaded vocabulary source"
                );
                for term in &terms {
                    index.insert(*label, term);
                }
            }
        }

        info!(
            phrases = index.len(),
            labels = ?index.counts,
            "vocabulary index built"
        );
        Ok(index)
    }

    /// Add a phrase. Returns false for blank phrases and phrases already present.
    pub fn insert(&mut self, label: Label, phrase: &str) -> bool {
        if label.is_unknown() {
            return false;
        }
        let words = normalized_words(phrase);
        if words.is_empty() {
            return false;
        }

        let mut current = 0;
        for word in words {
            current = match self.nodes[current].children.get(&word) {
                Some(&next) => next,
                None => {
                    self.nodes.push(TrieNode::default());
                    let next = self.nodes.len() - 1;
                    self.nodes[current].children.insert(word, next);
                    next
                }
            };
        }

        if self.nodes[current].label.is_some() {
            return false;
        }
        self.nodes[current].label = Some(label);
        *self.counts.entry(label).or_insert(0) += 1;
        true
    }

    /// Number of distinct phrases.
    pub fn len(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Phrase count per label.
    pub fn label_counts(&self) -> &BTreeMap<Label, usize> {
        &self.counts
    }

    /// Label of an exact (case-insensitive) phrase, if indexed.
    pub fn label_of(&self, phrase: &str) -> Option<Label> {
        let mut current = 0;
        for word in normalized_words(phrase) {
            current = *self.nodes[current].children.get(&word)?;
        }
        self.nodes[current].label
    }

    /// Find vocabulary phrases in `document`.
    ///
    /// Matches align with token boundaries. Overlapping matches are resolved
    /// in favor of the longer one, then the earlier one. The result is in
    /// document order and non-overlapping.
    pub fn lookup(&self, document: &Document) -> Vec<VocabularyHit> {
        let words: Vec<String> = document.tokens.iter().map(|t| t.text.to_lowercase()).collect();

        let mut candidates = Vec::new();
        for start in 0..words.len() {
            let mut current = 0;
            for (offset, word) in words[start..].iter().enumerate() {
                match self.nodes[current].children.get(word) {
                    Some(&next) => current = next,
                    None => break,
                }
                if let Some(label) = self.nodes[current].label {
                    candidates.push(VocabularyHit {
                        start,
                        end: start + offset + 1,
                        label,
                    });
                }
            }
        }

        candidates.sort_by(|a, b| b.len().cmp(&a.len()).then(a.start.cmp(&b.start)));

        let mut taken = vec![false; words.len()];
        let mut hits = Vec::new();
        for hit in candidates {
            if taken[hit.start..hit.end].iter().any(|&t| t) {
                continue;
            }
            taken[hit.start..hit.end].iter_mut().for_each(|t| *t = true);
            hits.push(hit);
        }

        hits.sort_by_key(|h| h.start);
        hits
    }
}
