//! Shared fixtures for lorelink integration tests

#![allow(dead_code)]

use lorelink::graph::{CoMention, Containment, MentionRecord};
use lorelink::storage::NodeInsert;
use lorelink::{
    Document, EntitySpan, GraphCursor, HeuristicAnalyzer, Label, MentionType, NodeId, OpenStore,
    OwnerId, PartOfSpeech, SqliteStore, StorageError, StorageResult, TagService, Token,
    VocabularySources,
};
use std::sync::Arc;

/// The worked example from the service documentation.
pub const CAMPAIGN_NOTE: &str = "Aria cast Fireball and then traveled to the Sunken Keep";

pub fn store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().expect("in-memory store"))
}

pub fn service_on(store: Arc<SqliteStore>) -> TagService {
    TagService::new(store, Arc::new(HeuristicAnalyzer::new()), VocabularySources::default())
}

/// A service over an empty in-memory store.
pub fn service() -> TagService {
    service_on(store())
}

/// A service whose catalog tables were seeded before the vocabulary build.
pub fn service_with_catalog(entries: &[(&str, &[&str])]) -> TagService {
    let store = store();
    for (table, names) in entries {
        store.add_catalog_terms(table, names).expect("seed catalog");
    }
    service_on(store)
}

/// Builds a pre-analyzed document token by token.
pub struct DocumentBuilder {
    text: String,
    tokens: Vec<Token>,
    entities: Vec<EntitySpan>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            tokens: Vec::new(),
            entities: Vec::new(),
        }
    }

    /// Append a token, separated from the previous one by a space.
    pub fn token(
        mut self,
        text: &str,
        lemma: &str,
        pos: PartOfSpeech,
        dep: &str,
        head: usize,
    ) -> Self {
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        let start = self.text.chars().count();
        self.text.push_str(text);
        self.tokens.push(Token {
            text: text.to_string(),
            start,
            end: start + text.chars().count(),
            lemma: lemma.to_string(),
            pos,
            dep: dep.to_string(),
            head,
        });
        self
    }

    pub fn entity(mut self, start: usize, end: usize, label: &str) -> Self {
        self.entities.push(EntitySpan {
            start,
            end,
            label: label.to_string(),
        });
        self
    }

    pub fn build(self) -> Document {
        Document {
            text: self.text,
            tokens: self.tokens,
            entities: self.entities,
        }
    }
}

/// Delegates to an inner cursor and fails on the `n`th link insert.
pub struct FailAfter<'c, C: GraphCursor> {
    inner: &'c mut C,
    links_left: usize,
}

impl<'c, C: GraphCursor> FailAfter<'c, C> {
    pub fn new(inner: &'c mut C, links_before_failure: usize) -> Self {
        Self {
            inner,
            links_left: links_before_failure,
        }
    }
}

impl<C: GraphCursor> GraphCursor for FailAfter<'_, C> {
    fn find_node(
        &mut self,
        name: &str,
        node_type: &MentionType,
        owner: OwnerId,
    ) -> StorageResult<Option<NodeId>> {
        self.inner.find_node(name, node_type, owner)
    }

    fn insert_node(
        &mut self,
        name: &str,
        node_type: &MentionType,
        owner: OwnerId,
    ) -> StorageResult<NodeInsert> {
        self.inner.insert_node(name, node_type, owner)
    }

    fn insert_mention(&mut self, mention: &MentionRecord) -> StorageResult<bool> {
        self.inner.insert_mention(mention)
    }

    fn insert_link(&mut self, link: &CoMention) -> StorageResult<bool> {
        if self.links_left == 0 {
            return Err(StorageError::Io(std::io::Error::other("injected link failure")));
        }
        self.links_left -= 1;
        self.inner.insert_link(link)
    }

    fn insert_relationship(&mut self, relationship: &Containment) -> StorageResult<bool> {
        self.inner.insert_relationship(relationship)
    }
}

/// `(name, type)` pairs of tagged output, in output order.
pub fn names_and_types(tagged: &[lorelink::TaggedNode]) -> Vec<(String, String)> {
    tagged
        .iter()
        .map(|t| (t.name.clone(), t.node_type.to_string()))
        .collect()
}

pub fn taxonomy(label: Label) -> MentionType {
    MentionType::Taxonomy(label)
}
