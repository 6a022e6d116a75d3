//! Where known entity names come from

use crate::taxonomy::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Equality condition applied when reading a source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFilter {
    pub column: String,
    pub value: String,
}

/// One table/column that contributes surface strings to a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularySource {
    pub table: String,
    pub column: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<SourceFilter>,
}

impl VocabularySource {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filter = Some(SourceFilter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    /// Every identifier this source would interpolate into SQL.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut idents = vec![self.table.as_str(), self.column.as_str()];
        if let Some(filter) = &self.filter {
            idents.push(filter.column.as_str());
        }
        idents
    }

    /// Find the first identifier that is not a plain SQL identifier.
    pub fn invalid_identifier(&self) -> Option<&str> {
        self.identifiers().into_iter().find(|id| !is_plain_identifier(id))
    }
}

impl std::fmt::Display for VocabularySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)?;
        if let Some(filter) = &self.filter {
            write!(f, " where {} = '{}'", filter.column, filter.value)?;
        }
        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_plain_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Taxonomy label → sources, iterated in label order.
///
/// Label order is also phrase precedence: a name listed under two labels
/// keeps the earlier one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VocabularySources(BTreeMap<Label, Vec<VocabularySource>>);

impl VocabularySources {
    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with_source(mut self, label: Label, source: VocabularySource) -> Self {
        self.0.entry(label).or_default().push(source);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Label, &Vec<VocabularySource>)> {
        self.0.iter()
    }

    pub fn source_count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// Check identifiers and labels; returns a description of the first problem.
    pub fn validate(&self) -> Result<(), String> {
        for (label, sources) in &self.0 {
            if label.is_unknown() {
                return Err("UNKNOWN cannot have vocabulary sources".to_string());
            }
            for source in sources {
                if let Some(bad) = source.invalid_identifier() {
                    return Err(format!("invalid identifier '{}' in source {}", bad, source));
                }
            }
        }
        Ok(())
    }
}

impl Default for VocabularySources {
    /// Catalog tables plus previously tagged nodes of each type.
    fn default() -> Self {
        let node_source = |label: Label| {
            VocabularySource::new("nodes", "name").with_filter("type", label.as_str())
        };
        Self::empty()
            .with_source(Label::Person, VocabularySource::new("core_names", "name"))
            .with_source(Label::Person, node_source(Label::Person))
            .with_source(Label::Item, VocabularySource::new("core_items", "name"))
            .with_source(Label::Item, VocabularySource::new("core_tools", "name"))
            .with_source(Label::Item, node_source(Label::Item))
            .with_source(Label::Spell, VocabularySource::new("core_spells", "name"))
            .with_source(Label::Spell, node_source(Label::Spell))
            .with_source(Label::Monster, VocabularySource::new("bestiary", "name"))
            .with_source(Label::Monster, node_source(Label::Monster))
            .with_source(Label::Location, node_source(Label::Location))
    }
}
