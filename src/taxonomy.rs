//! Domain taxonomy: labels, mention types, and classification provenance

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fixed domain categories a mention can be classified into.
///
/// `Unknown` is the classifier's reject value and is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Person,
    Item,
    Spell,
    Monster,
    Location,
    Unknown,
}

impl Label {
    /// The persistable labels, in vocabulary precedence order.
    pub const TAXONOMY: [Label; 5] = [
        Label::Person,
        Label::Item,
        Label::Spell,
        Label::Monster,
        Label::Location,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Person => "PERSON",
            Label::Item => "ITEM",
            Label::Spell => "SPELL",
            Label::Monster => "MONSTER",
            Label::Location => "LOCATION",
            Label::Unknown => "UNKNOWN",
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Label::Unknown)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a taxonomy label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown taxonomy label: {0}")]
pub struct ParseLabelError(pub String);

impl FromStr for Label {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PERSON" => Ok(Label::Person),
            "ITEM" => Ok(Label::Item),
            "SPELL" => Ok(Label::Spell),
            "MONSTER" => Ok(Label::Monster),
            "LOCATION" => Ok(Label::Location),
            "UNKNOWN" => Ok(Label::Unknown),
            other => Err(ParseLabelError(other.to_string())),
        }
    }
}

/// The persisted type of a mention or node.
///
/// Usually a taxonomy label; the raw-unclassified fallback keeps the generic
/// recognizer's own label (e.g. `ORG`) instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MentionType {
    Taxonomy(Label),
    Raw(String),
}

impl MentionType {
    pub fn as_str(&self) -> &str {
        match self {
            MentionType::Taxonomy(label) => label.as_str(),
            MentionType::Raw(raw) => raw.as_str(),
        }
    }

    pub fn is_location(&self) -> bool {
        matches!(self, MentionType::Taxonomy(Label::Location))
    }

    /// Parse a stored type string back into a mention type.
    pub fn parse(s: &str) -> Self {
        match s.parse::<Label>() {
            Ok(label) if !label.is_unknown() => MentionType::Taxonomy(label),
            _ => MentionType::Raw(s.to_string()),
        }
    }
}

impl From<Label> for MentionType {
    fn from(label: Label) -> Self {
        MentionType::Taxonomy(label)
    }
}

impl fmt::Display for MentionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MentionType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MentionType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(MentionType::parse(&s))
    }
}

/// Which match path or rule produced a mention's classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Vocabulary index hit
    Exact,
    /// The generic recognizer's own label was accepted
    Passthrough,
    /// ITEM keyword rule
    Keyword,
    /// Verb-governance rule
    Verb,
    /// Dependency-shape rule
    Dependency,
    /// Low-confidence fallback keeping the generic label as type
    RawUnclassified,
    /// The cascade rejected the span
    NoRuleMatch,
}

impl Provenance {
    /// Fixed confidence scalar for this provenance.
    pub fn confidence(&self) -> f64 {
        match self {
            Provenance::Exact => 1.0,
            Provenance::Passthrough => 0.80,
            Provenance::Keyword => 0.70,
            Provenance::Verb => 0.65,
            Provenance::Dependency => 0.60,
            Provenance::RawUnclassified => 0.30,
            Provenance::NoRuleMatch => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Exact => "exact",
            Provenance::Passthrough => "passthrough",
            Provenance::Keyword => "keyword",
            Provenance::Verb => "verb",
            Provenance::Dependency => "dependency",
            Provenance::RawUnclassified => "raw-unclassified",
            Provenance::NoRuleMatch => "no-rule-match",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "exact" => Some(Provenance::Exact),
            "passthrough" => Some(Provenance::Passthrough),
            "keyword" => Some(Provenance::Keyword),
            "verb" => Some(Provenance::Verb),
            "dependency" => Some(Provenance::Dependency),
            "raw-unclassified" => Some(Provenance::RawUnclassified),
            "no-rule-match" => Some(Provenance::NoRuleMatch),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
