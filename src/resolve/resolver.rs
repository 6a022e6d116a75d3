//! Merge vocabulary hits and classifier verdicts into one mention set

use super::classifier::RuleClassifier;
use crate::nlp::{generic, Document};
use crate::taxonomy::{Label, MentionType, Provenance};
use crate::vocabulary::VocabularyIndex;
use serde::Serialize;
use tracing::debug;

/// A labeled span of the note text, ready to be written.
///
/// `start`/`end` are character offsets into the note.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedMention {
    pub start: usize,
    pub end: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub mention_type: MentionType,
    pub provenance: Provenance,
    pub confidence: f64,
}

impl ResolvedMention {
    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

/// Resolves the mentions of one analyzed document.
#[derive(Debug, Clone, Default)]
pub struct MentionResolver {
    classifier: RuleClassifier,
}

impl MentionResolver {
    pub fn new(classifier: RuleClassifier) -> Self {
        Self { classifier }
    }

    pub fn classifier(&self) -> &RuleClassifier {
        &self.classifier
    }

    /// Exact vocabulary hits first, then classified generic entities that do
    /// not overlap anything already accepted.
    ///
    /// The result is ordered by span start with no overlaps and no UNKNOWN.
    pub fn resolve(&self, document: &Document, index: &VocabularyIndex) -> Vec<ResolvedMention> {
        let mut accepted: Vec<ResolvedMention> = Vec::new();

        for hit in index.lookup(document) {
            let (start, end) = document.char_span(hit.start, hit.end);
            let exact = mention(document, start, end, hit.label.into(), Provenance::Exact);
            if let Some(mention) = exact {
                debug!(text = %mention.text, label = %hit.label, "vocabulary hit");
                accepted.push(mention);
            }
        }

        for entity in &document.entities {
            let (start, end) = document.char_span(entity.start, entity.end);
            if accepted.iter().any(|m| m.overlaps(start, end)) {
                continue;
            }

            let verdict = self.classifier.classify_entity(document, entity);
            let (mention_type, provenance) = match verdict.label {
                Label::Unknown if generic::is_numeric_or_temporal(&verdict.generic_label) => {
                    debug!(label = %verdict.generic_label, "dropping numeric or temporal entity");
                    continue;
                }
                Label::Unknown => (
                    MentionType::Raw(verdict.generic_label.clone()),
                    Provenance::RawUnclassified,
                ),
                label => (MentionType::Taxonomy(label), verdict.provenance),
            };

            if let Some(mention) = mention(document, start, end, mention_type, provenance) {
                debug!(
                    text = %mention.text,
                    mention_type = %mention.mention_type,
                    provenance = %provenance,
                    generic = %verdict.generic_label,
                    "classified entity"
                );
                accepted.push(mention);
            }
        }

        accepted.sort_by_key(|m| m.start);
        accepted
    }
}

fn mention(
    document: &Document,
    start: usize,
    end: usize,
    mention_type: MentionType,
    provenance: Provenance,
) -> Option<ResolvedMention> {
    let text = document.slice_chars(start, end).trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some(ResolvedMention {
        start,
        end,
        text,
        mention_type,
        provenance,
        confidence: provenance.confidence(),
    })
}
