//! Rule-based classifier for entities the vocabulary missed
//!
//! An ordered table of rules, evaluated first-match-wins. Lexical evidence
//! (item nouns) outranks syntactic context (governing verbs), which outranks
//! the bare dependency shape.

use crate::nlp::{dep, generic, Document, EntitySpan, PartOfSpeech, Token};
use crate::taxonomy::{Label, Provenance};

pub const SPELL_VERBS: &[&str] = &["cast", "prepare", "learn", "invoke"];
pub const ITEM_VERBS: &[&str] = &["carry", "use", "draw", "equip", "wield", "hold", "swing"];
pub const MONSTER_VERBS: &[&str] = &["attack", "fight", "encounter", "slay"];
pub const LOCATION_VERBS: &[&str] = &["travel", "visit", "enter", "arrive", "leave"];

pub const ITEM_KEYWORDS: &[&str] = &[
    "sword", "blade", "dagger", "axe", "bow", "crossbow", "staff", "wand", "rod", "ring",
    "amulet", "shield", "armor", "armour", "helm", "cloak", "boot", "boots", "gauntlet",
    "gauntlets", "potion", "scroll", "tome", "key", "orb", "hammer", "mace", "spear", "gem",
    "crown", "lantern", "map",
];

const PASSTHROUGH_LOCATIONS: &[&str] = &[generic::GPE, generic::LOC, generic::FAC, generic::EVENT];
const DEPENDENCY_RELATIONS: &[&str] = &[dep::NSUBJ, dep::DOBJ, dep::POBJ, dep::POSS, dep::ATTR];
const NON_PERSON_GENERICS: &[&str] = &[
    generic::ORG,
    generic::PRODUCT,
    generic::WORK_OF_ART,
    generic::LAW,
    generic::LANGUAGE,
];

/// The syntactic neighborhood of one generic entity span.
#[derive(Debug, Clone, Copy)]
pub struct EntityContext<'a> {
    pub generic_label: &'a str,
    /// Span token governed from outside the span
    pub root: &'a Token,
    /// Last token of the span
    pub last: &'a Token,
    /// The root's head
    pub governor: &'a Token,
    /// The root's head, climbing through adpositions
    pub governing_word: &'a Token,
}

impl<'a> EntityContext<'a> {
    pub fn new(document: &'a Document, entity: &'a EntitySpan) -> Self {
        let root = document.span_root(entity.start, entity.end);
        Self {
            generic_label: entity.label.as_str(),
            root: &document.tokens[root],
            last: &document.tokens[entity.end - 1],
            governor: &document.tokens[document.tokens[root].head],
            governing_word: &document.tokens[document.governing_word(root)],
        }
    }
}

/// Classifier verdict for one span.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: Label,
    pub provenance: Provenance,
    /// The generic recognizer's label, kept for the raw fallback
    pub generic_label: String,
}

type RuleFn = fn(&EntityContext<'_>) -> Option<Label>;

/// One named step of the cascade.
#[derive(Clone, Copy)]
pub struct Rule {
    pub name: &'static str,
    pub provenance: Provenance,
    apply: RuleFn,
}

impl Rule {
    pub fn apply(&self, ctx: &EntityContext<'_>) -> Option<Label> {
        (self.apply)(ctx)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("provenance", &self.provenance)
            .finish()
    }
}

/// Generic PERSON is accepted as-is.
pub fn passthrough_person(ctx: &EntityContext<'_>) -> Option<Label> {
    (ctx.generic_label == generic::PERSON).then_some(Label::Person)
}

/// Places, facilities, and events are accepted as locations.
pub fn passthrough_location(ctx: &EntityContext<'_>) -> Option<Label> {
    PASSTHROUGH_LOCATIONS
        .contains(&ctx.generic_label)
        .then_some(Label::Location)
}

fn is_item_noun(token: &Token) -> bool {
    token.pos.is_nominal() && ITEM_KEYWORDS.contains(&token.lemma.to_lowercase().as_str())
}

/// A span rooted in, or ending with, an item noun.
pub fn item_keyword(ctx: &EntityContext<'_>) -> Option<Label> {
    (is_item_noun(ctx.root) || is_item_noun(ctx.last)).then_some(Label::Item)
}

/// The verb governing the span, checked against spell, item, monster,
/// and location verbs in that order.
pub fn verb_governance(ctx: &EntityContext<'_>) -> Option<Label> {
    let verb = ctx.governing_word.lemma.to_lowercase();
    [
        (SPELL_VERBS, Label::Spell),
        (ITEM_VERBS, Label::Item),
        (MONSTER_VERBS, Label::Monster),
        (LOCATION_VERBS, Label::Location),
    ]
    .into_iter()
    .find(|(verbs, _)| verbs.contains(&verb.as_str()))
    .map(|(_, label)| label)
}

/// A proper-noun span in an argument position reads as a person.
pub fn dependency_person(ctx: &EntityContext<'_>) -> Option<Label> {
    let relation = ctx.governor.dep.as_str();
    if !DEPENDENCY_RELATIONS.contains(&relation) {
        return None;
    }
    if NON_PERSON_GENERICS.contains(&ctx.generic_label) {
        return None;
    }
    let proper_root = ctx.root.pos == PartOfSpeech::Propn;
    let proper_possessor = ctx.governor.pos == PartOfSpeech::Propn && relation == dep::POSS;
    (proper_root || proper_possessor).then_some(Label::Person)
}

/// The ordered rule cascade.
#[derive(Debug, Clone)]
pub struct RuleClassifier {
    rules: Vec<Rule>,
}

impl Default for RuleClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleClassifier {
    pub fn new() -> Self {
        // ORG has no rule of its own: it is neither accepted nor rejected
        // up front and falls through to the contextual rules.
        let rules = vec![
            Rule {
                name: "passthrough-person",
                provenance: Provenance::Passthrough,
                apply: passthrough_person,
            },
            Rule {
                name: "passthrough-location",
                provenance: Provenance::Passthrough,
                apply: passthrough_location,
            },
            Rule {
                name: "item-keyword",
                provenance: Provenance::Keyword,
                apply: item_keyword,
            },
            Rule {
                name: "verb-governance",
                provenance: Provenance::Verb,
                apply: verb_governance,
            },
            Rule {
                name: "dependency-person",
                provenance: Provenance::Dependency,
                apply: dependency_person,
            },
        ];
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run the cascade; UNKNOWN when no rule fires.
    pub fn classify(&self, ctx: &EntityContext<'_>) -> Classification {
        let verdict = self
            .rules
            .iter()
            .find_map(|rule| rule.apply(ctx).map(|label| (label, rule.provenance)));

        let (label, provenance) = verdict.unwrap_or((Label::Unknown, Provenance::NoRuleMatch));
        Classification {
            label,
            provenance,
            generic_label: ctx.generic_label.to_string(),
        }
    }

    pub fn classify_entity(&self, document: &Document, entity: &EntitySpan) -> Classification {
        self.classify(&EntityContext::new(document, entity))
    }
}
