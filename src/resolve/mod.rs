//! Mention resolution: rule-based classification plus vocabulary precedence

pub mod classifier;
mod resolver;

pub use classifier::{Classification, EntityContext, Rule, RuleClassifier};
pub use resolver::{MentionResolver, ResolvedMention};
