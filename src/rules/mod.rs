//! Parser rules: the model, persistence, matching and the built-in seed.

mod error;
mod matcher;
mod model;
mod seed;
mod store;
mod tester;

pub use error::RuleError;
pub use matcher::{RuleMatcher, SpecificityMatcher};
pub use model::{
    FIELD_CHAPTER_LIST_SELECTOR, FIELD_CONTENT_SELECTOR, FIELD_DOMAIN, ParserRule,
    RuleValidation, WILDCARD_DOMAIN, rules_from_json, rules_to_json, split_selectors,
    validate_rule,
};
pub use seed::{SMART_GENERIC_RULE_NAME, SeedOutcome, default_rules, seed_default_rules, smart_generic_rule};
pub use store::RuleStore;
pub use tester::{RuleTestReport, test_rule};
