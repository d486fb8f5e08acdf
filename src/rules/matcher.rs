//! Rule selection for a URL.
//!
//! The default [`SpecificityMatcher`] scores every rule against the URL's
//! host: a non-wildcard pattern contained in the host scores its length, the
//! wildcard scores zero, anything else is not a candidate. The best score
//! wins and ties go to the earliest-created rule, so the seeded "Smart
//! generic" rule is the wildcard fallback.

use std::cmp::Reverse;

use super::model::ParserRule;

/// Strategy choosing one rule for a host.
pub trait RuleMatcher: Send + Sync {
    /// Picks the rule for `host` (already lower-cased), or `None` if nothing applies.
    fn select<'a>(&self, host: &str, rules: &'a [ParserRule]) -> Option<&'a ParserRule>;
}

/// Longest contained domain pattern wins; wildcard rules are the fallback.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpecificityMatcher;

impl SpecificityMatcher {
    /// Specificity of `rule` for `host`, `None` when it does not apply.
    #[must_use]
    pub fn score(rule: &ParserRule, host: &str) -> Option<usize> {
        if rule.is_wildcard() {
            return Some(0);
        }
        let pattern = normalize_pattern(&rule.domain_pattern);
        if pattern.is_empty() || !host.contains(pattern.as_str()) {
            return None;
        }
        Some(pattern.len())
    }
}

impl RuleMatcher for SpecificityMatcher {
    fn select<'a>(&self, host: &str, rules: &'a [ParserRule]) -> Option<&'a ParserRule> {
        rules
            .iter()
            .filter_map(|rule| Self::score(rule, host).map(|score| (score, rule)))
            .max_by_key(|(score, rule)| {
                (
                    *score,
                    Reverse(rule.created_at),
                    Reverse(rule.id.unwrap_or(i64::MAX)),
                )
            })
            .map(|(_, rule)| rule)
    }
}

/// Lower-cases the pattern and drops a leading `*.` so `*.example.com` matches like `example.com`.
fn normalize_pattern(pattern: &str) -> String {
    let pattern = pattern.trim().to_lowercase();
    match pattern.strip_prefix("*.") {
        Some(rest) => rest.to_string(),
        None => pattern,
    }
}
