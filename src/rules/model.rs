//! Declarative extraction rules.

use serde::{Deserialize, Serialize};

/// Domain pattern that matches every host.
pub const WILDCARD_DOMAIN: &str = "*";

/// Field names reported by [`validate_rule`], in reporting order.
pub const FIELD_DOMAIN: &str = "domain";
/// See [`FIELD_DOMAIN`].
pub const FIELD_CHAPTER_LIST_SELECTOR: &str = "chapterListSelector";
/// See [`FIELD_DOMAIN`].
pub const FIELD_CONTENT_SELECTOR: &str = "contentSelector";

/// A site extraction rule.
///
/// Selectors are opaque CSS selector strings handed to the markup engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserRule {
    /// Store identifier; `None` until the rule is persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Display name.
    pub name: String,
    /// `"*"` or a substring of the host this rule applies to.
    pub domain_pattern: String,
    /// Selects the link-bearing elements of the chapter index.
    pub chapter_list_selector: String,
    /// Selects the title inside each chapter list element.
    #[serde(default)]
    pub chapter_title_selector: Option<String>,
    /// Selects the link inside each chapter list element.
    #[serde(default)]
    pub chapter_link_selector: Option<String>,
    /// Selects the chapter body.
    pub content_selector: String,
    /// Nodes removed from a chapter page before the body is read.
    #[serde(default)]
    pub remove_selectors: Vec<String>,
    /// Creation time in epoch milliseconds; earlier rules win matching ties.
    #[serde(default)]
    pub created_at: i64,
}

impl ParserRule {
    /// Creates an unsaved rule with the required fields.
    pub fn new(
        name: impl Into<String>,
        domain_pattern: impl Into<String>,
        chapter_list_selector: impl Into<String>,
        content_selector: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            domain_pattern: domain_pattern.into(),
            chapter_list_selector: chapter_list_selector.into(),
            chapter_title_selector: None,
            chapter_link_selector: None,
            content_selector: content_selector.into(),
            remove_selectors: Vec::new(),
            created_at: 0,
        }
    }

    #[must_use]
    pub fn with_title_selector(mut self, selector: impl Into<String>) -> Self {
        self.chapter_title_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_link_selector(mut self, selector: impl Into<String>) -> Self {
        self.chapter_link_selector = Some(selector.into());
        self
    }

    /// Sets the remove list from a comma-separated string.
    #[must_use]
    pub fn with_remove_selectors(mut self, selectors: &str) -> Self {
        self.remove_selectors = split_selectors(selectors);
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether this rule applies to every host.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.domain_pattern.trim() == WILDCARD_DOMAIN
    }

    /// The remove list joined with commas, as persisted.
    #[must_use]
    pub fn remove_selectors_joined(&self) -> String {
        self.remove_selectors.join(",")
    }
}

/// Splits a comma-separated selector list, dropping blanks.
///
/// Only top-level commas separate entries. Commas inside `(...)`, `[...]`
/// or quotes belong to the selector, as in `div:not(.a, .b)`.
#[must_use]
pub fn split_selectors(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (index, ch) in raw.char_indices() {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '(' | '[') => depth += 1,
            (None, ')' | ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&raw[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(&raw[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Outcome of [`validate_rule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleValidation {
    pub valid: bool,
    /// Missing required fields, always in the order domain, chapter list, content.
    pub missing_fields: Vec<&'static str>,
}

/// Checks that the required selectors and domain are present after trimming.
#[must_use]
pub fn validate_rule(rule: &ParserRule) -> RuleValidation {
    let required = [
        (FIELD_DOMAIN, &rule.domain_pattern),
        (FIELD_CHAPTER_LIST_SELECTOR, &rule.chapter_list_selector),
        (FIELD_CONTENT_SELECTOR, &rule.content_selector),
    ];
    let missing_fields: Vec<&'static str> = required
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect();

    RuleValidation {
        valid: missing_fields.is_empty(),
        missing_fields,
    }
}

/// Parses a JSON array of rules (as produced by [`rules_to_json`]).
///
/// # Errors
///
/// Returns the `serde_json` error for malformed input.
pub fn rules_from_json(json: &str) -> Result<Vec<ParserRule>, serde_json::Error> {
    serde_json::from_str(json)
}

/// Serializes rules as pretty-printed JSON.
///
/// # Errors
///
/// Returns the `serde_json` error if serialization fails.
pub fn rules_to_json(rules: &[ParserRule]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(rules)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reports_missing_fields_in_order() {
        let rule = ParserRule::new("broken", "", "  ", "x");
        let validation = validate_rule(&rule);
        assert!(!validation.valid);
        assert_eq!(
            validation.missing_fields,
            vec!["domain", "chapterListSelector"]
        );
    }

    #[test]
    fn test_validate_accepts_complete_rule() {
        let rule = ParserRule::new("ok", "*", "#list a", "#content");
        let validation = validate_rule(&rule);
        assert!(validation.valid);
        assert!(validation.missing_fields.is_empty());
    }

    #[test]
    fn test_validate_all_missing() {
        let rule = ParserRule::new("empty", "", "", "");
        assert_eq!(
            validate_rule(&rule).missing_fields,
            vec!["domain", "chapterListSelector", "contentSelector"]
        );
    }

    #[test]
    fn test_split_selectors_trims_and_drops_blanks() {
        assert_eq!(
            split_selectors("script, style,,.ad "),
            vec!["script", "style", ".ad"]
        );
        assert!(split_selectors("").is_empty());
    }

    #[test]
    fn test_split_selectors_keeps_nested_commas() {
        let raw = r#"div:not(.a, .b), [data-x="a,b"], .ad"#;
        let parts = split_selectors(raw);
        assert_eq!(parts, vec!["div:not(.a, .b)", r#"[data-x="a,b"]"#, ".ad"]);

        let rule = ParserRule::new("n", "site.test", "#list a", "#content").with_remove_selectors(raw);
        assert_eq!(split_selectors(&rule.remove_selectors_joined()), parts);
    }

    #[test]
    fn test_wildcard_detection() {
        assert!(ParserRule::new("a", " * ", "a", "b").is_wildcard());
        assert!(!ParserRule::new("a", "biquge", "a", "b").is_wildcard());
    }

    #[test]
    fn test_json_accepts_minimal_rule() {
        let rules = rules_from_json(
            r##"[{"name":"site","domain_pattern":"example.com","chapter_list_selector":"#list a","content_selector":"#content"}]"##,
        )
        .unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].id, None);
        assert!(rules[0].remove_selectors.is_empty());
        assert_eq!(rules[0].chapter_title_selector, None);
    }

    #[test]
    fn test_json_export_omits_unsaved_id() {
        let json = rules_to_json(&[ParserRule::new("a", "*", "a", "b")]).unwrap();
        assert!(!json.contains("\"id\""));
    }
}
