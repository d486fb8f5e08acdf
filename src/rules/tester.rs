//! Dry-run of a rule against a live page.

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::model::{ParserRule, validate_rule};
use crate::extract::ExtractionService;

/// Characters of chapter text kept in a test report.
const SAMPLE_CHARS: usize = 200;

/// Result of [`test_rule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleTestReport {
    Success {
        title: Option<String>,
        author: Option<String>,
        chapter_count: usize,
        /// First chapter text, cut to 200 characters plus `...` when longer.
        sample_content: String,
    },
    Failure {
        error_message: String,
    },
}

impl RuleTestReport {
    fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            error_message: message.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Runs `rule` against `test_url` and the first chapter it lists.
///
/// Every failure, including an invalid rule, is reported in the returned
/// value rather than as an error. A first chapter that cannot be fetched
/// still yields a success, with the error noted in `sample_content`.
#[instrument(skip(service, rule), fields(rule = %rule.name))]
pub async fn test_rule(
    service: &ExtractionService,
    rule: &ParserRule,
    test_url: &str,
) -> RuleTestReport {
    let validation = validate_rule(rule);
    if !validation.valid {
        return RuleTestReport::failure(format!(
            "Rule is missing required fields: {}",
            validation.missing_fields.join(", ")
        ));
    }

    let html = match service.fetch_html(test_url).await {
        Ok(html) => html,
        Err(error) => {
            warn!(error = %error, "test page fetch failed");
            return RuleTestReport::failure(error.message);
        }
    };

    let metadata = service.extract_metadata(&html, rule);
    let chapters = service.extract_chapter_list(&html, rule, test_url);

    let sample_content = match chapters.first() {
        Some(first) => match service.fetch_html(&first.link_url).await {
            Ok(chapter_html) => truncate_sample(&service.extract_content(&chapter_html, rule)),
            Err(error) => {
                warn!(error = %error, url = %first.link_url, "first chapter fetch failed");
                format!("[Failed to fetch first chapter: {}]", error.message)
            }
        },
        None => String::new(),
    };

    info!(chapter_count = chapters.len(), "rule test finished");
    RuleTestReport::Success {
        title: metadata.title,
        author: metadata.author,
        chapter_count: chapters.len(),
        sample_content,
    }
}

fn truncate_sample(content: &str) -> String {
    if content.chars().count() > SAMPLE_CHARS {
        let mut sample: String = content.chars().take(SAMPLE_CHARS).collect();
        sample.push_str("...");
        sample
    } else {
        content.to_string()
    }
}
