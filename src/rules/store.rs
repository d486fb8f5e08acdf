//! Persistence for [`ParserRule`]s in the `parser_rules` table.

use std::sync::Arc;

use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::{debug, info, instrument};

use super::error::RuleError;
use super::matcher::{RuleMatcher, SpecificityMatcher};
use super::model::{ParserRule, split_selectors, validate_rule};
use crate::db::Database;
use crate::network::extract_host;

const SELECT_COLUMNS: &str = "SELECT id, name, domain, chapter_list_selector, chapter_title_selector, \
     chapter_link_selector, content_selector, remove_selectors, created_at FROM parser_rules";

/// Rule repository with a pluggable matching policy.
#[derive(Clone)]
pub struct RuleStore {
    db: Database,
    matcher: Arc<dyn RuleMatcher>,
}

impl std::fmt::Debug for RuleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleStore").finish_non_exhaustive()
    }
}

fn rule_from_row(row: &SqliteRow) -> Result<ParserRule, sqlx::Error> {
    let remove: String = row.try_get("remove_selectors")?;
    Ok(ParserRule {
        id: Some(row.try_get("id")?),
        name: row.try_get("name")?,
        domain_pattern: row.try_get("domain")?,
        chapter_list_selector: row.try_get("chapter_list_selector")?,
        chapter_title_selector: non_blank(row.try_get("chapter_title_selector")?),
        chapter_link_selector: non_blank(row.try_get("chapter_link_selector")?),
        content_selector: row.try_get("content_selector")?,
        remove_selectors: split_selectors(&remove),
        created_at: row.try_get("created_at")?,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn ensure_valid(rule: &ParserRule) -> Result<(), RuleError> {
    let validation = validate_rule(rule);
    if validation.valid {
        Ok(())
    } else {
        Err(RuleError::Invalid {
            missing_fields: validation.missing_fields,
        })
    }
}

impl RuleStore {
    /// Creates a store using [`SpecificityMatcher`].
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self::with_matcher(db, Arc::new(SpecificityMatcher))
    }

    /// Creates a store with a custom matching policy.
    #[must_use]
    pub fn with_matcher(db: Database, matcher: Arc<dyn RuleMatcher>) -> Self {
        Self { db, matcher }
    }

    /// Validates and inserts `rule`, returning its new id.
    ///
    /// A `created_at` of 0 is replaced by the current time.
    ///
    /// # Errors
    ///
    /// [`RuleError::Invalid`] if required fields are blank, [`RuleError::Database`] otherwise.
    #[instrument(skip(self, rule), fields(name = %rule.name, domain = %rule.domain_pattern))]
    pub async fn insert(&self, rule: &ParserRule) -> Result<i64, RuleError> {
        ensure_valid(rule)?;
        let created_at = if rule.created_at == 0 {
            crate::clock::now_millis()
        } else {
            rule.created_at
        };

        let id: i64 = sqlx::query_scalar(
            r"INSERT INTO parser_rules (
                name, domain, chapter_list_selector, chapter_title_selector,
                chapter_link_selector, content_selector, remove_selectors, created_at
              )
              VALUES (?, ?, ?, ?, ?, ?, ?, ?)
              RETURNING id",
        )
        .bind(&rule.name)
        .bind(rule.domain_pattern.trim())
        .bind(&rule.chapter_list_selector)
        .bind(rule.chapter_title_selector.as_deref())
        .bind(rule.chapter_link_selector.as_deref())
        .bind(&rule.content_selector)
        .bind(rule.remove_selectors_joined())
        .bind(created_at)
        .fetch_one(self.db.pool())
        .await?;

        info!(id, "rule inserted");
        Ok(id)
    }

    /// Validates and overwrites a saved rule.
    ///
    /// # Errors
    ///
    /// [`RuleError::Unsaved`] without an id, [`RuleError::NotFound`] if no row changed.
    #[instrument(skip(self, rule), fields(id = ?rule.id))]
    pub async fn update(&self, rule: &ParserRule) -> Result<(), RuleError> {
        let Some(id) = rule.id else {
            return Err(RuleError::Unsaved(rule.name.clone()));
        };
        ensure_valid(rule)?;

        let result = sqlx::query(
            r"UPDATE parser_rules
              SET name = ?, domain = ?, chapter_list_selector = ?, chapter_title_selector = ?,
                  chapter_link_selector = ?, content_selector = ?, remove_selectors = ?
              WHERE id = ?",
        )
        .bind(&rule.name)
        .bind(rule.domain_pattern.trim())
        .bind(&rule.chapter_list_selector)
        .bind(rule.chapter_title_selector.as_deref())
        .bind(rule.chapter_link_selector.as_deref())
        .bind(&rule.content_selector)
        .bind(rule.remove_selectors_joined())
        .bind(id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RuleError::NotFound(id));
        }
        Ok(())
    }

    /// Deletes a rule.
    ///
    /// # Errors
    ///
    /// [`RuleError::NotFound`] if no rule has this id.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), RuleError> {
        let result = sqlx::query("DELETE FROM parser_rules WHERE id = ?")
            .bind(id)
            .execute(self.db.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(RuleError::NotFound(id));
        }
        Ok(())
    }

    /// Loads one rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Database`] if the query fails.
    pub async fn get(&self, id: i64) -> Result<Option<ParserRule>, RuleError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(rule_from_row).transpose()?)
    }

    /// All rules, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Database`] if the query fails.
    pub async fn list(&self) -> Result<Vec<ParserRule>, RuleError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY created_at ASC, id ASC"))
            .fetch_all(self.db.pool())
            .await?;
        rows.iter()
            .map(rule_from_row)
            .collect::<Result<_, _>>()
            .map_err(RuleError::from)
    }

    /// Rules whose stored domain pattern equals `domain`.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Database`] if the query fails.
    pub async fn find_by_domain(&self, domain: &str) -> Result<Vec<ParserRule>, RuleError> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE domain = ? ORDER BY created_at ASC, id ASC"
        ))
        .bind(domain.trim())
        .fetch_all(self.db.pool())
        .await?;
        rows.iter()
            .map(rule_from_row)
            .collect::<Result<_, _>>()
            .map_err(RuleError::from)
    }

    /// The oldest rule with this exact name.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Database`] if the query fails.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<ParserRule>, RuleError> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE name = ? ORDER BY created_at ASC, id ASC LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(rule_from_row).transpose()?)
    }

    /// Number of stored rules.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::Database`] if the query fails.
    pub async fn count(&self) -> Result<i64, RuleError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parser_rules")
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Selects the rule that applies to `url`.
    ///
    /// # Errors
    ///
    /// [`RuleError::NoMatch`] when the URL has no host or no rule applies.
    #[instrument(skip(self))]
    pub async fn match_url(&self, url: &str) -> Result<ParserRule, RuleError> {
        let no_match = || RuleError::NoMatch {
            url: url.to_string(),
        };
        let host = extract_host(url).ok_or_else(no_match)?;
        let rules = self.list().await?;

        let chosen = self.matcher.select(&host, &rules).ok_or_else(no_match)?;
        debug!(host = %host, rule = %chosen.name, "rule matched");
        Ok(chosen.clone())
    }
}
