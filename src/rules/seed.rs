//! Built-in rules seeded into an empty rule store.
//!
//! Six rules ship by default: the "Smart generic" wildcard (always the
//! earliest, so it is the wildcard fallback), two narrower generic
//! wildcards, and three site families.

use tracing::{info, instrument};

use super::error::RuleError;
use super::model::ParserRule;
use super::store::RuleStore;

/// Name of the broad wildcard rule that must always exist.
pub const SMART_GENERIC_RULE_NAME: &str = "Smart generic";

/// How far before "now" a late-added smart generic rule is stamped, so it stays the earliest.
const SMART_GENERIC_BACKDATE_MS: i64 = 1_000_000;

/// What [`seed_default_rules`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The store was empty; this many rules were inserted.
    Seeded(usize),
    /// Rules existed but the smart generic rule was missing and was added.
    AddedSmartGeneric,
    /// Nothing to do.
    AlreadyPresent,
}

/// The broad wildcard rule covering the common chapter-list and content layouts.
#[must_use]
pub fn smart_generic_rule(created_at: i64) -> ParserRule {
    ParserRule::new(
        SMART_GENERIC_RULE_NAME,
        "*",
        "#list dd a, .listmain dd a, #chapterlist a, .chapter-list a, .mulu a, .catalog a, \
         .volume a, ul.list a, .chapters a, #catalog a, .booklist a, .ml_list a, .zjlist a, \
         .dirlist a, #dir a, .chapterlist a",
        "#content, #chaptercontent, #booktxt, #booktext, #htmlContent, #nr, #nr1, .content, \
         .chapter-content, .booktxt, .booktext, .read-content, .novelcontent, .article-content, \
         .txt, .yd_text2, .txtnav, .contentbox",
    )
    .with_remove_selectors(
        "script,style,.ad,.ads,.advertisement,#ad,#ads,.banner,.popup,.comment,.comments,\
         iframe,.copy,.bottem,.bottem2,.txtinfo,.review-wrap",
    )
    .with_created_at(created_at)
}

/// All default rules, stamped `now`, `now + 1`, ... in seeding order.
#[must_use]
pub fn default_rules(now: i64) -> Vec<ParserRule> {
    vec![
        smart_generic_rule(now),
        ParserRule::new(
            "Generic A",
            "*",
            "#list dd a, .listmain dd a, .chapter-list a, .mulu a, #chapterlist a",
            "#content, .content, #chaptercontent, .chapter-content, #booktxt, .booktxt",
        )
        .with_remove_selectors("script,style,.ad,.ads,.banner,.popup")
        .with_created_at(now + 1),
        ParserRule::new(
            "Generic B",
            "*",
            ".chapter a, .chapters a, .catalog a, ul.list a, .volume a, .zjlist a",
            "#content, .content, .article, .text, .read-content, #chaptercontent, .novelcontent",
        )
        .with_remove_selectors("script,style,.ad,.ads,.copy,.banner")
        .with_created_at(now + 2),
        ParserRule::new(
            "Biquge family",
            "biquge",
            "#list dd a, .listmain dd a, #chapterlist a",
            "#content, #chaptercontent, .content",
        )
        .with_remove_selectors("script,style,.bottem,.bottem2,.ad")
        .with_created_at(now + 3),
        ParserRule::new(
            "Qidian family",
            "qidian",
            ".volume-wrap .cf li a, .chapter-list a, .catalog a",
            ".read-content, .chapter-content, .content, #content",
        )
        .with_remove_selectors("script,style,.review-wrap,.chapter-review,.ad")
        .with_created_at(now + 4),
        ParserRule::new(
            "69shu family",
            "69shu",
            ".mu_contain li a, .mulu a, #catalog a",
            ".yd_text2, .txtnav, #content, .content",
        )
        .with_remove_selectors("script,style,.txtinfo,.ad")
        .with_created_at(now + 5),
    ]
}

/// Seeds an empty store, or adds the smart generic rule to a store that lacks it.
///
/// Safe to run on every start.
///
/// # Errors
///
/// Returns [`RuleError::Database`] if a query fails.
#[instrument(skip(store))]
pub async fn seed_default_rules(store: &RuleStore) -> Result<SeedOutcome, RuleError> {
    let now = crate::clock::now_millis();

    if store.count().await? == 0 {
        let rules = default_rules(now);
        for rule in &rules {
            store.insert(rule).await?;
        }
        info!(count = rules.len(), "seeded default parser rules");
        return Ok(SeedOutcome::Seeded(rules.len()));
    }

    if store.find_by_name(SMART_GENERIC_RULE_NAME).await?.is_some() {
        return Ok(SeedOutcome::AlreadyPresent);
    }

    store
        .insert(&smart_generic_rule(now - SMART_GENERIC_BACKDATE_MS))
        .await?;
    info!("added missing smart generic rule");
    Ok(SeedOutcome::AddedSmartGeneric)
}
