//! Sequential chapter import with resume and cooperative cancellation.
//!
//! # Overview
//!
//! [`DownloadOrchestrator`] runs one session at a time. A session discovers
//! the chapter list from a novel's landing page, then fetches, cleans and
//! persists chapters in index order, reporting progress after each one.
//! Every fetch goes through the shared [`ExtractionService`], so it is
//! bounded by the request gate and paced per host.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use novel_importer::import::{DownloadOrchestrator, EngineConfig, NoProgress};
//! use novel_importer::rules::RuleStore;
//! use novel_importer::store::SqliteNovelStore;
//! use novel_importer::Database;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new_in_memory().await?;
//! let rules = RuleStore::new(db.clone());
//! let config = EngineConfig::default();
//! let orchestrator = DownloadOrchestrator::new(
//!     config.extraction_service()?,
//!     Arc::new(SqliteNovelStore::new(db)),
//! );
//! let url = "https://www.example.com/book/1/";
//! let rule = rules.match_url(url).await?;
//! let outcome = orchestrator.download_novel(url, &rule, &NoProgress).await?;
//! println!("{} chapters, {}", outcome.chapters_imported, outcome.state);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::error::ImportError;
use super::progress::{ProgressReporter, ProgressUpdate};
use super::state::{ImportState, StateCell};
use crate::extract::{ChapterInfo, ExtractionService};
use crate::network::constants::DEFAULT_CHAPTER_DELAY;
use crate::network::{
    FailureType, NetworkError, PolitenessDelay, RetryDecision, RetryPolicy, classify_error,
    parse_retry_after,
};
use crate::rules::{ParserRule, validate_rule};
use crate::store::{NewChapter, NewNovel, NovelStore, UNKNOWN_AUTHOR, UNKNOWN_TITLE};

/// How a session that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    pub novel_id: i64,
    /// `Completed` or `Cancelled`.
    pub state: ImportState,
    /// Chapters fetched and persisted by this session.
    pub chapters_imported: usize,
    /// Chapters persisted for the novel in total.
    pub chapters_persisted: usize,
    /// Length of the discovered chapter list.
    pub total_chapters: usize,
}

/// Checks that `url` is an absolute http(s) URL with a host.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    Url::parse(url).is_ok_and(|parsed| {
        matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
    })
}

/// In-memory state of the running session.
struct DownloadSession<'a> {
    novel_id: i64,
    rule: &'a ParserRule,
    chapters: Arc<Vec<ChapterInfo>>,
    next_pending_index: usize,
}

/// Marks the orchestrator idle again when a session ends, however it ends.
struct ActiveSession<'a> {
    orchestrator: &'a DownloadOrchestrator,
}

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        // A session dropped mid-flight never reached a terminal state itself.
        if self.orchestrator.state.get().is_active() {
            self.orchestrator.state.set(ImportState::Cancelled);
        }
        self.orchestrator.active.store(false, Ordering::SeqCst);
    }
}

/// Runs import and resume sessions, one at a time.
pub struct DownloadOrchestrator {
    extraction: ExtractionService,
    store: Arc<dyn NovelStore>,
    retry_policy: RetryPolicy,
    politeness: PolitenessDelay,
    state: StateCell,
    active: AtomicBool,
    cancel_requested: AtomicBool,
    /// Chapter lists discovered this process, by novel id.
    chapter_lists: DashMap<i64, Arc<Vec<ChapterInfo>>>,
}

impl std::fmt::Debug for DownloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOrchestrator")
            .field("state", &self.state.get())
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

impl DownloadOrchestrator {
    /// Creates an orchestrator with the default retry budget and pacing.
    #[must_use]
    pub fn new(extraction: ExtractionService, store: Arc<dyn NovelStore>) -> Self {
        Self {
            extraction,
            store,
            retry_policy: RetryPolicy::default(),
            politeness: PolitenessDelay::new(DEFAULT_CHAPTER_DELAY),
            state: StateCell::default(),
            active: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            chapter_lists: DashMap::new(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    #[must_use]
    pub fn with_politeness(mut self, politeness: PolitenessDelay) -> Self {
        self.politeness = politeness;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ImportState {
        self.state.get()
    }

    /// True while discovering or importing.
    #[must_use]
    pub fn is_downloading(&self) -> bool {
        self.state.get().is_active()
    }

    /// Asks the running session to stop before its next chapter.
    ///
    /// Returns `false` when no session is running.
    pub fn cancel_download(&self) -> bool {
        if !self.active.load(Ordering::SeqCst) {
            return false;
        }
        info!("cancellation requested");
        self.cancel_requested.store(true, Ordering::SeqCst);
        true
    }

    /// Imports a novel from its landing page.
    ///
    /// # Errors
    ///
    /// - [`ImportError::Validation`] for a bad URL or incomplete rule
    /// - [`ImportError::AlreadyRunning`] if a session is active
    /// - [`ImportError::Parse`] if the landing page lists no chapters
    /// - [`ImportError::Network`] if a page fails after its retries; chapters
    ///   persisted before the failure are kept
    /// - [`ImportError::Database`] if persisting fails
    #[instrument(skip(self, rule, progress), fields(rule = %rule.name))]
    pub async fn download_novel(
        &self,
        url: &str,
        rule: &ParserRule,
        progress: &dyn ProgressReporter,
    ) -> Result<ImportOutcome, ImportError> {
        validate_inputs(url, rule)?;
        let _session = self.begin_session()?;

        let result = self.import_new(url.trim(), rule, progress).await;
        self.finish(result)
    }

    /// Continues an import from the first chapter not yet persisted.
    ///
    /// Uses the chapter list cached for `novel_id` when present and
    /// rediscovers it from `url` otherwise. Persisted chapters are never
    /// fetched again.
    ///
    /// # Errors
    ///
    /// As [`Self::download_novel`], plus [`ImportError::NovelNotFound`].
    #[instrument(skip(self, rule, progress), fields(rule = %rule.name))]
    pub async fn resume_download(
        &self,
        novel_id: i64,
        url: &str,
        rule: &ParserRule,
        progress: &dyn ProgressReporter,
    ) -> Result<ImportOutcome, ImportError> {
        validate_inputs(url, rule)?;
        let _session = self.begin_session()?;

        let result = self.resume(novel_id, url.trim(), rule, progress).await;
        self.finish(result)
    }

    fn begin_session(&self) -> Result<ActiveSession<'_>, ImportError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(ImportError::AlreadyRunning);
        }
        self.cancel_requested.store(false, Ordering::SeqCst);
        self.state.set(ImportState::Idle);
        Ok(ActiveSession { orchestrator: self })
    }

    fn finish(
        &self,
        result: Result<ImportOutcome, ImportError>,
    ) -> Result<ImportOutcome, ImportError> {
        match &result {
            Ok(outcome) => {
                self.state.set(outcome.state);
                info!(
                    novel_id = outcome.novel_id,
                    state = %outcome.state,
                    imported = outcome.chapters_imported,
                    persisted = outcome.chapters_persisted,
                    total = outcome.total_chapters,
                    "import session ended"
                );
            }
            Err(error) => {
                self.state.set(ImportState::Failed);
                warn!(error = %error, "import session failed");
            }
        }
        result
    }

    async fn import_new(
        &self,
        url: &str,
        rule: &ParserRule,
        progress: &dyn ProgressReporter,
    ) -> Result<ImportOutcome, ImportError> {
        self.state.set(ImportState::Discovering);
        let html = self.fetch_with_retry(url).await?;

        let metadata = self.extraction.extract_metadata(&html, rule);
        let chapters = self.extraction.extract_chapter_list(&html, rule, url);
        if chapters.is_empty() {
            return Err(ImportError::parse("no chapters found on the landing page", url));
        }
        info!(
            title = metadata.title.as_deref().unwrap_or(UNKNOWN_TITLE),
            chapters = chapters.len(),
            "chapter list discovered"
        );

        let novel_id = self
            .store
            .insert_novel(&NewNovel {
                title: metadata.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
                author: metadata.author.unwrap_or_else(|| UNKNOWN_AUTHOR.to_string()),
                description: metadata.description,
                source_url: url.to_string(),
                total_chapters: to_i64(chapters.len()),
            })
            .await?;

        let chapters = Arc::new(chapters);
        self.chapter_lists.insert(novel_id, Arc::clone(&chapters));

        self.import_chapters(
            DownloadSession {
                novel_id,
                rule,
                chapters,
                next_pending_index: 0,
            },
            progress,
        )
        .await
    }

    async fn resume(
        &self,
        novel_id: i64,
        url: &str,
        rule: &ParserRule,
        progress: &dyn ProgressReporter,
    ) -> Result<ImportOutcome, ImportError> {
        if self.store.get_novel(novel_id).await?.is_none() {
            return Err(ImportError::NovelNotFound(novel_id));
        }
        let persisted = usize::try_from(self.store.get_chapter_count_for_novel(novel_id).await?)
            .unwrap_or_default();

        let cached = self
            .chapter_lists
            .get(&novel_id)
            .map(|entry| Arc::clone(entry.value()));
        let chapters = match cached {
            Some(chapters) => {
                debug!(novel_id, "reusing cached chapter list");
                chapters
            }
            None => {
                self.state.set(ImportState::Discovering);
                let html = self.fetch_with_retry(url).await?;
                let chapters = self.extraction.extract_chapter_list(&html, rule, url);
                if chapters.is_empty() {
                    return Err(ImportError::parse(
                        "no chapters found on the landing page",
                        url,
                    ));
                }
                let chapters = Arc::new(chapters);
                self.chapter_lists.insert(novel_id, Arc::clone(&chapters));
                chapters
            }
        };

        info!(
            novel_id,
            persisted,
            total = chapters.len(),
            "resuming import"
        );
        self.import_chapters(
            DownloadSession {
                novel_id,
                rule,
                chapters,
                next_pending_index: persisted,
            },
            progress,
        )
        .await
    }

    async fn import_chapters(
        &self,
        mut session: DownloadSession<'_>,
        progress: &dyn ProgressReporter,
    ) -> Result<ImportOutcome, ImportError> {
        self.state.set(ImportState::Importing);
        let total = session.chapters.len();
        let start = session.next_pending_index;

        while session.next_pending_index < total {
            if self.cancel_requested.load(Ordering::SeqCst) {
                info!(
                    novel_id = session.novel_id,
                    next_index = session.next_pending_index,
                    "import cancelled"
                );
                return Ok(session.outcome(ImportState::Cancelled, start));
            }

            let chapter = &session.chapters[session.next_pending_index];
            self.import_chapter(session.novel_id, session.rule, chapter)
                .await?;

            session.next_pending_index += 1;
            progress.report(ProgressUpdate {
                current: session.next_pending_index,
                total,
                title: chapter.title.clone(),
            });
        }

        // Only unfinished imports need their list for a later resume.
        self.chapter_lists.remove(&session.novel_id);
        Ok(session.outcome(ImportState::Completed, start))
    }

    #[instrument(skip(self, rule, chapter), fields(chapter_index = chapter.index, url = %chapter.link_url))]
    async fn import_chapter(
        &self,
        novel_id: i64,
        rule: &ParserRule,
        chapter: &ChapterInfo,
    ) -> Result<(), ImportError> {
        let html = self.fetch_with_retry(&chapter.link_url).await?;
        let content = self.extraction.extract_content(&html, rule);
        if content.is_empty() {
            warn!(title = %chapter.title, "chapter content is empty, storing anyway");
        }

        self.store
            .insert_chapters(&[NewChapter {
                novel_id,
                title: chapter.title.clone(),
                content,
                chapter_index: to_i64(chapter.index),
                source_url: Some(chapter.link_url.clone()),
            }])
            .await?;

        let total = to_i64(
            self.chapter_lists
                .get(&novel_id)
                .map_or(chapter.index + 1, |list| list.len()),
        );
        self.store
            .update_chapter_info(novel_id, total, &chapter.title)
            .await?;
        debug!("chapter persisted");
        Ok(())
    }

    /// Fetches `url`, retrying retryable failures within the policy's budget.
    ///
    /// A 429 with `Retry-After` pushes the host's next slot out by that
    /// delay instead of using the exponential backoff.
    async fn fetch_with_retry(&self, url: &str) -> Result<String, NetworkError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.politeness.wait(url).await;

            let error = match self.extraction.fetch_html(url).await {
                Ok(html) => return Ok(html),
                Err(error) => error,
            };

            let failure_type = classify_error(&error);
            let retry_after = if failure_type == FailureType::RateLimited {
                error.retry_after.as_deref().and_then(parse_retry_after)
            } else {
                None
            };

            match self.retry_policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        url,
                        attempt = next_attempt,
                        max_attempts = self.retry_policy.max_attempts(),
                        delay_ms = retry_after.unwrap_or(delay).as_millis(),
                        using_retry_after = retry_after.is_some(),
                        error = %error,
                        "retrying fetch"
                    );
                    match retry_after {
                        Some(server_delay) => self.politeness.defer(url, server_delay),
                        None => tokio::time::sleep(delay).await,
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url, %reason, "not retrying fetch");
                    return Err(error);
                }
            }
        }
    }
}

impl DownloadSession<'_> {
    fn outcome(&self, state: ImportState, start: usize) -> ImportOutcome {
        ImportOutcome {
            novel_id: self.novel_id,
            state,
            chapters_imported: self.next_pending_index.saturating_sub(start),
            chapters_persisted: self.next_pending_index.max(start),
            total_chapters: self.chapters.len(),
        }
    }
}

fn validate_inputs(url: &str, rule: &ParserRule) -> Result<(), ImportError> {
    if !is_valid_url(url) {
        return Err(ImportError::validation("url"));
    }
    let validation = validate_rule(rule);
    if let Some(field) = validation.missing_fields.first() {
        return Err(ImportError::validation(*field));
    }
    Ok(())
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
