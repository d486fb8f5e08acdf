//! Novel and chapter records.
//!
//! The orchestrator only sees the [`NovelStore`] trait; [`SqliteNovelStore`]
//! is the `sqlx` implementation over the shared [`crate::Database`].

mod error;
mod sqlite;

use async_trait::async_trait;
use serde::Serialize;

pub use error::StoreError;
pub use sqlite::SqliteNovelStore;

/// Title stored when a landing page yields none.
pub const UNKNOWN_TITLE: &str = "Unknown title";

/// Author stored when a landing page yields none.
pub const UNKNOWN_AUTHOR: &str = "Unknown author";

/// Source tag for novels imported from the web.
pub const WEB_SOURCE: &str = "web";

/// A novel about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNovel {
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub source_url: String,
    /// Chapters discovered on the landing page.
    pub total_chapters: i64,
}

/// A stored novel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NovelRecord {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub source: String,
    pub source_url: Option<String>,
    pub total_chapters: i64,
    pub latest_chapter_title: Option<String>,
    pub created_at: i64,
}

/// A chapter about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChapter {
    pub novel_id: i64,
    pub title: String,
    pub content: String,
    pub chapter_index: i64,
    pub source_url: Option<String>,
}

impl NewChapter {
    /// Non-whitespace characters in the content.
    #[must_use]
    pub fn word_count(&self) -> i64 {
        let count = self.content.chars().filter(|c| !c.is_whitespace()).count();
        i64::try_from(count).unwrap_or(i64::MAX)
    }
}

/// Progress of a previously imported novel, used to offer a resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingNovel {
    pub novel_id: i64,
    pub title: String,
    /// Chapters already persisted.
    pub downloaded: i64,
    /// Chapters recorded as the novel's total.
    pub total: i64,
}

impl ExistingNovel {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.downloaded >= self.total
    }
}

/// Persistence used by the download orchestrator.
#[async_trait]
pub trait NovelStore: Send + Sync {
    /// Inserts a novel and returns its id.
    async fn insert_novel(&self, novel: &NewNovel) -> Result<i64, StoreError>;

    /// Inserts chapters atomically; a duplicate `(novel_id, chapter_index)` fails the batch.
    async fn insert_chapters(&self, chapters: &[NewChapter]) -> Result<(), StoreError>;

    /// Records the novel's chapter total and latest chapter title.
    async fn update_chapter_info(
        &self,
        novel_id: i64,
        total_chapters: i64,
        latest_title: &str,
    ) -> Result<(), StoreError>;

    /// Number of chapters persisted for the novel.
    async fn get_chapter_count_for_novel(&self, novel_id: i64) -> Result<i64, StoreError>;

    async fn get_novel(&self, novel_id: i64) -> Result<Option<NovelRecord>, StoreError>;

    /// Most recently created novel imported from `source_url`.
    async fn find_novel_by_source_url(
        &self,
        source_url: &str,
    ) -> Result<Option<NovelRecord>, StoreError>;
}

/// Looks up a prior import of `source_url` and how far it got.
///
/// # Errors
///
/// Propagates store failures.
pub async fn check_existing_novel(
    store: &dyn NovelStore,
    source_url: &str,
) -> Result<Option<ExistingNovel>, StoreError> {
    let Some(novel) = store.find_novel_by_source_url(source_url).await? else {
        return Ok(None);
    };
    let downloaded = store.get_chapter_count_for_novel(novel.id).await?;
    Ok(Some(ExistingNovel {
        novel_id: novel.id,
        title: novel.title,
        downloaded,
        total: novel.total_chapters,
    }))
}
