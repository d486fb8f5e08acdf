//! Errors from the novel record store.

use thiserror::Error;

/// Failures reading or writing novel and chapter records.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The novel does not exist.
    #[error("novel not found: {0}")]
    NovelNotFound(i64),

    /// A chapter with this index is already stored for the novel.
    #[error("chapter {chapter_index} of novel {novel_id} already exists")]
    DuplicateChapter {
        novel_id: i64,
        chapter_index: i64,
    },

    /// Underlying query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps a unique-constraint violation on `chapters` to [`StoreError::DuplicateChapter`].
    pub(crate) fn from_chapter_insert(error: sqlx::Error, novel_id: i64, chapter_index: i64) -> Self {
        let unique = error
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            Self::DuplicateChapter {
                novel_id,
                chapter_index,
            }
        } else {
            Self::Database(error)
        }
    }
}
