//! `sqlx` implementation of [`NovelStore`].

use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use tracing::{debug, instrument};

use super::{NewChapter, NewNovel, NovelRecord, NovelStore, StoreError, WEB_SOURCE};
use crate::db::Database;

const SELECT_NOVEL: &str = "SELECT id, title, author, description, source, source_url, \
     total_chapters, latest_chapter_title, created_at FROM novels";

fn novel_from_row(row: &SqliteRow) -> Result<NovelRecord, sqlx::Error> {
    Ok(NovelRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        description: row.try_get("description")?,
        source: row.try_get("source")?,
        source_url: row.try_get("source_url")?,
        total_chapters: row.try_get("total_chapters")?,
        latest_chapter_title: row.try_get("latest_chapter_title")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Novel and chapter records in the shared SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteNovelStore {
    db: Database,
}

impl SqliteNovelStore {
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Titles of the persisted chapters in index order.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    pub async fn chapter_titles(&self, novel_id: i64) -> Result<Vec<String>, StoreError> {
        let titles = sqlx::query_scalar(
            "SELECT title FROM chapters WHERE novel_id = ? ORDER BY chapter_index",
        )
        .bind(novel_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(titles)
    }
}

#[async_trait]
impl NovelStore for SqliteNovelStore {
    #[instrument(skip(self, novel), fields(title = %novel.title))]
    async fn insert_novel(&self, novel: &NewNovel) -> Result<i64, StoreError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO novels (title, author, description, source, source_url, total_chapters, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&novel.title)
        .bind(&novel.author)
        .bind(&novel.description)
        .bind(WEB_SOURCE)
        .bind(&novel.source_url)
        .bind(novel.total_chapters)
        .bind(crate::clock::now_millis())
        .fetch_one(self.db.pool())
        .await?;

        debug!(novel_id = id, "novel inserted");
        Ok(id)
    }

    #[instrument(skip(self, chapters), fields(count = chapters.len()))]
    async fn insert_chapters(&self, chapters: &[NewChapter]) -> Result<(), StoreError> {
        let mut tx = self.db.pool().begin().await?;
        let now = crate::clock::now_millis();

        for chapter in chapters {
            sqlx::query(
                "INSERT INTO chapters (novel_id, title, content, chapter_index, word_count, source_url, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(chapter.novel_id)
            .bind(&chapter.title)
            .bind(&chapter.content)
            .bind(chapter.chapter_index)
            .bind(chapter.word_count())
            .bind(&chapter.source_url)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::from_chapter_insert(e, chapter.novel_id, chapter.chapter_index))?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn update_chapter_info(
        &self,
        novel_id: i64,
        total_chapters: i64,
        latest_title: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE novels SET total_chapters = ?, latest_chapter_title = ? WHERE id = ?",
        )
        .bind(total_chapters)
        .bind(latest_title)
        .bind(novel_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NovelNotFound(novel_id));
        }
        Ok(())
    }

    async fn get_chapter_count_for_novel(&self, novel_id: i64) -> Result<i64, StoreError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM chapters WHERE novel_id = ?")
            .bind(novel_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    async fn get_novel(&self, novel_id: i64) -> Result<Option<NovelRecord>, StoreError> {
        let row = sqlx::query(&format!("{SELECT_NOVEL} WHERE id = ?"))
            .bind(novel_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.as_ref().map(novel_from_row).transpose()?)
    }

    async fn find_novel_by_source_url(
        &self,
        source_url: &str,
    ) -> Result<Option<NovelRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "{SELECT_NOVEL} WHERE source_url = ? ORDER BY created_at DESC, id DESC LIMIT 1"
        ))
        .bind(source_url)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(row.as_ref().map(novel_from_row).transpose()?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::{UNKNOWN_AUTHOR, check_existing_novel};
    use super::*;

    async fn store() -> SqliteNovelStore {
        SqliteNovelStore::new(Database::new_in_memory().await.unwrap())
    }

    fn novel(url: &str) -> NewNovel {
        NewNovel {
            title: "Starfall".to_string(),
            author: UNKNOWN_AUTHOR.to_string(),
            description: Some("A tale.".to_string()),
            source_url: url.to_string(),
            total_chapters: 3,
        }
    }

    fn chapter(novel_id: i64, index: i64) -> NewChapter {
        NewChapter {
            novel_id,
            title: format!("Chapter {index}"),
            content: "some words here".to_string(),
            chapter_index: index,
            source_url: Some(format!("https://site.test/{index}")),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_novel() {
        let store = store().await;
        let id = store.insert_novel(&novel("https://site.test/book")).await.unwrap();

        let record = store.get_novel(id).await.unwrap().unwrap();
        assert_eq!(record.title, "Starfall");
        assert_eq!(record.source, WEB_SOURCE);
        assert_eq!(record.total_chapters, 3);
        assert_eq!(record.latest_chapter_title, None);
        assert!(store.get_novel(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_chapters_and_count() {
        let store = store().await;
        let id = store.insert_novel(&novel("u")).await.unwrap();

        store.insert_chapters(&[chapter(id, 0), chapter(id, 1)]).await.unwrap();
        assert_eq!(store.get_chapter_count_for_novel(id).await.unwrap(), 2);
        assert_eq!(
            store.chapter_titles(id).await.unwrap(),
            vec!["Chapter 0", "Chapter 1"]
        );
    }

    #[tokio::test]
    async fn test_duplicate_chapter_rolls_back_batch() {
        let store = store().await;
        let id = store.insert_novel(&novel("u")).await.unwrap();
        store.insert_chapters(&[chapter(id, 0)]).await.unwrap();

        let error = store
            .insert_chapters(&[chapter(id, 1), chapter(id, 0)])
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::DuplicateChapter {
                chapter_index: 0,
                ..
            }
        ));
        assert_eq!(store.get_chapter_count_for_novel(id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_chapter_info() {
        let store = store().await;
        let id = store.insert_novel(&novel("u")).await.unwrap();

        store.update_chapter_info(id, 5, "Chapter 4").await.unwrap();
        let record = store.get_novel(id).await.unwrap().unwrap();
        assert_eq!(record.total_chapters, 5);
        assert_eq!(record.latest_chapter_title.as_deref(), Some("Chapter 4"));

        assert!(matches!(
            store.update_chapter_info(999, 1, "x").await,
            Err(StoreError::NovelNotFound(999))
        ));
    }

    #[tokio::test]
    async fn test_check_existing_novel() {
        let store = store().await;
        assert!(
            check_existing_novel(&store, "https://site.test/book")
                .await
                .unwrap()
                .is_none()
        );

        let id = store.insert_novel(&novel("https://site.test/book")).await.unwrap();
        store.insert_chapters(&[chapter(id, 0)]).await.unwrap();

        let existing = check_existing_novel(&store, "https://site.test/book")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(existing.novel_id, id);
        assert_eq!(existing.downloaded, 1);
        assert_eq!(existing.total, 3);
        assert!(!existing.is_complete());
    }

    #[test]
    fn test_word_count_ignores_whitespace() {
        let chapter = NewChapter {
            content: "　一二 三\n四".to_string(),
            ..chapter(1, 0)
        };
        assert_eq!(chapter.word_count(), 4);
    }
}
