//! Fetch-and-extract facade used by the orchestrator and the rule tester.

use std::sync::Arc;

use tracing::{debug, instrument};
use url::Url;

use super::html;
use super::model::{ChapterInfo, NovelMetadata};
use crate::network::{Dispatcher, NetworkError, Transport};
use crate::rules::ParserRule;

/// Fetches pages through the [`Dispatcher`] and applies [`ParserRule`]s to them.
#[derive(Clone)]
pub struct ExtractionService {
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ExtractionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionService")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl ExtractionService {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, transport: Arc<dyn Transport>) -> Self {
        Self {
            dispatcher,
            transport,
        }
    }

    /// The dispatcher every fetch goes through.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Fetches `url` inside a gate slot after a connectivity check.
    ///
    /// # Errors
    ///
    /// Returns the classified [`NetworkError`] from the probe, gate or transport.
    #[instrument(skip(self))]
    pub async fn fetch_html(&self, url: &str) -> Result<String, NetworkError> {
        let transport = Arc::clone(&self.transport);
        let html = self
            .dispatcher
            .execute_request(|| async move { transport.get(url).await })
            .await?;
        debug!(bytes = html.len(), "page fetched");
        Ok(html)
    }

    #[must_use]
    pub fn extract_metadata(&self, html: &str, rule: &ParserRule) -> NovelMetadata {
        html::extract_metadata(html, rule)
    }

    /// Extracts the chapter index; relative links are resolved against `page_url` when it parses.
    #[must_use]
    pub fn extract_chapter_list(
        &self,
        html: &str,
        rule: &ParserRule,
        page_url: &str,
    ) -> Vec<ChapterInfo> {
        match Url::parse(page_url) {
            Ok(base) => html::extract_chapter_list_from(html, rule, &base),
            Err(_) => html::extract_chapter_list(html, rule),
        }
    }

    #[must_use]
    pub fn extract_content(&self, html: &str, rule: &ParserRule) -> String {
        html::extract_content(html, rule)
    }
}
