//! Values produced by extraction.

use serde::Serialize;

/// One entry of a novel's chapter index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterInfo {
    pub title: String,
    pub link_url: String,
    /// 0-based position in the filtered chapter list.
    pub index: usize,
}

/// Novel-level metadata; every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NovelMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
}
