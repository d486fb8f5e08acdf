//! Turning fetched pages into novel metadata, chapter lists and chapter text.
//!
//! The pure functions in this module take markup and a rule; the
//! [`ExtractionService`] adds fetching through the shared dispatcher.

mod clean;
mod html;
mod model;
pub mod selectors;
mod service;

pub use clean::{clean_content, is_ad_line};
pub use html::{extract_chapter_list, extract_chapter_list_from, extract_content, extract_metadata};
pub use model::{ChapterInfo, NovelMetadata};
pub use service::ExtractionService;
