//! Rule-driven extraction from HTML documents.
//!
//! All functions here are pure: they take markup and a [`ParserRule`] and
//! never touch the network. Invalid selectors are skipped with a warning.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, warn};
use url::Url;

use super::clean::clean_content;
use super::model::{ChapterInfo, NovelMetadata};
use super::selectors::{
    AUTHOR_SELECTORS, CHROME_CLASS_MARKERS, CHROME_ID_MARKERS, DEFAULT_AD_SELECTORS,
    DESCRIPTION_SELECTORS, FALLBACK_CONTENT_SELECTORS, TITLE_SELECTORS,
};
use crate::rules::ParserRule;

/// Minimum length for a fallback content container to be accepted.
const MIN_FALLBACK_CONTENT_CHARS: usize = 100;

/// Minimum length for the largest-text-block fallback.
const MIN_TEXT_BLOCK_CHARS: usize = 200;

/// Elements after which a line break is inserted.
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "li", "section", "article",
];

#[allow(clippy::expect_used)]
static AUTHOR_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(作者|作　者|Author)[：:]\s*").expect("author prefix regex is valid")
});

#[allow(clippy::expect_used)]
static INLINE_AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"作者[：:]\s*(\S+)").expect("inline author regex is valid")
});

#[allow(clippy::expect_used)]
static TITLE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_|].*$").expect("title suffix regex is valid"));

fn parse_selector(raw: &str) -> Option<Selector> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match Selector::parse(raw) {
        Ok(selector) => Some(selector),
        Err(error) => {
            warn!(selector = raw, error = %error, "skipping invalid selector");
            None
        }
    }
}

fn first_match<'a>(root: ElementRef<'a>, raw: &str) -> Option<ElementRef<'a>> {
    let selector = parse_selector(raw)?;
    root.select(&selector).next()
}

/// Whitespace-normalized text of an element.
fn flat_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn trim_ascii_controls(text: &str) -> &str {
    text.trim_matches(|c: char| c <= ' ')
}

/// Text of an element with line breaks at `<br>` and block boundaries.
///
/// Lines are trimmed and blank lines dropped.
pub(crate) fn text_with_paragraphs(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);

    raw.replace('\u{a0}', " ")
        .lines()
        .map(trim_ascii_controls)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if name == "br" {
                    out.push('\n');
                } else if name != "script"
                    && name != "style"
                    && let Some(child_element) = ElementRef::wrap(child)
                {
                    collect_text(child_element, out);
                    if BLOCK_ELEMENTS.contains(&name) {
                        out.push('\n');
                    }
                }
            }
            _ => {}
        }
    }
}

/// Reads the first non-empty value among `selectors`; `meta` selectors read `content`.
fn first_value(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let element = first_match(document.root_element(), raw)?;
        let value = if raw.starts_with("meta") {
            element.value().attr("content").unwrap_or_default().to_string()
        } else {
            flat_text(element)
        };
        let value = value.trim().to_string();
        (!value.is_empty()).then_some(value)
    })
}

/// Extracts title, author and synopsis from a novel landing page.
///
/// Heuristic selectors are used for every field; missing fields are `None`.
#[must_use]
pub fn extract_metadata(html: &str, _rule: &ParserRule) -> NovelMetadata {
    if html.trim().is_empty() {
        return NovelMetadata::default();
    }
    let document = Html::parse_document(html);

    NovelMetadata {
        title: first_value(&document, TITLE_SELECTORS).or_else(|| page_title(&document)),
        author: extract_author(&document),
        description: first_value(&document, DESCRIPTION_SELECTORS),
    }
}

/// `<title>` with a trailing ` - Site name` style suffix removed.
fn page_title(document: &Html) -> Option<String> {
    let title = first_match(document.root_element(), "title")?;
    let text = flat_text(title);
    let stripped = TITLE_SUFFIX.replace(&text, "");
    let stripped = stripped.trim();
    (!stripped.is_empty()).then(|| stripped.to_string())
}

fn extract_author(document: &Html) -> Option<String> {
    if let Some(author) = first_value(document, AUTHOR_SELECTORS) {
        let author = AUTHOR_PREFIX.replace(&author, "").trim().to_string();
        if !author.is_empty() {
            return Some(author);
        }
    }

    // Fall back to an element whose own text carries an inline "作者：" label.
    let any = parse_selector("*")?;
    document.select(&any).find_map(|element| {
        let owns_label = element
            .children()
            .filter_map(|child| child.value().as_text())
            .any(|text| text.contains("作者"));
        if !owns_label {
            return None;
        }
        INLINE_AUTHOR
            .captures(&flat_text(element))
            .map(|caps| caps[1].to_string())
    })
}

/// Extracts the chapter index, keeping hrefs as written in the page.
#[must_use]
pub fn extract_chapter_list(html: &str, rule: &ParserRule) -> Vec<ChapterInfo> {
    chapter_list(html, rule, None)
}

/// Extracts the chapter index, resolving relative hrefs against `base_url`.
#[must_use]
pub fn extract_chapter_list_from(html: &str, rule: &ParserRule, base_url: &Url) -> Vec<ChapterInfo> {
    chapter_list(html, rule, Some(base_url))
}

fn chapter_list(html: &str, rule: &ParserRule, base_url: Option<&Url>) -> Vec<ChapterInfo> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let Some(list_selector) = parse_selector(&rule.chapter_list_selector) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let title_selector = rule.chapter_title_selector.as_deref().and_then(parse_selector);
    let link_selector = rule.chapter_link_selector.as_deref().and_then(parse_selector);
    let anchor = parse_selector("a");

    let mut chapters = Vec::new();
    let mut skipped = 0usize;
    for element in document.select(&list_selector) {
        let title = title_selector
            .as_ref()
            .and_then(|selector| element.select(selector).next())
            .map_or_else(|| flat_text(element), flat_text);

        let href = match &link_selector {
            Some(selector) => element
                .select(selector)
                .next()
                .and_then(|link| link.value().attr("href"))
                .or_else(|| element.value().attr("href")),
            None => element.value().attr("href").or_else(|| {
                anchor
                    .as_ref()
                    .and_then(|a| element.select(a).next())
                    .and_then(|link| link.value().attr("href"))
            }),
        };
        let link_url = href.map(str::trim).unwrap_or_default();

        if title.is_empty() || link_url.is_empty() || link_url.starts_with("javascript:") {
            skipped += 1;
            continue;
        }

        let link_url = match base_url {
            Some(base) => match base.join(link_url) {
                Ok(resolved) => resolved.to_string(),
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            },
            None => link_url.to_string(),
        };

        chapters.push(ChapterInfo {
            title,
            link_url,
            index: chapters.len(),
        });
    }

    debug!(count = chapters.len(), skipped, "chapter list extracted");
    chapters
}

/// Removes every element matching `raw` from the document.
fn remove_matching(document: &mut Html, raw: &str) {
    let Some(selector) = parse_selector(raw) else {
        return;
    };
    let ids: Vec<_> = document.select(&selector).map(|element| element.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Extracts and cleans the body of a chapter page.
///
/// The rule's remove list and the built-in ad list are stripped first. The
/// rule's content selector is tried, then the common content containers
/// (accepted above 100 characters), then the largest text block outside
/// navigation chrome (above 200 characters). Returns an empty string when
/// nothing qualifies.
#[must_use]
pub fn extract_content(html: &str, rule: &ParserRule) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let mut document = Html::parse_document(html);

    let removals = rule
        .remove_selectors
        .iter()
        .map(String::as_str)
        .chain(DEFAULT_AD_SELECTORS.iter().copied());
    for raw in removals {
        remove_matching(&mut document, raw);
    }

    let root = document.root_element();
    let mut content = first_match(root, &rule.content_selector)
        .map(text_with_paragraphs)
        .unwrap_or_default();

    if content.is_empty() {
        content = FALLBACK_CONTENT_SELECTORS
            .iter()
            .filter_map(|raw| first_match(root, raw))
            .map(text_with_paragraphs)
            .find(|text| text.chars().count() > MIN_FALLBACK_CONTENT_CHARS)
            .unwrap_or_default();
        if !content.is_empty() {
            debug!("content found by fallback selector");
        }
    }

    if content.is_empty() {
        content = largest_text_block(&document).unwrap_or_default();
    }

    if content.is_empty() {
        warn!(html_len = html.len(), "no chapter content found");
    }

    clean_content(&content)
}

fn is_chrome(element: ElementRef<'_>) -> bool {
    let class = element
        .value()
        .attr("class")
        .unwrap_or_default()
        .to_lowercase();
    let id = element.value().id().unwrap_or_default().to_lowercase();
    CHROME_CLASS_MARKERS.iter().any(|marker| class.contains(marker))
        || CHROME_ID_MARKERS.iter().any(|marker| id.contains(marker))
}

fn largest_text_block(document: &Html) -> Option<String> {
    let candidates = parse_selector("div, article, section, main")?;
    document
        .select(&candidates)
        .filter(|element| !is_chrome(*element))
        .map(|element| (flat_text(element).chars().count(), element))
        .filter(|(len, _)| *len > MIN_TEXT_BLOCK_CHARS)
        .fold(None, |best: Option<(usize, ElementRef<'_>)>, candidate| match best {
            Some(current) if current.0 >= candidate.0 => Some(current),
            _ => Some(candidate),
        })
        .map(|(_, element)| text_with_paragraphs(element))
}
