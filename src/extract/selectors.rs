//! Built-in selector lists used around the rule's own selectors.

/// Page chrome and ads removed from every chapter page after the rule's remove list.
///
/// Attribute prefixes are matched at word starts so layout classes such as
/// `read-content` or `head-nav` survive.
pub const DEFAULT_AD_SELECTORS: &[&str] = &[
    ".ad",
    ".ads",
    ".advertisement",
    ".advert",
    "#ad",
    "#ads",
    "#advertisement",
    "[class^='ad-']",
    "[class*=' ad-']",
    "[class^='ads-']",
    "[class*=' ads-']",
    "[id^='ad-']",
    "[id^='ads-']",
    ".banner",
    "#banner",
    ".popup",
    "#popup",
    ".sponsor",
    "#sponsor",
    "script",
    "style",
    "iframe",
    ".comment",
    "#comment",
    ".comments",
    "#comments",
];

/// Content containers tried, in order, when the rule's content selector finds nothing.
pub const FALLBACK_CONTENT_SELECTORS: &[&str] = &[
    "#content",
    "#chaptercontent",
    "#chapter-content",
    "#bookcontent",
    "#book_text",
    "#booktext",
    "#htmlContent",
    "#text-content",
    "#nr",
    "#nr1",
    "#BookText",
    "#TextContent",
    "#contentbox",
    "#chapter_content",
    "#novelcontent",
    ".content",
    ".chaptercontent",
    ".chapter-content",
    ".bookcontent",
    ".book_text",
    ".booktext",
    ".novelcontent",
    ".novel-content",
    ".readcontent",
    ".read-content",
    ".article-content",
    ".txt",
    ".chapter_content",
    ".text_content",
    ".contentbox",
    ".book-content",
    ".main-content",
    ".post-content",
    "article",
    ".article",
    "#article",
    "[itemprop='articleBody']",
    ".panel-body",
    ".card-body",
    ".entry-content",
    ".post-body",
];

/// Candidates for the novel title; `meta` entries read the `content` attribute.
pub const TITLE_SELECTORS: &[&str] = &[
    "h1",
    ".title",
    "#title",
    ".book-title",
    "#book-title",
    ".novel-title",
    "#novel-title",
    "meta[property='og:title']",
];

/// Candidates for the author.
pub const AUTHOR_SELECTORS: &[&str] = &[
    ".author",
    "#author",
    ".book-author",
    "#book-author",
    ".writer",
    "#writer",
    "meta[property='og:novel:author']",
    "meta[property='og:author']",
    "[itemprop='author']",
];

/// Candidates for the synopsis.
pub const DESCRIPTION_SELECTORS: &[&str] = &[
    ".description",
    "#description",
    ".intro",
    "#intro",
    ".summary",
    "#summary",
    ".book-intro",
    "#book-intro",
    "meta[property='og:description']",
    "meta[name='description']",
];

/// Class fragments that disqualify a block from the largest-text fallback.
pub const CHROME_CLASS_MARKERS: &[&str] =
    &["nav", "header", "footer", "sidebar", "menu", "comment"];

/// Id fragments that disqualify a block from the largest-text fallback.
pub const CHROME_ID_MARKERS: &[&str] = &["nav", "header", "footer", "sidebar"];
