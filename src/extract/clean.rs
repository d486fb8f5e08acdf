//! Chapter text cleanup.
//!
//! Only whole standalone lines are treated as site noise: repeated chapter
//! headings, bookmark prompts, prev/next/index navigation, bare URLs and a
//! few site names. Text inside a paragraph is never touched.

use std::sync::LazyLock;

use regex::Regex;

/// Upper bound on cleanup passes; real input settles after one or two.
const MAX_CLEAN_PASSES: usize = 8;

/// Lines dropped entirely when they make up a whole line on their own.
#[allow(clippy::expect_used)]
static AD_LINE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^第[一二三四五六七八九十百千万零\d]+章.*$",
        r"^.*Ctrl\s*\+\s*D.*收藏.*$",
        r"^上一章$",
        r"^下一章$",
        r"^目录$",
        r"^https?://\S+$",
        r"^www\.\S+$",
        r"^天蚕土豆$",
        r"^笔趣阁$",
        r"^新笔趣阁$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("ad line regex is valid")) // Static pattern, safe to panic
    .collect()
});

#[allow(clippy::expect_used)]
static BLANK_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("blank run regex is valid"));

#[allow(clippy::expect_used)]
static CLOSING_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([”’])\s*").expect("closing quote regex is valid"));

/// Whether a single line is standalone site noise.
#[must_use]
pub fn is_ad_line(line: &str) -> bool {
    let line = line.trim_matches([' ', '\t']);
    AD_LINE_PATTERNS.iter().any(|pattern| pattern.is_match(line))
}

/// Cleans extracted chapter text.
///
/// Removes noise lines, trims spaces and tabs at line ends, collapses runs
/// of blank lines, and splits an unbroken block after closing quotes.
/// The result is a fixed point: `clean_content(&clean_content(x)) == clean_content(x)`.
#[must_use]
pub fn clean_content(content: &str) -> String {
    let mut current = clean_pass(content);
    for _ in 1..MAX_CLEAN_PASSES {
        let next = clean_pass(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn clean_pass(content: &str) -> String {
    if content.is_empty() {
        return String::new();
    }

    let mut cleaned = content
        .split('\n')
        .map(|line| {
            if is_ad_line(line) {
                ""
            } else {
                line.trim_matches([' ', '\t'])
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    cleaned = BLANK_RUN.replace_all(&cleaned, "\n\n").into_owned();

    if !cleaned.contains('\n') {
        cleaned = CLOSING_QUOTE.replace_all(&cleaned, "$1\n").into_owned();
    }

    let trimmed = cleaned.trim_matches(|c: char| c <= ' ');
    BLANK_RUN.replace_all(trimmed, "\n\n").into_owned()
}
