//! Text extraction: raw HTML to clean, comparable plain text.
//!
//! Extraction never fails. Each strategy falls through to a coarser one:
//! a main-content region, then `<body>`, then the whole document, and finally
//! a regex tag strip for input the tree walk could not make sense of.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Extracted text shorter than this is treated as unreadable.
pub const MIN_EXTRACTED_CHARS: usize = 50;

/// A main-content region must yield at least this much text to be preferred
/// over the full body.
const MAIN_REGION_MIN_CHARS: usize = 200;

const MAIN_REGION_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    "#content",
    "#main-content",
    "#main",
];

/// Elements whose text never counts as page content.
const EXCLUDED_TAGS: &[&str] = &[
    "script", "style", "noscript", "iframe", "frame", "frameset", "svg", "canvas", "template",
    "head", "nav", "header", "footer", "aside", "menu", "button", "select",
];

const EXCLUDED_ROLES: &[&str] = &["navigation", "banner", "contentinfo", "menu", "menubar"];

const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "dd", "details", "div", "dl", "dt", "figcaption",
    "figure", "form", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li", "main", "ol", "p", "pre",
    "section", "summary", "table", "tr", "ul",
];

static MAIN_REGIONS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    MAIN_REGION_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid main-region selector"))
        .collect()
});

static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid body selector"));

/// Class or id tokens that mark navigation chrome, e.g. `site-nav`,
/// `main_menu`, `footer`, `left-sidebar`.
static CHROME_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[-_])(nav|navbar|navigation|menu|sidebar|footer|header|breadcrumbs?)([-_]|$)")
        .expect("valid chrome token regex")
});

/// State modifiers on layout wrappers, e.g. `has-sidebar`, `nav-open`. They
/// describe the element around the chrome, not the chrome itself.
static STATE_MODIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(has|with|no|is|show|hide)[-_]|[-_](open|opened|closed|active|collapsed|expanded|visible|hidden|toggled?)$",
    )
    .expect("valid state modifier regex")
});

static HORIZONTAL_WS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\x0B\x0C\u{00A0}\u{2000}-\u{200A}\u{202F}\u{205F}\u{3000}]+").expect("valid whitespace regex"));

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

/// Tags whose whole block is dropped by the regex fallback.
const FALLBACK_DROPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "svg", "iframe", "head", "nav", "header", "footer",
    "aside",
];

static NON_CONTENT_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    FALLBACK_DROPPED_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}\b.*?</{tag}\s*>")).expect("valid block regex"))
        .collect()
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid tag regex"));

/// Extracts readable text from `html`.
///
/// Empty input yields an empty string; malformed markup is tolerated.
#[must_use]
pub fn extract_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let document = Html::parse_document(html);

    for selector in MAIN_REGIONS.iter() {
        let Some(region) = document.select(selector).find(|el| !is_excluded(*el)) else {
            continue;
        };
        let text = element_text(region);
        if text.chars().count() >= MAIN_REGION_MIN_CHARS {
            return text;
        }
    }

    if let Some(body) = document.select(&BODY).next() {
        let text = element_text(body);
        if !text.is_empty() {
            return text;
        }
    }

    let text = element_text(document.root_element());
    if !text.is_empty() {
        return text;
    }

    strip_tags(html)
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    collect_text(element, &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_excluded(child_el) {
                    continue;
                }
                let name = child_el.value().name();
                if name == "br" {
                    out.push('\n');
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                let cell = name == "td" || name == "th";
                if block {
                    out.push('\n');
                } else if cell {
                    out.push(' ');
                }
                collect_text(child_el, out);
                if block {
                    out.push('\n');
                } else if cell {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

fn is_excluded(element: ElementRef<'_>) -> bool {
    let el = element.value();
    if EXCLUDED_TAGS.contains(&el.name()) {
        return true;
    }
    if el.attr("hidden").is_some() || el.attr("aria-hidden") == Some("true") {
        return true;
    }
    if el
        .attr("role")
        .is_some_and(|role| EXCLUDED_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()))
    {
        return true;
    }
    el.id().is_some_and(is_chrome_token) || el.classes().any(is_chrome_token)
}

fn is_chrome_token(token: &str) -> bool {
    CHROME_TOKEN.is_match(token) && !STATE_MODIFIER.is_match(token)
}

/// Last resort for documents the tree walk yields nothing from.
fn strip_tags(html: &str) -> String {
    let mut without_blocks = html.to_owned();
    for block in NON_CONTENT_BLOCKS.iter() {
        without_blocks = block.replace_all(&without_blocks, " ").into_owned();
    }
    let text = TAG.replace_all(&without_blocks, " ");
    normalize_whitespace(&text)
}

/// Collapses horizontal whitespace runs to one space, trims every line,
/// limits blank runs to a single empty line, and trims the result.
pub(crate) fn normalize_whitespace(raw: &str) -> String {
    let collapsed = HORIZONTAL_WS.replace_all(raw, " ");
    let trimmed_lines = collapsed
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    EXCESS_NEWLINES
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_owned()
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
