//! Wikitext rendering and database-text normalisation.
//!
//! Published bodies are produced as `normalise(render(raw))`: the wikitext
//! renderer strips markup down to readable prose and the normaliser then
//! tidies escapes, entities and whitespace left behind by the export.

use std::sync::LazyLock;

use regex::{Captures, Regex};

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern is valid")
}

static COMMENT: LazyLock<Regex> = LazyLock::new(|| compile(r"(?s)<!--.*?-->"));
static SELF_CLOSING_REF: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)<ref\b[^>]*/>"));
static REF_BLOCK: LazyLock<Regex> = LazyLock::new(|| compile(r"(?is)<ref\b[^>]*>.*?</ref\s*>"));
static EXTERNAL_LINK: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\[(?:https?|ftp)://[^\s\]]+(?:\s+([^\]]*))?\]"));
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| compile(r"'{2,}"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?m)^[ \t]*=+[ \t]*(.*?)[ \t]*=+[ \t]*$"));
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[ \t]*[*#:;]+[ \t]*"));
static HORIZONTAL_RULE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?m)^[ \t]*-{4,}[ \t]*$"));
static MAGIC_WORD: LazyLock<Regex> = LazyLock::new(|| compile(r"__[A-Z]+__"));
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| compile(r"</?[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>"));
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);"));
static LANGUAGE_PREFIX: LazyLock<Regex> = LazyLock::new(|| compile(r"^[a-z]{2,3}(?:-[a-z]+)?:"));

const DROPPED_NAMESPACES: [&str; 3] = ["category:", "file:", "image:"];

/// Converts raw page markup into the plain text stored in `pages.clean_text`.
///
/// Implementations must be pure: identical input yields identical output.
pub trait TextCleaner {
    /// Render wikitext markup to plain text.
    fn render_wikitext(&self, raw: &str) -> String;

    /// Tidy text that has already been rendered.
    fn normalise_database_text(&self, rendered: &str) -> String;

    /// Render then normalise, in that order.
    fn clean(&self, raw: &str) -> String {
        self.normalise_database_text(&self.render_wikitext(raw))
    }
}

impl<T: TextCleaner + ?Sized> TextCleaner for &T {
    fn render_wikitext(&self, raw: &str) -> String {
        (**self).render_wikitext(raw)
    }

    fn normalise_database_text(&self, rendered: &str) -> String {
        (**self).normalise_database_text(rendered)
    }
}

/// Default [`TextCleaner`] for MediaWiki markup.
///
/// Comments, references, templates, tables, category and file links are
/// removed. Internal and external links collapse to their labels, and
/// emphasis quotes, heading and list markers, magic words and HTML tags are
/// stripped.
///
/// # Examples
/// ```
/// use pagesync_core::{TextCleaner, WikitextCleaner};
///
/// let cleaner = WikitextCleaner::new();
/// let text = cleaner.clean("== Intro ==\n'''Rust''' is a [[programming language|language]].{{citation}}");
/// assert_eq!(text, "Intro\nRust is a language.");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct WikitextCleaner;

impl WikitextCleaner {
    /// Create a cleaner with the default rules.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TextCleaner for WikitextCleaner {
    fn render_wikitext(&self, raw: &str) -> String {
        let text = COMMENT.replace_all(raw, "");
        let text = SELF_CLOSING_REF.replace_all(&text, "");
        let text = REF_BLOCK.replace_all(&text, "");
        let text = strip_balanced(&text, "{{", "}}");
        let text = strip_balanced(&text, "{|", "|}");
        let text = resolve_internal_links(&text);
        let text = EXTERNAL_LINK.replace_all(&text, "$1");
        let text = EMPHASIS.replace_all(&text, "");
        let text = HEADING.replace_all(&text, "$1");
        let text = LIST_MARKER.replace_all(&text, "");
        let text = HORIZONTAL_RULE.replace_all(&text, "");
        let text = MAGIC_WORD.replace_all(&text, "");
        HTML_TAG.replace_all(&text, "").into_owned()
    }

    fn normalise_database_text(&self, rendered: &str) -> String {
        let unescaped = unescape_backslashes(rendered);
        let decoded = ENTITY.replace_all(&unescaped, decode_entity);
        let unified = decoded.replace("\r\n", "\n").replace('\r', "\n");

        let mut output = String::with_capacity(unified.len());
        let mut blank_run = 0usize;
        for line in unified.lines() {
            let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
            if collapsed.is_empty() {
                blank_run += 1;
                if blank_run > 1 {
                    continue;
                }
            } else {
                blank_run = 0;
            }
            output.push_str(&collapsed);
            output.push('\n');
        }
        output.trim().to_owned()
    }
}

/// Remove every `open … close` span, honouring nesting. An unterminated span
/// swallows the rest of the input.
fn strip_balanced(text: &str, open: &str, close: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut rest = text;
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix(open) {
            depth += 1;
            rest = after;
            continue;
        }
        if depth > 0
            && let Some(after) = rest.strip_prefix(close)
        {
            depth -= 1;
            rest = after;
            continue;
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next()
            && depth == 0
        {
            output.push(ch);
        }
        rest = chars.as_str();
    }
    output
}

fn resolve_internal_links(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("[[") {
        let (before, from_open) = rest.split_at(start);
        output.push_str(before);
        let inner_and_rest = from_open.strip_prefix("[[").unwrap_or(from_open);
        let Some(end) = find_link_end(inner_and_rest) else {
            output.push_str(from_open);
            return output;
        };
        let (inner, closing) = inner_and_rest.split_at(end);
        output.push_str(&link_label(inner));
        rest = closing.strip_prefix("]]").unwrap_or(closing);
    }
    output.push_str(rest);
    output
}

/// Byte offset of the `]]` closing the link whose body starts at `text`.
fn find_link_end(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut index = 0usize;
    while let (Some(&current), Some(&next)) = (bytes.get(index), bytes.get(index + 1)) {
        match (current, next) {
            (b'[', b'[') => {
                depth += 1;
                index += 2;
            }
            (b']', b']') if depth == 0 => return Some(index),
            (b']', b']') => {
                depth -= 1;
                index += 2;
            }
            _ => index += 1,
        }
    }
    None
}

fn link_label(inner: &str) -> String {
    let (target, label) = match inner.split_once('|') {
        Some((target, label)) => (target, Some(label)),
        None => (inner, None),
    };
    if let Some(explicit) = target.strip_prefix(':') {
        return label.map_or_else(|| explicit.trim().to_owned(), resolve_internal_links);
    }
    let lowered = target.trim().to_lowercase();
    let dropped = DROPPED_NAMESPACES
        .iter()
        .any(|namespace| lowered.starts_with(namespace));
    if dropped || LANGUAGE_PREFIX.is_match(target.trim()) {
        return String::new();
    }
    match label {
        Some(label) if !label.trim().is_empty() => resolve_internal_links(label),
        _ => target.trim().to_owned(),
    }
}

fn unescape_backslashes(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            output.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => output.push('\n'),
            Some('r') => output.push('\r'),
            Some('t') => output.push('\t'),
            Some(escaped @ ('\\' | '\'' | '"')) => output.push(escaped),
            Some(other) => {
                output.push('\\');
                output.push(other);
            }
            None => output.push('\\'),
        }
    }
    output
}

fn decode_entity(captures: &Captures<'_>) -> String {
    let whole = captures.get(0).map_or("", |m| m.as_str());
    let name = captures.get(1).map_or("", |m| m.as_str());
    let decoded = match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        _ => numeric_entity(name),
    };
    decoded.map_or_else(|| whole.to_owned(), String::from)
}

fn numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
