use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Node};

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));
static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("blank lines regex"));
static INLINE_SPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+").expect("inline space regex"));

pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

pub(crate) fn strip_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

pub(crate) fn is_hangul_syllable(c: char) -> bool {
    ('가'..='힣').contains(&c)
}

pub(crate) fn has_letter(text: &str) -> bool {
    text.chars()
        .any(|c| is_hangul_syllable(c) || c.is_ascii_alphabetic())
}

/// Rejoins Korean words a PDF extractor split into single syllables:
/// a run of 2 to 5 one-syllable tokens becomes one token.
pub fn collapse_hangul_gaps(text: &str) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        let run = tokens[i..]
            .iter()
            .take_while(|t| {
                let mut chars = t.chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if is_hangul_syllable(c))
            })
            .count();
        if (2..=5).contains(&run) {
            out.push(tokens[i..i + run].concat());
            i += run;
        } else if run > 5 {
            out.extend(tokens[i..i + run].iter().map(|t| t.to_string()));
            i += run;
        } else {
            out.push(tokens[i].to_string());
            i += 1;
        }
    }
    out.join(" ")
}

/// Element text with block structure kept: `<br>` and block-level elements
/// produce line breaks, inline whitespace collapses.
pub(crate) fn structured_text(element: ElementRef<'_>) -> String {
    let mut parts: Vec<String> = Vec::new();
    walk(element, &mut parts);
    let joined = parts.concat();
    let joined = BLANK_LINES_RE.replace_all(&joined, "\n");
    INLINE_SPACE_RE.replace_all(&joined, " ").trim().to_string()
}

fn push_break(parts: &mut Vec<String>) {
    if parts.last().is_some_and(|p| p != "\n") {
        parts.push("\n".to_string());
    }
}

fn walk(element: ElementRef<'_>, parts: &mut Vec<String>) {
    let name = element.value().name();
    match name {
        "br" => parts.push("\n".to_string()),
        "p" | "div" | "li" | "tr" => push_break(parts),
        _ => {}
    }
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    parts.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    walk(child, parts);
                }
            }
            _ => {}
        }
    }
    if matches!(name, "p" | "div" | "li" | "tr" | "td" | "th") {
        push_break(parts);
    }
}
