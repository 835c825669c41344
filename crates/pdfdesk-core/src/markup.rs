//! HTML markup to plain paragraphs
//!
//! A tag-stripping reduction, not a renderer: block elements start a new
//! paragraph, `<br>` breaks a line, everything else contributes its text.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref HIDDEN_ELEMENT: Regex =
        Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<head\b[^>]*>.*?</head\s*>|<!--.*?-->").unwrap();

    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    static ref LINE_BREAK: Regex = Regex::new(r"(?i)<br\s*/?>").unwrap();

    /// Elements that start a new paragraph when opened or closed.
    static ref BLOCK_TAG: Regex = Regex::new(
        r"(?i)</?(?:p|div|h[1-6]|li|ul|ol|tr|table|section|article|header|footer|blockquote|pre|hr)\b[^>]*>"
    )
    .unwrap();

    static ref ANY_TAG: Regex = Regex::new(r"<[^>]*>").unwrap();

    static ref ENTITY: Regex = Regex::new(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[a-zA-Z]+);").unwrap();

    static ref PARAGRAPH_BREAK: Regex = Regex::new(r"\n[ \t]*\n").unwrap();
}

/// Reduce HTML `markup` to paragraphs of text. Lines inside a paragraph are
/// joined with `\n`; empty paragraphs are dropped.
pub fn markup_paragraphs(markup: &str) -> Vec<String> {
    let visible = HIDDEN_ELEMENT.replace_all(markup, " ");
    let flattened = WHITESPACE.replace_all(&visible, " ");
    let broken = LINE_BREAK.replace_all(&flattened, "\n");
    let blocked = BLOCK_TAG.replace_all(&broken, "\n\n");
    let text = ANY_TAG.replace_all(&blocked, "");

    PARAGRAPH_BREAK
        .split(&text)
        .filter_map(|block| {
            let lines: Vec<String> = block
                .split('\n')
                .map(|line| decode_entities(line).split_whitespace().collect::<Vec<_>>().join(" "))
                .filter(|line| !line.is_empty())
                .collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        })
        .collect()
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                "copy" => Some('\u{a9}'),
                "mdash" => Some('\u{2014}'),
                "ndash" => Some('\u{2013}'),
                _ if name.starts_with("#x") || name.starts_with("#X") => {
                    u32::from_str_radix(&name[2..], 16).ok().and_then(char::from_u32)
                }
                _ if name.starts_with('#') => name[1..].parse().ok().and_then(char::from_u32),
                _ => None,
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}
