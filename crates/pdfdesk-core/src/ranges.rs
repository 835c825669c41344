//! Page range parsing for the split operation
//!
//! Parsing is tolerant: the page count is usually unknown while the user is
//! typing, so selections are kept as tokens and resolved against the real
//! page count only once the document is loaded.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// One comma-separated token of a page range, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageToken {
    Single { page: u32 },
    Range { start: u32, end: u32 },
}

/// A parsed page selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageSelection {
    /// Empty input: every page of the document.
    All,
    Tokens { tokens: Vec<PageToken> },
}

impl PageSelection {
    /// Parse text like `"1-3, 5, 8-10"`.
    ///
    /// Blank input selects all pages. Malformed tokens (non-numeric, zero,
    /// more than one dash) are skipped rather than rejected.
    pub fn parse(input: &str) -> Self {
        if input.trim().is_empty() {
            return Self::All;
        }

        let mut tokens = Vec::new();
        for part in input.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match parse_token(part) {
                Some(token) => tokens.push(token),
                None => debug!(token = part, "Skipping malformed page range token"),
            }
        }
        Self::Tokens { tokens }
    }

    /// Resolve to 0-based page indices for a document with `page_count` pages.
    ///
    /// Indices are deduplicated and keep the order in which they first appear.
    /// Pages past the end of the document are dropped and inverted ranges
    /// contribute nothing.
    pub fn resolve(&self, page_count: usize) -> Vec<usize> {
        let tokens = match self {
            Self::All => return (0..page_count).collect(),
            Self::Tokens { tokens } => tokens,
        };

        let mut seen = vec![false; page_count];
        let mut indices = Vec::new();
        let mut take = |page: usize| {
            let Some(index) = page.checked_sub(1) else {
                return;
            };
            if index < page_count && !seen[index] {
                seen[index] = true;
                indices.push(index);
            }
        };

        for token in tokens {
            match *token {
                PageToken::Single { page } => take(page as usize),
                PageToken::Range { start, end } => {
                    let end = (end as usize).min(page_count);
                    for page in start as usize..=end {
                        take(page);
                    }
                }
            }
        }
        indices
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl Default for PageSelection {
    fn default() -> Self {
        Self::All
    }
}

fn parse_page(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok().filter(|&page| page >= 1)
}

fn parse_token(part: &str) -> Option<PageToken> {
    match part.split_once('-') {
        Some((start, end)) => Some(PageToken::Range {
            start: parse_page(start)?,
            end: parse_page(end)?,
        }),
        None => Some(PageToken::Single {
            page: parse_page(part)?,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_and_range_tokens() {
        let selection = PageSelection::parse("1, 3-4");
        assert_eq!(selection.resolve(5), vec![0, 2, 3]);
    }

    #[test]
    fn test_empty_input_selects_all_pages() {
        let selection = PageSelection::parse("");
        assert!(selection.is_all());
        assert_eq!(selection.resolve(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::parse("   ").resolve(2), vec![0, 1]);
    }

    #[test]
    fn test_inverted_range_yields_nothing() {
        assert_eq!(PageSelection::parse("2-1").resolve(5), Vec::<usize>::new());
    }

    #[test]
    fn test_out_of_range_page_dropped() {
        assert_eq!(PageSelection::parse("9").resolve(5), Vec::<usize>::new());
        assert_eq!(PageSelection::parse("4-9").resolve(5), vec![3, 4]);
    }

    #[test]
    fn test_malformed_tokens_skipped() {
        let selection = PageSelection::parse("abc, 2, x-4, 1-2-3, 0, 5");
        assert_eq!(selection.resolve(5), vec![1, 4]);
    }

    #[test]
    fn test_first_occurrence_order_and_dedup() {
        assert_eq!(PageSelection::parse("3, 1-3, 1").resolve(5), vec![2, 0, 1]);
    }

    #[test]
    fn test_whitespace_around_tokens() {
        assert_eq!(PageSelection::parse("  1 , 2 - 3 ").resolve(5), vec![0, 1, 2]);
    }

    #[test]
    fn test_non_empty_text_with_no_valid_tokens_is_not_all() {
        let selection = PageSelection::parse("abc");
        assert!(!selection.is_all());
        assert!(selection.resolve(5).is_empty());
    }

    #[test]
    fn test_huge_range_is_bounded_by_page_count() {
        assert_eq!(PageSelection::parse("2-4000000000").resolve(3), vec![1, 2]);
    }
}
