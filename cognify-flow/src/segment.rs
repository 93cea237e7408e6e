//! Interprets the semi-structured text the explanation backend returns.
//!
//! The grammar is small and total: blank-line-separated blocks classify as
//! a header, a numbered list, or a plain paragraph. Malformed markup never
//! fails, it degrades to a paragraph or is dropped line by line.

use serde::{Deserialize, Serialize};

/// One renderable piece of an explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponseSegment {
    /// Emphasis-wrapped heading, trailing colon stripped.
    Header { text: String },
    /// `N. **Title**: body` list entry.
    NumberedItem {
        index: u32,
        title: String,
        body: String,
    },
    /// Anything that matched neither shape.
    Paragraph { text: String },
}

/// Splits explanation text into blocks and classifies each one.
///
/// Stateless and order-preserving. Whitespace-only input yields no
/// segments; any other block-less text yields a single paragraph.
pub fn segment(text: &str) -> Vec<ResponseSegment> {
    let mut segments = Vec::new();
    for block in text.split("\n\n") {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }
        if let Some(title) = header_title(block) {
            segments.push(ResponseSegment::Header {
                text: title.to_string(),
            });
            continue;
        }
        let items: Vec<ResponseSegment> = block.lines().filter_map(numbered_item).collect();
        if items.is_empty() {
            segments.push(ResponseSegment::Paragraph {
                text: block.to_string(),
            });
        } else {
            segments.extend(items);
        }
    }
    segments
}

/// `**Title:**` on a single line. The emphasis markers and the colon are
/// delimiters, not content.
fn header_title(block: &str) -> Option<&str> {
    let title = block.strip_prefix("**")?.strip_suffix(":**")?;
    if title.is_empty() || title.contains('*') || title.contains('\n') {
        return None;
    }
    Some(title)
}

/// `N. **Title**: body` with a non-empty title and body. Lines that do not
/// parse are dropped by the caller rather than failing the block.
fn numbered_item(line: &str) -> Option<ResponseSegment> {
    let line = line.trim();
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let index: u32 = line[..digits].parse().ok()?;
    let rest = line[digits..].strip_prefix('.')?.trim_start();
    let (title, after) = rest.strip_prefix("**")?.split_once("**")?;
    if title.is_empty() || title.contains('*') {
        return None;
    }
    let body = after.strip_prefix(':')?.trim();
    if body.is_empty() {
        return None;
    }
    Some(ResponseSegment::NumberedItem {
        index,
        title: title.to_string(),
        body: body.to_string(),
    })
}
