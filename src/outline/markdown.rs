//! Markdown outline parser.
//!
//! # Grammar
//!
//! - The first H1 line (`# Title`) names the root.
//! - Bullets (`- `, `* ` or `+ `) are nodes; every two spaces of
//!   indentation is one level deeper. A bullet may not skip a level.
//! - A bullet whose whole text is `[title](url)` carries a link.
//! - Quote lines (`> text`) append a note line to the most recent bullet,
//!   or to the root before the first bullet.
//! - Anything else is ignored.
//!
//! Node ids follow the position in the tree (`md-1`, `md-1-2`, ...) so they
//! stay stable while the file is only appended to.

use super::{OutlineElement, OutlineParser};
use crate::error::{MmjError, Result};

const ROOT_ID: &str = "md";

/// Parser for indented-bullet markdown outlines.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownParser;

impl OutlineParser for MarkdownParser {
    fn parse_str(&self, content: &str) -> Result<OutlineElement> {
        let mut stack = vec![OutlineElement {
            id: ROOT_ID.to_string(),
            ..Default::default()
        }];
        let mut seen_heading = false;

        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = line.trim_start();

            if let Some(title) = line.strip_prefix("# ") {
                if seen_heading {
                    return Err(MmjError::validation(
                        "outline",
                        format!("line {line_no}: only one top-level heading is allowed"),
                    ));
                }
                if stack.len() > 1 {
                    return Err(MmjError::validation(
                        "outline",
                        format!("line {line_no}: heading must come before the first bullet"),
                    ));
                }
                seen_heading = true;
                stack[0].title = title.trim().to_string();
                continue;
            }

            if let Some(text) = trimmed.strip_prefix('>') {
                if let Some(current) = stack.last_mut() {
                    let text = text.strip_prefix(' ').unwrap_or(text).trim_end();
                    match current.note.as_mut() {
                        Some(note) => {
                            note.push('\n');
                            note.push_str(text);
                        }
                        None => current.note = Some(text.to_string()),
                    }
                }
                continue;
            }

            let Some(text) = bullet_text(trimmed) else {
                continue;
            };

            let indent = line.len() - trimmed.len();
            let level = indent / 2 + 1;
            if level > stack.len() {
                return Err(MmjError::validation(
                    "outline",
                    format!("line {line_no}: bullet is indented more than one level below its parent"),
                ));
            }
            while stack.len() > level {
                close_top(&mut stack);
            }

            let id = stack.last().map_or_else(
                || format!("{ROOT_ID}-1"),
                |p| format!("{}-{}", p.id, p.children.len() + 1),
            );
            let (title, link) = split_link(text);
            stack.push(OutlineElement {
                id,
                title,
                link,
                note: None,
                children: Vec::new(),
            });
        }

        while stack.len() > 1 {
            close_top(&mut stack);
        }
        let mut root = stack
            .pop()
            .ok_or_else(|| MmjError::validation("outline", "empty outline"))?;
        if let Some(note) = root.note.take() {
            root.note = Some(note.trim_end().to_string()).filter(|n| !n.is_empty());
        }
        Ok(root)
    }
}

fn close_top(stack: &mut Vec<OutlineElement>) {
    if let Some(mut done) = stack.pop() {
        if let Some(note) = done.note.take() {
            done.note = Some(note.trim_end().to_string()).filter(|n| !n.is_empty());
        }
        if let Some(parent) = stack.last_mut() {
            parent.children.push(done);
        }
    }
}

fn bullet_text(trimmed: &str) -> Option<&str> {
    ["- ", "* ", "+ "]
        .iter()
        .find_map(|marker| trimmed.strip_prefix(marker))
        .map(str::trim)
}

/// Split `[title](url)` into its parts; other text is a plain title.
fn split_link(text: &str) -> (String, Option<String>) {
    if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(')')) {
        if let Some((title, url)) = inner.split_once("](") {
            if !url.trim().is_empty() {
                return (title.trim().to_string(), Some(url.trim().to_string()));
            }
        }
    }
    (text.to_string(), None)
}
