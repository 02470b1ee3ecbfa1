//! In-memory outline tree built from a parsed mind-map document.
//!
//! The tree is read once and never mutated. Nodes live in an id-keyed
//! registry stored in pre-order, so walking the registry is the
//! depth-first traversal and can be repeated any number of times. Each
//! node refers to its parent by id only.

pub mod freeplane;
pub mod markdown;

use crate::error::{MmjError, Result};
use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt;
use std::path::Path;

/// One element as produced by an outline parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutlineElement {
    pub id: String,
    pub title: String,
    pub link: Option<String>,
    pub note: Option<String>,
    pub children: Vec<OutlineElement>,
}

/// Source of outline documents.
pub trait OutlineParser {
    /// Parse document text into its root element.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a well-formed outline.
    fn parse_str(&self, content: &str) -> Result<OutlineElement>;

    /// Parse the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    fn parse(&self, path: &Path) -> Result<OutlineElement> {
        let content = std::fs::read_to_string(path)?;
        self.parse_str(&content)
    }
}

/// Parse `path` with the parser matching its extension.
///
/// # Errors
///
/// Returns a validation error for unsupported extensions, or any parse error.
pub fn parse_outline_file(path: &Path) -> Result<OutlineElement> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some("mm") => freeplane::FreeplaneParser.parse(path),
        Some("md" | "markdown") => markdown::MarkdownParser.parse(path),
        _ => Err(MmjError::validation(
            "outline",
            format!("{}: expected a .mm, .md or .markdown file", path.display()),
        )),
    }
}

/// Issue kind derived from a node's depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    Root,
    Epic,
    Task,
    SubTask,
    /// Deeper than a sub-task; carries the depth below the sub-task level.
    Overflow(usize),
}

impl IssueKind {
    /// The three kinds that become tracker records, in creation order.
    pub const TRACKED: [Self; 3] = [Self::Epic, Self::Task, Self::SubTask];

    #[must_use]
    pub const fn from_depth(depth: usize) -> Self {
        match depth {
            0 => Self::Root,
            1 => Self::Epic,
            2 => Self::Task,
            3 => Self::SubTask,
            n => Self::Overflow(n - 3),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Cow<'static, str> {
        match self {
            Self::Root => Cow::Borrowed("root"),
            Self::Epic => Cow::Borrowed("epic"),
            Self::Task => Cow::Borrowed("task"),
            Self::SubTask => Cow::Borrowed("sub-task"),
            Self::Overflow(n) => Cow::Owned(n.to_string()),
        }
    }

    /// Whether nodes of this kind become tracker records.
    #[must_use]
    pub const fn is_tracked(&self) -> bool {
        matches!(self, Self::Epic | Self::Task | Self::SubTask)
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// A node of the outline with its structural position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub id: String,
    pub parent_id: Option<String>,
    /// Distance from the root (root = 0).
    pub depth: usize,
    pub title: String,
    pub link: Option<String>,
    pub note: Option<String>,
    pub kind: IssueKind,
    /// Direct children, in document order.
    pub children: Vec<String>,
}

/// Render one descendant line of a parent record body.
///
/// Linked titles become `[title|link]`; text spanning more than one line
/// break is wrapped in `{code}` markers; `depth` asterisks prefix the line.
#[must_use]
pub fn child_text(title: &str, link: Option<&str>, depth: usize) -> String {
    let mut text = match link {
        Some(link) => format!("[{title}|{link}]"),
        None => title.to_string(),
    };
    if text.matches('\n').count() > 1 {
        text = format!("{{code}}{text}{{code}}");
    }
    format!("{} {text}", "*".repeat(depth))
}

/// Id-keyed registry of outline nodes in pre-order.
#[derive(Debug, Clone)]
pub struct OutlineTree {
    nodes: IndexMap<String, OutlineNode>,
}

impl OutlineTree {
    /// Build the registry from a parsed root element.
    ///
    /// # Errors
    ///
    /// Returns a validation error if an id is empty or appears twice.
    pub fn build(root: &OutlineElement) -> Result<Self> {
        let mut nodes = IndexMap::new();
        let mut stack: Vec<(&OutlineElement, usize, Option<&str>)> = vec![(root, 0, None)];

        while let Some((element, depth, parent_id)) = stack.pop() {
            if element.id.trim().is_empty() {
                return Err(MmjError::validation(
                    "outline",
                    format!("node \"{}\" has no id", element.title),
                ));
            }
            if nodes.contains_key(&element.id) {
                return Err(MmjError::validation(
                    "outline",
                    format!("duplicate node id {}", element.id),
                ));
            }
            nodes.insert(
                element.id.clone(),
                OutlineNode {
                    id: element.id.clone(),
                    parent_id: parent_id.map(str::to_string),
                    depth,
                    title: element.title.clone(),
                    link: element.link.clone().filter(|l| !l.is_empty()),
                    note: element.note.clone().filter(|n| !n.is_empty()),
                    kind: IssueKind::from_depth(depth),
                    children: element.children.iter().map(|c| c.id.clone()).collect(),
                },
            );
            for child in element.children.iter().rev() {
                stack.push((child, depth + 1, Some(element.id.as_str())));
            }
        }

        Ok(Self { nodes })
    }

    /// Pre-order traversal of every node, root first.
    pub fn walk(&self) -> impl Iterator<Item = &OutlineNode> {
        self.nodes.values()
    }

    /// Nodes of one kind, in traversal order.
    pub fn nodes_of_kind(&self, kind: IssueKind) -> impl Iterator<Item = &OutlineNode> {
        self.walk().filter(move |n| n.kind == kind)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&OutlineNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn root(&self) -> Option<&OutlineNode> {
        self.nodes.values().next()
    }

    #[must_use]
    pub fn parent(&self, node: &OutlineNode) -> Option<&OutlineNode> {
        node.parent_id.as_deref().and_then(|id| self.get(id))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Pre-order walk of the subtree rooted at `id`, with depths relative
    /// to that node (the node itself is depth 0).
    #[must_use]
    pub fn subtree(&self, id: &str) -> Vec<(usize, &OutlineNode)> {
        let mut out = Vec::new();
        let mut stack: Vec<(usize, &str)> = vec![(0, id)];
        while let Some((depth, current)) = stack.pop() {
            let Some(node) = self.get(current) else {
                continue;
            };
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child.as_str()));
            }
        }
        out
    }

    /// Rendered lines of every strict descendant of `id`, each preceded by
    /// a newline.
    #[must_use]
    pub fn descendant_text(&self, id: &str) -> String {
        self.subtree(id)
            .into_iter()
            .filter(|(depth, _)| *depth > 0)
            .map(|(depth, node)| format!("\n{}", child_text(&node.title, node.link.as_deref(), depth)))
            .collect()
    }
}
