//! Freeplane `.mm` parser.
//!
//! A document is a `<map>` holding one root `<node>`; nodes nest. Each node
//! carries `ID`, `TEXT` and an optional `LINK` attribute. Notes are stored as
//! HTML under `<richcontent TYPE="NOTE">`, one `<p>` per line. Long node text
//! can move out of `TEXT` into `<richcontent TYPE="NODE">`.

use super::{OutlineElement, OutlineParser};
use crate::error::{MmjError, Result};
use crate::util::dedent;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RichKind {
    Note,
    Node,
    Other,
}

/// Parser for Freeplane / FreeMind mind maps.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeplaneParser;

impl OutlineParser for FreeplaneParser {
    fn parse_str(&self, content: &str) -> Result<OutlineElement> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<OutlineElement> = Vec::new();
        let mut root: Option<OutlineElement> = None;
        let mut rich: Option<RichKind> = None;
        let mut paragraphs: Vec<String> = Vec::new();
        let mut paragraph: Option<String> = None;
        let mut loose = String::new();

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.name().as_ref() {
                    b"node" if rich.is_none() => stack.push(element_from(&e)?),
                    b"richcontent" if rich.is_none() => {
                        rich = Some(rich_kind(&e)?);
                        paragraphs.clear();
                        loose.clear();
                    }
                    b"p" if rich.is_some() => paragraph = Some(String::new()),
                    _ => {}
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"node" if rich.is_none() => {
                        let element = element_from(&e)?;
                        attach(&mut stack, &mut root, element)?;
                    }
                    b"p" if rich.is_some() => paragraphs.push(String::new()),
                    b"br" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.push('\n');
                        }
                    }
                    _ => {}
                },
                Event::Text(t) => {
                    if rich.is_some() {
                        let text = t.unescape()?;
                        match paragraph.as_mut() {
                            Some(p) => p.push_str(&text),
                            None => loose.push_str(&text),
                        }
                    }
                }
                Event::CData(t) => {
                    if rich.is_some() {
                        let text = String::from_utf8_lossy(&t.into_inner()).into_owned();
                        match paragraph.as_mut() {
                            Some(p) => p.push_str(&text),
                            None => loose.push_str(&text),
                        }
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"p" if rich.is_some() => {
                        if let Some(p) = paragraph.take() {
                            paragraphs.push(p);
                        }
                    }
                    b"richcontent" => {
                        if let (Some(kind), Some(node)) = (rich.take(), stack.last_mut()) {
                            if paragraphs.is_empty() && !loose.trim().is_empty() {
                                paragraphs = loose.lines().map(str::to_string).collect();
                            }
                            apply_rich(node, kind, &paragraphs);
                        }
                        paragraphs.clear();
                        loose.clear();
                    }
                    b"node" if rich.is_none() => {
                        let element = stack.pop().ok_or_else(|| {
                            MmjError::validation("outline", "unbalanced </node> element")
                        })?;
                        attach(&mut stack, &mut root, element)?;
                    }
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(MmjError::validation("outline", "unterminated <node> element"));
        }
        root.ok_or_else(|| MmjError::validation("outline", "document has no <node> element"))
    }
}

fn attribute(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match e
        .try_get_attribute(name)
        .map_err(quick_xml::Error::from)?
    {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

fn element_from(e: &BytesStart<'_>) -> Result<OutlineElement> {
    let title = attribute(e, "TEXT")?.unwrap_or_default();
    let id = attribute(e, "ID")?.ok_or_else(|| {
        MmjError::validation("outline", format!("node \"{title}\" has no ID attribute"))
    })?;
    Ok(OutlineElement {
        id,
        title,
        link: attribute(e, "LINK")?.filter(|l| !l.is_empty()),
        note: None,
        children: Vec::new(),
    })
}

fn rich_kind(e: &BytesStart<'_>) -> Result<RichKind> {
    Ok(match attribute(e, "TYPE")?.as_deref() {
        None | Some("NOTE") => RichKind::Note,
        Some("NODE") => RichKind::Node,
        Some(_) => RichKind::Other,
    })
}

fn attach(
    stack: &mut [OutlineElement],
    root: &mut Option<OutlineElement>,
    element: OutlineElement,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(MmjError::validation("outline", "document has more than one root node"));
    }
    *root = Some(element);
    Ok(())
}

fn apply_rich(node: &mut OutlineElement, kind: RichKind, paragraphs: &[String]) {
    match kind {
        RichKind::Note => {
            let note = note_text(paragraphs);
            if !note.is_empty() {
                node.note = Some(note);
            }
        }
        RichKind::Node if node.title.is_empty() => {
            node.title = paragraphs
                .iter()
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
                .join("\n");
        }
        _ => {}
    }
}

/// Collapse HTML paragraphs into note text.
///
/// Each paragraph is right-trimmed and its inner line breaks kept; an empty
/// paragraph stands for one blank line. The block is then dedented and
/// trailing whitespace dropped.
fn note_text(paragraphs: &[String]) -> String {
    let lines: Vec<String> = paragraphs
        .iter()
        .map(|p| p.trim_matches('\n').trim_end().to_string())
        .collect();
    let flat = dedent(&lines.join("\n"));
    flat.trim_start_matches('\n').trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"<map version="freeplane 1.9.0">
<node TEXT="Project Plan" ID="ID_root">
<node TEXT="Epic A" ID="ID_e1">
<richcontent TYPE="NOTE"><html><head></head><body><p>Epic note</p></body></html></richcontent>
<node TEXT="Task A1" ID="ID_t1">
<node TEXT="Sub A1a" ID="ID_s1" LINK="https://example.com/design">
<richcontent TYPE="NOTE" CONTENT-TYPE="xml/">
<html>
  <head></head>
  <body>
    <p>First line</p>
    <p>Second &amp; last</p>
  </body>
</html>
</richcontent>
<icon BUILTIN="yes"/>
<node TEXT="Detail" ID="ID_d1"/>
</node>
</node>
</node>
<node ID="ID_e2"><richcontent TYPE="NODE"><html><body><p>Rich title</p></body></html></richcontent></node>
</node>
</map>"#;

    #[test]
    fn test_parses_nested_nodes() {
        let root = FreeplaneParser.parse_str(MAP).unwrap();
        assert_eq!(root.id, "ID_root");
        assert_eq!(root.title, "Project Plan");
        assert_eq!(root.children.len(), 2);

        let epic = &root.children[0];
        assert_eq!(epic.title, "Epic A");
        assert_eq!(epic.note.as_deref(), Some("Epic note"));

        let sub = &epic.children[0].children[0];
        assert_eq!(sub.id, "ID_s1");
        assert_eq!(sub.link.as_deref(), Some("https://example.com/design"));
        assert_eq!(sub.children[0].title, "Detail");
        assert!(sub.children[0].children.is_empty());
    }

    #[test]
    fn test_note_lines_and_entities() {
        let root = FreeplaneParser.parse_str(MAP).unwrap();
        let sub = &root.children[0].children[0].children[0];
        assert_eq!(sub.note.as_deref(), Some("First line\nSecond & last"));
    }

    #[test]
    fn test_rich_node_text_used_as_title() {
        let root = FreeplaneParser.parse_str(MAP).unwrap();
        assert_eq!(root.children[1].title, "Rich title");
        assert!(root.children[1].note.is_none());
    }

    #[test]
    fn test_note_blank_paragraph_kept() {
        let paragraphs = vec![
            "  alpha".to_string(),
            String::new(),
            "    beta  ".to_string(),
        ];
        assert_eq!(note_text(&paragraphs), "alpha\n\n  beta");
    }

    #[test]
    fn test_note_with_no_break_space_indent() {
        let map = r#"<map><node TEXT="Root" ID="r"><richcontent TYPE="NOTE"><html><body>
<p>&#160;indented</p><p> other</p>
</body></html></richcontent></node></map>"#;
        let root = FreeplaneParser.parse_str(map).unwrap();
        assert_eq!(root.note.as_deref(), Some("\u{a0}indented\n other"));
    }

    #[test]
    fn test_missing_id_is_error() {
        let err = FreeplaneParser
            .parse_str(r#"<map><node TEXT="x"/></map>"#)
            .unwrap_err();
        assert!(err.to_string().contains("no ID attribute"));
    }

    #[test]
    fn test_empty_map_is_error() {
        assert!(FreeplaneParser.parse_str("<map></map>").is_err());
    }
}
