//! Rich-text documents: CMS block trees in, display trees out.
//!
//! The CMS stores rich text as a list of block nodes (`paragraph`, `heading`,
//! `list`, …) whose leaves are `text` runs with formatting flags or `link`
//! nodes. Documents are parsed leniently: a node of an unknown kind, or one
//! with a malformed payload, is dropped on its own without taking its
//! siblings with it. Newer CMS versions can add node kinds without breaking
//! older renderers.
//!
//! ## Two-column split
//!
//! [`render_columns`] looks for the first sentinel among top-level blocks: a
//! paragraph whose only text is `---`, or an explicit `thematic-break` node.
//! Blocks before it form the left column, blocks after it the right. The
//! sentinel itself is never rendered.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Literal paragraph content that splits a two-column block.
pub const COLUMN_SENTINEL: &str = "---";

// =============================================================================
// Input model
// =============================================================================

/// A rich-text document: an ordered list of block nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RichText(pub Vec<RichBlock>);

impl<'de> Deserialize<'de> for RichText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        lenient(deserializer).map(RichText)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RichBlock {
    Paragraph {
        #[serde(default, deserialize_with = "lenient")]
        children: Vec<InlineNode>,
    },
    Heading {
        #[serde(default = "default_level")]
        level: i64,
        #[serde(default, deserialize_with = "lenient")]
        children: Vec<InlineNode>,
    },
    /// Accepts both `{format: "ordered", children}` and
    /// `{ordered: true, items}`. An explicit `ordered` flag wins.
    List {
        #[serde(default)]
        format: ListFormat,
        #[serde(default, deserialize_with = "opt_flag")]
        ordered: Option<bool>,
        #[serde(default, alias = "items", deserialize_with = "lenient")]
        children: Vec<ListItem>,
    },
    #[serde(alias = "thematicBreak")]
    ThematicBreak,
}

fn default_level() -> i64 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    Ordered,
    #[default]
    Unordered,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListItem {
    #[serde(default, deserialize_with = "lenient")]
    pub children: Vec<InlineNode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InlineNode {
    Text(TextLeaf),
    Link {
        url: String,
        #[serde(default, deserialize_with = "lenient")]
        children: Vec<TextLeaf>,
    },
}

/// A text run with formatting marks.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TextLeaf {
    #[serde(alias = "value")]
    pub text: String,
    #[serde(default, deserialize_with = "flag")]
    pub bold: bool,
    #[serde(default, deserialize_with = "flag")]
    pub italic: bool,
    #[serde(default, deserialize_with = "flag")]
    pub underline: bool,
    #[serde(default, deserialize_with = "flag")]
    pub strikethrough: bool,
    #[serde(default, deserialize_with = "flag")]
    pub code: bool,
}

impl TextLeaf {
    pub fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

/// Deserialize a JSON array element by element, dropping entries that fail.
fn lenient<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// A boolean, or `None` when absent, `null`, or not a boolean.
fn opt_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(|v| v.as_bool()))
}

/// `null` and absent flags are off.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(|v| v.as_bool())
        .unwrap_or(false))
}

// =============================================================================
// Display model
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Underline(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(Vec<Inline>),
    /// External link; opens in a new browsing context without referrer.
    Link { href: String, children: Vec<Inline> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextNode {
    Paragraph(Vec<Inline>),
    Heading { level: u8, children: Vec<Inline> },
    List { ordered: bool, items: Vec<Vec<Inline>> },
    Rule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextLayout {
    Single(Vec<TextNode>),
    Columns {
        left: Vec<TextNode>,
        right: Vec<TextNode>,
    },
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a whole document as one column.
pub fn render(doc: &RichText) -> Vec<TextNode> {
    render_blocks(&doc.0)
}

/// Render a document, splitting it into two columns at the first sentinel.
pub fn render_columns(doc: &RichText) -> TextLayout {
    match doc.0.iter().position(is_sentinel) {
        Some(i) => TextLayout::Columns {
            left: render_blocks(&doc.0[..i]),
            right: render_blocks(&doc.0[i + 1..]),
        },
        None => TextLayout::Single(render(doc)),
    }
}

fn render_blocks(blocks: &[RichBlock]) -> Vec<TextNode> {
    blocks.iter().map(render_block).collect()
}

fn render_block(block: &RichBlock) -> TextNode {
    match block {
        RichBlock::Paragraph { children } => TextNode::Paragraph(render_inlines(children)),
        RichBlock::Heading { level, children } => TextNode::Heading {
            level: clamp_level(*level),
            children: render_inlines(children),
        },
        RichBlock::List {
            format,
            ordered,
            children,
        } => TextNode::List {
            ordered: ordered.unwrap_or(*format == ListFormat::Ordered),
            items: children.iter().map(|i| render_inlines(&i.children)).collect(),
        },
        RichBlock::ThematicBreak => TextNode::Rule,
    }
}

/// Heading ranks outside 1–6 have no HTML element; pin them to the nearest.
fn clamp_level(level: i64) -> u8 {
    level.clamp(1, 6) as u8
}

fn render_inlines(nodes: &[InlineNode]) -> Vec<Inline> {
    nodes
        .iter()
        .map(|node| match node {
            InlineNode::Text(leaf) => render_leaf(leaf),
            InlineNode::Link { url, children } => Inline::Link {
                href: url.clone(),
                children: children.iter().map(render_leaf).collect(),
            },
        })
        .collect()
}

/// Apply formatting marks. The first matching mark wins, except that bold
/// and italic together nest.
pub fn render_leaf(leaf: &TextLeaf) -> Inline {
    let text = vec![Inline::Text(leaf.text.clone())];
    if leaf.bold && leaf.italic {
        Inline::Bold(vec![Inline::Italic(text)])
    } else if leaf.bold {
        Inline::Bold(text)
    } else if leaf.italic {
        Inline::Italic(text)
    } else if leaf.underline {
        Inline::Underline(text)
    } else if leaf.strikethrough {
        Inline::Strikethrough(text)
    } else if leaf.code {
        Inline::Code(text)
    } else {
        Inline::Text(leaf.text.clone())
    }
}

fn is_sentinel(block: &RichBlock) -> bool {
    match block {
        RichBlock::ThematicBreak => true,
        RichBlock::Paragraph { children } => matches!(
            children.as_slice(),
            [InlineNode::Text(leaf)] if leaf.text.trim() == COLUMN_SENTINEL
        ),
        _ => false,
    }
}

/// Concatenated text of a rendered inline run, marks stripped.
pub fn inline_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(t) => out.push_str(t),
            Inline::Bold(c)
            | Inline::Italic(c)
            | Inline::Underline(c)
            | Inline::Strikethrough(c)
            | Inline::Code(c)
            | Inline::Link { children: c, .. } => out.push_str(&inline_text(c)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> RichText {
        serde_json::from_value(value).unwrap()
    }

    fn para(text: &str) -> serde_json::Value {
        json!({"type": "paragraph", "children": [{"type": "text", "text": text}]})
    }

    fn texts(nodes: &[TextNode]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| match n {
                TextNode::Paragraph(c) | TextNode::Heading { children: c, .. } => inline_text(c),
                TextNode::List { items, .. } => items.iter().map(|i| inline_text(i)).collect(),
                TextNode::Rule => "<hr>".to_string(),
            })
            .collect()
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn unknown_block_kinds_are_dropped() {
        let d = doc(json!([
            para("one"),
            {"type": "quote", "children": []},
            {"type": "image", "image": {"url": "/x.png"}},
            para("two")
        ]));
        assert_eq!(texts(&render(&d)), vec!["one", "two"]);
    }

    #[test]
    fn malformed_node_does_not_drop_siblings() {
        let d = doc(json!([
            {"type": "paragraph", "children": [
                {"type": "text", "text": "keep"},
                {"type": "text"},
                {"type": "mention", "user": 3},
                {"type": "text", "text": " this", "bold": null}
            ]},
            {"type": "heading", "level": "two", "children": []}
        ]));
        assert_eq!(texts(&render(&d)), vec!["keep this"]);
    }

    #[test]
    fn non_array_document_is_empty() {
        assert_eq!(doc(json!(null)), RichText::default());
        assert_eq!(doc(json!("plain string")), RichText::default());
    }

    #[test]
    fn text_accepts_value_alias() {
        let d = doc(json!([{"type": "paragraph", "children": [{"type": "text", "value": "hi"}]}]));
        assert_eq!(texts(&render(&d)), vec!["hi"]);
    }

    // =========================================================================
    // Block rendering
    // =========================================================================

    #[test]
    fn heading_levels_are_clamped() {
        let d = doc(json!([
            {"type": "heading", "level": 0, "children": []},
            {"type": "heading", "level": 3, "children": []},
            {"type": "heading", "level": 9, "children": []}
        ]));
        let levels: Vec<u8> = render(&d)
            .iter()
            .filter_map(|n| match n {
                TextNode::Heading { level, .. } => Some(*level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![1, 3, 6]);
    }

    #[test]
    fn lists_keep_format_and_items() {
        let d = doc(json!([{
            "type": "list", "format": "ordered",
            "children": [
                {"type": "list-item", "children": [{"type": "text", "text": "a"}]},
                {"type": "list-item", "children": [{"type": "text", "text": "b"}]}
            ]
        }]));
        match &render(&d)[0] {
            TextNode::List { ordered, items } => {
                assert!(*ordered);
                assert_eq!(items.len(), 2);
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn lists_accept_ordered_flag_and_items() {
        let d = doc(json!([
            {"type": "list", "ordered": true, "items": [
                {"children": [{"type": "text", "text": "a"}]},
                {"children": [{"type": "text", "text": "b"}]}
            ]},
            {"type": "list", "ordered": false, "format": "ordered", "items": [
                {"children": [{"type": "text", "text": "c"}]}
            ]}
        ]));
        let nodes = render(&d);
        assert_eq!(
            nodes,
            vec![
                TextNode::List {
                    ordered: true,
                    items: vec![
                        vec![Inline::Text("a".into())],
                        vec![Inline::Text("b".into())]
                    ],
                },
                TextNode::List {
                    ordered: false,
                    items: vec![vec![Inline::Text("c".into())]],
                },
            ]
        );
    }

    // =========================================================================
    // Inline marks
    // =========================================================================

    fn leaf(marks: &[&str]) -> TextLeaf {
        let mut l = TextLeaf::plain("x");
        for m in marks {
            match *m {
                "bold" => l.bold = true,
                "italic" => l.italic = true,
                "underline" => l.underline = true,
                "strikethrough" => l.strikethrough = true,
                "code" => l.code = true,
                _ => unreachable!(),
            }
        }
        l
    }

    fn x() -> Vec<Inline> {
        vec![Inline::Text("x".into())]
    }

    #[test]
    fn bold_and_italic_nest() {
        assert_eq!(
            render_leaf(&leaf(&["bold", "italic"])),
            Inline::Bold(vec![Inline::Italic(x())])
        );
    }

    #[test]
    fn first_matching_mark_wins() {
        assert_eq!(render_leaf(&leaf(&["bold", "code"])), Inline::Bold(x()));
        assert_eq!(render_leaf(&leaf(&["italic", "underline"])), Inline::Italic(x()));
        assert_eq!(
            render_leaf(&leaf(&["underline", "code"])),
            Inline::Underline(x())
        );
        assert_eq!(
            render_leaf(&leaf(&["strikethrough", "code"])),
            Inline::Strikethrough(x())
        );
        assert_eq!(render_leaf(&leaf(&["code"])), Inline::Code(x()));
        assert_eq!(render_leaf(&leaf(&[])), Inline::Text("x".into()));
    }

    #[test]
    fn links_apply_marks_to_children() {
        let d = doc(json!([{"type": "paragraph", "children": [{
            "type": "link", "url": "https://example.com",
            "children": [{"type": "text", "text": "site", "bold": true}]
        }]}]));
        assert_eq!(
            render(&d),
            vec![TextNode::Paragraph(vec![Inline::Link {
                href: "https://example.com".into(),
                children: vec![Inline::Bold(vec![Inline::Text("site".into())])],
            }])]
        );
    }

    // =========================================================================
    // Two-column split
    // =========================================================================

    #[test]
    fn sentinel_paragraph_splits_columns() {
        let d = doc(json!([para("left"), para("---"), para("right")]));
        match render_columns(&d) {
            TextLayout::Columns { left, right } => {
                assert_eq!(texts(&left), vec!["left"]);
                assert_eq!(texts(&right), vec!["right"]);
            }
            other => panic!("expected columns, got {other:?}"),
        }
    }

    #[test]
    fn sentinel_is_trimmed() {
        let d = doc(json!([para("a"), para("  ---  "), para("b")]));
        assert!(matches!(render_columns(&d), TextLayout::Columns { .. }));
    }

    #[test]
    fn thematic_break_splits_columns() {
        let d = doc(json!([para("a"), {"type": "thematic-break"}, para("b")]));
        assert!(matches!(render_columns(&d), TextLayout::Columns { .. }));
    }

    #[test]
    fn only_first_sentinel_splits() {
        let d = doc(json!([para("a"), para("---"), para("b"), para("---"), para("c")]));
        match render_columns(&d) {
            TextLayout::Columns { left, right } => {
                assert_eq!(texts(&left), vec!["a"]);
                assert_eq!(texts(&right), vec!["b", "---", "c"]);
            }
            other => panic!("expected columns, got {other:?}"),
        }
    }

    #[test]
    fn sentinel_with_other_text_does_not_split() {
        let d = doc(json!([
            {"type": "paragraph", "children": [
                {"type": "text", "text": "---"},
                {"type": "text", "text": "more"}
            ]},
            para("--- not alone")
        ]));
        assert!(matches!(render_columns(&d), TextLayout::Single(_)));
    }

    #[test]
    fn no_sentinel_renders_single_column() {
        let d = doc(json!([para("a"), para("b")]));
        match render_columns(&d) {
            TextLayout::Single(nodes) => assert_eq!(texts(&nodes), vec!["a", "b"]),
            other => panic!("expected single, got {other:?}"),
        }
    }

    #[test]
    fn sentinel_at_edges_gives_empty_column() {
        let d = doc(json!([para("---"), para("only right")]));
        match render_columns(&d) {
            TextLayout::Columns { left, right } => {
                assert!(left.is_empty());
                assert_eq!(texts(&right), vec!["only right"]);
            }
            other => panic!("expected columns, got {other:?}"),
        }
    }
}
