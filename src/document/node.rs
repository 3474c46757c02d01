// src/document/node.rs
//! Typed Atlassian Document Format tree.
//!
//! Parsing is the only place raw JSON is inspected. Shapes the renderer
//! cannot make sense of are rejected here with a [`DocumentError`]; node
//! kinds it does not know are kept as [`Node::Opaque`] so their children
//! still render.

use serde_json::{Map, Value};
use thiserror::Error;

/// Reasons a document cannot be converted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    #[error("'{kind}' node has a non-array 'content' field")]
    ContentNotArray { kind: String },

    #[error("'{kind}' node has an unsupported child: {found}")]
    InvalidChild { kind: String, found: &'static str },

    #[error("'{kind}' node has a non-object 'attrs' field")]
    AttrsNotObject { kind: String },

    #[error("mark must be an object, got {found}")]
    InvalidMark { found: &'static str },

    #[error("heading level must be an integer up to 6, got {found}")]
    InvalidHeadingLevel { found: String },

    #[error("panel type must be a string, got {found}")]
    InvalidPanelType { found: String },

    #[error("text node has non-string 'text': {found}")]
    InvalidText { found: String },

    #[error("formatting failed")]
    Format(#[from] std::fmt::Error),
}

/// Inline formatting applied to a text node, in the order it appears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    Strong,
    Em,
    Code,
    Link { href: String },
    Other(String),
}

/// One element of a rich document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text { text: String, marks: Vec<Mark> },
    Paragraph(Vec<Node>),
    Heading { level: usize, content: Vec<Node> },
    BulletList(Vec<Node>),
    OrderedList(Vec<Node>),
    ListItem(Vec<Node>),
    CodeBlock { language: String, content: Vec<Node> },
    Blockquote(Vec<Node>),
    Table(Vec<Node>),
    TableRow(Vec<Node>),
    Mention { text: String },
    Emoji { short_name: String },
    Rule,
    HardBreak,
    Panel { panel_type: String, content: Vec<Node> },
    /// `media`, `mediaGroup` and `mediaSingle`.
    Media,
    /// A node kind without dedicated rendering; only its children matter.
    Opaque { kind: String, content: Vec<Node> },
    /// A bare string or number found where a node was expected.
    Literal(String),
}

impl Node {
    /// Children of this node; empty for leaves.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Paragraph(content)
            | Node::BulletList(content)
            | Node::OrderedList(content)
            | Node::ListItem(content)
            | Node::Blockquote(content)
            | Node::Table(content)
            | Node::TableRow(content)
            | Node::Heading { content, .. }
            | Node::CodeBlock { content, .. }
            | Node::Panel { content, .. }
            | Node::Opaque { content, .. } => content,
            Node::Text { .. }
            | Node::Mention { .. }
            | Node::Emoji { .. }
            | Node::Rule
            | Node::HardBreak
            | Node::Media
            | Node::Literal(_) => &[],
        }
    }

    pub fn is_table_row(&self) -> bool {
        matches!(self, Node::TableRow(_))
    }

    /// Parses one node. `None` means the value carries nothing (JSON null).
    pub fn from_value(value: &Value) -> Result<Option<Node>, DocumentError> {
        match value {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(Node::Literal(s.clone()))),
            Value::Number(n) => Ok(Some(Node::Literal(n.to_string()))),
            Value::Object(map) => parse_object(map).map(Some),
            Value::Bool(_) => Err(DocumentError::InvalidChild {
                kind: "document".to_string(),
                found: "boolean",
            }),
            Value::Array(_) => Err(DocumentError::InvalidChild {
                kind: "document".to_string(),
                found: "array",
            }),
        }
    }
}

/// A whole document: the root's top-level content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub content: Vec<Node>,
}

impl Document {
    /// Parses the `content` of a root document object.
    pub fn from_map(root: &Map<String, Value>) -> Result<Self, DocumentError> {
        Ok(Self {
            content: parse_children("doc", root.get("content"))?,
        })
    }
}

fn parse_object(map: &Map<String, Value>) -> Result<Node, DocumentError> {
    let kind = map.get("type").and_then(Value::as_str).unwrap_or_default();
    let attrs = attrs_of(kind, map)?;

    let node = match kind {
        "text" => Node::Text {
            text: text_of(map)?,
            marks: parse_marks(map.get("marks"))?,
        },
        "paragraph" => Node::Paragraph(parse_children(kind, map.get("content"))?),
        "heading" => Node::Heading {
            level: heading_level(attrs)?,
            content: parse_children(kind, map.get("content"))?,
        },
        "bulletList" => Node::BulletList(parse_object_children(kind, map.get("content"))?),
        "orderedList" => Node::OrderedList(parse_object_children(kind, map.get("content"))?),
        "listItem" => Node::ListItem(parse_children(kind, map.get("content"))?),
        "codeBlock" => Node::CodeBlock {
            language: attr_string(attrs, "language").unwrap_or_default(),
            content: parse_children(kind, map.get("content"))?,
        },
        "blockquote" => Node::Blockquote(parse_children(kind, map.get("content"))?),
        "table" => Node::Table(parse_object_children(kind, map.get("content"))?),
        "tableRow" => Node::TableRow(parse_object_children(kind, map.get("content"))?),
        "mention" => Node::Mention {
            text: attr_string(attrs, "text").unwrap_or_default(),
        },
        "emoji" => Node::Emoji {
            short_name: attr_string(attrs, "shortName").unwrap_or_default(),
        },
        "rule" => Node::Rule,
        "hardBreak" => Node::HardBreak,
        "panel" => Node::Panel {
            panel_type: panel_type(attrs)?,
            content: parse_children(kind, map.get("content"))?,
        },
        "media" | "mediaSingle" | "mediaGroup" => Node::Media,
        other => Node::Opaque {
            kind: other.to_string(),
            content: parse_children(kind, map.get("content"))?,
        },
    };
    Ok(node)
}

fn parse_children(kind: &str, content: Option<&Value>) -> Result<Vec<Node>, DocumentError> {
    match content {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => {
            let mut nodes = Vec::with_capacity(items.len());
            for item in items {
                match Node::from_value(item) {
                    Ok(Some(node)) => nodes.push(node),
                    Ok(None) => {}
                    Err(DocumentError::InvalidChild { found, .. }) => {
                        return Err(DocumentError::InvalidChild {
                            kind: kind.to_string(),
                            found,
                        })
                    }
                    Err(other) => return Err(other),
                }
            }
            Ok(nodes)
        }
        Some(_) => Err(DocumentError::ContentNotArray {
            kind: kind.to_string(),
        }),
    }
}

/// Lists, tables and rows index into their children as objects.
fn parse_object_children(kind: &str, content: Option<&Value>) -> Result<Vec<Node>, DocumentError> {
    let nodes = parse_children(kind, content)?;
    if nodes.iter().any(|node| matches!(node, Node::Literal(_))) {
        return Err(DocumentError::InvalidChild {
            kind: kind.to_string(),
            found: "scalar",
        });
    }
    Ok(nodes)
}

fn attrs_of<'a>(
    kind: &str,
    map: &'a Map<String, Value>,
) -> Result<Option<&'a Map<String, Value>>, DocumentError> {
    match map.get("attrs") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(attrs)) => Ok(Some(attrs)),
        Some(_) => Err(DocumentError::AttrsNotObject {
            kind: kind.to_string(),
        }),
    }
}

/// Reads a textual attribute. Non-string scalars use their JSON text.
fn attr_string(attrs: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    match attrs?.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn text_of(map: &Map<String, Value>) -> Result<String, DocumentError> {
    match map.get("text") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(DocumentError::InvalidText {
            found: other.to_string(),
        }),
    }
}

/// Deepest heading ADF defines.
const MAX_HEADING_LEVEL: usize = 6;

fn heading_level(attrs: Option<&Map<String, Value>>) -> Result<usize, DocumentError> {
    match attrs.and_then(|a| a.get("level")) {
        None | Some(Value::Null) => Ok(1),
        Some(Value::Number(n)) => match n.as_i64() {
            // A negative level renders no hashes.
            Some(level) if level <= MAX_HEADING_LEVEL as i64 => Ok(usize::try_from(level).unwrap_or(0)),
            _ => Err(DocumentError::InvalidHeadingLevel {
                found: n.to_string(),
            }),
        },
        Some(other) => Err(DocumentError::InvalidHeadingLevel {
            found: other.to_string(),
        }),
    }
}

fn panel_type(attrs: Option<&Map<String, Value>>) -> Result<String, DocumentError> {
    match attrs.and_then(|a| a.get("panelType")) {
        None => Ok("info".to_string()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(DocumentError::InvalidPanelType {
            found: other.to_string(),
        }),
    }
}

fn parse_marks(marks: Option<&Value>) -> Result<Vec<Mark>, DocumentError> {
    let items = match marks {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(DocumentError::InvalidMark {
                found: json_kind(other),
            })
        }
    };

    items
        .iter()
        .map(|mark| {
            let Value::Object(map) = mark else {
                return Err(DocumentError::InvalidMark {
                    found: json_kind(mark),
                });
            };
            let kind = map.get("type").and_then(Value::as_str).unwrap_or_default();
            Ok(match kind {
                "strong" => Mark::Strong,
                "em" => Mark::Em,
                "code" => Mark::Code,
                "link" => Mark::Link {
                    href: attr_string(attrs_of("link", map)?, "href").unwrap_or_default(),
                },
                other => Mark::Other(other.to_string()),
            })
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
