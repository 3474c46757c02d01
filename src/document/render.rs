// src/document/render.rs
//! Markdown rendering for parsed documents.

use super::node::{Document, DocumentError, Mark, Node};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Write;

static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Renders a document to Markdown, collapsing blank-line runs and trimming.
pub fn render_document(document: &Document) -> Result<String, DocumentError> {
    let mut output = String::new();
    for node in &document.content {
        render_node(node, 0, &mut output)?;
    }
    Ok(EXCESS_NEWLINES
        .replace_all(&output, "\n\n")
        .trim()
        .to_string())
}

/// Renders one node at the given list depth, appending to `out`.
pub fn render_node(node: &Node, depth: usize, out: &mut String) -> Result<(), DocumentError> {
    match node {
        Node::Text { text, marks } => out.push_str(&apply_marks(text, marks)),
        Node::Literal(text) => out.push_str(text),
        Node::Paragraph(content) => {
            render_all(content, depth, out)?;
            out.push_str("\n\n");
        }
        Node::Heading { level, content } => {
            out.push_str(&"#".repeat(*level));
            out.push(' ');
            render_all(content, depth, out)?;
            out.push_str("\n\n");
        }
        Node::BulletList(items) => {
            let lines = items
                .iter()
                .map(|item| {
                    let inner = render_to_string(item.children(), depth + 1)?;
                    Ok(format!("{}- {}", indent(depth), inner.trim()))
                })
                .collect::<Result<Vec<_>, DocumentError>>()?;
            writeln!(out, "{}\n", lines.join("\n"))?;
        }
        Node::OrderedList(items) => {
            let lines = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let inner = render_to_string(item.children(), depth + 1)?;
                    Ok(format!("{}{}. {}", indent(depth), i + 1, inner.trim()))
                })
                .collect::<Result<Vec<_>, DocumentError>>()?;
            writeln!(out, "{}\n", lines.join("\n"))?;
        }
        Node::ListItem(content) => render_all(content, depth, out)?,
        Node::CodeBlock { language, content } => {
            let code = render_to_string(content, depth)?;
            write!(out, "```{}\n{}\n```\n\n", language, code)?;
        }
        Node::Blockquote(content) => {
            let inner = render_to_string(content, depth)?;
            let quoted: Vec<String> = inner
                .trim()
                .split('\n')
                .map(|line| format!("> {}", line))
                .collect();
            writeln!(out, "{}\n", quoted.join("\n"))?;
        }
        Node::Table(rows) => render_table(rows, depth, out)?,
        // Rows outside a table only contribute their cells' text.
        Node::TableRow(cells) => {
            for cell in cells {
                render_all(cell.children(), depth, out)?;
            }
        }
        Node::Mention { text } => write!(out, "@{}", text)?,
        Node::Emoji { short_name } => out.push_str(short_name),
        Node::Rule => out.push_str("---\n\n"),
        Node::HardBreak => out.push('\n'),
        Node::Panel {
            panel_type,
            content,
        } => {
            let inner = render_to_string(content, depth)?;
            write!(
                out,
                "> **{}:** {}\n\n",
                panel_type.to_uppercase(),
                inner.trim()
            )?;
        }
        Node::Media => out.push_str("[Media attachment]\n\n"),
        Node::Opaque { content, .. } => render_all(content, depth, out)?,
    }
    Ok(())
}

fn render_all(nodes: &[Node], depth: usize, out: &mut String) -> Result<(), DocumentError> {
    for node in nodes {
        render_node(node, depth, out)?;
    }
    Ok(())
}

fn render_to_string(nodes: &[Node], depth: usize) -> Result<String, DocumentError> {
    let mut out = String::new();
    render_all(nodes, depth, &mut out)?;
    Ok(out)
}

fn apply_marks(text: &str, marks: &[Mark]) -> String {
    marks.iter().fold(text.to_string(), |acc, mark| match mark {
        Mark::Strong => format!("**{}**", acc),
        Mark::Em => format!("*{}*", acc),
        Mark::Code => format!("`{}`", acc),
        Mark::Link { href } => format!("[{}]({})", acc, href),
        Mark::Other(_) => acc,
    })
}

fn render_table(rows: &[Node], depth: usize, out: &mut String) -> Result<(), DocumentError> {
    let mut rendered: Vec<Vec<String>> = Vec::new();
    for row in rows.iter().filter(|node| node.is_table_row()) {
        let cells = row
            .children()
            .iter()
            .map(|cell| {
                let text = render_to_string(cell.children(), depth)?;
                Ok(text.trim().replace('|', "\\|"))
            })
            .collect::<Result<Vec<_>, DocumentError>>()?;
        rendered.push(cells);
    }

    let Some((header, body)) = rendered.split_first() else {
        return Ok(());
    };

    let row_line = |cells: &[String]| format!("| {} |", cells.join(" | "));
    let separator = vec!["---".to_string(); header.len()];
    let body: Vec<String> = body.iter().map(|cells| row_line(cells)).collect();

    write!(
        out,
        "{}\n{}\n{}\n\n",
        row_line(header),
        row_line(&separator),
        body.join("\n")
    )?;
    Ok(())
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}
