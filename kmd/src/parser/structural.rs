use crate::block::{Block, Node};
use crate::line::{Line, indent_level};
use crate::parser::error::ParseError;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse script source into the root block of its indentation tree.
pub fn parse_tree(source: &str, file_id: usize) -> Result<Block, Vec<ParseError>> {
    let lines = source_lines(source);
    let (nodes, consumed) = parse_level(&lines, 0, None);

    // The root level ends early only on a line indented less than the first line.
    if let Some(stray) = lines.get(consumed) {
        let first = &lines[0];
        return Err(vec![
            ParseError::error(
                "line is indented less than the first line of the script",
                stray.span.clone(),
                file_id,
            )
            .with_related(first.span.clone(), "root indentation is set here")
            .with_note(format!(
                "the first line sits at indentation level {}, this line at level {}",
                first.indent, stray.indent
            )),
        ]);
    }

    Ok(Block::new(nodes))
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// Split source into trimmed, non-blank lines with byte spans.
fn source_lines(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut offset = 0;

    for raw in source.split('\n') {
        let line_start = offset;
        offset += raw.len() + 1;

        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let content = raw.trim();
        if content.is_empty() {
            continue;
        }

        let leading = raw.len() - raw.trim_start().len();
        let start = line_start + leading;
        lines.push(Line::new(
            content,
            indent_level(&raw[..leading]),
            start..start + content.len(),
        ));
    }

    lines
}

// ---------------------------------------------------------------------------
// Indentation grouping
// ---------------------------------------------------------------------------

/// Group lines starting at `start` into the nodes of one block.
///
/// `level` is the indentation of the block being collected, or `None` at the
/// root, where the first line sets it. A deeper line opens a sub-block that
/// is collected recursively; a shallower line ends this block without being
/// consumed. Dedents are only compared against this block's level, so a
/// dedent need not line up with any earlier level.
///
/// Returns the nodes and the number of lines consumed.
fn parse_level(lines: &[Line], start: usize, level: Option<usize>) -> (Vec<Node>, usize) {
    let mut nodes = Vec::new();
    let mut level = level;
    let mut cursor = start;

    while let Some(line) = lines.get(cursor) {
        match level {
            Some(current) if line.indent > current => {
                let (children, consumed) = parse_level(lines, cursor, Some(line.indent));
                nodes.push(Node::Block(Block::new(children)));
                cursor += consumed;
            }
            Some(current) if line.indent < current => break,
            _ => {
                level = Some(line.indent);
                nodes.push(Node::Line(line.clone()));
                cursor += 1;
            }
        }
    }

    (nodes, cursor - start)
}
