//! Splits editor source into executable statements.

use serde::Serialize;

/// Line comment marker. Truncation happens at its first occurrence on a line,
/// string literals included.
pub const COMMENT_MARKER: &str = "//";

/// A statement with the zero-based source line it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCommand {
    pub statement: String,
    pub source_line: usize,
}

fn strip_line(line: &str) -> &str {
    let code = match line.find(COMMENT_MARKER) {
        Some(idx) => &line[..idx],
        None => line,
    };
    code.trim()
}

fn statements(source: &str) -> impl Iterator<Item = (usize, &str)> {
    source
        .split('\n')
        .map(strip_line)
        .enumerate()
        .filter(|(_, statement)| !statement.is_empty())
}

/// Parse source text into statements, dropping blank and comment-only lines.
pub fn parse_commands(source: &str) -> Vec<String> {
    statements(source)
        .map(|(_, statement)| statement.to_string())
        .collect()
}

/// Like [`parse_commands`], keeping each statement's original line index.
pub fn parse_commands_with_line_index(source: &str) -> Vec<ParsedCommand> {
    statements(source)
        .map(|(source_line, statement)| ParsedCommand {
            statement: statement.to_string(),
            source_line,
        })
        .collect()
}
