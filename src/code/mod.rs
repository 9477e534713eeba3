//! GeoGebra source handling

mod commands;

pub use commands::{parse_commands, parse_commands_with_line_index, ParsedCommand, COMMENT_MARKER};
