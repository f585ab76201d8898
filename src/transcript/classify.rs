//! Line classification.
//!
//! Every marker the transcript format uses is a fixed literal. A line is
//! classified once into a [`LineKind`] and the emitter dispatches on that.

use super::model::Role;
use super::tags::{self, Tag};

pub const HUMAN_MARKER: &str = "user:";
pub const ASSISTANT_MARKER: &str = "assistant:";
pub const TOOL_CALL_PREFIX: &str = "[Tool call]";
pub const TOOL_RESULT_PREFIX: &str = "[Tool result]";

/// What a single transcript line means to the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Role(Role),
    TagOpen(&'static Tag),
    /// Tool-call opener; carries the trimmed invocation name (may be empty).
    ToolCall(&'a str),
    ToolResult,
    Parameter,
    Literal,
}

/// Classify a line. Priority: role marker, tag open, tool opener, parameter, literal.
pub fn classify(line: &str) -> LineKind<'_> {
    if let Some(role) = role_of(line) {
        return LineKind::Role(role);
    }
    if let Some(tag) = tags::opening_tag(line) {
        return LineKind::TagOpen(tag);
    }
    if let Some(rest) = line.strip_prefix(TOOL_CALL_PREFIX) {
        return LineKind::ToolCall(rest.trim());
    }
    if line.starts_with(TOOL_RESULT_PREFIX) {
        return LineKind::ToolResult;
    }
    if is_top_level_parameter(line, line.trim()) {
        return LineKind::Parameter;
    }
    LineKind::Literal
}

/// Role named by an exact marker line, e.g. `user:`.
pub fn role_of(line: &str) -> Option<Role> {
    match line {
        HUMAN_MARKER => Some(Role::Human),
        ASSISTANT_MARKER => Some(Role::Assistant),
        _ => None,
    }
}

/// True for lines that end any open accumulation context: blank lines,
/// role markers, and tool-call / tool-result openers.
pub fn is_hard_terminator(line: &str) -> bool {
    line.is_empty() || is_block_boundary(line)
}

/// Hard terminators other than the blank line.
pub(crate) fn is_block_boundary(line: &str) -> bool {
    role_of(line).is_some()
        || line.starts_with(TOOL_CALL_PREFIX)
        || line.starts_with(TOOL_RESULT_PREFIX)
}

/// A `key: value` line at column zero. Indented lines with the same shape
/// continue the previous value instead.
pub fn is_top_level_parameter(line: &str, trimmed: &str) -> bool {
    if line.starts_with(' ') || line.starts_with('\t') {
        return false;
    }
    match trimmed.split_once(':') {
        Some((key, _)) => !key.trim().is_empty(),
        None => false,
    }
}
