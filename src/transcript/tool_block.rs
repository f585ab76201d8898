//! `[Tool call]` and `[Tool result]` blocks.
//!
//! A call block looks like:
//!
//! ```text
//! [Tool call] Write
//! path: /src/main.go
//! content: package main
//!
//! func main() {}
//! ```
//!
//! Column-zero `key: value` lines open arguments; any other line extends the
//! open argument. The block ends at a blank line with no open argument, at a
//! role marker, at the next tool opener, or at end of input. The ending line
//! is left for the caller.

use indexmap::IndexMap;

use super::classify::{is_block_boundary, is_top_level_parameter, TOOL_CALL_PREFIX};
use super::model::ToolCall;

/// Argument state while scanning one call block.
#[derive(Default)]
struct ArgumentBuilder {
    args: IndexMap<String, String>,
    current: Option<(String, String)>,
}

impl ArgumentBuilder {
    fn has_open_value(&self) -> bool {
        self.current.is_some()
    }

    fn open(&mut self, key: &str, value: &str) {
        self.flush();
        self.current = Some((key.trim().to_string(), value.trim().to_string()));
    }

    fn continue_value(&mut self, line: &str) {
        if let Some((_, value)) = self.current.as_mut() {
            value.push('\n');
            value.push_str(line);
        }
    }

    /// `key=value` lines are accepted only before any `key: value` argument.
    fn single_line(&mut self, trimmed: &str) {
        if let Some((key, value)) = trimmed.split_once('=') {
            let key = key.trim();
            if !key.is_empty() {
                self.args.insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    fn flush(&mut self) {
        if let Some((key, value)) = self.current.take() {
            let value = value.trim_start_matches('\n').trim_end();
            self.args.insert(key, value.to_string());
        }
    }

    fn finish(mut self) -> IndexMap<String, String> {
        self.flush();
        self.args
    }
}

/// Build the call opened at `lines[start]`.
///
/// Returns the call and the number of lines after `start` that belong to
/// the block. A nameless opener yields no call but its block is still consumed.
pub fn assemble_call(lines: &[&str], start: usize) -> (Option<ToolCall>, usize) {
    let name = lines[start]
        .strip_prefix(TOOL_CALL_PREFIX)
        .unwrap_or_default()
        .trim();

    let mut builder = ArgumentBuilder::default();
    let mut end = start + 1;

    while end < lines.len() {
        let line = lines[end];
        if line.is_empty() {
            if !builder.has_open_value() {
                break;
            }
            builder.continue_value(line);
        } else if is_block_boundary(line) {
            break;
        } else {
            let trimmed = line.trim();
            if is_top_level_parameter(line, trimmed) {
                if let Some((key, value)) = trimmed.split_once(':') {
                    builder.open(key, value);
                }
            } else if builder.has_open_value() {
                builder.continue_value(line);
            } else {
                builder.single_line(trimmed);
            }
        }
        end += 1;
    }

    let consumed = end - start - 1;
    if name.is_empty() {
        return (None, consumed);
    }

    let call = ToolCall {
        name: name.to_string(),
        arguments: builder.finish(),
    };
    (Some(call), consumed)
}

/// Count the lines after a `[Tool result]` opener up to the next hard terminator.
pub fn skip_result(lines: &[&str], start: usize) -> usize {
    lines
        .iter()
        .skip(start + 1)
        .take_while(|line| !line.is_empty() && !is_block_boundary(line))
        .count()
}
