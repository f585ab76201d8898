//! Plain-text transcript parser.
//!
//! Walks the transcript once, line by line. Each line is classified, then
//! either switches role, delegates to the tag or tool-block scanners (which
//! report how many lines they consumed), or is appended to the open turn.
//! Malformed structure never fails the parse; it only yields fewer or
//! shorter turns.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::classify::{classify, LineKind};
use super::content::collapse_blank_lines;
use super::model::{Role, ToolCall, Turn};
use super::tags::{self, TagPolicy};
use super::tool_block;

/// Spacing between synthetic turn timestamps.
pub const TIMESTAMP_STEP_MS: i64 = 1000;

/// Default size bound: 16 MiB.
pub const DEFAULT_MAX_SIZE: usize = 16 * 1024 * 1024;

/// What to do with input larger than the size bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeLimit {
    /// Keep the leading complete lines that fit.
    #[default]
    Truncate,
    /// Fail the parse.
    Reject,
    /// Parse everything.
    Ignore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Size bound in bytes; 0 disables it.
    pub max_size: usize,
    pub size_limit: SizeLimit,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            size_limit: SizeLimit::default(),
        }
    }
}

/// Parse a transcript into turns, truncating input beyond `max_size` bytes.
///
/// Turn timestamps are `base_timestamp + index * 1000`.
///
/// ```
/// use turnscribe::transcript::{parse, Role};
///
/// let turns = parse("user:\nhello\nassistant:\nhi there", 0, 0).unwrap();
/// assert_eq!(turns.len(), 2);
/// assert_eq!(turns[0].role, Role::Human);
/// assert_eq!(turns[1].text, "hi there");
/// assert_eq!(turns[1].timestamp, 1000);
/// ```
pub fn parse(text: &str, base_timestamp: i64, max_size: usize) -> Result<Vec<Turn>> {
    let options = ParseOptions {
        max_size,
        ..ParseOptions::default()
    };
    parse_with(text, base_timestamp, &options)
}

/// Parse with an explicit size policy.
pub fn parse_with(text: &str, base_timestamp: i64, options: &ParseOptions) -> Result<Vec<Turn>> {
    let text = apply_size_limit(text, options)?;
    let lines: Vec<&str> = text.lines().collect();

    let mut emitter = Emitter::new(base_timestamp);
    let mut index = 0;
    while index < lines.len() {
        index += emitter.step(&lines, index);
    }
    let turns = emitter.finish();

    debug!(lines = lines.len(), turns = turns.len(), "parsed transcript");
    Ok(turns)
}

fn apply_size_limit<'a>(text: &'a str, options: &ParseOptions) -> Result<&'a str> {
    if options.max_size == 0 || text.len() <= options.max_size {
        return Ok(text);
    }

    match options.size_limit {
        SizeLimit::Ignore => Ok(text),
        SizeLimit::Reject => bail!(
            "transcript is {} bytes, exceeding the {} byte limit",
            text.len(),
            options.max_size
        ),
        SizeLimit::Truncate => {
            let kept = truncate_to_line(text, options.max_size);
            warn!(
                size = text.len(),
                max_size = options.max_size,
                kept = kept.len(),
                "transcript exceeds size bound, truncating"
            );
            Ok(kept)
        }
    }
}

/// Longest prefix of whole lines within `max` bytes. Requires `text.len() > max`.
fn truncate_to_line(text: &str, max: usize) -> &str {
    &text[..whole_lines_len(text.as_bytes(), max)]
}

/// Length of the longest prefix of `bytes` holding only whole lines and at
/// most `max` bytes. The final line terminator, `\n` or `\r\n`, is excluded.
/// The cut always lands next to an ASCII byte, so it is a char boundary.
pub(crate) fn whole_lines_len(bytes: &[u8], max: usize) -> usize {
    if bytes.len() <= max {
        return bytes.len();
    }
    let end = if bytes[max] == b'\n' {
        max
    } else {
        bytes[..max]
            .iter()
            .rposition(|&b| b == b'\n')
            .unwrap_or(0)
    };
    if end > 0 && bytes[end - 1] == b'\r' {
        end - 1
    } else {
        end
    }
}

/// The turn currently being accumulated.
struct OpenTurn {
    role: Role,
    text: String,
    tool_calls: Vec<ToolCall>,
}

impl OpenTurn {
    fn new(role: Role) -> Self {
        Self {
            role,
            text: String::new(),
            tool_calls: Vec::new(),
        }
    }

    fn push_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }
}

struct Emitter {
    base_timestamp: i64,
    turns: Vec<Turn>,
    open: Option<OpenTurn>,
}

impl Emitter {
    fn new(base_timestamp: i64) -> Self {
        Self {
            base_timestamp,
            turns: Vec::new(),
            open: None,
        }
    }

    /// Handle `lines[index]` and return how far to advance.
    fn step(&mut self, lines: &[&str], index: usize) -> usize {
        let line = lines[index];
        match classify(line) {
            LineKind::Role(role) => {
                self.seal();
                self.open = Some(OpenTurn::new(role));
                1
            }
            LineKind::TagOpen(tag) => match tag.policy {
                TagPolicy::Extract => {
                    let (content, consumed) = tags::extract(lines, index, tag.open, tag.close);
                    if !content.is_empty() {
                        if let Some(open) = self.open.as_mut() {
                            open.push_line(&content);
                        }
                    }
                    consumed + 1
                }
                TagPolicy::Discard => tags::skip(lines, index, tag.close) + 1,
            },
            LineKind::ToolCall(_) => {
                let (call, consumed) = tool_block::assemble_call(lines, index);
                if let (Some(call), Some(open)) = (call, self.open.as_mut()) {
                    open.tool_calls.push(call);
                }
                consumed + 1
            }
            LineKind::ToolResult => tool_block::skip_result(lines, index) + 1,
            LineKind::Parameter | LineKind::Literal => {
                // Content before the first role marker is dropped.
                if let Some(open) = self.open.as_mut() {
                    open.push_line(line);
                }
                1
            }
        }
    }

    fn seal(&mut self) {
        let Some(open) = self.open.take() else {
            return;
        };

        let text = collapse_blank_lines(open.text.trim());
        if text.is_empty() && open.tool_calls.is_empty() {
            return;
        }

        let offset = (self.turns.len() as i64).saturating_mul(TIMESTAMP_STEP_MS);
        self.turns.push(Turn {
            role: open.role,
            text,
            timestamp: self.base_timestamp.saturating_add(offset),
            tool_calls: open.tool_calls,
        });
    }

    fn finish(mut self) -> Vec<Turn> {
        self.seal();
        self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: i64 = 1_000_000;

    fn parse_all(text: &str) -> Vec<Turn> {
        parse(text, BASE, 0).unwrap()
    }

    #[test]
    fn test_parse_basic_conversation() {
        let text = "user:\nwrite me a Hello World program\nassistant:\nSure:\n```go\npackage main\n\nimport \"fmt\"\n\nfunc main() {\n    fmt.Println(\"Hello, World!\")\n}\n```";
        let turns = parse_all(text);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::Human);
        assert!(turns[0].text.contains("Hello World"));
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].code_blocks().len(), 1);
    }

    #[test]
    fn test_parse_end_to_end_tool_call() {
        let text = "user:\nhello\nassistant:\n[Tool call] Read\npath: /a.go\n[Tool result]\npackage main\nassistant:\ndone";
        let turns = parse_all(text);
        assert_eq!(turns.len(), 3);

        assert_eq!(turns[0].role, Role::Human);
        assert_eq!(turns[0].text, "hello");
        assert!(turns[0].tool_calls.is_empty());
        assert_eq!(turns[0].timestamp, BASE);

        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].text, "");
        assert_eq!(turns[1].tool_calls.len(), 1);
        assert_eq!(turns[1].tool_calls[0].name, "Read");
        assert_eq!(turns[1].tool_calls[0].arguments.len(), 1);
        assert_eq!(turns[1].tool_calls[0].argument("path"), Some("/a.go"));
        assert_eq!(turns[1].timestamp, BASE + 1000);

        assert_eq!(turns[2].role, Role::Assistant);
        assert_eq!(turns[2].text, "done");
        assert!(turns[2].tool_calls.is_empty());
        assert_eq!(turns[2].timestamp, BASE + 2000);
    }

    #[test]
    fn test_parse_text_around_tool_call() {
        let text = "user:\nread main.go\nassistant:\nLet me read it.\n[Tool call] Read\npath: /Users/test/main.go\n[Tool result]\npackage main\nfunc main() {}\nassistant:\nThat is the file.";
        let turns = parse_all(text);
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1].text, "Let me read it.");
        assert_eq!(
            turns[1].tool_calls[0].argument("path"),
            Some("/Users/test/main.go")
        );
        assert!(!turns[1].text.contains("package main"));
        assert_eq!(turns[2].text, "That is the file.");
    }

    #[test]
    fn test_parse_bare_tool_call_before_role_marker() {
        let turns = parse_all("assistant:\n[Tool call] ListDir\nuser:\nok");
        let last = turns[0].tool_calls.last().unwrap();
        assert_eq!(last.name, "ListDir");
        assert!(last.arguments.is_empty());
    }

    #[test]
    fn test_parse_multiple_tool_calls() {
        let text = "assistant:\nreading two files\n[Tool call] Read\npath: /file1.go\n[Tool call] Read\npath: /file2.go\nuser:\nok";
        let turns = parse_all(text);
        assert_eq!(turns[0].tool_calls.len(), 2);
        assert_eq!(turns[0].tool_calls[0].argument("path"), Some("/file1.go"));
        assert_eq!(turns[0].tool_calls[1].argument("path"), Some("/file2.go"));
        assert_eq!(turns[1].text, "ok");
    }

    #[test]
    fn test_parse_tool_call_in_human_turn() {
        let turns = parse_all("user:\n[Tool call] Search\nquery: foo");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::Human);
        assert_eq!(turns[0].tool_calls[0].argument("query"), Some("foo"));
    }

    #[test]
    fn test_parse_multiline_argument_with_blank_lines() {
        let text = "assistant:\n[Tool call] Write\npath: /Users/test/file.go\ncontent: package main\n\nimport \"fmt\"\n\nfunc main() {\n    fmt.Println(\"Hello\")\n}\nuser:\nthanks";
        let turns = parse_all(text);
        assert_eq!(turns.len(), 2);
        let call = &turns[0].tool_calls[0];
        assert_eq!(call.name, "Write");
        assert_eq!(call.argument("path"), Some("/Users/test/file.go"));
        assert_eq!(
            call.argument("content"),
            Some("package main\n\nimport \"fmt\"\n\nfunc main() {\n    fmt.Println(\"Hello\")\n}")
        );
        assert_eq!(turns[1].text, "thanks");
    }

    #[test]
    fn test_parse_trailing_blank_lines_after_argument() {
        let text = "assistant:\n[Tool call] Write\ncontent: body\n\n\nuser:\nnext";
        let turns = parse_all(text);
        assert_eq!(turns[0].tool_calls[0].argument("content"), Some("body"));
        assert_eq!(turns[0].text, "");
        assert_eq!(turns[1].text, "next");
    }

    #[test]
    fn test_parse_blank_line_ends_result_block() {
        let text = "assistant:\n[Tool result]\nnoise\n\nThe build passed.";
        let turns = parse_all(text);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "The build passed.");
    }

    #[test]
    fn test_parse_user_query_single_line() {
        let turns = parse_all("user:\n<user_query>what does this do?</user_query>\nassistant:\nanswer");
        assert_eq!(turns.len(), 2);
        assert!(turns[0].text.contains("what does this do?"));
        assert!(!turns[0].text.contains("<user_query>"));
        assert!(!turns[0].text.contains("</user_query>"));
    }

    #[test]
    fn test_parse_user_query_multiline() {
        let text = "user:\n<user_query>\nfirst line\n\nsecond line\n</user_query>\nassistant:\nok";
        let turns = parse_all(text);
        assert_eq!(turns[0].text, "first line\n\nsecond line");
    }

    #[test]
    fn test_parse_think_block_discarded() {
        let text = "user:\nhi\nassistant:\n<think>\nprivate reasoning\n</think>\nthe real answer\nmore";
        let turns = parse_all(text);
        assert_eq!(turns.len(), 2);
        assert!(!turns[1].text.contains("private reasoning"));
        assert!(!turns[1].text.contains("think>"));
        assert_eq!(turns[1].text, "the real answer\nmore");
    }

    #[test]
    fn test_parse_think_only_turn_dropped() {
        let turns = parse_all("assistant:\n<think>\nhmm\n</think>\nuser:\nq");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::Human);
    }

    #[test]
    fn test_parse_unclosed_think_runs_to_end() {
        let turns = parse_all("user:\nq\nassistant:\nbefore\n<think>\nnever closed\nuser:\nlost");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].text, "before");
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_all("").is_empty());
    }

    #[test]
    fn test_parse_only_role_markers() {
        assert!(parse_all("user:\nassistant:\nuser:").is_empty());
        assert!(parse_all("user:\n\n   \nassistant:\n").is_empty());
    }

    #[test]
    fn test_parse_leading_content_ignored() {
        let turns = parse_all("preamble\n[Tool call] Read\npath: /x\nuser:\nhello");
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "hello");
        assert_eq!(turns[0].timestamp, BASE);
    }

    #[test]
    fn test_parse_timestamps() {
        let turns = parse_all("user:\none\nassistant:\ntwo\nuser:\n\nassistant:\nthree");
        assert_eq!(turns.len(), 3);
        for (i, turn) in turns.iter().enumerate() {
            assert_eq!(turn.timestamp, BASE + i as i64 * 1000);
        }
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "user:\n<user_query>q</user_query>\nassistant:\n[Tool call] Read\npath: /a\n[Tool result]\nx\nassistant:\ndone";
        assert_eq!(parse_all(text), parse_all(text));
    }

    #[test]
    fn test_parse_crlf_line_endings() {
        let turns = parse_all("user:\r\nhello\r\nassistant:\r\nhi\r\n");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "hello");
        assert_eq!(turns[1].text, "hi");
    }

    #[test]
    fn test_parse_collapses_long_blank_runs() {
        let turns = parse_all("assistant:\na\n\n\n\n\nb");
        assert_eq!(turns[0].text, "a\n\n\nb");
    }

    #[test]
    fn test_size_limit_truncate() {
        let text = "user:\nhello\nassistant:\nthis line is cut";
        let limit = "user:\nhello\nassistant:\nthis".len();
        let turns = parse(text, BASE, limit).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].text, "hello");
    }

    #[test]
    fn test_size_limit_reject() {
        let options = ParseOptions {
            max_size: 4,
            size_limit: SizeLimit::Reject,
        };
        let err = parse_with("user:\nhello", BASE, &options).unwrap_err();
        assert!(err.to_string().contains("byte limit"));
    }

    #[test]
    fn test_size_limit_ignore() {
        let options = ParseOptions {
            max_size: 4,
            size_limit: SizeLimit::Ignore,
        };
        let turns = parse_with("user:\nhello", BASE, &options).unwrap();
        assert_eq!(turns.len(), 1);
    }

    #[test]
    fn test_truncate_to_line() {
        assert_eq!(truncate_to_line("ab\ncd\nef", 4), "ab");
        assert_eq!(truncate_to_line("ab\ncd\nef", 5), "ab\ncd");
        assert_eq!(truncate_to_line("ab\ncd\nef", 6), "ab\ncd");
        assert_eq!(truncate_to_line("abcdef", 3), "");
        // 'é' is two bytes; a cut inside it backs off to the previous line.
        assert_eq!(truncate_to_line("a\né\nz", 3), "a");
        assert_eq!(truncate_to_line("ab\r\ncd\r\nef", 5), "ab");
        assert_eq!(truncate_to_line("ab\r\ncd\r\nef", 6), "ab");
        assert_eq!(truncate_to_line("ab\r\ncd\r\nef", 7), "ab\r\ncd");
    }

    #[test]
    fn test_size_limit_truncate_crlf() {
        let text = "user:\r\nhello\r\nassistant:\r\nthis line is long";
        let limit = "user:\r\nhello\r\nassistant:\r\nthis".len();
        let turns = parse(text, BASE, limit).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::Human);
        assert_eq!(turns[0].text, "hello");
    }

    #[test]
    fn test_whole_lines_len_within_bound() {
        assert_eq!(whole_lines_len(b"a\nb", 3), 3);
        assert_eq!(whole_lines_len(b"a\nb", 10), 3);
        assert_eq!(whole_lines_len(b"a\r\nb\xff\nc", 4), 1);
    }

    #[test]
    fn test_parse_prose_after_blank_line_joins_open_value() {
        let text = "assistant:\n[Tool call] Write\ncontent: body\n\nSome prose after.\nuser:\nnext";
        let turns = parse_all(text);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].text, "");
        assert_eq!(
            turns[0].tool_calls[0].argument("content"),
            Some("body\n\nSome prose after.")
        );
        assert_eq!(turns[1].text, "next");
    }
}
