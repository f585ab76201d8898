//! Plain-text view of parsed turns, for search indexing and summaries.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use super::model::Turn;

/// Marker appended to messages cut at `max_message_length`.
const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// Tags carrying environment dumps rather than conversation.
const SYSTEM_TAGS: [&str; 5] = ["git_status", "file_list", "file_contents", "system_info", "context"];

const LOG_LEVELS: &str = "INFO|ERROR|WARN|DEBUG|FATAL|TRACE|PANIC";

static FENCED_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)```\w*\n.*?```").unwrap());

static SYSTEM_TAG_BLOCKS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SYSTEM_TAGS
        .iter()
        .map(|tag| Regex::new(&format!(r"(?is)<{tag}>.*?</{tag}>")).unwrap())
        .collect()
});

static LOG_LINE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let patterns = [
        // 2024-01-19T10:30:45.123Z [INFO]
        format!(r"^\d{{4}}-\d{{2}}-\d{{2}}[T\s]\d{{2}}:\d{{2}}:\d{{2}}(\.\d+)?(Z|[+-]\d{{2}}:\d{{2}})?.*?({LOG_LEVELS})"),
        // [2024-01-19 10:30:45] INFO
        format!(r"^\[?\d{{4}}-\d{{2}}-\d{{2}}[\sT]\d{{2}}:\d{{2}}:\d{{2}}(\.\d+)?\]?.*?({LOG_LEVELS})"),
        // [1705660245] INFO
        format!(r"^\[?\d{{10,13}}\]?.*?({LOG_LEVELS})"),
        // 10:30:45 INFO
        format!(r"^[\[\s]*\d{{2}}:\d{{2}}:\d{{2}}(\.\d+)?[\]\s]+.*?({LOG_LEVELS})"),
        r"^\[(?i:log|error|warn|info|debug|fatal|trace|panic|critical)\]".to_string(),
        // INFO /path/to/file.go:123
        format!(r"^({LOG_LEVELS}).*?[/\\].*?\.\w+:\d+"),
        // logrus: time="..." level=info
        r#"^\w+=".*?"\s+level=(info|error|warn|debug|fatal|trace|panic)"#.to_string(),
        // zap: {"level":"info",...}
        r#"^\{.*?"level"\s*:\s*"(info|error|warn|debug|fatal|trace|panic)".*?\}"#.to_string(),
    ];
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
});

static CODE_LINE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(func|function|def|class|interface|struct|type|fn)\s+\w+",
        r"^\s*(var|let|const|final)\s+\w+\s*[=:]",
        r"^\s*(import|require|include|from|using|use)\s+",
        r"\w+\([^)]*\)",
        r"[*&]\w+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static FILE_PATH_LINE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"^[/~]?([\w\-\.]+/)+[\w\-\.]+(\.\w+)?(:?\d+)?$",
        r"^[A-Za-z]:\\([\w\-\.]+\\)+[\w\-\.]+(\.\w+)?(:?\d+)?$",
        r"^\.\.?/[\w\-\./]+(\.\w+)?(:?\d+)?$",
        r"^[\w\-\./]+\.\w+:\d+$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());

/// Options for [`text_content`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TextContentOptions {
    /// Also drop log lines, code-looking lines and bare file paths.
    pub filter_logs_and_code: bool,
    /// Maximum characters per message; 0 disables truncation.
    pub max_message_length: usize,
}

impl Default for TextContentOptions {
    fn default() -> Self {
        Self {
            filter_logs_and_code: false,
            max_message_length: 5000,
        }
    }
}

/// Natural-language-only copies of `turns`.
///
/// Turns that carry tool calls are left out, as are turns whose text is
/// empty after filtering. Role and timestamp are preserved.
pub fn text_content(turns: &[Turn], options: &TextContentOptions) -> Vec<Turn> {
    turns
        .iter()
        .filter(|turn| turn.tool_calls.is_empty())
        .filter_map(|turn| {
            let mut text = remove_code_blocks(&turn.text);
            text = remove_system_info(&text);
            if options.filter_logs_and_code {
                text = filter_logs_and_code(&text);
            }
            if text.trim().is_empty() {
                return None;
            }
            Some(Turn {
                role: turn.role,
                text: truncate_message(text, options.max_message_length),
                timestamp: turn.timestamp,
                tool_calls: Vec::new(),
            })
        })
        .collect()
}

/// Keep at most two consecutive blank lines.
pub(crate) fn collapse_blank_lines(text: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        kept.push(line);
    }
    kept.join("\n")
}

fn remove_code_blocks(text: &str) -> String {
    FENCED_CODE.replace_all(text, "").replace("```", "")
}

fn remove_system_info(text: &str) -> String {
    let mut text = text.to_string();
    for tag in SYSTEM_TAG_BLOCKS.iter() {
        text = tag.replace_all(&text, "").into_owned();
    }
    collapse_blank_lines(&text).trim().to_string()
}

fn filter_logs_and_code(text: &str) -> String {
    let kept: Vec<String> = text
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                return Some(String::new());
            }
            if is_log_line(trimmed) || is_code_line(trimmed) || is_file_path_line(trimmed) {
                return None;
            }
            let unwrapped = INLINE_CODE.replace_all(trimmed, "$1");
            (!unwrapped.trim().is_empty()).then(|| unwrapped.into_owned())
        })
        .collect();
    collapse_blank_lines(&kept.join("\n")).trim().to_string()
}

/// Share of CJK ideographs among the line's characters.
fn cjk_ratio(line: &str) -> f64 {
    let total = line.chars().count();
    if total == 0 {
        return 0.0;
    }
    let cjk = line
        .chars()
        .filter(|c| ('\u{4e00}'..='\u{9fff}').contains(c))
        .count();
    cjk as f64 / total as f64
}

fn is_log_line(line: &str) -> bool {
    if line.chars().count() < 5 {
        return false;
    }
    LOG_LINE.iter().any(|re| re.is_match(line))
}

fn is_code_line(line: &str) -> bool {
    let total = line.chars().count();
    if total < 10 {
        return false;
    }

    let special = line.chars().filter(|c| "{}()[];:=-<>".contains(*c)).count();
    if special as f64 / total as f64 > 0.3 {
        return true;
    }

    // Prose in CJK that happens to mention code is kept.
    CODE_LINE.iter().any(|re| re.is_match(line)) && cjk_ratio(line) < 0.2
}

fn is_file_path_line(line: &str) -> bool {
    FILE_PATH_LINE.iter().any(|re| re.is_match(line))
}

fn truncate_message(text: String, max_chars: usize) -> String {
    if max_chars == 0 || text.chars().count() <= max_chars {
        return text;
    }
    let mut s: String = text.chars().take(max_chars).collect();
    s.push_str(TRUNCATION_MARKER);
    s
}
