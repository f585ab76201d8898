//! Inline markup tags embedded in transcript text.

/// What happens to the text inside a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagPolicy {
    /// Inner text becomes part of the turn text.
    Extract,
    /// Inner text is dropped.
    Discard,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Tag {
    pub open: &'static str,
    pub close: &'static str,
    pub policy: TagPolicy,
}

pub const USER_QUERY: Tag = Tag {
    open: "<user_query>",
    close: "</user_query>",
    policy: TagPolicy::Extract,
};

pub const THINK: Tag = Tag {
    open: "<think>",
    close: "</think>",
    policy: TagPolicy::Discard,
};

/// Recognized tags, checked in order.
pub static TAGS: [Tag; 2] = [USER_QUERY, THINK];

/// The first known tag whose opener appears on `line`.
pub fn opening_tag(line: &str) -> Option<&'static Tag> {
    TAGS.iter().find(|tag| line.contains(tag.open))
}

/// Pull the text enclosed by `open`/`close`, starting at `lines[start]`.
///
/// Returns the trimmed content and how many lines after `start` belong to
/// the tag. Without a closing marker the tag runs to end of input.
pub fn extract(lines: &[&str], start: usize, open: &str, close: &str) -> (String, usize) {
    let line = lines[start];
    let Some(open_at) = line.find(open) else {
        return (String::new(), 0);
    };
    let after_open = &line[open_at + open.len()..];

    if let Some(close_at) = after_open.find(close) {
        return (after_open[..close_at].trim().to_string(), 0);
    }

    let mut parts: Vec<&str> = Vec::new();
    if !after_open.trim().is_empty() {
        parts.push(after_open);
    }

    for (j, next) in lines.iter().enumerate().skip(start + 1) {
        if let Some(close_at) = next.find(close) {
            let before_close = &next[..close_at];
            if !before_close.trim().is_empty() {
                parts.push(before_close);
            }
            return (parts.join("\n").trim().to_string(), j - start);
        }
        parts.push(*next);
    }

    (
        parts.join("\n").trim().to_string(),
        lines.len().saturating_sub(start + 1),
    )
}

/// Count the lines after `start` up to and including the first one holding `close`.
/// A tag closed on its opening line consumes nothing further.
pub fn skip(lines: &[&str], start: usize, close: &str) -> usize {
    if lines[start].contains(close) {
        return 0;
    }
    lines
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, line)| line.contains(close))
        .map(|(j, _)| j - start)
        .unwrap_or_else(|| lines.len().saturating_sub(start + 1))
}
