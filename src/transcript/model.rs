//! Parsed transcript types.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Human,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Assistant => "assistant",
        }
    }
}

/// One tool invocation recorded inside an assistant (or human) turn.
///
/// Arguments are opaque text keyed by parameter name, in the order they
/// appeared in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: IndexMap<String, String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: IndexMap::new(),
        }
    }

    /// Look up an argument value by key.
    pub fn argument(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).map(String::as_str)
    }
}

/// A fenced code block found in turn text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    pub language: String,
    pub code: String,
}

/// A conversational turn: one contiguous contribution by a single role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    /// Synthetic timestamp in Unix milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Turn {
    /// The synthetic timestamp as a UTC datetime, if it is in range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    /// Fenced code blocks contained in the turn text.
    ///
    /// A fence left open at the end of the text still yields a block.
    pub fn code_blocks(&self) -> Vec<CodeBlock> {
        let mut blocks = Vec::new();
        let mut language: Option<String> = None;
        let mut code: Vec<&str> = Vec::new();

        for line in self.text.lines() {
            if let Some(info) = line.strip_prefix("```") {
                match language.take() {
                    Some(lang) => {
                        if !code.is_empty() {
                            blocks.push(CodeBlock {
                                language: lang,
                                code: code.join("\n"),
                            });
                        }
                        code.clear();
                    }
                    None => {
                        let info = info.trim();
                        language = Some(if info.is_empty() {
                            "text".to_string()
                        } else {
                            info.to_string()
                        });
                    }
                }
            } else if language.is_some() {
                code.push(line);
            }
        }

        if let Some(lang) = language {
            if !code.is_empty() {
                blocks.push(CodeBlock {
                    language: lang,
                    code: code.join("\n"),
                });
            }
        }

        blocks
    }
}
