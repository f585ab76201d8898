//! Turn plain-text coding-assistant transcripts into typed conversation turns.

pub mod config;
pub mod transcript;

pub use config::Config;
pub use transcript::{parse, parse_file, parse_with, ParseOptions, Role, ToolCall, Turn};
