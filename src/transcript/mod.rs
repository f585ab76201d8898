//! Plain-text coding-assistant transcript parsing.
//!
//! Transcripts are dumps of the form:
//!
//! ```text
//! user:
//! <user_query>read main.go</user_query>
//! assistant:
//! [Tool call] Read
//! path: /src/main.go
//! [Tool result]
//! package main
//! ```
//!
//! and are parsed into an ordered list of [`Turn`]s.

mod classify;
mod content;
mod model;
mod parser;
mod source;
mod tags;
mod tool_block;

pub use classify::{
    classify, is_hard_terminator, is_top_level_parameter, role_of, LineKind, ASSISTANT_MARKER,
    HUMAN_MARKER, TOOL_CALL_PREFIX, TOOL_RESULT_PREFIX,
};
pub use content::{text_content, TextContentOptions};
pub use model::{CodeBlock, Role, ToolCall, Turn};
pub use parser::{
    parse, parse_with, ParseOptions, SizeLimit, DEFAULT_MAX_SIZE, TIMESTAMP_STEP_MS,
};
pub use source::{parse_file, TranscriptFile};
pub use tags::{Tag, TagPolicy, TAGS};
