//! Reading transcript files from disk.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::model::Turn;
use super::parser::{parse_with, whole_lines_len, ParseOptions, SizeLimit};

/// Raw transcript text plus the timestamp turns are numbered from.
#[derive(Debug, Clone)]
pub struct TranscriptFile {
    pub path: PathBuf,
    pub text: String,
    /// File modification time in Unix milliseconds (now, if unavailable).
    pub base_timestamp: i64,
}

impl TranscriptFile {
    /// Read a transcript, honouring the size bound in `options`.
    ///
    /// With [`SizeLimit::Truncate`] at most one byte beyond the bound is read
    /// and the bytes are cut back to whole lines before decoding, so `text`
    /// already satisfies the bound. Invalid UTF-8 is replaced rather than
    /// rejected.
    pub fn read(path: &Path, options: &ParseOptions) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to read transcript: {}", path.display()))?;
        let metadata = file
            .metadata()
            .with_context(|| format!("Failed to read transcript: {}", path.display()))?;

        let bounded = options.max_size > 0 && metadata.len() > options.max_size as u64;
        if bounded && options.size_limit == SizeLimit::Reject {
            bail!(
                "transcript {} is {} bytes, exceeding the {} byte limit",
                path.display(),
                metadata.len(),
                options.max_size
            );
        }

        let mut bytes = Vec::new();
        let read = if bounded && options.size_limit == SizeLimit::Truncate {
            file.take(options.max_size as u64 + 1).read_to_end(&mut bytes)
        } else {
            let mut file = file;
            file.read_to_end(&mut bytes)
        };
        read.with_context(|| format!("Failed to read transcript: {}", path.display()))?;

        if bounded && options.size_limit == SizeLimit::Truncate {
            let kept = whole_lines_len(&bytes, options.max_size);
            warn!(
                path = %path.display(),
                size = metadata.len(),
                max_size = options.max_size,
                kept,
                "transcript exceeds size bound, truncating"
            );
            bytes.truncate(kept);
        }

        let base_timestamp = metadata
            .modified()
            .map(|mtime| DateTime::<Utc>::from(mtime).timestamp_millis())
            .unwrap_or_else(|_| Utc::now().timestamp_millis());

        debug!(path = %path.display(), bytes = bytes.len(), "read transcript");

        Ok(Self {
            path: path.to_path_buf(),
            text: String::from_utf8_lossy(&bytes).into_owned(),
            base_timestamp,
        })
    }

    /// Parse the text as read. The size bound was applied by [`TranscriptFile::read`].
    pub fn parse(&self) -> Result<Vec<Turn>> {
        let options = ParseOptions {
            max_size: 0,
            size_limit: SizeLimit::Ignore,
        };
        parse_with(&self.text, self.base_timestamp, &options)
    }
}

/// Read and parse a transcript file in one step.
pub fn parse_file(path: &Path, options: &ParseOptions) -> Result<Vec<Turn>> {
    TranscriptFile::read(path, options)?.parse()
}
