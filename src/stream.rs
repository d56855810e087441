//! Per-session document state fed by a generation stream.
//!
//! Two shapes of content arrive from the generators:
//!
//! - **Markdown** ([`MarkdownDocument`]): text fragments that concatenate to
//!   an article. Title, lead, headings and links are derived on demand from
//!   the accumulated text.
//! - **Structured** ([`SiteStream`]): fragments of a JSON site document. After
//!   every fragment the accumulated text is re-parsed with
//!   [`parse_partial`](crate::partial_json::parse_partial) and a new
//!   [`PartialSiteDocument`] snapshot is produced when anything changed.
//!
//! Both are append-only for the lifetime of a session; a new session starts
//! from a fresh value rather than merging into the old one.

use crate::extract::{
    self, Heading, MarkdownLink, TitleAndLead, extract_headings, extract_links,
    extract_title_and_lead,
};
use crate::partial_json::{PartialJsonError, parse_partial};
use crate::schema::{PartialSiteDocument, SchemaError, SiteDocument, validate};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StreamError {
    #[error("malformed response: {0}")]
    Malformed(#[from] PartialJsonError),
    #[error("response ended before the document was complete: {0}")]
    Incomplete(String),
    #[error("response failed validation: {0}")]
    Schema(#[from] SchemaError),
}

/// A markdown article being streamed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkdownDocument {
    text: String,
}

impl MarkdownDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn title(&self) -> Option<String> {
        extract_title_and_lead(&self.text).title
    }

    pub fn lead(&self) -> Option<String> {
        extract_title_and_lead(&self.text).lead
    }

    pub fn headings(&self) -> Vec<Heading> {
        extract_headings(&self.text)
    }

    pub fn links(&self) -> Vec<MarkdownLink> {
        extract_links(&self.text)
    }

    /// Title and lead once they can no longer change.
    pub fn settled(&self, complete: bool) -> TitleAndLead {
        extract::settled_title_and_lead(&self.text, complete)
    }
}

/// A structured site document being streamed in.
#[derive(Debug, Clone, Default)]
pub struct SiteStream {
    buffer: String,
    snapshot: PartialSiteDocument,
    snapshots: usize,
}

impl SiteStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment. Returns the new snapshot when the parsed document
    /// changed, `None` when the fragment added nothing visible (whitespace, a
    /// half-received key).
    pub fn push(&mut self, chunk: &str) -> Result<Option<&PartialSiteDocument>, StreamError> {
        self.buffer.push_str(chunk);
        let Some(value) = parse_partial(&self.buffer)? else {
            return Ok(None);
        };
        let next = PartialSiteDocument::from_value(&value);
        if next == self.snapshot {
            return Ok(None);
        }
        self.snapshot = next;
        self.snapshots += 1;
        Ok(Some(&self.snapshot))
    }

    /// The latest snapshot (empty before the first fragment).
    pub fn snapshot(&self) -> &PartialSiteDocument {
        &self.snapshot
    }

    /// Number of distinct snapshots emitted so far.
    pub fn snapshot_count(&self) -> usize {
        self.snapshots
    }

    /// Validate the accumulated text as a complete document.
    pub fn finish(&self) -> Result<SiteDocument, StreamError> {
        let value: serde_json::Value = serde_json::from_str(&self.buffer)
            .map_err(|e| StreamError::Incomplete(e.to_string()))?;
        Ok(validate(&value)?)
    }
}
