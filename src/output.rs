//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Output leads with what the user asked about (the topic, the heading, the
//! recent entry) and shows mechanics (chunk counts, cover state, file paths)
//! as indented context lines underneath.
//!
//! # Output Format
//!
//! ## Generation run
//!
//! ```text
//! Hogwarts (article)
//!     Cover: requested
//!         Prompt: Editorial hero image illustrating "Hogwarts". Considered...
//!     Cover: ready
//!     Chunks: 42 (41 updates)
//!     Status: complete
//!     Output: hogwarts.html
//!     Related: Hogwarts Castle, Quidditch
//! ```
//!
//! ## Table of contents
//!
//! ```text
//! Hogwarts  #hogwarts
//!     History  #history
//!         Founding  #founding
//! ```
//!
//! ## History
//!
//! ```text
//! Recent topics
//! 001 Hogwarts
//! 002 CRISPR
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::cover::{CoverImageState, CoverStatus};
use crate::driver::{DriverEvent, RunSummary};
use crate::extract::{Heading, MarkdownLink, slug_id};
use crate::navigation::{History, LinkTarget, classify_link};
use crate::session::{GenerationMode, SessionStatus};
use crate::types::Topic;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{}...", head)
    }
}

fn mode_label(mode: GenerationMode) -> &'static str {
    match mode {
        GenerationMode::Article => "article",
        GenerationMode::Site => "site",
    }
}

fn status_label(status: Option<&SessionStatus>) -> String {
    match status {
        Some(SessionStatus::Streaming) => "streaming".to_string(),
        Some(SessionStatus::Complete) => "complete".to_string(),
        Some(SessionStatus::Failed(message)) => format!("failed ({})", message),
        Some(SessionStatus::Cancelled) => "cancelled".to_string(),
        None => "not started".to_string(),
    }
}

fn cover_label(cover: &CoverImageState) -> String {
    match cover.status {
        CoverStatus::Idle => "none".to_string(),
        CoverStatus::Loading => "pending".to_string(),
        CoverStatus::Ready => "ready".to_string(),
        CoverStatus::Error => format!(
            "failed ({})",
            cover.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

// ============================================================================
// Generation runs
// ============================================================================

/// Header line for a run: the topic and what is generated for it.
pub fn format_run_header(topic: &Topic, mode: GenerationMode) -> String {
    format!("{} ({})", topic, mode_label(mode))
}

/// Default output file for a topic's page. Topics that slug to nothing
/// (punctuation only) are written to `page.html`.
pub fn page_filename(topic: &Topic) -> PathBuf {
    let slug = slug_id(topic.as_str());
    let stem = if slug.is_empty() { "page" } else { slug.as_str() };
    PathBuf::from(format!("{stem}.html"))
}

/// Progress lines for one driver event. Fragment updates print nothing; the
/// summary carries their count.
pub fn format_driver_event(event: &DriverEvent<'_>) -> Vec<String> {
    match event {
        DriverEvent::Updated { .. } => Vec::new(),
        DriverEvent::ImageRequested(request) => vec![
            format!("{}Cover: requested", indent(1)),
            format!("{}Prompt: {}", indent(2), truncate(&request.body.prompt, 60)),
        ],
        DriverEvent::ImageResolved { applied: true } => Vec::new(),
        DriverEvent::ImageResolved { applied: false } => {
            vec![format!("{}Cover: discarded (stale)", indent(1))]
        }
        DriverEvent::Completed => Vec::new(),
        DriverEvent::Failed(message) => vec![format!("{}Error: {}", indent(1), message)],
    }
}

pub fn print_driver_event(event: &DriverEvent<'_>) {
    for line in format_driver_event(event) {
        println!("{}", line);
    }
}

/// Closing lines for a run.
pub fn format_run_summary(
    summary: &RunSummary,
    cover: Option<&CoverImageState>,
    output: Option<&Path>,
) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(cover) = cover {
        lines.push(format!("{}Cover: {}", indent(1), cover_label(cover)));
    }
    lines.push(format!(
        "{}Chunks: {} ({} updates)",
        indent(1),
        summary.chunks,
        summary.updates
    ));
    lines.push(format!(
        "{}Status: {}",
        indent(1),
        status_label(summary.status.as_ref())
    ));
    if let Some(path) = output {
        lines.push(format!("{}Output: {}", indent(1), path.display()));
    }
    lines
}

pub fn print_run_summary(
    summary: &RunSummary,
    cover: Option<&CoverImageState>,
    output: Option<&Path>,
) {
    for line in format_run_summary(summary, cover, output) {
        println!("{}", line);
    }
}

/// Internal topics an article links to, in order of first mention. Nothing
/// is printed when it links nowhere.
pub fn format_related(links: &[MarkdownLink]) -> Vec<String> {
    let mut topics: Vec<Topic> = Vec::new();
    for link in links {
        match classify_link(&link.href) {
            LinkTarget::Internal(topic) if !topics.contains(&topic) => topics.push(topic),
            _ => {}
        }
    }
    if topics.is_empty() {
        return Vec::new();
    }
    let names: Vec<&str> = topics.iter().map(Topic::as_str).collect();
    vec![format!("{}Related: {}", indent(1), names.join(", "))]
}

pub fn print_related(links: &[MarkdownLink]) {
    for line in format_related(links) {
        println!("{}", line);
    }
}

// ============================================================================
// Table of contents
// ============================================================================

/// One line per heading, indented by level, with its anchor.
pub fn format_toc(headings: &[Heading]) -> Vec<String> {
    if headings.is_empty() {
        return vec!["No sections found.".to_string()];
    }
    headings
        .iter()
        .map(|h| {
            format!(
                "{}{}  #{}",
                indent(usize::from(h.level.saturating_sub(1))),
                h.text,
                h.slug_id
            )
        })
        .collect()
}

pub fn print_toc(headings: &[Heading]) {
    for line in format_toc(headings) {
        println!("{}", line);
    }
}

// ============================================================================
// History and topic lists
// ============================================================================

pub fn format_history(history: &History) -> Vec<String> {
    if history.is_empty() {
        return vec!["No recent topics".to_string()];
    }
    let mut lines = vec!["Recent topics".to_string()];
    for (i, topic) in history.entries().iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), topic));
    }
    lines
}

pub fn print_history(history: &History) {
    for line in format_history(history) {
        println!("{}", line);
    }
}

pub fn format_suggestions(topics: &[&str]) -> Vec<String> {
    if topics.is_empty() {
        return vec!["No matching topics".to_string()];
    }
    topics
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{} {}", format_index(i + 1), t))
        .collect()
}

pub fn print_suggestions(topics: &[&str]) {
    for line in format_suggestions(topics) {
        println!("{}", line);
    }
}
