//! Structural extraction from (possibly incomplete) markdown.
//!
//! Every function here is a pure function of the text it is given. The
//! article arrives token by token, so callers re-run extraction on the whole
//! accumulated text after every chunk; there is no parsing state to carry
//! between calls.
//!
//! ## Line Rules
//!
//! Text is split on `\n`, with a trailing `\r` removed from each line.
//!
//! - A **title line** is `#`, one or more whitespace characters, then text.
//! - A **heading** for table-of-contents purposes is 1–3 `#` followed by
//!   whitespace and non-blank text (`####` and deeper are ignored).
//! - Any 1–6 `#` run followed by whitespace ends the lead paragraph.
//!
//! ## Slug Ids
//!
//! [`slug_id`] lower-cases, drops everything outside `[a-z0-9\s-]`, trims and
//! joins whitespace runs with a single `-`:
//!
//! - `"Black Holes!!"` → `"black-holes"`
//! - `"  Game   Theory "` → `"game-theory"`
//!
//! Equal heading texts produce equal ids. Collisions are left as they are.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

/// Title and lead paragraph of an article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleAndLead {
    pub title: Option<String>,
    pub lead: Option<String>,
}

/// A level 1–3 heading in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub level: u8,
    pub text: String,
    pub slug_id: String,
}

/// An inline markdown link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownLink {
    pub label: String,
    pub href: String,
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Returns `(level, rest)` when `line` is a run of 1..=`max_level` hashes
/// followed by at least one whitespace character.
fn heading_marker(line: &str, max_level: usize) -> Option<(u8, &str)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > max_level {
        return None;
    }
    let rest = &line[hashes..];
    let first = rest.chars().next()?;
    if !first.is_whitespace() {
        return None;
    }
    Some((hashes as u8, rest))
}

fn title_of(line: &str) -> Option<String> {
    match heading_marker(line, 1) {
        Some((_, rest)) => {
            let title = rest.trim();
            (!title.is_empty()).then(|| title.to_string())
        }
        None => None,
    }
}

fn ends_lead(line: &str) -> bool {
    heading_marker(line, 6).is_some()
}

/// Extract the title and lead paragraph.
///
/// The first non-blank line must be a level-1 heading, otherwise nothing is
/// recognized. The lead is the run of non-blank, non-heading lines after the
/// title (and any blank lines), joined with spaces.
pub fn extract_title_and_lead(text: &str) -> TitleAndLead {
    let lines = split_lines(text);
    let mut i = 0;
    while i < lines.len() && is_blank(lines[i]) {
        i += 1;
    }
    let Some(title) = lines.get(i).and_then(|line| title_of(line)) else {
        return TitleAndLead::default();
    };
    i += 1;
    while i < lines.len() && is_blank(lines[i]) {
        i += 1;
    }
    let mut para = Vec::new();
    while i < lines.len() && !is_blank(lines[i]) && !ends_lead(lines[i]) {
        para.push(lines[i]);
        i += 1;
    }
    let lead = para.join(" ").trim().to_string();
    TitleAndLead {
        title: Some(title),
        lead: (!lead.is_empty()).then_some(lead),
    }
}

/// Title and lead, reported only once neither can change any more.
///
/// While text is still streaming, the title line may be cut mid-word and the
/// lead may still be growing. This returns the same result as
/// [`extract_title_and_lead`], but only after the title line is terminated
/// and the lead paragraph is either terminated (blank line or heading) or
/// known to be absent (a heading directly follows the title). With
/// `complete` set, whatever is present is final.
pub fn settled_title_and_lead(text: &str, complete: bool) -> TitleAndLead {
    if complete {
        return extract_title_and_lead(text);
    }
    let lines = split_lines(text);
    // The last element is the unterminated tail (possibly empty).
    let terminated = |idx: usize| idx + 1 < lines.len();

    let mut i = 0;
    while i < lines.len() && is_blank(lines[i]) {
        i += 1;
    }
    if i >= lines.len() || !terminated(i) || title_of(lines[i]).is_none() {
        return TitleAndLead::default();
    }
    i += 1;
    while i < lines.len() && terminated(i) && is_blank(lines[i]) {
        i += 1;
    }
    loop {
        let Some(line) = lines.get(i) else {
            return TitleAndLead::default();
        };
        if ends_lead(line) {
            break;
        }
        if !terminated(i) {
            // Unknown yet whether this line continues the paragraph.
            return TitleAndLead::default();
        }
        if is_blank(line) {
            break;
        }
        i += 1;
    }
    extract_title_and_lead(text)
}

/// Enumerate level 1–3 headings in document order, duplicates included.
pub fn extract_headings(text: &str) -> Vec<Heading> {
    split_lines(text)
        .into_iter()
        .filter_map(|line| {
            let (level, rest) = heading_marker(line, 3)?;
            let text = rest.trim();
            if text.is_empty() {
                return None;
            }
            Some(Heading {
                level,
                text: text.to_string(),
                slug_id: slug_id(text),
            })
        })
        .collect()
}

/// Anchor id for a heading text.
pub fn slug_id(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '-')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Inline links in document order.
pub fn extract_links(text: &str) -> Vec<MarkdownLink> {
    let mut links = Vec::new();
    let mut open: Option<(String, String)> = None;
    for event in Parser::new(text) {
        match event {
            Event::Start(Tag::Link { dest_url, .. }) => {
                open = Some((dest_url.to_string(), String::new()));
            }
            Event::Text(t) | Event::Code(t) => {
                if let Some((_, label)) = open.as_mut() {
                    label.push_str(&t);
                }
            }
            Event::End(TagEnd::Link) => {
                if let Some((href, label)) = open.take() {
                    links.push(MarkdownLink { label, href });
                }
            }
            _ => {}
        }
    }
    links
}

/// The first `max_chars` characters of a lead, for prompt contexts.
pub fn lead_excerpt(lead: &str, max_chars: usize) -> String {
    lead.chars().take(max_chars).collect()
}
