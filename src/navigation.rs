//! Topic navigation: current topic, recent-topic history, link interception.
//!
//! The [`Navigator`] owns which topic is on screen and the bounded list of
//! recently visited topics. It knows nothing about generation; the
//! [`Explorer`](crate::session::Explorer) asks it for the next topic and
//! starts a session for it.
//!
//! Links inside generated content are classified by [`classify_link`]:
//! anything without a URL scheme and not protocol-relative names another
//! topic and is explored in place. Back/forward traversal belongs to the
//! host (browser, terminal shell) and goes through [`HostHistory`].

use crate::types::Topic;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use rand::Rng;
use thiserror::Error;

pub const DEFAULT_HISTORY_CAPACITY: usize = 8;

/// Starting points offered before anything has been visited.
pub const SUGGESTED_TOPICS: &[&str] = &[
    "Quantum Computing",
    "Photosynthesis",
    "The Renaissance",
    "Blockchain",
    "Black Holes",
    "CRISPR",
    "Game Theory",
    "Machine Learning",
    "Climate Change",
    "French Revolution",
    "Neural Networks",
    "Graph Theory",
    "Microplastics",
    "RNA Vaccines",
    "Higgs Boson",
    "Hogwarts",
];

/// Characters left alone when a topic becomes a path segment. Matches what
/// browsers leave unescaped in a URI component.
const TOPIC_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("topic must not be blank")]
    EmptyTopic,
}

// ============================================================================
// History
// ============================================================================

/// Most-recent-first list of visited topics, bounded and de-duplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    entries: Vec<Topic>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild from stored entries (most recent first). Duplicates after the
    /// first occurrence are dropped and the list is cut to `capacity`.
    pub fn from_entries(entries: impl IntoIterator<Item = Topic>, capacity: usize) -> Self {
        let mut history = History::new(capacity);
        for topic in entries {
            if !history.entries.contains(&topic) && history.entries.len() < history.capacity {
                history.entries.push(topic);
            }
        }
        history
    }

    /// Move `topic` to the front. An existing entry keeps its original
    /// casing.
    pub fn push(&mut self, topic: Topic) {
        let front = match self.entries.iter().position(|t| *t == topic) {
            Some(idx) => self.entries.remove(idx),
            None => topic,
        };
        self.entries.insert(0, front);
        self.entries.truncate(self.capacity);
    }

    pub fn entries(&self) -> &[Topic] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ============================================================================
// Links and forms
// ============================================================================

/// Where a link inside generated content leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Another topic, explored in place.
    Internal(Topic),
    /// Left to the host (new tab, external browser).
    External(String),
    /// A heading in the current document.
    Anchor(String),
    /// Blank href.
    Ignored,
}

fn has_scheme(href: &str) -> bool {
    let Some(colon) = href.find(':') else {
        return false;
    };
    let scheme = &href[..colon];
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
}

pub fn classify_link(href: &str) -> LinkTarget {
    let href = href.trim();
    if href.is_empty() {
        return LinkTarget::Ignored;
    }
    if let Some(anchor) = href.strip_prefix('#') {
        return LinkTarget::Anchor(anchor.to_string());
    }
    if href.starts_with("//") || has_scheme(href) {
        return LinkTarget::External(href.to_string());
    }
    match Topic::parse(href) {
        Some(topic) => LinkTarget::Internal(topic),
        None => LinkTarget::Ignored,
    }
}

/// The topic a form submits to: its action when present, else the current
/// topic.
pub fn form_target(action: Option<&str>, current: Option<&Topic>) -> Option<Topic> {
    action
        .and_then(Topic::parse)
        .or_else(|| current.cloned())
}

/// Native back/forward traversal, owned by the host.
pub trait HostHistory {
    fn back(&mut self);
    fn forward(&mut self);
}

// ============================================================================
// Navigator
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    pub current_topic: Option<Topic>,
    pub history: History,
}

#[derive(Debug, Clone)]
pub struct Navigator {
    state: NavigationState,
}

impl Navigator {
    pub fn new(history: History) -> Self {
        Self {
            state: NavigationState {
                current_topic: None,
                history,
            },
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn current(&self) -> Option<&Topic> {
        self.state.current_topic.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.state.history
    }

    /// Make `input` the current topic and move it to the front of history.
    /// Blank input leaves everything unchanged.
    pub fn visit(&mut self, input: &str) -> Result<Topic, InputError> {
        let topic = Topic::parse(input).ok_or(InputError::EmptyTopic)?;
        self.state.history.push(topic.clone());
        self.state.current_topic = Some(topic.clone());
        Ok(topic)
    }

    pub fn clear_history(&mut self) {
        self.state.history.clear();
    }

    pub fn back(&self, host: &mut dyn HostHistory) {
        host.back();
    }

    pub fn forward(&self, host: &mut dyn HostHistory) {
        host.forward();
    }
}

// ============================================================================
// Topic discovery and paths
// ============================================================================

/// Suggested topics containing `input` (case-insensitive), at most `limit`.
/// Blank input matches everything.
pub fn suggest(input: &str, limit: usize) -> Vec<&'static str> {
    let needle = input.trim().to_lowercase();
    SUGGESTED_TOPICS
        .iter()
        .copied()
        .filter(|t| t.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}

pub fn random_topic<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    SUGGESTED_TOPICS[rng.gen_range(0..SUGGESTED_TOPICS.len())]
}

/// The path a topic is served under: `prefix` + the encoded topic.
pub fn topic_path(prefix: &str, topic: &Topic) -> String {
    format!(
        "{prefix}{}",
        utf8_percent_encode(topic.as_str(), TOPIC_SEGMENT)
    )
}

/// Recover a topic from a served path. A literal `+` after `prefix` reads as
/// a space; the rest is percent-decoded, so an encoded `%2B` stays a plus.
pub fn topic_from_path(prefix: &str, path: &str) -> Option<Topic> {
    let encoded = path.strip_prefix(prefix)?.replace('+', " ");
    let decoded = percent_decode_str(&encoded).decode_utf8_lossy();
    Topic::parse(&decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn t(s: &str) -> Topic {
        Topic::parse(s).unwrap()
    }

    fn names(history: &History) -> Vec<&str> {
        history.entries().iter().map(Topic::as_str).collect()
    }

    #[test]
    fn history_moves_revisit_to_front() {
        let mut h = History::new(8);
        for topic in ["A", "B", "C"] {
            h.push(t(topic));
        }
        h.push(t("a"));
        assert_eq!(names(&h), ["A", "C", "B"]);
    }

    #[test]
    fn history_is_bounded() {
        let mut h = History::new(8);
        for i in 0..12 {
            h.push(t(&format!("Topic {i}")));
        }
        assert_eq!(h.len(), 8);
        assert_eq!(h.entries()[0].as_str(), "Topic 11");
        assert_eq!(h.entries()[7].as_str(), "Topic 4");
    }

    #[test]
    fn history_from_entries_dedups_and_caps() {
        let h = History::from_entries(
            ["Hogwarts", "hogwarts", "CRISPR", "Graph Theory"].map(t),
            2,
        );
        assert_eq!(names(&h), ["Hogwarts", "CRISPR"]);
    }

    #[test]
    fn classify_links() {
        assert_eq!(classify_link("Magic"), LinkTarget::Internal(t("Magic")));
        assert_eq!(
            classify_link("Hogwarts Castle"),
            LinkTarget::Internal(t("Hogwarts Castle"))
        );
        assert_eq!(
            classify_link("https://example.com"),
            LinkTarget::External("https://example.com".into())
        );
        assert_eq!(
            classify_link("mailto:a@b.c"),
            LinkTarget::External("mailto:a@b.c".into())
        );
        assert_eq!(
            classify_link("//cdn.example.com/x"),
            LinkTarget::External("//cdn.example.com/x".into())
        );
        assert_eq!(classify_link("#history"), LinkTarget::Anchor("history".into()));
        assert_eq!(classify_link("  "), LinkTarget::Ignored);
    }

    #[test]
    fn colon_after_space_is_not_a_scheme() {
        assert_eq!(
            classify_link("Star Wars: Episode IV"),
            LinkTarget::Internal(t("Star Wars: Episode IV"))
        );
    }

    #[test]
    fn form_falls_back_to_current_topic() {
        let current = t("Spotify");
        assert_eq!(form_target(Some("Playlists"), Some(&current)), Some(t("Playlists")));
        assert_eq!(form_target(None, Some(&current)), Some(t("Spotify")));
        assert_eq!(form_target(Some(" "), Some(&current)), Some(t("Spotify")));
        assert_eq!(form_target(None, None), None);
    }

    #[test]
    fn visit_rejects_blank_and_keeps_state() {
        let mut nav = Navigator::new(History::new(8));
        nav.visit("Hogwarts").unwrap();
        assert_eq!(nav.visit("   "), Err(InputError::EmptyTopic));
        assert_eq!(nav.current(), Some(&t("Hogwarts")));
        assert_eq!(nav.history().len(), 1);
    }

    struct Host {
        moves: Vec<&'static str>,
    }

    impl HostHistory for Host {
        fn back(&mut self) {
            self.moves.push("back");
        }
        fn forward(&mut self) {
            self.moves.push("forward");
        }
    }

    #[test]
    fn back_and_forward_delegate_to_host() {
        let mut nav = Navigator::new(History::new(8));
        nav.visit("A").unwrap();
        nav.visit("B").unwrap();
        let mut host = Host { moves: Vec::new() };
        nav.back(&mut host);
        nav.forward(&mut host);
        assert_eq!(host.moves, ["back", "forward"]);
        assert_eq!(names(nav.history()), ["B", "A"]);
        assert_eq!(nav.current(), Some(&t("B")));
    }

    #[test]
    fn suggest_filters_case_insensitively() {
        assert_eq!(suggest("theory", 6), ["Game Theory", "Graph Theory"]);
        assert_eq!(suggest("", 6).len(), 6);
        assert!(suggest("zzz", 6).is_empty());
    }

    #[test]
    fn random_topic_is_a_suggestion() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert!(SUGGESTED_TOPICS.contains(&random_topic(&mut rng)));
        }
    }

    #[test]
    fn topic_paths_round_trip() {
        let topic = t("Hogwarts Castle & Grounds");
        let path = topic_path("/visit/", &topic);
        assert_eq!(path, "/visit/Hogwarts%20Castle%20%26%20Grounds");
        assert_eq!(topic_from_path("/visit/", &path), Some(topic));
        assert_eq!(
            topic_from_path("/visit/", "/visit/Black+Holes"),
            Some(t("Black Holes"))
        );
        assert_eq!(topic_from_path("/visit/", "/other/x"), None);
    }

    #[test]
    fn encoded_plus_survives_the_round_trip() {
        let path = topic_path("/visit/", &t("C++"));
        assert_eq!(path, "/visit/C%2B%2B");
        assert_eq!(topic_from_path("/visit/", &path).unwrap().as_str(), "C++");
    }
}
