//! Shared identity types.
//!
//! A [`Topic`] is the subject string that drives a generation request. It is
//! stored exactly as the user (or a link) typed it, minus surrounding
//! whitespace, but compares case-insensitively: `"hogwarts"` and `"Hogwarts"`
//! are the same topic everywhere identity matters (history, stale-result
//! checks, image de-duplication).
//!
//! A [`SessionId`] names one generation request and everything that hangs off
//! it (streamed document, cover image). Ids are never reused within a view.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};

/// A trimmed, case-preserving subject string with case-insensitive identity.
#[derive(Clone)]
pub struct Topic {
    text: String,
    folded: String,
}

impl Topic {
    /// Trim `input` and build a topic. Returns `None` for blank input.
    pub fn parse(input: &str) -> Option<Topic> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        Some(Topic {
            text: text.to_string(),
            folded: text.to_lowercase(),
        })
    }

    /// The stored casing.
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for Topic {
    fn eq(&self, other: &Self) -> bool {
        self.folded == other.folded
    }
}

impl Eq for Topic {}

impl Hash for Topic {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.folded.hash(state);
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({:?})", self.text)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for Topic {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Topic::parse(&raw).ok_or_else(|| serde::de::Error::custom("topic must not be blank"))
    }
}

/// Identifier of one generation session within a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
