//! Site document schema: partial snapshots and the validated final form.
//!
//! A structured response describes one web page as a title, optional nav
//! links, and an ordered list of sections. Each section is a tagged union on
//! its `type` field:
//!
//! | `type` | Required | Optional |
//! |---|---|---|
//! | `hero` | `hero.headline` | `hero.subheadline`, `hero.cta` |
//! | `text` | `markdown` | |
//! | `grid` | `items` (1–12 cards, each with `title`) | card `body`, `target` |
//! | `feature` | `title`, `body` | |
//! | `form` | `form.fields` (≥1, each with `label`, `name`) | `title`, `submitLabel`, `actionTarget`, `successMessage` |
//! | `feed` | `feed.posts` (1–20, each with `author`, `content`) | `title`, post `handle`, `target`, `likes`, `timestamp` |
//! | `wiki` | `name` = [`WIKI_SECTION_NAME`], `subject`, `article` | |
//! | `footer` | | `links` |
//!
//! Mid-stream, every field and every list element may be missing, so the
//! partial types ([`PartialSiteDocument`] and friends) are built leniently
//! from a [`serde_json::Value`]: a field of the wrong JSON type is treated as
//! absent. Only the terminal snapshot goes through [`validate`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Fixed name of the wiki section.
pub const WIKI_SECTION_NAME: &str = "NewtWiki";

const SECTION_KINDS: &[&str] = &[
    "hero", "text", "grid", "feature", "form", "feed", "wiki", "footer",
];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("document has no title")]
    MissingTitle,
    #[error("document has no renderable sections")]
    NoSections,
    #[error("nav link {index}: {message}")]
    InvalidNav { index: usize, message: String },
    #[error("section {index} ({kind}): {message}")]
    InvalidSection {
        index: usize,
        kind: String,
        message: String,
    },
}

// ============================================================================
// Complete document
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDocument {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nav: Option<Vec<Link>>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Section {
    Hero {
        hero: Hero,
    },
    Text {
        markdown: String,
    },
    Grid {
        items: Vec<Card>,
    },
    Feature {
        title: String,
        body: String,
    },
    Form {
        form: Form,
    },
    Feed {
        feed: Feed,
    },
    Wiki {
        name: String,
        subject: String,
        article: String,
    },
    Footer {
        #[serde(default)]
        links: Option<Vec<Link>>,
    },
}

impl Section {
    pub fn kind(&self) -> &'static str {
        match self {
            Section::Hero { .. } => "hero",
            Section::Text { .. } => "text",
            Section::Grid { .. } => "grid",
            Section::Feature { .. } => "feature",
            Section::Form { .. } => "form",
            Section::Feed { .. } => "feed",
            Section::Wiki { .. } => "wiki",
            Section::Footer { .. } => "footer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cta {
    pub label: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub headline: String,
    #[serde(default)]
    pub subheadline: Option<String>,
    #[serde(default)]
    pub cta: Option<Cta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Email,
    Password,
    Textarea,
}

impl FieldKind {
    pub fn parse(raw: &str) -> Option<FieldKind> {
        match raw {
            "text" => Some(FieldKind::Text),
            "email" => Some(FieldKind::Email),
            "password" => Some(FieldKind::Password),
            "textarea" => Some(FieldKind::Textarea),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Email => "email",
            FieldKind::Password => "password",
            FieldKind::Textarea => "textarea",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub label: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub placeholder: Option<String>,
}

fn default_submit_label() -> String {
    "Submit".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    #[serde(default)]
    pub title: Option<String>,
    pub fields: Vec<FormField>,
    #[serde(default = "default_submit_label")]
    pub submit_label: String,
    #[serde(default)]
    pub action_target: Option<String>,
    #[serde(default)]
    pub success_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub author: String,
    #[serde(default)]
    pub handle: Option<String>,
    pub content: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub likes: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    #[serde(default)]
    pub title: Option<String>,
    pub posts: Vec<Post>,
}

/// Validate a terminal snapshot against the full schema.
///
/// Sections with an unrecognized `type` are skipped; the document must still
/// contain at least one section afterwards.
pub fn validate(value: &Value) -> Result<SiteDocument, SchemaError> {
    let object = value.as_object().ok_or(SchemaError::NotAnObject)?;
    let title = object
        .get("title")
        .and_then(Value::as_str)
        .ok_or(SchemaError::MissingTitle)?
        .to_string();

    let nav = match object.get("nav") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => {
            let mut links = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let link = serde_json::from_value::<Link>(item.clone()).map_err(|e| {
                    SchemaError::InvalidNav {
                        index,
                        message: e.to_string(),
                    }
                })?;
                links.push(link);
            }
            Some(links)
        }
        Some(_) => {
            return Err(SchemaError::InvalidNav {
                index: 0,
                message: "nav must be a list".into(),
            });
        }
    };

    let raw_sections = object
        .get("sections")
        .and_then(Value::as_array)
        .ok_or(SchemaError::NoSections)?;
    let mut sections = Vec::with_capacity(raw_sections.len());
    for (index, raw) in raw_sections.iter().enumerate() {
        let kind = raw.get("type").and_then(Value::as_str).unwrap_or_default();
        if !SECTION_KINDS.contains(&kind) {
            debug!(index, kind, "skipping section with unknown type");
            continue;
        }
        let invalid = |message: String| SchemaError::InvalidSection {
            index,
            kind: kind.to_string(),
            message,
        };
        let section: Section =
            serde_json::from_value(raw.clone()).map_err(|e| invalid(e.to_string()))?;
        check_section(&section).map_err(invalid)?;
        sections.push(section);
    }
    if sections.is_empty() {
        return Err(SchemaError::NoSections);
    }
    Ok(SiteDocument {
        title,
        nav,
        sections,
    })
}

fn check_section(section: &Section) -> Result<(), String> {
    match section {
        Section::Grid { items } if items.is_empty() || items.len() > 12 => {
            Err(format!("grid needs 1-12 items, got {}", items.len()))
        }
        Section::Form { form } if form.fields.is_empty() => {
            Err("form needs at least one field".into())
        }
        Section::Feed { feed } if feed.posts.is_empty() || feed.posts.len() > 20 => {
            Err(format!("feed needs 1-20 posts, got {}", feed.posts.len()))
        }
        Section::Wiki { name, .. } if name != WIKI_SECTION_NAME => Err(format!(
            "wiki section must be named {WIKI_SECTION_NAME:?}, got {name:?}"
        )),
        _ => Ok(()),
    }
}

// ============================================================================
// Partial snapshot
// ============================================================================

/// A mid-stream document: everything optional, at every depth.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialSiteDocument {
    pub title: Option<String>,
    pub nav: Option<Vec<Option<PartialLink>>>,
    pub sections: Option<Vec<Option<PartialSection>>>,
}

/// A mid-stream section, keyed by its discriminant.
#[derive(Debug, Clone, PartialEq)]
pub enum PartialSection {
    /// The `type` field has not arrived (or is still a prefix of a known kind).
    Pending,
    Hero {
        hero: Option<PartialHero>,
    },
    Text {
        markdown: Option<String>,
    },
    Grid {
        items: Option<Vec<Option<PartialCard>>>,
    },
    Feature {
        title: Option<String>,
        body: Option<String>,
    },
    Form {
        form: Option<PartialForm>,
    },
    Feed {
        feed: Option<PartialFeed>,
    },
    Wiki {
        name: Option<String>,
        subject: Option<String>,
        article: Option<String>,
    },
    Footer {
        links: Option<Vec<Option<PartialLink>>>,
    },
    Unknown(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialLink {
    pub label: Option<String>,
    pub href: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialCta {
    pub label: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialHero {
    pub headline: Option<String>,
    pub subheadline: Option<String>,
    pub cta: Option<PartialCta>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialCard {
    pub title: Option<String>,
    pub body: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialFormField {
    pub label: Option<String>,
    pub name: Option<String>,
    pub kind: Option<FieldKind>,
    pub placeholder: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialForm {
    pub title: Option<String>,
    pub fields: Option<Vec<Option<PartialFormField>>>,
    pub submit_label: Option<String>,
    pub action_target: Option<String>,
    pub success_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialPost {
    pub author: Option<String>,
    pub handle: Option<String>,
    pub content: Option<String>,
    pub target: Option<String>,
    pub likes: Option<f64>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialFeed {
    pub title: Option<String>,
    pub posts: Option<Vec<Option<PartialPost>>>,
}

/// Borrowed view of the first wiki section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WikiView<'a> {
    pub name: Option<&'a str>,
    pub subject: Option<&'a str>,
    pub article: Option<&'a str>,
}

fn text(object: &Map<String, Value>, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn child<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    object.get(key).and_then(Value::as_object)
}

fn list<T>(
    object: &Map<String, Value>,
    key: &str,
    item: impl Fn(&Map<String, Value>) -> T,
) -> Option<Vec<Option<T>>> {
    object
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(|v| v.as_object().map(&item)).collect())
}

impl PartialLink {
    fn from_map(m: &Map<String, Value>) -> Self {
        Self {
            label: text(m, "label"),
            href: text(m, "href"),
        }
    }
}

impl PartialHero {
    fn from_map(m: &Map<String, Value>) -> Self {
        Self {
            headline: text(m, "headline"),
            subheadline: text(m, "subheadline"),
            cta: child(m, "cta").map(|c| PartialCta {
                label: text(c, "label"),
                target: text(c, "target"),
            }),
        }
    }
}

impl PartialCard {
    fn from_map(m: &Map<String, Value>) -> Self {
        Self {
            title: text(m, "title"),
            body: text(m, "body"),
            target: text(m, "target"),
        }
    }
}

impl PartialForm {
    fn from_map(m: &Map<String, Value>) -> Self {
        Self {
            title: text(m, "title"),
            fields: list(m, "fields", |f| PartialFormField {
                label: text(f, "label"),
                name: text(f, "name"),
                kind: text(f, "type").as_deref().and_then(FieldKind::parse),
                placeholder: text(f, "placeholder"),
            }),
            submit_label: text(m, "submitLabel"),
            action_target: text(m, "actionTarget"),
            success_message: text(m, "successMessage"),
        }
    }
}

impl PartialFeed {
    fn from_map(m: &Map<String, Value>) -> Self {
        Self {
            title: text(m, "title"),
            posts: list(m, "posts", |p| PartialPost {
                author: text(p, "author"),
                handle: text(p, "handle"),
                content: text(p, "content"),
                target: text(p, "target"),
                likes: p.get("likes").and_then(Value::as_f64),
                timestamp: text(p, "timestamp"),
            }),
        }
    }
}

impl PartialSection {
    fn from_map(m: &Map<String, Value>) -> Self {
        let Some(kind) = m.get("type").and_then(Value::as_str) else {
            return PartialSection::Pending;
        };
        match kind {
            "hero" => PartialSection::Hero {
                hero: child(m, "hero").map(PartialHero::from_map),
            },
            "text" => PartialSection::Text {
                markdown: text(m, "markdown"),
            },
            "grid" => PartialSection::Grid {
                items: list(m, "items", PartialCard::from_map),
            },
            "feature" => PartialSection::Feature {
                title: text(m, "title"),
                body: text(m, "body"),
            },
            "form" => PartialSection::Form {
                form: child(m, "form").map(PartialForm::from_map),
            },
            "feed" => PartialSection::Feed {
                feed: child(m, "feed").map(PartialFeed::from_map),
            },
            "wiki" => PartialSection::Wiki {
                name: text(m, "name"),
                subject: text(m, "subject"),
                article: text(m, "article"),
            },
            "footer" => PartialSection::Footer {
                links: list(m, "links", PartialLink::from_map),
            },
            // A streamed discriminant arrives a few characters at a time.
            other if SECTION_KINDS.iter().any(|k| k.starts_with(other)) => {
                PartialSection::Pending
            }
            other => PartialSection::Unknown(other.to_string()),
        }
    }

    fn populated_fields(&self) -> usize {
        match self {
            PartialSection::Pending | PartialSection::Unknown(_) => 0,
            PartialSection::Hero { hero } => {
                1 + hero.as_ref().map_or(0, |h| {
                    some(&h.headline)
                        + some(&h.subheadline)
                        + h.cta
                            .as_ref()
                            .map_or(0, |c| some(&c.label) + some(&c.target))
                })
            }
            PartialSection::Text { markdown } => 1 + some(markdown),
            PartialSection::Grid { items } => {
                1 + each(items, |c| some(&c.title) + some(&c.body) + some(&c.target))
            }
            PartialSection::Feature { title, body } => 1 + some(title) + some(body),
            PartialSection::Form { form } => {
                1 + form.as_ref().map_or(0, |f| {
                    some(&f.title)
                        + some(&f.submit_label)
                        + some(&f.action_target)
                        + some(&f.success_message)
                        + each(&f.fields, |x| {
                            some(&x.label) + some(&x.name) + some(&x.kind) + some(&x.placeholder)
                        })
                })
            }
            PartialSection::Feed { feed } => {
                1 + feed.as_ref().map_or(0, |f| {
                    some(&f.title)
                        + each(&f.posts, |p| {
                            some(&p.author)
                                + some(&p.handle)
                                + some(&p.content)
                                + some(&p.target)
                                + some(&p.likes)
                                + some(&p.timestamp)
                        })
                })
            }
            PartialSection::Wiki {
                name,
                subject,
                article,
            } => 1 + some(name) + some(subject) + some(article),
            PartialSection::Footer { links } => {
                1 + each(links, |l| some(&l.label) + some(&l.href))
            }
        }
    }
}

fn some<T>(field: &Option<T>) -> usize {
    usize::from(field.is_some())
}

fn each<T>(items: &Option<Vec<Option<T>>>, count: impl Fn(&T) -> usize) -> usize {
    items
        .iter()
        .flatten()
        .flatten()
        .map(count)
        .sum()
}

impl PartialSiteDocument {
    /// Build a snapshot from whatever the stream has produced so far.
    /// Anything that is not an object yields an empty snapshot.
    pub fn from_value(value: &Value) -> Self {
        let Some(m) = value.as_object() else {
            return Self::default();
        };
        Self {
            title: text(m, "title"),
            nav: list(m, "nav", PartialLink::from_map),
            sections: list(m, "sections", PartialSection::from_map),
        }
    }

    /// Number of populated leaf fields (a known section discriminant counts
    /// as one).
    pub fn populated_fields(&self) -> usize {
        some(&self.title)
            + each(&self.nav, |l| some(&l.label) + some(&l.href))
            + self
                .sections
                .iter()
                .flatten()
                .flatten()
                .map(PartialSection::populated_fields)
                .sum::<usize>()
    }

    /// The first wiki section, if one has started.
    pub fn wiki(&self) -> Option<WikiView<'_>> {
        self.sections
            .iter()
            .flatten()
            .flatten()
            .find_map(|section| match section {
                PartialSection::Wiki {
                    name,
                    subject,
                    article,
                } => Some(WikiView {
                    name: name.as_deref(),
                    subject: subject.as_deref(),
                    article: article.as_deref(),
                }),
                _ => None,
            })
    }
}

impl From<&SiteDocument> for PartialSiteDocument {
    fn from(doc: &SiteDocument) -> Self {
        // Round-trips through the wire shape so both views agree exactly.
        match serde_json::to_value(doc) {
            Ok(value) => PartialSiteDocument::from_value(&value),
            Err(_) => PartialSiteDocument::default(),
        }
    }
}
