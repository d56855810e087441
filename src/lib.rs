//! # Newt
//!
//! The rendering engine behind an on-demand encyclopedia: every page is
//! generated the moment someone asks for it. The user types a topic (or
//! follows a link inside a generated page), a generator starts streaming
//! content, and the page fills in while the stream is still running.
//!
//! # Architecture: Session Event Loop
//!
//! One [`session::Explorer`] owns the state of a view. User actions produce
//! requests; generator output comes back as events:
//!
//! ```text
//! visit / link / regenerate  →  GenerationRequest   (host opens a stream)
//! chunk, chunk, …, end       →  apply_chunk / complete / fail
//! settled title + lead       →  ImageRequest        (host calls the image generator)
//! image result               →  apply_image_result
//! any state                  →  render::render_page
//! ```
//!
//! The explorer performs no I/O of its own, which keeps every transition
//! testable without a network. [`driver::run`] is the blocking host used by
//! the CLI and the integration tests.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | `Topic` (case-insensitive identity) and `SessionId` |
//! | [`extract`] | Title, lead, headings, slugs and links from markdown text |
//! | [`partial_json`] | Parses a prefix of a JSON document into a best-effort value |
//! | [`schema`] | Site document types: partial (mid-stream) and validated (complete) |
//! | [`stream`] | Accumulates a markdown or structured stream, one snapshot per change |
//! | [`cover`] | One cover image per canonical title, with stale-result rejection |
//! | [`navigation`] | Current topic, bounded recent history, link classification |
//! | [`storage`] | Key-value persistence for history; corrupt state degrades to empty |
//! | [`session`] | The explorer state machine and its staleness rules |
//! | [`backend`] | Generator traits plus offline replay and placeholder backends |
//! | [`driver`] | Pumps one session to completion against a set of generators |
//! | [`render`] | Maud templates for articles, site documents and the page shell |
//! | [`config`] | `config.toml` loading, validation, merging, and CSS generation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Snapshots, Not Patches
//!
//! Structured output is re-parsed from the full accumulated text on every
//! fragment ([`partial_json::parse_partial`]). There is no patch protocol to
//! get out of sync: each snapshot is a pure function of the bytes received so
//! far, so later snapshots can only add to earlier ones.
//!
//! ## Supersede, Don't Abort
//!
//! A new request never waits for the old stream to stop. Every event carries
//! its session id and is dropped when that session is no longer the active
//! one for the current topic. Abandoned transports can keep delivering; they
//! just stop mattering.
//!
//! ## Settled Titles Drive Images
//!
//! A cover image is requested only once the article's title and lead can no
//! longer change ([`extract::settled_title_and_lead`]). Requesting earlier
//! would key the image on a half-streamed title and a prompt without context.
//!
//! ## Storage Never Blocks
//!
//! History persistence failures are logged and ignored. A corrupt store reads
//! as empty history.

pub mod backend;
pub mod config;
pub mod cover;
pub mod driver;
pub mod extract;
pub mod navigation;
pub mod output;
pub mod partial_json;
pub mod render;
pub mod schema;
pub mod session;
pub mod storage;
pub mod stream;
pub mod types;
