//! Cover image coordination.
//!
//! Each session gets at most one cover image per canonical title. The
//! coordinator watches document updates, decides when a request is due, and
//! decides whether a result that comes back still belongs to what is on
//! screen.
//!
//! ## Request rule
//!
//! On every document update with a title `T`:
//!
//! - status `Loading` or `Ready`: nothing (one image per title).
//! - `requested_for_title == T` (case-insensitive): nothing, even in `Error`
//!   (a failed title is retried through regeneration, not by re-streaming).
//! - otherwise: reset to `Loading` for `T` and emit one [`ImageRequest`].
//!
//! ## Staleness
//!
//! Every request carries an [`ImageTicket`] naming the session, the title and
//! a per-coordinator sequence number. A result is applied only when all three
//! match the current state and the state is still `Loading`. Anything else is
//! dropped without touching the state.

use crate::backend::{ImageGenerationRequest, ImageResponse, UpstreamError};
use crate::extract::lead_excerpt;
use crate::types::{SessionId, Topic};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

/// What the cover slot currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverImageState {
    pub requested_for_title: Option<Topic>,
    pub status: CoverStatus,
    pub url: Option<String>,
    pub error: Option<String>,
}

/// Identity of one outstanding image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTicket {
    pub session: SessionId,
    pub title: Topic,
    pub seq: u64,
}

/// An image request the host should issue, plus the ticket to answer with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub ticket: ImageTicket,
    pub body: ImageGenerationRequest,
}

#[derive(Debug, Clone)]
pub struct CoverCoordinator {
    session: SessionId,
    state: CoverImageState,
    excerpt_chars: usize,
    count: u8,
    seq: u64,
}

impl CoverCoordinator {
    pub fn new(session: SessionId, excerpt_chars: usize, count: u8) -> Self {
        Self {
            session,
            state: CoverImageState::default(),
            excerpt_chars,
            count,
            seq: 0,
        }
    }

    pub fn state(&self) -> &CoverImageState {
        &self.state
    }

    /// Feed the current canonical title and lead. Returns the request to
    /// issue, if one is due.
    pub fn on_document_update(
        &mut self,
        title: Option<&str>,
        lead: Option<&str>,
    ) -> Option<ImageRequest> {
        let title = Topic::parse(title?)?;
        if matches!(self.state.status, CoverStatus::Loading | CoverStatus::Ready) {
            return None;
        }
        if self.state.requested_for_title.as_ref() == Some(&title) {
            return None;
        }

        self.seq += 1;
        self.state = CoverImageState {
            requested_for_title: Some(title.clone()),
            status: CoverStatus::Loading,
            url: None,
            error: None,
        };
        let prompt = build_cover_prompt(title.as_str(), lead, self.excerpt_chars);
        info!(session = %self.session, title = %title, "requesting cover image");
        Some(ImageRequest {
            ticket: ImageTicket {
                session: self.session,
                title,
                seq: self.seq,
            },
            body: ImageGenerationRequest::new(prompt, self.count),
        })
    }

    /// Apply an image result. Returns `false` when the ticket is stale and
    /// the result was dropped.
    pub fn on_result(
        &mut self,
        ticket: &ImageTicket,
        result: Result<ImageResponse, UpstreamError>,
    ) -> bool {
        let current = ticket.session == self.session
            && ticket.seq == self.seq
            && self.state.requested_for_title.as_ref() == Some(&ticket.title)
            && self.state.status == CoverStatus::Loading;
        if !current {
            debug!(
                session = %ticket.session,
                title = %ticket.title,
                "discarding stale cover image result"
            );
            return false;
        }

        match result.and_then(ImageResponse::into_cover) {
            Ok(url) => {
                self.state.status = CoverStatus::Ready;
                self.state.url = Some(url);
            }
            Err(e) => {
                warn!(title = %ticket.title, error = %e, "cover image failed");
                self.state.status = CoverStatus::Error;
                self.state.error = Some(e.to_string());
            }
        }
        true
    }
}

/// The editorial prompt for a cover image.
///
/// The title is quoted verbatim. When a lead exists, its first
/// `excerpt_chars` characters follow as context.
pub fn build_cover_prompt(title: &str, lead: Option<&str>, excerpt_chars: usize) -> String {
    let mut parts = vec![
        format!("Editorial hero image illustrating \"{title}\"."),
        "Considered composition, soft natural light, shallow depth of field,".to_string(),
        "rich color grading, organic textures, generous negative space,".to_string(),
        "cinematic and highly detailed, with no text, watermark or border.".to_string(),
        "Clean background, evocative mood, professional photography.".to_string(),
        "Aspect ratio 16:9.".to_string(),
    ];
    if let Some(lead) = lead.map(str::trim).filter(|l| !l.is_empty()) {
        parts.push(format!("Context: {}", lead_excerpt(lead, excerpt_chars)));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> CoverCoordinator {
        CoverCoordinator::new(SessionId(1), 260, 1)
    }

    fn image(url: &str) -> Result<ImageResponse, UpstreamError> {
        Ok(ImageResponse {
            images: vec![url.to_string()],
        })
    }

    #[test]
    fn no_title_no_request() {
        let mut c = coordinator();
        assert!(c.on_document_update(None, Some("lead")).is_none());
        assert!(c.on_document_update(Some("   "), None).is_none());
        assert_eq!(c.state().status, CoverStatus::Idle);
    }

    #[test]
    fn first_title_requests_once() {
        let mut c = coordinator();
        let req = c
            .on_document_update(Some("Hogwarts"), Some("Hogwarts is a school."))
            .unwrap();
        assert_eq!(c.state().status, CoverStatus::Loading);
        assert!(req.body.prompt.contains("\"Hogwarts\""));
        assert!(req.body.prompt.contains("Context: Hogwarts is a school."));
        assert_eq!(req.body.count, 1);

        assert!(c.on_document_update(Some("Hogwarts"), None).is_none());
        assert!(c.on_document_update(Some("Other"), None).is_none());
    }

    #[test]
    fn ready_result_is_applied() {
        let mut c = coordinator();
        let req = c.on_document_update(Some("Hogwarts"), None).unwrap();
        assert!(c.on_result(&req.ticket, image("data:image/png;base64,AA")));
        assert_eq!(c.state().status, CoverStatus::Ready);
        assert_eq!(c.state().url.as_deref(), Some("data:image/png;base64,AA"));
        assert!(c.on_document_update(Some("Hogwarts"), None).is_none());
    }

    #[test]
    fn empty_result_is_an_error() {
        let mut c = coordinator();
        let req = c.on_document_update(Some("Hogwarts"), None).unwrap();
        assert!(c.on_result(&req.ticket, Ok(ImageResponse::default())));
        assert_eq!(c.state().status, CoverStatus::Error);
        assert_eq!(
            c.state().error.as_deref(),
            Some("Image generation returned no images")
        );
    }

    #[test]
    fn error_does_not_retry_same_title() {
        let mut c = coordinator();
        let req = c.on_document_update(Some("Hogwarts"), None).unwrap();
        c.on_result(&req.ticket, Err(UpstreamError::Request("boom".into())));
        assert!(c.on_document_update(Some("hogwarts"), None).is_none());
        assert!(c.on_document_update(Some("Gryffindor"), None).is_some());
    }

    #[test]
    fn stale_ticket_is_discarded() {
        let mut c = coordinator();
        let first = c.on_document_update(Some("Hogwarts"), None).unwrap();
        assert!(c.on_result(&first.ticket, Err(UpstreamError::Request("boom".into()))));
        let second = c.on_document_update(Some("Gryffindor"), None).unwrap();
        assert!(!c.on_result(&first.ticket, image("old")));
        assert_eq!(c.state().status, CoverStatus::Loading);
        assert!(c.on_result(&second.ticket, image("new")));
        assert_eq!(c.state().url.as_deref(), Some("new"));
    }

    #[test]
    fn ticket_from_other_session_is_discarded() {
        let mut c = coordinator();
        let req = c.on_document_update(Some("Hogwarts"), None).unwrap();
        let foreign = ImageTicket {
            session: SessionId(2),
            ..req.ticket.clone()
        };
        assert!(!c.on_result(&foreign, image("x")));
        assert!(c.on_result(&req.ticket, image("y")));
    }

    #[test]
    fn duplicate_result_is_ignored() {
        let mut c = coordinator();
        let req = c.on_document_update(Some("Hogwarts"), None).unwrap();
        assert!(c.on_result(&req.ticket, image("a")));
        assert!(!c.on_result(&req.ticket, image("b")));
        assert_eq!(c.state().url.as_deref(), Some("a"));
    }

    #[test]
    fn prompt_truncates_lead() {
        let lead = "x".repeat(400);
        let prompt = build_cover_prompt("Long", Some(&lead), 260);
        let context = prompt.split("Context: ").nth(1).unwrap();
        assert_eq!(context.chars().count(), 260);
        assert!(!build_cover_prompt("Long", None, 260).contains("Context"));
    }
}
