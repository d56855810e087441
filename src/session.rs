//! Generation sessions and the explorer that owns them.
//!
//! The [`Explorer`] is the engine's state machine for one view (the article
//! explorer or the site visitor). It owns:
//!
//! - the [`Navigator`] (current topic, recent history),
//! - the key-value store history is persisted to,
//! - at most one [`ActiveSession`]: the generation in flight or last
//!   finished, its accumulated content, and its cover image coordinator.
//!
//! The explorer never performs I/O towards generators itself. User actions
//! return a [`GenerationRequest`] for the host to issue; the host feeds what
//! comes back through the event handlers ([`Explorer::apply_chunk`],
//! [`Explorer::complete`], [`Explorer::fail`],
//! [`Explorer::apply_image_result`]). Document updates may in turn produce an
//! [`ImageRequest`], also handed back to the host.
//!
//! ## Staleness
//!
//! Every event names the session it belongs to. Before touching state, each
//! handler checks that the session is still the active one, that its topic is
//! still the current topic, and that it was not cancelled or already
//! finished. Anything else is dropped and logged at debug level. Starting a
//! new session (visit, link, regeneration) therefore supersedes the old one
//! without having to abort its transport.

use crate::backend::{ImageResponse, SiteRequest, TextRequest, UpstreamError};
use crate::config::NewtConfig;
use crate::cover::{CoverCoordinator, CoverImageState, ImageRequest, ImageTicket};
use crate::extract::{self, TitleAndLead};
use crate::navigation::{
    History, HostHistory, InputError, LinkTarget, NavigationState, Navigator, classify_link,
    form_target, topic_from_path,
};
use crate::schema::SiteDocument;
use crate::storage::{KeyValueStore, clear_history, load_history, save_history};
use crate::stream::{MarkdownDocument, SiteStream};
use crate::types::Topic;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

pub use crate::types::SessionId;

/// What a view generates for a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// A markdown article.
    Article,
    /// A structured site document.
    Site,
}

#[derive(Debug, Clone)]
pub struct GenerationSession {
    pub id: SessionId,
    pub topic: Topic,
    pub mode: GenerationMode,
    pub started_at: OffsetDateTime,
    pub cancelled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Streaming,
    Complete,
    /// Non-fatal and retryable through regeneration.
    Failed(String),
    Cancelled,
}

/// Content accumulated by a session.
#[derive(Debug, Clone)]
pub enum SessionContent {
    Article(MarkdownDocument),
    Site {
        stream: SiteStream,
        /// Set once the stream completed and validated.
        document: Option<SiteDocument>,
    },
}

impl SessionContent {
    fn new(mode: GenerationMode) -> Self {
        match mode {
            GenerationMode::Article => SessionContent::Article(MarkdownDocument::new()),
            GenerationMode::Site => SessionContent::Site {
                stream: SiteStream::new(),
                document: None,
            },
        }
    }

    /// The title and lead that key the cover image.
    ///
    /// Site documents use their wiki article. When the finished article has
    /// no title, the wiki subject stands in.
    pub fn canonical_title(&self, complete: bool) -> TitleAndLead {
        match self {
            SessionContent::Article(doc) => doc.settled(complete),
            SessionContent::Site { stream, .. } => {
                let Some(wiki) = stream.snapshot().wiki() else {
                    return TitleAndLead::default();
                };
                let mut settled = wiki
                    .article
                    .map(|article| extract::settled_title_and_lead(article, complete))
                    .unwrap_or_default();
                if settled.title.is_none() && complete {
                    settled.title = wiki.subject.map(str::to_string);
                }
                settled
            }
        }
    }
}

/// A request for the host to start streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub session: SessionId,
    pub topic: Topic,
    pub mode: GenerationMode,
}

impl GenerationRequest {
    pub fn text_request(&self) -> TextRequest {
        TextRequest {
            topic: self.topic.as_str().to_string(),
        }
    }

    pub fn site_request(&self) -> SiteRequest {
        SiteRequest {
            query: self.topic.as_str().to_string(),
        }
    }
}

/// Outcome of feeding one stream event to the explorer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Visible state changed. Carries a cover request when one became due.
    Updated { image_request: Option<ImageRequest> },
    /// Accepted, but nothing visible changed.
    Unchanged,
    /// The session failed on this event.
    Failed(String),
    /// The event belongs to a superseded, cancelled or finished session.
    Stale,
}

/// What following a link inside generated content did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Generate(GenerationRequest),
    External(String),
    Anchor(String),
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub session: GenerationSession,
    pub status: SessionStatus,
    pub content: SessionContent,
    pub cover: CoverCoordinator,
}

impl ActiveSession {
    fn refresh_cover(&mut self, complete: bool) -> Option<ImageRequest> {
        let canonical = self.content.canonical_title(complete);
        self.cover
            .on_document_update(canonical.title.as_deref(), canonical.lead.as_deref())
    }
}

/// Everything a renderer needs, borrowed from the explorer.
#[derive(Debug, Clone, Copy)]
pub struct ExplorerView<'a> {
    pub mode: GenerationMode,
    pub topic: Option<&'a Topic>,
    pub history: &'a History,
    pub session: Option<&'a GenerationSession>,
    pub status: Option<&'a SessionStatus>,
    pub content: Option<&'a SessionContent>,
    pub cover: Option<&'a CoverImageState>,
}

pub struct Explorer<S: KeyValueStore> {
    mode: GenerationMode,
    store: S,
    storage_key: String,
    excerpt_chars: usize,
    image_count: u8,
    link_prefix: String,
    navigator: Navigator,
    active: Option<ActiveSession>,
    next_id: u64,
}

impl<S: KeyValueStore> Explorer<S> {
    /// Build an explorer, restoring history from `store`.
    pub fn new(store: S, config: &NewtConfig, mode: GenerationMode) -> Self {
        let history = load_history(&store, &config.history.storage_key, config.history.capacity);
        Self {
            mode,
            store,
            storage_key: config.history.storage_key.clone(),
            excerpt_chars: config.cover.excerpt_chars,
            image_count: config.cover.count,
            link_prefix: config.render.link_prefix.clone(),
            navigator: Navigator::new(history),
            active: None,
            next_id: 0,
        }
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn navigation(&self) -> &NavigationState {
        self.navigator.state()
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn view(&self) -> ExplorerView<'_> {
        let active = self.active.as_ref();
        ExplorerView {
            mode: self.mode,
            topic: self.navigator.current(),
            history: self.navigator.history(),
            session: active.map(|a| &a.session),
            status: active.map(|a| &a.status),
            content: active.map(|a| &a.content),
            cover: active.map(|a| a.cover.state()),
        }
    }

    // ------------------------------------------------------------------------
    // User actions
    // ------------------------------------------------------------------------

    /// Explore `input`. Blank input changes nothing.
    pub fn visit(&mut self, input: &str) -> Result<GenerationRequest, InputError> {
        let topic = self.navigator.visit(input)?;
        self.persist_history();
        Ok(self.start_session(topic))
    }

    /// Follow a link from generated content. Topic paths written by the
    /// renderer (`<link_prefix><encoded topic>`) lead back to their topic.
    pub fn follow_link(&mut self, href: &str) -> LinkOutcome {
        let href = href.trim();
        if href.starts_with(&self.link_prefix) {
            return match topic_from_path(&self.link_prefix, href) {
                Some(topic) => match self.visit(topic.as_str()) {
                    Ok(request) => LinkOutcome::Generate(request),
                    Err(_) => LinkOutcome::Ignored,
                },
                None => LinkOutcome::Ignored,
            };
        }
        match classify_link(href) {
            LinkTarget::Internal(topic) => match self.visit(topic.as_str()) {
                Ok(request) => LinkOutcome::Generate(request),
                Err(_) => LinkOutcome::Ignored,
            },
            LinkTarget::External(url) => LinkOutcome::External(url),
            LinkTarget::Anchor(id) => LinkOutcome::Anchor(id),
            LinkTarget::Ignored => LinkOutcome::Ignored,
        }
    }

    /// Submit a form from a generated site. Without an action the form
    /// targets the current topic.
    pub fn submit_form(&mut self, action: Option<&str>) -> Option<GenerationRequest> {
        let target = form_target(action, self.navigator.current())?;
        self.visit(target.as_str()).ok()
    }

    /// Start over on the current topic. History is not touched.
    pub fn regenerate(&mut self) -> Option<GenerationRequest> {
        let topic = self.navigator.current()?.clone();
        Some(self.start_session(topic))
    }

    /// Drop the current content. History and the current topic remain.
    pub fn clear(&mut self) {
        if let Some(active) = self.active.take() {
            debug!(session = %active.session.id, "cleared session content");
        }
    }

    /// Stop applying the in-flight stream. Returns whether anything was
    /// streaming.
    pub fn cancel(&mut self) -> bool {
        match self.active.as_mut() {
            Some(active) if active.status == SessionStatus::Streaming => {
                active.session.cancelled = true;
                active.status = SessionStatus::Cancelled;
                info!(session = %active.session.id, "generation cancelled");
                true
            }
            _ => false,
        }
    }

    pub fn back(&self, host: &mut dyn HostHistory) {
        self.navigator.back(host);
    }

    pub fn forward(&self, host: &mut dyn HostHistory) {
        self.navigator.forward(host);
    }

    pub fn clear_history(&mut self) {
        self.navigator.clear_history();
        if let Err(e) = clear_history(&mut self.store, &self.storage_key) {
            warn!(error = %e, "could not clear stored history");
        }
    }

    // ------------------------------------------------------------------------
    // Stream events
    // ------------------------------------------------------------------------

    pub fn apply_chunk(&mut self, session: SessionId, chunk: &str) -> Applied {
        let Some(active) = self.live_mut(session) else {
            debug!(%session, "discarding stale chunk");
            return Applied::Stale;
        };
        match &mut active.content {
            SessionContent::Article(doc) => doc.push(chunk),
            SessionContent::Site { stream, .. } => match stream.push(chunk) {
                Ok(Some(_)) => {}
                Ok(None) => return Applied::Unchanged,
                Err(e) => {
                    let message = e.to_string();
                    warn!(%session, error = %message, "site stream failed");
                    active.status = SessionStatus::Failed(message.clone());
                    return Applied::Failed(message);
                }
            },
        }
        Applied::Updated {
            image_request: active.refresh_cover(false),
        }
    }

    /// The stream ended normally.
    pub fn complete(&mut self, session: SessionId) -> Applied {
        let Some(active) = self.live_mut(session) else {
            debug!(%session, "discarding stale completion");
            return Applied::Stale;
        };
        if let SessionContent::Site { stream, document } = &mut active.content {
            match stream.finish() {
                Ok(doc) => *document = Some(doc),
                Err(e) => {
                    let message = e.to_string();
                    warn!(%session, error = %message, "site document rejected");
                    active.status = SessionStatus::Failed(message.clone());
                    return Applied::Failed(message);
                }
            }
        }
        active.status = SessionStatus::Complete;
        let elapsed = OffsetDateTime::now_utc() - active.session.started_at;
        info!(
            %session,
            elapsed_ms = elapsed.whole_milliseconds() as i64,
            "generation complete"
        );
        Applied::Updated {
            image_request: active.refresh_cover(true),
        }
    }

    /// The stream failed. Content received so far stays visible.
    pub fn fail(&mut self, session: SessionId, error: &UpstreamError) -> Applied {
        let Some(active) = self.live_mut(session) else {
            debug!(%session, "discarding stale failure");
            return Applied::Stale;
        };
        let message = error.to_string();
        warn!(%session, error = %message, "generation failed");
        active.status = SessionStatus::Failed(message.clone());
        Applied::Failed(message)
    }

    /// Apply a cover image result. Returns `false` when it was stale.
    ///
    /// Cancelling a session also drops its in-flight cover: a result that
    /// arrives after `cancel` is discarded even though the session is still
    /// the one on screen.
    pub fn apply_image_result(
        &mut self,
        ticket: &ImageTicket,
        result: Result<ImageResponse, UpstreamError>,
    ) -> bool {
        match self.active.as_mut() {
            Some(active) if active.session.id == ticket.session && !active.session.cancelled => {
                active.cover.on_result(ticket, result)
            }
            _ => {
                debug!(session = %ticket.session, "discarding image result for inactive session");
                false
            }
        }
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn start_session(&mut self, topic: Topic) -> GenerationRequest {
        if let Some(previous) = self
            .active
            .as_ref()
            .filter(|a| a.status == SessionStatus::Streaming)
        {
            info!(session = %previous.session.id, "superseding in-flight session");
        }
        self.next_id += 1;
        let id = SessionId(self.next_id);
        info!(session = %id, topic = %topic, mode = ?self.mode, "starting generation session");
        self.active = Some(ActiveSession {
            session: GenerationSession {
                id,
                topic: topic.clone(),
                mode: self.mode,
                started_at: OffsetDateTime::now_utc(),
                cancelled: false,
            },
            status: SessionStatus::Streaming,
            content: SessionContent::new(self.mode),
            cover: CoverCoordinator::new(id, self.excerpt_chars, self.image_count),
        });
        GenerationRequest {
            session: id,
            topic,
            mode: self.mode,
        }
    }

    /// The active session, if `session` still names it and it is streaming
    /// for the current topic.
    fn live_mut(&mut self, session: SessionId) -> Option<&mut ActiveSession> {
        let current = self.navigator.current();
        self.active.as_mut().filter(|active| {
            active.session.id == session
                && !active.session.cancelled
                && active.status == SessionStatus::Streaming
                && current == Some(&active.session.topic)
        })
    }

    fn persist_history(&mut self) {
        if let Err(e) = save_history(&mut self.store, &self.storage_key, self.navigator.history())
        {
            warn!(error = %e, "could not persist history");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::CoverStatus;
    use crate::storage::MemoryStore;

    fn explorer(mode: GenerationMode) -> Explorer<MemoryStore> {
        Explorer::new(MemoryStore::new(), &NewtConfig::default(), mode)
    }

    fn history(e: &Explorer<MemoryStore>) -> Vec<String> {
        e.navigation()
            .history
            .entries()
            .iter()
            .map(|t| t.as_str().to_string())
            .collect()
    }

    fn article(e: &Explorer<MemoryStore>) -> &str {
        match e.view().content {
            Some(SessionContent::Article(doc)) => doc.text(),
            other => panic!("expected article content, got {other:?}"),
        }
    }

    #[test]
    fn visit_starts_session_and_records_history() {
        let mut e = explorer(GenerationMode::Article);
        let req = e.visit("  Hogwarts ").unwrap();
        assert_eq!(req.topic.as_str(), "Hogwarts");
        assert_eq!(req.text_request().topic, "Hogwarts");
        assert_eq!(history(&e), ["Hogwarts"]);
        assert_eq!(e.view().status, Some(&SessionStatus::Streaming));
        assert_eq!(
            e.store().get("aiwiki:history").as_deref(),
            Some(r#"["Hogwarts"]"#)
        );
    }

    #[test]
    fn blank_visit_changes_nothing() {
        let mut e = explorer(GenerationMode::Article);
        let req = e.visit("Hogwarts").unwrap();
        assert_eq!(e.visit("   "), Err(InputError::EmptyTopic));
        assert_eq!(e.view().session.unwrap().id, req.session);
        assert_eq!(history(&e), ["Hogwarts"]);
    }

    #[test]
    fn history_is_restored_from_store() {
        let mut store = MemoryStore::new();
        store.set("aiwiki:history", r#"["CRISPR","Hogwarts"]"#).unwrap();
        let e = Explorer::new(store, &NewtConfig::default(), GenerationMode::Article);
        assert_eq!(history(&e), ["CRISPR", "Hogwarts"]);
        assert!(e.view().topic.is_none());
    }

    #[test]
    fn cover_requested_once_title_and_lead_settle() {
        let mut e = explorer(GenerationMode::Article);
        let req = e.visit("hogwarts").unwrap();

        let first = e.apply_chunk(req.session, "# Hogwarts\n\nHogwarts is a ");
        assert_eq!(first, Applied::Updated { image_request: None });

        let Applied::Updated {
            image_request: Some(image),
        } = e.apply_chunk(req.session, "school.\n\n## History\n")
        else {
            panic!("expected an image request");
        };
        assert!(image.body.prompt.contains("\"Hogwarts\""));
        assert!(image.body.prompt.contains("Hogwarts is a school."));

        assert_eq!(
            e.apply_chunk(req.session, "Founded long ago.\n"),
            Applied::Updated { image_request: None }
        );
        assert_eq!(
            e.complete(req.session),
            Applied::Updated { image_request: None }
        );
        assert!(e.apply_image_result(
            &image.ticket,
            Ok(ImageResponse {
                images: vec!["data:x".into()]
            })
        ));
        assert_eq!(e.view().cover.unwrap().status, CoverStatus::Ready);
    }

    #[test]
    fn title_only_article_requests_cover_on_completion() {
        let mut e = explorer(GenerationMode::Article);
        let req = e.visit("Stub").unwrap();
        assert_eq!(
            e.apply_chunk(req.session, "# Stub"),
            Applied::Updated { image_request: None }
        );
        let Applied::Updated {
            image_request: Some(image),
        } = e.complete(req.session)
        else {
            panic!("expected an image request on completion");
        };
        assert_eq!(image.ticket.title.as_str(), "Stub");
    }

    #[test]
    fn chunks_from_superseded_session_are_dropped() {
        let mut e = explorer(GenerationMode::Article);
        let old = e.visit("A").unwrap();
        e.apply_chunk(old.session, "# A\n");
        let new = e.visit("B").unwrap();

        assert_eq!(e.apply_chunk(old.session, "more A"), Applied::Stale);
        assert_eq!(e.complete(old.session), Applied::Stale);
        assert_eq!(article(&e), "");
        e.apply_chunk(new.session, "# B\n");
        assert_eq!(article(&e), "# B\n");
    }

    #[test]
    fn regenerate_supersedes_without_touching_history() {
        let mut e = explorer(GenerationMode::Article);
        let first = e.visit("Hogwarts").unwrap();
        e.visit("CRISPR").unwrap();
        e.visit("Hogwarts").unwrap();
        let before = history(&e);

        let again = e.regenerate().unwrap();
        assert_ne!(again.session, first.session);
        assert_eq!(again.topic.as_str(), "Hogwarts");
        assert_eq!(history(&e), before);
    }

    #[test]
    fn regenerate_without_topic_is_none() {
        let mut e = explorer(GenerationMode::Article);
        assert!(e.regenerate().is_none());
    }

    #[test]
    fn regenerate_after_failure_requests_a_fresh_cover() {
        let mut e = explorer(GenerationMode::Article);
        let req = e.visit("Hogwarts").unwrap();
        e.apply_chunk(req.session, "# Hogwarts\n\n## Intro\n");
        e.fail(req.session, &UpstreamError::Request("timeout".into()));
        assert_eq!(
            e.view().status,
            Some(&SessionStatus::Failed("request failed: timeout".into()))
        );

        let again = e.regenerate().unwrap();
        let Applied::Updated {
            image_request: Some(_),
        } = e.apply_chunk(again.session, "# Hogwarts\n\n## Intro\n")
        else {
            panic!("fresh session should request its own cover");
        };
    }

    #[test]
    fn cancel_stops_applying_chunks() {
        let mut e = explorer(GenerationMode::Article);
        let req = e.visit("Hogwarts").unwrap();
        e.apply_chunk(req.session, "# Hog");
        assert!(e.cancel());
        assert!(!e.cancel());
        assert_eq!(e.apply_chunk(req.session, "warts"), Applied::Stale);
        assert_eq!(e.view().status, Some(&SessionStatus::Cancelled));
        assert_eq!(article(&e), "# Hog");
    }

    #[test]
    fn clear_drops_content_but_keeps_topic_and_history() {
        let mut e = explorer(GenerationMode::Article);
        let req = e.visit("Hogwarts").unwrap();
        e.apply_chunk(req.session, "# Hogwarts\n");
        e.clear();
        assert!(e.view().content.is_none());
        assert_eq!(e.view().topic.unwrap().as_str(), "Hogwarts");
        assert_eq!(history(&e), ["Hogwarts"]);
        assert_eq!(e.apply_chunk(req.session, "x"), Applied::Stale);
        assert!(e.regenerate().is_some());
    }

    #[test]
    fn image_result_for_old_session_is_dropped() {
        let mut e = explorer(GenerationMode::Article);
        let old = e.visit("Hogwarts").unwrap();
        let Applied::Updated {
            image_request: Some(image),
        } = e.apply_chunk(old.session, "# Hogwarts\n\n## A\n")
        else {
            panic!("expected an image request");
        };
        e.visit("CRISPR").unwrap();
        assert!(!e.apply_image_result(&image.ticket, Ok(ImageResponse::default())));
        assert_eq!(e.view().cover.unwrap().status, CoverStatus::Idle);
    }

    #[test]
    fn image_result_after_cancel_is_dropped() {
        let mut e = explorer(GenerationMode::Article);
        let req = e.visit("Hogwarts").unwrap();
        let Applied::Updated {
            image_request: Some(image),
        } = e.apply_chunk(req.session, "# Hogwarts\n\n## A\n")
        else {
            panic!("expected an image request");
        };
        assert!(e.cancel());
        assert!(!e.apply_image_result(
            &image.ticket,
            Ok(ImageResponse {
                images: vec!["data:late".into()]
            })
        ));
        let cover = e.view().cover.unwrap();
        assert_eq!(cover.status, CoverStatus::Loading);
        assert!(cover.url.is_none());
    }

    #[test]
    fn rendered_topic_links_lead_back_to_their_topic() {
        let mut e = explorer(GenerationMode::Article);
        e.visit("Hogwarts").unwrap();
        let html = crate::render::render_markdown(
            "See [the castle](<Hogwarts Castle>) and [C++](<C++>).",
            &NewtConfig::default().render,
            None,
        )
        .into_string();
        let hrefs: Vec<&str> = html
            .split(r#"href=""#)
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .collect();
        assert_eq!(hrefs, ["/visit/Hogwarts%20Castle", "/visit/C%2B%2B"]);

        let LinkOutcome::Generate(castle) = e.follow_link(hrefs[0]) else {
            panic!("rendered link should start a generation");
        };
        assert_eq!(castle.topic.as_str(), "Hogwarts Castle");
        let LinkOutcome::Generate(cpp) = e.follow_link(hrefs[1]) else {
            panic!("rendered link should start a generation");
        };
        assert_eq!(cpp.topic.as_str(), "C++");
        assert_eq!(history(&e), ["C++", "Hogwarts Castle", "Hogwarts"]);
        assert_eq!(e.follow_link("/visit/"), LinkOutcome::Ignored);
    }

    #[test]
    fn follow_link_routes_by_target() {
        let mut e = explorer(GenerationMode::Article);
        e.visit("Hogwarts").unwrap();
        let LinkOutcome::Generate(req) = e.follow_link("Quidditch") else {
            panic!("internal link should generate");
        };
        assert_eq!(req.topic.as_str(), "Quidditch");
        assert_eq!(history(&e), ["Quidditch", "Hogwarts"]);
        assert_eq!(
            e.follow_link("https://example.com"),
            LinkOutcome::External("https://example.com".into())
        );
        assert_eq!(e.follow_link("#history"), LinkOutcome::Anchor("history".into()));
        assert_eq!(e.follow_link(""), LinkOutcome::Ignored);
        assert_eq!(e.view().topic.unwrap().as_str(), "Quidditch");
    }

    #[test]
    fn form_submits_to_current_topic_by_default() {
        let mut e = explorer(GenerationMode::Site);
        e.visit("Spotify").unwrap();
        let req = e.submit_form(None).unwrap();
        assert_eq!(req.topic.as_str(), "Spotify");
        let req = e.submit_form(Some("Spotify Premium")).unwrap();
        assert_eq!(req.site_request().query, "Spotify Premium");
    }

    #[test]
    fn clear_history_empties_store() {
        let mut e = explorer(GenerationMode::Article);
        e.visit("A").unwrap();
        e.clear_history();
        assert!(e.navigation().history.is_empty());
        assert_eq!(e.store().get("aiwiki:history"), None);
        assert_eq!(e.view().topic.unwrap().as_str(), "A");
    }

    #[test]
    fn site_session_completes_and_keys_cover_on_wiki_article() {
        let mut e = explorer(GenerationMode::Site);
        let req = e.visit("spotify").unwrap();
        let text = r##"{"title":"Spotify","sections":[{"type":"wiki","name":"NewtWiki","subject":"Spotify","article":"# Spotify\n\nSpotify streams music.\n\n## History\n"}]}"##;
        let mut requests = Vec::new();
        for piece in text.as_bytes().chunks(10) {
            let piece = std::str::from_utf8(piece).unwrap();
            if let Applied::Updated {
                image_request: Some(r),
            } = e.apply_chunk(req.session, piece)
            {
                requests.push(r);
            }
        }
        assert_eq!(e.complete(req.session), Applied::Updated { image_request: None });
        assert_eq!(requests.len(), 1);
        assert!(requests[0].body.prompt.contains("Spotify streams music."));
        match e.view().content {
            Some(SessionContent::Site { document, .. }) => {
                assert_eq!(document.as_ref().unwrap().title, "Spotify");
            }
            other => panic!("expected site content, got {other:?}"),
        }
    }

    #[test]
    fn site_session_falls_back_to_subject() {
        let mut e = explorer(GenerationMode::Site);
        let req = e.visit("Spotify").unwrap();
        e.apply_chunk(
            req.session,
            r#"{"title":"Spotify","sections":[{"type":"wiki","name":"NewtWiki","subject":"Spotify","article":"No heading here."}]}"#,
        );
        let Applied::Updated {
            image_request: Some(image),
        } = e.complete(req.session)
        else {
            panic!("expected a cover request from the subject");
        };
        assert_eq!(image.ticket.title.as_str(), "Spotify");
    }

    #[test]
    fn subject_cover_shows_on_a_wiki_without_heading() {
        let mut e = explorer(GenerationMode::Site);
        let req = e.visit("Spotify").unwrap();
        e.apply_chunk(
            req.session,
            r#"{"title":"Spotify","sections":[{"type":"wiki","name":"NewtWiki","subject":"Spotify","article":"Spotify is a music service.\n\n## History\n"}]}"#,
        );
        let Applied::Updated {
            image_request: Some(image),
        } = e.complete(req.session)
        else {
            panic!("expected a cover request from the subject");
        };
        assert!(e.apply_image_result(
            &image.ticket,
            Ok(ImageResponse {
                images: vec!["data:image/png;base64,c3BvdGlmeQ==".into()]
            })
        ));
        assert_eq!(e.view().cover.unwrap().status, CoverStatus::Ready);

        let page = crate::render::render_page(&e.view(), &NewtConfig::default()).into_string();
        assert!(page.contains(r#"src="data:image/png;base64,c3BvdGlmeQ==""#));
        assert!(page.find("c3BvdGlmeQ").unwrap() < page.find("Spotify is a music service.").unwrap());
    }

    #[test]
    fn malformed_site_stream_fails_session() {
        let mut e = explorer(GenerationMode::Site);
        let req = e.visit("Spotify").unwrap();
        assert!(matches!(
            e.apply_chunk(req.session, "<!doctype html>"),
            Applied::Failed(_)
        ));
        assert!(matches!(e.view().status, Some(SessionStatus::Failed(_))));
        assert_eq!(e.apply_chunk(req.session, "{}"), Applied::Stale);
    }

    #[test]
    fn invalid_site_document_fails_on_completion() {
        let mut e = explorer(GenerationMode::Site);
        let req = e.visit("Spotify").unwrap();
        e.apply_chunk(req.session, r#"{"title":"Spotify","sections":[]}"#);
        assert!(matches!(e.complete(req.session), Applied::Failed(_)));
    }
}
