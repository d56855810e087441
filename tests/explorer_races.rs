//! Racing requests: superseded sessions, stale images, cancel and regenerate.

use newt::backend::{ImageResponse, UpstreamError};
use newt::config::NewtConfig;
use newt::cover::{CoverStatus, ImageRequest};
use newt::navigation::HostHistory;
use newt::render::render_page;
use newt::session::{Applied, Explorer, GenerationMode, LinkOutcome, SessionStatus};
use newt::storage::MemoryStore;

const ALPHA: &str = "# Alpha\n\nAlpha is the first letter.\n\n";

fn explorer() -> Explorer<MemoryStore> {
    Explorer::new(MemoryStore::new(), &NewtConfig::default(), GenerationMode::Article)
}

fn image(url: &str) -> Result<ImageResponse, UpstreamError> {
    Ok(ImageResponse {
        images: vec![url.to_string()],
    })
}

fn expect_image(applied: Applied) -> ImageRequest {
    match applied {
        Applied::Updated {
            image_request: Some(request),
        } => request,
        other => panic!("expected an image request, got {other:?}"),
    }
}

#[test]
fn late_image_for_previous_topic_is_discarded() {
    let mut explorer = explorer();
    let first = explorer.visit("Alpha").unwrap();
    let alpha_image = expect_image(explorer.apply_chunk(first.session, ALPHA));

    let second = explorer.visit("Beta").unwrap();
    assert_ne!(first.session, second.session);

    assert!(!explorer.apply_image_result(&alpha_image.ticket, image("data:alpha")));
    assert_eq!(explorer.apply_chunk(first.session, "more alpha"), Applied::Stale);

    let view = explorer.view();
    assert_eq!(view.topic.unwrap().as_str(), "Beta");
    assert_eq!(view.cover.unwrap().status, CoverStatus::Idle);
    assert!(view.cover.unwrap().url.is_none());
}

#[test]
fn regenerate_starts_a_fresh_session_and_cover() {
    let mut explorer = explorer();
    let first = explorer.visit("Alpha").unwrap();
    let old_image = expect_image(explorer.apply_chunk(first.session, ALPHA));

    let second = explorer.regenerate().unwrap();
    assert_ne!(first.session, second.session);
    assert_eq!(second.topic, first.topic);
    assert_eq!(explorer.navigation().history.len(), 1);

    assert!(!explorer.apply_image_result(&old_image.ticket, image("data:old")));
    let new_image = expect_image(explorer.apply_chunk(second.session, ALPHA));
    assert_eq!(new_image.ticket.session, second.session);
    assert!(explorer.apply_image_result(&new_image.ticket, image("data:new")));

    let cover = explorer.view().cover.unwrap();
    assert_eq!(cover.status, CoverStatus::Ready);
    assert_eq!(cover.url.as_deref(), Some("data:new"));
}

#[test]
fn one_cover_request_per_title_while_streaming() {
    let mut explorer = explorer();
    let request = explorer.visit("Alpha").unwrap();
    expect_image(explorer.apply_chunk(request.session, ALPHA));
    for chunk in ["## History\n", "Older than beta.\n", "## Usage\n"] {
        assert_eq!(
            explorer.apply_chunk(request.session, chunk),
            Applied::Updated {
                image_request: None
            }
        );
    }
    assert_eq!(
        explorer.complete(request.session),
        Applied::Updated {
            image_request: None
        }
    );
}

#[test]
fn failed_image_is_not_retried_for_the_same_title() {
    let mut explorer = explorer();
    let request = explorer.visit("Alpha").unwrap();
    let cover = expect_image(explorer.apply_chunk(request.session, ALPHA));
    assert!(explorer.apply_image_result(&cover.ticket, Err(UpstreamError::NoImages)));

    let state = explorer.view().cover.unwrap();
    assert_eq!(state.status, CoverStatus::Error);
    assert_eq!(state.error.as_deref(), Some("Image generation returned no images"));

    assert_eq!(
        explorer.complete(request.session),
        Applied::Updated {
            image_request: None
        }
    );
}

#[test]
fn cancel_stops_applying_and_keeps_content() {
    let mut explorer = explorer();
    let request = explorer.visit("Alpha").unwrap();
    explorer.apply_chunk(request.session, "# Alpha\n\nAlpha is");

    assert!(explorer.cancel());
    assert!(!explorer.cancel());
    assert_eq!(explorer.apply_chunk(request.session, " the first"), Applied::Stale);
    assert_eq!(explorer.complete(request.session), Applied::Stale);
    assert_eq!(explorer.view().status, Some(&SessionStatus::Cancelled));

    let html = render_page(&explorer.view(), &NewtConfig::default()).into_string();
    assert!(html.contains("Generation stopped."));
    assert!(html.contains("Alpha is"));
}

#[test]
fn links_are_intercepted_only_when_internal() {
    let mut explorer = explorer();
    explorer.visit("Alpha").unwrap();

    assert_eq!(
        explorer.follow_link("https://example.com/x"),
        LinkOutcome::External("https://example.com/x".into())
    );
    assert_eq!(
        explorer.follow_link("//cdn.example.com/a"),
        LinkOutcome::External("//cdn.example.com/a".into())
    );
    assert_eq!(
        explorer.follow_link("#history"),
        LinkOutcome::Anchor("history".into())
    );
    assert_eq!(explorer.follow_link("   "), LinkOutcome::Ignored);
    assert_eq!(explorer.navigation().current_topic.as_ref().unwrap().as_str(), "Alpha");

    let LinkOutcome::Generate(request) = explorer.follow_link("Black Holes") else {
        panic!("internal link should start a generation");
    };
    assert_eq!(request.topic.as_str(), "Black Holes");
    let recent: Vec<_> = explorer
        .navigation()
        .history
        .entries()
        .iter()
        .map(|t| t.as_str())
        .collect();
    assert_eq!(recent, ["Black Holes", "Alpha"]);
}

#[test]
fn form_without_action_resubmits_the_current_topic() {
    let mut explorer = explorer();
    let first = explorer.visit("Alpha").unwrap();
    let resubmitted = explorer.submit_form(None).unwrap();
    assert_eq!(resubmitted.topic, first.topic);
    assert_ne!(resubmitted.session, first.session);

    let targeted = explorer.submit_form(Some("Alpha Signup")).unwrap();
    assert_eq!(targeted.topic.as_str(), "Alpha Signup");
}

#[derive(Default)]
struct RecordingHost {
    calls: Vec<&'static str>,
}

impl HostHistory for RecordingHost {
    fn back(&mut self) {
        self.calls.push("back");
    }

    fn forward(&mut self) {
        self.calls.push("forward");
    }
}

#[test]
fn back_and_forward_are_left_to_the_host() {
    let mut explorer = explorer();
    explorer.visit("Alpha").unwrap();
    let mut host = RecordingHost::default();
    explorer.back(&mut host);
    explorer.forward(&mut host);
    assert_eq!(host.calls, ["back", "forward"]);
    assert_eq!(explorer.navigation().current_topic.as_ref().unwrap().as_str(), "Alpha");
}

#[test]
fn clear_drops_content_but_not_history() {
    let mut explorer = explorer();
    let request = explorer.visit("Alpha").unwrap();
    explorer.apply_chunk(request.session, ALPHA);
    explorer.clear();

    let view = explorer.view();
    assert!(view.content.is_none());
    assert_eq!(view.history.len(), 1);
    let html = render_page(&view, &NewtConfig::default()).into_string();
    assert!(html.contains("Pick a topic to explore."));

    explorer.clear_history();
    assert!(explorer.view().history.is_empty());
}
