//! Blocking pump that runs one generation session to its end.
//!
//! Hosts with an event loop feed the [`Explorer`] themselves. The CLI and the
//! integration tests use [`run`], which opens the stream for a
//! [`GenerationRequest`], applies every fragment, issues cover image requests
//! as soon as they are returned, and finishes with completion or failure.
//! Each step is reported to an observer so callers can print progress or
//! snapshot the rendered page.

use crate::backend::{ImageGenerator, SiteGenerator, TextGenerator};
use crate::cover::ImageRequest;
use crate::session::{Applied, Explorer, GenerationMode, GenerationRequest, SessionStatus};
use crate::storage::KeyValueStore;
use tracing::debug;

/// The collaborators a session may call.
#[derive(Clone, Copy)]
pub struct Generators<'a> {
    pub text: &'a dyn TextGenerator,
    pub site: &'a dyn SiteGenerator,
    pub images: &'a dyn ImageGenerator,
}

/// One observable step of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverEvent<'a> {
    /// A fragment changed the visible document.
    Updated { chars: usize },
    /// A cover image request was issued.
    ImageRequested(&'a ImageRequest),
    /// An image result came back; `applied` is false when it was stale.
    ImageResolved { applied: bool },
    /// Terminal: the stream ended and the document was accepted.
    Completed,
    /// Terminal: the session failed.
    Failed(&'a str),
}

/// Counters for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub chunks: usize,
    pub updates: usize,
    pub image_requests: usize,
    pub images_applied: usize,
    pub status: Option<SessionStatus>,
}

/// Drive `request` to completion.
///
/// A stream that cannot be opened fails the session the same way a
/// mid-stream error does; neither is an error of `run` itself. Fragments
/// arriving after the session went stale (superseded, cancelled, or already
/// finished) are drained without effect.
pub fn run<S, F>(
    explorer: &mut Explorer<S>,
    request: &GenerationRequest,
    generators: Generators<'_>,
    mut observe: F,
) -> RunSummary
where
    S: KeyValueStore,
    F: FnMut(&Explorer<S>, DriverEvent<'_>),
{
    let mut summary = RunSummary::default();
    let session = request.session;
    let opened = match request.mode {
        GenerationMode::Article => generators.text.stream_article(&request.text_request()),
        GenerationMode::Site => generators.site.stream_site(&request.site_request()),
    };

    let outcome = match opened {
        Err(e) => explorer.fail(session, &e),
        Ok(stream) => {
            let mut ended = None;
            for fragment in stream {
                summary.chunks += 1;
                let applied = match fragment {
                    Ok(chunk) => {
                        let applied = explorer.apply_chunk(session, &chunk);
                        if matches!(applied, Applied::Updated { .. }) {
                            summary.updates += 1;
                            observe(explorer, DriverEvent::Updated { chars: chunk.chars().count() });
                        }
                        applied
                    }
                    Err(e) => explorer.fail(session, &e),
                };
                match applied {
                    Applied::Updated {
                        image_request: Some(image),
                    } => issue_image(explorer, &image, generators, &mut summary, &mut observe),
                    Applied::Failed(message) => {
                        ended = Some(Applied::Failed(message));
                        break;
                    }
                    Applied::Stale => debug!(%session, "session no longer live, draining"),
                    _ => {}
                }
            }
            match ended {
                Some(failure) => failure,
                None => explorer.complete(session),
            }
        }
    };

    match &outcome {
        Applied::Updated { image_request } => {
            if let Some(image) = image_request {
                issue_image(explorer, image, generators, &mut summary, &mut observe);
            }
            observe(explorer, DriverEvent::Completed);
        }
        Applied::Failed(message) => observe(explorer, DriverEvent::Failed(message)),
        Applied::Unchanged | Applied::Stale => {}
    }

    summary.status = explorer
        .active()
        .filter(|active| active.session.id == session)
        .map(|active| active.status.clone());
    summary
}

fn issue_image<S, F>(
    explorer: &mut Explorer<S>,
    image: &ImageRequest,
    generators: Generators<'_>,
    summary: &mut RunSummary,
    observe: &mut F,
) where
    S: KeyValueStore,
    F: FnMut(&Explorer<S>, DriverEvent<'_>),
{
    summary.image_requests += 1;
    observe(explorer, DriverEvent::ImageRequested(image));
    let result = generators.images.generate(&image.body);
    let applied = explorer.apply_image_result(&image.ticket, result);
    if applied {
        summary.images_applied += 1;
    }
    observe(explorer, DriverEvent::ImageResolved { applied });
}
