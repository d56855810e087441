//! Generation collaborators: text, structured site, and image generators.
//!
//! The engine never talks to a model directly. It hands a request to one of
//! the traits below and consumes what comes back:
//!
//! - [`TextGenerator`]: a topic in, a stream of markdown fragments out.
//! - [`SiteGenerator`]: a query in, a stream of JSON text fragments out. The
//!   fragments concatenate to one site document (see [`crate::schema`]).
//! - [`ImageGenerator`]: a prompt in, a list of data URIs out.
//!
//! A [`TextStream`] ends when the iterator is exhausted; that is the terminal
//! completion signal. A fragment-level `Err` fails the session.
//!
//! Two offline implementations ship with the crate so the CLI and the tests
//! run without network access:
//!
//! - [`ReplayBackend`] serves pre-written `<slug>.md` and `<slug>.json` files
//!   from a directory, cut into fixed-size chunks to simulate streaming.
//! - [`PlaceholderImages`] renders a deterministic SVG card per prompt.

use crate::extract::slug_id;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Image counts above this are clamped.
pub const MAX_IMAGE_COUNT: u8 = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("generator returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Image generation returned no images")]
    NoImages,
    #[error("no content for {0}")]
    NotFound(String),
}

impl From<io::Error> for UpstreamError {
    fn from(e: io::Error) -> Self {
        UpstreamError::Request(e.to_string())
    }
}

/// Fragments of generated text; exhaustion means the stream completed.
pub type TextStream = Box<dyn Iterator<Item = Result<String, UpstreamError>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRequest {
    pub topic: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub count: u8,
}

impl ImageGenerationRequest {
    /// Build a request, clamping `count` into `1..=MAX_IMAGE_COUNT`.
    pub fn new(prompt: impl Into<String>, count: u8) -> Self {
        Self {
            prompt: prompt.into(),
            count: count.clamp(1, MAX_IMAGE_COUNT),
        }
    }

    /// Reject requests no generator should see.
    pub fn check(&self) -> Result<(), UpstreamError> {
        if self.prompt.trim().is_empty() {
            return Err(UpstreamError::Status {
                status: 400,
                message: "Missing prompt".to_string(),
            });
        }
        Ok(())
    }
}

/// Images produced for one request, as data URIs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageResponse {
    pub images: Vec<String>,
}

impl ImageResponse {
    /// The image shown as the cover. An empty list is a failure.
    pub fn into_cover(self) -> Result<String, UpstreamError> {
        self.images.into_iter().next().ok_or(UpstreamError::NoImages)
    }
}

pub trait TextGenerator {
    fn stream_article(&self, request: &TextRequest) -> Result<TextStream, UpstreamError>;
}

pub trait SiteGenerator {
    fn stream_site(&self, request: &SiteRequest) -> Result<TextStream, UpstreamError>;
}

pub trait ImageGenerator {
    fn generate(&self, request: &ImageGenerationRequest) -> Result<ImageResponse, UpstreamError>;
}

// ============================================================================
// Replay backend
// ============================================================================

/// Serves pre-written content from a directory.
///
/// `<slug>.md` answers article requests and `<slug>.json` answers site
/// requests, where `<slug>` is the [`slug_id`] of the topic or query.
#[derive(Debug, Clone)]
pub struct ReplayBackend {
    dir: PathBuf,
    chunk_size: usize,
}

impl ReplayBackend {
    pub fn new(dir: impl Into<PathBuf>, chunk_size: usize) -> Self {
        Self {
            dir: dir.into(),
            chunk_size: chunk_size.max(1),
        }
    }

    fn replay(&self, subject: &str, extension: &str) -> Result<TextStream, UpstreamError> {
        let slug = slug_id(subject);
        if slug.is_empty() {
            return Err(UpstreamError::NotFound(subject.to_string()));
        }
        let path = self.dir.join(format!("{slug}.{extension}"));
        if !path.exists() {
            return Err(UpstreamError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(&path)?;
        let chunks = chunk_text(&content, self.chunk_size);
        Ok(Box::new(chunks.into_iter().map(Ok)))
    }
}

impl TextGenerator for ReplayBackend {
    fn stream_article(&self, request: &TextRequest) -> Result<TextStream, UpstreamError> {
        self.replay(&request.topic, "md")
    }
}

impl SiteGenerator for ReplayBackend {
    fn stream_site(&self, request: &SiteRequest) -> Result<TextStream, UpstreamError> {
        self.replay(&request.query, "json")
    }
}

/// Split `text` into pieces of at most `size` chars, never inside a char.
pub fn chunk_text(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|piece| piece.iter().collect())
        .collect()
}

// ============================================================================
// Placeholder images
// ============================================================================

/// Deterministic SVG cover cards, one per requested image.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderImages;

impl ImageGenerator for PlaceholderImages {
    fn generate(&self, request: &ImageGenerationRequest) -> Result<ImageResponse, UpstreamError> {
        request.check()?;
        let label = quoted_subject(&request.prompt).unwrap_or("Cover");
        let images = (0..request.count)
            .map(|variant| placeholder_svg(label, hue(&request.prompt, variant)))
            .map(|svg| {
                format!(
                    "data:image/svg+xml;utf8,{}",
                    utf8_percent_encode(&svg, NON_ALPHANUMERIC)
                )
            })
            .collect();
        Ok(ImageResponse { images })
    }
}

/// The first `"…"` span in a prompt.
fn quoted_subject(prompt: &str) -> Option<&str> {
    let start = prompt.find('"')? + 1;
    let len = prompt[start..].find('"')?;
    Some(&prompt[start..start + len])
}

fn hue(prompt: &str, variant: u8) -> u32 {
    // FNV-1a; stable across runs and platforms.
    let mut hash: u32 = 0x811c_9dc5;
    for byte in prompt.bytes().chain(std::iter::once(variant)) {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash % 360
}

fn placeholder_svg(label: &str, hue: u32) -> String {
    let label = label
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        concat!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="1600" height="900" viewBox="0 0 1600 900">"#,
            r#"<rect width="1600" height="900" fill="hsl({hue},45%,32%)"/>"#,
            r##"<text x="800" y="470" font-family="serif" font-size="72" fill="#fff" text-anchor="middle">{label}</text>"##,
            "</svg>"
        ),
        hue = hue,
        label = label
    )
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every image request and answers from a script.
    ///
    /// Once the script runs out, every request gets one fixed image.
    pub struct MockImages {
        pub requests: Mutex<Vec<ImageGenerationRequest>>,
        script: Mutex<Vec<Result<ImageResponse, UpstreamError>>>,
    }

    impl MockImages {
        pub fn new() -> Self {
            Self::scripted(Vec::new())
        }

        pub fn scripted(mut script: Vec<Result<ImageResponse, UpstreamError>>) -> Self {
            script.reverse();
            Self {
                requests: Mutex::new(Vec::new()),
                script: Mutex::new(script),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.prompt.clone())
                .collect()
        }
    }

    impl ImageGenerator for MockImages {
        fn generate(
            &self,
            request: &ImageGenerationRequest,
        ) -> Result<ImageResponse, UpstreamError> {
            self.requests.lock().unwrap().push(request.clone());
            self.script.lock().unwrap().pop().unwrap_or_else(|| {
                Ok(ImageResponse {
                    images: vec!["data:image/png;base64,AAAA".to_string()],
                })
            })
        }
    }

    /// Streams fixed chunks regardless of the request.
    pub struct MockText {
        pub chunks: Vec<Result<String, UpstreamError>>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockText {
        pub fn new(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| Ok(c.to_string())).collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for MockText {
        fn stream_article(&self, request: &TextRequest) -> Result<TextStream, UpstreamError> {
            self.requests.lock().unwrap().push(request.topic.clone());
            Ok(Box::new(self.chunks.clone().into_iter()))
        }
    }

    impl SiteGenerator for MockText {
        fn stream_site(&self, request: &SiteRequest) -> Result<TextStream, UpstreamError> {
            self.requests.lock().unwrap().push(request.query.clone());
            Ok(Box::new(self.chunks.clone().into_iter()))
        }
    }

    #[test]
    fn image_count_is_clamped() {
        assert_eq!(ImageGenerationRequest::new("p", 0).count, 1);
        assert_eq!(ImageGenerationRequest::new("p", 2).count, 2);
        assert_eq!(ImageGenerationRequest::new("p", 9).count, 2);
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let err = PlaceholderImages
            .generate(&ImageGenerationRequest::new("  ", 1))
            .unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 400, .. }));
    }

    #[test]
    fn empty_image_list_is_an_error() {
        let err = ImageResponse::default().into_cover().unwrap_err();
        assert_eq!(err.to_string(), "Image generation returned no images");
    }

    #[test]
    fn placeholder_is_deterministic_svg() {
        let request = ImageGenerationRequest::new(r#"Hero image of "Hogwarts"."#, 2);
        let a = PlaceholderImages.generate(&request).unwrap();
        let b = PlaceholderImages.generate(&request).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.images.len(), 2);
        assert!(a.images[0].starts_with("data:image/svg+xml;utf8,"));
        assert!(a.images[0].contains("Hogwarts"));
    }

    #[test]
    fn chunking_respects_char_boundaries() {
        let chunks = chunk_text("héllo wörld", 3);
        assert_eq!(chunks.concat(), "héllo wörld");
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
    }

    #[test]
    fn replay_serves_files_by_slug() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("black-holes.md"), "# Black Holes\n\nDense.\n").unwrap();
        let backend = ReplayBackend::new(tmp.path(), 5);

        let stream = backend
            .stream_article(&TextRequest {
                topic: "Black Holes".to_string(),
            })
            .unwrap();
        let text: String = stream.map(Result::unwrap).collect();
        assert_eq!(text, "# Black Holes\n\nDense.\n");
    }

    #[test]
    fn replay_missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let backend = ReplayBackend::new(tmp.path(), 5);
        let result = backend.stream_site(&SiteRequest {
            query: "Spotify".to_string(),
        });
        assert!(matches!(result, Err(UpstreamError::NotFound(_))));
    }
}
