//! Image retrieval for report rows.
//!
//! [`ImageResolver::resolve`] never fails: every problem becomes an
//! [`ImageOutcome`] that maps to the content of a single table cell.

use crate::report::document::{Cell, EmbeddedImage};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;

const USER_AGENT: &str = concat!("inspection-reports/", env!("CARGO_PKG_VERSION"));

pub const NO_IMAGE_LABEL: &str = "No image available";
pub const INVALID_TYPE_LABEL: &str = "Invalid image type";
/// Followed by the reason the image could not be used.
pub const LOAD_FAILURE_PREFIX: &str = "Failed to load image: ";

/// Size every embedded image is drawn at, in pixels. Aspect ratio is not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageSize {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Request(String),

    #[error("failed to read response body: {0}")]
    Body(#[from] std::io::Error),
}

pub trait ImageFetcher {
    fn fetch(&self, locator: &str) -> Result<FetchedImage, FetchError>;
}

/// Blocking HTTP fetcher. No timeout is set, so a stalled server stalls the run.
pub struct HttpImageFetcher {
    agent: ureq::Agent,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().user_agent(USER_AGENT).build(),
        }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, locator: &str) -> Result<FetchedImage, FetchError> {
        let resp = self
            .agent
            .get(locator)
            .call()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let content_type = resp.content_type().to_string();
        let len = resp
            .header("Content-Length")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(0);
        let mut bytes = Vec::with_capacity(len);
        resp.into_reader().read_to_end(&mut bytes)?;
        Ok(FetchedImage {
            content_type,
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Embedded {
        bytes: Vec<u8>,
        width: u32,
        height: u32,
    },
    InvalidType(String),
    FetchFailed(String),
    Absent,
}

impl ImageOutcome {
    pub fn into_cell(self) -> Cell {
        match self {
            ImageOutcome::Embedded {
                bytes,
                width,
                height,
            } => Cell::Image(EmbeddedImage {
                bytes,
                width,
                height,
            }),
            ImageOutcome::InvalidType(_) => Cell::Text(INVALID_TYPE_LABEL.to_string()),
            ImageOutcome::FetchFailed(reason) => {
                Cell::Text(format!("{}{}", LOAD_FAILURE_PREFIX, reason))
            }
            ImageOutcome::Absent => Cell::Text(NO_IMAGE_LABEL.to_string()),
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, ImageOutcome::Embedded { .. })
    }
}

pub struct ImageResolver {
    fetcher: Box<dyn ImageFetcher>,
    size: ImageSize,
}

impl ImageResolver {
    pub fn new(fetcher: Box<dyn ImageFetcher>, size: ImageSize) -> Self {
        Self { fetcher, size }
    }

    pub fn resolve(&self, locator: &str) -> ImageOutcome {
        let locator = locator.trim();
        if locator.is_empty() {
            return ImageOutcome::Absent;
        }

        let fetched = match self.fetcher.fetch(locator) {
            Ok(fetched) => fetched,
            Err(e) => {
                let mut reason = e.to_string();
                if reason.is_empty() {
                    reason = format!("request to {} failed", locator);
                }
                warn!("image {} could not be fetched: {}", locator, reason);
                return ImageOutcome::FetchFailed(reason);
            }
        };

        if !fetched.content_type.to_ascii_lowercase().starts_with("image/") {
            warn!("image {} has content type {}", locator, fetched.content_type);
            return ImageOutcome::InvalidType(fetched.content_type);
        }

        debug!("fetched {} bytes from {}", fetched.bytes.len(), locator);
        ImageOutcome::Embedded {
            bytes: fetched.bytes,
            width: self.size.width,
            height: self.size.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell as Counter;
    use std::rc::Rc;

    struct StubFetcher {
        reply: fn() -> Result<FetchedImage, FetchError>,
        calls: Rc<Counter<usize>>,
    }

    impl ImageFetcher for StubFetcher {
        fn fetch(&self, _locator: &str) -> Result<FetchedImage, FetchError> {
            self.calls.set(self.calls.get() + 1);
            (self.reply)()
        }
    }

    fn resolver(reply: fn() -> Result<FetchedImage, FetchError>) -> (ImageResolver, Rc<Counter<usize>>) {
        let calls = Rc::new(Counter::new(0));
        let fetcher = StubFetcher {
            reply,
            calls: Rc::clone(&calls),
        };
        (
            ImageResolver::new(Box::new(fetcher), ImageSize { width: 80, height: 60 }),
            calls,
        )
    }

    fn png() -> Result<FetchedImage, FetchError> {
        Ok(FetchedImage {
            content_type: "image/png".to_string(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        })
    }

    fn html() -> Result<FetchedImage, FetchError> {
        Ok(FetchedImage {
            content_type: "text/html".to_string(),
            bytes: b"<html></html>".to_vec(),
        })
    }

    fn unreachable_host() -> Result<FetchedImage, FetchError> {
        Err(FetchError::Request("Connection refused".to_string()))
    }

    #[test]
    fn empty_locator_is_absent_without_fetching() {
        let (resolver, calls) = resolver(png);
        assert_eq!(resolver.resolve(""), ImageOutcome::Absent);
        assert_eq!(resolver.resolve("   "), ImageOutcome::Absent);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn png_is_embedded_at_configured_size() {
        let (resolver, calls) = resolver(png);
        assert_eq!(
            resolver.resolve("http://x/a.png"),
            ImageOutcome::Embedded {
                bytes: vec![0x89, b'P', b'N', b'G'],
                width: 80,
                height: 60,
            }
        );
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn html_is_an_invalid_type() {
        let (resolver, _) = resolver(html);
        assert_eq!(
            resolver.resolve("http://x/page"),
            ImageOutcome::InvalidType("text/html".to_string())
        );
    }

    #[test]
    fn fetch_error_carries_a_reason() {
        let (resolver, _) = resolver(unreachable_host);
        match resolver.resolve("http://x/a.png") {
            ImageOutcome::FetchFailed(reason) => assert_eq!(reason, "Connection refused"),
            other => panic!("expected FetchFailed, got {:?}", other),
        }
    }

    #[test]
    fn outcomes_map_to_cells() {
        assert_eq!(
            ImageOutcome::Absent.into_cell(),
            Cell::Text("No image available".to_string())
        );
        assert_eq!(
            ImageOutcome::InvalidType("text/html".to_string()).into_cell(),
            Cell::Text("Invalid image type".to_string())
        );
        assert_eq!(
            ImageOutcome::FetchFailed("timed out".to_string()).into_cell(),
            Cell::Text("Failed to load image: timed out".to_string())
        );
        assert!(matches!(
            ImageOutcome::Embedded {
                bytes: vec![1],
                width: 1,
                height: 1
            }
            .into_cell(),
            Cell::Image(_)
        ));
    }
}
