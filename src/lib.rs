//! pagesnap
//!
//! Screenshots of web pages: the visible viewport, a user-selected region, or
//! the full scrollable page stitched together from viewport-sized tiles.
//!
//! # Features
//!
//! - **Full-page stitching**: scrolls the page one viewport at a time, paces
//!   grabs to stay under the host's capture rate limit, retries rate-limited
//!   grabs in place and composites the tiles onto a single surface
//! - **Pluggable hosts**: the page prober, frame grabber, compositor and output
//!   sink are traits, with in-memory implementations for tests
//! - **CDP Backend** (default): drives headless Chrome via the DevTools Protocol
//!
//! # Example
//!
//! ```no_run
//! use pagesnap::host::{MemorySink, MemoryPreferences};
//! use pagesnap::{CaptureConfig, CaptureService, Viewport};
//! use std::sync::Arc;
//!
//! # async fn run() -> pagesnap::Result<()> {
//! let browser = pagesnap::Browser::new(Viewport { width: 1280, height: 720 }).await?;
//! let page = browser.new_page().await?;
//! page.goto("https://example.com").await?;
//! let target = page.target().await?;
//!
//! let service = CaptureService::new(
//!     CaptureConfig::default(),
//!     Arc::new(MemorySink::new()),
//!     Arc::new(MemoryPreferences::new()),
//! );
//! let saved = service.capture_full_page(&target, &page, &page).await?;
//! println!("saved {}", saved.location);
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;
pub use error::{Error, Result};

pub mod config;
pub use config::CaptureConfig;

// Collaborator surface: prober, grabber, sink, preferences, windows
pub mod host;

// Compositing of tiles and cropped regions
pub mod rendering;

pub mod capture;
pub mod filename;
pub mod recording;
pub mod restricted;
pub mod selection;
pub mod session;
pub mod stitcher;

#[cfg(feature = "cdp")]
pub mod cdp;

// Async-friendly browser API (worker-thread backed)
#[cfg(feature = "cdp")]
pub mod async_api;

#[cfg(feature = "cdp")]
pub use async_api::{Browser, Page};

pub use capture::CaptureService;
pub use rendering::{Compositor, RasterCompositor};
pub use session::{CancelToken, CaptureGate};
pub use stitcher::{CaptureSession, FullPageStitcher, StitchedImage};

/// Browser viewport used when launching a backend
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Page and viewport size reported by the prober, in CSS pixels
///
/// Probed once per full-page session; the page is assumed not to resize
/// while the session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDimensions {
    pub total_height: u32,
    pub viewport_height: u32,
    pub viewport_width: u32,
}

/// One viewport-sized capture taken at a vertical scroll offset
#[derive(Clone, PartialEq, Eq)]
pub struct Tile {
    /// Encoded raster as returned by the grabber
    pub payload: Vec<u8>,
    /// Scroll offset the tile was captured at
    pub offset: u32,
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tile")
            .field("offset", &self.offset)
            .field("payload_len", &self.payload.len())
            .finish()
    }
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the rectangle lies entirely within a `width` x `height` area
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x
            .checked_add(self.width)
            .map_or(false, |right| right <= width)
            && self
                .y
                .checked_add(self.height)
                .map_or(false, |bottom| bottom <= height)
    }
}

/// Identifier of a host window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// A page to capture: its URL (for restriction checks) and hosting window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPage {
    pub url: String,
    pub window: WindowId,
}

/// Image encoding for composites and cropped regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}
