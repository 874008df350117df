//! Frame grabbing: capture the visible viewport of a window

use super::prober::SimulatedPage;
use crate::WindowId;
use async_trait::async_trait;
use image::ImageFormat;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Marker the browser puts in the error raised when visible-tab captures
/// exceed the per-second quota
pub const RATE_LIMIT_MARKER: &str = "MAX_CAPTURE_VISIBLE_TAB_CALLS_PER_SECOND";

/// Errors reported by a frame grab
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GrabError {
    /// The host's capture rate limit rejected the call; retrying later may succeed
    #[error("capture rate limit exceeded: {0}")]
    RateLimited(String),

    /// Any other failure
    #[error("{0}")]
    Other(String),
}

impl GrabError {
    /// Classify a raw host error message
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.contains(RATE_LIMIT_MARKER) {
            GrabError::RateLimited(message)
        } else {
            GrabError::Other(message)
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, GrabError::RateLimited(_))
    }
}

/// Captures the currently visible viewport of a window as an encoded raster
#[async_trait]
pub trait FrameGrabber: Send + Sync {
    async fn capture_visible(&self, window: WindowId) -> Result<Vec<u8>, GrabError>;
}

/// Grabber that renders a [`SimulatedPage`] at its current scroll position
/// and encodes the frame as PNG
///
/// Outcomes can be scripted: queued faults are consumed one per call before
/// any frame is rendered.
pub struct SimulatedGrabber {
    page: Arc<SimulatedPage>,
    state: Mutex<GrabberState>,
}

#[derive(Default)]
struct GrabberState {
    calls: usize,
    scripted: VecDeque<Option<GrabError>>,
    fail_at: Vec<(u32, GrabError, usize)>,
    captured_offsets: Vec<u32>,
}

impl SimulatedGrabber {
    pub fn new(page: Arc<SimulatedPage>) -> Self {
        Self {
            page,
            state: Mutex::new(GrabberState::default()),
        }
    }

    /// Queue the outcome of the next call: `Some(err)` fails, `None` succeeds
    pub fn script(&self, outcome: Option<GrabError>) {
        self.state.lock().unwrap().scripted.push_back(outcome);
    }

    /// Fail the next `times` grabs taken while the page is scrolled to `offset`
    pub fn fail_at(&self, offset: u32, err: GrabError, times: usize) {
        self.state.lock().unwrap().fail_at.push((offset, err, times));
    }

    /// Number of `capture_visible` calls so far, successful or not
    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    /// Scroll offsets of the frames successfully returned, in order
    pub fn captured_offsets(&self) -> Vec<u32> {
        self.state.lock().unwrap().captured_offsets.clone()
    }
}

#[async_trait]
impl FrameGrabber for SimulatedGrabber {
    async fn capture_visible(&self, _window: WindowId) -> Result<Vec<u8>, GrabError> {
        let offset = self.page.scroll_position();
        {
            let mut state = self.state.lock().unwrap();
            state.calls += 1;
            if let Some(Some(err)) = state.scripted.pop_front() {
                return Err(err);
            }
            if let Some(entry) = state
                .fail_at
                .iter_mut()
                .find(|(at, _, remaining)| *at == offset && *remaining > 0)
            {
                entry.2 -= 1;
                return Err(entry.1.clone());
            }
        }

        let frame = self.page.render_viewport();
        let mut png = Vec::new();
        frame
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| GrabError::Other(format!("frame encoding failed: {}", e)))?;

        self.state.lock().unwrap().captured_offsets.push(offset);
        Ok(png)
    }
}
