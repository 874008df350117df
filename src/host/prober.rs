//! Viewport probing and scroll control inside the target page

use crate::PageDimensions;
use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use std::collections::HashSet;
use std::sync::Mutex;
use thiserror::Error;

/// Errors reported by a prober round-trip
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProbeError {
    /// The page-side script could not be reached
    #[error("page did not respond: {0}")]
    Unreachable(String),

    /// The page answered with something unusable
    #[error("unexpected response from page: {0}")]
    BadResponse(String),
}

/// Page-side collaborator that measures the page and moves its scroll position
///
/// `scroll_to` resolves only once the scroll has happened and every image
/// inside the newly visible band has settled (loaded or failed).
#[async_trait]
pub trait ViewportProber: Send + Sync {
    async fn probe_dimensions(&self) -> Result<PageDimensions, ProbeError>;
    async fn scroll_to(&self, offset: u32) -> Result<(), ProbeError>;
    async fn reset_scroll(&self) -> Result<(), ProbeError>;
}

/// In-memory page: a full-height bitmap plus a scroll cursor
///
/// Pairs with [`SimulatedGrabber`](super::SimulatedGrabber), which renders
/// the rows under the current scroll position. Faults can be injected per
/// operation to exercise the stitcher's error paths.
pub struct SimulatedPage {
    content: RgbaImage,
    viewport_height: u32,
    state: Mutex<PageState>,
}

#[derive(Default)]
struct PageState {
    scroll: u32,
    scroll_log: Vec<u32>,
    resets: usize,
    probe_fault: Option<ProbeError>,
    scroll_faults: HashSet<u32>,
    reset_fault: bool,
    hang_on_probe: bool,
}

impl SimulatedPage {
    /// A page whose content is `content`, viewed through a window of
    /// `content.width()` x `viewport_height`
    pub fn new(content: RgbaImage, viewport_height: u32) -> Self {
        Self {
            content,
            viewport_height,
            state: Mutex::new(PageState::default()),
        }
    }

    /// A page of `width` x `total_height` where every row is painted with a
    /// color derived from its y coordinate
    pub fn striped(width: u32, total_height: u32, viewport_height: u32) -> Self {
        let content = RgbaImage::from_fn(width, total_height, |_, y| row_color(y));
        Self::new(content, viewport_height)
    }

    pub fn content(&self) -> &RgbaImage {
        &self.content
    }

    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    /// Current vertical scroll position
    pub fn scroll_position(&self) -> u32 {
        self.state.lock().unwrap().scroll
    }

    /// Every offset passed to `scroll_to`, in call order
    pub fn scroll_log(&self) -> Vec<u32> {
        self.state.lock().unwrap().scroll_log.clone()
    }

    pub fn reset_count(&self) -> usize {
        self.state.lock().unwrap().resets
    }

    pub fn fail_probe(&self, err: ProbeError) {
        self.state.lock().unwrap().probe_fault = Some(err);
    }

    /// Never answer `probe_dimensions`
    pub fn hang_on_probe(&self) {
        self.state.lock().unwrap().hang_on_probe = true;
    }

    pub fn fail_scroll_at(&self, offset: u32) {
        self.state.lock().unwrap().scroll_faults.insert(offset);
    }

    pub fn fail_reset(&self) {
        self.state.lock().unwrap().reset_fault = true;
    }

    /// Render the viewport at the current scroll position
    ///
    /// Rows past the end of the content are painted white.
    pub fn render_viewport(&self) -> RgbaImage {
        let scroll = self.scroll_position();
        RgbaImage::from_fn(self.content.width(), self.viewport_height, |x, y| {
            match scroll.checked_add(y) {
                Some(row) if row < self.content.height() => *self.content.get_pixel(x, row),
                _ => Rgba([255, 255, 255, 255]),
            }
        })
    }
}

/// Deterministic, row-unique color used by [`SimulatedPage::striped`]
pub fn row_color(y: u32) -> Rgba<u8> {
    Rgba([(y % 251) as u8, ((y / 251) % 251) as u8, 0x40, 255])
}

#[async_trait]
impl ViewportProber for SimulatedPage {
    async fn probe_dimensions(&self) -> Result<PageDimensions, ProbeError> {
        let hang = {
            let state = self.state.lock().unwrap();
            if let Some(err) = &state.probe_fault {
                return Err(err.clone());
            }
            state.hang_on_probe
        };
        if hang {
            std::future::pending::<()>().await;
        }
        Ok(PageDimensions {
            total_height: self.content.height(),
            viewport_height: self.viewport_height,
            viewport_width: self.content.width(),
        })
    }

    async fn scroll_to(&self, offset: u32) -> Result<(), ProbeError> {
        let mut state = self.state.lock().unwrap();
        state.scroll_log.push(offset);
        if state.scroll_faults.contains(&offset) {
            return Err(ProbeError::Unreachable(format!("no reply to scroll at {}", offset)));
        }
        state.scroll = offset;
        Ok(())
    }

    async fn reset_scroll(&self) -> Result<(), ProbeError> {
        let mut state = self.state.lock().unwrap();
        if state.reset_fault {
            return Err(ProbeError::Unreachable("tab closed".into()));
        }
        state.scroll = 0;
        state.resets += 1;
        Ok(())
    }
}
