//! Full-page capture: scroll, grab, stitch
//!
//! The stitcher walks the page one viewport at a time. Each step scrolls,
//! waits for the page to settle, and grabs the visible frame; grabs are paced
//! because the host's capture API is globally rate limited. Rate-limited grabs
//! are retried at the same offset after a back-off. Any other failure aborts
//! the session and no partial image is produced.
//!
//! Once every tile is in, they are drawn top to bottom onto a white surface of
//! `viewport_width x total_height`, the page scroll is reset, and the surface
//! is encoded.
//!
//! Exactly one prober or grabber request is outstanding at any time, each one
//! bounded by `round_trip_timeout_ms` and interruptible through a
//! [`CancelToken`].

use crate::host::{FrameGrabber, GrabError, ViewportProber};
use crate::rendering::{draw_height, Compositor};
use crate::session::CancelToken;
use crate::{CaptureConfig, Error, OutputFormat, PageDimensions, Rect, Result, Tile, WindowId};
use log::{debug, error, info, warn};
use std::future::Future;
use std::time::Duration;

/// Tiles gathered by one scan pass, plus the scroll cursor
#[derive(Debug)]
pub struct CaptureSession {
    dimensions: PageDimensions,
    tiles: Vec<Tile>,
    cursor: u32,
}

impl CaptureSession {
    fn new(dimensions: PageDimensions) -> Self {
        Self {
            dimensions,
            tiles: Vec::new(),
            cursor: 0,
        }
    }

    pub fn dimensions(&self) -> PageDimensions {
        self.dimensions
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Offsets of the captured tiles, in capture order
    pub fn offsets(&self) -> Vec<u32> {
        self.tiles.iter().map(|t| t.offset).collect()
    }

    /// Next offset the scan would capture
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.dimensions.total_height
    }

    pub fn into_tiles(self) -> Vec<Tile> {
        self.tiles
    }

    fn record(&mut self, tile: Tile) {
        self.cursor = tile.offset.saturating_add(self.dimensions.viewport_height);
        self.tiles.push(tile);
    }
}

/// Encoded full-page image
#[derive(Clone)]
pub struct StitchedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub tiles: usize,
}

impl std::fmt::Debug for StitchedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StitchedImage")
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("tiles", &self.tiles)
            .field("data_len", &self.data.len())
            .finish()
    }
}

enum Interrupt {
    Cancelled,
    TimedOut,
}

/// Drives one full-page capture against a prober, grabber and compositor
pub struct FullPageStitcher<'a, P: ?Sized, G: ?Sized, C> {
    prober: &'a P,
    grabber: &'a G,
    compositor: &'a C,
    config: &'a CaptureConfig,
    cancel: CancelToken,
}

impl<'a, P, G, C> FullPageStitcher<'a, P, G, C>
where
    P: ViewportProber + ?Sized,
    G: FrameGrabber + ?Sized,
    C: Compositor,
{
    pub fn new(prober: &'a P, grabber: &'a G, compositor: &'a C, config: &'a CaptureConfig) -> Self {
        Self {
            prober,
            grabber,
            compositor,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Capture the whole page shown in `window`
    pub async fn capture(&self, window: WindowId) -> Result<StitchedImage> {
        let result = self.run(window).await;
        if let Err(e) = &result {
            error!("Full-page capture aborted ({}): {}", e.kind(), e);
        }
        result
    }

    async fn run(&self, window: WindowId) -> Result<StitchedImage> {
        let dims = self.probe().await?;
        info!(
            "Full-page capture of {}: {}x{} page, {}px viewport",
            window, dims.viewport_width, dims.total_height, dims.viewport_height
        );

        let mut surface = self
            .compositor
            .allocate_surface(dims.viewport_width, dims.total_height)?;

        let session = self.scan(window, dims).await?;
        let tiles = session.tiles().len();
        self.composite_into(&mut surface, session)?;

        self.reset_scroll().await;

        let data = self.compositor.encode(&surface, self.config.output_format)?;
        info!(
            "Stitched {} tiles into a {}x{} image ({} bytes)",
            tiles,
            dims.viewport_width,
            dims.total_height,
            data.len()
        );
        Ok(StitchedImage {
            data,
            format: self.config.output_format,
            width: dims.viewport_width,
            height: dims.total_height,
            tiles,
        })
    }

    /// Ask the page for its dimensions
    pub async fn probe(&self) -> Result<PageDimensions> {
        let dims = match self.round_trip(self.prober.probe_dimensions()).await {
            Ok(Ok(dims)) => dims,
            Ok(Err(e)) => return Err(Error::ProbeFailure(e.to_string())),
            Err(i) => {
                return Err(self.interrupted(i, |ms| {
                    Error::ProbeFailure(format!("no answer within {}ms", ms))
                }))
            }
        };
        if dims.total_height == 0 || dims.viewport_height == 0 || dims.viewport_width == 0 {
            return Err(Error::ProbeFailure(format!(
                "page reported degenerate dimensions (total {}px, viewport {}x{})",
                dims.total_height, dims.viewport_width, dims.viewport_height
            )));
        }
        Ok(dims)
    }

    /// Scan pass: scroll to each offset and grab the viewport there
    pub async fn scan(&self, window: WindowId, dims: PageDimensions) -> Result<CaptureSession> {
        let mut session = CaptureSession::new(dims);
        let mut rate_limited = 0u32;

        while !session.is_complete() {
            let offset = session.cursor();
            self.scroll_and_settle(offset).await?;

            match self.grab(window, offset).await? {
                Ok(payload) => {
                    debug!("Captured tile at {}px ({} bytes)", offset, payload.len());
                    rate_limited = 0;
                    session.record(Tile { payload, offset });
                    if !session.is_complete() {
                        self.pause(self.config.inter_tile_delay()).await?;
                    }
                }
                Err(GrabError::RateLimited(reason)) => {
                    rate_limited += 1;
                    if rate_limited > self.config.max_rate_limit_retries {
                        return Err(Error::CaptureFailure(format!(
                            "rate limit at offset {}px did not clear after {} retries: {}",
                            offset, self.config.max_rate_limit_retries, reason
                        )));
                    }
                    warn!(
                        "Rate limited at offset {}px (retry {}/{}), backing off {}ms",
                        offset, rate_limited, self.config.max_rate_limit_retries,
                        self.config.rate_limit_backoff_ms
                    );
                    self.pause(self.config.rate_limit_backoff()).await?;
                }
                Err(GrabError::Other(reason)) => {
                    return Err(Error::CaptureFailure(format!(
                        "frame grab at offset {}px failed: {}",
                        offset, reason
                    )));
                }
            }
        }

        Ok(session)
    }

    /// Composite pass: draw every tile at its offset, clamping the last one
    pub fn composite_into(&self, surface: &mut C::Surface, session: CaptureSession) -> Result<()> {
        let dims = session.dimensions();
        for tile in session.into_tiles() {
            let image = self.compositor.decode(&tile.payload)?;
            let (frame_w, frame_h) = self.compositor.image_size(&image);

            let wanted = draw_height(dims.total_height, dims.viewport_height, tile.offset);
            let height = wanted.min(frame_h);
            let width = dims.viewport_width.min(frame_w);
            if height < wanted || width < dims.viewport_width {
                warn!(
                    "Tile at {}px is {}x{}, short of the expected {}x{}; drawing what is there",
                    tile.offset, frame_w, frame_h, dims.viewport_width, wanted
                );
            }

            self.compositor
                .draw_region(surface, &image, Rect::new(0, 0, width, height), 0, tile.offset)?;
        }
        Ok(())
    }

    /// Scroll the page back to the top; failure is only logged
    pub async fn reset_scroll(&self) -> bool {
        let timeout = self.config.round_trip_timeout();
        match tokio::time::timeout(timeout, self.prober.reset_scroll()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("Could not reset page scroll: {}", e);
                false
            }
            Err(_) => {
                warn!("Could not reset page scroll: no answer within {}ms", timeout.as_millis());
                false
            }
        }
    }

    async fn scroll_and_settle(&self, offset: u32) -> Result<()> {
        match self.round_trip(self.prober.scroll_to(offset)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(Error::ScrollFailure {
                    offset,
                    reason: e.to_string(),
                })
            }
            Err(i) => {
                return Err(self.interrupted(i, |ms| Error::ScrollFailure {
                    offset,
                    reason: format!("no answer within {}ms", ms),
                }))
            }
        }
        self.pause(self.config.settle_delay()).await
    }

    async fn grab(&self, window: WindowId, offset: u32) -> Result<std::result::Result<Vec<u8>, GrabError>> {
        self.round_trip(self.grabber.capture_visible(window))
            .await
            .map_err(|i| {
                self.interrupted(i, |ms| {
                    Error::CaptureFailure(format!(
                        "frame grab at offset {}px got no answer within {}ms",
                        offset, ms
                    ))
                })
            })
    }

    /// Await one collaborator request, bounded by the round-trip timeout
    async fn round_trip<F: Future>(&self, fut: F) -> std::result::Result<F::Output, Interrupt> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupt::Cancelled),
            res = tokio::time::timeout(self.config.round_trip_timeout(), fut) => {
                res.map_err(|_| Interrupt::TimedOut)
            }
        }
    }

    fn interrupted(&self, interrupt: Interrupt, on_timeout: impl FnOnce(u64) -> Error) -> Error {
        match interrupt {
            Interrupt::Cancelled => Error::Cancelled,
            Interrupt::TimedOut => on_timeout(self.config.round_trip_timeout_ms),
        }
    }

    async fn pause(&self, duration: Duration) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if duration.is_zero() {
            return Ok(());
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
