//! Capture operations: visible part, full page, selected area, recordings
//!
//! `CaptureService` ties the collaborators together: it checks the target
//! page, runs the capture, names the output from the save-folder preference
//! and hands the payload to the output sink. Only complete captures are
//! saved.

use crate::filename::{
    output_filename, FULL_PAGE_PREFIX, RECORDING_PREFIX, SELECTED_AREA_PREFIX, VISIBLE_PREFIX,
};
use crate::host::{FrameGrabber, GrabError, OutputSink, PreferenceStore, SavedOutput, ViewportProber};
use crate::recording::{Recording, RECORDING_EXTENSION};
use crate::rendering::{crop_region, RasterCompositor};
use crate::restricted::is_restricted_url;
use crate::session::{CancelToken, CaptureGate};
use crate::stitcher::FullPageStitcher;
use crate::{CaptureConfig, Error, Rect, Result, TargetPage, WindowId};
use chrono::Utc;
use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub struct CaptureService {
    config: CaptureConfig,
    compositor: RasterCompositor,
    sink: Arc<dyn OutputSink>,
    prefs: Arc<dyn PreferenceStore>,
    gate: CaptureGate,
    active: Mutex<Option<CancelToken>>,
}

impl CaptureService {
    pub fn new(
        config: CaptureConfig,
        sink: Arc<dyn OutputSink>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        let compositor = RasterCompositor::with_jpeg_quality(config.jpeg_quality);
        Self {
            config,
            compositor,
            sink,
            prefs,
            gate: CaptureGate::new(),
            active: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Whether a full-page capture is running
    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Stop the running full-page capture, if any
    ///
    /// Returns whether there was a session to cancel.
    pub fn cancel(&self) -> bool {
        match self.active().as_ref() {
            Some(token) => {
                info!("Cancelling full-page capture");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Capture the visible part of `window` and save it as-is
    pub async fn capture_visible<G>(&self, window: WindowId, grabber: &G) -> Result<SavedOutput>
    where
        G: FrameGrabber + ?Sized,
    {
        let frame = self.grab_visible(window, grabber).await?;
        self.save(VISIBLE_PREFIX, "png", &frame).await
    }

    /// Capture the whole scrollable page and save the stitched image
    pub async fn capture_full_page<P, G>(
        &self,
        page: &TargetPage,
        prober: &P,
        grabber: &G,
    ) -> Result<SavedOutput>
    where
        P: ViewportProber + ?Sized,
        G: FrameGrabber + ?Sized,
    {
        ensure_capturable(page)?;
        let _permit = self.gate.try_acquire()?;

        let cancel = CancelToken::new();
        *self.active() = Some(cancel.clone());

        let stitched = FullPageStitcher::new(prober, grabber, &self.compositor, &self.config)
            .with_cancel(cancel)
            .capture(page.window)
            .await;
        *self.active() = None;

        let image = stitched?;
        self.save(FULL_PAGE_PREFIX, image.format.extension(), &image.data)
            .await
    }

    /// Capture `rect` (viewport pixels) of the page's visible part
    pub async fn capture_selected_area<G>(
        &self,
        page: &TargetPage,
        rect: Rect,
        grabber: &G,
    ) -> Result<SavedOutput>
    where
        G: FrameGrabber + ?Sized,
    {
        ensure_capturable(page)?;
        let frame = self.grab_visible(page.window, grabber).await?;
        let cropped = crop_region(&self.compositor, &frame, rect, self.config.output_format)?;
        self.save(
            SELECTED_AREA_PREFIX,
            self.config.output_format.extension(),
            &cropped,
        )
        .await
    }

    pub async fn save_recording(&self, recording: &Recording) -> Result<SavedOutput> {
        if recording.bytes.is_empty() {
            return Err(Error::Other("recording is empty".into()));
        }
        self.save(RECORDING_PREFIX, RECORDING_EXTENSION, &recording.bytes)
            .await
    }

    async fn grab_visible<G>(&self, window: WindowId, grabber: &G) -> Result<Vec<u8>>
    where
        G: FrameGrabber + ?Sized,
    {
        let attempts = self.config.visible_capture_attempts.max(1);
        let timeout = self.config.round_trip_timeout();
        let mut last = GrabError::Other("no capture attempted".into());

        for attempt in 1..=attempts {
            let outcome = match tokio::time::timeout(timeout, grabber.capture_visible(window)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(GrabError::Other(format!(
                    "no answer within {}ms",
                    self.config.round_trip_timeout_ms
                ))),
            };
            match outcome {
                Ok(frame) => return Ok(frame),
                Err(e) => {
                    warn!("Visible capture attempt {}/{} failed: {}", attempt, attempts, e);
                    if attempt < attempts && e.is_rate_limited() {
                        tokio::time::sleep(self.config.rate_limit_backoff()).await;
                    }
                    last = e;
                }
            }
        }
        Err(Error::CaptureFailure(format!(
            "failed to capture screenshot after {} attempt(s): {}",
            attempts, last
        )))
    }

    fn active(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn save(&self, prefix: &str, extension: &str, payload: &[u8]) -> Result<SavedOutput> {
        let folder = self.prefs.save_folder().await?;
        let filename = output_filename(prefix, extension, folder.as_deref(), Utc::now());
        self.sink.save(&filename, payload).await
    }
}

fn ensure_capturable(page: &TargetPage) -> Result<()> {
    if is_restricted_url(&page.url) {
        return Err(Error::RestrictedPage(page.url.clone()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MemoryPreferences, MemorySink, SimulatedGrabber, SimulatedPage};
    use crate::recording::Recorder;

    fn service(sink: Arc<MemorySink>, folder: Option<&str>) -> CaptureService {
        let prefs = match folder {
            Some(f) => MemoryPreferences::with_folder(f),
            None => MemoryPreferences::new(),
        };
        CaptureService::new(CaptureConfig::default(), sink, Arc::new(prefs))
    }

    #[tokio::test(start_paused = true)]
    async fn visible_capture_retries_once() {
        let sink = Arc::new(MemorySink::new());
        let svc = service(Arc::clone(&sink), None);
        let page = Arc::new(SimulatedPage::striped(8, 50, 50));
        let grabber = SimulatedGrabber::new(page);
        grabber.script(Some(GrabError::Other("transient".into())));

        let saved = svc.capture_visible(WindowId(1), &grabber).await.unwrap();
        assert!(saved.filename.starts_with("screenshot-"));
        assert!(saved.filename.ends_with(".png"));
        assert_eq!(grabber.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn visible_capture_gives_up_after_configured_attempts() {
        let sink = Arc::new(MemorySink::new());
        let svc = service(Arc::clone(&sink), None);
        let page = Arc::new(SimulatedPage::striped(8, 50, 50));
        let grabber = SimulatedGrabber::new(page);
        grabber.script(Some(GrabError::Other("no window".into())));
        grabber.script(Some(GrabError::Other("still no window".into())));

        let err = svc.capture_visible(WindowId(1), &grabber).await.unwrap_err();
        assert!(matches!(err, Error::CaptureFailure(ref m) if m.contains("still no window")));
        assert!(sink.saved().is_empty());
    }

    #[tokio::test]
    async fn restricted_page_is_rejected_before_grabbing() {
        let sink = Arc::new(MemorySink::new());
        let svc = service(Arc::clone(&sink), None);
        let page = Arc::new(SimulatedPage::striped(8, 50, 50));
        let grabber = SimulatedGrabber::new(page);
        let target = TargetPage { url: "chrome://settings".into(), window: WindowId(1) };

        let err = svc
            .capture_selected_area(&target, Rect::new(0, 0, 10, 10), &grabber)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RestrictedPage(_)));
        assert_eq!(grabber.calls(), 0);
    }

    #[tokio::test]
    async fn recording_saved_under_folder() {
        let sink = Arc::new(MemorySink::new());
        let svc = service(Arc::clone(&sink), Some("Clips"));
        let mut rec = Recorder::new();
        rec.start().unwrap();
        rec.push_chunk(b"webm".to_vec()).unwrap();
        let recording = rec.stop().unwrap();

        let saved = svc.save_recording(&recording).await.unwrap();
        assert!(saved.filename.starts_with("Clips/screen-recording-"));
        assert!(saved.filename.ends_with(".webm"));
        assert_eq!(sink.saved()[0].1, b"webm".to_vec());
    }

    #[test]
    fn cancel_without_session_is_a_no_op() {
        let svc = service(Arc::new(MemorySink::new()), None);
        assert!(!svc.cancel());
        assert!(!svc.is_busy());
    }
}
