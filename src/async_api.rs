use crate::cdp::CdpPage;
use crate::host::{FrameGrabber, GrabError, ProbeError, ViewportProber};
use crate::{Error, PageDimensions, Result, TargetPage, Viewport, WindowId};
use async_trait::async_trait;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

/// The single tab every `Page` handle drives
const TAB_WINDOW: WindowId = WindowId(0);

enum Command {
    Goto(String, oneshot::Sender<Result<()>>),
    Url(oneshot::Sender<String>),
    ProbeDimensions(oneshot::Sender<std::result::Result<PageDimensions, ProbeError>>),
    ScrollTo(u32, oneshot::Sender<std::result::Result<(), ProbeError>>),
    ResetScroll(oneshot::Sender<std::result::Result<(), ProbeError>>),
    CaptureVisible(oneshot::Sender<std::result::Result<Vec<u8>, GrabError>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly browser backed by a dedicated worker thread.
///
/// The worker thread owns the synchronous `CdpPage` and executes commands
/// sent from async tasks one at a time, in the order they were sent.
#[derive(Clone)]
pub struct Browser {
    cmd_tx: Sender<Command>,
}

/// A handle on the browser's tab.
///
/// Implements [`ViewportProber`] and [`FrameGrabber`], so it can be handed
/// straight to a capture.
#[derive(Clone)]
pub struct Page {
    cmd_tx: Sender<Command>,
}

impl Browser {
    /// Launch Chrome on a background thread that owns the tab.
    pub async fn new(viewport: Viewport) -> Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx) = oneshot::channel::<Result<()>>();

        thread::spawn(move || {
            let page = match CdpPage::launch(viewport) {
                Ok(p) => p,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };
            let _ = init_tx.send(Ok(()));

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Goto(url, resp) => {
                        let _ = resp.send(page.load_url(&url));
                    }
                    Command::Url(resp) => {
                        let _ = resp.send(page.url());
                    }
                    Command::ProbeDimensions(resp) => {
                        let _ = resp.send(page.probe_dimensions());
                    }
                    Command::ScrollTo(offset, resp) => {
                        let _ = resp.send(page.scroll_to(offset));
                    }
                    Command::ResetScroll(resp) => {
                        let _ = resp.send(page.reset_scroll());
                    }
                    Command::CaptureVisible(resp) => {
                        let _ = resp.send(page.capture_visible());
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(page.close());
                        break;
                    }
                }
            }
        });

        init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))??;

        Ok(Self { cmd_tx })
    }

    /// Open a page handle backed by the same worker thread.
    pub async fn new_page(&self) -> Result<Page> {
        Ok(Page {
            cmd_tx: self.cmd_tx.clone(),
        })
    }

    /// Shutdown the background worker and close the browser.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Close(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

/// Send a command built around a fresh reply channel and wait for the answer
async fn request<T>(
    cmd_tx: &Sender<Command>,
    build: impl FnOnce(oneshot::Sender<T>) -> Command,
) -> std::result::Result<T, String> {
    let (tx, rx) = oneshot::channel();
    cmd_tx
        .send(build(tx))
        .map_err(|_| "browser worker has shut down".to_string())?;
    rx.await.map_err(|e| format!("browser worker dropped the request: {}", e))
}

impl Page {
    /// Navigate to a URL and wait for it to load
    pub async fn goto(&self, url: &str) -> Result<()> {
        request(&self.cmd_tx, |tx| Command::Goto(url.to_string(), tx))
            .await
            .map_err(Error::Other)?
    }

    pub async fn url(&self) -> Result<String> {
        request(&self.cmd_tx, Command::Url).await.map_err(Error::Other)
    }

    /// The loaded page, as a capture target
    pub async fn target(&self) -> Result<TargetPage> {
        Ok(TargetPage {
            url: self.url().await?,
            window: TAB_WINDOW,
        })
    }
}

#[async_trait]
impl ViewportProber for Page {
    async fn probe_dimensions(&self) -> std::result::Result<PageDimensions, ProbeError> {
        request(&self.cmd_tx, Command::ProbeDimensions)
            .await
            .map_err(ProbeError::Unreachable)?
    }

    async fn scroll_to(&self, offset: u32) -> std::result::Result<(), ProbeError> {
        request(&self.cmd_tx, |tx| Command::ScrollTo(offset, tx))
            .await
            .map_err(ProbeError::Unreachable)?
    }

    async fn reset_scroll(&self) -> std::result::Result<(), ProbeError> {
        request(&self.cmd_tx, Command::ResetScroll)
            .await
            .map_err(ProbeError::Unreachable)?
    }
}

#[async_trait]
impl FrameGrabber for Page {
    async fn capture_visible(&self, _window: WindowId) -> std::result::Result<Vec<u8>, GrabError> {
        request(&self.cmd_tx, Command::CaptureVisible)
            .await
            .map_err(GrabError::Other)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn requests_fail_cleanly_once_the_worker_is_gone() {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        drop(cmd_rx);
        let page = Page { cmd_tx };

        assert!(matches!(page.probe_dimensions().await, Err(ProbeError::Unreachable(_))));
        assert!(matches!(
            page.capture_visible(TAB_WINDOW).await,
            Err(GrabError::Other(ref m)) if m.contains("shut down")
        ));
        assert!(page.goto("https://example.com").await.is_err());
    }

    #[tokio::test]
    async fn replies_come_back_through_the_command_channel() {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        thread::spawn(move || {
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Url(resp) => {
                        let _ = resp.send("https://example.com/".to_string());
                    }
                    Command::ScrollTo(offset, resp) => {
                        let result = if offset > 100 {
                            Err(ProbeError::BadResponse("past the end".into()))
                        } else {
                            Ok(())
                        };
                        let _ = resp.send(result);
                    }
                    _ => {}
                }
            }
        });
        let page = Page { cmd_tx };

        let target = page.target().await.unwrap();
        assert_eq!(target.url, "https://example.com/");
        assert_eq!(target.window, TAB_WINDOW);
        assert!(page.scroll_to(50).await.is_ok());
        assert!(matches!(page.scroll_to(500).await, Err(ProbeError::BadResponse(_))));
    }
}
