//! Lifecycle of the single capture-controls window

use crate::{Error, Result, WindowId};
use async_trait::async_trait;
use log::{debug, info};
use std::collections::HashSet;
use std::sync::Mutex;

/// Shape of the popup window to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopupSpec {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl Default for PopupSpec {
    fn default() -> Self {
        Self {
            url: "app.html".to_string(),
            width: 800,
            height: 600,
        }
    }
}

/// Host windowing operations
#[async_trait]
pub trait WindowHost: Send + Sync {
    async fn window_exists(&self, id: WindowId) -> bool;
    async fn focus_window(&self, id: WindowId) -> Result<()>;
    async fn create_popup(&self, spec: &PopupSpec) -> Result<WindowId>;
}

/// What `open_or_focus` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    Focused(WindowId),
    Created(WindowId),
}

impl WindowOutcome {
    pub fn id(&self) -> WindowId {
        match self {
            WindowOutcome::Focused(id) | WindowOutcome::Created(id) => *id,
        }
    }
}

/// Handle to at most one controls window
///
/// The tracked id is only ever replaced through `open_or_focus` and cleared
/// through `on_window_removed`; a stale id (window closed without a removal
/// notification) is detected and dropped on the next open.
pub struct ExtensionWindow<H: WindowHost> {
    host: H,
    spec: PopupSpec,
    current: tokio::sync::Mutex<Option<WindowId>>,
}

impl<H: WindowHost> ExtensionWindow<H> {
    pub fn new(host: H, spec: PopupSpec) -> Self {
        Self {
            host,
            spec,
            current: tokio::sync::Mutex::new(None),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Focus the tracked window, or create one if none is open
    pub async fn open_or_focus(&self) -> Result<WindowOutcome> {
        let mut current = self.current.lock().await;

        if let Some(id) = *current {
            if self.host.window_exists(id).await {
                self.host.focus_window(id).await?;
                debug!("Focused existing controls window {}", id);
                return Ok(WindowOutcome::Focused(id));
            }
            debug!("Controls window {} is gone; dropping stale handle", id);
            *current = None;
        }

        let id = self.host.create_popup(&self.spec).await?;
        info!("Opened controls window {}", id);
        *current = Some(id);
        Ok(WindowOutcome::Created(id))
    }

    /// Forget the tracked window if `id` is the one that closed
    ///
    /// Returns whether the handle was cleared.
    pub async fn on_window_removed(&self, id: WindowId) -> bool {
        let mut current = self.current.lock().await;
        if *current == Some(id) {
            *current = None;
            true
        } else {
            false
        }
    }

    pub async fn current(&self) -> Option<WindowId> {
        *self.current.lock().await
    }
}

/// In-memory window host
pub struct MemoryWindowHost {
    state: Mutex<HostState>,
}

#[derive(Default)]
struct HostState {
    next_id: u64,
    open: HashSet<WindowId>,
    focus_log: Vec<WindowId>,
    created: usize,
}

impl MemoryWindowHost {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                next_id: 1,
                ..Default::default()
            }),
        }
    }

    /// Close a window without notifying anyone
    pub fn close(&self, id: WindowId) {
        self.state.lock().unwrap().open.remove(&id);
    }

    pub fn created(&self) -> usize {
        self.state.lock().unwrap().created
    }

    pub fn focus_log(&self) -> Vec<WindowId> {
        self.state.lock().unwrap().focus_log.clone()
    }
}

impl Default for MemoryWindowHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WindowHost for MemoryWindowHost {
    async fn window_exists(&self, id: WindowId) -> bool {
        self.state.lock().unwrap().open.contains(&id)
    }

    async fn focus_window(&self, id: WindowId) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.open.contains(&id) {
            return Err(Error::WindowError(format!("no window with id {}", id.0)));
        }
        state.focus_log.push(id);
        Ok(())
    }

    async fn create_popup(&self, _spec: &PopupSpec) -> Result<WindowId> {
        let mut state = self.state.lock().unwrap();
        let id = WindowId(state.next_id);
        state.next_id += 1;
        state.created += 1;
        state.open.insert(id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_open_focuses_instead_of_creating() {
        let win = ExtensionWindow::new(MemoryWindowHost::new(), PopupSpec::default());
        let first = win.open_or_focus().await.unwrap();
        let second = win.open_or_focus().await.unwrap();

        assert!(matches!(first, WindowOutcome::Created(_)));
        assert_eq!(second, WindowOutcome::Focused(first.id()));
        assert_eq!(win.host().created(), 1);
        assert_eq!(win.host().focus_log(), vec![first.id()]);
    }

    #[tokio::test]
    async fn removal_notification_clears_handle() {
        let win = ExtensionWindow::new(MemoryWindowHost::new(), PopupSpec::default());
        let id = win.open_or_focus().await.unwrap().id();

        assert!(!win.on_window_removed(WindowId(999)).await);
        assert_eq!(win.current().await, Some(id));

        win.host().close(id);
        assert!(win.on_window_removed(id).await);
        assert_eq!(win.current().await, None);

        let reopened = win.open_or_focus().await.unwrap();
        assert!(matches!(reopened, WindowOutcome::Created(new_id) if new_id != id));
    }

    #[tokio::test]
    async fn stale_handle_is_replaced() {
        let win = ExtensionWindow::new(MemoryWindowHost::new(), PopupSpec::default());
        let id = win.open_or_focus().await.unwrap().id();

        // Closed behind our back: no removal notification
        win.host().close(id);
        let outcome = win.open_or_focus().await.unwrap();
        assert!(matches!(outcome, WindowOutcome::Created(_)));
        assert_ne!(outcome.id(), id);
        assert_eq!(win.host().created(), 2);
    }
}
