//! Session control: one full-page capture at a time, and a way to stop it

use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Cloneable stop signal for an in-flight capture
///
/// Once cancelled a token stays cancelled; start each session with a fresh one.
#[derive(Clone, Debug)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self { tx: Arc::new(tx), rx }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once `cancel` has been called on any clone
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so wait_for only returns on cancel
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Admits at most one capture session at a time
///
/// A second request while a permit is outstanding is rejected with
/// `Error::CaptureInProgress`; it is neither queued nor allowed to interrupt
/// the running session.
#[derive(Clone, Debug, Default)]
pub struct CaptureGate {
    busy: Arc<AtomicBool>,
}

impl CaptureGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Result<SessionPermit> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(Error::CaptureInProgress);
        }
        Ok(SessionPermit {
            busy: Arc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }
}

/// Held for the duration of a session; releases the gate on drop
#[derive(Debug)]
pub struct SessionPermit {
    busy: Arc<AtomicBool>,
}

impl Drop for SessionPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}
