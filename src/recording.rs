//! Screen recording: collect encoded media chunks until the recording stops
//!
//! Acquiring the screen stream and encoding it to WebM is the host's job; it
//! pushes each chunk here as it becomes available.

use crate::{Error, Result};
use log::{debug, info};

/// Container type of the assembled recording
pub const RECORDING_MIME: &str = "video/webm";
pub const RECORDING_EXTENSION: &str = "webm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
}

/// A finished recording
#[derive(Clone)]
pub struct Recording {
    pub bytes: Vec<u8>,
    pub chunks: usize,
}

impl std::fmt::Debug for Recording {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recording")
            .field("bytes", &self.bytes.len())
            .field("chunks", &self.chunks)
            .finish()
    }
}

#[derive(Debug)]
pub struct Recorder {
    state: RecorderState,
    chunks: Vec<Vec<u8>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            state: RecorderState::Idle,
            chunks: Vec::new(),
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    pub fn start(&mut self) -> Result<()> {
        if self.is_recording() {
            return Err(Error::Other("a recording is already running".into()));
        }
        self.chunks.clear();
        self.state = RecorderState::Recording;
        info!("Recording started");
        Ok(())
    }

    /// Append a chunk; empty chunks are dropped
    pub fn push_chunk(&mut self, chunk: Vec<u8>) -> Result<()> {
        if !self.is_recording() {
            return Err(Error::Other("no recording is running".into()));
        }
        if !chunk.is_empty() {
            debug!("Recording chunk {} ({} bytes)", self.chunks.len() + 1, chunk.len());
            self.chunks.push(chunk);
        }
        Ok(())
    }

    /// Stop and assemble the chunks in arrival order
    pub fn stop(&mut self) -> Result<Recording> {
        if !self.is_recording() {
            return Err(Error::Other("no recording is running".into()));
        }
        self.state = RecorderState::Idle;
        let chunks = std::mem::take(&mut self.chunks);
        let recording = Recording {
            chunks: chunks.len(),
            bytes: chunks.concat(),
        };
        info!(
            "Recording stopped: {} chunks, {} bytes",
            recording.chunks,
            recording.bytes.len()
        );
        Ok(recording)
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunks_are_concatenated_in_order() {
        let mut rec = Recorder::new();
        rec.start().unwrap();
        rec.push_chunk(vec![1, 2]).unwrap();
        rec.push_chunk(Vec::new()).unwrap();
        rec.push_chunk(vec![3]).unwrap();

        let out = rec.stop().unwrap();
        assert_eq!(out.bytes, vec![1, 2, 3]);
        assert_eq!(out.chunks, 2);
        assert_eq!(rec.state(), RecorderState::Idle);
    }

    #[test]
    fn misuse_is_rejected() {
        let mut rec = Recorder::new();
        assert!(rec.push_chunk(vec![1]).is_err());
        assert!(rec.stop().is_err());

        rec.start().unwrap();
        assert!(rec.start().is_err());
    }

    #[test]
    fn restart_discards_previous_chunks() {
        let mut rec = Recorder::new();
        rec.start().unwrap();
        rec.push_chunk(vec![9]).unwrap();
        rec.stop().unwrap();

        rec.start().unwrap();
        rec.push_chunk(vec![1]).unwrap();
        assert_eq!(rec.stop().unwrap().bytes, vec![1]);
    }
}
