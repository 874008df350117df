//! Host surface: the collaborators a capture runs against
//!
//! The page prober, frame grabber, output sink, preference store and window
//! host are traits. Each ships with an in-memory implementation that keeps
//! state in a `Mutex`, used by tests and as a safe default for embedders that
//! only need part of the surface.

pub mod grabber;
pub mod prefs;
pub mod prober;
pub mod sink;
pub mod window;

pub use grabber::{FrameGrabber, GrabError, SimulatedGrabber, RATE_LIMIT_MARKER};
pub use prefs::{JsonFilePreferences, MemoryPreferences, PreferenceStore};
pub use prober::{ProbeError, SimulatedPage, ViewportProber};
pub use sink::{DirectorySink, MemorySink, OutputSink, SavedOutput};
pub use window::{ExtensionWindow, MemoryWindowHost, PopupSpec, WindowHost, WindowOutcome};
