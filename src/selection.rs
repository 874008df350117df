//! Area selection as a finite-state machine
//!
//! ```text
//!   Idle --down(primary)--> Selecting --up, large enough--> Committed
//!    ^                        |   ^                             |
//!    +---- up, too small -----+   +-- move                      |
//!    +---- cancel ------------+                                 |
//!    +------------------------------- reset --------------------+
//! ```
//!
//! Coordinates are viewport pixels. The tool owns all of its state; nothing
//! is kept in globals between events.

use crate::Rect;

/// Pointer button that can start a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    PointerDown { x: u32, y: u32, button: PointerButton },
    PointerMove { x: u32, y: u32 },
    PointerUp { x: u32, y: u32 },
    /// Escape key
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Selecting { start: (u32, u32), current: (u32, u32) },
    Committed(Rect),
}

/// What a transition produced, if anything worth reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Committed(Rect),
    /// Released with a rectangle below the minimum size
    Discarded(Rect),
    Cancelled,
}

/// Rectangle spanned by two corners, in any order
pub fn normalized_rect(a: (u32, u32), b: (u32, u32)) -> Rect {
    Rect::new(a.0.min(b.0), a.1.min(b.1), a.0.abs_diff(b.0), a.1.abs_diff(b.1))
}

#[derive(Debug, Clone)]
pub struct SelectionTool {
    state: SelectionState,
    min_size: u32,
}

impl SelectionTool {
    pub fn new(min_size: u32) -> Self {
        Self {
            state: SelectionState::Idle,
            min_size,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    /// Rectangle currently being dragged, for drawing an overlay
    pub fn preview(&self) -> Option<Rect> {
        match self.state {
            SelectionState::Selecting { start, current } => Some(normalized_rect(start, current)),
            _ => None,
        }
    }

    pub fn committed(&self) -> Option<Rect> {
        match self.state {
            SelectionState::Committed(rect) => Some(rect),
            _ => None,
        }
    }

    /// Return to `Idle`, dropping any committed rectangle
    pub fn reset(&mut self) {
        self.state = SelectionState::Idle;
    }

    pub fn handle(&mut self, event: SelectionEvent) -> Option<SelectionOutcome> {
        match (self.state, event) {
            (SelectionState::Committed(_), _) => None,

            (_, SelectionEvent::Cancel) => {
                let was_active = self.state != SelectionState::Idle;
                self.state = SelectionState::Idle;
                was_active.then_some(SelectionOutcome::Cancelled)
            }

            (SelectionState::Idle, SelectionEvent::PointerDown { x, y, button }) => {
                if button == PointerButton::Primary {
                    self.state = SelectionState::Selecting {
                        start: (x, y),
                        current: (x, y),
                    };
                }
                None
            }

            (SelectionState::Selecting { start, .. }, SelectionEvent::PointerMove { x, y }) => {
                self.state = SelectionState::Selecting {
                    start,
                    current: (x, y),
                };
                None
            }

            (SelectionState::Selecting { start, .. }, SelectionEvent::PointerUp { x, y }) => {
                let rect = normalized_rect(start, (x, y));
                if rect.width < self.min_size || rect.height < self.min_size {
                    self.state = SelectionState::Idle;
                    Some(SelectionOutcome::Discarded(rect))
                } else {
                    self.state = SelectionState::Committed(rect);
                    Some(SelectionOutcome::Committed(rect))
                }
            }

            // Moves or releases while idle, and a second press mid-drag, are ignored
            _ => None,
        }
    }
}
