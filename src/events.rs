//! Pet event system for decoupled communication between systems.
//!
//! The state machine emits events; the host reacts (window layout,
//! logging) without the machine knowing about either.

use crate::chat::ChatSource;
use crate::state::StateName;

/// Things that happened to the pet during a tick or input callback
#[derive(Debug, Clone, PartialEq)]
pub enum PetEvent {
    /// A transition was committed
    StateChanged { from: StateName, to: StateName },
    /// A speech bubble appeared
    BubbleShown { source: ChatSource },
    /// The speech bubble went away (timeout, drag, or state change)
    BubbleDismissed,
    /// The pointer grabbed the pet
    DragStarted,
}

/// Events collected by the pet, drained by the host after each tick or input
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<PetEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: PetEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> impl Iterator<Item = PetEvent> + '_ {
        self.events.drain(..)
    }
}
