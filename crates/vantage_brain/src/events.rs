//! Brain events
//!
//! Listeners are plain boxed closures. Per-brain listeners live in the
//! brain's registry slot; registry-wide listeners see cut and pose events
//! from every brain.

use crate::camera::CameraId;
use crate::registry::BrainId;

/// Something observable happened on a brain's output
#[derive(Clone, Debug, PartialEq)]
pub enum BrainEvent {
    /// A different camera became active
    Activated {
        brain: BrainId,
        incoming: CameraId,
        outgoing: Option<CameraId>,
    },
    /// The output jumped without blending
    Cut { brain: BrainId },
    /// A pose was pushed to the output
    PoseUpdated { brain: BrainId },
}

impl BrainEvent {
    pub fn brain(&self) -> BrainId {
        match self {
            BrainEvent::Activated { brain, .. }
            | BrainEvent::Cut { brain }
            | BrainEvent::PoseUpdated { brain } => *brain,
        }
    }
}

pub type EventListener = Box<dyn FnMut(&BrainEvent)>;

/// Ordered list of event listeners
#[derive(Default)]
pub struct EventListeners {
    listeners: Vec<EventListener>,
}

impl EventListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&mut self, listener: F)
    where
        F: FnMut(&BrainEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: &BrainEvent) {
        for listener in &mut self.listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl std::fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}
