//! Test camera that records every call it receives

use crate::camera::{CameraId, UpdateClock, VirtualCamera};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use vantage_core::{CameraState, Vec3};

pub(crate) type CallLog = Rc<RefCell<Vec<String>>>;

/// Logs `"name:dt"` per update and `"name:transition"` per activation,
/// and counts one-time starts
pub(crate) struct ProbeCamera {
    name: String,
    state: CameraState,
    log: CallLog,
    clock: UpdateClock,
    valid: Rc<Cell<bool>>,
    live_child: Option<CameraId>,
    starts: Rc<Cell<u32>>,
}

impl ProbeCamera {
    pub(crate) fn new(name: &str, log: CallLog) -> Self {
        Self {
            name: name.to_string(),
            state: CameraState::default(),
            log,
            clock: UpdateClock::Late,
            valid: Rc::new(Cell::new(true)),
            live_child: None,
            starts: Rc::new(Cell::new(0)),
        }
    }

    pub(crate) fn at(mut self, position: Vec3) -> Self {
        self.state.position = position;
        self
    }

    pub(crate) fn on_clock(mut self, clock: UpdateClock) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn with_validity(mut self, valid: Rc<Cell<bool>>) -> Self {
        self.valid = valid;
        self
    }

    pub(crate) fn with_start_counter(mut self, starts: Rc<Cell<u32>>) -> Self {
        self.starts = starts;
        self
    }

    pub(crate) fn with_live_child(mut self, child: CameraId) -> Self {
        self.live_child = Some(child);
        self
    }
}

impl VirtualCamera for ProbeCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &CameraState {
        &self.state
    }

    fn is_valid(&self) -> bool {
        self.valid.get()
    }

    fn is_live_child(&self, child: CameraId, _dominant_only: bool) -> bool {
        self.live_child == Some(child)
    }

    fn update_camera_state(&mut self, _world_up: Vec3, dt: f32) {
        self.log.borrow_mut().push(format!("{}:{:.3}", self.name, dt));
    }

    fn on_transition_from_camera(&mut self, _from: Option<CameraId>, _world_up: Vec3, _dt: f32) {
        self.log.borrow_mut().push(format!("{}:transition", self.name));
    }

    fn ensure_started(&mut self) {
        self.starts.set(self.starts.get() + 1);
    }

    fn target_update_clock(&self) -> UpdateClock {
        self.clock
    }
}
