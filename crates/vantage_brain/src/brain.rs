//! Brain
//!
//! A [`Brain`] drives one output. Each tick it picks the highest-priority
//! camera the output can see, advances the in-game blend toward it,
//! composites any override layers on top, simulates the cameras that
//! matter and pushes the resulting pose.
//!
//! The host calls [`Brain::fixed_update`] once per physics step and
//! [`Brain::late_update`] once per rendered frame. Which of the two does the
//! work depends on [`UpdateMethod`] and [`BlendUpdateMethod`]; in
//! [`UpdateMethod::Manual`] mode only [`Brain::manual_update`] does anything.
//!
//! # Example
//!
//! ```
//! use vantage_brain::{Brain, BrainConfig, CameraDesc, CameraRegistry, FixedCamera, FrameTime};
//! use vantage_core::{CameraState, Vec3};
//!
//! let mut registry = CameraRegistry::new();
//! let wide = registry.spawn(
//!     Box::new(FixedCamera::new("Wide", CameraState::at(Vec3::new(0.0, 5.0, 10.0)))),
//!     CameraDesc::new(10),
//! );
//! let mut brain = Brain::new(&mut registry, BrainConfig::default());
//! brain.late_update(&mut registry, &FrameTime::new(1, 0.016, 0.016));
//! assert_eq!(brain.active_camera(&registry), Some(wide));
//! ```

use crate::blend::BlendState;
use crate::camera::{CameraId, UpdateClock};
use crate::config::{BlendUpdateMethod, BrainConfig, UpdateMethod};
use crate::events::BrainEvent;
use crate::frame_stack::{Frame0Transition, FrameStack};
use crate::output::CameraOutput;
use crate::registry::{BrainId, CameraRegistry, UpdateFilter};
use crate::time::FrameTime;
use std::rc::Rc;
use tracing::{debug, info, trace};
use vantage_core::{CameraState, Vec3};

/// Per-output compositor
pub struct Brain {
    id: BrainId,
    /// Keeps the registry slot alive; dropping the brain retires it
    _token: Rc<()>,
    config: BrainConfig,
    stack: FrameStack,
    output: Option<Box<dyn CameraOutput>>,
    active_previous: Option<CameraId>,
    current_state: Option<CameraState>,
    /// Clock, frame and time of the last frame-0 advance
    last_frame0: Option<(UpdateClock, u64, u32)>,
}

impl Brain {
    pub fn new(registry: &mut CameraRegistry, config: BrainConfig) -> Self {
        let token = Rc::new(());
        let id = registry.add_brain(&token);
        debug!("brain '{}' created", config.name);
        Self {
            id,
            _token: token,
            config,
            stack: FrameStack::new(),
            output: None,
            active_previous: None,
            current_state: None,
            last_frame0: None,
        }
    }

    pub fn with_output(mut self, output: Box<dyn CameraOutput>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn set_output(&mut self, output: Option<Box<dyn CameraOutput>>) {
        self.output = output;
    }

    pub fn id(&self) -> BrainId {
        self.id
    }

    pub fn config(&self) -> &BrainConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut BrainConfig {
        &mut self.config
    }

    pub fn frame_stack(&self) -> &FrameStack {
        &self.stack
    }

    pub fn world_up(&self) -> Vec3 {
        self.config.world_up()
    }

    /// Layers the output renders
    pub fn culling_mask(&self) -> u32 {
        self.output.as_ref().map_or(u32::MAX, |o| o.culling_mask())
    }

    /// Pose pushed on the last tick, whether or not an output is attached
    pub fn current_state(&self) -> Option<&CameraState> {
        self.current_state.as_ref()
    }

    /// Listen to this brain's events
    pub fn subscribe<F>(&self, registry: &mut CameraRegistry, listener: F)
    where
        F: FnMut(&BrainEvent) + 'static,
    {
        registry.subscribe(self.id, listener);
    }

    /// Retire the brain and its registry slot
    pub fn disable(self, registry: &mut CameraRegistry) {
        debug!("brain '{}' disabled", self.config.name);
        registry.remove_brain(self.id);
    }

    // =========================================================================
    // Host callbacks
    // =========================================================================

    /// Snap every camera to its target before the first tick
    pub fn start(&mut self, registry: &mut CameraRegistry, time: &FrameTime) {
        self.last_frame0 = None;
        self.update_virtual_cameras(registry, UpdateFilter::LATE, -1.0, time);
    }

    /// Physics-step callback
    pub fn fixed_update(&mut self, registry: &mut CameraRegistry, time: &FrameTime) {
        if self.config.update_method == UpdateMethod::Manual {
            return;
        }
        let blend_here = self.config.blend_update_method == BlendUpdateMethod::Fixed;
        let dt = self.effective_delta_time(registry, time, true);

        if blend_here {
            self.update_frame0(registry, dt, time, UpdateClock::Fixed);
            self.compose(registry);
        }
        match self.config.update_method {
            UpdateMethod::Fixed => self.update_virtual_cameras(registry, UpdateFilter::FIXED, dt, time),
            UpdateMethod::Smart => {
                self.update_virtual_cameras(registry, UpdateFilter::SMART_FIXED, dt, time)
            }
            UpdateMethod::Late | UpdateMethod::Manual => {}
        }
        if blend_here {
            self.process_active_camera(registry, dt, time);
        }
    }

    /// End-of-frame callback
    pub fn late_update(&mut self, registry: &mut CameraRegistry, time: &FrameTime) {
        if self.config.update_method != UpdateMethod::Manual {
            self.manual_update(registry, time);
        }
    }

    /// Run one tick now
    ///
    /// Safe to call more than once in a frame: frame 0 advances once and
    /// cameras already updated this frame are skipped.
    pub fn manual_update(&mut self, registry: &mut CameraRegistry, time: &FrameTime) {
        let dt = self.effective_delta_time(registry, time, false);
        let blend_in_fixed =
            time.is_playing && self.config.blend_update_method == BlendUpdateMethod::Fixed;

        if !blend_in_fixed {
            self.update_frame0(registry, dt, time, UpdateClock::Late);
        }
        self.compose(registry);

        if self.config.update_method == UpdateMethod::Fixed {
            // Cameras that went live since the last physics step still need a state
            if !blend_in_fixed {
                registry.set_current_filter(UpdateFilter::FIXED);
                if registry.solo_camera().is_none() {
                    let fixed_dt = self.effective_delta_time(registry, time, true);
                    self.update_live_cameras(registry, fixed_dt, time);
                }
            }
        } else {
            let filter = match self.config.update_method {
                UpdateMethod::Smart => UpdateFilter::SMART_LATE,
                _ => UpdateFilter::LATE,
            };
            self.update_virtual_cameras(registry, filter, dt, time);
        }

        if !blend_in_fixed {
            self.process_active_camera(registry, dt, time);
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Solo camera if one is set, otherwise the incoming camera of the live blend
    pub fn active_camera(&self, registry: &CameraRegistry) -> Option<CameraId> {
        if let Some(solo) = registry.solo_camera() {
            return Some(solo);
        }
        registry.live_blend(self.id)?.terminal_camera(registry)
    }

    /// Live blend while it is in progress
    pub fn active_blend<'a>(&self, registry: &'a CameraRegistry) -> Option<&'a BlendState> {
        if registry.solo_camera().is_some() {
            return None;
        }
        registry
            .live_blend(self.id)
            .filter(|blend| blend.cam_a.is_some() && !blend.is_complete())
    }

    pub fn is_blending(&self, registry: &CameraRegistry) -> bool {
        self.active_blend(registry).is_some()
    }

    /// Whether this brain is showing or blending to `camera`
    pub fn is_live(&self, registry: &CameraRegistry, camera: CameraId, dominant_only: bool) -> bool {
        registry.is_live_in_brain(self.id, camera, dominant_only)
    }

    /// Composite of the frame stack, optionally ignoring the top layers
    pub fn compute_current_blend(&self, registry: &CameraRegistry, exclude_top_n: usize) -> BlendState {
        self.stack.compose(registry, exclude_top_n)
    }

    /// One-line summary of what the output is showing
    pub fn debug_text(&self, registry: &CameraRegistry) -> String {
        let mut text = format!("{}: ", self.config.name);
        if let Some(solo) = registry.solo_camera() {
            text.push_str("SOLO ");
            text.push_str(registry.name(solo).unwrap_or("(none)"));
            return text;
        }
        match registry.live_blend(self.id) {
            Some(blend) => text.push_str(&blend.description(registry)),
            None => text.push_str("(none)"),
        }
        text
    }

    // =========================================================================
    // Overrides
    // =========================================================================

    /// Create or update an override layer; a negative `id` allocates one
    ///
    /// Both cameras are started if they have not been yet.
    pub fn set_override(
        &mut self,
        registry: &mut CameraRegistry,
        id: i32,
        cam_a: Option<CameraId>,
        cam_b: Option<CameraId>,
        weight_b: f32,
        delta_time_override: f32,
    ) -> i32 {
        for camera in [cam_a, cam_b].into_iter().flatten() {
            registry.ensure_started(camera);
        }
        let id = self
            .stack
            .set_override(id, cam_a, cam_b, weight_b, delta_time_override);
        trace!("brain '{}': override {} set", self.config.name, id);
        id
    }

    /// Remove an override layer; unknown ids are ignored
    pub fn release_override(&mut self, id: i32) {
        if self.stack.release_override(id) {
            trace!("brain '{}': override {} released", self.config.name, id);
        }
    }

    // =========================================================================
    // Tick steps
    // =========================================================================

    fn effective_delta_time(&self, registry: &CameraRegistry, time: &FrameTime, fixed: bool) -> f32 {
        if let Some(dt) = registry.time_overrides().uniform_delta_time() {
            return dt;
        }
        if registry.solo_camera().is_some() {
            return time.unscaled_delta_time;
        }
        if !time.is_playing {
            return self
                .stack
                .top_active_delta_time_override(registry)
                .unwrap_or(-1.0);
        }
        match (fixed, self.config.ignore_time_scale) {
            (true, _) => time.fixed_delta_time,
            (false, true) => time.unscaled_delta_time,
            (false, false) => time.delta_time,
        }
    }

    fn update_frame0(&mut self, registry: &CameraRegistry, dt: f32, time: &FrameTime, clock: UpdateClock) {
        let stamp = (clock, time.frame, time.time.to_bits());
        if self.last_frame0 == Some(stamp) {
            trace!("brain '{}': frame 0 already advanced", self.config.name);
            return;
        }
        self.last_frame0 = Some(stamp);

        let desired = registry.top_priority_visible(self.culling_mask());
        let brain = self.id;
        let config = &self.config;
        let transition = self.stack.advance_frame0(desired, dt, |from, to| {
            let blend = config.lookup_blend(
                registry.name(from).unwrap_or_default(),
                registry.name(to).unwrap_or_default(),
            );
            registry.apply_blend_override(Some(from), Some(to), blend, brain)
        });

        let name = |id: Option<CameraId>| id.and_then(|id| registry.name(id)).unwrap_or("(none)");
        match transition {
            Frame0Transition::Cut => {
                debug!("brain '{}': cut to '{}'", self.config.name, name(desired))
            }
            Frame0Transition::Blend { duration } | Frame0Transition::Chained { duration } => debug!(
                "brain '{}': blending to '{}' over {:.2}s",
                self.config.name,
                name(desired),
                duration
            ),
            Frame0Transition::Settled => {
                trace!("brain '{}': settled on '{}'", self.config.name, name(desired))
            }
            Frame0Transition::Unchanged => {}
        }
    }

    fn compose(&mut self, registry: &mut CameraRegistry) {
        let blend = self.stack.compose(registry, 0);
        registry.set_live_blend(self.id, blend);
        registry.set_brain_output(self.id, self.culling_mask(), self.output.is_some());
    }

    fn update_virtual_cameras(
        &mut self,
        registry: &mut CameraRegistry,
        filter: UpdateFilter,
        dt: f32,
        time: &FrameTime,
    ) {
        registry.set_current_filter(filter);
        let world_up = self.world_up();
        registry.update_all(self.culling_mask(), world_up, dt, time);
        if let Some(solo) = registry.solo_camera() {
            registry.update_camera(solo, world_up, dt, time);
        }
        self.update_live_cameras(registry, dt, time);

        let restored = if !time.is_playing {
            UpdateFilter::LATE
        } else {
            match self.config.update_method {
                UpdateMethod::Smart => UpdateFilter::SMART_LATE,
                UpdateMethod::Fixed => UpdateFilter::FIXED,
                UpdateMethod::Late | UpdateMethod::Manual => UpdateFilter::LATE,
            }
        };
        registry.set_current_filter(restored);
    }

    fn update_live_cameras(&self, registry: &mut CameraRegistry, dt: f32, time: &FrameTime) {
        let cameras = registry
            .live_blend(self.id)
            .map(BlendState::cameras)
            .unwrap_or_default();
        let world_up = self.world_up();
        for camera in cameras {
            registry.update_camera(camera, world_up, dt, time);
        }
    }

    fn process_active_camera(&mut self, registry: &mut CameraRegistry, dt: f32, time: &FrameTime) {
        let active = self.active_camera(registry);

        if let Some(incoming) = active {
            if active != self.active_previous {
                let outgoing = self.active_previous;
                let world_up = self.world_up();
                if let Some(camera) = registry.camera_mut(incoming) {
                    camera.on_transition_from_camera(outgoing, world_up, dt);
                }
                debug!(
                    "brain '{}': '{}' activated",
                    self.config.name,
                    registry.name(incoming).unwrap_or_default()
                );
                registry.emit(BrainEvent::Activated {
                    brain: self.id,
                    incoming,
                    outgoing,
                });

                let cut = match (self.active_blend(registry), outgoing) {
                    (None, _) => true,
                    (Some(blend), Some(outgoing)) => !blend.uses(outgoing),
                    (Some(_), None) => false,
                };
                if cut {
                    registry.emit(BrainEvent::Cut { brain: self.id });
                }

                // The incoming camera may have been on standby
                let filter = registry.current_filter();
                registry.set_current_filter(UpdateFilter {
                    smart: false,
                    ..filter
                });
                registry.update_camera(incoming, world_up, dt, time);
                registry.set_current_filter(filter);
            }

            let state = match registry.solo_camera() {
                Some(solo) => registry.state(solo).cloned(),
                None => registry.live_blend(self.id).and_then(|b| b.state(registry)),
            };
            if let Some(state) = state {
                self.push_state(registry, state);
            }
        }
        self.active_previous = active;
    }

    fn push_state(&mut self, registry: &mut CameraRegistry, state: CameraState) {
        if let Some(output) = self.output.as_mut() {
            if !state.hints.no_position {
                output.set_position(state.position);
            }
            if !state.hints.no_orientation {
                output.set_orientation(state.orientation);
            }
            if !state.hints.no_lens {
                output.set_lens(&state.lens);
            }
        }
        self.current_state = Some(state);
        if self.config.show_debug_text {
            info!("{}", self.debug_text(registry));
        }
        registry.emit(BrainEvent::PoseUpdated { brain: self.id });
    }
}

impl std::fmt::Debug for Brain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Brain")
            .field("id", &self.id)
            .field("name", &self.config.name)
            .field("overrides", &self.stack.overrides().len())
            .field("has_output", &self.output.is_some())
            .finish()
    }
}
