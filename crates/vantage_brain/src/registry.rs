//! Camera registry
//!
//! The registry owns every camera source and answers two questions each
//! tick: which camera has the highest priority, and which cameras need to be
//! simulated. Brains publish their composed blend into a slot here so that
//! liveness can be answered across brains.
//!
//! # Update order
//!
//! Cameras are bucketed by the number of parent hops above them and updated
//! deepest bucket first, so a child rig is always simulated before the
//! parent that blends it.

use crate::blend::BlendState;
use crate::camera::{CameraDesc, CameraId, StandbyUpdate, UpdateClock, VirtualCamera};
use crate::config::BlendDefinition;
use crate::events::{BrainEvent, EventListeners};
use crate::time::{FrameTime, TimeOverrides};
use rustc_hash::FxHashSet;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};
use vantage_core::{CameraState, Vec3};

/// Hop cap for parent walks, guarding against misconfigured cycles
const MAX_PARENT_DEPTH: usize = 64;

new_key_type! {
    /// Handle to a brain's slot in a [`CameraRegistry`]
    pub struct BrainId;
}

/// Which cameras an update pass may touch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdateFilter {
    pub clock: UpdateClock,
    /// Skip cameras whose target moves on the other clock
    pub smart: bool,
}

impl UpdateFilter {
    pub const FIXED: UpdateFilter = UpdateFilter {
        clock: UpdateClock::Fixed,
        smart: false,
    };
    pub const LATE: UpdateFilter = UpdateFilter {
        clock: UpdateClock::Late,
        smart: false,
    };
    pub const SMART_FIXED: UpdateFilter = UpdateFilter {
        clock: UpdateClock::Fixed,
        smart: true,
    };
    pub const SMART_LATE: UpdateFilter = UpdateFilter {
        clock: UpdateClock::Late,
        smart: true,
    };
}

impl Default for UpdateFilter {
    fn default() -> Self {
        Self::LATE
    }
}

/// Registry-wide blend override
///
/// Receives the outgoing camera, the incoming camera, the blend the brain
/// picked and the brain asking, and returns the blend to use.
pub type BlendOverrideHook =
    Box<dyn Fn(Option<CameraId>, Option<CameraId>, BlendDefinition, BrainId) -> BlendDefinition>;

#[derive(Clone, Copy, Debug)]
struct UpdateStatus {
    last_frame: i64,
    last_fixed_frame: i64,
    last_clock: UpdateClock,
    last_delta_time: f32,
}

struct CameraEntry {
    camera: Box<dyn VirtualCamera>,
    desc: CameraDesc,
    active: bool,
    enabled: bool,
    started: bool,
    status: Option<UpdateStatus>,
}

struct BrainSlot {
    token: Weak<()>,
    live: BlendState,
    culling_mask: u32,
    has_output: bool,
    listeners: EventListeners,
}

impl BrainSlot {
    fn is_alive(&self) -> bool {
        self.token.strong_count() > 0
    }
}

/// Owner of all camera sources in one simulation
pub struct CameraRegistry {
    cameras: SlotMap<CameraId, CameraEntry>,
    /// Sorted by priority, highest first; ties most recent first
    active: Vec<CameraId>,
    depth_buckets: Vec<Vec<CameraId>>,
    round_robin_last: Option<CameraId>,

    brains: SlotMap<BrainId, BrainSlot>,
    /// Most recently added first
    brain_order: Vec<BrainId>,

    solo: Option<CameraId>,
    time_overrides: TimeOverrides,
    blend_override: Option<BlendOverrideHook>,

    current_filter: UpdateFilter,
    fixed_frame_count: i64,
    last_update_time: Option<f32>,
    last_delta_time: f32,

    cut_listeners: EventListeners,
    pose_listeners: EventListeners,
}

impl Default for CameraRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraRegistry {
    pub fn new() -> Self {
        Self {
            cameras: SlotMap::with_key(),
            active: Vec::new(),
            depth_buckets: Vec::new(),
            round_robin_last: None,
            brains: SlotMap::with_key(),
            brain_order: Vec::new(),
            solo: None,
            time_overrides: TimeOverrides::default(),
            blend_override: None,
            current_filter: UpdateFilter::default(),
            fixed_frame_count: 0,
            last_update_time: None,
            last_delta_time: -1.0,
            cut_listeners: EventListeners::new(),
            pose_listeners: EventListeners::new(),
        }
    }

    // =========================================================================
    // Camera lifecycle
    // =========================================================================

    /// Take ownership of a camera; it is neither enabled nor active yet
    pub fn register(&mut self, camera: Box<dyn VirtualCamera>, desc: CameraDesc) -> CameraId {
        let id = self.cameras.insert(CameraEntry {
            camera,
            desc,
            active: false,
            enabled: false,
            started: false,
            status: None,
        });
        trace!("registered camera {:?}", id);
        id
    }

    /// Register, enable and activate in one step
    pub fn spawn(&mut self, camera: Box<dyn VirtualCamera>, desc: CameraDesc) -> CameraId {
        let id = self.register(camera, desc);
        self.enable(id);
        self.activate(id);
        id
    }

    /// Remove a camera from every list and hand it back
    pub fn destroy(&mut self, id: CameraId) -> Option<Box<dyn VirtualCamera>> {
        self.active.retain(|c| *c != id);
        for bucket in &mut self.depth_buckets {
            bucket.retain(|c| *c != id);
        }
        if self.round_robin_last == Some(id) {
            self.round_robin_last = None;
        }
        let entry = self.cameras.remove(id)?;
        debug!("destroyed camera '{}'", entry.camera.name());
        Some(entry.camera)
    }

    /// Insert into the priority list, ahead of equal priorities
    pub fn activate(&mut self, id: CameraId) {
        let Some(priority) = self.priority(id) else {
            return;
        };
        self.active.retain(|c| *c != id);
        let index = self
            .active
            .iter()
            .position(|c| self.cameras.get(*c).map_or(true, |e| priority >= e.desc.priority))
            .unwrap_or(self.active.len());
        self.active.insert(index, id);
        if let Some(entry) = self.cameras.get_mut(id) {
            entry.active = true;
        }
    }

    pub fn deactivate(&mut self, id: CameraId) {
        self.active.retain(|c| *c != id);
        if let Some(entry) = self.cameras.get_mut(id) {
            entry.active = false;
        }
    }

    /// Add to the depth bucket matching the camera's parent depth
    pub fn enable(&mut self, id: CameraId) {
        if !self.cameras.contains_key(id) {
            return;
        }
        for bucket in &mut self.depth_buckets {
            bucket.retain(|c| *c != id);
        }
        let depth = self.parent_depth(id);
        while self.depth_buckets.len() <= depth {
            self.depth_buckets.push(Vec::new());
        }
        self.depth_buckets[depth].push(id);
        if let Some(entry) = self.cameras.get_mut(id) {
            entry.enabled = true;
        }
    }

    pub fn disable(&mut self, id: CameraId) {
        for bucket in &mut self.depth_buckets {
            bucket.retain(|c| *c != id);
        }
        if self.round_robin_last == Some(id) {
            self.round_robin_last = None;
        }
        if let Some(entry) = self.cameras.get_mut(id) {
            entry.enabled = false;
        }
    }

    pub fn set_priority(&mut self, id: CameraId, priority: i32) {
        let Some(entry) = self.cameras.get_mut(id) else {
            return;
        };
        entry.desc.priority = priority;
        if entry.active {
            self.activate(id);
        }
    }

    /// Re-parent a camera, moving it to its new depth bucket
    pub fn set_parent(&mut self, id: CameraId, parent: Option<CameraId>) {
        let Some(entry) = self.cameras.get_mut(id) else {
            return;
        };
        entry.desc.parent = parent;

        // Enabled descendants change depth along with the camera
        let moved: SmallVec<[CameraId; 8]> = self
            .cameras
            .iter()
            .filter(|(cam, e)| e.enabled && (*cam == id || self.has_ancestor(*cam, id)))
            .map(|(cam, _)| cam)
            .collect();
        for cam in moved {
            self.enable(cam);
        }
    }

    /// Whether `ancestor` appears in the parent chain above `id`
    fn has_ancestor(&self, id: CameraId, ancestor: CameraId) -> bool {
        let mut visited = FxHashSet::default();
        visited.insert(id);
        let mut current = id;
        while let Some(parent) = self.cameras.get(current).and_then(|e| e.desc.parent) {
            if parent == ancestor {
                return true;
            }
            if visited.len() > MAX_PARENT_DEPTH || !visited.insert(parent) {
                break;
            }
            current = parent;
        }
        false
    }

    /// Number of parent hops above a camera
    pub fn parent_depth(&self, id: CameraId) -> usize {
        let mut visited = FxHashSet::default();
        visited.insert(id);
        let mut depth = 0;
        let mut current = id;
        while let Some(parent) = self.cameras.get(current).and_then(|e| e.desc.parent) {
            if depth >= MAX_PARENT_DEPTH || !visited.insert(parent) {
                break;
            }
            depth += 1;
            current = parent;
        }
        depth
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn contains(&self, id: CameraId) -> bool {
        self.cameras.contains_key(id)
    }

    /// Registered and able to produce a state
    pub fn is_valid(&self, id: CameraId) -> bool {
        self.cameras.get(id).is_some_and(|e| e.camera.is_valid())
    }

    pub fn camera(&self, id: CameraId) -> Option<&dyn VirtualCamera> {
        match self.cameras.get(id) {
            Some(entry) => Some(entry.camera.as_ref()),
            None => None,
        }
    }

    pub fn camera_mut(&mut self, id: CameraId) -> Option<&mut dyn VirtualCamera> {
        match self.cameras.get_mut(id) {
            Some(entry) => Some(entry.camera.as_mut()),
            None => None,
        }
    }

    pub fn name(&self, id: CameraId) -> Option<&str> {
        self.cameras.get(id).map(|e| e.camera.name())
    }

    /// State of a valid camera
    pub fn state(&self, id: CameraId) -> Option<&CameraState> {
        self.cameras
            .get(id)
            .filter(|e| e.camera.is_valid())
            .map(|e| e.camera.state())
    }

    pub fn desc(&self, id: CameraId) -> Option<&CameraDesc> {
        self.cameras.get(id).map(|e| &e.desc)
    }

    pub fn priority(&self, id: CameraId) -> Option<i32> {
        self.cameras.get(id).map(|e| e.desc.priority)
    }

    pub fn is_active(&self, id: CameraId) -> bool {
        self.cameras.get(id).is_some_and(|e| e.active)
    }

    pub fn is_enabled(&self, id: CameraId) -> bool {
        self.cameras.get(id).is_some_and(|e| e.enabled)
    }

    /// Active cameras, highest priority first
    pub fn active_cameras(&self) -> &[CameraId] {
        &self.active
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Find a camera by name
    pub fn find(&self, name: &str) -> Option<CameraId> {
        self.cameras
            .iter()
            .find(|(_, e)| e.camera.name() == name)
            .map(|(id, _)| id)
    }

    /// Highest-priority valid active camera on a layer in `mask`
    pub fn top_priority_visible(&self, mask: u32) -> Option<CameraId> {
        self.active.iter().copied().find(|id| {
            self.cameras
                .get(*id)
                .is_some_and(|e| e.camera.is_valid() && e.desc.layer_mask() & mask != 0)
        })
    }

    // =========================================================================
    // Updating
    // =========================================================================

    pub fn current_filter(&self) -> UpdateFilter {
        self.current_filter
    }

    pub fn set_current_filter(&mut self, filter: UpdateFilter) {
        self.current_filter = filter;
    }

    /// Clock of a camera's most recent update; `Late` if never updated
    pub fn last_update_clock(&self, id: CameraId) -> UpdateClock {
        self.cameras
            .get(id)
            .and_then(|e| e.status)
            .map_or(UpdateClock::Late, |s| s.last_clock)
    }

    /// Run a camera's one-time initialization if it has not run yet
    pub fn ensure_started(&mut self, id: CameraId) {
        if let Some(entry) = self.cameras.get_mut(id) {
            if !entry.started {
                entry.started = true;
                entry.camera.ensure_started();
            }
        }
    }

    /// Update every camera that needs it this pass, leaves first
    ///
    /// Live and always-updating cameras on a layer in `mask` are updated.
    /// At most one other camera is updated per pass, in rotation, and none
    /// during the adaptive physics pass.
    pub fn update_all(&mut self, mask: u32, world_up: Vec3, dt: f32, time: &FrameTime) {
        self.prune_brains();
        self.last_delta_time = dt;

        let filter = self.current_filter;
        let can_update_standby = filter != UpdateFilter::SMART_FIXED;
        let mut round_robin = self.round_robin_last;

        let now = self.time_overrides.current_time(time);
        if self.last_update_time != Some(now) {
            self.last_update_time = Some(now);
            if filter.clock == UpdateClock::Fixed {
                self.fixed_frame_count += 1;
            }
        }

        for depth in (0..self.depth_buckets.len()).rev() {
            let mut j = self.depth_buckets[depth].len();
            while j > 0 {
                j -= 1;
                let id = self.depth_buckets[depth][j];
                if can_update_standby && self.round_robin_last == Some(id) {
                    round_robin = None;
                }

                let Some(entry) = self.cameras.get(id) else {
                    trace!("pruning stale camera at depth {}", depth);
                    self.depth_buckets[depth].remove(j);
                    self.active.retain(|c| *c != id);
                    continue;
                };
                if !entry.camera.is_valid() {
                    continue;
                }
                let standby = entry.desc.standby;
                let in_mask = entry.desc.layer_mask() & mask != 0;
                let active = entry.active;

                if standby == StandbyUpdate::Always || self.is_live(id) {
                    if in_mask {
                        self.update_camera(id, world_up, dt, time);
                    }
                } else if round_robin.is_none()
                    && self.round_robin_last != Some(id)
                    && can_update_standby
                    && standby != StandbyUpdate::Never
                    && active
                {
                    // Standby cameras are updated regardless of their target's clock
                    self.current_filter.smart = false;
                    self.update_camera(id, world_up, dt, time);
                    self.current_filter = filter;
                    round_robin = Some(id);
                }
            }
        }

        if can_update_standby {
            if round_robin == self.round_robin_last {
                round_robin = None;
            }
            self.round_robin_last = round_robin;
        }
    }

    /// Update one camera, at most once per clock tick
    ///
    /// When several ticks passed since its last update, `dt` is scaled to
    /// cover them. A negative `dt` is passed through unchanged.
    pub fn update_camera(&mut self, id: CameraId, world_up: Vec3, dt: f32, time: &FrameTime) {
        let filter = self.current_filter;
        let fixed_frame = self.fixed_frame_count;
        let frame = time.frame as i64;

        let Some(entry) = self.cameras.get_mut(id) else {
            return;
        };
        if !entry.camera.is_valid() {
            return;
        }
        if filter.smart && entry.camera.target_update_clock() != filter.clock {
            return;
        }
        if !entry.started {
            entry.started = true;
            entry.camera.ensure_started();
        }

        let status = entry.status.get_or_insert(UpdateStatus {
            last_frame: frame + 2,
            last_fixed_frame: fixed_frame + 2,
            last_clock: UpdateClock::Late,
            last_delta_time: -2.0,
        });
        let elapsed = match filter.clock {
            UpdateClock::Late => frame - status.last_frame,
            UpdateClock::Fixed => fixed_frame - status.last_fixed_frame,
        };

        let mut dt = dt;
        if dt >= 0.0 {
            if elapsed == 0 && status.last_clock == filter.clock && status.last_delta_time == dt {
                return;
            }
            if elapsed > 0 {
                dt *= elapsed as f32;
            }
        }

        entry.camera.update_camera_state(world_up, dt);
        status.last_frame = frame;
        status.last_fixed_frame = fixed_frame;
        status.last_clock = filter.clock;
        status.last_delta_time = dt;
    }

    // =========================================================================
    // Liveness and solo
    // =========================================================================

    /// Whether any brain is showing or blending to this camera
    pub fn is_live(&self, id: CameraId) -> bool {
        self.brain_order
            .iter()
            .any(|brain| self.is_live_in_brain(*brain, id, false))
    }

    /// Whether one brain is showing or blending to this camera
    ///
    /// A child camera is also live when its parent rig reports it as a live
    /// child and the parent itself is live.
    pub fn is_live_in_brain(&self, brain: BrainId, id: CameraId, dominant_only: bool) -> bool {
        let Some(slot) = self.brains.get(brain).filter(|s| s.is_alive()) else {
            return false;
        };
        let uses = |camera: CameraId| self.solo == Some(camera) || slot.live.uses(camera);
        if uses(id) {
            return true;
        }

        let mut visited = FxHashSet::default();
        visited.insert(id);
        let mut child = id;
        for _ in 0..MAX_PARENT_DEPTH {
            let Some(parent) = self.cameras.get(child).and_then(|e| e.desc.parent) else {
                break;
            };
            if !visited.insert(parent) {
                break;
            }
            let Some(parent_entry) = self.cameras.get(parent) else {
                break;
            };
            if !parent_entry.camera.is_live_child(child, dominant_only) {
                break;
            }
            if uses(parent) {
                return true;
            }
            child = parent;
        }
        false
    }

    /// Valid solo camera, if one is set
    pub fn solo_camera(&self) -> Option<CameraId> {
        self.solo.filter(|id| self.is_valid(*id))
    }

    /// Force every brain to show one camera, bypassing priorities
    ///
    /// A camera that was not live is told it is being transitioned to.
    pub fn set_solo_camera(&mut self, camera: Option<CameraId>) {
        if let Some(id) = camera {
            if !self.is_live(id) {
                let dt = self
                    .time_overrides
                    .uniform_delta_time()
                    .unwrap_or(self.last_delta_time);
                if let Some(cam) = self.camera_mut(id) {
                    cam.on_transition_from_camera(None, Vec3::UP, dt);
                }
            }
            debug!("solo camera set to {:?}", self.name(id));
        }
        self.solo = camera;
    }

    // =========================================================================
    // Time and blend overrides
    // =========================================================================

    pub fn time_overrides(&self) -> &TimeOverrides {
        &self.time_overrides
    }

    pub fn time_overrides_mut(&mut self) -> &mut TimeOverrides {
        &mut self.time_overrides
    }

    pub fn set_blend_override<F>(&mut self, hook: F)
    where
        F: Fn(Option<CameraId>, Option<CameraId>, BlendDefinition, BrainId) -> BlendDefinition + 'static,
    {
        self.blend_override = Some(Box::new(hook));
    }

    pub fn clear_blend_override(&mut self) {
        self.blend_override = None;
    }

    pub(crate) fn apply_blend_override(
        &self,
        from: Option<CameraId>,
        to: Option<CameraId>,
        blend: BlendDefinition,
        brain: BrainId,
    ) -> BlendDefinition {
        match &self.blend_override {
            Some(hook) => hook(from, to, blend, brain),
            None => blend,
        }
    }

    // =========================================================================
    // Brains
    // =========================================================================

    /// Open a slot for a brain; the slot dies with `token`
    pub(crate) fn add_brain(&mut self, token: &Rc<()>) -> BrainId {
        self.prune_brains();
        let id = self.brains.insert(BrainSlot {
            token: Rc::downgrade(token),
            live: BlendState::default(),
            culling_mask: u32::MAX,
            has_output: false,
            listeners: EventListeners::new(),
        });
        self.brain_order.insert(0, id);
        id
    }

    pub(crate) fn remove_brain(&mut self, id: BrainId) {
        self.brains.remove(id);
        self.brain_order.retain(|b| *b != id);
    }

    pub(crate) fn set_live_blend(&mut self, id: BrainId, blend: BlendState) {
        if let Some(slot) = self.brains.get_mut(id) {
            slot.live = blend;
        }
    }

    pub(crate) fn set_brain_output(&mut self, id: BrainId, culling_mask: u32, has_output: bool) {
        if let Some(slot) = self.brains.get_mut(id) {
            slot.culling_mask = culling_mask;
            slot.has_output = has_output;
        }
    }

    /// Composed blend a brain published on its last compose
    pub fn live_blend(&self, id: BrainId) -> Option<&BlendState> {
        self.brains.get(id).filter(|s| s.is_alive()).map(|s| &s.live)
    }

    /// Live brains, most recently added first
    pub fn brains(&self) -> impl Iterator<Item = BrainId> + '_ {
        self.brain_order
            .iter()
            .copied()
            .filter(move |id| self.brains.get(*id).is_some_and(|s| s.is_alive()))
    }

    pub fn brain_count(&self) -> usize {
        self.brains().count()
    }

    fn prune_brains(&mut self) {
        let dead: Vec<BrainId> = self
            .brains
            .iter()
            .filter(|(_, slot)| !slot.is_alive())
            .map(|(id, _)| id)
            .collect();
        for id in dead {
            trace!("pruning dropped brain {:?}", id);
            self.remove_brain(id);
        }
    }

    /// Brain most likely to show a camera
    ///
    /// Prefers a brain with an output that is already showing it, then any
    /// brain with an output whose culling mask includes the camera's layer.
    pub fn find_potential_target_brain(&self, camera: CameraId) -> Option<BrainId> {
        let layer = self.desc(camera)?.layer_mask();
        let with_output: SmallVec<[BrainId; 4]> = self
            .brains()
            .filter(|id| self.brains.get(*id).is_some_and(|s| s.has_output))
            .collect();
        with_output
            .iter()
            .copied()
            .find(|brain| self.is_live_in_brain(*brain, camera, false))
            .or_else(|| {
                with_output.iter().copied().find(|brain| {
                    self.brains
                        .get(*brain)
                        .is_some_and(|s| s.culling_mask & layer != 0)
                })
            })
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Listen to one brain's events
    pub fn subscribe<F>(&mut self, brain: BrainId, listener: F)
    where
        F: FnMut(&BrainEvent) + 'static,
    {
        if let Some(slot) = self.brains.get_mut(brain) {
            slot.listeners.add(listener);
        }
    }

    /// Listen to cut events from every brain
    pub fn on_camera_cut<F>(&mut self, listener: F)
    where
        F: FnMut(&BrainEvent) + 'static,
    {
        self.cut_listeners.add(listener);
    }

    /// Listen to pose pushes from every brain
    pub fn on_pose_updated<F>(&mut self, listener: F)
    where
        F: FnMut(&BrainEvent) + 'static,
    {
        self.pose_listeners.add(listener);
    }

    pub(crate) fn emit(&mut self, event: BrainEvent) {
        if let Some(slot) = self.brains.get_mut(event.brain()) {
            slot.listeners.emit(&event);
        }
        match event {
            BrainEvent::Cut { .. } => self.cut_listeners.emit(&event),
            BrainEvent::PoseUpdated { .. } => self.pose_listeners.emit(&event),
            BrainEvent::Activated { .. } => {}
        }
    }

    /// Send an activation event to every brain the camera is live in
    pub fn generate_activation_event(&mut self, camera: CameraId, from: Option<CameraId>) {
        let brains: Vec<BrainId> = self
            .brains()
            .filter(|brain| self.is_live_in_brain(*brain, camera, false))
            .collect();
        for brain in brains {
            self.emit(BrainEvent::Activated {
                brain,
                incoming: camera,
                outgoing: from,
            });
        }
    }

    /// Send a cut event to every brain the camera is live in
    pub fn generate_cut_event(&mut self, camera: CameraId) {
        let brains: Vec<BrainId> = self
            .brains()
            .filter(|brain| self.is_live_in_brain(*brain, camera, false))
            .collect();
        for brain in brains {
            self.emit(BrainEvent::Cut { brain });
        }
    }
}

impl std::fmt::Debug for CameraRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraRegistry")
            .field("cameras", &self.cameras.len())
            .field("active", &self.active)
            .field("brains", &self.brain_order)
            .field("solo", &self.solo)
            .finish()
    }
}
