//! Override frame stack
//!
//! Frame 0 is the in-game frame, driven by camera priority. Frames above it
//! are pushed by external sequencers through `set_override` and composited
//! on top, bottom-up. An override with an unfinished timer and a missing
//! side borrows that side from the layers below, so a sequencer can fade in
//! from (or out to) whatever the game is showing.

use crate::blend::{BlendSource, BlendState};
use crate::camera::CameraId;
use crate::config::BlendDefinition;
use crate::registry::CameraRegistry;
use tracing::trace;
use vantage_core::BlendCurve;

/// One layer of the stack
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub id: i32,
    pub blend: BlendState,
    /// Delta time to use while the simulation is not playing; negative if unset
    pub delta_time_override: f32,
}

impl Frame {
    fn new(id: i32) -> Self {
        Self {
            id,
            blend: BlendState::default(),
            delta_time_override: -1.0,
        }
    }

    /// Whether the layer references at least one valid camera
    pub fn is_active(&self, registry: &CameraRegistry) -> bool {
        self.blend.is_valid(registry)
    }
}

/// What a frame-0 advance did
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Frame0Transition {
    Unchanged,
    /// Incoming camera replaced the outgoing one instantly
    Cut,
    /// Fresh blend from the outgoing camera
    Blend { duration: f32 },
    /// In-flight blend wrapped as the outgoing side of a new blend
    Chained { duration: f32 },
    /// The running blend finished this tick
    Settled,
}

/// Frame 0 plus override layers
#[derive(Clone, Debug)]
pub struct FrameStack {
    frames: Vec<Frame>,
    next_id: i32,
}

impl Default for FrameStack {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStack {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new(0)],
            next_id: 1,
        }
    }

    /// Frame 0 followed by the override layers; never empty
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame0(&self) -> &Frame {
        &self.frames[0]
    }

    /// Override layers, bottom to top
    pub fn overrides(&self) -> &[Frame] {
        &self.frames[1..]
    }

    /// Drop every override and reset frame 0
    pub fn clear(&mut self) {
        self.frames.truncate(1);
        self.frames[0] = Frame::new(0);
    }

    /// Create or update an override layer
    ///
    /// A negative `id` allocates a new layer on top of the stack. The layer
    /// blends linearly from `cam_a` to `cam_b` with `weight_b` as the weight.
    /// Returns the layer id.
    pub fn set_override(
        &mut self,
        id: i32,
        cam_a: Option<CameraId>,
        cam_b: Option<CameraId>,
        weight_b: f32,
        delta_time_override: f32,
    ) -> i32 {
        let id = if id < 0 {
            while self.frames.iter().any(|frame| frame.id == self.next_id) {
                self.next_id += 1;
            }
            let id = self.next_id;
            self.next_id += 1;
            id
        } else {
            self.next_id = self.next_id.max(id.saturating_add(1));
            id
        };

        let index = self.frame_index(id);
        let frame = &mut self.frames[index];
        frame.delta_time_override = delta_time_override;
        frame.blend = BlendState::new(
            cam_a.map(BlendSource::Camera),
            cam_b.map(BlendSource::Camera),
            Some(BlendCurve::Linear),
            1.0,
            weight_b,
        );
        id
    }

    /// Remove an override layer; unknown ids are ignored
    pub fn release_override(&mut self, id: i32) -> bool {
        match self.frames.iter().skip(1).position(|frame| frame.id == id) {
            Some(pos) => {
                self.frames.remove(pos + 1);
                true
            }
            None => false,
        }
    }

    fn frame_index(&mut self, id: i32) -> usize {
        if let Some(pos) = self.frames.iter().skip(1).rposition(|frame| frame.id == id) {
            return pos + 1;
        }
        self.frames.push(Frame::new(id));
        self.frames.len() - 1
    }

    /// Delta time override of the topmost active override layer
    pub fn top_active_delta_time_override(&self, registry: &CameraRegistry) -> Option<f32> {
        self.frames
            .iter()
            .skip(1)
            .rev()
            .find(|frame| frame.is_active(registry))
            .map(|frame| frame.delta_time_override)
    }

    /// Move frame 0 toward `desired` and advance its timer
    ///
    /// `lookup` supplies the blend for an (outgoing, incoming) pair. A
    /// negative `dt` means there is no history to blend from, so any blend
    /// completes immediately.
    pub fn advance_frame0<F>(&mut self, desired: Option<CameraId>, dt: f32, lookup: F) -> Frame0Transition
    where
        F: FnOnce(CameraId, CameraId) -> BlendDefinition,
    {
        let blend = &mut self.frames[0].blend;
        let outgoing = blend.cam_b.as_ref().and_then(BlendSource::camera);
        let mut transition = Frame0Transition::Unchanged;

        if desired != outgoing {
            transition = Frame0Transition::Cut;
            match (outgoing, desired) {
                (Some(outgoing), Some(incoming)) if dt >= 0.0 => {
                    let definition = lookup(outgoing, incoming);
                    match definition.curve().filter(|_| definition.duration() > 0.0) {
                        Some(curve) => {
                            let mut duration = definition.duration();
                            if blend.is_complete() {
                                blend.cam_a = Some(BlendSource::Camera(outgoing));
                                transition = Frame0Transition::Blend { duration };
                            } else {
                                if is_reversal(blend, outgoing, incoming, duration) {
                                    duration *= blend.time_in_blend / blend.duration;
                                }
                                let in_flight = std::mem::take(blend);
                                blend.cam_a = Some(in_flight.into());
                                transition = Frame0Transition::Chained { duration };
                            }
                            blend.curve = Some(curve);
                            blend.duration = duration;
                            blend.time_in_blend = 0.0;
                        }
                        None => blend.collapse(),
                    }
                }
                _ => blend.collapse(),
            }
            blend.cam_b = desired.map(BlendSource::Camera);
        }

        if blend.cam_a.is_some() {
            blend.time_in_blend += if dt >= 0.0 { dt } else { blend.duration };
            if blend.is_complete() {
                trace!("frame 0 blend complete");
                blend.collapse();
                if transition == Frame0Transition::Unchanged {
                    transition = Frame0Transition::Settled;
                }
            }
        }
        transition
    }

    /// Composite the stack into one blend
    ///
    /// The topmost `exclude_top_n` layers are skipped, but frame 0 always
    /// participates.
    pub fn compose(&self, registry: &CameraRegistry, exclude_top_n: usize) -> BlendState {
        let top = self.frames.len().saturating_sub(exclude_top_n).max(1);
        let mut below: Option<(&BlendState, BlendState)> = None;

        for (index, frame) in self.frames[..top].iter().enumerate() {
            if index > 0 && !frame.is_active(registry) {
                continue;
            }
            let mut working = frame.blend.clone();
            if let Some((lower, lower_working)) = &below {
                let unfinished = working.time_in_blend < working.duration;
                if unfinished && (working.cam_a.is_none() || working.cam_b.is_none()) {
                    let fill = if lower.is_complete() {
                        lower.cam_b.clone()
                    } else {
                        Some(BlendSource::Blend(Box::new(lower_working.clone())))
                    };
                    if working.cam_a.is_none() {
                        working.cam_a = fill;
                    } else {
                        working.cam_b = fill;
                    }
                }
            }
            below = Some((&frame.blend, working));
        }

        below.map(|(_, working)| working).unwrap_or_default()
    }
}

/// Backing out of a blend toward the camera it started from
fn is_reversal(blend: &BlendState, outgoing: CameraId, incoming: CameraId, requested: f32) -> bool {
    let from_incoming = match &blend.cam_a {
        Some(BlendSource::Camera(id)) => *id == incoming,
        Some(BlendSource::Blend(nested)) => {
            matches!(nested.cam_b, Some(BlendSource::Camera(id)) if id == incoming)
        }
        None => false,
    };
    let toward_outgoing = matches!(blend.cam_b, Some(BlendSource::Camera(id)) if id == outgoing);
    from_incoming && toward_outgoing && blend.duration > 0.0 && requested <= blend.duration
}
