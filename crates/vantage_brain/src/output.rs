//! Output contract
//!
//! A [`CameraOutput`] is the render camera a brain drives. Fields suppressed
//! by the composed state's blend hints are never written.

use std::cell::RefCell;
use std::rc::Rc;
use vantage_core::{LensSettings, Quat, Vec3};

pub trait CameraOutput {
    /// Layers this output renders; cameras outside it are ignored
    fn culling_mask(&self) -> u32 {
        u32::MAX
    }

    fn set_position(&mut self, position: Vec3);

    fn set_orientation(&mut self, orientation: Quat);

    fn set_lens(&mut self, lens: &LensSettings);
}

/// Last values written to a [`SharedOutput`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OutputPose {
    pub position: Option<Vec3>,
    pub orientation: Option<Quat>,
    pub lens: Option<LensSettings>,
    /// Number of individual field writes
    pub writes: u32,
}

/// Output that records what it is given
///
/// Clones share the same record, so a host can keep a handle after boxing
/// one into a brain.
#[derive(Clone, Debug)]
pub struct SharedOutput {
    pose: Rc<RefCell<OutputPose>>,
    culling_mask: u32,
}

impl Default for SharedOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedOutput {
    pub fn new() -> Self {
        Self {
            pose: Rc::new(RefCell::new(OutputPose::default())),
            culling_mask: u32::MAX,
        }
    }

    pub fn with_culling_mask(mut self, mask: u32) -> Self {
        self.culling_mask = mask;
        self
    }

    pub fn pose(&self) -> OutputPose {
        self.pose.borrow().clone()
    }

    pub fn reset(&self) {
        *self.pose.borrow_mut() = OutputPose::default();
    }
}

impl CameraOutput for SharedOutput {
    fn culling_mask(&self) -> u32 {
        self.culling_mask
    }

    fn set_position(&mut self, position: Vec3) {
        let mut pose = self.pose.borrow_mut();
        pose.position = Some(position);
        pose.writes += 1;
    }

    fn set_orientation(&mut self, orientation: Quat) {
        let mut pose = self.pose.borrow_mut();
        pose.orientation = Some(orientation);
        pose.writes += 1;
    }

    fn set_lens(&mut self, lens: &LensSettings) {
        let mut pose = self.pose.borrow_mut();
        pose.lens = Some(lens.clone());
        pose.writes += 1;
    }
}
