//! Scenario runner
//!
//! Drives a registry and one brain the way a game loop would: physics steps
//! from a fixed-step accumulator, then one late update per rendered frame.

use crate::scenario::{Action, Scenario};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info};
use vantage_brain::{
    Brain, BrainEvent, CameraDesc, CameraId, CameraRegistry, FixedCamera, FrameTime, SharedOutput,
    SimClock,
};

/// One rendered frame as seen by the output
#[derive(Debug, Clone, Serialize)]
pub struct FrameRecord {
    pub frame: u64,
    pub time: f32,
    pub active: Option<String>,
    pub blending: bool,
    pub description: String,
    pub position: Option<[f32; 3]>,
    pub orientation: Option<[f32; 4]>,
    pub field_of_view: Option<f32>,
    pub events: Vec<String>,
}

pub struct Simulation {
    registry: CameraRegistry,
    brain: Brain,
    output: SharedOutput,
    clock: SimClock,
    cameras: FxHashMap<String, CameraId>,
    /// Scenario override ids mapped to frame stack ids
    overrides: FxHashMap<i32, i32>,
    actions: Vec<(f32, Action)>,
    next_action: usize,
    events: Rc<RefCell<Vec<BrainEvent>>>,
    frame_dt: f32,
    frame_count: u64,
    print_every: u32,
    started: bool,
}

impl Simulation {
    pub fn new(scenario: Scenario) -> Self {
        let mut registry = CameraRegistry::new();
        let mut cameras = FxHashMap::default();

        for config in &scenario.cameras {
            let camera = FixedCamera::new(config.name.clone(), config.initial_state())
                .with_velocity(config.velocity)
                .on_clock(config.clock);
            let desc = CameraDesc::new(config.priority)
                .on_layer(config.layer)
                .with_standby(config.standby);
            let id = registry.register(Box::new(camera), desc);
            cameras.insert(config.name.clone(), id);
        }
        // Parents first so each camera lands in the right depth bucket
        for config in &scenario.cameras {
            let parent = config.parent.as_ref().and_then(|name| cameras.get(name)).copied();
            if let (Some(id), Some(parent)) = (cameras.get(&config.name), parent) {
                registry.set_parent(*id, Some(parent));
            }
        }
        for config in &scenario.cameras {
            if let (true, Some(id)) = (config.active, cameras.get(&config.name)) {
                registry.enable(*id);
                registry.activate(*id);
            }
        }

        let output = SharedOutput::new();
        let brain = Brain::new(&mut registry, scenario.brain).with_output(Box::new(output.clone()));

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        brain.subscribe(&mut registry, move |event| sink.borrow_mut().push(event.clone()));

        let run = scenario.run;
        let clock = SimClock::new(1.0 / run.fixed_rate).with_time_scale(run.time_scale);

        let mut actions: Vec<(f32, Action)> = scenario
            .actions
            .into_iter()
            .map(|timed| (timed.at, timed.action))
            .collect();
        actions.sort_by(|a, b| a.0.total_cmp(&b.0));

        Self {
            registry,
            brain,
            output,
            clock,
            cameras,
            overrides: FxHashMap::default(),
            actions,
            next_action: 0,
            events,
            frame_dt: 1.0 / run.frame_rate,
            frame_count: run.frame_count(),
            print_every: run.print_every.max(1),
            started: false,
        }
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Run every frame, handing each printed record to `sink`
    pub fn run<F>(&mut self, mut sink: F)
    where
        F: FnMut(&FrameRecord),
    {
        for _ in 0..self.frame_count {
            let record = self.step();
            if record.frame % u64::from(self.print_every) == 0 || !record.events.is_empty() {
                sink(&record);
            }
        }
    }

    /// Advance one rendered frame
    pub fn step(&mut self) -> FrameRecord {
        if !self.started {
            self.started = true;
            self.brain.start(&mut self.registry, &FrameTime::new(0, 0.0, self.frame_dt));
        }

        let step = self.clock.advance(self.frame_dt);
        self.apply_actions(step.frame.time);
        for fixed in &step.fixed {
            self.brain.fixed_update(&mut self.registry, fixed);
        }
        self.brain.late_update(&mut self.registry, &step.frame);

        self.record(&step.frame)
    }

    fn apply_actions(&mut self, now: f32) {
        while let Some((at, action)) = self.actions.get(self.next_action).cloned() {
            if at > now {
                break;
            }
            self.next_action += 1;
            debug!("t={:.3}: {:?}", now, action);
            self.apply(action);
        }
    }

    fn apply(&mut self, action: Action) {
        let registry = &mut self.registry;
        match action {
            Action::Activate { camera } => {
                if let Some(id) = self.cameras.get(&camera).copied() {
                    registry.enable(id);
                    registry.activate(id);
                }
            }
            Action::Deactivate { camera } => {
                if let Some(id) = self.cameras.get(&camera).copied() {
                    registry.deactivate(id);
                    registry.disable(id);
                }
            }
            Action::Priority { camera, priority } => {
                if let Some(id) = self.cameras.get(&camera).copied() {
                    registry.set_priority(id, priority);
                }
            }
            Action::Override {
                id,
                from,
                to,
                weight,
            } => {
                let cam_a = from.and_then(|name| self.cameras.get(&name).copied());
                let cam_b = to.and_then(|name| self.cameras.get(&name).copied());
                let stack_id = self.overrides.get(&id).copied().unwrap_or(-1);
                let stack_id = self
                    .brain
                    .set_override(registry, stack_id, cam_a, cam_b, weight, -1.0);
                self.overrides.insert(id, stack_id);
            }
            Action::Release { id } => {
                if let Some(stack_id) = self.overrides.remove(&id) {
                    self.brain.release_override(stack_id);
                }
            }
            Action::Solo { camera } => {
                let id = self.cameras.get(&camera).copied();
                registry.set_solo_camera(id);
            }
            Action::Unsolo => registry.set_solo_camera(None),
        }
    }

    fn record(&self, time: &FrameTime) -> FrameRecord {
        let registry = &self.registry;
        let name = |id: Option<CameraId>| -> String {
            id.and_then(|id| registry.name(id))
                .unwrap_or("(none)")
                .to_string()
        };

        let events = self
            .events
            .borrow_mut()
            .drain(..)
            .filter_map(|event| match event {
                BrainEvent::Activated {
                    incoming, outgoing, ..
                } => Some(format!("activated {} from {}", name(Some(incoming)), name(outgoing))),
                BrainEvent::Cut { .. } => Some("cut".to_string()),
                BrainEvent::PoseUpdated { .. } => None,
            })
            .collect::<Vec<_>>();
        for event in &events {
            info!("frame {}: {}", time.frame, event);
        }

        let pose = self.output.pose();
        let active = self.brain.active_camera(registry);
        FrameRecord {
            frame: time.frame,
            time: time.time,
            active: active.and_then(|id| registry.name(id)).map(str::to_string),
            blending: self.brain.is_blending(registry),
            description: self.brain.debug_text(registry),
            position: pose.position.map(|p| p.to_array()),
            orientation: pose.orientation.map(|q| [q.x, q.y, q.z, q.w]),
            field_of_view: pose.lens.map(|lens| lens.field_of_view),
            events,
        }
    }
}

impl FrameRecord {
    /// One human-readable line
    pub fn to_line(&self) -> String {
        let position = match self.position {
            Some([x, y, z]) => format!("({:.3}, {:.3}, {:.3})", x, y, z),
            None => "-".to_string(),
        };
        let mut line = format!(
            "{:>5} {:>8.3}s  {:<32} {}",
            self.frame, self.time, self.description, position
        );
        if !self.events.is_empty() {
            line.push_str("  [");
            line.push_str(&self.events.join(", "));
            line.push(']');
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(toml: &str) -> Scenario {
        Scenario::from_toml_str(toml).unwrap()
    }

    const HANDOFF: &str = r#"
        [brain]
        name = "main"
        update_method = "late"
        default_blend = { style = "linear", time = 1.0 }

        [run]
        frame_rate = 10.0
        duration = 3.0

        [[cameras]]
        name = "Wide"
        priority = 10
        position = [0.0, 0.0, 0.0]

        [[cameras]]
        name = "Closeup"
        priority = 5
        position = [10.0, 0.0, 0.0]

        [[actions]]
        at = 0.5
        action = "priority"
        camera = "Closeup"
        priority = 20
    "#;

    fn run_all(sim: &mut Simulation) -> Vec<FrameRecord> {
        let mut records = Vec::new();
        sim.run(|record| records.push(record.clone()));
        records
    }

    #[test]
    fn test_first_frame_activates_top_camera() {
        let mut sim = Simulation::new(scenario(HANDOFF));
        let record = sim.step();
        assert_eq!(record.frame, 1);
        assert_eq!(record.active.as_deref(), Some("Wide"));
        assert_eq!(record.events, vec!["activated Wide from (none)", "cut"]);
        assert_eq!(record.position, Some([0.0, 0.0, 0.0]));
        assert_eq!(record.field_of_view, Some(40.0));
    }

    #[test]
    fn test_priority_change_blends_across() {
        let mut sim = Simulation::new(scenario(HANDOFF));
        assert_eq!(sim.frame_count(), 30);
        let records = run_all(&mut sim);
        assert_eq!(records.len(), 30);

        let switch = records
            .iter()
            .position(|r| r.active.as_deref() == Some("Closeup"))
            .unwrap();
        assert_eq!(records[switch].events, vec!["activated Closeup from Wide"]);
        assert!(records[switch].blending);
        assert!(records[switch].description.contains("from Wide"));

        let mid = &records[switch + 5];
        let x = mid.position.unwrap()[0];
        assert!(x > 0.0 && x < 10.0, "x = {}", x);

        let last = records.last().unwrap();
        assert!(!last.blending);
        assert_eq!(last.position, Some([10.0, 0.0, 0.0]));
    }

    #[test]
    fn test_override_and_release() {
        let mut sim = Simulation::new(scenario(
            r#"
            [run]
            frame_rate = 10.0
            duration = 1.0

            [[cameras]]
            name = "A"
            priority = 10
            position = [0.0, 0.0, 0.0]

            [[cameras]]
            name = "B"
            priority = 1
            position = [4.0, 0.0, 0.0]

            [[actions]]
            at = 0.2
            action = "override"
            id = 7
            from = "A"
            to = "B"
            weight = 0.5

            [[actions]]
            at = 0.6
            action = "release"
            id = 7
            "#,
        ));
        let records = run_all(&mut sim);

        let overridden = &records[3];
        assert_eq!(overridden.position, Some([2.0, 0.0, 0.0]));
        assert!(sim.brain.frame_stack().overrides().is_empty());

        let released = records.last().unwrap();
        assert_eq!(released.position, Some([0.0, 0.0, 0.0]));
        assert_eq!(released.active.as_deref(), Some("A"));
    }

    #[test]
    fn test_solo_and_inactive_cameras() {
        let mut sim = Simulation::new(scenario(
            r#"
            [run]
            frame_rate = 10.0
            duration = 1.0

            [[cameras]]
            name = "A"
            position = [0.0, 0.0, 0.0]

            [[cameras]]
            name = "Hidden"
            priority = 100
            active = false
            position = [5.0, 0.0, 0.0]

            [[actions]]
            at = 0.3
            action = "solo"
            camera = "Hidden"

            [[actions]]
            at = 0.6
            action = "unsolo"
            "#,
        ));
        let first = sim.step();
        assert_eq!(first.active.as_deref(), Some("A"));

        let records = run_all(&mut sim);
        let solo = records
            .iter()
            .find(|r| r.description.contains("SOLO"))
            .unwrap();
        assert_eq!(solo.position, Some([5.0, 0.0, 0.0]));
        assert_eq!(records.last().unwrap().active.as_deref(), Some("A"));
    }

    #[test]
    fn test_json_record() {
        let mut sim = Simulation::new(scenario(HANDOFF));
        let record = sim.step();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["active"], "Wide");
        assert_eq!(json["frame"], 1);
        assert!(json["orientation"].is_array());
        assert!(record.to_line().contains("[activated Wide from (none), cut]"));
    }
}
