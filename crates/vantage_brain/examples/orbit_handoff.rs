//! Orbit Handoff Demo
//!
//! A host-defined orbiting camera hands control to a static closeup and back,
//! driven by a fixed-step host loop.
//!
//! Run with: RUST_LOG=debug cargo run -p vantage_brain --example orbit_handoff

use vantage_brain::{
    BlendDefinition, BlendStyle, Brain, BrainConfig, BrainEvent, CameraDesc, CameraRegistry,
    CustomBlend, FixedCamera, SharedOutput, SimClock, UpdateClock, VirtualCamera,
};
use vantage_core::{CameraState, Quat, Vec3};

/// Circles the origin at a fixed height, always looking at the center
struct OrbitCamera {
    name: String,
    radius: f32,
    height: f32,
    speed: f32,
    angle: f32,
    state: CameraState,
}

impl OrbitCamera {
    fn new(name: &str, radius: f32, height: f32, speed: f32) -> Self {
        let mut camera = Self {
            name: name.to_string(),
            radius,
            height,
            speed,
            angle: 0.0,
            state: CameraState::default(),
        };
        camera.place(Vec3::UP);
        camera
    }

    fn place(&mut self, world_up: Vec3) {
        let position = Vec3::new(
            self.radius * self.angle.cos(),
            self.height,
            self.radius * self.angle.sin(),
        );
        let forward = (Vec3::ZERO - position).normalize();
        self.state.position = position;
        self.state.orientation = Quat::look_rotation(forward, world_up);
    }
}

impl VirtualCamera for OrbitCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &CameraState {
        &self.state
    }

    fn update_camera_state(&mut self, world_up: Vec3, dt: f32) {
        if dt > 0.0 {
            self.angle += self.speed * dt;
        }
        self.place(world_up);
    }

    fn target_update_clock(&self) -> UpdateClock {
        UpdateClock::Fixed
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut registry = CameraRegistry::new();
    let orbit = registry.spawn(
        Box::new(OrbitCamera::new("Orbit", 12.0, 4.0, 0.5)),
        CameraDesc::new(10),
    );
    let closeup = registry.spawn(
        Box::new(FixedCamera::new(
            "Closeup",
            CameraState::at(Vec3::new(0.0, 1.6, 3.0)),
        )),
        CameraDesc::new(0),
    );

    let config = BrainConfig::default()
        .with_default_blend(BlendDefinition::new(BlendStyle::EaseInOut, 1.0))
        .with_custom_blend(CustomBlend::new("Closeup", "Orbit", BlendDefinition::cut()));
    let output = SharedOutput::new();
    let mut brain = Brain::new(&mut registry, config).with_output(Box::new(output.clone()));

    registry.on_camera_cut(|event| println!("cut on {:?}", event.brain()));
    brain.subscribe(&mut registry, |event| {
        if let BrainEvent::Activated { incoming, .. } = event {
            println!("activated {:?}", incoming);
        }
    });

    let mut clock = SimClock::new(1.0 / 50.0);
    let frame_dt = 1.0 / 60.0;
    for _ in 0..240 {
        let step = clock.advance(frame_dt);
        match step.frame.frame {
            60 => registry.set_priority(closeup, 20),
            150 => registry.set_priority(closeup, 0),
            _ => {}
        }
        for fixed in &step.fixed {
            brain.fixed_update(&mut registry, fixed);
        }
        brain.late_update(&mut registry, &step.frame);

        if step.frame.frame % 20 == 0 {
            let pose = output.pose();
            println!(
                "{:>4} {:<28} {:?}",
                step.frame.frame,
                brain.debug_text(&registry),
                pose.position.map(Vec3::to_array)
            );
        }
    }

    assert_eq!(brain.active_camera(&registry), Some(orbit));
    brain.disable(&mut registry);
}
