//! Runs a scenario against a collider group on a manual clock

use std::cell::RefCell;
use std::rc::Rc;

use collider_engine::foundation::time::ManualClock;
use collider_engine::physics::{
    ColliderBox, ColliderGroup, ColliderId, ColliderRef, Collision, CollisionLayers, PhysicsError, Velocity,
};
use log::{debug, info, warn};
use thiserror::Error;

use crate::scenario::{MoverConfig, Scenario};

/// Errors that stop a run
#[derive(Error, Debug)]
pub enum SandboxError {
    /// The engine rejected the scenario
    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    /// The scenario file could not be used
    #[error("config error: {0}")]
    Config(#[from] collider_engine::config::ConfigError),

    /// Bad command line
    #[error("usage error: {0}")]
    Usage(String),
}

struct Mover {
    name: String,
    collider: ColliderRef,
    velocity: Rc<Velocity>,
    id: ColliderId,
}

/// Totals reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Frames ticked
    pub frames: u32,
    /// Collisions the group resolved
    pub collisions: usize,
    /// Movers removed by `dispose_on_hit`
    pub disposed: usize,
    /// Colliders still tracked at the end
    pub tracked: usize,
}

/// A populated world ready to run
pub struct Sandbox {
    clock: ManualClock,
    group: Rc<ColliderGroup>,
    // Held so the group's weak references stay alive
    _walls: Vec<(ColliderRef, Rc<Velocity>)>,
    movers: Vec<Mover>,
    summary: Rc<RefCell<Summary>>,
    frame_seconds: f32,
    validate_every_frame: bool,
}

impl Sandbox {
    /// Build the world described by `scenario`
    pub fn new(scenario: &Scenario) -> Result<Self, SandboxError> {
        scenario.simulation.validate()?;
        if !(scenario.fps > 0.0) {
            return Err(SandboxError::Usage(format!("fps must be positive, got {}", scenario.fps)));
        }

        let clock = ManualClock::new();
        let group = Rc::new(ColliderGroup::new(scenario.simulation.physics.clone(), Rc::new(clock.clone()))?);
        let summary = Rc::new(RefCell::new(Summary::default()));

        let counter = Rc::clone(&summary);
        group.on_collision.subscribe(move |collision: &Collision| {
            counter.borrow_mut().collisions += 1;
            debug!(
                "{} hit {} heading {} at speed {:.2}",
                collision.mover_id, collision.hit_id, collision.angle, collision.speed
            );
        });

        let mut walls = Vec::with_capacity(scenario.walls.len());
        for bounds in &scenario.walls {
            let wall: ColliderRef = ColliderBox::new(*bounds)
                .with_layers(CollisionLayers::WALL, CollisionLayers::all())
                .shared();
            let velocity = Rc::new(Velocity::stationary());
            group.add(&wall, &velocity)?;
            walls.push((wall, velocity));
        }

        let mut movers = Vec::new();
        for config in scenario.all_movers() {
            movers.push(Self::spawn(&group, &summary, config)?);
        }
        info!("Sandbox ready: {} walls, {} movers", walls.len(), movers.len());

        Ok(Self {
            clock,
            group,
            _walls: walls,
            movers,
            summary,
            frame_seconds: 1.0 / scenario.fps,
            validate_every_frame: scenario.simulation.engine.debug_mode,
        })
    }

    fn spawn(group: &Rc<ColliderGroup>, summary: &Rc<RefCell<Summary>>, config: MoverConfig) -> Result<Mover, SandboxError> {
        let collider: ColliderRef = ColliderBox::new(config.bounds)
            .with_layers(CollisionLayers::MOVER, CollisionLayers::all())
            .shared();
        let (velocity, id) = Velocity::attach(&collider, group, config.angle, config.speed, config.behavior)?;

        if config.dispose_on_hit {
            let weak_group = Rc::downgrade(group);
            let summary = Rc::clone(summary);
            let name = config.name.clone();
            velocity.on_collision.subscribe(move |_: &Collision| {
                let Some(group) = weak_group.upgrade() else {
                    return;
                };
                // A second hit in the same tick finds it already gone
                if group.contains(id) && group.remove(id).is_ok() {
                    summary.borrow_mut().disposed += 1;
                    info!("{name} disposed on impact");
                }
            });
        }

        Ok(Mover {
            name: config.name,
            collider,
            velocity,
            id,
        })
    }

    /// Advance the clock one frame and tick the group
    pub fn step(&self) -> Result<(), SandboxError> {
        self.clock.advance_secs(self.frame_seconds);
        self.group.tick();
        self.summary.borrow_mut().frames += 1;
        if self.validate_every_frame {
            self.group.validate_entries()?;
        }
        Ok(())
    }

    /// Run `frames` frames and report the totals
    pub fn run(&self, frames: u32) -> Result<Summary, SandboxError> {
        for _ in 0..frames {
            self.step()?;
        }
        self.report();
        Ok(self.summary())
    }

    /// Totals so far
    pub fn summary(&self) -> Summary {
        Summary {
            tracked: self.group.count(),
            ..self.summary.borrow().clone()
        }
    }

    fn report(&self) {
        let stats = self.group.last_tick_stats();
        info!(
            "Finished at {:.2}s group time; last tick: {} evaluated, {} skipped",
            self.group.now(),
            stats.evaluated,
            stats.skipped
        );
        for mover in &self.movers {
            let bounds = mover.collider.borrow().bounds();
            if self.group.contains(mover.id) {
                info!(
                    "{:>10} at ({:7.2}, {:7.2}) heading {} at {:.2}",
                    mover.name,
                    bounds.left,
                    bounds.top,
                    mover.velocity.angle(),
                    mover.velocity.speed()
                );
            } else {
                warn!("{:>10} left the simulation at ({:.2}, {:.2})", mover.name, bounds.left, bounds.top);
            }
        }
    }
}
