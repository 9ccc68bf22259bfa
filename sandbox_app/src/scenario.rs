//! Scenario files
//!
//! A scenario is a [`SimulationConfig`] plus the walls and movers to place in
//! the world. It loads from TOML or RON through the engine's config trait.

use collider_engine::core::config::{Config, SimulationConfig};
use collider_engine::foundation::math::Angle;
use collider_engine::physics::{CollisionBehavior, Rect};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// One moving collider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoverConfig {
    /// Label used in the log
    pub name: String,
    /// Starting bounds
    pub bounds: Rect,
    /// Heading in degrees
    pub angle: Angle,
    /// Units per second
    pub speed: f32,
    /// Reaction to collisions
    #[serde(default)]
    pub behavior: CollisionBehavior,
    /// Remove the mover from the world the first time it collides
    #[serde(default)]
    pub dispose_on_hit: bool,
}

/// Randomly placed movers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomMovers {
    /// How many to spawn
    pub count: usize,
    /// RNG seed, so runs are repeatable
    pub seed: u64,
    /// Area to spawn in
    pub area: Rect,
    /// Side length of each mover
    pub size: f32,
    /// Slowest spawn speed
    pub min_speed: f32,
    /// Fastest spawn speed
    pub max_speed: f32,
}

impl RandomMovers {
    /// Generate the movers
    pub fn generate(&self) -> Vec<MoverConfig> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let max_left = (self.area.width - self.size).max(0.0);
        let max_top = (self.area.height - self.size).max(0.0);
        (0..self.count)
            .map(|i| {
                let left = self.area.left + rng.gen_range(0.0..=max_left);
                let top = self.area.top + rng.gen_range(0.0..=max_top);
                let speed = if self.max_speed > self.min_speed {
                    rng.gen_range(self.min_speed..self.max_speed)
                } else {
                    self.min_speed
                };
                MoverConfig {
                    name: format!("random-{i}"),
                    bounds: Rect::new(left, top, self.size, self.size),
                    angle: Angle::new(rng.gen_range(0.0..360.0)),
                    speed,
                    behavior: CollisionBehavior::Bounce,
                    dispose_on_hit: false,
                }
            })
            .collect()
    }
}

/// Everything needed for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Engine and group settings
    pub simulation: SimulationConfig,
    /// Number of frames to run
    pub frames: u32,
    /// Frames per simulated second
    pub fps: f32,
    /// Static obstacles
    pub walls: Vec<Rect>,
    /// Hand-placed movers
    pub movers: Vec<MoverConfig>,
    /// Generated movers
    pub random_movers: Option<RandomMovers>,
}

impl Scenario {
    /// A walled arena with a few bouncing and disposable movers
    pub fn arena() -> Self {
        let (width, height, thickness) = (80.0, 40.0, 1.0);
        Self {
            simulation: SimulationConfig::default(),
            frames: 600,
            fps: 60.0,
            walls: vec![
                Rect::new(0.0, 0.0, width, thickness),
                Rect::new(0.0, height - thickness, width, thickness),
                Rect::new(0.0, thickness, thickness, height - 2.0 * thickness),
                Rect::new(width - thickness, thickness, thickness, height - 2.0 * thickness),
                Rect::new(38.0, 15.0, 4.0, 10.0),
            ],
            movers: vec![
                MoverConfig {
                    name: "ball".into(),
                    bounds: Rect::new(5.0, 5.0, 1.0, 1.0),
                    angle: Angle::new(30.0),
                    speed: 25.0,
                    behavior: CollisionBehavior::Bounce,
                    dispose_on_hit: false,
                },
                MoverConfig {
                    name: "crate".into(),
                    bounds: Rect::new(10.0, 30.0, 2.0, 2.0),
                    angle: Angle::RIGHT,
                    speed: 8.0,
                    behavior: CollisionBehavior::Stop,
                    dispose_on_hit: false,
                },
                MoverConfig {
                    name: "bullet".into(),
                    bounds: Rect::new(60.0, 20.0, 0.5, 0.5),
                    angle: Angle::LEFT,
                    speed: 70.0,
                    behavior: CollisionBehavior::DoNothing,
                    dispose_on_hit: true,
                },
            ],
            random_movers: Some(RandomMovers {
                count: 12,
                seed: 7,
                area: Rect::new(2.0, 2.0, 30.0, 36.0),
                size: 1.0,
                min_speed: 2.0,
                max_speed: 40.0,
            }),
        }
    }

    /// Hand-placed and generated movers together
    pub fn all_movers(&self) -> Vec<MoverConfig> {
        let mut movers = self.movers.clone();
        if let Some(random) = &self.random_movers {
            movers.extend(random.generate());
        }
        movers
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            frames: 300,
            fps: 60.0,
            walls: Vec::new(),
            movers: Vec::new(),
            random_movers: None,
        }
    }
}

impl Config for Scenario {}

#[cfg(test)]
mod tests {
    use super::*;
    use collider_engine::config::ConfigFormat;

    #[test]
    fn test_random_movers_are_repeatable() {
        let random = Scenario::arena().random_movers.unwrap();
        let first = random.generate();
        assert_eq!(first, random.generate());
        assert_eq!(first.len(), random.count);
        for mover in &first {
            assert!(mover.bounds.left >= random.area.left && mover.bounds.right() <= random.area.right() + 1e-4);
            assert!(mover.speed >= random.min_speed && mover.speed < random.max_speed);
        }
    }

    #[test]
    fn test_scenario_parses_from_toml() {
        let text = r#"
frames = 10

[[walls]]
left = 5.0
top = 0.0
width = 1.0
height = 1.0

[[movers]]
name = "scout"
bounds = { left = 0.0, top = 0.0, width = 1.0, height = 1.0 }
angle = 0.0
speed = 10.0
behavior = "Stop"
"#;
        let scenario = Scenario::from_str_as(text, ConfigFormat::Toml).unwrap();
        assert_eq!(scenario.frames, 10);
        assert_eq!(scenario.fps, 60.0);
        assert_eq!(scenario.walls, vec![Rect::new(5.0, 0.0, 1.0, 1.0)]);
        assert_eq!(scenario.movers[0].behavior, CollisionBehavior::Stop);
        assert!(!scenario.movers[0].dispose_on_hit);
    }

    #[test]
    fn test_arena_round_trips_through_ron() {
        let arena = Scenario::arena();
        let text = arena.to_string_as(ConfigFormat::Ron).unwrap();
        assert_eq!(Scenario::from_str_as(&text, ConfigFormat::Ron).unwrap(), arena);
    }
}
