//! Physics module for collision prediction and movement
//!
//! Provides ray-cast collision prediction against axis-aligned rectangles,
//! per-collider velocities and the [`ColliderGroup`] that advances them.

pub mod collider;
pub mod collider_group;
pub mod collision;
pub mod collision_layers;
pub mod detector;
pub mod error;
pub mod geometry;
pub mod spatial_table;
pub mod velocity;

pub use collider::{same_collider, Collider, ColliderBox, ColliderId, ColliderRef};
pub use collider_group::{ColliderGroup, Obstacle, TickStats};
pub use collision::Collision;
pub use collision_layers::CollisionLayers;
pub use detector::{CastingMode, CollisionDetector, CollisionPrediction};
pub use error::{PhysicsError, PhysicsResult};
pub use geometry::{Edge, Rect, RectSide};
pub use spatial_table::SpatialTable;
pub use velocity::{reflect, CollisionBehavior, EvalFrequency, ValueChanged, Velocity};
