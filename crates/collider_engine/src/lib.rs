//! # Collider Engine
//!
//! A 2D collision and movement simulation engine for real-time games.
//!
//! ## Features
//!
//! - **Ray-Cast Prediction**: Moving boxes cast a bundle of rays and stop just
//!   short of the nearest obstacle edge, including edges they slide along
//! - **Adaptive Evaluation**: Fast colliders are re-evaluated more often than
//!   slow ones
//! - **Event Driven**: Collision, movement and change events on every velocity
//!   and on the group
//! - **Deterministic Time**: A pausable group clock over any time source
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use collider_engine::prelude::*;
//! use std::rc::Rc;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let clock = ManualClock::new();
//!     let group = ColliderGroup::new(ColliderGroupConfig::default(), Rc::new(clock.clone()))?;
//!
//!     let wall: ColliderRef = ColliderBox::new(Rect::new(5.0, 0.0, 1.0, 1.0)).shared();
//!     group.add(&wall, &Rc::new(Velocity::stationary()))?;
//!
//!     let ball: ColliderRef = ColliderBox::new(Rect::new(0.0, 0.0, 1.0, 1.0)).shared();
//!     let (velocity, _id) = Velocity::attach(&ball, &group, Angle::RIGHT, 10.0, CollisionBehavior::Bounce)?;
//!     velocity.on_collision.subscribe(|collision| log::info!("hit {}", collision.hit_id));
//!
//!     for _ in 0..60 {
//!         clock.advance_secs(1.0 / 60.0);
//!         group.tick();
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod core;

pub mod config;
pub mod events;
pub mod foundation;
pub mod physics;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ColliderGroupConfig, Config, EngineConfig, SimulationConfig},
        events::{Event, SubscriptionId},
        foundation::{
            math::{Angle, Point2, Vec2},
            time::{Clock, ManualClock, Stopwatch, SystemClock},
        },
        physics::{
            CastingMode, Collider, ColliderBox, ColliderGroup, ColliderId, ColliderRef, Collision,
            CollisionBehavior, CollisionDetector, CollisionLayers, CollisionPrediction, Edge, PhysicsError,
            Rect, RectSide, Velocity,
        },
    };
}
