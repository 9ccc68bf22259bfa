//! Collision event payload

use super::collider::{ColliderId, ColliderRef};
use super::detector::CollisionPrediction;
use crate::foundation::math::Angle;

/// One collision, as seen by the collider that was moving
///
/// A snapshot taken when the collision is resolved. Consumers get it by
/// reference during event dispatch and may clone it if they need to keep it.
#[derive(Debug, Clone)]
pub struct Collision {
    /// Id of the collider that moved
    pub mover_id: ColliderId,
    /// The collider that moved
    pub moving_object: ColliderRef,
    /// Id of the collider that was hit
    pub hit_id: ColliderId,
    /// The collider that was hit
    pub object_hit: ColliderRef,
    /// Direction of travel at the moment of impact
    pub angle: Angle,
    /// Speed at the moment of impact
    pub speed: f32,
    /// The prediction that found the contact
    pub prediction: CollisionPrediction,
}

impl Collision {
    /// The same collision with the angle pointing back at the mover
    ///
    /// Delivered to the struck collider's own velocity.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            angle: self.angle.opposite(),
            ..self.clone()
        }
    }
}
