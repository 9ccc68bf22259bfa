//! Collision layer system for filtering collision detection
//!
//! Every collider sits on one or more layers and carries a mask of the layers
//! it reacts to. Two colliders interact only when each one's layer is in the
//! other's mask.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Collision layer bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct CollisionLayers: u32 {
        /// Static level geometry
        const WALL = 1 << 0;
        /// Anything driven by a velocity
        const MOVER = 1 << 1;
        /// Player or NPC bodies
        const CHARACTER = 1 << 2;
        /// Bullets, missiles and other short-lived movers
        const PROJECTILE = 1 << 3;
        /// Volumes that report contact but should not block
        const TRIGGER = 1 << 4;
        /// Pickups and collectibles
        const PICKUP = 1 << 5;
        /// Debris and other small effects
        const DEBRIS = 1 << 6;

        // Remaining bits are free for the host
        const _ = !0;
    }
}

impl CollisionLayers {
    /// Check if two colliders should collide based on their layers and masks
    ///
    /// A's layer must be in B's mask and B's layer must be in A's mask.
    pub fn should_collide(
        layer_a: CollisionLayers,
        mask_a: CollisionLayers,
        layer_b: CollisionLayers,
        mask_b: CollisionLayers,
    ) -> bool {
        layer_a.intersects(mask_b) && layer_b.intersects(mask_a)
    }

    /// Combine several layers into one mask
    pub fn mask(layers: &[CollisionLayers]) -> CollisionLayers {
        layers.iter().fold(CollisionLayers::empty(), |acc, &layer| acc | layer)
    }

    /// A custom layer from a bit index in `0..32`
    pub fn custom(bit: u32) -> CollisionLayers {
        CollisionLayers::from_bits_retain(1 << (bit % 32))
    }
}

impl Default for CollisionLayers {
    /// Every bit set: collide with everything
    fn default() -> Self {
        CollisionLayers::all()
    }
}
