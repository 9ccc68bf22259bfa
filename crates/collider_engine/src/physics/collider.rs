//! The collider abstraction
//!
//! Colliders are owned by the host (game objects, UI elements, tests). The
//! engine only ever sees them through [`ColliderRef`] handles and keeps weak
//! references, so dropping the last strong handle is enough to make a
//! collider disappear from every group.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::collision_layers::CollisionLayers;
use super::geometry::Rect;

/// Anything with bounds that takes part in collision detection
pub trait Collider: fmt::Debug {
    /// Current bounding rectangle
    fn bounds(&self) -> Rect;

    /// Place the top-left corner at `(x, y)`
    fn move_to(&mut self, x: f32, y: f32);

    /// Layers this collider occupies
    fn collision_layer(&self) -> CollisionLayers {
        CollisionLayers::all()
    }

    /// Layers this collider reacts to
    fn collision_mask(&self) -> CollisionLayers {
        CollisionLayers::all()
    }

    /// Whether contact with `other` should count as a collision
    fn can_collide_with(&self, other: &dyn Collider) -> bool {
        CollisionLayers::should_collide(
            self.collision_layer(),
            self.collision_mask(),
            other.collision_layer(),
            other.collision_mask(),
        )
    }

    /// Veto hook consulted before every move
    fn can_move_to(&self, _bounds: &Rect) -> bool {
        true
    }
}

/// Shared handle to a host-owned collider
pub type ColliderRef = Rc<RefCell<dyn Collider>>;

/// True when both handles point at the same collider
pub fn same_collider(a: &ColliderRef, b: &ColliderRef) -> bool {
    std::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
}

/// Address-based identity used to detect double registration
pub(crate) fn collider_address(collider: &ColliderRef) -> usize {
    Rc::as_ptr(collider).cast::<()>() as usize
}

/// Identifier assigned by a group on registration
///
/// Ids are strictly increasing within a group and never reused. They double
/// as the hash code that picks a collider's bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColliderId(u64);

impl ColliderId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Bucket index in a table with `bucket_count` buckets
    pub fn bucket(self, bucket_count: usize) -> usize {
        (self.0 % bucket_count as u64) as usize
    }
}

impl fmt::Display for ColliderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stock collider: a rectangle with layer filtering
#[derive(Debug, Clone, PartialEq)]
pub struct ColliderBox {
    /// Current bounds
    pub bounds: Rect,
    /// Layers occupied
    pub layer: CollisionLayers,
    /// Layers reacted to
    pub mask: CollisionLayers,
}

impl ColliderBox {
    /// A box that collides with everything
    pub fn new(bounds: Rect) -> Self {
        Self {
            bounds,
            layer: CollisionLayers::all(),
            mask: CollisionLayers::all(),
        }
    }

    /// Set layer and mask
    pub fn with_layers(mut self, layer: CollisionLayers, mask: CollisionLayers) -> Self {
        self.layer = layer;
        self.mask = mask;
        self
    }

    /// Wrap in a shared handle
    pub fn shared(self) -> Rc<RefCell<ColliderBox>> {
        Rc::new(RefCell::new(self))
    }
}

impl Collider for ColliderBox {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn move_to(&mut self, x: f32, y: f32) {
        self.bounds = self.bounds.move_to(x, y);
    }

    fn collision_layer(&self) -> CollisionLayers {
        self.layer
    }

    fn collision_mask(&self) -> CollisionLayers {
        self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_handle_type() {
        let concrete = ColliderBox::new(Rect::new(0.0, 0.0, 1.0, 1.0)).shared();
        let a: ColliderRef = concrete.clone();
        let b: ColliderRef = concrete;
        let other: ColliderRef = ColliderBox::new(Rect::new(0.0, 0.0, 1.0, 1.0)).shared();

        assert!(same_collider(&a, &b));
        assert!(!same_collider(&a, &other));
        assert_eq!(collider_address(&a), collider_address(&b));
    }

    #[test]
    fn test_layer_filtering_through_trait() {
        let wall = ColliderBox::new(Rect::new(0.0, 0.0, 1.0, 1.0))
            .with_layers(CollisionLayers::WALL, CollisionLayers::MOVER);
        let ghost = ColliderBox::new(Rect::new(0.0, 0.0, 1.0, 1.0))
            .with_layers(CollisionLayers::MOVER, CollisionLayers::PICKUP);
        let mover = ColliderBox::new(Rect::new(0.0, 0.0, 1.0, 1.0))
            .with_layers(CollisionLayers::MOVER, CollisionLayers::WALL);

        assert!(mover.can_collide_with(&wall));
        assert!(!ghost.can_collide_with(&wall));
    }

    #[test]
    fn test_bucket_index() {
        assert_eq!(ColliderId::new(301).bucket(300), 1);
        assert_eq!(ColliderId::new(7).bucket(300), 7);
        assert_eq!(ColliderId::new(7).to_string(), "#7");
    }

    #[test]
    fn test_move_to_keeps_size() {
        let mut collider = ColliderBox::new(Rect::new(0.0, 0.0, 2.0, 3.0));
        collider.move_to(5.0, 6.0);
        assert_eq!(collider.bounds(), Rect::new(5.0, 6.0, 2.0, 3.0));
    }
}
