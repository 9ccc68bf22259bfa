//! Ray-cast collision prediction
//!
//! A moving box is turned into a bundle of parallel rays pointing where it is
//! headed. Every ray is tested against the four edges of each nearby obstacle
//! and the nearest contact decides how far the box may travel.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::collider::{same_collider, ColliderRef};
use super::error::PhysicsError;
use super::geometry::{Edge, Rect, RectSide};
use crate::foundation::math::utils::next_float;
use crate::foundation::math::{offset_by_angle, Angle, Point2, Vec2, VERY_SMALL_NUMBER};

/// Spacing of the perimeter rays in [`CastingMode::Precise`]
pub const PRECISE_GRID_STEP: f32 = 0.5;

/// How many rays to cast from the moving box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CastingMode {
    /// One ray from the center
    SingleRay,
    /// The four corners and the center
    Rough,
    /// The four corners and every [`PRECISE_GRID_STEP`] along the perimeter
    #[default]
    Precise,
}

impl FromStr for CastingMode {
    type Err = PhysicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
            "singleray" => Ok(Self::SingleRay),
            "rough" => Ok(Self::Rough),
            "precise" => Ok(Self::Precise),
            _ => Err(PhysicsError::UnsupportedCastingMode(s.to_string())),
        }
    }
}

impl fmt::Display for CastingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SingleRay => "SingleRay",
            Self::Rough => "Rough",
            Self::Precise => "Precise",
        };
        f.write_str(name)
    }
}

/// Result of one prediction
///
/// Designed to be reused: [`CollisionDetector::predict`] resets it on entry,
/// so its contents are only meaningful until the next call.
#[derive(Debug, Clone)]
pub struct CollisionPrediction {
    /// Whether anything was hit
    pub collision_predicted: bool,
    /// Bounds of the obstacle hit
    pub obstacle_bounds: Option<Rect>,
    /// Index of the obstacle hit in the buffers passed to `predict`
    pub obstacle_index: Option<usize>,
    /// Collider that owns the obstacle hit, if it has one
    pub collider: Option<ColliderRef>,
    /// How far the box can travel without touching anything
    ///
    /// Equals the visibility when nothing was hit.
    pub last_known_good_distance: f32,
    /// Top-left corner of the box after travelling `last_known_good_distance`
    pub last_known_good_position: Point2,
    /// The obstacle edge that was struck
    pub edge: Option<Edge>,
    /// Which side of the obstacle `edge` is
    pub side: Option<RectSide>,
    /// X coordinate of the contact point
    pub intersection_x: f32,
    /// Y coordinate of the contact point
    pub intersection_y: f32,
}

impl Default for CollisionPrediction {
    fn default() -> Self {
        Self {
            collision_predicted: false,
            obstacle_bounds: None,
            obstacle_index: None,
            collider: None,
            last_known_good_distance: 0.0,
            last_known_good_position: Point2::origin(),
            edge: None,
            side: None,
            intersection_x: 0.0,
            intersection_y: 0.0,
        }
    }
}

impl CollisionPrediction {
    /// An empty prediction
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every field back to "no collision"
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Contact point
    pub fn intersection(&self) -> Point2 {
        Point2::new(self.intersection_x, self.intersection_y)
    }
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    index: usize,
    side: RectSide,
    edge: Edge,
    point: Point2,
    distance: f32,
}

impl Hit {
    /// Nearest wins; on an exact tie the later hit wins
    fn replaces(&self, best: Option<&Hit>) -> bool {
        best.map_or(true, |best| self.distance <= best.distance)
    }
}

/// True when a box shifted by `offset` actually presses on `side` of `obstacle`
///
/// A ray can meet an edge at its very end while the box only slides past the
/// neighbouring side. The box's span across the side must overlap the edge,
/// or touch its end while still moving inward. Zero-thickness spans count on
/// touch.
fn presses_on(moving: &Rect, offset: Vec2, side: RectSide, obstacle: &Rect, travel: &Vec2) -> bool {
    let (low, high, edge_low, edge_high, drift) = if side.is_horizontal() {
        (moving.left + offset.x, moving.right() + offset.x, obstacle.left, obstacle.right(), travel.x)
    } else {
        (moving.top + offset.y, moving.bottom() + offset.y, obstacle.top, obstacle.bottom(), travel.y)
    };
    if low == high || edge_low == edge_high {
        return low <= edge_high && high >= edge_low;
    }
    (low < edge_high && high > edge_low) || (high == edge_low && drift > 0.0) || (low == edge_high && drift < 0.0)
}

/// Upper bound on the one-ulp steps taken to pull a stopped box clear
const MAX_CLEARANCE_STEPS: usize = 8;

/// One representable step at the largest magnitude among `values`
fn step_at(values: [f32; 3]) -> f32 {
    let magnitude = values.iter().fold(0.0_f32, |max, value| max.max(value.abs()));
    next_float(magnitude, true) - magnitude
}

/// Pull a `width` x `height` box at `position` back off `side` of `obstacle`
///
/// Far from the origin `VERY_SMALL_NUMBER` is below one `f32` step, so the
/// stopping point can round onto the surface. The box is placed flush and
/// then backed off one step at a time until it no longer touches.
fn clear_of(obstacle: &Rect, side: RectSide, mut position: Point2, width: f32, height: f32) -> Point2 {
    let touching = |at: Point2| Rect::new(at.x, at.y, width, height).touches(obstacle);
    for _ in 0..MAX_CLEARANCE_STEPS {
        if !touching(position) {
            break;
        }
        match side {
            RectSide::Left => {
                let flush = position.x.min(obstacle.left - width);
                position.x = flush - step_at([flush, obstacle.left, width]);
            }
            RectSide::Right => {
                let flush = position.x.max(obstacle.right());
                position.x = flush + step_at([flush, obstacle.right(), width]);
            }
            RectSide::Top => {
                let flush = position.y.min(obstacle.top - height);
                position.y = flush - step_at([flush, obstacle.top, height]);
            }
            RectSide::Bottom => {
                let flush = position.y.max(obstacle.bottom());
                position.y = flush + step_at([flush, obstacle.bottom(), height]);
            }
        }
    }
    position
}

/// Casts rays against obstacle rectangles
///
/// Holds only a scratch buffer for ray origins; it carries no state between
/// calls.
#[derive(Debug, Default)]
pub struct CollisionDetector {
    ray_origins: Vec<Point2>,
}

impl CollisionDetector {
    /// Create a detector
    pub fn new() -> Self {
        Self::default()
    }

    /// Predict whether a box moving `visibility` units toward `angle` hits
    /// any of the first `buffer_len` obstacles
    ///
    /// `obstacles` and `colliders` are index-aligned; a `None` collider is a
    /// bare rectangle that takes no part in layer filtering. The moving
    /// collider itself is skipped if it appears among the obstacles.
    pub fn predict<'p>(
        &mut self,
        moving_bounds: Rect,
        moving: Option<&ColliderRef>,
        obstacles: &[Rect],
        angle: Angle,
        colliders: &[Option<ColliderRef>],
        visibility: f32,
        mode: CastingMode,
        buffer_len: usize,
        prediction: &'p mut CollisionPrediction,
    ) -> &'p CollisionPrediction {
        prediction.reset();
        let visibility = if visibility > 0.0 { visibility } else { 0.0 };
        prediction.last_known_good_distance = visibility;
        prediction.last_known_good_position = offset_by_angle(moving_bounds.top_left(), angle, visibility);
        if visibility == 0.0 {
            return prediction;
        }

        self.fill_ray_origins(&moving_bounds, mode);
        let travel = angle.unit_vector() * visibility;
        let count = buffer_len.min(obstacles.len());
        let mut best: Option<Hit> = None;

        for (index, obstacle) in obstacles.iter().take(count).enumerate() {
            let collider = colliders.get(index).and_then(Option::as_ref);
            if let (Some(moving), Some(collider)) = (moving, collider) {
                if same_collider(moving, collider) {
                    continue;
                }
            }
            if moving_bounds.calculate_distance_to(obstacle) > visibility {
                continue;
            }
            if let (Some(moving), Some(collider)) = (moving, collider) {
                let (mover, other) = (moving.borrow(), collider.borrow());
                if !mover.can_collide_with(&*other) || !other.can_collide_with(&*mover) {
                    continue;
                }
            }

            // Only sides the box travels into can stop it; a side it is
            // leaving or sliding along is never a contact
            for (side, edge) in obstacle.sided_edges() {
                if !side.faces(&travel) {
                    continue;
                }
                for origin in &self.ray_origins {
                    let ray = Edge::from_points(*origin, *origin + travel);
                    let Some(point) = ray.intersection(&edge) else {
                        continue;
                    };
                    if !presses_on(&moving_bounds, point - *origin, side, obstacle, &travel) {
                        continue;
                    }
                    let hit = Hit {
                        index,
                        side,
                        edge,
                        point,
                        distance: nalgebra::distance(origin, &point),
                    };
                    if hit.replaces(best.as_ref()) {
                        best = Some(hit);
                    }
                }
            }
        }

        if let Some(hit) = best {
            let obstacle = obstacles[hit.index];
            let safe_distance = (hit.distance - VERY_SMALL_NUMBER).max(0.0);
            let start = moving_bounds.top_left();
            let position = clear_of(
                &obstacle,
                hit.side,
                offset_by_angle(start, angle, safe_distance),
                moving_bounds.width,
                moving_bounds.height,
            );
            prediction.collision_predicted = true;
            prediction.obstacle_bounds = Some(obstacle);
            prediction.obstacle_index = Some(hit.index);
            prediction.collider = colliders.get(hit.index).cloned().flatten();
            prediction.last_known_good_distance = (position - start).dot(&angle.unit_vector()).max(0.0);
            prediction.last_known_good_position = position;
            prediction.edge = Some(hit.edge);
            prediction.side = Some(hit.side);
            prediction.intersection_x = hit.point.x;
            prediction.intersection_y = hit.point.y;
        }
        prediction
    }

    /// The first thing standing between `from` and `to`
    ///
    /// Returns `None` when nothing is hit or when the first thing hit is the
    /// target itself. The target is recognized by collider identity when
    /// `target` is given, otherwise by equal bounds.
    pub fn get_line_of_sight_obstruction(
        &mut self,
        from: Rect,
        viewer: Option<&ColliderRef>,
        to: Rect,
        target: Option<&ColliderRef>,
        obstacles: &[Rect],
        colliders: &[Option<ColliderRef>],
        mode: CastingMode,
    ) -> Option<CollisionPrediction> {
        let angle = Angle::from_points(from.center(), to.center());
        let visibility = nalgebra::distance(&from.center(), &to.center());
        let mut prediction = CollisionPrediction::new();
        self.predict(
            from,
            viewer,
            obstacles,
            angle,
            colliders,
            visibility,
            mode,
            obstacles.len(),
            &mut prediction,
        );

        if !prediction.collision_predicted {
            return None;
        }
        let hit_target = match (target, prediction.collider.as_ref()) {
            (Some(target), Some(hit)) => same_collider(target, hit),
            _ => prediction.obstacle_bounds == Some(to),
        };
        if hit_target {
            None
        } else {
            Some(prediction)
        }
    }

    /// True when nothing but the target lies between `from` and `to`
    pub fn has_line_of_sight(
        &mut self,
        from: Rect,
        viewer: Option<&ColliderRef>,
        to: Rect,
        target: Option<&ColliderRef>,
        obstacles: &[Rect],
        colliders: &[Option<ColliderRef>],
        mode: CastingMode,
    ) -> bool {
        self.get_line_of_sight_obstruction(from, viewer, to, target, obstacles, colliders, mode)
            .is_none()
    }

    fn fill_ray_origins(&mut self, bounds: &Rect, mode: CastingMode) {
        self.ray_origins.clear();
        match mode {
            CastingMode::SingleRay => self.ray_origins.push(bounds.center()),
            CastingMode::Rough => {
                self.ray_origins.extend(bounds.corners());
                self.ray_origins.push(bounds.center());
            }
            CastingMode::Precise => {
                self.ray_origins.extend(bounds.corners());
                let columns = (bounds.width / PRECISE_GRID_STEP).ceil() as usize;
                for i in 1..columns {
                    let x = bounds.left + i as f32 * PRECISE_GRID_STEP;
                    self.ray_origins.push(Point2::new(x, bounds.top));
                    self.ray_origins.push(Point2::new(x, bounds.bottom()));
                }
                let rows = (bounds.height / PRECISE_GRID_STEP).ceil() as usize;
                for i in 1..rows {
                    let y = bounds.top + i as f32 * PRECISE_GRID_STEP;
                    self.ray_origins.push(Point2::new(bounds.left, y));
                    self.ray_origins.push(Point2::new(bounds.right(), y));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::collider::ColliderBox;
    use crate::physics::collision_layers::CollisionLayers;
    use approx::assert_abs_diff_eq;

    const ALL_MODES: [CastingMode; 3] = [CastingMode::SingleRay, CastingMode::Rough, CastingMode::Precise];

    fn boxed(rect: Rect) -> ColliderRef {
        ColliderBox::new(rect).shared()
    }

    fn predict_once(
        moving: Rect,
        obstacles: &[Rect],
        angle: Angle,
        visibility: f32,
        mode: CastingMode,
    ) -> CollisionPrediction {
        let mut detector = CollisionDetector::new();
        let mut prediction = CollisionPrediction::new();
        detector.predict(moving, None, obstacles, angle, &[], visibility, mode, obstacles.len(), &mut prediction);
        prediction
    }

    #[test]
    fn test_obstacle_straight_ahead() {
        // Centers line up so the single center ray also sees the gap of 4
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let obstacle = Rect::new(5.0, 0.0, 1.0, 1.0);
        for mode in ALL_MODES {
            let prediction = predict_once(moving, &[obstacle], Angle::RIGHT, 10.0, mode);
            assert!(prediction.collision_predicted, "{mode}");
            assert_eq!(prediction.obstacle_bounds, Some(obstacle));
            assert_eq!(prediction.side, Some(RectSide::Left), "{mode}");
        }

        let prediction = predict_once(moving, &[obstacle], Angle::RIGHT, 10.0, CastingMode::Precise);
        assert_abs_diff_eq!(prediction.last_known_good_distance, 4.0, epsilon = 1e-4);
        assert!(prediction.last_known_good_distance < 4.0);
        assert_abs_diff_eq!(prediction.intersection_x, 5.0, epsilon = 1e-5);
    }

    #[test]
    fn test_visibility_boundary() {
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let obstacle = Rect::new(5.0, 0.0, 1.0, 1.0);
        for mode in [CastingMode::Rough, CastingMode::Precise] {
            assert!(predict_once(moving, &[obstacle], Angle::RIGHT, 4.0, mode).collision_predicted);
            assert!(!predict_once(moving, &[obstacle], Angle::RIGHT, 3.99, mode).collision_predicted);
        }
    }

    #[test]
    fn test_zero_visibility_returns_immediately() {
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let touching = Rect::new(1.0, 0.0, 1.0, 1.0);
        let prediction = predict_once(moving, &[touching], Angle::RIGHT, 0.0, CastingMode::Precise);
        assert!(!prediction.collision_predicted);
        assert_eq!(prediction.last_known_good_position, Point2::new(0.0, 0.0));
    }

    #[test]
    fn test_miss_reports_full_travel() {
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let behind = Rect::new(-5.0, 0.0, 1.0, 1.0);
        let prediction = predict_once(moving, &[behind], Angle::RIGHT, 2.0, CastingMode::Precise);
        assert!(!prediction.collision_predicted);
        assert_eq!(prediction.last_known_good_distance, 2.0);
        assert_eq!(prediction.last_known_good_position, Point2::new(2.0, 0.0));
    }

    #[test]
    fn test_self_is_never_an_obstacle() {
        let bounds = Rect::new(0.0, 0.0, 1.0, 1.0);
        let me = boxed(bounds);
        let mut detector = CollisionDetector::new();
        let mut prediction = CollisionPrediction::new();
        detector.predict(
            bounds,
            Some(&me),
            &[bounds],
            Angle::DOWN,
            &[Some(me.clone())],
            5.0,
            CastingMode::Precise,
            1,
            &mut prediction,
        );
        assert!(!prediction.collision_predicted);
    }

    #[test]
    fn test_buffer_len_limits_candidates() {
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let obstacles = [Rect::new(10.0, 0.0, 1.0, 1.0), Rect::new(3.0, 0.0, 1.0, 1.0)];
        let mut detector = CollisionDetector::new();
        let mut prediction = CollisionPrediction::new();
        detector.predict(moving, None, &obstacles, Angle::RIGHT, &[], 20.0, CastingMode::Rough, 1, &mut prediction);
        assert_eq!(prediction.obstacle_index, Some(0));
    }

    #[test]
    fn test_layer_filter_is_mutual() {
        let moving_bounds = Rect::new(0.0, 0.0, 1.0, 1.0);
        let wall_bounds = Rect::new(3.0, 0.0, 1.0, 1.0);
        let mover: ColliderRef = ColliderBox::new(moving_bounds)
            .with_layers(CollisionLayers::MOVER, CollisionLayers::WALL)
            .shared();
        let picky_wall: ColliderRef = ColliderBox::new(wall_bounds)
            .with_layers(CollisionLayers::WALL, CollisionLayers::PROJECTILE)
            .shared();

        let mut detector = CollisionDetector::new();
        let mut prediction = CollisionPrediction::new();
        detector.predict(
            moving_bounds,
            Some(&mover),
            &[wall_bounds],
            Angle::RIGHT,
            &[Some(picky_wall)],
            5.0,
            CastingMode::Precise,
            1,
            &mut prediction,
        );
        assert!(!prediction.collision_predicted);
    }

    #[test]
    fn test_thin_mover_along_edge_is_detected() {
        // A flat mover slides along y = 0, the obstacle's top edge
        let moving = Rect::new(0.0, 0.0, 1.0, 0.0);
        let obstacle = Rect::new(4.0, 0.0, 2.0, 2.0);
        let prediction = predict_once(moving, &[obstacle], Angle::RIGHT, 5.0, CastingMode::Rough);
        assert!(prediction.collision_predicted);
        assert_abs_diff_eq!(prediction.intersection_x, 4.0, epsilon = 1e-4);
        assert_abs_diff_eq!(prediction.last_known_good_distance, 3.0, epsilon = 1e-4);
    }

    #[test]
    fn test_flush_fall_prefers_facing_edge() {
        // Falling exactly flush with the obstacle's left side
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let floor = Rect::new(0.0, 3.0, 4.0, 1.0);
        let prediction = predict_once(moving, &[floor], Angle::DOWN, 5.0, CastingMode::Precise);
        assert_eq!(prediction.side, Some(RectSide::Top));
        assert_abs_diff_eq!(prediction.last_known_good_distance, 2.0, epsilon = 1e-4);
    }

    #[test]
    fn test_single_ray_visibility_boundary() {
        // The center ray starts half a unit further back than the corners
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let obstacle = Rect::new(5.0, 0.0, 1.0, 1.0);
        assert!(predict_once(moving, &[obstacle], Angle::RIGHT, 4.5, CastingMode::SingleRay).collision_predicted);
        assert!(!predict_once(moving, &[obstacle], Angle::RIGHT, 4.49, CastingMode::SingleRay).collision_predicted);
    }

    #[test]
    fn test_touching_obstacle_behind_is_ignored() {
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let wall = Rect::new(1.0, 0.0, 1.0, 1.0);
        let floor = Rect::new(-5.0, 1.0, 10.0, 1.0);
        for mode in ALL_MODES {
            // Leaving the wall and sliding along the floor
            let prediction = predict_once(moving, &[wall, floor], Angle::LEFT, 2.0, mode);
            assert!(!prediction.collision_predicted, "{mode}");
            assert_eq!(prediction.last_known_good_position, Point2::new(-2.0, 0.0));

            let prediction = predict_once(moving, &[wall, floor], Angle::UP, 2.0, mode);
            assert!(!prediction.collision_predicted, "{mode}");
        }
    }

    #[test]
    fn test_touching_obstacle_ahead_blocks_at_once() {
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let wall = Rect::new(1.0, 0.0, 1.0, 1.0);
        let prediction = predict_once(moving, &[wall], Angle::RIGHT, 2.0, CastingMode::Precise);
        assert!(prediction.collision_predicted);
        assert_eq!(prediction.side, Some(RectSide::Left));
        assert_eq!(prediction.last_known_good_distance, 0.0);
        let stop = prediction.last_known_good_position;
        assert!(!Rect::new(stop.x, stop.y, 1.0, 1.0).touches(&wall));
    }

    #[test]
    fn test_stop_stays_clear_of_wall_at_origin() {
        let moving = Rect::new(-1.0, 0.0, 1.0, 1.0);
        let wall = Rect::new(0.0, 0.0, 1.0, 1.0);
        let prediction = predict_once(moving, &[wall], Angle::RIGHT, 2.0, CastingMode::Rough);
        assert!(prediction.collision_predicted);
        let stop = prediction.last_known_good_position;
        assert!(stop.x + 1.0 < 0.0);
        assert!(!Rect::new(stop.x, stop.y, 1.0, 1.0).touches(&wall));
    }

    #[test]
    fn test_stop_stays_clear_far_from_origin() {
        // Near x = 1000 one f32 step is larger than VERY_SMALL_NUMBER
        let moving = Rect::new(990.0, 0.0, 1.0, 1.0);
        let wall = Rect::new(1000.0, -5.0, 1.0, 10.0);
        let prediction = predict_once(moving, &[wall], Angle::RIGHT, 20.0, CastingMode::Precise);
        assert!(prediction.collision_predicted);
        let stop = prediction.last_known_good_position;
        let placed = Rect::new(stop.x, stop.y, 1.0, 1.0);
        assert!(placed.right() < 1000.0);
        assert!(!placed.touches(&wall));
        assert_abs_diff_eq!(prediction.last_known_good_distance, 9.0, epsilon = 1e-3);
    }

    #[test]
    fn test_nearest_obstacle_wins() {
        let moving = Rect::new(0.0, 0.0, 1.0, 1.0);
        let far = Rect::new(8.0, 0.0, 1.0, 1.0);
        let near = Rect::new(4.0, 0.0, 1.0, 1.0);
        let prediction = predict_once(moving, &[far, near], Angle::RIGHT, 20.0, CastingMode::Precise);
        assert_eq!(prediction.obstacle_index, Some(1));
    }

    #[test]
    fn test_line_of_sight() {
        let viewer = Rect::new(0.0, 0.0, 1.0, 1.0);
        let target = Rect::new(10.0, 0.0, 1.0, 1.0);
        let wall = Rect::new(5.0, -2.0, 1.0, 5.0);
        let mut detector = CollisionDetector::new();

        assert!(detector.has_line_of_sight(viewer, None, target, None, &[target], &[], CastingMode::Rough));

        let obstruction = detector
            .get_line_of_sight_obstruction(viewer, None, target, None, &[target, wall], &[], CastingMode::Rough)
            .unwrap();
        assert_eq!(obstruction.obstacle_bounds, Some(wall));
    }

    #[test]
    fn test_casting_mode_parsing() {
        assert_eq!("precise".parse::<CastingMode>().unwrap(), CastingMode::Precise);
        assert_eq!("Single_Ray".parse::<CastingMode>().unwrap(), CastingMode::SingleRay);
        assert_eq!(
            "laser".parse::<CastingMode>(),
            Err(PhysicsError::UnsupportedCastingMode("laser".to_string()))
        );
    }
}
