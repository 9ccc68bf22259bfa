//! Per-collider movement state
//!
//! A [`Velocity`] is shared between the host and the group as an
//! `Rc<Velocity>`. All of its state sits behind `Cell`/`RefCell`, so event
//! handlers can change the angle or speed of any velocity while a tick is in
//! progress.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::collider::{ColliderId, ColliderRef};
use super::collider_group::ColliderGroup;
use super::collision::Collision;
use super::detector::CollisionPrediction;
use super::error::PhysicsResult;
use super::geometry::RectSide;
use crate::core::config::ColliderGroupConfig;
use crate::events::Event;
use crate::foundation::math::Angle;

/// What a velocity does by itself after hitting something
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CollisionBehavior {
    /// Mirror the angle across the axis of the struck edge
    Bounce,
    /// Drop the speed to zero
    Stop,
    /// Leave everything to collision handlers
    #[default]
    DoNothing,
}

/// Old and new value carried by change events
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueChanged<T> {
    /// Value before the change
    pub old: T,
    /// Value after the change
    pub new: T,
}

/// Mirror `angle` off an edge on the given side of an obstacle
///
/// Top and bottom edges flip the vertical component, left and right edges
/// flip the horizontal one.
pub fn reflect(angle: Angle, side: RectSide) -> Angle {
    if side.is_horizontal() {
        Angle::RIGHT.add(-angle.value())
    } else {
        Angle::LEFT.add(-angle.value())
    }
}

/// Maps speed to the minimum interval between two evaluations
///
/// Linear between the two calibration points and clamped outside them, so
/// the curve is continuous.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalFrequency {
    least_frequent: f32,
    most_frequent: f32,
    lowest_speed: f32,
    highest_speed: f32,
}

impl EvalFrequency {
    /// Interval `least_frequent` at `lowest_speed`, `most_frequent` at `highest_speed`
    pub fn new(least_frequent: f32, most_frequent: f32, lowest_speed: f32, highest_speed: f32) -> Self {
        Self {
            least_frequent,
            most_frequent,
            lowest_speed,
            highest_speed,
        }
    }

    /// Calibration taken from a group configuration
    pub fn from_config(config: &ColliderGroupConfig) -> Self {
        Self::new(
            config.least_frequent_eval,
            config.most_frequent_eval,
            config.lowest_speed_for_eval_calc,
            config.highest_speed_for_eval_calc,
        )
    }

    /// Change in interval per unit of speed (negative)
    pub fn slope(&self) -> f32 {
        (self.most_frequent - self.least_frequent) / (self.highest_speed - self.lowest_speed)
    }

    /// Minimum seconds between evaluations at `speed`
    pub fn seconds_for(&self, speed: f32) -> f32 {
        if speed <= self.lowest_speed {
            self.least_frequent
        } else if speed >= self.highest_speed {
            self.most_frequent
        } else {
            self.least_frequent + self.slope() * (speed - self.lowest_speed)
        }
    }
}

impl Default for EvalFrequency {
    fn default() -> Self {
        Self::from_config(&ColliderGroupConfig::default())
    }
}

/// Angle, speed and collision policy of one collider
///
/// The events are fired by the owning [`ColliderGroup`] during a tick, in
/// this order: `before_evaluate`, then either `on_velocity_enforced` alone
/// (not due yet) or `before_move`, any `on_collision`, and finally
/// `on_velocity_enforced`. `on_angle_changed` and `on_speed_changed` fire
/// whenever the value actually changes.
pub struct Velocity {
    angle: Cell<Angle>,
    speed: Cell<f32>,
    speed_ratio: Cell<f32>,
    collision_behavior: Cell<CollisionBehavior>,
    last_evaluation_time: Cell<f64>,
    eval_frequency: Cell<EvalFrequency>,
    group_id: Cell<Option<ColliderId>>,
    next_collision: RefCell<CollisionPrediction>,
    last_collision: RefCell<Option<Collision>>,

    /// Fired at the start of every tick
    pub before_evaluate: Event<()>,
    /// Fired after prediction, before the collider is moved
    pub before_move: Event<()>,
    /// Fired when this collider hits something or is hit
    pub on_collision: Event<Collision>,
    /// Fired at the end of every tick
    pub on_velocity_enforced: Event<()>,
    /// Fired when the angle changes
    pub on_angle_changed: Event<ValueChanged<Angle>>,
    /// Fired when the speed changes
    pub on_speed_changed: Event<ValueChanged<f32>>,
}

impl Velocity {
    /// A velocity heading toward `angle` at `speed` units per second
    pub fn new(angle: Angle, speed: f32) -> Self {
        Self {
            angle: Cell::new(angle),
            speed: Cell::new(speed),
            speed_ratio: Cell::new(1.0),
            collision_behavior: Cell::new(CollisionBehavior::default()),
            last_evaluation_time: Cell::new(0.0),
            eval_frequency: Cell::new(EvalFrequency::default()),
            group_id: Cell::new(None),
            next_collision: RefCell::new(CollisionPrediction::new()),
            last_collision: RefCell::new(None),
            before_evaluate: Event::new(),
            before_move: Event::new(),
            on_collision: Event::new(),
            on_velocity_enforced: Event::new(),
            on_angle_changed: Event::new(),
            on_speed_changed: Event::new(),
        }
    }

    /// A stationary velocity
    pub fn stationary() -> Self {
        Self::new(Angle::RIGHT, 0.0)
    }

    /// Set the collision behavior
    pub fn with_behavior(self, behavior: CollisionBehavior) -> Self {
        self.collision_behavior.set(behavior);
        self
    }

    /// Set the per-velocity time dilation
    pub fn with_speed_ratio(self, speed_ratio: f32) -> Self {
        self.speed_ratio.set(speed_ratio);
        self
    }

    /// Create a velocity and register it with `collider` in `group`
    pub fn attach(
        collider: &ColliderRef,
        group: &ColliderGroup,
        angle: Angle,
        speed: f32,
        behavior: CollisionBehavior,
    ) -> PhysicsResult<(Rc<Velocity>, ColliderId)> {
        let velocity = Rc::new(Self::new(angle, speed).with_behavior(behavior));
        let id = group.add(collider, &velocity)?;
        Ok((velocity, id))
    }

    /// Direction of travel
    pub fn angle(&self) -> Angle {
        self.angle.get()
    }

    /// Change direction; fires `on_angle_changed` if it differs
    pub fn set_angle(&self, angle: Angle) {
        let old = self.angle.replace(angle);
        if old != angle {
            self.on_angle_changed.fire(&ValueChanged { old, new: angle });
        }
    }

    /// Units per second
    pub fn speed(&self) -> f32 {
        self.speed.get()
    }

    /// Change speed; fires `on_speed_changed` if it differs
    pub fn set_speed(&self, speed: f32) {
        let old = self.speed.replace(speed);
        if old != speed {
            self.on_speed_changed.fire(&ValueChanged { old, new: speed });
        }
    }

    /// Per-velocity time dilation
    pub fn speed_ratio(&self) -> f32 {
        self.speed_ratio.get()
    }

    /// Set the per-velocity time dilation
    pub fn set_speed_ratio(&self, speed_ratio: f32) {
        self.speed_ratio.set(speed_ratio);
    }

    /// Reaction to a collision
    pub fn collision_behavior(&self) -> CollisionBehavior {
        self.collision_behavior.get()
    }

    /// Set the reaction to a collision
    pub fn set_collision_behavior(&self, behavior: CollisionBehavior) {
        self.collision_behavior.set(behavior);
    }

    /// Group time, in seconds, of the last full evaluation
    pub fn last_evaluation_time(&self) -> f64 {
        self.last_evaluation_time.get()
    }

    /// Minimum seconds between evaluations at the current speed
    pub fn eval_frequency_seconds(&self) -> f32 {
        self.eval_frequency.get().seconds_for(self.speed())
    }

    /// Earliest group time, in seconds, at which this velocity is due again
    pub fn min_eval_seconds(&self) -> f64 {
        self.last_evaluation_time() + f64::from(self.eval_frequency_seconds())
    }

    /// Id in the group this velocity is registered with
    pub fn group_id(&self) -> Option<ColliderId> {
        self.group_id.get()
    }

    /// Prediction from the latest evaluation
    pub fn next_collision(&self) -> CollisionPrediction {
        self.next_collision.borrow().clone()
    }

    /// Most recent collision this velocity took part in
    pub fn last_collision(&self) -> Option<Collision> {
        self.last_collision.borrow().clone()
    }

    /// Zero the speed
    pub fn stop(&self) {
        self.set_speed(0.0);
    }

    /// Mirror the angle off the edge the prediction struck
    ///
    /// Does nothing if the prediction has no collision.
    pub fn bounce_off(&self, prediction: &CollisionPrediction) {
        // Predictions built by hand may carry only the edge
        let side = prediction.side.or_else(|| {
            let edge = prediction.edge?;
            prediction
                .obstacle_bounds
                .and_then(|bounds| bounds.side_of(&edge))
                .or(Some(if edge.is_horizontal() { RectSide::Top } else { RectSide::Left }))
        });
        if let (true, Some(side)) = (prediction.collision_predicted, side) {
            self.set_angle(reflect(self.angle(), side));
        }
    }

    pub(crate) fn register(&self, id: ColliderId, eval_frequency: EvalFrequency, now: f64) {
        self.group_id.set(Some(id));
        self.eval_frequency.set(eval_frequency);
        self.last_evaluation_time.set(now);
    }

    pub(crate) fn unregister(&self) {
        self.group_id.set(None);
    }

    pub(crate) fn mark_evaluated(&self, now: f64, prediction: &CollisionPrediction) {
        self.last_evaluation_time.set(now);
        self.next_collision.borrow_mut().clone_from(prediction);
    }

    pub(crate) fn mark_idle(&self, now: f64) {
        self.last_evaluation_time.set(now);
    }

    pub(crate) fn record_collision(&self, collision: Collision) {
        *self.last_collision.borrow_mut() = Some(collision);
    }
}

impl Default for Velocity {
    fn default() -> Self {
        Self::stationary()
    }
}

impl fmt::Debug for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Velocity")
            .field("angle", &self.angle())
            .field("speed", &self.speed())
            .field("speed_ratio", &self.speed_ratio())
            .field("collision_behavior", &self.collision_behavior())
            .field("group_id", &self.group_id())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::geometry::{Edge, Rect};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_eval_frequency_boundaries() {
        let frequency = EvalFrequency::default();
        assert_eq!(frequency.seconds_for(0.0), 0.05);
        assert_eq!(frequency.seconds_for(-3.0), 0.05);
        assert_eq!(frequency.seconds_for(60.0), 0.002);
        assert_eq!(frequency.seconds_for(500.0), 0.002);
        assert_abs_diff_eq!(frequency.seconds_for(30.0), 0.026, epsilon = 1e-6);
    }

    #[test]
    fn test_eval_frequency_is_monotonic() {
        let frequency = EvalFrequency::default();
        let mut previous = frequency.seconds_for(0.0);
        for speed in 1..=80 {
            let current = frequency.seconds_for(speed as f32);
            assert!(current <= previous);
            previous = current;
        }
    }

    #[test]
    fn test_reflect_law() {
        assert_eq!(reflect(Angle::DOWN, RectSide::Top), Angle::UP);
        assert_eq!(reflect(Angle::UP, RectSide::Bottom), Angle::DOWN);
        assert_eq!(reflect(Angle::RIGHT, RectSide::Left), Angle::LEFT);
        assert_abs_diff_eq!(reflect(Angle::new(45.0), RectSide::Top).value(), 315.0, epsilon = 1e-4);
        assert_abs_diff_eq!(reflect(Angle::new(45.0), RectSide::Left).value(), 135.0, epsilon = 1e-4);
    }

    #[test]
    fn test_change_events_fire_only_on_change() {
        let velocity = Velocity::new(Angle::RIGHT, 5.0);
        let log = Rc::new(RefCell::new(Vec::new()));

        let angles = Rc::clone(&log);
        velocity
            .on_angle_changed
            .subscribe(move |change: &ValueChanged<Angle>| angles.borrow_mut().push(change.new.value()));
        let speeds = Rc::clone(&log);
        velocity
            .on_speed_changed
            .subscribe(move |change: &ValueChanged<f32>| speeds.borrow_mut().push(change.new));

        velocity.set_angle(Angle::RIGHT);
        velocity.set_speed(5.0);
        assert!(log.borrow().is_empty());

        velocity.set_angle(Angle::DOWN);
        velocity.stop();
        assert_eq!(*log.borrow(), vec![90.0, 0.0]);
    }

    #[test]
    fn test_bounce_off_prediction() {
        let velocity = Velocity::new(Angle::DOWN, 1.0).with_behavior(CollisionBehavior::Bounce);
        let obstacle = Rect::new(0.0, 5.0, 10.0, 1.0);
        let mut prediction = CollisionPrediction::new();

        velocity.bounce_off(&prediction);
        assert_eq!(velocity.angle(), Angle::DOWN);

        prediction.collision_predicted = true;
        prediction.edge = Some(obstacle.top_edge());
        prediction.side = Some(RectSide::Top);
        velocity.bounce_off(&prediction);
        assert_eq!(velocity.angle(), Angle::UP);

        // Without a side the edge orientation decides
        prediction.side = None;
        prediction.edge = Some(Edge::new(3.0, 0.0, 3.0, 4.0));
        velocity.set_angle(Angle::RIGHT);
        velocity.bounce_off(&prediction);
        assert_eq!(velocity.angle(), Angle::LEFT);

        // With the obstacle known the side is looked up from it
        prediction.obstacle_bounds = Some(obstacle);
        prediction.edge = Some(obstacle.right_edge());
        velocity.bounce_off(&prediction);
        assert_eq!(velocity.angle(), Angle::RIGHT);
    }

    #[test]
    fn test_min_eval_seconds() {
        let velocity = Velocity::new(Angle::RIGHT, 0.0);
        velocity.register(ColliderId::new(3), EvalFrequency::default(), 1.0);
        assert_eq!(velocity.group_id(), Some(ColliderId::new(3)));
        assert_abs_diff_eq!(velocity.min_eval_seconds(), 1.05, epsilon = 1e-6);
        velocity.unregister();
        assert_eq!(velocity.group_id(), None);
    }
}
