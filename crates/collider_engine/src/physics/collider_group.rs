//! The collision and movement scheduler
//!
//! A [`ColliderGroup`] tracks (collider, velocity) pairs in a
//! [`SpatialTable`] and advances all of them once per [`ColliderGroup::tick`].
//!
//! Each tick works on a snapshot: the tracked entries and every collider's
//! bounds are copied into scratch buffers before anything moves, so all
//! colliders see the same world and handlers are free to add or remove
//! colliders while the tick runs. A collider removed mid-tick is skipped if
//! its turn has not come yet; its bounds stay in the obstacle snapshot until
//! the tick ends.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use log::{debug, error, trace, warn};

use super::collider::{collider_address, Collider, ColliderId, ColliderRef};
use super::collision::Collision;
use super::detector::{CollisionDetector, CollisionPrediction};
use super::error::{PhysicsError, PhysicsResult};
use super::geometry::Rect;
use super::spatial_table::SpatialTable;
use super::velocity::{reflect, CollisionBehavior, EvalFrequency, Velocity};
use crate::core::config::ColliderGroupConfig;
use crate::events::Event;
use crate::foundation::math::Point2;
use crate::foundation::time::{Clock, Stopwatch, SystemClock};

/// Counters for the most recent tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Velocities that ran a full prediction
    pub evaluated: usize,
    /// Velocities that were idle or not yet due
    pub skipped: usize,
    /// Collisions resolved
    pub collisions: usize,
    /// Entries dropped because their collider or velocity no longer exists
    pub purged: usize,
}

/// A tracked collider as seen by queries
#[derive(Debug, Clone)]
pub struct Obstacle {
    /// Id assigned by the group
    pub id: ColliderId,
    /// Bounds at the time of the query
    pub bounds: Rect,
    /// The collider
    pub collider: ColliderRef,
}

#[derive(Clone)]
struct Entry {
    collider: Weak<RefCell<dyn Collider>>,
    velocity: Weak<Velocity>,
    address: usize,
}

/// Scratch buffers reused from tick to tick
#[derive(Default)]
struct TickBuffers {
    entries: Vec<(ColliderId, Entry)>,
    ids: Vec<ColliderId>,
    bounds: Vec<Rect>,
    colliders: Vec<Option<ColliderRef>>,
    prediction: CollisionPrediction,
}

impl TickBuffers {
    fn reserve(&mut self, capacity: usize) {
        self.entries.reserve(capacity.saturating_sub(self.entries.len()));
        self.ids.reserve(capacity.saturating_sub(self.ids.len()));
        self.bounds.reserve(capacity.saturating_sub(self.bounds.len()));
        self.colliders.reserve(capacity.saturating_sub(self.colliders.len()));
    }

    /// Drop every strong reference taken for the tick
    fn clear(&mut self) {
        self.entries.clear();
        self.ids.clear();
        self.bounds.clear();
        self.colliders.clear();
        self.prediction.reset();
    }
}

/// Advances colliders along their velocities and resolves collisions
///
/// All methods take `&self`; the group is meant to be shared (usually as an
/// `Rc<ColliderGroup>`) with the event handlers that react to collisions.
pub struct ColliderGroup {
    config: ColliderGroupConfig,
    eval_frequency: EvalFrequency,
    table: RefCell<SpatialTable<Entry>>,
    by_address: RefCell<HashMap<usize, ColliderId>>,
    next_id: Cell<u64>,
    stopwatch: RefCell<Stopwatch>,
    speed_ratio: Cell<f32>,
    last_tick_time: Cell<Option<f64>>,
    latest_dt: Cell<f32>,
    frame_count: Cell<u64>,
    buffer_capacity: Cell<usize>,
    buffers: RefCell<TickBuffers>,
    detector: RefCell<CollisionDetector>,
    stats: Cell<TickStats>,
    ticking: Cell<bool>,

    /// Fired for every collision resolved by this group
    pub on_collision: Event<Collision>,
}

impl ColliderGroup {
    /// Create a group that reads time from `clock`
    pub fn new(config: ColliderGroupConfig, clock: Rc<dyn Clock>) -> PhysicsResult<Self> {
        config.validate()?;
        Ok(Self::build(config, clock))
    }

    /// Default configuration on the system clock
    pub fn with_defaults() -> Self {
        Self::build(ColliderGroupConfig::default(), Rc::new(SystemClock::new()))
    }

    fn build(config: ColliderGroupConfig, clock: Rc<dyn Clock>) -> Self {
        let capacity = config.initial_capacity.max(1);
        let mut buffers = TickBuffers::default();
        buffers.reserve(capacity);
        debug!(
            "Creating collider group: {} buckets, capacity {}, {} casting",
            config.bucket_count, capacity, config.casting_mode
        );

        Self {
            eval_frequency: EvalFrequency::from_config(&config),
            table: RefCell::new(SpatialTable::new(config.bucket_count)),
            by_address: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
            stopwatch: RefCell::new(Stopwatch::start_new(clock)),
            speed_ratio: Cell::new(config.speed_ratio),
            last_tick_time: Cell::new(None),
            latest_dt: Cell::new(0.0),
            frame_count: Cell::new(0),
            buffer_capacity: Cell::new(capacity),
            buffers: RefCell::new(buffers),
            detector: RefCell::new(CollisionDetector::new()),
            stats: Cell::new(TickStats::default()),
            ticking: Cell::new(false),
            on_collision: Event::new(),
            config,
        }
    }

    /// The configuration this group was built with
    pub fn config(&self) -> &ColliderGroupConfig {
        &self.config
    }

    /// Start tracking `collider`, moved by `velocity`
    ///
    /// Neither is owned by the group: once the host drops the last strong
    /// reference to either one, the entry is discarded on the next tick.
    pub fn add(&self, collider: &ColliderRef, velocity: &Rc<Velocity>) -> PhysicsResult<ColliderId> {
        let address = collider_address(collider);
        if velocity.group_id().is_some() || self.id_of(collider).is_some() {
            error!("Collider at {address:#x} is already tracked");
            return Err(PhysicsError::AlreadyTracked);
        }

        let bounds = collider.borrow().bounds();
        let finite = [bounds.left, bounds.top, bounds.width, bounds.height]
            .iter()
            .all(|value| value.is_finite());
        if !finite || bounds.width < 0.0 || bounds.height < 0.0 {
            return Err(PhysicsError::InvalidBounds(format!("{bounds:?}")));
        }

        let id = ColliderId::new(self.next_id.get());
        self.next_id.set(id.value() + 1);
        let entry = Entry {
            collider: Rc::downgrade(collider),
            velocity: Rc::downgrade(velocity),
            address,
        };
        self.table.borrow_mut().insert(id, entry)?;
        self.by_address.borrow_mut().insert(address, id);
        velocity.register(id, self.eval_frequency, self.now());

        let count = self.count();
        if count > self.buffer_capacity.get() {
            let grown = self.buffer_capacity.get() * 2;
            debug!("Growing tick buffers from {} to {}", self.buffer_capacity.get(), grown);
            self.buffer_capacity.set(grown);
        }
        debug!("Added collider {id} ({count} tracked)");
        Ok(id)
    }

    /// Stop tracking the collider with `id`
    ///
    /// Safe to call from any event handler, including during a tick.
    pub fn remove(&self, id: ColliderId) -> PhysicsResult<()> {
        let removed = self.table.borrow_mut().remove(id);
        let entry = match removed {
            Ok(entry) => entry,
            Err(err) => {
                error!("Failed to remove collider {id}: {err}");
                return Err(err);
            }
        };
        self.by_address.borrow_mut().remove(&entry.address);
        if let Some(velocity) = entry.velocity.upgrade() {
            velocity.unregister();
        }
        debug!("Removed collider {id} ({} tracked)", self.count());
        Ok(())
    }

    /// Stop tracking `collider`
    pub fn remove_collider(&self, collider: &ColliderRef) -> PhysicsResult<ColliderId> {
        let Some(id) = self.id_of(collider) else {
            error!("Collider at {:#x} is not tracked", collider_address(collider));
            return Err(PhysicsError::UnknownCollider);
        };
        self.remove(id)?;
        Ok(id)
    }

    /// Id of `collider`, if tracked
    pub fn id_of(&self, collider: &ColliderRef) -> Option<ColliderId> {
        // The table's weak reference keeps the allocation, so addresses are not reused
        self.by_address.borrow().get(&collider_address(collider)).copied()
    }

    /// Number of tracked entries
    pub fn count(&self) -> usize {
        self.table.borrow().len()
    }

    /// True if `id` is tracked
    pub fn contains(&self, id: ColliderId) -> bool {
        self.table.borrow().contains(id)
    }

    /// Velocity of the collider with `id`
    pub fn velocity_of(&self, id: ColliderId) -> Option<Rc<Velocity>> {
        self.table.borrow().get(id).and_then(|entry| entry.velocity.upgrade())
    }

    /// Every tracked collider except `owner`, with current bounds
    pub fn get_obstacles(&self, owner: Option<&ColliderRef>) -> Vec<Obstacle> {
        let owner_address = owner.map(collider_address);
        self.table
            .borrow()
            .iter()
            .filter(|(_, entry)| Some(entry.address) != owner_address)
            .filter_map(|(id, entry)| {
                let collider = entry.collider.upgrade()?;
                let bounds = collider.borrow().bounds();
                Some(Obstacle { id, bounds, collider })
            })
            .collect()
    }

    /// Every live tracked collider
    ///
    /// Walks the whole table and allocates; not meant for per-frame use.
    pub fn enumerate_colliders_slow(&self) -> Vec<(ColliderId, ColliderRef)> {
        self.table
            .borrow()
            .iter()
            .filter_map(|(id, entry)| entry.collider.upgrade().map(|collider| (id, collider)))
            .collect()
    }

    /// Group time in seconds; excludes paused intervals
    pub fn now(&self) -> f64 {
        self.stopwatch.borrow().elapsed().as_secs_f64()
    }

    /// Seconds between the two most recent ticks
    pub fn latest_dt(&self) -> f32 {
        self.latest_dt.get()
    }

    /// Stop the group clock; ticks do nothing until [`resume`](Self::resume)
    pub fn pause(&self) {
        if self.stopwatch.borrow().is_running() {
            self.stopwatch.borrow_mut().stop();
            debug!("Collider group paused at {:.3}s", self.now());
        }
    }

    /// Restart the group clock
    pub fn resume(&self) {
        if !self.stopwatch.borrow().is_running() {
            self.stopwatch.borrow_mut().start();
            debug!("Collider group resumed at {:.3}s", self.now());
        }
    }

    /// True while paused
    pub fn is_paused(&self) -> bool {
        !self.stopwatch.borrow().is_running()
    }

    /// Global time dilation
    pub fn speed_ratio(&self) -> f32 {
        self.speed_ratio.get()
    }

    /// Set the global time dilation
    pub fn set_speed_ratio(&self, speed_ratio: f32) {
        self.speed_ratio.set(speed_ratio);
    }

    /// Number of ticks that ran
    pub fn frame_count(&self) -> u64 {
        self.frame_count.get()
    }

    /// Counters from the most recent tick
    pub fn last_tick_stats(&self) -> TickStats {
        self.stats.get()
    }

    /// Check the bucket table and the identity index against each other
    pub fn validate_entries(&self) -> PhysicsResult<()> {
        let table = self.table.borrow();
        if let Err(err) = table.validate() {
            error!("Collider table is corrupt: {err}");
            return Err(err);
        }
        let indexed = self.by_address.borrow().len();
        if indexed != table.len() {
            let err = PhysicsError::BucketGap {
                reported: indexed,
                actual: table.len(),
            };
            error!("Collider index is out of sync: {err}");
            return Err(err);
        }
        Ok(())
    }

    /// Advance every tracked collider by the time since its last evaluation
    pub fn tick(&self) {
        if self.ticking.replace(true) {
            warn!("Ignoring re-entrant tick");
            return;
        }
        if self.is_paused() {
            self.ticking.set(false);
            return;
        }

        let now = self.now();
        let previous = self.last_tick_time.replace(Some(now));
        self.latest_dt.set(previous.map_or(0.0, |previous| (now - previous) as f32));
        self.frame_count.set(self.frame_count.get() + 1);

        // Handlers may call back into the group, so nothing stays borrowed
        let mut buffers = std::mem::take(&mut *self.buffers.borrow_mut());
        buffers.reserve(self.buffer_capacity.get());
        let mut stats = TickStats::default();

        self.snapshot(&mut buffers, &mut stats);

        let TickBuffers {
            entries,
            ids,
            bounds,
            colliders,
            prediction,
        } = &mut buffers;
        for (id, entry) in entries.iter() {
            if !self.contains(*id) {
                continue;
            }
            let (Some(collider), Some(velocity)) = (entry.collider.upgrade(), entry.velocity.upgrade()) else {
                continue;
            };
            self.evaluate(
                now,
                *id,
                &collider,
                &velocity,
                ids.as_slice(),
                bounds.as_slice(),
                colliders.as_slice(),
                prediction,
                &mut stats,
            );
        }

        buffers.clear();
        *self.buffers.borrow_mut() = buffers;
        self.stats.set(stats);
        trace!(
            "Tick {} at {:.3}s: {} evaluated, {} skipped, {} collisions, {} purged",
            self.frame_count(),
            now,
            stats.evaluated,
            stats.skipped,
            stats.collisions,
            stats.purged
        );
        self.ticking.set(false);
    }

    /// Freeze entries and obstacle bounds; drop entries whose owners are gone
    fn snapshot(&self, buffers: &mut TickBuffers, stats: &mut TickStats) {
        let mut dead = Vec::new();
        {
            let table = self.table.borrow();
            table.snapshot_into(&mut buffers.entries);
            for (id, entry) in table.iter() {
                match (entry.collider.upgrade(), entry.velocity.strong_count() > 0) {
                    (Some(collider), true) => {
                        buffers.ids.push(id);
                        buffers.bounds.push(collider.borrow().bounds());
                        buffers.colliders.push(Some(collider));
                    }
                    _ => dead.push(id),
                }
            }
        }

        for id in dead {
            self.purge(id);
            stats.purged += 1;
        }
    }

    fn purge(&self, id: ColliderId) {
        warn!("Collider {id} was dropped without being removed; purging");
        let removed = self.table.borrow_mut().remove(id);
        if let Ok(entry) = removed {
            self.by_address.borrow_mut().remove(&entry.address);
            if let Some(velocity) = entry.velocity.upgrade() {
                velocity.unregister();
            }
        }
    }

    fn evaluate(
        &self,
        now: f64,
        id: ColliderId,
        collider: &ColliderRef,
        velocity: &Rc<Velocity>,
        ids: &[ColliderId],
        bounds: &[Rect],
        colliders: &[Option<ColliderRef>],
        prediction: &mut CollisionPrediction,
        stats: &mut TickStats,
    ) {
        velocity.before_evaluate.fire(&());

        let speed = velocity.speed();
        if speed <= 0.0 {
            // Idle time must not count toward the first move once it speeds up
            velocity.mark_idle(now);
        }
        if speed <= 0.0 || now < velocity.min_eval_seconds() {
            velocity.on_velocity_enforced.fire(&());
            stats.skipped += 1;
            return;
        }

        let elapsed = (now - velocity.last_evaluation_time()) as f32;
        let dt = elapsed * self.speed_ratio() * velocity.speed_ratio();
        let angle = velocity.angle();
        let moving_bounds = collider.borrow().bounds();

        self.detector.borrow_mut().predict(
            moving_bounds,
            Some(collider),
            bounds,
            angle,
            colliders,
            speed * dt,
            self.config.casting_mode,
            bounds.len(),
            prediction,
        );
        velocity.mark_evaluated(now, prediction);
        stats.evaluated += 1;

        velocity.before_move.fire(&());

        Self::move_collider(collider, &moving_bounds, prediction.last_known_good_position);

        if prediction.collision_predicted {
            if let (Some(index), Some(object_hit)) = (prediction.obstacle_index, prediction.collider.clone()) {
                let collision = Collision {
                    mover_id: id,
                    moving_object: Rc::clone(collider),
                    hit_id: ids[index],
                    object_hit,
                    angle,
                    speed,
                    prediction: prediction.clone(),
                };
                self.resolve(&collision, velocity);
                stats.collisions += 1;
            }
        }

        velocity.on_velocity_enforced.fire(&());
    }

    fn resolve(&self, collision: &Collision, velocity: &Velocity) {
        trace!(
            "Collider {} hit {} at ({:.3}, {:.3})",
            collision.mover_id,
            collision.hit_id,
            collision.prediction.intersection_x,
            collision.prediction.intersection_y
        );

        // Looked up live so a struck collider removed earlier this tick is left alone
        if let Some(struck) = self.velocity_of(collision.hit_id) {
            if struck.collision_behavior() == CollisionBehavior::Bounce {
                if let Some(side) = collision.prediction.side {
                    struck.set_angle(reflect(struck.angle(), side));
                }
            }
            let reversed = collision.reversed();
            struck.record_collision(reversed.clone());
            struck.on_collision.fire(&reversed);
        }

        velocity.record_collision(collision.clone());
        velocity.on_collision.fire(collision);
        self.on_collision.fire(collision);

        match velocity.collision_behavior() {
            CollisionBehavior::Bounce => velocity.bounce_off(&collision.prediction),
            CollisionBehavior::Stop => velocity.stop(),
            CollisionBehavior::DoNothing => {}
        }
    }

    fn move_collider(collider: &ColliderRef, from: &Rect, to: Point2) {
        let target = from.move_to(to.x, to.y);
        if target == *from {
            return;
        }
        let allowed = collider.borrow().can_move_to(&target);
        if allowed {
            collider.borrow_mut().move_to(to.x, to.y);
        }
    }
}

impl Default for ColliderGroup {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ColliderGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColliderGroup")
            .field("count", &self.count())
            .field("now", &self.now())
            .field("paused", &self.is_paused())
            .field("speed_ratio", &self.speed_ratio())
            .field("frame_count", &self.frame_count())
            .finish_non_exhaustive()
    }
}
