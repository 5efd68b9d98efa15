// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback state machine for one timeline.

use crate::effect::{Direction, EffectError};
use crate::looping::{LoopConfig, LoopMode};
use crate::scheduler::{PhaseScheduler, SchedulerInner, TweenTime};
use crate::timeline::Timeline;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// Unique identifier for a playback manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ManagerId(pub Uuid);

impl ManagerId {
    /// Create a new random manager ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ManagerId {
    fn default() -> Self {
        Self::new()
    }
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Not registered with the scheduler
    #[default]
    Stopped,
    /// Playing forward
    PlayingForward,
    /// Playing in reverse
    PlayingBackward,
}

/// Argument passed to start and end handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackEvent {
    /// Playback direction when the event fired
    pub direction: Direction,
    /// Boundary crossings completed so far
    pub iteration: u32,
}

type EventHandler = Rc<dyn Fn(PlaybackEvent)>;

/// Loop crossings driven one by one in a single update; whole cycles past
/// this are skipped
const MAX_CROSSINGS_PER_UPDATE: u32 = 16;

struct ManagerInner {
    id: ManagerId,
    timeline: Rc<Timeline>,
    time: TweenTime,
    looping: LoopConfig,
    scheduler: Weak<RefCell<SchedulerInner>>,
    clock: Cell<f32>,
    direction: Cell<Direction>,
    running: Cell<bool>,
    disposed: Cell<bool>,
    iterations_done: Cell<u32>,
    timescale: Cell<f32>,
    on_start: RefCell<Vec<EventHandler>>,
    on_end: RefCell<Vec<EventHandler>>,
}

/// Plays a [`Timeline`] forward or backward, with looping
///
/// The manager is a handle: clones share the same playback. Every method
/// takes `&self` so handlers and effects may drive managers (including
/// their own) while the scheduler is updating them.
#[derive(Clone)]
pub struct PlaybackManager {
    inner: Rc<ManagerInner>,
}

impl PlaybackManager {
    /// Create a stopped manager at the start of `timeline`
    pub fn new(
        timeline: Rc<Timeline>,
        time: TweenTime,
        looping: LoopConfig,
        scheduler: &PhaseScheduler,
    ) -> Self {
        Self {
            inner: Rc::new(ManagerInner {
                id: ManagerId::new(),
                timeline,
                time,
                looping,
                scheduler: scheduler.downgrade(),
                clock: Cell::new(0.0),
                direction: Cell::new(Direction::Forward),
                running: Cell::new(false),
                disposed: Cell::new(false),
                iterations_done: Cell::new(0),
                timescale: Cell::new(1.0),
                on_start: RefCell::new(Vec::new()),
                on_end: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Set the playback speed multiplier
    pub fn with_timescale(self, timescale: f32) -> Self {
        self.set_timescale(timescale);
        self
    }

    /// Manager ID
    pub fn id(&self) -> ManagerId {
        self.inner.id
    }

    /// The timeline being played
    pub fn timeline(&self) -> &Rc<Timeline> {
        &self.inner.timeline
    }

    /// Domain and time kind this manager is updated with
    pub fn time(&self) -> TweenTime {
        self.inner.time
    }

    /// Loop configuration
    pub fn looping(&self) -> LoopConfig {
        self.inner.looping
    }

    /// Current position on the timeline
    pub fn clock(&self) -> f32 {
        self.inner.clock.get()
    }

    /// Current playback direction
    pub fn direction(&self) -> Direction {
        self.inner.direction.get()
    }

    /// Boundary crossings since the last play or rewind
    pub fn iterations_done(&self) -> u32 {
        self.inner.iterations_done.get()
    }

    /// Playback speed multiplier
    pub fn timescale(&self) -> f32 {
        self.inner.timescale.get()
    }

    /// Set the playback speed multiplier
    pub fn set_timescale(&self, timescale: f32) {
        self.inner.timescale.set(timescale);
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        match (self.inner.running.get(), self.direction()) {
            (false, _) => PlaybackState::Stopped,
            (true, Direction::Forward) => PlaybackState::PlayingForward,
            (true, Direction::Backward) => PlaybackState::PlayingBackward,
        }
    }

    /// Check if playing
    pub fn is_playing(&self) -> bool {
        self.inner.running.get()
    }

    /// Check if disposed
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Add a handler fired when playback starts an iteration
    pub fn on_start(&self, handler: impl Fn(PlaybackEvent) + 'static) {
        self.inner.on_start.borrow_mut().push(Rc::new(handler));
    }

    /// Add a handler fired when playback reaches its end boundary
    pub fn on_end(&self, handler: impl Fn(PlaybackEvent) + 'static) {
        self.inner.on_end.borrow_mut().push(Rc::new(handler));
    }

    /// Play from the start boundary of the given direction
    ///
    /// Calling this on a manager that is already registered, from inside its
    /// own domain's pass, keeps its place in that pass: if it comes later in
    /// the pass it is also advanced by the pass's `dt` this frame.
    pub fn play(&self, forwards: bool) -> Result<(), EffectError> {
        if self.ignored("play") {
            return Ok(());
        }
        let direction = Direction::from_forwards(forwards);
        self.inner.direction.set(direction);
        self.inner.iterations_done.set(0);
        self.reset_to(direction.start_boundary(self.duration()), false)?;
        if !self.start_running()? {
            return Ok(());
        }
        tracing::debug!("Manager {:?} playing {:?}", self.id(), direction);
        self.fire_start();
        Ok(())
    }

    /// Continue from the current position
    ///
    /// `None` keeps the current direction. Does nothing if already playing
    /// that way.
    pub fn resume(&self, direction: Option<Direction>) -> Result<(), EffectError> {
        if self.ignored("resume") {
            return Ok(());
        }
        let direction = direction.unwrap_or_else(|| self.direction());
        let was_running = self.is_playing();
        if was_running && self.direction() == direction {
            return Ok(());
        }

        self.inner.direction.set(direction);
        if !was_running && self.start_running()? {
            tracing::debug!("Manager {:?} resumed {:?} at {}", self.id(), direction, self.clock());
            if self.clock() == direction.start_boundary(self.duration()) {
                self.fire_start();
            }
        }
        Ok(())
    }

    /// Stop playback and leave the scheduler
    pub fn stop(&self) {
        if !self.inner.running.replace(false) {
            return;
        }
        if let Some(scheduler) = self.scheduler() {
            scheduler.unregister(self);
        }
        tracing::debug!("Manager {:?} stopped at {}", self.id(), self.clock());
    }

    /// Flip the playback direction in place
    pub fn reverse(&self) {
        if !self.is_playing() {
            tracing::trace!("Ignoring reverse on stopped manager {:?}", self.id());
            return;
        }
        self.inner.direction.set(self.direction().flipped());
    }

    /// Move the clock to the start boundary of the current direction
    ///
    /// Absolute effects are reset. Relative effects only move their target
    /// back when `apply_relative` is set; otherwise the target stays where
    /// it is and the effect continues from there.
    pub fn rewind(&self, apply_relative: bool) -> Result<(), EffectError> {
        if self.ignored("rewind") {
            return Ok(());
        }
        self.inner.iterations_done.set(0);
        self.reset_to(self.direction().start_boundary(self.duration()), apply_relative)
    }

    /// Force the timeline state at time `t` and move the clock there
    ///
    /// Relative effects move their targets by what lies between the old
    /// clock and `t`.
    pub fn apply_state_at(&self, t: f32) -> Result<(), EffectError> {
        if self.ignored("apply state") {
            return Ok(());
        }
        let t = t.clamp(0.0, self.duration());
        let from = self.inner.clock.replace(t);
        self.inner.timeline.move_state(from, t)
    }

    /// Stop and refuse every later action
    pub fn dispose(&self) {
        self.stop();
        self.inner.disposed.set(true);
        self.inner.on_start.borrow_mut().clear();
        self.inner.on_end.borrow_mut().clear();
    }

    /// Advance playback by `dt` seconds
    ///
    /// `dt` is scaled by the timescale; a zero result does nothing. Playback
    /// may cross the end boundary any number of times, wrapping or reflecting
    /// as the loop configuration says. Crossings past
    /// `MAX_CROSSINGS_PER_UPDATE` are folded into whole skipped cycles that
    /// count as iterations but drive no effects or handlers.
    pub fn update(&self, dt: f32) -> Result<(), EffectError> {
        let inner = &self.inner;
        if !inner.running.get() || inner.disposed.get() {
            return Ok(());
        }
        let dt = dt * inner.timescale.get();
        if dt == 0.0 {
            return Ok(());
        }

        let duration = self.duration();
        let mut remaining = dt.abs();
        let mut crossed = 0;

        while remaining > 0.0 {
            let travel = self.travel(dt);
            let prev = inner.clock.get();
            let end = travel.end_boundary(duration);
            let distance = (end - prev).abs();

            if remaining < distance {
                let next = prev + travel.sign() * remaining;
                inner.clock.set(next);
                return inner.timeline.update(prev, next, travel);
            }

            inner.clock.set(end);
            inner.timeline.update(prev, end, travel)?;
            if !inner.running.get() || inner.clock.get() != end {
                // An effect took over playback
                return Ok(());
            }
            remaining -= distance;

            let iteration = inner.iterations_done.get().saturating_add(1);
            inner.iterations_done.set(iteration);
            tracing::trace!("Manager {:?} crossed {} (iteration {})", self.id(), end, iteration);

            if inner.looping.is_finished(iteration) {
                self.fire_end();
                self.stop();
                return Ok(());
            }

            self.fire_end();
            if !inner.running.get() || inner.clock.get() != end {
                // A handler took over playback
                return Ok(());
            }
            match inner.looping.mode {
                LoopMode::Normal => {
                    self.reset_to(travel.start_boundary(duration), false)?;
                    self.fire_start();
                }
                LoopMode::PingPong => inner.direction.set(self.direction().flipped()),
            }

            if duration == 0.0 || !inner.running.get() {
                return Ok(());
            }
            crossed += 1;
            if crossed >= MAX_CROSSINGS_PER_UPDATE && remaining >= duration {
                remaining = self.skip_cycles(remaining, dt)?;
            }
        }
        Ok(())
    }

    fn duration(&self) -> f32 {
        self.inner.timeline.duration()
    }

    fn scheduler(&self) -> Option<PhaseScheduler> {
        self.inner.scheduler.upgrade().map(PhaseScheduler::from_inner)
    }

    fn ignored(&self, action: &str) -> bool {
        if self.is_disposed() {
            tracing::warn!("Ignoring {} on disposed manager {:?}", action, self.id());
            return true;
        }
        false
    }

    /// Direction the clock moves in for a signed `dt`
    fn travel(&self, dt: f32) -> Direction {
        if dt < 0.0 {
            self.direction().flipped()
        } else {
            self.direction()
        }
    }

    fn reset_to(&self, t: f32, apply_relative: bool) -> Result<(), EffectError> {
        let from = self.inner.clock.replace(t);
        if apply_relative {
            self.inner.timeline.move_state(from, t)
        } else {
            self.inner.timeline.apply_state_at(t)
        }
    }

    /// Skip whole loop cycles in `remaining`, leaving the clock on a start
    /// boundary, and return the time left to drive
    ///
    /// A finite loop keeps its last crossing so that it still ends playback
    /// and fires `on_end`.
    fn skip_cycles(&self, remaining: f32, dt: f32) -> Result<f32, EffectError> {
        let inner = &self.inner;
        let duration = self.duration();
        let rest = remaining % duration;
        let cycles = ((remaining - rest) / duration).round() as u32;
        let done = inner.iterations_done.get();

        let (skipped, rest) = if inner.looping.is_infinite() {
            (cycles, rest)
        } else {
            let left = inner.looping.iterations.saturating_sub(done).saturating_sub(1);
            if cycles > left {
                (left, duration)
            } else {
                (cycles, rest)
            }
        };

        inner.iterations_done.set(done.saturating_add(skipped));
        if inner.looping.mode == LoopMode::PingPong && skipped % 2 == 1 {
            inner.direction.set(self.direction().flipped());
        }
        self.reset_to(self.travel(dt).start_boundary(duration), false)?;
        tracing::debug!(
            "Manager {:?} skipped {} loop cycles (iteration {})",
            self.id(),
            skipped,
            self.iterations_done()
        );
        Ok(rest)
    }

    /// Bring the timeline's state up to the current clock
    pub(crate) fn sync_state(&self) -> Result<(), EffectError> {
        self.inner.timeline.apply_state_at(self.clock())
    }

    fn start_running(&self) -> Result<bool, EffectError> {
        let Some(scheduler) = self.scheduler() else {
            tracing::warn!("Manager {:?} has no scheduler, not playing", self.id());
            return Ok(false);
        };
        self.inner.running.set(true);
        if let Err(err) = scheduler.register(self) {
            self.inner.running.set(false);
            scheduler.unregister(self);
            return Err(err);
        }
        Ok(true)
    }

    fn event(&self) -> PlaybackEvent {
        PlaybackEvent {
            direction: self.direction(),
            iteration: self.iterations_done(),
        }
    }

    fn fire_start(&self) {
        let handlers = self.inner.on_start.borrow().clone();
        let event = self.event();
        for handler in handlers {
            handler(event);
        }
    }

    fn fire_end(&self) {
        let handlers = self.inner.on_end.borrow().clone();
        let event = self.event();
        for handler in handlers {
            handler(event);
        }
    }
}

impl fmt::Debug for PlaybackManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackManager")
            .field("id", &self.id())
            .field("time", &self.time())
            .field("state", &self.state())
            .field("clock", &self.clock())
            .field("looping", &self.looping())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ease::Ease;
    use crate::effect::{Callback, InvokeOn, NestedTimeline, RelativeTween, Tween};
    use crate::scheduler::TimingDomain;
    use crate::target::PropertyBag;
    use crate::timeline::Placement;

    const UPDATE: TweenTime = TweenTime {
        domain: TimingDomain::Update,
        unscaled: false,
    };

    fn events(manager: &PlaybackManager) -> (Rc<RefCell<Vec<PlaybackEvent>>>, Rc<RefCell<Vec<PlaybackEvent>>>) {
        let starts = Rc::new(RefCell::new(Vec::new()));
        let ends = Rc::new(RefCell::new(Vec::new()));
        let (s, e) = (starts.clone(), ends.clone());
        manager.on_start(move |event| s.borrow_mut().push(event));
        manager.on_end(move |event| e.borrow_mut().push(event));
        (starts, ends)
    }

    fn linear(bag: &PropertyBag, duration: f32) -> Rc<Timeline> {
        bag.insert("x", 0.0_f32);
        Rc::new(
            Timeline::single(Tween::new(bag.bind("x"), 0.0_f32, duration, Ease::Linear, duration), 0.0).unwrap(),
        )
    }

    #[test]
    fn test_single_play_stops_once() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 4.0), UPDATE, LoopConfig::single());
        let (starts, ends) = events(&manager);

        manager.play(true).unwrap();
        assert_eq!(manager.state(), PlaybackState::PlayingForward);
        scheduler.run_on(UPDATE, 3.0).unwrap();
        assert_eq!(bag.float("x"), Some(3.0));
        scheduler.run_on(UPDATE, 3.0).unwrap();
        scheduler.run_on(UPDATE, 3.0).unwrap();

        assert_eq!(manager.state(), PlaybackState::Stopped);
        assert_eq!(manager.clock(), 4.0);
        assert_eq!(bag.float("x"), Some(4.0));
        assert_eq!(starts.borrow().len(), 1);
        assert_eq!(ends.borrow().len(), 1);
        assert!(!scheduler.contains(&manager));
    }

    #[test]
    fn test_ping_pong_three_iterations() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 10.0), UPDATE, LoopConfig::new(3, LoopMode::PingPong));
        let (starts, ends) = events(&manager);

        manager.play(true).unwrap();
        manager.update(10.0).unwrap();
        assert_eq!((manager.clock(), manager.direction()), (10.0, Direction::Backward));
        manager.update(10.0).unwrap();
        assert_eq!((manager.clock(), manager.direction()), (0.0, Direction::Forward));
        assert!(manager.is_playing());
        manager.update(10.0).unwrap();

        assert!(!manager.is_playing());
        assert_eq!(manager.clock(), 10.0);
        assert_eq!(manager.iterations_done(), 3);
        assert_eq!(starts.borrow().len(), 1);
        assert_eq!(ends.borrow().len(), 3);
    }

    #[test]
    fn test_normal_loop_wraps_with_overflow() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 2.0), UPDATE, LoopConfig::forever(LoopMode::Normal));
        let (starts, ends) = events(&manager);

        manager.play(true).unwrap();
        manager.update(5.0).unwrap();
        assert_eq!(manager.clock(), 1.0);
        assert_eq!(bag.float("x"), Some(1.0));
        assert_eq!(manager.direction(), Direction::Forward);
        assert_eq!(ends.borrow().len(), 2);
        assert_eq!(starts.borrow().len(), 3);
        assert_eq!(ends.borrow()[1].iteration, 2);
    }

    #[test]
    fn test_huge_delta_fires_callback_once() {
        let scheduler = PhaseScheduler::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let timeline = Timeline::builder()
            .insert(Placement::AbsoluteTime(0.25), Callback::new(InvokeOn::Forward, move |_| c.set(c.get() + 1)))
            .insert(Placement::AbsoluteTime(1.0), Callback::new(InvokeOn::Forward, |_| {}))
            .build()
            .unwrap();
        let manager = scheduler.manage(Rc::new(timeline), UPDATE, LoopConfig::single());

        manager.play(true).unwrap();
        manager.update(1_000.0).unwrap();
        assert_eq!(count.get(), 1);
        assert!(!manager.is_playing());
    }

    #[test]
    fn test_rewind_relative_effects() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        bag.insert("x", 1.0_f32);
        let timeline = Timeline::single(RelativeTween::new(bag.bind("x"), 5.0_f32, Ease::Linear, 1.0), 0.0).unwrap();
        let manager = scheduler.manage(Rc::new(timeline), UPDATE, LoopConfig::single());

        manager.play(true).unwrap();
        manager.update(0.5).unwrap();
        assert_eq!(bag.float("x"), Some(3.5));

        manager.rewind(false).unwrap();
        assert_eq!(manager.clock(), 0.0);
        assert_eq!(bag.float("x"), Some(3.5));

        // Play on from the rewound clock: the full delta lands on top
        manager.update(1.0).unwrap();
        assert_eq!(bag.float("x"), Some(8.5));

        manager.rewind(true).unwrap();
        assert_eq!(bag.float("x"), Some(3.5));
    }

    #[test]
    fn test_rewind_with_relative_restores_baseline() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        bag.insert("x", 1.0_f32);
        let timeline = Timeline::single(RelativeTween::new(bag.bind("x"), 5.0_f32, Ease::Linear, 1.0), 0.0).unwrap();
        let manager = scheduler.manage(Rc::new(timeline), UPDATE, LoopConfig::single());

        manager.play(true).unwrap();
        manager.update(0.5).unwrap();
        manager.rewind(true).unwrap();
        assert_eq!(bag.float("x"), Some(1.0));
    }

    #[test]
    fn test_resume_reverse_and_stop() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 4.0), UPDATE, LoopConfig::single());

        manager.reverse();
        assert_eq!(manager.direction(), Direction::Forward);

        manager.play(true).unwrap();
        manager.update(3.0).unwrap();
        manager.reverse();
        assert_eq!(manager.state(), PlaybackState::PlayingBackward);
        manager.update(1.0).unwrap();
        assert_eq!(bag.float("x"), Some(2.0));

        manager.stop();
        manager.stop();
        assert_eq!(manager.state(), PlaybackState::Stopped);

        manager.resume(Some(Direction::Forward)).unwrap();
        assert_eq!(manager.clock(), 2.0);
        assert_eq!(manager.state(), PlaybackState::PlayingForward);
        manager.resume(None).unwrap();
        assert_eq!(scheduler.len(UPDATE), 1);
    }

    #[test]
    fn test_play_backward_and_negative_delta() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 4.0), UPDATE, LoopConfig::single());

        manager.play(false).unwrap();
        assert_eq!(manager.clock(), 4.0);
        assert_eq!(bag.float("x"), Some(4.0));
        manager.update(1.0).unwrap();
        assert_eq!(manager.clock(), 3.0);
        manager.update(-0.5).unwrap();
        assert_eq!(manager.clock(), 3.5);
        assert_eq!(bag.float("x"), Some(3.5));
    }

    #[test]
    fn test_timescale_and_zero_delta() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler
            .manage(linear(&bag, 4.0), UPDATE, LoopConfig::single())
            .with_timescale(2.0);

        manager.play(true).unwrap();
        manager.update(1.0).unwrap();
        assert_eq!(manager.clock(), 2.0);

        bag.insert("x", -1.0_f32);
        manager.update(0.0).unwrap();
        manager.set_timescale(0.0);
        manager.update(1.0).unwrap();
        assert_eq!(bag.float("x"), Some(-1.0));
        assert_eq!(manager.clock(), 2.0);
    }

    #[test]
    fn test_disposed_manager_ignores_actions() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 4.0), UPDATE, LoopConfig::single());

        manager.play(true).unwrap();
        manager.dispose();
        assert!(!scheduler.contains(&manager));
        manager.play(true).unwrap();
        manager.update(1.0).unwrap();
        assert!(!manager.is_playing());
        assert_eq!(manager.clock(), 0.0);
    }

    #[test]
    fn test_dropped_scheduler_is_ignored() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 4.0), UPDATE, LoopConfig::single());
        drop(scheduler);

        manager.play(true).unwrap();
        assert!(!manager.is_playing());
    }

    #[test]
    fn test_zero_duration_timeline_crosses_once_per_tick() {
        let scheduler = PhaseScheduler::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let timeline = Timeline::single(Callback::new(InvokeOn::Both, move |_| c.set(c.get() + 1)), 0.0).unwrap();
        let manager = scheduler.manage(Rc::new(timeline), UPDATE, LoopConfig::forever(LoopMode::Normal));

        manager.play(true).unwrap();
        manager.update(1.0).unwrap();
        manager.update(1.0).unwrap();
        assert_eq!(count.get(), 2);
        assert_eq!(manager.iterations_done(), 2);
    }

    #[test]
    fn test_ping_pong_reflects_partial_overflow() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 10.0), UPDATE, LoopConfig::forever(LoopMode::PingPong));
        let (starts, ends) = events(&manager);

        manager.play(true).unwrap();
        manager.update(15.0).unwrap();
        assert_eq!(manager.clock(), 5.0);
        assert_eq!(manager.direction(), Direction::Backward);
        assert_eq!(bag.float("x"), Some(5.0));
        assert_eq!(ends.borrow().len(), 1);
        assert_eq!(starts.borrow().len(), 1);
    }

    #[test]
    fn test_normal_loop_wraps_backward() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 10.0), UPDATE, LoopConfig::forever(LoopMode::Normal));
        let (starts, ends) = events(&manager);

        manager.play(false).unwrap();
        manager.update(15.0).unwrap();
        assert_eq!(manager.clock(), 5.0);
        assert_eq!(manager.direction(), Direction::Backward);
        assert_eq!(bag.float("x"), Some(5.0));
        assert_eq!(ends.borrow().len(), 1);
        assert_eq!(starts.borrow().len(), 2);
    }

    #[test]
    fn test_end_handler_stop_wins_over_loop() {
        for mode in [LoopMode::Normal, LoopMode::PingPong] {
            let scheduler = PhaseScheduler::new();
            let bag = PropertyBag::new();
            let manager = scheduler.manage(linear(&bag, 2.0), UPDATE, LoopConfig::forever(mode));
            let (starts, _) = events(&manager);
            let m = manager.clone();
            manager.on_end(move |_| m.stop());

            manager.play(true).unwrap();
            manager.update(3.0).unwrap();
            assert!(!manager.is_playing());
            assert_eq!(manager.clock(), 2.0);
            assert_eq!(manager.direction(), Direction::Forward);
            assert_eq!(bag.float("x"), Some(2.0));
            assert_eq!(starts.borrow().len(), 1);
        }
    }

    #[test]
    fn test_huge_delta_on_endless_loop_returns() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 1.0), UPDATE, LoopConfig::forever(LoopMode::Normal));
        let (_, ends) = events(&manager);

        manager.play(true).unwrap();
        manager.update(1.0e8).unwrap();
        assert!(manager.is_playing());
        assert_eq!(manager.clock(), 0.0);
        assert_eq!(bag.float("x"), Some(0.0));
        assert!(manager.iterations_done() >= 100_000_000);
        assert_eq!(ends.borrow().len(), MAX_CROSSINGS_PER_UPDATE as usize);
    }

    #[test]
    fn test_skipped_ping_pong_cycles_keep_parity() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 2.0), UPDATE, LoopConfig::forever(LoopMode::PingPong));

        manager.play(true).unwrap();
        manager.update(43.0).unwrap();
        assert_eq!(manager.iterations_done(), 21);
        assert_eq!(manager.direction(), Direction::Backward);
        assert_eq!(manager.clock(), 1.0);
        assert_eq!(bag.float("x"), Some(1.0));
    }

    #[test]
    fn test_finite_loop_still_ends_after_skipping() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        let manager = scheduler.manage(linear(&bag, 1.0), UPDATE, LoopConfig::times(1_000));
        let (_, ends) = events(&manager);

        manager.play(true).unwrap();
        manager.update(1.0e8).unwrap();
        assert!(!manager.is_playing());
        assert_eq!(manager.iterations_done(), 1_000);
        assert_eq!(manager.clock(), 1.0);
        assert_eq!(bag.float("x"), Some(1.0));
        assert_eq!(ends.borrow().len(), MAX_CROSSINGS_PER_UPDATE as usize + 1);
    }

    #[test]
    fn test_managers_share_one_timeline() {
        let scheduler = PhaseScheduler::new();
        let bag = PropertyBag::new();
        bag.insert("x", 0.0_f32);
        let fired = Rc::new(Cell::new(0));
        let f = fired.clone();
        let inner = Timeline::builder()
            .insert(Placement::AbsoluteTime(0.5), Callback::new(InvokeOn::Forward, move |_| f.set(f.get() + 1)))
            .insert(Placement::AbsoluteTime(0.0), RelativeTween::new(bag.bind("x"), 8.0_f32, Ease::Linear, 1.0))
            .build()
            .unwrap();
        let shared = Rc::new(Timeline::single(NestedTimeline::new(Rc::new(inner)), 0.0).unwrap());
        let a = scheduler.manage(shared.clone(), UPDATE, LoopConfig::single());
        let b = scheduler.manage(shared, UPDATE, LoopConfig::single());

        a.play(true).unwrap();
        b.play(true).unwrap();
        a.update(0.75).unwrap();
        b.update(0.25).unwrap();
        a.update(0.125).unwrap();

        assert_eq!(fired.get(), 1);
        assert_eq!(bag.float("x"), Some(9.0));
    }
}
