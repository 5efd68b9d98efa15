// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-phase scheduling of playback managers.
//!
//! The host engine calls [`PhaseScheduler::tick`] (or [`PhaseScheduler::run_on`])
//! once per phase. Each `(domain, unscaled)` pair owns a live set of managers.
//! Managers may start or stop other managers, or themselves, while a set is
//! being iterated; such changes are buffered and applied once the pass ends.

use crate::effect::EffectError;
use crate::looping::LoopConfig;
use crate::manager::{ManagerId, PlaybackManager};
use crate::timeline::Timeline;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Engine phase a manager is updated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TimingDomain {
    /// Before physics
    FixedUpdate,
    /// Regular frame update
    #[default]
    Update,
    /// After the frame update
    LateUpdate,
}

impl TimingDomain {
    /// Every domain, in the order a frame runs them
    pub fn all() -> [TimingDomain; 3] {
        [Self::FixedUpdate, Self::Update, Self::LateUpdate]
    }
}

/// Domain plus the kind of time a manager consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct TweenTime {
    /// Engine phase
    pub domain: TimingDomain,
    /// Use real time, ignoring the engine's time scale
    #[serde(default)]
    pub unscaled: bool,
}

impl TweenTime {
    /// Scaled time in `domain`
    pub fn scaled(domain: TimingDomain) -> Self {
        Self {
            domain,
            unscaled: false,
        }
    }

    /// Unscaled time in `domain`
    pub fn real_time(domain: TimingDomain) -> Self {
        Self {
            domain,
            unscaled: true,
        }
    }
}

/// Delta times handed to a domain for one tick
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameTime {
    /// Scaled delta time in seconds
    pub delta: f32,
    /// Unscaled delta time in seconds
    pub unscaled_delta: f32,
}

impl FrameTime {
    /// Frame time with equal scaled and unscaled deltas
    pub fn uniform(delta: f32) -> Self {
        Self {
            delta,
            unscaled_delta: delta,
        }
    }
}

#[derive(Default)]
struct LiveSet {
    current: IndexMap<ManagerId, PlaybackManager>,
    pending_add: IndexMap<ManagerId, PlaybackManager>,
    pending_remove: IndexSet<ManagerId>,
    iterating: bool,
}

impl LiveSet {
    fn add(&mut self, manager: &PlaybackManager) {
        let id = manager.id();
        if self.iterating {
            if !self.pending_remove.shift_remove(&id) {
                self.pending_add.insert(id, manager.clone());
            }
        } else {
            self.current.insert(id, manager.clone());
        }
    }

    fn remove(&mut self, id: ManagerId) {
        if self.iterating {
            if self.pending_add.shift_remove(&id).is_none() {
                self.pending_remove.insert(id);
            }
        } else {
            self.current.shift_remove(&id);
        }
    }

    fn finish_iteration(&mut self) {
        self.iterating = false;
        for id in self.pending_remove.drain(..) {
            self.current.shift_remove(&id);
        }
        for (id, manager) in self.pending_add.drain(..) {
            self.current.insert(id, manager);
        }
    }
}

#[derive(Default)]
pub(crate) struct SchedulerInner {
    sets: IndexMap<TweenTime, LiveSet>,
    /// Domain whose tick is on the stack
    active: Option<TimingDomain>,
}

/// Central scheduler holding one live set per [`TweenTime`]
///
/// Cloning yields another handle to the same scheduler.
#[derive(Clone, Default)]
pub struct PhaseScheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl PhaseScheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn downgrade(&self) -> Weak<RefCell<SchedulerInner>> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<SchedulerInner>>) -> Self {
        Self { inner }
    }

    /// Create a manager for `timeline` driven by this scheduler
    pub fn manage(&self, timeline: Rc<Timeline>, time: TweenTime, looping: LoopConfig) -> PlaybackManager {
        PlaybackManager::new(timeline, time, looping, self)
    }

    /// Add a manager to the live set of its [`TweenTime`]
    ///
    /// When the manager's domain is being ticked right now it receives one
    /// synchronous zero-time update first: its timeline state is applied at
    /// its clock, so it does not lag a frame behind the managers already
    /// running. If that update fails the manager is not registered.
    pub fn register(&self, manager: &PlaybackManager) -> Result<(), EffectError> {
        let time = manager.time();
        let active = self.inner.borrow().active;
        if active == Some(time.domain) {
            manager.sync_state()?;
        }

        let mut inner = self.inner.borrow_mut();
        let set = inner.sets.entry(time).or_default();
        set.add(manager);
        tracing::debug!(
            "Registered manager {:?} on {:?} (deferred: {})",
            manager.id(),
            time,
            set.iterating
        );
        Ok(())
    }

    /// Remove a manager from the live set of its [`TweenTime`]
    pub fn unregister(&self, manager: &PlaybackManager) {
        let time = manager.time();
        let mut inner = self.inner.borrow_mut();
        if let Some(set) = inner.sets.get_mut(&time) {
            set.remove(manager.id());
            tracing::debug!(
                "Unregistered manager {:?} from {:?} (deferred: {})",
                manager.id(),
                time,
                set.iterating
            );
        }
    }

    /// Update every manager registered for `time` by `dt`
    ///
    /// Managers registered or unregistered during the pass are applied after
    /// it. An effect failure stops the pass and is returned; the pending
    /// changes are still applied.
    pub fn run_on(&self, time: TweenTime, dt: f32) -> Result<(), EffectError> {
        let (snapshot, previous) = {
            let mut inner = self.inner.borrow_mut();
            let set = inner.sets.entry(time).or_default();
            if set.iterating {
                tracing::warn!("Ignoring nested run on {:?}", time);
                return Ok(());
            }
            set.iterating = true;
            let snapshot: Vec<PlaybackManager> = set.current.values().cloned().collect();
            let previous = inner.active.replace(time.domain);
            (snapshot, previous)
        };

        let _guard = IterationGuard {
            inner: &self.inner,
            time,
            previous,
        };
        tracing::trace!("Running {} managers on {:?} (dt {})", snapshot.len(), time, dt);
        for manager in &snapshot {
            manager.update(dt)?;
        }
        Ok(())
    }

    /// Run the scaled then the unscaled set of `domain`
    pub fn tick(&self, domain: TimingDomain, frame: FrameTime) -> Result<(), EffectError> {
        self.run_on(TweenTime::scaled(domain), frame.delta)?;
        self.run_on(TweenTime::real_time(domain), frame.unscaled_delta)
    }

    /// Check if a manager is in the live set (pending changes excluded)
    pub fn contains(&self, manager: &PlaybackManager) -> bool {
        self.inner
            .borrow()
            .sets
            .get(&manager.time())
            .is_some_and(|set| set.current.contains_key(&manager.id()))
    }

    /// Check if a manager is waiting to be added after the current pass
    pub fn is_pending_add(&self, manager: &PlaybackManager) -> bool {
        self.inner
            .borrow()
            .sets
            .get(&manager.time())
            .is_some_and(|set| set.pending_add.contains_key(&manager.id()))
    }

    /// Number of managers in the live set for `time`
    pub fn len(&self, time: TweenTime) -> usize {
        self.inner.borrow().sets.get(&time).map_or(0, |set| set.current.len())
    }

    /// Check if the live set for `time` is being iterated
    pub fn is_iterating(&self, time: TweenTime) -> bool {
        self.inner.borrow().sets.get(&time).is_some_and(|set| set.iterating)
    }
}

/// Ends an iteration pass, including when the pass is cut short
struct IterationGuard<'a> {
    inner: &'a Rc<RefCell<SchedulerInner>>,
    time: TweenTime,
    previous: Option<TimingDomain>,
}

impl Drop for IterationGuard<'_> {
    fn drop(&mut self) {
        let Ok(mut inner) = self.inner.try_borrow_mut() else {
            return;
        };
        inner.active = self.previous;
        if let Some(set) = inner.sets.get_mut(&self.time) {
            set.finish_iteration();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{Callback, Direction, InvokeOn, TimelineEffect};
    use crate::timeline::Placement;
    use std::cell::Cell;

    /// Effect counting zero-time and moving applications
    #[derive(Default)]
    struct Counter {
        zero_updates: Rc<Cell<u32>>,
        span: f32,
    }

    impl TimelineEffect for Counter {
        fn span(&self) -> f32 {
            self.span
        }

        fn apply(&self, _elapsed: f32, _direction: Direction) -> Result<(), EffectError> {
            Ok(())
        }

        fn apply_state_at(&self, _elapsed: f32) -> Result<(), EffectError> {
            self.zero_updates.set(self.zero_updates.get() + 1);
            Ok(())
        }

        fn label(&self) -> &str {
            "counter"
        }
    }

    fn spacer(duration: f32) -> Rc<Timeline> {
        Rc::new(
            Timeline::single(Counter { span: duration, ..Counter::default() }, 0.0).unwrap(),
        )
    }

    const UPDATE: TweenTime = TweenTime {
        domain: TimingDomain::Update,
        unscaled: false,
    };

    #[test]
    fn test_register_outside_iteration_is_immediate() {
        let scheduler = PhaseScheduler::new();
        let manager = scheduler.manage(spacer(1.0), UPDATE, LoopConfig::single());
        manager.play(true).unwrap();
        assert!(scheduler.contains(&manager));
        assert_eq!(scheduler.len(UPDATE), 1);

        manager.stop();
        assert!(!scheduler.contains(&manager));
    }

    #[test]
    fn test_register_during_pass_is_deferred_and_synced() {
        let scheduler = PhaseScheduler::new();
        let zero_updates = Rc::new(Cell::new(0));
        let spawned = scheduler.manage(
            Rc::new(
                Timeline::single(
                    Counter {
                        zero_updates: zero_updates.clone(),
                        span: 5.0,
                    },
                    0.0,
                )
                .unwrap(),
            ),
            UPDATE,
            LoopConfig::single(),
        );

        let seen_during_pass = Rc::new(Cell::new(None));
        let (s, sched, seen) = (spawned.clone(), scheduler.clone(), seen_during_pass.clone());
        let spawner_timeline = Timeline::builder()
            .insert(
                Placement::AbsoluteTime(0.5),
                Callback::fallible(InvokeOn::Forward, move |_| {
                    s.play(true)?;
                    seen.set(Some((sched.contains(&s), sched.is_pending_add(&s))));
                    Ok(())
                }),
            )
            .insert(Placement::AbsoluteTime(0.0), Counter { span: 2.0, ..Counter::default() })
            .build()
            .unwrap();
        let spawner = scheduler.manage(Rc::new(spawner_timeline), UPDATE, LoopConfig::single());
        spawner.play(true).unwrap();

        let before = zero_updates.get();
        scheduler.run_on(UPDATE, 1.0).unwrap();

        assert_eq!(seen_during_pass.get(), Some((false, true)));
        assert!(scheduler.contains(&spawned));
        // One reset from play plus exactly one synchronous zero-time update
        assert_eq!(zero_updates.get() - before, 2);
    }

    #[test]
    fn test_unregister_then_register_in_same_pass() {
        let scheduler = PhaseScheduler::new();
        let target = scheduler.manage(spacer(10.0), UPDATE, LoopConfig::single());
        target.play(true).unwrap();

        let t = target.clone();
        let toggler = Timeline::single(
            Callback::fallible(InvokeOn::Forward, move |_| {
                t.stop();
                t.resume(None)
            }),
            0.0,
        )
        .unwrap();
        let toggler = scheduler.manage(Rc::new(toggler), UPDATE, LoopConfig::single());
        toggler.play(true).unwrap();

        scheduler.run_on(UPDATE, 0.1).unwrap();
        assert!(scheduler.contains(&target));
        assert!(target.is_playing());
    }

    #[test]
    fn test_failure_halts_pass_and_finalizes() {
        let scheduler = PhaseScheduler::new();
        let failing = Timeline::single(
            Callback::fallible(InvokeOn::Forward, |_| Err(EffectError::Custom("broken".into()))),
            0.5,
        )
        .unwrap();
        let failing = scheduler.manage(Rc::new(failing), UPDATE, LoopConfig::single());
        failing.play(true).unwrap();

        let err = scheduler.run_on(UPDATE, 1.0).unwrap_err();
        assert_eq!(err, EffectError::Custom("broken".to_string()));
        assert!(!scheduler.is_iterating(UPDATE));
    }

    #[test]
    fn test_tick_runs_scaled_and_unscaled_sets() {
        let scheduler = PhaseScheduler::new();
        let scaled = scheduler.manage(spacer(10.0), UPDATE, LoopConfig::single());
        let real = scheduler.manage(spacer(10.0), TweenTime::real_time(TimingDomain::Update), LoopConfig::single());
        let late = scheduler.manage(spacer(10.0), TweenTime::scaled(TimingDomain::LateUpdate), LoopConfig::single());
        for manager in [&scaled, &real, &late] {
            manager.play(true).unwrap();
        }

        scheduler
            .tick(TimingDomain::Update, FrameTime { delta: 0.5, unscaled_delta: 1.0 })
            .unwrap();
        assert_eq!(scaled.clock(), 0.5);
        assert_eq!(real.clock(), 1.0);
        assert_eq!(late.clock(), 0.0);
    }

    #[test]
    fn test_cross_domain_registration_is_immediate() {
        let scheduler = PhaseScheduler::new();
        let late = scheduler.manage(spacer(1.0), TweenTime::scaled(TimingDomain::LateUpdate), LoopConfig::single());

        let (l, sched) = (late.clone(), scheduler.clone());
        let starter = Timeline::single(
            Callback::fallible(InvokeOn::Forward, move |_| {
                l.play(true)?;
                assert!(sched.contains(&l));
                Ok(())
            }),
            0.0,
        )
        .unwrap();
        let starter = scheduler.manage(Rc::new(starter), UPDATE, LoopConfig::single());
        starter.play(true).unwrap();

        scheduler.run_on(UPDATE, 0.1).unwrap();
        assert!(late.is_playing());
        assert_eq!(late.clock(), 0.0);
    }

    #[test]
    fn test_replay_during_pass_keeps_place_in_pass() {
        let scheduler = PhaseScheduler::new();
        let target = scheduler.manage(spacer(10.0), UPDATE, LoopConfig::single());

        let t = target.clone();
        let restarter = Timeline::single(Callback::fallible(InvokeOn::Forward, move |_| t.play(true)), 0.0).unwrap();
        let restarter = scheduler.manage(Rc::new(restarter), UPDATE, LoopConfig::single());
        restarter.play(true).unwrap();
        target.play(true).unwrap();
        target.update(3.0).unwrap();

        // The restarted manager comes later in the pass, so it also advances
        scheduler.run_on(UPDATE, 1.0).unwrap();
        assert_eq!(target.clock(), 1.0);
        assert!(scheduler.contains(&target));
        assert!(!scheduler.contains(&restarter));
    }

    #[test]
    fn test_zero_delta_pass_leaves_state_alone() {
        let scheduler = PhaseScheduler::new();
        let applied = Rc::new(Cell::new(0));
        let timeline = Timeline::single(
            Counter {
                zero_updates: applied.clone(),
                span: 2.0,
            },
            0.0,
        )
        .unwrap();
        let manager = scheduler.manage(Rc::new(timeline), UPDATE, LoopConfig::single());
        manager.play(true).unwrap();

        let before = applied.get();
        scheduler.run_on(UPDATE, 0.0).unwrap();
        assert_eq!(applied.get(), before);
        assert!(manager.is_playing());
    }
}
