//! Virtual clocks
//!
//! Every cooldown, animation and AI beat asks a `VirtualClock` whether it is
//! over yet. Clocks read a `TimeSource`, which may itself be another clock:
//! the world derives its game clock from a root clock, and every gameplay
//! clock from the game clock, so pausing the game clock freezes them all.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use crate::error::{SimError, SimResult};

/// Duration sentinel for a clock that is never over
pub const UNBOUNDED: f64 = -1.0;

/// A zero-argument function returning the current time in seconds
#[derive(Clone)]
pub struct TimeSource(Rc<dyn Fn() -> f64>);

impl TimeSource {
    pub fn from_fn(f: impl Fn() -> f64 + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Real monotonic time, in seconds since this source was created
    pub fn monotonic() -> Self {
        let origin = Instant::now();
        Self::from_fn(move || origin.elapsed().as_secs_f64())
    }

    #[inline]
    pub fn now(&self) -> f64 {
        (self.0)()
    }
}

impl fmt::Debug for TimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TimeSource").field(&self.now()).finish()
    }
}

/// Hand-advanced time, for headless runs and tests
#[derive(Debug, Clone, Default)]
pub struct ManualTime(Rc<Cell<f64>>);

impl ManualTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.0.get()
    }

    pub fn set(&self, t: f64) {
        self.0.set(t);
    }

    pub fn advance(&self, dt: f64) {
        self.0.set(self.0.get() + dt);
    }

    pub fn source(&self) -> TimeSource {
        let cell = Rc::clone(&self.0);
        TimeSource::from_fn(move || cell.get())
    }
}

/// A pausable, restartable, rate-scaled elapsed-time counter
///
/// All mutators take `&self` so a clock shared through `Rc` (the root and
/// game clocks) can be paused by whoever holds it.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    source: TimeSource,
    time_scale: f64,
    duration: Cell<f64>,
    start_time: Cell<f64>,
    paused_at: Cell<Option<f64>>,
    accumulated_pause: Cell<f64>,
}

impl VirtualClock {
    /// A clock that is over after `duration` seconds (negative = never)
    pub fn new(duration: f64, source: TimeSource) -> Self {
        let start = source.now();
        Self {
            source,
            time_scale: 1.0,
            duration: Cell::new(duration),
            start_time: Cell::new(start),
            paused_at: Cell::new(None),
            accumulated_pause: Cell::new(0.0),
        }
    }

    /// A clock that only measures elapsed time
    pub fn unbounded(source: TimeSource) -> Self {
        Self::new(UNBOUNDED, source)
    }

    /// A clock whose time flows `scale` times as fast as its source
    pub fn scaled(duration: f64, source: TimeSource, scale: f64) -> SimResult<Self> {
        if !scale.is_finite() || scale < 0.0 {
            return Err(SimError::InvalidTimeScale(scale));
        }
        let mut clock = Self::new(duration, source);
        clock.time_scale = scale;
        Ok(clock)
    }

    /// A time source reading this clock, for deriving child clocks
    pub fn source(self: &Rc<Self>) -> TimeSource {
        let clock = Rc::clone(self);
        TimeSource::from_fn(move || clock.get_time())
    }

    /// Elapsed virtual time in seconds; frozen while paused, never negative
    pub fn get_time(&self) -> f64 {
        let now = self.paused_at.get().unwrap_or_else(|| self.source.now());
        let elapsed = now - self.start_time.get() - self.accumulated_pause.get();
        (elapsed * self.time_scale).max(0.0)
    }

    pub fn isover(&self) -> bool {
        let duration = self.duration.get();
        duration >= 0.0 && self.get_time() >= duration
    }

    pub fn duration(&self) -> f64 {
        self.duration.get()
    }

    pub fn is_unbounded(&self) -> bool {
        self.duration.get() < 0.0
    }

    /// Elapsed fraction of the duration, clamped to [0, 1] (0 when unbounded)
    pub fn progress(&self) -> f32 {
        let duration = self.duration.get();
        if duration < 0.0 {
            return 0.0;
        }
        if duration == 0.0 {
            return 1.0;
        }
        (self.get_time() / duration).clamp(0.0, 1.0) as f32
    }

    pub fn set_duration(&self, duration: f64, restart: bool) {
        self.duration.set(duration);
        if restart {
            self.restart();
        }
    }

    /// Reset elapsed time to zero, keeping the duration and pause state
    pub fn restart(&self) {
        let now = self.source.now();
        self.start_time.set(now);
        self.accumulated_pause.set(0.0);
        if self.paused_at.get().is_some() {
            self.paused_at.set(Some(now));
        }
    }

    pub fn pause(&self) {
        if self.paused_at.get().is_none() {
            self.paused_at.set(Some(self.source.now()));
        }
    }

    pub fn unpause(&self) {
        if let Some(paused_at) = self.paused_at.take() {
            let paused_for = (self.source.now() - paused_at).max(0.0);
            self.accumulated_pause
                .set(self.accumulated_pause.get() + paused_for);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.get().is_some()
    }
}
