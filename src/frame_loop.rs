//! Frame driving: wall clock, the per-frame tick and its stop signal.
//!
//! The scene root owns exactly one [`FrameLoop`]. Hosts call
//! [`FrameLoop::step`] once per display refresh; once the loop's
//! [`StopSignal`] has fired, steps are refused and nothing downstream runs.

use std::cell::Cell;
use std::rc::Rc;

/// Source of wall-clock time in seconds.
pub trait Clock {
    fn now_secs(&self) -> f64;
}

/// Real wall clock (seconds since the Unix epoch).
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(not(target_arch = "wasm32"))]
    fn now_secs(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    #[cfg(target_arch = "wasm32")]
    fn now_secs(&self) -> f64 {
        js_sys::Date::now() / 1000.0
    }
}

/// Manually advanced clock for tests and offline rendering.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_secs: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_secs)),
        }
    }

    pub fn set(&self, secs: f64) {
        self.now.set(secs);
    }

    pub fn advance(&self, dt_secs: f64) {
        self.now.set(self.now.get() + dt_secs);
    }
}

impl Clock for ManualClock {
    fn now_secs(&self) -> f64 {
        self.now.get()
    }
}

/// One-shot shared stop flag.
#[derive(Debug, Default, Clone)]
pub struct StopSignal {
    stopped: Rc<Cell<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Returns `true` only for the call that actually
    /// transitioned it, so teardown work runs exactly once.
    pub fn stop(&self) -> bool {
        !self.stopped.replace(true)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

/// Timing handed to per-frame work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTime {
    /// Wall-clock time of this frame, seconds.
    pub now: f64,
    /// Seconds since the previous frame (0 on the first frame).
    pub dt: f32,
    /// Zero-based frame index.
    pub index: u64,
}

/// The per-frame tick owned by the scene root.
#[derive(Debug, Default)]
pub struct FrameLoop {
    stop: StopSignal,
    frames: u64,
    last_now: Option<f64>,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that can stop this loop from elsewhere.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_stopped()
    }

    /// Number of frames that actually ran.
    pub fn frames_run(&self) -> u64 {
        self.frames
    }

    /// Run one frame of work unless the loop has been stopped.
    ///
    /// Returns `true` if `work` ran.
    pub fn step(&mut self, now: f64, work: impl FnOnce(FrameTime)) -> bool {
        if self.stop.is_stopped() {
            return false;
        }
        let dt = self.last_now.map(|prev| (now - prev).max(0.0) as f32).unwrap_or(0.0);
        let frame = FrameTime {
            now,
            dt,
            index: self.frames,
        };
        self.last_now = Some(now);
        self.frames += 1;
        work(frame);
        true
    }

    /// Fire the stop signal. Returns `true` on the first call only.
    pub fn stop(&self) -> bool {
        self.stop.stop()
    }
}
