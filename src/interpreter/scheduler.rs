//! Suspension policy
//!
//! The evaluator consults a [`Scheduler`] before every instruction and before
//! every host call. Schedulers may block (pacing, pause) but never alter the
//! machine, so execution results do not depend on the policy.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Interval at which a paused scheduler rechecks the pause flag
const PAUSE_POLL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendPoint {
    /// About to evaluate an instruction
    Step,
    /// About to dispatch the host call with this id
    HostCall(i32),
}

pub trait Scheduler {
    fn suspend(&mut self, point: SuspendPoint);
}

/// Never waits
#[derive(Debug, Default, Clone, Copy)]
pub struct Immediate;

impl Scheduler for Immediate {
    fn suspend(&mut self, _point: SuspendPoint) {}
}

/// Sleeps a fixed delay per step and blocks while the pause flag is set
#[derive(Debug, Clone)]
pub struct Paced {
    delay: Duration,
    paused: Arc<AtomicBool>,
}

impl Paced {
    pub fn new(delay: Duration) -> Self {
        Paced {
            delay,
            paused: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag; setting it to `true` holds the VM at its next step
    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.paused)
    }
}

impl Scheduler for Paced {
    fn suspend(&mut self, point: SuspendPoint) {
        while self.paused.load(Ordering::Acquire) {
            thread::sleep(PAUSE_POLL);
        }
        if point == SuspendPoint::Step && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
    }
}
