//! One-shot timers on a virtual clock
//!
//! `timer` records a pending invocation `delay` milliseconds after the
//! current virtual time. Nothing fires while the program is running; once
//! the entry function has returned, [`drain`] fires pending timers in due
//! order (ties in scheduling order), advancing the clock to each due time.
//! A fired function may schedule further timers, so draining is bounded by
//! a budget.

use crate::interpreter::engine::Vm;
use crate::interpreter::errors::VmResult;
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub handle: i32,
    pub due: u64,
    pub function: i32,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    now: u64,
    next_handle: i32,
    /// Keyed by (due time, handle) so iteration is firing order
    pending: BTreeMap<(u64, i32), i32>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time in milliseconds
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Schedule `function` and return the timer handle
    pub fn schedule(&mut self, delay_ms: i32, function: i32) -> i32 {
        self.next_handle += 1;
        let handle = self.next_handle;
        let due = self.now + delay_ms.max(0) as u64;
        self.pending.insert((due, handle), function);
        debug!(handle, due, function, "timer scheduled");
        handle
    }

    /// Cancel a pending timer; unknown or fired handles are ignored
    pub fn cancel(&mut self, handle: i32) -> bool {
        let key = self.pending.keys().find(|(_, h)| *h == handle).copied();
        match key {
            Some(key) => {
                self.pending.remove(&key);
                true
            }
            None => false,
        }
    }

    /// Drop every pending timer; returns how many were dropped
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }

    /// Remove the next timer to fire and advance the clock to its due time
    pub fn pop_due(&mut self) -> Option<PendingTimer> {
        let ((due, handle), function) = self.pending.pop_first()?;
        self.now = self.now.max(due);
        Some(PendingTimer {
            handle,
            due,
            function,
        })
    }
}

/// Fire pending timers until none remain or `budget` firings have run
///
/// Returns the number of timers fired.
pub fn drain(vm: &mut Vm, timers: &RefCell<TimerQueue>, budget: usize) -> VmResult<usize> {
    let mut fired = 0;
    while fired < budget {
        // Release the borrow before invoking; the callee may schedule more timers.
        let next = timers.borrow_mut().pop_due();
        let Some(timer) = next else {
            return Ok(fired);
        };
        debug!(
            handle = timer.handle,
            function = timer.function,
            due = timer.due,
            "timer fired"
        );
        vm.invoke(timer.function, &[])?;
        fired += 1;
    }
    let dropped = timers.borrow_mut().clear();
    if dropped > 0 {
        warn!(dropped, budget, "timer budget exhausted, dropping pending timers");
    }
    Ok(fired)
}
