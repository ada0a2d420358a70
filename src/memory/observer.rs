//! Read-only observation of VM state changes
//!
//! An [`Observer`] is told when a new step begins and after every mutation
//! of the address space or the `sp`/`fp` registers. It receives copies, so it
//! cannot influence execution.

use super::{Address, Cell};
use crate::program::Opcode;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One mutation of the machine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryEvent {
    /// The written cell, or `None` when only a register moved
    pub address: Option<Address>,
    pub previous: Cell,
    pub value: Cell,
    pub sp: Address,
    pub fp: Address,
}

/// What a step is doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// Evaluating one instruction
    Instruction(Opcode),
    /// Frame setup for a call to a function table entry
    Enter { function: usize },
    /// Frame teardown after the body finished
    Leave { function: usize },
    /// Dispatching a host capability
    Host { id: i32, name: &'static str },
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Instruction(op) => write!(f, "{}", op.mnemonic()),
            StepKind::Enter { function } => write!(f, "enter #{}", function),
            StepKind::Leave { function } => write!(f, "leave #{}", function),
            StepKind::Host { id, name } => write!(f, "host {} ({})", name, id),
        }
    }
}

/// Announcement of a step, sent before its mutations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepInfo {
    pub index: u64,
    pub depth: usize,
    pub kind: StepKind,
}

pub trait Observer {
    fn on_step(&mut self, _step: &StepInfo) {}

    fn on_mutation(&mut self, event: &MemoryEvent);
}

impl<O: Observer + ?Sized> Observer for Rc<RefCell<O>> {
    fn on_step(&mut self, step: &StepInfo) {
        self.borrow_mut().on_step(step);
    }

    fn on_mutation(&mut self, event: &MemoryEvent) {
        self.borrow_mut().on_mutation(event);
    }
}

impl<O: Observer + ?Sized> Observer for Box<O> {
    fn on_step(&mut self, step: &StepInfo) {
        (**self).on_step(step);
    }

    fn on_mutation(&mut self, event: &MemoryEvent) {
        (**self).on_mutation(event);
    }
}
