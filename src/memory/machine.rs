//! Machine state: address space, registers and the stack discipline
//!
//! [`Machine`] owns the [`AddressSpace`] together with the stack pointer,
//! frame pointer and heap pointer. Every mutation goes through this type so
//! that a single place enforces the stack/heap collision guard and reports
//! changes to the attached [`Observer`].
//!
//! # Stack discipline
//!
//! The stack grows downward and `sp` always names the next free slot:
//! - `push`: write at `sp`, then decrement
//! - `pop`: increment, then read at `sp`
//!
//! `push` refuses to write below the heap pointer, and `pop` refuses to move
//! past the last cell.

use super::address_space::AddressSpace;
use super::observer::{MemoryEvent, Observer, StepInfo, StepKind};
use super::{Address, Cell, Word};
use crate::interpreter::errors::{VmError, VmResult};
use tracing::trace;

/// Longest string read back from memory before giving up on a terminator
const MAX_STRING_LEN: usize = 1 << 16;

pub struct Machine {
    memory: AddressSpace,
    sp: Address,
    fp: Address,
    heap_top: Address,
    steps: u64,
    observer: Option<Box<dyn Observer>>,
}

impl Machine {
    /// Create a machine with an empty address space and the stack at the top
    pub fn new(capacity: usize) -> VmResult<Self> {
        if capacity == 0 || capacity > i32::MAX as usize {
            return Err(VmError::malformed(format!(
                "address space capacity {} is out of range",
                capacity
            )));
        }
        Ok(Machine {
            memory: AddressSpace::new(capacity),
            sp: capacity - 1,
            fp: capacity - 1,
            heap_top: 0,
            steps: 0,
            observer: None,
        })
    }

    pub fn memory(&self) -> &AddressSpace {
        &self.memory
    }

    pub fn capacity(&self) -> usize {
        self.memory.capacity()
    }

    pub fn sp(&self) -> Address {
        self.sp
    }

    pub fn fp(&self) -> Address {
        self.fp
    }

    pub fn heap_top(&self) -> Address {
        self.heap_top
    }

    /// Number of steps announced so far
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Number of values currently on the stack
    pub fn stack_depth(&self) -> usize {
        self.capacity() - 1 - self.sp
    }

    pub fn set_observer(&mut self, observer: Box<dyn Observer>) {
        self.observer = Some(observer);
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn Observer>> {
        self.observer.take()
    }

    /// Announce the start of a step to the observer
    pub fn begin_step(&mut self, depth: usize, kind: StepKind) {
        let info = StepInfo {
            index: self.steps,
            depth,
            kind,
        };
        self.steps += 1;
        if let Some(observer) = self.observer.as_mut() {
            observer.on_step(&info);
        }
    }

    fn notify(&mut self, address: Option<Address>, previous: Cell, value: Cell) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_mutation(&MemoryEvent {
                address,
                previous,
                value,
                sp: self.sp,
                fp: self.fp,
            });
        }
    }

    /// Write `value` at `sp` and move `sp` down one cell
    pub fn push(&mut self, value: Word) -> VmResult<()> {
        if self.sp < self.heap_top || self.sp == 0 {
            return Err(VmError::StackOverflow {
                sp: self.sp,
                heap_top: self.heap_top,
            });
        }
        let address = self.sp;
        let previous = self.memory.write(address, value)?;
        self.sp -= 1;
        trace!(value, address, "push");
        self.notify(Some(address), previous, Some(value));
        Ok(())
    }

    /// Move `sp` up one cell and read the value there
    pub fn pop(&mut self) -> VmResult<Word> {
        if self.sp + 1 >= self.capacity() {
            return Err(VmError::StackUnderflow { sp: self.sp });
        }
        let value = self.memory.read(self.sp + 1)?;
        self.sp += 1;
        trace!(value, address = self.sp, "pop");
        self.notify(None, None, None);
        Ok(value)
    }

    /// Value on top of the stack without popping it
    pub fn peek(&self) -> VmResult<Word> {
        if self.sp + 1 >= self.capacity() {
            return Err(VmError::StackUnderflow { sp: self.sp });
        }
        self.memory.read(self.sp + 1)
    }

    /// Indirect load through a word used as an address
    pub fn fetch(&self, address: Word) -> VmResult<Word> {
        let address = self.memory.resolve(address as i64)?;
        self.memory.read(address)
    }

    /// Indirect store through a word used as an address
    pub fn store(&mut self, address: Word, value: Word) -> VmResult<()> {
        let address = self.memory.resolve(address as i64)?;
        let previous = self.memory.write(address, value)?;
        self.notify(Some(address), previous, Some(value));
        Ok(())
    }

    pub fn set_sp(&mut self, sp: Address) -> VmResult<()> {
        if sp >= self.capacity() {
            return Err(VmError::StackUnderflow { sp: self.sp });
        }
        self.sp = sp;
        self.notify(None, None, None);
        Ok(())
    }

    pub fn set_fp(&mut self, fp: Address) -> VmResult<()> {
        self.fp = self.memory.resolve(fp as i64)?;
        self.notify(None, None, None);
        Ok(())
    }

    /// Move the heap pointer; only the loader and `alloc` do this
    pub fn set_heap_top(&mut self, heap_top: Address) -> VmResult<()> {
        if heap_top > self.capacity() {
            return Err(VmError::InvalidAddress {
                address: heap_top as i64,
            });
        }
        self.heap_top = heap_top;
        Ok(())
    }

    /// Bump-allocate `size` cells and return the old heap pointer
    pub fn alloc(&mut self, size: Word) -> VmResult<Word> {
        if size < 0 {
            return Err(VmError::InvalidInput {
                message: format!("alloc of negative size {}", size),
            });
        }
        let base = self.heap_top;
        let top = base + size as usize;
        // The slot at sp is free, everything above it is live stack.
        if top > self.sp + 1 {
            return Err(VmError::OutOfMemory {
                requested: size,
                heap_top: base,
                sp: self.sp,
            });
        }
        self.heap_top = top;
        Ok(base as Word)
    }

    /// Read a NUL-terminated string, one code point per cell
    pub fn read_string(&self, address: Word) -> VmResult<String> {
        let mut current = self.memory.resolve(address as i64)?;
        let mut text = String::new();
        loop {
            let code = self.memory.read(current)?;
            if code == 0 {
                break;
            }
            text.push(char::from_u32(code as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
            current += 1;
            if text.len() > MAX_STRING_LEN || current >= self.capacity() {
                return Err(VmError::InvalidInput {
                    message: format!("string at {} has no terminator", address),
                });
            }
        }
        Ok(text)
    }

    /// Write a string followed by a NUL terminator
    pub fn write_string(&mut self, address: Word, text: &str) -> VmResult<()> {
        let mut current = address;
        for ch in text.chars() {
            self.store(current, ch as Word)?;
            current = current.wrapping_add(1);
        }
        self.store(current, 0)
    }

    /// Seed a cell before execution starts; not reported to observers
    pub(crate) fn seed(&mut self, address: Address, value: Word) -> VmResult<()> {
        self.memory.write(address, value).map(|_| ())
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("capacity", &self.capacity())
            .field("sp", &self.sp)
            .field("fp", &self.fp)
            .field("heap_top", &self.heap_top)
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Recorder {
        events: Vec<MemoryEvent>,
        steps: Vec<StepInfo>,
    }

    impl Observer for Recorder {
        fn on_step(&mut self, step: &StepInfo) {
            self.steps.push(*step);
        }

        fn on_mutation(&mut self, event: &MemoryEvent) {
            self.events.push(*event);
        }
    }

    #[test]
    fn test_push_pop_discipline() {
        let mut machine = Machine::new(8).unwrap();
        assert_eq!(machine.sp(), 7);
        machine.push(5).unwrap();
        assert_eq!(machine.sp(), 6);
        assert_eq!(machine.memory().cell(7), Some(5));
        assert_eq!(machine.pop().unwrap(), 5);
        assert_eq!(machine.sp(), 7);
    }

    #[test]
    fn test_pop_empty_stack_underflows() {
        let mut machine = Machine::new(8).unwrap();
        assert_eq!(machine.pop(), Err(VmError::StackUnderflow { sp: 7 }));
    }

    #[test]
    fn test_push_into_heap_overflows() {
        let mut machine = Machine::new(8).unwrap();
        machine.set_heap_top(6).unwrap();
        machine.push(1).unwrap();
        machine.push(2).unwrap();
        assert_eq!(
            machine.push(3),
            Err(VmError::StackOverflow { sp: 5, heap_top: 6 })
        );
    }

    #[test]
    fn test_alloc_bumps_and_guards_stack() {
        let mut machine = Machine::new(16).unwrap();
        machine.set_heap_top(4).unwrap();
        assert_eq!(machine.alloc(3).unwrap(), 4);
        assert_eq!(machine.heap_top(), 7);
        assert!(matches!(
            machine.alloc(100),
            Err(VmError::OutOfMemory { requested: 100, .. })
        ));
    }

    #[test]
    fn test_string_round_trip_through_cells() {
        let mut machine = Machine::new(64).unwrap();
        machine.write_string(10, "hi!").unwrap();
        assert_eq!(machine.memory().cell(13), Some(0));
        assert_eq!(machine.read_string(10).unwrap(), "hi!");
    }

    #[test]
    fn test_observer_sees_mutations() {
        let recorder = Rc::new(RefCell::new(Recorder::default()));
        let mut machine = Machine::new(8).unwrap();
        machine.set_observer(Box::new(recorder.clone()));
        machine.begin_step(0, StepKind::Instruction(crate::program::Opcode::Push));
        machine.push(9).unwrap();
        machine.store(2, 4).unwrap();

        let recorded = recorder.borrow();
        assert_eq!(recorded.steps.len(), 1);
        assert_eq!(recorded.events.len(), 2);
        assert_eq!(recorded.events[0].address, Some(7));
        assert_eq!(recorded.events[0].value, Some(9));
        assert_eq!(recorded.events[0].sp, 6);
        assert_eq!(recorded.events[1].address, Some(2));
    }
}
