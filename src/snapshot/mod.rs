// Execution history for reverse stepping

use crate::host::console::Console;
use crate::memory::machine::Machine;
use crate::memory::observer::{MemoryEvent, Observer, StepInfo, StepKind};
use crate::memory::{Address, Cell, Word};
use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;
use tracing::warn;

/// A recorded step and where its mutations start in the event log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedStep {
    pub info: StepInfo,
    pub first_event: usize,
    /// Length of the console output when the step began
    pub output_len: usize,
}

/// Observer that records every step and mutation as deltas
///
/// Recording stops once `limit` events are stored; the history is then
/// flagged truncated and replays only the recorded prefix.
#[derive(Debug)]
pub struct History {
    initial_cells: Vec<Cell>,
    initial_sp: Address,
    initial_fp: Address,
    steps: Vec<RecordedStep>,
    events: Vec<MemoryEvent>,
    limit: usize,
    truncated: bool,
    console: Option<Rc<RefCell<Console>>>,
}

impl History {
    /// Start recording from the current state of `machine`
    pub fn new(machine: &Machine, limit: usize) -> Self {
        History {
            initial_cells: machine.memory().cells().to_vec(),
            initial_sp: machine.sp(),
            initial_fp: machine.fp(),
            steps: Vec::new(),
            events: Vec::new(),
            limit,
            truncated: false,
            console: None,
        }
    }

    /// Track console output so replays can show it per step
    pub fn with_console(mut self, console: Rc<RefCell<Console>>) -> Self {
        self.console = Some(console);
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[RecordedStep] {
        &self.steps
    }

    pub fn events(&self) -> &[MemoryEvent] {
        &self.events
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    fn at_limit(&mut self) -> bool {
        if self.truncated {
            return true;
        }
        if self.events.len() >= self.limit {
            self.truncated = true;
            warn!(
                limit = self.limit,
                steps = self.steps.len(),
                "history limit reached, recording stopped"
            );
            return true;
        }
        false
    }

    /// Finish recording; `output` is the complete console output of the run
    pub fn into_replay(self, output: String) -> Replay {
        Replay {
            cells: self.initial_cells,
            sp: self.initial_sp,
            fp: self.initial_fp,
            initial_sp: self.initial_sp,
            initial_fp: self.initial_fp,
            steps: self.steps,
            events: self.events,
            output,
            position: 0,
            truncated: self.truncated,
        }
    }
}

impl Observer for History {
    fn on_step(&mut self, step: &StepInfo) {
        if self.at_limit() {
            return;
        }
        let output_len = self
            .console
            .as_ref()
            .map(|console| console.borrow().output().len())
            .unwrap_or(0);
        self.steps.push(RecordedStep {
            info: *step,
            first_event: self.events.len(),
            output_len,
        });
    }

    fn on_mutation(&mut self, event: &MemoryEvent) {
        if self.at_limit() {
            return;
        }
        if self.steps.is_empty() {
            // Mutations before the first step are part of the starting state.
            if let Some(address) = event.address {
                if let Some(slot) = self.initial_cells.get_mut(address) {
                    *slot = event.value;
                }
            }
            self.initial_sp = event.sp;
            self.initial_fp = event.fp;
            return;
        }
        self.events.push(*event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    AtStart,
    AtEnd,
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::AtStart => write!(f, "already at the first step"),
            HistoryError::AtEnd => write!(f, "already at the last step"),
        }
    }
}

impl std::error::Error for HistoryError {}

/// One frame found by walking the saved-fp chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView {
    /// Function table index
    pub function: usize,
    pub fp: Address,
    pub saved_fp: Cell,
}

/// Cursor over a recorded history
///
/// Position `n` shows the machine after the first `n` steps; position 0 is
/// the loaded program before anything ran.
#[derive(Debug, Clone)]
pub struct Replay {
    cells: Vec<Cell>,
    sp: Address,
    fp: Address,
    initial_sp: Address,
    initial_fp: Address,
    steps: Vec<RecordedStep>,
    events: Vec<MemoryEvent>,
    output: String,
    position: usize,
    truncated: bool,
}

impl Replay {
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of recorded steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell(&self, address: Address) -> Cell {
        self.cells.get(address).copied().flatten()
    }

    pub fn sp(&self) -> Address {
        self.sp
    }

    pub fn fp(&self) -> Address {
        self.fp
    }

    /// The step that produced the current state
    pub fn last_step(&self) -> Option<&RecordedStep> {
        self.position
            .checked_sub(1)
            .and_then(|index| self.steps.get(index))
    }

    /// The step that runs next
    pub fn next_step(&self) -> Option<&RecordedStep> {
        self.steps.get(self.position)
    }

    /// Console output produced up to the current position
    pub fn output(&self) -> &str {
        let len = self
            .next_step()
            .map(|step| step.output_len)
            .unwrap_or(self.output.len());
        self.output.get(..len).unwrap_or(&self.output)
    }

    fn event_range(&self, index: usize) -> Range<usize> {
        let start = self.steps[index].first_event;
        let end = self
            .steps
            .get(index + 1)
            .map(|step| step.first_event)
            .unwrap_or(self.events.len());
        start..end
    }

    pub fn step_forward(&mut self) -> Result<(), HistoryError> {
        if self.position >= self.steps.len() {
            return Err(HistoryError::AtEnd);
        }
        for i in self.event_range(self.position) {
            let event = self.events[i];
            if let Some(address) = event.address {
                if let Some(slot) = self.cells.get_mut(address) {
                    *slot = event.value;
                }
            }
            self.sp = event.sp;
            self.fp = event.fp;
        }
        self.position += 1;
        Ok(())
    }

    pub fn step_backward(&mut self) -> Result<(), HistoryError> {
        if self.position == 0 {
            return Err(HistoryError::AtStart);
        }
        self.position -= 1;
        let range = self.event_range(self.position);
        for i in range.clone().rev() {
            let event = self.events[i];
            if let Some(address) = event.address {
                if let Some(slot) = self.cells.get_mut(address) {
                    *slot = event.previous;
                }
            }
        }
        match range.start.checked_sub(1).map(|i| self.events[i]) {
            Some(before) => {
                self.sp = before.sp;
                self.fp = before.fp;
            }
            None => {
                self.sp = self.initial_sp;
                self.fp = self.initial_fp;
            }
        }
        Ok(())
    }

    pub fn rewind_to_start(&mut self) {
        while self.step_backward().is_ok() {}
    }

    pub fn jump_to_end(&mut self) {
        while self.step_forward().is_ok() {}
    }

    /// Move to `position`, clamped to the recorded range
    pub fn seek(&mut self, position: usize) {
        let target = position.min(self.steps.len());
        while self.position < target && self.step_forward().is_ok() {}
        while self.position > target && self.step_backward().is_ok() {}
    }

    /// Active frames, innermost first
    ///
    /// Functions come from the unmatched `Enter` steps so far; addresses
    /// come from walking the saved-fp chain in the current memory.
    pub fn call_chain(&self) -> Vec<FrameView> {
        let mut functions = Vec::new();
        for step in &self.steps[..self.position] {
            match step.info.kind {
                StepKind::Enter { function } => functions.push(function),
                StepKind::Leave { .. } => {
                    functions.pop();
                }
                _ => {}
            }
        }

        let mut frames = Vec::with_capacity(functions.len());
        let mut fp = self.fp;
        for &function in functions.iter().rev() {
            let saved_fp = self.cell(fp);
            frames.push(FrameView {
                function,
                fp,
                saved_fp,
            });
            match saved_fp.and_then(|saved: Word| Address::try_from(saved).ok()) {
                Some(next) => fp = next,
                None => break,
            }
        }
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Opcode;

    fn push_step(machine: &mut Machine, value: Word) {
        machine.begin_step(0, StepKind::Instruction(Opcode::Push));
        machine.push(value).unwrap();
    }

    #[test]
    fn test_forward_and_backward_restore_state() {
        let mut machine = Machine::new(8).unwrap();
        let history = Rc::new(RefCell::new(History::new(&machine, 100)));
        machine.set_observer(Box::new(Rc::clone(&history)));
        push_step(&mut machine, 1);
        push_step(&mut machine, 2);
        machine.take_observer();

        let history = Rc::try_unwrap(history).unwrap().into_inner();
        let mut replay = history.into_replay(String::new());
        assert_eq!(replay.len(), 2);
        assert_eq!(replay.sp(), 7);

        replay.jump_to_end();
        assert_eq!(replay.cell(6), Some(2));
        assert_eq!(replay.sp(), 5);

        replay.step_backward().unwrap();
        assert_eq!(replay.cell(6), None);
        assert_eq!(replay.sp(), 6);

        replay.rewind_to_start();
        assert_eq!(replay.cell(7), None);
        assert_eq!(replay.step_backward(), Err(HistoryError::AtStart));
    }

    #[test]
    fn test_limit_truncates() {
        let mut machine = Machine::new(8).unwrap();
        let history = Rc::new(RefCell::new(History::new(&machine, 1)));
        machine.set_observer(Box::new(Rc::clone(&history)));
        push_step(&mut machine, 1);
        push_step(&mut machine, 2);
        machine.take_observer();

        let history = history.borrow();
        assert!(history.is_truncated());
        assert_eq!(history.len(), 1);
        assert_eq!(history.events().len(), 1);
    }
}
