//! Block evaluation
//!
//! Adds `impl Vm` methods that run instruction blocks. Control constructs
//! carry their sub-blocks; entering one pushes an [`Activation`] onto an
//! explicit stack rather than recursing on the native one, so nesting is
//! bounded only by `max_depth`. When a block ends its outcome travels back
//! down that stack as a [`Flow`] value:
//!
//! - `if` propagates `Break` and `Return` from the chosen branch
//! - `loop` consumes `Break` (execution resumes after the loop) and
//!   propagates `Return`
//! - the call protocol consumes both (see [`calls`](super::calls))

use super::engine::Vm;
use super::errors::{VmError, VmResult};
use super::ops;
use super::scheduler::SuspendPoint;
use crate::memory::observer::StepKind;
use crate::memory::Word;
use crate::program::{Block, Function, Instruction, Program};
use std::rc::Rc;
use tracing::{debug, trace};

/// How evaluation of an instruction or block ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going at this program counter
    Continue(usize),
    /// Ran off the end of the block
    End,
    /// A `break` with a nonzero condition
    Break,
    /// A `return`; the value is already on the stack
    Return,
}

/// Why a block was entered, which decides what its final signal does
#[derive(Debug, Clone, Copy)]
pub(crate) enum Role<'p> {
    /// Started by `execute`; the signal goes back to the caller
    Root,
    /// Branch of an `if`
    Branch,
    /// Body of a `loop`, rerun until it breaks
    LoopBody,
    /// Body of a function; its frame is torn down when it ends
    Body(&'p Function),
}

/// A block being evaluated and the position within it
#[derive(Debug)]
struct Activation<'p> {
    block: &'p Block,
    pc: usize,
    role: Role<'p>,
}

/// Result of evaluating one instruction
enum Step<'p> {
    Signal(Flow),
    Enter(&'p Block, Role<'p>),
}

impl Vm {
    /// Run `block` until it ends or signals, entering nested blocks as
    /// they come up
    ///
    /// Each nested block counts against the configured depth limit.
    pub(crate) fn run_block<'p>(&mut self, block: &'p Block, role: Role<'p>) -> VmResult<Flow> {
        let base = self.depth;
        let result = self.drive(block, role);
        self.depth = base;
        result
    }

    fn drive<'p>(&mut self, root: &'p Block, role: Role<'p>) -> VmResult<Flow> {
        let program = Rc::clone(&self.program);
        let mut stack = Vec::new();
        self.activate(&mut stack, root, role)?;

        while let Some(top) = stack.last_mut() {
            let (block, pc) = (top.block, top.pc);
            match self.eval(&program, block, pc)? {
                Step::Signal(Flow::Continue(next)) => top.pc = next,
                Step::Enter(child, role) => {
                    top.pc = pc + 1;
                    self.activate(&mut stack, child, role)?;
                }
                Step::Signal(flow) => {
                    if let Some(done) = self.unwind(&mut stack, flow)? {
                        return Ok(done);
                    }
                }
            }
        }
        Ok(Flow::End)
    }

    fn activate<'p>(
        &mut self,
        stack: &mut Vec<Activation<'p>>,
        block: &'p Block,
        role: Role<'p>,
    ) -> VmResult<()> {
        if self.depth >= self.config.max_depth {
            return Err(VmError::CallDepthExceeded {
                limit: self.config.max_depth,
            });
        }
        self.depth += 1;
        stack.push(Activation { block, pc: 0, role });
        Ok(())
    }

    /// Hand `flow` to the enclosing blocks until one consumes it
    ///
    /// Returns the signal once the bottom activation is gone.
    fn unwind(&mut self, stack: &mut Vec<Activation<'_>>, flow: Flow) -> VmResult<Option<Flow>> {
        while let Some(activation) = stack.pop() {
            if let (Role::LoopBody, Flow::End) = (activation.role, flow) {
                stack.push(Activation {
                    pc: 0,
                    ..activation
                });
                return Ok(None);
            }
            self.depth -= 1;
            let consumed = match activation.role {
                Role::Root => return Ok(Some(flow)),
                Role::Branch => flow == Flow::End,
                Role::LoopBody => flow == Flow::Break,
                Role::Body(function) => {
                    if flow == Flow::Break {
                        debug!(function = function.index, "break left the function body");
                    }
                    self.leave_frame(function)?;
                    true
                }
            };
            if consumed {
                return Ok(stack.is_empty().then_some(Flow::Return));
            }
        }
        Ok(Some(flow))
    }

    /// Evaluate the instruction at `pc`
    fn eval<'p>(&mut self, program: &'p Program, block: &'p Block, pc: usize) -> VmResult<Step<'p>> {
        let Some(instruction) = block.get(pc) else {
            return Ok(Step::Signal(Flow::End));
        };

        self.scheduler.suspend(SuspendPoint::Step);
        self.machine
            .begin_step(self.depth, StepKind::Instruction(instruction.opcode()));
        trace!(
            pc,
            depth = self.depth,
            sp = self.machine.sp(),
            fp = self.machine.fp(),
            "{}",
            instruction
        );

        match instruction {
            Instruction::Push(value) => self.machine.push(*value)?,
            Instruction::Fetch => {
                let address = self.machine.pop()?;
                let value = self.machine.fetch(address)?;
                self.machine.push(value)?;
            }
            Instruction::Store => {
                let address = self.machine.pop()?;
                let value = self.machine.pop()?;
                self.machine.store(address, value)?;
            }
            Instruction::If {
                then_block,
                else_block,
            } => {
                let condition = self.machine.pop()?;
                let branch = if condition != 0 { then_block } else { else_block };
                return Ok(Step::Enter(branch, Role::Branch));
            }
            Instruction::Loop(body) => return Ok(Step::Enter(body, Role::LoopBody)),
            Instruction::Break => {
                if self.machine.pop()? != 0 {
                    return Ok(Step::Signal(Flow::Break));
                }
            }
            Instruction::Return => return Ok(Step::Signal(Flow::Return)),
            Instruction::Call(id) if *id >= 0 => {
                let function = program.function(*id)?;
                self.enter_frame(function)?;
                return Ok(Step::Enter(&function.body, Role::Body(function)));
            }
            Instruction::Call(id) => self.call_host(*id)?,
            Instruction::FpPlus => {
                let offset = self.machine.pop()?;
                let fp = self.machine.fp() as Word;
                self.machine.push(offset.wrapping_add(fp))?;
            }
            Instruction::Not => {
                let x = self.machine.pop()?;
                self.machine.push(ops::not(x))?;
            }
            Instruction::Binary(op) => {
                let y = self.machine.pop()?;
                let x = self.machine.pop()?;
                self.machine.push(op.apply(x, y)?)?;
            }
            Instruction::Pop => {
                self.machine.pop()?;
            }
            Instruction::Debug => {
                debug!(
                    pc,
                    sp = self.machine.sp(),
                    fp = self.machine.fp(),
                    "debug breakpoint"
                );
            }
        }
        Ok(Step::Signal(Flow::Continue(pc + 1)))
    }
}
