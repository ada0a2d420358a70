//! Call protocol
//!
//! Calling function `n` whose `params` arguments are already on the stack:
//!
//! ```text
//! higher addresses
//!   arg 0            fp + locals + params
//!   ...
//!   arg params-1     fp + locals + 1
//!   local 1 .. n     fp + locals .. fp + 1   (pushed as zeros)
//!   saved fp         fp
//!   (free)           sp
//! lower addresses
//! ```
//!
//! On the way out the result is popped, `sp` returns to `fp`, `fp` is
//! restored from the saved slot, `sp` skips the locals and arguments and
//! the result is pushed. Net effect on the caller: `params` popped, one
//! value pushed.

use super::engine::Vm;
use super::errors::{VmError, VmResult};
use super::evaluator::Role;
use super::scheduler::SuspendPoint;
use crate::memory::observer::StepKind;
use crate::memory::{Address, Word};
use crate::program::Function;
use std::rc::Rc;
use tracing::{debug, warn};

impl Vm {
    /// Dispatch a `call` made from outside a running block: non-negative
    /// ids index the function table, negative ids go to the host
    pub(crate) fn call(&mut self, id: i32) -> VmResult<()> {
        if id < 0 {
            return self.call_host(id);
        }
        let program = Rc::clone(&self.program);
        let function = program.function(id)?;
        self.enter_frame(function)?;
        self.run_block(&function.body, Role::Body(function))?;
        Ok(())
    }

    /// Zero the locals and link a new frame above the pushed arguments
    pub(crate) fn enter_frame(&mut self, function: &Function) -> VmResult<()> {
        debug!(
            function = function.index,
            name = %function.label(),
            params = function.params,
            locals = function.locals,
            sp = self.machine.sp(),
            "call"
        );

        self.machine.begin_step(
            self.depth,
            StepKind::Enter {
                function: function.index,
            },
        );
        for _ in 0..function.locals {
            self.machine.push(0)?;
        }
        let saved_fp = self.machine.fp();
        self.machine.push(saved_fp as Word)?;
        self.machine.set_fp(self.machine.sp() + 1)
    }

    /// Tear the current frame down and leave the result in the caller's frame
    pub(crate) fn leave_frame(&mut self, function: &Function) -> VmResult<()> {
        self.machine.begin_step(
            self.depth,
            StepKind::Leave {
                function: function.index,
            },
        );
        let fp = self.machine.fp();
        // The body must leave its result above the saved fp slot.
        if self.machine.sp() + 1 >= fp {
            return Err(VmError::StackUnderflow {
                sp: self.machine.sp(),
            });
        }
        let result = self.machine.pop()?;
        self.machine.set_sp(fp)?;
        let saved = self.machine.memory().read(fp)?;
        let saved = Address::try_from(saved).map_err(|_| VmError::InvalidAddress {
            address: saved as i64,
        })?;
        self.machine.set_fp(saved)?;
        self.machine
            .set_sp(fp + function.locals + function.params)?;
        self.machine.push(result)?;
        debug!(function = function.index, result, "return");
        Ok(())
    }

    pub(crate) fn call_host(&mut self, id: i32) -> VmResult<()> {
        self.scheduler.suspend(SuspendPoint::HostCall(id));
        match self.host.name(id) {
            Some(name) => {
                self.machine
                    .begin_step(self.depth, StepKind::Host { id, name });
                self.host.dispatch(id, &mut self.machine)?;
                Ok(())
            }
            None if self.config.lenient_host_calls => {
                warn!(id, "unknown host call skipped");
                self.machine.push(0)
            }
            None => Err(VmError::UnknownHostCall { id }),
        }
    }
}
