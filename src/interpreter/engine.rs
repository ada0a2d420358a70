// Execution engine for the tree bytecode VM

use crate::config::VmConfig;
use crate::host::CapabilityTable;
use crate::interpreter::errors::{VmError, VmResult};
use crate::interpreter::evaluator::{Flow, Role};
use crate::interpreter::scheduler::{Immediate, Scheduler};
use crate::memory::machine::Machine;
use crate::memory::observer::Observer;
use crate::memory::Word;
use crate::program::{loader, Block, Program};
use std::rc::Rc;
use tracing::info;

/// One VM instance: machine state, the loaded program and its host
pub struct Vm {
    /// Address space and registers
    pub(crate) machine: Machine,

    /// Immutable function table; shared so bodies can run while `self` is borrowed
    pub(crate) program: Rc<Program>,

    /// Capabilities answering negative call ids
    pub(crate) host: CapabilityTable,

    /// Suspension policy consulted before steps and host calls
    pub(crate) scheduler: Box<dyn Scheduler>,

    pub(crate) config: VmConfig,

    /// Current nesting of blocks and calls
    pub(crate) depth: usize,
}

impl Vm {
    /// Load `program` into a fresh machine
    pub fn new(program: Program, config: VmConfig, host: CapabilityTable) -> VmResult<Self> {
        let machine = loader::load(&program, &config)?;
        Ok(Vm {
            machine,
            program: Rc::new(program),
            host,
            scheduler: Box::new(Immediate),
            config,
            depth: 0,
        })
    }

    /// Call the entry function and return its result
    pub fn run(&mut self) -> VmResult<Word> {
        let entry = self.program.entry;
        let function = self.program.entry_function()?;
        info!(entry, name = %function.label(), "run started");
        let result = self.invoke(entry as i32, &[])?;
        info!(result, steps = self.machine.steps(), "run finished");
        Ok(result)
    }

    /// Push `args` left to right, call `function` and pop its result
    ///
    /// This is how hosts start work outside the running program (timer
    /// expiry, click handlers). The stack pointer is left where it was.
    pub fn invoke(&mut self, function: i32, args: &[Word]) -> VmResult<Word> {
        if function >= 0 {
            let params = self.program.function(function)?.params;
            if params != args.len() {
                return Err(VmError::InvalidInput {
                    message: format!(
                        "function {} takes {} argument{}, got {}",
                        function,
                        params,
                        if params == 1 { "" } else { "s" },
                        args.len()
                    ),
                });
            }
        }
        for &arg in args {
            self.machine.push(arg)?;
        }
        self.call(function)?;
        self.machine.pop()
    }

    /// Evaluate `block` in the current frame
    pub fn execute(&mut self, block: &Block) -> VmResult<Flow> {
        self.run_block(block, Role::Root)
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn machine_mut(&mut self) -> &mut Machine {
        &mut self.machine
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    pub fn host(&self) -> &CapabilityTable {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut CapabilityTable {
        &mut self.host
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn set_observer(&mut self, observer: Box<dyn Observer>) {
        self.machine.set_observer(observer);
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn Observer>> {
        self.machine.take_observer()
    }

    pub fn set_scheduler(&mut self, scheduler: Box<dyn Scheduler>) {
        self.scheduler = scheduler;
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("machine", &self.machine)
            .field("functions", &self.program.functions.len())
            .field("host", &self.host)
            .field("depth", &self.depth)
            .finish()
    }
}
