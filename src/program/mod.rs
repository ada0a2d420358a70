//! Program representation
//!
//! - [`instruction`]: opcodes, instructions and nested blocks
//! - [`loader`]: JSON parsing, validation and address-space seeding
//!
//! A [`Program`] is immutable once built. The VM shares it behind an `Rc`
//! so that function bodies can be evaluated while the machine is borrowed
//! mutably.

pub mod instruction;
pub mod loader;

pub use instruction::{BinaryOp, Block, Instruction, Opcode};
pub use loader::{load, load_file, parse_program};

use crate::interpreter::errors::{VmError, VmResult};
use crate::memory::{Address, Word};

/// One entry of the function table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub index: usize,
    pub name: Option<String>,
    pub params: usize,
    pub locals: usize,
    pub body: Block,
}

impl Function {
    /// Display label, falling back to the table index
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("#{}", self.index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub entry: usize,
    pub static_top: Address,
    pub statics: Vec<(Address, Word)>,
    pub functions: Vec<Function>,
}

impl Program {
    pub fn builder() -> ProgramBuilder {
        ProgramBuilder::default()
    }

    /// Look up a non-negative call id in the function table
    pub fn function(&self, id: i32) -> VmResult<&Function> {
        usize::try_from(id)
            .ok()
            .and_then(|index| self.functions.get(index))
            .ok_or(VmError::UnknownFunction { id })
    }

    pub fn entry_function(&self) -> VmResult<&Function> {
        self.functions
            .get(self.entry)
            .ok_or_else(|| VmError::malformed(format!("no entry function {}", self.entry)))
    }
}

/// Assembles a [`Program`] in code, mostly for tests and demos
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    entry: usize,
    static_top: Address,
    statics: Vec<(Address, Word)>,
    functions: Vec<Function>,
}

impl ProgramBuilder {
    pub fn entry(mut self, entry: usize) -> Self {
        self.entry = entry;
        self
    }

    pub fn static_top(mut self, static_top: Address) -> Self {
        self.static_top = static_top;
        self
    }

    pub fn static_cell(mut self, address: Address, value: Word) -> Self {
        self.statics.push((address, value));
        self
    }

    /// Append a function; its call id is its position in the table
    pub fn function(mut self, params: usize, locals: usize, body: Block) -> Self {
        let index = self.functions.len();
        self.functions.push(Function {
            index,
            name: None,
            params,
            locals,
            body,
        });
        self
    }

    pub fn named(mut self, name: &str, params: usize, locals: usize, body: Block) -> Self {
        self = self.function(params, locals, body);
        if let Some(last) = self.functions.last_mut() {
            last.name = Some(name.to_string());
        }
        self
    }

    pub fn build(self) -> Program {
        Program {
            entry: self.entry,
            static_top: self.static_top,
            statics: self.statics,
            functions: self.functions,
        }
    }
}
