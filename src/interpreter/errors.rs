//! Error types for the virtual machine
//!
//! This module defines [`VmError`], which covers every failure the VM can
//! report: structural problems found while loading a program, faults raised
//! while evaluating bytecode, and violations of the host call contract.
//!
//! All errors are fatal to the run. There is no recovery point inside the
//! evaluator; `break` and `return` travel as [`Flow`](crate::interpreter::Flow)
//! values, never as errors.

use std::fmt;

/// Errors that can occur while loading or executing a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// The program representation violates the expected layout
    MalformedProgram { message: String },

    /// An instruction code that the evaluator does not know
    UnknownOpcode { code: i64, function: usize },

    /// Division or modulo by zero
    DivisionByZero { operation: &'static str },

    /// Popped past the top of the address space
    StackUnderflow { sp: usize },

    /// The stack ran into the heap or the bottom of the address space
    StackOverflow { sp: usize, heap_top: usize },

    /// Address outside `0..capacity`
    InvalidAddress { address: i64 },

    /// Read from a cell that was never written
    UninitializedRead { address: usize },

    /// `call` with a non-negative id outside the function table
    UnknownFunction { id: i32 },

    /// `call` with a negative id that no capability answers
    UnknownHostCall { id: i32 },

    /// A capability popped a different number of values than it declared
    HostContractViolation {
        id: i32,
        name: &'static str,
        expected: usize,
        popped: i64,
    },

    /// Nesting of blocks and calls exceeded the configured limit
    CallDepthExceeded { limit: usize },

    /// `alloc` would move the heap into the live stack
    OutOfMemory {
        requested: i32,
        heap_top: usize,
        sp: usize,
    },

    /// A host capability received input it cannot use
    InvalidInput { message: String },

    /// Reading the program or host input failed
    Io { message: String },
}

impl VmError {
    /// Shorthand for a [`VmError::MalformedProgram`] with a formatted message
    pub fn malformed(message: impl Into<String>) -> Self {
        VmError::MalformedProgram {
            message: message.into(),
        }
    }

    /// Whether the error was raised before execution started
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            VmError::MalformedProgram { .. } | VmError::UnknownOpcode { .. }
        )
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::MalformedProgram { message } => {
                write!(f, "Malformed program: {}", message)
            }
            VmError::UnknownOpcode { code, function } => {
                write!(f, "Unknown opcode {} in function {}", code, function)
            }
            VmError::DivisionByZero { operation } => {
                write!(f, "Division by zero in '{}'", operation)
            }
            VmError::StackUnderflow { sp } => {
                write!(f, "Stack underflow: sp {} is already at the top", sp)
            }
            VmError::StackOverflow { sp, heap_top } => {
                write!(
                    f,
                    "Stack overflow: sp {} collided with heap top {}",
                    sp, heap_top
                )
            }
            VmError::InvalidAddress { address } => {
                write!(f, "Invalid address {}", address)
            }
            VmError::UninitializedRead { address } => {
                write!(f, "Read from unset cell at address {}", address)
            }
            VmError::UnknownFunction { id } => {
                write!(f, "Call to undefined function {}", id)
            }
            VmError::UnknownHostCall { id } => {
                write!(f, "Call to unknown host capability {}", id)
            }
            VmError::HostContractViolation {
                id,
                name,
                expected,
                popped,
            } => {
                write!(
                    f,
                    "Host capability '{}' ({}) declared {} argument{} but popped {}",
                    name,
                    id,
                    expected,
                    if *expected == 1 { "" } else { "s" },
                    popped
                )
            }
            VmError::CallDepthExceeded { limit } => {
                write!(f, "Evaluation depth exceeded the limit of {}", limit)
            }
            VmError::OutOfMemory {
                requested,
                heap_top,
                sp,
            } => {
                write!(
                    f,
                    "Out of memory: alloc({}) from heap top {} would reach sp {}",
                    requested, heap_top, sp
                )
            }
            VmError::InvalidInput { message } => {
                write!(f, "Invalid input: {}", message)
            }
            VmError::Io { message } => {
                write!(f, "I/O error: {}", message)
            }
        }
    }
}

impl std::error::Error for VmError {}

impl From<std::io::Error> for VmError {
    fn from(err: std::io::Error) -> Self {
        VmError::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for VmError {
    fn from(err: serde_json::Error) -> Self {
        VmError::malformed(format!("invalid JSON: {}", err))
    }
}

/// Result alias used throughout the crate
pub type VmResult<T> = Result<T, VmError>;
