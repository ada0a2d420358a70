//! Tree bytecode execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: the [`Vm`] context, program entry and host invocation
//! - [`evaluator`]: nested block evaluation and [`Flow`] signals
//! - [`calls`]: frame setup and teardown for function calls, host dispatch
//! - [`ops`]: arithmetic, bitwise and comparison operators
//! - [`scheduler`]: suspension policy between steps
//! - [`errors`]: runtime error types
//!
//! # Execution Model
//!
//! Blocks nest. `if`, `loop` and calls enter their sub-blocks through the
//! same activation stack as function bodies, so `break` and `return`
//! unwind as values rather than through jump targets. That stack lives on
//! the heap, so `max_depth` is the only bound on nesting. Every step
//! is announced to the machine's observer before it mutates anything.

pub mod calls;
pub mod engine;
pub mod errors;
pub mod evaluator;
pub mod ops;
pub mod scheduler;

pub use engine::Vm;
pub use errors::{VmError, VmResult};
pub use evaluator::Flow;
