//! # Introduction
//!
//! tvmtty runs tree-structured bytecode on a small stack machine with a
//! single flat address space, records every step, and lets the recorded run
//! be navigated forward and backward through a terminal UI built with
//! [ratatui](https://docs.rs/ratatui).
//!
//! ## Execution pipeline
//!
//! ```text
//! JSON → Loader → Program → Vm (evaluator + call protocol + host) → History → TUI
//! ```
//!
//! 1. [`program`]: instruction set, nested blocks and the JSON loader.
//! 2. [`memory`]: the address space, `sp`/`fp`/heap registers and the
//!    observer hooks that report every mutation.
//! 3. [`interpreter`]: the [`Vm`](interpreter::Vm) context, nested block
//!    evaluation with [`Flow`](interpreter::Flow) signals, the call protocol
//!    and the scheduler abstraction.
//! 4. [`host`]: the Host Call Bridge and the standard capabilities (console
//!    I/O, random numbers, timers, allocation).
//! 5. [`snapshot`]: delta history and the replay cursor.
//! 6. [`ui`]: ratatui-based TUI; not part of the stable library API.
//!
//! ## Example
//!
//! ```
//! use tvmtty::config::VmConfig;
//! use tvmtty::host::CapabilityTable;
//! use tvmtty::interpreter::Vm;
//! use tvmtty::program::{Block, Opcode, Program};
//!
//! let program = Program::builder()
//!     .function(0, 0, Block::new().push(3).push(4).op(Opcode::Add).op(Opcode::Return))
//!     .build();
//! let mut vm = Vm::new(program, VmConfig::default(), CapabilityTable::new()).unwrap();
//! assert_eq!(vm.run().unwrap(), 7);
//! ```

pub mod config;
pub mod host;
pub mod interpreter;
pub mod memory;
pub mod program;
pub mod snapshot;
pub mod ui;
