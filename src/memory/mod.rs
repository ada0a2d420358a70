//! Memory model for the virtual machine
//!
//! This module provides the flat memory abstractions:
//! - [`address_space`]: the fixed-size array of integer cells
//! - [`machine`]: the address space together with `sp`, `fp` and the heap
//!   pointer, plus the push/pop discipline of the stack region
//! - [`observer`]: read-only notifications of every mutation
//!
//! # Layout
//!
//! ```text
//! 0 ........ static data ........ heap_top ....free.... sp ..... stack ..... capacity-1
//! ```
//!
//! The heap grows upward from the program's static data top; the stack grows
//! downward from the last cell. There is no type tagging: a cell holds an
//! `i32` that may be a number, an address, a code point or a boolean.

pub mod address_space;
pub mod machine;
pub mod observer;

/// Index of a cell in the address space
pub type Address = usize;

/// The value stored in a cell
pub type Word = i32;

/// A cell is either unset or holds one word
pub type Cell = Option<Word>;

/// Default number of cells in the address space
pub const DEFAULT_CAPACITY: usize = 65536;
