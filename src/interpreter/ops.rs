//! Arithmetic, bitwise and comparison operators
//!
//! All arithmetic wraps at 32 bits. Division rounds toward negative
//! infinity and modulo takes the sign of the divisor, so
//! `x == y * div(x, y) + rem(x, y)` holds for every non-zero `y`.

use super::errors::{VmError, VmResult};
use crate::memory::Word;
use crate::program::BinaryOp;

impl BinaryOp {
    /// Apply the operator to `x` (deeper on the stack) and `y` (top)
    pub fn apply(self, x: Word, y: Word) -> VmResult<Word> {
        let result = match self {
            BinaryOp::Add => x.wrapping_add(y),
            BinaryOp::Sub => x.wrapping_sub(y),
            BinaryOp::Mul => x.wrapping_mul(y),
            BinaryOp::Div => floor_div(x, y)?,
            BinaryOp::Mod => floor_mod(x, y)?,
            BinaryOp::And => x & y,
            BinaryOp::Or => x | y,
            BinaryOp::Xor => x ^ y,
            BinaryOp::Eq => (x == y) as Word,
            BinaryOp::Neq => (x != y) as Word,
            BinaryOp::Lt => (x < y) as Word,
            BinaryOp::Leq => (x <= y) as Word,
            BinaryOp::Gt => (x > y) as Word,
            BinaryOp::Geq => (x >= y) as Word,
            // The shift amount is masked to 0..32
            BinaryOp::LShift => x.wrapping_shl(y as u32),
            BinaryOp::RShift => x.wrapping_shr(y as u32),
        };
        Ok(result)
    }
}

/// Bitwise complement
pub fn not(x: Word) -> Word {
    !x
}

fn floor_div(x: Word, y: Word) -> VmResult<Word> {
    if y == 0 {
        return Err(VmError::DivisionByZero { operation: "div" });
    }
    let q = x.wrapping_div(y);
    if x.wrapping_rem(y) != 0 && ((x < 0) != (y < 0)) {
        Ok(q.wrapping_sub(1))
    } else {
        Ok(q)
    }
}

fn floor_mod(x: Word, y: Word) -> VmResult<Word> {
    if y == 0 {
        return Err(VmError::DivisionByZero { operation: "mod" });
    }
    let r = x.wrapping_rem(y);
    if r != 0 && ((r < 0) != (y < 0)) {
        Ok(r + y)
    } else {
        Ok(r)
    }
}
