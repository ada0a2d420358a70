//! Instruction set
//!
//! Instructions are tagged variants. Control constructs carry their nested
//! blocks as operands instead of jump offsets, so a [`Block`] mirrors the
//! structure of the source program it was compiled from.

use crate::memory::Word;
use std::fmt;

/// Numeric instruction codes as they appear in the program representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Push = 1,
    Fetch = 2,
    Store = 3,
    If = 4,
    Loop = 5,
    Break = 6,
    Return = 7,
    Call = 8,
    FpPlus = 9,
    Add = 10,
    Sub = 11,
    Mul = 12,
    Div = 13,
    Mod = 14,
    Not = 15,
    And = 16,
    Or = 17,
    Xor = 18,
    Eq = 19,
    Neq = 20,
    Lt = 21,
    Leq = 22,
    Gt = 23,
    Geq = 24,
    Pop = 25,
    LShift = 26,
    RShift = 27,
    Debug = 29,
}

impl Opcode {
    pub fn from_code(code: i64) -> Option<Self> {
        let op = match code {
            1 => Opcode::Push,
            2 => Opcode::Fetch,
            3 => Opcode::Store,
            4 => Opcode::If,
            5 => Opcode::Loop,
            6 => Opcode::Break,
            7 => Opcode::Return,
            8 => Opcode::Call,
            9 => Opcode::FpPlus,
            10 => Opcode::Add,
            11 => Opcode::Sub,
            12 => Opcode::Mul,
            13 => Opcode::Div,
            14 => Opcode::Mod,
            15 => Opcode::Not,
            16 => Opcode::And,
            17 => Opcode::Or,
            18 => Opcode::Xor,
            19 => Opcode::Eq,
            20 => Opcode::Neq,
            21 => Opcode::Lt,
            22 => Opcode::Leq,
            23 => Opcode::Gt,
            24 => Opcode::Geq,
            25 => Opcode::Pop,
            26 => Opcode::LShift,
            27 => Opcode::RShift,
            29 => Opcode::Debug,
            _ => return None,
        };
        Some(op)
    }

    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Push => "push",
            Opcode::Fetch => "fetch",
            Opcode::Store => "store",
            Opcode::If => "if",
            Opcode::Loop => "loop",
            Opcode::Break => "break",
            Opcode::Return => "return",
            Opcode::Call => "call",
            Opcode::FpPlus => "fp+",
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Not => "not",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Eq => "eq",
            Opcode::Neq => "neq",
            Opcode::Lt => "lt",
            Opcode::Leq => "leq",
            Opcode::Gt => "gt",
            Opcode::Geq => "geq",
            Opcode::Pop => "pop",
            Opcode::LShift => "lshift",
            Opcode::RShift => "rshift",
            Opcode::Debug => "debug",
        }
    }

    /// The two-operand operator for this opcode, if it is one
    pub fn binary(self) -> Option<BinaryOp> {
        let op = match self {
            Opcode::Add => BinaryOp::Add,
            Opcode::Sub => BinaryOp::Sub,
            Opcode::Mul => BinaryOp::Mul,
            Opcode::Div => BinaryOp::Div,
            Opcode::Mod => BinaryOp::Mod,
            Opcode::And => BinaryOp::And,
            Opcode::Or => BinaryOp::Or,
            Opcode::Xor => BinaryOp::Xor,
            Opcode::Eq => BinaryOp::Eq,
            Opcode::Neq => BinaryOp::Neq,
            Opcode::Lt => BinaryOp::Lt,
            Opcode::Leq => BinaryOp::Leq,
            Opcode::Gt => BinaryOp::Gt,
            Opcode::Geq => BinaryOp::Geq,
            Opcode::LShift => BinaryOp::LShift,
            Opcode::RShift => BinaryOp::RShift,
            _ => return None,
        };
        Some(op)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Operators that pop `x` (deeper) and `y` (top) and push one result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    And,
    Or,
    Xor,
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    LShift,
    RShift,
}

impl BinaryOp {
    pub fn opcode(self) -> Opcode {
        match self {
            BinaryOp::Add => Opcode::Add,
            BinaryOp::Sub => Opcode::Sub,
            BinaryOp::Mul => Opcode::Mul,
            BinaryOp::Div => Opcode::Div,
            BinaryOp::Mod => Opcode::Mod,
            BinaryOp::And => Opcode::And,
            BinaryOp::Or => Opcode::Or,
            BinaryOp::Xor => Opcode::Xor,
            BinaryOp::Eq => Opcode::Eq,
            BinaryOp::Neq => Opcode::Neq,
            BinaryOp::Lt => Opcode::Lt,
            BinaryOp::Leq => Opcode::Leq,
            BinaryOp::Gt => Opcode::Gt,
            BinaryOp::Geq => Opcode::Geq,
            BinaryOp::LShift => Opcode::LShift,
            BinaryOp::RShift => Opcode::RShift,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Push(Word),
    Fetch,
    Store,
    If { then_block: Block, else_block: Block },
    Loop(Block),
    Break,
    Return,
    Call(i32),
    FpPlus,
    Not,
    Binary(BinaryOp),
    Pop,
    Debug,
}

impl Instruction {
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Push(_) => Opcode::Push,
            Instruction::Fetch => Opcode::Fetch,
            Instruction::Store => Opcode::Store,
            Instruction::If { .. } => Opcode::If,
            Instruction::Loop(_) => Opcode::Loop,
            Instruction::Break => Opcode::Break,
            Instruction::Return => Opcode::Return,
            Instruction::Call(_) => Opcode::Call,
            Instruction::FpPlus => Opcode::FpPlus,
            Instruction::Not => Opcode::Not,
            Instruction::Binary(op) => op.opcode(),
            Instruction::Pop => Opcode::Pop,
            Instruction::Debug => Opcode::Debug,
        }
    }

    /// Build the operand-less instruction for `op`
    ///
    /// Returns `None` for opcodes that need an operand (`push`, `call`, `if`, `loop`).
    pub fn simple(op: Opcode) -> Option<Self> {
        if let Some(binary) = op.binary() {
            return Some(Instruction::Binary(binary));
        }
        let instruction = match op {
            Opcode::Fetch => Instruction::Fetch,
            Opcode::Store => Instruction::Store,
            Opcode::Break => Instruction::Break,
            Opcode::Return => Instruction::Return,
            Opcode::FpPlus => Instruction::FpPlus,
            Opcode::Not => Instruction::Not,
            Opcode::Pop => Instruction::Pop,
            Opcode::Debug => Instruction::Debug,
            _ => return None,
        };
        Some(instruction)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Push(value) => write!(f, "push {}", value),
            Instruction::Call(id) => write!(f, "call {}", id),
            Instruction::If {
                then_block,
                else_block,
            } => write!(
                f,
                "if [{} instr] [{} instr]",
                then_block.len(),
                else_block.len()
            ),
            Instruction::Loop(body) => write!(f, "loop [{} instr]", body.len()),
            other => f.write_str(other.opcode().mnemonic()),
        }
    }
}

/// An ordered sequence of instructions
///
/// The `push`-style methods make hand-written programs readable:
///
/// ```
/// use tvmtty::program::{Block, Opcode};
///
/// let block = Block::new()
///     .push(0)
///     .if_else(Block::new().push(1), Block::new().push(2));
/// assert_eq!(block.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Block {
    instructions: Vec<Instruction>,
}

impl Block {
    pub fn new() -> Self {
        Block::default()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instruction(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn push(self, value: Word) -> Self {
        self.instruction(Instruction::Push(value))
    }

    pub fn call(self, id: i32) -> Self {
        self.instruction(Instruction::Call(id))
    }

    /// Append an operand-less opcode
    ///
    /// # Panics
    ///
    /// Panics if `opcode` requires an operand; use [`Block::push`],
    /// [`Block::call`], [`Block::if_else`] or [`Block::looped`] for those.
    pub fn op(self, opcode: Opcode) -> Self {
        let instruction = Instruction::simple(opcode)
            .unwrap_or_else(|| panic!("opcode '{}' needs an operand", opcode));
        self.instruction(instruction)
    }

    pub fn if_else(self, then_block: Block, else_block: Block) -> Self {
        self.instruction(Instruction::If {
            then_block,
            else_block,
        })
    }

    pub fn looped(self, body: Block) -> Self {
        self.instruction(Instruction::Loop(body))
    }

    /// Push the address of frame slot `offset` (`push offset; fp+`)
    pub fn slot(self, offset: Word) -> Self {
        self.push(offset).op(Opcode::FpPlus)
    }

    /// Push the value of frame slot `offset`
    pub fn load(self, offset: Word) -> Self {
        self.slot(offset).op(Opcode::Fetch)
    }

    /// Pop a value into frame slot `offset`
    pub fn store_to(self, offset: Word) -> Self {
        self.slot(offset).op(Opcode::Store)
    }
}

impl FromIterator<Instruction> for Block {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Block {
            instructions: iter.into_iter().collect(),
        }
    }
}
