//! Program loader
//!
//! Parses the JSON program representation into a [`Program`] and seeds a
//! fresh [`Machine`] with its static data.
//!
//! ```text
//! [ [entry, static_top], [[address, value], ...], function, function, ... ]
//! function := [id, name, params, locals, block] | [params, locals, block]
//! block    := [opcode, operand?, opcode, ...]
//! ```
//!
//! Blocks are flat: `push` and `call` are followed by one integer, `if` by
//! two nested blocks and `loop` by one. Everything is validated up front so
//! the evaluator never meets an unknown opcode or a missing operand.

use super::instruction::{Block, Instruction, Opcode};
use super::{Function, Program};
use crate::config::VmConfig;
use crate::interpreter::errors::{VmError, VmResult};
use crate::memory::machine::Machine;
use crate::memory::{Address, Word};
use serde_json::Value;
use std::path::Path;
use tracing::info;

/// Read and parse a program file
pub fn load_file(path: impl AsRef<Path>) -> VmResult<Program> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| VmError::Io {
        message: format!("{}: {}", path.display(), e),
    })?;
    parse_program(&text)
}

/// Parse and validate a program representation
pub fn parse_program(text: &str) -> VmResult<Program> {
    let root: Value = serde_json::from_str(text)?;
    let sections = root
        .as_array()
        .ok_or_else(|| VmError::malformed("program must be an array"))?;
    if sections.len() < 2 {
        return Err(VmError::malformed(
            "program needs an entry descriptor and a static data section",
        ));
    }

    let descriptor = expect_array(&sections[0], "entry descriptor")?;
    if descriptor.len() != 2 {
        return Err(VmError::malformed(format!(
            "entry descriptor has {} elements, expected 2",
            descriptor.len()
        )));
    }
    let entry = expect_index(&descriptor[0], "entry function index")?;
    let static_top = expect_index(&descriptor[1], "static data top")?;

    let mut statics = Vec::new();
    for (i, init) in expect_array(&sections[1], "static data")?.iter().enumerate() {
        let pair = expect_array(init, "static initializer")?;
        if pair.len() != 2 {
            return Err(VmError::malformed(format!(
                "static initializer {} has {} elements, expected 2",
                i,
                pair.len()
            )));
        }
        let address = expect_index(&pair[0], "static address")?;
        let value = expect_word(&pair[1], "static value")?;
        statics.push((address, value));
    }

    let mut functions = Vec::with_capacity(sections.len() - 2);
    for (index, record) in sections[2..].iter().enumerate() {
        functions.push(parse_function(index, record)?);
    }

    if entry >= functions.len() {
        return Err(VmError::malformed(format!(
            "entry function {} is outside the function table ({} functions)",
            entry,
            functions.len()
        )));
    }

    Ok(Program {
        entry,
        static_top,
        statics,
        functions,
    })
}

fn parse_function(index: usize, record: &Value) -> VmResult<Function> {
    let fields = expect_array(record, "function")?;
    let (name, params, locals, body) = match fields.len() {
        5 => {
            let name = match &fields[1] {
                Value::String(s) => Some(s.clone()),
                Value::Null => None,
                other => Some(other.to_string()),
            };
            (name, &fields[2], &fields[3], &fields[4])
        }
        3 => (None, &fields[0], &fields[1], &fields[2]),
        n => {
            return Err(VmError::malformed(format!(
                "function {} has {} fields, expected 5 or 3",
                index, n
            )))
        }
    };
    let params = expect_index(params, "parameter count")?;
    let locals = expect_index(locals, "local count")?;
    let body = parse_block(index, body)?;
    Ok(Function {
        index,
        name,
        params,
        locals,
        body,
    })
}

fn parse_block(function: usize, value: &Value) -> VmResult<Block> {
    let items = expect_array(value, "block")?;
    let mut instructions = Vec::new();
    let mut pc = 0;
    while pc < items.len() {
        let code = items[pc].as_i64().ok_or_else(|| {
            VmError::malformed(format!("function {}: opcode must be an integer", function))
        })?;
        let op = Opcode::from_code(code).ok_or(VmError::UnknownOpcode { code, function })?;
        pc += 1;
        let instruction = match op {
            Opcode::Push => {
                let literal = operand(items, &mut pc, function, op, "literal")?;
                Instruction::Push(expect_word(literal, "push literal")?)
            }
            Opcode::Call => {
                let id = operand(items, &mut pc, function, op, "call id")?;
                Instruction::Call(expect_word(id, "call id")?)
            }
            Opcode::If => {
                let then_block = operand(items, &mut pc, function, op, "then block")?;
                let else_block = operand(items, &mut pc, function, op, "else block")?;
                Instruction::If {
                    then_block: parse_block(function, then_block)?,
                    else_block: parse_block(function, else_block)?,
                }
            }
            Opcode::Loop => {
                let body = operand(items, &mut pc, function, op, "body")?;
                Instruction::Loop(parse_block(function, body)?)
            }
            simple => {
                Instruction::simple(simple).ok_or(VmError::UnknownOpcode { code, function })?
            }
        };
        instructions.push(instruction);
    }
    Ok(instructions.into_iter().collect())
}

/// Take the operand at `pc` and step past it
fn operand<'a>(
    items: &'a [Value],
    pc: &mut usize,
    function: usize,
    op: Opcode,
    what: &str,
) -> VmResult<&'a Value> {
    let value = items.get(*pc).ok_or_else(|| {
        VmError::malformed(format!(
            "function {}: '{}' is missing its {}",
            function, op, what
        ))
    })?;
    *pc += 1;
    Ok(value)
}

fn expect_array<'a>(value: &'a Value, what: &str) -> VmResult<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| VmError::malformed(format!("{} must be an array", what)))
}

fn expect_word(value: &Value, what: &str) -> VmResult<Word> {
    value
        .as_i64()
        .and_then(|n| Word::try_from(n).ok())
        .ok_or_else(|| {
            VmError::malformed(format!("{} must be a 32-bit integer, got {}", what, value))
        })
}

fn expect_index(value: &Value, what: &str) -> VmResult<usize> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            VmError::malformed(format!(
                "{} must be a non-negative integer, got {}",
                what, value
            ))
        })
}

/// Build the initial machine for `program`
///
/// Static data is written without notifying observers, `sp` and `fp` start
/// at the last cell and the heap pointer at the static data top.
pub fn load(program: &Program, config: &VmConfig) -> VmResult<Machine> {
    let mut machine = Machine::new(config.memory_size)?;
    let capacity = machine.capacity();
    if program.static_top >= capacity {
        return Err(VmError::malformed(format!(
            "static data top {} does not fit in {} cells",
            program.static_top, capacity
        )));
    }
    for &(address, value) in &program.statics {
        if address >= capacity {
            return Err(VmError::malformed(format!(
                "static initializer at {} is outside the address space",
                address
            )));
        }
        machine.seed(address as Address, value)?;
    }
    machine.set_heap_top(program.static_top)?;
    info!(
        functions = program.functions.len(),
        statics = program.statics.len(),
        static_top = program.static_top,
        capacity,
        "program loaded"
    );
    Ok(machine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::BinaryOp;

    #[test]
    fn test_parse_named_layout() {
        let program =
            parse_program(r#"[[0, 4], [[0, 72], [1, 0]], [0, "main", 0, 1, [1, 3, 1, 4, 10, 7]]]"#)
                .unwrap();
        assert_eq!(program.entry, 0);
        assert_eq!(program.static_top, 4);
        assert_eq!(program.statics, vec![(0, 72), (1, 0)]);
        let main = &program.functions[0];
        assert_eq!(main.name.as_deref(), Some("main"));
        assert_eq!(main.locals, 1);
        assert_eq!(
            main.body.instructions(),
            &[
                Instruction::Push(3),
                Instruction::Push(4),
                Instruction::Binary(BinaryOp::Add),
                Instruction::Return,
            ]
        );
    }

    #[test]
    fn test_parse_nested_blocks() {
        let program = parse_program("[[0, 0], [], [0, 0, [1, 0, 4, [1, 1], [1, 2], 5, [1, 1, 6]]]]").unwrap();
        let body = &program.functions[0].body;
        assert_eq!(body.len(), 3);
        assert!(matches!(body.get(1), Some(Instruction::If { .. })));
        assert!(matches!(body.get(2), Some(Instruction::Loop(inner)) if inner.len() == 2));
    }

    #[test]
    fn test_unknown_opcode_rejected_at_load() {
        let err = parse_program("[[0, 0], [], [0, 0, [1, 1, 28]]]").unwrap_err();
        assert_eq!(err, VmError::UnknownOpcode { code: 28, function: 0 });
    }

    #[test]
    fn test_missing_operand_rejected() {
        let err = parse_program("[[0, 0], [], [0, 0, [1]]]").unwrap_err();
        assert!(matches!(err, VmError::MalformedProgram { .. }));
    }

    #[test]
    fn test_entry_outside_table_rejected() {
        let err = parse_program("[[2, 0], [], [0, 0, []]]").unwrap_err();
        assert!(matches!(err, VmError::MalformedProgram { .. }));
    }

    #[test]
    fn test_load_seeds_statics_and_heap() {
        let program = parse_program("[[0, 3], [[0, 7], [2, 9]], [0, 0, []]]").unwrap();
        let machine = load(&program, &VmConfig::default()).unwrap();
        assert_eq!(machine.memory().cell(0), Some(7));
        assert_eq!(machine.memory().cell(1), None);
        assert_eq!(machine.heap_top(), 3);
        assert_eq!(machine.sp(), machine.capacity() - 1);
        assert_eq!(machine.fp(), machine.capacity() - 1);
    }

    #[test]
    fn test_load_rejects_out_of_range_static() {
        let program = parse_program("[[0, 0], [[99, 1]], [0, 0, []]]").unwrap();
        let config = VmConfig {
            memory_size: 32,
            ..VmConfig::default()
        };
        assert!(matches!(load(&program, &config), Err(VmError::MalformedProgram { .. })));
    }
}
