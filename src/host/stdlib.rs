//! Standard capabilities
//!
//! | id   | name       | pops              | result                 |
//! |------|------------|-------------------|------------------------|
//! | -101 | iprint     | x                 | 0                      |
//! | -102 | sprint     | addr              | 0                      |
//! | -103 | iread      | prompt            | integer read           |
//! | -104 | sread      | buffer, prompt    | 0                      |
//! | -105 | nl         |                   | 0                      |
//! | -106 | random     | n                 | value in `0..n`        |
//! | -107 | timer      | delay, function   | timer handle           |
//! | -108 | stoptimer  | handle            | 0                      |
//! | -109 | alloc      | n                 | old heap pointer       |
//! | -110 | free       | addr              | 0                      |
//! | -111 | i2s        | buffer, n         | 0                      |
//! | -151 | getkeydown |                   | key code, -1 at end    |
//! | -152 | ilog       | x                 | 0                      |
//! | -153 | slog       | addr              | 0                      |
//! | -3   | iread      |                   | integer read           |
//! | -4   | sread      | buffer            | 0                      |
//!
//! A prompt argument of `-1` selects the default prompt; anything else is
//! the address of a prompt string.

use super::console::Console;
use super::timers::TimerQueue;
use super::CapabilityTable;
use crate::interpreter::errors::{VmError, VmResult};
use crate::memory::machine::Machine;
use crate::memory::Word;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cell::RefCell;
use std::rc::Rc;

pub const IPRINT: i32 = -101;
pub const SPRINT: i32 = -102;
pub const IREAD: i32 = -103;
pub const SREAD: i32 = -104;
pub const NL: i32 = -105;
pub const RANDOM: i32 = -106;
pub const TIMER: i32 = -107;
pub const STOPTIMER: i32 = -108;
pub const ALLOC: i32 = -109;
pub const FREE: i32 = -110;
pub const I2S: i32 = -111;
pub const GETKEYDOWN: i32 = -151;
pub const ILOG: i32 = -152;
pub const SLOG: i32 = -153;
pub const LEGACY_IREAD: i32 = -3;
pub const LEGACY_SREAD: i32 = -4;

/// Old call numbering and the id each now answers to
pub const LEGACY_ALIASES: [(i32, i32); 11] = [
    (-1, IPRINT),
    (-2, SPRINT),
    (-5, NL),
    (-10, RANDOM),
    (-11, TIMER),
    (-12, STOPTIMER),
    (-19, ALLOC),
    (-20, FREE),
    (-21, I2S),
    (-25, IREAD),
    (-26, SREAD),
];

const NO_PROMPT: Word = -1;

/// Devices shared between the standard capabilities and the embedder
#[derive(Debug, Clone)]
pub struct StandardHost {
    pub console: Rc<RefCell<Console>>,
    pub timers: Rc<RefCell<TimerQueue>>,
}

impl StandardHost {
    pub fn new(console: Console) -> Self {
        StandardHost {
            console: Rc::new(RefCell::new(console)),
            timers: Rc::new(RefCell::new(TimerQueue::new())),
        }
    }

    /// Everything the program printed so far
    pub fn output(&self) -> String {
        self.console.borrow().output().to_string()
    }

    /// A capability table with every standard capability and legacy alias
    pub fn capabilities(&self, seed: Option<u64>) -> CapabilityTable {
        let mut table = CapabilityTable::new();
        install(&mut table, self, seed);
        table
    }
}

fn prompt(machine: &Machine, address: Word, default: &str) -> VmResult<String> {
    if address == NO_PROMPT {
        Ok(default.to_string())
    } else {
        machine.read_string(address)
    }
}

fn read_into(
    console: &RefCell<Console>,
    machine: &mut Machine,
    buffer: Word,
    prompt: &str,
) -> VmResult<()> {
    let line = console
        .borrow_mut()
        .read_line(prompt)?
        .ok_or_else(|| VmError::InvalidInput {
            message: "end of input while reading a string".to_string(),
        })?;
    machine.write_string(buffer, &line)
}

pub fn install(table: &mut CapabilityTable, host: &StandardHost, seed: Option<u64>) {
    let console = Rc::clone(&host.console);
    table.register_fn(IPRINT, "iprint", 1, move |m| {
        let x = m.pop()?;
        console.borrow_mut().print(&x.to_string());
        Ok(0)
    });

    let console = Rc::clone(&host.console);
    table.register_fn(SPRINT, "sprint", 1, move |m| {
        let address = m.pop()?;
        let text = m.read_string(address)?;
        console.borrow_mut().print(&text);
        Ok(0)
    });

    let console = Rc::clone(&host.console);
    table.register_fn(IREAD, "iread", 1, move |m| {
        let address = m.pop()?;
        let text = prompt(m, address, "Integer input:")?;
        console.borrow_mut().read_int(&text)
    });

    let console = Rc::clone(&host.console);
    table.register_fn(SREAD, "sread", 2, move |m| {
        let buffer = m.pop()?;
        let address = m.pop()?;
        let text = prompt(m, address, "String input:")?;
        read_into(&console, m, buffer, &text)?;
        Ok(0)
    });

    let console = Rc::clone(&host.console);
    table.register_fn(NL, "nl", 0, move |_| {
        console.borrow_mut().print("\n");
        Ok(0)
    });

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    table.register_fn(RANDOM, "random", 1, move |m| {
        let n = m.pop()?;
        if n <= 0 {
            return Err(VmError::InvalidInput {
                message: format!("random bound must be positive, got {}", n),
            });
        }
        Ok(rng.gen_range(0..n))
    });

    let timers = Rc::clone(&host.timers);
    table.register_fn(TIMER, "timer", 2, move |m| {
        let delay = m.pop()?;
        let function = m.pop()?;
        Ok(timers.borrow_mut().schedule(delay, function))
    });

    let timers = Rc::clone(&host.timers);
    table.register_fn(STOPTIMER, "stoptimer", 1, move |m| {
        let handle = m.pop()?;
        timers.borrow_mut().cancel(handle);
        Ok(0)
    });

    table.register_fn(ALLOC, "alloc", 1, |m| {
        let size = m.pop()?;
        m.alloc(size)
    });

    table.register_fn(FREE, "free", 1, |m| {
        m.pop()?;
        Ok(0)
    });

    table.register_fn(I2S, "i2s", 2, |m| {
        let buffer = m.pop()?;
        let n = m.pop()?;
        m.write_string(buffer, &n.to_string())?;
        Ok(0)
    });

    let console = Rc::clone(&host.console);
    table.register_fn(GETKEYDOWN, "getkeydown", 0, move |_| {
        Ok(console.borrow_mut().next_key()?.unwrap_or(-1))
    });

    let console = Rc::clone(&host.console);
    table.register_fn(ILOG, "ilog", 1, move |m| {
        let x = m.pop()?;
        console.borrow_mut().log(x.to_string());
        Ok(0)
    });

    let console = Rc::clone(&host.console);
    table.register_fn(SLOG, "slog", 1, move |m| {
        let address = m.pop()?;
        let text = m.read_string(address)?;
        console.borrow_mut().log(text);
        Ok(0)
    });

    let console = Rc::clone(&host.console);
    table.register_fn(LEGACY_IREAD, "iread", 0, move |_| {
        console.borrow_mut().read_int("Integer input:")
    });

    let console = Rc::clone(&host.console);
    table.register_fn(LEGACY_SREAD, "sread", 1, move |m| {
        let buffer = m.pop()?;
        read_into(&console, m, buffer, "String input:")?;
        Ok(0)
    });

    for (legacy, id) in LEGACY_ALIASES {
        table.alias(legacy, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(input: &[&str]) -> (StandardHost, CapabilityTable, Machine) {
        let host = StandardHost::new(Console::scripted(input.iter().copied()));
        let table = host.capabilities(Some(7));
        let mut machine = Machine::new(256).unwrap();
        machine.set_heap_top(64).unwrap();
        (host, table, machine)
    }

    #[test]
    fn test_iprint_and_nl() {
        let (host, mut table, mut machine) = setup(&[]);
        machine.push(-42).unwrap();
        table.dispatch(IPRINT, &mut machine).unwrap();
        machine.pop().unwrap();
        table.dispatch(-5, &mut machine).unwrap();
        assert_eq!(host.output(), "-42\n");
    }

    #[test]
    fn test_sread_writes_terminated_string() {
        let (_host, mut table, mut machine) = setup(&["abc"]);
        machine.push(NO_PROMPT).unwrap();
        machine.push(10).unwrap();
        table.dispatch(SREAD, &mut machine).unwrap();
        assert_eq!(machine.read_string(10).unwrap(), "abc");
        assert_eq!(machine.memory().cell(13), Some(0));
    }

    #[test]
    fn test_i2s_writes_decimal() {
        let (_host, mut table, mut machine) = setup(&[]);
        machine.push(-305).unwrap();
        machine.push(20).unwrap();
        table.dispatch(-21, &mut machine).unwrap();
        assert_eq!(machine.read_string(20).unwrap(), "-305");
    }

    #[test]
    fn test_random_is_seeded_and_bounded() {
        let (_host, mut first, mut machine) = setup(&[]);
        let (_host2, mut second, _) = setup(&[]);
        let mut a = Vec::new();
        let mut b = Vec::new();
        for _ in 0..16 {
            machine.push(10).unwrap();
            a.push(first.dispatch(RANDOM, &mut machine).unwrap());
            machine.pop().unwrap();
            machine.push(10).unwrap();
            b.push(second.dispatch(RANDOM, &mut machine).unwrap());
            machine.pop().unwrap();
        }
        assert_eq!(a, b);
        assert!(a.iter().all(|v| (0..10).contains(v)));
    }

    #[test]
    fn test_alloc_returns_old_heap_top() {
        let (_host, mut table, mut machine) = setup(&[]);
        machine.push(5).unwrap();
        assert_eq!(table.dispatch(ALLOC, &mut machine), Ok(64));
        assert_eq!(machine.heap_top(), 69);
    }

    #[test]
    fn test_timer_schedules_and_cancels() {
        let (host, mut table, mut machine) = setup(&[]);
        machine.push(3).unwrap();
        machine.push(100).unwrap();
        let handle = table.dispatch(TIMER, &mut machine).unwrap();
        machine.pop().unwrap();
        assert_eq!(host.timers.borrow().len(), 1);
        machine.push(handle).unwrap();
        table.dispatch(STOPTIMER, &mut machine).unwrap();
        assert!(host.timers.borrow().is_empty());
    }

    #[test]
    fn test_legacy_iread_uses_default_prompt() {
        let (_host, mut table, mut machine) = setup(&["17"]);
        assert_eq!(table.dispatch(LEGACY_IREAD, &mut machine), Ok(17));
    }
}
