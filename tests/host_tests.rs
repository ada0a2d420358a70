// Integration tests for the Host Call Bridge and the standard capabilities

use std::time::Duration;
use tvmtty::config::VmConfig;
use tvmtty::host::console::{Console, ENTER_KEY};
use tvmtty::host::stdlib::{self, StandardHost};
use tvmtty::host::timers;
use tvmtty::host::CapabilityTable;
use tvmtty::interpreter::scheduler::Paced;
use tvmtty::interpreter::{Vm, VmError, VmResult};
use tvmtty::memory::Word;
use tvmtty::program::{load_file, Block, Opcode, Program};

struct Harness {
    host: StandardHost,
    vm: Vm,
}

impl Harness {
    fn new(program: Program, input: &[&str], config: VmConfig) -> Self {
        let host = StandardHost::new(Console::scripted(input.iter().copied()));
        let capabilities = host.capabilities(config.seed.or(Some(3)));
        let vm = Vm::new(program, config, capabilities).expect("Failed to create VM");
        Harness { host, vm }
    }

    fn main(static_top: usize, body: Block) -> Self {
        let program = Program::builder()
            .static_top(static_top)
            .function(0, 0, body)
            .build();
        Harness::new(program, &[], VmConfig::default())
    }

    fn run(&mut self) -> VmResult<Word> {
        self.vm.run()
    }

    fn output(&self) -> String {
        self.host.output()
    }
}

#[test]
fn test_iprint_pushes_zero() {
    let mut h = Harness::main(0, Block::new().push(-12).call(stdlib::IPRINT).op(Opcode::Return));
    assert_eq!(h.run().expect("Execution failed"), 0);
    assert_eq!(h.output(), "-12");
}

#[test]
fn test_legacy_ids_reach_the_same_capability() {
    let mut h = Harness::main(
        0,
        Block::new()
            .push(1)
            .call(-1)
            .op(Opcode::Pop)
            .call(-5)
            .op(Opcode::Pop)
            .push(2)
            .call(stdlib::IPRINT)
            .op(Opcode::Return),
    );
    h.run().expect("Execution failed");
    assert_eq!(h.output(), "1\n2");
}

#[test]
fn test_i2s_then_sprint() {
    let mut h = Harness::main(
        16,
        Block::new()
            .push(-305)
            .push(0)
            .call(stdlib::I2S)
            .op(Opcode::Pop)
            .push(0)
            .call(stdlib::SPRINT)
            .op(Opcode::Return),
    );
    h.run().expect("Execution failed");
    assert_eq!(h.output(), "-305");
    assert_eq!(h.vm.machine().memory().cell(4), Some(0));
}

#[test]
fn test_iread_uses_scripted_input() {
    let program = Program::builder()
        .function(
            0,
            0,
            Block::new()
                .push(-1)
                .call(stdlib::IREAD)
                .call(stdlib::LEGACY_IREAD)
                .op(Opcode::Add)
                .op(Opcode::Return),
        )
        .build();
    let mut h = Harness::new(program, &["40", " 2 "], VmConfig::default());
    assert_eq!(h.run().expect("Execution failed"), 42);
}

#[test]
fn test_iread_at_end_of_input() {
    let mut h = Harness::main(0, Block::new().call(stdlib::LEGACY_IREAD));
    let err = h.run().unwrap_err();
    assert!(matches!(err, VmError::InvalidInput { .. }), "{:?}", err);
}

#[test]
fn test_iread_rejects_non_numbers() {
    let program = Program::builder()
        .function(0, 0, Block::new().call(stdlib::LEGACY_IREAD))
        .build();
    let mut h = Harness::new(program, &["seven"], VmConfig::default());
    let err = h.run().unwrap_err();
    assert!(matches!(err, VmError::InvalidInput { .. }), "{:?}", err);
}

#[test]
fn test_iread_rejects_trailing_text() {
    let program = Program::builder()
        .function(0, 0, Block::new().call(stdlib::LEGACY_IREAD))
        .build();
    let mut h = Harness::new(program, &["12abc"], VmConfig::default());
    let err = h.run().unwrap_err();
    assert!(matches!(err, VmError::InvalidInput { .. }), "{:?}", err);
}

#[test]
fn test_getkeydown_yields_characters_then_enter() {
    let key = Block::new().call(stdlib::GETKEYDOWN);
    let program = Program::builder()
        .function(0, 0, Block::new().push(0))
        .function(0, 0, key)
        .build();
    let mut h = Harness::new(program, &["ab"], VmConfig::default());
    let keys: Vec<Word> = (0..4)
        .map(|_| h.vm.invoke(1, &[]).expect("Invoke failed"))
        .collect();
    assert_eq!(keys, vec!['a' as Word, 'b' as Word, ENTER_KEY, -1]);
}

#[test]
fn test_log_capabilities_bypass_output() {
    let mut h = Harness::main(
        0,
        Block::new()
            .push(7)
            .call(stdlib::ILOG)
            .op(Opcode::Return),
    );
    h.run().expect("Execution failed");
    assert_eq!(h.output(), "");
    assert_eq!(h.host.console.borrow().log_lines(), &["7".to_string()]);
}

#[test]
fn test_alloc_bumps_heap_pointer() {
    let mut h = Harness::main(
        10,
        Block::new()
            .push(4)
            .call(stdlib::ALLOC)
            .op(Opcode::Pop)
            .push(1)
            .call(stdlib::ALLOC)
            .op(Opcode::Return),
    );
    assert_eq!(h.run().expect("Execution failed"), 14);
    assert_eq!(h.vm.machine().heap_top(), 15);
}

#[test]
fn test_alloc_into_the_stack_fails() {
    let mut h = Harness::main(
        10,
        Block::new().push(i32::MAX).call(stdlib::ALLOC),
    );
    let err = h.run().unwrap_err();
    assert!(matches!(err, VmError::OutOfMemory { .. }), "{:?}", err);
}

#[test]
fn test_random_is_reproducible_with_seed() {
    let draw = |seed| {
        let body = Block::new()
            .push(1000)
            .call(stdlib::RANDOM)
            .push(1000)
            .call(stdlib::RANDOM)
            .push(1000)
            .op(Opcode::Mul)
            .op(Opcode::Add)
            .op(Opcode::Return);
        let config = VmConfig {
            seed: Some(seed),
            ..VmConfig::default()
        };
        let mut h = Harness::new(Program::builder().function(0, 0, body).build(), &[], config);
        h.run().expect("Execution failed")
    };
    let first = draw(99);
    assert_eq!(first, draw(99));
    assert!((0..1_000_000).contains(&first));
}

#[test]
fn test_random_rejects_empty_range() {
    let mut h = Harness::main(0, Block::new().push(0).call(stdlib::RANDOM));
    let err = h.run().unwrap_err();
    assert!(matches!(err, VmError::InvalidInput { .. }), "{:?}", err);
}

#[test]
fn test_unknown_host_call_is_fatal_by_default() {
    let mut h = Harness::main(0, Block::new().call(-999));
    assert_eq!(h.run().unwrap_err(), VmError::UnknownHostCall { id: -999 });
}

#[test]
fn test_unknown_host_call_pushes_zero_when_lenient() {
    let program = Program::builder()
        .function(0, 0, Block::new().push(5).call(-999).op(Opcode::Add))
        .build();
    let config = VmConfig {
        lenient_host_calls: true,
        ..VmConfig::default()
    };
    let mut h = Harness::new(program, &[], config);
    assert_eq!(h.run().expect("Execution failed"), 5);
}

#[test]
fn test_capability_must_pop_its_arity() {
    let mut table = CapabilityTable::new();
    table.register_fn(-7, "sloppy", 2, |m| {
        m.pop()?;
        Ok(1)
    });
    let program = Program::builder()
        .function(0, 0, Block::new().push(1).push(2).call(-7))
        .build();
    let mut vm = Vm::new(program, VmConfig::default(), table).expect("Failed to create VM");
    assert_eq!(
        vm.run().unwrap_err(),
        VmError::HostContractViolation {
            id: -7,
            name: "sloppy",
            expected: 2,
            popped: 1,
        }
    );
}

#[test]
fn test_invoke_reaches_host() {
    let mut h = Harness::main(0, Block::new().push(0));
    let sp = h.vm.machine().sp();
    assert_eq!(h.vm.invoke(stdlib::IPRINT, &[5]).expect("Invoke failed"), 0);
    assert_eq!(h.vm.machine().sp(), sp);
    assert_eq!(h.output(), "5");
}

#[test]
fn test_timers_fire_after_run_in_due_order() {
    let program = load_file("demos/timer.json").expect("Failed to load demo");
    let mut h = Harness::new(program, &[], VmConfig::default());
    h.run().expect("Execution failed");
    assert_eq!(h.output(), "");
    assert_eq!(h.host.timers.borrow().len(), 2);

    let fired = timers::drain(&mut h.vm, &h.host.timers, 10).expect("Drain failed");
    assert_eq!(fired, 2);
    assert_eq!(h.output(), "1\n2\n");
    assert_eq!(h.host.timers.borrow().now(), 100);
}

#[test]
fn test_stoptimer_cancels() {
    let body = Block::new()
        .push(1)
        .push(10)
        .call(stdlib::TIMER)
        .call(stdlib::STOPTIMER)
        .op(Opcode::Return);
    let program = Program::builder()
        .function(0, 0, body)
        .function(0, 0, Block::new().push(1).call(stdlib::IPRINT))
        .build();
    let mut h = Harness::new(program, &[], VmConfig::default());
    h.run().expect("Execution failed");
    let fired = timers::drain(&mut h.vm, &h.host.timers, 10).expect("Drain failed");
    assert_eq!(fired, 0);
    assert_eq!(h.output(), "");
}

#[test]
fn test_rescheduling_timer_stops_at_budget() {
    // tick re-arms itself every time it fires
    let tick = Block::new()
        .push(1)
        .push(5)
        .call(stdlib::TIMER)
        .op(Opcode::Pop)
        .push(1)
        .call(stdlib::IPRINT);
    let program = Program::builder()
        .function(0, 0, Block::new().push(1).push(0).call(stdlib::TIMER))
        .function(0, 0, tick)
        .build();
    let mut h = Harness::new(program, &[], VmConfig::default());
    h.run().expect("Execution failed");
    let fired = timers::drain(&mut h.vm, &h.host.timers, 3).expect("Drain failed");
    assert_eq!(fired, 3);
    assert_eq!(h.output(), "111");
    // the re-armed fourth tick is dropped, not left queued
    assert_eq!(h.host.timers.borrow().len(), 0);
}

#[test]
fn test_paced_scheduler_does_not_change_results() {
    let program = load_file("demos/count.json").expect("Failed to load demo");
    let mut h = Harness::new(program, &[], VmConfig::default());
    h.vm
        .set_scheduler(Box::new(Paced::new(Duration::from_micros(1))));
    h.run().expect("Execution failed");
    assert_eq!(h.output(), "1\n2\n3\n4\n5\n");
}
