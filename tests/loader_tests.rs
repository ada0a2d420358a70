// Integration tests for loading programs from their JSON representation

use tvmtty::config::VmConfig;
use tvmtty::host::console::Console;
use tvmtty::host::stdlib::StandardHost;
use tvmtty::interpreter::{Vm, VmError};
use tvmtty::program::{load, load_file, parse_program, Instruction};

fn run_demo(path: &str, input: &[&str]) -> (i32, String) {
    let program = load_file(path).expect("Failed to load demo");
    let host = StandardHost::new(Console::scripted(input.iter().copied()));
    let mut vm = Vm::new(program, VmConfig::default(), host.capabilities(Some(1)))
        .expect("Failed to create VM");
    let result = vm.run().expect("Execution failed");
    (result, host.output())
}

#[test]
fn test_count_demo() {
    let (result, output) = run_demo("demos/count.json", &[]);
    assert_eq!(result, 0);
    assert_eq!(output, "1\n2\n3\n4\n5\n");
}

#[test]
fn test_factorial_demo() {
    let (_, output) = run_demo("demos/factorial.json", &[]);
    assert_eq!(output, "720\n");
}

#[test]
fn test_compact_records_and_legacy_ids() {
    let (_, output) = run_demo("demos/hello.json", &[]);
    assert_eq!(output, "Hello\n");
}

#[test]
fn test_greet_demo_reads_input() {
    let (_, output) = run_demo("demos/greet.json", &["Ada", "21"]);
    assert_eq!(output, "Ada\n42\n");
}

#[test]
fn test_loading_twice_gives_identical_state() {
    let program = load_file("demos/hello.json").expect("Failed to load demo");
    let config = VmConfig::default();
    let first = load(&program, &config).expect("Load failed");
    let second = load(&program, &config).expect("Load failed");
    assert_eq!(first.memory().cells(), second.memory().cells());
    assert_eq!(first.sp(), second.sp());
    assert_eq!(first.fp(), second.fp());
    assert_eq!(first.heap_top(), second.heap_top());
    assert_eq!(first.heap_top(), 6);
}

#[test]
fn test_named_functions_keep_their_names() {
    let program = load_file("demos/factorial.json").expect("Failed to load demo");
    assert_eq!(program.functions.len(), 2);
    assert_eq!(program.functions[1].label(), "fact");
    assert_eq!(program.functions[1].params, 1);
    assert!(matches!(
        program.functions[1].body.get(3),
        Some(Instruction::If { .. })
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    let err = load_file("demos/does-not-exist.json").unwrap_err();
    assert!(matches!(err, VmError::Io { .. }), "{:?}", err);
}

#[test]
fn test_malformed_programs_rejected() {
    let cases = [
        "{}",
        "[]",
        "[[0], []]",
        "[[0, 0], {}, [0, 0, []]]",
        "[[0, 0], [[1]], [0, 0, []]]",
        "[[0, 0], [], [0, 0]]",
        "[[0, 0], [], [0, 0, [1, 1.5]]]",
        "[[0, 0], [], [0, 0, [4, [1, 1]]]]",
        "[[0, 0], [], [0, 0, [5]]]",
        "[[0, 0], [], [0, 0, [8, 4294967296]]]",
        "[[-1, 0], [], [0, 0, []]]",
    ];
    for text in cases {
        let err = parse_program(text).unwrap_err();
        assert!(err.is_load_error(), "{} gave {:?}", text, err);
    }
}

#[test]
fn test_invalid_json_rejected() {
    let err = parse_program("[[0, 0], [],").unwrap_err();
    assert!(err.is_load_error(), "{:?}", err);
}

#[test]
fn test_unknown_opcode_in_nested_block() {
    let err = parse_program("[[0, 0], [], [0, 0, []], [1, 0, [5, [1, 1, 99]]]]").unwrap_err();
    assert_eq!(
        err,
        VmError::UnknownOpcode {
            code: 99,
            function: 1
        }
    );
}

#[test]
fn test_static_top_must_fit() {
    let program = parse_program("[[0, 64], [], [0, 0, []]]").expect("Parse failed");
    let config = VmConfig {
        memory_size: 64,
        ..VmConfig::default()
    };
    let err = Vm::new(program, config, Default::default()).unwrap_err();
    assert!(matches!(err, VmError::MalformedProgram { .. }), "{:?}", err);
}
