//! Bytecode loader and interpreter integration tests
//!
//! Module files are written to disk, loaded through the loader and run.

use bytecode_system::{
    disassemble, load_file, Constant, FunctionProto, Instruction, Module, Opcode,
};
use core_types::{ErrorKind, Value};
use integration_tests::{abc, halt, loadk};
use interpreter::{OutputBuffer, Vm, VmConfig};
use memory_manager::{GcConfig, Heap};
use std::fs;

fn square_module() -> Module {
    let mut module = Module::new(
        vec![Constant::String(b"square".to_vec()), Constant::Integer(9)],
        vec![
            loadk(0, 0),
            loadk(1, 1),
            abc(Opcode::Call, 2, 0, 1),
            abc(Opcode::Print, 2, 0, 0),
            halt(),
        ],
    );
    module.functions.push(FunctionProto {
        name_index: 0,
        arg_count: 1,
        reg_count: 2,
        code: vec![abc(Opcode::Mul, 1, 0, 0), abc(Opcode::Ret, 1, 0, 0)],
    });
    module
}

fn run(bytes: &[u8]) -> (Vm, OutputBuffer) {
    let out = OutputBuffer::new();
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(out.clone()));
    vm.load_bytes(bytes).expect("load failed");
    vm.run().expect("run failed");
    (vm, out)
}

/// Test: loading a file links constants and functions into the heap
#[test]
fn test_load_file_links_functions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("square.evm");
    fs::write(&path, square_module().to_bytes()).unwrap();

    let mut heap = Heap::new(GcConfig::default());
    let chunk = load_file(&path, &mut heap).unwrap();

    assert_eq!(chunk.instruction_count(), 5);
    assert_eq!(chunk.function_index("square"), Some(0));
    assert_eq!(chunk.functions[0].arity, 1);
    assert!(chunk.constants[0].as_object().is_some());
    assert_eq!(
        heap.string_bytes(chunk.constants[0].as_object().unwrap()),
        Some(&b"square"[..])
    );

    let listing = disassemble(&chunk, &heap);
    assert!(listing.starts_with("== main ==\n0000  LOADK r0, #0"));
    assert!(listing.contains("== square =="));
    assert!(listing.contains("MUL r1, r0, r0"));
}

/// Test: missing file reports Io with the path
#[test]
fn test_load_file_missing() {
    let mut heap = Heap::new(GcConfig::default());
    let err = load_file("/nonexistent/module.evm", &mut heap).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
    assert!(err.message.contains("/nonexistent/module.evm"));
}

/// Test: calling a module function by name
#[test]
fn test_call_function_from_module() {
    let (vm, out) = run(&square_module().to_bytes());
    assert_eq!(out.contents(), "81\n");
    assert_eq!(vm.register(2), Value::Integer(81));
}

/// Test: truncated module is rejected before anything runs
#[test]
fn test_truncated_module() {
    let bytes = square_module().to_bytes();
    for len in [0, 3, 8, bytes.len() - 1] {
        let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
        let err = vm.load_bytes(&bytes[..len]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MalformedModule, "length {}", len);
    }
}

/// Test: JMP_IF_NOT skips the "then" branch when the condition is zero
#[test]
fn test_conditional_program() {
    // if r0 { print 1 } else { print 2 }
    let program = |cond: i64| {
        Module::new(
            vec![
                Constant::Integer(cond),
                Constant::Integer(1),
                Constant::Integer(2),
            ],
            vec![
                loadk(0, 0),
                Instruction::jump(Opcode::JmpIfNot, 0, 3),
                loadk(1, 1),
                abc(Opcode::Print, 1, 0, 0),
                halt(),
                loadk(1, 2),
                abc(Opcode::Print, 1, 0, 0),
                halt(),
            ],
        )
        .to_bytes()
    };

    assert_eq!(run(&program(7)).1.contents(), "1\n");
    assert_eq!(run(&program(0)).1.contents(), "2\n");
}

/// Test: mixed integer and float arithmetic promotes to float
#[test]
fn test_mixed_arithmetic() {
    let module = Module::new(
        vec![Constant::Integer(3), Constant::Float(0.5)],
        vec![
            loadk(0, 0),
            loadk(1, 1),
            abc(Opcode::Mul, 2, 0, 1),
            abc(Opcode::Print, 2, 0, 0),
            abc(Opcode::Div, 3, 0, 1),
            abc(Opcode::Print, 3, 0, 0),
            halt(),
        ],
    );
    let (_, out) = run(&module.to_bytes());
    assert_eq!(out.contents(), "1.500000\n6.000000\n");
}

/// Test: LOADK past the pool is reported with its pc
#[test]
fn test_constant_out_of_range() {
    let module = Module::new(vec![Constant::Integer(1)], vec![loadk(0, 0), loadk(1, 4)]);
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    vm.load_bytes(&module.to_bytes()).unwrap();
    let err = vm.run().unwrap_err();
    assert_eq!(err.kind, ErrorKind::ConstantIndexOutOfRange);
    assert_eq!(err.pc, Some(1));
}
