//! Contract tests for interpreter API
//!
//! These tests pin the public surface other components rely on: the JIT
//! tier drives the VM through registers and `run`, and the CLI through
//! loading and output redirection.

use bytecode_system::{Chunk, Instruction, Module, Opcode};
use core_types::{ErrorKind, Value, VmResult, REGISTER_COUNT};
use interpreter::{OutputBuffer, Vm, VmConfig};

/// Test Vm::with_output() sends PRINT to the given sink
#[test]
fn test_with_output_contract() {
    let out = OutputBuffer::new();
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(out.clone()));
    vm.set_register(0, Value::Integer(1));
    vm.interpret(Chunk::with_code(
        vec![Instruction::abc(Opcode::Print, 0, 0, 0)],
        vec![],
    ))
    .unwrap();
    assert_eq!(out.contents(), "1\n");
}

/// Test Vm::set_output() replaces the sink between runs
#[test]
fn test_set_output_contract() {
    let first = OutputBuffer::new();
    let second = OutputBuffer::new();
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(first.clone()));
    vm.set_chunk(Chunk::with_code(
        vec![Instruction::abc(Opcode::Print, 0, 0, 0)],
        vec![],
    ));
    vm.run().unwrap();
    vm.set_output(Box::new(second.clone()));
    vm.run().unwrap();
    assert_eq!(first.contents(), "0\n");
    assert_eq!(second.contents(), "0\n");
}

/// Test run() returns VmResult<()>
#[test]
fn test_run_signature_contract() {
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    vm.set_chunk(Chunk::new());
    let result: VmResult<()> = vm.run();
    assert!(result.is_ok(), "empty chunk should run to completion");
}

/// Test registers() exposes exactly one window
#[test]
fn test_registers_window_contract() {
    let vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    assert_eq!(vm.registers().len(), REGISTER_COUNT);
}

/// Test load_bytes() leaves the previous chunk on failure
#[test]
fn test_load_failure_keeps_previous_chunk() {
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    let good = Module::new(vec![], vec![Instruction::abc(Opcode::Halt, 0, 0, 0)]);
    vm.load_bytes(&good.to_bytes()).unwrap();

    let err = vm.load_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedModule);
    assert_eq!(vm.chunk().map(|c| c.instruction_count()), Some(1));
}

/// Test errors carry the faulting pc
#[test]
fn test_runtime_errors_carry_pc_contract() {
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    let err = vm
        .interpret(Chunk::with_code(
            vec![
                Instruction::abc(Opcode::Load, 0, 0, 0),
                Instruction::from_raw(0x7700_0000),
            ],
            vec![],
        ))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownOpcode);
    assert_eq!(err.pc, Some(1));
}

/// Test Vm is usable through the Debug trait
#[test]
fn test_vm_debug_contract() {
    let vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    let text = format!("{:?}", vm);
    assert!(text.contains("Vm"));
    assert!(text.contains("call_depth"));
}
