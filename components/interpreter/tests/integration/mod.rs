//! Integration tests for interpreter
//!
//! Runs whole programs through module decoding, linking and dispatch, and
//! checks the heap stays consistent across collections.

use bytecode_system::{Chunk, Constant, Instruction, Module, Opcode};
use core_types::{ErrorKind, Value};
use interpreter::{OutputBuffer, Vm, VmConfig};
use memory_manager::{GcConfig, HeapObject};

fn abc(op: Opcode, a: u8, b: u8, c: u8) -> Instruction {
    Instruction::abc(op, a, b, c)
}

fn loadk(a: u8, k: u16) -> Instruction {
    Instruction::ad(Opcode::LoadK, a, k)
}

fn run_bytes(config: VmConfig, bytes: &[u8]) -> (Vm, OutputBuffer) {
    let out = OutputBuffer::new();
    let mut vm = Vm::with_output(config, Box::new(out.clone()));
    vm.load_bytes(bytes).unwrap();
    vm.run().unwrap();
    (vm, out)
}

#[test]
fn test_add_program_prints_twelve() {
    let module = Module::new(
        vec![Constant::Integer(5), Constant::Integer(7)],
        vec![
            loadk(0, 0),
            loadk(1, 1),
            abc(Opcode::Add, 2, 0, 1),
            abc(Opcode::Print, 2, 0, 0),
            abc(Opcode::Halt, 0, 0, 0),
        ],
    );
    let (vm, out) = run_bytes(VmConfig::new(), &module.to_bytes());
    assert_eq!(out.contents(), "12\n");
    assert_eq!(vm.register(2), Value::Integer(12));
}

#[test]
fn test_bad_magic_does_not_execute() {
    let mut bytes = Module::new(vec![], vec![abc(Opcode::Print, 0, 0, 0)]).to_bytes();
    bytes[..4].copy_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

    let out = OutputBuffer::new();
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(out.clone()));
    let err = vm.load_bytes(&bytes).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MalformedModule);
    assert!(vm.chunk().is_none());
    assert!(vm.run().is_err());
    assert_eq!(out.contents(), "");
}

fn branch_chunk() -> Chunk {
    Chunk::with_code(
        vec![
            Instruction::jump(Opcode::JmpIfNot, 0, 2),
            loadk(1, 0),
            abc(Opcode::Halt, 0, 0, 0),
            loadk(1, 1),
            abc(Opcode::Halt, 0, 0, 0),
        ],
        vec![Value::Integer(1), Value::Integer(2)],
    )
}

#[test]
fn test_jmp_if_not_truthy_falls_through() {
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    vm.set_register(0, Value::Integer(3));
    vm.set_register(1, Value::Integer(0));
    vm.interpret(branch_chunk()).unwrap();
    assert_eq!(vm.register(1), Value::Integer(1));
}

#[test]
fn test_jmp_if_not_falsy_jumps() {
    for cond in [Value::Integer(0), Value::Float(0.0), Value::Float(-0.0)] {
        let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
        vm.set_register(0, cond);
        vm.interpret(branch_chunk()).unwrap();
        assert_eq!(vm.register(1), Value::Integer(2), "condition {:?}", cond);
    }
}

#[test]
fn test_objects_are_truthy() {
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    let s = vm.alloc_string(b"").unwrap();
    vm.set_register(0, s);
    vm.interpret(branch_chunk()).unwrap();
    assert_eq!(vm.register(1), Value::Integer(1));
}

#[test]
fn test_jmp_zero_offset_is_next_instruction() {
    let out = OutputBuffer::new();
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(out.clone()));
    vm.interpret(Chunk::with_code(
        vec![
            Instruction::jump(Opcode::Jmp, 0, 0),
            loadk(0, 0),
            abc(Opcode::Print, 0, 0, 0),
        ],
        vec![Value::Integer(9)],
    ))
    .unwrap();
    assert_eq!(out.contents(), "9\n");
}

#[test]
fn test_backward_jump_loop() {
    // sum = 0; i = 1; while i < 4 { sum += i; i += 1 }
    let module = Module::new(
        vec![Constant::Integer(0), Constant::Integer(1), Constant::Integer(4)],
        vec![
            loadk(0, 0),
            loadk(1, 1),
            loadk(4, 1),
            loadk(2, 2),
            abc(Opcode::Compare, 3, 1, 2),
            Instruction::jump(Opcode::JmpIfNot, 3, 3),
            abc(Opcode::Add, 0, 0, 1),
            abc(Opcode::Add, 1, 1, 4),
            Instruction::jump(Opcode::Jmp, 0, -5),
            abc(Opcode::Print, 0, 0, 0),
            abc(Opcode::Halt, 0, 0, 0),
        ],
    );
    let (vm, out) = run_bytes(VmConfig::new(), &module.to_bytes());
    assert_eq!(out.contents(), "6\n");
    assert_eq!(vm.register(1), Value::Integer(4));
}

#[test]
fn test_jump_before_start_ends_program() {
    let out = OutputBuffer::new();
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(out.clone()));
    vm.interpret(Chunk::with_code(
        vec![
            Instruction::jump(Opcode::Jmp, 0, -5),
            abc(Opcode::Print, 0, 0, 0),
        ],
        vec![],
    ))
    .unwrap();
    assert_eq!(out.contents(), "");
    assert!(!vm.is_running());
}

#[test]
fn test_float_arithmetic_program() {
    let module = Module::new(
        vec![Constant::Float(1.5), Constant::Integer(2)],
        vec![
            loadk(0, 0),
            loadk(1, 1),
            abc(Opcode::Mul, 2, 0, 1),
            abc(Opcode::Div, 3, 2, 1),
            abc(Opcode::Print, 2, 0, 0),
            abc(Opcode::Print, 3, 0, 0),
        ],
    );
    let (vm, out) = run_bytes(VmConfig::new(), &module.to_bytes());
    assert_eq!(out.contents(), "3.000000\n1.500000\n");
    assert_eq!(vm.register(2), Value::Float(3.0));
}

#[test]
fn test_string_constants_print_raw_bytes() {
    let module = Module::new(
        vec![Constant::String(b"hello, world".to_vec())],
        vec![loadk(0, 0), abc(Opcode::Print, 0, 0, 0)],
    );
    let (_, out) = run_bytes(VmConfig::new(), &module.to_bytes());
    assert_eq!(out.contents(), "hello, world\n");
}

// ============================================================================
// Collector interaction
// ============================================================================

#[test]
fn test_stress_gc_keeps_constants_and_registers() {
    let config = VmConfig::new().with_gc(GcConfig::default().with_stress(true));
    let out = OutputBuffer::new();
    let mut vm = Vm::with_output(config, Box::new(out.clone()));

    let held = vm.alloc_string(b"held").unwrap();
    vm.set_register(200, held);

    let module = Module::new(
        (0..16)
            .map(|i| Constant::String(format!("s{}", i).into_bytes()))
            .collect(),
        vec![
            loadk(0, 0),
            loadk(1, 15),
            abc(Opcode::Print, 0, 0, 0),
            abc(Opcode::Print, 1, 0, 0),
            abc(Opcode::Print, 200, 0, 0),
        ],
    );
    vm.load_module(&module).unwrap();
    // Every allocation above collected; nothing reachable may be gone.
    assert_eq!(vm.heap().object_count(), 17);
    vm.run().unwrap();
    assert_eq!(out.contents(), "s0\ns15\nheld\n");
}

#[test]
fn test_collection_after_run_frees_only_garbage() {
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    let name = vm.alloc_string(b"field").unwrap();
    let record = vm.alloc_struct(vec![name, Value::Integer(1)]).unwrap();
    vm.alloc_string(b"garbage").unwrap();

    vm.set_register(4, record);
    vm.interpret(Chunk::with_code(vec![abc(Opcode::Load, 5, 4, 0)], vec![]))
        .unwrap();
    assert_eq!(vm.register(5), record);

    let report = vm.collect_garbage();
    assert_eq!(report.objects_freed, 1);
    assert!(vm.heap().contains(name.as_object().unwrap()));
    match vm.heap().get(record.as_object().unwrap()) {
        Some(HeapObject::Struct(s)) => assert_eq!(s.fields[0], name),
        other => panic!("expected struct, got {:?}", other),
    }
}

#[test]
fn test_cleared_register_releases_object() {
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    let s = vm.alloc_string(b"temp").unwrap();
    vm.set_register(0, s);
    // LOAD r0, r1 overwrites the only reference.
    vm.interpret(Chunk::with_code(vec![abc(Opcode::Load, 0, 1, 0)], vec![]))
        .unwrap();
    vm.collect_garbage();
    assert!(!vm.heap().contains(s.as_object().unwrap()));
}

#[test]
fn test_heap_limit_reports_out_of_memory() {
    let config = VmConfig::new().with_gc(GcConfig::default().with_heap_limit(64));
    let mut vm = Vm::with_output(config, Box::new(OutputBuffer::new()));
    let big = vec![b'x'; 1024];
    let err = vm.alloc_string(&big).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfMemory);
}

#[test]
fn test_failed_load_keeps_previous_constants_alive() {
    let out = OutputBuffer::new();
    let config = VmConfig::new().with_gc(GcConfig::default().with_stress(true).with_heap_limit(4096));
    let mut vm = Vm::with_output(config, Box::new(out.clone()));

    let greeting = Module::new(
        vec![Constant::String(b"hello".to_vec())],
        vec![loadk(0, 0), abc(Opcode::Print, 0, 0, 0)],
    );
    vm.load_module(&greeting).unwrap();
    let handle = vm.chunk().unwrap().constants[0].as_object().unwrap();

    let oversized = Module::new(
        vec![Constant::String(vec![b'x'; 8192])],
        vec![loadk(0, 0), abc(Opcode::Print, 0, 0, 0)],
    );
    let err = vm.load_module(&oversized).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfMemory);
    assert!(vm.heap().stats().collections >= 1);
    assert!(vm.heap().contains(handle));

    vm.run().unwrap();
    assert_eq!(out.contents(), "hello\n");
}
