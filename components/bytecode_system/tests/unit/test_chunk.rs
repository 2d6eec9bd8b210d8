//! Tests for chunk linking and the disassembler

use bytecode_system::{
    disassemble, load_bytes, Chunk, Constant, Function, Instruction, Module, Opcode,
};
use core_types::{ErrorKind, Value};
use memory_manager::{GcConfig, Heap};

#[test]
fn test_chunk_counts() {
    let chunk = Chunk::with_code(
        vec![
            Instruction::ad(Opcode::LoadK, 0, 0),
            Instruction::abc(Opcode::Halt, 0, 0, 0),
        ],
        vec![Value::Integer(9)],
    );
    assert_eq!(chunk.instruction_count(), 2);
    assert_eq!(chunk.constant_count(), 1);
}

#[test]
fn test_load_bytes_links_strings() {
    let module = Module::new(
        vec![Constant::String(b"greeting".to_vec())],
        vec![Instruction::ad(Opcode::LoadK, 0, 0)],
    );
    let mut heap = Heap::default();
    let chunk = load_bytes(&module.to_bytes(), &mut heap).unwrap();
    let handle = chunk.constants[0].as_object().unwrap();
    assert_eq!(heap.string_bytes(handle), Some(&b"greeting"[..]));
}

#[test]
fn test_load_bytes_heap_limit() {
    let module = Module::new(vec![Constant::String(vec![b'x'; 4096])], vec![]);
    let mut heap = Heap::new(GcConfig::default().with_heap_limit(64));
    let err = load_bytes(&module.to_bytes(), &mut heap).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfMemory);
}

#[test]
fn test_disassemble_includes_functions() {
    let heap = Heap::default();
    let mut chunk = Chunk::with_code(vec![Instruction::abc(Opcode::Halt, 0, 0, 0)], vec![]);
    chunk.functions.push(Function {
        name: "double".to_string(),
        arity: 1,
        register_count: 2,
        code: vec![
            Instruction::abc(Opcode::Add, 1, 0, 0),
            Instruction::abc(Opcode::Ret, 1, 0, 0),
        ],
    });
    let listing = disassemble(&chunk, &heap);
    assert!(listing.contains("== main ==\n0000  HALT\n"));
    assert!(listing.contains("== double ==\n0000  ADD r1, r0, r0\n0001  RET r1\n"));
}
