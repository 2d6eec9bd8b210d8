//! Human-readable chunk listings.
//!
//! ```text
//! == main ==
//! 0000  LOADK r0, #0 (5)
//! 0001  LOADK r1, #1 (7)
//! 0002  ADD r2, r0, r1
//! 0003  PRINT r2
//! 0004  HALT
//! ```

use crate::chunk::Chunk;
use crate::instruction::Instruction;
use crate::opcode::{Opcode, OperandFormat};
use core_types::Value;
use memory_manager::{Heap, HeapObject};
use std::fmt::Write;

/// Renders the entry code and every function of `chunk`.
pub fn disassemble(chunk: &Chunk, heap: &Heap) -> String {
    let mut out = String::new();
    disassemble_code(&mut out, "main", &chunk.code, &chunk.constants, heap);
    for function in &chunk.functions {
        out.push('\n');
        disassemble_code(&mut out, &function.name, &function.code, &chunk.constants, heap);
    }
    out
}

fn disassemble_code(
    out: &mut String,
    name: &str,
    code: &[Instruction],
    constants: &[Value],
    heap: &Heap,
) {
    let _ = writeln!(out, "== {} ==", name);
    for (offset, inst) in code.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:04}  {}",
            offset,
            disassemble_instruction(*inst, constants, heap)
        );
    }
}

/// Renders one instruction without its offset.
pub fn disassemble_instruction(inst: Instruction, constants: &[Value], heap: &Heap) -> String {
    let op = match inst.opcode() {
        Ok(op) => op,
        Err(byte) => return format!("<unknown 0x{:02X}> {:#010x}", byte, inst.raw()),
    };
    let (a, b, c) = (inst.a(), inst.b(), inst.c());
    match op.format() {
        OperandFormat::None => op.mnemonic().to_string(),
        OperandFormat::A => format!("{} r{}", op, a),
        OperandFormat::AB => format!("{} r{}, r{}", op, a, b),
        OperandFormat::ABC => format!("{} r{}, r{}, r{}", op, a, b, c),
        OperandFormat::D => format!("{} {:+}", op, inst.sd()),
        OperandFormat::AD if op == Opcode::LoadK => {
            let index = inst.d() as usize;
            match constants.get(index) {
                Some(value) => format!(
                    "{} r{}, #{} ({})",
                    op,
                    a,
                    index,
                    describe_constant(*value, heap)
                ),
                None => format!("{} r{}, #{} (out of range)", op, a, index),
            }
        }
        OperandFormat::AD => format!("{} r{}, {:+}", op, a, inst.sd()),
    }
}

fn describe_constant(value: Value, heap: &Heap) -> String {
    match value {
        Value::Integer(n) => n.to_string(),
        Value::Float(x) => format!("{:?}", x),
        Value::Object(handle) => match heap.get(handle) {
            Some(HeapObject::String(s)) => format!("{:?}", s.to_string_lossy()),
            Some(other) => format!("<{:?}>", other.kind()),
            None => "<freed>".to_string(),
        },
    }
}
