//! Tests for instruction encoding

use bytecode_system::{Instruction, Opcode};

#[test]
fn test_fields_do_not_overlap() {
    let inst = Instruction::abc(Opcode::Mul, 0xAA, 0xBB, 0xCC);
    assert_eq!(inst.op_byte(), 0x12);
    assert_eq!(inst.a(), 0xAA);
    assert_eq!(inst.b(), 0xBB);
    assert_eq!(inst.c(), 0xCC);
    assert_eq!(inst.d(), 0xBBCC);
}

#[test]
fn test_jump_offsets_round_through_d() {
    for offset in [i16::MIN, -1, 0, 1, 2, i16::MAX] {
        let inst = Instruction::jump(Opcode::JmpIf, 7, offset);
        assert_eq!(inst.sd(), offset);
        assert_eq!(inst.a(), 7);
    }
}

#[test]
fn test_raw_word_conversion() {
    let inst = Instruction::from(0x0102_0304u32);
    assert_eq!(inst.raw(), 0x0102_0304);
    assert_eq!(inst.opcode(), Ok(Opcode::LoadK));
}

#[test]
fn test_debug_shows_mnemonic() {
    let inst = Instruction::abc(Opcode::Add, 2, 0, 1);
    assert_eq!(format!("{:?}", inst), "Instruction(ADD 0x10020001)");
}
