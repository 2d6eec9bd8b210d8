//! Bytecode opcodes
//!
//! Defines the instruction set of the register VM. Each opcode occupies the
//! most significant byte of a 32-bit instruction word.

use std::fmt;

/// Operand layout of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandFormat {
    /// No operands
    None,
    /// Register A only
    A,
    /// Registers A and B
    AB,
    /// Registers A, B and C
    ABC,
    /// Register A and a 16-bit immediate D
    AD,
    /// Immediate D only (signed jump offset)
    D,
}

/// Bytecode opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    /// Stop execution
    Halt = 0x00,
    /// `rA = constants[D]`
    LoadK = 0x01,
    /// `rA = rB`
    Load = 0x02,

    /// `rA = rB + rC`
    Add = 0x10,
    /// `rA = rB - rC`
    Sub = 0x11,
    /// `rA = rB * rC`
    Mul = 0x12,
    /// `rA = rB / rC`
    Div = 0x13,

    /// `pc += D`
    Jmp = 0x20,
    /// `if rA { pc += D }`
    JmpIf = 0x21,
    /// `if !rA { pc += D }`
    JmpIfNot = 0x22,
    /// `rA = (rB < rC) as integer`
    Compare = 0x23,

    /// `rA = rB(rB+1 ..= rB+C)`
    Call = 0x30,
    /// Return rA from the current frame
    Ret = 0x31,

    /// Write rA to the output sink
    Print = 0x40,
}

impl Opcode {
    /// All opcodes in encoding order.
    pub const ALL: [Opcode; 14] = [
        Opcode::Halt,
        Opcode::LoadK,
        Opcode::Load,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Jmp,
        Opcode::JmpIf,
        Opcode::JmpIfNot,
        Opcode::Compare,
        Opcode::Call,
        Opcode::Ret,
        Opcode::Print,
    ];

    /// Assembly mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Halt => "HALT",
            Opcode::LoadK => "LOADK",
            Opcode::Load => "LOAD",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Jmp => "JMP",
            Opcode::JmpIf => "JMP_IF",
            Opcode::JmpIfNot => "JMP_IF_NOT",
            Opcode::Compare => "COMPARE",
            Opcode::Call => "CALL",
            Opcode::Ret => "RET",
            Opcode::Print => "PRINT",
        }
    }

    /// How the operand bits are interpreted.
    pub fn format(self) -> OperandFormat {
        match self {
            Opcode::Halt => OperandFormat::None,
            Opcode::LoadK | Opcode::JmpIf | Opcode::JmpIfNot => OperandFormat::AD,
            Opcode::Jmp => OperandFormat::D,
            Opcode::Load => OperandFormat::AB,
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Compare
            | Opcode::Call => OperandFormat::ABC,
            Opcode::Ret | Opcode::Print => OperandFormat::A,
        }
    }

    /// Check if this opcode transfers control relative to the pc
    pub fn is_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::JmpIf | Opcode::JmpIfNot)
    }

    /// Check if this opcode ends execution of the current frame
    pub fn is_terminator(self) -> bool {
        matches!(self, Opcode::Halt | Opcode::Ret)
    }

    /// Check if this opcode is a binary arithmetic operation
    pub fn is_binary_arithmetic(self) -> bool {
        matches!(self, Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    /// Decodes an opcode byte, returning the byte itself if unassigned.
    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0x00 => Opcode::Halt,
            0x01 => Opcode::LoadK,
            0x02 => Opcode::Load,
            0x10 => Opcode::Add,
            0x11 => Opcode::Sub,
            0x12 => Opcode::Mul,
            0x13 => Opcode::Div,
            0x20 => Opcode::Jmp,
            0x21 => Opcode::JmpIf,
            0x22 => Opcode::JmpIfNot,
            0x23 => Opcode::Compare,
            0x30 => Opcode::Call,
            0x31 => Opcode::Ret,
            0x40 => Opcode::Print,
            other => return Err(other),
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
