//! 32-bit instruction words
//!
//! ```text
//!  31      24 23      16 15       8 7        0
//! +----------+----------+----------+----------+
//! |  opcode  |    A     |    B     |    C     |   ABC format
//! +----------+----------+----------+----------+
//! |  opcode  |    A     |          D          |   AD format
//! +----------+----------+---------------------+
//! ```

use crate::opcode::Opcode;
use std::fmt;

/// A single encoded instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction(u32);

impl Instruction {
    /// Wrap a raw instruction word.
    pub const fn from_raw(word: u32) -> Self {
        Self(word)
    }

    /// Encode an ABC-format instruction.
    pub const fn abc(op: Opcode, a: u8, b: u8, c: u8) -> Self {
        Self((op as u32) << 24 | (a as u32) << 16 | (b as u32) << 8 | c as u32)
    }

    /// Encode an AD-format instruction.
    pub const fn ad(op: Opcode, a: u8, d: u16) -> Self {
        Self((op as u32) << 24 | (a as u32) << 16 | d as u32)
    }

    /// Encode an AD-format instruction with a signed jump offset.
    pub const fn jump(op: Opcode, a: u8, offset: i16) -> Self {
        Self::ad(op, a, offset as u16)
    }

    /// The raw word.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Opcode byte, which may not name a valid opcode.
    pub const fn op_byte(self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// Decoded opcode, or the unassigned opcode byte.
    pub fn opcode(self) -> Result<Opcode, u8> {
        Opcode::try_from(self.op_byte())
    }

    /// Register A.
    pub const fn a(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Register B.
    pub const fn b(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Register C.
    pub const fn c(self) -> u8 {
        self.0 as u8
    }

    /// Unsigned 16-bit immediate.
    pub const fn d(self) -> u16 {
        self.0 as u16
    }

    /// Sign-extended 16-bit immediate, used for jump deltas.
    pub const fn sd(self) -> i16 {
        self.0 as u16 as i16
    }
}

impl From<u32> for Instruction {
    fn from(word: u32) -> Self {
        Self(word)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Ok(op) => write!(f, "Instruction({} {:#010x})", op, self.0),
            Err(_) => write!(f, "Instruction(?? {:#010x})", self.0),
        }
    }
}
