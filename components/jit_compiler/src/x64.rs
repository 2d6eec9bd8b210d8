//! x86-64 instruction encoder
//!
//! Only the handful of encodings the baseline tier needs. The register file
//! pointer arrives in `rdi` (System V) and stays there; `rax` is the single
//! scratch register.

/// Byte stride between register slots in the unboxed register file.
pub const SLOT_SIZE: i32 = 8;

/// Displacement of register `index` from the register file base.
pub fn slot_offset(index: u8) -> i32 {
    index as i32 * SLOT_SIZE
}

/// Append-only machine code buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembler {
    code: Vec<u8>,
}

impl Assembler {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// `push rbp; mov rbp, rsp`
    pub fn prologue(&mut self) {
        self.code.push(0x55);
        self.code.extend_from_slice(&[0x48, 0x89, 0xE5]);
    }

    /// `xor eax, eax; pop rbp; ret`
    pub fn epilogue(&mut self) {
        self.code.extend_from_slice(&[0x31, 0xC0]);
        self.code.push(0x5D);
        self.code.push(0xC3);
    }

    /// `mov rax, [rdi + disp32]`
    pub fn load_rax(&mut self, disp: i32) {
        self.rdi_mem(&[0x48, 0x8B], disp);
    }

    /// `mov [rdi + disp32], rax`
    pub fn store_rax(&mut self, disp: i32) {
        self.rdi_mem(&[0x48, 0x89], disp);
    }

    /// `add rax, [rdi + disp32]`
    pub fn add_rax(&mut self, disp: i32) {
        self.rdi_mem(&[0x48, 0x03], disp);
    }

    /// `sub rax, [rdi + disp32]`
    pub fn sub_rax(&mut self, disp: i32) {
        self.rdi_mem(&[0x48, 0x2B], disp);
    }

    /// `imul rax, [rdi + disp32]`
    pub fn imul_rax(&mut self, disp: i32) {
        self.rdi_mem(&[0x48, 0x0F, 0xAF], disp);
    }

    /// `mov rax, imm64`
    pub fn mov_rax_imm64(&mut self, imm: i64) {
        self.code.extend_from_slice(&[0x48, 0xB8]);
        self.code.extend_from_slice(&imm.to_le_bytes());
    }

    // ModRM 0x87: mod=10 (disp32), reg=rax, rm=rdi
    fn rdi_mem(&mut self, opcode: &[u8], disp: i32) {
        self.code.extend_from_slice(opcode);
        self.code.push(0x87);
        self.code.extend_from_slice(&disp.to_le_bytes());
    }

    /// Emitted bytes so far
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Number of emitted bytes
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether nothing has been emitted
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Take the emitted bytes
    pub fn finish(self) -> Vec<u8> {
        self.code
    }
}
