//! Binary module codec
//!
//! All multi-byte integers are big-endian.
//!
//! ```text
//! magic          u32   0x45564D00 ("EVM\0")
//! version        u32
//! constPoolSize  u32   (at most 256)
//!   tag u8: 1 = Integer  i64
//!           2 = Float    f64
//!           3 = String   u32 length, raw bytes
//! functionCount  u32   (at least 1; section 0 is the entry code)
//!   nameIndex    u32
//!   argCount     u8
//!   regCount     u8
//!   instrCount   u32, then instrCount x u32 words
//! ```
//!
//! Trailing bytes after the last section are ignored.

use crate::instruction::Instruction;
use core_types::{VmError, VmResult, MAX_CONSTANTS};

/// Module magic number, `"EVM\0"`.
pub const MAGIC: u32 = 0x4556_4D00;

/// Format version written by [`Module::to_bytes`].
pub const FORMAT_VERSION: u32 = 1;

const TAG_INTEGER: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_STRING: u8 = 3;

/// A constant-pool entry as stored on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit IEEE float
    Float(f64),
    /// Raw byte string
    String(Vec<u8>),
}

/// One function section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionProto {
    /// Constant-pool index of the function's name
    pub name_index: u32,
    /// Declared argument count
    pub arg_count: u8,
    /// Registers used by the function
    pub reg_count: u8,
    /// Instruction words
    pub code: Vec<Instruction>,
}

impl FunctionProto {
    /// Entry section as written by the reference frontend.
    pub fn main(code: Vec<Instruction>) -> Self {
        Self {
            name_index: 0,
            arg_count: 0,
            reg_count: 255,
            code,
        }
    }
}

/// A decoded module.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// Format version (not validated)
    pub version: u32,
    /// Constant pool
    pub constants: Vec<Constant>,
    /// Function sections; index 0 is the entry code
    pub functions: Vec<FunctionProto>,
}

impl Module {
    /// Single-function module with the current format version.
    pub fn new(constants: Vec<Constant>, code: Vec<Instruction>) -> Self {
        Self {
            version: FORMAT_VERSION,
            constants,
            functions: vec![FunctionProto::main(code)],
        }
    }

    /// Parses a module from its binary form.
    ///
    /// # Errors
    ///
    /// `MalformedModule` on a bad magic number, an oversized constant pool, an
    /// unknown constant tag, a missing entry function or truncated input.
    pub fn decode(bytes: &[u8]) -> VmResult<Self> {
        let mut reader = Reader::new(bytes);

        let magic = reader.u32("magic")?;
        if magic != MAGIC {
            return Err(VmError::malformed_module(format!(
                "invalid magic number 0x{:08X}",
                magic
            )));
        }
        let version = reader.u32("version")?;

        let pool_size = reader.u32("constant pool size")? as usize;
        if pool_size > MAX_CONSTANTS {
            return Err(VmError::malformed_module(format!(
                "constant pool of {} entries exceeds the limit of {}",
                pool_size, MAX_CONSTANTS
            )));
        }
        let mut constants = Vec::with_capacity(pool_size);
        for index in 0..pool_size {
            let constant = match reader.u8("constant tag")? {
                TAG_INTEGER => Constant::Integer(reader.u64("integer constant")? as i64),
                TAG_FLOAT => Constant::Float(f64::from_bits(reader.u64("float constant")?)),
                TAG_STRING => {
                    let len = reader.u32("string length")? as usize;
                    Constant::String(reader.bytes(len, "string bytes")?.to_vec())
                }
                tag => {
                    return Err(VmError::malformed_module(format!(
                        "unknown tag {} for constant #{}",
                        tag, index
                    )))
                }
            };
            constants.push(constant);
        }

        let function_count = reader.u32("function count")? as usize;
        if function_count == 0 {
            return Err(VmError::malformed_module("module has no entry function"));
        }
        let mut functions = Vec::new();
        for _ in 0..function_count {
            let name_index = reader.u32("function name index")?;
            let arg_count = reader.u8("argument count")?;
            let reg_count = reader.u8("register count")?;
            let instr_count = reader.u32("instruction count")? as usize;
            // Every word needs four bytes; reject before reserving.
            if instr_count > reader.remaining() / 4 {
                return Err(VmError::malformed_module(format!(
                    "truncated module: {} instructions declared, {} bytes left",
                    instr_count,
                    reader.remaining()
                )));
            }
            let mut code = Vec::with_capacity(instr_count);
            for _ in 0..instr_count {
                code.push(Instruction::from_raw(reader.u32("instruction")?));
            }
            functions.push(FunctionProto {
                name_index,
                arg_count,
                reg_count,
                code,
            });
        }

        Ok(Self {
            version,
            constants,
            functions,
        })
    }

    /// Serializes the module to its binary form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_be_bytes());
        out.extend_from_slice(&self.version.to_be_bytes());

        out.extend_from_slice(&(self.constants.len() as u32).to_be_bytes());
        for constant in &self.constants {
            match constant {
                Constant::Integer(n) => {
                    out.push(TAG_INTEGER);
                    out.extend_from_slice(&n.to_be_bytes());
                }
                Constant::Float(x) => {
                    out.push(TAG_FLOAT);
                    out.extend_from_slice(&x.to_bits().to_be_bytes());
                }
                Constant::String(bytes) => {
                    out.push(TAG_STRING);
                    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                    out.extend_from_slice(bytes);
                }
            }
        }

        out.extend_from_slice(&(self.functions.len() as u32).to_be_bytes());
        for function in &self.functions {
            out.extend_from_slice(&function.name_index.to_be_bytes());
            out.push(function.arg_count);
            out.push(function.reg_count);
            out.extend_from_slice(&(function.code.len() as u32).to_be_bytes());
            for inst in &function.code {
                out.extend_from_slice(&inst.raw().to_be_bytes());
            }
        }
        out
    }

    /// Entry function code.
    pub fn entry(&self) -> &[Instruction] {
        self.functions
            .first()
            .map(|f| f.code.as_slice())
            .unwrap_or(&[])
    }
}

/// Big-endian cursor that reports truncation as `MalformedModule`.
struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn bytes(&mut self, len: usize, what: &str) -> VmResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(VmError::malformed_module(format!(
                "truncated module: expected {} at offset {}",
                what, self.offset
            )));
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, what: &str) -> VmResult<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.bytes(N, what)?);
        Ok(buf)
    }

    fn u8(&mut self, what: &str) -> VmResult<u8> {
        Ok(self.array::<1>(what)?[0])
    }

    fn u32(&mut self, what: &str) -> VmResult<u32> {
        Ok(u32::from_be_bytes(self.array(what)?))
    }

    fn u64(&mut self, what: &str) -> VmResult<u64> {
        Ok(u64::from_be_bytes(self.array(what)?))
    }
}
