//! Bytecode chunk - linked program unit
//!
//! A [`Chunk`] is a decoded [`Module`] whose constants have been
//! materialized as runtime [`Value`]s. String constants live in the heap, so
//! a chunk is only meaningful together with the heap it was linked against.

use crate::instruction::Instruction;
use crate::module::{Constant, Module};
use core_types::{Value, VmError, VmResult, MAX_CONSTANTS};
use memory_manager::Heap;
use tracing::debug;

/// A bytecode function from the chunk's function table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    /// Name resolved through the constant pool
    pub name: String,
    /// Declared argument count
    pub arity: u8,
    /// Registers used by the function
    pub register_count: u8,
    /// Instruction sequence
    pub code: Vec<Instruction>,
}

/// A loaded program: entry code, constant pool and function table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    /// Entry instruction sequence
    pub code: Vec<Instruction>,
    /// Constant pool, immutable after loading
    pub constants: Vec<Value>,
    /// Functions callable by name or index
    pub functions: Vec<Function>,
}

impl Chunk {
    /// Create a new empty chunk
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunk with the given entry code and constants.
    pub fn with_code(code: Vec<Instruction>, constants: Vec<Value>) -> Self {
        Self {
            code,
            constants,
            functions: Vec::new(),
        }
    }

    /// Materializes a decoded module's constants in `heap`.
    ///
    /// String constants are allocated one by one; each allocation roots the
    /// constants linked before it, so a collection triggered mid-link cannot
    /// free an earlier string.
    ///
    /// # Errors
    ///
    /// `OutOfMemory` if a string constant cannot be allocated, and
    /// `MalformedModule` if the module has no entry function.
    pub fn link(module: &Module, heap: &mut Heap) -> VmResult<Self> {
        Self::link_with_roots(module, heap, &[])
    }

    /// Like [`Chunk::link`], keeping `roots` alive across any collection the
    /// string allocations trigger.
    pub fn link_with_roots(
        module: &Module,
        heap: &mut Heap,
        roots: &[&[Value]],
    ) -> VmResult<Self> {
        let (entry, rest) = module
            .functions
            .split_first()
            .ok_or_else(|| VmError::malformed_module("module has no entry function"))?;
        if module.constants.len() > MAX_CONSTANTS {
            return Err(VmError::malformed_module("constant pool too large"));
        }

        let mut constants = Vec::with_capacity(module.constants.len());
        for constant in &module.constants {
            let value = match constant {
                Constant::Integer(n) => Value::Integer(*n),
                Constant::Float(x) => Value::Float(*x),
                Constant::String(bytes) => {
                    let mut all_roots = roots.to_vec();
                    all_roots.push(constants.as_slice());
                    Value::Object(heap.alloc_string(bytes, &all_roots)?)
                }
            };
            constants.push(value);
        }

        let functions = rest
            .iter()
            .enumerate()
            .map(|(index, proto)| Function {
                name: match module.constants.get(proto.name_index as usize) {
                    Some(Constant::String(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
                    _ => format!("fn{}", index),
                },
                arity: proto.arg_count,
                register_count: proto.reg_count,
                code: proto.code.clone(),
            })
            .collect::<Vec<_>>();

        debug!(
            target: "evm::loader",
            constants = constants.len(),
            instructions = entry.code.len(),
            functions = functions.len(),
            "linked chunk"
        );

        Ok(Self {
            code: entry.code.clone(),
            constants,
            functions,
        })
    }

    /// Looks up a function index by name.
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == name)
    }

    /// Get the number of instructions
    pub fn instruction_count(&self) -> usize {
        self.code.len()
    }

    /// Get the number of constants
    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }
}
