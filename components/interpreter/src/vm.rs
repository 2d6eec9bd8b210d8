//! Virtual Machine for bytecode execution
//!
//! Owns the register arena, the call stack, the object heap, the native table
//! and the output sink. Nothing here is shared between instances.

use bytecode_system::{read_module, Chunk, Module};
use core_types::{ErrorKind, Value, VmError, VmResult, REGISTER_COUNT};
use memory_manager::{
    CollectionReport, FunctionObject, GcConfig, Heap, HeapObject, NativeObject,
};
use std::io::{self, Write};
use std::path::Path;
use std::rc::Rc;

use crate::call_frame::CallFrame;
use crate::natives::NativeRegistry;

/// Default limit on nested calls, counting the entry frame.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Configuration for a [`Vm`].
///
/// # Examples
///
/// ```
/// use interpreter::{NativeRegistry, VmConfig};
/// use memory_manager::GcConfig;
///
/// let config = VmConfig::new()
///     .with_gc(GcConfig::default().with_stress(true))
///     .with_natives(NativeRegistry::with_defaults())
///     .with_max_call_depth(16)
///     .with_trace_execution(true);
/// assert!(config.gc.stress);
/// assert_eq!(config.max_call_depth, 16);
/// ```
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Collector settings
    pub gc: GcConfig,
    /// Host functions callable by `CALL`
    pub natives: NativeRegistry,
    /// Maximum frame depth, including the entry frame
    pub max_call_depth: usize,
    /// Emit a trace event per dispatched instruction
    pub trace_execution: bool,
}

impl VmConfig {
    /// Default configuration with the built-in natives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the collector configuration.
    pub fn with_gc(mut self, gc: GcConfig) -> Self {
        self.gc = gc;
        self
    }

    /// Replace the native table.
    pub fn with_natives(mut self, natives: NativeRegistry) -> Self {
        self.natives = natives;
        self
    }

    /// Set the call depth limit.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Enable per-instruction tracing.
    pub fn with_trace_execution(mut self, enabled: bool) -> Self {
        self.trace_execution = enabled;
        self
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            gc: GcConfig::default(),
            natives: NativeRegistry::with_defaults(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            trace_execution: false,
        }
    }
}

/// Virtual Machine for executing register bytecode
///
/// The VM manages the execution state including:
/// - A register arena holding one 256-slot window per call frame
/// - The call stack (depth 0 is the entry code)
/// - The object heap and its collector
/// - The native table and the `PRINT` output sink
pub struct Vm {
    pub(crate) heap: Heap,
    pub(crate) arena: Vec<Value>,
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) chunk: Option<Rc<Chunk>>,
    pub(crate) chunk_id: u64,
    pub(crate) pc: usize,
    pub(crate) running: bool,
    pub(crate) natives: NativeRegistry,
    pub(crate) output: Box<dyn Write>,
    pub(crate) max_call_depth: usize,
    pub(crate) trace_execution: bool,
}

impl Vm {
    /// Create a VM writing to standard output.
    pub fn new(config: VmConfig) -> Self {
        Self::with_output(config, Box::new(io::stdout()))
    }

    /// Create a VM writing `PRINT` output to `output`.
    pub fn with_output(config: VmConfig, output: Box<dyn Write>) -> Self {
        Self {
            heap: Heap::new(config.gc),
            arena: vec![Value::default(); REGISTER_COUNT],
            frames: vec![CallFrame::entry()],
            chunk: None,
            chunk_id: 0,
            pc: 0,
            running: false,
            natives: config.natives,
            output,
            max_call_depth: config.max_call_depth.max(1),
            trace_execution: config.trace_execution,
        }
    }

    /// Replace the output sink.
    pub fn set_output(&mut self, output: Box<dyn Write>) {
        self.output = output;
    }

    /// Decode a module and make it the current chunk.
    ///
    /// Registers stay rooted while string constants are allocated.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> VmResult<()> {
        let module = Module::decode(bytes)?;
        self.load_module(&module)
    }

    /// Read, decode and link a module file, making it the current chunk.
    ///
    /// # Errors
    ///
    /// `Io` naming the path if the file cannot be read, otherwise the errors
    /// of [`Vm::load_module`].
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> VmResult<()> {
        let module = read_module(path)?;
        self.load_module(&module)
    }

    /// Link a decoded module and make it the current chunk.
    ///
    /// The current chunk's constants stay rooted while linking, so a failed
    /// load leaves the previous chunk intact and runnable.
    pub fn load_module(&mut self, module: &Module) -> VmResult<()> {
        let constants = self.chunk.as_deref().map(|c| c.constants.as_slice()).unwrap_or(&[]);
        let chunk =
            Chunk::link_with_roots(module, &mut self.heap, &[self.arena.as_slice(), constants])?;
        self.set_chunk(chunk);
        Ok(())
    }

    /// Install an already-linked chunk.
    ///
    /// Function objects made for an earlier chunk are no longer callable.
    pub fn set_chunk(&mut self, chunk: Chunk) {
        self.chunk = Some(Rc::new(chunk));
        self.chunk_id += 1;
    }

    /// The current chunk, if one is loaded.
    pub fn chunk(&self) -> Option<&Chunk> {
        self.chunk.as_deref()
    }

    /// Install `chunk` and run it from the first instruction.
    pub fn interpret(&mut self, chunk: Chunk) -> VmResult<()> {
        self.set_chunk(chunk);
        self.run()
    }

    /// Register `index` of the current frame.
    pub fn register(&self, index: u8) -> Value {
        self.arena[self.base() + index as usize]
    }

    /// Overwrite register `index` of the current frame.
    pub fn set_register(&mut self, index: u8, value: Value) {
        let base = self.base();
        self.arena[base + index as usize] = value;
    }

    /// The current frame's register window.
    pub fn registers(&self) -> &[Value] {
        let base = self.base();
        &self.arena[base..base + REGISTER_COUNT]
    }

    /// Mutable view of the current frame's register window.
    pub fn registers_mut(&mut self) -> &mut [Value] {
        let base = self.base();
        &mut self.arena[base..base + REGISTER_COUNT]
    }

    /// Allocate a string object, rooting all registers and constants.
    pub fn alloc_string(&mut self, bytes: &[u8]) -> VmResult<Value> {
        let constants = self.chunk.as_deref().map(|c| c.constants.as_slice()).unwrap_or(&[]);
        let handle = self
            .heap
            .alloc_string(bytes, &[self.arena.as_slice(), constants])?;
        Ok(Value::Object(handle))
    }

    /// Allocate a struct object, rooting all registers and constants.
    pub fn alloc_struct(&mut self, fields: Vec<Value>) -> VmResult<Value> {
        let constants = self.chunk.as_deref().map(|c| c.constants.as_slice()).unwrap_or(&[]);
        let handle = self
            .heap
            .alloc_struct(fields, &[self.arena.as_slice(), constants])?;
        Ok(Value::Object(handle))
    }

    /// Allocate a native object for a registered host function.
    ///
    /// # Errors
    ///
    /// `UndefinedFunction` if no native has that name.
    pub fn native_value(&mut self, name: &str) -> VmResult<Value> {
        let function = self.natives.get(name).ok_or_else(|| {
            VmError::new(
                ErrorKind::UndefinedFunction,
                format!("no native named '{}'", name),
            )
        })?;
        let object = HeapObject::Native(NativeObject {
            function,
            name: name.to_string(),
        });
        self.allocate(object)
    }

    /// Allocate a function object for a function of the current chunk.
    ///
    /// # Errors
    ///
    /// `UndefinedFunction` if no chunk is loaded or it has no such function.
    pub fn function_value(&mut self, name: &str) -> VmResult<Value> {
        let (function_index, arity) = self
            .chunk
            .as_deref()
            .and_then(|chunk| {
                let index = chunk.function_index(name)?;
                Some((index, chunk.functions[index].arity))
            })
            .ok_or_else(|| {
                VmError::new(
                    ErrorKind::UndefinedFunction,
                    format!("no function named '{}'", name),
                )
            })?;
        let object = HeapObject::Function(FunctionObject {
            chunk_id: self.chunk_id,
            function_index,
            arity,
            name: name.to_string(),
        });
        self.allocate(object)
    }

    pub(crate) fn allocate(&mut self, object: HeapObject) -> VmResult<Value> {
        let constants = self.chunk.as_deref().map(|c| c.constants.as_slice()).unwrap_or(&[]);
        let handle = self
            .heap
            .allocate(object, &[self.arena.as_slice(), constants])?;
        Ok(Value::Object(handle))
    }

    /// Run a full collection rooted at every frame window and the constants.
    pub fn collect_garbage(&mut self) -> CollectionReport {
        let constants = self.chunk.as_deref().map(|c| c.constants.as_slice()).unwrap_or(&[]);
        self.heap.collect(&[self.arena.as_slice(), constants])
    }

    /// The object heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Whether the dispatch loop is executing.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Index of the next instruction to fetch.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Number of active frames, including the entry frame.
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn base(&self) -> usize {
        self.frames.last().map(|f| f.base).unwrap_or(0)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmConfig::default())
    }
}

impl std::fmt::Debug for Vm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vm")
            .field("pc", &self.pc)
            .field("running", &self.running)
            .field("call_depth", &self.frames.len())
            .field("objects", &self.heap.object_count())
            .field("bytes_allocated", &self.heap.bytes_allocated())
            .field("natives", &self.natives)
            .finish_non_exhaustive()
    }
}
