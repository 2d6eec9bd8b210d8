//! Call frame for function call stack management

/// Which instruction sequence a frame executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameCode {
    /// The chunk's entry code
    Entry,
    /// A function from the chunk's function table
    Function(usize),
}

/// Call frame representing a function invocation
///
/// Each frame owns a register window of `REGISTER_COUNT` slots starting at
/// `base` in the VM's register arena.
#[derive(Debug, Clone, PartialEq)]
pub struct CallFrame {
    /// Code executed by this frame
    pub code: FrameCode,
    /// Instruction pointer to return to after the frame completes
    pub return_pc: usize,
    /// Start of this frame's register window in the arena
    pub base: usize,
    /// Caller register that receives the return value
    pub return_register: u8,
}

impl CallFrame {
    /// Create a new call frame
    pub fn new(code: FrameCode, return_pc: usize, base: usize, return_register: u8) -> Self {
        Self {
            code,
            return_pc,
            base,
            return_register,
        }
    }

    /// The depth-0 frame running the entry code.
    pub fn entry() -> Self {
        Self::new(FrameCode::Entry, 0, 0, 0)
    }
}
