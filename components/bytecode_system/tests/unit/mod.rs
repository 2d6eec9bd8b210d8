//! Unit test runner for bytecode_system

mod test_chunk;
mod test_instruction;
