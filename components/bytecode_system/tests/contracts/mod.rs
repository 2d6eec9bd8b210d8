//! Contract test runner for bytecode_system
