//! Unit tests for VmError and ErrorKind

use core_types::{ErrorKind, VmError};

#[test]
fn test_error_kind_display_names() {
    assert_eq!(ErrorKind::MalformedModule.to_string(), "MalformedModule");
    assert_eq!(ErrorKind::OutOfMemory.to_string(), "OutOfMemory");
    assert_eq!(ErrorKind::JitAllocationFailed.to_string(), "JitAllocationFailed");
}

#[test]
fn test_vm_error_at_sets_pc() {
    let err = VmError::new(ErrorKind::DivisionByZero, "integer division by zero").at(7);
    assert_eq!(err.pc, Some(7));
    assert_eq!(
        err.to_string(),
        "DivisionByZero: integer division by zero at pc 7"
    );
}

#[test]
fn test_out_of_memory_message() {
    let err = VmError::out_of_memory(64, "heap limit of 32 bytes exceeded");
    assert_eq!(err.kind, ErrorKind::OutOfMemory);
    assert!(err.message.contains("64 bytes"));
}

#[test]
fn test_vm_error_is_std_error() {
    fn takes_error(_: &dyn std::error::Error) {}
    takes_error(&VmError::malformed_module("truncated"));
}
