//! End-to-End CLI Integration Tests
//!
//! Module files on disk through the evm_cli Runtime, the same path the
//! `evm` binary takes.

use bytecode_system::{Constant, Instruction, Module, Opcode};
use clap::Parser;
use core_types::ErrorKind;
use evm_cli::{Cli, CliError, Runtime};
use integration_tests::{abc, halt, loadk};
use interpreter::{OutputBuffer, Vm};
use std::fs;
use std::path::PathBuf;

fn write_module(dir: &tempfile::TempDir, name: &str, module: &Module) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, module.to_bytes()).unwrap();
    path
}

fn runtime_for(args: &[&str]) -> (Runtime, OutputBuffer) {
    let cli = Cli::parse_from(std::iter::once("evm").chain(args.iter().copied()));
    let out = OutputBuffer::new();
    let vm = Vm::with_output(evm_cli::runtime::vm_config(&cli), Box::new(out.clone()));
    (
        Runtime::new(vm, cli.jit).with_disassemble(cli.disassemble),
        out,
    )
}

fn add_module() -> Module {
    Module::new(
        vec![Constant::Integer(5), Constant::Integer(7)],
        vec![
            loadk(0, 0),
            loadk(1, 1),
            abc(Opcode::Add, 2, 0, 1),
            abc(Opcode::Print, 2, 0, 0),
            halt(),
        ],
    )
}

/// Test: the documented five-plus-seven program prints 12
#[test]
fn test_e2e_add_program() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "add.evm", &add_module());

    for args in [vec![], vec!["--jit"], vec!["--stress-gc"]] {
        let (mut runtime, out) = runtime_for(&args);
        runtime.execute_file(&path).unwrap();
        assert_eq!(out.contents(), "12\n", "flags {:?}", args);
    }
}

/// Test: a loop with strings under a tiny GC threshold
#[test]
fn test_e2e_loop_with_strings() {
    // i = 3; while i { print "tick"; i -= 1 }; print "done"
    let module = Module::new(
        vec![
            Constant::Integer(3),
            Constant::Integer(1),
            Constant::String(b"tick".to_vec()),
            Constant::String(b"done".to_vec()),
        ],
        vec![
            loadk(0, 0),
            loadk(1, 1),
            Instruction::jump(Opcode::JmpIfNot, 0, 4),
            loadk(2, 2),
            abc(Opcode::Print, 2, 0, 0),
            abc(Opcode::Sub, 0, 0, 1),
            Instruction::jump(Opcode::Jmp, 0, -5),
            loadk(2, 3),
            abc(Opcode::Print, 2, 0, 0),
            halt(),
        ],
    );
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "loop.evm", &module);

    let (mut runtime, out) = runtime_for(&["--gc-threshold", "1"]);
    let report = runtime.execute_file(&path).unwrap();
    assert_eq!(out.contents(), "tick\ntick\ntick\ndone\n");
    assert_eq!(report.live_objects, 2);
}

/// Test: a bad magic number is reported and nothing is printed
#[test]
fn test_e2e_bad_magic() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.evm");
    let mut bytes = add_module().to_bytes();
    bytes[..4].copy_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
    fs::write(&path, bytes).unwrap();

    let (mut runtime, out) = runtime_for(&[]);
    let err = runtime.execute_file(&path).unwrap_err();
    assert!(matches!(err, CliError::Vm(ref e) if e.kind == ErrorKind::MalformedModule));
    assert!(err.to_string().starts_with("MalformedModule"));
    assert_eq!(out.contents(), "");
}

/// Test: an unreadable path names the file in the error
#[test]
fn test_e2e_missing_file() {
    let (mut runtime, _) = runtime_for(&[]);
    let err = runtime.execute_file("does-not-exist.evm").unwrap_err();
    assert!(err.to_string().contains("could not open file 'does-not-exist.evm'"));
}

/// Test: heap limit flag turns a large string into OutOfMemory
#[test]
fn test_e2e_heap_limit() {
    let module = Module::new(
        vec![Constant::String(vec![b'x'; 4096])],
        vec![loadk(0, 0), abc(Opcode::Print, 0, 0, 0)],
    );
    let dir = tempfile::tempdir().unwrap();
    let path = write_module(&dir, "big.evm", &module);

    let (mut runtime, _) = runtime_for(&["--heap-limit", "1024"]);
    let err = runtime.execute_file(&path).unwrap_err();
    assert!(matches!(err, CliError::Vm(ref e) if e.kind == ErrorKind::OutOfMemory));
}
