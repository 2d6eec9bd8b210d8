//! Memory Manager and Interpreter Integration Tests
//!
//! Verifies that linked constants, registers and struct fields keep heap
//! objects alive while the collector runs underneath a program.

use bytecode_system::{load_bytes, Constant, Module, Opcode};
use core_types::{ErrorKind, Value};
use integration_tests::{abc, halt, loadk};
use interpreter::{OutputBuffer, Vm, VmConfig};
use memory_manager::{GcConfig, Heap, HeapObject};

fn strings_module(count: usize) -> Module {
    Module::new(
        (0..count)
            .map(|i| Constant::String(format!("str{}", i).into_bytes()))
            .collect(),
        vec![
            loadk(0, 0),
            loadk(1, (count - 1) as u16),
            abc(Opcode::Print, 0, 0, 0),
            abc(Opcode::Print, 1, 0, 0),
            halt(),
        ],
    )
}

/// Test: linking under stress keeps earlier constants alive
#[test]
fn test_link_under_stress_keeps_constants() {
    let mut heap = Heap::new(GcConfig::default().with_stress(true));
    let chunk = load_bytes(&strings_module(32).to_bytes(), &mut heap).unwrap();

    assert_eq!(heap.object_count(), 32);
    assert!(heap.stats().collections >= 31);
    assert_eq!(heap.stats().objects_freed, 0);
    for (i, value) in chunk.constants.iter().enumerate() {
        let bytes = heap.string_bytes(value.as_object().unwrap()).unwrap();
        assert_eq!(bytes, format!("str{}", i).as_bytes());
    }
}

/// Test: a collection with only the constant pool as roots frees nothing
#[test]
fn test_constants_are_roots() {
    let mut heap = Heap::new(GcConfig::default());
    let chunk = load_bytes(&strings_module(4).to_bytes(), &mut heap).unwrap();

    let report = heap.collect(&[&chunk.constants]);
    assert_eq!(report.objects_freed, 0);
    assert_eq!(report.bytes_before, report.bytes_after);
    assert_eq!(report.next_threshold, report.bytes_after * 2);

    heap.collect(&[]);
    assert_eq!(heap.object_count(), 0);
    assert_eq!(heap.bytes_allocated(), 0);
}

/// Test: a stress-collected VM still prints every string it loaded
#[test]
fn test_stress_run_prints_strings() {
    let out = OutputBuffer::new();
    let mut vm = Vm::with_output(
        VmConfig::new().with_gc(GcConfig::default().with_stress(true)),
        Box::new(out.clone()),
    );
    vm.load_bytes(&strings_module(10).to_bytes()).unwrap();
    vm.run().unwrap();

    assert_eq!(out.contents(), "str0\nstr9\n");
    assert_eq!(vm.heap().stats().objects_freed, 0);
}

/// Test: struct fields are traced, unrelated objects are swept
#[test]
fn test_struct_graph_reachability() {
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    let leaf = vm.alloc_string(b"leaf").unwrap();
    let inner = vm.alloc_struct(vec![leaf, Value::Float(2.5)]).unwrap();
    let outer = vm.alloc_struct(vec![inner, Value::Integer(1)]).unwrap();
    let loose = vm.alloc_string(b"loose").unwrap();

    vm.set_register(7, outer);
    let report = vm.collect_garbage();

    assert_eq!(report.objects_freed, 1);
    assert!(vm.heap().contains(leaf.as_object().unwrap()));
    assert!(!vm.heap().contains(loose.as_object().unwrap()));
    match vm.heap().get(inner.as_object().unwrap()) {
        Some(HeapObject::Struct(s)) => assert_eq!(s.fields, vec![leaf, Value::Float(2.5)]),
        other => panic!("expected struct, got {:?}", other),
    }
}

/// Test: a freed slot reused by a new object does not revive the old handle
#[test]
fn test_stale_handle_after_reuse() {
    let mut vm = Vm::with_output(VmConfig::new(), Box::new(OutputBuffer::new()));
    let old = vm.alloc_string(b"old").unwrap().as_object().unwrap();
    vm.collect_garbage();

    let new = vm.alloc_string(b"new").unwrap().as_object().unwrap();
    vm.set_register(0, Value::Object(new));
    assert!(!vm.heap().contains(old));
    assert!(vm.heap().get(old).is_none());
    assert_eq!(vm.heap().string_bytes(new), Some(&b"new"[..]));
}

/// Test: exceeding the heap limit fails cleanly and leaves the heap usable
#[test]
fn test_heap_limit_recovery() {
    let mut vm = Vm::with_output(
        VmConfig::new().with_gc(GcConfig::default().with_heap_limit(256)),
        Box::new(OutputBuffer::new()),
    );
    let kept = vm.alloc_string(&[b'x'; 64]).unwrap();
    vm.set_register(0, kept);

    let err = vm.alloc_string(&[b'y'; 512]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfMemory);
    assert!(vm.heap().bytes_allocated() <= 256);
    assert!(vm.heap().contains(kept.as_object().unwrap()));
    assert!(vm.alloc_string(b"small").is_ok());
}
