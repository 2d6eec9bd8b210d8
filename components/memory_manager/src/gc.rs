//! Tri-color mark/trace/sweep collector.
//!
//! A cycle runs in three phases over the heap's slot arena:
//!
//! 1. **Mark roots**: every `Value::Object` in the supplied root slices is
//!    marked and pushed onto the gray stack (White -> Gray).
//! 2. **Trace**: gray objects are popped and their references marked
//!    (Gray -> Black). Only struct objects hold references.
//! 3. **Sweep**: unmarked objects are freed and their slot generation is
//!    bumped; marked objects have their bit cleared for the next cycle.
//!
//! After the sweep the next threshold is twice the surviving byte count.

use crate::heap::Heap;
use core_types::{ObjectRef, Value};
use tracing::{debug, trace};

/// Mark colors for tri-color marking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MarkColor {
    /// Unmarked (not yet visited)
    White = 0,
    /// Reached, references not yet scanned
    Gray = 1,
    /// Reached and fully scanned
    Black = 2,
}

/// Worklist of objects reached but not yet scanned.
#[derive(Debug, Default)]
pub(crate) struct GrayStack {
    items: Vec<ObjectRef>,
}

impl GrayStack {
    fn push(&mut self, handle: ObjectRef) {
        self.items.push(handle);
    }

    fn pop(&mut self) -> Option<ObjectRef> {
        self.items.pop()
    }

    fn contains(&self, handle: ObjectRef) -> bool {
        self.items.contains(&handle)
    }

    pub(crate) fn release(&mut self) {
        self.items = Vec::new();
    }
}

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionReport {
    /// Bytes charged before the cycle
    pub bytes_before: usize,
    /// Bytes charged after the sweep
    pub bytes_after: usize,
    /// Objects freed by the sweep
    pub objects_freed: usize,
    /// Threshold for the next cycle
    pub next_threshold: usize,
}

impl Heap {
    /// Runs a full collection with the given root slices.
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    /// use memory_manager::{GcConfig, Heap};
    ///
    /// let mut heap = Heap::new(GcConfig::default());
    /// let inner = heap.alloc_string(b"inner", &[]).unwrap();
    /// let outer = heap.alloc_struct(vec![Value::Object(inner)], &[]).unwrap();
    ///
    /// let report = heap.collect(&[&[Value::Object(outer)]]);
    /// assert_eq!(report.objects_freed, 0);
    /// assert!(heap.contains(inner));
    ///
    /// heap.collect(&[]);
    /// assert_eq!(heap.object_count(), 0);
    /// ```
    pub fn collect(&mut self, roots: &[&[Value]]) -> CollectionReport {
        let bytes_before = self.bytes_allocated;
        debug!(target: "evm::gc", bytes = bytes_before, objects = self.live_objects, "gc begin");

        self.mark_roots(roots);
        self.trace_references();
        let objects_freed = self.sweep();

        self.next_gc = self.bytes_allocated * 2;
        self.stats.collections += 1;

        let report = CollectionReport {
            bytes_before,
            bytes_after: self.bytes_allocated,
            objects_freed,
            next_threshold: self.next_gc,
        };
        debug!(
            target: "evm::gc",
            collected = bytes_before - self.bytes_allocated,
            from = bytes_before,
            to = self.bytes_allocated,
            freed = objects_freed,
            next = self.next_gc,
            "gc end"
        );
        report
    }

    /// Current tri-color state of a live object.
    ///
    /// Outside a collection every live object is white; the gray and black
    /// states are only observable while a cycle is in progress.
    pub fn color(&self, handle: ObjectRef) -> Option<MarkColor> {
        let entry = self.entry(handle)?;
        Some(if !entry.header.marked {
            MarkColor::White
        } else if self.gray_stack.contains(handle) {
            MarkColor::Gray
        } else {
            MarkColor::Black
        })
    }

    fn mark_roots(&mut self, roots: &[&[Value]]) {
        for slice in roots {
            for value in slice.iter() {
                self.mark_value(*value);
            }
        }
    }

    fn mark_value(&mut self, value: Value) {
        if let Value::Object(handle) = value {
            self.mark_object(handle);
        }
    }

    fn mark_object(&mut self, handle: ObjectRef) {
        let Some(entry) = self.entry_mut(handle) else {
            return;
        };
        if entry.header.marked {
            return;
        }
        entry.header.marked = true;
        trace!(target: "evm::gc", object = %handle, "mark");
        self.gray_stack.push(handle);
    }

    fn trace_references(&mut self) {
        let mut children = Vec::new();
        while let Some(handle) = self.gray_stack.pop() {
            trace!(target: "evm::gc", object = %handle, "blacken");
            if let Some(entry) = self.entry(handle) {
                entry.object.for_each_reference(|child| children.push(child));
            }
            for child in children.drain(..) {
                self.mark_object(child);
            }
        }
    }

    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(entry) = slot.entry.as_mut() else {
                continue;
            };
            if entry.header.marked {
                entry.header.marked = false;
                continue;
            }
            let size = entry.header.size;
            trace!(target: "evm::gc", index, size, kind = ?entry.header.kind, "free");
            slot.entry = None;
            slot.generation = slot.generation.wrapping_add(1);
            self.free_slots.push(index as u32);
            self.bytes_allocated -= size;
            self.stats.bytes_freed += size as u64;
            freed += 1;
        }
        self.live_objects -= freed;
        self.stats.objects_freed += freed as u64;
        freed
    }
}
