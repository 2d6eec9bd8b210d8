//! Object heap with byte accounting.
//!
//! Objects live in an index-based slot arena. A slot carries a generation
//! counter that is bumped whenever its object is swept, so an [`ObjectRef`]
//! issued before the sweep no longer resolves. Freed slots are recycled
//! through a free list.
//!
//! Every growing allocation updates `bytes_allocated`; when the total
//! exceeds the collection threshold a full collection runs before the
//! allocating call returns (see [`crate::gc`]).

use crate::gc::GrayStack;
use crate::object::{HeapObject, ObjectKind, StringObject, StructObject};
use core_types::{ObjectRef, Value, VmError, VmResult};
use tracing::{debug, trace};

/// Default collection threshold before the first cycle (1 MiB).
pub const DEFAULT_INITIAL_THRESHOLD: usize = 1024 * 1024;

/// Collector configuration.
///
/// # Examples
///
/// ```
/// use memory_manager::GcConfig;
///
/// let config = GcConfig::default()
///     .with_initial_threshold(4096)
///     .with_heap_limit(1 << 20)
///     .with_stress(true);
/// assert_eq!(config.initial_threshold, 4096);
/// assert_eq!(config.heap_limit, Some(1 << 20));
/// assert!(config.stress);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcConfig {
    /// Threshold for the first collection, in bytes
    pub initial_threshold: usize,
    /// Hard cap on allocated bytes; exceeding it is `OutOfMemory`
    pub heap_limit: Option<usize>,
    /// Collect on every growing allocation
    pub stress: bool,
}

impl GcConfig {
    /// Set the threshold for the first collection.
    pub fn with_initial_threshold(mut self, bytes: usize) -> Self {
        self.initial_threshold = bytes;
        self
    }

    /// Cap the number of bytes the heap may hold.
    pub fn with_heap_limit(mut self, bytes: usize) -> Self {
        self.heap_limit = Some(bytes);
        self
    }

    /// Enable or disable stress collection.
    pub fn with_stress(mut self, stress: bool) -> Self {
        self.stress = stress;
        self
    }
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            initial_threshold: DEFAULT_INITIAL_THRESHOLD,
            heap_limit: None,
            stress: false,
        }
    }
}

/// Per-object metadata used by the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHeader {
    /// Object type discriminant
    pub kind: ObjectKind,
    /// Mark bit; set while the object is gray or black
    pub marked: bool,
    /// Bytes charged for this object
    pub size: usize,
}

/// Cumulative collector statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Completed collection cycles
    pub collections: u64,
    /// Objects released by sweeps
    pub objects_freed: u64,
    /// Bytes released by sweeps
    pub bytes_freed: u64,
}

#[derive(Debug)]
pub(crate) struct HeapEntry {
    pub(crate) header: ObjectHeader,
    pub(crate) object: HeapObject,
}

#[derive(Debug)]
pub(crate) struct Slot {
    pub(crate) generation: u32,
    pub(crate) entry: Option<HeapEntry>,
}

/// The VM object heap.
#[derive(Debug)]
pub struct Heap {
    pub(crate) slots: Vec<Slot>,
    pub(crate) free_slots: Vec<u32>,
    pub(crate) live_objects: usize,
    pub(crate) bytes_allocated: usize,
    pub(crate) next_gc: usize,
    pub(crate) gray_stack: GrayStack,
    pub(crate) stats: GcStats,
    config: GcConfig,
}

impl Heap {
    /// Creates an empty heap.
    pub fn new(config: GcConfig) -> Self {
        Self {
            slots: Vec::new(),
            free_slots: Vec::new(),
            live_objects: 0,
            bytes_allocated: 0,
            next_gc: config.initial_threshold,
            gray_stack: GrayStack::default(),
            stats: GcStats::default(),
            config,
        }
    }

    /// Allocates an object, collecting first if the threshold is crossed.
    ///
    /// `roots` lists every value slice the caller keeps live; objects not
    /// reachable from them may be freed by the collection this call
    /// triggers. The object being allocated is never collected by its own
    /// allocation.
    ///
    /// # Errors
    ///
    /// Returns `OutOfMemory` when the configured heap limit would be
    /// exceeded even after collecting, or when the arena cannot grow.
    pub fn allocate(&mut self, object: HeapObject, roots: &[&[Value]]) -> VmResult<ObjectRef> {
        let size = object.size_in_bytes();
        self.bytes_allocated += size;

        if self.config.stress || self.bytes_allocated > self.next_gc {
            self.collect(roots);
        }

        if let Some(limit) = self.config.heap_limit {
            if self.bytes_allocated > limit {
                self.bytes_allocated -= size;
                return Err(VmError::out_of_memory(
                    size,
                    format!("heap limit of {} bytes exceeded", limit),
                ));
            }
        }

        let header = ObjectHeader {
            kind: object.kind(),
            marked: false,
            size,
        };
        let entry = HeapEntry { header, object };

        let handle = match self.free_slots.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.entry = Some(entry);
                ObjectRef::new(index, slot.generation)
            }
            None => {
                if self.slots.try_reserve(1).is_err() {
                    self.bytes_allocated -= size;
                    return Err(VmError::out_of_memory(size, "object arena exhausted"));
                }
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(entry),
                });
                ObjectRef::new(index, 0)
            }
        };

        self.live_objects += 1;
        trace!(target: "evm::gc", object = %handle, size, kind = ?header.kind, "allocate");
        Ok(handle)
    }

    /// Allocates a string object holding a copy of `bytes`.
    pub fn alloc_string(&mut self, bytes: &[u8], roots: &[&[Value]]) -> VmResult<ObjectRef> {
        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(bytes.len())
            .map_err(|e| VmError::out_of_memory(bytes.len(), e.to_string()))?;
        buffer.extend_from_slice(bytes);
        self.allocate(HeapObject::String(StringObject::new(buffer)), roots)
    }

    /// Allocates a struct object with the given fields.
    ///
    /// The fields are treated as additional roots for the duration of the
    /// allocation so that objects they reference survive a triggered
    /// collection.
    pub fn alloc_struct(&mut self, fields: Vec<Value>, roots: &[&[Value]]) -> VmResult<ObjectRef> {
        let mut all_roots: Vec<&[Value]> = roots.to_vec();
        let pinned = fields.clone();
        all_roots.push(pinned.as_slice());
        self.allocate(HeapObject::Struct(StructObject { fields }), &all_roots)
    }

    /// Resolves a handle, returning `None` if the object was freed.
    pub fn get(&self, handle: ObjectRef) -> Option<&HeapObject> {
        self.entry(handle).map(|e| &e.object)
    }

    /// Mutable access to a live object.
    pub fn get_mut(&mut self, handle: ObjectRef) -> Option<&mut HeapObject> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.entry.as_mut().map(|e| &mut e.object)
    }

    /// Header of a live object.
    pub fn header(&self, handle: ObjectRef) -> Option<&ObjectHeader> {
        self.entry(handle).map(|e| &e.header)
    }

    /// Whether the handle still refers to a live object.
    pub fn contains(&self, handle: ObjectRef) -> bool {
        self.entry(handle).is_some()
    }

    /// Bytes of a string object.
    pub fn string_bytes(&self, handle: ObjectRef) -> Option<&[u8]> {
        self.get(handle)
            .and_then(HeapObject::as_string)
            .map(StringObject::as_bytes)
    }

    /// Iterates over all live objects.
    pub fn iter(&self) -> impl Iterator<Item = (ObjectRef, &HeapObject)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.entry
                .as_ref()
                .map(|e| (ObjectRef::new(index as u32, slot.generation), &e.object))
        })
    }

    /// Number of live objects.
    pub fn object_count(&self) -> usize {
        self.live_objects
    }

    /// Bytes currently charged to live objects.
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    /// Threshold that triggers the next collection.
    pub fn next_gc(&self) -> usize {
        self.next_gc
    }

    /// Cumulative statistics.
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    /// Active configuration.
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Releases every object and the gray stack buffer.
    pub fn free_all(&mut self) {
        if self.live_objects > 0 {
            debug!(
                target: "evm::gc",
                objects = self.live_objects,
                bytes = self.bytes_allocated,
                "freeing heap"
            );
        }
        self.slots.clear();
        self.free_slots.clear();
        self.gray_stack.release();
        self.live_objects = 0;
        self.bytes_allocated = 0;
        self.next_gc = self.config.initial_threshold;
    }

    pub(crate) fn entry(&self, handle: ObjectRef) -> Option<&HeapEntry> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.entry.as_ref()
    }

    pub(crate) fn entry_mut(&mut self, handle: ObjectRef) -> Option<&mut HeapEntry> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.entry.as_mut()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(GcConfig::default())
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        self.free_all();
    }
}
