//! Module loading from bytes or disk.

use crate::chunk::Chunk;
use crate::module::Module;
use core_types::{ErrorKind, VmError, VmResult};
use memory_manager::Heap;
use std::fs;
use std::path::Path;
use tracing::{debug, error};

/// Decodes and links a module held in memory.
pub fn load_bytes(bytes: &[u8], heap: &mut Heap) -> VmResult<Chunk> {
    let module = decode(bytes)?;
    Chunk::link(&module, heap)
}

fn decode(bytes: &[u8]) -> VmResult<Module> {
    let module = Module::decode(bytes).map_err(|e| {
        error!(target: "evm::loader", "{}", e);
        e
    })?;
    debug!(
        target: "evm::loader",
        version = module.version,
        bytes = bytes.len(),
        "decoded module"
    );
    Ok(module)
}

/// Reads and decodes a module file without linking it.
///
/// # Errors
///
/// `Io` naming the path if the file cannot be read, `MalformedModule` if the
/// bytes do not decode.
pub fn read_module(path: impl AsRef<Path>) -> VmResult<Module> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| {
        let err = VmError::new(
            ErrorKind::Io,
            format!("could not open file '{}': {}", path.display(), e),
        );
        error!(target: "evm::loader", "{}", err);
        err
    })?;
    debug!(target: "evm::loader", path = %path.display(), "read module file");
    decode(&bytes)
}

/// Reads, decodes and links a module file.
///
/// # Errors
///
/// The errors of [`read_module`] and of linking.
pub fn load_file(path: impl AsRef<Path>, heap: &mut Heap) -> VmResult<Chunk> {
    let module = read_module(path)?;
    Chunk::link(&module, heap)
}
