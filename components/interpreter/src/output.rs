//! Output sinks for `PRINT`.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// In-memory sink whose clones share one buffer.
///
/// Hand one clone to the VM and keep another to read what was printed.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl OutputBuffer {
    /// Empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }

    /// Raw bytes written so far.
    pub fn bytes(&self) -> Vec<u8> {
        self.buffer.borrow().clone()
    }

    /// Discard the buffered output.
    pub fn clear(&self) {
        self.buffer.borrow_mut().clear();
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
