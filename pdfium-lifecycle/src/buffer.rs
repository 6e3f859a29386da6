//! Source buffers backing documents loaded from memory or descriptors.
//!
//! `FPDF_LoadMemDocument64` keeps reading from the caller's bytes for as long
//! as the document is open. Documents opened from transient bytes or a file
//! descriptor therefore load from a copy owned here, registered against the
//! document handle and freed only when that document is closed.

use crate::error::{PdfiumError, Result};
use crate::handle::DocumentHandle;
use std::collections::HashMap;

/// Heap bytes whose address is stable for the life of the value.
pub(crate) struct SourceBuffer {
    bytes: Box<[u8]>,
}

impl SourceBuffer {
    /// Copy `bytes`, failing cleanly if the allocation cannot be made.
    pub fn copy_from(bytes: &[u8]) -> Result<Self> {
        let mut owned = Vec::new();
        owned
            .try_reserve_exact(bytes.len())
            .map_err(|_| PdfiumError::AllocationFailed { bytes: bytes.len() })?;
        owned.extend_from_slice(bytes);
        Ok(Self {
            bytes: owned.into_boxed_slice(),
        })
    }

    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// Ownership table: at most one buffer per live document.
#[derive(Default)]
pub(crate) struct SourceBufferTable {
    buffers: HashMap<DocumentHandle, SourceBuffer>,
}

impl SourceBufferTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, doc: DocumentHandle, buffer: SourceBuffer) -> Result<()> {
        if self.buffers.contains_key(&doc) {
            return Err(PdfiumError::InvalidArgument(format!(
                "{:?} already owns a source buffer",
                doc
            )));
        }
        tracing::debug!(?doc, bytes = buffer.len(), "registered source buffer");
        self.buffers.insert(doc, buffer);
        Ok(())
    }

    /// Free the buffer owned by `doc`, if any. Returns whether one was freed.
    pub fn release(&mut self, doc: DocumentHandle) -> bool {
        match self.buffers.remove(&doc) {
            Some(buffer) => {
                tracing::debug!(?doc, bytes = buffer.len(), "released source buffer");
                true
            }
            None => false,
        }
    }

    pub fn owns(&self, doc: DocumentHandle) -> bool {
        self.buffers.contains_key(&doc)
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn total_bytes(&self) -> usize {
        self.buffers.values().map(SourceBuffer::len).sum()
    }
}

/// Read the whole of `fd` from offset zero.
///
/// The size comes from `fstat`; anything not positive is an empty source.
/// Reads loop until that many bytes are in; end-of-file before then is a
/// [`PdfiumError::ShortRead`] and a read error is returned as is. Neither is
/// retried. The descriptor's file offset is not moved.
#[cfg(unix)]
pub(crate) fn read_descriptor(
    fd: std::os::fd::BorrowedFd<'_>,
    limit: Option<usize>,
) -> Result<Vec<u8>> {
    use std::os::fd::AsRawFd;

    let raw = fd.as_raw_fd();
    // SAFETY: `stat` is plain data and `raw` is a live descriptor for the
    // duration of the borrow.
    let size = unsafe {
        let mut stat: libc::stat = std::mem::zeroed();
        if libc::fstat(raw, &mut stat) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        stat.st_size
    };
    if size <= 0 {
        return Err(PdfiumError::EmptySource);
    }
    let expected = usize::try_from(size).map_err(|_| PdfiumError::AllocationFailed {
        bytes: usize::MAX,
    })?;
    if let Some(limit) = limit {
        if expected > limit {
            return Err(PdfiumError::AllocationFailed { bytes: expected });
        }
    }

    let mut bytes = Vec::new();
    bytes
        .try_reserve_exact(expected)
        .map_err(|_| PdfiumError::AllocationFailed { bytes: expected })?;
    bytes.resize(expected, 0);

    let mut filled = 0usize;
    while filled < expected {
        let remaining = &mut bytes[filled..];
        // SAFETY: the destination is `remaining.len()` writable bytes.
        let n = unsafe {
            libc::pread(
                raw,
                remaining.as_mut_ptr().cast(),
                remaining.len(),
                filled as libc::off_t,
            )
        };
        if n < 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        if n == 0 {
            return Err(PdfiumError::ShortRead {
                expected,
                actual: filled,
            });
        }
        filled += n as usize;
    }
    Ok(bytes)
}
