//! Process-wide library init/shutdown reference count.

use crate::error::{PdfiumError, Result};
use std::sync::{Mutex, PoisonError};

/// Mutex-guarded init/shutdown counter.
///
/// The first `acquire` runs the library's init, later ones only count.
/// The `release` that brings the count back to zero runs the library's
/// teardown. The init and teardown closures run while the lock is held, so a
/// concurrent `acquire` never observes a library that is half initialised.
#[derive(Debug, Default)]
pub struct LibraryLifecycle {
    count: Mutex<usize>,
}

static GLOBAL: LibraryLifecycle = LibraryLifecycle::new();

impl LibraryLifecycle {
    pub const fn new() -> Self {
        Self {
            count: Mutex::new(0),
        }
    }

    /// The instance shared by every [`crate::Pdfium`] session in the process.
    pub fn global() -> &'static LibraryLifecycle {
        &GLOBAL
    }

    /// Increment, running `init` on the 0 → 1 transition. Returns the new count.
    pub fn acquire(&self, init: impl FnOnce()) -> usize {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        if *count == 0 {
            init();
            tracing::debug!("PDFium library initialized");
        }
        *count += 1;
        *count
    }

    /// Decrement, running `destroy` on the 1 → 0 transition. Returns the new count.
    ///
    /// Releasing at zero is an error and leaves the count untouched.
    pub fn release(&self, destroy: impl FnOnce()) -> Result<usize> {
        let mut count = self.count.lock().unwrap_or_else(PoisonError::into_inner);
        match *count {
            0 => Err(PdfiumError::NotInitialized),
            1 => {
                destroy();
                *count = 0;
                tracing::debug!("PDFium library destroyed");
                Ok(0)
            }
            n => {
                *count = n - 1;
                Ok(n - 1)
            }
        }
    }

    pub fn count(&self) -> usize {
        *self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
