//! Error types for pdfium-lifecycle

use crate::handle::HandleKind;
use crate::progressive::RenderState;
use crate::surface::PixelFormat;
use std::fmt;
use thiserror::Error;

/// Result type for pdfium-lifecycle operations
pub type Result<T> = std::result::Result<T, PdfiumError>;

/// Load failure reported by the library's last-error query.
///
/// Codes follow `FPDF_GetLastError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadError {
    /// No error.
    #[default]
    Success,
    /// Unknown error.
    Unknown,
    /// File not found or could not be read.
    File,
    /// Not a PDF, or the file is corrupted.
    Format,
    /// Password required or incorrect.
    Password,
    /// Unsupported security scheme.
    Security,
    /// Page not found or content error.
    Page,
    /// Any code this crate does not know about.
    Other(u32),
}

impl LoadError {
    /// Map a raw `FPDF_ERR_*` code.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => LoadError::Success,
            1 => LoadError::Unknown,
            2 => LoadError::File,
            3 => LoadError::Format,
            4 => LoadError::Password,
            5 => LoadError::Security,
            6 => LoadError::Page,
            other => LoadError::Other(other),
        }
    }

    /// The raw `FPDF_ERR_*` code.
    pub fn code(self) -> u32 {
        match self {
            LoadError::Success => 0,
            LoadError::Unknown => 1,
            LoadError::File => 2,
            LoadError::Format => 3,
            LoadError::Password => 4,
            LoadError::Security => 5,
            LoadError::Page => 6,
            LoadError::Other(code) => code,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Success => write!(f, "no error"),
            LoadError::Unknown => write!(f, "unknown error"),
            LoadError::File => write!(f, "file not found or could not be opened"),
            LoadError::Format => write!(f, "file is not a PDF or is corrupted"),
            LoadError::Password => write!(f, "password required or incorrect"),
            LoadError::Security => write!(f, "unsupported security scheme"),
            LoadError::Page => write!(f, "page not found or content error"),
            LoadError::Other(code) => write!(f, "library error code {}", code),
        }
    }
}

/// Errors that can occur when driving the PDFium C API.
#[derive(Error, Debug)]
pub enum PdfiumError {
    /// The process-wide library reference count is already zero.
    #[error("PDFium library is not initialized")]
    NotInitialized,

    /// Handle is closed, stale, or was never issued.
    #[error("invalid {kind} handle")]
    InvalidHandle { kind: HandleKind },

    /// Child handle was derived from a different parent chain.
    #[error("{kind} handle does not belong to the given {parent}")]
    ForeignHandle {
        kind: HandleKind,
        parent: HandleKind,
    },

    /// Document failed to load; the same code is available from the last-error query.
    #[error("failed to load document: {0}")]
    Load(LoadError),

    /// I/O error while reading a source or writing a save target.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor ended before its reported size was read.
    #[error("short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Source reported zero length.
    #[error("document source is empty")]
    EmptySource,

    /// Buffer allocation for document bytes or string conversion failed.
    #[error("failed to allocate {bytes} bytes")]
    AllocationFailed { bytes: usize },

    /// Only 4-byte-per-pixel surfaces can be rendered into.
    #[error("unsupported pixel format: {0:?}")]
    UnsupportedPixelFormat(PixelFormat),

    /// Surface metadata and pixel memory disagree.
    #[error("invalid pixel surface: {reason}")]
    InvalidSurface { reason: String },

    /// Invalid parameter provided.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Page index out of bounds.
    #[error("page index {index} out of bounds (document has {count} pages)")]
    PageIndexOutOfBounds { index: usize, count: usize },

    /// The library reported failure for a call.
    #[error("{operation} failed")]
    CallFailed { operation: &'static str },

    /// Progressive render driven out of order.
    #[error("cannot {operation} while render is {state:?}")]
    InvalidRenderState {
        state: RenderState,
        operation: &'static str,
    },

    /// Failed to save document.
    #[error("failed to save document: {reason}")]
    SaveFailed { reason: String },

    /// Query has no faithful implementation on top of the library.
    #[error("{0} is not supported")]
    Unsupported(&'static str),

    /// PNG encoding error.
    #[error("PNG encoding error: {0}")]
    PngEncoding(String),
}

impl PdfiumError {
    pub(crate) fn call(operation: &'static str) -> Self {
        PdfiumError::CallFailed { operation }
    }
}

impl From<png::EncodingError> for PdfiumError {
    fn from(err: png::EncodingError) -> Self {
        PdfiumError::PngEncoding(err.to_string())
    }
}
