//! # pdfium-lifecycle
//!
//! Ownership, pairing and marshaling rules for driving the PDFium C API
//! safely.
//!
//! PDFium hands out raw pointers that must be closed exactly once, children
//! before parents, keeps borrowing caller memory after a call returns, and
//! reports strings through size-query-then-fill buffers. This crate puts a
//! [`Pdfium`] session in front of the library that:
//!
//! - issues typed, generation-checked [`Handle`]s instead of raw pointers, so
//!   a closed or mistyped handle is an error rather than a use-after-free
//! - owns every byte buffer a document reads from until that document closes
//! - closes children before their parent, whatever order the caller used
//! - runs progressive renders, text searches and form environments as
//!   explicit state machines
//! - counts library init/shutdown across sessions
//!
//! The C calls themselves sit behind [`PdfiumBindings`]. The `native`
//! feature provides `native::NativeBindings` over `pdfium-sys`;
//! [`testing::FakeBindings`] is an in-memory library for tests.
//!
//! ## Quick Start
//!
//! ```
//! use pdfium_lifecycle::testing::{FakeBindings, FakeDocument, FakePage};
//! use pdfium_lifecycle::{Pdfium, SearchOptions};
//!
//! let bytes = FakeDocument::new()
//!     .with_page(FakePage::letter().with_text("hello world"))
//!     .to_bytes();
//!
//! let mut pdfium = Pdfium::new(FakeBindings::new());
//! let doc = pdfium.open_from_bytes(&bytes, None)?;
//! let page = pdfium.load_page(doc, 0)?;
//! let text = pdfium.load_text_page(page)?;
//! assert_eq!(pdfium.text(text)?, "hello world");
//!
//! let search = pdfium.start_search(text, "world", SearchOptions::new())?;
//! assert!(pdfium.find_next(search)?);
//! assert_eq!(pdfium.search_result_index(search)?, Some(6));
//!
//! // Closes the search, text page and page first.
//! pdfium.close_document(doc)?;
//! assert_eq!(pdfium.outstanding_buffers(), 0);
//! # Ok::<(), pdfium_lifecycle::PdfiumError>(())
//! ```

mod annotation;
mod attachment;
pub mod bindings;
mod buffer;
mod config;
pub mod date;
mod document;
mod error;
mod form;
mod geometry;
pub mod handle;
mod library;
pub mod marshal;
#[cfg(all(feature = "native", pdfium_bindings))]
pub mod native;
mod navigation;
mod page;
mod page_object;
mod progressive;
mod registry;
mod render;
mod search;
mod session;
mod signature;
mod structure;
mod surface;
mod table;
pub mod testing;
mod text;
mod transform;

pub use annotation::{AnnotationSubtype, AppearanceMode, ColorType};
pub use bindings::PdfiumBindings;
pub use config::LibraryConfig;
pub use document::{FormType, SaveFlags, FALLBACK_PAGE_SIZE};
pub use error::{LoadError, PdfiumError, Result};
pub use form::{FieldFlags, FieldType, Modifiers};
pub use geometry::{CharBox, PageBox, PageRect, PointF, QuadPoints, Rgba};
pub use handle::{
    ActionHandle, AnnotationHandle, AttachmentHandle, BookmarkHandle, DocumentHandle, FontHandle,
    FormHandle, Handle, HandleKind, LinkHandle, PageHandle, PageObjectHandle, SearchHandle,
    SignatureHandle, StructElementHandle, StructTreeHandle, TextPageHandle, WebLinksHandle,
};
pub use library::LibraryLifecycle;
pub use navigation::{ActionType, Bookmark};
pub use page::{FlattenMode, FlattenOutcome};
pub use page_object::{FillMode, PageObjectType};
pub use progressive::{PauseFn, RenderState, RenderStatus};
pub use render::RenderFlags;
pub use search::{SearchMatch, SearchOptions};
pub use session::{DocumentSource, Pdfium};
pub use surface::{PixelFormat, PixelSurface};
pub use table::HandleTable;
pub use transform::{visible_box, Matrix, PageTransform, Rotation, Viewport};
