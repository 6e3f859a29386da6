//! The session that owns every handle issued against one library binding.

use crate::bindings::PdfiumBindings;
use crate::buffer::SourceBufferTable;
use crate::config::LibraryConfig;
use crate::error::{LoadError, PdfiumError, Result};
use crate::handle::*;
use crate::library::LibraryLifecycle;
use crate::progressive::RenderSpan;
use crate::registry::Registry;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How a document's bytes reach the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSource {
    /// Copied from caller memory into an owned buffer.
    Bytes,
    /// Read from a file descriptor into an owned buffer.
    Descriptor,
    /// Opened by path; the library does its own file access.
    Path,
    /// Created empty in memory.
    New,
}

impl DocumentSource {
    /// Whether a source buffer must exist for the life of the document.
    pub fn owns_buffer(self) -> bool {
        matches!(self, DocumentSource::Bytes | DocumentSource::Descriptor)
    }
}

pub(crate) struct DocumentEntry<B: PdfiumBindings> {
    pub raw: B::Document,
    pub source: DocumentSource,
    pub form: Option<FormHandle>,
}

pub(crate) struct PageEntry<B: PdfiumBindings> {
    pub raw: B::Page,
    pub document: DocumentHandle,
    pub index: usize,
    /// Form environment notified through `FORM_OnAfterLoadPage`.
    pub form: Option<FormHandle>,
}

pub(crate) struct TextPageEntry<B: PdfiumBindings> {
    pub raw: B::TextPage,
    pub page: PageHandle,
}

pub(crate) struct SearchEntry<B: PdfiumBindings> {
    /// `None` for an empty query, which never touches the library.
    pub raw: Option<B::Search>,
    pub text_page: TextPageHandle,
    /// Pattern kept alive for the whole session.
    pub query: Vec<u16>,
    pub flags: u32,
    /// Last successful match as (char index, char count).
    pub current: Option<(i32, i32)>,
}

pub(crate) struct WebLinksEntry<B: PdfiumBindings> {
    pub raw: B::WebLinks,
    pub text_page: TextPageHandle,
}

pub(crate) struct AnnotationEntry<B: PdfiumBindings> {
    pub raw: B::Annotation,
    pub page: PageHandle,
}

pub(crate) struct PageObjectEntry<B: PdfiumBindings> {
    pub raw: B::PageObject,
    pub document: DocumentHandle,
    /// Page that owns the object; `None` while the session owns it.
    pub page: Option<PageHandle>,
}

pub(crate) struct FontEntry<B: PdfiumBindings> {
    pub raw: B::Font,
    pub document: DocumentHandle,
}

pub(crate) struct StructTreeEntry<B: PdfiumBindings> {
    pub raw: B::StructTree,
    pub page: PageHandle,
}

pub(crate) struct FormEntry<B: PdfiumBindings> {
    pub raw: B::Form,
    pub document: DocumentHandle,
    /// Set by the teardown callback once the library frees the record.
    pub released: Rc<std::cell::Cell<bool>>,
}

/// A library-owned view, valid while its parent is.
pub(crate) struct View<R, P> {
    pub raw: R,
    pub parent: P,
}

/// Views deduplicated by raw value so repeated traversal does not grow the table.
pub(crate) struct ViewTable<K, R, P> {
    entries: Registry<K, View<R, P>>,
    by_raw: HashMap<R, Handle<K>>,
}

impl<K, R, P> ViewTable<K, R, P>
where
    K: HandleType,
    R: Copy + Eq + Hash,
    P: Copy + PartialEq,
{
    pub fn new() -> Self {
        Self {
            entries: Registry::new(),
            by_raw: HashMap::new(),
        }
    }

    pub fn intern(&mut self, raw: R, parent: P) -> Handle<K> {
        if let Some(&handle) = self.by_raw.get(&raw) {
            if self.entries.get(handle).is_some_and(|v| v.parent == parent) {
                return handle;
            }
            // Same raw value under a different parent: the old view is stale.
            self.entries.remove(handle);
        }
        let handle = self.entries.insert(View { raw, parent });
        self.by_raw.insert(raw, handle);
        handle
    }

    pub fn lookup(&self, handle: Handle<K>) -> Result<&View<R, P>> {
        self.entries.lookup(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every view whose parent matches.
    pub fn forget_where(&mut self, mut pred: impl FnMut(&P) -> bool) -> usize {
        let removed = self.entries.drain_where(|view| pred(&view.parent));
        for (_, view) in &removed {
            self.by_raw.remove(&view.raw);
        }
        removed.len()
    }
}

/// A PDFium session: bindings plus every handle opened through them.
///
/// All operations take `&mut self`. The library is not reentrant, and a
/// session is the single owner that serializes calls against its documents.
///
/// Dropping the session closes whatever is still open, children first, and
/// releases its reference on the process-wide library count.
pub struct Pdfium<B: PdfiumBindings> {
    pub(crate) bindings: B,
    pub(crate) config: LibraryConfig,
    lifecycle: &'static LibraryLifecycle,
    pub(crate) last_error: LoadError,

    pub(crate) documents: Registry<kind::Document, DocumentEntry<B>>,
    pub(crate) pages: Registry<kind::Page, PageEntry<B>>,
    pub(crate) text_pages: Registry<kind::TextPage, TextPageEntry<B>>,
    pub(crate) searches: Registry<kind::Search, SearchEntry<B>>,
    pub(crate) web_links: Registry<kind::WebLinks, WebLinksEntry<B>>,
    pub(crate) annotations: Registry<kind::Annotation, AnnotationEntry<B>>,
    pub(crate) page_objects: Registry<kind::PageObject, PageObjectEntry<B>>,
    pub(crate) fonts: Registry<kind::Font, FontEntry<B>>,
    pub(crate) struct_trees: Registry<kind::StructTree, StructTreeEntry<B>>,
    pub(crate) forms: Registry<kind::Form, FormEntry<B>>,

    pub(crate) bookmarks: ViewTable<kind::Bookmark, B::Bookmark, DocumentHandle>,
    pub(crate) actions: ViewTable<kind::Action, B::Action, DocumentHandle>,
    pub(crate) links: ViewTable<kind::Link, B::Link, PageHandle>,
    pub(crate) signatures: ViewTable<kind::Signature, B::Signature, DocumentHandle>,
    pub(crate) attachments: ViewTable<kind::Attachment, B::Attachment, DocumentHandle>,
    pub(crate) struct_elements: ViewTable<kind::StructElement, B::StructElement, StructTreeHandle>,

    pub(crate) buffers: SourceBufferTable,
    pub(crate) renders: HashMap<PageHandle, RenderSpan<B>>,
    pub(crate) form_records: Arc<AtomicUsize>,
}

impl<B: PdfiumBindings> Pdfium<B> {
    /// Start a session with the default configuration.
    pub fn new(bindings: B) -> Self {
        Self::with_config(bindings, LibraryConfig::default())
    }

    /// Start a session, initialising the library if this is the first one.
    pub fn with_config(bindings: B, config: LibraryConfig) -> Self {
        Self::with_lifecycle(bindings, config, LibraryLifecycle::global())
    }

    /// Start a session counted against a specific lifecycle instead of the
    /// process-wide one.
    pub fn with_lifecycle(
        mut bindings: B,
        config: LibraryConfig,
        lifecycle: &'static LibraryLifecycle,
    ) -> Self {
        lifecycle.acquire(|| bindings.init_library(&config));
        Self {
            bindings,
            config,
            lifecycle,
            last_error: LoadError::Success,
            documents: Registry::new(),
            pages: Registry::new(),
            text_pages: Registry::new(),
            searches: Registry::new(),
            web_links: Registry::new(),
            annotations: Registry::new(),
            page_objects: Registry::new(),
            fonts: Registry::new(),
            struct_trees: Registry::new(),
            forms: Registry::new(),
            bookmarks: ViewTable::new(),
            actions: ViewTable::new(),
            links: ViewTable::new(),
            signatures: ViewTable::new(),
            attachments: ViewTable::new(),
            struct_elements: ViewTable::new(),
            buffers: SourceBufferTable::new(),
            renders: HashMap::new(),
            form_records: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn bindings(&self) -> &B {
        &self.bindings
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Load error from the most recent failed open, `Success` after a good one.
    pub fn last_error(&self) -> LoadError {
        self.last_error
    }

    /// Number of documents currently holding a source buffer.
    pub fn outstanding_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Total bytes held in source buffers.
    pub fn outstanding_buffer_bytes(&self) -> usize {
        self.buffers.total_bytes()
    }

    /// Form callback records the library has not released yet.
    pub fn outstanding_form_records(&self) -> usize {
        self.form_records.load(Ordering::SeqCst)
    }

    /// Open handles of one kind, for leak checks.
    pub fn open_handles(&self, kind: HandleKind) -> usize {
        match kind {
            HandleKind::Document => self.documents.len(),
            HandleKind::Page => self.pages.len(),
            HandleKind::TextPage => self.text_pages.len(),
            HandleKind::Search => self.searches.len(),
            HandleKind::WebLinks => self.web_links.len(),
            HandleKind::Annotation => self.annotations.len(),
            HandleKind::PageObject => self.page_objects.len(),
            HandleKind::Font => self.fonts.len(),
            HandleKind::StructTree => self.struct_trees.len(),
            HandleKind::StructElement => self.struct_elements.len(),
            HandleKind::Form => self.forms.len(),
            HandleKind::Bookmark => self.bookmarks.len(),
            HandleKind::Link => self.links.len(),
            HandleKind::Action => self.actions.len(),
            HandleKind::Signature => self.signatures.len(),
            HandleKind::Attachment => self.attachments.len(),
        }
    }

    /// Documents still open, in slot order.
    pub fn documents(&self) -> Vec<DocumentHandle> {
        self.documents.iter().map(|(handle, _)| handle).collect()
    }

    pub(crate) fn doc_raw(&self, doc: DocumentHandle) -> Result<B::Document> {
        Ok(self.documents.lookup(doc)?.raw)
    }

    pub(crate) fn page_raw(&self, page: PageHandle) -> Result<B::Page> {
        Ok(self.pages.lookup(page)?.raw)
    }

    pub(crate) fn page_doc(&self, page: PageHandle) -> Result<(B::Page, DocumentHandle, B::Document)> {
        let entry = self.pages.lookup(page)?;
        let doc_raw = self.doc_raw(entry.document)?;
        Ok((entry.raw, entry.document, doc_raw))
    }

    pub(crate) fn text_raw(&self, text: TextPageHandle) -> Result<B::TextPage> {
        Ok(self.text_pages.lookup(text)?.raw)
    }

    pub(crate) fn annot_raw(&self, annot: AnnotationHandle) -> Result<B::Annotation> {
        Ok(self.annotations.lookup(annot)?.raw)
    }

    pub(crate) fn object_raw(&self, object: PageObjectHandle) -> Result<B::PageObject> {
        Ok(self.page_objects.lookup(object)?.raw)
    }

    pub(crate) fn form_raw(&self, form: FormHandle) -> Result<B::Form> {
        Ok(self.forms.lookup(form)?.raw)
    }

    /// Page index guard shared by page loads and size queries.
    pub(crate) fn check_page_index(&self, doc: DocumentHandle, index: usize) -> Result<i32> {
        let raw = self.doc_raw(doc)?;
        let count = self.bindings.page_count(raw).max(0) as usize;
        if index >= count {
            return Err(PdfiumError::PageIndexOutOfBounds { index, count });
        }
        Ok(index as i32)
    }
}

impl<B: PdfiumBindings> Drop for Pdfium<B> {
    fn drop(&mut self) {
        for doc in self.documents() {
            if let Err(err) = self.close_document(doc) {
                tracing::warn!(?doc, "failed to close document on drop: {}", err);
            }
        }
        let bindings = &mut self.bindings;
        if let Err(err) = self.lifecycle.release(|| bindings.destroy_library()) {
            tracing::warn!("library release on drop: {}", err);
        }
    }
}
