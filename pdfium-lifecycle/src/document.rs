//! Document open/close, document-level queries and saving.

use crate::bindings::{raw, PdfiumBindings};
use crate::buffer::SourceBuffer;
use crate::error::{LoadError, PdfiumError, Result};
use crate::handle::{DocumentHandle, HandleKind};
use crate::marshal::{read_wide_string, to_c_string};
use crate::session::{DocumentEntry, DocumentSource, Pdfium};
use std::io::{self, Write};
use std::path::Path;

/// Page size used when the library cannot report one (A4 in points).
pub const FALLBACK_PAGE_SIZE: (f64, f64) = (595.0, 842.0);

/// Flags for `FPDF_SaveAsCopy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveFlags {
    /// Let the library choose.
    #[default]
    Default,
    Incremental,
    NoIncremental,
    RemoveSecurity,
}

impl SaveFlags {
    pub fn to_raw(self) -> u32 {
        match self {
            SaveFlags::Default => 0,
            SaveFlags::Incremental => raw::FPDF_INCREMENTAL,
            SaveFlags::NoIncremental => raw::FPDF_NO_INCREMENTAL,
            SaveFlags::RemoveSecurity => raw::FPDF_REMOVE_SECURITY,
        }
    }
}

/// Interactive form technology declared by a document (`FORMTYPE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormType {
    None,
    AcroForm,
    XfaFull,
    XfaForeground,
    Other(i32),
}

impl FormType {
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => FormType::None,
            1 => FormType::AcroForm,
            2 => FormType::XfaFull,
            3 => FormType::XfaForeground,
            other => FormType::Other(other),
        }
    }

    pub fn has_forms(self) -> bool {
        !matches!(self, FormType::None)
    }
}

impl<B: PdfiumBindings> Pdfium<B> {
    /// Open a document from bytes the caller may free right after the call.
    ///
    /// The bytes are copied into a buffer owned by the session for the life
    /// of the document. On failure that copy is released before returning and
    /// [`Pdfium::last_error`] reports why the load failed.
    pub fn open_from_bytes(
        &mut self,
        bytes: &[u8],
        password: Option<&str>,
    ) -> Result<DocumentHandle> {
        if bytes.is_empty() {
            self.last_error = LoadError::File;
            return Err(PdfiumError::EmptySource);
        }
        if let Err(err) = self.config.check_source_len(bytes.len()) {
            self.last_error = LoadError::File;
            return Err(err);
        }
        let buffer = SourceBuffer::copy_from(bytes)?;
        self.load_from_buffer(buffer, password, DocumentSource::Bytes)
    }

    /// Open a document from the full contents of a file descriptor.
    ///
    /// The descriptor is read from offset zero into an owned buffer; a short
    /// read or read error fails the open without retrying. The descriptor
    /// stays owned by the caller.
    #[cfg(unix)]
    pub fn open_from_descriptor(
        &mut self,
        fd: std::os::fd::BorrowedFd<'_>,
        password: Option<&str>,
    ) -> Result<DocumentHandle> {
        let bytes = match crate::buffer::read_descriptor(fd, self.config.max_source_bytes) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::debug!("descriptor read failed: {}", err);
                self.last_error = LoadError::File;
                return Err(err);
            }
        };
        self.load_from_buffer(
            SourceBuffer::from_vec(bytes),
            password,
            DocumentSource::Descriptor,
        )
    }

    /// Open a document by path. The library reads the file itself and no
    /// buffer is kept.
    pub fn open_from_path<P: AsRef<Path>>(
        &mut self,
        path: P,
        password: Option<&str>,
    ) -> Result<DocumentHandle> {
        let path = path.as_ref();
        let utf8 = path.to_str().ok_or_else(|| {
            PdfiumError::InvalidArgument(format!("path is not UTF-8: {}", path.display()))
        })?;
        let c_path = to_c_string(utf8)?;
        let password = password.map(to_c_string).transpose()?;

        match self.bindings.load_document(&c_path, password.as_deref()) {
            Some(raw) => Ok(self.register_document(raw, DocumentSource::Path)),
            None => Err(PdfiumError::Load(self.record_load_failure())),
        }
    }

    /// Create an empty in-memory document.
    pub fn create_document(&mut self) -> Result<DocumentHandle> {
        let raw = self
            .bindings
            .create_new_document()
            .ok_or_else(|| PdfiumError::call("FPDF_CreateNewDocument"))?;
        Ok(self.register_document(raw, DocumentSource::New))
    }

    fn load_from_buffer(
        &mut self,
        buffer: SourceBuffer,
        password: Option<&str>,
        source: DocumentSource,
    ) -> Result<DocumentHandle> {
        let password = password.map(to_c_string).transpose()?;
        // SAFETY: on success the buffer is registered against the new
        // document and only released by `close_document`, after the library
        // has closed it.
        let raw = unsafe {
            self.bindings
                .load_mem_document(buffer.as_ptr(), buffer.len(), password.as_deref())
        };
        let Some(raw) = raw else {
            let err = self.record_load_failure();
            drop(buffer);
            return Err(PdfiumError::Load(err));
        };

        let doc = self.register_document(raw, source);
        if let Err(err) = self.buffers.register(doc, buffer) {
            self.documents.remove(doc);
            self.bindings.close_document(raw);
            return Err(err);
        }
        Ok(doc)
    }

    fn register_document(&mut self, raw: B::Document, source: DocumentSource) -> DocumentHandle {
        let doc = self.documents.insert(DocumentEntry {
            raw,
            source,
            form: None,
        });
        self.last_error = LoadError::Success;
        tracing::debug!(?doc, ?source, "document opened");
        doc
    }

    fn record_load_failure(&mut self) -> LoadError {
        let err = match LoadError::from_code(self.bindings.last_error()) {
            LoadError::Success => LoadError::Unknown,
            err => err,
        };
        self.last_error = err;
        tracing::debug!(error = %err, "document load failed");
        err
    }

    /// Close a document and everything still open beneath it, then free its
    /// source buffer if it owns one.
    pub fn close_document(&mut self, doc: DocumentHandle) -> Result<()> {
        let form = self.documents.lookup(doc)?.form;

        for page in self.pages.handles_where(|entry| entry.document == doc) {
            tracing::warn!(?doc, ?page, "closing page left open on document close");
            if let Err(err) = self.close_page(page) {
                tracing::warn!(?doc, ?page, "failed to close page on document close: {}", err);
            }
        }
        for (object, entry) in self.page_objects.drain_where(|entry| entry.document == doc) {
            if entry.page.is_none() {
                tracing::debug!(?object, "destroying detached page object");
                self.bindings.destroy_object(entry.raw);
            }
        }
        for (font, entry) in self.fonts.drain_where(|entry| entry.document == doc) {
            tracing::warn!(?doc, ?font, "closing font left open on document close");
            self.bindings.close_font(entry.raw);
        }
        if let Some(form) = form {
            tracing::warn!(?doc, ?form, "closing form environment left open on document close");
            if let Err(err) = self.close_form(form) {
                tracing::warn!(?doc, ?form, "failed to close form on document close: {}", err);
            }
        }
        let views = self.bookmarks.forget_where(|owner| *owner == doc)
            + self.actions.forget_where(|owner| *owner == doc)
            + self.signatures.forget_where(|owner| *owner == doc)
            + self.attachments.forget_where(|owner| *owner == doc);

        let entry = self
            .documents
            .remove(doc)
            .ok_or(PdfiumError::InvalidHandle {
                kind: HandleKind::Document,
            })?;
        self.bindings.close_document(entry.raw);
        let released = self.buffers.release(doc);
        debug_assert_eq!(released, entry.source.owns_buffer());
        tracing::debug!(?doc, views, released, "document closed");
        Ok(())
    }

    /// How the document was opened.
    pub fn document_source(&self, doc: DocumentHandle) -> Result<DocumentSource> {
        Ok(self.documents.lookup(doc)?.source)
    }

    pub fn page_count(&self, doc: DocumentHandle) -> Result<usize> {
        let raw = self.doc_raw(doc)?;
        Ok(self.bindings.page_count(raw).max(0) as usize)
    }

    /// Document information entry such as `Title` or `Author`; empty when absent.
    pub fn metadata(&self, doc: DocumentHandle, tag: &str) -> Result<String> {
        let raw = self.doc_raw(doc)?;
        let tag = to_c_string(tag)?;
        read_wide_string(|buf| self.bindings.meta_text(raw, &tag, buf))
    }

    pub fn page_label(&self, doc: DocumentHandle, index: usize) -> Result<String> {
        let raw = self.doc_raw(doc)?;
        let index = i32::try_from(index)
            .map_err(|_| PdfiumError::InvalidArgument(format!("page index {}", index)))?;
        read_wide_string(|buf| self.bindings.page_label(raw, index, buf))
    }

    /// Page size in points without loading the page.
    ///
    /// Falls back to [`FALLBACK_PAGE_SIZE`] when the library cannot answer.
    pub fn page_size_by_index(&self, doc: DocumentHandle, index: usize) -> Result<(f64, f64)> {
        let raw = self.doc_raw(doc)?;
        let size = i32::try_from(index)
            .ok()
            .and_then(|index| self.bindings.page_size_by_index(raw, index));
        Ok(size.unwrap_or_else(|| {
            tracing::trace!(?doc, index, "page size unavailable, using fallback");
            FALLBACK_PAGE_SIZE
        }))
    }

    /// Copy pages from `src` into `dest` before `insert_at`.
    ///
    /// `range` is a page range string such as `"1,3,5-7"` (one-based); `None`
    /// imports every page.
    pub fn import_pages(
        &mut self,
        dest: DocumentHandle,
        src: DocumentHandle,
        range: Option<&str>,
        insert_at: usize,
    ) -> Result<usize> {
        let dest_raw = self.doc_raw(dest)?;
        let src_raw = self.doc_raw(src)?;
        let range = range.map(to_c_string).transpose()?;
        let before = self.bindings.page_count(dest_raw);
        let index = i32::try_from(insert_at)
            .map_err(|_| PdfiumError::InvalidArgument(format!("insert index {}", insert_at)))?;
        if !self
            .bindings
            .import_pages(dest_raw, src_raw, range.as_deref(), index)
        {
            return Err(PdfiumError::call("FPDF_ImportPages"));
        }
        let added = (self.bindings.page_count(dest_raw) - before).max(0) as usize;
        self.shift_page_indices(dest, insert_at, added as isize);
        tracing::debug!(?dest, ?src, added, "imported pages");
        Ok(added)
    }

    pub fn copy_viewer_preferences(
        &mut self,
        dest: DocumentHandle,
        src: DocumentHandle,
    ) -> Result<()> {
        let dest_raw = self.doc_raw(dest)?;
        let src_raw = self.doc_raw(src)?;
        if self.bindings.copy_viewer_preferences(dest_raw, src_raw) {
            Ok(())
        } else {
            Err(PdfiumError::call("FPDF_CopyViewerPreferences"))
        }
    }

    /// Remove a page from the document. The page must not be loaded.
    pub fn delete_page(&mut self, doc: DocumentHandle, index: usize) -> Result<()> {
        let raw_index = self.check_page_index(doc, index)?;
        if self
            .pages
            .iter()
            .any(|(_, entry)| entry.document == doc && entry.index == index)
        {
            return Err(PdfiumError::InvalidArgument(format!(
                "page {} is loaded and cannot be deleted",
                index
            )));
        }
        let raw = self.doc_raw(doc)?;
        self.bindings.delete_page(raw, raw_index);
        self.shift_page_indices(doc, index + 1, -1);
        Ok(())
    }

    /// Keep loaded pages' indices in step with insertions and deletions.
    pub(crate) fn shift_page_indices(&mut self, doc: DocumentHandle, from: usize, by: isize) {
        if by == 0 {
            return;
        }
        for page in self.pages.handles_where(|entry| entry.document == doc && entry.index >= from) {
            if let Some(entry) = self.pages.get_mut(page) {
                entry.index = entry.index.saturating_add_signed(by);
            }
        }
    }

    pub fn form_type(&self, doc: DocumentHandle) -> Result<FormType> {
        let raw = self.doc_raw(doc)?;
        Ok(FormType::from_raw(self.bindings.form_type(raw)))
    }

    /// Raw `PAGEMODE_*` value from the catalog.
    pub fn page_mode(&self, doc: DocumentHandle) -> Result<i32> {
        let raw = self.doc_raw(doc)?;
        Ok(self.bindings.page_mode(raw))
    }

    pub fn javascript_action_count(&self, doc: DocumentHandle) -> Result<usize> {
        let raw = self.doc_raw(doc)?;
        let count = self.bindings.javascript_action_count(raw);
        usize::try_from(count).map_err(|_| PdfiumError::call("FPDFDoc_GetJavaScriptActionCount"))
    }

    /// Serialize the document through `writer`. Returns the bytes written.
    ///
    /// Every block the library emits must be taken whole by a single
    /// `write`; a short write or write error aborts the save.
    pub fn save_to_writer<W: Write>(
        &mut self,
        doc: DocumentHandle,
        writer: &mut W,
        flags: SaveFlags,
    ) -> Result<u64> {
        let raw = self.doc_raw(doc)?;
        let mut written = 0u64;
        let mut failure: Option<io::Error> = None;
        let mut sink = |block: &[u8]| -> bool {
            match writer.write(block) {
                Ok(n) if n == block.len() => {
                    written += n as u64;
                    true
                }
                Ok(n) => {
                    failure = Some(io::Error::new(
                        io::ErrorKind::WriteZero,
                        format!("partial write: {} of {} bytes", n, block.len()),
                    ));
                    false
                }
                Err(err) => {
                    failure = Some(err);
                    false
                }
            }
        };
        let saved = self.bindings.save_as_copy(raw, flags.to_raw(), &mut sink);

        if let Some(err) = failure {
            return Err(PdfiumError::Io(err));
        }
        if !saved {
            return Err(PdfiumError::SaveFailed {
                reason: "FPDF_SaveAsCopy reported failure".to_string(),
            });
        }
        writer.flush()?;
        tracing::debug!(?doc, bytes = written, "document saved");
        Ok(written)
    }

    /// Save to a file, removing it again if the save fails.
    pub fn save_to_path<P: AsRef<Path>>(
        &mut self,
        doc: DocumentHandle,
        path: P,
        flags: SaveFlags,
    ) -> Result<u64> {
        let path = path.as_ref();
        self.doc_raw(doc)?;
        let mut file = std::fs::File::create(path)?;
        match self.save_to_writer(doc, &mut file, flags) {
            Ok(written) => Ok(written),
            Err(err) => {
                drop(file);
                if let Err(cleanup) = std::fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), "failed to remove partial save: {}", cleanup);
                }
                Err(err)
            }
        }
    }

    pub fn save_to_bytes(&mut self, doc: DocumentHandle, flags: SaveFlags) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.save_to_writer(doc, &mut bytes, flags)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_flags_raw() {
        assert_eq!(SaveFlags::default().to_raw(), 0);
        assert_eq!(SaveFlags::Incremental.to_raw(), 1);
        assert_eq!(SaveFlags::NoIncremental.to_raw(), 2);
        assert_eq!(SaveFlags::RemoveSecurity.to_raw(), 3);
    }

    #[test]
    fn test_close_finishes_when_a_child_close_fails() {
        use crate::handle::FormHandle;
        use crate::testing::{FakeBindings, FakeDocument};

        let bytes = FakeDocument::with_blank_pages(2, 100.0, 100.0).to_bytes();
        let mut pdfium = Pdfium::new(FakeBindings::new());
        let doc = pdfium.open_from_bytes(&bytes, None).unwrap();
        let first = pdfium.load_page(doc, 0).unwrap();
        let second = pdfium.load_page(doc, 1).unwrap();
        // A form the registry no longer knows about.
        if let Some(entry) = pdfium.documents.get_mut(doc) {
            entry.form = Some(FormHandle::new(0, 7));
        }

        pdfium.close_document(doc).unwrap();
        assert!(pdfium.page_count(doc).is_err());
        assert!(pdfium.page_size(first).is_err());
        assert!(pdfium.page_size(second).is_err());
        assert_eq!(pdfium.outstanding_buffers(), 0);
        assert_eq!(pdfium.bindings().live_documents(), 0);
        assert_eq!(pdfium.bindings().live_pages(), 0);
    }

    #[test]
    fn test_form_type_raw() {
        assert_eq!(FormType::from_raw(0), FormType::None);
        assert_eq!(FormType::from_raw(1), FormType::AcroForm);
        assert!(FormType::from_raw(2).has_forms());
        assert_eq!(FormType::from_raw(9), FormType::Other(9));
        assert!(!FormType::None.has_forms());
    }
}
