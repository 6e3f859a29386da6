//! Page load/close, geometry and page-level edits.

use crate::bindings::PdfiumBindings;
use crate::error::{PdfiumError, Result};
use crate::geometry::{PageBox, PageRect};
use crate::handle::{DocumentHandle, HandleKind, PageHandle};
use crate::marshal::read_bytes;
use crate::session::{PageEntry, Pdfium};
use crate::transform::{visible_box, PageTransform, Rotation, Viewport};

/// What `FPDFPage_Flatten` should bake into page content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlattenMode {
    /// Annotations and fields that are visible on screen.
    #[default]
    NormalDisplay,
    /// Annotations and fields that are printed.
    Print,
}

/// Outcome of flattening a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlattenOutcome {
    Flattened,
    NothingToDo,
}

impl<B: PdfiumBindings> Pdfium<B> {
    /// Load the page at `index`. If the document has a form environment the
    /// page is announced to it, and the matching close notification is sent
    /// by [`Pdfium::close_page`].
    pub fn load_page(&mut self, doc: DocumentHandle, index: usize) -> Result<PageHandle> {
        let raw_index = self.check_page_index(doc, index)?;
        let doc_raw = self.doc_raw(doc)?;
        let raw = self
            .bindings
            .load_page(doc_raw, raw_index)
            .ok_or_else(|| PdfiumError::call("FPDF_LoadPage"))?;
        Ok(self.register_page(doc, raw, index))
    }

    /// Insert a blank page and return it loaded.
    pub fn new_page(
        &mut self,
        doc: DocumentHandle,
        index: usize,
        width: f64,
        height: f64,
    ) -> Result<PageHandle> {
        let doc_raw = self.doc_raw(doc)?;
        if !(width > 0.0 && height > 0.0) {
            return Err(PdfiumError::InvalidArgument(format!(
                "page size {}x{}",
                width, height
            )));
        }
        let count = self.bindings.page_count(doc_raw).max(0) as usize;
        let index = index.min(count);
        let raw = self
            .bindings
            .new_page(doc_raw, index as i32, width, height)
            .ok_or_else(|| PdfiumError::call("FPDFPage_New"))?;
        self.shift_page_indices(doc, index, 1);
        Ok(self.register_page(doc, raw, index))
    }

    fn register_page(&mut self, doc: DocumentHandle, raw: B::Page, index: usize) -> PageHandle {
        let form = self
            .documents
            .get(doc)
            .and_then(|entry| entry.form)
            .and_then(|form| self.forms.get(form).map(|entry| (form, entry.raw)));
        if let Some((_, form_raw)) = form {
            self.bindings.form_on_after_load_page(raw, form_raw);
        }
        let page = self.pages.insert(PageEntry {
            raw,
            document: doc,
            index,
            form: form.map(|(handle, _)| handle),
        });
        tracing::debug!(?doc, ?page, index, "page loaded");
        page
    }

    /// Close a page, closing anything still open beneath it first.
    ///
    /// An open progressive render is closed and its surface dropped. Page
    /// objects owned by the page become stale but are not destroyed.
    pub fn close_page(&mut self, page: PageHandle) -> Result<()> {
        let raw = self.page_raw(page)?;

        if let Some(span) = self.renders.remove(&page) {
            tracing::warn!(?page, "closing progressive render left open on page close");
            if let Err(err) = self.release_span(raw, page, span) {
                tracing::warn!(?page, "failed to close render on page close: {}", err);
            }
        }
        for text in self.text_pages.handles_where(|entry| entry.page == page) {
            tracing::warn!(?page, ?text, "closing text page left open on page close");
            if let Err(err) = self.close_text_page(text) {
                tracing::warn!(?page, ?text, "failed to close text page on page close: {}", err);
            }
        }
        for (annot, entry) in self.annotations.drain_where(|entry| entry.page == page) {
            tracing::warn!(?page, ?annot, "closing annotation left open on page close");
            self.bindings.close_annotation(entry.raw);
        }
        for tree in self.struct_trees.handles_where(|entry| entry.page == page) {
            tracing::warn!(?page, ?tree, "closing structure tree left open on page close");
            if let Err(err) = self.close_struct_tree(tree) {
                tracing::warn!(?page, ?tree, "failed to close structure tree on page close: {}", err);
            }
        }
        self.links.forget_where(|owner| *owner == page);
        let owned = self
            .page_objects
            .drain_where(|entry| entry.page == Some(page))
            .len();

        let entry = self.pages.remove(page).ok_or(PdfiumError::InvalidHandle {
            kind: HandleKind::Page,
        })?;
        if let Some(form) = entry.form {
            match self.forms.get(form) {
                Some(form_entry) => self.bindings.form_on_before_close_page(raw, form_entry.raw),
                None => tracing::warn!(?page, ?form, "page outlived its form environment"),
            }
        }
        self.bindings.close_page(raw);
        tracing::debug!(?page, owned_objects = owned, "page closed");
        Ok(())
    }

    /// Zero-based index of the page within its document.
    pub fn page_index(&self, page: PageHandle) -> Result<usize> {
        Ok(self.pages.lookup(page)?.index)
    }

    pub fn page_document(&self, page: PageHandle) -> Result<DocumentHandle> {
        Ok(self.pages.lookup(page)?.document)
    }

    /// Width and height in points.
    pub fn page_size(&self, page: PageHandle) -> Result<(f32, f32)> {
        let raw = self.page_raw(page)?;
        Ok((self.bindings.page_width(raw), self.bindings.page_height(raw)))
    }

    pub fn page_width(&self, page: PageHandle) -> Result<f32> {
        Ok(self.page_size(page)?.0)
    }

    pub fn page_height(&self, page: PageHandle) -> Result<f32> {
        Ok(self.page_size(page)?.1)
    }

    pub fn page_rotation(&self, page: PageHandle) -> Result<Rotation> {
        let raw = self.page_raw(page)?;
        Ok(Rotation::from_quarter_turns(self.bindings.page_rotation(raw)))
    }

    pub fn set_page_rotation(&mut self, page: PageHandle, rotation: Rotation) -> Result<()> {
        let raw = self.page_raw(page)?;
        self.bindings.set_page_rotation(raw, rotation.quarter_turns());
        Ok(())
    }

    /// One of the page boundary boxes; `None` when the page does not define it.
    pub fn page_box(&self, page: PageHandle, which: PageBox) -> Result<Option<PageRect>> {
        let raw = self.page_raw(page)?;
        Ok(self.bindings.page_box(raw, which))
    }

    pub fn set_page_box(&mut self, page: PageHandle, which: PageBox, rect: PageRect) -> Result<()> {
        let raw = self.page_raw(page)?;
        self.bindings.set_page_box(raw, which, rect);
        Ok(())
    }

    pub fn media_box(&self, page: PageHandle) -> Result<Option<PageRect>> {
        self.page_box(page, PageBox::Media)
    }

    pub fn crop_box(&self, page: PageHandle) -> Result<Option<PageRect>> {
        self.page_box(page, PageBox::Crop)
    }

    /// Bake annotations and form fields into the page content.
    pub fn flatten_page(&mut self, page: PageHandle, mode: FlattenMode) -> Result<FlattenOutcome> {
        let raw = self.page_raw(page)?;
        let flags = match mode {
            FlattenMode::NormalDisplay => 0,
            FlattenMode::Print => 1,
        };
        match self.bindings.flatten_page(raw, flags) {
            1 => Ok(FlattenOutcome::Flattened),
            2 => Ok(FlattenOutcome::NothingToDo),
            _ => Err(PdfiumError::call("FPDFPage_Flatten")),
        }
    }

    /// Regenerate the content stream after object edits.
    pub fn generate_content(&mut self, page: PageHandle) -> Result<()> {
        let raw = self.page_raw(page)?;
        if self.bindings.generate_content(raw) {
            Ok(())
        } else {
            Err(PdfiumError::call("FPDFPage_GenerateContent"))
        }
    }

    /// Embedded thumbnail with filters decoded; empty when the page has none.
    pub fn decoded_thumbnail(&self, page: PageHandle) -> Result<Vec<u8>> {
        let raw = self.page_raw(page)?;
        read_bytes(|buf| self.bindings.decoded_thumbnail(raw, buf))
    }

    /// Embedded thumbnail stream as stored; empty when the page has none.
    pub fn raw_thumbnail(&self, page: PageHandle) -> Result<Vec<u8>> {
        let raw = self.page_raw(page)?;
        read_bytes(|buf| self.bindings.raw_thumbnail(raw, buf))
    }

    /// Map a device pixel to page space using the library's transform.
    ///
    /// `viewport` and `rotation` must be the ones used to render the page.
    pub fn device_to_page(
        &self,
        page: PageHandle,
        viewport: Viewport,
        rotation: Rotation,
        x: i32,
        y: i32,
    ) -> Result<(f64, f64)> {
        let raw = self.page_raw(page)?;
        self.bindings
            .device_to_page(raw, viewport, rotation.quarter_turns(), x, y)
            .ok_or_else(|| PdfiumError::call("FPDF_DeviceToPage"))
    }

    /// Map a page-space point to a device pixel using the library's transform.
    pub fn page_to_device(
        &self,
        page: PageHandle,
        viewport: Viewport,
        rotation: Rotation,
        x: f64,
        y: f64,
    ) -> Result<(i32, i32)> {
        let raw = self.page_raw(page)?;
        self.bindings
            .page_to_device(raw, viewport, rotation.quarter_turns(), x, y)
            .ok_or_else(|| PdfiumError::call("FPDF_PageToDevice"))
    }

    /// Pure transform for this page, usable without calling the library.
    ///
    /// Takes the page's own rotation and visible box into account, so it
    /// agrees with what the library renders for the same viewport and
    /// rotation.
    pub fn page_transform(
        &self,
        page: PageHandle,
        viewport: Viewport,
        rotation: Rotation,
    ) -> Result<PageTransform> {
        let page_rotation = self.page_rotation(page)?;
        let media = match self.media_box(page)? {
            Some(media) => media,
            None => {
                let (width, height) = self.page_size(page)?;
                if page_rotation.quarter_turns() % 2 == 1 {
                    PageRect::new(0.0, 0.0, height, width)
                } else {
                    PageRect::new(0.0, 0.0, width, height)
                }
            }
        };
        let bbox = visible_box(media, self.crop_box(page)?);
        Ok(PageTransform::for_page(bbox, page_rotation, viewport, rotation))
    }
}
