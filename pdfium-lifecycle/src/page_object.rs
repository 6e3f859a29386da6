//! Page content objects and the fonts they are drawn with.
//!
//! A created object belongs to the session until it is inserted into a page,
//! after which the page owns it. Only detached objects may be destroyed;
//! destroying an inserted one would free memory the page still points at.

use crate::annotation::check;
use crate::bindings::PdfiumBindings;
use crate::error::{PdfiumError, Result};
use crate::geometry::{PageRect, Rgba};
use crate::handle::{DocumentHandle, FontHandle, HandleKind, PageHandle, PageObjectHandle};
use crate::marshal::{to_c_string, to_wide};
use crate::session::{FontEntry, PageObjectEntry, Pdfium};
use crate::surface::{PixelFormat, PixelSurface};
use crate::transform::Matrix;

/// `FPDF_PAGEOBJ_*` kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageObjectType {
    Unknown,
    Text,
    Path,
    Image,
    Shading,
    Form,
}

impl PageObjectType {
    pub fn from_raw(value: i32) -> Self {
        match value {
            1 => PageObjectType::Text,
            2 => PageObjectType::Path,
            3 => PageObjectType::Image,
            4 => PageObjectType::Shading,
            5 => PageObjectType::Form,
            _ => PageObjectType::Unknown,
        }
    }
}

/// Fill rule for path objects (`FPDF_FILLMODE_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillMode {
    #[default]
    None,
    Alternate,
    Winding,
}

impl FillMode {
    fn to_raw(self) -> i32 {
        match self {
            FillMode::None => 0,
            FillMode::Alternate => 1,
            FillMode::Winding => 2,
        }
    }
}

impl<B: PdfiumBindings> Pdfium<B> {
    pub fn page_object_count(&self, page: PageHandle) -> Result<usize> {
        let raw = self.page_raw(page)?;
        Ok(self.bindings.page_object_count(raw).max(0) as usize)
    }

    /// Object `index` of a page. The handle is owned by the page and goes
    /// stale when the page closes.
    pub fn page_object(&mut self, page: PageHandle, index: usize) -> Result<PageObjectHandle> {
        let (page_raw, doc, _) = self.page_doc(page)?;
        let count = self.page_object_count(page)?;
        if index >= count {
            return Err(PdfiumError::InvalidArgument(format!(
                "page object {} of {}",
                index, count
            )));
        }
        let raw = self
            .bindings
            .get_page_object(page_raw, index as i32)
            .ok_or_else(|| PdfiumError::call("FPDFPage_GetObject"))?;
        let existing = self
            .page_objects
            .handles_where(|entry| entry.raw == raw && entry.page == Some(page));
        if let Some(&object) = existing.first() {
            return Ok(object);
        }
        Ok(self.page_objects.insert(PageObjectEntry {
            raw,
            document: doc,
            page: Some(page),
        }))
    }

    pub fn page_object_type(&self, object: PageObjectHandle) -> Result<PageObjectType> {
        let raw = self.object_raw(object)?;
        Ok(PageObjectType::from_raw(self.bindings.page_object_type(raw)))
    }

    /// Page the object is inserted into, `None` while detached.
    pub fn page_object_page(&self, object: PageObjectHandle) -> Result<Option<PageHandle>> {
        Ok(self.page_objects.lookup(object)?.page)
    }

    fn register_detached(&mut self, doc: DocumentHandle, raw: B::PageObject) -> PageObjectHandle {
        let object = self.page_objects.insert(PageObjectEntry {
            raw,
            document: doc,
            page: None,
        });
        tracing::trace!(?doc, ?object, "page object created");
        object
    }

    /// Text object in one of the 14 standard fonts, named like `Helvetica`.
    pub fn new_text_object(
        &mut self,
        doc: DocumentHandle,
        font: &str,
        size: f32,
    ) -> Result<PageObjectHandle> {
        let doc_raw = self.doc_raw(doc)?;
        let font = to_c_string(font)?;
        let raw = self
            .bindings
            .new_text_object(doc_raw, &font, size)
            .ok_or_else(|| PdfiumError::call("FPDFPageObj_NewTextObj"))?;
        Ok(self.register_detached(doc, raw))
    }

    /// Text object drawn with a font loaded into the same document.
    pub fn new_text_object_with_font(
        &mut self,
        doc: DocumentHandle,
        font: FontHandle,
        size: f32,
    ) -> Result<PageObjectHandle> {
        let doc_raw = self.doc_raw(doc)?;
        let entry = self.fonts.lookup(font)?;
        if entry.document != doc {
            return Err(PdfiumError::ForeignHandle {
                kind: HandleKind::Font,
                parent: HandleKind::Document,
            });
        }
        let raw = self
            .bindings
            .create_text_object(doc_raw, entry.raw, size)
            .ok_or_else(|| PdfiumError::call("FPDFPageObj_CreateTextObj"))?;
        Ok(self.register_detached(doc, raw))
    }

    pub fn set_object_text(&mut self, object: PageObjectHandle, text: &str) -> Result<()> {
        let raw = self.object_raw(object)?;
        let text = to_wide(text);
        check(self.bindings.set_text(raw, &text), "FPDFText_SetText")
    }

    /// Path object starting at (`x`, `y`).
    pub fn new_path(&mut self, doc: DocumentHandle, x: f32, y: f32) -> Result<PageObjectHandle> {
        self.doc_raw(doc)?;
        let raw = self
            .bindings
            .new_path(x, y)
            .ok_or_else(|| PdfiumError::call("FPDFPageObj_CreateNewPath"))?;
        Ok(self.register_detached(doc, raw))
    }

    pub fn path_move_to(&mut self, object: PageObjectHandle, x: f32, y: f32) -> Result<()> {
        let raw = self.object_raw(object)?;
        check(self.bindings.path_move_to(raw, x, y), "FPDFPath_MoveTo")
    }

    pub fn path_line_to(&mut self, object: PageObjectHandle, x: f32, y: f32) -> Result<()> {
        let raw = self.object_raw(object)?;
        check(self.bindings.path_line_to(raw, x, y), "FPDFPath_LineTo")
    }

    /// Cubic curve through two control points to (`x3`, `y3`).
    #[allow(clippy::too_many_arguments)]
    pub fn path_bezier_to(
        &mut self,
        object: PageObjectHandle,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
    ) -> Result<()> {
        let raw = self.object_raw(object)?;
        check(
            self.bindings.path_bezier_to(raw, x1, y1, x2, y2, x3, y3),
            "FPDFPath_BezierTo",
        )
    }

    pub fn path_close(&mut self, object: PageObjectHandle) -> Result<()> {
        let raw = self.object_raw(object)?;
        check(self.bindings.path_close(raw), "FPDFPath_Close")
    }

    pub fn set_path_draw_mode(
        &mut self,
        object: PageObjectHandle,
        fill: FillMode,
        stroke: bool,
    ) -> Result<()> {
        let raw = self.object_raw(object)?;
        check(
            self.bindings.path_set_draw_mode(raw, fill.to_raw(), stroke),
            "FPDFPath_SetDrawMode",
        )
    }

    pub fn set_stroke_width(&mut self, object: PageObjectHandle, width: f32) -> Result<()> {
        if !width.is_finite() || width < 0.0 {
            return Err(PdfiumError::InvalidArgument(format!("stroke width {}", width)));
        }
        let raw = self.object_raw(object)?;
        check(
            self.bindings.set_stroke_width(raw, width),
            "FPDFPageObj_SetStrokeWidth",
        )
    }

    /// Image object holding a copy of `surface`.
    ///
    /// The library copies the pixels while the bitmap is set, so the
    /// temporary bitmap is destroyed before returning.
    pub fn new_image_object(
        &mut self,
        doc: DocumentHandle,
        surface: &PixelSurface,
    ) -> Result<PageObjectHandle> {
        let doc_raw = self.doc_raw(doc)?;
        surface.ensure_renderable()?;
        let mut pixels = to_bgra(surface)?;

        let raw = self
            .bindings
            .new_image_object(doc_raw)
            .ok_or_else(|| PdfiumError::call("FPDFPageObj_NewImageObj"))?;
        let bitmap = match self.wrap_surface(&mut pixels) {
            Ok(bitmap) => bitmap,
            Err(err) => {
                self.bindings.destroy_object(raw);
                return Err(err);
            }
        };
        let ok = self.bindings.image_set_bitmap(raw, bitmap);
        self.bindings.destroy_bitmap(bitmap);
        if !ok {
            self.bindings.destroy_object(raw);
            return Err(PdfiumError::call("FPDFImageObj_SetBitmap"));
        }
        Ok(self.register_detached(doc, raw))
    }

    /// Hand a detached object to `page`, which owns it from then on.
    pub fn insert_page_object(&mut self, page: PageHandle, object: PageObjectHandle) -> Result<()> {
        let (page_raw, doc, _) = self.page_doc(page)?;
        let entry = self.page_objects.lookup_mut(object)?;
        if entry.document != doc {
            return Err(PdfiumError::ForeignHandle {
                kind: HandleKind::PageObject,
                parent: HandleKind::Document,
            });
        }
        if let Some(owner) = entry.page {
            return Err(PdfiumError::InvalidArgument(format!(
                "{:?} is already inserted into {:?}",
                object, owner
            )));
        }
        self.bindings.insert_object(page_raw, entry.raw);
        entry.page = Some(page);
        Ok(())
    }

    /// Take an object back from `page`. The caller owns it again and must
    /// destroy it or insert it elsewhere.
    pub fn remove_page_object(&mut self, page: PageHandle, object: PageObjectHandle) -> Result<()> {
        let page_raw = self.page_raw(page)?;
        let entry = self.page_objects.lookup_mut(object)?;
        if entry.page != Some(page) {
            return Err(PdfiumError::ForeignHandle {
                kind: HandleKind::PageObject,
                parent: HandleKind::Page,
            });
        }
        if !self.bindings.remove_object(page_raw, entry.raw) {
            return Err(PdfiumError::call("FPDFPage_RemoveObject"));
        }
        entry.page = None;
        Ok(())
    }

    /// Free a detached object.
    pub fn destroy_page_object(&mut self, object: PageObjectHandle) -> Result<()> {
        if let Some(page) = self.page_objects.lookup(object)?.page {
            return Err(PdfiumError::InvalidArgument(format!(
                "{:?} is owned by {:?}; remove it first",
                object, page
            )));
        }
        if let Some(entry) = self.page_objects.remove(object) {
            self.bindings.destroy_object(entry.raw);
        }
        Ok(())
    }

    pub fn set_fill_color(&mut self, object: PageObjectHandle, color: Rgba) -> Result<()> {
        let raw = self.object_raw(object)?;
        check(self.bindings.set_fill_color(raw, color), "FPDFPageObj_SetFillColor")
    }

    pub fn set_stroke_color(&mut self, object: PageObjectHandle, color: Rgba) -> Result<()> {
        let raw = self.object_raw(object)?;
        check(
            self.bindings.set_stroke_color(raw, color),
            "FPDFPageObj_SetStrokeColor",
        )
    }

    pub fn fill_color(&self, object: PageObjectHandle) -> Result<Option<Rgba>> {
        let raw = self.object_raw(object)?;
        Ok(self.bindings.fill_color(raw))
    }

    pub fn stroke_color(&self, object: PageObjectHandle) -> Result<Option<Rgba>> {
        let raw = self.object_raw(object)?;
        Ok(self.bindings.stroke_color(raw))
    }

    pub fn transform_page_object(&mut self, object: PageObjectHandle, matrix: Matrix) -> Result<()> {
        let raw = self.object_raw(object)?;
        self.bindings.transform_object(raw, matrix);
        Ok(())
    }

    pub fn page_object_bounds(&self, object: PageObjectHandle) -> Result<PageRect> {
        let raw = self.object_raw(object)?;
        self.bindings
            .object_bounds(raw)
            .ok_or_else(|| PdfiumError::call("FPDFPageObj_GetBounds"))
    }

    /// Load one of the 14 standard fonts into `doc`.
    pub fn load_standard_font(&mut self, doc: DocumentHandle, name: &str) -> Result<FontHandle> {
        let doc_raw = self.doc_raw(doc)?;
        let name_c = to_c_string(name)?;
        let raw = self
            .bindings
            .load_standard_font(doc_raw, &name_c)
            .ok_or_else(|| PdfiumError::InvalidArgument(format!("unknown standard font {}", name)))?;
        let font = self.fonts.insert(FontEntry { raw, document: doc });
        tracing::debug!(?doc, ?font, name, "font loaded");
        Ok(font)
    }

    pub fn close_font(&mut self, font: FontHandle) -> Result<()> {
        let entry = self.fonts.remove(font).ok_or(PdfiumError::InvalidHandle {
            kind: HandleKind::Font,
        })?;
        self.bindings.close_font(entry.raw);
        Ok(())
    }
}

/// Blue-first copy of a 4-byte surface.
fn to_bgra(surface: &PixelSurface) -> Result<PixelSurface> {
    let mut pixels = surface.pixels().to_vec();
    if surface.format().needs_byte_swap() {
        for y in 0..surface.height() as usize {
            let row = y * surface.stride();
            for px in pixels[row..row + surface.width() as usize * 4].chunks_exact_mut(4) {
                px.swap(0, 2);
            }
        }
    }
    PixelSurface::from_pixels(
        surface.width(),
        surface.height(),
        surface.stride(),
        PixelFormat::Bgra8888,
        pixels,
    )
}
