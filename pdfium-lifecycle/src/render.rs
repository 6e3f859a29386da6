//! Rendering into caller-owned pixel surfaces.

use crate::bindings::{raw, PdfiumBindings};
use crate::error::{PdfiumError, Result};
use crate::geometry::Rgba;
use crate::handle::PageHandle;
use crate::progressive::RenderState;
use crate::session::Pdfium;
use crate::surface::{PixelFormat, PixelSurface};
use crate::transform::{Rotation, Viewport};

/// Render options mapped onto `FPDF_*` render flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderFlags {
    /// Draw annotation appearance streams (`FPDF_ANNOT`).
    pub annotations: bool,
    pub lcd_text: bool,
    pub grayscale: bool,
    pub printing: bool,
}

impl RenderFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_annotations(mut self, annotations: bool) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn with_lcd_text(mut self, lcd_text: bool) -> Self {
        self.lcd_text = lcd_text;
        self
    }

    pub fn with_grayscale(mut self, grayscale: bool) -> Self {
        self.grayscale = grayscale;
        self
    }

    pub fn with_printing(mut self, printing: bool) -> Self {
        self.printing = printing;
        self
    }

    /// Raw flag word for a surface of `format`.
    ///
    /// The library writes blue-first pixels; red-first surfaces get
    /// `FPDF_REVERSE_BYTE_ORDER` so the bytes land in caller order.
    pub fn to_raw(self, format: PixelFormat) -> i32 {
        let mut flags = 0;
        if self.annotations {
            flags |= raw::FPDF_ANNOT;
        }
        if self.lcd_text {
            flags |= raw::FPDF_LCD_TEXT;
        }
        if self.grayscale {
            flags |= raw::FPDF_GRAYSCALE;
        }
        if self.printing {
            flags |= raw::FPDF_PRINTING;
        }
        if format.needs_byte_swap() {
            flags |= raw::FPDF_REVERSE_BYTE_ORDER;
        }
        flags
    }
}

/// Clip `viewport` to the surface, returning (left, top, width, height).
fn clip(viewport: Viewport, width: u32, height: u32) -> Option<(i32, i32, i32, i32)> {
    let right = viewport.x.saturating_add(viewport.width).min(width as i32);
    let bottom = viewport.y.saturating_add(viewport.height).min(height as i32);
    let left = viewport.x.max(0);
    let top = viewport.y.max(0);
    if right <= left || bottom <= top {
        return None;
    }
    Some((left, top, right - left, bottom - top))
}

impl<B: PdfiumBindings> Pdfium<B> {
    /// Render `page` into `surface` within `viewport`.
    ///
    /// The surface must be a 4-byte format; anything else is rejected before
    /// the library is called. The target region is filled opaque white first.
    /// Fails while a progressive render span is open on the same page.
    pub fn render_into(
        &mut self,
        page: PageHandle,
        surface: &mut PixelSurface,
        viewport: Viewport,
        rotation: Rotation,
        flags: RenderFlags,
    ) -> Result<()> {
        let raw_page = self.page_raw(page)?;
        let state = self.render_state(page);
        if state != RenderState::Idle {
            return Err(PdfiumError::InvalidRenderState {
                state,
                operation: "render",
            });
        }
        surface.ensure_renderable()?;

        let bitmap = self.prepare_bitmap(surface, viewport)?;
        self.bindings.render_page_bitmap(
            bitmap,
            raw_page,
            viewport,
            rotation.quarter_turns(),
            flags.to_raw(surface.format()),
        );
        self.bindings.destroy_bitmap(bitmap);
        tracing::trace!(?page, ?viewport, ?rotation, "rendered page");
        Ok(())
    }

    /// Wrap the surface memory in a library bitmap and clear the target region.
    ///
    /// The caller destroys the bitmap before the surface can move.
    pub(crate) fn prepare_bitmap(
        &mut self,
        surface: &mut PixelSurface,
        viewport: Viewport,
    ) -> Result<B::Bitmap> {
        let bitmap = self.wrap_surface(surface)?;
        if let Some((left, top, w, h)) = clip(viewport, surface.width(), surface.height()) {
            if !self
                .bindings
                .fill_rect(bitmap, left, top, w, h, Rgba::WHITE.to_argb())
            {
                self.bindings.destroy_bitmap(bitmap);
                return Err(PdfiumError::call("FPDFBitmap_FillRect"));
            }
        }
        Ok(bitmap)
    }

    /// Wrap the surface memory in a library bitmap without touching pixels.
    pub(crate) fn wrap_surface(&mut self, surface: &mut PixelSurface) -> Result<B::Bitmap> {
        let (width, height, stride) = (surface.width(), surface.height(), surface.stride());
        let stride = i32::try_from(stride).map_err(|_| PdfiumError::InvalidSurface {
            reason: format!("stride {} too large", stride),
        })?;
        // SAFETY: the surface holds `stride * height` bytes and is borrowed (or
        // owned by a render span) until the bitmap is destroyed.
        unsafe {
            self.bindings.create_external_bitmap(
                width as i32,
                height as i32,
                raw::FPDFBITMAP_BGRA,
                surface.as_mut_ptr(),
                stride,
            )
        }
        .ok_or_else(|| PdfiumError::call("FPDFBitmap_CreateEx"))
    }
}
