//! Text pages: extraction, character geometry, hit testing and web links.

use crate::bindings::PdfiumBindings;
use crate::error::{PdfiumError, Result};
use crate::geometry::{CharBox, PageRect};
use crate::handle::{HandleKind, PageHandle, TextPageHandle, WebLinksHandle};
use crate::marshal::{read_text_units, read_wide_string, WIDE_UNIT};
use crate::session::{Pdfium, TextPageEntry, WebLinksEntry};

fn to_index(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value).map_err(|_| PdfiumError::InvalidArgument(format!("{} {}", what, value)))
}

impl<B: PdfiumBindings> Pdfium<B> {
    pub fn load_text_page(&mut self, page: PageHandle) -> Result<TextPageHandle> {
        let page_raw = self.page_raw(page)?;
        let raw = self
            .bindings
            .load_text_page(page_raw)
            .ok_or_else(|| PdfiumError::call("FPDFText_LoadPage"))?;
        let text = self.text_pages.insert(TextPageEntry { raw, page });
        tracing::debug!(?page, ?text, "text page loaded");
        Ok(text)
    }

    /// Close a text page after any search sessions and link sets over it.
    pub fn close_text_page(&mut self, text: TextPageHandle) -> Result<()> {
        self.text_pages.lookup(text)?;
        for search in self.searches.handles_where(|entry| entry.text_page == text) {
            tracing::warn!(?text, ?search, "closing search left open on text page close");
            self.close_search(search)?;
        }
        for links in self.web_links.handles_where(|entry| entry.text_page == text) {
            tracing::warn!(?text, ?links, "closing web links left open on text page close");
            self.close_web_links(links)?;
        }
        let entry = self.text_pages.remove(text).ok_or(PdfiumError::InvalidHandle {
            kind: HandleKind::TextPage,
        })?;
        self.bindings.close_text_page(entry.raw);
        tracing::debug!(?text, "text page closed");
        Ok(())
    }

    pub fn char_count(&self, text: TextPageHandle) -> Result<usize> {
        let raw = self.text_raw(text)?;
        let count = self.bindings.count_chars(raw);
        usize::try_from(count).map_err(|_| PdfiumError::call("FPDFText_CountChars"))
    }

    /// All text on the page.
    pub fn text(&self, text: TextPageHandle) -> Result<String> {
        let count = self.char_count(text)?;
        self.text_range(text, 0, count)
    }

    /// `count` characters starting at `start`, clamped to the page.
    pub fn text_range(&self, text: TextPageHandle, start: usize, count: usize) -> Result<String> {
        let raw = self.text_raw(text)?;
        let total = self.char_count(text)?;
        if start >= total {
            return Ok(String::new());
        }
        let count = count.min(total - start);
        let start = to_index(start, "start")?;
        let units = to_index(count, "count")?;
        read_text_units(count, |buf| {
            self.bindings.get_text(raw, start, units, buf).max(0) as usize
        })
    }

    /// Box of one character as left, top, right, bottom in page space.
    pub fn char_box(&self, text: TextPageHandle, index: usize) -> Result<CharBox> {
        let raw = self.text_raw(text)?;
        let index = to_index(index, "char index")?;
        self.bindings
            .char_box(raw, index)
            .ok_or_else(|| PdfiumError::call("FPDFText_GetCharBox"))
    }

    /// Character under a page-space point, within the given tolerances.
    pub fn char_index_at(
        &self,
        text: TextPageHandle,
        x: f64,
        y: f64,
        x_tolerance: f64,
        y_tolerance: f64,
    ) -> Result<Option<usize>> {
        let raw = self.text_raw(text)?;
        match self
            .bindings
            .char_index_at_pos(raw, x, y, x_tolerance, y_tolerance)
        {
            -1 => Ok(None),
            index if index >= 0 => Ok(Some(index as usize)),
            _ => Err(PdfiumError::call("FPDFText_GetCharIndexAtPos")),
        }
    }

    /// Number of rectangles covering a character range. Must precede
    /// [`Pdfium::text_rect`] for the same range.
    pub fn text_rect_count(
        &mut self,
        text: TextPageHandle,
        start: usize,
        count: usize,
    ) -> Result<usize> {
        let raw = self.text_raw(text)?;
        let start = to_index(start, "start")?;
        let count = to_index(count, "count")?;
        Ok(self.bindings.count_rects(raw, start, count).max(0) as usize)
    }

    pub fn text_rect(&self, text: TextPageHandle, index: usize) -> Result<PageRect> {
        let raw = self.text_raw(text)?;
        let index = to_index(index, "rect index")?;
        self.bindings
            .get_rect(raw, index)
            .ok_or_else(|| PdfiumError::call("FPDFText_GetRect"))
    }

    /// All rectangles covering a character range.
    pub fn text_rects(
        &mut self,
        text: TextPageHandle,
        start: usize,
        count: usize,
    ) -> Result<Vec<PageRect>> {
        let rects = self.text_rect_count(text, start, count)?;
        (0..rects).map(|index| self.text_rect(text, index)).collect()
    }

    /// Detect URLs written as plain text on the page.
    pub fn load_web_links(&mut self, text: TextPageHandle) -> Result<WebLinksHandle> {
        let text_raw = self.text_raw(text)?;
        let raw = self
            .bindings
            .load_web_links(text_raw)
            .ok_or_else(|| PdfiumError::call("FPDFLink_LoadWebLinks"))?;
        Ok(self.web_links.insert(WebLinksEntry {
            raw,
            text_page: text,
        }))
    }

    pub fn close_web_links(&mut self, links: WebLinksHandle) -> Result<()> {
        let entry = self
            .web_links
            .remove(links)
            .ok_or(PdfiumError::InvalidHandle {
                kind: HandleKind::WebLinks,
            })?;
        self.bindings.close_web_links(entry.raw);
        Ok(())
    }

    pub fn web_link_count(&self, links: WebLinksHandle) -> Result<usize> {
        let raw = self.web_links.lookup(links)?.raw;
        Ok(self.bindings.count_web_links(raw).max(0) as usize)
    }

    pub fn web_link_url(&self, links: WebLinksHandle, index: usize) -> Result<String> {
        let raw = self.web_links.lookup(links)?.raw;
        let index = to_index(index, "link index")?;
        read_wide_string(|buf| {
            self.bindings.web_link_url(raw, index, buf).max(0) as usize * WIDE_UNIT
        })
    }
}
