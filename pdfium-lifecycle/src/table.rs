//! Flat handle table over a [`Pdfium`] session.
//!
//! Every operation takes and returns plain `u64` handles and reports failure
//! with a sentinel instead of an error: `0` for handles, `false` for
//! actions, `-1` for counts and indices, an empty string or vector for
//! variable-length data and `None` for geometry. A handle of the wrong kind,
//! a closed handle or a stale generation decodes to nothing and the call
//! returns its sentinel without reaching the library. Nothing here panics.

use crate::annotation::{AnnotationSubtype, AppearanceMode, ColorType};
use crate::bindings::PdfiumBindings;
use crate::document::SaveFlags;
use crate::error::{LoadError, Result};
use crate::form::{FieldType, Modifiers};
use crate::geometry::{CharBox, PageBox, PageRect, PointF, QuadPoints, Rgba};
use crate::handle::{Handle, HandleType};
use crate::page::FlattenMode;
use crate::page_object::FillMode;
use crate::progressive::{PauseFn, RenderStatus};
use crate::render::RenderFlags;
use crate::search::SearchOptions;
use crate::session::Pdfium;
use crate::surface::PixelSurface;
use crate::transform::{Matrix, Rotation, Viewport};
use chrono::{DateTime, FixedOffset};
use std::path::Path;

fn handle<K: HandleType>(raw: u64) -> Option<Handle<K>> {
    Handle::from_raw(raw)
}

fn raw_of<K: HandleType>(handle: Option<Handle<K>>) -> u64 {
    handle.map_or(0, Handle::to_raw)
}

fn count(value: Option<usize>) -> i64 {
    value.map_or(-1, |n| n as i64)
}

/// Sentinel-returning facade for callers that cannot hold typed handles.
pub struct HandleTable<B: PdfiumBindings> {
    session: Pdfium<B>,
}

impl<B: PdfiumBindings> HandleTable<B> {
    /// Initialise the library (if first) and open an empty table.
    pub fn new(bindings: B) -> Self {
        Self::from_session(Pdfium::new(bindings))
    }

    pub fn from_session(session: Pdfium<B>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Pdfium<B> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Pdfium<B> {
        &mut self.session
    }

    /// Hand the session back. Dropping it shuts the library down if this
    /// was the last one.
    pub fn into_session(self) -> Pdfium<B> {
        self.session
    }

    fn call<K: HandleType, T>(
        &self,
        raw: u64,
        operation: &'static str,
        f: impl FnOnce(&Pdfium<B>, Handle<K>) -> Result<T>,
    ) -> Option<T> {
        let Some(handle) = handle::<K>(raw) else {
            tracing::trace!(operation, raw, kind = %K::KIND, "undecodable handle");
            return None;
        };
        settle(operation, f(&self.session, handle))
    }

    fn call_mut<K: HandleType, T>(
        &mut self,
        raw: u64,
        operation: &'static str,
        f: impl FnOnce(&mut Pdfium<B>, Handle<K>) -> Result<T>,
    ) -> Option<T> {
        let Some(handle) = handle::<K>(raw) else {
            tracing::trace!(operation, raw, kind = %K::KIND, "undecodable handle");
            return None;
        };
        settle(operation, f(&mut self.session, handle))
    }

    fn call2_mut<K: HandleType, L: HandleType, T>(
        &mut self,
        first: u64,
        second: u64,
        operation: &'static str,
        f: impl FnOnce(&mut Pdfium<B>, Handle<K>, Handle<L>) -> Result<T>,
    ) -> Option<T> {
        let (Some(a), Some(b)) = (handle::<K>(first), handle::<L>(second)) else {
            tracing::trace!(operation, first, second, "undecodable handle");
            return None;
        };
        settle(operation, f(&mut self.session, a, b))
    }

    fn call2<K: HandleType, L: HandleType, T>(
        &self,
        first: u64,
        second: u64,
        operation: &'static str,
        f: impl FnOnce(&Pdfium<B>, Handle<K>, Handle<L>) -> Result<T>,
    ) -> Option<T> {
        let (Some(a), Some(b)) = (handle::<K>(first), handle::<L>(second)) else {
            tracing::trace!(operation, first, second, "undecodable handle");
            return None;
        };
        settle(operation, f(&self.session, a, b))
    }

    // Documents

    pub fn open_from_bytes(&mut self, bytes: &[u8], password: Option<&str>) -> u64 {
        raw_of(settle("open_from_bytes", self.session.open_from_bytes(bytes, password)))
    }

    #[cfg(unix)]
    pub fn open_from_descriptor(
        &mut self,
        fd: std::os::fd::BorrowedFd<'_>,
        password: Option<&str>,
    ) -> u64 {
        raw_of(settle(
            "open_from_descriptor",
            self.session.open_from_descriptor(fd, password),
        ))
    }

    pub fn open_from_path(&mut self, path: impl AsRef<Path>, password: Option<&str>) -> u64 {
        raw_of(settle("open_from_path", self.session.open_from_path(path, password)))
    }

    pub fn create_document(&mut self) -> u64 {
        raw_of(settle("create_document", self.session.create_document()))
    }

    /// Reason the last open failed.
    pub fn last_error(&self) -> LoadError {
        self.session.last_error()
    }

    pub fn close_document(&mut self, doc: u64) -> bool {
        self.call_mut(doc, "close_document", |s, doc| s.close_document(doc))
            .is_some()
    }

    pub fn page_count(&self, doc: u64) -> i64 {
        count(self.call(doc, "page_count", |s, doc| s.page_count(doc)))
    }

    pub fn metadata(&self, doc: u64, tag: &str) -> String {
        self.call(doc, "metadata", |s, doc| s.metadata(doc, tag))
            .unwrap_or_default()
    }

    pub fn page_label(&self, doc: u64, index: usize) -> String {
        self.call(doc, "page_label", |s, doc| s.page_label(doc, index))
            .unwrap_or_default()
    }

    pub fn page_size_by_index(&self, doc: u64, index: usize) -> Option<(f64, f64)> {
        self.call(doc, "page_size_by_index", |s, doc| s.page_size_by_index(doc, index))
    }

    /// Pages imported, or -1.
    pub fn import_pages(&mut self, dest: u64, src: u64, range: Option<&str>, insert_at: usize) -> i64 {
        count(self.call2_mut(dest, src, "import_pages", |s, dest, src| {
            s.import_pages(dest, src, range, insert_at)
        }))
    }

    pub fn copy_viewer_preferences(&mut self, dest: u64, src: u64) -> bool {
        self.call2_mut(dest, src, "copy_viewer_preferences", |s, dest, src| {
            s.copy_viewer_preferences(dest, src)
        })
        .is_some()
    }

    pub fn delete_page(&mut self, doc: u64, index: usize) -> bool {
        self.call_mut(doc, "delete_page", |s, doc| s.delete_page(doc, index))
            .is_some()
    }

    pub fn javascript_action_count(&self, doc: u64) -> i64 {
        count(self.call(doc, "javascript_action_count", |s, doc| {
            s.javascript_action_count(doc)
        }))
    }

    /// Serialized document, empty on failure.
    pub fn save_to_bytes(&mut self, doc: u64, flags: SaveFlags) -> Vec<u8> {
        self.call_mut(doc, "save_to_bytes", |s, doc| s.save_to_bytes(doc, flags))
            .unwrap_or_default()
    }

    pub fn save_to_path(&mut self, doc: u64, path: impl AsRef<Path>, flags: SaveFlags) -> bool {
        self.call_mut(doc, "save_to_path", |s, doc| s.save_to_path(doc, path, flags))
            .is_some()
    }

    pub fn save_to_writer<W: std::io::Write>(&mut self, doc: u64, writer: &mut W, flags: SaveFlags) -> bool {
        self.call_mut(doc, "save_to_writer", |s, doc| s.save_to_writer(doc, writer, flags))
            .is_some()
    }

    // Pages

    pub fn load_page(&mut self, doc: u64, index: usize) -> u64 {
        raw_of(self.call_mut(doc, "load_page", |s, doc| s.load_page(doc, index)))
    }

    pub fn new_page(&mut self, doc: u64, index: usize, width: f64, height: f64) -> u64 {
        raw_of(self.call_mut(doc, "new_page", |s, doc| s.new_page(doc, index, width, height)))
    }

    pub fn close_page(&mut self, page: u64) -> bool {
        self.call_mut(page, "close_page", |s, page| s.close_page(page))
            .is_some()
    }

    pub fn page_size(&self, page: u64) -> Option<(f32, f32)> {
        self.call(page, "page_size", |s, page| s.page_size(page))
    }

    /// Quarter turns clockwise, or -1.
    pub fn page_rotation(&self, page: u64) -> i32 {
        self.call(page, "page_rotation", |s, page| s.page_rotation(page))
            .map_or(-1, Rotation::quarter_turns)
    }

    pub fn set_page_rotation(&mut self, page: u64, quarter_turns: i32) -> bool {
        let rotation = Rotation::from_quarter_turns(quarter_turns);
        self.call_mut(page, "set_page_rotation", |s, page| {
            s.set_page_rotation(page, rotation)
        })
        .is_some()
    }

    pub fn page_box(&self, page: u64, which: PageBox) -> Option<PageRect> {
        self.call(page, "page_box", |s, page| s.page_box(page, which))
            .flatten()
    }

    pub fn set_page_box(&mut self, page: u64, which: PageBox, rect: PageRect) -> bool {
        self.call_mut(page, "set_page_box", |s, page| s.set_page_box(page, which, rect))
            .is_some()
    }

    pub fn flatten_page(&mut self, page: u64, mode: FlattenMode) -> bool {
        self.call_mut(page, "flatten_page", |s, page| s.flatten_page(page, mode))
            .is_some()
    }

    pub fn generate_content(&mut self, page: u64) -> bool {
        self.call_mut(page, "generate_content", |s, page| s.generate_content(page))
            .is_some()
    }

    pub fn decoded_thumbnail(&self, page: u64) -> Vec<u8> {
        self.call(page, "decoded_thumbnail", |s, page| s.decoded_thumbnail(page))
            .unwrap_or_default()
    }

    pub fn raw_thumbnail(&self, page: u64) -> Vec<u8> {
        self.call(page, "raw_thumbnail", |s, page| s.raw_thumbnail(page))
            .unwrap_or_default()
    }

    pub fn device_to_page(
        &self,
        page: u64,
        viewport: Viewport,
        rotation: Rotation,
        x: i32,
        y: i32,
    ) -> Option<(f64, f64)> {
        self.call(page, "device_to_page", |s, page| {
            s.device_to_page(page, viewport, rotation, x, y)
        })
    }

    pub fn page_to_device(
        &self,
        page: u64,
        viewport: Viewport,
        rotation: Rotation,
        x: f64,
        y: f64,
    ) -> Option<(i32, i32)> {
        self.call(page, "page_to_device", |s, page| {
            s.page_to_device(page, viewport, rotation, x, y)
        })
    }

    // Rendering

    pub fn render_into(
        &mut self,
        page: u64,
        surface: &mut PixelSurface,
        viewport: Viewport,
        rotation: Rotation,
        flags: RenderFlags,
    ) -> bool {
        self.call_mut(page, "render_into", |s, page| {
            s.render_into(page, surface, viewport, rotation, flags)
        })
        .is_some()
    }

    /// Start a progressive render. `Failed` also covers a bad handle or a
    /// surface the renderer rejects; the surface is dropped in that case.
    pub fn start_render(
        &mut self,
        page: u64,
        surface: PixelSurface,
        viewport: Viewport,
        rotation: Rotation,
        flags: RenderFlags,
        pause: Option<PauseFn>,
    ) -> RenderStatus {
        self.call_mut(page, "start_render", |s, page| {
            s.start_render(page, surface, viewport, rotation, flags, pause)
        })
        .unwrap_or(RenderStatus::Failed)
    }

    pub fn continue_render(&mut self, page: u64) -> RenderStatus {
        self.call_mut(page, "continue_render", |s, page| s.continue_render(page))
            .unwrap_or(RenderStatus::Failed)
    }

    pub fn close_render(&mut self, page: u64) -> Option<PixelSurface> {
        self.call_mut(page, "close_render", |s, page| s.close_render(page))
    }

    // Text and search

    pub fn load_text_page(&mut self, page: u64) -> u64 {
        raw_of(self.call_mut(page, "load_text_page", |s, page| s.load_text_page(page)))
    }

    pub fn close_text_page(&mut self, text: u64) -> bool {
        self.call_mut(text, "close_text_page", |s, text| s.close_text_page(text))
            .is_some()
    }

    pub fn char_count(&self, text: u64) -> i64 {
        count(self.call(text, "char_count", |s, text| s.char_count(text)))
    }

    pub fn text_range(&self, text: u64, start: usize, len: usize) -> String {
        self.call(text, "text_range", |s, text| s.text_range(text, start, len))
            .unwrap_or_default()
    }

    pub fn char_box(&self, text: u64, index: usize) -> Option<CharBox> {
        self.call(text, "char_box", |s, text| s.char_box(text, index))
    }

    /// Character under a point, or -1.
    pub fn char_index_at(&self, text: u64, x: f64, y: f64, x_tolerance: f64, y_tolerance: f64) -> i64 {
        count(
            self.call(text, "char_index_at", |s, text| {
                s.char_index_at(text, x, y, x_tolerance, y_tolerance)
            })
            .flatten(),
        )
    }

    pub fn text_rects(&mut self, text: u64, start: usize, len: usize) -> Vec<PageRect> {
        self.call_mut(text, "text_rects", |s, text| s.text_rects(text, start, len))
            .unwrap_or_default()
    }

    pub fn load_web_links(&mut self, text: u64) -> u64 {
        raw_of(self.call_mut(text, "load_web_links", |s, text| s.load_web_links(text)))
    }

    pub fn web_link_urls(&self, links: u64) -> Vec<String> {
        self.call(links, "web_link_urls", |s, links| {
            (0..s.web_link_count(links)?)
                .map(|index| s.web_link_url(links, index))
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn close_web_links(&mut self, links: u64) -> bool {
        self.call_mut(links, "close_web_links", |s, links| s.close_web_links(links))
            .is_some()
    }

    pub fn start_search(&mut self, text: u64, query: &str, options: SearchOptions) -> u64 {
        raw_of(self.call_mut(text, "start_search", |s, text| {
            s.start_search(text, query, options)
        }))
    }

    pub fn find_next(&mut self, search: u64) -> bool {
        self.call_mut(search, "find_next", |s, search| s.find_next(search))
            .unwrap_or(false)
    }

    pub fn find_prev(&mut self, search: u64) -> bool {
        self.call_mut(search, "find_prev", |s, search| s.find_prev(search))
            .unwrap_or(false)
    }

    /// Start of the current match, or -1 before the first.
    pub fn search_result_index(&self, search: u64) -> i64 {
        count(
            self.call(search, "search_result_index", |s, search| {
                s.search_result_index(search)
            })
            .flatten(),
        )
    }

    pub fn search_result_count(&self, search: u64) -> i64 {
        count(self.call(search, "search_result_count", |s, search| {
            s.search_result_count(search)
        }))
    }

    pub fn close_search(&mut self, search: u64) -> bool {
        self.call_mut(search, "close_search", |s, search| s.close_search(search))
            .is_some()
    }

    // Navigation

    /// First child of `parent`, or the first top-level bookmark when
    /// `parent` is 0.
    pub fn first_bookmark(&mut self, doc: u64, parent: u64) -> u64 {
        let parent = if parent == 0 {
            None
        } else {
            match handle(parent) {
                Some(parent) => Some(parent),
                None => return 0,
            }
        };
        raw_of(
            self.call_mut(doc, "first_bookmark", |s, doc| s.first_bookmark(doc, parent))
                .flatten(),
        )
    }

    pub fn next_bookmark(&mut self, bookmark: u64) -> u64 {
        raw_of(
            self.call_mut(bookmark, "next_bookmark", |s, bookmark| s.next_bookmark(bookmark))
                .flatten(),
        )
    }

    pub fn bookmark_title(&self, bookmark: u64) -> String {
        self.call(bookmark, "bookmark_title", |s, bookmark| s.bookmark_title(bookmark))
            .unwrap_or_default()
    }

    pub fn find_bookmark(&mut self, doc: u64, title: &str) -> u64 {
        raw_of(
            self.call_mut(doc, "find_bookmark", |s, doc| s.find_bookmark(doc, title))
                .flatten(),
        )
    }

    pub fn bookmark_page_index(&self, bookmark: u64) -> i64 {
        count(
            self.call(bookmark, "bookmark_page_index", |s, bookmark| {
                s.bookmark_page_index(bookmark)
            })
            .flatten(),
        )
    }

    pub fn bookmark_action(&mut self, bookmark: u64) -> u64 {
        raw_of(
            self.call_mut(bookmark, "bookmark_action", |s, bookmark| {
                s.bookmark_action(bookmark)
            })
            .flatten(),
        )
    }

    pub fn link_at_point(&mut self, page: u64, x: f64, y: f64) -> u64 {
        raw_of(
            self.call_mut(page, "link_at_point", |s, page| s.link_at_point(page, x, y))
                .flatten(),
        )
    }

    pub fn annotation_link(&mut self, annot: u64) -> u64 {
        raw_of(
            self.call_mut(annot, "annotation_link", |s, annot| s.annotation_link(annot))
                .flatten(),
        )
    }

    pub fn link_page_index(&self, link: u64) -> i64 {
        count(
            self.call(link, "link_page_index", |s, link| s.link_page_index(link))
                .flatten(),
        )
    }

    pub fn link_uri(&self, link: u64) -> String {
        self.call(link, "link_uri", |s, link| s.link_uri(link))
            .flatten()
            .unwrap_or_default()
    }

    pub fn link_rect(&self, link: u64) -> Option<PageRect> {
        self.call(link, "link_rect", |s, link| s.link_rect(link))
    }

    pub fn link_action(&mut self, link: u64) -> u64 {
        raw_of(
            self.call_mut(link, "link_action", |s, link| s.link_action(link))
                .flatten(),
        )
    }

    pub fn action_page_index(&self, action: u64) -> i64 {
        count(
            self.call(action, "action_page_index", |s, action| s.action_page_index(action))
                .flatten(),
        )
    }

    pub fn action_file_path(&self, action: u64) -> String {
        self.call(action, "action_file_path", |s, action| s.action_file_path(action))
            .unwrap_or_default()
    }

    pub fn action_uri(&self, action: u64) -> String {
        self.call(action, "action_uri", |s, action| s.action_uri(action))
            .unwrap_or_default()
    }

    // Annotations

    pub fn annotation_count(&self, page: u64) -> i64 {
        count(self.call(page, "annotation_count", |s, page| s.annotation_count(page)))
    }

    pub fn open_annotation(&mut self, page: u64, index: usize) -> u64 {
        raw_of(self.call_mut(page, "open_annotation", |s, page| {
            s.open_annotation(page, index)
        }))
    }

    pub fn create_annotation(&mut self, page: u64, subtype: AnnotationSubtype) -> u64 {
        raw_of(self.call_mut(page, "create_annotation", |s, page| {
            s.create_annotation(page, subtype)
        }))
    }

    pub fn close_annotation(&mut self, annot: u64) -> bool {
        self.call_mut(annot, "close_annotation", |s, annot| s.close_annotation(annot))
            .is_some()
    }

    pub fn remove_annotation(&mut self, page: u64, index: usize) -> bool {
        self.call_mut(page, "remove_annotation", |s, page| {
            s.remove_annotation(page, index)
        })
        .is_some()
    }

    pub fn annotation_subtype(&self, annot: u64) -> Option<AnnotationSubtype> {
        self.call(annot, "annotation_subtype", |s, annot| s.annotation_subtype(annot))
    }

    pub fn annotation_rect(&self, annot: u64) -> Option<PageRect> {
        self.call(annot, "annotation_rect", |s, annot| s.annotation_rect(annot))
    }

    pub fn set_annotation_rect(&mut self, annot: u64, rect: PageRect) -> bool {
        self.call_mut(annot, "set_annotation_rect", |s, annot| {
            s.set_annotation_rect(annot, rect)
        })
        .is_some()
    }

    pub fn annotation_color(&self, annot: u64, which: ColorType) -> Option<Rgba> {
        self.call(annot, "annotation_color", |s, annot| s.annotation_color(annot, which))
            .flatten()
    }

    pub fn set_annotation_color(&mut self, annot: u64, which: ColorType, color: Rgba) -> bool {
        self.call_mut(annot, "set_annotation_color", |s, annot| {
            s.set_annotation_color(annot, which, color)
        })
        .is_some()
    }

    /// Annotation flags, or -1.
    pub fn annotation_flags(&self, annot: u64) -> i64 {
        self.call(annot, "annotation_flags", |s, annot| s.annotation_flags(annot))
            .map_or(-1, i64::from)
    }

    pub fn set_annotation_flags(&mut self, annot: u64, flags: i32) -> bool {
        self.call_mut(annot, "set_annotation_flags", |s, annot| {
            s.set_annotation_flags(annot, flags)
        })
        .is_some()
    }

    pub fn annotation_contents(&self, annot: u64) -> String {
        self.call(annot, "annotation_contents", |s, annot| s.annotation_contents(annot))
            .unwrap_or_default()
    }

    pub fn set_annotation_contents(&mut self, annot: u64, text: &str) -> bool {
        self.call_mut(annot, "set_annotation_contents", |s, annot| {
            s.set_annotation_contents(annot, text)
        })
        .is_some()
    }

    pub fn annotation_author(&self, annot: u64) -> String {
        self.call(annot, "annotation_author", |s, annot| s.annotation_author(annot))
            .unwrap_or_default()
    }

    pub fn set_annotation_author(&mut self, annot: u64, author: &str) -> bool {
        self.call_mut(annot, "set_annotation_author", |s, annot| {
            s.set_annotation_author(annot, author)
        })
        .is_some()
    }

    pub fn annotation_subject(&self, annot: u64) -> String {
        self.call(annot, "annotation_subject", |s, annot| s.annotation_subject(annot))
            .unwrap_or_default()
    }

    pub fn set_annotation_subject(&mut self, annot: u64, subject: &str) -> bool {
        self.call_mut(annot, "set_annotation_subject", |s, annot| {
            s.set_annotation_subject(annot, subject)
        })
        .is_some()
    }

    pub fn annotation_modified(&self, annot: u64) -> Option<DateTime<FixedOffset>> {
        self.call(annot, "annotation_modified", |s, annot| s.annotation_modified(annot))
            .flatten()
    }

    pub fn set_annotation_modified(&mut self, annot: u64, date: DateTime<FixedOffset>) -> bool {
        self.call_mut(annot, "set_annotation_modified", |s, annot| {
            s.set_annotation_modified(annot, date)
        })
        .is_some()
    }

    pub fn annotation_created(&self, annot: u64) -> Option<DateTime<FixedOffset>> {
        self.call(annot, "annotation_created", |s, annot| s.annotation_created(annot))
            .flatten()
    }

    pub fn set_annotation_created(&mut self, annot: u64, date: DateTime<FixedOffset>) -> bool {
        self.call_mut(annot, "set_annotation_created", |s, annot| {
            s.set_annotation_created(annot, date)
        })
        .is_some()
    }

    /// Opacity in 0..=1, or -1.
    pub fn annotation_opacity(&self, annot: u64) -> f32 {
        self.call(annot, "annotation_opacity", |s, annot| s.annotation_opacity(annot))
            .unwrap_or(-1.0)
    }

    pub fn set_annotation_opacity(&mut self, annot: u64, opacity: f32) -> bool {
        self.call_mut(annot, "set_annotation_opacity", |s, annot| {
            s.set_annotation_opacity(annot, opacity)
        })
        .is_some()
    }

    pub fn annotation_quad_points(&self, annot: u64) -> Vec<QuadPoints> {
        self.call(annot, "annotation_quad_points", |s, annot| {
            s.annotation_quad_points(annot)
        })
        .unwrap_or_default()
    }

    /// Replace quad points from a flat list of groups of eight values.
    pub fn set_annotation_quad_values(&mut self, annot: u64, values: &[f32]) -> bool {
        self.call_mut(annot, "set_annotation_quad_values", |s, annot| {
            s.set_annotation_quad_values(annot, values)
        })
        .is_some()
    }

    pub fn annotation_ink_list(&self, annot: u64) -> Vec<Vec<PointF>> {
        self.call(annot, "annotation_ink_list", |s, annot| s.annotation_ink_list(annot))
            .unwrap_or_default()
    }

    /// Index of the new stroke, or -1.
    pub fn add_ink_stroke(&mut self, annot: u64, points: &[PointF]) -> i64 {
        count(self.call_mut(annot, "add_ink_stroke", |s, annot| {
            s.add_ink_stroke(annot, points)
        }))
    }

    pub fn annotation_appearance(&self, annot: u64, mode: AppearanceMode) -> String {
        self.call(annot, "annotation_appearance", |s, annot| {
            s.annotation_appearance(annot, mode)
        })
        .unwrap_or_default()
    }

    pub fn set_annotation_appearance(&mut self, annot: u64, mode: AppearanceMode, stream: Option<&str>) -> bool {
        self.call_mut(annot, "set_annotation_appearance", |s, annot| {
            s.set_annotation_appearance(annot, mode, stream)
        })
        .is_some()
    }

    // Page objects and fonts

    pub fn page_object_count(&self, page: u64) -> i64 {
        count(self.call(page, "page_object_count", |s, page| s.page_object_count(page)))
    }

    pub fn page_object(&mut self, page: u64, index: usize) -> u64 {
        raw_of(self.call_mut(page, "page_object", |s, page| s.page_object(page, index)))
    }

    pub fn new_text_object(&mut self, doc: u64, font: &str, size: f32) -> u64 {
        raw_of(self.call_mut(doc, "new_text_object", |s, doc| {
            s.new_text_object(doc, font, size)
        }))
    }

    pub fn set_object_text(&mut self, object: u64, text: &str) -> bool {
        self.call_mut(object, "set_object_text", |s, object| {
            s.set_object_text(object, text)
        })
        .is_some()
    }

    pub fn new_path(&mut self, doc: u64, x: f32, y: f32) -> u64 {
        raw_of(self.call_mut(doc, "new_path", |s, doc| s.new_path(doc, x, y)))
    }

    pub fn path_line_to(&mut self, object: u64, x: f32, y: f32) -> bool {
        self.call_mut(object, "path_line_to", |s, object| s.path_line_to(object, x, y))
            .is_some()
    }

    pub fn path_close(&mut self, object: u64) -> bool {
        self.call_mut(object, "path_close", |s, object| s.path_close(object))
            .is_some()
    }

    pub fn set_path_draw_mode(&mut self, object: u64, fill: FillMode, stroke: bool) -> bool {
        self.call_mut(object, "set_path_draw_mode", |s, object| {
            s.set_path_draw_mode(object, fill, stroke)
        })
        .is_some()
    }

    pub fn new_image_object(&mut self, doc: u64, surface: &PixelSurface) -> u64 {
        raw_of(self.call_mut(doc, "new_image_object", |s, doc| {
            s.new_image_object(doc, surface)
        }))
    }

    pub fn insert_page_object(&mut self, page: u64, object: u64) -> bool {
        self.call2_mut(page, object, "insert_page_object", |s, page, object| {
            s.insert_page_object(page, object)
        })
        .is_some()
    }

    pub fn remove_page_object(&mut self, page: u64, object: u64) -> bool {
        self.call2_mut(page, object, "remove_page_object", |s, page, object| {
            s.remove_page_object(page, object)
        })
        .is_some()
    }

    pub fn destroy_page_object(&mut self, object: u64) -> bool {
        self.call_mut(object, "destroy_page_object", |s, object| {
            s.destroy_page_object(object)
        })
        .is_some()
    }

    pub fn set_fill_color(&mut self, object: u64, color: Rgba) -> bool {
        self.call_mut(object, "set_fill_color", |s, object| s.set_fill_color(object, color))
            .is_some()
    }

    pub fn transform_page_object(&mut self, object: u64, matrix: Matrix) -> bool {
        self.call_mut(object, "transform_page_object", |s, object| {
            s.transform_page_object(object, matrix)
        })
        .is_some()
    }

    pub fn page_object_bounds(&self, object: u64) -> Option<PageRect> {
        self.call(object, "page_object_bounds", |s, object| s.page_object_bounds(object))
    }

    pub fn load_standard_font(&mut self, doc: u64, name: &str) -> u64 {
        raw_of(self.call_mut(doc, "load_standard_font", |s, doc| {
            s.load_standard_font(doc, name)
        }))
    }

    pub fn close_font(&mut self, font: u64) -> bool {
        self.call_mut(font, "close_font", |s, font| s.close_font(font))
            .is_some()
    }

    // Structure, signatures, attachments

    pub fn struct_tree(&mut self, page: u64) -> u64 {
        raw_of(self.call_mut(page, "struct_tree", |s, page| s.struct_tree(page)))
    }

    pub fn close_struct_tree(&mut self, tree: u64) -> bool {
        self.call_mut(tree, "close_struct_tree", |s, tree| s.close_struct_tree(tree))
            .is_some()
    }

    pub fn struct_tree_child(&mut self, tree: u64, index: usize) -> u64 {
        raw_of(
            self.call_mut(tree, "struct_tree_child", |s, tree| s.struct_tree_child(tree, index))
                .flatten(),
        )
    }

    pub fn struct_element_type(&self, element: u64) -> String {
        self.call(element, "struct_element_type", |s, element| {
            s.struct_element_type(element)
        })
        .unwrap_or_default()
    }

    pub fn struct_element_alt_text(&self, element: u64) -> String {
        self.call(element, "struct_element_alt_text", |s, element| {
            s.struct_element_alt_text(element)
        })
        .unwrap_or_default()
    }

    pub fn struct_element_child(&mut self, element: u64, index: usize) -> u64 {
        raw_of(
            self.call_mut(element, "struct_element_child", |s, element| {
                s.struct_element_child(element, index)
            })
            .flatten(),
        )
    }

    pub fn signature_count(&self, doc: u64) -> i64 {
        count(self.call(doc, "signature_count", |s, doc| s.signature_count(doc)))
    }

    pub fn signature(&mut self, doc: u64, index: usize) -> u64 {
        raw_of(self.call_mut(doc, "signature", |s, doc| s.signature(doc, index)))
    }

    pub fn signature_contents(&self, signature: u64) -> Vec<u8> {
        self.call(signature, "signature_contents", |s, signature| {
            s.signature_contents(signature)
        })
        .unwrap_or_default()
    }

    pub fn signature_reason(&self, signature: u64) -> String {
        self.call(signature, "signature_reason", |s, signature| {
            s.signature_reason(signature)
        })
        .unwrap_or_default()
    }

    pub fn signature_time(&self, signature: u64) -> Option<DateTime<FixedOffset>> {
        self.call(signature, "signature_time", |s, signature| {
            s.signature_time(signature)
        })
        .flatten()
    }

    pub fn attachment_count(&self, doc: u64) -> i64 {
        count(self.call(doc, "attachment_count", |s, doc| s.attachment_count(doc)))
    }

    pub fn attachment(&mut self, doc: u64, index: usize) -> u64 {
        raw_of(self.call_mut(doc, "attachment", |s, doc| s.attachment(doc, index)))
    }

    pub fn attachment_name(&self, attachment: u64) -> String {
        self.call(attachment, "attachment_name", |s, attachment| {
            s.attachment_name(attachment)
        })
        .unwrap_or_default()
    }

    /// Embedded file bytes; empty when absent or on failure.
    pub fn attachment_contents(&self, attachment: u64) -> Vec<u8> {
        self.call(attachment, "attachment_contents", |s, attachment| {
            s.attachment_contents(attachment)
        })
        .flatten()
        .unwrap_or_default()
    }

    pub fn add_attachment(&mut self, doc: u64, name: &str, contents: &[u8]) -> u64 {
        raw_of(self.call_mut(doc, "add_attachment", |s, doc| {
            s.add_attachment(doc, name, contents)
        }))
    }

    pub fn delete_attachment(&mut self, doc: u64, index: usize) -> bool {
        self.call_mut(doc, "delete_attachment", |s, doc| s.delete_attachment(doc, index))
            .is_some()
    }

    // Forms

    pub fn init_form(&mut self, doc: u64) -> u64 {
        raw_of(self.call_mut(doc, "init_form", |s, doc| s.init_form(doc)))
    }

    pub fn close_form(&mut self, form: u64) -> bool {
        self.call_mut(form, "close_form", |s, form| s.close_form(form))
            .is_some()
    }

    pub fn form_field_type(&self, form: u64, annot: u64) -> Option<FieldType> {
        self.call2(form, annot, "form_field_type", |s, form, annot| {
            s.form_field_type(form, annot)
        })
    }

    pub fn form_field_name(&self, form: u64, annot: u64) -> String {
        self.call2(form, annot, "form_field_name", |s, form, annot| {
            s.form_field_name(form, annot)
        })
        .unwrap_or_default()
    }

    pub fn form_field_value(&self, form: u64, annot: u64) -> String {
        self.call2(form, annot, "form_field_value", |s, form, annot| {
            s.form_field_value(form, annot)
        })
        .unwrap_or_default()
    }

    pub fn set_form_field_value(&mut self, form: u64, annot: u64, value: &str) -> bool {
        self.call2_mut(form, annot, "set_form_field_value", |s, form, annot| {
            s.set_form_field_value(form, annot, value)
        })
        .is_some()
    }

    pub fn form_mouse_move(&mut self, form: u64, page: u64, modifiers: Modifiers, x: f64, y: f64) -> bool {
        self.call2_mut(form, page, "form_mouse_move", |s, form, page| {
            s.form_mouse_move(form, page, modifiers, x, y)
        })
        .unwrap_or(false)
    }

    pub fn form_left_button_down(&mut self, form: u64, page: u64, modifiers: Modifiers, x: f64, y: f64) -> bool {
        self.call2_mut(form, page, "form_left_button_down", |s, form, page| {
            s.form_left_button_down(form, page, modifiers, x, y)
        })
        .unwrap_or(false)
    }

    pub fn form_left_button_up(&mut self, form: u64, page: u64, modifiers: Modifiers, x: f64, y: f64) -> bool {
        self.call2_mut(form, page, "form_left_button_up", |s, form, page| {
            s.form_left_button_up(form, page, modifiers, x, y)
        })
        .unwrap_or(false)
    }

    pub fn form_focus(&mut self, form: u64, page: u64, modifiers: Modifiers, x: f64, y: f64) -> bool {
        self.call2_mut(form, page, "form_focus", |s, form, page| {
            s.form_focus(form, page, modifiers, x, y)
        })
        .unwrap_or(false)
    }

    pub fn form_key_down(&mut self, form: u64, page: u64, key_code: i32, modifiers: Modifiers) -> bool {
        self.call2_mut(form, page, "form_key_down", |s, form, page| {
            s.form_key_down(form, page, key_code, modifiers)
        })
        .unwrap_or(false)
    }

    pub fn form_key_up(&mut self, form: u64, page: u64, key_code: i32, modifiers: Modifiers) -> bool {
        self.call2_mut(form, page, "form_key_up", |s, form, page| {
            s.form_key_up(form, page, key_code, modifiers)
        })
        .unwrap_or(false)
    }

    pub fn form_char(&mut self, form: u64, page: u64, ch: char, modifiers: Modifiers) -> bool {
        self.call2_mut(form, page, "form_char", |s, form, page| {
            s.form_char(form, page, ch, modifiers)
        })
        .unwrap_or(false)
    }

    pub fn form_undo(&mut self, form: u64, page: u64) -> bool {
        self.call2_mut(form, page, "form_undo", |s, form, page| s.form_undo(form, page))
            .unwrap_or(false)
    }

    pub fn form_redo(&mut self, form: u64, page: u64) -> bool {
        self.call2_mut(form, page, "form_redo", |s, form, page| s.form_redo(form, page))
            .unwrap_or(false)
    }

    pub fn draw_form(
        &mut self,
        form: u64,
        page: u64,
        surface: &mut PixelSurface,
        viewport: Viewport,
        rotation: Rotation,
        flags: RenderFlags,
    ) -> bool {
        self.call2_mut(form, page, "draw_form", |s, form, page| {
            s.draw_form(form, page, surface, viewport, rotation, flags)
        })
        .is_some()
    }
}

/// Log an error and collapse it to `None`.
fn settle<T>(operation: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(operation, error = %err, "table call failed");
            None
        }
    }
}
