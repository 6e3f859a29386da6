use super::*;
use crate::bindings::{raw, BlockSink, PauseProbe, PdfiumBindings};
use crate::config::LibraryConfig;
use crate::geometry::{CharBox, PageBox, PageRect, PointF, QuadPoints, Rgba};
use crate::marshal::{from_wide, to_wide};
use crate::transform::{Matrix, PageTransform, Rotation, Viewport};
use std::collections::{HashMap, HashSet};
use std::ffi::CStr;

const FLATTEN_FAIL: i32 = 0;
const FLATTEN_SUCCESS: i32 = 1;
const FLATTEN_NOTHINGTODO: i32 = 2;

const SUBTYPE_LINK: i32 = 2;
const SUBTYPE_INK: i32 = 15;
const SUBTYPE_WIDGET: i32 = 20;

const FIELD_COMBOBOX: i32 = 4;
const FIELD_TEXTFIELD: i32 = 6;
const FIELD_READ_ONLY: i32 = 0x01;

const KEY_VALUE: &str = "V";
const KEY_MAX_LEN: &str = "MaxLen";
const VK_BACK: i32 = 0x08;

/// Colour the fake rasterizer paints at the viewport origin.
pub const INK: u32 = 0xFFFF_0000;
const DEFAULT_HIGHLIGHT: u32 = 0xFFFF_E4DD;

fn has_quads(subtype: i32) -> bool {
    subtype == SUBTYPE_LINK || (9..=12).contains(&subtype)
}

/// Size as shown: the visible box, turned by the page rotation.
fn rotated(page: &FakePage) -> (f32, f32) {
    let bbox = page.visible_box();
    if page.rotation.rem_euclid(2) == 1 {
        (bbox.height(), bbox.width())
    } else {
        (bbox.width(), bbox.height())
    }
}

fn transform_for(page: &FakePage, viewport: Viewport, rotation: i32) -> PageTransform {
    PageTransform::for_page(
        page.visible_box(),
        Rotation::from_quarter_turns(page.rotation),
        viewport,
        Rotation::from_quarter_turns(rotation),
    )
}

/// Write one pixel, honouring the byte order flag.
fn paint(bitmaps: &HashMap<FakeId, BitmapState>, bitmap: FakeId, x: i32, y: i32, argb: u32, flags: i32) {
    let Some(state) = bitmaps.get(&bitmap) else {
        return;
    };
    if x < 0 || y < 0 || x >= state.width || y >= state.height {
        return;
    }
    let [a, r, g, b] = argb.to_be_bytes();
    let pixel = if flags & raw::FPDF_REVERSE_BYTE_ORDER != 0 {
        [r, g, b, a]
    } else {
        [b, g, r, a]
    };
    let offset = y as usize * state.stride as usize + x as usize * 4;
    // SAFETY: the bitmap was created over `stride * height` writable bytes
    // that outlive it, and (x, y) is inside the bitmap.
    unsafe {
        std::ptr::copy_nonoverlapping(pixel.as_ptr(), state.pixels.add(offset), 4);
    }
}

fn segment_points(segments: &[FakeSegment]) -> Vec<(f32, f32)> {
    segments
        .iter()
        .flat_map(|segment| match *segment {
            FakeSegment::MoveTo(x, y) | FakeSegment::LineTo(x, y) => vec![(x, y)],
            FakeSegment::BezierTo(p) => vec![(p[0], p[1]), (p[2], p[3]), (p[4], p[5])],
            FakeSegment::Close => Vec::new(),
        })
        .collect()
}

fn bounds_of(points: &[(f32, f32)]) -> Option<PageRect> {
    let (first, rest) = points.split_first()?;
    let mut rect = PageRect::new(first.0, first.1, first.0, first.1);
    for &(x, y) in rest {
        rect.left = rect.left.min(x);
        rect.right = rect.right.max(x);
        rect.bottom = rect.bottom.min(y);
        rect.top = rect.top.max(y);
    }
    Some(rect)
}

fn transform_point(matrix: &Matrix, x: f32, y: f32) -> (f32, f32) {
    let (x, y) = matrix.apply(f64::from(x), f64::from(y));
    (x as f32, y as f32)
}

impl FakeBindings {
    fn open_model(&self, bytes: &[u8], password: Option<&CStr>) -> Option<FakeDocument> {
        let Some(mut model) = FakeDocument::from_bytes(bytes) else {
            self.set_last_error(raw::FPDF_ERR_FORMAT);
            return None;
        };
        if let Some(expected) = &model.password {
            let given = password.and_then(|p| p.to_str().ok());
            if given != Some(expected.as_str()) {
                self.set_last_error(raw::FPDF_ERR_PASSWORD);
                return None;
            }
        }
        self.assign_uids(&mut model);
        self.set_last_error(raw::FPDF_ERR_SUCCESS);
        Some(model)
    }

    fn register_document(&mut self, model: FakeDocument, source: Option<(usize, usize)>) -> FakeId {
        let id = self.fresh_id();
        self.docs.insert(id, DocState { model, source });
        self.bump(|c| c.documents_loaded += 1);
        id
    }

    fn register_page(&mut self, doc: FakeId, uid: u64) -> FakeId {
        let id = self.fresh_id();
        self.pages.insert(
            id,
            PageState {
                doc,
                uid,
                progress: None,
            },
        );
        self.bump(|c| c.pages_loaded += 1);
        id
    }

    fn page_is_open(&self, doc: FakeId, uid: u64) -> bool {
        self.pages.values().any(|p| p.doc == doc && p.uid == uid)
    }

    /// Run render work units until done or the probe asks to pause.
    fn advance(&mut self, page: FakeId, mut pause: Option<PauseProbe<'_>>) -> i32 {
        let Some(state) = self.pages.get_mut(&page) else {
            bump(&self.counters, |c| c.invalid_calls += 1);
            return raw::FPDF_RENDER_FAILED;
        };
        let Some(progress) = state.progress.as_mut() else {
            return raw::FPDF_RENDER_FAILED;
        };
        if progress.remaining == 0 {
            return raw::FPDF_RENDER_DONE;
        }
        loop {
            progress.remaining -= 1;
            if progress.remaining == 0 {
                break;
            }
            if let Some(probe) = pause.as_deref_mut() {
                bump(&self.counters, |c| c.pause_checks += 1);
                if probe() {
                    return raw::FPDF_RENDER_TOBECONTINUED;
                }
            }
        }
        let (bitmap, viewport, flags) = (progress.bitmap, progress.viewport, progress.flags);
        paint(&self.bitmaps, bitmap, viewport.x, viewport.y, INK, flags);
        self.bump(|c| c.renders += 1);
        raw::FPDF_RENDER_DONE
    }

    fn bookmark(&self, id: FakeId) -> Option<(FakeId, Vec<usize>, &FakeBookmark)> {
        let Some(ViewKey::Bookmark { doc, path }) = self.view(id) else {
            return None;
        };
        let node = node_at(&self.doc(doc)?.bookmarks, &path, |b| &b.children)?;
        Some((doc, path, node))
    }

    fn link(&self, id: FakeId) -> Option<&FakeLink> {
        let Some(ViewKey::Link { page, index }) = self.view(id) else {
            return None;
        };
        self.page(page)?.links.get(index)
    }

    fn action(&self, id: FakeId) -> Option<&FakeAction> {
        let Some(ViewKey::Action { owner }) = self.view(id) else {
            return None;
        };
        match self.view(owner)? {
            ViewKey::Bookmark { .. } => self.bookmark(owner)?.2.action.as_ref(),
            ViewKey::Link { .. } => self.link(owner)?.action.as_ref(),
            _ => None,
        }
    }

    fn element(&self, id: FakeId) -> Option<(FakeId, Vec<usize>, &FakeElement)> {
        let Some(ViewKey::Element { tree, path }) = self.view(id) else {
            return None;
        };
        let page = *self.trees.get(&tree)?;
        let roots = self.page(page)?.structure.as_ref()?;
        let node = node_at(roots, &path, |e| &e.children)?;
        Some((tree, path, node))
    }

    fn attachment(&self, id: FakeId) -> Option<&FakeAttachment> {
        let Some(ViewKey::Attachment { doc, uid }) = self.view(id) else {
            return None;
        };
        self.doc(doc)?.attachments.iter().find(|a| a.uid == uid)
    }

    fn signature(&self, id: FakeId) -> Option<&FakeSignature> {
        let Some(ViewKey::Signature { doc, index }) = self.view(id) else {
            return None;
        };
        self.doc(doc)?.signatures.get(index)
    }

    fn new_annotation_handle(&mut self, page: FakeId, uid: u64) -> FakeId {
        let id = self.fresh_id();
        self.annots.insert(id, AnnotState { page, uid });
        id
    }

    fn field(&self, annot: FakeId) -> Option<&FakeField> {
        self.annot(annot)?.field.as_ref()
    }

    fn widget_at(&self, page: FakeId, x: f64, y: f64) -> Option<u64> {
        self.page(page)?
            .annotations
            .iter()
            .find(|a| a.subtype == SUBTYPE_WIDGET && a.field.is_some() && a.rect.contains(x as f32, y as f32))
            .map(|a| a.uid)
    }

    fn form_attached(&self, form: FakeId, page: FakeId) -> bool {
        self.forms
            .get(&form)
            .is_some_and(|state| state.attached.contains(&page))
    }

    fn focused(&self, form: FakeId, page: FakeId) -> Option<u64> {
        match self.forms.get(&form)?.focus {
            Some((focus_page, uid)) if focus_page == page => Some(uid),
            _ => None,
        }
    }

    fn widget_mut(&mut self, page: FakeId, uid: u64) -> Option<&mut FakeAnnotation> {
        self.page_mut(page)?
            .annotations
            .iter_mut()
            .find(|a| a.uid == uid)
    }

    fn set_focus(&mut self, form: FakeId, page: FakeId, x: f64, y: f64) -> bool {
        if !self.form_attached(form, page) {
            return false;
        }
        let hit = self.widget_at(page, x, y);
        if let Some(state) = self.forms.get_mut(&form) {
            state.focus = hit.map(|uid| (page, uid));
        }
        hit.is_some()
    }

    /// Replace the focused text field's value, recording undo.
    fn edit_focused(&mut self, form: FakeId, page: FakeId, edit: impl FnOnce(&mut String) -> bool) -> bool {
        let Some(uid) = self.focused(form, page) else {
            return false;
        };
        let Some(widget) = self.widget_mut(page, uid) else {
            return false;
        };
        let editable = widget
            .field
            .as_ref()
            .is_some_and(|f| f.field_type == FIELD_TEXTFIELD && f.flags & FIELD_READ_ONLY == 0);
        if !editable {
            return false;
        }
        let old = widget.strings.get(KEY_VALUE).cloned().unwrap_or_default();
        let mut value = old.clone();
        if !edit(&mut value) {
            return false;
        }
        if let Some(max) = widget.numbers.get(KEY_MAX_LEN) {
            if *max >= 0.0 && value.chars().count() > *max as usize {
                return false;
            }
        }
        widget.strings.insert(KEY_VALUE.to_string(), value);
        if let Some(state) = self.forms.get_mut(&form) {
            state.undo.push((uid, old));
            state.redo.clear();
        }
        true
    }

    /// Swap a widget's value with the top of one history stack.
    fn step_history(&mut self, form: FakeId, page: FakeId, undo: bool) -> bool {
        let Some(state) = self.forms.get_mut(&form) else {
            return false;
        };
        let stack = if undo { &mut state.undo } else { &mut state.redo };
        let Some((uid, value)) = stack.pop() else {
            return false;
        };
        let Some(widget) = self.widget_mut(page, uid) else {
            return false;
        };
        let current = widget
            .strings
            .insert(KEY_VALUE.to_string(), value)
            .unwrap_or_default();
        if let Some(state) = self.forms.get_mut(&form) {
            if undo {
                state.redo.push((uid, current));
            } else {
                state.undo.push((uid, current));
            }
        }
        true
    }

    fn text_rects(units: &[u16], page_height: f64, start: usize, count: usize) -> Vec<PageRect> {
        let end = start.saturating_add(count).min(units.len());
        let mut rects: Vec<(usize, PageRect)> = Vec::new();
        for index in start..end {
            let b = fake_char_box(index, page_height);
            let line = index / CHARS_PER_LINE;
            match rects.last_mut() {
                Some((last_line, rect)) if *last_line == line => rect.right = b.right as f32,
                _ => rects.push((
                    line,
                    PageRect::new(b.left as f32, b.bottom as f32, b.right as f32, b.top as f32),
                )),
            }
        }
        rects.into_iter().map(|(_, rect)| rect).collect()
    }
}

impl PdfiumBindings for FakeBindings {
    type Document = FakeId;
    type Page = FakeId;
    type TextPage = FakeId;
    type Search = FakeId;
    type WebLinks = FakeId;
    type Annotation = FakeId;
    type PageObject = FakeId;
    type Font = FakeId;
    type Bitmap = FakeId;
    type Bookmark = FakeId;
    /// Destinations are page indices.
    type Dest = i32;
    type Action = FakeId;
    type Link = FakeId;
    type Form = FakeId;
    type StructTree = FakeId;
    type StructElement = FakeId;
    type Signature = FakeId;
    type Attachment = FakeId;

    fn init_library(&mut self, _config: &LibraryConfig) {
        self.set_initialized(true);
        self.bump(|c| c.inits += 1);
    }

    fn destroy_library(&mut self) {
        self.set_initialized(false);
        self.bump(|c| c.destroys += 1);
    }

    fn last_error(&self) -> u32 {
        self.last_error_code()
    }

    unsafe fn load_mem_document(
        &mut self,
        data: *const u8,
        len: usize,
        password: Option<&CStr>,
    ) -> Option<FakeId> {
        if data.is_null() {
            self.set_last_error(raw::FPDF_ERR_FILE);
            return None;
        }
        let bytes = std::slice::from_raw_parts(data, len);
        let model = self.open_model(bytes, password)?;
        Some(self.register_document(model, Some((data as usize, len))))
    }

    fn load_document(&mut self, path: &CStr, password: Option<&CStr>) -> Option<FakeId> {
        let bytes = path.to_str().ok().and_then(|p| std::fs::read(p).ok());
        let Some(bytes) = bytes else {
            self.set_last_error(raw::FPDF_ERR_FILE);
            return None;
        };
        let model = self.open_model(&bytes, password)?;
        Some(self.register_document(model, None))
    }

    fn create_new_document(&mut self) -> Option<FakeId> {
        Some(self.register_document(FakeDocument::new(), None))
    }

    fn close_document(&mut self, doc: FakeId) {
        let pages_open = self.pages.values().any(|p| p.doc == doc);
        let forms_open = self.forms.values().any(|f| f.doc == doc);
        let fonts_open = self.fonts.values().any(|f| f.doc == doc);
        if pages_open || forms_open || fonts_open {
            self.bump(|c| c.invalid_calls += 1);
        }
        if self.docs.remove(&doc).is_none() {
            self.bump(|c| c.invalid_calls += 1);
            return;
        }
        self.forget_views(|key| match key {
            ViewKey::Bookmark { doc: d, .. }
            | ViewKey::Attachment { doc: d, .. }
            | ViewKey::Signature { doc: d, .. } => *d == doc,
            _ => false,
        });
        self.bump(|c| c.documents_closed += 1);
    }

    fn page_count(&self, doc: FakeId) -> i32 {
        self.doc(doc).map_or(0, |d| d.pages.len() as i32)
    }

    fn meta_text(&self, doc: FakeId, tag: &CStr, buf: &mut [u16]) -> usize {
        let value = tag
            .to_str()
            .ok()
            .and_then(|tag| self.doc(doc)?.metadata.get(tag));
        self.put_wide(value.map(String::as_str), buf)
    }

    fn page_label(&self, doc: FakeId, index: i32, buf: &mut [u16]) -> usize {
        let label = usize::try_from(index)
            .ok()
            .and_then(|i| self.doc(doc)?.pages.get(i)?.label.as_deref());
        self.put_wide(label, buf)
    }

    fn page_size_by_index(&self, doc: FakeId, index: i32) -> Option<(f64, f64)> {
        let page = self.doc(doc)?.pages.get(usize::try_from(index).ok()?)?;
        let (w, h) = rotated(page);
        Some((f64::from(w), f64::from(h)))
    }

    fn import_pages(&mut self, dest: FakeId, src: FakeId, range: Option<&CStr>, index: i32) -> bool {
        let Some(source) = self.doc(src) else {
            return false;
        };
        let indices = match range {
            Some(range) => match range
                .to_str()
                .ok()
                .and_then(|r| parse_page_range(r, source.pages.len()))
            {
                Some(indices) => indices,
                None => return false,
            },
            None => (0..source.pages.len()).collect(),
        };
        let mut copies: Vec<FakePage> = indices.iter().map(|&i| source.pages[i].clone()).collect();
        for page in &mut copies {
            self.assign_page_uids(page);
        }
        let Some(target) = self.doc_mut(dest) else {
            return false;
        };
        let at = usize::try_from(index).unwrap_or(0).min(target.pages.len());
        target.pages.splice(at..at, copies);
        true
    }

    fn copy_viewer_preferences(&mut self, dest: FakeId, src: FakeId) -> bool {
        let Some(mode) = self.doc(src).map(|d| d.page_mode) else {
            return false;
        };
        match self.doc_mut(dest) {
            Some(target) => {
                target.page_mode = mode;
                true
            }
            None => false,
        }
    }

    fn delete_page(&mut self, doc: FakeId, index: i32) {
        let uid = usize::try_from(index)
            .ok()
            .and_then(|i| self.doc(doc)?.pages.get(i).map(|p| p.uid));
        let Some(uid) = uid else {
            self.bump(|c| c.invalid_calls += 1);
            return;
        };
        if self.page_is_open(doc, uid) {
            self.bump(|c| c.invalid_calls += 1);
        }
        if let Some(model) = self.doc_mut(doc) {
            model.pages.retain(|p| p.uid != uid);
        }
    }

    fn new_page(&mut self, doc: FakeId, index: i32, width: f64, height: f64) -> Option<FakeId> {
        let mut page = FakePage::new(width as f32, height as f32);
        self.assign_page_uids(&mut page);
        let uid = page.uid;
        let model = self.doc_mut(doc)?;
        let at = usize::try_from(index).unwrap_or(0).min(model.pages.len());
        model.pages.insert(at, page);
        Some(self.register_page(doc, uid))
    }

    fn save_as_copy(&mut self, doc: FakeId, flags: u32, sink: BlockSink<'_>) -> bool {
        let Some(model) = self.doc(doc) else {
            return false;
        };
        let mut copy = model.clone();
        if flags == raw::FPDF_REMOVE_SECURITY {
            copy.password = None;
        }
        for block in copy.to_bytes().chunks(SAVE_BLOCK) {
            self.bump(|c| c.save_blocks += 1);
            if !sink(block) {
                return false;
            }
        }
        true
    }

    fn form_type(&self, doc: FakeId) -> i32 {
        self.doc(doc).map_or(0, |d| d.form_type)
    }

    fn page_mode(&self, doc: FakeId) -> i32 {
        self.doc(doc).map_or(-1, |d| d.page_mode)
    }

    fn javascript_action_count(&self, doc: FakeId) -> i32 {
        self.doc(doc).map_or(-1, |d| d.javascript_actions)
    }

    fn load_page(&mut self, doc: FakeId, index: i32) -> Option<FakeId> {
        let uid = self
            .doc(doc)?
            .pages
            .get(usize::try_from(index).ok()?)?
            .uid;
        Some(self.register_page(doc, uid))
    }

    fn close_page(&mut self, page: FakeId) {
        let Some(state) = self.pages.get(&page) else {
            self.bump(|c| c.invalid_calls += 1);
            return;
        };
        let busy = state.progress.is_some()
            || self.texts.values().any(|t| t.page == page)
            || self.annots.values().any(|a| a.page == page)
            || self.trees.values().any(|p| *p == page);
        if busy {
            self.bump(|c| c.invalid_calls += 1);
        }
        let mut still_attached = 0;
        for form in self.forms.values_mut() {
            if form.attached.remove(&page) {
                still_attached += 1;
            }
            if matches!(form.focus, Some((focus, _)) if focus == page) {
                form.focus = None;
            }
        }
        self.bump(|c| c.unpaired_hooks += still_attached);
        self.pages.remove(&page);
        self.forget_views(|key| matches!(key, ViewKey::Link { page: p, .. } if *p == page));
        self.bump(|c| c.pages_closed += 1);
    }

    fn page_width(&self, page: FakeId) -> f32 {
        self.page(page).map_or(0.0, |p| rotated(p).0)
    }

    fn page_height(&self, page: FakeId) -> f32 {
        self.page(page).map_or(0.0, |p| rotated(p).1)
    }

    fn page_rotation(&self, page: FakeId) -> i32 {
        self.page(page).map_or(0, |p| p.rotation)
    }

    fn set_page_rotation(&mut self, page: FakeId, rotation: i32) {
        if let Some(p) = self.page_mut(page) {
            p.rotation = rotation.rem_euclid(4);
        }
    }

    fn page_box(&self, page: FakeId, which: PageBox) -> Option<PageRect> {
        self.page(page)?.page_box(which)
    }

    fn set_page_box(&mut self, page: FakeId, which: PageBox, rect: PageRect) {
        if let Some(p) = self.page_mut(page) {
            p.boxes.retain(|(kind, _)| *kind != which);
            p.boxes.push((which, rect));
        }
    }

    fn flatten_page(&mut self, page: FakeId, _flags: i32) -> i32 {
        match self.page_mut(page) {
            Some(p) if p.annotations.is_empty() => FLATTEN_NOTHINGTODO,
            Some(p) => {
                p.annotations.clear();
                FLATTEN_SUCCESS
            }
            None => FLATTEN_FAIL,
        }
    }

    fn generate_content(&mut self, page: FakeId) -> bool {
        self.page(page).is_some()
    }

    fn decoded_thumbnail(&self, page: FakeId, buf: &mut [u8]) -> usize {
        let thumbnail = self.page(page).map(|p| p.thumbnail.as_slice());
        self.put_bytes(thumbnail.filter(|t| !t.is_empty()), buf)
    }

    fn raw_thumbnail(&self, page: FakeId, buf: &mut [u8]) -> usize {
        self.decoded_thumbnail(page, buf)
    }

    fn device_to_page(
        &self,
        page: FakeId,
        viewport: Viewport,
        rotation: i32,
        x: i32,
        y: i32,
    ) -> Option<(f64, f64)> {
        let page = self.page(page)?;
        Some(transform_for(page, viewport, rotation).device_to_page(x, y))
    }

    fn page_to_device(
        &self,
        page: FakeId,
        viewport: Viewport,
        rotation: i32,
        x: f64,
        y: f64,
    ) -> Option<(i32, i32)> {
        let page = self.page(page)?;
        Some(transform_for(page, viewport, rotation).page_to_device(x, y))
    }

    unsafe fn create_external_bitmap(
        &mut self,
        width: i32,
        height: i32,
        format: i32,
        pixels: *mut u8,
        stride: i32,
    ) -> Option<FakeId> {
        if format != raw::FPDFBITMAP_BGRA
            || width <= 0
            || height <= 0
            || pixels.is_null()
            || stride < width.saturating_mul(4)
        {
            return None;
        }
        let id = self.fresh_id();
        self.bitmaps.insert(
            id,
            BitmapState {
                pixels,
                width,
                height,
                stride,
            },
        );
        self.bump(|c| c.bitmaps_created += 1);
        Some(id)
    }

    fn fill_rect(&mut self, bitmap: FakeId, left: i32, top: i32, width: i32, height: i32, argb: u32) -> bool {
        let Some(state) = self.bitmaps.get(&bitmap) else {
            self.bump(|c| c.invalid_calls += 1);
            return false;
        };
        let right = left.saturating_add(width).min(state.width);
        let bottom = top.saturating_add(height).min(state.height);
        for y in top.max(0)..bottom {
            for x in left.max(0)..right {
                paint(&self.bitmaps, bitmap, x, y, argb, 0);
            }
        }
        true
    }

    fn destroy_bitmap(&mut self, bitmap: FakeId) {
        let in_use = self
            .pages
            .values()
            .any(|p| p.progress.as_ref().is_some_and(|r| r.bitmap == bitmap));
        if in_use {
            self.bump(|c| c.invalid_calls += 1);
        }
        if self.bitmaps.remove(&bitmap).is_some() {
            self.bump(|c| c.bitmaps_destroyed += 1);
        } else {
            self.bump(|c| c.invalid_calls += 1);
        }
    }

    fn render_page_bitmap(&mut self, bitmap: FakeId, page: FakeId, viewport: Viewport, _rotation: i32, flags: i32) {
        if self.page(page).is_none() || !self.bitmaps.contains_key(&bitmap) {
            self.bump(|c| c.invalid_calls += 1);
            return;
        }
        self.record_render_flags(flags);
        paint(&self.bitmaps, bitmap, viewport.x, viewport.y, INK, flags);
        self.bump(|c| c.renders += 1);
    }

    fn render_start(
        &mut self,
        bitmap: FakeId,
        page: FakeId,
        viewport: Viewport,
        _rotation: i32,
        flags: i32,
        pause: Option<PauseProbe<'_>>,
    ) -> i32 {
        let Some(steps) = self.page(page).map(|p| p.render_steps.max(1)) else {
            return raw::FPDF_RENDER_FAILED;
        };
        if !self.bitmaps.contains_key(&bitmap) {
            self.bump(|c| c.invalid_calls += 1);
            return raw::FPDF_RENDER_FAILED;
        }
        self.bump(|c| c.render_starts += 1);
        self.record_render_flags(flags);
        if let Some(state) = self.pages.get_mut(&page) {
            if state.progress.is_some() {
                bump(&self.counters, |c| c.invalid_calls += 1);
                return raw::FPDF_RENDER_FAILED;
            }
            state.progress = Some(Progress {
                bitmap,
                viewport,
                flags,
                remaining: steps,
            });
        }
        self.advance(page, pause)
    }

    fn render_continue(&mut self, page: FakeId, pause: Option<PauseProbe<'_>>) -> i32 {
        self.bump(|c| c.render_continues += 1);
        let active = self.pages.get(&page).is_some_and(|p| p.progress.is_some());
        if !active {
            self.bump(|c| c.invalid_calls += 1);
            return raw::FPDF_RENDER_FAILED;
        }
        self.advance(page, pause)
    }

    fn render_close(&mut self, page: FakeId) {
        if let Some(state) = self.pages.get_mut(&page) {
            state.progress = None;
        }
        self.bump(|c| c.render_closes += 1);
    }

    fn load_text_page(&mut self, page: FakeId) -> Option<FakeId> {
        let (mut units, page_height) = {
            let p = self.page(page)?;
            (to_wide(&p.text), f64::from(p.height))
        };
        units.pop();
        let id = self.fresh_id();
        self.texts.insert(
            id,
            TextState {
                page,
                units,
                page_height,
                rects: Vec::new(),
            },
        );
        Some(id)
    }

    fn close_text_page(&mut self, text: FakeId) {
        let busy = self.searches.values().any(|s| s.text == text)
            || self.web_links.values().any(|l| l.text == text);
        if busy || self.texts.remove(&text).is_none() {
            self.bump(|c| c.invalid_calls += 1);
        }
    }

    fn count_chars(&self, text: FakeId) -> i32 {
        self.texts.get(&text).map_or(-1, |t| t.units.len() as i32)
    }

    fn get_text(&self, text: FakeId, start: i32, count: i32, buf: &mut [u16]) -> i32 {
        let Some(state) = self.texts.get(&text) else {
            return 0;
        };
        let (Ok(start), Ok(count)) = (usize::try_from(start), usize::try_from(count)) else {
            return 0;
        };
        if buf.is_empty() || start > state.units.len() {
            return 0;
        }
        let end = start.saturating_add(count).min(state.units.len());
        let slice = &state.units[start..end];
        let take = slice.len().min(buf.len() - 1);
        buf[..take].copy_from_slice(&slice[..take]);
        buf[take] = 0;
        (take + 1) as i32
    }

    fn char_box(&self, text: FakeId, index: i32) -> Option<CharBox> {
        let state = self.texts.get(&text)?;
        let index = usize::try_from(index).ok().filter(|i| *i < state.units.len())?;
        Some(fake_char_box(index, state.page_height))
    }

    fn char_index_at_pos(&self, text: FakeId, x: f64, y: f64, x_tolerance: f64, y_tolerance: f64) -> i32 {
        let Some(state) = self.texts.get(&text) else {
            return -3;
        };
        (0..state.units.len())
            .find(|&i| {
                let b = fake_char_box(i, state.page_height);
                x >= b.left - x_tolerance
                    && x <= b.right + x_tolerance
                    && y >= b.bottom - y_tolerance
                    && y <= b.top + y_tolerance
            })
            .map_or(-1, |i| i as i32)
    }

    fn count_rects(&mut self, text: FakeId, start: i32, count: i32) -> i32 {
        let Some(state) = self.texts.get_mut(&text) else {
            return 0;
        };
        let Ok(start) = usize::try_from(start) else {
            return 0;
        };
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        state.rects = Self::text_rects(&state.units, state.page_height, start, count);
        state.rects.len() as i32
    }

    fn get_rect(&self, text: FakeId, index: i32) -> Option<PageRect> {
        let state = self.texts.get(&text)?;
        state.rects.get(usize::try_from(index).ok()?).copied()
    }

    fn find_start(&mut self, text: FakeId, query: &[u16], flags: u32, start: i32) -> Option<FakeId> {
        let state = self.texts.get(&text)?;
        let end = query.iter().position(|&u| u == 0).unwrap_or(query.len());
        let query = &query[..end];
        let matches = find_matches(&state.units, query, flags);
        let id = self.fresh_id();
        self.searches.insert(
            id,
            SearchState {
                text,
                matches,
                len: query.len() as i32,
                start: start.max(0),
                pos: -1,
            },
        );
        Some(id)
    }

    fn find_next(&mut self, search: FakeId) -> bool {
        let Some(state) = self.searches.get_mut(&search) else {
            bump(&self.counters, |c| c.invalid_calls += 1);
            return false;
        };
        let next = if state.pos < 0 {
            let start = state.start;
            state.matches.iter().position(|&m| m >= start).unwrap_or(state.matches.len()) as isize
        } else {
            state.pos + 1
        };
        // Running off the end leaves the cursor past the last match, as the
        // library does.
        if (next as usize) < state.matches.len() {
            state.pos = next;
            true
        } else {
            state.pos = state.matches.len() as isize;
            false
        }
    }

    fn find_prev(&mut self, search: FakeId) -> bool {
        let Some(state) = self.searches.get_mut(&search) else {
            bump(&self.counters, |c| c.invalid_calls += 1);
            return false;
        };
        let prev = if state.pos < 0 {
            let start = state.start;
            state.matches.iter().rposition(|&m| m < start).map_or(-1, |i| i as isize)
        } else {
            state.pos - 1
        };
        if prev < 0 {
            state.pos = -1;
            false
        } else {
            state.pos = prev;
            true
        }
    }

    fn search_result_index(&self, search: FakeId) -> i32 {
        self.searches
            .get(&search)
            .and_then(|s| usize::try_from(s.pos).ok().and_then(|p| s.matches.get(p)).copied())
            .unwrap_or(-1)
    }

    fn search_result_count(&self, search: FakeId) -> i32 {
        self.searches.get(&search).map_or(0, |s| {
            let valid = usize::try_from(s.pos).is_ok_and(|p| p < s.matches.len());
            if valid {
                s.len
            } else {
                0
            }
        })
    }

    fn find_close(&mut self, search: FakeId) {
        if self.searches.remove(&search).is_none() {
            self.bump(|c| c.invalid_calls += 1);
        }
    }

    fn load_web_links(&mut self, text: FakeId) -> Option<FakeId> {
        let urls = detect_urls(&from_wide(&self.texts.get(&text)?.units));
        let id = self.fresh_id();
        self.web_links.insert(id, WebLinksState { text, urls });
        Some(id)
    }

    fn close_web_links(&mut self, links: FakeId) {
        if self.web_links.remove(&links).is_none() {
            self.bump(|c| c.invalid_calls += 1);
        }
    }

    fn count_web_links(&self, links: FakeId) -> i32 {
        self.web_links.get(&links).map_or(0, |l| l.urls.len() as i32)
    }

    fn web_link_url(&self, links: FakeId, index: i32, buf: &mut [u16]) -> i32 {
        let url = usize::try_from(index)
            .ok()
            .and_then(|i| self.web_links.get(&links)?.urls.get(i));
        let Some(url) = url else {
            return 0;
        };
        let wide = to_wide(url);
        if buf.is_empty() {
            bump(&self.counters, |c| c.string_queries += 1);
            return wide.len() as i32;
        }
        bump(&self.counters, |c| c.string_fills += 1);
        let take = wide.len().min(buf.len());
        buf[..take].copy_from_slice(&wide[..take]);
        take as i32
    }

    fn bookmark_first_child(&self, doc: FakeId, parent: Option<FakeId>) -> Option<FakeId> {
        let mut path = match parent {
            Some(parent) => {
                let (owner, path, node) = self.bookmark(parent)?;
                if owner != doc || node.children.is_empty() {
                    return None;
                }
                path
            }
            None if self.doc(doc)?.bookmarks.is_empty() => return None,
            None => Vec::new(),
        };
        path.push(0);
        Some(self.intern(ViewKey::Bookmark { doc, path }))
    }

    fn bookmark_next_sibling(&self, doc: FakeId, bookmark: FakeId) -> Option<FakeId> {
        let (owner, mut path, _) = self.bookmark(bookmark)?;
        if owner != doc {
            return None;
        }
        *path.last_mut()? += 1;
        node_at(&self.doc(doc)?.bookmarks, &path, |b| &b.children)?;
        Some(self.intern(ViewKey::Bookmark { doc, path }))
    }

    fn bookmark_title(&self, bookmark: FakeId, buf: &mut [u16]) -> usize {
        let title = self.bookmark(bookmark).map(|(_, _, b)| b.title.as_str());
        self.put_wide(title, buf)
    }

    fn bookmark_find(&self, doc: FakeId, title: &[u16]) -> Option<FakeId> {
        fn search(nodes: &[FakeBookmark], title: &str, path: &mut Vec<usize>) -> bool {
            for (index, node) in nodes.iter().enumerate() {
                path.push(index);
                if node.title == title || search(&node.children, title, path) {
                    return true;
                }
                path.pop();
            }
            false
        }
        let title = from_wide(title);
        let mut path = Vec::new();
        if search(&self.doc(doc)?.bookmarks, &title, &mut path) {
            Some(self.intern(ViewKey::Bookmark { doc, path }))
        } else {
            None
        }
    }

    fn bookmark_dest(&self, _doc: FakeId, bookmark: FakeId) -> Option<i32> {
        self.bookmark(bookmark)?.2.dest
    }

    fn bookmark_action(&self, bookmark: FakeId) -> Option<FakeId> {
        self.bookmark(bookmark)?.2.action.as_ref()?;
        Some(self.intern(ViewKey::Action { owner: bookmark }))
    }

    fn dest_page_index(&self, doc: FakeId, dest: i32) -> i32 {
        let count = self.page_count(doc);
        if (0..count).contains(&dest) {
            dest
        } else {
            -1
        }
    }

    fn link_at_point(&self, page: FakeId, x: f64, y: f64) -> Option<FakeId> {
        let index = self
            .page(page)?
            .links
            .iter()
            .position(|l| l.rect.contains(x as f32, y as f32))?;
        Some(self.intern(ViewKey::Link { page, index }))
    }

    fn link_dest(&self, _doc: FakeId, link: FakeId) -> Option<i32> {
        self.link(link)?.dest
    }

    fn link_action(&self, link: FakeId) -> Option<FakeId> {
        self.link(link)?.action.as_ref()?;
        Some(self.intern(ViewKey::Action { owner: link }))
    }

    fn link_rect(&self, link: FakeId) -> Option<PageRect> {
        Some(self.link(link)?.rect)
    }

    fn annotation_link(&self, annot: FakeId) -> Option<FakeId> {
        let &AnnotState { page, .. } = self.annots.get(&annot)?;
        let rect = self.annot(annot).filter(|a| a.subtype == SUBTYPE_LINK)?.rect;
        let index = self.page(page)?.links.iter().position(|l| l.rect == rect)?;
        Some(self.intern(ViewKey::Link { page, index }))
    }

    fn action_type(&self, action: FakeId) -> u32 {
        self.action(action).map_or(0, FakeAction::type_code)
    }

    fn action_dest(&self, _doc: FakeId, action: FakeId) -> Option<i32> {
        match self.action(action)? {
            FakeAction::GoTo { page } => Some(*page),
            _ => None,
        }
    }

    fn action_file_path(&self, action: FakeId, buf: &mut [u8]) -> usize {
        let path = match self.action(action) {
            Some(FakeAction::RemoteGoTo { path, .. }) | Some(FakeAction::Launch { path }) => {
                Some(path.as_str())
            }
            _ => None,
        };
        self.put_c_string(path, buf)
    }

    fn action_uri_path(&self, _doc: FakeId, action: FakeId, buf: &mut [u8]) -> usize {
        let uri = match self.action(action) {
            Some(FakeAction::Uri { uri }) => Some(uri.as_str()),
            _ => None,
        };
        self.put_c_string(uri, buf)
    }

    fn annotation_count(&self, page: FakeId) -> i32 {
        self.page(page).map_or(0, |p| p.annotations.len() as i32)
    }

    fn get_annotation(&mut self, page: FakeId, index: i32) -> Option<FakeId> {
        let uid = self
            .page(page)?
            .annotations
            .get(usize::try_from(index).ok()?)?
            .uid;
        Some(self.new_annotation_handle(page, uid))
    }

    fn create_annotation(&mut self, page: FakeId, subtype: i32) -> Option<FakeId> {
        if subtype <= 0 {
            return None;
        }
        let uid = self.fresh_id().0;
        let mut annotation = FakeAnnotation::new(subtype, PageRect::default());
        annotation.uid = uid;
        self.page_mut(page)?.annotations.push(annotation);
        Some(self.new_annotation_handle(page, uid))
    }

    fn annotation_index(&self, page: FakeId, annot: FakeId) -> i32 {
        let Some(&AnnotState { uid, .. }) = self.annots.get(&annot) else {
            return -1;
        };
        self.page(page)
            .and_then(|p| p.annotations.iter().position(|a| a.uid == uid))
            .map_or(-1, |i| i as i32)
    }

    fn remove_annotation(&mut self, page: FakeId, index: i32) -> bool {
        let Some(p) = self.page_mut(page) else {
            return false;
        };
        match usize::try_from(index).ok().filter(|i| *i < p.annotations.len()) {
            Some(i) => {
                p.annotations.remove(i);
                true
            }
            None => false,
        }
    }

    fn close_annotation(&mut self, annot: FakeId) {
        if self.annots.remove(&annot).is_none() {
            self.bump(|c| c.invalid_calls += 1);
        }
    }

    fn annotation_subtype(&self, annot: FakeId) -> i32 {
        self.annot(annot).map_or(-1, |a| a.subtype)
    }

    fn annotation_rect(&self, annot: FakeId) -> Option<PageRect> {
        Some(self.annot(annot)?.rect)
    }

    fn set_annotation_rect(&mut self, annot: FakeId, rect: PageRect) -> bool {
        self.annot_mut(annot).map(|a| a.rect = rect).is_some()
    }

    fn annotation_color(&self, annot: FakeId, color_type: i32) -> Option<Rgba> {
        let a = self.annot(annot)?;
        match color_type {
            raw::FPDFANNOT_COLORTYPE_COLOR => a.color,
            raw::FPDFANNOT_COLORTYPE_INTERIOR => a.interior,
            _ => None,
        }
    }

    fn set_annotation_color(&mut self, annot: FakeId, color_type: i32, color: Rgba) -> bool {
        let Some(a) = self.annot_mut(annot) else {
            return false;
        };
        match color_type {
            raw::FPDFANNOT_COLORTYPE_COLOR => a.color = Some(color),
            raw::FPDFANNOT_COLORTYPE_INTERIOR => a.interior = Some(color),
            _ => return false,
        }
        true
    }

    fn annotation_flags(&self, annot: FakeId) -> i32 {
        self.annot(annot).map_or(0, |a| a.flags)
    }

    fn set_annotation_flags(&mut self, annot: FakeId, flags: i32) -> bool {
        self.annot_mut(annot).map(|a| a.flags = flags).is_some()
    }

    fn annotation_string(&self, annot: FakeId, key: &CStr, buf: &mut [u16]) -> usize {
        let value = key
            .to_str()
            .ok()
            .and_then(|key| self.annot(annot)?.strings.get(key));
        self.put_wide(value.map(String::as_str), buf)
    }

    fn set_annotation_string(&mut self, annot: FakeId, key: &CStr, value: &[u16]) -> bool {
        let Ok(key) = key.to_str() else {
            return false;
        };
        let value = from_wide(value);
        self.annot_mut(annot)
            .map(|a| a.strings.insert(key.to_string(), value))
            .is_some()
    }

    fn annotation_number(&self, annot: FakeId, key: &CStr) -> Option<f32> {
        let key = key.to_str().ok()?;
        self.annot(annot)?.numbers.get(key).copied()
    }

    fn set_annotation_number(&mut self, annot: FakeId, key: &CStr, value: f32) -> bool {
        let Ok(key) = key.to_str() else {
            return false;
        };
        self.annot_mut(annot)
            .map(|a| a.numbers.insert(key.to_string(), value))
            .is_some()
    }

    fn attachment_point_count(&self, annot: FakeId) -> usize {
        self.annot(annot).map_or(0, |a| a.quads.len())
    }

    fn attachment_points(&self, annot: FakeId, index: usize) -> Option<QuadPoints> {
        self.annot(annot)?.quads.get(index).map(QuadPoints::from_slice)
    }

    fn set_attachment_points(&mut self, annot: FakeId, index: usize, quad: QuadPoints) -> bool {
        match self.annot_mut(annot) {
            Some(a) if has_quads(a.subtype) && index < a.quads.len() => {
                a.quads[index] = quad.to_array();
                true
            }
            _ => false,
        }
    }

    fn append_attachment_points(&mut self, annot: FakeId, quad: QuadPoints) -> bool {
        match self.annot_mut(annot) {
            Some(a) if has_quads(a.subtype) => {
                a.quads.push(quad.to_array());
                true
            }
            _ => false,
        }
    }

    fn ink_list_count(&self, annot: FakeId) -> usize {
        self.annot(annot).map_or(0, |a| a.ink.len())
    }

    fn ink_list_path(&self, annot: FakeId, index: usize, buf: &mut [PointF]) -> usize {
        let Some(stroke) = self.annot(annot).and_then(|a| a.ink.get(index)) else {
            return 0;
        };
        if buf.len() >= stroke.len() {
            buf[..stroke.len()].copy_from_slice(stroke);
        }
        stroke.len()
    }

    fn add_ink_stroke(&mut self, annot: FakeId, points: &[PointF]) -> i32 {
        match self.annot_mut(annot) {
            Some(a) if a.subtype == SUBTYPE_INK && !points.is_empty() => {
                a.ink.push(points.to_vec());
                a.ink.len() as i32 - 1
            }
            _ => -1,
        }
    }

    fn annotation_appearance(&self, annot: FakeId, mode: i32, buf: &mut [u16]) -> usize {
        let stream = self.annot(annot).and_then(|a| a.appearance.get(&mode));
        self.put_wide(stream.map(String::as_str), buf)
    }

    fn set_annotation_appearance(&mut self, annot: FakeId, mode: i32, value: Option<&[u16]>) -> bool {
        let Some(a) = self.annot_mut(annot) else {
            return false;
        };
        match value {
            Some(value) => {
                a.appearance.insert(mode, from_wide(value));
            }
            None => {
                a.appearance.remove(&mode);
            }
        }
        true
    }

    fn init_form_fill(&mut self, doc: FakeId, version: i32, on_release: Box<dyn FnOnce()>) -> Option<FakeId> {
        if !self.docs.contains_key(&doc) || !(1..=2).contains(&version) {
            on_release();
            self.bump(|c| c.form_releases += 1);
            return None;
        }
        let id = self.fresh_id();
        self.forms.insert(
            id,
            FormState {
                doc,
                on_release: Some(on_release),
                attached: HashSet::new(),
                focus: None,
                undo: Vec::new(),
                redo: Vec::new(),
                highlight: HashMap::new(),
                highlight_alpha: 0,
            },
        );
        self.bump(|c| c.form_inits += 1);
        Some(id)
    }

    fn exit_form_fill(&mut self, form: FakeId) {
        let Some(mut state) = self.forms.remove(&form) else {
            self.bump(|c| c.invalid_calls += 1);
            return;
        };
        let attached = state.attached.len();
        self.bump(|c| {
            c.unpaired_hooks += attached;
            c.form_exits += 1;
        });
        if let Some(release) = state.on_release.take() {
            release();
            self.bump(|c| c.form_releases += 1);
        }
    }

    fn form_on_after_load_page(&mut self, page: FakeId, form: FakeId) {
        self.bump(|c| c.page_attaches += 1);
        let fresh = match self.forms.get_mut(&form) {
            Some(state) => state.attached.insert(page),
            None => false,
        };
        if !fresh || !self.pages.contains_key(&page) {
            self.bump(|c| c.unpaired_hooks += 1);
        }
    }

    fn form_on_before_close_page(&mut self, page: FakeId, form: FakeId) {
        self.bump(|c| c.page_detaches += 1);
        let attached = match self.forms.get_mut(&form) {
            Some(state) => {
                if matches!(state.focus, Some((focus, _)) if focus == page) {
                    state.focus = None;
                }
                state.attached.remove(&page)
            }
            None => false,
        };
        if !attached {
            self.bump(|c| c.unpaired_hooks += 1);
        }
    }

    fn form_draw(&mut self, form: FakeId, bitmap: FakeId, page: FakeId, viewport: Viewport, rotation: i32, flags: i32) {
        let Some(state) = self.forms.get(&form) else {
            self.bump(|c| c.invalid_calls += 1);
            return;
        };
        self.record_render_flags(flags);
        let Some(p) = self.page(page) else {
            return;
        };
        let transform = transform_for(p, viewport, rotation);
        for widget in p.annotations.iter().filter(|a| a.subtype == SUBTYPE_WIDGET) {
            let field_type = widget.field.as_ref().map_or(0, |f| f.field_type);
            let argb = state
                .highlight
                .get(&field_type)
                .or_else(|| state.highlight.get(&0))
                .copied()
                .unwrap_or(DEFAULT_HIGHLIGHT);
            let (x, y) = transform.page_to_device(f64::from(widget.rect.left), f64::from(widget.rect.top));
            paint(&self.bitmaps, bitmap, x, y, argb, flags);
        }
    }

    fn form_field_type(&self, _form: FakeId, annot: FakeId) -> i32 {
        self.field(annot).map_or(-1, |f| f.field_type)
    }

    fn form_field_name(&self, _form: FakeId, annot: FakeId, buf: &mut [u16]) -> usize {
        let name = self.field(annot).map(|f| f.name.as_str());
        self.put_wide(name, buf)
    }

    fn form_field_value(&self, _form: FakeId, annot: FakeId, buf: &mut [u16]) -> usize {
        let value = self
            .annot(annot)
            .filter(|a| a.field.is_some())
            .and_then(|a| a.strings.get(KEY_VALUE));
        self.put_wide(value.map(String::as_str), buf)
    }

    fn form_field_flags(&self, _form: FakeId, annot: FakeId) -> i32 {
        self.field(annot).map_or(-1, |f| f.flags)
    }

    fn form_option_count(&self, _form: FakeId, annot: FakeId) -> i32 {
        self.field(annot).map_or(-1, |f| f.options.len() as i32)
    }

    fn form_option_label(&self, _form: FakeId, annot: FakeId, index: i32, buf: &mut [u16]) -> usize {
        let label = usize::try_from(index)
            .ok()
            .and_then(|i| self.field(annot)?.options.get(i));
        self.put_wide(label.map(String::as_str), buf)
    }

    fn form_is_option_selected(&self, _form: FakeId, annot: FakeId, index: i32) -> bool {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.field(annot)?.selected.get(i).copied())
            .unwrap_or(false)
    }

    fn form_set_index_selected(&mut self, form: FakeId, page: FakeId, index: i32, selected: bool) -> bool {
        let Some(uid) = self.focused(form, page) else {
            return false;
        };
        let Ok(index) = usize::try_from(index) else {
            return false;
        };
        let Some(widget) = self.widget_mut(page, uid) else {
            return false;
        };
        let Some(field) = widget.field.as_mut() else {
            return false;
        };
        if index >= field.options.len() {
            return false;
        }
        field.selected.resize(field.options.len(), false);
        if selected && field.field_type == FIELD_COMBOBOX {
            field.selected.iter_mut().for_each(|s| *s = false);
        }
        field.selected[index] = selected;
        let value = field
            .selected
            .iter()
            .position(|s| *s)
            .map(|i| field.options[i].clone());
        match value {
            Some(value) => {
                widget.strings.insert(KEY_VALUE.to_string(), value);
            }
            None => {
                widget.strings.remove(KEY_VALUE);
            }
        }
        true
    }

    fn form_on_mouse_move(&mut self, form: FakeId, page: FakeId, _modifier: i32, x: f64, y: f64) -> bool {
        self.form_attached(form, page) && self.widget_at(page, x, y).is_some()
    }

    fn form_on_lbutton_down(&mut self, form: FakeId, page: FakeId, _modifier: i32, x: f64, y: f64) -> bool {
        self.set_focus(form, page, x, y)
    }

    fn form_on_lbutton_up(&mut self, form: FakeId, page: FakeId, _modifier: i32, x: f64, y: f64) -> bool {
        self.form_attached(form, page) && self.widget_at(page, x, y).is_some()
    }

    fn form_on_focus(&mut self, form: FakeId, page: FakeId, _modifier: i32, x: f64, y: f64) -> bool {
        self.set_focus(form, page, x, y)
    }

    fn form_on_key_down(&mut self, form: FakeId, page: FakeId, key_code: i32, _modifier: i32) -> bool {
        if key_code == VK_BACK {
            return self.edit_focused(form, page, |value| value.pop().is_some());
        }
        self.focused(form, page).is_some()
    }

    fn form_on_key_up(&mut self, form: FakeId, page: FakeId, _key_code: i32, _modifier: i32) -> bool {
        self.focused(form, page).is_some()
    }

    fn form_on_char(&mut self, form: FakeId, page: FakeId, ch: i32, _modifier: i32) -> bool {
        let Some(ch) = u32::try_from(ch).ok().and_then(char::from_u32) else {
            return false;
        };
        if ch.is_control() {
            return false;
        }
        self.edit_focused(form, page, |value| {
            value.push(ch);
            true
        })
    }

    fn form_can_undo(&self, form: FakeId, page: FakeId) -> bool {
        self.focused(form, page).is_some()
            && self.forms.get(&form).is_some_and(|s| !s.undo.is_empty())
    }

    fn form_can_redo(&self, form: FakeId, page: FakeId) -> bool {
        self.focused(form, page).is_some()
            && self.forms.get(&form).is_some_and(|s| !s.redo.is_empty())
    }

    fn form_undo(&mut self, form: FakeId, page: FakeId) -> bool {
        self.form_can_undo(form, page) && self.step_history(form, page, true)
    }

    fn form_redo(&mut self, form: FakeId, page: FakeId) -> bool {
        self.form_can_redo(form, page) && self.step_history(form, page, false)
    }

    fn form_select_all_text(&mut self, form: FakeId, page: FakeId) -> bool {
        self.focused(form, page).is_some()
    }

    fn form_set_highlight_color(&mut self, form: FakeId, field_type: i32, argb: u32) {
        if let Some(state) = self.forms.get_mut(&form) {
            state.highlight.insert(field_type, argb);
        }
    }

    fn form_set_highlight_alpha(&mut self, form: FakeId, alpha: u8) {
        if let Some(state) = self.forms.get_mut(&form) {
            state.highlight_alpha = alpha;
        }
    }

    fn form_remove_highlight(&mut self, form: FakeId) {
        if let Some(state) = self.forms.get_mut(&form) {
            state.highlight.clear();
            state.highlight_alpha = 0;
        }
    }

    fn attachment_count(&self, doc: FakeId) -> i32 {
        self.doc(doc).map_or(0, |d| d.attachments.len() as i32)
    }

    fn get_attachment(&self, doc: FakeId, index: i32) -> Option<FakeId> {
        let uid = self
            .doc(doc)?
            .attachments
            .get(usize::try_from(index).ok()?)?
            .uid;
        Some(self.intern(ViewKey::Attachment { doc, uid }))
    }

    fn attachment_name(&self, attachment: FakeId, buf: &mut [u16]) -> usize {
        let name = self.attachment(attachment).map(|a| a.name.as_str());
        self.put_wide(name, buf)
    }

    fn attachment_file(&self, attachment: FakeId, buf: &mut [u8]) -> Option<usize> {
        let contents = self.attachment(attachment)?.contents.as_deref()?;
        Some(self.put_bytes(Some(contents), buf))
    }

    fn add_attachment(&mut self, doc: FakeId, name: &[u16]) -> Option<FakeId> {
        let name = from_wide(name);
        let uid = self.fresh_id().0;
        let model = self.doc_mut(doc)?;
        if name.is_empty() || model.attachments.iter().any(|a| a.name == name) {
            return None;
        }
        model.attachments.push(FakeAttachment {
            name,
            contents: None,
            uid,
        });
        Some(self.intern(ViewKey::Attachment { doc, uid }))
    }

    fn set_attachment_file(&mut self, doc: FakeId, attachment: FakeId, contents: &[u8]) -> bool {
        let Some(ViewKey::Attachment { doc: owner, uid }) = self.view(attachment) else {
            return false;
        };
        if owner != doc {
            return false;
        }
        let Some(model) = self.doc_mut(doc) else {
            return false;
        };
        match model.attachments.iter_mut().find(|a| a.uid == uid) {
            Some(entry) => {
                entry.contents = Some(contents.to_vec());
                true
            }
            None => false,
        }
    }

    fn delete_attachment(&mut self, doc: FakeId, index: i32) -> bool {
        let Some(model) = self.doc_mut(doc) else {
            return false;
        };
        let Some(index) = usize::try_from(index).ok().filter(|i| *i < model.attachments.len()) else {
            return false;
        };
        let uid = model.attachments.remove(index).uid;
        self.forget_views(|key| *key == ViewKey::Attachment { doc, uid });
        true
    }

    fn signature_count(&self, doc: FakeId) -> i32 {
        self.doc(doc).map_or(0, |d| d.signatures.len() as i32)
    }

    fn get_signature(&self, doc: FakeId, index: i32) -> Option<FakeId> {
        let index = usize::try_from(index).ok()?;
        self.doc(doc)?.signatures.get(index)?;
        Some(self.intern(ViewKey::Signature { doc, index }))
    }

    fn signature_contents(&self, signature: FakeId, buf: &mut [u8]) -> usize {
        let contents = self.signature(signature).map(|s| s.contents.as_slice());
        self.put_bytes(contents.filter(|c| !c.is_empty()), buf)
    }

    fn signature_reason(&self, signature: FakeId, buf: &mut [u16]) -> usize {
        let reason = self
            .signature(signature)
            .map(|s| s.reason.as_str())
            .filter(|r| !r.is_empty());
        self.put_wide(reason, buf)
    }

    fn signature_time(&self, signature: FakeId, buf: &mut [u8]) -> usize {
        let time = self
            .signature(signature)
            .map(|s| s.time.as_str())
            .filter(|t| !t.is_empty());
        self.put_c_string(time, buf)
    }

    fn struct_tree_for_page(&mut self, page: FakeId) -> Option<FakeId> {
        self.page(page)?.structure.as_ref()?;
        let id = self.fresh_id();
        self.trees.insert(id, page);
        Some(id)
    }

    fn close_struct_tree(&mut self, tree: FakeId) {
        if self.trees.remove(&tree).is_none() {
            self.bump(|c| c.invalid_calls += 1);
            return;
        }
        self.forget_views(|key| matches!(key, ViewKey::Element { tree: t, .. } if *t == tree));
    }

    fn struct_tree_child_count(&self, tree: FakeId) -> i32 {
        self.trees
            .get(&tree)
            .and_then(|page| self.page(*page)?.structure.as_ref())
            .map_or(-1, |roots| roots.len() as i32)
    }

    fn struct_tree_child(&self, tree: FakeId, index: i32) -> Option<FakeId> {
        let index = usize::try_from(index).ok()?;
        let page = *self.trees.get(&tree)?;
        self.page(page)?.structure.as_ref()?.get(index)?;
        Some(self.intern(ViewKey::Element {
            tree,
            path: vec![index],
        }))
    }

    fn struct_element_type(&self, element: FakeId, buf: &mut [u16]) -> usize {
        let kind = self.element(element).map(|(_, _, e)| e.kind.as_str());
        self.put_wide(kind, buf)
    }

    fn struct_element_alt_text(&self, element: FakeId, buf: &mut [u16]) -> usize {
        let alt = self
            .element(element)
            .map(|(_, _, e)| e.alt_text.as_str())
            .filter(|alt| !alt.is_empty());
        self.put_wide(alt, buf)
    }

    fn struct_element_child_count(&self, element: FakeId) -> i32 {
        self.element(element)
            .map_or(-1, |(_, _, e)| e.children.len() as i32)
    }

    fn struct_element_child(&self, element: FakeId, index: i32) -> Option<FakeId> {
        let index = usize::try_from(index).ok()?;
        let (tree, mut path, node) = self.element(element)?;
        node.children.get(index)?;
        path.push(index);
        Some(self.intern(ViewKey::Element { tree, path }))
    }

    fn page_object_count(&self, page: FakeId) -> i32 {
        self.page(page).map_or(-1, |p| p.objects.len() as i32)
    }

    fn get_page_object(&self, page: FakeId, index: i32) -> Option<FakeId> {
        let object = self.page(page)?.objects.get(usize::try_from(index).ok()?)?;
        Some(FakeId(object.uid))
    }

    fn page_object_type(&self, object: FakeId) -> i32 {
        self.object(object).map_or(0, |o| o.kind)
    }

    fn new_text_object(&mut self, doc: FakeId, font: &CStr, size: f32) -> Option<FakeId> {
        self.doc(doc)?;
        let font = font.to_str().ok().filter(|f| STANDARD_FONTS.contains(f))?;
        let mut object = FakeObject::new(1, PageRect::new(0.0, 0.0, 0.0, size));
        object.font = Some(font.to_string());
        object.font_size = size;
        object.uid = self.fresh_id().0;
        let id = FakeId(object.uid);
        self.detached.insert(object.uid, object);
        Some(id)
    }

    fn create_text_object(&mut self, doc: FakeId, font: FakeId, size: f32) -> Option<FakeId> {
        let name = self.fonts.get(&font).filter(|f| f.doc == doc)?.name.clone();
        let name = std::ffi::CString::new(name).ok()?;
        self.new_text_object(doc, &name, size)
    }

    fn set_text(&mut self, object: FakeId, text: &[u16]) -> bool {
        match self.object_mut(object) {
            Some(o) if o.kind == 1 => {
                o.text = from_wide(text);
                let width = o.text.chars().count() as f32 * o.font_size * 0.5;
                o.bounds.right = o.bounds.left + width;
                true
            }
            _ => false,
        }
    }

    fn new_path(&mut self, x: f32, y: f32) -> Option<FakeId> {
        let mut object = FakeObject::new(2, PageRect::new(x, y, x, y));
        object.segments.push(FakeSegment::MoveTo(x, y));
        object.uid = self.fresh_id().0;
        let id = FakeId(object.uid);
        self.detached.insert(object.uid, object);
        Some(id)
    }

    fn path_move_to(&mut self, object: FakeId, x: f32, y: f32) -> bool {
        self.push_segment(object, FakeSegment::MoveTo(x, y))
    }

    fn path_line_to(&mut self, object: FakeId, x: f32, y: f32) -> bool {
        self.push_segment(object, FakeSegment::LineTo(x, y))
    }

    fn path_bezier_to(
        &mut self,
        object: FakeId,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
    ) -> bool {
        self.push_segment(object, FakeSegment::BezierTo([x1, y1, x2, y2, x3, y3]))
    }

    fn path_close(&mut self, object: FakeId) -> bool {
        self.push_segment(object, FakeSegment::Close)
    }

    fn path_set_draw_mode(&mut self, object: FakeId, fill_mode: i32, stroke: bool) -> bool {
        match self.object_mut(object) {
            Some(o) if o.kind == 2 && (0..=2).contains(&fill_mode) => {
                o.fill_mode = fill_mode;
                o.stroke = stroke;
                true
            }
            _ => false,
        }
    }

    fn set_stroke_width(&mut self, object: FakeId, width: f32) -> bool {
        match self.object_mut(object) {
            Some(o) if width >= 0.0 => {
                o.stroke_width = width;
                true
            }
            _ => false,
        }
    }

    fn new_image_object(&mut self, doc: FakeId) -> Option<FakeId> {
        self.doc(doc)?;
        let mut object = FakeObject::new(3, PageRect::default());
        object.uid = self.fresh_id().0;
        let id = FakeId(object.uid);
        self.detached.insert(object.uid, object);
        Some(id)
    }

    fn image_set_bitmap(&mut self, object: FakeId, bitmap: FakeId) -> bool {
        let Some(state) = self.bitmaps.get(&bitmap) else {
            self.bump(|c| c.invalid_calls += 1);
            return false;
        };
        let mut first = [0u8; 4];
        // SAFETY: the bitmap covers at least one pixel of caller memory that
        // outlives it.
        unsafe {
            std::ptr::copy_nonoverlapping(state.pixels, first.as_mut_ptr(), 4);
        }
        let (width, height) = (state.width as u32, state.height as u32);
        match self.object_mut(object) {
            Some(o) if o.kind == 3 => {
                o.image = Some((width, height, first));
                o.bounds = PageRect::new(0.0, 0.0, width as f32, height as f32);
                true
            }
            _ => false,
        }
    }

    fn insert_object(&mut self, page: FakeId, object: FakeId) {
        let Some(owned) = self.detached.remove(&object.0) else {
            self.bump(|c| c.invalid_calls += 1);
            return;
        };
        match self.page_mut(page) {
            Some(p) => p.objects.push(owned),
            None => {
                self.detached.insert(owned.uid, owned);
            }
        }
    }

    fn remove_object(&mut self, page: FakeId, object: FakeId) -> bool {
        let removed = self.page_mut(page).and_then(|p| {
            let index = p.objects.iter().position(|o| o.uid == object.0)?;
            Some(p.objects.remove(index))
        });
        match removed {
            Some(owned) => {
                self.detached.insert(owned.uid, owned);
                true
            }
            None => false,
        }
    }

    fn destroy_object(&mut self, object: FakeId) {
        if self.detached.remove(&object.0).is_some() {
            self.bump(|c| c.objects_destroyed += 1);
        } else {
            self.bump(|c| c.invalid_calls += 1);
        }
    }

    fn set_fill_color(&mut self, object: FakeId, color: Rgba) -> bool {
        self.object_mut(object).map(|o| o.fill_color = Some(color)).is_some()
    }

    fn set_stroke_color(&mut self, object: FakeId, color: Rgba) -> bool {
        self.object_mut(object).map(|o| o.stroke_color = Some(color)).is_some()
    }

    fn fill_color(&self, object: FakeId) -> Option<Rgba> {
        self.object(object)?.fill_color
    }

    fn stroke_color(&self, object: FakeId) -> Option<Rgba> {
        self.object(object)?.stroke_color
    }

    fn transform_object(&mut self, object: FakeId, matrix: Matrix) {
        let Some(o) = self.object_mut(object) else {
            return;
        };
        for segment in &mut o.segments {
            match segment {
                FakeSegment::MoveTo(x, y) | FakeSegment::LineTo(x, y) => {
                    (*x, *y) = transform_point(&matrix, *x, *y);
                }
                FakeSegment::BezierTo(p) => {
                    for pair in p.chunks_exact_mut(2) {
                        (pair[0], pair[1]) = transform_point(&matrix, pair[0], pair[1]);
                    }
                }
                FakeSegment::Close => {}
            }
        }
        let b = o.bounds;
        let corners = [
            transform_point(&matrix, b.left, b.bottom),
            transform_point(&matrix, b.right, b.bottom),
            transform_point(&matrix, b.right, b.top),
            transform_point(&matrix, b.left, b.top),
        ];
        if let Some(bounds) = bounds_of(&corners) {
            o.bounds = bounds;
        }
    }

    fn object_bounds(&self, object: FakeId) -> Option<PageRect> {
        Some(self.object(object)?.bounds)
    }

    fn load_standard_font(&mut self, doc: FakeId, name: &CStr) -> Option<FakeId> {
        self.doc(doc)?;
        let name = name.to_str().ok().filter(|n| STANDARD_FONTS.contains(n))?;
        let id = self.fresh_id();
        self.fonts.insert(
            id,
            FontState {
                doc,
                name: name.to_string(),
            },
        );
        Some(id)
    }

    fn close_font(&mut self, font: FakeId) {
        if self.fonts.remove(&font).is_none() {
            self.bump(|c| c.invalid_calls += 1);
        }
    }
}

impl FakeBindings {
    fn push_segment(&mut self, object: FakeId, segment: FakeSegment) -> bool {
        match self.object_mut(object) {
            Some(o) if o.kind == 2 => {
                o.segments.push(segment);
                if let Some(bounds) = bounds_of(&segment_points(&o.segments)) {
                    o.bounds = bounds;
                }
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(fake: &mut FakeBindings, doc: &FakeDocument) -> FakeId {
        let bytes = doc.to_bytes();
        let leaked: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        unsafe { fake.load_mem_document(leaked.as_ptr(), leaked.len(), None) }.unwrap()
    }

    #[test]
    fn test_wrong_magic_sets_format_error() {
        let mut fake = FakeBindings::new();
        let bytes = b"%PDF-1.7\n".to_vec();
        let doc = unsafe { fake.load_mem_document(bytes.as_ptr(), bytes.len(), None) };
        assert!(doc.is_none());
        assert_eq!(fake.last_error(), raw::FPDF_ERR_FORMAT);
    }

    #[test]
    fn test_password_checked() {
        let mut fake = FakeBindings::new();
        let bytes = FakeDocument::with_blank_pages(1, 10.0, 10.0)
            .with_password("pw")
            .to_bytes();
        let doc = unsafe { fake.load_mem_document(bytes.as_ptr(), bytes.len(), None) };
        assert!(doc.is_none());
        assert_eq!(fake.last_error(), raw::FPDF_ERR_PASSWORD);
        let doc = unsafe { fake.load_mem_document(bytes.as_ptr(), bytes.len(), Some(c"pw")) };
        assert!(doc.is_some());
        assert_eq!(fake.last_error(), raw::FPDF_ERR_SUCCESS);
    }

    #[test]
    fn test_close_out_of_order_is_counted() {
        let mut fake = FakeBindings::new();
        let doc = open(&mut fake, &FakeDocument::with_blank_pages(2, 100.0, 100.0));
        let page = fake.load_page(doc, 1).unwrap();
        fake.close_document(doc);
        assert_eq!(fake.counters().invalid_calls, 1);
        fake.close_page(page);
    }

    #[test]
    fn test_progressive_steps() {
        let mut fake = FakeBindings::new();
        let model = FakeDocument::new().with_page(FakePage::new(100.0, 100.0).with_render_steps(3));
        let doc = open(&mut fake, &model);
        let page = fake.load_page(doc, 0).unwrap();
        let mut pixels = vec![0u8; 4 * 4 * 4];
        let bitmap = unsafe {
            fake.create_external_bitmap(4, 4, raw::FPDFBITMAP_BGRA, pixels.as_mut_ptr(), 16)
        }
        .unwrap();
        let viewport = Viewport::new(1, 1, 2, 2);
        let mut always = || true;
        assert_eq!(
            fake.render_start(bitmap, page, viewport, 0, 0, Some(&mut always)),
            raw::FPDF_RENDER_TOBECONTINUED
        );
        assert_eq!(
            fake.render_continue(page, Some(&mut always)),
            raw::FPDF_RENDER_TOBECONTINUED
        );
        assert_eq!(fake.render_continue(page, Some(&mut always)), raw::FPDF_RENDER_DONE);
        fake.render_close(page);
        fake.destroy_bitmap(bitmap);
        assert_eq!(&pixels[20..24], &[0, 0, 255, 255]);
        assert_eq!(fake.counters().invalid_calls, 0);
    }

    #[test]
    fn test_search_cursor_ends() {
        let mut fake = FakeBindings::new();
        let model = FakeDocument::new().with_page(FakePage::letter().with_text("ab ab"));
        let doc = open(&mut fake, &model);
        let page = fake.load_page(doc, 0).unwrap();
        let text = fake.load_text_page(page).unwrap();
        let search = fake.find_start(text, &to_wide("ab"), 0, 0).unwrap();
        assert!(fake.find_next(search));
        assert!(fake.find_next(search));
        assert_eq!(fake.search_result_index(search), 3);
        assert!(!fake.find_next(search));
        assert_eq!(fake.search_result_index(search), -1);
        assert!(fake.find_prev(search));
        assert_eq!(fake.search_result_index(search), 3);
    }

    #[test]
    fn test_short_fill_mode() {
        let mut fake = FakeBindings::new().with_short_fills();
        let doc = open(&mut fake, &FakeDocument::new().with_metadata("Title", "Hello"));
        let needed = fake.meta_text(doc, c"Title", &mut []);
        assert_eq!(needed, 12);
        let mut buf = vec![0u16; 6];
        assert_eq!(fake.meta_text(doc, c"Title", &mut buf), 10);
    }
}
