//! In-memory [`PdfiumBindings`] implementation.
//!
//! `FakeBindings` stands in for the C library in tests and examples. It
//! loads documents serialized from a [`FakeDocument`], keeps the same
//! ownership rules as the real library (every handle it hands out must be
//! closed exactly once, children before parents) and counts protocol
//! violations instead of crashing, so tests can assert that the session
//! layer drove it correctly.
//!
//! Text layout is synthetic: character `i` sits on line `i / 80` at
//! `left = 10 + (i % 80) * 6`, five points wide and ten tall, with lines
//! twelve points apart from twenty points below the top of the page.
//!
//! [`PdfiumBindings`]: crate::bindings::PdfiumBindings

mod bindings;
mod model;

pub use bindings::INK;
pub use model::*;

use crate::geometry::{CharBox, PageRect};
use crate::transform::Viewport;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// Raw handle value issued by [`FakeBindings`]. Zero is never issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FakeId(u64);

/// Calls observed by the fake, for protocol assertions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FakeCounters {
    pub inits: usize,
    pub destroys: usize,
    /// Variable-length getters called with an empty buffer.
    pub string_queries: usize,
    /// Variable-length getters called with a buffer to fill.
    pub string_fills: usize,
    pub documents_loaded: usize,
    pub documents_closed: usize,
    pub pages_loaded: usize,
    pub pages_closed: usize,
    pub form_inits: usize,
    pub form_exits: usize,
    /// Form callback records released through the teardown callback.
    pub form_releases: usize,
    pub page_attaches: usize,
    pub page_detaches: usize,
    /// Page hooks sent twice, never sent, or sent for an unattached page.
    pub unpaired_hooks: usize,
    pub renders: usize,
    pub render_starts: usize,
    pub render_continues: usize,
    pub render_closes: usize,
    pub pause_checks: usize,
    pub bitmaps_created: usize,
    pub bitmaps_destroyed: usize,
    pub objects_destroyed: usize,
    pub save_blocks: usize,
    /// Unknown or already closed handles, and closes out of dependency order.
    pub invalid_calls: usize,
}

/// Bytes per block handed to the save sink.
pub const SAVE_BLOCK: usize = 64;

pub(crate) const STANDARD_FONTS: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-BoldOblique",
    "Courier-Oblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-BoldOblique",
    "Helvetica-Oblique",
    "Times-Roman",
    "Times-Bold",
    "Times-BoldItalic",
    "Times-Italic",
    "Symbol",
    "ZapfDingbats",
];

const CHARS_PER_LINE: usize = 80;
const CHAR_LEFT: f64 = 10.0;
const CHAR_ADVANCE: f64 = 6.0;
const CHAR_WIDTH: f64 = 5.0;
const CHAR_HEIGHT: f64 = 10.0;
const LINE_HEIGHT: f64 = 12.0;
const TOP_MARGIN: f64 = 20.0;

/// Box of character `index` on a page `page_height` points tall.
pub fn fake_char_box(index: usize, page_height: f64) -> CharBox {
    let line = (index / CHARS_PER_LINE) as f64;
    let left = CHAR_LEFT + (index % CHARS_PER_LINE) as f64 * CHAR_ADVANCE;
    let top = page_height - TOP_MARGIN - line * LINE_HEIGHT;
    CharBox {
        left,
        top,
        right: left + CHAR_WIDTH,
        bottom: top - CHAR_HEIGHT,
    }
}

pub(crate) struct DocState {
    pub model: FakeDocument,
    /// Address and length of caller memory the document was loaded from.
    pub source: Option<(usize, usize)>,
}

pub(crate) struct Progress {
    pub bitmap: FakeId,
    pub viewport: Viewport,
    pub flags: i32,
    pub remaining: u32,
}

pub(crate) struct PageState {
    pub doc: FakeId,
    pub uid: u64,
    pub progress: Option<Progress>,
}

pub(crate) struct TextState {
    pub page: FakeId,
    pub units: Vec<u16>,
    pub page_height: f64,
    pub rects: Vec<PageRect>,
}

pub(crate) struct SearchState {
    pub text: FakeId,
    pub matches: Vec<i32>,
    pub len: i32,
    /// Character index the first `find_next` searches from.
    pub start: i32,
    /// Index into `matches`; -1 before the first, `matches.len()` past the last.
    pub pos: isize,
}

pub(crate) struct WebLinksState {
    pub text: FakeId,
    pub urls: Vec<String>,
}

pub(crate) struct AnnotState {
    pub page: FakeId,
    pub uid: u64,
}

pub(crate) struct BitmapState {
    pub pixels: *mut u8,
    pub width: i32,
    pub height: i32,
    pub stride: i32,
}

pub(crate) struct FormState {
    pub doc: FakeId,
    pub on_release: Option<Box<dyn FnOnce()>>,
    pub attached: HashSet<FakeId>,
    /// Focused widget as (page, annotation uid).
    pub focus: Option<(FakeId, u64)>,
    pub undo: Vec<(u64, String)>,
    pub redo: Vec<(u64, String)>,
    pub highlight: HashMap<i32, u32>,
    pub highlight_alpha: u8,
}

pub(crate) struct FontState {
    pub doc: FakeId,
    pub name: String,
}

/// What a library-owned view points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ViewKey {
    Bookmark { doc: FakeId, path: Vec<usize> },
    Action { owner: FakeId },
    Link { page: FakeId, index: usize },
    Element { tree: FakeId, path: Vec<usize> },
    Attachment { doc: FakeId, uid: u64 },
    Signature { doc: FakeId, index: usize },
}

#[derive(Default)]
pub(crate) struct Views {
    ids: HashMap<ViewKey, FakeId>,
    keys: HashMap<FakeId, ViewKey>,
}

/// The in-memory library.
pub struct FakeBindings {
    next_id: Cell<u64>,
    counters: Cell<FakeCounters>,
    last_error: Cell<u32>,
    last_render_flags: Cell<i32>,
    short_fills: bool,
    initialized: bool,
    pub(crate) docs: HashMap<FakeId, DocState>,
    pub(crate) pages: HashMap<FakeId, PageState>,
    pub(crate) texts: HashMap<FakeId, TextState>,
    pub(crate) searches: HashMap<FakeId, SearchState>,
    pub(crate) web_links: HashMap<FakeId, WebLinksState>,
    pub(crate) annots: HashMap<FakeId, AnnotState>,
    /// Page objects not inserted into any page, keyed by uid.
    pub(crate) detached: HashMap<u64, FakeObject>,
    pub(crate) fonts: HashMap<FakeId, FontState>,
    pub(crate) bitmaps: HashMap<FakeId, BitmapState>,
    pub(crate) forms: HashMap<FakeId, FormState>,
    pub(crate) trees: HashMap<FakeId, FakeId>,
    views: RefCell<Views>,
}

impl Default for FakeBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBindings {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(1),
            counters: Cell::new(FakeCounters::default()),
            last_error: Cell::new(0),
            last_render_flags: Cell::new(0),
            short_fills: false,
            initialized: false,
            docs: HashMap::new(),
            pages: HashMap::new(),
            texts: HashMap::new(),
            searches: HashMap::new(),
            web_links: HashMap::new(),
            annots: HashMap::new(),
            detached: HashMap::new(),
            fonts: HashMap::new(),
            bitmaps: HashMap::new(),
            forms: HashMap::new(),
            trees: HashMap::new(),
            views: RefCell::new(Views::default()),
        }
    }

    /// Make every fill write two bytes less than its size query promised.
    pub fn with_short_fills(mut self) -> Self {
        self.short_fills = true;
        self
    }

    pub fn counters(&self) -> FakeCounters {
        self.counters.get()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn live_documents(&self) -> usize {
        self.docs.len()
    }

    pub fn live_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn live_text_pages(&self) -> usize {
        self.texts.len()
    }

    pub fn live_searches(&self) -> usize {
        self.searches.len()
    }

    pub fn live_annotations(&self) -> usize {
        self.annots.len()
    }

    pub fn live_bitmaps(&self) -> usize {
        self.bitmaps.len()
    }

    pub fn live_forms(&self) -> usize {
        self.forms.len()
    }

    pub fn detached_objects(&self) -> usize {
        self.detached.len()
    }

    /// Render flags passed to the most recent render or form draw.
    pub fn last_render_flags(&self) -> i32 {
        self.last_render_flags.get()
    }

    /// Address and length of the memory each open document reads from.
    pub fn document_sources(&self) -> Vec<(usize, usize)> {
        self.docs.values().filter_map(|doc| doc.source).collect()
    }

    pub(crate) fn bump(&self, update: impl FnOnce(&mut FakeCounters)) {
        bump(&self.counters, update);
    }

    pub(crate) fn fresh_id(&self) -> FakeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        FakeId(id)
    }

    pub(crate) fn set_last_error(&self, code: u32) {
        self.last_error.set(code);
    }

    pub(crate) fn last_error_code(&self) -> u32 {
        self.last_error.get()
    }

    pub(crate) fn record_render_flags(&self, flags: i32) {
        self.last_render_flags.set(flags);
    }

    pub(crate) fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    /// Give every page, annotation, object and attachment a fresh identity.
    pub(crate) fn assign_uids(&self, model: &mut FakeDocument) {
        for page in &mut model.pages {
            self.assign_page_uids(page);
        }
        for attachment in &mut model.attachments {
            attachment.uid = self.fresh_id().0;
        }
    }

    pub(crate) fn assign_page_uids(&self, page: &mut FakePage) {
        page.uid = self.fresh_id().0;
        for annotation in &mut page.annotations {
            annotation.uid = self.fresh_id().0;
        }
        for object in &mut page.objects {
            object.uid = self.fresh_id().0;
        }
    }

    pub(crate) fn intern(&self, key: ViewKey) -> FakeId {
        if let Some(&id) = self.views.borrow().ids.get(&key) {
            return id;
        }
        let id = self.fresh_id();
        let mut views = self.views.borrow_mut();
        views.ids.insert(key.clone(), id);
        views.keys.insert(id, key);
        id
    }

    pub(crate) fn view(&self, id: FakeId) -> Option<ViewKey> {
        let key = self.views.borrow().keys.get(&id).cloned();
        if key.is_none() {
            self.bump(|c| c.invalid_calls += 1);
        }
        key
    }

    /// Drop views whose key matches, e.g. when their parent goes away.
    pub(crate) fn forget_views(&self, mut pred: impl FnMut(&ViewKey) -> bool) {
        let mut views = self.views.borrow_mut();
        let stale: Vec<FakeId> = views
            .keys
            .iter()
            .filter(|(_, key)| pred(key))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            if let Some(key) = views.keys.remove(&id) {
                views.ids.remove(&key);
            }
        }
    }

    pub(crate) fn doc(&self, doc: FakeId) -> Option<&FakeDocument> {
        match self.docs.get(&doc) {
            Some(state) => Some(&state.model),
            None => missing(&self.counters),
        }
    }

    pub(crate) fn doc_mut(&mut self, doc: FakeId) -> Option<&mut FakeDocument> {
        match self.docs.get_mut(&doc) {
            Some(state) => Some(&mut state.model),
            None => missing(&self.counters),
        }
    }

    pub(crate) fn page(&self, page: FakeId) -> Option<&FakePage> {
        let Some(&PageState { doc, uid, .. }) = self.pages.get(&page) else {
            return missing(&self.counters);
        };
        match self
            .docs
            .get(&doc)
            .and_then(|state| state.model.pages.iter().find(|p| p.uid == uid))
        {
            Some(found) => Some(found),
            None => missing(&self.counters),
        }
    }

    pub(crate) fn page_mut(&mut self, page: FakeId) -> Option<&mut FakePage> {
        let Some(&PageState { doc, uid, .. }) = self.pages.get(&page) else {
            return missing(&self.counters);
        };
        match self
            .docs
            .get_mut(&doc)
            .and_then(|state| state.model.pages.iter_mut().find(|p| p.uid == uid))
        {
            Some(found) => Some(found),
            None => missing(&self.counters),
        }
    }

    pub(crate) fn annot(&self, annot: FakeId) -> Option<&FakeAnnotation> {
        let Some(&AnnotState { page, uid }) = self.annots.get(&annot) else {
            return missing(&self.counters);
        };
        self.page(page)?.annotations.iter().find(|a| a.uid == uid)
    }

    pub(crate) fn annot_mut(&mut self, annot: FakeId) -> Option<&mut FakeAnnotation> {
        let Some(&AnnotState { page, uid }) = self.annots.get(&annot) else {
            return missing(&self.counters);
        };
        self.page_mut(page)?
            .annotations
            .iter_mut()
            .find(|a| a.uid == uid)
    }

    pub(crate) fn object(&self, object: FakeId) -> Option<&FakeObject> {
        if let Some(found) = self.detached.get(&object.0) {
            return Some(found);
        }
        let found = self
            .docs
            .values()
            .flat_map(|doc| doc.model.pages.iter())
            .flat_map(|page| page.objects.iter())
            .find(|o| o.uid == object.0);
        match found {
            Some(found) => Some(found),
            None => missing(&self.counters),
        }
    }

    pub(crate) fn object_mut(&mut self, object: FakeId) -> Option<&mut FakeObject> {
        if self.detached.contains_key(&object.0) {
            return self.detached.get_mut(&object.0);
        }
        let found = self
            .docs
            .values_mut()
            .flat_map(|doc| doc.model.pages.iter_mut())
            .flat_map(|page| page.objects.iter_mut())
            .find(|o| o.uid == object.0);
        match found {
            Some(found) => Some(found),
            None => missing(&self.counters),
        }
    }

    /// Write a UTF-16LE value the way the C API does, returning bytes.
    pub(crate) fn put_wide(&self, value: Option<&str>, buf: &mut [u16]) -> usize {
        self.count_buffer_call(buf.is_empty());
        let Some(value) = value else {
            return 0;
        };
        let wide = crate::marshal::to_wide(value);
        let bytes = wide.len() * crate::marshal::WIDE_UNIT;
        if buf.is_empty() || buf.len() < wide.len() {
            return bytes;
        }
        buf[..wide.len()].copy_from_slice(&wide);
        if self.short_fills {
            bytes.saturating_sub(crate::marshal::WIDE_UNIT)
        } else {
            bytes
        }
    }

    /// Byte payload counterpart of [`FakeBindings::put_wide`].
    pub(crate) fn put_bytes(&self, value: Option<&[u8]>, buf: &mut [u8]) -> usize {
        self.count_buffer_call(buf.is_empty());
        let Some(value) = value else {
            return 0;
        };
        if buf.is_empty() || buf.len() < value.len() {
            return value.len();
        }
        buf[..value.len()].copy_from_slice(value);
        if self.short_fills {
            value.len().saturating_sub(1)
        } else {
            value.len()
        }
    }

    /// NUL-terminated byte string, absent when `value` is `None`.
    pub(crate) fn put_c_string(&self, value: Option<&str>, buf: &mut [u8]) -> usize {
        let bytes = value.map(|v| {
            let mut bytes = v.as_bytes().to_vec();
            bytes.push(0);
            bytes
        });
        self.put_bytes(bytes.as_deref(), buf)
    }

    fn count_buffer_call(&self, query: bool) {
        if query {
            self.bump(|c| c.string_queries += 1);
        } else {
            self.bump(|c| c.string_fills += 1);
        }
    }
}

pub(crate) fn bump(counters: &Cell<FakeCounters>, update: impl FnOnce(&mut FakeCounters)) {
    let mut current = counters.get();
    update(&mut current);
    counters.set(current);
}

/// Record an unknown handle and yield nothing.
pub(crate) fn missing<T>(counters: &Cell<FakeCounters>) -> Option<T> {
    bump(counters, |c| c.invalid_calls += 1);
    None
}

/// Walk a tree of nodes by child index path.
pub(crate) fn node_at<'a, T>(
    nodes: &'a [T],
    path: &[usize],
    children: impl Fn(&T) -> &[T],
) -> Option<&'a T> {
    let (first, rest) = path.split_first()?;
    let mut node = nodes.get(*first)?;
    for index in rest {
        node = children(node).get(*index)?;
    }
    Some(node)
}

/// Parse a 1-based page range like `1,3-5` into zero-based indices.
pub(crate) fn parse_page_range(range: &str, count: usize) -> Option<Vec<usize>> {
    let mut pages = Vec::new();
    for part in range.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (a.trim().parse::<usize>().ok()?, b.trim().parse::<usize>().ok()?),
            None => {
                let page = part.parse::<usize>().ok()?;
                (page, page)
            }
        };
        if start == 0 || end < start || end > count {
            return None;
        }
        pages.extend(start - 1..end);
    }
    if pages.is_empty() {
        None
    } else {
        Some(pages)
    }
}

/// Start indices of `query` in `text`.
pub(crate) fn find_matches(text: &[u16], query: &[u16], flags: u32) -> Vec<i32> {
    use crate::bindings::raw;

    if query.is_empty() || query.len() > text.len() {
        return Vec::new();
    }
    let fold = |unit: u16| {
        if flags & raw::FPDF_MATCHCASE == 0 && unit < 128 {
            (unit as u8).to_ascii_lowercase() as u16
        } else {
            unit
        }
    };
    let is_word = |unit: u16| unit < 128 && (unit as u8).is_ascii_alphanumeric();

    let mut matches = Vec::new();
    let mut start = 0;
    while start + query.len() <= text.len() {
        let window = &text[start..start + query.len()];
        let hit = window.iter().zip(query).all(|(a, b)| fold(*a) == fold(*b));
        let bounded = flags & raw::FPDF_MATCHWHOLEWORD == 0
            || ((start == 0 || !is_word(text[start - 1]))
                && text
                    .get(start + query.len())
                    .map_or(true, |unit| !is_word(*unit)));
        if hit && bounded {
            matches.push(start as i32);
            if flags & raw::FPDF_CONSECUTIVE == 0 {
                start += query.len();
                continue;
            }
        }
        start += 1;
    }
    matches
}

/// URL-looking tokens in page text.
pub(crate) fn detect_urls(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| token.trim_end_matches(['.', ',', ';', ')']))
        .filter(|token| {
            token.starts_with("http://") || token.starts_with("https://") || token.starts_with("www.")
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::raw;
    use crate::marshal::to_wide;

    fn units(text: &str) -> Vec<u16> {
        let mut wide = to_wide(text);
        wide.pop();
        wide
    }

    #[test]
    fn test_char_layout() {
        let first = fake_char_box(0, 800.0);
        assert_eq!(first.left, 10.0);
        assert_eq!(first.top, 780.0);
        let wrapped = fake_char_box(81, 800.0);
        assert_eq!(wrapped.left, 16.0);
        assert_eq!(wrapped.top, 768.0);
    }

    #[test]
    fn test_page_range() {
        assert_eq!(parse_page_range("1,3-4", 5), Some(vec![0, 2, 3]));
        assert_eq!(parse_page_range("2", 2), Some(vec![1]));
        assert_eq!(parse_page_range("0", 3), None);
        assert_eq!(parse_page_range("2-9", 3), None);
        assert_eq!(parse_page_range("x", 3), None);
        assert_eq!(parse_page_range("", 3), None);
    }

    #[test]
    fn test_find_matches_flags() {
        let text = units("Cat cat concat cat");
        assert_eq!(find_matches(&text, &units("cat"), 0), vec![0, 4, 11, 15]);
        assert_eq!(
            find_matches(&text, &units("cat"), raw::FPDF_MATCHCASE),
            vec![4, 11, 15]
        );
        assert_eq!(
            find_matches(&text, &units("cat"), raw::FPDF_MATCHWHOLEWORD),
            vec![0, 4, 15]
        );
        assert!(find_matches(&text, &[], 0).is_empty());
    }

    #[test]
    fn test_find_matches_overlap() {
        let text = units("aaaa");
        assert_eq!(find_matches(&text, &units("aa"), 0), vec![0, 2]);
        assert_eq!(
            find_matches(&text, &units("aa"), raw::FPDF_CONSECUTIVE),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_detect_urls() {
        let urls = detect_urls("see https://example.com/a, or www.rust-lang.org. done");
        assert_eq!(urls, vec!["https://example.com/a", "www.rust-lang.org"]);
    }
}
