//! [`PdfiumBindings`] over the real library through `pdfium-sys`.
//!
//! Only compiled with the `native` feature and when the build found PDFium
//! headers. Each method is one C call; the three callback records PDFium
//! holds on to (`IFSDK_PAUSE`, `FPDF_FILEWRITE` and `FPDF_FORMFILLINFO`) are
//! `#[repr(C)]` wrappers whose first field is the C struct, so the pointer
//! the library hands back can be cast to the wrapper.

use crate::bindings::{BlockSink, PauseProbe, PdfiumBindings};
use crate::config::LibraryConfig;
use crate::geometry::{CharBox, PageBox, PageRect, PointF, QuadPoints, Rgba};
use crate::transform::{Matrix, Viewport};
use pdfium_sys::*;
use std::ffi::{c_char, c_int, c_uint, c_ulong, c_void, CStr, CString};
use std::ptr;

fn non_null<T>(ptr: *mut T) -> Option<*mut T> {
    (!ptr.is_null()).then_some(ptr)
}

fn out_ptr<T, U>(buf: &mut [T]) -> *mut U {
    if buf.is_empty() {
        ptr::null_mut()
    } else {
        buf.as_mut_ptr().cast()
    }
}

fn out_len<T>(buf: &[T]) -> c_ulong {
    std::mem::size_of_val(buf) as c_ulong
}

fn c_str_ptr(value: Option<&CStr>) -> *const c_char {
    value.map_or(ptr::null(), CStr::as_ptr)
}

fn to_rectf(rect: PageRect) -> FS_RECTF {
    FS_RECTF {
        left: rect.left,
        top: rect.top,
        right: rect.right,
        bottom: rect.bottom,
    }
}

fn from_rectf(rect: FS_RECTF) -> PageRect {
    PageRect::new(rect.left, rect.bottom, rect.right, rect.top)
}

fn to_quad(quad: QuadPoints) -> FS_QUADPOINTSF {
    FS_QUADPOINTSF {
        x1: quad.x1,
        y1: quad.y1,
        x2: quad.x2,
        y2: quad.y2,
        x3: quad.x3,
        y3: quad.y3,
        x4: quad.x4,
        y4: quad.y4,
    }
}

fn from_quad(quad: FS_QUADPOINTSF) -> QuadPoints {
    QuadPoints::from_slice(&[
        quad.x1, quad.y1, quad.x2, quad.y2, quad.x3, quad.y3, quad.x4, quad.y4,
    ])
}

// ----------------------------------------------------------------------
// Callback records
// ----------------------------------------------------------------------

unsafe extern "C" fn need_to_pause(pause: *mut _IFSDK_PAUSE) -> FPDF_BOOL {
    if pause.is_null() || (*pause).user.is_null() {
        return 0;
    }
    let probe = &mut *((*pause).user as *mut PauseProbe<'_>);
    FPDF_BOOL::from(probe())
}

/// Run `f` with an `IFSDK_PAUSE` that forwards to `probe`. Without a probe
/// the record never asks to pause; the progressive entry points reject a
/// null record. The record only lives for the call.
fn with_pause<R>(probe: Option<PauseProbe<'_>>, f: impl FnOnce(*mut IFSDK_PAUSE) -> R) -> R {
    match probe {
        None => {
            let mut record = IFSDK_PAUSE {
                version: 1,
                NeedToPauseNow: Some(need_to_pause),
                user: ptr::null_mut(),
            };
            f(&mut record)
        }
        Some(mut probe) => {
            let mut record = IFSDK_PAUSE {
                version: 1,
                NeedToPauseNow: Some(need_to_pause),
                user: (&mut probe as *mut PauseProbe<'_>).cast(),
            };
            f(&mut record)
        }
    }
}

#[repr(C)]
struct FileWriter {
    base: FPDF_FILEWRITE,
    sink: *mut c_void,
}

unsafe extern "C" fn write_block(
    this: *mut FPDF_FILEWRITE,
    data: *const c_void,
    size: c_ulong,
) -> c_int {
    if this.is_null() {
        return 0;
    }
    let writer = &mut *this.cast::<FileWriter>();
    let sink = &mut *(writer.sink as *mut BlockSink<'_>);
    let block = if data.is_null() || size == 0 {
        &[][..]
    } else {
        std::slice::from_raw_parts(data.cast::<u8>(), size as usize)
    };
    c_int::from(sink(block))
}

/// Form-fill record handed to `FPDFDOC_InitFormFillEnvironment`. Owned by
/// the library from init until it calls `Release` on teardown.
#[repr(C)]
struct FormRecord {
    info: FPDF_FORMFILLINFO,
    on_release: Option<Box<dyn FnOnce()>>,
}

unsafe extern "C" fn release_form_record(info: *mut FPDF_FORMFILLINFO) {
    if info.is_null() {
        return;
    }
    let record = Box::from_raw(info.cast::<FormRecord>());
    if let Some(on_release) = record.on_release {
        on_release();
    }
}

// ----------------------------------------------------------------------
// Bindings
// ----------------------------------------------------------------------

/// The PDFium shared library.
#[derive(Debug, Default)]
pub struct NativeBindings {
    font_paths: Vec<CString>,
    font_path_ptrs: Vec<*const c_char>,
}

impl NativeBindings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PdfiumBindings for NativeBindings {
    type Document = FPDF_DOCUMENT;
    type Page = FPDF_PAGE;
    type TextPage = FPDF_TEXTPAGE;
    type Search = FPDF_SCHHANDLE;
    type WebLinks = FPDF_PAGELINK;
    type Annotation = FPDF_ANNOTATION;
    type PageObject = FPDF_PAGEOBJECT;
    type Font = FPDF_FONT;
    type Bitmap = FPDF_BITMAP;
    type Bookmark = FPDF_BOOKMARK;
    type Dest = FPDF_DEST;
    type Action = FPDF_ACTION;
    type Link = FPDF_LINK;
    type Form = FPDF_FORMHANDLE;
    type StructTree = FPDF_STRUCTTREE;
    type StructElement = FPDF_STRUCTELEMENT;
    type Signature = FPDF_SIGNATURE;
    type Attachment = FPDF_ATTACHMENT;

    fn init_library(&mut self, config: &LibraryConfig) {
        self.font_paths = config
            .user_font_paths
            .iter()
            .filter_map(|path| match CString::new(path.to_string_lossy().into_owned()) {
                Ok(path) => Some(path),
                Err(_) => {
                    tracing::warn!(path = %path.display(), "skipping font path with NUL byte");
                    None
                }
            })
            .collect();
        self.font_path_ptrs = self.font_paths.iter().map(|p| p.as_ptr()).collect();
        self.font_path_ptrs.push(ptr::null());

        let mut raw: FPDF_LIBRARY_CONFIG = unsafe { std::mem::zeroed() };
        raw.version = config.config_version;
        raw.m_pUserFontPaths = if self.font_paths.is_empty() {
            ptr::null_mut()
        } else {
            self.font_path_ptrs.as_mut_ptr()
        };
        unsafe { FPDF_InitLibraryWithConfig(&raw) };
    }

    fn destroy_library(&mut self) {
        unsafe { FPDF_DestroyLibrary() };
        self.font_path_ptrs.clear();
        self.font_paths.clear();
    }

    fn last_error(&self) -> u32 {
        unsafe { FPDF_GetLastError() as u32 }
    }

    // Documents

    unsafe fn load_mem_document(
        &mut self,
        data: *const u8,
        len: usize,
        password: Option<&CStr>,
    ) -> Option<FPDF_DOCUMENT> {
        non_null(FPDF_LoadMemDocument64(data.cast(), len, c_str_ptr(password)))
    }

    fn load_document(&mut self, path: &CStr, password: Option<&CStr>) -> Option<FPDF_DOCUMENT> {
        non_null(unsafe { FPDF_LoadDocument(path.as_ptr(), c_str_ptr(password)) })
    }

    fn create_new_document(&mut self) -> Option<FPDF_DOCUMENT> {
        non_null(unsafe { FPDF_CreateNewDocument() })
    }

    fn close_document(&mut self, doc: FPDF_DOCUMENT) {
        unsafe { FPDF_CloseDocument(doc) }
    }

    fn page_count(&self, doc: FPDF_DOCUMENT) -> i32 {
        unsafe { FPDF_GetPageCount(doc) }
    }

    fn meta_text(&self, doc: FPDF_DOCUMENT, tag: &CStr, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDF_GetMetaText(doc, tag.as_ptr(), out_ptr(buf), len) as usize }
    }

    fn page_label(&self, doc: FPDF_DOCUMENT, index: i32, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDF_GetPageLabel(doc, index, out_ptr(buf), len) as usize }
    }

    fn page_size_by_index(&self, doc: FPDF_DOCUMENT, index: i32) -> Option<(f64, f64)> {
        let (mut width, mut height) = (0.0, 0.0);
        let ok = unsafe { FPDF_GetPageSizeByIndex(doc, index, &mut width, &mut height) };
        (ok != 0).then_some((width, height))
    }

    fn import_pages(
        &mut self,
        dest: FPDF_DOCUMENT,
        src: FPDF_DOCUMENT,
        range: Option<&CStr>,
        index: i32,
    ) -> bool {
        unsafe { FPDF_ImportPages(dest, src, c_str_ptr(range), index) != 0 }
    }

    fn copy_viewer_preferences(&mut self, dest: FPDF_DOCUMENT, src: FPDF_DOCUMENT) -> bool {
        unsafe { FPDF_CopyViewerPreferences(dest, src) != 0 }
    }

    fn delete_page(&mut self, doc: FPDF_DOCUMENT, index: i32) {
        unsafe { FPDFPage_Delete(doc, index) }
    }

    fn new_page(
        &mut self,
        doc: FPDF_DOCUMENT,
        index: i32,
        width: f64,
        height: f64,
    ) -> Option<FPDF_PAGE> {
        non_null(unsafe { FPDFPage_New(doc, index, width, height) })
    }

    fn save_as_copy(&mut self, doc: FPDF_DOCUMENT, flags: u32, mut sink: BlockSink<'_>) -> bool {
        let mut writer = FileWriter {
            base: FPDF_FILEWRITE {
                version: 1,
                WriteBlock: Some(write_block),
            },
            sink: (&mut sink as *mut BlockSink<'_>).cast(),
        };
        let file_write = (&mut writer as *mut FileWriter).cast::<FPDF_FILEWRITE>();
        unsafe { FPDF_SaveAsCopy(doc, file_write, flags as FPDF_DWORD) != 0 }
    }

    fn form_type(&self, doc: FPDF_DOCUMENT) -> i32 {
        unsafe { FPDF_GetFormType(doc) }
    }

    fn page_mode(&self, doc: FPDF_DOCUMENT) -> i32 {
        unsafe { FPDFDoc_GetPageMode(doc) }
    }

    fn javascript_action_count(&self, doc: FPDF_DOCUMENT) -> i32 {
        unsafe { FPDFDoc_GetJavaScriptActionCount(doc) }
    }

    // Pages

    fn load_page(&mut self, doc: FPDF_DOCUMENT, index: i32) -> Option<FPDF_PAGE> {
        non_null(unsafe { FPDF_LoadPage(doc, index) })
    }

    fn close_page(&mut self, page: FPDF_PAGE) {
        unsafe { FPDF_ClosePage(page) }
    }

    fn page_width(&self, page: FPDF_PAGE) -> f32 {
        unsafe { FPDF_GetPageWidthF(page) }
    }

    fn page_height(&self, page: FPDF_PAGE) -> f32 {
        unsafe { FPDF_GetPageHeightF(page) }
    }

    fn page_rotation(&self, page: FPDF_PAGE) -> i32 {
        unsafe { FPDFPage_GetRotation(page) }
    }

    fn set_page_rotation(&mut self, page: FPDF_PAGE, rotation: i32) {
        unsafe { FPDFPage_SetRotation(page, rotation) }
    }

    fn page_box(&self, page: FPDF_PAGE, which: PageBox) -> Option<PageRect> {
        let get: unsafe extern "C" fn(FPDF_PAGE, *mut f32, *mut f32, *mut f32, *mut f32) -> FPDF_BOOL =
            match which {
                PageBox::Media => FPDFPage_GetMediaBox,
                PageBox::Crop => FPDFPage_GetCropBox,
                PageBox::Bleed => FPDFPage_GetBleedBox,
                PageBox::Trim => FPDFPage_GetTrimBox,
                PageBox::Art => FPDFPage_GetArtBox,
            };
        let mut rect = PageRect::default();
        let ok = unsafe {
            get(
                page,
                &mut rect.left,
                &mut rect.bottom,
                &mut rect.right,
                &mut rect.top,
            )
        };
        (ok != 0).then_some(rect)
    }

    fn set_page_box(&mut self, page: FPDF_PAGE, which: PageBox, rect: PageRect) {
        let set: unsafe extern "C" fn(FPDF_PAGE, f32, f32, f32, f32) = match which {
            PageBox::Media => FPDFPage_SetMediaBox,
            PageBox::Crop => FPDFPage_SetCropBox,
            PageBox::Bleed => FPDFPage_SetBleedBox,
            PageBox::Trim => FPDFPage_SetTrimBox,
            PageBox::Art => FPDFPage_SetArtBox,
        };
        unsafe { set(page, rect.left, rect.bottom, rect.right, rect.top) }
    }

    fn flatten_page(&mut self, page: FPDF_PAGE, flags: i32) -> i32 {
        unsafe { FPDFPage_Flatten(page, flags) }
    }

    fn generate_content(&mut self, page: FPDF_PAGE) -> bool {
        unsafe { FPDFPage_GenerateContent(page) != 0 }
    }

    fn decoded_thumbnail(&self, page: FPDF_PAGE, buf: &mut [u8]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFPage_GetDecodedThumbnailData(page, out_ptr(buf), len) as usize }
    }

    fn raw_thumbnail(&self, page: FPDF_PAGE, buf: &mut [u8]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFPage_GetRawThumbnailData(page, out_ptr(buf), len) as usize }
    }

    fn device_to_page(
        &self,
        page: FPDF_PAGE,
        viewport: Viewport,
        rotation: i32,
        x: i32,
        y: i32,
    ) -> Option<(f64, f64)> {
        let (mut page_x, mut page_y) = (0.0, 0.0);
        let ok = unsafe {
            FPDF_DeviceToPage(
                page,
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                rotation,
                x,
                y,
                &mut page_x,
                &mut page_y,
            )
        };
        (ok != 0).then_some((page_x, page_y))
    }

    fn page_to_device(
        &self,
        page: FPDF_PAGE,
        viewport: Viewport,
        rotation: i32,
        x: f64,
        y: f64,
    ) -> Option<(i32, i32)> {
        let (mut device_x, mut device_y) = (0, 0);
        let ok = unsafe {
            FPDF_PageToDevice(
                page,
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                rotation,
                x,
                y,
                &mut device_x,
                &mut device_y,
            )
        };
        (ok != 0).then_some((device_x, device_y))
    }

    // Bitmaps and rendering

    unsafe fn create_external_bitmap(
        &mut self,
        width: i32,
        height: i32,
        format: i32,
        pixels: *mut u8,
        stride: i32,
    ) -> Option<FPDF_BITMAP> {
        non_null(FPDFBitmap_CreateEx(width, height, format, pixels.cast(), stride))
    }

    fn fill_rect(
        &mut self,
        bitmap: FPDF_BITMAP,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        argb: u32,
    ) -> bool {
        // Older headers declare this void, so success is assumed.
        unsafe {
            FPDFBitmap_FillRect(bitmap, left, top, width, height, argb as FPDF_DWORD);
        }
        true
    }

    fn destroy_bitmap(&mut self, bitmap: FPDF_BITMAP) {
        unsafe { FPDFBitmap_Destroy(bitmap) }
    }

    fn render_page_bitmap(
        &mut self,
        bitmap: FPDF_BITMAP,
        page: FPDF_PAGE,
        viewport: Viewport,
        rotation: i32,
        flags: i32,
    ) {
        unsafe {
            FPDF_RenderPageBitmap(
                bitmap,
                page,
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                rotation,
                flags,
            )
        }
    }

    fn render_start(
        &mut self,
        bitmap: FPDF_BITMAP,
        page: FPDF_PAGE,
        viewport: Viewport,
        rotation: i32,
        flags: i32,
        pause: Option<PauseProbe<'_>>,
    ) -> i32 {
        with_pause(pause, |pause| unsafe {
            FPDF_RenderPageBitmap_Start(
                bitmap,
                page,
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                rotation,
                flags,
                pause,
            )
        })
    }

    fn render_continue(&mut self, page: FPDF_PAGE, pause: Option<PauseProbe<'_>>) -> i32 {
        with_pause(pause, |pause| unsafe { FPDF_RenderPage_Continue(page, pause) })
    }

    fn render_close(&mut self, page: FPDF_PAGE) {
        unsafe { FPDF_RenderPage_Close(page) }
    }

    // Text

    fn load_text_page(&mut self, page: FPDF_PAGE) -> Option<FPDF_TEXTPAGE> {
        non_null(unsafe { FPDFText_LoadPage(page) })
    }

    fn close_text_page(&mut self, text: FPDF_TEXTPAGE) {
        unsafe { FPDFText_ClosePage(text) }
    }

    fn count_chars(&self, text: FPDF_TEXTPAGE) -> i32 {
        unsafe { FPDFText_CountChars(text) }
    }

    fn get_text(&self, text: FPDF_TEXTPAGE, start: i32, count: i32, buf: &mut [u16]) -> i32 {
        // The library writes count + 1 units without being told the size.
        if count < 0 || buf.len() <= count as usize {
            return 0;
        }
        unsafe { FPDFText_GetText(text, start, count, buf.as_mut_ptr()) }
    }

    fn char_box(&self, text: FPDF_TEXTPAGE, index: i32) -> Option<CharBox> {
        let mut b = CharBox::default();
        let ok = unsafe {
            FPDFText_GetCharBox(text, index, &mut b.left, &mut b.right, &mut b.bottom, &mut b.top)
        };
        (ok != 0).then_some(b)
    }

    fn char_index_at_pos(
        &self,
        text: FPDF_TEXTPAGE,
        x: f64,
        y: f64,
        x_tolerance: f64,
        y_tolerance: f64,
    ) -> i32 {
        unsafe { FPDFText_GetCharIndexAtPos(text, x, y, x_tolerance, y_tolerance) }
    }

    fn count_rects(&mut self, text: FPDF_TEXTPAGE, start: i32, count: i32) -> i32 {
        unsafe { FPDFText_CountRects(text, start, count) }
    }

    fn get_rect(&self, text: FPDF_TEXTPAGE, index: i32) -> Option<PageRect> {
        let (mut left, mut top, mut right, mut bottom) = (0.0, 0.0, 0.0, 0.0);
        let ok = unsafe {
            FPDFText_GetRect(text, index, &mut left, &mut top, &mut right, &mut bottom)
        };
        (ok != 0).then(|| PageRect::new(left as f32, bottom as f32, right as f32, top as f32))
    }

    fn find_start(
        &mut self,
        text: FPDF_TEXTPAGE,
        query: &[u16],
        flags: u32,
        start: i32,
    ) -> Option<FPDF_SCHHANDLE> {
        if query.last() != Some(&0) {
            return None;
        }
        non_null(unsafe { FPDFText_FindStart(text, query.as_ptr(), flags as c_ulong, start) })
    }

    fn find_next(&mut self, search: FPDF_SCHHANDLE) -> bool {
        unsafe { FPDFText_FindNext(search) != 0 }
    }

    fn find_prev(&mut self, search: FPDF_SCHHANDLE) -> bool {
        unsafe { FPDFText_FindPrev(search) != 0 }
    }

    fn search_result_index(&self, search: FPDF_SCHHANDLE) -> i32 {
        unsafe { FPDFText_GetSchResultIndex(search) }
    }

    fn search_result_count(&self, search: FPDF_SCHHANDLE) -> i32 {
        unsafe { FPDFText_GetSchCount(search) }
    }

    fn find_close(&mut self, search: FPDF_SCHHANDLE) {
        unsafe { FPDFText_FindClose(search) }
    }

    fn load_web_links(&mut self, text: FPDF_TEXTPAGE) -> Option<FPDF_PAGELINK> {
        non_null(unsafe { FPDFLink_LoadWebLinks(text) })
    }

    fn close_web_links(&mut self, links: FPDF_PAGELINK) {
        unsafe { FPDFLink_CloseWebLinks(links) }
    }

    fn count_web_links(&self, links: FPDF_PAGELINK) -> i32 {
        unsafe { FPDFLink_CountWebLinks(links) }
    }

    fn web_link_url(&self, links: FPDF_PAGELINK, index: i32, buf: &mut [u16]) -> i32 {
        let len = buf.len() as c_int;
        unsafe { FPDFLink_GetURL(links, index, out_ptr(buf), len) }
    }

    // Bookmarks, links, actions

    fn bookmark_first_child(
        &self,
        doc: FPDF_DOCUMENT,
        parent: Option<FPDF_BOOKMARK>,
    ) -> Option<FPDF_BOOKMARK> {
        non_null(unsafe { FPDFBookmark_GetFirstChild(doc, parent.unwrap_or(ptr::null_mut())) })
    }

    fn bookmark_next_sibling(
        &self,
        doc: FPDF_DOCUMENT,
        bookmark: FPDF_BOOKMARK,
    ) -> Option<FPDF_BOOKMARK> {
        non_null(unsafe { FPDFBookmark_GetNextSibling(doc, bookmark) })
    }

    fn bookmark_title(&self, bookmark: FPDF_BOOKMARK, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFBookmark_GetTitle(bookmark, out_ptr(buf), len) as usize }
    }

    fn bookmark_find(&self, doc: FPDF_DOCUMENT, title: &[u16]) -> Option<FPDF_BOOKMARK> {
        if title.last() != Some(&0) {
            return None;
        }
        non_null(unsafe { FPDFBookmark_Find(doc, title.as_ptr()) })
    }

    fn bookmark_dest(&self, doc: FPDF_DOCUMENT, bookmark: FPDF_BOOKMARK) -> Option<FPDF_DEST> {
        non_null(unsafe { FPDFBookmark_GetDest(doc, bookmark) })
    }

    fn bookmark_action(&self, bookmark: FPDF_BOOKMARK) -> Option<FPDF_ACTION> {
        non_null(unsafe { FPDFBookmark_GetAction(bookmark) })
    }

    fn dest_page_index(&self, doc: FPDF_DOCUMENT, dest: FPDF_DEST) -> i32 {
        unsafe { FPDFDest_GetDestPageIndex(doc, dest) }
    }

    fn link_at_point(&self, page: FPDF_PAGE, x: f64, y: f64) -> Option<FPDF_LINK> {
        non_null(unsafe { FPDFLink_GetLinkAtPoint(page, x, y) })
    }

    fn link_dest(&self, doc: FPDF_DOCUMENT, link: FPDF_LINK) -> Option<FPDF_DEST> {
        non_null(unsafe { FPDFLink_GetDest(doc, link) })
    }

    fn link_action(&self, link: FPDF_LINK) -> Option<FPDF_ACTION> {
        non_null(unsafe { FPDFLink_GetAction(link) })
    }

    fn link_rect(&self, link: FPDF_LINK) -> Option<PageRect> {
        let mut rect = to_rectf(PageRect::default());
        let ok = unsafe { FPDFLink_GetAnnotRect(link, &mut rect) };
        (ok != 0).then(|| from_rectf(rect))
    }

    fn annotation_link(&self, annot: FPDF_ANNOTATION) -> Option<FPDF_LINK> {
        non_null(unsafe { FPDFAnnot_GetLink(annot) })
    }

    fn action_type(&self, action: FPDF_ACTION) -> u32 {
        unsafe { FPDFAction_GetType(action) as u32 }
    }

    fn action_dest(&self, doc: FPDF_DOCUMENT, action: FPDF_ACTION) -> Option<FPDF_DEST> {
        non_null(unsafe { FPDFAction_GetDest(doc, action) })
    }

    fn action_file_path(&self, action: FPDF_ACTION, buf: &mut [u8]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFAction_GetFilePath(action, out_ptr(buf), len) as usize }
    }

    fn action_uri_path(&self, doc: FPDF_DOCUMENT, action: FPDF_ACTION, buf: &mut [u8]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFAction_GetURIPath(doc, action, out_ptr(buf), len) as usize }
    }

    // Annotations

    fn annotation_count(&self, page: FPDF_PAGE) -> i32 {
        unsafe { FPDFPage_GetAnnotCount(page) }
    }

    fn get_annotation(&mut self, page: FPDF_PAGE, index: i32) -> Option<FPDF_ANNOTATION> {
        non_null(unsafe { FPDFPage_GetAnnot(page, index) })
    }

    fn create_annotation(&mut self, page: FPDF_PAGE, subtype: i32) -> Option<FPDF_ANNOTATION> {
        non_null(unsafe { FPDFPage_CreateAnnot(page, subtype as _) })
    }

    fn annotation_index(&self, page: FPDF_PAGE, annot: FPDF_ANNOTATION) -> i32 {
        unsafe { FPDFPage_GetAnnotIndex(page, annot) }
    }

    fn remove_annotation(&mut self, page: FPDF_PAGE, index: i32) -> bool {
        unsafe { FPDFPage_RemoveAnnot(page, index) != 0 }
    }

    fn close_annotation(&mut self, annot: FPDF_ANNOTATION) {
        unsafe { FPDFPage_CloseAnnot(annot) }
    }

    fn annotation_subtype(&self, annot: FPDF_ANNOTATION) -> i32 {
        unsafe { FPDFAnnot_GetSubtype(annot) as i32 }
    }

    fn annotation_rect(&self, annot: FPDF_ANNOTATION) -> Option<PageRect> {
        let mut rect = to_rectf(PageRect::default());
        let ok = unsafe { FPDFAnnot_GetRect(annot, &mut rect) };
        (ok != 0).then(|| from_rectf(rect))
    }

    fn set_annotation_rect(&mut self, annot: FPDF_ANNOTATION, rect: PageRect) -> bool {
        let rect = to_rectf(rect);
        unsafe { FPDFAnnot_SetRect(annot, &rect) != 0 }
    }

    fn annotation_color(&self, annot: FPDF_ANNOTATION, color_type: i32) -> Option<Rgba> {
        let (mut r, mut g, mut b, mut a): (c_uint, c_uint, c_uint, c_uint) = (0, 0, 0, 0);
        let ok = unsafe {
            FPDFAnnot_GetColor(annot, color_type as _, &mut r, &mut g, &mut b, &mut a)
        };
        (ok != 0).then(|| Rgba::new(r as u8, g as u8, b as u8, a as u8))
    }

    fn set_annotation_color(&mut self, annot: FPDF_ANNOTATION, color_type: i32, color: Rgba) -> bool {
        unsafe {
            FPDFAnnot_SetColor(
                annot,
                color_type as _,
                c_uint::from(color.r),
                c_uint::from(color.g),
                c_uint::from(color.b),
                c_uint::from(color.a),
            ) != 0
        }
    }

    fn annotation_flags(&self, annot: FPDF_ANNOTATION) -> i32 {
        unsafe { FPDFAnnot_GetFlags(annot) }
    }

    fn set_annotation_flags(&mut self, annot: FPDF_ANNOTATION, flags: i32) -> bool {
        unsafe { FPDFAnnot_SetFlags(annot, flags) != 0 }
    }

    fn annotation_string(&self, annot: FPDF_ANNOTATION, key: &CStr, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFAnnot_GetStringValue(annot, key.as_ptr(), out_ptr(buf), len) as usize }
    }

    fn set_annotation_string(&mut self, annot: FPDF_ANNOTATION, key: &CStr, value: &[u16]) -> bool {
        if value.last() != Some(&0) {
            return false;
        }
        unsafe { FPDFAnnot_SetStringValue(annot, key.as_ptr(), value.as_ptr()) != 0 }
    }

    fn annotation_number(&self, annot: FPDF_ANNOTATION, key: &CStr) -> Option<f32> {
        let mut value = 0.0;
        let ok = unsafe { FPDFAnnot_GetNumberValue(annot, key.as_ptr(), &mut value) };
        (ok != 0).then_some(value)
    }

    fn set_annotation_number(&mut self, _annot: FPDF_ANNOTATION, key: &CStr, _value: f32) -> bool {
        // The public API has a getter for number values but no setter.
        tracing::debug!(?key, "annotation number values are read-only in PDFium");
        false
    }

    fn attachment_point_count(&self, annot: FPDF_ANNOTATION) -> usize {
        unsafe { FPDFAnnot_CountAttachmentPoints(annot) }
    }

    fn attachment_points(&self, annot: FPDF_ANNOTATION, index: usize) -> Option<QuadPoints> {
        let mut quad = to_quad(QuadPoints::default());
        let ok = unsafe { FPDFAnnot_GetAttachmentPoints(annot, index, &mut quad) };
        (ok != 0).then(|| from_quad(quad))
    }

    fn set_attachment_points(&mut self, annot: FPDF_ANNOTATION, index: usize, quad: QuadPoints) -> bool {
        let quad = to_quad(quad);
        unsafe { FPDFAnnot_SetAttachmentPoints(annot, index, &quad) != 0 }
    }

    fn append_attachment_points(&mut self, annot: FPDF_ANNOTATION, quad: QuadPoints) -> bool {
        let quad = to_quad(quad);
        unsafe { FPDFAnnot_AppendAttachmentPoints(annot, &quad) != 0 }
    }

    fn ink_list_count(&self, annot: FPDF_ANNOTATION) -> usize {
        unsafe { FPDFAnnot_GetInkListCount(annot) as usize }
    }

    fn ink_list_path(&self, annot: FPDF_ANNOTATION, index: usize, buf: &mut [PointF]) -> usize {
        let mut points: Vec<FS_POINTF> = buf.iter().map(|p| FS_POINTF { x: p.x, y: p.y }).collect();
        let len = points.len() as c_ulong;
        let needed = unsafe {
            FPDFAnnot_GetInkListPath(annot, index as c_ulong, out_ptr(&mut points), len) as usize
        };
        if needed <= buf.len() {
            for (dst, src) in buf.iter_mut().zip(&points[..needed]) {
                *dst = PointF::new(src.x, src.y);
            }
        }
        needed
    }

    fn add_ink_stroke(&mut self, annot: FPDF_ANNOTATION, points: &[PointF]) -> i32 {
        let points: Vec<FS_POINTF> = points.iter().map(|p| FS_POINTF { x: p.x, y: p.y }).collect();
        unsafe { FPDFAnnot_AddInkStroke(annot, points.as_ptr(), points.len()) }
    }

    fn annotation_appearance(&self, annot: FPDF_ANNOTATION, mode: i32, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFAnnot_GetAP(annot, mode as _, out_ptr(buf), len) as usize }
    }

    fn set_annotation_appearance(&mut self, annot: FPDF_ANNOTATION, mode: i32, value: Option<&[u16]>) -> bool {
        let value = match value {
            Some(value) if value.last() == Some(&0) => value.as_ptr(),
            Some(_) => return false,
            None => ptr::null(),
        };
        unsafe { FPDFAnnot_SetAP(annot, mode as _, value) != 0 }
    }

    // Form-fill environment

    fn init_form_fill(
        &mut self,
        doc: FPDF_DOCUMENT,
        version: i32,
        on_release: Box<dyn FnOnce()>,
    ) -> Option<FPDF_FORMHANDLE> {
        let mut info: FPDF_FORMFILLINFO = unsafe { std::mem::zeroed() };
        info.version = version;
        info.Release = Some(release_form_record);
        let record = Box::into_raw(Box::new(FormRecord {
            info,
            on_release: Some(on_release),
        }));
        let form = unsafe { FPDFDOC_InitFormFillEnvironment(doc, record.cast()) };
        if form.is_null() {
            // The library never took ownership.
            unsafe { release_form_record(record.cast()) };
            return None;
        }
        Some(form)
    }

    fn exit_form_fill(&mut self, form: FPDF_FORMHANDLE) {
        unsafe { FPDFDOC_ExitFormFillEnvironment(form) }
    }

    fn form_on_after_load_page(&mut self, page: FPDF_PAGE, form: FPDF_FORMHANDLE) {
        unsafe { FORM_OnAfterLoadPage(page, form) }
    }

    fn form_on_before_close_page(&mut self, page: FPDF_PAGE, form: FPDF_FORMHANDLE) {
        unsafe { FORM_OnBeforeClosePage(page, form) }
    }

    fn form_draw(
        &mut self,
        form: FPDF_FORMHANDLE,
        bitmap: FPDF_BITMAP,
        page: FPDF_PAGE,
        viewport: Viewport,
        rotation: i32,
        flags: i32,
    ) {
        unsafe {
            FPDF_FFLDraw(
                form,
                bitmap,
                page,
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                rotation,
                flags,
            )
        }
    }

    fn form_field_type(&self, form: FPDF_FORMHANDLE, annot: FPDF_ANNOTATION) -> i32 {
        unsafe { FPDFAnnot_GetFormFieldType(form, annot) }
    }

    fn form_field_name(&self, form: FPDF_FORMHANDLE, annot: FPDF_ANNOTATION, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFAnnot_GetFormFieldName(form, annot, out_ptr(buf), len) as usize }
    }

    fn form_field_value(&self, form: FPDF_FORMHANDLE, annot: FPDF_ANNOTATION, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFAnnot_GetFormFieldValue(form, annot, out_ptr(buf), len) as usize }
    }

    fn form_field_flags(&self, form: FPDF_FORMHANDLE, annot: FPDF_ANNOTATION) -> i32 {
        unsafe { FPDFAnnot_GetFormFieldFlags(form, annot) }
    }

    fn form_option_count(&self, form: FPDF_FORMHANDLE, annot: FPDF_ANNOTATION) -> i32 {
        unsafe { FPDFAnnot_GetOptionCount(form, annot) }
    }

    fn form_option_label(
        &self,
        form: FPDF_FORMHANDLE,
        annot: FPDF_ANNOTATION,
        index: i32,
        buf: &mut [u16],
    ) -> usize {
        let len = out_len(buf);
        unsafe { FPDFAnnot_GetOptionLabel(form, annot, index, out_ptr(buf), len) as usize }
    }

    fn form_is_option_selected(&self, form: FPDF_FORMHANDLE, annot: FPDF_ANNOTATION, index: i32) -> bool {
        unsafe { FPDFAnnot_IsOptionSelected(form, annot, index) != 0 }
    }

    fn form_set_index_selected(
        &mut self,
        form: FPDF_FORMHANDLE,
        page: FPDF_PAGE,
        index: i32,
        selected: bool,
    ) -> bool {
        unsafe { FORM_SetIndexSelected(form, page, index, FPDF_BOOL::from(selected)) != 0 }
    }

    fn form_on_mouse_move(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE, modifier: i32, x: f64, y: f64) -> bool {
        unsafe { FORM_OnMouseMove(form, page, modifier, x, y) != 0 }
    }

    fn form_on_lbutton_down(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE, modifier: i32, x: f64, y: f64) -> bool {
        unsafe { FORM_OnLButtonDown(form, page, modifier, x, y) != 0 }
    }

    fn form_on_lbutton_up(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE, modifier: i32, x: f64, y: f64) -> bool {
        unsafe { FORM_OnLButtonUp(form, page, modifier, x, y) != 0 }
    }

    fn form_on_focus(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE, modifier: i32, x: f64, y: f64) -> bool {
        unsafe { FORM_OnFocus(form, page, modifier, x, y) != 0 }
    }

    fn form_on_key_down(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE, key_code: i32, modifier: i32) -> bool {
        unsafe { FORM_OnKeyDown(form, page, key_code, modifier) != 0 }
    }

    fn form_on_key_up(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE, key_code: i32, modifier: i32) -> bool {
        unsafe { FORM_OnKeyUp(form, page, key_code, modifier) != 0 }
    }

    fn form_on_char(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE, ch: i32, modifier: i32) -> bool {
        unsafe { FORM_OnChar(form, page, ch, modifier) != 0 }
    }

    fn form_can_undo(&self, form: FPDF_FORMHANDLE, page: FPDF_PAGE) -> bool {
        unsafe { FORM_CanUndo(form, page) != 0 }
    }

    fn form_can_redo(&self, form: FPDF_FORMHANDLE, page: FPDF_PAGE) -> bool {
        unsafe { FORM_CanRedo(form, page) != 0 }
    }

    fn form_undo(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE) -> bool {
        unsafe { FORM_Undo(form, page) != 0 }
    }

    fn form_redo(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE) -> bool {
        unsafe { FORM_Redo(form, page) != 0 }
    }

    fn form_select_all_text(&mut self, form: FPDF_FORMHANDLE, page: FPDF_PAGE) -> bool {
        unsafe { FORM_SelectAllText(form, page) != 0 }
    }

    fn form_set_highlight_color(&mut self, form: FPDF_FORMHANDLE, field_type: i32, argb: u32) {
        unsafe { FPDF_SetFormFieldHighlightColor(form, field_type, argb as c_ulong) }
    }

    fn form_set_highlight_alpha(&mut self, form: FPDF_FORMHANDLE, alpha: u8) {
        unsafe { FPDF_SetFormFieldHighlightAlpha(form, alpha) }
    }

    fn form_remove_highlight(&mut self, form: FPDF_FORMHANDLE) {
        unsafe { FPDF_RemoveFormFieldHighlight(form) }
    }

    // Attachments and signatures

    fn attachment_count(&self, doc: FPDF_DOCUMENT) -> i32 {
        unsafe { FPDFDoc_GetAttachmentCount(doc) }
    }

    fn get_attachment(&self, doc: FPDF_DOCUMENT, index: i32) -> Option<FPDF_ATTACHMENT> {
        non_null(unsafe { FPDFDoc_GetAttachment(doc, index) })
    }

    fn attachment_name(&self, attachment: FPDF_ATTACHMENT, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFAttachment_GetName(attachment, out_ptr(buf), len) as usize }
    }

    fn attachment_file(&self, attachment: FPDF_ATTACHMENT, buf: &mut [u8]) -> Option<usize> {
        let len = out_len(buf);
        let mut needed: c_ulong = 0;
        let ok = unsafe { FPDFAttachment_GetFile(attachment, out_ptr(buf), len, &mut needed) };
        (ok != 0).then_some(needed as usize)
    }

    fn add_attachment(&mut self, doc: FPDF_DOCUMENT, name: &[u16]) -> Option<FPDF_ATTACHMENT> {
        if name.last() != Some(&0) {
            return None;
        }
        non_null(unsafe { FPDFDoc_AddAttachment(doc, name.as_ptr()) })
    }

    fn set_attachment_file(&mut self, doc: FPDF_DOCUMENT, attachment: FPDF_ATTACHMENT, contents: &[u8]) -> bool {
        unsafe {
            FPDFAttachment_SetFile(
                attachment,
                doc,
                contents.as_ptr().cast(),
                contents.len() as c_ulong,
            ) != 0
        }
    }

    fn delete_attachment(&mut self, doc: FPDF_DOCUMENT, index: i32) -> bool {
        unsafe { FPDFDoc_DeleteAttachment(doc, index) != 0 }
    }

    fn signature_count(&self, doc: FPDF_DOCUMENT) -> i32 {
        unsafe { FPDF_GetSignatureCount(doc) }
    }

    fn get_signature(&self, doc: FPDF_DOCUMENT, index: i32) -> Option<FPDF_SIGNATURE> {
        non_null(unsafe { FPDF_GetSignatureObject(doc, index) })
    }

    fn signature_contents(&self, signature: FPDF_SIGNATURE, buf: &mut [u8]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFSignatureObj_GetContents(signature, out_ptr(buf), len) as usize }
    }

    fn signature_reason(&self, signature: FPDF_SIGNATURE, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFSignatureObj_GetReason(signature, out_ptr(buf), len) as usize }
    }

    fn signature_time(&self, signature: FPDF_SIGNATURE, buf: &mut [u8]) -> usize {
        let len = out_len(buf);
        unsafe { FPDFSignatureObj_GetTime(signature, out_ptr(buf), len) as usize }
    }

    // Structure tree

    fn struct_tree_for_page(&mut self, page: FPDF_PAGE) -> Option<FPDF_STRUCTTREE> {
        non_null(unsafe { FPDF_StructTree_GetForPage(page) })
    }

    fn close_struct_tree(&mut self, tree: FPDF_STRUCTTREE) {
        unsafe { FPDF_StructTree_Close(tree) }
    }

    fn struct_tree_child_count(&self, tree: FPDF_STRUCTTREE) -> i32 {
        unsafe { FPDF_StructTree_CountChildren(tree) }
    }

    fn struct_tree_child(&self, tree: FPDF_STRUCTTREE, index: i32) -> Option<FPDF_STRUCTELEMENT> {
        non_null(unsafe { FPDF_StructTree_GetChildAtIndex(tree, index) })
    }

    fn struct_element_type(&self, element: FPDF_STRUCTELEMENT, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDF_StructElement_GetType(element, out_ptr(buf), len) as usize }
    }

    fn struct_element_alt_text(&self, element: FPDF_STRUCTELEMENT, buf: &mut [u16]) -> usize {
        let len = out_len(buf);
        unsafe { FPDF_StructElement_GetAltText(element, out_ptr(buf), len) as usize }
    }

    fn struct_element_child_count(&self, element: FPDF_STRUCTELEMENT) -> i32 {
        unsafe { FPDF_StructElement_CountChildren(element) }
    }

    fn struct_element_child(&self, element: FPDF_STRUCTELEMENT, index: i32) -> Option<FPDF_STRUCTELEMENT> {
        non_null(unsafe { FPDF_StructElement_GetChildAtIndex(element, index) })
    }

    // Page objects and fonts

    fn page_object_count(&self, page: FPDF_PAGE) -> i32 {
        unsafe { FPDFPage_CountObjects(page) }
    }

    fn get_page_object(&self, page: FPDF_PAGE, index: i32) -> Option<FPDF_PAGEOBJECT> {
        non_null(unsafe { FPDFPage_GetObject(page, index) })
    }

    fn page_object_type(&self, object: FPDF_PAGEOBJECT) -> i32 {
        unsafe { FPDFPageObj_GetType(object) }
    }

    fn new_text_object(&mut self, doc: FPDF_DOCUMENT, font: &CStr, size: f32) -> Option<FPDF_PAGEOBJECT> {
        non_null(unsafe { FPDFPageObj_NewTextObj(doc, font.as_ptr(), size) })
    }

    fn create_text_object(&mut self, doc: FPDF_DOCUMENT, font: FPDF_FONT, size: f32) -> Option<FPDF_PAGEOBJECT> {
        non_null(unsafe { FPDFPageObj_CreateTextObj(doc, font, size) })
    }

    fn set_text(&mut self, object: FPDF_PAGEOBJECT, text: &[u16]) -> bool {
        if text.last() != Some(&0) {
            return false;
        }
        unsafe { FPDFText_SetText(object, text.as_ptr()) != 0 }
    }

    fn new_path(&mut self, x: f32, y: f32) -> Option<FPDF_PAGEOBJECT> {
        non_null(unsafe { FPDFPageObj_CreateNewPath(x, y) })
    }

    fn path_move_to(&mut self, object: FPDF_PAGEOBJECT, x: f32, y: f32) -> bool {
        unsafe { FPDFPath_MoveTo(object, x, y) != 0 }
    }

    fn path_line_to(&mut self, object: FPDF_PAGEOBJECT, x: f32, y: f32) -> bool {
        unsafe { FPDFPath_LineTo(object, x, y) != 0 }
    }

    fn path_bezier_to(
        &mut self,
        object: FPDF_PAGEOBJECT,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
    ) -> bool {
        unsafe { FPDFPath_BezierTo(object, x1, y1, x2, y2, x3, y3) != 0 }
    }

    fn path_close(&mut self, object: FPDF_PAGEOBJECT) -> bool {
        unsafe { FPDFPath_Close(object) != 0 }
    }

    fn path_set_draw_mode(&mut self, object: FPDF_PAGEOBJECT, fill_mode: i32, stroke: bool) -> bool {
        unsafe { FPDFPath_SetDrawMode(object, fill_mode, FPDF_BOOL::from(stroke)) != 0 }
    }

    fn set_stroke_width(&mut self, object: FPDF_PAGEOBJECT, width: f32) -> bool {
        unsafe { FPDFPageObj_SetStrokeWidth(object, width) != 0 }
    }

    fn new_image_object(&mut self, doc: FPDF_DOCUMENT) -> Option<FPDF_PAGEOBJECT> {
        non_null(unsafe { FPDFPageObj_NewImageObj(doc) })
    }

    fn image_set_bitmap(&mut self, object: FPDF_PAGEOBJECT, bitmap: FPDF_BITMAP) -> bool {
        unsafe { FPDFImageObj_SetBitmap(ptr::null_mut(), 0, object, bitmap) != 0 }
    }

    fn insert_object(&mut self, page: FPDF_PAGE, object: FPDF_PAGEOBJECT) {
        unsafe { FPDFPage_InsertObject(page, object) }
    }

    fn remove_object(&mut self, page: FPDF_PAGE, object: FPDF_PAGEOBJECT) -> bool {
        unsafe { FPDFPage_RemoveObject(page, object) != 0 }
    }

    fn destroy_object(&mut self, object: FPDF_PAGEOBJECT) {
        unsafe { FPDFPageObj_Destroy(object) }
    }

    fn set_fill_color(&mut self, object: FPDF_PAGEOBJECT, color: Rgba) -> bool {
        unsafe {
            FPDFPageObj_SetFillColor(
                object,
                c_uint::from(color.r),
                c_uint::from(color.g),
                c_uint::from(color.b),
                c_uint::from(color.a),
            ) != 0
        }
    }

    fn set_stroke_color(&mut self, object: FPDF_PAGEOBJECT, color: Rgba) -> bool {
        unsafe {
            FPDFPageObj_SetStrokeColor(
                object,
                c_uint::from(color.r),
                c_uint::from(color.g),
                c_uint::from(color.b),
                c_uint::from(color.a),
            ) != 0
        }
    }

    fn fill_color(&self, object: FPDF_PAGEOBJECT) -> Option<Rgba> {
        let (mut r, mut g, mut b, mut a): (c_uint, c_uint, c_uint, c_uint) = (0, 0, 0, 0);
        let ok = unsafe { FPDFPageObj_GetFillColor(object, &mut r, &mut g, &mut b, &mut a) };
        (ok != 0).then(|| Rgba::new(r as u8, g as u8, b as u8, a as u8))
    }

    fn stroke_color(&self, object: FPDF_PAGEOBJECT) -> Option<Rgba> {
        let (mut r, mut g, mut b, mut a): (c_uint, c_uint, c_uint, c_uint) = (0, 0, 0, 0);
        let ok = unsafe { FPDFPageObj_GetStrokeColor(object, &mut r, &mut g, &mut b, &mut a) };
        (ok != 0).then(|| Rgba::new(r as u8, g as u8, b as u8, a as u8))
    }

    fn transform_object(&mut self, object: FPDF_PAGEOBJECT, m: Matrix) {
        unsafe { FPDFPageObj_Transform(object, m.a, m.b, m.c, m.d, m.e, m.f) }
    }

    fn object_bounds(&self, object: FPDF_PAGEOBJECT) -> Option<PageRect> {
        let mut rect = PageRect::default();
        let ok = unsafe {
            FPDFPageObj_GetBounds(
                object,
                &mut rect.left,
                &mut rect.bottom,
                &mut rect.right,
                &mut rect.top,
            )
        };
        (ok != 0).then_some(rect)
    }

    fn load_standard_font(&mut self, doc: FPDF_DOCUMENT, name: &CStr) -> Option<FPDF_FONT> {
        non_null(unsafe { FPDFText_LoadStandardFont(doc, name.as_ptr()) })
    }

    fn close_font(&mut self, font: FPDF_FONT) {
        unsafe { FPDFFont_Close(font) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_pause_still_passes_a_record() {
        let paused = with_pause(None, |pause| {
            assert!(!pause.is_null());
            // SAFETY: `pause` points at the record built for this call.
            unsafe {
                assert_eq!((*pause).version, 1);
                need_to_pause(pause)
            }
        });
        assert_eq!(paused, 0);
    }

    #[test]
    fn test_pause_callback_is_forwarded() {
        let mut calls = 0;
        let mut pause = || {
            calls += 1;
            true
        };
        // SAFETY: `record` points at the record built for this call.
        let paused = with_pause(Some(&mut pause), |record| unsafe { need_to_pause(record) });
        assert_eq!(paused, 1);
        assert_eq!(calls, 1);
    }
}
