//! The seam between the lifecycle layer and the C library.
//!
//! [`PdfiumBindings`] is the PDFium C API with Rust types at the edges: one
//! method per C call, raw status codes and the library's own buffer
//! conventions left intact. Everything that makes the API safe to drive
//! (ownership, pairing, marshaling, state machines) lives above this trait in
//! [`crate::Pdfium`], so the same rules run against the real library
//! (`native::NativeBindings`) and the in-memory
//! [`crate::testing::FakeBindings`].
//!
//! Buffer conventions: a getter taking `buf: &mut [u16]` or `&mut [u8]` is a
//! size query when `buf` is empty and a fill otherwise, and returns the
//! count the C function returned (bytes unless the method says units).

use crate::config::LibraryConfig;
use crate::geometry::{CharBox, PageBox, PageRect, PointF, QuadPoints, Rgba};
use crate::transform::{Matrix, Viewport};
use std::ffi::CStr;
use std::fmt::Debug;
use std::hash::Hash;

/// Raw constants from the PDFium headers.
pub mod raw {
    pub const FPDF_ERR_SUCCESS: u32 = 0;
    pub const FPDF_ERR_FILE: u32 = 2;
    pub const FPDF_ERR_FORMAT: u32 = 3;
    pub const FPDF_ERR_PASSWORD: u32 = 4;

    pub const FPDF_ANNOT: i32 = 0x01;
    pub const FPDF_LCD_TEXT: i32 = 0x02;
    pub const FPDF_GRAYSCALE: i32 = 0x08;
    pub const FPDF_REVERSE_BYTE_ORDER: i32 = 0x10;
    pub const FPDF_PRINTING: i32 = 0x800;

    pub const FPDF_RENDER_READY: i32 = 0;
    pub const FPDF_RENDER_TOBECONTINUED: i32 = 1;
    pub const FPDF_RENDER_DONE: i32 = 2;
    pub const FPDF_RENDER_FAILED: i32 = 3;

    pub const FPDFBITMAP_BGRA: i32 = 4;

    pub const FPDF_MATCHCASE: u32 = 0x01;
    pub const FPDF_MATCHWHOLEWORD: u32 = 0x02;
    pub const FPDF_CONSECUTIVE: u32 = 0x04;

    pub const FPDFANNOT_COLORTYPE_COLOR: i32 = 0;
    pub const FPDFANNOT_COLORTYPE_INTERIOR: i32 = 1;

    pub const FPDF_INCREMENTAL: u32 = 1;
    pub const FPDF_NO_INCREMENTAL: u32 = 2;
    pub const FPDF_REMOVE_SECURITY: u32 = 3;
}

/// Opaque library handle: copied freely, compared by identity.
pub trait RawHandle: Copy + Eq + Hash + Debug {}

impl<T: Copy + Eq + Hash + Debug> RawHandle for T {}

/// Cooperative pause predicate passed through to the rasterizer.
pub type PauseProbe<'a> = &'a mut dyn FnMut() -> bool;

/// Sequential block sink for `FPDF_SaveAsCopy`. Returns false to abort.
pub type BlockSink<'a> = &'a mut dyn FnMut(&[u8]) -> bool;

/// PDFium's C API, one method per call.
pub trait PdfiumBindings {
    type Document: RawHandle;
    type Page: RawHandle;
    type TextPage: RawHandle;
    type Search: RawHandle;
    type WebLinks: RawHandle;
    type Annotation: RawHandle;
    type PageObject: RawHandle;
    type Font: RawHandle;
    type Bitmap: RawHandle;
    type Bookmark: RawHandle;
    type Dest: RawHandle;
    type Action: RawHandle;
    type Link: RawHandle;
    type Form: RawHandle;
    type StructTree: RawHandle;
    type StructElement: RawHandle;
    type Signature: RawHandle;
    type Attachment: RawHandle;

    // ------------------------------------------------------------------
    // Library
    // ------------------------------------------------------------------

    fn init_library(&mut self, config: &LibraryConfig);
    fn destroy_library(&mut self);
    fn last_error(&self) -> u32;

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// `FPDF_LoadMemDocument64`.
    ///
    /// # Safety
    ///
    /// `data..data+len` must stay valid and unmodified until the returned
    /// document is closed.
    unsafe fn load_mem_document(
        &mut self,
        data: *const u8,
        len: usize,
        password: Option<&CStr>,
    ) -> Option<Self::Document>;
    fn load_document(&mut self, path: &CStr, password: Option<&CStr>) -> Option<Self::Document>;
    fn create_new_document(&mut self) -> Option<Self::Document>;
    fn close_document(&mut self, doc: Self::Document);
    fn page_count(&self, doc: Self::Document) -> i32;
    fn meta_text(&self, doc: Self::Document, tag: &CStr, buf: &mut [u16]) -> usize;
    fn page_label(&self, doc: Self::Document, index: i32, buf: &mut [u16]) -> usize;
    fn page_size_by_index(&self, doc: Self::Document, index: i32) -> Option<(f64, f64)>;
    fn import_pages(
        &mut self,
        dest: Self::Document,
        src: Self::Document,
        range: Option<&CStr>,
        index: i32,
    ) -> bool;
    fn copy_viewer_preferences(&mut self, dest: Self::Document, src: Self::Document) -> bool;
    fn delete_page(&mut self, doc: Self::Document, index: i32);
    fn new_page(
        &mut self,
        doc: Self::Document,
        index: i32,
        width: f64,
        height: f64,
    ) -> Option<Self::Page>;
    fn save_as_copy(&mut self, doc: Self::Document, flags: u32, sink: BlockSink<'_>) -> bool;
    fn form_type(&self, doc: Self::Document) -> i32;
    fn page_mode(&self, doc: Self::Document) -> i32;
    fn javascript_action_count(&self, doc: Self::Document) -> i32;

    // ------------------------------------------------------------------
    // Pages
    // ------------------------------------------------------------------

    fn load_page(&mut self, doc: Self::Document, index: i32) -> Option<Self::Page>;
    fn close_page(&mut self, page: Self::Page);
    fn page_width(&self, page: Self::Page) -> f32;
    fn page_height(&self, page: Self::Page) -> f32;
    fn page_rotation(&self, page: Self::Page) -> i32;
    fn set_page_rotation(&mut self, page: Self::Page, rotation: i32);
    fn page_box(&self, page: Self::Page, which: PageBox) -> Option<PageRect>;
    fn set_page_box(&mut self, page: Self::Page, which: PageBox, rect: PageRect);
    fn flatten_page(&mut self, page: Self::Page, flags: i32) -> i32;
    fn generate_content(&mut self, page: Self::Page) -> bool;
    fn decoded_thumbnail(&self, page: Self::Page, buf: &mut [u8]) -> usize;
    fn raw_thumbnail(&self, page: Self::Page, buf: &mut [u8]) -> usize;
    fn device_to_page(
        &self,
        page: Self::Page,
        viewport: Viewport,
        rotation: i32,
        x: i32,
        y: i32,
    ) -> Option<(f64, f64)>;
    fn page_to_device(
        &self,
        page: Self::Page,
        viewport: Viewport,
        rotation: i32,
        x: f64,
        y: f64,
    ) -> Option<(i32, i32)>;

    // ------------------------------------------------------------------
    // Bitmaps and rendering
    // ------------------------------------------------------------------

    /// `FPDFBitmap_CreateEx` over caller memory.
    ///
    /// # Safety
    ///
    /// `pixels` must point to `stride * height` writable bytes that outlive
    /// the bitmap and every render still using it.
    unsafe fn create_external_bitmap(
        &mut self,
        width: i32,
        height: i32,
        format: i32,
        pixels: *mut u8,
        stride: i32,
    ) -> Option<Self::Bitmap>;
    fn fill_rect(
        &mut self,
        bitmap: Self::Bitmap,
        left: i32,
        top: i32,
        width: i32,
        height: i32,
        argb: u32,
    ) -> bool;
    fn destroy_bitmap(&mut self, bitmap: Self::Bitmap);
    fn render_page_bitmap(
        &mut self,
        bitmap: Self::Bitmap,
        page: Self::Page,
        viewport: Viewport,
        rotation: i32,
        flags: i32,
    );
    /// `FPDF_RenderPageBitmap_Start`; returns an `FPDF_RENDER_*` status.
    fn render_start(
        &mut self,
        bitmap: Self::Bitmap,
        page: Self::Page,
        viewport: Viewport,
        rotation: i32,
        flags: i32,
        pause: Option<PauseProbe<'_>>,
    ) -> i32;
    fn render_continue(&mut self, page: Self::Page, pause: Option<PauseProbe<'_>>) -> i32;
    fn render_close(&mut self, page: Self::Page);

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    fn load_text_page(&mut self, page: Self::Page) -> Option<Self::TextPage>;
    fn close_text_page(&mut self, text: Self::TextPage);
    fn count_chars(&self, text: Self::TextPage) -> i32;
    /// Returns code units written, terminator included.
    fn get_text(&self, text: Self::TextPage, start: i32, count: i32, buf: &mut [u16]) -> i32;
    fn char_box(&self, text: Self::TextPage, index: i32) -> Option<CharBox>;
    fn char_index_at_pos(
        &self,
        text: Self::TextPage,
        x: f64,
        y: f64,
        x_tolerance: f64,
        y_tolerance: f64,
    ) -> i32;
    fn count_rects(&mut self, text: Self::TextPage, start: i32, count: i32) -> i32;
    fn get_rect(&self, text: Self::TextPage, index: i32) -> Option<PageRect>;

    /// `query` is NUL-terminated UTF-16LE.
    fn find_start(
        &mut self,
        text: Self::TextPage,
        query: &[u16],
        flags: u32,
        start: i32,
    ) -> Option<Self::Search>;
    fn find_next(&mut self, search: Self::Search) -> bool;
    fn find_prev(&mut self, search: Self::Search) -> bool;
    fn search_result_index(&self, search: Self::Search) -> i32;
    fn search_result_count(&self, search: Self::Search) -> i32;
    fn find_close(&mut self, search: Self::Search);

    fn load_web_links(&mut self, text: Self::TextPage) -> Option<Self::WebLinks>;
    fn close_web_links(&mut self, links: Self::WebLinks);
    fn count_web_links(&self, links: Self::WebLinks) -> i32;
    /// Returns code units, terminator included.
    fn web_link_url(&self, links: Self::WebLinks, index: i32, buf: &mut [u16]) -> i32;

    // ------------------------------------------------------------------
    // Bookmarks, links, actions
    // ------------------------------------------------------------------

    fn bookmark_first_child(
        &self,
        doc: Self::Document,
        parent: Option<Self::Bookmark>,
    ) -> Option<Self::Bookmark>;
    fn bookmark_next_sibling(
        &self,
        doc: Self::Document,
        bookmark: Self::Bookmark,
    ) -> Option<Self::Bookmark>;
    fn bookmark_title(&self, bookmark: Self::Bookmark, buf: &mut [u16]) -> usize;
    /// `title` is NUL-terminated UTF-16LE.
    fn bookmark_find(&self, doc: Self::Document, title: &[u16]) -> Option<Self::Bookmark>;
    fn bookmark_dest(&self, doc: Self::Document, bookmark: Self::Bookmark) -> Option<Self::Dest>;
    fn bookmark_action(&self, bookmark: Self::Bookmark) -> Option<Self::Action>;
    fn dest_page_index(&self, doc: Self::Document, dest: Self::Dest) -> i32;

    fn link_at_point(&self, page: Self::Page, x: f64, y: f64) -> Option<Self::Link>;
    fn link_dest(&self, doc: Self::Document, link: Self::Link) -> Option<Self::Dest>;
    fn link_action(&self, link: Self::Link) -> Option<Self::Action>;
    fn link_rect(&self, link: Self::Link) -> Option<PageRect>;
    fn annotation_link(&self, annot: Self::Annotation) -> Option<Self::Link>;

    fn action_type(&self, action: Self::Action) -> u32;
    fn action_dest(&self, doc: Self::Document, action: Self::Action) -> Option<Self::Dest>;
    fn action_file_path(&self, action: Self::Action, buf: &mut [u8]) -> usize;
    fn action_uri_path(&self, doc: Self::Document, action: Self::Action, buf: &mut [u8]) -> usize;

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    fn annotation_count(&self, page: Self::Page) -> i32;
    fn get_annotation(&mut self, page: Self::Page, index: i32) -> Option<Self::Annotation>;
    fn create_annotation(&mut self, page: Self::Page, subtype: i32) -> Option<Self::Annotation>;
    fn annotation_index(&self, page: Self::Page, annot: Self::Annotation) -> i32;
    fn remove_annotation(&mut self, page: Self::Page, index: i32) -> bool;
    fn close_annotation(&mut self, annot: Self::Annotation);
    fn annotation_subtype(&self, annot: Self::Annotation) -> i32;
    fn annotation_rect(&self, annot: Self::Annotation) -> Option<PageRect>;
    fn set_annotation_rect(&mut self, annot: Self::Annotation, rect: PageRect) -> bool;
    fn annotation_color(&self, annot: Self::Annotation, color_type: i32) -> Option<Rgba>;
    fn set_annotation_color(&mut self, annot: Self::Annotation, color_type: i32, color: Rgba)
        -> bool;
    fn annotation_flags(&self, annot: Self::Annotation) -> i32;
    fn set_annotation_flags(&mut self, annot: Self::Annotation, flags: i32) -> bool;
    fn annotation_string(&self, annot: Self::Annotation, key: &CStr, buf: &mut [u16]) -> usize;
    /// `value` is NUL-terminated UTF-16LE.
    fn set_annotation_string(&mut self, annot: Self::Annotation, key: &CStr, value: &[u16])
        -> bool;
    fn annotation_number(&self, annot: Self::Annotation, key: &CStr) -> Option<f32>;
    fn set_annotation_number(&mut self, annot: Self::Annotation, key: &CStr, value: f32) -> bool;
    fn attachment_point_count(&self, annot: Self::Annotation) -> usize;
    fn attachment_points(&self, annot: Self::Annotation, index: usize) -> Option<QuadPoints>;
    fn set_attachment_points(
        &mut self,
        annot: Self::Annotation,
        index: usize,
        quad: QuadPoints,
    ) -> bool;
    fn append_attachment_points(&mut self, annot: Self::Annotation, quad: QuadPoints) -> bool;
    fn ink_list_count(&self, annot: Self::Annotation) -> usize;
    /// Returns the number of points in the stroke; fills `buf` when large enough.
    fn ink_list_path(&self, annot: Self::Annotation, index: usize, buf: &mut [PointF]) -> usize;
    fn add_ink_stroke(&mut self, annot: Self::Annotation, points: &[PointF]) -> i32;
    fn annotation_appearance(&self, annot: Self::Annotation, mode: i32, buf: &mut [u16]) -> usize;
    /// `None` removes the appearance stream for `mode`.
    fn set_annotation_appearance(
        &mut self,
        annot: Self::Annotation,
        mode: i32,
        value: Option<&[u16]>,
    ) -> bool;

    // ------------------------------------------------------------------
    // Form-fill environment
    // ------------------------------------------------------------------

    /// `FPDFDOC_InitFormFillEnvironment`.
    ///
    /// The implementation allocates the callback record and registers a
    /// teardown callback that frees it and then runs `on_release`. If the
    /// environment cannot be created the record is freed (and `on_release`
    /// run) before returning `None`.
    fn init_form_fill(
        &mut self,
        doc: Self::Document,
        version: i32,
        on_release: Box<dyn FnOnce()>,
    ) -> Option<Self::Form>;
    fn exit_form_fill(&mut self, form: Self::Form);
    fn form_on_after_load_page(&mut self, page: Self::Page, form: Self::Form);
    fn form_on_before_close_page(&mut self, page: Self::Page, form: Self::Form);
    #[allow(clippy::too_many_arguments)]
    fn form_draw(
        &mut self,
        form: Self::Form,
        bitmap: Self::Bitmap,
        page: Self::Page,
        viewport: Viewport,
        rotation: i32,
        flags: i32,
    );
    fn form_field_type(&self, form: Self::Form, annot: Self::Annotation) -> i32;
    fn form_field_name(&self, form: Self::Form, annot: Self::Annotation, buf: &mut [u16]) -> usize;
    fn form_field_value(&self, form: Self::Form, annot: Self::Annotation, buf: &mut [u16])
        -> usize;
    fn form_field_flags(&self, form: Self::Form, annot: Self::Annotation) -> i32;
    fn form_option_count(&self, form: Self::Form, annot: Self::Annotation) -> i32;
    fn form_option_label(
        &self,
        form: Self::Form,
        annot: Self::Annotation,
        index: i32,
        buf: &mut [u16],
    ) -> usize;
    fn form_is_option_selected(&self, form: Self::Form, annot: Self::Annotation, index: i32)
        -> bool;
    fn form_set_index_selected(
        &mut self,
        form: Self::Form,
        page: Self::Page,
        index: i32,
        selected: bool,
    ) -> bool;
    fn form_on_mouse_move(
        &mut self,
        form: Self::Form,
        page: Self::Page,
        modifier: i32,
        x: f64,
        y: f64,
    ) -> bool;
    fn form_on_lbutton_down(
        &mut self,
        form: Self::Form,
        page: Self::Page,
        modifier: i32,
        x: f64,
        y: f64,
    ) -> bool;
    fn form_on_lbutton_up(
        &mut self,
        form: Self::Form,
        page: Self::Page,
        modifier: i32,
        x: f64,
        y: f64,
    ) -> bool;
    fn form_on_focus(
        &mut self,
        form: Self::Form,
        page: Self::Page,
        modifier: i32,
        x: f64,
        y: f64,
    ) -> bool;
    fn form_on_key_down(
        &mut self,
        form: Self::Form,
        page: Self::Page,
        key_code: i32,
        modifier: i32,
    ) -> bool;
    fn form_on_key_up(
        &mut self,
        form: Self::Form,
        page: Self::Page,
        key_code: i32,
        modifier: i32,
    ) -> bool;
    fn form_on_char(&mut self, form: Self::Form, page: Self::Page, ch: i32, modifier: i32)
        -> bool;
    fn form_can_undo(&self, form: Self::Form, page: Self::Page) -> bool;
    fn form_can_redo(&self, form: Self::Form, page: Self::Page) -> bool;
    fn form_undo(&mut self, form: Self::Form, page: Self::Page) -> bool;
    fn form_redo(&mut self, form: Self::Form, page: Self::Page) -> bool;
    fn form_select_all_text(&mut self, form: Self::Form, page: Self::Page) -> bool;
    fn form_set_highlight_color(&mut self, form: Self::Form, field_type: i32, argb: u32);
    fn form_set_highlight_alpha(&mut self, form: Self::Form, alpha: u8);
    fn form_remove_highlight(&mut self, form: Self::Form);

    // ------------------------------------------------------------------
    // Attachments and signatures
    // ------------------------------------------------------------------

    fn attachment_count(&self, doc: Self::Document) -> i32;
    fn get_attachment(&self, doc: Self::Document, index: i32) -> Option<Self::Attachment>;
    fn attachment_name(&self, attachment: Self::Attachment, buf: &mut [u16]) -> usize;
    /// `None` when the attachment has no embedded file.
    fn attachment_file(&self, attachment: Self::Attachment, buf: &mut [u8]) -> Option<usize>;
    /// `name` is NUL-terminated UTF-16LE.
    fn add_attachment(&mut self, doc: Self::Document, name: &[u16]) -> Option<Self::Attachment>;
    fn set_attachment_file(
        &mut self,
        doc: Self::Document,
        attachment: Self::Attachment,
        contents: &[u8],
    ) -> bool;
    fn delete_attachment(&mut self, doc: Self::Document, index: i32) -> bool;

    fn signature_count(&self, doc: Self::Document) -> i32;
    fn get_signature(&self, doc: Self::Document, index: i32) -> Option<Self::Signature>;
    fn signature_contents(&self, signature: Self::Signature, buf: &mut [u8]) -> usize;
    fn signature_reason(&self, signature: Self::Signature, buf: &mut [u16]) -> usize;
    fn signature_time(&self, signature: Self::Signature, buf: &mut [u8]) -> usize;

    // ------------------------------------------------------------------
    // Structure tree
    // ------------------------------------------------------------------

    fn struct_tree_for_page(&mut self, page: Self::Page) -> Option<Self::StructTree>;
    fn close_struct_tree(&mut self, tree: Self::StructTree);
    fn struct_tree_child_count(&self, tree: Self::StructTree) -> i32;
    fn struct_tree_child(&self, tree: Self::StructTree, index: i32) -> Option<Self::StructElement>;
    fn struct_element_type(&self, element: Self::StructElement, buf: &mut [u16]) -> usize;
    fn struct_element_alt_text(&self, element: Self::StructElement, buf: &mut [u16]) -> usize;
    fn struct_element_child_count(&self, element: Self::StructElement) -> i32;
    fn struct_element_child(
        &self,
        element: Self::StructElement,
        index: i32,
    ) -> Option<Self::StructElement>;

    // ------------------------------------------------------------------
    // Page objects and fonts
    // ------------------------------------------------------------------

    fn page_object_count(&self, page: Self::Page) -> i32;
    fn get_page_object(&self, page: Self::Page, index: i32) -> Option<Self::PageObject>;
    fn page_object_type(&self, object: Self::PageObject) -> i32;
    fn new_text_object(
        &mut self,
        doc: Self::Document,
        font: &CStr,
        size: f32,
    ) -> Option<Self::PageObject>;
    fn create_text_object(
        &mut self,
        doc: Self::Document,
        font: Self::Font,
        size: f32,
    ) -> Option<Self::PageObject>;
    /// `text` is NUL-terminated UTF-16LE.
    fn set_text(&mut self, object: Self::PageObject, text: &[u16]) -> bool;
    fn new_path(&mut self, x: f32, y: f32) -> Option<Self::PageObject>;
    fn path_move_to(&mut self, object: Self::PageObject, x: f32, y: f32) -> bool;
    fn path_line_to(&mut self, object: Self::PageObject, x: f32, y: f32) -> bool;
    #[allow(clippy::too_many_arguments)]
    fn path_bezier_to(
        &mut self,
        object: Self::PageObject,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        x3: f32,
        y3: f32,
    ) -> bool;
    fn path_close(&mut self, object: Self::PageObject) -> bool;
    fn path_set_draw_mode(&mut self, object: Self::PageObject, fill_mode: i32, stroke: bool)
        -> bool;
    fn set_stroke_width(&mut self, object: Self::PageObject, width: f32) -> bool;
    fn new_image_object(&mut self, doc: Self::Document) -> Option<Self::PageObject>;
    fn image_set_bitmap(&mut self, object: Self::PageObject, bitmap: Self::Bitmap) -> bool;
    fn insert_object(&mut self, page: Self::Page, object: Self::PageObject);
    fn remove_object(&mut self, page: Self::Page, object: Self::PageObject) -> bool;
    fn destroy_object(&mut self, object: Self::PageObject);
    fn set_fill_color(&mut self, object: Self::PageObject, color: Rgba) -> bool;
    fn set_stroke_color(&mut self, object: Self::PageObject, color: Rgba) -> bool;
    fn fill_color(&self, object: Self::PageObject) -> Option<Rgba>;
    fn stroke_color(&self, object: Self::PageObject) -> Option<Rgba>;
    fn transform_object(&mut self, object: Self::PageObject, matrix: Matrix);
    fn object_bounds(&self, object: Self::PageObject) -> Option<PageRect>;

    fn load_standard_font(&mut self, doc: Self::Document, name: &CStr) -> Option<Self::Font>;
    fn close_font(&mut self, font: Self::Font);
}
