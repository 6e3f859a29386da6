//! Rendering tests: one-shot renders, the progressive render state machine
//! and the form layer.

use pdfium_lifecycle::bindings::raw;
use pdfium_lifecycle::testing::{FakeAnnotation, FakeBindings, FakeDocument, FakeField, FakePage};
use pdfium_lifecycle::{
    FieldType, PageHandle, PageRect, Pdfium, PdfiumError, PixelFormat, PixelSurface, RenderFlags,
    RenderState, RenderStatus, Rgba, Rotation, Viewport,
};
use std::cell::Cell;
use std::rc::Rc;
use tempfile::tempdir;

const WIDTH: u32 = 40;
const HEIGHT: u32 = 30;
const RED: [u8; 4] = [255, 0, 0, 255];
const WHITE: [u8; 4] = [255, 255, 255, 255];

fn open_page(page: FakePage) -> (Pdfium<FakeBindings>, PageHandle) {
    let bytes = FakeDocument::new().with_page(page).to_bytes();
    let mut pdfium = Pdfium::new(FakeBindings::new());
    let doc = pdfium.open_from_bytes(&bytes, None).unwrap();
    let page = pdfium.load_page(doc, 0).unwrap();
    (pdfium, page)
}

fn full_view() -> Viewport {
    Viewport::new(0, 0, WIDTH as i32, HEIGHT as i32)
}

fn surface(format: PixelFormat) -> PixelSurface {
    PixelSurface::new(WIDTH, HEIGHT, format).unwrap()
}

/// Pause predicate that always answers `answer` and counts its calls.
fn counting_probe(answer: bool) -> (Box<dyn FnMut() -> bool>, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let probe = Box::new(move || {
        seen.set(seen.get() + 1);
        answer
    });
    (probe, calls)
}

// ============================================================================
// One-shot rendering
// ============================================================================

#[test]
fn test_render_into_bgra() {
    let (mut pdfium, page) = open_page(FakePage::new(200.0, 150.0));
    let mut target = surface(PixelFormat::Bgra8888);

    pdfium
        .render_into(page, &mut target, full_view(), Rotation::None, RenderFlags::new())
        .unwrap();

    // Library order is B, G, R, A.
    assert_eq!(target.pixel(0, 0), Some([0, 0, 255, 255]));
    assert_eq!(target.pixel(1, 0), Some(WHITE));
    assert_eq!(&target.to_rgba().unwrap()[..4], &RED);

    let fake = pdfium.bindings();
    assert_eq!(fake.counters().renders, 1);
    assert_eq!(fake.live_bitmaps(), 0, "bitmap wrapper must be destroyed");
    assert_eq!(fake.last_render_flags() & raw::FPDF_REVERSE_BYTE_ORDER, 0);
}

#[test]
fn test_render_into_rgba_reverses_byte_order() {
    let (mut pdfium, page) = open_page(FakePage::new(200.0, 150.0));
    let mut target = surface(PixelFormat::Rgba8888);
    let flags = RenderFlags::new().with_annotations(true).with_lcd_text(true);

    pdfium
        .render_into(page, &mut target, full_view(), Rotation::None, flags)
        .unwrap();

    assert_eq!(target.pixel(0, 0), Some(RED));
    let raw_flags = pdfium.bindings().last_render_flags();
    assert_ne!(raw_flags & raw::FPDF_REVERSE_BYTE_ORDER, 0);
    assert_ne!(raw_flags & raw::FPDF_ANNOT, 0);
    assert_ne!(raw_flags & raw::FPDF_LCD_TEXT, 0);
}

#[test]
fn test_render_into_offset_viewport() {
    let (mut pdfium, page) = open_page(FakePage::new(200.0, 150.0));
    let mut target = PixelSurface::new(WIDTH, HEIGHT, PixelFormat::Rgba8888).unwrap();
    target.pixels_mut().fill(0);

    pdfium
        .render_into(page, &mut target, Viewport::new(10, 5, 20, 10), Rotation::None, RenderFlags::new())
        .unwrap();

    // Only the viewport is cleared to white.
    assert_eq!(target.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(target.pixel(10, 5), Some(RED));
    assert_eq!(target.pixel(29, 14), Some(WHITE));
    assert_eq!(target.pixel(30, 15), Some([0, 0, 0, 0]));
}

#[test]
fn test_two_byte_formats_are_refused() {
    let (mut pdfium, page) = open_page(FakePage::letter());
    for format in [PixelFormat::Rgb565, PixelFormat::Alpha8] {
        let mut target = surface(format);
        match pdfium.render_into(page, &mut target, full_view(), Rotation::None, RenderFlags::new()) {
            Err(PdfiumError::UnsupportedPixelFormat(f)) => assert_eq!(f, format),
            other => panic!("Expected unsupported format, got: {:?}", other),
        }
    }
    assert_eq!(pdfium.bindings().counters().bitmaps_created, 0);
}

#[test]
fn test_save_render_as_png() {
    let (mut pdfium, page) = open_page(FakePage::letter());
    let mut target = surface(PixelFormat::Bgra8888);
    pdfium
        .render_into(page, &mut target, full_view(), Rotation::None, RenderFlags::new())
        .unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("page.png");
    target.save_as_png(&path).unwrap();
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");
}

// ============================================================================
// Progressive rendering
// ============================================================================

#[test]
fn test_progressive_pausing_every_unit() {
    let (mut pdfium, page) = open_page(FakePage::letter().with_render_steps(4));
    let (probe, calls) = counting_probe(true);

    let status = pdfium
        .start_render(page, surface(PixelFormat::Bgra8888), full_view(), Rotation::None, RenderFlags::new(), Some(probe))
        .unwrap();
    assert_eq!(status, RenderStatus::ToBeContinued);
    assert_eq!(pdfium.render_state(page), RenderState::Paused);

    let mut continues = 0;
    loop {
        let status = pdfium.continue_render(page).unwrap();
        continues += 1;
        if status == RenderStatus::Done {
            break;
        }
        assert_eq!(status, RenderStatus::ToBeContinued);
        assert!(continues < 10, "render never finished");
    }
    assert_eq!(continues, 3);
    assert_eq!(calls.get(), 3);
    assert_eq!(pdfium.render_state(page), RenderState::Done);

    let finished = pdfium.close_render(page).unwrap();
    assert_eq!(finished.pixel(0, 0), Some([0, 0, 255, 255]));
    assert_eq!(finished.pixel(5, 5), Some(WHITE));
    assert_eq!(pdfium.render_state(page), RenderState::Idle);

    let counters = pdfium.bindings().counters();
    assert_eq!(counters.render_starts, 1);
    assert_eq!(counters.render_continues, 3);
    assert_eq!(counters.render_closes, 1);
    assert_eq!(counters.renders, 1);
    assert_eq!(counters.invalid_calls, 0);
    assert_eq!(pdfium.bindings().live_bitmaps(), 0);
}

#[test]
fn test_progressive_never_pausing() {
    let (mut pdfium, page) = open_page(FakePage::letter().with_render_steps(4));
    let (probe, calls) = counting_probe(false);

    let status = pdfium
        .start_render(page, surface(PixelFormat::Rgba8888), full_view(), Rotation::None, RenderFlags::new(), Some(probe))
        .unwrap();
    assert_eq!(status, RenderStatus::Done);
    assert_eq!(calls.get(), 3);
    assert_eq!(pdfium.bindings().counters().pause_checks, 3);

    let finished = pdfium.close_render(page).unwrap();
    assert_eq!(finished.pixel(0, 0), Some(RED));
}

#[test]
fn test_progressive_without_predicate_finishes_in_one_call() {
    let (mut pdfium, page) = open_page(FakePage::letter().with_render_steps(8));
    let status = pdfium
        .start_render(page, surface(PixelFormat::Bgra8888), full_view(), Rotation::None, RenderFlags::new(), None)
        .unwrap();
    assert!(status.is_terminal());
    assert_eq!(pdfium.bindings().counters().pause_checks, 0);
    pdfium.close_render(page).unwrap();
}

#[test]
fn test_continue_after_done_is_rejected() {
    let (mut pdfium, page) = open_page(FakePage::letter());
    pdfium
        .start_render(page, surface(PixelFormat::Bgra8888), full_view(), Rotation::None, RenderFlags::new(), None)
        .unwrap();

    match pdfium.continue_render(page) {
        Err(PdfiumError::InvalidRenderState { state: RenderState::Done, .. }) => {}
        other => panic!("Expected invalid render state, got: {:?}", other),
    }
    assert_eq!(pdfium.bindings().counters().render_continues, 0);
    pdfium.close_render(page).unwrap();
}

#[test]
fn test_operations_without_open_span() {
    let (mut pdfium, page) = open_page(FakePage::letter());
    assert_eq!(pdfium.render_state(page), RenderState::Idle);
    assert!(matches!(
        pdfium.continue_render(page),
        Err(PdfiumError::InvalidRenderState { state: RenderState::Idle, .. })
    ));
    assert!(matches!(
        pdfium.close_render(page),
        Err(PdfiumError::InvalidRenderState { state: RenderState::Idle, .. })
    ));
    assert_eq!(pdfium.bindings().counters().render_closes, 0);
}

#[test]
fn test_one_span_per_page() {
    let (mut pdfium, page) = open_page(FakePage::letter().with_render_steps(3));
    let (probe, _) = counting_probe(true);
    pdfium
        .start_render(page, surface(PixelFormat::Bgra8888), full_view(), Rotation::None, RenderFlags::new(), Some(probe))
        .unwrap();

    let second = pdfium.start_render(
        page,
        surface(PixelFormat::Bgra8888),
        full_view(),
        Rotation::None,
        RenderFlags::new(),
        None,
    );
    assert!(matches!(
        second,
        Err(PdfiumError::InvalidRenderState { state: RenderState::Paused, .. })
    ));

    let mut other = surface(PixelFormat::Bgra8888);
    assert!(matches!(
        pdfium.render_into(page, &mut other, full_view(), Rotation::None, RenderFlags::new()),
        Err(PdfiumError::InvalidRenderState { .. })
    ));
    assert_eq!(pdfium.bindings().counters().render_starts, 1);
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

#[test]
fn test_cancel_mid_render_and_restart() {
    let (mut pdfium, page) = open_page(FakePage::letter().with_render_steps(5));
    let (probe, _) = counting_probe(true);
    pdfium
        .start_render(page, surface(PixelFormat::Bgra8888), full_view(), Rotation::None, RenderFlags::new(), Some(probe))
        .unwrap();
    pdfium.continue_render(page).unwrap();

    // Cancelled: the surface comes back untouched by the final paint.
    let cancelled = pdfium.close_render(page).unwrap();
    assert_eq!(cancelled.pixel(0, 0), Some(WHITE));
    assert_eq!(pdfium.bindings().counters().renders, 0);
    assert_eq!(pdfium.bindings().live_bitmaps(), 0);

    let status = pdfium
        .start_render(page, cancelled, full_view(), Rotation::None, RenderFlags::new(), None)
        .unwrap();
    assert_eq!(status, RenderStatus::Done);
    let finished = pdfium.close_render(page).unwrap();
    assert_eq!(finished.pixel(0, 0), Some([0, 0, 255, 255]));
}

#[test]
fn test_close_page_ends_open_span() {
    let (mut pdfium, page) = open_page(FakePage::letter().with_render_steps(4));
    let (probe, _) = counting_probe(true);
    pdfium
        .start_render(page, surface(PixelFormat::Bgra8888), full_view(), Rotation::None, RenderFlags::new(), Some(probe))
        .unwrap();

    pdfium.close_page(page).unwrap();

    let fake = pdfium.bindings();
    assert_eq!(fake.counters().render_closes, 1);
    assert_eq!(fake.live_bitmaps(), 0);
    assert_eq!(fake.counters().invalid_calls, 0);
    assert_eq!(pdfium.render_state(page), RenderState::Idle);
}

// ============================================================================
// Form layer
// ============================================================================

#[test]
fn test_draw_form_over_rendered_page() {
    let field = FakeField {
        name: "email".to_string(),
        field_type: FieldType::TextField.to_raw(),
        ..Default::default()
    };
    let widget = FakeAnnotation::widget(PageRect::new(20.0, 100.0, 120.0, 140.0), field);
    let (mut pdfium, page) = open_page(FakePage::new(200.0, 150.0).with_annotation(widget));
    let doc = pdfium.page_document(page).unwrap();
    let form = pdfium.init_form(doc).unwrap();

    let mut target = PixelSurface::new(200, 150, PixelFormat::Rgba8888).unwrap();
    let view = Viewport::new(0, 0, 200, 150);
    pdfium
        .render_into(page, &mut target, view, Rotation::None, RenderFlags::new())
        .unwrap();
    pdfium
        .set_form_highlight_color(form, Some(FieldType::TextField), Rgba::new(0, 0, 255, 255))
        .unwrap();
    pdfium
        .draw_form(form, page, &mut target, view, Rotation::None, RenderFlags::new())
        .unwrap();

    // Page ink is still there and the widget's top-left corner is marked.
    assert_eq!(target.pixel(0, 0), Some(RED));
    assert_eq!(target.pixel(20, 10), Some([0, 0, 255, 255]));
    assert_eq!(pdfium.bindings().live_bitmaps(), 0);
}
