//! Smoke tests against the real library. Built only with the `native`
//! feature when PDFium headers were found.
#![cfg(all(feature = "native", pdfium_bindings))]

use pdfium_lifecycle::native::NativeBindings;
use pdfium_lifecycle::{
    Pdfium, PixelFormat, PixelSurface, RenderFlags, RenderStatus, Rotation, SaveFlags,
    SearchOptions, Viewport,
};
use serial_test::serial;

#[test]
#[serial]
fn test_blank_document_round_trip() {
    let mut pdfium = Pdfium::new(NativeBindings::new());
    let doc = pdfium.create_document().unwrap();
    let page = pdfium.new_page(doc, 0, 200.0, 100.0).unwrap();
    assert_eq!(pdfium.page_size(page).unwrap(), (200.0, 100.0));

    let mut surface = PixelSurface::new(200, 100, PixelFormat::Bgra8888).unwrap();
    pdfium
        .render_into(page, &mut surface, Viewport::new(0, 0, 200, 100), Rotation::None, RenderFlags::new())
        .unwrap();
    assert_eq!(surface.pixel(100, 50), Some([255, 255, 255, 255]));
    pdfium.close_page(page).unwrap();

    let bytes = pdfium.save_to_bytes(doc, SaveFlags::Default).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    pdfium.close_document(doc).unwrap();

    let reopened = pdfium.open_from_bytes(&bytes, None).unwrap();
    assert_eq!(pdfium.page_count(reopened).unwrap(), 1);
    let page = pdfium.load_page(reopened, 0).unwrap();
    let text = pdfium.load_text_page(page).unwrap();
    assert_eq!(pdfium.char_count(text).unwrap(), 0);
    let search = pdfium.start_search(text, "anything", SearchOptions::new()).unwrap();
    assert!(!pdfium.find_next(search).unwrap());

    pdfium.close_document(reopened).unwrap();
    assert_eq!(pdfium.outstanding_buffers(), 0);
}

#[test]
#[serial]
fn test_garbage_input_is_a_format_error() {
    let mut pdfium = Pdfium::new(NativeBindings::new());
    assert!(pdfium.open_from_bytes(b"not a pdf at all", None).is_err());
    assert_eq!(pdfium.last_error(), pdfium_lifecycle::LoadError::Format);
    assert_eq!(pdfium.outstanding_buffers(), 0);
}

#[test]
#[serial]
fn test_progressive_render_without_pause_completes() {
    let mut pdfium = Pdfium::new(NativeBindings::new());
    let doc = pdfium.create_document().unwrap();
    let page = pdfium.new_page(doc, 0, 200.0, 100.0).unwrap();
    let surface = PixelSurface::new(200, 100, PixelFormat::Bgra8888).unwrap();

    let status = pdfium
        .start_render(page, surface, Viewport::new(0, 0, 200, 100), Rotation::None, RenderFlags::new(), None)
        .unwrap();
    assert_eq!(status, RenderStatus::Done);
    let surface = pdfium.close_render(page).unwrap();
    assert_eq!(surface.pixel(100, 50), Some([255, 255, 255, 255]));
    pdfium.close_document(doc).unwrap();
}
