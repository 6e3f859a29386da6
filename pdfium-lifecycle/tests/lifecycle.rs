//! Document and page lifecycle tests against the in-memory library.
//!
//! Covers:
//! - source buffer ownership across open/close cycles
//! - load failures (empty input, bad data, wrong password)
//! - cascading close of pages, text pages, objects and fonts
//! - stale and foreign handles
//! - saving through the block writer

use pdfium_lifecycle::testing::{FakeBindings, FakeDocument, FakePage, SAVE_BLOCK};
use pdfium_lifecycle::{
    DocumentSource, HandleKind, LoadError, Pdfium, PdfiumError, SaveFlags,
};
use std::io::{self, Write};
use tempfile::tempdir;

fn session() -> Pdfium<FakeBindings> {
    Pdfium::new(FakeBindings::new())
}

fn three_pages() -> Vec<u8> {
    FakeDocument::with_blank_pages(3, 612.0, 792.0)
        .with_metadata("Title", "Quarterly Report")
        .to_bytes()
}

// ============================================================================
// Source buffers
// ============================================================================

#[test]
fn test_buffer_released_after_each_cycle() {
    let mut pdfium = session();
    let bytes = three_pages();

    for cycle in 0..10 {
        let doc = pdfium.open_from_bytes(&bytes, None).unwrap();
        assert_eq!(pdfium.outstanding_buffers(), 1, "cycle {}", cycle);
        assert_eq!(pdfium.outstanding_buffer_bytes(), bytes.len());
        pdfium.close_document(doc).unwrap();
        assert_eq!(pdfium.outstanding_buffers(), 0, "cycle {}", cycle);
    }
    assert_eq!(pdfium.bindings().live_documents(), 0);
}

#[test]
fn test_library_reads_owned_copy() {
    let mut pdfium = session();
    let doc = {
        let bytes = three_pages();
        pdfium.open_from_bytes(&bytes, None).unwrap()
    };

    // Caller bytes are gone; the document still reads from the session copy.
    assert_eq!(pdfium.page_count(doc).unwrap(), 3);
    assert_eq!(pdfium.metadata(doc, "Title").unwrap(), "Quarterly Report");
    assert_eq!(pdfium.document_source(doc).unwrap(), DocumentSource::Bytes);

    let sources = pdfium.bindings().document_sources();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0].1, three_pages().len());
}

#[test]
fn test_created_document_has_no_buffer() {
    let mut pdfium = session();
    let doc = pdfium.create_document().unwrap();
    assert_eq!(pdfium.outstanding_buffers(), 0);
    assert_eq!(pdfium.page_count(doc).unwrap(), 0);
    assert_eq!(pdfium.document_source(doc).unwrap(), DocumentSource::New);
    pdfium.close_document(doc).unwrap();
}

// ============================================================================
// Load failures
// ============================================================================

#[test]
fn test_empty_input_is_rejected_before_the_library() {
    let mut pdfium = session();
    let result = pdfium.open_from_bytes(&[], None);
    assert!(matches!(result, Err(PdfiumError::EmptySource)));
    assert_eq!(pdfium.last_error(), LoadError::File);
    assert_eq!(pdfium.bindings().counters().documents_loaded, 0);
    assert_eq!(pdfium.outstanding_buffers(), 0);
}

#[test]
fn test_malformed_input_reports_format() {
    let mut pdfium = session();
    match pdfium.open_from_bytes(b"not a document at all", None) {
        Err(PdfiumError::Load(LoadError::Format)) => {}
        Err(e) => panic!("Expected format error, got: {:?}", e),
        Ok(_) => panic!("Expected load failure"),
    }
    assert_eq!(pdfium.last_error(), LoadError::Format);
    assert_eq!(pdfium.outstanding_buffers(), 0);
}

#[test]
fn test_wrong_password_releases_buffer() {
    let mut pdfium = session();
    let bytes = FakeDocument::with_blank_pages(1, 100.0, 100.0)
        .with_password("secret")
        .to_bytes();

    for password in [None, Some("guess")] {
        match pdfium.open_from_bytes(&bytes, password) {
            Err(PdfiumError::Load(LoadError::Password)) => {}
            other => panic!("Expected password error, got: {:?}", other),
        }
        assert_eq!(pdfium.last_error(), LoadError::Password);
        assert_eq!(pdfium.outstanding_buffers(), 0);
    }

    let doc = pdfium.open_from_bytes(&bytes, Some("secret")).unwrap();
    assert_eq!(pdfium.last_error(), LoadError::Success);
    assert_eq!(pdfium.outstanding_buffers(), 1);
    pdfium.close_document(doc).unwrap();
}

#[test]
fn test_source_size_limit() {
    let config = pdfium_lifecycle::LibraryConfig::new().with_max_source_bytes(16);
    let mut pdfium = Pdfium::with_config(FakeBindings::new(), config);
    let result = pdfium.open_from_bytes(&three_pages(), None);
    assert!(matches!(result, Err(PdfiumError::AllocationFailed { .. })));
    assert_eq!(pdfium.last_error(), LoadError::File);
    assert_eq!(pdfium.outstanding_buffers(), 0);
}

#[test]
fn test_open_from_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, three_pages()).unwrap();

    let mut pdfium = session();
    let doc = pdfium.open_from_path(&path, None).unwrap();
    assert_eq!(pdfium.page_count(doc).unwrap(), 3);
    assert_eq!(pdfium.document_source(doc).unwrap(), DocumentSource::Path);
    assert_eq!(pdfium.outstanding_buffers(), 0);

    let missing = pdfium.open_from_path(dir.path().join("missing.pdf"), None);
    assert!(matches!(missing, Err(PdfiumError::Load(LoadError::File))));
}

#[cfg(unix)]
#[test]
fn test_open_from_descriptor() {
    use std::os::fd::AsFd;

    let dir = tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, three_pages()).unwrap();
    let file = std::fs::File::open(&path).unwrap();

    let mut pdfium = session();
    let doc = pdfium.open_from_descriptor(file.as_fd(), None).unwrap();
    assert_eq!(pdfium.document_source(doc).unwrap(), DocumentSource::Descriptor);
    assert_eq!(pdfium.outstanding_buffers(), 1);
    pdfium.close_document(doc).unwrap();
    assert_eq!(pdfium.outstanding_buffers(), 0);
}

// ============================================================================
// Pages and cascading close
// ============================================================================

#[test]
fn test_load_and_close_every_page() {
    let mut pdfium = session();
    let doc = pdfium.open_from_bytes(&three_pages(), None).unwrap();

    let pages: Vec<_> = (0..pdfium.page_count(doc).unwrap())
        .map(|i| pdfium.load_page(doc, i).unwrap())
        .collect();
    assert_eq!(pdfium.bindings().live_pages(), 3);
    for (i, page) in pages.iter().enumerate() {
        assert_eq!(pdfium.page_index(*page).unwrap(), i);
        assert_eq!(pdfium.page_document(*page).unwrap(), doc);
        assert_eq!(pdfium.page_size(*page).unwrap(), (612.0, 792.0));
    }
    for page in pages {
        pdfium.close_page(page).unwrap();
    }
    pdfium.close_document(doc).unwrap();

    let counters = pdfium.bindings().counters();
    assert_eq!(counters.pages_loaded, 3);
    assert_eq!(counters.pages_closed, 3);
    assert_eq!(counters.invalid_calls, 0);
}

#[test]
fn test_page_index_out_of_bounds() {
    let mut pdfium = session();
    let doc = pdfium.open_from_bytes(&three_pages(), None).unwrap();
    match pdfium.load_page(doc, 3) {
        Err(PdfiumError::PageIndexOutOfBounds { index: 3, count: 3 }) => {}
        other => panic!("Expected out of bounds, got: {:?}", other),
    }
    assert_eq!(pdfium.bindings().counters().pages_loaded, 0);
}

#[test]
fn test_close_document_cascades_in_dependency_order() {
    let mut pdfium = session();
    let bytes = FakeDocument::new()
        .with_page(FakePage::letter().with_text("alpha beta"))
        .with_page(FakePage::letter().with_text("gamma"))
        .to_bytes();
    let doc = pdfium.open_from_bytes(&bytes, None).unwrap();

    let first = pdfium.load_page(doc, 0).unwrap();
    let second = pdfium.load_page(doc, 1).unwrap();
    let text = pdfium.load_text_page(first).unwrap();
    let search = pdfium
        .start_search(text, "beta", Default::default())
        .unwrap();
    let font = pdfium.load_standard_font(doc, "Helvetica").unwrap();
    let detached = pdfium.new_path(doc, 0.0, 0.0).unwrap();
    pdfium.init_form(doc).unwrap();

    // Everything is closed by the document, children first.
    pdfium.close_document(doc).unwrap();

    let fake = pdfium.bindings();
    assert_eq!(fake.live_documents(), 0);
    assert_eq!(fake.live_pages(), 0);
    assert_eq!(fake.live_text_pages(), 0);
    assert_eq!(fake.live_searches(), 0);
    assert_eq!(fake.live_forms(), 0);
    assert_eq!(fake.detached_objects(), 0);
    let counters = fake.counters();
    assert_eq!(counters.invalid_calls, 0, "a parent closed before its child");
    assert_eq!(counters.unpaired_hooks, 0);
    assert_eq!(counters.form_releases, 1);
    assert_eq!(pdfium.outstanding_buffers(), 0);
    assert_eq!(pdfium.outstanding_form_records(), 0);

    for kind in [
        HandleKind::Document,
        HandleKind::Page,
        HandleKind::TextPage,
        HandleKind::Search,
        HandleKind::Font,
        HandleKind::PageObject,
        HandleKind::Form,
    ] {
        assert_eq!(pdfium.open_handles(kind), 0, "{} still open", kind);
    }

    assert!(matches!(
        pdfium.page_size(second),
        Err(PdfiumError::InvalidHandle { kind: HandleKind::Page })
    ));
    assert!(pdfium.text(text).is_err());
    assert!(pdfium.find_next(search).is_err());
    assert!(pdfium.close_font(font).is_err());
    assert!(pdfium.destroy_page_object(detached).is_err());
}

#[test]
fn test_close_page_cascades() {
    let mut pdfium = session();
    let bytes = FakeDocument::new()
        .with_page(FakePage::letter().with_text("annotated"))
        .to_bytes();
    let doc = pdfium.open_from_bytes(&bytes, None).unwrap();
    let page = pdfium.load_page(doc, 0).unwrap();
    let text = pdfium.load_text_page(page).unwrap();
    pdfium.start_search(text, "note", Default::default()).unwrap();
    pdfium
        .create_annotation(page, pdfium_lifecycle::AnnotationSubtype::Square)
        .unwrap();

    pdfium.close_page(page).unwrap();

    let fake = pdfium.bindings();
    assert_eq!(fake.live_pages(), 0);
    assert_eq!(fake.live_text_pages(), 0);
    assert_eq!(fake.live_searches(), 0);
    assert_eq!(fake.live_annotations(), 0);
    assert_eq!(fake.counters().invalid_calls, 0);
    assert_eq!(pdfium.open_handles(HandleKind::Annotation), 0);

    // The document itself is untouched.
    assert_eq!(pdfium.page_count(doc).unwrap(), 1);
}

#[test]
fn test_double_close_is_an_error_not_a_double_free() {
    let mut pdfium = session();
    let doc = pdfium.open_from_bytes(&three_pages(), None).unwrap();
    let page = pdfium.load_page(doc, 0).unwrap();

    pdfium.close_page(page).unwrap();
    assert!(matches!(
        pdfium.close_page(page),
        Err(PdfiumError::InvalidHandle { kind: HandleKind::Page })
    ));
    pdfium.close_document(doc).unwrap();
    assert!(matches!(
        pdfium.close_document(doc),
        Err(PdfiumError::InvalidHandle { kind: HandleKind::Document })
    ));

    let counters = pdfium.bindings().counters();
    assert_eq!(counters.pages_closed, 1);
    assert_eq!(counters.documents_closed, 1);
    assert_eq!(counters.invalid_calls, 0);
}

#[test]
fn test_reused_slot_rejects_old_handle() {
    let mut pdfium = session();
    let bytes = three_pages();
    let old = pdfium.open_from_bytes(&bytes, None).unwrap();
    pdfium.close_document(old).unwrap();
    let new = pdfium.open_from_bytes(&bytes, None).unwrap();

    assert_ne!(old, new);
    assert!(pdfium.page_count(old).is_err());
    assert_eq!(pdfium.page_count(new).unwrap(), 3);
}

#[test]
fn test_import_and_delete_pages() {
    let mut pdfium = session();
    let bytes = three_pages();
    let dest = pdfium.create_document().unwrap();
    let src = pdfium.open_from_bytes(&bytes, None).unwrap();

    assert_eq!(pdfium.import_pages(dest, src, Some("1,3"), 0).unwrap(), 2);
    assert_eq!(pdfium.page_count(dest).unwrap(), 2);

    pdfium.delete_page(dest, 0).unwrap();
    assert_eq!(pdfium.page_count(dest).unwrap(), 1);
}

#[test]
fn test_drop_closes_everything() {
    let bytes = three_pages();
    let mut pdfium = session();
    let doc = pdfium.open_from_bytes(&bytes, None).unwrap();
    let page = pdfium.load_page(doc, 1).unwrap();
    pdfium.load_text_page(page).unwrap();
    drop(pdfium);
}

// ============================================================================
// Saving
// ============================================================================

/// Writer that accepts `limit` bytes, then fails.
struct FailingWriter {
    written: usize,
    limit: usize,
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written + buf.len() > self.limit {
            return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
        }
        self.written += buf.len();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Writer that takes only half of each block.
struct ShortWriter;

impl Write for ShortWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len() / 2)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_save_round_trip() {
    let mut pdfium = session();
    let doc = pdfium.open_from_bytes(&three_pages(), None).unwrap();
    pdfium.new_page(doc, 3, 200.0, 300.0).unwrap();

    let saved = pdfium.save_to_bytes(doc, SaveFlags::NoIncremental).unwrap();
    assert!(pdfium.bindings().counters().save_blocks >= saved.len() / SAVE_BLOCK);

    let reopened = pdfium.open_from_bytes(&saved, None).unwrap();
    assert_eq!(pdfium.page_count(reopened).unwrap(), 4);
    assert_eq!(pdfium.page_size_by_index(reopened, 3).unwrap(), (200.0, 300.0));
    assert_eq!(pdfium.metadata(reopened, "Title").unwrap(), "Quarterly Report");
}

#[test]
fn test_save_remove_security() {
    let mut pdfium = session();
    let bytes = FakeDocument::with_blank_pages(1, 100.0, 100.0)
        .with_password("secret")
        .to_bytes();
    let doc = pdfium.open_from_bytes(&bytes, Some("secret")).unwrap();

    let saved = pdfium.save_to_bytes(doc, SaveFlags::RemoveSecurity).unwrap();
    let reopened = pdfium.open_from_bytes(&saved, None).unwrap();
    assert_eq!(pdfium.page_count(reopened).unwrap(), 1);
}

#[test]
fn test_save_writer_error_aborts() {
    let mut pdfium = session();
    let doc = pdfium.open_from_bytes(&three_pages(), None).unwrap();

    let mut writer = FailingWriter {
        written: 0,
        limit: SAVE_BLOCK,
    };
    match pdfium.save_to_writer(doc, &mut writer, SaveFlags::Default) {
        Err(PdfiumError::Io(e)) => assert_eq!(e.to_string(), "disk full"),
        other => panic!("Expected io error, got: {:?}", other),
    }
    // The first block went through, the second stopped the save.
    assert_eq!(writer.written, SAVE_BLOCK);
    assert_eq!(pdfium.bindings().counters().save_blocks, 2);
}

#[test]
fn test_save_partial_write_is_an_error() {
    let mut pdfium = session();
    let doc = pdfium.open_from_bytes(&three_pages(), None).unwrap();
    match pdfium.save_to_writer(doc, &mut ShortWriter, SaveFlags::Default) {
        Err(PdfiumError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::WriteZero),
        other => panic!("Expected write zero, got: {:?}", other),
    }
}

#[test]
fn test_save_to_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("copy.pdf");

    let mut pdfium = session();
    let doc = pdfium.open_from_bytes(&three_pages(), None).unwrap();
    let written = pdfium.save_to_path(doc, &path, SaveFlags::Default).unwrap();

    let on_disk = std::fs::read(&path).unwrap();
    assert_eq!(on_disk.len() as u64, written);
    let reopened = pdfium.open_from_path(&path, None).unwrap();
    assert_eq!(pdfium.page_count(reopened).unwrap(), 3);
}
