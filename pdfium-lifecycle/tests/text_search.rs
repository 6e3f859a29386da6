//! Text extraction, string marshaling and the search cursor.

use pdfium_lifecycle::testing::{fake_char_box, FakeBindings, FakeDocument, FakePage};
use pdfium_lifecycle::{HandleKind, Pdfium, PdfiumError, SearchOptions, TextPageHandle};

fn open_text(content: &str) -> (Pdfium<FakeBindings>, TextPageHandle) {
    open_text_with(FakeBindings::new(), content)
}

fn open_text_with(bindings: FakeBindings, content: &str) -> (Pdfium<FakeBindings>, TextPageHandle) {
    let bytes = FakeDocument::new()
        .with_page(FakePage::letter().with_text(content))
        .to_bytes();
    let mut pdfium = Pdfium::new(bindings);
    let doc = pdfium.open_from_bytes(&bytes, None).unwrap();
    let page = pdfium.load_page(doc, 0).unwrap();
    let text = pdfium.load_text_page(page).unwrap();
    (pdfium, text)
}

/// Every match start for `query`, walking forward to the end.
fn all_matches(
    pdfium: &mut Pdfium<FakeBindings>,
    text: TextPageHandle,
    query: &str,
    options: SearchOptions,
) -> Vec<usize> {
    let search = pdfium.start_search(text, query, options).unwrap();
    let mut found = Vec::new();
    while pdfium.find_next(search).unwrap() {
        found.push(pdfium.search_result_index(search).unwrap().unwrap());
    }
    pdfium.close_search(search).unwrap();
    found
}

// ============================================================================
// Text extraction
// ============================================================================

#[test]
fn test_text_and_ranges() {
    let (pdfium, text) = open_text("Grüße aus Zürich");
    assert_eq!(pdfium.char_count(text).unwrap(), 16);
    assert_eq!(pdfium.text(text).unwrap(), "Grüße aus Zürich");
    assert_eq!(pdfium.text_range(text, 6, 3).unwrap(), "aus");
    // Ranges are clamped to the page.
    assert_eq!(pdfium.text_range(text, 10, 100).unwrap(), "Zürich");
    assert_eq!(pdfium.text_range(text, 16, 4).unwrap(), "");
}

#[test]
fn test_text_outside_basic_plane() {
    let (pdfium, text) = open_text("note 🎵 end");
    // The surrogate pair counts as two units.
    assert_eq!(pdfium.char_count(text).unwrap(), 11);
    assert_eq!(pdfium.text(text).unwrap(), "note 🎵 end");
}

#[test]
fn test_empty_page_text() {
    let (pdfium, text) = open_text("");
    assert_eq!(pdfium.char_count(text).unwrap(), 0);
    assert_eq!(pdfium.text(text).unwrap(), "");
}

#[test]
fn test_char_geometry() {
    let (mut pdfium, text) = open_text("geometry");
    let expected = fake_char_box(4, 792.0);
    let found = pdfium.char_box(text, 4).unwrap();
    assert_eq!(found, expected);

    let x = (expected.left + expected.right) / 2.0;
    let y = (expected.top + expected.bottom) / 2.0;
    assert_eq!(pdfium.char_index_at(text, x, y, 0.0, 0.0).unwrap(), Some(4));
    assert_eq!(pdfium.char_index_at(text, -50.0, -50.0, 1.0, 1.0).unwrap(), None);
    assert!(pdfium.char_box(text, 99).is_err());

    let rects = pdfium.text_rects(text, 0, 8).unwrap();
    assert_eq!(rects.len(), 1, "one line gives one rectangle");
    assert_eq!(f64::from(rects[0].left), fake_char_box(0, 792.0).left);
    assert_eq!(f64::from(rects[0].right), fake_char_box(7, 792.0).right);
}

#[test]
fn test_web_links() {
    let (mut pdfium, text) = open_text("docs at https://example.com/guide, mirror www.example.org.");
    let links = pdfium.load_web_links(text).unwrap();
    assert_eq!(pdfium.web_link_count(links).unwrap(), 2);
    assert_eq!(pdfium.web_link_url(links, 0).unwrap(), "https://example.com/guide");
    assert_eq!(pdfium.web_link_url(links, 1).unwrap(), "www.example.org");
    assert_eq!(pdfium.web_link_url(links, 2).unwrap(), "");

    // Closing the text page takes the link set with it.
    pdfium.close_text_page(text).unwrap();
    assert!(pdfium.web_link_count(links).is_err());
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

#[test]
fn test_metadata_marshaling() {
    let bytes = FakeDocument::with_blank_pages(1, 100.0, 100.0)
        .with_metadata("Author", "Zoë Ångström")
        .to_bytes();
    let mut pdfium = Pdfium::new(FakeBindings::new());
    let doc = pdfium.open_from_bytes(&bytes, None).unwrap();

    assert_eq!(pdfium.metadata(doc, "Author").unwrap(), "Zoë Ångström");
    // Missing tags are empty, with no fill call made.
    let before = pdfium.bindings().counters();
    assert_eq!(pdfium.metadata(doc, "Keywords").unwrap(), "");
    let after = pdfium.bindings().counters();
    assert_eq!(after.string_queries, before.string_queries + 1);
    assert_eq!(after.string_fills, before.string_fills);
}

#[test]
fn test_metadata_tag_with_nul_is_rejected() {
    let bytes = FakeDocument::with_blank_pages(1, 100.0, 100.0).to_bytes();
    let mut pdfium = Pdfium::new(FakeBindings::new());
    let doc = pdfium.open_from_bytes(&bytes, None).unwrap();
    assert!(matches!(
        pdfium.metadata(doc, "Ti\0tle"),
        Err(PdfiumError::InvalidArgument(_))
    ));
}

#[test]
fn test_short_fill_is_discarded() {
    let bytes = FakeDocument::with_blank_pages(1, 100.0, 100.0)
        .with_metadata("Title", "Annual Report")
        .to_bytes();
    let mut pdfium = Pdfium::new(FakeBindings::new().with_short_fills());
    let doc = pdfium.open_from_bytes(&bytes, None).unwrap();
    assert_eq!(pdfium.metadata(doc, "Title").unwrap(), "");
}

// ============================================================================
// Search
// ============================================================================

#[test]
fn test_search_walks_forward_then_stops() {
    let (mut pdfium, text) = open_text("hello world, hello moon");
    let search = pdfium
        .start_search(text, "hello", SearchOptions::new())
        .unwrap();
    assert_eq!(pdfium.search_query(search).unwrap(), "hello");
    assert_eq!(pdfium.search_result_index(search).unwrap(), None);
    assert_eq!(pdfium.search_result_count(search).unwrap(), 0);

    assert!(pdfium.find_next(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(0));
    assert_eq!(pdfium.search_result_count(search).unwrap(), 5);

    assert!(pdfium.find_next(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(13));

    // Past the end: no match, and the last one stays current.
    assert!(!pdfium.find_next(search).unwrap());
    assert!(!pdfium.find_next(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(13));

    // Stepping back from the end moves to the previous match.
    assert!(pdfium.find_prev(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(0));
    assert!(!pdfium.find_prev(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(0));
    assert!(pdfium.find_next(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(13));
}

#[test]
fn test_search_turns_around_at_both_ends() {
    let (mut pdfium, text) = open_text("a b a b a");
    let search = pdfium.start_search(text, "a", SearchOptions::new()).unwrap();
    while pdfium.find_next(search).unwrap() {}
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(8));

    assert!(pdfium.find_prev(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(4));
    assert!(pdfium.find_prev(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(0));
    assert!(!pdfium.find_prev(search).unwrap());
    assert!(!pdfium.find_prev(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(0));

    assert!(pdfium.find_next(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(4));
    assert_eq!(pdfium.search_result_count(search).unwrap(), 1);

    // Restarting the cursor does not leak library searches.
    assert_eq!(pdfium.bindings().live_searches(), 1);
    pdfium.close_search(search).unwrap();
    assert_eq!(pdfium.bindings().live_searches(), 0);
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

#[test]
fn test_empty_query_never_matches() {
    let (mut pdfium, text) = open_text("anything at all");
    for options in [
        SearchOptions::new(),
        SearchOptions::new().match_case(true).match_whole_word(true),
    ] {
        let search = pdfium.start_search(text, "", options).unwrap();
        assert!(!pdfium.find_next(search).unwrap());
        assert!(!pdfium.find_prev(search).unwrap());
        assert_eq!(pdfium.search_match(search).unwrap(), None);
        assert_eq!(pdfium.search_query(search).unwrap(), "");
        pdfium.close_search(search).unwrap();
    }
    // No library search was ever opened.
    assert_eq!(pdfium.bindings().live_searches(), 0);
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

#[test]
fn test_search_options() {
    let (mut pdfium, text) = open_text("Rust rust RUST");
    assert_eq!(all_matches(&mut pdfium, text, "rust", SearchOptions::new()), vec![0, 5, 10]);
    assert_eq!(
        all_matches(&mut pdfium, text, "rust", SearchOptions::new().match_case(true)),
        vec![5]
    );

    let (mut pdfium, text) = open_text("cat concat cat");
    assert_eq!(all_matches(&mut pdfium, text, "cat", SearchOptions::new()), vec![0, 7, 11]);
    assert_eq!(
        all_matches(&mut pdfium, text, "cat", SearchOptions::new().match_whole_word(true)),
        vec![0, 11]
    );

    let (mut pdfium, text) = open_text("aaaa");
    assert_eq!(all_matches(&mut pdfium, text, "aa", SearchOptions::new()), vec![0, 2]);
    assert_eq!(
        all_matches(&mut pdfium, text, "aa", SearchOptions::new().consecutive(true)),
        vec![0, 1, 2]
    );
}

#[test]
fn test_search_from_offset() {
    let (mut pdfium, text) = open_text("one two one two");
    let search = pdfium
        .start_search_at(text, "one", SearchOptions::new(), 3)
        .unwrap();
    assert!(pdfium.find_next(search).unwrap());
    assert_eq!(pdfium.search_result_index(search).unwrap(), Some(8));
    assert!(!pdfium.find_next(search).unwrap());
}

#[test]
fn test_closing_text_page_closes_searches() {
    let (mut pdfium, text) = open_text("find me, find me again");
    let first = pdfium.start_search(text, "find", SearchOptions::new()).unwrap();
    let second = pdfium.start_search(text, "again", SearchOptions::new()).unwrap();
    assert!(pdfium.find_next(first).unwrap());
    assert_eq!(pdfium.bindings().live_searches(), 2);

    pdfium.close_text_page(text).unwrap();

    assert_eq!(pdfium.bindings().live_searches(), 0);
    assert_eq!(pdfium.bindings().live_text_pages(), 0);
    assert_eq!(pdfium.open_handles(HandleKind::Search), 0);
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
    for search in [first, second] {
        assert!(matches!(
            pdfium.find_next(search),
            Err(PdfiumError::InvalidHandle { kind: HandleKind::Search })
        ));
    }
}
