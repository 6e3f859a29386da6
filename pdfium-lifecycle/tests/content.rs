//! Document content reached through child handles:
//! - annotations and their dictionary entries
//! - bookmarks, links and actions
//! - attachments and signatures
//! - structure trees
//! - page objects, fonts, boxes and thumbnails

use pdfium_lifecycle::date::parse_pdf_date;
use pdfium_lifecycle::testing::{
    FakeAction, FakeAnnotation, FakeBindings, FakeBookmark, FakeDocument, FakeElement, FakeLink,
    FakeObject, FakePage, FakeSignature,
};
use pdfium_lifecycle::{
    ActionType, AnnotationSubtype, AppearanceMode, ColorType, DocumentHandle, FillMode,
    FlattenMode, FlattenOutcome, HandleKind, Matrix, PageBox, PageHandle, PageObjectType,
    PageRect, Pdfium, PdfiumError, PointF, QuadPoints, Rgba,
};

fn open(model: FakeDocument) -> (Pdfium<FakeBindings>, DocumentHandle) {
    let mut pdfium = Pdfium::new(FakeBindings::new());
    let doc = pdfium.open_from_bytes(&model.to_bytes(), None).unwrap();
    (pdfium, doc)
}

fn open_page(page: FakePage) -> (Pdfium<FakeBindings>, DocumentHandle, PageHandle) {
    let (mut pdfium, doc) = open(FakeDocument::new().with_page(page));
    let page = pdfium.load_page(doc, 0).unwrap();
    (pdfium, doc, page)
}

fn quad(left: f32, bottom: f32, right: f32, top: f32) -> QuadPoints {
    QuadPoints::from_slice(&[left, top, right, top, left, bottom, right, bottom])
}

// ============================================================================
// Annotations
// ============================================================================

#[test]
fn test_annotation_entries() {
    let note = FakeAnnotation::new(1, PageRect::new(50.0, 700.0, 70.0, 720.0))
        .with_string("Contents", "Check the totals")
        .with_string("T", "Åsa")
        .with_string("M", "D:20240131094500+01'00'");
    let (mut pdfium, _, page) = open_page(FakePage::letter().with_annotation(note));

    assert_eq!(pdfium.annotation_count(page).unwrap(), 1);
    let annot = pdfium.open_annotation(page, 0).unwrap();
    assert_eq!(pdfium.annotation_subtype(annot).unwrap(), AnnotationSubtype::Text);
    assert_eq!(
        pdfium.annotation_rect(annot).unwrap(),
        PageRect::new(50.0, 700.0, 70.0, 720.0)
    );
    assert_eq!(pdfium.annotation_contents(annot).unwrap(), "Check the totals");
    assert_eq!(pdfium.annotation_author(annot).unwrap(), "Åsa");
    assert_eq!(pdfium.annotation_subject(annot).unwrap(), "");
    assert_eq!(
        pdfium.annotation_modified(annot).unwrap(),
        parse_pdf_date("D:20240131094500+01'00'")
    );
    assert_eq!(pdfium.annotation_created(annot).unwrap(), None);
    assert_eq!(pdfium.annotation_page(annot).unwrap(), page);
    assert_eq!(pdfium.annotation_index(annot).unwrap(), Some(0));

    pdfium.set_annotation_subject(annot, "Review").unwrap();
    pdfium.set_annotation_contents(annot, "Totals fixed").unwrap();
    let created = parse_pdf_date("D:20231105120000-05'00'").unwrap();
    pdfium.set_annotation_created(annot, created).unwrap();
    assert_eq!(pdfium.annotation_subject(annot).unwrap(), "Review");
    assert_eq!(pdfium.annotation_contents(annot).unwrap(), "Totals fixed");
    assert_eq!(pdfium.annotation_string(annot, "CreationDate").unwrap(), "D:20231105120000-05'00'");
    assert_eq!(pdfium.annotation_created(annot).unwrap(), Some(created));

    assert!(matches!(
        pdfium.open_annotation(page, 1),
        Err(PdfiumError::InvalidArgument(_))
    ));
    pdfium.close_annotation(annot).unwrap();
    assert!(matches!(
        pdfium.close_annotation(annot),
        Err(PdfiumError::InvalidHandle { kind: HandleKind::Annotation })
    ));
    assert_eq!(pdfium.bindings().live_annotations(), 0);
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

#[test]
fn test_annotation_color_and_opacity() {
    let (mut pdfium, _, page) = open_page(FakePage::letter());
    let annot = pdfium.create_annotation(page, AnnotationSubtype::Square).unwrap();

    assert_eq!(pdfium.annotation_color(annot, ColorType::Color).unwrap(), None);
    let red = Rgba::new(255, 0, 0, 255);
    let pale = Rgba::new(255, 240, 240, 128);
    pdfium.set_annotation_color(annot, ColorType::Color, red).unwrap();
    pdfium.set_annotation_color(annot, ColorType::Interior, pale).unwrap();
    assert_eq!(pdfium.annotation_color(annot, ColorType::Color).unwrap(), Some(red));
    assert_eq!(pdfium.annotation_color(annot, ColorType::Interior).unwrap(), Some(pale));

    // Unset opacity reads as fully opaque; writes are clamped.
    assert_eq!(pdfium.annotation_opacity(annot).unwrap(), 1.0);
    pdfium.set_annotation_opacity(annot, 0.25).unwrap();
    assert_eq!(pdfium.annotation_opacity(annot).unwrap(), 0.25);
    pdfium.set_annotation_opacity(annot, 3.0).unwrap();
    assert_eq!(pdfium.annotation_opacity(annot).unwrap(), 1.0);
    pdfium.set_annotation_opacity(annot, -1.0).unwrap();
    assert_eq!(pdfium.annotation_opacity(annot).unwrap(), 0.0);

    pdfium.set_annotation_flags(annot, 4).unwrap();
    assert_eq!(pdfium.annotation_flags(annot).unwrap(), 4);
}

#[test]
fn test_quad_points() {
    let (mut pdfium, _, page) = open_page(FakePage::letter());
    let annot = pdfium.create_annotation(page, AnnotationSubtype::Highlight).unwrap();
    assert!(pdfium.annotation_quad_points(annot).unwrap().is_empty());

    let first = quad(10.0, 700.0, 90.0, 712.0);
    let second = quad(10.0, 688.0, 60.0, 700.0);
    pdfium.set_annotation_quad_points(annot, &[first, second]).unwrap();
    assert_eq!(pdfium.annotation_quad_points(annot).unwrap(), vec![first, second]);

    // Same length overwrites in place; longer appends.
    let moved = quad(20.0, 700.0, 100.0, 712.0);
    let third = quad(10.0, 676.0, 40.0, 688.0);
    pdfium.set_annotation_quad_points(annot, &[moved, second, third]).unwrap();
    assert_eq!(pdfium.annotation_quad_points(annot).unwrap(), vec![moved, second, third]);

    // The library cannot drop entries.
    assert!(matches!(
        pdfium.set_annotation_quad_points(annot, &[moved]),
        Err(PdfiumError::InvalidArgument(_))
    ));
    assert_eq!(pdfium.annotation_quad_points(annot).unwrap().len(), 3);

    let mut flat = Vec::new();
    for q in [first, second, third, moved] {
        flat.extend_from_slice(&q.to_array());
    }
    pdfium.set_annotation_quad_values(annot, &flat).unwrap();
    assert_eq!(pdfium.annotation_quad_points(annot).unwrap()[3], moved);
    assert!(matches!(
        pdfium.set_annotation_quad_values(annot, &flat[..12]),
        Err(PdfiumError::InvalidArgument(_))
    ));
}

#[test]
fn test_quad_points_rejected_by_subtype() {
    let (mut pdfium, _, page) = open_page(FakePage::letter());
    let annot = pdfium.create_annotation(page, AnnotationSubtype::Circle).unwrap();
    assert!(matches!(
        pdfium.set_annotation_quad_points(annot, &[quad(0.0, 0.0, 10.0, 10.0)]),
        Err(PdfiumError::CallFailed { .. })
    ));
}

#[test]
fn test_ink_strokes() {
    let (mut pdfium, _, page) = open_page(FakePage::letter());
    let ink = pdfium.create_annotation(page, AnnotationSubtype::Ink).unwrap();
    let stroke = [PointF::new(10.0, 10.0), PointF::new(20.0, 25.0), PointF::new(30.0, 12.0)];
    assert_eq!(pdfium.add_ink_stroke(ink, &stroke).unwrap(), 0);
    assert_eq!(pdfium.add_ink_stroke(ink, &stroke[..2]).unwrap(), 1);
    assert_eq!(
        pdfium.annotation_ink_list(ink).unwrap(),
        vec![stroke.to_vec(), stroke[..2].to_vec()]
    );
    assert!(matches!(
        pdfium.add_ink_stroke(ink, &[]),
        Err(PdfiumError::InvalidArgument(_))
    ));

    let square = pdfium.create_annotation(page, AnnotationSubtype::Square).unwrap();
    assert!(matches!(
        pdfium.add_ink_stroke(square, &stroke),
        Err(PdfiumError::CallFailed { .. })
    ));
}

#[test]
fn test_appearance_streams() {
    let (mut pdfium, _, page) = open_page(FakePage::letter());
    let annot = pdfium.create_annotation(page, AnnotationSubtype::Stamp).unwrap();
    assert_eq!(pdfium.annotation_appearance(annot, AppearanceMode::Normal).unwrap(), "");

    let stream = "q 1 0 0 RG 0 0 50 20 re S Q";
    pdfium
        .set_annotation_appearance(annot, AppearanceMode::Normal, Some(stream))
        .unwrap();
    assert_eq!(pdfium.annotation_appearance(annot, AppearanceMode::Normal).unwrap(), stream);
    assert_eq!(pdfium.annotation_appearance(annot, AppearanceMode::Down).unwrap(), "");

    pdfium
        .set_annotation_appearance(annot, AppearanceMode::Normal, None)
        .unwrap();
    assert_eq!(pdfium.annotation_appearance(annot, AppearanceMode::Normal).unwrap(), "");
}

#[test]
fn test_remove_annotation_closes_open_handles() {
    let page = FakePage::letter()
        .with_annotation(FakeAnnotation::new(1, PageRect::new(0.0, 0.0, 10.0, 10.0)))
        .with_annotation(FakeAnnotation::new(5, PageRect::new(20.0, 20.0, 40.0, 40.0)));
    let (mut pdfium, _, page) = open_page(page);
    let first = pdfium.open_annotation(page, 0).unwrap();
    let second = pdfium.open_annotation(page, 1).unwrap();

    pdfium.remove_annotation(page, 0).unwrap();
    assert_eq!(pdfium.annotation_count(page).unwrap(), 1);
    assert!(pdfium.annotation_rect(first).is_err());
    // The survivor moved down but its handle still works.
    assert_eq!(pdfium.annotation_index(second).unwrap(), Some(0));
    assert_eq!(pdfium.annotation_subtype(second).unwrap(), AnnotationSubtype::Square);
    assert!(pdfium.remove_annotation(page, 5).is_err());
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

#[test]
fn test_flatten_page() {
    let page = FakePage::letter()
        .with_annotation(FakeAnnotation::new(13, PageRect::new(0.0, 0.0, 100.0, 40.0)));
    let (mut pdfium, _, page) = open_page(page);
    assert_eq!(
        pdfium.flatten_page(page, FlattenMode::Print).unwrap(),
        FlattenOutcome::Flattened
    );
    assert_eq!(pdfium.annotation_count(page).unwrap(), 0);
    assert_eq!(
        pdfium.flatten_page(page, FlattenMode::NormalDisplay).unwrap(),
        FlattenOutcome::NothingToDo
    );
}

// ============================================================================
// Bookmarks, links and actions
// ============================================================================

fn linked_document() -> FakeDocument {
    let first = FakePage::letter()
        .with_link(FakeLink {
            rect: PageRect::new(100.0, 100.0, 200.0, 120.0),
            dest: Some(1),
            action: None,
        })
        .with_link(FakeLink {
            rect: PageRect::new(100.0, 200.0, 300.0, 220.0),
            dest: None,
            action: Some(FakeAction::Uri {
                uri: "https://example.com/terms".into(),
            }),
        })
        .with_link(FakeLink {
            rect: PageRect::new(100.0, 300.0, 300.0, 320.0),
            dest: None,
            action: Some(FakeAction::Launch {
                path: "appendix.pdf".into(),
            }),
        })
        .with_link(FakeLink {
            rect: PageRect::new(100.0, 400.0, 300.0, 420.0),
            dest: Some(7),
            action: None,
        })
        .with_annotation(FakeAnnotation::new(2, PageRect::new(100.0, 100.0, 200.0, 120.0)));
    FakeDocument::new()
        .with_page(first)
        .with_page(FakePage::letter())
        .with_bookmark(
            FakeBookmark::new("Introduction")
                .with_dest(0)
                .with_child(FakeBookmark::new("Scope").with_dest(0))
                .with_child(FakeBookmark::new("Terms").with_action(FakeAction::GoTo { page: 1 })),
        )
        .with_bookmark(FakeBookmark::new("Elsewhere").with_action(FakeAction::RemoteGoTo {
            path: "other.pdf".into(),
            page: 3,
        }))
}

#[test]
fn test_bookmark_tree() {
    let (mut pdfium, doc) = open(linked_document());
    let tree = pdfium.bookmark_tree(doc).unwrap();

    let titles: Vec<&str> = tree.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, ["Introduction", "Elsewhere"]);
    assert_eq!(tree[0].page_index, Some(0));
    assert_eq!(tree[0].children.len(), 2);
    assert_eq!(tree[0].children[1].title, "Terms");
    // Reached through the action rather than a destination.
    assert_eq!(tree[0].children[1].page_index, Some(1));
    assert_eq!(tree[1].page_index, None);

    // Walking the same node twice gives the same handle.
    let scope = pdfium.find_bookmark(doc, "Scope").unwrap();
    assert_eq!(scope, Some(tree[0].children[0].handle));
    assert_eq!(pdfium.find_bookmark(doc, "Missing").unwrap(), None);

    let remote = pdfium.bookmark_action(tree[1].handle).unwrap().unwrap();
    assert_eq!(pdfium.action_type(remote).unwrap(), ActionType::RemoteGoTo);
    assert_eq!(pdfium.action_file_path(remote).unwrap(), "other.pdf");
    assert_eq!(pdfium.action_page_index(remote).unwrap(), None);
    assert_eq!(pdfium.bookmark_action(tree[0].handle).unwrap(), None);
}

#[test]
fn test_links_and_actions() {
    let (mut pdfium, doc) = open(linked_document());
    let page = pdfium.load_page(doc, 0).unwrap();

    let internal = pdfium.link_at_point(page, 150.0, 110.0).unwrap().unwrap();
    assert_eq!(pdfium.link_page_index(internal).unwrap(), Some(1));
    assert_eq!(pdfium.link_uri(internal).unwrap(), None);
    assert_eq!(pdfium.link_action(internal).unwrap(), None);
    assert_eq!(
        pdfium.link_rect(internal).unwrap(),
        PageRect::new(100.0, 100.0, 200.0, 120.0)
    );

    let web = pdfium.link_at_point(page, 150.0, 210.0).unwrap().unwrap();
    assert_eq!(pdfium.link_page_index(web).unwrap(), None);
    assert_eq!(pdfium.link_uri(web).unwrap().as_deref(), Some("https://example.com/terms"));
    let action = pdfium.link_action(web).unwrap().unwrap();
    assert_eq!(pdfium.action_type(action).unwrap(), ActionType::Uri);
    assert_eq!(pdfium.action_uri(action).unwrap(), "https://example.com/terms");
    assert_eq!(pdfium.action_file_path(action).unwrap(), "");

    let launch = pdfium.link_at_point(page, 150.0, 310.0).unwrap().unwrap();
    let action = pdfium.link_action(launch).unwrap().unwrap();
    assert_eq!(pdfium.action_type(action).unwrap(), ActionType::Launch);
    assert_eq!(pdfium.action_file_path(action).unwrap(), "appendix.pdf");

    // A destination past the last page resolves to nothing.
    let dangling = pdfium.link_at_point(page, 150.0, 410.0).unwrap().unwrap();
    assert_eq!(pdfium.link_page_index(dangling).unwrap(), None);

    assert_eq!(pdfium.link_at_point(page, 5.0, 5.0).unwrap(), None);

    let annot = pdfium.open_annotation(page, 0).unwrap();
    assert_eq!(pdfium.annotation_link(annot).unwrap(), Some(internal));
}

#[test]
fn test_views_die_with_their_owner() {
    let (mut pdfium, doc) = open(linked_document());
    let page = pdfium.load_page(doc, 0).unwrap();
    let link = pdfium.link_at_point(page, 150.0, 210.0).unwrap().unwrap();
    let bookmark = pdfium.first_bookmark(doc, None).unwrap().unwrap();
    let terms = pdfium.find_bookmark(doc, "Terms").unwrap().unwrap();
    let action = pdfium.bookmark_action(terms).unwrap().unwrap();

    pdfium.close_page(page).unwrap();
    assert!(matches!(
        pdfium.link_rect(link),
        Err(PdfiumError::InvalidHandle { kind: HandleKind::Link })
    ));
    // Bookmarks and their actions belong to the document and survive the page.
    assert_eq!(pdfium.action_type(action).unwrap(), ActionType::GoTo);
    assert_eq!(pdfium.action_page_index(action).unwrap(), Some(1));
    assert_eq!(pdfium.bookmark_title(bookmark).unwrap(), "Introduction");

    pdfium.close_document(doc).unwrap();
    assert!(pdfium.action_type(action).is_err());
    assert!(pdfium.bookmark_title(bookmark).is_err());
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

// ============================================================================
// Attachments and signatures
// ============================================================================

#[test]
fn test_attachments() {
    let (mut pdfium, doc) = open(
        FakeDocument::with_blank_pages(1, 100.0, 100.0)
            .with_attachment("data.csv", b"a,b\n1,2\n")
            .with_attachment("empty.txt", b""),
    );
    assert_eq!(pdfium.attachment_count(doc).unwrap(), 2);

    let csv = pdfium.attachment(doc, 0).unwrap();
    assert_eq!(pdfium.attachment_name(csv).unwrap(), "data.csv");
    assert_eq!(pdfium.attachment_contents(csv).unwrap(), Some(b"a,b\n1,2\n".to_vec()));
    let empty = pdfium.attachment(doc, 1).unwrap();
    assert_eq!(pdfium.attachment_contents(empty).unwrap(), Some(Vec::new()));
    assert!(pdfium.attachment(doc, 2).is_err());

    let added = pdfium.add_attachment(doc, "notes.txt", b"see page 4").unwrap();
    assert_eq!(pdfium.attachment_count(doc).unwrap(), 3);
    assert_eq!(pdfium.attachment_name(added).unwrap(), "notes.txt");
    assert_eq!(pdfium.attachment_contents(added).unwrap(), Some(b"see page 4".to_vec()));

    // Duplicate and empty names are refused.
    assert!(matches!(
        pdfium.add_attachment(doc, "data.csv", b"x"),
        Err(PdfiumError::CallFailed { .. })
    ));
    assert!(matches!(
        pdfium.add_attachment(doc, "", b"x"),
        Err(PdfiumError::InvalidArgument(_))
    ));

    // Deleting shifts the list, so every attachment handle goes stale.
    pdfium.delete_attachment(doc, 0).unwrap();
    assert_eq!(pdfium.attachment_count(doc).unwrap(), 2);
    assert!(pdfium.attachment_name(csv).is_err());
    assert!(pdfium.attachment_name(added).is_err());
    let first = pdfium.attachment(doc, 0).unwrap();
    assert_eq!(pdfium.attachment_name(first).unwrap(), "empty.txt");
    assert!(pdfium.delete_attachment(doc, 5).is_err());
}

#[test]
fn test_signatures() {
    let (mut pdfium, doc) = open(
        FakeDocument::with_blank_pages(1, 100.0, 100.0)
            .with_signature(FakeSignature {
                contents: vec![0x30, 0x82, 0x01, 0x0a],
                reason: "Approved".into(),
                time: "D:20240131094500+01'00'".into(),
            })
            .with_signature(FakeSignature::default()),
    );
    assert_eq!(pdfium.signature_count(doc).unwrap(), 2);

    let signed = pdfium.signature(doc, 0).unwrap();
    assert_eq!(pdfium.signature_contents(signed).unwrap(), vec![0x30, 0x82, 0x01, 0x0a]);
    assert_eq!(pdfium.signature_reason(signed).unwrap(), "Approved");
    let time = pdfium.signature_time(signed).unwrap().unwrap();
    assert_eq!(time.offset().local_minus_utc(), 3600);
    assert_eq!(time, parse_pdf_date("D:20240131094500+01'00'").unwrap());

    let bare = pdfium.signature(doc, 1).unwrap();
    assert!(pdfium.signature_contents(bare).unwrap().is_empty());
    assert_eq!(pdfium.signature_reason(bare).unwrap(), "");
    assert_eq!(pdfium.signature_time(bare).unwrap(), None);

    assert!(pdfium.signature(doc, 2).is_err());
}

// ============================================================================
// Structure trees
// ============================================================================

#[test]
fn test_structure_tree() {
    let page = FakePage::letter().with_structure(vec![
        FakeElement::new("H1"),
        FakeElement::new("Sect")
            .with_child(FakeElement::new("P"))
            .with_child(FakeElement::new("Figure").with_alt_text("Revenue by quarter")),
    ]);
    let (mut pdfium, _, page) = open_page(page);

    let tree = pdfium.struct_tree(page).unwrap();
    assert_eq!(pdfium.struct_tree_child_count(tree).unwrap(), 2);
    let heading = pdfium.struct_tree_child(tree, 0).unwrap().unwrap();
    assert_eq!(pdfium.struct_element_type(heading).unwrap(), "H1");
    assert_eq!(pdfium.struct_element_child_count(heading).unwrap(), 0);

    let section = pdfium.struct_tree_child(tree, 1).unwrap().unwrap();
    assert_eq!(pdfium.struct_element_child_count(section).unwrap(), 2);
    let figure = pdfium.struct_element_child(section, 1).unwrap().unwrap();
    assert_eq!(pdfium.struct_element_type(figure).unwrap(), "Figure");
    assert_eq!(pdfium.struct_element_alt_text(figure).unwrap(), "Revenue by quarter");
    assert_eq!(pdfium.struct_element_child(section, 2).unwrap(), None);
    assert_eq!(pdfium.struct_tree_child(tree, 9).unwrap(), None);

    pdfium.close_struct_tree(tree).unwrap();
    assert!(matches!(
        pdfium.struct_element_type(figure),
        Err(PdfiumError::InvalidHandle { kind: HandleKind::StructElement })
    ));
    assert!(pdfium.close_struct_tree(tree).is_err());
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

#[test]
fn test_untagged_page_and_close_with_page() {
    let (mut pdfium, doc) = open(
        FakeDocument::new()
            .with_page(FakePage::letter())
            .with_page(FakePage::letter().with_structure(vec![FakeElement::new("P")])),
    );
    let untagged = pdfium.load_page(doc, 0).unwrap();
    assert!(matches!(
        pdfium.struct_tree(untagged),
        Err(PdfiumError::CallFailed { .. })
    ));

    let tagged = pdfium.load_page(doc, 1).unwrap();
    let tree = pdfium.struct_tree(tagged).unwrap();
    let element = pdfium.struct_tree_child(tree, 0).unwrap().unwrap();
    pdfium.close_page(tagged).unwrap();
    assert!(pdfium.struct_tree_child_count(tree).is_err());
    assert!(pdfium.struct_element_type(element).is_err());
    assert_eq!(pdfium.open_handles(HandleKind::StructTree), 0);
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

// ============================================================================
// Page objects, fonts and page properties
// ============================================================================

#[test]
fn test_existing_objects_are_interned() {
    let page = FakePage::letter().with_object(FakeObject::rect(PageRect::new(10.0, 10.0, 60.0, 40.0)));
    let (mut pdfium, _, page) = open_page(page);
    assert_eq!(pdfium.page_object_count(page).unwrap(), 1);
    let object = pdfium.page_object(page, 0).unwrap();
    assert_eq!(pdfium.page_object(page, 0).unwrap(), object);
    assert_eq!(pdfium.page_object_type(object).unwrap(), PageObjectType::Path);
    assert_eq!(pdfium.page_object_page(object).unwrap(), Some(page));
    assert_eq!(
        pdfium.page_object_bounds(object).unwrap(),
        PageRect::new(10.0, 10.0, 60.0, 40.0)
    );
    assert!(pdfium.page_object(page, 1).is_err());

    // Owned by the page: stale once it closes, never destroyed by us.
    pdfium.close_page(page).unwrap();
    assert!(pdfium.page_object_bounds(object).is_err());
    assert_eq!(pdfium.bindings().counters().objects_destroyed, 0);
}

#[test]
fn test_path_ownership_moves_with_insert_and_remove() {
    let (mut pdfium, doc, page) = open_page(FakePage::letter());
    let path = pdfium.new_path(doc, 10.0, 10.0).unwrap();
    pdfium.path_line_to(path, 110.0, 10.0).unwrap();
    pdfium.path_line_to(path, 110.0, 60.0).unwrap();
    pdfium.path_close(path).unwrap();
    pdfium.set_path_draw_mode(path, FillMode::Alternate, true).unwrap();
    pdfium.set_stroke_width(path, 2.0).unwrap();
    pdfium.set_fill_color(path, Rgba::new(0, 128, 0, 255)).unwrap();
    assert_eq!(pdfium.fill_color(path).unwrap(), Some(Rgba::new(0, 128, 0, 255)));
    assert_eq!(pdfium.stroke_color(path).unwrap(), None);
    assert_eq!(
        pdfium.page_object_bounds(path).unwrap(),
        PageRect::new(10.0, 10.0, 110.0, 60.0)
    );
    assert!(matches!(
        pdfium.set_stroke_width(path, -1.0),
        Err(PdfiumError::InvalidArgument(_))
    ));

    assert_eq!(pdfium.page_object_page(path).unwrap(), None);
    pdfium.insert_page_object(page, path).unwrap();
    assert_eq!(pdfium.page_object_count(page).unwrap(), 1);
    assert_eq!(pdfium.page_object_page(path).unwrap(), Some(page));
    assert!(pdfium.insert_page_object(page, path).is_err());
    assert!(matches!(
        pdfium.destroy_page_object(path),
        Err(PdfiumError::InvalidArgument(_))
    ));
    pdfium.generate_content(page).unwrap();

    pdfium.remove_page_object(page, path).unwrap();
    assert_eq!(pdfium.page_object_count(page).unwrap(), 0);
    assert_eq!(pdfium.bindings().detached_objects(), 1);
    pdfium.destroy_page_object(path).unwrap();
    assert_eq!(pdfium.bindings().detached_objects(), 0);
    assert_eq!(pdfium.bindings().counters().objects_destroyed, 1);
    assert!(pdfium.page_object_bounds(path).is_err());
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

#[test]
fn test_transform_object() {
    let (mut pdfium, doc, _) = open_page(FakePage::letter());
    let path = pdfium.new_path(doc, 0.0, 0.0).unwrap();
    pdfium.path_line_to(path, 10.0, 20.0).unwrap();
    let shift = Matrix {
        e: 5.0,
        f: -5.0,
        ..Matrix::IDENTITY
    };
    pdfium.transform_page_object(path, shift).unwrap();
    assert_eq!(
        pdfium.page_object_bounds(path).unwrap(),
        PageRect::new(5.0, -5.0, 15.0, 15.0)
    );
}

#[test]
fn test_text_objects_and_fonts() {
    let (mut pdfium, doc, page) = open_page(FakePage::letter());
    let text = pdfium.new_text_object(doc, "Helvetica", 12.0).unwrap();
    pdfium.set_object_text(text, "abcd").unwrap();
    assert_eq!(pdfium.page_object_type(text).unwrap(), PageObjectType::Text);
    assert_eq!(pdfium.page_object_bounds(text).unwrap().width(), 24.0);
    pdfium.insert_page_object(page, text).unwrap();

    assert!(matches!(
        pdfium.load_standard_font(doc, "Comic Sans"),
        Err(PdfiumError::InvalidArgument(_))
    ));
    assert!(matches!(
        pdfium.new_text_object(doc, "Comic Sans", 12.0),
        Err(PdfiumError::CallFailed { .. })
    ));

    let font = pdfium.load_standard_font(doc, "Times-Bold").unwrap();
    let styled = pdfium.new_text_object_with_font(doc, font, 18.0).unwrap();
    pdfium.set_object_text(styled, "Title").unwrap();

    // A font only works in the document it was loaded into.
    let other = pdfium.create_document().unwrap();
    assert!(matches!(
        pdfium.new_text_object_with_font(other, font, 10.0),
        Err(PdfiumError::ForeignHandle {
            kind: HandleKind::Font,
            parent: HandleKind::Document
        })
    ));
    let foreign = pdfium.new_path(other, 0.0, 0.0).unwrap();
    assert!(matches!(
        pdfium.insert_page_object(page, foreign),
        Err(PdfiumError::ForeignHandle { .. })
    ));

    pdfium.close_font(font).unwrap();
    assert!(pdfium.close_font(font).is_err());
    assert_eq!(pdfium.bindings().counters().invalid_calls, 0);
}

#[test]
fn test_page_boxes_and_thumbnails() {
    let page = FakePage::new(300.0, 400.0)
        .with_box(PageBox::Trim, PageRect::new(10.0, 10.0, 290.0, 390.0))
        .with_thumbnail(&[0x89, b'P', b'N', b'G']);
    let (mut pdfium, doc) = open(FakeDocument::new().with_page(page).with_page(FakePage::letter()));
    let page = pdfium.load_page(doc, 0).unwrap();

    assert_eq!(
        pdfium.media_box(page).unwrap(),
        Some(PageRect::new(0.0, 0.0, 300.0, 400.0))
    );
    assert_eq!(pdfium.crop_box(page).unwrap(), None);
    assert_eq!(
        pdfium.page_box(page, PageBox::Trim).unwrap(),
        Some(PageRect::new(10.0, 10.0, 290.0, 390.0))
    );
    let crop = PageRect::new(20.0, 20.0, 280.0, 380.0);
    pdfium.set_page_box(page, PageBox::Crop, crop).unwrap();
    assert_eq!(pdfium.crop_box(page).unwrap(), Some(crop));

    assert_eq!(pdfium.decoded_thumbnail(page).unwrap(), vec![0x89, b'P', b'N', b'G']);
    assert_eq!(pdfium.raw_thumbnail(page).unwrap(), vec![0x89, b'P', b'N', b'G']);
    let plain = pdfium.load_page(doc, 1).unwrap();
    assert!(pdfium.decoded_thumbnail(plain).unwrap().is_empty());
}
