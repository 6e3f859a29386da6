//! Serializable document model loaded by [`super::FakeBindings`].
//!
//! A fake document is plain JSON behind a magic line, so tests can build one
//! in code, hand its bytes to any open path, and read saved output back.

use crate::geometry::{PageBox, PageRect, PointF, Rgba};
use crate::transform::visible_box;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// First bytes of every serialized fake document.
pub const MAGIC: &[u8] = b"%FAKEPDF\n";

/// Target of a link, bookmark or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FakeAction {
    GoTo { page: i32 },
    RemoteGoTo { path: String, page: i32 },
    Uri { uri: String },
    Launch { path: String },
}

impl FakeAction {
    pub(crate) fn type_code(&self) -> u32 {
        match self {
            FakeAction::GoTo { .. } => 1,
            FakeAction::RemoteGoTo { .. } => 2,
            FakeAction::Uri { .. } => 3,
            FakeAction::Launch { .. } => 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeBookmark {
    pub title: String,
    #[serde(default)]
    pub dest: Option<i32>,
    #[serde(default)]
    pub action: Option<FakeAction>,
    #[serde(default)]
    pub children: Vec<FakeBookmark>,
}

impl FakeBookmark {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            dest: None,
            action: None,
            children: Vec::new(),
        }
    }

    pub fn with_dest(mut self, page: i32) -> Self {
        self.dest = Some(page);
        self
    }

    pub fn with_action(mut self, action: FakeAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn with_child(mut self, child: FakeBookmark) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeLink {
    pub rect: PageRect,
    #[serde(default)]
    pub dest: Option<i32>,
    #[serde(default)]
    pub action: Option<FakeAction>,
}

/// Interactive form data carried by a widget annotation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FakeField {
    pub name: String,
    pub field_type: i32,
    #[serde(default)]
    pub flags: i32,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub selected: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FakeAnnotation {
    pub subtype: i32,
    pub rect: PageRect,
    #[serde(default)]
    pub color: Option<Rgba>,
    #[serde(default)]
    pub interior: Option<Rgba>,
    #[serde(default)]
    pub flags: i32,
    #[serde(default)]
    pub strings: BTreeMap<String, String>,
    #[serde(default)]
    pub numbers: BTreeMap<String, f32>,
    #[serde(default)]
    pub quads: Vec<[f32; 8]>,
    #[serde(default)]
    pub ink: Vec<Vec<PointF>>,
    #[serde(default)]
    pub appearance: BTreeMap<i32, String>,
    #[serde(default)]
    pub field: Option<FakeField>,
    #[serde(skip)]
    pub(crate) uid: u64,
}

impl FakeAnnotation {
    pub fn new(subtype: i32, rect: PageRect) -> Self {
        Self {
            subtype,
            rect,
            ..Self::default()
        }
    }

    pub fn with_string(mut self, key: &str, value: &str) -> Self {
        self.strings.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_number(mut self, key: &str, value: f32) -> Self {
        self.numbers.insert(key.to_string(), value);
        self
    }

    /// Widget annotation carrying a form field.
    pub fn widget(rect: PageRect, field: FakeField) -> Self {
        Self {
            subtype: 20,
            rect,
            field: Some(field),
            ..Self::default()
        }
    }
}

/// Path segment opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FakeSegment {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    BezierTo([f32; 6]),
    Close,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeObject {
    /// `FPDF_PAGEOBJ_*` code.
    pub kind: i32,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub font_size: f32,
    #[serde(default)]
    pub segments: Vec<FakeSegment>,
    #[serde(default)]
    pub fill_mode: i32,
    #[serde(default)]
    pub stroke: bool,
    #[serde(default)]
    pub stroke_width: f32,
    #[serde(default)]
    pub fill_color: Option<Rgba>,
    #[serde(default)]
    pub stroke_color: Option<Rgba>,
    /// Image size in pixels and the first pixel as stored, blue first.
    #[serde(default)]
    pub image: Option<(u32, u32, [u8; 4])>,
    pub bounds: PageRect,
    #[serde(skip)]
    pub(crate) uid: u64,
}

impl FakeObject {
    pub(crate) fn new(kind: i32, bounds: PageRect) -> Self {
        Self {
            kind,
            text: String::new(),
            font: None,
            font_size: 0.0,
            segments: Vec::new(),
            fill_mode: 0,
            stroke: false,
            stroke_width: 1.0,
            fill_color: None,
            stroke_color: None,
            image: None,
            bounds,
            uid: 0,
        }
    }

    /// A path object covering `rect`.
    pub fn rect(rect: PageRect) -> Self {
        let mut object = Self::new(2, rect);
        object.segments = vec![
            FakeSegment::MoveTo(rect.left, rect.bottom),
            FakeSegment::LineTo(rect.right, rect.bottom),
            FakeSegment::LineTo(rect.right, rect.top),
            FakeSegment::LineTo(rect.left, rect.top),
            FakeSegment::Close,
        ];
        object
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeElement {
    pub kind: String,
    #[serde(default)]
    pub alt_text: String,
    #[serde(default)]
    pub children: Vec<FakeElement>,
}

impl FakeElement {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            alt_text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_alt_text(mut self, alt: &str) -> Self {
        self.alt_text = alt.to_string();
        self
    }

    pub fn with_child(mut self, child: FakeElement) -> Self {
        self.children.push(child);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakePage {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub rotation: i32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub boxes: Vec<(PageBox, PageRect)>,
    #[serde(default)]
    pub links: Vec<FakeLink>,
    #[serde(default)]
    pub annotations: Vec<FakeAnnotation>,
    #[serde(default)]
    pub objects: Vec<FakeObject>,
    #[serde(default)]
    pub structure: Option<Vec<FakeElement>>,
    #[serde(default)]
    pub thumbnail: Vec<u8>,
    /// Work units a progressive render of this page takes.
    #[serde(default = "default_render_steps")]
    pub render_steps: u32,
    #[serde(skip)]
    pub(crate) uid: u64,
}

fn default_render_steps() -> u32 {
    1
}

impl FakePage {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            rotation: 0,
            label: None,
            text: String::new(),
            boxes: Vec::new(),
            links: Vec::new(),
            annotations: Vec::new(),
            objects: Vec::new(),
            structure: None,
            thumbnail: Vec::new(),
            render_steps: 1,
            uid: 0,
        }
    }

    /// US Letter.
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_box(mut self, which: PageBox, rect: PageRect) -> Self {
        self.boxes.retain(|(kind, _)| *kind != which);
        self.boxes.push((which, rect));
        self
    }

    pub fn with_link(mut self, link: FakeLink) -> Self {
        self.links.push(link);
        self
    }

    pub fn with_annotation(mut self, annotation: FakeAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_object(mut self, object: FakeObject) -> Self {
        self.objects.push(object);
        self
    }

    pub fn with_structure(mut self, elements: Vec<FakeElement>) -> Self {
        self.structure = Some(elements);
        self
    }

    pub fn with_thumbnail(mut self, bytes: &[u8]) -> Self {
        self.thumbnail = bytes.to_vec();
        self
    }

    /// Intrinsic `/Rotate` in quarter turns.
    pub fn with_rotation(mut self, turns: i32) -> Self {
        self.rotation = turns.rem_euclid(4);
        self
    }

    pub fn with_render_steps(mut self, steps: u32) -> Self {
        self.render_steps = steps.max(1);
        self
    }

    pub(crate) fn visible_box(&self) -> PageRect {
        let media = PageRect::new(0.0, 0.0, self.width, self.height);
        let media = self.page_box(PageBox::Media).unwrap_or(media);
        visible_box(media, self.page_box(PageBox::Crop))
    }

    pub(crate) fn page_box(&self, which: PageBox) -> Option<PageRect> {
        let explicit = self
            .boxes
            .iter()
            .find(|(kind, _)| *kind == which)
            .map(|(_, rect)| *rect);
        match which {
            PageBox::Media => {
                explicit.or_else(|| Some(PageRect::new(0.0, 0.0, self.width, self.height)))
            }
            _ => explicit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FakeAttachment {
    pub name: String,
    #[serde(default)]
    pub contents: Option<Vec<u8>>,
    #[serde(skip)]
    pub(crate) uid: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FakeSignature {
    pub contents: Vec<u8>,
    #[serde(default)]
    pub reason: String,
    /// PDF date string, e.g. `D:20240131094500+01'00'`.
    #[serde(default)]
    pub time: String,
}

/// A whole document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FakeDocument {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub pages: Vec<FakePage>,
    #[serde(default)]
    pub bookmarks: Vec<FakeBookmark>,
    #[serde(default)]
    pub attachments: Vec<FakeAttachment>,
    #[serde(default)]
    pub signatures: Vec<FakeSignature>,
    /// `FORMTYPE_*` code.
    #[serde(default)]
    pub form_type: i32,
    #[serde(default)]
    pub page_mode: i32,
    #[serde(default)]
    pub javascript_actions: i32,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// `count` blank pages of the given size.
    pub fn with_blank_pages(count: usize, width: f32, height: f32) -> Self {
        Self {
            pages: (0..count).map(|_| FakePage::new(width, height)).collect(),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, page: FakePage) -> Self {
        self.pages.push(page);
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_metadata(mut self, tag: &str, value: &str) -> Self {
        self.metadata.insert(tag.to_string(), value.to_string());
        self
    }

    pub fn with_bookmark(mut self, bookmark: FakeBookmark) -> Self {
        self.bookmarks.push(bookmark);
        self
    }

    pub fn with_attachment(mut self, name: &str, contents: &[u8]) -> Self {
        self.attachments.push(FakeAttachment {
            name: name.to_string(),
            contents: Some(contents.to_vec()),
            uid: 0,
        });
        self
    }

    pub fn with_signature(mut self, signature: FakeSignature) -> Self {
        self.signatures.push(signature);
        self
    }

    pub fn with_form_type(mut self, form_type: i32) -> Self {
        self.form_type = form_type;
        self
    }

    /// Serialize behind the magic line.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = MAGIC.to_vec();
        // Plain data with string keys; serialization cannot fail.
        if let Ok(json) = serde_json::to_vec(self) {
            bytes.extend_from_slice(&json);
        }
        bytes
    }

    /// Parse bytes produced by [`FakeDocument::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let json = bytes.strip_prefix(MAGIC)?;
        serde_json::from_slice(json).ok()
    }
}
