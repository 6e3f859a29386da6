//! Typed handles and the handle taxonomy.
//!
//! Every object the library hands out is represented by a [`Handle`] tagged
//! with its kind at the type level. A handle is an index into a per-kind
//! registry plus the generation of the slot it was issued from, so a handle
//! that outlives its close is detected instead of aliasing whatever reused
//! the slot.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Kinds of handle the layer issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Document,
    Page,
    TextPage,
    Search,
    WebLinks,
    Annotation,
    PageObject,
    Font,
    StructTree,
    StructElement,
    Form,
    Bookmark,
    Link,
    Action,
    Signature,
    Attachment,
}

/// Who releases a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closing {
    /// Paired with exactly one explicit close call.
    Explicit,
    /// A view into library state owned by the parent; never closed.
    ParentOwned,
}

impl HandleKind {
    pub const ALL: [HandleKind; 16] = [
        HandleKind::Document,
        HandleKind::Page,
        HandleKind::TextPage,
        HandleKind::Search,
        HandleKind::WebLinks,
        HandleKind::Annotation,
        HandleKind::PageObject,
        HandleKind::Font,
        HandleKind::StructTree,
        HandleKind::StructElement,
        HandleKind::Form,
        HandleKind::Bookmark,
        HandleKind::Link,
        HandleKind::Action,
        HandleKind::Signature,
        HandleKind::Attachment,
    ];

    /// Tag stored in the top byte of a packed handle. Never zero.
    pub fn tag(self) -> u8 {
        match self {
            HandleKind::Document => 1,
            HandleKind::Page => 2,
            HandleKind::TextPage => 3,
            HandleKind::Search => 4,
            HandleKind::WebLinks => 5,
            HandleKind::Annotation => 6,
            HandleKind::PageObject => 7,
            HandleKind::Font => 8,
            HandleKind::StructTree => 9,
            HandleKind::StructElement => 10,
            HandleKind::Form => 11,
            HandleKind::Bookmark => 12,
            HandleKind::Link => 13,
            HandleKind::Action => 14,
            HandleKind::Signature => 15,
            HandleKind::Attachment => 16,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        HandleKind::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// The handle this kind is derived from. Documents are roots.
    ///
    /// Page objects hang off the document because created objects exist
    /// before they are inserted into any page.
    pub fn parent(self) -> Option<HandleKind> {
        match self {
            HandleKind::Document => None,
            HandleKind::Page
            | HandleKind::PageObject
            | HandleKind::Font
            | HandleKind::Form
            | HandleKind::Bookmark
            | HandleKind::Action
            | HandleKind::Signature
            | HandleKind::Attachment => Some(HandleKind::Document),
            HandleKind::TextPage
            | HandleKind::Annotation
            | HandleKind::StructTree
            | HandleKind::Link => Some(HandleKind::Page),
            HandleKind::Search | HandleKind::WebLinks => Some(HandleKind::TextPage),
            HandleKind::StructElement => Some(HandleKind::StructTree),
        }
    }

    pub fn closing(self) -> Closing {
        match self {
            HandleKind::Document
            | HandleKind::Page
            | HandleKind::TextPage
            | HandleKind::Search
            | HandleKind::WebLinks
            | HandleKind::Annotation
            | HandleKind::Font
            | HandleKind::StructTree
            | HandleKind::Form => Closing::Explicit,
            // Page objects are destroyed by the session only while detached.
            HandleKind::PageObject
            | HandleKind::StructElement
            | HandleKind::Bookmark
            | HandleKind::Link
            | HandleKind::Action
            | HandleKind::Signature
            | HandleKind::Attachment => Closing::ParentOwned,
        }
    }

    /// Chain of ancestors, nearest first.
    pub fn ancestry(self) -> Vec<HandleKind> {
        let mut chain = Vec::new();
        let mut current = self.parent();
        while let Some(kind) = current {
            chain.push(kind);
            current = kind.parent();
        }
        chain
    }
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Document => "document",
            HandleKind::Page => "page",
            HandleKind::TextPage => "text page",
            HandleKind::Search => "search",
            HandleKind::WebLinks => "web links",
            HandleKind::Annotation => "annotation",
            HandleKind::PageObject => "page object",
            HandleKind::Font => "font",
            HandleKind::StructTree => "struct tree",
            HandleKind::StructElement => "struct element",
            HandleKind::Form => "form",
            HandleKind::Bookmark => "bookmark",
            HandleKind::Link => "link",
            HandleKind::Action => "action",
            HandleKind::Signature => "signature",
            HandleKind::Attachment => "attachment",
        };
        f.write_str(name)
    }
}

/// Type-level marker for a handle kind.
pub trait HandleType: 'static {
    const KIND: HandleKind;
}

/// Marker types, one per [`HandleKind`].
pub mod kind {
    use super::{HandleKind, HandleType};

    macro_rules! markers {
        ($($name:ident),* $(,)?) => {
            $(
                #[derive(Debug)]
                pub enum $name {}

                impl HandleType for $name {
                    const KIND: HandleKind = HandleKind::$name;
                }
            )*
        };
    }

    markers!(
        Document,
        Page,
        TextPage,
        Search,
        WebLinks,
        Annotation,
        PageObject,
        Font,
        StructTree,
        StructElement,
        Form,
        Bookmark,
        Link,
        Action,
        Signature,
        Attachment,
    );
}

const INDEX_BITS: u32 = 32;
const GENERATION_BITS: u32 = 24;
pub(crate) const GENERATION_MASK: u32 = (1 << GENERATION_BITS) - 1;

/// Generational key into a per-kind registry.
pub struct Handle<K> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleType> Handle<K> {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation: generation & GENERATION_MASK,
            _kind: PhantomData,
        }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }

    pub fn kind(self) -> HandleKind {
        K::KIND
    }

    /// Pack as `tag:8 | generation:24 | index:32`. Never zero.
    pub fn to_raw(self) -> u64 {
        (u64::from(K::KIND.tag()) << (INDEX_BITS + GENERATION_BITS))
            | (u64::from(self.generation) << INDEX_BITS)
            | u64::from(self.index)
    }

    /// Unpack a value produced by [`Handle::to_raw`].
    ///
    /// Returns `None` for zero, for a value tagged with another kind, and for
    /// generation zero, which is never issued.
    pub fn from_raw(raw: u64) -> Option<Self> {
        let tag = (raw >> (INDEX_BITS + GENERATION_BITS)) as u8;
        if tag != K::KIND.tag() {
            return None;
        }
        let generation = ((raw >> INDEX_BITS) as u32) & GENERATION_MASK;
        if generation == 0 {
            return None;
        }
        Some(Self::new(raw as u32, generation))
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<K: HandleType> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}v{}", K::KIND, self.index, self.generation)
    }
}

pub type DocumentHandle = Handle<kind::Document>;
pub type PageHandle = Handle<kind::Page>;
pub type TextPageHandle = Handle<kind::TextPage>;
pub type SearchHandle = Handle<kind::Search>;
pub type WebLinksHandle = Handle<kind::WebLinks>;
pub type AnnotationHandle = Handle<kind::Annotation>;
pub type PageObjectHandle = Handle<kind::PageObject>;
pub type FontHandle = Handle<kind::Font>;
pub type StructTreeHandle = Handle<kind::StructTree>;
pub type StructElementHandle = Handle<kind::StructElement>;
pub type FormHandle = Handle<kind::Form>;
pub type BookmarkHandle = Handle<kind::Bookmark>;
pub type LinkHandle = Handle<kind::Link>;
pub type ActionHandle = Handle<kind::Action>;
pub type SignatureHandle = Handle<kind::Signature>;
pub type AttachmentHandle = Handle<kind::Attachment>;
