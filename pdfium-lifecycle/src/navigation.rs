//! Bookmarks, links and actions.
//!
//! All three are views owned by the library: they need no close and stay
//! valid while the document (bookmarks, actions) or page (links) they came
//! from is open. Traversing the same node twice yields the same handle.

use crate::bindings::PdfiumBindings;
use crate::error::{PdfiumError, Result};
use crate::geometry::PageRect;
use crate::handle::{
    ActionHandle, AnnotationHandle, BookmarkHandle, DocumentHandle, HandleKind, LinkHandle,
    PageHandle,
};
use crate::marshal::{read_byte_string, read_wide_string, to_wide};
use crate::session::Pdfium;
use std::collections::HashSet;

/// `PDFACTION_*` kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionType {
    Unsupported,
    GoTo,
    RemoteGoTo,
    Uri,
    Launch,
    EmbeddedGoTo,
}

impl ActionType {
    pub fn from_raw(value: u32) -> Self {
        match value {
            1 => ActionType::GoTo,
            2 => ActionType::RemoteGoTo,
            3 => ActionType::Uri,
            4 => ActionType::Launch,
            5 => ActionType::EmbeddedGoTo,
            _ => ActionType::Unsupported,
        }
    }
}

/// One outline entry with its resolved target page.
#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub handle: BookmarkHandle,
    pub title: String,
    pub page_index: Option<usize>,
    pub children: Vec<Bookmark>,
}

fn page_index_from(raw: i32) -> Option<usize> {
    usize::try_from(raw).ok()
}

impl<B: PdfiumBindings> Pdfium<B> {
    fn bookmark_view(&self, bookmark: BookmarkHandle) -> Result<(B::Bookmark, DocumentHandle)> {
        let view = self.bookmarks.lookup(bookmark)?;
        Ok((view.raw, view.parent))
    }

    fn action_view(&self, action: ActionHandle) -> Result<(B::Action, B::Document)> {
        let view = self.actions.lookup(action)?;
        Ok((view.raw, self.doc_raw(view.parent)?))
    }

    fn link_view(&self, link: LinkHandle) -> Result<(B::Link, PageHandle, B::Document)> {
        let view = self.links.lookup(link)?;
        let (_, _, doc_raw) = self.page_doc(view.parent)?;
        Ok((view.raw, view.parent, doc_raw))
    }

    /// First child of `parent`, or the first top-level entry when `parent` is `None`.
    pub fn first_bookmark(
        &mut self,
        doc: DocumentHandle,
        parent: Option<BookmarkHandle>,
    ) -> Result<Option<BookmarkHandle>> {
        let doc_raw = self.doc_raw(doc)?;
        let parent_raw = match parent {
            Some(parent) => {
                let (raw, owner) = self.bookmark_view(parent)?;
                if owner != doc {
                    return Err(PdfiumError::ForeignHandle {
                        kind: HandleKind::Bookmark,
                        parent: HandleKind::Document,
                    });
                }
                Some(raw)
            }
            None => None,
        };
        Ok(self
            .bindings
            .bookmark_first_child(doc_raw, parent_raw)
            .map(|raw| self.bookmarks.intern(raw, doc)))
    }

    pub fn next_bookmark(&mut self, bookmark: BookmarkHandle) -> Result<Option<BookmarkHandle>> {
        let (raw, doc) = self.bookmark_view(bookmark)?;
        let doc_raw = self.doc_raw(doc)?;
        Ok(self
            .bindings
            .bookmark_next_sibling(doc_raw, raw)
            .map(|raw| self.bookmarks.intern(raw, doc)))
    }

    pub fn bookmark_title(&self, bookmark: BookmarkHandle) -> Result<String> {
        let (raw, _) = self.bookmark_view(bookmark)?;
        read_wide_string(|buf| self.bindings.bookmark_title(raw, buf))
    }

    /// First bookmark whose title matches exactly.
    pub fn find_bookmark(
        &mut self,
        doc: DocumentHandle,
        title: &str,
    ) -> Result<Option<BookmarkHandle>> {
        let doc_raw = self.doc_raw(doc)?;
        let title = to_wide(title);
        Ok(self
            .bindings
            .bookmark_find(doc_raw, &title)
            .map(|raw| self.bookmarks.intern(raw, doc)))
    }

    /// Target page of a bookmark, through its destination or else its action.
    pub fn bookmark_page_index(&self, bookmark: BookmarkHandle) -> Result<Option<usize>> {
        let (raw, doc) = self.bookmark_view(bookmark)?;
        let doc_raw = self.doc_raw(doc)?;
        let dest = self.bindings.bookmark_dest(doc_raw, raw).or_else(|| {
            self.bindings
                .bookmark_action(raw)
                .and_then(|action| self.bindings.action_dest(doc_raw, action))
        });
        Ok(dest.and_then(|dest| page_index_from(self.bindings.dest_page_index(doc_raw, dest))))
    }

    pub fn bookmark_action(&mut self, bookmark: BookmarkHandle) -> Result<Option<ActionHandle>> {
        let (raw, doc) = self.bookmark_view(bookmark)?;
        Ok(self
            .bindings
            .bookmark_action(raw)
            .map(|action| self.actions.intern(action, doc)))
    }

    /// Walk the whole outline. Nodes already visited are skipped, so a
    /// malformed outline that loops back on itself still terminates.
    pub fn bookmark_tree(&mut self, doc: DocumentHandle) -> Result<Vec<Bookmark>> {
        let mut visited = HashSet::new();
        self.collect_bookmarks(doc, None, &mut visited)
    }

    fn collect_bookmarks(
        &mut self,
        doc: DocumentHandle,
        parent: Option<BookmarkHandle>,
        visited: &mut HashSet<BookmarkHandle>,
    ) -> Result<Vec<Bookmark>> {
        let mut nodes = Vec::new();
        let mut cursor = self.first_bookmark(doc, parent)?;
        while let Some(handle) = cursor {
            if !visited.insert(handle) {
                tracing::warn!(?doc, ?handle, "bookmark outline loops, stopping");
                break;
            }
            let title = self.bookmark_title(handle)?;
            let page_index = self.bookmark_page_index(handle)?;
            let children = self.collect_bookmarks(doc, Some(handle), visited)?;
            nodes.push(Bookmark {
                handle,
                title,
                page_index,
                children,
            });
            cursor = self.next_bookmark(handle)?;
        }
        Ok(nodes)
    }

    /// Link annotation under a page-space point.
    pub fn link_at_point(&mut self, page: PageHandle, x: f64, y: f64) -> Result<Option<LinkHandle>> {
        let raw = self.page_raw(page)?;
        Ok(self
            .bindings
            .link_at_point(raw, x, y)
            .map(|link| self.links.intern(link, page)))
    }

    /// Link carried by a link annotation.
    pub fn annotation_link(&mut self, annot: AnnotationHandle) -> Result<Option<LinkHandle>> {
        let entry = self.annotations.lookup(annot)?;
        let (raw, page) = (entry.raw, entry.page);
        Ok(self
            .bindings
            .annotation_link(raw)
            .map(|link| self.links.intern(link, page)))
    }

    /// Page the link points to, through its destination or else its action.
    pub fn link_page_index(&self, link: LinkHandle) -> Result<Option<usize>> {
        let (raw, _, doc_raw) = self.link_view(link)?;
        let dest = self.bindings.link_dest(doc_raw, raw).or_else(|| {
            self.bindings
                .link_action(raw)
                .and_then(|action| self.bindings.action_dest(doc_raw, action))
        });
        Ok(dest.and_then(|dest| page_index_from(self.bindings.dest_page_index(doc_raw, dest))))
    }

    /// URI of the link's action; `None` when the link has no action or URI.
    pub fn link_uri(&self, link: LinkHandle) -> Result<Option<String>> {
        let (raw, _, doc_raw) = self.link_view(link)?;
        let Some(action) = self.bindings.link_action(raw) else {
            return Ok(None);
        };
        let uri = read_byte_string(|buf| self.bindings.action_uri_path(doc_raw, action, buf))?;
        Ok(Some(uri).filter(|uri| !uri.is_empty()))
    }

    pub fn link_rect(&self, link: LinkHandle) -> Result<PageRect> {
        let (raw, _, _) = self.link_view(link)?;
        self.bindings
            .link_rect(raw)
            .ok_or_else(|| PdfiumError::call("FPDFLink_GetAnnotRect"))
    }

    pub fn link_action(&mut self, link: LinkHandle) -> Result<Option<ActionHandle>> {
        let (raw, page, _) = self.link_view(link)?;
        let doc = self.page_document(page)?;
        Ok(self
            .bindings
            .link_action(raw)
            .map(|action| self.actions.intern(action, doc)))
    }

    pub fn action_type(&self, action: ActionHandle) -> Result<ActionType> {
        let (raw, _) = self.action_view(action)?;
        Ok(ActionType::from_raw(self.bindings.action_type(raw)))
    }

    pub fn action_page_index(&self, action: ActionHandle) -> Result<Option<usize>> {
        let (raw, doc_raw) = self.action_view(action)?;
        Ok(self
            .bindings
            .action_dest(doc_raw, raw)
            .and_then(|dest| page_index_from(self.bindings.dest_page_index(doc_raw, dest))))
    }

    /// File path of a launch or remote go-to action; empty for other kinds.
    pub fn action_file_path(&self, action: ActionHandle) -> Result<String> {
        let (raw, _) = self.action_view(action)?;
        read_byte_string(|buf| self.bindings.action_file_path(raw, buf))
    }

    pub fn action_uri(&self, action: ActionHandle) -> Result<String> {
        let (raw, doc_raw) = self.action_view(action)?;
        read_byte_string(|buf| self.bindings.action_uri_path(doc_raw, raw, buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_type_raw() {
        assert_eq!(ActionType::from_raw(1), ActionType::GoTo);
        assert_eq!(ActionType::from_raw(3), ActionType::Uri);
        assert_eq!(ActionType::from_raw(0), ActionType::Unsupported);
        assert_eq!(ActionType::from_raw(99), ActionType::Unsupported);
    }

    #[test]
    fn test_page_index_sentinel() {
        assert_eq!(page_index_from(-1), None);
        assert_eq!(page_index_from(4), Some(4));
    }
}
