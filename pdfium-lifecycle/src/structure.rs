//! Tagged-PDF structure trees.
//!
//! A tree is opened per page and closed explicitly; its elements are views
//! that go stale with it.

use crate::bindings::PdfiumBindings;
use crate::error::{PdfiumError, Result};
use crate::handle::{HandleKind, PageHandle, StructElementHandle, StructTreeHandle};
use crate::marshal::read_wide_string;
use crate::session::{Pdfium, StructTreeEntry};

impl<B: PdfiumBindings> Pdfium<B> {
    /// Structure tree of a page. Untagged pages fail with `CallFailed`.
    pub fn struct_tree(&mut self, page: PageHandle) -> Result<StructTreeHandle> {
        let raw = self.page_raw(page)?;
        let tree = self
            .bindings
            .struct_tree_for_page(raw)
            .ok_or_else(|| PdfiumError::call("FPDF_StructTree_GetForPage"))?;
        Ok(self.struct_trees.insert(StructTreeEntry { raw: tree, page }))
    }

    pub fn close_struct_tree(&mut self, tree: StructTreeHandle) -> Result<()> {
        let entry = self.struct_trees.remove(tree).ok_or(PdfiumError::InvalidHandle {
            kind: HandleKind::StructTree,
        })?;
        let views = self.struct_elements.forget_where(|owner| *owner == tree);
        self.bindings.close_struct_tree(entry.raw);
        tracing::debug!(?tree, views, "structure tree closed");
        Ok(())
    }

    pub fn struct_tree_child_count(&self, tree: StructTreeHandle) -> Result<usize> {
        let raw = self.struct_trees.lookup(tree)?.raw;
        Ok(self.bindings.struct_tree_child_count(raw).max(0) as usize)
    }

    /// Top-level element `index`, `None` when the slot is empty.
    pub fn struct_tree_child(
        &mut self,
        tree: StructTreeHandle,
        index: usize,
    ) -> Result<Option<StructElementHandle>> {
        let raw = self.struct_trees.lookup(tree)?.raw;
        let index = element_index(index)?;
        Ok(self
            .bindings
            .struct_tree_child(raw, index)
            .map(|element| self.struct_elements.intern(element, tree)))
    }

    /// Structure type such as `P`, `H1` or `Figure`.
    pub fn struct_element_type(&self, element: StructElementHandle) -> Result<String> {
        let raw = self.struct_elements.lookup(element)?.raw;
        read_wide_string(|buf| self.bindings.struct_element_type(raw, buf))
    }

    pub fn struct_element_alt_text(&self, element: StructElementHandle) -> Result<String> {
        let raw = self.struct_elements.lookup(element)?.raw;
        read_wide_string(|buf| self.bindings.struct_element_alt_text(raw, buf))
    }

    pub fn struct_element_child_count(&self, element: StructElementHandle) -> Result<usize> {
        let raw = self.struct_elements.lookup(element)?.raw;
        Ok(self.bindings.struct_element_child_count(raw).max(0) as usize)
    }

    pub fn struct_element_child(
        &mut self,
        element: StructElementHandle,
        index: usize,
    ) -> Result<Option<StructElementHandle>> {
        let view = self.struct_elements.lookup(element)?;
        let (raw, tree) = (view.raw, view.parent);
        let index = element_index(index)?;
        Ok(self
            .bindings
            .struct_element_child(raw, index)
            .map(|child| self.struct_elements.intern(child, tree)))
    }
}

fn element_index(index: usize) -> Result<i32> {
    i32::try_from(index).map_err(|_| PdfiumError::InvalidArgument(format!("child index {}", index)))
}
