//! Embedded file attachments.

use crate::bindings::PdfiumBindings;
use crate::error::{PdfiumError, Result};
use crate::handle::{AttachmentHandle, DocumentHandle};
use crate::marshal::{read_wide_string, to_wide};
use crate::session::Pdfium;

impl<B: PdfiumBindings> Pdfium<B> {
    fn attachment_view(&self, attachment: AttachmentHandle) -> Result<(B::Attachment, DocumentHandle)> {
        let view = self.attachments.lookup(attachment)?;
        Ok((view.raw, view.parent))
    }

    pub fn attachment_count(&self, doc: DocumentHandle) -> Result<usize> {
        let raw = self.doc_raw(doc)?;
        Ok(self.bindings.attachment_count(raw).max(0) as usize)
    }

    pub fn attachment(&mut self, doc: DocumentHandle, index: usize) -> Result<AttachmentHandle> {
        let raw = self.doc_raw(doc)?;
        let count = self.attachment_count(doc)?;
        if index >= count {
            return Err(PdfiumError::InvalidArgument(format!(
                "attachment {} of {}",
                index, count
            )));
        }
        let attachment = self
            .bindings
            .get_attachment(raw, index as i32)
            .ok_or_else(|| PdfiumError::call("FPDFDoc_GetAttachment"))?;
        Ok(self.attachments.intern(attachment, doc))
    }

    pub fn attachment_name(&self, attachment: AttachmentHandle) -> Result<String> {
        let (raw, _) = self.attachment_view(attachment)?;
        read_wide_string(|buf| self.bindings.attachment_name(raw, buf))
    }

    /// Embedded file bytes, `None` when the entry has no file stream.
    pub fn attachment_contents(&self, attachment: AttachmentHandle) -> Result<Option<Vec<u8>>> {
        let (raw, _) = self.attachment_view(attachment)?;
        let Some(len) = self.bindings.attachment_file(raw, &mut []) else {
            return Ok(None);
        };
        let mut buf = vec![0u8; len];
        if len > 0 {
            let written = self
                .bindings
                .attachment_file(raw, &mut buf)
                .ok_or_else(|| PdfiumError::call("FPDFAttachment_GetFile"))?;
            buf.truncate(written.min(len));
        }
        Ok(Some(buf))
    }

    /// Add an attachment named `name` holding `contents`.
    ///
    /// If the contents cannot be stored, the half-created entry is deleted
    /// again.
    pub fn add_attachment(
        &mut self,
        doc: DocumentHandle,
        name: &str,
        contents: &[u8],
    ) -> Result<AttachmentHandle> {
        if name.is_empty() {
            return Err(PdfiumError::InvalidArgument("empty attachment name".into()));
        }
        let doc_raw = self.doc_raw(doc)?;
        let index = self.attachment_count(doc)?;
        let wide = to_wide(name);
        let raw = self
            .bindings
            .add_attachment(doc_raw, &wide)
            .ok_or_else(|| PdfiumError::call("FPDFDoc_AddAttachment"))?;
        if !self.bindings.set_attachment_file(doc_raw, raw, contents) {
            if !self.bindings.delete_attachment(doc_raw, index as i32) {
                tracing::warn!(?doc, name, "could not remove attachment after failed write");
            }
            return Err(PdfiumError::call("FPDFAttachment_SetFile"));
        }
        Ok(self.attachments.intern(raw, doc))
    }

    /// Delete attachment `index`. Every attachment handle of the document is
    /// invalidated, since later entries shift down.
    pub fn delete_attachment(&mut self, doc: DocumentHandle, index: usize) -> Result<()> {
        let raw = self.doc_raw(doc)?;
        let count = self.attachment_count(doc)?;
        if index >= count {
            return Err(PdfiumError::InvalidArgument(format!(
                "attachment {} of {}",
                index, count
            )));
        }
        if !self.bindings.delete_attachment(raw, index as i32) {
            return Err(PdfiumError::call("FPDFDoc_DeleteAttachment"));
        }
        let forgotten = self.attachments.forget_where(|owner| *owner == doc);
        tracing::debug!(?doc, index, forgotten, "attachment deleted");
        Ok(())
    }
}
