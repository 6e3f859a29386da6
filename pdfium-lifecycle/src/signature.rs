//! Read-only access to signature dictionaries.
//!
//! Signatures are reported as stored; nothing here validates them.

use crate::bindings::PdfiumBindings;
use crate::date::parse_pdf_date;
use crate::error::{PdfiumError, Result};
use crate::handle::{DocumentHandle, SignatureHandle};
use crate::marshal::{read_byte_string, read_bytes, read_wide_string};
use crate::session::Pdfium;
use chrono::{DateTime, FixedOffset};

impl<B: PdfiumBindings> Pdfium<B> {
    fn signature_raw(&self, signature: SignatureHandle) -> Result<B::Signature> {
        Ok(self.signatures.lookup(signature)?.raw)
    }

    pub fn signature_count(&self, doc: DocumentHandle) -> Result<usize> {
        let raw = self.doc_raw(doc)?;
        Ok(self.bindings.signature_count(raw).max(0) as usize)
    }

    pub fn signature(&mut self, doc: DocumentHandle, index: usize) -> Result<SignatureHandle> {
        let raw = self.doc_raw(doc)?;
        let count = self.signature_count(doc)?;
        if index >= count {
            return Err(PdfiumError::InvalidArgument(format!(
                "signature {} of {}",
                index, count
            )));
        }
        let signature = self
            .bindings
            .get_signature(raw, index as i32)
            .ok_or_else(|| PdfiumError::call("FPDF_GetSignatureObject"))?;
        Ok(self.signatures.intern(signature, doc))
    }

    /// Raw `Contents` bytes (usually a DER-encoded PKCS#7 blob).
    pub fn signature_contents(&self, signature: SignatureHandle) -> Result<Vec<u8>> {
        let raw = self.signature_raw(signature)?;
        read_bytes(|buf| self.bindings.signature_contents(raw, buf))
    }

    pub fn signature_reason(&self, signature: SignatureHandle) -> Result<String> {
        let raw = self.signature_raw(signature)?;
        read_wide_string(|buf| self.bindings.signature_reason(raw, buf))
    }

    /// Signing time from the `M` entry; `None` if absent or unparseable.
    pub fn signature_time(&self, signature: SignatureHandle) -> Result<Option<DateTime<FixedOffset>>> {
        let raw = self.signature_raw(signature)?;
        let text = read_byte_string(|buf| self.bindings.signature_time(raw, buf))?;
        Ok(parse_pdf_date(&text))
    }
}
