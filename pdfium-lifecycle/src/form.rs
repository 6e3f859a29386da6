//! Form-fill environment lifecycle, field queries and input forwarding.
//!
//! A document has at most one environment. The callback record handed to
//! the library is allocated by the bindings and freed from the library's own
//! teardown callback, never by this layer directly; the session only counts
//! records that have not been released yet.
//!
//! Every page loaded while an environment exists is announced with
//! `FORM_OnAfterLoadPage`, and gets exactly one `FORM_OnBeforeClosePage`
//! when it closes or the environment goes away, whichever comes first.

use crate::annotation::check;
use crate::bindings::PdfiumBindings;
use crate::error::{PdfiumError, Result};
use crate::geometry::Rgba;
use crate::handle::{AnnotationHandle, DocumentHandle, FormHandle, HandleKind, PageHandle};
use crate::marshal::read_wide_string;
use crate::render::RenderFlags;
use crate::session::{FormEntry, Pdfium};
use crate::surface::PixelSurface;
use crate::transform::{Rotation, Viewport};
use std::cell::Cell;
use std::ffi::CStr;
use std::rc::Rc;
use std::sync::atomic::Ordering;
use std::sync::Arc;

const KEY_VALUE: &CStr = c"V";
const KEY_MAX_LEN: &CStr = c"MaxLen";

/// `FPDF_FORMFIELD_*` types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Unknown,
    PushButton,
    CheckBox,
    RadioButton,
    ComboBox,
    ListBox,
    TextField,
    Signature,
    Other(i32),
}

impl FieldType {
    pub fn from_raw(value: i32) -> Self {
        match value {
            1 => FieldType::PushButton,
            2 => FieldType::CheckBox,
            3 => FieldType::RadioButton,
            4 => FieldType::ComboBox,
            5 => FieldType::ListBox,
            6 => FieldType::TextField,
            7 => FieldType::Signature,
            0 | -1 => FieldType::Unknown,
            other => FieldType::Other(other),
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            FieldType::Unknown => 0,
            FieldType::PushButton => 1,
            FieldType::CheckBox => 2,
            FieldType::RadioButton => 3,
            FieldType::ComboBox => 4,
            FieldType::ListBox => 5,
            FieldType::TextField => 6,
            FieldType::Signature => 7,
            FieldType::Other(other) => other,
        }
    }

    pub fn has_options(self) -> bool {
        matches!(self, FieldType::ComboBox | FieldType::ListBox)
    }
}

/// Field flag word (`Ff`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldFlags(pub i32);

impl FieldFlags {
    pub const READ_ONLY: i32 = 0x01;
    pub const REQUIRED: i32 = 0x02;

    pub fn is_read_only(self) -> bool {
        self.0 & Self::READ_ONLY != 0
    }

    pub fn is_required(self) -> bool {
        self.0 & Self::REQUIRED != 0
    }
}

/// Keyboard modifier bits passed with input events (`FWL_EVENTFLAG_*`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(pub i32);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(0x1);
    pub const CONTROL: Modifiers = Modifiers(0x2);
    pub const ALT: Modifiers = Modifiers(0x4);
}

impl<B: PdfiumBindings> Pdfium<B> {
    /// Create the form environment for `doc`.
    ///
    /// Pages of the document that are already loaded are announced to it
    /// immediately.
    pub fn init_form(&mut self, doc: DocumentHandle) -> Result<FormHandle> {
        let doc_entry = self.documents.lookup(doc)?;
        if let Some(existing) = doc_entry.form {
            return Err(PdfiumError::InvalidArgument(format!(
                "{:?} already has form environment {:?}",
                doc, existing
            )));
        }
        let doc_raw = doc_entry.raw;

        let released = Rc::new(Cell::new(false));
        let records = Arc::clone(&self.form_records);
        records.fetch_add(1, Ordering::SeqCst);
        let on_release = {
            let released = Rc::clone(&released);
            Box::new(move || {
                released.set(true);
                records.fetch_sub(1, Ordering::SeqCst);
            })
        };
        let raw = self
            .bindings
            .init_form_fill(doc_raw, self.config.form_fill_version, on_release)
            .ok_or_else(|| PdfiumError::call("FPDFDOC_InitFormFillEnvironment"))?;

        let form = self.forms.insert(FormEntry {
            raw,
            document: doc,
            released,
        });
        if let Some(entry) = self.documents.get_mut(doc) {
            entry.form = Some(form);
        }
        for page in self
            .pages
            .handles_where(|entry| entry.document == doc && entry.form.is_none())
        {
            self.attach_page(form, page)?;
        }
        tracing::debug!(?doc, ?form, "form environment created");
        Ok(form)
    }

    /// Tear down the environment. Pages still attached get their close
    /// notification first; the callback record is freed by the library.
    pub fn close_form(&mut self, form: FormHandle) -> Result<()> {
        let document = self.forms.lookup(form)?.document;
        for page in self.pages.handles_where(|entry| entry.form == Some(form)) {
            self.detach_page(form, page)?;
        }
        let entry = self.forms.remove(form).ok_or(PdfiumError::InvalidHandle {
            kind: HandleKind::Form,
        })?;
        self.bindings.exit_form_fill(entry.raw);
        if !entry.released.get() {
            tracing::warn!(?form, "library did not release the form callback record");
        }
        if let Some(doc) = self.documents.get_mut(document) {
            doc.form = None;
        }
        tracing::debug!(?document, ?form, "form environment closed");
        Ok(())
    }

    /// The environment for `doc`, if one is open.
    pub fn document_form(&self, doc: DocumentHandle) -> Result<Option<FormHandle>> {
        Ok(self.documents.lookup(doc)?.form)
    }

    /// Send `FORM_OnAfterLoadPage` for a page that is not attached.
    pub fn attach_form_page(&mut self, form: FormHandle, page: PageHandle) -> Result<()> {
        self.form_page(form, page)?;
        if let Some(current) = self.pages.lookup(page)?.form {
            return Err(PdfiumError::InvalidArgument(format!(
                "{:?} is already attached to {:?}",
                page, current
            )));
        }
        self.attach_page(form, page)
    }

    /// Send `FORM_OnBeforeClosePage` for an attached page.
    pub fn detach_form_page(&mut self, form: FormHandle, page: PageHandle) -> Result<()> {
        self.form_page(form, page)?;
        if self.pages.lookup(page)?.form != Some(form) {
            return Err(PdfiumError::InvalidArgument(format!(
                "{:?} is not attached to {:?}",
                page, form
            )));
        }
        self.detach_page(form, page)
    }

    pub fn is_form_page_attached(&self, page: PageHandle) -> Result<bool> {
        Ok(self.pages.lookup(page)?.form.is_some())
    }

    fn attach_page(&mut self, form: FormHandle, page: PageHandle) -> Result<()> {
        let form_raw = self.form_raw(form)?;
        let entry = self.pages.lookup_mut(page)?;
        self.bindings.form_on_after_load_page(entry.raw, form_raw);
        entry.form = Some(form);
        Ok(())
    }

    fn detach_page(&mut self, form: FormHandle, page: PageHandle) -> Result<()> {
        let form_raw = self.form_raw(form)?;
        let entry = self.pages.lookup_mut(page)?;
        self.bindings.form_on_before_close_page(entry.raw, form_raw);
        entry.form = None;
        Ok(())
    }

    /// Raw form and page, checking the page belongs to the form's document.
    fn form_page(&self, form: FormHandle, page: PageHandle) -> Result<(B::Form, B::Page)> {
        let entry = self.forms.lookup(form)?;
        let page_entry = self.pages.lookup(page)?;
        if page_entry.document != entry.document {
            return Err(PdfiumError::ForeignHandle {
                kind: HandleKind::Page,
                parent: HandleKind::Form,
            });
        }
        Ok((entry.raw, page_entry.raw))
    }

    fn form_annot(
        &self,
        form: FormHandle,
        annot: AnnotationHandle,
    ) -> Result<(B::Form, B::Annotation)> {
        let annot_entry = self.annotations.lookup(annot)?;
        let (form_raw, _) = self.form_page(form, annot_entry.page).map_err(|err| match err {
            PdfiumError::ForeignHandle { .. } => PdfiumError::ForeignHandle {
                kind: HandleKind::Annotation,
                parent: HandleKind::Form,
            },
            other => other,
        })?;
        Ok((form_raw, annot_entry.raw))
    }

    /// Draw the form field layer over an already rendered page.
    ///
    /// Unlike [`Pdfium::render_into`] the surface is not cleared first.
    pub fn draw_form(
        &mut self,
        form: FormHandle,
        page: PageHandle,
        surface: &mut PixelSurface,
        viewport: Viewport,
        rotation: Rotation,
        flags: RenderFlags,
    ) -> Result<()> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        surface.ensure_renderable()?;
        let bitmap = self.wrap_surface(surface)?;
        self.bindings.form_draw(
            form_raw,
            bitmap,
            page_raw,
            viewport,
            rotation.quarter_turns(),
            flags.to_raw(surface.format()),
        );
        self.bindings.destroy_bitmap(bitmap);
        Ok(())
    }

    /// Widget annotations count as fields; this counts all annotations on
    /// the page, as the library offers no cheaper filter.
    pub fn form_field_count(&self, form: FormHandle, page: PageHandle) -> Result<usize> {
        let (_, page_raw) = self.form_page(form, page)?;
        Ok(self.bindings.annotation_count(page_raw).max(0) as usize)
    }

    pub fn form_field_type(&self, form: FormHandle, annot: AnnotationHandle) -> Result<FieldType> {
        let (form_raw, raw) = self.form_annot(form, annot)?;
        Ok(FieldType::from_raw(self.bindings.form_field_type(form_raw, raw)))
    }

    pub fn is_signature_field(&self, form: FormHandle, annot: AnnotationHandle) -> Result<bool> {
        Ok(self.form_field_type(form, annot)? == FieldType::Signature)
    }

    pub fn form_field_name(&self, form: FormHandle, annot: AnnotationHandle) -> Result<String> {
        let (form_raw, raw) = self.form_annot(form, annot)?;
        read_wide_string(|buf| self.bindings.form_field_name(form_raw, raw, buf))
    }

    pub fn form_field_value(&self, form: FormHandle, annot: AnnotationHandle) -> Result<String> {
        let (form_raw, raw) = self.form_annot(form, annot)?;
        read_wide_string(|buf| self.bindings.form_field_value(form_raw, raw, buf))
    }

    /// Write the field's `V` entry.
    pub fn set_form_field_value(
        &mut self,
        form: FormHandle,
        annot: AnnotationHandle,
        value: &str,
    ) -> Result<()> {
        self.form_annot(form, annot)?;
        self.set_annotation_string_by(annot, KEY_VALUE, value)
    }

    /// The library exposes no default value (`DV`) lookup.
    pub fn form_field_default_value(
        &self,
        form: FormHandle,
        annot: AnnotationHandle,
    ) -> Result<String> {
        self.form_annot(form, annot)?;
        Err(PdfiumError::Unsupported("form field default value"))
    }

    pub fn form_field_flags(&self, form: FormHandle, annot: AnnotationHandle) -> Result<FieldFlags> {
        let (form_raw, raw) = self.form_annot(form, annot)?;
        Ok(FieldFlags(self.bindings.form_field_flags(form_raw, raw)))
    }

    pub fn is_form_field_read_only(&self, form: FormHandle, annot: AnnotationHandle) -> Result<bool> {
        Ok(self.form_field_flags(form, annot)?.is_read_only())
    }

    pub fn is_form_field_required(&self, form: FormHandle, annot: AnnotationHandle) -> Result<bool> {
        Ok(self.form_field_flags(form, annot)?.is_required())
    }

    /// `MaxLen` of a text field, `None` when unlimited.
    pub fn form_field_max_length(
        &self,
        form: FormHandle,
        annot: AnnotationHandle,
    ) -> Result<Option<usize>> {
        let (_, raw) = self.form_annot(form, annot)?;
        Ok(self
            .bindings
            .annotation_number(raw, KEY_MAX_LEN)
            .filter(|len| *len >= 0.0)
            .map(|len| len as usize))
    }

    pub fn form_option_count(&self, form: FormHandle, annot: AnnotationHandle) -> Result<usize> {
        let (form_raw, raw) = self.form_annot(form, annot)?;
        Ok(self.bindings.form_option_count(form_raw, raw).max(0) as usize)
    }

    pub fn form_option_label(
        &self,
        form: FormHandle,
        annot: AnnotationHandle,
        index: usize,
    ) -> Result<String> {
        let (form_raw, raw) = self.form_annot(form, annot)?;
        let index = option_index(index)?;
        read_wide_string(|buf| self.bindings.form_option_label(form_raw, raw, index, buf))
    }

    pub fn is_form_option_selected(
        &self,
        form: FormHandle,
        annot: AnnotationHandle,
        index: usize,
    ) -> Result<bool> {
        let (form_raw, raw) = self.form_annot(form, annot)?;
        Ok(self
            .bindings
            .form_is_option_selected(form_raw, raw, option_index(index)?))
    }

    /// Select or deselect an option of the focused choice field on `page`.
    pub fn select_form_option(
        &mut self,
        form: FormHandle,
        page: PageHandle,
        index: usize,
        selected: bool,
    ) -> Result<()> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        check(
            self.bindings
                .form_set_index_selected(form_raw, page_raw, option_index(index)?, selected),
            "FORM_SetIndexSelected",
        )
    }

    /// Verifying signatures needs a crypto stack the library does not carry.
    pub fn signature_field_status(
        &self,
        form: FormHandle,
        annot: AnnotationHandle,
    ) -> Result<()> {
        self.form_annot(form, annot)?;
        Err(PdfiumError::Unsupported("signature validation"))
    }

    pub fn form_mouse_move(
        &mut self,
        form: FormHandle,
        page: PageHandle,
        modifiers: Modifiers,
        x: f64,
        y: f64,
    ) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self
            .bindings
            .form_on_mouse_move(form_raw, page_raw, modifiers.0, x, y))
    }

    pub fn form_left_button_down(
        &mut self,
        form: FormHandle,
        page: PageHandle,
        modifiers: Modifiers,
        x: f64,
        y: f64,
    ) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self
            .bindings
            .form_on_lbutton_down(form_raw, page_raw, modifiers.0, x, y))
    }

    pub fn form_left_button_up(
        &mut self,
        form: FormHandle,
        page: PageHandle,
        modifiers: Modifiers,
        x: f64,
        y: f64,
    ) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self
            .bindings
            .form_on_lbutton_up(form_raw, page_raw, modifiers.0, x, y))
    }

    /// Move focus to the field under the point, or clear it if none.
    pub fn form_focus(
        &mut self,
        form: FormHandle,
        page: PageHandle,
        modifiers: Modifiers,
        x: f64,
        y: f64,
    ) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self
            .bindings
            .form_on_focus(form_raw, page_raw, modifiers.0, x, y))
    }

    pub fn form_key_down(
        &mut self,
        form: FormHandle,
        page: PageHandle,
        key_code: i32,
        modifiers: Modifiers,
    ) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self
            .bindings
            .form_on_key_down(form_raw, page_raw, key_code, modifiers.0))
    }

    pub fn form_key_up(
        &mut self,
        form: FormHandle,
        page: PageHandle,
        key_code: i32,
        modifiers: Modifiers,
    ) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self
            .bindings
            .form_on_key_up(form_raw, page_raw, key_code, modifiers.0))
    }

    /// Type one character into the focused field.
    pub fn form_char(
        &mut self,
        form: FormHandle,
        page: PageHandle,
        ch: char,
        modifiers: Modifiers,
    ) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self
            .bindings
            .form_on_char(form_raw, page_raw, ch as i32, modifiers.0))
    }

    pub fn form_can_undo(&self, form: FormHandle, page: PageHandle) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self.bindings.form_can_undo(form_raw, page_raw))
    }

    pub fn form_can_redo(&self, form: FormHandle, page: PageHandle) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self.bindings.form_can_redo(form_raw, page_raw))
    }

    pub fn form_undo(&mut self, form: FormHandle, page: PageHandle) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self.bindings.form_undo(form_raw, page_raw))
    }

    pub fn form_redo(&mut self, form: FormHandle, page: PageHandle) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self.bindings.form_redo(form_raw, page_raw))
    }

    pub fn form_select_all_text(&mut self, form: FormHandle, page: PageHandle) -> Result<bool> {
        let (form_raw, page_raw) = self.form_page(form, page)?;
        Ok(self.bindings.form_select_all_text(form_raw, page_raw))
    }

    /// Highlight colour for one field type, or all of them with `None`.
    pub fn set_form_highlight_color(
        &mut self,
        form: FormHandle,
        field_type: Option<FieldType>,
        color: Rgba,
    ) -> Result<()> {
        let raw = self.form_raw(form)?;
        let field_type = field_type.map_or(0, FieldType::to_raw);
        self.bindings
            .form_set_highlight_color(raw, field_type, color.to_argb());
        Ok(())
    }

    pub fn set_form_highlight_alpha(&mut self, form: FormHandle, alpha: u8) -> Result<()> {
        let raw = self.form_raw(form)?;
        self.bindings.form_set_highlight_alpha(raw, alpha);
        Ok(())
    }

    pub fn remove_form_highlight(&mut self, form: FormHandle) -> Result<()> {
        let raw = self.form_raw(form)?;
        self.bindings.form_remove_highlight(raw);
        Ok(())
    }
}

fn option_index(index: usize) -> Result<i32> {
    i32::try_from(index).map_err(|_| PdfiumError::InvalidArgument(format!("option index {}", index)))
}
