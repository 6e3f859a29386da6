//! Page annotations.

use crate::bindings::{raw, PdfiumBindings};
use crate::date::{format_pdf_date, parse_pdf_date};
use crate::error::{PdfiumError, Result};
use crate::geometry::{PageRect, PointF, QuadPoints, Rgba};
use crate::handle::{AnnotationHandle, HandleKind, PageHandle};
use crate::marshal::{read_wide_string, to_wide};
use crate::session::{AnnotationEntry, Pdfium};
use chrono::{DateTime, FixedOffset};
use std::ffi::CStr;

const KEY_CONTENTS: &CStr = c"Contents";
const KEY_AUTHOR: &CStr = c"T";
const KEY_SUBJECT: &CStr = c"Subj";
const KEY_MODIFIED: &CStr = c"M";
const KEY_CREATED: &CStr = c"CreationDate";
const KEY_OPACITY: &CStr = c"CA";

/// `FPDF_ANNOT_*` subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationSubtype {
    Unknown,
    Text,
    Link,
    FreeText,
    Line,
    Square,
    Circle,
    Polygon,
    Polyline,
    Highlight,
    Underline,
    Squiggly,
    Strikeout,
    Stamp,
    Caret,
    Ink,
    Popup,
    FileAttachment,
    Widget,
    Redact,
    Other(i32),
}

impl AnnotationSubtype {
    pub fn from_raw(value: i32) -> Self {
        match value {
            0 => Self::Unknown,
            1 => Self::Text,
            2 => Self::Link,
            3 => Self::FreeText,
            4 => Self::Line,
            5 => Self::Square,
            6 => Self::Circle,
            7 => Self::Polygon,
            8 => Self::Polyline,
            9 => Self::Highlight,
            10 => Self::Underline,
            11 => Self::Squiggly,
            12 => Self::Strikeout,
            13 => Self::Stamp,
            14 => Self::Caret,
            15 => Self::Ink,
            16 => Self::Popup,
            17 => Self::FileAttachment,
            20 => Self::Widget,
            28 => Self::Redact,
            other => Self::Other(other),
        }
    }

    pub fn to_raw(self) -> i32 {
        match self {
            Self::Unknown => 0,
            Self::Text => 1,
            Self::Link => 2,
            Self::FreeText => 3,
            Self::Line => 4,
            Self::Square => 5,
            Self::Circle => 6,
            Self::Polygon => 7,
            Self::Polyline => 8,
            Self::Highlight => 9,
            Self::Underline => 10,
            Self::Squiggly => 11,
            Self::Strikeout => 12,
            Self::Stamp => 13,
            Self::Caret => 14,
            Self::Ink => 15,
            Self::Popup => 16,
            Self::FileAttachment => 17,
            Self::Widget => 20,
            Self::Redact => 28,
            Self::Other(other) => other,
        }
    }

    /// Markup subtypes that carry quad points.
    pub fn has_quad_points(self) -> bool {
        matches!(
            self,
            Self::Link | Self::Highlight | Self::Underline | Self::Squiggly | Self::Strikeout
        )
    }
}

/// Which colour entry to read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorType {
    /// Stroke colour (`C`).
    #[default]
    Color,
    /// Fill colour (`IC`).
    Interior,
}

impl ColorType {
    fn to_raw(self) -> i32 {
        match self {
            ColorType::Color => raw::FPDFANNOT_COLORTYPE_COLOR,
            ColorType::Interior => raw::FPDFANNOT_COLORTYPE_INTERIOR,
        }
    }
}

/// Appearance stream slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AppearanceMode {
    #[default]
    Normal,
    Rollover,
    Down,
}

impl AppearanceMode {
    fn to_raw(self) -> i32 {
        match self {
            AppearanceMode::Normal => 0,
            AppearanceMode::Rollover => 1,
            AppearanceMode::Down => 2,
        }
    }
}

impl<B: PdfiumBindings> Pdfium<B> {
    pub fn annotation_count(&self, page: PageHandle) -> Result<usize> {
        let raw = self.page_raw(page)?;
        Ok(self.bindings.annotation_count(raw).max(0) as usize)
    }

    /// Open the annotation at `index`. Every open needs a matching
    /// [`Pdfium::close_annotation`] or is closed with its page.
    pub fn open_annotation(&mut self, page: PageHandle, index: usize) -> Result<AnnotationHandle> {
        let page_raw = self.page_raw(page)?;
        let count = self.bindings.annotation_count(page_raw).max(0) as usize;
        if index >= count {
            return Err(PdfiumError::InvalidArgument(format!(
                "annotation index {} out of {}",
                index, count
            )));
        }
        let raw = self
            .bindings
            .get_annotation(page_raw, index as i32)
            .ok_or_else(|| PdfiumError::call("FPDFPage_GetAnnot"))?;
        Ok(self.annotations.insert(AnnotationEntry { raw, page }))
    }

    /// Add a new annotation to the page and open it.
    pub fn create_annotation(
        &mut self,
        page: PageHandle,
        subtype: AnnotationSubtype,
    ) -> Result<AnnotationHandle> {
        let page_raw = self.page_raw(page)?;
        let raw = self
            .bindings
            .create_annotation(page_raw, subtype.to_raw())
            .ok_or_else(|| PdfiumError::call("FPDFPage_CreateAnnot"))?;
        let annot = self.annotations.insert(AnnotationEntry { raw, page });
        tracing::debug!(?page, ?annot, ?subtype, "annotation created");
        Ok(annot)
    }

    pub fn close_annotation(&mut self, annot: AnnotationHandle) -> Result<()> {
        let entry = self
            .annotations
            .remove(annot)
            .ok_or(PdfiumError::InvalidHandle {
                kind: HandleKind::Annotation,
            })?;
        self.bindings.close_annotation(entry.raw);
        Ok(())
    }

    /// Delete the annotation at `index` from the page. Open handles to that
    /// annotation are closed first.
    pub fn remove_annotation(&mut self, page: PageHandle, index: usize) -> Result<()> {
        let page_raw = self.page_raw(page)?;
        let target = i32::try_from(index)
            .map_err(|_| PdfiumError::InvalidArgument(format!("annotation index {}", index)))?;
        let stale: Vec<AnnotationHandle> = self
            .annotations
            .iter()
            .filter(|(_, entry)| {
                entry.page == page && self.bindings.annotation_index(page_raw, entry.raw) == target
            })
            .map(|(handle, _)| handle)
            .collect();
        for annot in stale {
            tracing::warn!(?page, ?annot, "closing annotation handle before removal");
            self.close_annotation(annot)?;
        }
        if self.bindings.remove_annotation(page_raw, target) {
            Ok(())
        } else {
            Err(PdfiumError::call("FPDFPage_RemoveAnnot"))
        }
    }

    pub fn annotation_page(&self, annot: AnnotationHandle) -> Result<PageHandle> {
        Ok(self.annotations.lookup(annot)?.page)
    }

    /// Current position of the annotation in its page's list.
    pub fn annotation_index(&self, annot: AnnotationHandle) -> Result<Option<usize>> {
        let entry = self.annotations.lookup(annot)?;
        let page_raw = self.page_raw(entry.page)?;
        Ok(usize::try_from(self.bindings.annotation_index(page_raw, entry.raw)).ok())
    }

    pub fn annotation_subtype(&self, annot: AnnotationHandle) -> Result<AnnotationSubtype> {
        let raw = self.annot_raw(annot)?;
        Ok(AnnotationSubtype::from_raw(self.bindings.annotation_subtype(raw)))
    }

    pub fn annotation_rect(&self, annot: AnnotationHandle) -> Result<PageRect> {
        let raw = self.annot_raw(annot)?;
        self.bindings
            .annotation_rect(raw)
            .ok_or_else(|| PdfiumError::call("FPDFAnnot_GetRect"))
    }

    pub fn set_annotation_rect(&mut self, annot: AnnotationHandle, rect: PageRect) -> Result<()> {
        let raw = self.annot_raw(annot)?;
        check(self.bindings.set_annotation_rect(raw, rect), "FPDFAnnot_SetRect")
    }

    /// Colour entry, `None` when the annotation does not set it.
    pub fn annotation_color(
        &self,
        annot: AnnotationHandle,
        which: ColorType,
    ) -> Result<Option<Rgba>> {
        let raw = self.annot_raw(annot)?;
        Ok(self.bindings.annotation_color(raw, which.to_raw()))
    }

    pub fn set_annotation_color(
        &mut self,
        annot: AnnotationHandle,
        which: ColorType,
        color: Rgba,
    ) -> Result<()> {
        let raw = self.annot_raw(annot)?;
        check(
            self.bindings.set_annotation_color(raw, which.to_raw(), color),
            "FPDFAnnot_SetColor",
        )
    }

    /// Raw `F` flag word.
    pub fn annotation_flags(&self, annot: AnnotationHandle) -> Result<i32> {
        let raw = self.annot_raw(annot)?;
        Ok(self.bindings.annotation_flags(raw))
    }

    pub fn set_annotation_flags(&mut self, annot: AnnotationHandle, flags: i32) -> Result<()> {
        let raw = self.annot_raw(annot)?;
        check(self.bindings.set_annotation_flags(raw, flags), "FPDFAnnot_SetFlags")
    }

    /// String entry by dictionary key; empty when absent.
    pub fn annotation_string(&self, annot: AnnotationHandle, key: &str) -> Result<String> {
        let key = crate::marshal::to_c_string(key)?;
        self.annotation_string_by(annot, &key)
    }

    pub fn set_annotation_string(
        &mut self,
        annot: AnnotationHandle,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let key = crate::marshal::to_c_string(key)?;
        self.set_annotation_string_by(annot, &key, value)
    }

    pub(crate) fn annotation_string_by(&self, annot: AnnotationHandle, key: &CStr) -> Result<String> {
        let raw = self.annot_raw(annot)?;
        read_wide_string(|buf| self.bindings.annotation_string(raw, key, buf))
    }

    pub(crate) fn set_annotation_string_by(
        &mut self,
        annot: AnnotationHandle,
        key: &CStr,
        value: &str,
    ) -> Result<()> {
        let raw = self.annot_raw(annot)?;
        let value = to_wide(value);
        check(
            self.bindings.set_annotation_string(raw, key, &value),
            "FPDFAnnot_SetStringValue",
        )
    }

    pub fn annotation_contents(&self, annot: AnnotationHandle) -> Result<String> {
        self.annotation_string_by(annot, KEY_CONTENTS)
    }

    pub fn set_annotation_contents(&mut self, annot: AnnotationHandle, text: &str) -> Result<()> {
        self.set_annotation_string_by(annot, KEY_CONTENTS, text)
    }

    pub fn annotation_author(&self, annot: AnnotationHandle) -> Result<String> {
        self.annotation_string_by(annot, KEY_AUTHOR)
    }

    pub fn set_annotation_author(&mut self, annot: AnnotationHandle, author: &str) -> Result<()> {
        self.set_annotation_string_by(annot, KEY_AUTHOR, author)
    }

    pub fn annotation_subject(&self, annot: AnnotationHandle) -> Result<String> {
        self.annotation_string_by(annot, KEY_SUBJECT)
    }

    pub fn set_annotation_subject(&mut self, annot: AnnotationHandle, subject: &str) -> Result<()> {
        self.set_annotation_string_by(annot, KEY_SUBJECT, subject)
    }

    /// Modification date (`M`); `None` when absent or unparseable.
    pub fn annotation_modified(
        &self,
        annot: AnnotationHandle,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        Ok(parse_pdf_date(&self.annotation_string_by(annot, KEY_MODIFIED)?))
    }

    pub fn set_annotation_modified(
        &mut self,
        annot: AnnotationHandle,
        date: DateTime<FixedOffset>,
    ) -> Result<()> {
        self.set_annotation_string_by(annot, KEY_MODIFIED, &format_pdf_date(&date))
    }

    /// Creation date (`CreationDate`); `None` when absent or unparseable.
    pub fn annotation_created(
        &self,
        annot: AnnotationHandle,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        Ok(parse_pdf_date(&self.annotation_string_by(annot, KEY_CREATED)?))
    }

    pub fn set_annotation_created(
        &mut self,
        annot: AnnotationHandle,
        date: DateTime<FixedOffset>,
    ) -> Result<()> {
        self.set_annotation_string_by(annot, KEY_CREATED, &format_pdf_date(&date))
    }

    /// Constant opacity (`CA`), 1.0 when not set.
    pub fn annotation_opacity(&self, annot: AnnotationHandle) -> Result<f32> {
        let raw = self.annot_raw(annot)?;
        Ok(self
            .bindings
            .annotation_number(raw, KEY_OPACITY)
            .unwrap_or(1.0))
    }

    /// Set opacity, clamped to `0.0..=1.0`.
    pub fn set_annotation_opacity(&mut self, annot: AnnotationHandle, opacity: f32) -> Result<()> {
        let raw = self.annot_raw(annot)?;
        let opacity = if opacity.is_nan() {
            1.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
        check(
            self.bindings.set_annotation_number(raw, KEY_OPACITY, opacity),
            "FPDFAnnot_SetNumberValue",
        )
    }

    pub fn annotation_quad_points(&self, annot: AnnotationHandle) -> Result<Vec<QuadPoints>> {
        let raw = self.annot_raw(annot)?;
        let count = self.bindings.attachment_point_count(raw);
        (0..count)
            .map(|index| {
                self.bindings
                    .attachment_points(raw, index)
                    .ok_or_else(|| PdfiumError::call("FPDFAnnot_GetAttachmentPoints"))
            })
            .collect()
    }

    /// Replace the quad point list.
    ///
    /// Existing entries are overwritten in place and extra ones appended. The
    /// library cannot drop entries, so a shorter list than the current one is
    /// rejected.
    pub fn set_annotation_quad_points(
        &mut self,
        annot: AnnotationHandle,
        quads: &[QuadPoints],
    ) -> Result<()> {
        let raw = self.annot_raw(annot)?;
        let existing = self.bindings.attachment_point_count(raw);
        if quads.len() < existing {
            return Err(PdfiumError::InvalidArgument(format!(
                "cannot shrink quad points from {} to {}",
                existing,
                quads.len()
            )));
        }
        for (index, quad) in quads.iter().enumerate() {
            let ok = if index < existing {
                self.bindings.set_attachment_points(raw, index, *quad)
            } else {
                self.bindings.append_attachment_points(raw, *quad)
            };
            check(ok, "FPDFAnnot_SetAttachmentPoints")?;
        }
        Ok(())
    }

    /// Quad points from a flat list of `x1 y1 x2 y2 x3 y3 x4 y4` groups.
    pub fn set_annotation_quad_values(
        &mut self,
        annot: AnnotationHandle,
        values: &[f32],
    ) -> Result<()> {
        if values.len() % 8 != 0 {
            return Err(PdfiumError::InvalidArgument(format!(
                "{} quad values is not a multiple of 8",
                values.len()
            )));
        }
        let quads: Vec<QuadPoints> = values
            .chunks_exact(8)
            .filter_map(|chunk| <&[f32; 8]>::try_from(chunk).ok())
            .map(QuadPoints::from_slice)
            .collect();
        self.set_annotation_quad_points(annot, &quads)
    }

    /// Strokes of an ink annotation.
    pub fn annotation_ink_list(&self, annot: AnnotationHandle) -> Result<Vec<Vec<PointF>>> {
        let raw = self.annot_raw(annot)?;
        let strokes = self.bindings.ink_list_count(raw);
        let mut list = Vec::with_capacity(strokes);
        for index in 0..strokes {
            let points = self.bindings.ink_list_path(raw, index, &mut []);
            let mut path = vec![PointF::default(); points];
            if points > 0 {
                let written = self.bindings.ink_list_path(raw, index, &mut path);
                path.truncate(written.min(points));
            }
            list.push(path);
        }
        Ok(list)
    }

    /// Append one stroke; returns its index in the ink list.
    pub fn add_ink_stroke(&mut self, annot: AnnotationHandle, points: &[PointF]) -> Result<usize> {
        let raw = self.annot_raw(annot)?;
        if points.is_empty() {
            return Err(PdfiumError::InvalidArgument("empty ink stroke".to_string()));
        }
        usize::try_from(self.bindings.add_ink_stroke(raw, points))
            .map_err(|_| PdfiumError::call("FPDFAnnot_AddInkStroke"))
    }

    pub fn annotation_appearance(
        &self,
        annot: AnnotationHandle,
        mode: AppearanceMode,
    ) -> Result<String> {
        let raw = self.annot_raw(annot)?;
        read_wide_string(|buf| self.bindings.annotation_appearance(raw, mode.to_raw(), buf))
    }

    /// Set the appearance stream for `mode`; `None` removes it so the
    /// library regenerates a default appearance.
    pub fn set_annotation_appearance(
        &mut self,
        annot: AnnotationHandle,
        mode: AppearanceMode,
        stream: Option<&str>,
    ) -> Result<()> {
        let raw = self.annot_raw(annot)?;
        let stream = stream.map(to_wide);
        check(
            self.bindings
                .set_annotation_appearance(raw, mode.to_raw(), stream.as_deref()),
            "FPDFAnnot_SetAP",
        )
    }
}

pub(crate) fn check(ok: bool, operation: &'static str) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(PdfiumError::call(operation))
    }
}
