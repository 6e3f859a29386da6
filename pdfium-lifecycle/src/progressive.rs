//! Progressive rendering across suspend points.
//!
//! A render span starts with [`Pdfium::start_render`], is driven with
//! [`Pdfium::continue_render`] until the library reports a terminal status, and
//! ends with exactly one [`Pdfium::close_render`]. The target surface moves
//! into the span at start and comes back out of close, so its memory cannot be
//! touched or dropped while the rasterizer may still write to it.
//!
//! ```text
//! Idle ──start──▶ Started ──▶ Paused ⇄ Continuing ──▶ Done / Failed ──close──▶ Idle
//! ```

use crate::bindings::{raw, PauseProbe, PdfiumBindings};
use crate::error::{PdfiumError, Result};
use crate::handle::PageHandle;
use crate::render::RenderFlags;
use crate::session::Pdfium;
use crate::surface::PixelSurface;
use crate::transform::{Rotation, Viewport};

/// Status codes returned by the library's progressive render calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    Ready,
    ToBeContinued,
    Done,
    Failed,
}

impl RenderStatus {
    /// Map an `FPDF_RENDER_*` code; anything unknown is a failure.
    pub fn from_raw(code: i32) -> Self {
        match code {
            raw::FPDF_RENDER_READY => RenderStatus::Ready,
            raw::FPDF_RENDER_TOBECONTINUED => RenderStatus::ToBeContinued,
            raw::FPDF_RENDER_DONE => RenderStatus::Done,
            _ => RenderStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RenderStatus::Done | RenderStatus::Failed)
    }
}

/// Where a page's render span currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderState {
    /// No span is open for the page.
    Idle,
    /// `start` returned without pausing or finishing.
    Started,
    /// A `continue` call is running.
    Continuing,
    /// The library paused and wants `continue`.
    Paused,
    Done,
    Failed,
}

impl RenderState {
    fn after(status: RenderStatus) -> Self {
        match status {
            RenderStatus::Ready => RenderState::Started,
            RenderStatus::ToBeContinued => RenderState::Paused,
            RenderStatus::Done => RenderState::Done,
            RenderStatus::Failed => RenderState::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RenderState::Done | RenderState::Failed)
    }
}

/// Cooperative pause predicate, polled by the rasterizer between work units.
pub type PauseFn = Box<dyn FnMut() -> bool>;

pub(crate) struct RenderSpan<B: PdfiumBindings> {
    bitmap: B::Bitmap,
    surface: PixelSurface,
    state: RenderState,
    pause: Option<PauseFn>,
    continues: usize,
}

fn probe(pause: &mut Option<PauseFn>) -> Option<PauseProbe<'_>> {
    match pause {
        Some(pause) => Some(pause.as_mut() as PauseProbe<'_>),
        None => None,
    }
}

impl<B: PdfiumBindings> Pdfium<B> {
    /// Begin rendering `page` into `surface`.
    ///
    /// The surface is held by the span until [`Pdfium::close_render`] returns
    /// it. Without a pause predicate the library renders in one call and the
    /// returned status is terminal.
    pub fn start_render(
        &mut self,
        page: PageHandle,
        mut surface: PixelSurface,
        viewport: Viewport,
        rotation: Rotation,
        flags: RenderFlags,
        pause: Option<PauseFn>,
    ) -> Result<RenderStatus> {
        let raw_page = self.page_raw(page)?;
        if let Some(span) = self.renders.get(&page) {
            return Err(PdfiumError::InvalidRenderState {
                state: span.state,
                operation: "start render",
            });
        }
        surface.ensure_renderable()?;

        let bitmap = self.prepare_bitmap(&mut surface, viewport)?;
        let mut span = RenderSpan::<B> {
            bitmap,
            surface,
            state: RenderState::Idle,
            pause,
            continues: 0,
        };
        let code = self.bindings.render_start(
            bitmap,
            raw_page,
            viewport,
            rotation.quarter_turns(),
            flags.to_raw(span.surface.format()),
            probe(&mut span.pause),
        );
        let status = RenderStatus::from_raw(code);
        span.state = RenderState::after(status);
        tracing::debug!(?page, ?status, "progressive render started");
        self.renders.insert(page, span);
        Ok(status)
    }

    /// Resume a paused render. Errors if no span is open or it already finished.
    pub fn continue_render(&mut self, page: PageHandle) -> Result<RenderStatus> {
        let raw_page = self.page_raw(page)?;
        let span = self
            .renders
            .get_mut(&page)
            .ok_or(PdfiumError::InvalidRenderState {
                state: RenderState::Idle,
                operation: "continue render",
            })?;
        if span.state.is_terminal() {
            return Err(PdfiumError::InvalidRenderState {
                state: span.state,
                operation: "continue render",
            });
        }
        span.state = RenderState::Continuing;
        span.continues += 1;
        let code = self
            .bindings
            .render_continue(raw_page, probe(&mut span.pause));
        let status = RenderStatus::from_raw(code);
        span.state = RenderState::after(status);
        tracing::trace!(?page, ?status, continues = span.continues, "render continued");
        Ok(status)
    }

    /// Release the rasterizer state and hand the surface back.
    ///
    /// Allowed in any state of an open span, so a caller that stops calling
    /// `continue` still has a way out.
    pub fn close_render(&mut self, page: PageHandle) -> Result<PixelSurface> {
        let raw_page = self.page_raw(page)?;
        let span = self
            .renders
            .remove(&page)
            .ok_or(PdfiumError::InvalidRenderState {
                state: RenderState::Idle,
                operation: "close render",
            })?;
        self.release_span(raw_page, page, span)
    }

    /// State of the span for `page`, `Idle` if none is open.
    pub fn render_state(&self, page: PageHandle) -> RenderState {
        self.renders
            .get(&page)
            .map(|span| span.state)
            .unwrap_or(RenderState::Idle)
    }

    pub(crate) fn release_span(
        &mut self,
        raw_page: B::Page,
        page: PageHandle,
        span: RenderSpan<B>,
    ) -> Result<PixelSurface> {
        self.bindings.render_close(raw_page);
        self.bindings.destroy_bitmap(span.bitmap);
        tracing::debug!(?page, state = ?span.state, continues = span.continues, "render closed");
        Ok(span.surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RenderStatus::from_raw(0), RenderStatus::Ready);
        assert_eq!(RenderStatus::from_raw(1), RenderStatus::ToBeContinued);
        assert_eq!(RenderStatus::from_raw(2), RenderStatus::Done);
        assert_eq!(RenderStatus::from_raw(3), RenderStatus::Failed);
        assert_eq!(RenderStatus::from_raw(-7), RenderStatus::Failed);
        assert!(RenderStatus::Done.is_terminal());
        assert!(!RenderStatus::ToBeContinued.is_terminal());
    }

    #[test]
    fn test_state_after_status() {
        assert_eq!(RenderState::after(RenderStatus::Ready), RenderState::Started);
        assert_eq!(
            RenderState::after(RenderStatus::ToBeContinued),
            RenderState::Paused
        );
        assert!(RenderState::after(RenderStatus::Failed).is_terminal());
    }

    #[test]
    fn test_probe_passes_predicate_through() {
        let mut calls = 0;
        let mut pause: Option<PauseFn> = Some(Box::new(move || {
            calls += 1;
            calls > 1
        }));
        let probe = probe(&mut pause).unwrap();
        assert!(!probe());
        assert!(probe());
        assert!(super::probe(&mut None).is_none());
    }
}
