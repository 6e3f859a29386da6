//! Text search sessions over a text page.

use crate::bindings::{raw, PdfiumBindings};
use crate::error::{PdfiumError, Result};
use crate::handle::{HandleKind, SearchHandle, TextPageHandle};
use crate::marshal::to_wide;
use crate::session::{Pdfium, SearchEntry};

/// Match options for a search session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOptions {
    pub match_case: bool,
    pub match_whole_word: bool,
    /// Allow overlapping matches.
    pub consecutive: bool,
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn match_case(mut self, yes: bool) -> Self {
        self.match_case = yes;
        self
    }

    pub fn match_whole_word(mut self, yes: bool) -> Self {
        self.match_whole_word = yes;
        self
    }

    pub fn consecutive(mut self, yes: bool) -> Self {
        self.consecutive = yes;
        self
    }

    pub fn to_flags(self) -> u32 {
        let mut flags = 0;
        if self.match_case {
            flags |= raw::FPDF_MATCHCASE;
        }
        if self.match_whole_word {
            flags |= raw::FPDF_MATCHWHOLEWORD;
        }
        if self.consecutive {
            flags |= raw::FPDF_CONSECUTIVE;
        }
        flags
    }
}

/// Location of a match in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub index: usize,
    pub count: usize,
}

impl<B: PdfiumBindings> Pdfium<B> {
    /// Open a search cursor over `text`, positioned before the first match.
    ///
    /// The query is converted once and kept alive for the whole session. An
    /// empty query opens a session that never matches, whatever the options.
    pub fn start_search(
        &mut self,
        text: TextPageHandle,
        query: &str,
        options: SearchOptions,
    ) -> Result<SearchHandle> {
        self.start_search_at(text, query, options, 0)
    }

    /// Like [`Pdfium::start_search`] but starting at character `start`.
    pub fn start_search_at(
        &mut self,
        text: TextPageHandle,
        query: &str,
        options: SearchOptions,
        start: usize,
    ) -> Result<SearchHandle> {
        let text_raw = self.text_raw(text)?;
        let start = i32::try_from(start)
            .map_err(|_| PdfiumError::InvalidArgument(format!("start {}", start)))?;
        let query = to_wide(query);
        let raw = if query.len() <= 1 {
            None
        } else {
            Some(
                self.bindings
                    .find_start(text_raw, &query, options.to_flags(), start)
                    .ok_or_else(|| PdfiumError::call("FPDFText_FindStart"))?,
            )
        };
        let search = self.searches.insert(SearchEntry {
            raw,
            text_page: text,
            query,
            flags: options.to_flags(),
            current: None,
        });
        tracing::debug!(?text, ?search, ?options, "search started");
        Ok(search)
    }

    /// Advance to the next match. At the end it returns false and the
    /// current match stays where it was.
    pub fn find_next(&mut self, search: SearchHandle) -> Result<bool> {
        self.step_search(search, true)
    }

    /// Step back to the previous match, with the same end behaviour as
    /// [`Pdfium::find_next`].
    pub fn find_prev(&mut self, search: SearchHandle) -> Result<bool> {
        self.step_search(search, false)
    }

    fn step_search(&mut self, search: SearchHandle, forward: bool) -> Result<bool> {
        let entry = self.searches.lookup_mut(search)?;
        let Some(raw) = entry.raw else {
            return Ok(false);
        };
        let found = if forward {
            self.bindings.find_next(raw)
        } else {
            self.bindings.find_prev(raw)
        };
        if found {
            let index = self.bindings.search_result_index(raw);
            let count = self.bindings.search_result_count(raw);
            entry.current = Some((index, count));
        } else if let Some((index, _)) = entry.current {
            self.reanchor_search(search, index)?;
        }
        tracing::trace!(?search, forward, found, "search step");
        Ok(found)
    }

    /// A step that runs off either end leaves the library cursor outside the
    /// results. Restart the library search on the current match so the next
    /// step in either direction moves away from it.
    fn reanchor_search(&mut self, search: SearchHandle, index: i32) -> Result<()> {
        let text = self.searches.lookup(search)?.text_page;
        let text_raw = self.text_raw(text)?;
        let entry = self.searches.lookup_mut(search)?;
        let Some(restarted) =
            self.bindings
                .find_start(text_raw, &entry.query, entry.flags, index.max(0))
        else {
            tracing::warn!(?search, index, "could not restart search on current match");
            return Ok(());
        };
        if !self.bindings.find_next(restarted)
            || self.bindings.search_result_index(restarted) != index
        {
            tracing::warn!(?search, index, "restarted search missed the current match");
        }
        if let Some(old) = entry.raw.replace(restarted) {
            self.bindings.find_close(old);
        }
        Ok(())
    }

    /// The current match, if any step has found one.
    pub fn search_match(&self, search: SearchHandle) -> Result<Option<SearchMatch>> {
        let entry = self.searches.lookup(search)?;
        Ok(entry.current.and_then(|(index, count)| {
            Some(SearchMatch {
                index: usize::try_from(index).ok()?,
                count: usize::try_from(count).ok()?,
            })
        }))
    }

    /// Character index of the current match, `None` before the first.
    pub fn search_result_index(&self, search: SearchHandle) -> Result<Option<usize>> {
        Ok(self.search_match(search)?.map(|found| found.index))
    }

    /// Length of the current match in characters, zero before the first.
    pub fn search_result_count(&self, search: SearchHandle) -> Result<usize> {
        Ok(self.search_match(search)?.map_or(0, |found| found.count))
    }

    /// The query this session was opened with.
    pub fn search_query(&self, search: SearchHandle) -> Result<String> {
        let entry = self.searches.lookup(search)?;
        Ok(crate::marshal::from_wide(&entry.query))
    }

    pub fn close_search(&mut self, search: SearchHandle) -> Result<()> {
        let entry = self.searches.remove(search).ok_or(PdfiumError::InvalidHandle {
            kind: HandleKind::Search,
        })?;
        if let Some(raw) = entry.raw {
            self.bindings.find_close(raw);
        }
        tracing::debug!(?search, "search closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_flags() {
        assert_eq!(SearchOptions::new().to_flags(), 0);
        assert_eq!(SearchOptions::new().match_case(true).to_flags(), 1);
        assert_eq!(SearchOptions::new().match_whole_word(true).to_flags(), 2);
        assert_eq!(
            SearchOptions::new()
                .match_case(true)
                .match_whole_word(true)
                .consecutive(true)
                .to_flags(),
            7
        );
    }
}
