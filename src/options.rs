//! Extraction parameters: page range and extraction mode.
//!
//! [`Options`] is a value object replaced wholesale on every change. Its
//! fields are private so the only ways to obtain one are [`Options::default`],
//! [`Options::for_document`], [`Options::new`] and [`Options::merge`]; all of
//! them validate, which is what guarantees that a stored `Options` never has
//! an end page before its start page.

use crate::error::SessionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which text the engine should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Post-processed text: headers/footers stripped, paragraphs reflowed. (default)
    #[default]
    Clean,
    /// Verbatim per-page text.
    Raw,
}

impl ExtractionMode {
    /// Wire name used by the engine (`"clean"` / `"raw"`).
    pub fn as_str(self) -> &'static str {
        match self {
            ExtractionMode::Clean => "clean",
            ExtractionMode::Raw => "raw",
        }
    }
}

impl fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last page to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageBound {
    /// Stop after this page (1-indexed, inclusive).
    Bounded(u32),
    /// Continue through the last page of the document. (default)
    #[default]
    ToEnd,
}

impl PageBound {
    /// `Some(n)` for a bounded range, `None` for "through the last page".
    pub fn as_option(self) -> Option<u32> {
        match self {
            PageBound::Bounded(n) => Some(n),
            PageBound::ToEnd => None,
        }
    }
}

impl From<Option<u32>> for PageBound {
    fn from(v: Option<u32>) -> Self {
        v.map_or(PageBound::ToEnd, PageBound::Bounded)
    }
}

/// Validated extraction parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Options {
    start_page: u32,
    end_page: PageBound,
    mode: ExtractionMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            start_page: 1,
            end_page: PageBound::ToEnd,
            mode: ExtractionMode::Clean,
        }
    }
}

impl Options {
    /// Build options, rejecting a start page below 1 or an end before the start.
    pub fn new(start_page: u32, end_page: PageBound, mode: ExtractionMode) -> Result<Self, SessionError> {
        let options = Self {
            start_page,
            end_page,
            mode,
        };
        options.validate()?;
        Ok(options)
    }

    /// The options a freshly uploaded document starts with: every page, clean mode.
    ///
    /// An empty document has no page to bound the range with, so its range
    /// stays open-ended.
    pub fn for_document(page_count: u32) -> Self {
        let end_page = if page_count == 0 {
            PageBound::ToEnd
        } else {
            PageBound::Bounded(page_count)
        };
        Self {
            start_page: 1,
            end_page,
            mode: ExtractionMode::Clean,
        }
    }

    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    pub fn end_page(&self) -> PageBound {
        self.end_page
    }

    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// Check the range invariants.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.start_page < 1 {
            return Err(SessionError::StartPageTooLow {
                start: self.start_page,
            });
        }
        if let PageBound::Bounded(end) = self.end_page {
            if end < self.start_page {
                return Err(SessionError::InvalidPageRange {
                    start: self.start_page,
                    end,
                });
            }
        }
        Ok(())
    }

    /// Apply a partial update and return the resulting options.
    ///
    /// `page_count` is the loaded document's page count. When it is non-zero
    /// an explicit end page past the document is clamped to the last page, and
    /// a start page past the document is rejected. `self` is never modified.
    pub fn merge(&self, patch: &OptionsPatch, page_count: u32) -> Result<Self, SessionError> {
        let start_page = patch.start_page.unwrap_or(self.start_page);
        let mut end_page = patch.end_page.unwrap_or(self.end_page);
        let mode = patch.mode.unwrap_or(self.mode);

        if page_count > 0 {
            if start_page > page_count {
                return Err(SessionError::PageOutOfRange {
                    page: start_page,
                    total: page_count,
                });
            }
            if let PageBound::Bounded(end) = end_page {
                if end > page_count {
                    end_page = PageBound::Bounded(page_count);
                }
            }
        }

        Self::new(start_page, end_page, mode)
    }
}

/// A partial [`Options`] update; unset fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionsPatch {
    pub start_page: Option<u32>,
    pub end_page: Option<PageBound>,
    pub mode: Option<ExtractionMode>,
}

impl OptionsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_page(mut self, page: u32) -> Self {
        self.start_page = Some(page);
        self
    }

    pub fn end_page(mut self, bound: PageBound) -> Self {
        self.end_page = Some(bound);
        self
    }

    pub fn mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Lift a start page below 1 up to 1, the way a number input with `min=1` does.
    pub fn clamped(mut self) -> Self {
        if let Some(start) = self.start_page {
            self.start_page = Some(start.max(1));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.start_page.is_none() && self.end_page.is_none() && self.mode.is_none()
    }
}
