//! Viewing, editing and exporting the conversion result.
//!
//! Both projections read the same `artifact.text` in the session:
//!
//! * [`ArtifactEditor::rendered`] — a read-only [`RenderedView`] snapshot.
//! * [`ArtifactEditor::raw_text`] / [`ArtifactEditor::edit`] — the editable
//!   text. Every edit is written straight into the session; there is no
//!   separate save step and nothing is sent back to the engine.
//!
//! Exports ([`ArtifactEditor::copy_to_clipboard`],
//! [`ArtifactEditor::download_as_file`], [`ArtifactEditor::save_as`]) only
//! read the text and never change the session.

use crate::clipboard::Clipboard;
use crate::error::{ExportError, SessionError};
use crate::session::store::SessionHandle;
use crate::session::Lifecycle;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name used when no document name is known.
pub const DEFAULT_EXPORT_STEM: &str = "extracted";

/// Suffix of exported files.
pub const EXPORT_EXTENSION: &str = "md";

static RE_PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// Export file name for a document name: `report.pdf` → `report.md`.
///
/// Only the final path component is used, the `.pdf` suffix is matched
/// case-insensitively, and an empty result falls back to `extracted.md`.
pub fn export_file_name(declared_name: Option<&str>) -> String {
    let stem = declared_name
        .map(|name| {
            let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
            RE_PDF_SUFFIX.replace(base.trim(), "").trim().to_string()
        })
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| DEFAULT_EXPORT_STEM.to_string());
    format!("{stem}.{EXPORT_EXTENSION}")
}

/// Read-only snapshot of the artifact for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub text: String,
    /// False once options changed after the run that produced the text.
    pub is_current: bool,
}

impl RenderedView {
    pub fn line_count(&self) -> usize {
        self.text.lines().count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Presents and edits the session's artifact.
#[derive(Clone)]
pub struct ArtifactEditor {
    session: SessionHandle,
}

impl ArtifactEditor {
    pub fn new(session: SessionHandle) -> Self {
        Self { session }
    }

    /// Rendered projection, if there is an artifact.
    pub fn rendered(&self) -> Option<RenderedView> {
        self.session.read(|s| {
            s.artifact().map(|a| RenderedView {
                text: a.text.clone(),
                is_current: s.artifact_is_current(),
            })
        })
    }

    /// Editable projection, if there is an artifact.
    pub fn raw_text(&self) -> Option<String> {
        self.session.read(|s| s.artifact().map(|a| a.text.clone()))
    }

    /// Replace the artifact text.
    ///
    /// Refused while a run is in flight, because its completion will replace
    /// the text anyway.
    pub fn edit(&self, text: impl Into<String>) -> Result<(), SessionError> {
        let text = text.into();
        self.session.update(|store| {
            let has_artifact = store.session().artifact().is_some();
            match store.lifecycle() {
                Lifecycle::Processing => Err(SessionError::ProcessingInFlight),
                Lifecycle::Completed | Lifecycle::Ready if has_artifact => {
                    store.edit_artifact(text);
                    Ok(())
                }
                _ => Err(SessionError::NoArtifact),
            }
        })
    }

    /// The name `download_as_file` will use.
    pub fn export_file_name(&self) -> String {
        self.session
            .read(|s| export_file_name(s.document().map(|d| d.declared_name.as_str())))
    }

    /// Copy the current text to `clipboard`. Returns the number of bytes copied.
    pub fn copy_to_clipboard(&self, clipboard: &mut dyn Clipboard) -> Result<usize, ExportError> {
        let text = self.raw_text().ok_or(ExportError::NoArtifact)?;
        clipboard.set_text(&text)?;
        info!("Copied {} bytes to clipboard", text.len());
        Ok(text.len())
    }

    /// Save the current text into `dir` under [`Self::export_file_name`].
    pub async fn download_as_file(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let path = dir.as_ref().join(self.export_file_name());
        self.save_as(path).await
    }

    /// Save the current text as UTF-8 to `path`.
    ///
    /// Uses atomic write (temp file in the same directory + rename) so a
    /// crash never leaves a half-written file behind.
    pub async fn save_as(&self, path: impl AsRef<Path>) -> Result<PathBuf, ExportError> {
        let text = self.raw_text().ok_or(ExportError::NoArtifact)?;
        let path = path.as_ref().to_path_buf();

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&target, text.as_bytes()))
            .await
            .map_err(|e| ExportError::WriteFailed {
                path: path.clone(),
                source: std::io::Error::other(format!("write task panicked: {e}")),
            })?
            .map_err(|source| ExportError::WriteFailed {
                path: path.clone(),
                source,
            })?;

        info!("Saved artifact to {}", path.display());
        Ok(path)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
