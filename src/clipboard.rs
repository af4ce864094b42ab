//! Clipboard sinks for copying the artifact.
//!
//! The default sink writes an OSC 52 escape sequence to the terminal. Most
//! modern terminals (and tmux with `set-clipboard on`) forward it to the
//! system clipboard, which also works over SSH where no display server is
//! reachable.

use crate::error::ExportError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::io::{self, Write};

/// Somewhere copied text can go.
pub trait Clipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ExportError>;
}

/// Clipboard that emits OSC 52 sequences to a writer (stdout by default).
pub struct Osc52Clipboard<W: Write> {
    out: W,
}

impl Osc52Clipboard<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> Osc52Clipboard<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Clipboard for Osc52Clipboard<W> {
    fn set_text(&mut self, text: &str) -> Result<(), ExportError> {
        self.out
            .write_all(osc52_sequence(text).as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|e| ExportError::Clipboard(e.to_string()))
    }
}

/// `ESC ] 52 ; c ; <base64> ESC \`
pub fn osc52_sequence(text: &str) -> String {
    let encoded = STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x1b\\")
}

/// In-memory clipboard, for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    pub contents: Option<String>,
}

impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ExportError> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}
