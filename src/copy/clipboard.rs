//! Clipboard backends.

use crate::error::Result;

/// Where copied Markdown goes.
pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// In-memory clipboard; keeps every write.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    writes: Vec<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent write.
    pub fn contents(&self) -> Option<&str> {
        self.writes.last().map(String::as_str)
    }

    pub fn writes(&self) -> &[String] {
        &self.writes
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<()> {
        self.writes.push(text.to_string());
        Ok(())
    }
}

#[cfg(feature = "clipboard")]
pub use system::SystemClipboard;

#[cfg(feature = "clipboard")]
mod system {
    use tracing::debug;

    use super::Clipboard;
    use crate::error::{Error, Result};

    /// The desktop clipboard, via `arboard`.
    pub struct SystemClipboard {
        inner: arboard::Clipboard,
    }

    impl SystemClipboard {
        pub fn new() -> Result<Self> {
            let inner = arboard::Clipboard::new().map_err(|e| Error::Clipboard(e.to_string()))?;
            Ok(Self { inner })
        }
    }

    impl Clipboard for SystemClipboard {
        fn write_text(&mut self, text: &str) -> Result<()> {
            self.inner
                .set_text(text.to_string())
                .map_err(|e| Error::Clipboard(e.to_string()))?;
            debug!(bytes = text.len(), "copied to system clipboard");
            Ok(())
        }
    }
}
