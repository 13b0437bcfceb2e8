//! Copy/paste of single properties.
//!
//! The OS clipboard is behind the [`Clipboard`] trait. It can be briefly locked by other
//! processes, so every access goes through [`with_retries`]. Clipboard use is best-effort:
//! callers log and drop failures instead of surfacing them.

use crate::error::ClipboardError;
use crate::save::{parse_properties, write_properties};
use crate::{SaveProperty, statics};
use anyhow::{Context, bail};
use std::{thread, time::Duration};

pub trait Clipboard {
    fn set_data(&mut self, data: &[u8]) -> Result<(), ClipboardError>;
    /// `Ok(None)` when the clipboard holds nothing this editor can read.
    fn get_data(&mut self) -> Result<Option<Vec<u8>>, ClipboardError>;
}

/// In-process clipboard for headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    data: Option<Vec<u8>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: Some(data.into()),
        }
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

impl Clipboard for MemoryClipboard {
    fn set_data(&mut self, data: &[u8]) -> Result<(), ClipboardError> {
        self.data = Some(data.to_vec());
        Ok(())
    }

    fn get_data(&mut self) -> Result<Option<Vec<u8>>, ClipboardError> {
        Ok(self.data.clone())
    }
}

/// Runs `op` up to `attempts` times, sleeping `delay` after each `Busy` failure. Other
/// errors are returned immediately.
pub fn with_retries<T>(
    attempts: u32,
    delay: Duration,
    mut op: impl FnMut() -> Result<T, ClipboardError>,
) -> Result<T, ClipboardError> {
    let mut remaining = attempts.max(1);
    loop {
        match op() {
            Err(ClipboardError::Busy) if remaining > 1 => {
                remaining -= 1;
                thread::sleep(delay);
            }
            result => return result,
        }
    }
}

/// Clipboard payload for one property: a fixed header line, then a compact JSON5 object
/// with a single entry.
pub fn encode_property(property: &SaveProperty) -> Vec<u8> {
    let mut out = String::from(statics::CLIPBOARD_HEADER);
    out.push_str(&write_properties(std::slice::from_ref(property), None));
    out.into_bytes()
}

/// Inverse of [`encode_property`]. The property gets a fresh identity.
pub fn decode_property(data: &[u8]) -> anyhow::Result<SaveProperty> {
    let text = std::str::from_utf8(data).context("clipboard data is not UTF-8")?;
    let body = text
        .strip_prefix(statics::CLIPBOARD_HEADER)
        .context("clipboard data is not a copied property")?;
    let mut properties = parse_properties(body).context("parsing clipboard property")?;
    if properties.len() != 1 {
        bail!(
            "clipboard holds {} properties, expected exactly one",
            properties.len()
        );
    }
    Ok(properties.remove(0))
}
