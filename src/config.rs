use crate::statics;
use anyhow::Context;
use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

/// Editor tuning. Every field is optional in the JSON5 file; missing fields take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorOptions {
    /// Maximum undo steps kept per document. `None` keeps everything.
    pub history_limit: Option<usize>,
    /// Attempts made against a busy clipboard before giving up.
    pub clipboard_attempts: u32,
    pub clipboard_retry_delay_ms: u64,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            history_limit: None,
            clipboard_attempts: statics::CLIPBOARD_DEFAULT_ATTEMPTS,
            clipboard_retry_delay_ms: statics::CLIPBOARD_DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl EditorOptions {
    pub fn from_json5(text: &str) -> anyhow::Result<Self> {
        json5::from_str(text).context("parsing editor options")
    }

    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
        let options = Self::from_json5(&text)?;
        tracing::info!("Loaded editor options from {:?}", path);
        Ok(options)
    }

    pub fn clipboard_retry_delay(&self) -> Duration {
        Duration::from_millis(self.clipboard_retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::EditorOptions;
    use std::time::Duration;

    #[test]
    fn empty_object_gives_defaults() {
        let options = EditorOptions::from_json5("{}").unwrap();
        assert_eq!(options, EditorOptions::default());
        assert_eq!(options.clipboard_attempts, 3);
        assert_eq!(options.clipboard_retry_delay(), Duration::from_millis(1));
    }

    #[test]
    fn fields_are_camel_case() {
        let options =
            EditorOptions::from_json5("{ historyLimit: 50, clipboardAttempts: 5, }").unwrap();
        assert_eq!(options.history_limit, Some(50));
        assert_eq!(options.clipboard_attempts, 5);
        assert_eq!(options.clipboard_retry_delay_ms, 1);
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(EditorOptions::from_json5("{ clipboardAttempts: 'many' }").is_err());
    }
}
