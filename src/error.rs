use crate::save::PropertyId;

/// Failure of a single property-list mutation. Every primitive validates before it
/// touches the list, so an `Err` always means nothing changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("property index {index} is out of range (list has {len} properties)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("property at index {0} cannot move up")]
    CannotMoveUp(usize),
    #[error("property at index {0} cannot move down")]
    CannotMoveDown(usize),
    #[error("no property with id {0}")]
    UnknownProperty(PropertyId),
}

/// Transient or permanent failure talking to the clipboard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClipboardError {
    /// Another process holds the clipboard; worth retrying shortly.
    #[error("clipboard is busy")]
    Busy,
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
}
