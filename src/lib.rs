//! Core library for SWSE, a save editor for files made of named, typed properties.
//! Every change to a document goes through a linear undo/redo history with a save point;
//! the property list itself stays a plain ordered container.

pub mod clipboard;
mod config;
mod document;
pub mod edit;
mod error;
mod save;
pub mod statics;
pub mod undo;
mod value;
pub mod view;

pub use config::EditorOptions;
pub use document::{
    NewProperty, PasteChoice, Prompter, ReloadWarning, SaveDocument, paste_conflict_message,
};
pub use error::{ClipboardError, EditError};
pub use save::{LineEnding, PropertyId, SaveFile, SaveFormat, SaveProperty};
pub use value::{SaveNumber, SaveValue, ValueType};
