// Central place for user-facing strings and other fixed constants.
// Keep these out of the document/undo code to reduce duplication and make tweaks safer.

// English strings (EN_ prefix to make future localization easier)
pub const EN_TITLE_CONFIRM_RELOAD: &str = "Confirm Reload";
pub const EN_RELOAD_UNSAVED_CHANGES: &str = "Reloading from disk will discard unsaved changes and clear your undo history for this file. This action cannot be undone. Are you sure?";
pub const EN_RELOAD_HISTORY_ONLY: &str =
    "Reloading from disk will clear your undo history for this file. Are you sure?";

pub const EN_PASTE_CONFLICT_SUFFIX: &str =
    "already exists. Replace it, or add the pasted property as a new entry?";

pub const EN_PREFIX_UNDO: &str = "Undo:";
pub const EN_PREFIX_REDO: &str = "Redo:";

pub const EN_TYPE_NULL: &str = "null";
pub const EN_TYPE_BOOL: &str = "bool";
pub const EN_TYPE_I64: &str = "number (i64)";
pub const EN_TYPE_U64: &str = "number (u64)";
pub const EN_TYPE_F64: &str = "number (f64)";
pub const EN_TYPE_STRING: &str = "string";
pub const EN_TYPE_ARRAY: &str = "array";
pub const EN_TYPE_OBJECT: &str = "object";

// Newline constants (used for save formatting; keep out of save/value code).
pub const NL_LF: &str = "\n";
pub const NL_CRLF: &str = "\r\n";

// Clipboard interchange.
// Marks payloads written by this editor so foreign clipboard text is rejected early.
pub const CLIPBOARD_HEADER: &str = "SWSE-PROPERTY/1\n";
pub const CLIPBOARD_DEFAULT_ATTEMPTS: u32 = 3;
pub const CLIPBOARD_DEFAULT_RETRY_DELAY_MS: u64 = 1;

// Gzip magic: 1F 8B
pub const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
pub const EXT_GZIP: &str = "gz";
