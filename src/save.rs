use crate::error::EditError;
use crate::value::write_items;
use crate::{SaveValue, statics};
use anyhow::Context;
use flate2::{Compression, GzBuilder, read::GzDecoder};
use serde::{Deserialize, Deserializer, de};
use std::{
    fmt, fs,
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};

static NEXT_PROPERTY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a property, independent of its name, value or position.
/// Clones share the id; a restored property is the same property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u64);

impl PropertyId {
    fn next() -> Self {
        Self(NEXT_PROPERTY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, typed entry in a save file.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveProperty {
    id: PropertyId,
    pub name: String,
    pub value: SaveValue,
}

impl SaveProperty {
    pub fn new(name: impl Into<String>, value: SaveValue) -> Self {
        Self {
            id: PropertyId::next(),
            name: name.into(),
            value,
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn type_name(&self) -> &'static str {
        self.value.type_name()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    Json5,
    GzipJson5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    Lf,
    CrLf,
}

impl LineEnding {
    fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => statics::NL_LF,
            LineEnding::CrLf => statics::NL_CRLF,
        }
    }
}

/// The top-level object of a save file, read entry by entry so repeated keys survive
/// as separate properties.
struct PropertyList(Vec<SaveProperty>);

impl<'de> Deserialize<'de> for PropertyList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ListVisitor;

        impl<'de> de::Visitor<'de> for ListVisitor {
            type Value = PropertyList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON5 object of properties")
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut properties = Vec::new();
                while let Some((name, value)) = map.next_entry::<String, SaveValue>()? {
                    properties.push(SaveProperty::new(name, value));
                }
                Ok(PropertyList(properties))
            }
        }

        deserializer.deserialize_map(ListVisitor)
    }
}

pub(crate) fn parse_properties(text: &str) -> anyhow::Result<Vec<SaveProperty>> {
    let list = json5::from_str::<PropertyList>(text)?;
    Ok(list.0)
}

/// Writes properties as one JSON5 object, one entry per property, in list order.
pub(crate) fn write_properties(properties: &[SaveProperty], newline: Option<&str>) -> String {
    let mut out = String::new();
    out.push('{');
    write_items(
        &mut out,
        0,
        newline,
        properties.iter().map(|p| (Some(p.name.as_str()), &p.value)),
    );
    out.push('}');
    if let Some(nl) = newline {
        out.push_str(nl);
    }
    out
}

/// An editable save file: an ordered list of properties plus what is needed to write it
/// back the way it was read. Names are not unique; duplicates are told apart by position.
///
/// The mutators here know nothing about undo. Each one validates first and then makes a
/// single change, so callers can pair it with its inverse.
#[derive(Debug, Clone)]
pub struct SaveFile {
    source_path: Option<PathBuf>,
    format: SaveFormat,
    line_ending: LineEnding,
    original_bytes: Vec<u8>,
    properties: Vec<SaveProperty>,
    dirty: bool,
}

impl SaveFile {
    pub fn load_path(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("reading {path:?}"))?;
        let mut file = Self::from_bytes(&bytes, detect_format(path, &bytes))?;
        file.source_path = Some(path.to_path_buf());
        tracing::info!(
            "Loaded {} properties from {:?}",
            file.properties.len(),
            path
        );
        Ok(file)
    }

    /// An in-memory file with no path, e.g. for a new document or for tests.
    pub fn from_json5_str(text: &str) -> anyhow::Result<Self> {
        Self::from_bytes(text.as_bytes(), SaveFormat::Json5)
    }

    fn from_bytes(bytes: &[u8], format: SaveFormat) -> anyhow::Result<Self> {
        let text_bytes = match format {
            SaveFormat::Json5 => bytes.to_vec(),
            SaveFormat::GzipJson5 => {
                let mut decoder = GzDecoder::new(bytes);
                let mut out = Vec::new();
                decoder.read_to_end(&mut out).context("gzip decompress")?;
                out
            }
        };

        let text = std::str::from_utf8(&text_bytes).context("save file is not valid UTF-8")?;
        let properties = parse_properties(text).context("parsing JSON5")?;

        Ok(Self {
            source_path: None,
            format,
            line_ending: detect_line_ending(&text_bytes),
            original_bytes: bytes.to_vec(),
            properties,
            dirty: false,
        })
    }

    /// File name shown on the document tab.
    pub fn name(&self) -> String {
        self.source_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    pub fn format(&self) -> SaveFormat {
        self.format
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// True once any property has changed since the last load or save. Undoing back to
    /// the loaded state does not clear this; the document's save point tracks that.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn properties(&self) -> &[SaveProperty] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn position_of(&self, id: PropertyId) -> Option<usize> {
        self.properties.iter().position(|p| p.id == id)
    }

    pub fn property(&self, id: PropertyId) -> Option<&SaveProperty> {
        self.properties.iter().find(|p| p.id == id)
    }

    /// Live access for in-place value editing. Marks the file dirty.
    pub fn property_mut(&mut self, id: PropertyId) -> Option<&mut SaveProperty> {
        let property = self.properties.iter_mut().find(|p| p.id == id)?;
        self.dirty = true;
        Some(property)
    }

    /// First index at or after `start` whose property is called `name`.
    pub fn index_of_property(&self, name: &str, start: usize) -> Option<usize> {
        self.properties
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, p)| p.name == name)
            .map(|(i, _)| i)
    }

    /// Index of the `n`-th (zero-based) property called `name`.
    pub fn nth_index_of_property(&self, name: &str, n: usize) -> Option<usize> {
        self.properties
            .iter()
            .enumerate()
            .filter(|(_, p)| p.name == name)
            .nth(n)
            .map(|(i, _)| i)
    }

    pub fn insert_property(&mut self, index: usize, property: SaveProperty) -> Result<(), EditError> {
        if index > self.properties.len() {
            return Err(self.out_of_range(index));
        }
        self.properties.insert(index, property);
        self.dirty = true;
        Ok(())
    }

    pub fn remove_property(&mut self, index: usize) -> Result<SaveProperty, EditError> {
        if index >= self.properties.len() {
            return Err(self.out_of_range(index));
        }
        self.dirty = true;
        Ok(self.properties.remove(index))
    }

    pub fn can_move_property_up(&self, index: usize) -> bool {
        index > 0 && index < self.properties.len()
    }

    pub fn can_move_property_down(&self, index: usize) -> bool {
        index + 1 < self.properties.len()
    }

    /// Swaps the property at `index` with the one before it.
    pub fn move_property_up(&mut self, index: usize) -> Result<(), EditError> {
        if !self.can_move_property_up(index) {
            return Err(EditError::CannotMoveUp(index));
        }
        self.properties.swap(index - 1, index);
        self.dirty = true;
        Ok(())
    }

    /// Swaps the property at `index` with the one after it.
    pub fn move_property_down(&mut self, index: usize) -> Result<(), EditError> {
        if !self.can_move_property_down(index) {
            return Err(EditError::CannotMoveDown(index));
        }
        self.properties.swap(index, index + 1);
        self.dirty = true;
        Ok(())
    }

    /// Returns the previous name.
    pub fn rename_property(&mut self, id: PropertyId, name: &str) -> Result<String, EditError> {
        let property = self
            .property_mut(id)
            .ok_or(EditError::UnknownProperty(id))?;
        Ok(std::mem::replace(&mut property.name, name.to_string()))
    }

    /// Returns the previous value.
    pub fn set_property_value(
        &mut self,
        id: PropertyId,
        value: SaveValue,
    ) -> Result<SaveValue, EditError> {
        let property = self
            .property_mut(id)
            .ok_or(EditError::UnknownProperty(id))?;
        Ok(std::mem::replace(&mut property.value, value))
    }

    fn out_of_range(&self, index: usize) -> EditError {
        EditError::IndexOutOfRange {
            index,
            len: self.properties.len(),
        }
    }

    /// Re-reads the file from its source path. On failure the in-memory state is kept.
    pub fn reload(&mut self) -> anyhow::Result<()> {
        let path = self
            .source_path
            .clone()
            .context("file has never been saved to disk")?;
        *self = Self::load_path(&path)?;
        Ok(())
    }

    /// Writes back to the source path in the loaded format.
    pub fn save(&mut self) -> anyhow::Result<()> {
        let path = self
            .source_path
            .clone()
            .context("file has no path; use save_to_path")?;
        self.save_to_path(&path)
    }

    pub fn save_to_path(&mut self, path: &Path) -> anyhow::Result<()> {
        let target_format = if has_gzip_extension(path) {
            SaveFormat::GzipJson5
        } else {
            SaveFormat::Json5
        };

        let bytes = self.save_bytes_for_format(target_format)?;
        fs::write(path, &bytes).with_context(|| format!("writing {path:?}"))?;
        tracing::info!("Saved {} properties to {:?}", self.properties.len(), path);

        self.source_path = Some(path.to_path_buf());
        self.format = target_format;
        self.original_bytes = bytes;
        self.dirty = false;
        Ok(())
    }

    /// Bytes for `format`. An unmodified file in its loaded format comes back byte-for-byte.
    pub fn save_bytes_for_format(&self, format: SaveFormat) -> anyhow::Result<Vec<u8>> {
        if !self.dirty && format == self.format {
            return Ok(self.original_bytes.clone());
        }

        let text = write_properties(&self.properties, Some(self.line_ending.as_str()));
        match format {
            SaveFormat::Json5 => Ok(text.into_bytes()),
            SaveFormat::GzipJson5 => {
                let mut encoder = GzBuilder::new()
                    .mtime(0)
                    .write(Vec::new(), Compression::default());
                encoder.write_all(text.as_bytes()).context("gzip compress")?;
                encoder.finish().context("gzip finish")
            }
        }
    }
}

fn has_gzip_extension(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(statics::EXT_GZIP)
}

fn detect_format(path: &Path, bytes: &[u8]) -> SaveFormat {
    if has_gzip_extension(path) || bytes.starts_with(&statics::GZIP_MAGIC) {
        SaveFormat::GzipJson5
    } else {
        SaveFormat::Json5
    }
}

/// Majority vote over line terminators, so a stray CRLF in an LF file does not flip it.
fn detect_line_ending(text_bytes: &[u8]) -> LineEnding {
    let (mut lf, mut crlf) = (0usize, 0usize);
    for (i, _) in text_bytes.iter().enumerate().filter(|(_, b)| **b == b'\n') {
        if i > 0 && text_bytes[i - 1] == b'\r' {
            crlf += 1;
        } else {
            lf += 1;
        }
    }

    if crlf > lf {
        LineEnding::CrLf
    } else {
        LineEnding::Lf
    }
}
