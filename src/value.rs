use crate::statics;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// A number that keeps the I64 / U64 / F64 distinction so saved values come back with the
/// same type they were loaded with.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveNumber {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl SaveNumber {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SaveNumber::I64(v) => Some(*v),
            SaveNumber::U64(v) => i64::try_from(*v).ok(),
            SaveNumber::F64(_) => None,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            SaveNumber::I64(v) => *v as f64,
            SaveNumber::U64(v) => *v as f64,
            SaveNumber::F64(v) => *v,
        }
    }

    /// Like `==`, but NaN matches NaN. Used to detect edits that change nothing.
    fn same_data(&self, other: &SaveNumber) -> bool {
        match (self, other) {
            (SaveNumber::F64(a), SaveNumber::F64(b)) => a == b || (a.is_nan() && b.is_nan()),
            _ => self == other,
        }
    }

    fn write_json5(&self, out: &mut String) {
        match self {
            SaveNumber::I64(v) => out.push_str(&v.to_string()),
            SaveNumber::U64(v) => out.push_str(&v.to_string()),
            SaveNumber::F64(v) if v.is_nan() => out.push_str("NaN"),
            SaveNumber::F64(v) if v.is_infinite() => {
                out.push_str(if v.is_sign_negative() { "-Infinity" } else { "Infinity" })
            }
            SaveNumber::F64(v) => {
                // ryu always keeps a '.' or an exponent, so floats reload as floats.
                let mut buf = ryu::Buffer::new();
                out.push_str(buf.format(*v));
            }
        }
    }
}

impl Serialize for SaveNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SaveNumber::I64(v) => serializer.serialize_i64(*v),
            SaveNumber::U64(v) => serializer.serialize_u64(*v),
            SaveNumber::F64(v) => serializer.serialize_f64(*v),
        }
    }
}

/// The kinds of value a new property can be created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Int,
    UInt,
    Float,
    String,
    Object,
}

impl ValueType {
    pub const ALL: [ValueType; 6] = [
        ValueType::Bool,
        ValueType::Int,
        ValueType::UInt,
        ValueType::Float,
        ValueType::String,
        ValueType::Object,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ValueType::Bool => statics::EN_TYPE_BOOL,
            ValueType::Int => statics::EN_TYPE_I64,
            ValueType::UInt => statics::EN_TYPE_U64,
            ValueType::Float => statics::EN_TYPE_F64,
            ValueType::String => statics::EN_TYPE_STRING,
            ValueType::Object => statics::EN_TYPE_OBJECT,
        }
    }

    pub fn default_value(self) -> SaveValue {
        match self {
            ValueType::Bool => SaveValue::Bool(false),
            ValueType::Int => SaveValue::Number(SaveNumber::I64(0)),
            ValueType::UInt => SaveValue::Number(SaveNumber::U64(0)),
            ValueType::Float => SaveValue::Number(SaveNumber::F64(0.0)),
            ValueType::String => SaveValue::String(String::new()),
            ValueType::Object => SaveValue::Object(IndexMap::new()),
        }
    }
}

/// A typed property value (JSON5 data model).
///
/// Only the top level of a save file may repeat a key (see `SaveFile`). Nested objects
/// are keyed maps: a repeated key keeps its first position and takes the last value.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveValue {
    Null,
    Bool(bool),
    Number(SaveNumber),
    String(String),
    Array(Vec<SaveValue>),
    Object(IndexMap<String, SaveValue>),
}

impl SaveValue {
    /// Default value for a freshly added property. Arrays start empty.
    pub fn new_default(value_type: ValueType, is_array: bool) -> SaveValue {
        if is_array {
            SaveValue::Array(Vec::new())
        } else {
            value_type.default_value()
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, SaveValue>> {
        match self {
            SaveValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[SaveValue]> {
        match self {
            SaveValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SaveValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SaveValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<&SaveNumber> {
        match self {
            SaveValue::Number(n) => Some(n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SaveValue::Null => statics::EN_TYPE_NULL,
            SaveValue::Bool(_) => statics::EN_TYPE_BOOL,
            SaveValue::Number(SaveNumber::I64(_)) => statics::EN_TYPE_I64,
            SaveValue::Number(SaveNumber::U64(_)) => statics::EN_TYPE_U64,
            SaveValue::Number(SaveNumber::F64(_)) => statics::EN_TYPE_F64,
            SaveValue::String(_) => statics::EN_TYPE_STRING,
            SaveValue::Array(_) => statics::EN_TYPE_ARRAY,
            SaveValue::Object(_) => statics::EN_TYPE_OBJECT,
        }
    }

    /// Value equality for edit detection. Unlike `==`, NaN compares equal to NaN, so
    /// re-committing an unchanged NaN is not an edit.
    pub fn same_data(&self, other: &SaveValue) -> bool {
        match (self, other) {
            (SaveValue::Number(a), SaveValue::Number(b)) => a.same_data(b),
            (SaveValue::Array(a), SaveValue::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_data(y))
            }
            (SaveValue::Object(a), SaveValue::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_data(vb))
            }
            _ => self == other,
        }
    }

    pub fn parse_json5(text: &str) -> anyhow::Result<SaveValue> {
        Ok(json5::from_str::<SaveValue>(text)?)
    }

    pub fn to_json5_compact(&self) -> String {
        let mut out = String::new();
        self.write_json5(&mut out, 0, None);
        out
    }

    pub fn to_json5_pretty(&self, newline: &str) -> String {
        let mut out = String::new();
        self.write_json5(&mut out, 0, Some(newline));
        out
    }

    /// `newline` of `None` means compact single-line output.
    pub(crate) fn write_json5(&self, out: &mut String, indent: usize, newline: Option<&str>) {
        match self {
            SaveValue::Null => out.push_str("null"),
            SaveValue::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
            SaveValue::Number(n) => n.write_json5(out),
            SaveValue::String(s) => write_escaped_string(out, s),
            SaveValue::Array(values) => {
                out.push('[');
                write_items(out, indent, newline, values.iter().map(|v| (None, v)));
                out.push(']');
            }
            SaveValue::Object(map) => {
                out.push('{');
                write_items(
                    out,
                    indent,
                    newline,
                    map.iter().map(|(k, v)| (Some(k.as_str()), v)),
                );
                out.push('}');
            }
        }
    }
}

/// Writes the body of an array or object (without the brackets). Shared with the save
/// file writer, which emits the top-level property list as an object with repeated keys.
pub(crate) fn write_items<'a>(
    out: &mut String,
    indent: usize,
    newline: Option<&str>,
    items: impl ExactSizeIterator<Item = (Option<&'a str>, &'a SaveValue)>,
) {
    let len = items.len();
    if len == 0 {
        return;
    }
    if let Some(nl) = newline {
        out.push_str(nl);
    }
    for (i, (key, value)) in items.enumerate() {
        match newline {
            Some(_) => out.push_str(&" ".repeat(indent + 4)),
            None if i > 0 => out.push(' '),
            None => {}
        }
        if let Some(key) = key {
            write_escaped_string(out, key);
            out.push(':');
            if newline.is_some() {
                out.push(' ');
            }
        }
        value.write_json5(out, indent + 4, newline);
        if i + 1 != len {
            out.push(',');
        }
        if let Some(nl) = newline {
            out.push_str(nl);
        }
    }
    if newline.is_some() {
        out.push_str(&" ".repeat(indent));
    }
}

pub(crate) fn write_escaped_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write as _;
                write!(out, "\\u{:04x}", c as u32).ok();
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

impl Serialize for SaveValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SaveValue::Null => serializer.serialize_unit(),
            SaveValue::Bool(v) => serializer.serialize_bool(*v),
            SaveValue::Number(n) => n.serialize(serializer),
            SaveValue::String(s) => serializer.serialize_str(s),
            SaveValue::Array(values) => values.serialize(serializer),
            SaveValue::Object(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SaveValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> de::Visitor<'de> for ValueVisitor {
            type Value = SaveValue;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a JSON5 value")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(SaveValue::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(SaveValue::Null)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(SaveValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(SaveValue::Number(SaveNumber::I64(v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(SaveValue::Number(SaveNumber::U64(v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(SaveValue::Number(SaveNumber::F64(v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(SaveValue::String(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(SaveValue::String(v))
            }

            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut values = Vec::new();
                while let Some(value) = seq.next_element::<SaveValue>()? {
                    values.push(value);
                }
                Ok(SaveValue::Array(values))
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut values = IndexMap::new();
                while let Some((key, value)) = map.next_entry::<String, SaveValue>()? {
                    if let Some(dropped) = values.insert(key, value) {
                        tracing::debug!("Repeated nested key replaced a {} value", dropped.type_name());
                    }
                }
                Ok(SaveValue::Object(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}
