use crate::filter::Filter;
use chrono::{DateTime, Utc};
use fixed::types::I32F32;
use std::fmt;
use std::ops::Range;

/// Width of the reserved `/ByteRange` array: `[` + four 10-digit fields + 3 separators + `]`.
pub const BYTE_RANGE_WIDTH: usize = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    id: u32,
    generation: u32,
}

impl ObjectRef {
    pub const fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }

    pub fn id(self) -> u32 {
        self.id
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.id, self.generation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    Literal,
    Hexadecimal,
}

/// Fixed-width region reserved during the first signing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    ByteRange,
    Contents { hex_width: usize, fill: u8 },
}

impl Placeholder {
    pub fn kind(self) -> &'static str {
        match self {
            Placeholder::ByteRange => "ByteRange",
            Placeholder::Contents { .. } => "Contents",
        }
    }
}

/// Byte span of a placeholder inside the serialized output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderMark {
    pub placeholder: Placeholder,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(String),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectRef),
    Placeholder(Placeholder),
}

impl Object {
    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    pub fn literal(text: impl Into<Vec<u8>>) -> Self {
        Object::String(text.into(), StringFormat::Literal)
    }

    pub fn hex(bytes: impl Into<Vec<u8>>) -> Self {
        Object::String(bytes.into(), StringFormat::Hexadecimal)
    }

    /// Date string in the `D:YYYYMMDDHHmmSSZ` form, always UTC.
    pub fn date(time: DateTime<Utc>) -> Self {
        Object::literal(time.format("D:%Y%m%d%H%M%SZ").to_string())
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            Object::Stream(stream) => Some(&stream.dict),
            _ => None,
        }
    }

    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Visits every indirect reference reachable inside this payload.
    pub fn visit_references(&self, visit: &mut impl FnMut(ObjectRef)) {
        match self {
            Object::Reference(r) => visit(*r),
            Object::Array(items) => {
                for item in items {
                    item.visit_references(visit);
                }
            }
            Object::Dictionary(dict) => dict.visit_references(visit),
            Object::Stream(stream) => stream.dict.visit_references(visit),
            Object::Null
            | Object::Boolean(_)
            | Object::Integer(_)
            | Object::Real(_)
            | Object::Name(_)
            | Object::String(..)
            | Object::Placeholder(_) => {}
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut marks = Vec::new();
        write_object(&mut out, self, &mut marks);
        out
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<i32> for Object {
    fn from(value: i32) -> Self {
        Object::Integer(value as i64)
    }
}

impl From<u32> for Object {
    fn from(value: u32) -> Self {
        Object::Integer(value as i64)
    }
}

impl From<f64> for Object {
    fn from(value: f64) -> Self {
        Object::Real(value)
    }
}

impl From<ObjectRef> for Object {
    fn from(value: ObjectRef) -> Self {
        Object::Reference(value)
    }
}

impl From<Dictionary> for Object {
    fn from(value: Dictionary) -> Self {
        Object::Dictionary(value)
    }
}

impl From<Stream> for Object {
    fn from(value: Stream) -> Self {
        Object::Stream(value)
    }
}

impl From<Vec<Object>> for Object {
    fn from(value: Vec<Object>) -> Self {
        Object::Array(value)
    }
}

/// Insertion-ordered dictionary. Keys are stored without the leading `/`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(String, Object)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Object>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Object>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Object> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn visit_references(&self, visit: &mut impl FnMut(ObjectRef)) {
        for (_, value) in &self.entries {
            value.visit_references(visit);
        }
    }
}

/// Stream payload. `/Length` and `/Filter` are derived from the encoded body and
/// the applied filters, never taken from the caller's dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dict: Dictionary,
    content: Vec<u8>,
    filters: Vec<Filter>,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>) -> Self {
        Self::with_filters(dict, content, Vec::new())
    }

    /// `content` must already be encoded with `filters`, applied in the given order.
    pub fn with_filters(mut dict: Dictionary, content: Vec<u8>, filters: Vec<Filter>) -> Self {
        dict.remove("Length");
        dict.remove("Filter");
        Self {
            dict,
            content,
            filters,
        }
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn declared_length(&self) -> usize {
        self.content.len()
    }

    /// `/Filter` value: the decode chain, which is the reverse of the encode order.
    pub fn filter_entry(&self) -> Option<Object> {
        match self.filters.as_slice() {
            [] => None,
            [single] => Some(Object::name(single.name())),
            many => Some(Object::Array(
                many.iter().rev().map(|f| Object::name(f.name())).collect(),
            )),
        }
    }
}

pub(crate) fn write_object(out: &mut Vec<u8>, object: &Object, marks: &mut Vec<PlaceholderMark>) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(true) => out.extend_from_slice(b"true"),
        Object::Boolean(false) => out.extend_from_slice(b"false"),
        Object::Integer(value) => out.extend_from_slice(value.to_string().as_bytes()),
        Object::Real(value) => out.extend_from_slice(format_real(*value).as_bytes()),
        Object::Name(name) => write_name(out, name),
        Object::String(bytes, StringFormat::Literal) => write_literal(out, bytes),
        Object::String(bytes, StringFormat::Hexadecimal) => {
            out.push(b'<');
            out.extend_from_slice(hex::encode_upper(bytes).as_bytes());
            out.push(b'>');
        }
        Object::Array(items) => {
            out.push(b'[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(b' ');
                }
                write_object(out, item, marks);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict, None, marks),
        Object::Stream(stream) => {
            write_dictionary(out, &stream.dict, Some(stream), marks);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(&stream.content);
            out.extend_from_slice(b"\nendstream");
        }
        Object::Reference(r) => out.extend_from_slice(r.to_string().as_bytes()),
        Object::Placeholder(placeholder) => {
            let start = out.len();
            match placeholder {
                Placeholder::ByteRange => {
                    out.extend_from_slice(b"[0000000000 0000000000 0000000000 0000000000]");
                }
                Placeholder::Contents { hex_width, fill } => {
                    out.push(b'<');
                    out.resize(out.len() + hex_width, *fill);
                    out.push(b'>');
                }
            }
            marks.push(PlaceholderMark {
                placeholder: *placeholder,
                span: start..out.len(),
            });
        }
    }
}

fn write_dictionary(
    out: &mut Vec<u8>,
    dict: &Dictionary,
    stream: Option<&Stream>,
    marks: &mut Vec<PlaceholderMark>,
) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b' ');
        write_name(out, key);
        out.push(b' ');
        write_object(out, value, marks);
    }
    if let Some(stream) = stream {
        if let Some(filter) = stream.filter_entry() {
            out.extend_from_slice(b" /Filter ");
            write_object(out, &filter, marks);
        }
        out.extend_from_slice(format!(" /Length {}", stream.declared_length()).as_bytes());
    }
    out.extend_from_slice(b" >>");
}

fn is_regular_name_byte(byte: u8) -> bool {
    (0x21..=0x7E).contains(&byte) && !b"()<>[]{}/%#".contains(&byte)
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &byte in name.as_bytes() {
        if is_regular_name_byte(byte) {
            out.push(byte);
        } else {
            // PDF name escaping: # followed by two hex digits.
            out.extend_from_slice(format!("#{:02X}", byte).as_bytes());
        }
    }
}

fn write_literal(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &byte in bytes {
        match byte {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

pub(crate) fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let milli = I32F32::checked_from_num(value)
        .and_then(|fixed| fixed.checked_mul(I32F32::from_num(1000)))
        .and_then(|scaled| scaled.checked_round())
        .map(|scaled| scaled.to_num::<i64>())
        .unwrap_or_else(|| (value * 1000.0).round() as i64);
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.unsigned_abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        return format!("{}{}", sign, int_part);
    }
    let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
    while s.ends_with('0') {
        s.pop();
    }
    s
}
