use crate::error::{EncodeError, XRefError};
use crate::filter::Filter;
use crate::object::{Dictionary, Object, ObjectRef, Stream};
use crate::options::XRefMode;
use crate::serialize::{OffsetTable, write_indirect_object};

const TABLE_OFFSET_LIMIT: u64 = 9_999_999_999;
const TABLE_GENERATION_LIMIT: u32 = 65_535;
const FREE_HEAD_GENERATION: u32 = 65_535;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    pub root: ObjectRef,
    pub info: Option<ObjectRef>,
    /// Highest object id + 1 covered by the cross-reference section.
    pub size: u32,
    pub prev: Option<u64>,
    pub file_id: Option<[u8; 16]>,
}

impl Trailer {
    pub fn new(root: ObjectRef, size: u32) -> Self {
        Self {
            root,
            info: None,
            size,
            prev: None,
            file_id: None,
        }
    }

    fn to_dictionary(&self) -> Dictionary {
        let mut dict = Dictionary::new()
            .with("Size", self.size)
            .with("Root", self.root);
        if let Some(info) = self.info {
            dict.set("Info", info);
        }
        if let Some(id) = self.file_id {
            dict.set("ID", vec![Object::hex(id.to_vec()), Object::hex(id.to_vec())]);
        }
        if let Some(prev) = self.prev {
            dict.set("Prev", prev as i64);
        }
        dict
    }
}

#[derive(Debug, Clone)]
pub struct XRefSection {
    /// Bytes to append after the last object, through `%%EOF`.
    pub bytes: Vec<u8>,
    /// The trailer as written; for streams `size` includes the stream object itself.
    pub trailer: Trailer,
}

/// Builds the cross-reference section that starts at byte `start` of the file.
#[tracing::instrument(skip_all, fields(start = start, mode = ?mode, size = trailer.size))]
pub fn build(
    offsets: &OffsetTable,
    trailer: &Trailer,
    start: u64,
    mode: XRefMode,
    compress: bool,
) -> Result<XRefSection, XRefError> {
    match mode {
        XRefMode::Table => build_table(offsets, trailer, start),
        XRefMode::Stream => build_stream(offsets, trailer, start, compress),
    }
}

fn build_table(offsets: &OffsetTable, trailer: &Trailer, start: u64) -> Result<XRefSection, XRefError> {
    let mut out = Vec::with_capacity(trailer.size as usize * 20 + 128);
    out.extend_from_slice(format!("xref\n0 {}\n", trailer.size).as_bytes());
    out.extend_from_slice(format!("0000000000 {:05} f \n", FREE_HEAD_GENERATION).as_bytes());
    for id in 1..trailer.size {
        let entry = offsets.get(id).ok_or(XRefError::MissingEntry(id))?;
        if entry.offset > TABLE_OFFSET_LIMIT {
            return Err(XRefError::OffsetOverflow {
                id,
                offset: entry.offset,
                width: 10,
            });
        }
        if entry.generation > TABLE_GENERATION_LIMIT {
            return Err(XRefError::GenerationOverflow {
                id,
                generation: entry.generation,
            });
        }
        out.extend_from_slice(format!("{:010} {:05} n \n", entry.offset, entry.generation).as_bytes());
    }
    out.extend_from_slice(b"trailer\n");
    out.extend_from_slice(&Object::Dictionary(trailer.to_dictionary()).to_bytes());
    write_startxref(&mut out, start);
    Ok(XRefSection {
        bytes: out,
        trailer: trailer.clone(),
    })
}

fn build_stream(
    offsets: &OffsetTable,
    trailer: &Trailer,
    start: u64,
    compress: bool,
) -> Result<XRefSection, XRefError> {
    // The stream is an object itself and takes the next free id.
    let stream_id = trailer.size;
    let size = stream_id + 1;

    let mut rows: Vec<(u8, u64, u32)> = Vec::with_capacity(size as usize);
    rows.push((0, 0, FREE_HEAD_GENERATION));
    for id in 1..stream_id {
        let entry = offsets.get(id).ok_or(XRefError::MissingEntry(id))?;
        rows.push((1, entry.offset, entry.generation));
    }
    rows.push((1, start, 0));

    let max_offset = rows.iter().map(|row| row.1).max().unwrap_or(0);
    let max_generation = rows.iter().map(|row| row.2).max().unwrap_or(0);
    let offset_width = byte_width(max_offset);
    let generation_width = byte_width(max_generation as u64);

    let mut packed = Vec::with_capacity(rows.len() * (1 + offset_width + generation_width));
    for (kind, offset, generation) in &rows {
        packed.push(*kind);
        push_be(&mut packed, *offset, offset_width);
        push_be(&mut packed, *generation as u64, generation_width);
    }

    let mut stream_trailer = trailer.clone();
    stream_trailer.size = size;
    let dict = Dictionary::new()
        .with("Type", Object::name("XRef"))
        .with(
            "W",
            vec![
                Object::from(1),
                Object::from(offset_width as i64),
                Object::from(generation_width as i64),
            ],
        )
        .with("Index", vec![Object::from(0), Object::from(size)]);
    let dict = stream_trailer
        .to_dictionary()
        .iter()
        .fold(dict, |acc, (key, value)| acc.with(key, value.clone()));

    let stream = if compress {
        let compressed = Filter::Flate
            .encode(&packed)
            .map_err(|err: EncodeError| XRefError::Codec(err.to_string()))?;
        Stream::with_filters(dict, compressed, vec![Filter::Flate])
    } else {
        Stream::new(dict, packed)
    };

    let mut out = Vec::new();
    let mut marks = Vec::new();
    write_indirect_object(&mut out, stream_id, 0, &Object::Stream(stream), &mut marks);
    write_startxref(&mut out, start);
    Ok(XRefSection {
        bytes: out,
        trailer: stream_trailer,
    })
}

fn write_startxref(out: &mut Vec<u8>, start: u64) {
    out.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", start).as_bytes());
}

/// Smallest number of bytes that holds `value`, at least one.
fn byte_width(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn push_be(out: &mut Vec<u8>, value: u64, width: usize) {
    let bytes = value.to_be_bytes();
    out.extend_from_slice(&bytes[bytes.len() - width..]);
}
