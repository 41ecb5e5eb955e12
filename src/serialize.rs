use crate::error::GraphError;
use crate::graph::{IndirectObject, ObjectGraph};
use crate::object::{Object, ObjectRef, PlaceholderMark, write_object};
use crate::options::PdfVersion;

const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    pub offset: u64,
    pub generation: u32,
}

/// Object id -> byte offset of its `id gen obj` header. Index 0 is the free-list head.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    entries: Vec<Option<XRefEntry>>,
}

impl OffsetTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: u32, generation: u32, offset: u64) {
        let index = id as usize;
        if self.entries.len() <= index {
            self.entries.resize(index + 1, None);
        }
        self.entries[index] = Some(XRefEntry { offset, generation });
    }

    pub fn get(&self, id: u32) -> Option<XRefEntry> {
        self.entries.get(id as usize).copied().flatten()
    }

    /// Highest recorded id + 1.
    pub fn size(&self) -> u32 {
        self.entries.len().max(1) as u32
    }

    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, XRefEntry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(id, entry)| entry.map(|e| (id as u32, e)))
    }

    pub fn max_offset(&self) -> u64 {
        self.iter().map(|(_, e)| e.offset).max().unwrap_or(0)
    }

    pub fn max_generation(&self) -> u32 {
        self.iter().map(|(_, e)| e.generation).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone)]
pub struct SerializedBody {
    pub bytes: Vec<u8>,
    pub offsets: OffsetTable,
    pub placeholders: Vec<PlaceholderMark>,
}

/// Single forward pass over the graph. Offsets are taken from the running
/// buffer length right before each header is written.
struct Serializer {
    out: Vec<u8>,
    offsets: OffsetTable,
    marks: Vec<PlaceholderMark>,
}

impl Serializer {
    fn new(version: PdfVersion, capacity: usize) -> Self {
        let mut out = Vec::with_capacity(capacity);
        out.extend_from_slice(version.header_bytes());
        out.extend_from_slice(BINARY_MARKER);
        Self {
            out,
            offsets: OffsetTable::new(),
            marks: Vec::new(),
        }
    }

    fn write_indirect(&mut self, object: &IndirectObject) {
        self.offsets
            .record(object.id, object.generation, self.out.len() as u64);
        write_indirect_object(
            &mut self.out,
            object.id,
            object.generation,
            &object.payload,
            &mut self.marks,
        );
    }

    fn finish(self) -> SerializedBody {
        SerializedBody {
            bytes: self.out,
            offsets: self.offsets,
            placeholders: self.marks,
        }
    }
}

pub(crate) fn write_indirect_object(
    out: &mut Vec<u8>,
    id: u32,
    generation: u32,
    payload: &Object,
    marks: &mut Vec<PlaceholderMark>,
) {
    out.extend_from_slice(format!("{} {} obj\n", id, generation).as_bytes());
    write_object(out, payload, marks);
    out.extend_from_slice(b"\nendobj\n");
}

/// Emits header and every object of `graph` in ascending id order.
///
/// The graph is validated up front, so a dangling or unfilled reference fails
/// before any byte is produced.
#[tracing::instrument(skip_all, fields(objects = graph.len(), version = version.as_str()))]
pub fn serialize(
    graph: &ObjectGraph,
    root: ObjectRef,
    version: PdfVersion,
) -> Result<SerializedBody, GraphError> {
    graph.validate()?;
    if !graph.contains(root) {
        return Err(GraphError::UnknownObject(root.id()));
    }

    let mut serializer = Serializer::new(version, estimate_capacity(graph));
    for object in graph.iter() {
        serializer.write_indirect(object);
    }
    let body = serializer.finish();
    tracing::debug!(
        bytes = body.bytes.len(),
        placeholders = body.placeholders.len(),
        "serialized object graph"
    );
    Ok(body)
}

fn estimate_capacity(graph: &ObjectGraph) -> usize {
    let stream_bytes: usize = graph
        .iter()
        .map(|object| match &object.payload {
            Object::Stream(stream) => stream.declared_length(),
            _ => 0,
        })
        .sum();
    stream_bytes + graph.len() * 64 + 64
}
