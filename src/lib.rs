mod content;
mod document;
mod error;
mod filter;
mod graph;
mod object;
mod options;
mod perf;
#[cfg(feature = "pkcs12")]
mod pkcs12;
mod resources;
mod serialize;
mod sign;
mod xref;

pub use content::{ContentStreamEncoder, EncodedStream, Operation, encode_content, render_operations};
pub use document::{Document, DocumentInfo, save_all};
pub use error::{
    ConfigError, EncodeError, GraphError, PdfError, Result, SignError, SignerError, XRefError,
};
pub use filter::{Filter, apply_filters};
pub use graph::{IndirectObject, ObjectGraph};
pub use object::{
    BYTE_RANGE_WIDTH, Dictionary, Object, ObjectRef, Placeholder, PlaceholderMark, Stream,
    StringFormat,
};
pub use options::{PdfVersion, SignatureOptions, WriterOptions, XRefMode};
pub use perf::PerfLogger;
#[cfg(feature = "pkcs12")]
pub use pkcs12::Pkcs12Signer;
pub use resources::{ResourceDeduplicator, ResourceKey};
pub use serialize::{OffsetTable, SerializedBody, XRefEntry, serialize};
pub use sign::{
    ByteRange, DigestAlgorithm, PlaceholderLayout, SignRequest, SignatureField, SignedOutput,
    Signer, embed, finalize_byte_range, inject, prepare_signature, splice,
};
pub use xref::{Trailer, XRefSection, build as build_xref};
