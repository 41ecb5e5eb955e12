use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("object {id} references object {target}, which was never registered")]
    DanglingReference { id: u32, target: u32 },
    #[error("object {0} was reserved but never filled")]
    Unfilled(u32),
    #[error("object {0} is not part of this graph")]
    UnknownObject(u32),
    #[error("object {0} already has a payload")]
    AlreadyFilled(u32),
    #[error("object {0} is not a dictionary")]
    NotADictionary(u32),
    #[error("object {0} is not an array")]
    NotAnArray(u32),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("unsupported stream filter: {0}")]
    UnsupportedFilter(String),
    #[error("malformed operator record: {0}")]
    Malformed(String),
    #[error("filter {filter} failed: {message}")]
    Codec { filter: &'static str, message: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum XRefError {
    #[error("offset {offset} of object {id} does not fit in a {width}-digit field")]
    OffsetOverflow { id: u32, offset: u64, width: usize },
    #[error("generation {generation} of object {id} does not fit in a 5-digit field")]
    GenerationOverflow { id: u32, generation: u32 },
    #[error("no offset recorded for object {0}")]
    MissingEntry(u32),
    #[error("cross-reference stream encoding failed: {0}")]
    Codec(String),
}

#[derive(Debug, Error)]
pub enum SignError {
    #[error("signature needs {needed} hex digits but only {reserved} were reserved")]
    BlobTooLarge { needed: usize, reserved: usize },
    #[error("signing service failed: {0}")]
    Signer(#[from] SignerError),
    #[error("serialized document has no {0} placeholder")]
    MissingPlaceholder(&'static str),
    #[error("serialized document has {count} {kind} placeholders, expected exactly one")]
    DuplicatePlaceholder { kind: &'static str, count: usize },
    #[error("document already carries signature field {0}")]
    FieldAlreadyPrepared(u32),
    #[error("splice {start}..{end} does not fit a buffer of {len} bytes")]
    OutOfBounds { start: usize, end: usize, len: usize },
    #[error("replacement of {actual} bytes does not match a span of {expected} bytes")]
    SpliceLength { expected: usize, actual: usize },
    #[error("byte range value {0} does not fit the reserved ByteRange field")]
    ByteRangeOverflow(u64),
}

/// Failure reported by a [`crate::sign::Signer`] implementation.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("malformed credentials: {0}")]
    Credentials(String),
    #[error("{0}")]
    Service(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("cross-reference streams require PDF 1.5 or later, got {0}")]
    XRefStreamVersion(&'static str),
    #[error("signature fill byte {0:#04x} is not an ASCII hex digit")]
    InvalidFill(u8),
    #[error("signature reservation must be at least one byte")]
    EmptyReservation,
    #[error("document has no catalog object")]
    MissingRoot,
}

#[derive(Debug, Error)]
pub enum PdfError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    XRef(#[from] XRefError),
    #[error(transparent)]
    Sign(#[from] SignError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PdfError>;
