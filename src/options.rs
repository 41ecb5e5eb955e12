use crate::error::ConfigError;
use crate::object::ObjectRef;
use crate::perf::PerfLogger;
use crate::sign::DigestAlgorithm;
use chrono::{DateTime, Utc};
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PdfVersion {
    Pdf14,
    Pdf15,
    Pdf16,
    Pdf17,
    Pdf20,
}

impl PdfVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            PdfVersion::Pdf14 => "1.4",
            PdfVersion::Pdf15 => "1.5",
            PdfVersion::Pdf16 => "1.6",
            PdfVersion::Pdf17 => "1.7",
            PdfVersion::Pdf20 => "2.0",
        }
    }

    pub(crate) fn header_bytes(self) -> &'static [u8] {
        match self {
            PdfVersion::Pdf14 => b"%PDF-1.4\n",
            PdfVersion::Pdf15 => b"%PDF-1.5\n",
            PdfVersion::Pdf16 => b"%PDF-1.6\n",
            PdfVersion::Pdf17 => b"%PDF-1.7\n",
            PdfVersion::Pdf20 => b"%PDF-2.0\n",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefMode {
    /// Classic `xref` table with fixed 20-byte records.
    Table,
    /// PDF 1.5 cross-reference stream with packed binary fields.
    Stream,
}

#[derive(Debug, Clone)]
pub struct WriterOptions {
    pub pdf_version: PdfVersion,
    pub xref_mode: XRefMode,
    /// FlateDecode the cross-reference stream body. Ignored for the classic table.
    pub compress_xref_stream: bool,
    /// Emit a trailer `/ID` derived from the serialized object bytes.
    pub file_id: bool,
    /// Offset of the previous cross-reference section, for incremental updates.
    pub prev_xref: Option<u64>,
    pub perf: Option<PerfLogger>,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            pdf_version: PdfVersion::Pdf17,
            xref_mode: XRefMode::Table,
            compress_xref_stream: true,
            file_id: true,
            prev_xref: None,
            perf: None,
        }
    }
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pdf_version(mut self, version: PdfVersion) -> Self {
        self.pdf_version = version;
        self
    }

    pub fn xref_mode(mut self, mode: XRefMode) -> Self {
        self.xref_mode = mode;
        self
    }

    pub fn compress_xref_stream(mut self, enabled: bool) -> Self {
        self.compress_xref_stream = enabled;
        self
    }

    pub fn file_id(mut self, enabled: bool) -> Self {
        self.file_id = enabled;
        self
    }

    pub fn prev_xref(mut self, offset: u64) -> Self {
        self.prev_xref = Some(offset);
        self
    }

    pub fn perf_logger(mut self, logger: PerfLogger) -> Self {
        self.perf = Some(logger);
        self
    }

    pub fn perf_log(self, path: impl AsRef<Path>) -> io::Result<Self> {
        let logger = PerfLogger::new(path)?;
        Ok(self.perf_logger(logger))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.xref_mode == XRefMode::Stream && self.pdf_version < PdfVersion::Pdf15 {
            return Err(ConfigError::XRefStreamVersion(self.pdf_version.as_str()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SignatureOptions {
    /// Bytes reserved for the signature blob; the placeholder holds twice as many hex digits.
    pub reserved_bytes: usize,
    pub fill: u8,
    pub digest: DigestAlgorithm,
    pub field_name: String,
    pub name: Option<String>,
    pub reason: Option<String>,
    pub location: Option<String>,
    pub contact_info: Option<String>,
    pub signing_time: Option<DateTime<Utc>>,
    /// Page that receives the widget annotation. Defaults to the first page of the tree.
    pub page: Option<ObjectRef>,
}

impl Default for SignatureOptions {
    fn default() -> Self {
        Self {
            reserved_bytes: 8192,
            fill: b'0',
            digest: DigestAlgorithm::Sha256,
            field_name: "Signature1".to_string(),
            name: None,
            reason: None,
            location: None,
            contact_info: None,
            signing_time: None,
            page: None,
        }
    }
}

impl SignatureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reserved_bytes(mut self, bytes: usize) -> Self {
        self.reserved_bytes = bytes;
        self
    }

    pub fn fill(mut self, fill: u8) -> Self {
        self.fill = fill;
        self
    }

    pub fn digest(mut self, algorithm: DigestAlgorithm) -> Self {
        self.digest = algorithm;
        self
    }

    pub fn field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn contact_info(mut self, contact: impl Into<String>) -> Self {
        self.contact_info = Some(contact.into());
        self
    }

    pub fn signing_time(mut self, time: DateTime<Utc>) -> Self {
        self.signing_time = Some(time);
        self
    }

    pub fn page(mut self, page: ObjectRef) -> Self {
        self.page = Some(page);
        self
    }

    pub fn hex_width(&self) -> usize {
        self.reserved_bytes.saturating_mul(2)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reserved_bytes == 0 {
            return Err(ConfigError::EmptyReservation);
        }
        if !self.fill.is_ascii_hexdigit() {
            return Err(ConfigError::InvalidFill(self.fill));
        }
        Ok(())
    }
}
