use crate::content::{ContentStreamEncoder, Operation};
use crate::error::{ConfigError, Result, SignError};
use crate::filter::Filter;
use crate::graph::ObjectGraph;
use crate::object::{Dictionary, Object, ObjectRef, PlaceholderMark};
use crate::options::{SignatureOptions, WriterOptions};
use crate::perf::PerfLogger;
use crate::resources::ResourceDeduplicator;
use crate::serialize::{OffsetTable, serialize};
use crate::sign::{PlaceholderLayout, SignatureField, SignedOutput, Signer, embed, prepare_signature};
use crate::xref::{self, Trailer};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::time::Instant;

#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<DateTime<Utc>>,
}

/// One document under construction: its object arena, its resource index,
/// and the catalog/info roots the trailer points at.
#[derive(Debug, Clone, Default)]
pub struct Document {
    graph: ObjectGraph,
    resources: ResourceDeduplicator,
    root: Option<ObjectRef>,
    info: Option<ObjectRef>,
    signature: Option<SignatureField>,
}

/// Everything pass 1 produced. The placeholder spans are only meaningful
/// against `bytes`.
struct Written {
    bytes: Vec<u8>,
    offsets: OffsetTable,
    placeholders: Vec<PlaceholderMark>,
    startxref: u64,
}

struct PerfScope<'a> {
    logger: Option<&'a PerfLogger>,
    doc_id: Option<usize>,
}

impl PerfScope<'_> {
    fn start(&self) -> Option<Instant> {
        self.logger.map(|_| Instant::now())
    }

    fn span(&self, name: &str, start: Option<Instant>) {
        if let (Some(logger), Some(start)) = (self.logger, start) {
            let ms = start.elapsed().as_secs_f64() * 1000.0;
            logger.log_span_ms(name, self.doc_id, ms);
        }
    }

    fn counts(&self, name: &str, counts: &[(&str, u64)]) {
        if let Some(logger) = self.logger {
            logger.log_counts(name, self.doc_id, counts);
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, payload: impl Into<Object>) -> ObjectRef {
        self.graph.register(payload)
    }

    pub fn reserve(&mut self) -> ObjectRef {
        self.graph.reserve()
    }

    pub fn fill(&mut self, reference: ObjectRef, payload: impl Into<Object>) -> Result<()> {
        self.graph.fill(reference, payload)?;
        Ok(())
    }

    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut ObjectGraph {
        &mut self.graph
    }

    pub fn resources(&self) -> &ResourceDeduplicator {
        &self.resources
    }

    pub fn intern_resource(&mut self, canonical: &[u8], dict: Dictionary) -> ObjectRef {
        self.resources.intern(&mut self.graph, canonical, dict)
    }

    pub fn intern_encoded(&mut self, canonical: &[u8], dict: Dictionary, filters: &[Filter]) -> Result<ObjectRef> {
        Ok(self
            .resources
            .intern_encoded(&mut self.graph, canonical, dict, filters)?)
    }

    /// Encodes `operations` and registers the result as a stream object.
    pub fn add_content_stream(
        &mut self,
        operations: &[Operation],
        encoder: &ContentStreamEncoder,
    ) -> Result<ObjectRef> {
        let encoded = encoder.encode(operations)?;
        Ok(self.graph.register(encoded.into_stream(Dictionary::new())))
    }

    pub fn set_root(&mut self, catalog: ObjectRef) {
        self.root = Some(catalog);
    }

    pub fn root(&self) -> Option<ObjectRef> {
        self.root
    }

    /// Registers the document information dictionary and points the trailer at it.
    pub fn set_info(&mut self, info: DocumentInfo) -> ObjectRef {
        let mut dict = Dictionary::new();
        if let Some(title) = info.title {
            dict.set("Title", Object::literal(title));
        }
        if let Some(author) = info.author {
            dict.set("Author", Object::literal(author));
        }
        if let Some(producer) = info.producer {
            dict.set("Producer", Object::literal(producer));
        }
        if let Some(created) = info.creation_date {
            dict.set("CreationDate", Object::date(created));
        }
        let reference = self.graph.register(dict);
        self.info = Some(reference);
        reference
    }

    pub fn info(&self) -> Option<ObjectRef> {
        self.info
    }

    /// Adds the signature dictionary and its form field to this document.
    /// A document carries at most one field; [`Document::save_signed`] fills it.
    pub fn prepare_signature(&mut self, options: &SignatureOptions) -> Result<SignatureField> {
        if let Some(field) = self.signature {
            return Err(SignError::FieldAlreadyPrepared(field.signature.id()).into());
        }
        let root = self.root.ok_or(ConfigError::MissingRoot)?;
        let field = prepare_signature(&mut self.graph, root, options)?;
        self.signature = Some(field);
        Ok(field)
    }

    pub fn signature_field(&self) -> Option<SignatureField> {
        self.signature
    }

    /// Serializes the document. Any failure leaves no output behind.
    #[tracing::instrument(skip_all, fields(objects = self.graph.len()))]
    pub fn save(&self, options: &WriterOptions) -> Result<Vec<u8>> {
        self.save_with_id(options, None)
    }

    /// Two-pass signed save.
    ///
    /// A field added through [`Document::prepare_signature`] is signed as is, and
    /// its reservation wins over `sig_options.reserved_bytes`. Otherwise the field
    /// is added to a copy of the graph, so the document itself stays unsigned
    /// and can be saved again.
    #[tracing::instrument(skip_all, fields(objects = self.graph.len(), reserved = sig_options.reserved_bytes))]
    pub fn save_signed<S: Signer + ?Sized>(
        &self,
        options: &WriterOptions,
        sig_options: &SignatureOptions,
        signer: &S,
    ) -> Result<SignedOutput> {
        let perf = PerfScope {
            logger: options.perf.as_ref(),
            doc_id: None,
        };
        let written = if self.signature.is_some() {
            self.write(options, &perf)?
        } else {
            let mut signed = self.clone();
            signed.prepare_signature(sig_options)?;
            signed.write(options, &perf)?
        };
        let layout = PlaceholderLayout::locate(&written.placeholders)?;
        tracing::debug!(
            objects = written.offsets.len(),
            startxref = written.startxref,
            contents = ?layout.contents,
            "pass 1 complete"
        );

        let started = perf.start();
        let output = embed(&written.bytes, &layout, sig_options.digest, signer)?;
        perf.span("sign.embed", started);
        Ok(output)
    }

    fn save_with_id(&self, options: &WriterOptions, doc_id: Option<usize>) -> Result<Vec<u8>> {
        let perf = PerfScope {
            logger: options.perf.as_ref(),
            doc_id,
        };
        Ok(self.write(options, &perf)?.bytes)
    }

    fn write(&self, options: &WriterOptions, perf: &PerfScope<'_>) -> Result<Written> {
        options.validate()?;
        let root = self.root.ok_or(ConfigError::MissingRoot)?;

        let started = perf.start();
        let body = serialize(&self.graph, root, options.pdf_version)?;
        perf.span("serialize.body", started);

        let mut trailer = Trailer::new(root, body.offsets.size());
        trailer.info = self.info;
        trailer.prev = options.prev_xref;
        if options.file_id {
            trailer.file_id = Some(file_id(&body.bytes));
        }

        let started = perf.start();
        let startxref = body.bytes.len() as u64;
        let section = xref::build(
            &body.offsets,
            &trailer,
            startxref,
            options.xref_mode,
            options.compress_xref_stream,
        )?;
        perf.span("serialize.xref", started);

        let mut bytes = body.bytes;
        bytes.extend_from_slice(&section.bytes);
        perf.counts(
            "serialize",
            &[
                ("objects", body.offsets.len() as u64),
                ("bytes", bytes.len() as u64),
                ("resources", self.resources.len() as u64),
                ("resource_hits", self.resources.hits()),
            ],
        );
        tracing::debug!(
            bytes = bytes.len(),
            size = section.trailer.size,
            startxref,
            "document written"
        );
        Ok(Written {
            bytes,
            offsets: body.offsets,
            placeholders: body.placeholders,
            startxref,
        })
    }
}

/// Serializes independent documents in parallel; results keep input order.
pub fn save_all(documents: &[Document], options: &WriterOptions) -> Vec<Result<Vec<u8>>> {
    let results: Vec<Result<Vec<u8>>> = documents
        .par_iter()
        .enumerate()
        .map(|(doc_id, document)| document.save_with_id(options, Some(doc_id)))
        .collect();
    if let Some(perf) = &options.perf {
        perf.emit_summary();
    }
    results
}

fn file_id(body: &[u8]) -> [u8; 16] {
    let digest = Sha256::digest(body);
    let mut id = [0u8; 16];
    id.copy_from_slice(&digest[..16]);
    id
}
