use crate::error::{GraphError, Result, SignError, SignerError};
use crate::graph::ObjectGraph;
use crate::object::{BYTE_RANGE_WIDTH, Dictionary, Object, ObjectRef, Placeholder, PlaceholderMark};
use crate::options::SignatureOptions;
use sha2::{Digest, Sha256, Sha512};
use std::ops::Range;

// Invisible, print-enabled widget (Print | Locked).
const WIDGET_FLAGS: i64 = 132;
// SignaturesExist | AppendOnly.
const SIG_FLAGS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha512 => "sha512",
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Digest over the two sub-ranges named by `range`, in file order.
    pub fn digest_ranges(self, buffer: &[u8], range: &ByteRange) -> Vec<u8> {
        let (head, tail) = range.covered(buffer);
        match self {
            DigestAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(head);
                hasher.update(tail);
                hasher.finalize().to_vec()
            }
            DigestAlgorithm::Sha512 => {
                let mut hasher = Sha512::new();
                hasher.update(head);
                hasher.update(tail);
                hasher.finalize().to_vec()
            }
        }
    }
}

/// `[start1 len1 start2 len2]`: everything except the `/Contents` hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start1: u64,
    pub len1: u64,
    pub start2: u64,
    pub len2: u64,
}

impl ByteRange {
    pub fn as_array(&self) -> [u64; 4] {
        [self.start1, self.len1, self.start2, self.len2]
    }

    /// Slices covered by the range, clamped to `buffer`.
    pub fn covered<'a>(&self, buffer: &'a [u8]) -> (&'a [u8], &'a [u8]) {
        (
            clamped(buffer, self.start1, self.len1),
            clamped(buffer, self.start2, self.len2),
        )
    }

    fn render(&self) -> std::result::Result<Vec<u8>, SignError> {
        let mut text = format!(
            "[{} {} {} {}]",
            self.start1, self.len1, self.start2, self.len2
        )
        .into_bytes();
        if text.len() > BYTE_RANGE_WIDTH {
            let widest = self.as_array().into_iter().max().unwrap_or(0);
            return Err(SignError::ByteRangeOverflow(widest));
        }
        text.resize(BYTE_RANGE_WIDTH, b' ');
        Ok(text)
    }
}

fn clamped(buffer: &[u8], start: u64, len: u64) -> &[u8] {
    let end = start.saturating_add(len).min(buffer.len() as u64);
    let start = start.min(end);
    &buffer[start as usize..end as usize]
}

pub struct SignRequest<'a> {
    pub digest: &'a [u8],
    pub algorithm: DigestAlgorithm,
    /// The two ranges `digest` was computed over, for signers that hash the
    /// content themselves (CMS signed attributes).
    pub covered: [&'a [u8]; 2],
}

/// Produces a detached signature blob (typically CMS/PKCS#7 DER) over a digest.
/// Credentials live inside the implementation.
pub trait Signer {
    fn sign(&self, request: &SignRequest<'_>) -> std::result::Result<Vec<u8>, SignerError>;
}

impl<F> Signer for F
where
    F: Fn(&SignRequest<'_>) -> std::result::Result<Vec<u8>, SignerError>,
{
    fn sign(&self, request: &SignRequest<'_>) -> std::result::Result<Vec<u8>, SignerError> {
        self(request)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureField {
    pub signature: ObjectRef,
    pub widget: ObjectRef,
}

/// Registers the signature dictionary with its reserved regions, plus the form
/// field that points at it. The field is attached to the catalog's `/AcroForm`
/// and to the `/Annots` of `options.page`, or of the first page in the page
/// tree when no page is named.
pub fn prepare_signature(
    graph: &mut ObjectGraph,
    root: ObjectRef,
    options: &SignatureOptions,
) -> Result<SignatureField> {
    options.validate()?;
    if graph.resolve(root)?.as_dict().is_none() {
        return Err(GraphError::NotADictionary(root.id()).into());
    }
    let page = match options.page {
        Some(page) => Some(page),
        None => first_page(graph, root),
    };

    let signature = graph.register(signature_dictionary(options));

    let mut widget = Dictionary::new()
        .with("Type", Object::name("Annot"))
        .with("Subtype", Object::name("Widget"))
        .with("FT", Object::name("Sig"))
        .with("T", Object::literal(options.field_name.as_str()))
        .with("V", signature)
        .with("F", WIDGET_FLAGS)
        .with("Rect", vec![Object::from(0), Object::from(0), Object::from(0), Object::from(0)]);
    if let Some(page) = page {
        widget.set("P", page);
    }
    let widget = graph.register(widget);

    if let Some(page) = page {
        append_to_array(graph, page, "Annots", widget)?;
    }
    attach_acro_form(graph, root, widget)?;

    tracing::debug!(
        signature = signature.id(),
        widget = widget.id(),
        reserved_bytes = options.reserved_bytes,
        "prepared signature field"
    );
    Ok(SignatureField { signature, widget })
}

/// Walks `/Pages` down `/Kids[0]` to the first leaf page.
fn first_page(graph: &ObjectGraph, root: ObjectRef) -> Option<ObjectRef> {
    let mut node = match graph.resolve(root).ok()?.as_dict()?.get("Pages")? {
        Object::Reference(pages) => *pages,
        _ => return None,
    };
    // Bounded so a cyclic tree ends the walk.
    for _ in 0..graph.len() {
        let dict = graph.resolve(node).ok()?.as_dict()?;
        match dict.get("Type") {
            Some(Object::Name(kind)) if kind == "Page" => return Some(node),
            _ => {}
        }
        node = match dict.get("Kids")? {
            Object::Array(kids) => match kids.first()? {
                Object::Reference(kid) => *kid,
                _ => return None,
            },
            _ => return None,
        };
    }
    None
}

fn signature_dictionary(options: &SignatureOptions) -> Dictionary {
    let mut dict = Dictionary::new()
        .with("Type", Object::name("Sig"))
        .with("Filter", Object::name("Adobe.PPKLite"))
        .with("SubFilter", Object::name("adbe.pkcs7.detached"))
        .with("ByteRange", Object::Placeholder(Placeholder::ByteRange))
        .with(
            "Contents",
            Object::Placeholder(Placeholder::Contents {
                hex_width: options.hex_width(),
                fill: options.fill,
            }),
        );
    let text_entries = [
        ("Name", &options.name),
        ("Reason", &options.reason),
        ("Location", &options.location),
        ("ContactInfo", &options.contact_info),
    ];
    for (key, value) in text_entries {
        if let Some(value) = value {
            dict.set(key, Object::literal(value.as_str()));
        }
    }
    if let Some(time) = options.signing_time {
        dict.set("M", Object::date(time));
    }
    dict
}

fn attach_acro_form(graph: &mut ObjectGraph, root: ObjectRef, widget: ObjectRef) -> Result<()> {
    let existing = graph
        .resolve(root)?
        .as_dict()
        .and_then(|dict| dict.get("AcroForm"))
        .cloned();
    match existing {
        Some(Object::Reference(form)) => {
            append_to_array(graph, form, "Fields", widget)?;
            set_entry(graph, form, "SigFlags", Object::Integer(SIG_FLAGS))
        }
        _ => {
            let catalog = graph
                .get_mut(root)?
                .as_dict_mut()
                .ok_or(GraphError::NotADictionary(root.id()))?;
            let mut form = match catalog.remove("AcroForm") {
                Some(Object::Dictionary(form)) => form,
                _ => Dictionary::new(),
            };
            push_inline(&mut form, "Fields", widget);
            form.set("SigFlags", SIG_FLAGS);
            catalog.set("AcroForm", form);
            Ok(())
        }
    }
}

fn append_to_array(graph: &mut ObjectGraph, owner: ObjectRef, key: &str, item: ObjectRef) -> Result<()> {
    let existing = graph
        .resolve(owner)?
        .as_dict()
        .ok_or(GraphError::NotADictionary(owner.id()))?
        .get(key)
        .cloned();
    if let Some(Object::Reference(array_ref)) = existing {
        match graph.get_mut(array_ref)? {
            Object::Array(items) => items.push(item.into()),
            _ => return Err(GraphError::NotAnArray(array_ref.id()).into()),
        }
        return Ok(());
    }
    let dict = graph
        .get_mut(owner)?
        .as_dict_mut()
        .ok_or(GraphError::NotADictionary(owner.id()))?;
    push_inline(dict, key, item);
    Ok(())
}

fn set_entry(graph: &mut ObjectGraph, owner: ObjectRef, key: &str, value: Object) -> Result<()> {
    graph
        .get_mut(owner)?
        .as_dict_mut()
        .ok_or(GraphError::NotADictionary(owner.id()))?
        .set(key, value);
    Ok(())
}

fn push_inline(dict: &mut Dictionary, key: &str, item: ObjectRef) {
    match dict.get_mut(key) {
        Some(Object::Array(items)) => items.push(item.into()),
        _ => dict.set(key, vec![Object::Reference(item)]),
    }
}

/// Positions of the two reserved regions in a pass-1 buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderLayout {
    pub byte_range: Range<usize>,
    /// The whole `<...>` hex string token, delimiters included.
    pub contents: Range<usize>,
}

impl PlaceholderLayout {
    /// Finds the reserved regions of the one signature in `marks`. Zero or
    /// several of either kind is an error: only one signature is filled per save.
    pub fn locate(marks: &[PlaceholderMark]) -> std::result::Result<Self, SignError> {
        let byte_range = single(marks, "ByteRange")?;
        let contents = single(marks, "Contents")?;
        Ok(Self {
            byte_range: byte_range.span.clone(),
            contents: contents.span.clone(),
        })
    }

    /// Hex digits available between `<` and `>`.
    pub fn capacity(&self) -> usize {
        self.contents.len().saturating_sub(2)
    }

    pub fn byte_range_for(&self, total_len: usize) -> ByteRange {
        ByteRange {
            start1: 0,
            len1: self.contents.start as u64,
            start2: self.contents.end as u64,
            len2: total_len.saturating_sub(self.contents.end) as u64,
        }
    }
}

fn single<'a>(marks: &'a [PlaceholderMark], kind: &'static str) -> std::result::Result<&'a PlaceholderMark, SignError> {
    let mut found = marks.iter().filter(|mark| mark.placeholder.kind() == kind);
    let first = found.next().ok_or(SignError::MissingPlaceholder(kind))?;
    let extra = found.count();
    if extra > 0 {
        return Err(SignError::DuplicatePlaceholder {
            kind,
            count: extra + 1,
        });
    }
    Ok(first)
}

/// Copy of `buffer` with exactly `span` replaced by `replacement` of the same length.
pub fn splice(buffer: &[u8], span: Range<usize>, replacement: &[u8]) -> std::result::Result<Vec<u8>, SignError> {
    if span.start > span.end || span.end > buffer.len() {
        return Err(SignError::OutOfBounds {
            start: span.start,
            end: span.end,
            len: buffer.len(),
        });
    }
    if replacement.len() != span.len() {
        return Err(SignError::SpliceLength {
            expected: span.len(),
            actual: replacement.len(),
        });
    }
    let mut out = buffer.to_vec();
    out[span].copy_from_slice(replacement);
    Ok(out)
}

/// Writes the real `/ByteRange` values over the placeholder array.
pub fn finalize_byte_range(
    pass1: &[u8],
    layout: &PlaceholderLayout,
) -> std::result::Result<(Vec<u8>, ByteRange), SignError> {
    let range = layout.byte_range_for(pass1.len());
    let rendered = range.render()?;
    let bytes = splice(pass1, layout.byte_range.clone(), &rendered)?;
    Ok((bytes, range))
}

/// Writes the hex-encoded `blob` at the start of the reserved `/Contents` span;
/// the remaining fill digits stay as trailing padding.
pub fn inject(buffer: &[u8], layout: &PlaceholderLayout, blob: &[u8]) -> std::result::Result<Vec<u8>, SignError> {
    let encoded = hex::encode_upper(blob);
    let capacity = layout.capacity();
    if encoded.len() > capacity {
        return Err(SignError::BlobTooLarge {
            needed: encoded.len(),
            reserved: capacity,
        });
    }
    let start = layout.contents.start + 1;
    splice(buffer, start..start + encoded.len(), encoded.as_bytes())
}

#[derive(Debug, Clone)]
pub struct SignedOutput {
    pub bytes: Vec<u8>,
    pub byte_range: ByteRange,
    pub digest: Vec<u8>,
}

/// Runs ByteRange finalization, digest, signing, and injection over a finished pass-1 buffer.
#[tracing::instrument(skip_all, fields(len = pass1.len(), algorithm = algorithm.name()))]
pub fn embed<S: Signer + ?Sized>(
    pass1: &[u8],
    layout: &PlaceholderLayout,
    algorithm: DigestAlgorithm,
    signer: &S,
) -> std::result::Result<SignedOutput, SignError> {
    let (ranged, byte_range) = finalize_byte_range(pass1, layout)?;
    let digest = algorithm.digest_ranges(&ranged, &byte_range);
    let (head, tail) = byte_range.covered(&ranged);
    let blob = signer.sign(&SignRequest {
        digest: &digest,
        algorithm,
        covered: [head, tail],
    })?;
    if blob.len() * 2 > layout.capacity() {
        tracing::warn!(
            blob = blob.len(),
            reserved = layout.capacity() / 2,
            "signature blob exceeds reservation"
        );
    }
    let bytes = inject(&ranged, layout, &blob)?;
    tracing::debug!(
        byte_range = ?byte_range.as_array(),
        blob = blob.len(),
        "signature injected"
    );
    Ok(SignedOutput {
        bytes,
        byte_range,
        digest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfError;
    use crate::options::{PdfVersion, XRefMode};
    use crate::serialize::serialize;
    use crate::xref::{Trailer, build};
    use chrono::TimeZone;

    struct Fixture {
        pass1: Vec<u8>,
        layout: PlaceholderLayout,
        graph: ObjectGraph,
    }

    fn signed_fixture(options: &SignatureOptions) -> Fixture {
        let mut graph = ObjectGraph::new();
        let catalog = graph.reserve();
        let pages = graph.reserve();
        let page = graph.register(
            Dictionary::new()
                .with("Type", Object::name("Page"))
                .with("Parent", pages),
        );
        graph
            .fill(
                pages,
                Dictionary::new()
                    .with("Type", Object::name("Pages"))
                    .with("Kids", vec![Object::Reference(page)])
                    .with("Count", 1),
            )
            .unwrap();
        graph
            .fill(
                catalog,
                Dictionary::new()
                    .with("Type", Object::name("Catalog"))
                    .with("Pages", pages),
            )
            .unwrap();
        prepare_signature(&mut graph, catalog, options).unwrap();

        let body = serialize(&graph, catalog, PdfVersion::Pdf17).unwrap();
        let layout = PlaceholderLayout::locate(&body.placeholders).unwrap();
        let trailer = Trailer::new(catalog, body.offsets.size());
        let xref = build(
            &body.offsets,
            &trailer,
            body.bytes.len() as u64,
            XRefMode::Table,
            false,
        )
        .unwrap();
        let mut pass1 = body.bytes;
        pass1.extend_from_slice(&xref.bytes);
        Fixture {
            pass1,
            layout,
            graph,
        }
    }

    fn fixed_signer(blob: Vec<u8>) -> impl Fn(&SignRequest<'_>) -> std::result::Result<Vec<u8>, SignerError> {
        move |_request| Ok(blob.clone())
    }

    #[test]
    fn prepare_attaches_field_to_catalog_and_page() {
        let fixture = signed_fixture(&SignatureOptions::new().reserved_bytes(16));
        let catalog = fixture.graph.resolve(ObjectRef::new(1, 0)).unwrap().as_dict().unwrap();
        let form = catalog.get("AcroForm").unwrap().as_dict().unwrap();
        assert_eq!(form.get("SigFlags"), Some(&Object::Integer(3)));
        assert_eq!(
            form.get("Fields"),
            Some(&Object::Array(vec![Object::Reference(ObjectRef::new(5, 0))]))
        );
        let page = fixture.graph.resolve(ObjectRef::new(3, 0)).unwrap().as_dict().unwrap();
        assert_eq!(
            page.get("Annots"),
            Some(&Object::Array(vec![Object::Reference(ObjectRef::new(5, 0))]))
        );
    }

    #[test]
    fn signature_dictionary_carries_metadata() {
        let options = SignatureOptions::new()
            .reserved_bytes(4)
            .name("Jane Signer")
            .reason("Approval")
            .signing_time(chrono::Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap());
        let text = String::from_utf8_lossy(&signed_fixture(&options).pass1).to_string();
        assert!(text.contains(
            "<< /Type /Sig /Filter /Adobe.PPKLite /SubFilter /adbe.pkcs7.detached \
             /ByteRange [0000000000 0000000000 0000000000 0000000000] /Contents <00000000> \
             /Name (Jane Signer) /Reason (Approval) /M (D:20240309140500Z) >>"
        ));
    }

    #[test]
    fn layout_spans_cover_placeholders() {
        let fixture = signed_fixture(&SignatureOptions::new().reserved_bytes(8).fill(b'A'));
        assert_eq!(fixture.layout.byte_range.len(), BYTE_RANGE_WIDTH);
        assert_eq!(fixture.layout.capacity(), 16);
        assert_eq!(
            &fixture.pass1[fixture.layout.contents.clone()],
            b"<AAAAAAAAAAAAAAAA>"
        );
    }

    #[test]
    fn byte_range_excludes_exactly_the_hex_string() {
        let fixture = signed_fixture(&SignatureOptions::new().reserved_bytes(8));
        let (ranged, range) = finalize_byte_range(&fixture.pass1, &fixture.layout).unwrap();
        assert_eq!(ranged.len(), fixture.pass1.len());
        assert_eq!(range.start1, 0);
        assert_eq!(range.len1 as usize, fixture.layout.contents.start);
        assert_eq!(range.start2 as usize, fixture.layout.contents.end);
        assert_eq!((range.start2 + range.len2) as usize, ranged.len());

        let excluded = &ranged[range.len1 as usize..range.start2 as usize];
        assert_eq!(excluded, &fixture.pass1[fixture.layout.contents.clone()]);
        assert!(excluded.starts_with(b"<") && excluded.ends_with(b">"));

        let rendered = &ranged[fixture.layout.byte_range.clone()];
        let expected = format!("[0 {} {} {}]", range.len1, range.start2, range.len2);
        assert!(rendered.starts_with(expected.as_bytes()));
        assert!(rendered[expected.len()..].iter().all(|b| *b == b' '));

        let outside_changed = (0..ranged.len())
            .filter(|i| !fixture.layout.byte_range.contains(i))
            .any(|i| ranged[i] != fixture.pass1[i]);
        assert!(!outside_changed);
    }

    #[test]
    fn digest_covers_everything_but_contents() {
        let fixture = signed_fixture(&SignatureOptions::new().reserved_bytes(8));
        let (ranged, range) = finalize_byte_range(&fixture.pass1, &fixture.layout).unwrap();
        let mut expected_input = ranged[..fixture.layout.contents.start].to_vec();
        expected_input.extend_from_slice(&ranged[fixture.layout.contents.end..]);
        assert_eq!(
            DigestAlgorithm::Sha256.digest_ranges(&ranged, &range),
            Sha256::digest(&expected_input).to_vec()
        );
        assert_eq!(DigestAlgorithm::Sha512.digest_ranges(&ranged, &range).len(), 64);
    }

    #[test]
    fn embed_keeps_length_and_pads_with_fill() {
        let fixture = signed_fixture(&SignatureOptions::new().reserved_bytes(8));
        let signed = embed(
            &fixture.pass1,
            &fixture.layout,
            DigestAlgorithm::Sha256,
            &fixed_signer(vec![0xCA, 0xFE]),
        )
        .unwrap();
        assert_eq!(signed.bytes.len(), fixture.pass1.len());
        assert_eq!(
            &signed.bytes[fixture.layout.contents.clone()],
            b"<CAFE000000000000>"
        );
        // Signing does not change what was digested.
        assert_eq!(
            DigestAlgorithm::Sha256.digest_ranges(&signed.bytes, &signed.byte_range),
            signed.digest
        );
    }

    #[test]
    fn signer_sees_the_range_digest() {
        fn echo(request: &SignRequest<'_>) -> std::result::Result<Vec<u8>, SignerError> {
            assert_eq!(request.algorithm, DigestAlgorithm::Sha512);
            let mut hasher = Sha512::new();
            hasher.update(request.covered[0]);
            hasher.update(request.covered[1]);
            assert_eq!(hasher.finalize().to_vec(), request.digest);
            Ok(request.digest.to_vec())
        }
        let fixture = signed_fixture(&SignatureOptions::new().reserved_bytes(64));
        let signed = embed(&fixture.pass1, &fixture.layout, DigestAlgorithm::Sha512, &echo).unwrap();
        let hex = hex::encode_upper(&signed.digest);
        let start = fixture.layout.contents.start + 1;
        assert_eq!(&signed.bytes[start..start + hex.len()], hex.as_bytes());
    }

    #[test]
    fn oversized_blob_fails_and_leaves_pass1_untouched() {
        let fixture = signed_fixture(&SignatureOptions::new().reserved_bytes(4));
        let snapshot = fixture.pass1.clone();
        let err = inject(&fixture.pass1, &fixture.layout, &[0x11; 5]).unwrap_err();
        assert!(matches!(
            err,
            SignError::BlobTooLarge {
                needed: 10,
                reserved: 8
            }
        ));
        assert_eq!(fixture.pass1, snapshot);

        let err = embed(
            &fixture.pass1,
            &fixture.layout,
            DigestAlgorithm::Sha256,
            &fixed_signer(vec![0; 5]),
        )
        .unwrap_err();
        assert!(matches!(err, SignError::BlobTooLarge { .. }));
    }

    #[test]
    fn signer_failure_is_surfaced() {
        fn offline(_: &SignRequest<'_>) -> std::result::Result<Vec<u8>, SignerError> {
            Err(SignerError::Service("hsm offline".to_string()))
        }
        let fixture = signed_fixture(&SignatureOptions::new().reserved_bytes(4));
        let err = embed(&fixture.pass1, &fixture.layout, DigestAlgorithm::Sha256, &offline).unwrap_err();
        assert!(matches!(err, SignError::Signer(SignerError::Service(_))));
    }

    #[test]
    fn splice_is_bounds_and_length_checked() {
        let buffer = b"0123456789".to_vec();
        assert_eq!(splice(&buffer, 2..4, b"ab").unwrap(), b"01ab456789");
        assert!(matches!(
            splice(&buffer, 8..12, b"abcd"),
            Err(SignError::OutOfBounds { start: 8, end: 12, len: 10 })
        ));
        assert!(matches!(
            splice(&buffer, 2..4, b"abc"),
            Err(SignError::SpliceLength { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn missing_placeholders_are_reported() {
        assert!(matches!(
            PlaceholderLayout::locate(&[]),
            Err(SignError::MissingPlaceholder("ByteRange"))
        ));
    }

    #[test]
    fn byte_range_overflow_is_reported() {
        let range = ByteRange {
            start1: 0,
            len1: 1_000_000_000_000_000,
            start2: 1_000_000_000_000_000,
            len2: 1_000_000_000_000_000,
        };
        assert!(matches!(range.render(), Err(SignError::ByteRangeOverflow(_))));
    }

    #[test]
    fn prepare_rejects_invalid_options_and_roots() {
        let mut graph = ObjectGraph::new();
        let root = graph.register(Object::Null);
        let err = prepare_signature(&mut graph, root, &SignatureOptions::new()).unwrap_err();
        assert!(matches!(err, PdfError::Graph(GraphError::NotADictionary(1))));
        let err = prepare_signature(&mut graph, root, &SignatureOptions::new().fill(b'x')).unwrap_err();
        assert!(matches!(err, PdfError::Config(_)));
    }

    #[test]
    fn existing_indirect_acro_form_is_extended() {
        let mut graph = ObjectGraph::new();
        let form = graph.register(Dictionary::new().with("Fields", Vec::<Object>::new()));
        let root = graph.register(
            Dictionary::new()
                .with("Type", Object::name("Catalog"))
                .with("AcroForm", form),
        );
        let field = prepare_signature(&mut graph, root, &SignatureOptions::new()).unwrap();
        let form = graph.resolve(form).unwrap().as_dict().unwrap();
        assert_eq!(
            form.get("Fields"),
            Some(&Object::Array(vec![Object::Reference(field.widget)]))
        );
        assert_eq!(form.get("SigFlags"), Some(&Object::Integer(3)));
    }

    fn two_page_graph() -> (ObjectGraph, ObjectRef, ObjectRef, ObjectRef, ObjectRef) {
        let mut graph = ObjectGraph::new();
        let catalog = graph.reserve();
        let pages = graph.reserve();
        let first = graph.register(
            Dictionary::new()
                .with("Type", Object::name("Page"))
                .with("Parent", pages),
        );
        let link = graph.register(
            Dictionary::new()
                .with("Type", Object::name("Annot"))
                .with("Subtype", Object::name("Link"))
                .with("Rect", vec![Object::from(80), Object::from(50), Object::from(130), Object::from(70)]),
        );
        let second = graph.register(
            Dictionary::new()
                .with("Type", Object::name("Page"))
                .with("Parent", pages)
                .with("Annots", vec![Object::Reference(link)]),
        );
        graph
            .fill(
                pages,
                Dictionary::new()
                    .with("Type", Object::name("Pages"))
                    .with("Kids", vec![Object::Reference(first), Object::Reference(second)])
                    .with("Count", 2),
            )
            .unwrap();
        graph
            .fill(
                catalog,
                Dictionary::new()
                    .with("Type", Object::name("Catalog"))
                    .with("Pages", pages),
            )
            .unwrap();
        (graph, catalog, first, second, link)
    }

    #[test]
    fn named_page_keeps_its_existing_annotations() {
        let (mut graph, catalog, first, second, link) = two_page_graph();
        let options = SignatureOptions::new().reserved_bytes(16).page(second);
        let field = prepare_signature(&mut graph, catalog, &options).unwrap();

        let page = graph.resolve(second).unwrap().as_dict().unwrap();
        assert_eq!(
            page.get("Annots"),
            Some(&Object::Array(vec![
                Object::Reference(link),
                Object::Reference(field.widget)
            ]))
        );
        assert!(!graph.resolve(first).unwrap().as_dict().unwrap().contains_key("Annots"));
        let widget = graph.resolve(field.widget).unwrap().as_dict().unwrap();
        assert_eq!(widget.get("P"), Some(&Object::Reference(second)));
        graph.validate().unwrap();
    }

    #[test]
    fn unnamed_page_falls_back_to_first_leaf() {
        let (mut graph, catalog, first, _, _) = two_page_graph();
        assert_eq!(first_page(&graph, catalog), Some(first));
        let field = prepare_signature(&mut graph, catalog, &SignatureOptions::new()).unwrap();
        let page = graph.resolve(first).unwrap().as_dict().unwrap();
        assert_eq!(
            page.get("Annots"),
            Some(&Object::Array(vec![Object::Reference(field.widget)]))
        );
    }

    #[test]
    fn second_signature_in_one_buffer_is_rejected() {
        let (mut graph, catalog, _, _, _) = two_page_graph();
        let options = SignatureOptions::new().reserved_bytes(8);
        prepare_signature(&mut graph, catalog, &options).unwrap();
        prepare_signature(&mut graph, catalog, &options).unwrap();
        let body = serialize(&graph, catalog, PdfVersion::Pdf17).unwrap();
        assert!(matches!(
            PlaceholderLayout::locate(&body.placeholders),
            Err(SignError::DuplicatePlaceholder {
                kind: "ByteRange",
                count: 2
            })
        ));
    }

    #[test]
    fn covered_clamps_ranges_past_the_buffer() {
        let buffer = b"0123456789";
        let range = ByteRange {
            start1: 40,
            len1: 5,
            start2: 8,
            len2: u64::MAX,
        };
        let (head, tail) = range.covered(buffer);
        assert!(head.is_empty());
        assert_eq!(tail, b"89");
    }
}
