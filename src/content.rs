use crate::error::EncodeError;
use crate::filter::{Filter, apply_filters};
use crate::object::{Dictionary, Object, Stream};

/// One content-stream operator with its operands, e.g. `72 712 Td`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Object>,
}

impl Operation {
    pub fn new(operator: impl Into<String>, operands: Vec<Object>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStream {
    pub bytes: Vec<u8>,
    pub filters: Vec<Filter>,
}

impl EncodedStream {
    pub fn declared_length(&self) -> usize {
        self.bytes.len()
    }

    /// Names for the `/Filter` entry, in decode order.
    pub fn filter_names_for_dict(&self) -> Vec<&'static str> {
        self.filters.iter().rev().map(|f| f.name()).collect()
    }

    pub fn into_stream(self, dict: Dictionary) -> Stream {
        Stream::with_filters(dict, self.bytes, self.filters)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ContentStreamEncoder {
    filters: Vec<Filter>,
}

impl ContentStreamEncoder {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    pub fn from_names<I, S>(names: I) -> Result<Self, EncodeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filters = names
            .into_iter()
            .map(|name| Filter::from_name(name.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { filters })
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn encode(&self, operations: &[Operation]) -> Result<EncodedStream, EncodeError> {
        let raw = render_operations(operations)?;
        self.encode_raw(&raw)
    }

    pub fn encode_raw(&self, raw: &[u8]) -> Result<EncodedStream, EncodeError> {
        let bytes = apply_filters(raw, &self.filters)?;
        tracing::trace!(
            raw_len = raw.len(),
            encoded_len = bytes.len(),
            filters = self.filters.len(),
            "encoded content stream"
        );
        Ok(EncodedStream {
            bytes,
            filters: self.filters.clone(),
        })
    }
}

/// Encodes `operations`, applying the named filters in order.
pub fn encode_content(
    operations: &[Operation],
    filter_names: &[&str],
) -> Result<EncodedStream, EncodeError> {
    ContentStreamEncoder::from_names(filter_names)?.encode(operations)
}

pub fn render_operations(operations: &[Operation]) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    for operation in operations {
        validate_operator(&operation.operator)?;
        for operand in &operation.operands {
            if matches!(operand, Object::Stream(_) | Object::Placeholder(_)) {
                return Err(EncodeError::Malformed(format!(
                    "operator {} has a non-inline operand",
                    operation.operator
                )));
            }
            out.extend_from_slice(&operand.to_bytes());
            out.push(b' ');
        }
        out.extend_from_slice(operation.operator.as_bytes());
        out.push(b'\n');
    }
    Ok(out)
}

fn validate_operator(operator: &str) -> Result<(), EncodeError> {
    if operator.is_empty() {
        return Err(EncodeError::Malformed("empty operator".to_string()));
    }
    let bad = operator
        .bytes()
        .any(|b| b.is_ascii_whitespace() || b"()<>[]{}/%".contains(&b) || !b.is_ascii_graphic());
    if bad {
        return Err(EncodeError::Malformed(format!(
            "invalid operator token {:?}",
            operator
        )));
    }
    Ok(())
}
