use crate::error::EncodeError;
use flate2::Compression;
use flate2::write::ZlibEncoder;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

// Fixed level keeps compressed output byte-identical across runs.
const FLATE_LEVEL: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    Flate,
    AsciiHex,
    Ascii85,
}

impl Filter {
    pub fn name(self) -> &'static str {
        match self {
            Filter::Flate => "FlateDecode",
            Filter::AsciiHex => "ASCIIHexDecode",
            Filter::Ascii85 => "ASCII85Decode",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, EncodeError> {
        match name.trim_start_matches('/') {
            "FlateDecode" => Ok(Filter::Flate),
            "ASCIIHexDecode" => Ok(Filter::AsciiHex),
            "ASCII85Decode" => Ok(Filter::Ascii85),
            other => Err(EncodeError::UnsupportedFilter(other.to_string())),
        }
    }

    pub fn encode(self, data: &[u8]) -> Result<Vec<u8>, EncodeError> {
        match self {
            Filter::Flate => flate_compress(data),
            Filter::AsciiHex => Ok(ascii_hex_encode(data)),
            Filter::Ascii85 => Ok(ascii85_encode(data)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Filter {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Filter::from_name(s)
    }
}

/// Runs `data` through `filters` in order.
pub fn apply_filters(data: &[u8], filters: &[Filter]) -> Result<Vec<u8>, EncodeError> {
    let mut current = data.to_vec();
    for filter in filters {
        current = filter.encode(&current)?;
    }
    Ok(current)
}

fn flate_compress(data: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let codec_err = |err: std::io::Error| EncodeError::Codec {
        filter: "FlateDecode",
        message: err.to_string(),
    };
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(FLATE_LEVEL));
    encoder.write_all(data).map_err(codec_err)?;
    encoder.finish().map_err(codec_err)
}

fn ascii_hex_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2 + data.len() / 32 + 1);
    for (index, byte) in data.iter().enumerate() {
        out.extend_from_slice(format!("{:02X}", byte).as_bytes());
        if index % 32 == 31 {
            out.push(b'\n');
        }
    }
    out.push(b'>');
    out
}

fn ascii85_encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 5 / 4 + 4);
    for chunk in data.chunks(4) {
        let mut group = [0u8; 4];
        group[..chunk.len()].copy_from_slice(chunk);
        let mut value = u32::from_be_bytes(group);
        if chunk.len() == 4 && value == 0 {
            out.push(b'z');
            continue;
        }
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = (value % 85) as u8 + b'!';
            value /= 85;
        }
        out.extend_from_slice(&digits[..chunk.len() + 1]);
    }
    out.extend_from_slice(b"~>");
    out
}
