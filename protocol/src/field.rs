//! Per-field encode/decode driven by the catalog.
//!
//! Fixed numerics are zero-padded left and truncated from the left (low
//! order digits win); text is space-padded right and truncated from the
//! right; binary must match its declared length exactly. Variable fields
//! emit their length indicator in the configured [`LengthEncoding`], not
//! the field's own data encoding.

use crate::catalog::{DataClass, FieldDefinition, FieldEncoding, FieldFormat};
use crate::{bcd, CodecError, CodecResult, DataEncodingMode, WireConfig};

/// A decoded field value.
///
/// Digit strings for numeric fields, character strings for text fields,
/// raw bytes for binary fields. The codec never trims trailing spaces;
/// bit-exact forwarding is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Binary(Vec<u8>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn binary(value: impl Into<Vec<u8>>) -> Self {
        FieldValue::Binary(value.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Binary(_) => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Text(_) => None,
            FieldValue::Binary(b) => Some(b),
        }
    }

    /// Digit/character count for text, byte count for binary.
    pub fn natural_length(&self) -> usize {
        match self {
            FieldValue::Text(s) => s.chars().count(),
            FieldValue::Binary(b) => b.len(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        FieldValue::Binary(value)
    }
}

fn effective_encoding(def: &FieldDefinition, cfg: &WireConfig) -> FieldEncoding {
    match (cfg.data_encoding, def.class) {
        (DataEncodingMode::Ascii, DataClass::Numeric) => FieldEncoding::Ascii,
        (DataEncodingMode::Bcd, DataClass::Numeric) => FieldEncoding::Bcd,
        _ => def.encoding,
    }
}

fn expect_text<'a>(field: u8, value: &'a FieldValue) -> CodecResult<&'a str> {
    value
        .as_text()
        .ok_or(CodecError::WrongValueKind {
            field,
            expected: "text",
        })
}

fn expect_digits(value: &str) -> CodecResult<()> {
    match value.chars().find(|ch| !ch.is_ascii_digit()) {
        Some(ch) => Err(CodecError::NonNumeric { ch }),
        None => Ok(()),
    }
}

fn expect_ascii(field: u8, value: &str) -> CodecResult<()> {
    if value.is_ascii() {
        Ok(())
    } else {
        Err(CodecError::NonAscii { field })
    }
}

/// Append one encoded field to `out`.
pub fn encode_into(
    field: u8,
    def: &FieldDefinition,
    value: &FieldValue,
    cfg: &WireConfig,
    out: &mut Vec<u8>,
) -> CodecResult<()> {
    match def.format {
        FieldFormat::Fixed => encode_fixed(field, def, value, cfg, out),
        FieldFormat::Llvar => encode_var(field, def, value, cfg, 2, out),
        FieldFormat::Lllvar => encode_var(field, def, value, cfg, 3, out),
    }
}

fn encode_fixed(
    field: u8,
    def: &FieldDefinition,
    value: &FieldValue,
    cfg: &WireConfig,
    out: &mut Vec<u8>,
) -> CodecResult<()> {
    match def.class {
        DataClass::Numeric => {
            let text = expect_text(field, value)?;
            expect_digits(text)?;
            let padded = pad_numeric(text, def.max_length);
            match effective_encoding(def, cfg) {
                FieldEncoding::Bcd => out.extend_from_slice(&bcd::encode(&padded)?),
                FieldEncoding::Ascii | FieldEncoding::Binary => {
                    out.extend_from_slice(padded.as_bytes())
                }
            }
        }
        DataClass::AlphaNum | DataClass::AlphaNumSymbol => {
            let text = expect_text(field, value)?;
            expect_ascii(field, text)?;
            let padded = pad_text(text, def.max_length);
            out.extend_from_slice(padded.as_bytes());
        }
        DataClass::Binary => {
            let bytes = value.as_binary().ok_or(CodecError::WrongValueKind {
                field,
                expected: "binary",
            })?;
            if bytes.len() != def.max_length {
                return Err(CodecError::FixedLengthMismatch {
                    field,
                    expected: def.max_length,
                    actual: bytes.len(),
                });
            }
            out.extend_from_slice(bytes);
        }
    }
    Ok(())
}

fn encode_var(
    field: u8,
    def: &FieldDefinition,
    value: &FieldValue,
    cfg: &WireConfig,
    prefix_digits: usize,
    out: &mut Vec<u8>,
) -> CodecResult<()> {
    let length = value.natural_length();
    if length > def.max_length {
        return Err(CodecError::FieldTooLong {
            field,
            actual: length,
            max: def.max_length,
        });
    }

    let prefix = format!("{length:0prefix_digits$}");
    match cfg.length_encoding {
        crate::LengthEncoding::Ascii => out.extend_from_slice(prefix.as_bytes()),
        crate::LengthEncoding::Bcd => out.extend_from_slice(&bcd::encode(&prefix)?),
    }

    match (def.class, value) {
        (DataClass::Binary, FieldValue::Binary(bytes)) => out.extend_from_slice(bytes),
        (DataClass::Binary, FieldValue::Text(_)) => {
            return Err(CodecError::WrongValueKind {
                field,
                expected: "binary",
            })
        }
        (DataClass::Numeric, _) => {
            let text = expect_text(field, value)?;
            expect_digits(text)?;
            match effective_encoding(def, cfg) {
                FieldEncoding::Bcd => out.extend_from_slice(&bcd::encode(text)?),
                FieldEncoding::Ascii | FieldEncoding::Binary => {
                    out.extend_from_slice(text.as_bytes())
                }
            }
        }
        (_, _) => {
            let text = expect_text(field, value)?;
            expect_ascii(field, text)?;
            out.extend_from_slice(text.as_bytes());
        }
    }
    Ok(())
}

/// Decode one field at `offset`, advancing it past the consumed bytes.
pub fn decode(
    field: u8,
    def: &FieldDefinition,
    data: &[u8],
    offset: &mut usize,
    cfg: &WireConfig,
) -> CodecResult<FieldValue> {
    match def.format {
        FieldFormat::Fixed => decode_body(field, def, def.max_length, data, offset, cfg),
        FieldFormat::Llvar => decode_var(field, def, data, offset, cfg, 2),
        FieldFormat::Lllvar => decode_var(field, def, data, offset, cfg, 3),
    }
}

fn decode_var(
    field: u8,
    def: &FieldDefinition,
    data: &[u8],
    offset: &mut usize,
    cfg: &WireConfig,
    prefix_digits: usize,
) -> CodecResult<FieldValue> {
    let prefix = match cfg.length_encoding {
        crate::LengthEncoding::Ascii => {
            let bytes = take(data, offset, prefix_digits)?;
            ascii_string(field, bytes)?
        }
        crate::LengthEncoding::Bcd => {
            let bytes = take(data, offset, prefix_digits.div_ceil(2))?;
            bcd::decode(bytes, prefix_digits)
                .map_err(|_| CodecError::BadLengthPrefix { field })?
        }
    };
    let length: usize = prefix
        .parse()
        .map_err(|_| CodecError::BadLengthPrefix { field })?;
    if length > def.max_length {
        return Err(CodecError::FieldTooLong {
            field,
            actual: length,
            max: def.max_length,
        });
    }
    decode_body(field, def, length, data, offset, cfg)
}

fn decode_body(
    field: u8,
    def: &FieldDefinition,
    length: usize,
    data: &[u8],
    offset: &mut usize,
    cfg: &WireConfig,
) -> CodecResult<FieldValue> {
    match def.class {
        DataClass::Binary => {
            let bytes = take(data, offset, length)?;
            Ok(FieldValue::Binary(bytes.to_vec()))
        }
        DataClass::Numeric => match effective_encoding(def, cfg) {
            FieldEncoding::Bcd => {
                let bytes = take(data, offset, length.div_ceil(2))?;
                Ok(FieldValue::Text(bcd::decode(bytes, length)?))
            }
            FieldEncoding::Ascii | FieldEncoding::Binary => {
                let bytes = take(data, offset, length)?;
                let text = ascii_string(field, bytes)?;
                expect_digits(&text)?;
                Ok(FieldValue::Text(text))
            }
        },
        DataClass::AlphaNum | DataClass::AlphaNumSymbol => {
            let bytes = take(data, offset, length)?;
            Ok(FieldValue::Text(ascii_string(field, bytes)?))
        }
    }
}

fn pad_numeric(value: &str, width: usize) -> String {
    if value.len() >= width {
        // Keep the low-order digits.
        value[value.len() - width..].to_string()
    } else {
        format!("{value:0>width$}")
    }
}

fn pad_text(value: &str, width: usize) -> String {
    if value.len() >= width {
        value[..width].to_string()
    } else {
        format!("{value:<width$}")
    }
}

fn take<'a>(data: &'a [u8], offset: &mut usize, need: usize) -> CodecResult<&'a [u8]> {
    let got = data.len().saturating_sub(*offset);
    if got < need {
        return Err(CodecError::Truncated {
            offset: *offset,
            need,
            got,
        });
    }
    let slice = &data[*offset..*offset + need];
    *offset += need;
    Ok(slice)
}

fn ascii_string(field: u8, bytes: &[u8]) -> CodecResult<String> {
    if !bytes.is_ascii() {
        return Err(CodecError::NonAscii { field });
    }
    Ok(bytes.iter().map(|&b| b as char).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::definition;
    use crate::LengthEncoding;

    fn encode_one(field: u8, value: &FieldValue, cfg: &WireConfig) -> CodecResult<Vec<u8>> {
        let def = definition(field)?;
        let mut out = Vec::new();
        encode_into(field, &def, value, cfg, &mut out)?;
        Ok(out)
    }

    fn decode_one(field: u8, data: &[u8], cfg: &WireConfig) -> CodecResult<(FieldValue, usize)> {
        let def = definition(field)?;
        let mut offset = 0;
        let value = decode(field, &def, data, &mut offset, cfg)?;
        Ok((value, offset))
    }

    #[test]
    fn fixed_bcd_numeric_is_zero_padded_left() {
        let cfg = WireConfig::default();
        // STAN: fixed 6-digit BCD -> 3 bytes.
        let bytes = encode_one(11, &FieldValue::text("42"), &cfg).unwrap();
        assert_eq!(bytes, vec![0x00, 0x00, 0x42]);
        let (value, used) = decode_one(11, &bytes, &cfg).unwrap();
        assert_eq!(value, FieldValue::text("000042"));
        assert_eq!(used, 3);
    }

    #[test]
    fn fixed_numeric_truncates_from_the_left() {
        let cfg = WireConfig::default();
        // 8 digits into a 6-digit field keeps the low-order 6.
        let bytes = encode_one(11, &FieldValue::text("12345678"), &cfg).unwrap();
        assert_eq!(bytes, vec![0x34, 0x56, 0x78]);
    }

    #[test]
    fn fixed_text_pads_right_and_truncates_right() {
        let cfg = WireConfig::default();
        // Response code: fixed 2 ASCII characters.
        assert_eq!(encode_one(39, &FieldValue::text("0"), &cfg).unwrap(), b"0 ");
        assert_eq!(
            encode_one(39, &FieldValue::text("123"), &cfg).unwrap(),
            b"12"
        );
    }

    #[test]
    fn fixed_binary_requires_exact_length() {
        let cfg = WireConfig::default();
        let err = encode_one(128, &FieldValue::binary(vec![0u8; 8]), &cfg).unwrap_err();
        assert_eq!(
            err,
            CodecError::FixedLengthMismatch {
                field: 128,
                expected: 16,
                actual: 8
            }
        );
        let bytes = encode_one(128, &FieldValue::binary(vec![0xAB; 16]), &cfg).unwrap();
        assert_eq!(bytes.len(), 16);
    }

    #[test]
    fn llvar_bcd_prefix_is_one_byte() {
        let cfg = WireConfig::default();
        // PAN: LLVAR BCD, 16 digits -> prefix 0x16, body 8 bytes.
        let bytes = encode_one(2, &FieldValue::text("0000950000000000"), &cfg).unwrap();
        assert_eq!(bytes[0], 0x16);
        assert_eq!(bytes.len(), 1 + 8);
        let (value, _) = decode_one(2, &bytes, &cfg).unwrap();
        assert_eq!(value, FieldValue::text("0000950000000000"));
    }

    #[test]
    fn llvar_ascii_prefix_is_two_digits() {
        let cfg = WireConfig::ascii_lengths();
        let bytes = encode_one(103, &FieldValue::text("2001070006085"), &cfg).unwrap();
        assert_eq!(&bytes[..2], b"13");
        assert_eq!(&bytes[2..], b"2001070006085");
    }

    #[test]
    fn lllvar_bcd_prefix_pads_leading_nibble() {
        let cfg = WireConfig::default();
        let payload = "x".repeat(999);
        let bytes = encode_one(112, &FieldValue::text(payload.clone()), &cfg).unwrap();
        assert_eq!(&bytes[..2], &[0x09, 0x99]);
        let (value, used) = decode_one(112, &bytes, &cfg).unwrap();
        assert_eq!(value, FieldValue::text(payload));
        assert_eq!(used, 2 + 999);
    }

    #[test]
    fn var_field_rejects_overflow() {
        let cfg = WireConfig::default();
        let err = encode_one(2, &FieldValue::text("1".repeat(20)), &cfg).unwrap_err();
        assert_eq!(
            err,
            CodecError::FieldTooLong {
                field: 2,
                actual: 20,
                max: 19
            }
        );
    }

    #[test]
    fn truncated_body_reports_offsets() {
        let cfg = WireConfig::default();
        // LLVAR prefix claims 10 digits but only 2 body bytes follow.
        let err = decode_one(2, &[0x10, 0x12, 0x34], &cfg).unwrap_err();
        assert_eq!(
            err,
            CodecError::Truncated {
                offset: 1,
                need: 5,
                got: 2
            }
        );
    }

    #[test]
    fn bad_length_prefix_is_rejected() {
        let cfg = WireConfig::ascii_lengths();
        let err = decode_one(2, b"xx1234", &cfg).unwrap_err();
        assert_eq!(err, CodecError::BadLengthPrefix { field: 2 });
    }

    #[test]
    fn ascii_data_mode_overrides_numeric_packing() {
        let cfg = WireConfig {
            data_encoding: DataEncodingMode::Ascii,
            length_encoding: LengthEncoding::Bcd,
        };
        let bytes = encode_one(11, &FieldValue::text("094906"), &cfg).unwrap();
        assert_eq!(bytes, b"094906");
        let (value, _) = decode_one(11, &bytes, &cfg).unwrap();
        assert_eq!(value, FieldValue::text("094906"));
    }
}
