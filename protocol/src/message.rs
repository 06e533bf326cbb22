//! MTI + bitmap + ordered field assembly.
//!
//! Serialization order is ascending by field number; primary bitmap
//! fields (<= 64) always precede secondary fields (> 64). Bit 0 of the
//! primary bitmap marks the presence of the 8-byte secondary bitmap, so
//! field 1 can never be set directly.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::definition;
use crate::field::{self, FieldValue};
use crate::{CodecError, CodecResult, WireConfig};

/// One ISO 8583 message: a 4-digit MTI and its present fields.
///
/// Transient by design - built per send, discarded after serialization
/// or dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    mti: String,
    fields: BTreeMap<u8, FieldValue>,
}

impl Message {
    /// Create an empty message, validating the MTI.
    pub fn new(mti: &str) -> CodecResult<Self> {
        if mti.len() != 4 || !mti.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::InvalidMti(mti.to_string()));
        }
        Ok(Self {
            mti: mti.to_string(),
            fields: BTreeMap::new(),
        })
    }

    pub fn mti(&self) -> &str {
        &self.mti
    }

    /// Set a field, rejecting field 1 and unknown numbers.
    pub fn set_field(&mut self, number: u8, value: impl Into<FieldValue>) -> CodecResult<()> {
        if number == 1 {
            return Err(CodecError::ReservedField);
        }
        definition(number)?;
        self.fields.insert(number, value.into());
        Ok(())
    }

    pub fn remove_field(&mut self, number: u8) -> Option<FieldValue> {
        self.fields.remove(&number)
    }

    pub fn field(&self, number: u8) -> Option<&FieldValue> {
        self.fields.get(&number)
    }

    /// Text content of a field, if present and textual.
    pub fn field_text(&self, number: u8) -> Option<&str> {
        self.fields.get(&number).and_then(FieldValue::as_text)
    }

    pub fn has_field(&self, number: u8) -> bool {
        self.fields.contains_key(&number)
    }

    /// Present field numbers in ascending order.
    pub fn field_numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.fields.keys().copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = (u8, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (*n, v))
    }

    /// Serialize: `MTI | bitmap | fields ascending`.
    pub fn encode(&self, cfg: &WireConfig) -> CodecResult<Vec<u8>> {
        let present: BTreeSet<u8> = self.fields.keys().copied().collect();
        let mut out = Vec::with_capacity(4 + 16 + self.fields.len() * 8);
        out.extend_from_slice(self.mti.as_bytes());
        out.extend_from_slice(&build_bitmap(&present));
        for (&number, value) in &self.fields {
            let def = definition(number)?;
            field::encode_into(number, &def, value, cfg, &mut out)?;
        }
        Ok(out)
    }

    /// Parse a complete message; trailing bytes are a framing error.
    pub fn decode(data: &[u8], cfg: &WireConfig) -> CodecResult<Self> {
        let mut offset = 0;

        let mti_bytes = take(data, &mut offset, 4)?;
        if !mti_bytes.iter().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::InvalidMti(
                String::from_utf8_lossy(mti_bytes).into_owned(),
            ));
        }
        let mti: String = mti_bytes.iter().map(|&b| b as char).collect();

        let primary = take(data, &mut offset, 8)?;
        let mut bitmap = primary.to_vec();
        if primary[0] & 0x80 != 0 {
            bitmap.extend_from_slice(take(data, &mut offset, 8)?);
        }

        let mut message = Self {
            mti,
            fields: BTreeMap::new(),
        };
        for number in parse_bitmap(&bitmap) {
            let def = definition(number)?;
            let value = field::decode(number, &def, data, &mut offset, cfg)?;
            message.fields.insert(number, value);
        }

        if offset != data.len() {
            return Err(CodecError::TrailingBytes(data.len() - offset));
        }
        Ok(message)
    }
}

/// Build an 8-byte bitmap, or 16 bytes with bit 0 set when any field
/// above 64 is present. Bit `(n-1)` marks field `n`.
pub fn build_bitmap(present: &BTreeSet<u8>) -> Vec<u8> {
    let extended = present.iter().any(|&n| n > 64);
    let mut bitmap = vec![0u8; if extended { 16 } else { 8 }];
    if extended {
        bitmap[0] |= 0x80;
    }
    for &number in present {
        let index = (number - 1) as usize;
        bitmap[index / 8] |= 1 << (7 - (index % 8));
    }
    bitmap
}

/// Invert [`build_bitmap`]: set bits back to field numbers, skipping the
/// secondary-bitmap indicator (field 1).
pub fn parse_bitmap(bitmap: &[u8]) -> BTreeSet<u8> {
    let mut present = BTreeSet::new();
    for (byte_index, byte) in bitmap.iter().enumerate() {
        for bit in 0..8 {
            if byte & (1 << (7 - bit)) != 0 {
                let number = (byte_index * 8 + bit + 1) as u8;
                if number > 1 {
                    present.insert(number);
                }
            }
        }
    }
    present
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
