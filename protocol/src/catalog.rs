//! Static NPSB field catalog.
//!
//! The closed contract between endpoints: field number -> format, data
//! encoding, maximum length, and data class. Unknown field numbers are a
//! hard error everywhere in the codec.

use crate::{CodecError, CodecResult};

/// Field layout on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    /// Exactly `max_length` digits/characters/bytes.
    Fixed,
    /// 2-digit length indicator, then up to `max_length` units of data.
    Llvar,
    /// 3-digit length indicator, then up to `max_length` units of data.
    Lllvar,
}

/// Data encoding of the field body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// Packed decimal, two digits per byte.
    Bcd,
    /// One byte per character.
    Ascii,
    /// Opaque bytes.
    Binary,
}

/// Data class, governing padding direction and pad character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataClass {
    /// Digits only; zero-padded on the left.
    Numeric,
    /// Alphanumeric; space-padded on the right.
    AlphaNum,
    /// Alphanumeric plus symbols; space-padded on the right.
    AlphaNumSymbol,
    /// Raw bytes; never padded.
    Binary,
}

/// One immutable catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDefinition {
    pub format: FieldFormat,
    pub encoding: FieldEncoding,
    /// Digit count for numeric, character count for text, byte count for binary.
    pub max_length: usize,
    pub class: DataClass,
    pub name: &'static str,
}

/// Look up a field definition, failing on unknown numbers.
pub fn definition(field: u8) -> CodecResult<FieldDefinition> {
    lookup(field).ok_or(CodecError::UnknownField(field))
}

/// Whether `field` exists in the catalog.
pub fn is_known(field: u8) -> bool {
    lookup(field).is_some()
}

const fn entry(
    format: FieldFormat,
    encoding: FieldEncoding,
    max_length: usize,
    class: DataClass,
    name: &'static str,
) -> FieldDefinition {
    FieldDefinition {
        format,
        encoding,
        max_length,
        class,
        name,
    }
}

fn lookup(field: u8) -> Option<FieldDefinition> {
    use DataClass::{AlphaNum, AlphaNumSymbol, Numeric};
    use FieldEncoding::{Ascii, Bcd, Binary};
    use FieldFormat::{Fixed, Llvar, Lllvar};

    Some(match field {
        2 => entry(Llvar, Bcd, 19, Numeric, "Primary Account Number"),
        3 => entry(Fixed, Bcd, 6, Numeric, "Processing Code"),
        4 => entry(Fixed, Bcd, 12, Numeric, "Transaction Amount"),
        5 => entry(Fixed, Bcd, 12, Numeric, "Settlement Amount"),
        6 => entry(Fixed, Bcd, 12, Numeric, "Billing Amount"),
        7 => entry(Fixed, Bcd, 10, Numeric, "Transmission Date/Time"),
        10 => entry(Fixed, Bcd, 8, Numeric, "Conversion Rate"),
        11 => entry(Fixed, Bcd, 6, Numeric, "System Trace Audit Number"),
        12 => entry(Fixed, Bcd, 6, Numeric, "Local Time"),
        13 => entry(Fixed, Bcd, 4, Numeric, "Local Date"),
        18 => entry(Fixed, Bcd, 4, Numeric, "Merchant Type"),
        19 => entry(Fixed, Bcd, 3, Numeric, "Acquirer Country"),
        22 => entry(Fixed, Bcd, 3, Numeric, "POS Entry Mode"),
        25 => entry(Fixed, Bcd, 2, Numeric, "POS Condition"),
        32 => entry(Llvar, Bcd, 11, Numeric, "Acquirer ID"),
        35 => entry(Llvar, Ascii, 37, AlphaNum, "Track 2 Data"),
        37 => entry(Fixed, Ascii, 12, AlphaNum, "Retrieval Reference Number"),
        38 => entry(Fixed, Ascii, 6, AlphaNum, "Authorization ID"),
        39 => entry(Fixed, Ascii, 2, AlphaNum, "Response Code"),
        41 => entry(Fixed, Ascii, 8, AlphaNumSymbol, "Terminal ID"),
        42 => entry(Fixed, Ascii, 15, AlphaNumSymbol, "Card Acceptor ID"),
        43 => entry(Fixed, Ascii, 40, AlphaNumSymbol, "Card Acceptor Name/Location"),
        46 => entry(Lllvar, Ascii, 999, AlphaNumSymbol, "NPSB Proprietary 46"),
        47 => entry(Lllvar, Ascii, 999, AlphaNumSymbol, "NPSB Proprietary 47"),
        48 => entry(Lllvar, Ascii, 999, AlphaNumSymbol, "NPSB Proprietary 48"),
        49 => entry(Fixed, Bcd, 3, Numeric, "Transaction Currency"),
        50 => entry(Fixed, Ascii, 3, AlphaNum, "Settlement Currency"),
        51 => entry(Fixed, Ascii, 3, AlphaNum, "Billing Currency"),
        52 => entry(Fixed, Binary, 16, DataClass::Binary, "PIN Data"),
        53 => entry(Fixed, Binary, 16, DataClass::Binary, "Security Control Info"),
        54 => entry(Lllvar, Ascii, 120, AlphaNumSymbol, "Additional Amounts"),
        70 => entry(Fixed, Bcd, 3, Numeric, "Network Management Info Code"),
        103 => entry(Llvar, Ascii, 104, AlphaNumSymbol, "Account ID 2"),
        112 => entry(Lllvar, Ascii, 999, AlphaNum, "Additional Info"),
        125 => entry(Lllvar, Ascii, 999, AlphaNumSymbol, "NPSB Proprietary 125"),
        128 => entry(
            Fixed,
            Binary,
            16,
            DataClass::Binary,
            "Message Authentication Code",
        ),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_fields_resolve() {
        let pan = definition(2).unwrap();
        assert_eq!(pan.format, FieldFormat::Llvar);
        assert_eq!(pan.encoding, FieldEncoding::Bcd);
        assert_eq!(pan.max_length, 19);

        let stan = definition(11).unwrap();
        assert_eq!(stan.format, FieldFormat::Fixed);
        assert_eq!(stan.max_length, 6);

        let mac = definition(128).unwrap();
        assert_eq!(mac.encoding, FieldEncoding::Binary);
        assert_eq!(mac.class, DataClass::Binary);
    }

    #[test]
    fn unknown_fields_are_hard_errors() {
        for field in [0u8, 1, 8, 9, 64, 65, 99, 127] {
            assert_eq!(definition(field).unwrap_err(), CodecError::UnknownField(field));
        }
    }

    #[test]
    fn secondary_bitmap_fields_present() {
        for field in [70, 103, 112, 125, 128] {
            assert!(is_known(field));
        }
    }
}
