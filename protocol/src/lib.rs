//! # NPSB Protocol - ISO 8583:1993 Wire Codec
//!
//! Length-prefixed, bitmap-directed binary message format for the NPSB
//! national payments profile. The codec is layered bottom-up:
//!
//! - [`bcd`] - packed-decimal digit pack/unpack
//! - [`catalog`] - the static field number -> definition table
//! - [`field`] - per-field encode/decode (fixed, LLVAR, LLLVAR)
//! - [`message`] - MTI + bitmap(s) + ordered field assembly
//! - [`framing`] - `u16_be length | payload` TCP stream reassembly
//! - [`builder`] - fluent [`Message`] construction
//!
//! ## Wire format
//!
//! ```text
//! | MTI (4 ASCII digits) | bitmap (8 or 16 bytes) | fields ascending |
//! ```
//!
//! Bitmap bit `k` (MSB-first per byte) marks field `k+1` present; bit 0 of
//! byte 0 marks the 8-byte secondary bitmap. Field data is BCD, ASCII, or
//! opaque binary per the catalog; variable-length fields carry a 2- or
//! 3-digit length indicator whose encoding is chosen by [`WireConfig`],
//! independently of the field's own data encoding.
//!
//! Parsing is allocation-light and bounds-checked at every step; all
//! failure modes are reported through [`CodecError`] with offset context.

pub mod bcd;
pub mod builder;
pub mod catalog;
pub mod field;
pub mod framing;
pub mod message;

pub use builder::MessageBuilder;
pub use catalog::{definition, DataClass, FieldDefinition, FieldEncoding, FieldFormat};
pub use field::FieldValue;
pub use framing::{encode_frame, FrameBuffer};
pub use message::{build_bitmap, parse_bitmap, Message};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codec errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("non-numeric character {ch:?} in numeric value")]
    NonNumeric { ch: char },

    #[error("invalid BCD nibble 0x{nibble:X} at byte offset {offset}")]
    InvalidBcdNibble { nibble: u8, offset: usize },

    #[error("BCD value decoded to {got} digits, expected {expected}")]
    BcdTooShort { expected: usize, got: usize },

    #[error("unknown field number {0}")]
    UnknownField(u8),

    #[error("field 1 is reserved for the bitmap extension")]
    ReservedField,

    #[error("field {field} length {actual} exceeds maximum {max}")]
    FieldTooLong { field: u8, actual: usize, max: usize },

    #[error("field {field} expects exactly {expected} bytes, got {actual}")]
    FixedLengthMismatch {
        field: u8,
        expected: usize,
        actual: usize,
    },

    #[error("field {field} expects a {expected} value")]
    WrongValueKind { field: u8, expected: &'static str },

    #[error("message truncated at offset {offset}: need {need} bytes, {got} available")]
    Truncated {
        offset: usize,
        need: usize,
        got: usize,
    },

    #[error("unparseable length prefix for field {field}")]
    BadLengthPrefix { field: u8 },

    #[error("field {field} is not valid ASCII")]
    NonAscii { field: u8 },

    #[error("invalid MTI {0:?}: expected 4 ASCII digits")]
    InvalidMti(String),

    #[error("{0} trailing bytes after the last bitmap field")]
    TrailingBytes(usize),

    #[error("frame payload of {0} bytes exceeds the u16 length prefix")]
    FrameTooLarge(usize),
}

/// Result type for codec operations
pub type CodecResult<T> = std::result::Result<T, CodecError>;

/// Encoding of the 2/3-digit LLVAR/LLLVAR length indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthEncoding {
    /// 2 or 3 ASCII digits.
    Ascii,
    /// BCD-packed: 1 byte for LLVAR, 2 bytes (leading zero nibble) for LLLVAR.
    #[default]
    Bcd,
}

/// Process-wide override for numeric field data encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataEncodingMode {
    /// Each field uses its catalog encoding.
    #[default]
    Catalog,
    /// Numeric fields are forced to ASCII digits on the wire.
    Ascii,
    /// Numeric fields are forced to packed BCD on the wire.
    Bcd,
}

/// Process-wide encoder mode.
///
/// The NPSB switch default keeps field data per the catalog and packs
/// length indicators as BCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    pub data_encoding: DataEncodingMode,
    pub length_encoding: LengthEncoding,
}

impl WireConfig {
    /// Catalog data encodings with ASCII length indicators.
    pub const fn ascii_lengths() -> Self {
        Self {
            data_encoding: DataEncodingMode::Catalog,
            length_encoding: LengthEncoding::Ascii,
        }
    }

    /// Catalog data encodings with BCD length indicators (switch default).
    pub const fn bcd_lengths() -> Self {
        Self {
            data_encoding: DataEncodingMode::Catalog,
            length_encoding: LengthEncoding::Bcd,
        }
    }
}
