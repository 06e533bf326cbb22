//! Codec round-trip and boundary laws.

use npsb_protocol::{
    build_bitmap, parse_bitmap, FieldValue, Message, MessageBuilder, WireConfig,
};
use std::collections::BTreeSet;

fn sample_0100() -> Message {
    MessageBuilder::new("0100")
        .field(2, "0000950000000000")
        .field(3, "400000")
        .field(4, "000015600000")
        .field(7, "0701094906")
        .field(11, "094906")
        .field(37, "000000009505")
        .field(41, "ATM00001")
        .field(49, "050")
        .field(103, "2001070006085")
        .build()
        .unwrap()
}

#[test]
fn encode_decode_is_identity_for_catalog_conformant_messages() {
    for cfg in [WireConfig::bcd_lengths(), WireConfig::ascii_lengths()] {
        let msg = sample_0100();
        let bytes = msg.encode(&cfg).unwrap();
        let decoded = Message::decode(&bytes, &cfg).unwrap();
        assert_eq!(decoded, msg);
    }
}

#[test]
fn text_fields_round_trip_modulo_space_padding() {
    let cfg = WireConfig::default();
    let mut msg = Message::new("0110").unwrap();
    msg.set_field(39, "00").unwrap();
    // Terminal ID is 8 characters; shorter values come back space-padded.
    msg.set_field(41, "ATM1").unwrap();
    let bytes = msg.encode(&cfg).unwrap();
    let decoded = Message::decode(&bytes, &cfg).unwrap();
    assert_eq!(decoded.field_text(41), Some("ATM1    "));
    assert_eq!(decoded.field_text(41).map(str::trim_end), Some("ATM1"));
}

#[test]
fn bitmap_round_trip_over_field_subsets() {
    let subsets: [&[u8]; 6] = [
        &[2],
        &[2, 3, 4, 11],
        &[64],
        &[65],
        &[2, 63, 64, 65, 127, 128],
        &[70, 103, 112, 125, 128],
    ];
    for subset in subsets {
        let present: BTreeSet<u8> = subset.iter().copied().collect();
        assert_eq!(parse_bitmap(&build_bitmap(&present)), present);
    }
}

#[test]
fn single_field_above_64_forces_sixteen_byte_bitmap() {
    let present: BTreeSet<u8> = [11u8, 70].into_iter().collect();
    let bitmap = build_bitmap(&present);
    assert_eq!(bitmap.len(), 16);
    assert_eq!(bitmap[0] & 0x80, 0x80);
}

#[test]
fn no_field_above_64_keeps_eight_byte_bitmap() {
    let present: BTreeSet<u8> = [2u8, 11, 39].into_iter().collect();
    let bitmap = build_bitmap(&present);
    assert_eq!(bitmap.len(), 8);
    assert_eq!(bitmap[0] & 0x80, 0);
}

#[test]
fn llvar_length_99_boundary() {
    // Account ID 2 accepts up to 104 characters; a 99-character value
    // exercises the widest two-digit prefix.
    let value = "9".repeat(99);

    let ascii = WireConfig::ascii_lengths();
    let mut msg = Message::new("0100").unwrap();
    msg.set_field(103, value.clone()).unwrap();
    let bytes = msg.encode(&ascii).unwrap();
    // MTI(4) + secondary bitmap(16) precede field 103.
    assert_eq!(&bytes[20..22], b"99");

    let bcd = WireConfig::bcd_lengths();
    let bytes = msg.encode(&bcd).unwrap();
    assert_eq!(bytes[20], 0x99);
    assert_eq!(Message::decode(&bytes, &bcd).unwrap().field_text(103), Some(value.as_str()));
}

#[test]
fn lllvar_length_999_boundary() {
    let value = "z".repeat(999);

    let ascii = WireConfig::ascii_lengths();
    let mut msg = Message::new("0100").unwrap();
    msg.set_field(112, value.clone()).unwrap();
    let bytes = msg.encode(&ascii).unwrap();
    assert_eq!(&bytes[20..23], b"999");

    let bcd = WireConfig::bcd_lengths();
    let bytes = msg.encode(&bcd).unwrap();
    assert_eq!(&bytes[20..22], &[0x09, 0x99]);
    assert_eq!(Message::decode(&bytes, &bcd).unwrap().field_text(112), Some(value.as_str()));
}

#[test]
fn binary_fields_are_copied_opaquely() {
    let cfg = WireConfig::default();
    let mac: Vec<u8> = (0u8..16).collect();
    let mut msg = Message::new("0210").unwrap();
    msg.set_field(39, "00").unwrap();
    msg.set_field(128, FieldValue::binary(mac.clone())).unwrap();
    let bytes = msg.encode(&cfg).unwrap();
    let decoded = Message::decode(&bytes, &cfg).unwrap();
    assert_eq!(decoded.field(128), Some(&FieldValue::binary(mac)));
}

#[test]
fn length_encoding_modes_differ_only_in_prefix() {
    let msg = sample_0100();
    let bcd_bytes = msg.encode(&WireConfig::bcd_lengths()).unwrap();
    let ascii_bytes = msg.encode(&WireConfig::ascii_lengths()).unwrap();
    // Two LLVAR fields (2 and 103): BCD prefixes are one byte each,
    // ASCII prefixes two bytes each.
    assert_eq!(ascii_bytes.len(), bcd_bytes.len() + 2);
    assert_eq!(
        Message::decode(&bcd_bytes, &WireConfig::bcd_lengths()).unwrap(),
        Message::decode(&ascii_bytes, &WireConfig::ascii_lengths()).unwrap()
    );
}
