//! Network-management auto-responder.
//!
//! Any `08xx` request is answered locally, without touching an issuer.
//! The response echoes the request's timestamp, trace number, and info
//! code when present, and approves the info codes the NPSB profile
//! supports.

use chrono::Utc;
use npsb_protocol::{CodecError, CodecResult, Message};

/// Info codes (field 70) answered with response code `00`.
pub const SUPPORTED_INFO_CODES: [&str; 4] = ["001", "002", "301", "162"];

/// Whether an MTI belongs to the network-management class.
pub fn is_network_management(mti: &str) -> bool {
    mti.starts_with("08")
}

/// Response MTI: the function digit incremented (`0800 -> 0810`,
/// `0820 -> 0830`).
pub fn response_mti(mti: &str) -> CodecResult<String> {
    let bytes = mti.as_bytes();
    if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_digit()) || bytes[2] == b'9' {
        return Err(CodecError::InvalidMti(mti.to_string()));
    }
    Ok(format!(
        "{}{}{}{}",
        bytes[0] as char,
        bytes[1] as char,
        (bytes[2] + 1) as char,
        bytes[3] as char,
    ))
}

/// Build the local reply for a network-management request.
pub fn build_response(request: &Message) -> CodecResult<Message> {
    let mut response = Message::new(&response_mti(request.mti())?)?;

    match request.field_text(7) {
        Some(transmitted) => response.set_field(7, transmitted)?,
        None => response.set_field(7, now_mmddhhmmss())?,
    }
    response.set_field(11, request.field_text(11).unwrap_or("000000"))?;

    let info_code = request.field_text(70).map(str::trim);
    let approved = match info_code {
        None => true,
        Some(code) => SUPPORTED_INFO_CODES.contains(&code),
    };
    response.set_field(70, info_code.unwrap_or("000"))?;
    response.set_field(39, if approved { "00" } else { "96" })?;

    Ok(response)
}

/// Current UTC timestamp in the field 7 `MMDDhhmmss` layout.
pub(crate) fn now_mmddhhmmss() -> String {
    Utc::now().format("%m%d%H%M%S").to_string()
}
