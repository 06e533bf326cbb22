//! Fluent [`Message`] construction.
//!
//! Validation is deferred to [`MessageBuilder::build`] so call sites can
//! chain fields without intermediate `Result` handling.

use crate::field::FieldValue;
use crate::message::Message;
use crate::CodecResult;

/// Builder for [`Message`] values.
///
/// ```
/// use npsb_protocol::MessageBuilder;
///
/// let msg = MessageBuilder::new("0800")
///     .field(11, "000001")
///     .field(70, "301")
///     .build()
///     .unwrap();
/// assert_eq!(msg.field_text(70), Some("301"));
/// ```
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    mti: String,
    fields: Vec<(u8, FieldValue)>,
}

impl MessageBuilder {
    pub fn new(mti: &str) -> Self {
        Self {
            mti: mti.to_string(),
            fields: Vec::new(),
        }
    }

    /// Add a text field.
    pub fn field(mut self, number: u8, value: impl Into<String>) -> Self {
        self.fields.push((number, FieldValue::Text(value.into())));
        self
    }

    /// Add a binary field.
    pub fn binary_field(mut self, number: u8, value: impl Into<Vec<u8>>) -> Self {
        self.fields
            .push((number, FieldValue::Binary(value.into())));
        self
    }

    /// Validate the MTI and every field against the catalog.
    pub fn build(self) -> CodecResult<Message> {
        let mut message = Message::new(&self.mti)?;
        for (number, value) in self.fields {
            message.set_field(number, value)?;
        }
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CodecError;

    #[test]
    fn builds_in_any_insertion_order() {
        let msg = MessageBuilder::new("0100")
            .field(37, "000000009505")
            .field(2, "0000950000000000")
            .field(11, "094906")
            .build()
            .unwrap();
        let numbers: Vec<u8> = msg.field_numbers().collect();
        assert_eq!(numbers, vec![2, 11, 37]);
    }

    #[test]
    fn surfaces_catalog_errors_at_build() {
        let err = MessageBuilder::new("0100").field(9, "1").build().unwrap_err();
        assert_eq!(err, CodecError::UnknownField(9));
    }
}
