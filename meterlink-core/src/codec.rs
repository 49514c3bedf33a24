//! Tab-delimited wire frame shared by broadcaster and receiver.
//!
//! ```text
//! <timestamp>\t<sender name>\t<v1>,<v2>,...,<vn>
//! ```
//!
//! Field order and the tab delimiter are fixed: independently updated senders
//! and receivers on the same network must keep interoperating. Tabs cannot be
//! escaped, so they are rejected in the sender name and payload.

use std::fmt;

use crate::error::FrameError;
use crate::types::{SenderName, Timestamp};

pub const FIELD_SEPARATOR: char = '\t';
pub const VALUE_SEPARATOR: &str = ",";

/// Reading reported for a source file that is missing or empty.
pub const MISSING_READING: &str = "-999.9";

/// One broadcast message. Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    timestamp: Timestamp,
    sender: SenderName,
    payload: String,
}

impl Frame {
    pub fn new(
        timestamp: Timestamp,
        sender: SenderName,
        payload: impl Into<String>,
    ) -> Result<Self, FrameError> {
        let payload = payload.into();
        check_field("sender name", sender.as_str())?;
        check_field("payload", &payload)?;
        Ok(Self {
            timestamp,
            sender,
            payload,
        })
    }

    /// Join individual readings into the comma-separated payload.
    pub fn from_readings<S: AsRef<str>>(
        timestamp: Timestamp,
        sender: SenderName,
        readings: &[S],
    ) -> Result<Self, FrameError> {
        let payload = readings
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(VALUE_SEPARATOR);
        Self::new(timestamp, sender, payload)
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    pub fn sender(&self) -> &SenderName {
        &self.sender
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn readings(&self) -> impl Iterator<Item = &str> {
        self.payload.split(VALUE_SEPARATOR)
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse one datagram body. A single trailing line ending is tolerated;
    /// line breaks inside a field still make the frame malformed.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let text = text
            .strip_suffix("\r\n")
            .or_else(|| text.strip_suffix('\n'))
            .unwrap_or(text);
        let fields: Vec<&str> = text.split(FIELD_SEPARATOR).collect();
        let [timestamp, sender, payload] = fields.as_slice() else {
            return Err(FrameError::FieldCount(fields.len()));
        };
        let timestamp: Timestamp = timestamp.parse()?;
        Self::new(timestamp, SenderName::from(*sender), *payload)
    }

    pub fn decode_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let text = std::str::from_utf8(bytes).map_err(|_| FrameError::NotUtf8)?;
        Self::decode(text)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
            self.timestamp, self.sender, self.payload
        )
    }
}

fn check_field(field: &'static str, value: &str) -> Result<(), FrameError> {
    if value.contains(|c: char| matches!(c, FIELD_SEPARATOR | '\n' | '\r')) {
        return Err(FrameError::Delimiter { field });
    }
    Ok(())
}
