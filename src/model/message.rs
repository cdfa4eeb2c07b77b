//! Message shapes exchanged with the caller (the HTTP layer of the portal).

use serde::{Deserialize, Serialize};

use super::attachment::Attachment;
use super::headers::Headers;

/// One row of a folder listing: sequence number plus the sanitized header
/// fields the listing shows (`from`, `to`, `subject`, `date`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Session-local positional identifier within the folder.
    pub seqno: u32,
    pub headers: Headers,
}

/// A fully fetched and parsed message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedMessage {
    pub seqno: u32,
    /// Sanitized top-level headers.
    pub headers: Headers,
    pub text: String,
    pub html: String,
    /// Serialized as `{filename, content_type, size}` only; the bytes are
    /// served through the attachment endpoint.
    pub attachments: Vec<Attachment>,
}

/// A resolved attachment ready to stream back to the caller.
#[derive(Debug, Clone)]
pub struct AttachmentContent {
    /// Filename made safe for a `Content-Disposition` response header.
    pub filename: String,
    pub content_type: String,
    /// Fully decoded bytes.
    pub data: Vec<u8>,
}

/// An outgoing message as composed by the portal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: String,
    pub html: String,
    pub attachments: Vec<OutgoingAttachment>,
}

/// An attachment to include in an outgoing message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingAttachment {
    pub filename: String,
    pub content_type: String,
    #[serde(with = "serde_bytes_base64")]
    pub data: Vec<u8>,
}

/// Result of a send operation. `archived` is best-effort: a failed copy into
/// the Sent folder never fails the send itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    pub message_id: String,
    pub archived: bool,
}

/// Attachment payloads cross the JSON boundary as base64 strings.
mod serde_bytes_base64 {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
