//! Message content extraction: header decoding, charset selection,
//! recursive MIME descent, and the trusted fallback parser.

pub mod decode;
pub mod fallback;
pub mod headers;
pub mod mime;

use tracing::debug;

use crate::model::content::MailContent;
use crate::model::headers::Headers;

/// Extract a message's content as a two-step pipeline: the primary
/// recursive parser first, the `mail-parser` safety net only when the
/// primary result is completely empty.
///
/// Partial primary output is never merged with fallback output; the
/// fallback sees the entire original raw message or nothing.
pub fn extract_content(raw: &[u8], headers: &Headers) -> MailContent {
    let primary = mime::parse_message(raw, headers);
    if !primary.is_empty() {
        return primary;
    }
    debug!("primary parse empty, handing raw message to fallback parser");
    fallback::parse_with_fallback(raw)
}
