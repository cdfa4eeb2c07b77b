//! Safety-net adapter around `mail-parser` for messages the primary parser
//! extracts nothing from.

use mail_parser::{MessageParser, MimeHeaders};
use tracing::debug;

use crate::model::attachment::Attachment;
use crate::model::content::MailContent;
use crate::model::headers::Headers;

/// Parse the entire original raw message with `mail-parser` and normalize
/// its output into the primary parser's shape.
///
/// Called exactly once, only when the primary parse came back completely
/// empty. Its output replaces (never merges with) the primary result.
pub fn parse_with_fallback(raw: &[u8]) -> MailContent {
    let parser = MessageParser::default();
    let Some(msg) = parser.parse(raw) else {
        debug!("fallback parser could not parse message either");
        return MailContent::default();
    };

    let mut content = MailContent::default();
    if let Some(text) = msg.body_text(0) {
        content.push_text(&text);
    }
    if let Some(html) = msg.body_html(0) {
        content.push_html(&html);
    }

    for (idx, part) in msg.attachments().enumerate() {
        let filename = part
            .attachment_name()
            .map(String::from)
            .unwrap_or_else(|| format!("attachment_{idx}"));

        let content_type = part
            .content_type()
            .map(|ct| match ct.subtype() {
                Some(sub) => format!("{}/{}", ct.ctype(), sub),
                None => ct.ctype().to_string(),
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        // mail-parser has already transfer-decoded the bytes, so the part
        // headers carry no Content-Transfer-Encoding and the resolver will
        // serve the content as-is.
        let mut headers = Headers::new();
        headers.insert("content-type", &content_type);
        if let Some(cid) = part.content_id() {
            headers.insert("content-id", cid);
        }
        headers.sanitize();

        let bytes = part.contents().to_vec();
        content.attachments.push(Attachment {
            filename,
            content_type,
            size: bytes.len() as u64,
            content: bytes,
            headers,
        });
    }

    content.normalize();
    content
}
