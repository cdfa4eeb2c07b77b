//! Attachment type plus Content-ID / filename resolution.
//!
//! `content` holds the part body exactly as it appeared on the wire, which
//! may still be transfer-encoded. Decoding happens in [`Attachment::materialize`]
//! when the bytes are actually served.

use base64::Engine;
use serde::{Deserialize, Serialize};

use super::headers::Headers;

/// A single attachment extracted from a message part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Filename from `Content-Disposition`, falling back to the
    /// `Content-Type` `name=` parameter, then the literal `"attachment"`.
    pub filename: String,

    /// MIME content type of the part (e.g. `"image/png"`).
    pub content_type: String,

    /// Length in bytes of the (still possibly encoded) part body.
    pub size: u64,

    /// Part body as it appeared on the wire. Not serialized; callers that
    /// need the bytes go through [`Attachment::materialize`].
    #[serde(skip)]
    pub content: Vec<u8>,

    /// The part's own headers, retained so Content-ID lookup works later.
    #[serde(skip)]
    pub headers: Headers,
}

impl Attachment {
    /// The part's `Content-ID` with surrounding angle brackets stripped.
    pub fn content_id(&self) -> Option<String> {
        self.headers
            .get("content-id")
            .map(|v| strip_brackets(v).to_string())
    }

    /// Decode the stored body into raw bytes.
    ///
    /// Base64 transfer-encoded content is decoded (whitespace stripped
    /// first); everything else is returned in its current form.
    pub fn materialize(&self) -> Vec<u8> {
        let encoding = self
            .headers
            .get("content-transfer-encoding")
            .unwrap_or("")
            .trim()
            .to_lowercase();

        if encoding == "base64" {
            let cleaned: Vec<u8> = self
                .content
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            match base64::engine::general_purpose::STANDARD.decode(&cleaned) {
                Ok(decoded) => return decoded,
                Err(e) => {
                    tracing::warn!(filename = %self.filename, error = %e,
                        "base64 decode failed, serving raw content");
                }
            }
        }
        self.content.clone()
    }
}

/// Find the attachment matching a requested Content-ID or filename.
///
/// The requested id is URL-decoded and stripped of surrounding `<`/`>`.
/// Content-ID matches (case-sensitive, brackets stripped on both sides) are
/// tried first; only when none matches is exact filename equality tried.
pub fn resolve<'a>(attachments: &'a [Attachment], requested: &str) -> Option<&'a Attachment> {
    let decoded = urlencoding::decode(requested)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| requested.to_string());
    let wanted = strip_brackets(decoded.trim());

    attachments
        .iter()
        .find(|a| a.content_id().as_deref() == Some(wanted))
        .or_else(|| attachments.iter().find(|a| a.filename == wanted))
}

fn strip_brackets(s: &str) -> &str {
    s.trim().trim_start_matches('<').trim_end_matches('>')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attachment(filename: &str, cid: Option<&str>) -> Attachment {
        let mut headers = Headers::new();
        if let Some(cid) = cid {
            headers.insert("Content-ID", cid);
        }
        Attachment {
            filename: filename.to_string(),
            content_type: "application/octet-stream".to_string(),
            size: 0,
            content: Vec::new(),
            headers,
        }
    }

    #[test]
    fn test_resolve_by_content_id() {
        let atts = vec![
            attachment("a.png", Some("<img001@mail>")),
            attachment("b.png", Some("<img002@mail>")),
        ];
        let found = resolve(&atts, "img002@mail").unwrap();
        assert_eq!(found.filename, "b.png");
    }

    #[test]
    fn test_resolve_strips_brackets_and_url_decodes() {
        let atts = vec![attachment("a.png", Some("<img 1@mail>"))];
        let found = resolve(&atts, "%3Cimg%201%40mail%3E").unwrap();
        assert_eq!(found.filename, "a.png");
    }

    #[test]
    fn test_resolve_falls_back_to_filename() {
        let atts = vec![
            attachment("report.pdf", Some("<cid1>")),
            attachment("photo.jpg", None),
        ];
        let found = resolve(&atts, "photo.jpg").unwrap();
        assert_eq!(found.filename, "photo.jpg");
    }

    #[test]
    fn test_resolve_cid_wins_over_filename() {
        // An attachment whose CID equals another attachment's filename:
        // the CID pass runs to completion before filenames are consulted.
        let atts = vec![
            attachment("other.bin", Some("<photo.jpg>")),
            attachment("photo.jpg", None),
        ];
        let found = resolve(&atts, "photo.jpg").unwrap();
        assert_eq!(found.filename, "other.bin");
    }

    #[test]
    fn test_resolve_not_found() {
        let atts = vec![attachment("a.png", None)];
        assert!(resolve(&atts, "missing").is_none());
    }

    #[test]
    fn test_materialize_base64() {
        let mut att = attachment("a.bin", None);
        att.headers.insert("Content-Transfer-Encoding", "base64");
        att.content = b"aGVs\r\nbG8=".to_vec();
        assert_eq!(att.materialize(), b"hello");
    }

    #[test]
    fn test_materialize_passthrough() {
        let mut att = attachment("a.txt", None);
        att.content = b"plain bytes".to_vec();
        assert_eq!(att.materialize(), b"plain bytes");
    }
}
