//! Recursive MIME parsing: multipart descent, attachment collection, and
//! text/html extraction into a single [`MailContent`] value.

use tracing::debug;

use crate::model::attachment::Attachment;
use crate::model::content::MailContent;
use crate::model::headers::Headers;

use super::decode;
use super::headers::{parse_headers, split_message};

/// Maximum depth for recursive multipart descent. Parts nested deeper are
/// treated as opaque leaves so adversarial nesting cannot blow the stack.
const MAX_DEPTH: usize = 10;

/// Parse a raw message body against its (already sanitized) headers.
///
/// This function is total: it never fails. Whatever goes wrong inside, the
/// caller receives a well-formed [`MailContent`], degraded at worst to the
/// raw text after the first blank-line split.
pub fn parse_message(raw: &[u8], headers: &Headers) -> MailContent {
    let mut content = parse_part(raw, headers, 0).unwrap_or_else(|| raw_fallback(raw));
    content.normalize();
    content
}

/// Parse one part (the whole message at depth 0). `None` signals the raw
/// fallback; recursion levels above interpret it the same way.
fn parse_part(raw: &[u8], headers: &Headers, depth: usize) -> Option<MailContent> {
    let content_type = headers.get("content-type").unwrap_or("text/plain");
    let charset = header_param(content_type, "charset").unwrap_or_default();

    if content_type.to_lowercase().contains("multipart") && depth < MAX_DEPTH {
        let boundary = header_param(content_type, "boundary")?;
        debug!(depth, %boundary, "descending into multipart");
        Some(parse_multipart(raw, &boundary, &charset, depth))
    } else {
        // At depth 0 the raw bytes still carry the header block; parts
        // handed down from a multipart arrive pre-split.
        let body = if depth == 0 { split_message(raw).1 } else { raw };
        let transfer_encoding = headers.get("content-transfer-encoding").unwrap_or("");
        Some(parse_leaf(body, content_type, &charset, transfer_encoding))
    }
}

/// Walk the segments between boundary markers and merge each child's
/// result into one value.
fn parse_multipart(body: &[u8], boundary: &str, parent_charset: &str, depth: usize) -> MailContent {
    let mut merged = MailContent::default();
    let delimiter = format!("--{boundary}");
    let segments = split_on(body, delimiter.as_bytes());

    // segments[0] is the preamble before the first boundary; a segment
    // opening with "--" is past the terminating marker. A final segment
    // with no following boundary line is an unterminated tail: dropped.
    for (index, segment) in segments.iter().enumerate().skip(1) {
        if segment.starts_with(b"--") {
            break;
        }
        if index == segments.len() - 1 {
            debug!(depth, "multipart missing terminating boundary, ignoring tail");
            break;
        }

        let segment = trim_leading_newline(segment);
        let (head, part_body) = split_message(segment);
        // The newline before the next boundary marker belongs to the
        // delimiter, not to the part content.
        let part_body = trim_trailing_newline(part_body);
        let part_headers = parse_headers(head);
        let part_type = part_headers.get("content-type").unwrap_or("text/plain");
        let disposition = part_headers.get("content-disposition").unwrap_or("");

        if part_type.to_lowercase().contains("multipart") {
            if let Some(child) = parse_part(part_body, &part_headers, depth + 1) {
                merged.merge(child);
            }
        } else if is_attachment_part(part_type, disposition) {
            merged
                .attachments
                .push(build_attachment(part_body, &part_headers, part_type, disposition));
        } else {
            let part_charset = header_param(part_type, "charset")
                .unwrap_or_else(|| parent_charset.to_string());
            let transfer_encoding = part_headers.get("content-transfer-encoding").unwrap_or("");
            merged.merge(parse_leaf(part_body, part_type, &part_charset, transfer_encoding));
        }
    }

    merged
}

/// Decode a single non-multipart body as text or HTML.
fn parse_leaf(body: &[u8], content_type: &str, charset: &str, transfer_encoding: &str) -> MailContent {
    let decoded = decode::decode_body(body, charset, transfer_encoding);

    let mut content = MailContent::default();
    if content_type.to_lowercase().contains("text/html") {
        content.push_html(&decoded);
    } else {
        content.push_text(&decoded);
    }
    content
}

/// A part is an attachment when its disposition says so, or its media type
/// is `image/*` or `application/*`.
fn is_attachment_part(content_type: &str, disposition: &str) -> bool {
    let ct = content_type.to_lowercase();
    disposition.to_lowercase().contains("attachment")
        || ct.starts_with("image/")
        || ct.starts_with("application/")
}

/// Record an attachment, body still in wire form.
fn build_attachment(
    body: &[u8],
    headers: &Headers,
    content_type: &str,
    disposition: &str,
) -> Attachment {
    let filename = header_param(disposition, "filename")
        .or_else(|| header_param(content_type, "name"))
        .unwrap_or_else(|| "attachment".to_string());

    Attachment {
        filename,
        content_type: primary_type(content_type),
        size: body.len() as u64,
        content: body.to_vec(),
        headers: headers.clone(),
    }
}

/// Fallback for an unparseable message: everything after the first blank
/// line becomes `text`, with empty `html` and no attachments.
fn raw_fallback(raw: &[u8]) -> MailContent {
    let (_, body) = split_message(raw);
    MailContent {
        text: String::from_utf8_lossy(body).into_owned(),
        ..Default::default()
    }
}

/// Extract a `name=value` parameter from a structured header value,
/// stripping surrounding quotes. Matching is case-insensitive.
pub fn header_param(value: &str, name: &str) -> Option<String> {
    let lower = value.to_lowercase();
    let needle = format!("{name}=");
    let start = lower.find(&needle)? + needle.len();
    let rest = &value[start..];

    let param = if let Some(stripped) = rest.strip_prefix('"') {
        stripped.split('"').next().unwrap_or("")
    } else {
        rest.split([';', ' ', '\t']).next().unwrap_or("")
    };

    let param = param.trim();
    if param.is_empty() {
        None
    } else {
        Some(param.to_string())
    }
}

/// The media type of a header value: everything before the first `;`.
pub fn primary_type(value: &str) -> String {
    value.split(';').next().unwrap_or("").trim().to_string()
}

/// Split `haystack` on every occurrence of `needle`. The pieces do not
/// include the needle itself; a leading match yields an empty first piece.
fn split_on<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    if needle.is_empty() {
        return vec![haystack];
    }
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            pieces.push(&haystack[start..i]);
            i += needle.len();
            start = i;
        } else {
            i += 1;
        }
    }
    pieces.push(&haystack[start..]);
    pieces
}

fn trim_leading_newline(segment: &[u8]) -> &[u8] {
    if let Some(rest) = segment.strip_prefix(b"\r\n") {
        rest
    } else if let Some(rest) = segment.strip_prefix(b"\n") {
        rest
    } else {
        segment
    }
}

fn trim_trailing_newline(segment: &[u8]) -> &[u8] {
    if let Some(rest) = segment.strip_suffix(b"\r\n") {
        rest
    } else if let Some(rest) = segment.strip_suffix(b"\n") {
        rest
    } else {
        segment
    }
}
