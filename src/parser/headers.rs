//! Raw header block parsing: folding, RFC 2047 encoded-words, blank-line split.

use base64::Engine;
use tracing::warn;

use crate::model::headers::Headers;

/// Split a raw message into `(header_bytes, body_bytes)` at the first blank
/// line. When no blank line exists the whole input is treated as headers.
pub fn split_message(raw: &[u8]) -> (&[u8], &[u8]) {
    match find_header_end(raw) {
        Some((header_end, body_start)) => (&raw[..header_end], &raw[body_start..]),
        None => (raw, &[]),
    }
}

/// Find the byte offsets of the header/body split: `(end_of_headers,
/// start_of_body)` at the first `\n\n` or `\r\n\r\n`.
fn find_header_end(data: &[u8]) -> Option<(usize, usize)> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\r'
            && i + 3 < data.len()
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some((i, i + 4));
        }
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some((i, i + 2));
        }
    }
    None
}

/// Parse a raw header block into a [`Headers`] map.
///
/// Continuation lines (starting with space or tab) are unfolded onto the
/// previous header, names are lower-cased, and every value is sanitized
/// before it leaves this function. Lines without a colon are skipped.
pub fn parse_headers(raw: &[u8]) -> Headers {
    let text = String::from_utf8_lossy(raw);
    let mut unfolded: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = unfolded.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon) = line.find(':') {
            let name = line[..colon].trim().to_lowercase();
            let value = line[colon + 1..].trim().to_string();
            unfolded.push((name, value));
        }
    }

    let mut headers = Headers::new();
    for (name, value) in unfolded {
        headers.insert(&name, decode_encoded_words(&value));
    }
    headers.sanitize();
    headers
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` decodes to
/// `"Hola mundo"`. Tokens that fail to decode are kept as-is.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // Whitespace between two adjacent encoded words is dropped (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_marker = &remaining[start + 2..];
        if let Some((text, consumed)) = decode_one_word(after_marker) {
            result.push_str(&text);
            remaining = &after_marker[consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_marker;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

/// Decode one `charset?encoding?payload?=` token. Returns the decoded text
/// and the number of bytes consumed after the leading `=?`.
fn decode_one_word(s: &str) -> Option<(String, usize)> {
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let payload_and_tail = &rest[second_q + 1..];
    let end = payload_and_tail.find("?=")?;
    let payload = &payload_and_tail[..end];

    let consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding.to_uppercase().as_str() {
        "B" => {
            let cleaned: Vec<u8> = payload
                .bytes()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            base64::engine::general_purpose::STANDARD
                .decode(&cleaned)
                .ok()?
        }
        "Q" => decode_q_encoding(payload),
        _ => return None,
    };

    Some((decode_word_charset(charset, &bytes), consumed))
}

/// Q-encoding (RFC 2047): underscores become spaces, `=XX` becomes a byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                match u8::from_str_radix(
                    std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("zz"),
                    16,
                ) {
                    Ok(byte) => {
                        result.push(byte);
                        i += 3;
                    }
                    Err(_) => {
                        result.push(b'=');
                        i += 1;
                    }
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

fn decode_word_charset(charset: &str, bytes: &[u8]) -> String {
    match encoding_rs::Encoding::for_label(charset.as_bytes()) {
        Some(encoding) => {
            let (decoded, _, _) = encoding.decode(bytes);
            decoded.into_owned()
        }
        None => {
            warn!(charset, "unknown encoded-word charset, decoding as UTF-8 lossy");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}
