//! Body decoding: Content-Transfer-Encoding, then best-candidate charset.

use base64::Engine;
use tracing::debug;

/// Fallback charset tried after UTF-8. The portal's user base is largely
/// Arabic-script, and windows-1256 is what legacy senders actually use.
const LEGACY_FALLBACK_CHARSET: &str = "windows-1256";

/// Score bonus for a decode that produced at least one Arabic-script
/// code point.
const ARABIC_BONUS: i64 = 10;

/// Decode a leaf part body: transfer-encoding step, then charset step.
pub fn decode_body(raw: &[u8], declared_charset: &str, transfer_encoding: &str) -> String {
    let bytes = decode_transfer(raw, transfer_encoding);
    decode_charset(&bytes, declared_charset)
}

/// Undo the declared `Content-Transfer-Encoding`.
///
/// `quoted-printable` and `base64` are decoded; `7bit`, `8bit`, `binary`,
/// and anything unrecognized pass through unchanged. A base64 body that
/// fails to decode also passes through rather than being dropped.
pub fn decode_transfer(raw: &[u8], transfer_encoding: &str) -> Vec<u8> {
    match transfer_encoding.trim().to_lowercase().as_str() {
        "quoted-printable" => decode_quoted_printable(raw),
        "base64" => {
            let cleaned: Vec<u8> = raw
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            base64::engine::general_purpose::STANDARD
                .decode(&cleaned)
                .unwrap_or_else(|e| {
                    debug!(error = %e, "base64 body did not decode, passing through");
                    raw.to_vec()
                })
        }
        _ => raw.to_vec(),
    }
}

/// Decode quoted-printable: `=XX` hex escapes become bytes, soft line
/// breaks (`=` at end of line) disappear.
fn decode_quoted_printable(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'=' {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        // Soft line break: "=\r\n" or "=\n"
        if raw.get(i + 1) == Some(&b'\r') && raw.get(i + 2) == Some(&b'\n') {
            i += 3;
            continue;
        }
        if raw.get(i + 1) == Some(&b'\n') {
            i += 2;
            continue;
        }
        // Hex escape "=XX"
        if i + 2 < raw.len() {
            let hex = std::str::from_utf8(&raw[i + 1..i + 3]).unwrap_or("");
            if let Ok(byte) = u8::from_str_radix(hex, 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        // Dangling '=' kept verbatim
        out.push(b'=');
        i += 1;
    }
    out
}

/// Pick the best charset for `bytes` and decode with it.
///
/// Candidates are tried in order: the declared charset, then UTF-8, then
/// windows-1256 (duplicates and empties skipped). An earlier candidate
/// that decodes without a single replacement character is accepted
/// outright; the declared charset therefore wins every tie. Only when a
/// decode comes back damaged do the later candidates compete, scored
/// +10 for containing Arabic-script code points minus one per replacement
/// character, with a strictly greater score required to displace the
/// running best. Unknown charset labels are skipped, never fatal.
pub fn decode_charset(bytes: &[u8], declared_charset: &str) -> String {
    let declared = declared_charset.trim().trim_matches('"').to_lowercase();

    let mut candidates: Vec<&str> = Vec::with_capacity(3);
    for candidate in [declared.as_str(), "utf-8", LEGACY_FALLBACK_CHARSET] {
        if !candidate.is_empty() && !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    let mut best: Option<String> = None;
    let mut best_score = i64::MIN;
    for candidate in candidates {
        let Some(encoding) = encoding_rs::Encoding::for_label(candidate.as_bytes()) else {
            debug!(charset = candidate, "unrecognized charset label, skipping");
            continue;
        };
        let (decoded, _, _) = encoding.decode(bytes);
        let replacements = decoded.chars().filter(|&c| c == '\u{FFFD}').count() as i64;
        if replacements == 0 {
            return decoded.into_owned();
        }
        let score = score_decode(&decoded, replacements);
        if score > best_score {
            best_score = score;
            best = Some(decoded.into_owned());
        }
    }

    best.unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned())
}

fn score_decode(s: &str, replacements: i64) -> i64 {
    let mut score = -replacements;
    if s.chars().any(is_arabic_script) {
        score += ARABIC_BONUS;
    }
    score
}

fn is_arabic_script(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_printable_hex_escape() {
        let decoded = decode_body(b"S=C3=A9bastien", "utf-8", "quoted-printable");
        assert_eq!(decoded, "Sébastien");
    }

    #[test]
    fn test_quoted_printable_soft_break() {
        let decoded = decode_transfer(b"first=\r\nsecond=\nthird", "quoted-printable");
        assert_eq!(decoded, b"firstsecondthird");
    }

    #[test]
    fn test_quoted_printable_dangling_equals() {
        assert_eq!(decode_transfer(b"a=zz", "quoted-printable"), b"a=zz");
        assert_eq!(decode_transfer(b"end=", "quoted-printable"), b"end=");
    }

    #[test]
    fn test_base64_strips_whitespace() {
        let decoded = decode_transfer(b"aGVs\r\nbG8g\r\nd29ybGQ=", "base64");
        assert_eq!(decoded, b"hello world");
    }

    #[test]
    fn test_base64_invalid_passes_through() {
        assert_eq!(decode_transfer(b"!!!not base64!!!", "base64"), b"!!!not base64!!!");
    }

    #[test]
    fn test_passthrough_encodings() {
        assert_eq!(decode_transfer(b"as-is", "8bit"), b"as-is");
        assert_eq!(decode_transfer(b"as-is", "7bit"), b"as-is");
        assert_eq!(decode_transfer(b"as-is", ""), b"as-is");
    }

    #[test]
    fn test_charset_declared_wins_ties() {
        // Plain ASCII scores 0 under every candidate; the declared charset
        // is listed first and must win the tie.
        let decoded = decode_charset(b"hello", "iso-8859-1");
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn test_charset_heuristic_arabic_utf8_mislabeled() {
        // Valid UTF-8 Arabic text declared with an unrecognized charset:
        // the unknown label is skipped and the UTF-8 candidate scores +10
        // with zero replacement characters.
        let arabic = "مرحبا بالعالم";
        let decoded = decode_charset(arabic.as_bytes(), "x-no-such-charset");
        assert_eq!(decoded, arabic);
        assert!(!decoded.contains('\u{FFFD}'));
    }

    #[test]
    fn test_charset_clean_declared_decode_is_kept() {
        // Latin text with accents is valid UTF-8; windows-1256 must not
        // steal it even though it would map the accent bytes to Arabic.
        let decoded = decode_charset("Sébastien".as_bytes(), "utf-8");
        assert_eq!(decoded, "Sébastien");
    }

    #[test]
    fn test_charset_windows1256_beats_broken_utf8() {
        // windows-1256 encoded Arabic is invalid UTF-8 (replacement chars)
        // but decodes cleanly and with Arabic code points under 1256.
        let (encoded, _, _) = encoding_rs::WINDOWS_1256.encode("مرحبا");
        let decoded = decode_charset(&encoded, "utf-8");
        assert_eq!(decoded, "مرحبا");
    }

    #[test]
    fn test_round_trip_quoted_printable_arabic() {
        // Encode by hand: every UTF-8 byte above 0x7E as =XX.
        let original = "سلام ok";
        let mut encoded = String::new();
        for b in original.as_bytes() {
            if b.is_ascii_graphic() || *b == b' ' {
                encoded.push(*b as char);
            } else {
                encoded.push_str(&format!("={b:02X}"));
            }
        }
        assert_eq!(decode_body(encoded.as_bytes(), "utf-8", "quoted-printable"), original);
    }

    #[test]
    fn test_round_trip_quoted_printable_ascii() {
        // '=' itself must be escaped; everything else passes through.
        let original = "totals: a=1, b=2";
        let encoded = original.replace('=', "=3D");
        assert_eq!(decode_body(encoded.as_bytes(), "utf-8", "quoted-printable"), original);
    }

    #[test]
    fn test_round_trip_base64_ascii() {
        use base64::Engine;
        let original = "plain ascii round trip";
        let encoded = base64::engine::general_purpose::STANDARD.encode(original);
        assert_eq!(decode_body(encoded.as_bytes(), "utf-8", "base64"), original);
    }

    #[test]
    fn test_round_trip_base64_arabic() {
        use base64::Engine;
        let original = "مرحبا بالعالم";
        let encoded = base64::engine::general_purpose::STANDARD.encode(original);
        assert_eq!(decode_body(encoded.as_bytes(), "utf-8", "base64"), original);
    }
}
