//! Integration tests for the mail parsing pipeline, header decoding,
//! and attachment resolution.

use std::path::Path;

use deskmail::mailbox::fetch::sanitize_filename;
use deskmail::model::attachment;
use deskmail::model::message::FetchedMessage;
use deskmail::parser::headers::{parse_headers, split_message};
use deskmail::parser::{extract_content, mime};

fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read(path).unwrap()
}

// ─── Test 1: Encoded words in From and Subject ──────────────────────

#[test]
fn test_encoded_word_headers() {
    let raw = fixture("simple.eml");
    let (header_block, _) = split_message(&raw);
    let headers = parse_headers(header_block);

    // From: =?UTF-8?B?Sm9zw6kgR2FyY8Ota2E=?= → "José Garcíka"
    assert!(
        headers.get("from").unwrap().contains("Jos"),
        "Expected decoded From, got: {:?}",
        headers.get("from")
    );
    // Subject: =?UTF-8?Q?Caf=C3=A9_con_le=C3=B1a?= → "Café con leña"
    let subject = headers.get("subject").unwrap();
    assert!(subject.contains("Caf"), "got: '{subject}'");
}

// ─── Test 2: Quoted-printable body decodes to readable text ─────────

#[test]
fn test_quoted_printable_body() {
    let raw = fixture("simple.eml");
    let (header_block, _) = split_message(&raw);
    let headers = parse_headers(header_block);
    let content = extract_content(&raw, &headers);

    assert!(content.text.contains("Sébastien"), "got: '{}'", content.text);
    assert!(content.text.contains("problème"));
    assert!(content.html.is_empty());
    assert!(content.attachments.is_empty());
}

// ─── Test 3: multipart/mixed splits into text, html, attachments ────

#[test]
fn test_multipart_mixed() {
    let raw = fixture("multipart.eml");
    let (header_block, _) = split_message(&raw);
    let headers = parse_headers(header_block);
    let content = extract_content(&raw, &headers);

    assert!(content.text.contains("room 4"), "got: '{}'", content.text);
    assert!(content.html.contains("<b>smoking</b>"));
    assert_eq!(content.attachments.len(), 2);

    let pdf = &content.attachments[0];
    assert_eq!(pdf.filename, "incident.pdf");
    assert_eq!(pdf.content_type, "application/pdf");
    assert_eq!(pdf.content_id().unwrap(), "incident-report-1");
}

// ─── Test 4: Base64 attachment bytes materialize to the payload ─────

#[test]
fn test_attachment_materializes() {
    let raw = fixture("multipart.eml");
    let (header_block, _) = split_message(&raw);
    let headers = parse_headers(header_block);
    let content = extract_content(&raw, &headers);

    let pdf = &content.attachments[0];
    let bytes = pdf.materialize();
    assert!(bytes.starts_with(b"%PDF-1.4"), "got: {bytes:?}");
}

// ─── Test 5: Resolution prefers Content-ID over filename ───────────

#[test]
fn test_attachment_resolution() {
    let raw = fixture("multipart.eml");
    let (header_block, _) = split_message(&raw);
    let headers = parse_headers(header_block);
    let content = extract_content(&raw, &headers);

    let by_cid = attachment::resolve(&content.attachments, "photo-1").unwrap();
    assert_eq!(by_cid.content_type, "image/png");

    let by_name = attachment::resolve(&content.attachments, "incident.pdf").unwrap();
    assert_eq!(by_name.content_id().unwrap(), "incident-report-1");

    // URL-encoded requests resolve the same as raw ones.
    let encoded = attachment::resolve(&content.attachments, "incident%2Epdf").unwrap();
    assert_eq!(encoded.filename, "incident.pdf");

    assert!(attachment::resolve(&content.attachments, "missing.txt").is_none());
}

// ─── Test 6: Three levels of nesting, all leaves surface ────────────

#[test]
fn test_nested_multipart() {
    let raw = fixture("nested.eml");
    let (header_block, _) = split_message(&raw);
    let headers = parse_headers(header_block);
    let content = extract_content(&raw, &headers);

    assert!(content.text.contains("Deeply nested plain text."));
    assert!(content.text.contains("Outer note after the nested tree."));
    assert!(content.html.contains("Deeply nested HTML."));
    assert_eq!(content.attachments.len(), 1);
    assert_eq!(content.attachments[0].content_id().unwrap(), "logo@example.com");
}

// ─── Test 7: Parsing is idempotent on already-parsed output ─────────

#[test]
fn test_parse_idempotent() {
    let raw = fixture("multipart.eml");
    let (header_block, _) = split_message(&raw);
    let headers = parse_headers(header_block);

    let once = mime::parse_message(&raw, &headers);
    let twice = mime::parse_message(&raw, &headers);
    assert_eq!(once.text, twice.text);
    assert_eq!(once.html, twice.html);
    assert_eq!(once.attachments.len(), twice.attachments.len());
}

// ─── Test 8: Garbage input never panics, yields a best effort ──────

#[test]
fn test_garbage_input_is_total() {
    let garbage: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
    let headers = parse_headers(&garbage);
    let content = extract_content(&garbage, &headers);
    // Whatever came out, the pipeline completed without panicking.
    let _ = (content.text.len(), content.html.len(), content.attachments.len());
}

// ─── Test 9: Fetched message serializes without raw byte blobs ─────

#[test]
fn test_fetched_message_serialization() {
    let raw = fixture("multipart.eml");
    let (header_block, _) = split_message(&raw);
    let headers = parse_headers(header_block);
    let content = extract_content(&raw, &headers);

    let message = FetchedMessage {
        seqno: 7,
        headers,
        text: content.text,
        html: content.html,
        attachments: content.attachments,
    };

    let json = serde_json::to_value(&message).unwrap();
    assert_eq!(json["seqno"], 7);
    assert_eq!(json["attachments"][0]["filename"], "incident.pdf");
    // Attachment bodies are skipped during serialization.
    assert!(json["attachments"][0].get("content").is_none());
}

// ─── Test 10: Download filenames are header-safe ───────────────────

#[test]
fn test_sanitize_download_filename() {
    assert_eq!(sanitize_filename("invoice (final).pdf", 150), "invoice__final_.pdf");
    assert_eq!(sanitize_filename("../../etc/shadow", 150), ".._.._etc_shadow");
    let long = "a".repeat(500);
    assert_eq!(sanitize_filename(&long, 150).len(), 150);
}
