//! Fetch orchestration: folder listings, single-message fetch, and
//! attachment retrieval with its wall-clock bound.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{MailError, Result};
use crate::model::attachment;
use crate::model::headers::Headers;
use crate::model::message::{AttachmentContent, FetchedMessage, MessageSummary};
use crate::parser;
use crate::parser::headers::{parse_headers, split_message};

use super::folders::MailFolder;
use super::session;

/// Header fields surfaced in a folder listing.
const SUMMARY_FIELDS: [&str; 4] = ["from", "to", "subject", "date"];

/// List the most recent `limit` messages of a folder, newest first.
/// `None` falls back to the configured page size.
///
/// An empty folder is a valid empty result, not an error.
pub fn list_messages(
    cfg: &Config,
    folder: MailFolder,
    limit: Option<u32>,
) -> Result<Vec<MessageSummary>> {
    let limit = limit.unwrap_or(cfg.limits.list_page_size);
    let mut session = session::connect(cfg)?;
    let result = list_inner(&mut session, folder, limit);
    session.close();
    result
}

fn list_inner(
    session: &mut session::MailSession,
    folder: MailFolder,
    limit: u32,
) -> Result<Vec<MessageSummary>> {
    let (alias, exists) = session.open_folder(folder, true)?;
    let Some(set) = listing_range(exists, limit) else {
        debug!(folder = %folder, %alias, exists, limit, "nothing to list");
        return Ok(Vec::new());
    };
    debug!(folder = %folder, %alias, %set, "listing messages");

    let mut summaries: Vec<MessageSummary> = session
        .fetch_headers(&set)?
        .into_iter()
        .map(|(seqno, raw_headers)| MessageSummary {
            seqno,
            headers: summary_headers(&raw_headers),
        })
        .collect();

    summaries.sort_by(|a, b| b.seqno.cmp(&a.seqno));
    Ok(summaries)
}

/// Sequence set covering the most recent `limit` messages, or `None` when
/// there is nothing to fetch (empty folder or a zero limit).
fn listing_range(exists: u32, limit: u32) -> Option<String> {
    if exists == 0 || limit == 0 {
        return None;
    }
    let first = exists.saturating_sub(limit - 1).max(1);
    Some(format!("{first}:{exists}"))
}

/// Reduce a raw header block to the sanitized fields a listing shows.
fn summary_headers(raw: &[u8]) -> Headers {
    let all = parse_headers(raw);
    let mut kept = Headers::new();
    for field in SUMMARY_FIELDS {
        for value in all.get_all(field) {
            kept.insert(field, value.clone());
        }
    }
    kept
}

/// Fetch and fully parse one message.
pub fn fetch_message(cfg: &Config, folder: MailFolder, seqno: u32) -> Result<FetchedMessage> {
    let mut session = session::connect(cfg)?;
    let result = fetch_inner(&mut session, folder, seqno);
    session.close();
    result
}

fn fetch_inner(
    session: &mut session::MailSession,
    folder: MailFolder,
    seqno: u32,
) -> Result<FetchedMessage> {
    session.open_folder(folder, true)?;
    let raw = session.fetch_raw(seqno)?;

    let (raw_headers, _) = split_message(&raw);
    let headers = parse_headers(raw_headers);
    let content = parser::extract_content(&raw, &headers);

    Ok(FetchedMessage {
        seqno,
        headers,
        text: content.text,
        html: content.html,
        attachments: content.attachments,
    })
}

/// Fetch one attachment by Content-ID or filename, bounded by the
/// configured wall-clock timeout.
///
/// The protocol work runs on a worker thread; when the bound expires the
/// caller gets [`MailError::Timeout`] immediately. The worker's session is
/// force-closed shortly after: its socket reads are bounded by the io
/// timeout, so a stalled server cannot hold the blocking call (and with it
/// the open connection) past that bound, and the session's logout-on-drop
/// runs as the thread unwinds. This is the only path with its own
/// wall-clock bound; other operations rely on the io timeout alone.
pub fn fetch_attachment(
    cfg: &Config,
    folder: MailFolder,
    seqno: u32,
    requested: &str,
) -> Result<AttachmentContent> {
    let timeout = Duration::from_secs(cfg.limits.attachment_timeout_secs);
    let cfg = cfg.clone();
    let requested = requested.to_string();

    run_with_timeout(timeout, move || {
        let message = fetch_message(&cfg, folder, seqno)?;
        let found = attachment::resolve(&message.attachments, &requested)
            .ok_or_else(|| MailError::AttachmentNotFound(requested.clone()))?;
        Ok(AttachmentContent {
            filename: sanitize_filename(&found.filename, 150),
            content_type: found.content_type.clone(),
            data: found.materialize(),
        })
    })
}

/// Run `job` on a worker thread and wait at most `timeout` for its result.
pub(crate) fn run_with_timeout<T, F>(timeout: Duration, job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver may be gone after a timeout; the send result is moot.
        let _ = tx.send(job());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!(timeout_secs = timeout.as_secs(), "attachment fetch timed out");
            Err(MailError::Timeout {
                seconds: timeout.as_secs(),
            })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(MailError::Protocol("fetch worker terminated".to_string()))
        }
    }
}

/// Make a filename safe for a `Content-Disposition` response header.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "attachment".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_range() {
        assert_eq!(listing_range(100, 50).as_deref(), Some("51:100"));
        assert_eq!(listing_range(3, 50).as_deref(), Some("1:3"));
        assert_eq!(listing_range(1, 1).as_deref(), Some("1:1"));
        // Empty folder or zero limit fetches nothing at all.
        assert_eq!(listing_range(0, 50), None);
        assert_eq!(listing_range(7, 0), None);
    }

    #[test]
    fn test_summary_headers_keeps_only_listing_fields() {
        let raw = b"From: a@b.com\r\nTo: c@d.com\r\nSubject: Hi\r\n\
            Date: Thu, 04 Jan 2024 10:00:00 +0000\r\nX-Spam-Score: 5\r\n";
        let headers = summary_headers(raw);
        assert_eq!(headers.get("from"), Some("a@b.com"));
        assert_eq!(headers.get("subject"), Some("Hi"));
        assert!(headers.get("x-spam-score").is_none());
    }

    #[test]
    fn test_run_with_timeout_returns_result() {
        let result = run_with_timeout(Duration::from_secs(5), || Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn test_run_with_timeout_expires() {
        let result: Result<()> = run_with_timeout(Duration::from_millis(50), || {
            thread::sleep(Duration::from_secs(5));
            Ok(())
        });
        assert!(matches!(result, Err(MailError::Timeout { seconds: 0 })));
    }

    #[test]
    fn test_run_with_timeout_propagates_errors() {
        let result: Result<()> = run_with_timeout(Duration::from_secs(5), || {
            Err(MailError::AttachmentNotFound("x".to_string()))
        });
        assert!(matches!(result, Err(MailError::AttachmentNotFound(_))));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("hello world.pdf", 150), "hello_world.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd", 150), ".._.._etc_passwd");
        assert_eq!(sanitize_filename("", 150), "attachment");
    }
}
