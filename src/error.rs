//! Centralized error types for the deskmail engine.

use thiserror::Error;

/// All errors surfaced by the deskmail library.
///
/// Parse failures are deliberately absent: malformed MIME degrades to
/// best-effort raw text inside the parser and is never reported as an error.
/// Archive failures after a successful send are logged, not surfaced.
#[derive(Error, Debug)]
pub enum MailError {
    /// Connect, authentication, or network failure on a protocol session.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Every known alias of a logical folder failed to open.
    #[error("no alias of folder '{folder}' could be opened")]
    FolderUnavailable { folder: String },

    /// The requested sequence number does not exist in the folder.
    #[error("message {seqno} not found")]
    MessageNotFound { seqno: u32 },

    /// No attachment matched the requested Content-ID or filename.
    #[error("attachment '{0}' not found in message")]
    AttachmentNotFound(String),

    /// An operation exceeded its wall-clock bound.
    #[error("operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// SMTP delivery failure. Fails the whole send; no archive is attempted.
    #[error("SMTP error: {0}")]
    Smtp(String),

    /// A recipient address could not be parsed.
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),

    /// Configuration file problem.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, MailError>`.
pub type Result<T> = std::result::Result<T, MailError>;

impl From<imap::error::Error> for MailError {
    fn from(source: imap::error::Error) -> Self {
        Self::Protocol(source.to_string())
    }
}

impl From<std::io::Error> for MailError {
    fn from(source: std::io::Error) -> Self {
        Self::Protocol(source.to_string())
    }
}

impl From<native_tls::Error> for MailError {
    fn from(source: native_tls::Error) -> Self {
        Self::Protocol(source.to_string())
    }
}
