//! Mailbox orchestration over IMAP and SMTP.
//!
//! Every public operation here follows the same shape: open a fresh
//! session, do the work, close the session before returning. Sessions
//! are never cached across calls.

pub mod actions;
pub mod fetch;
pub mod folders;
pub mod send;
pub mod session;

pub use actions::{delete_message, mark_read, move_message};
pub use fetch::{fetch_attachment, fetch_message, list_messages};
pub use folders::MailFolder;
pub use send::{send_mail, verify_transport};
