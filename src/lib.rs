//! `deskmail`: mail content engine for a support ticketing portal.
//!
//! This crate provides the core library for decoding and parsing stored
//! mail into displayable content, and for the mailbox operations a
//! ticketing backend needs: listing, fetching, sending, deleting,
//! moving, and flagging messages.

pub mod config;
pub mod error;
pub mod mailbox;
pub mod model;
pub mod parser;

pub use config::{load_config, Config};
pub use error::{MailError, Result};
pub use mailbox::MailFolder;
