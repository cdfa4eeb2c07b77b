//! Core data model types for message content, headers, and attachments.

pub mod attachment;
pub mod content;
pub mod headers;
pub mod message;
