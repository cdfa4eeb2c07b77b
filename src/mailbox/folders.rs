//! Logical folders and their provider-specific alias lists.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A logical mailbox folder.
///
/// Providers disagree on concrete folder names (Gmail nests under
/// `[Gmail]/`, Dovecot-style servers under `INBOX.`), so each logical
/// folder maps to an ordered alias list that callers probe in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailFolder {
    Inbox,
    Drafts,
    Sent,
    Junk,
    Trash,
}

impl MailFolder {
    /// Provider aliases for this folder, most common first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            MailFolder::Inbox => &["INBOX"],
            MailFolder::Drafts => &["Drafts", "INBOX.Drafts", "[Gmail]/Drafts"],
            MailFolder::Sent => &[
                "Sent",
                "INBOX.Sent",
                "[Gmail]/Sent Mail",
                "[Gmail]/Sent",
                "Sent Items",
                "Sent Messages",
            ],
            MailFolder::Junk => &["Junk", "INBOX.Junk", "Spam", "[Gmail]/Spam", "Junk E-mail"],
            MailFolder::Trash => &[
                "Trash",
                "INBOX.Trash",
                "[Gmail]/Trash",
                "Deleted Items",
                "Deleted Messages",
            ],
        }
    }
}

impl fmt::Display for MailFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MailFolder::Inbox => "Inbox",
            MailFolder::Drafts => "Drafts",
            MailFolder::Sent => "Sent",
            MailFolder::Junk => "Junk",
            MailFolder::Trash => "Trash",
        };
        f.write_str(name)
    }
}

impl FromStr for MailFolder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "inbox" => Ok(MailFolder::Inbox),
            "drafts" => Ok(MailFolder::Drafts),
            "sent" => Ok(MailFolder::Sent),
            "junk" | "spam" => Ok(MailFolder::Junk),
            "trash" => Ok(MailFolder::Trash),
            other => Err(format!("unknown folder '{other}'")),
        }
    }
}

/// Probe the aliases of `folder` in order with `open`, returning the first
/// alias that opens. Later aliases are never attempted once one succeeds.
pub fn resolve_first<F>(folder: MailFolder, mut open: F) -> Option<&'static str>
where
    F: FnMut(&str) -> bool,
{
    folder.aliases().iter().copied().find(|alias| open(alias))
}
