//! Destructive and flag operations on stored messages.

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{MailError, Result};

use super::folders::{self, MailFolder};
use super::session::{self, MailSession};

/// Delete a message: copy it into Trash when a Trash folder exists, then
/// flag it deleted and expunge. A missing Trash folder downgrades the
/// delete to a plain expunge rather than failing it.
pub fn delete_message(cfg: &Config, folder: MailFolder, seqno: u32) -> Result<()> {
    let mut session = session::connect(cfg)?;
    let result = delete_inner(&mut session, folder, seqno);
    session.close();
    result
}

fn delete_inner(session: &mut MailSession, folder: MailFolder, seqno: u32) -> Result<()> {
    session.open_folder(folder, false)?;

    if folder != MailFolder::Trash {
        match trash_alias(session, seqno) {
            Some(alias) => debug!(seqno, %alias, "copied to trash before delete"),
            None => warn!(seqno, "no trash folder found, deleting permanently"),
        }
    }

    session.store(seqno, "+FLAGS (\\Deleted)")?;
    session.expunge()?;
    info!(folder = %folder, seqno, "message deleted");
    Ok(())
}

/// Try each Trash alias until one accepts the copy.
fn trash_alias(session: &mut MailSession, seqno: u32) -> Option<&'static str> {
    folders::resolve_first(MailFolder::Trash, |alias| {
        match session.copy(seqno, alias) {
            Ok(()) => true,
            Err(e) => {
                debug!(alias, error = %e, "trash copy attempt failed");
                false
            }
        }
    })
}

/// Move a message to another folder. Unlike delete, the copy must
/// succeed; the source message is only removed afterwards.
pub fn move_message(cfg: &Config, from: MailFolder, seqno: u32, to: MailFolder) -> Result<()> {
    let mut session = session::connect(cfg)?;
    let result = move_inner(&mut session, from, seqno, to);
    session.close();
    result
}

fn move_inner(session: &mut MailSession, from: MailFolder, seqno: u32, to: MailFolder) -> Result<()> {
    session.open_folder(from, false)?;

    let alias = folders::resolve_first(to, |alias| match session.copy(seqno, alias) {
        Ok(()) => true,
        Err(e) => {
            debug!(alias, error = %e, "move copy attempt failed");
            false
        }
    })
    .ok_or_else(|| MailError::FolderUnavailable {
        folder: to.to_string(),
    })?;

    session.store(seqno, "+FLAGS (\\Deleted)")?;
    session.expunge()?;
    info!(from = %from, %alias, seqno, "message moved");
    Ok(())
}

/// Set or clear the `\Seen` flag.
pub fn mark_read(cfg: &Config, folder: MailFolder, seqno: u32, read: bool) -> Result<()> {
    let mut session = session::connect(cfg)?;
    let result = mark_inner(&mut session, folder, seqno, read);
    session.close();
    result
}

fn mark_inner(session: &mut MailSession, folder: MailFolder, seqno: u32, read: bool) -> Result<()> {
    session.open_folder(folder, false)?;
    let query = if read {
        "+FLAGS (\\Seen)"
    } else {
        "-FLAGS (\\Seen)"
    };
    session.store(seqno, query)?;
    debug!(folder = %folder, seqno, read, "seen flag updated");
    Ok(())
}
