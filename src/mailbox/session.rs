//! Short-lived IMAP sessions with a single guaranteed cleanup path.
//!
//! Every mailbox operation opens its own session (connect, operate, end);
//! sessions are never pooled or shared. [`MailSession`] logs out exactly
//! once: explicitly via [`MailSession::close`] on the normal path, or from
//! `Drop` on every early-return path. Leaked half-open sessions were the
//! dominant bug class this design exists to rule out.

use std::net::TcpStream;
use std::time::Duration;

use native_tls::{TlsConnector, TlsStream};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{MailError, Result};
use crate::mailbox::folders::MailFolder;

enum ImapConn {
    Tls(imap::Session<TlsStream<TcpStream>>),
    Plain(imap::Session<TcpStream>),
}

/// One authenticated IMAP session.
pub struct MailSession {
    conn: Option<ImapConn>,
}

/// Connect and authenticate against the configured IMAP endpoint.
///
/// Every read and write on the underlying socket is bounded by the
/// configured io timeout. A server that stops responding mid-operation
/// surfaces an error within that bound instead of blocking forever, so
/// the session's `Drop` logout runs promptly even on a worker thread
/// whose caller has already given up.
pub fn connect(cfg: &Config) -> Result<MailSession> {
    let imap_cfg = &cfg.account.imap;
    let io_timeout = Duration::from_secs(cfg.limits.io_timeout_secs);
    debug!(host = %imap_cfg.host, port = imap_cfg.port, tls = imap_cfg.tls, "opening imap session");

    let tcp = TcpStream::connect((imap_cfg.host.as_str(), imap_cfg.port))?;
    tcp.set_read_timeout(Some(io_timeout))?;
    tcp.set_write_timeout(Some(io_timeout))?;

    let conn = if imap_cfg.tls {
        let tls = TlsConnector::builder().build()?;
        let stream = tls
            .connect(&imap_cfg.host, tcp)
            .map_err(|e| MailError::Protocol(format!("tls handshake failed: {e}")))?;
        let client = imap::Client::new(stream);
        let session = client
            .login(&imap_cfg.user, &imap_cfg.password)
            .map_err(|(e, _)| MailError::Protocol(format!("login failed: {e}")))?;
        ImapConn::Tls(session)
    } else {
        let client = imap::Client::new(tcp);
        let session = client
            .login(&imap_cfg.user, &imap_cfg.password)
            .map_err(|(e, _)| MailError::Protocol(format!("login failed: {e}")))?;
        ImapConn::Plain(session)
    };
    Ok(MailSession { conn: Some(conn) })
}

impl MailSession {
    fn conn(&mut self) -> Result<&mut ImapConn> {
        self.conn
            .as_mut()
            .ok_or_else(|| MailError::Protocol("session already closed".to_string()))
    }

    /// Open one concrete folder by name. `read_only` selects EXAMINE over
    /// SELECT. Returns the message count the mailbox reports.
    pub fn open(&mut self, name: &str, read_only: bool) -> Result<u32> {
        let mailbox = match self.conn()? {
            ImapConn::Tls(s) => {
                if read_only {
                    s.examine(name)?
                } else {
                    s.select(name)?
                }
            }
            ImapConn::Plain(s) => {
                if read_only {
                    s.examine(name)?
                } else {
                    s.select(name)?
                }
            }
        };
        debug!(folder = name, exists = mailbox.exists, read_only, "opened folder");
        Ok(mailbox.exists)
    }

    /// Open a logical folder by probing its aliases in order.
    ///
    /// Returns the alias that opened and its message count. A folder that
    /// opens with zero messages is a valid, empty result. When every alias
    /// fails the operation fails with [`MailError::FolderUnavailable`].
    pub fn open_folder(&mut self, folder: MailFolder, read_only: bool) -> Result<(String, u32)> {
        for alias in folder.aliases() {
            match self.open(alias, read_only) {
                Ok(exists) => return Ok((alias.to_string(), exists)),
                Err(e) => {
                    debug!(folder = %folder, alias, error = %e, "alias failed to open");
                }
            }
        }
        Err(MailError::FolderUnavailable {
            folder: folder.to_string(),
        })
    }

    /// Fetch `(seqno, raw_header_bytes)` for every message in `set`.
    pub fn fetch_headers(&mut self, set: &str) -> Result<Vec<(u32, Vec<u8>)>> {
        let mut out = Vec::new();
        match self.conn()? {
            ImapConn::Tls(s) => {
                let fetches = s.fetch(set, "(RFC822.HEADER)")?;
                for f in fetches.iter() {
                    if let Some(header) = f.header() {
                        out.push((f.message, header.to_vec()));
                    }
                }
            }
            ImapConn::Plain(s) => {
                let fetches = s.fetch(set, "(RFC822.HEADER)")?;
                for f in fetches.iter() {
                    if let Some(header) = f.header() {
                        out.push((f.message, header.to_vec()));
                    }
                }
            }
        }
        Ok(out)
    }

    /// Fetch the full raw message for one sequence number.
    pub fn fetch_raw(&mut self, seqno: u32) -> Result<Vec<u8>> {
        let set = seqno.to_string();
        let body = match self.conn()? {
            ImapConn::Tls(s) => {
                let fetches = s.fetch(&set, "(RFC822)")?;
                fetches.iter().find_map(|f| f.body().map(|b| b.to_vec()))
            }
            ImapConn::Plain(s) => {
                let fetches = s.fetch(&set, "(RFC822)")?;
                fetches.iter().find_map(|f| f.body().map(|b| b.to_vec()))
            }
        };
        body.ok_or(MailError::MessageNotFound { seqno })
    }

    /// Append a raw message into a concrete folder.
    pub fn append(&mut self, folder: &str, raw: &[u8]) -> Result<()> {
        match self.conn()? {
            ImapConn::Tls(s) => s.append(folder, raw)?,
            ImapConn::Plain(s) => s.append(folder, raw)?,
        }
        Ok(())
    }

    /// Copy a message into a concrete folder.
    pub fn copy(&mut self, seqno: u32, folder: &str) -> Result<()> {
        let set = seqno.to_string();
        match self.conn()? {
            ImapConn::Tls(s) => s.copy(&set, folder)?,
            ImapConn::Plain(s) => s.copy(&set, folder)?,
        }
        Ok(())
    }

    /// Run a STORE command (flag add/remove) against one sequence number.
    pub fn store(&mut self, seqno: u32, query: &str) -> Result<()> {
        let set = seqno.to_string();
        match self.conn()? {
            ImapConn::Tls(s) => {
                s.store(&set, query)?;
            }
            ImapConn::Plain(s) => {
                s.store(&set, query)?;
            }
        }
        Ok(())
    }

    /// Permanently remove messages flagged `\Deleted`.
    pub fn expunge(&mut self) -> Result<()> {
        match self.conn()? {
            ImapConn::Tls(s) => {
                s.expunge()?;
            }
            ImapConn::Plain(s) => {
                s.expunge()?;
            }
        }
        Ok(())
    }

    /// Log out and end the session. Safe to rely on `Drop` instead, but an
    /// explicit close surfaces nothing and makes the lifecycle obvious at
    /// the call site.
    pub fn close(mut self) {
        self.logout();
    }

    fn logout(&mut self) {
        if let Some(conn) = self.conn.take() {
            let result = match conn {
                ImapConn::Tls(mut s) => s.logout(),
                ImapConn::Plain(mut s) => s.logout(),
            };
            if let Err(e) = result {
                warn!(error = %e, "imap logout failed");
            }
        }
    }
}

impl Drop for MailSession {
    fn drop(&mut self) {
        self.logout();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::time::Instant;

    // A server that accepts the connection and then never says anything.
    // The bounded socket reads must turn that silence into an error within
    // the io timeout instead of blocking the session open forever.
    #[test]
    fn test_connect_gives_up_on_silent_server() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_secs(10));
            drop(socket);
        });

        let mut cfg = Config::default();
        cfg.account.imap.host = addr.ip().to_string();
        cfg.account.imap.port = addr.port();
        cfg.account.imap.tls = false;
        cfg.limits.io_timeout_secs = 1;

        let started = Instant::now();
        let result = connect(&cfg);
        assert!(result.is_err(), "silent server must not yield a session");
        assert!(
            started.elapsed() < Duration::from_secs(8),
            "connect blocked past the io timeout: {:?}",
            started.elapsed()
        );
        drop(hold);
    }
}
