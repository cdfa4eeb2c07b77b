//! Outbound mail: message assembly, SMTP delivery, and the best-effort
//! copy into the Sent folder.

use lettre::message::header::ContentType;
use lettre::message::{Attachment as LettreAttachment, Mailbox, MessageBuilder, MultiPart, SinglePart};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info, warn};

use crate::config::{Config, SmtpConfig};
use crate::error::{MailError, Result};
use crate::model::message::{OutgoingMail, SendOutcome};

use super::folders::MailFolder;
use super::session;

/// Send a message, then file a copy under the Sent folder.
///
/// Delivery failure fails the whole operation and nothing is archived.
/// A failed archive after successful delivery is reported, not fatal:
/// the recipient already has the mail.
pub fn send_mail(cfg: &Config, mail: &OutgoingMail) -> Result<SendOutcome> {
    let message_id = generate_message_id(&cfg.account.smtp);
    let message = build_message(&cfg.account.smtp, mail, &message_id)?;

    let transport = build_transport(&cfg.account.smtp)?;
    transport
        .send(&message)
        .map_err(|e| MailError::Smtp(e.to_string()))?;
    info!(%message_id, to = ?mail.to, "message delivered");

    let archive_result = archive_sent(cfg, &message.formatted());
    Ok(complete_send(message_id, archive_result))
}

/// Fold the archive outcome into the final result. Delivery already
/// succeeded at this point, so an archive failure only clears the flag.
pub(crate) fn complete_send(message_id: String, archive_result: Result<()>) -> SendOutcome {
    let archived = match archive_result {
        Ok(()) => true,
        Err(e) => {
            warn!(%message_id, error = %e, "delivered but could not archive to Sent");
            false
        }
    };
    SendOutcome {
        success: true,
        message_id,
        archived,
    }
}

/// Check that the SMTP transport accepts our credentials.
pub fn verify_transport(cfg: &SmtpConfig) -> Result<()> {
    let transport = build_transport(cfg)?;
    match transport.test_connection() {
        Ok(true) => Ok(()),
        Ok(false) => Err(MailError::Smtp("connection test failed".to_string())),
        Err(e) => Err(MailError::Smtp(e.to_string())),
    }
}

fn build_transport(cfg: &SmtpConfig) -> Result<SmtpTransport> {
    let tls = TlsParameters::new(cfg.host.clone()).map_err(|e| MailError::Smtp(e.to_string()))?;

    let builder = match cfg.security.as_str() {
        "ssl" => SmtpTransport::relay(&cfg.host)
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .tls(Tls::Wrapper(tls)),
        "none" => SmtpTransport::builder_dangerous(&cfg.host).tls(Tls::None),
        // starttls is the default posture
        _ => SmtpTransport::starttls_relay(&cfg.host)
            .map_err(|e| MailError::Smtp(e.to_string()))?
            .tls(Tls::Required(tls)),
    };

    let credentials =
        lettre::transport::smtp::authentication::Credentials::new(cfg.user.clone(), cfg.password.clone());

    Ok(builder.port(cfg.port).credentials(credentials).build())
}

/// Assemble the RFC 5322 message: alternative text/html body wrapped in a
/// mixed multipart when attachments are present.
pub(crate) fn build_message(
    cfg: &SmtpConfig,
    mail: &OutgoingMail,
    message_id: &str,
) -> Result<Message> {
    let from: Mailbox = format!("{} <{}>", cfg.from_name, cfg.from_address)
        .parse()
        .map_err(|_| MailError::InvalidRecipient(cfg.from_address.clone()))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(&mail.subject)
        .message_id(Some(message_id.to_string()));

    builder = add_recipients(builder, &mail.to, MessageBuilder::to)?;
    builder = add_recipients(builder, &mail.cc, MessageBuilder::cc)?;
    builder = add_recipients(builder, &mail.bcc, MessageBuilder::bcc)?;

    let body = if mail.html.is_empty() {
        MultiPart::mixed().singlepart(SinglePart::plain(mail.text.clone()))
    } else {
        MultiPart::mixed().multipart(MultiPart::alternative_plain_html(
            mail.text.clone(),
            mail.html.clone(),
        ))
    };

    let body = mail.attachments.iter().fold(body, |acc, att| {
        let content_type = att
            .content_type
            .parse::<ContentType>()
            .or_else(|_| "application/octet-stream".parse())
            .unwrap_or(ContentType::TEXT_PLAIN);
        acc.singlepart(LettreAttachment::new(att.filename.clone()).body(att.data.clone(), content_type))
    });

    builder
        .multipart(body)
        .map_err(|e| MailError::Smtp(e.to_string()))
}

fn add_recipients(
    mut builder: MessageBuilder,
    addresses: &[String],
    add: fn(MessageBuilder, Mailbox) -> MessageBuilder,
) -> Result<MessageBuilder> {
    for address in addresses {
        let mailbox: Mailbox = address
            .parse()
            .map_err(|_| MailError::InvalidRecipient(address.clone()))?;
        builder = add(builder, mailbox);
    }
    Ok(builder)
}

fn generate_message_id(cfg: &SmtpConfig) -> String {
    let stamp = chrono::Utc::now().timestamp_micros();
    let pid = std::process::id();
    format!("<{stamp}.{pid}@{}>", cfg.host)
}

/// Append the delivered message to the first Sent alias that opens.
fn archive_sent(cfg: &Config, raw: &[u8]) -> Result<()> {
    let mut session = session::connect(cfg)?;
    let result = archive_inner(&mut session, raw);
    session.close();
    result
}

fn archive_inner(session: &mut session::MailSession, raw: &[u8]) -> Result<()> {
    let (alias, _) = session.open_folder(MailFolder::Sent, false)?;
    session.append(&alias, raw)?;
    debug!(%alias, "archived to Sent");
    Ok(())
}
