use crate::config::{MailConfig, SmtpSettings};
use crate::error::{NotifyError, Result};
use crate::record::ErrorRecord;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::extension::ClientId;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{error, info};

/// Delivers a failure report to maintainers.
pub trait Notifier {
    fn report_error(&self, record: &ErrorRecord) -> std::result::Result<(), NotifyError>;
}

/// Pick the notifier for `mail`: SMTP when a relay host is set, log-only otherwise.
pub fn from_config(mail: &MailConfig) -> Result<Box<dyn Notifier>> {
    match mail.relay()? {
        Some(settings) => Ok(Box::new(SmtpNotifier::new(settings)?)),
        None => Ok(Box::new(LogNotifier)),
    }
}

// ---------------------------------------------------------------------------
// SmtpNotifier
// ---------------------------------------------------------------------------

/// Plain SMTP submission to a single relay, one sender, one recipient.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    host: String,
    port: u16,
    from: Mailbox,
    to: Mailbox,
}

fn parse_mailbox(address: &str) -> std::result::Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

impl SmtpNotifier {
    pub fn new(settings: SmtpSettings) -> std::result::Result<Self, NotifyError> {
        Ok(Self {
            from: parse_mailbox(&settings.from)?,
            to: parse_mailbox(&settings.to)?,
            host: settings.host,
            port: settings.port,
        })
    }

    /// Build the report message. The `Date` header is RFC 2822.
    pub fn compose(&self, record: &ErrorRecord) -> std::result::Result<Message, NotifyError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(record.subject())
            .date_now()
            .header(ContentType::TEXT_PLAIN)
            .body(record.canonical_text())?;
        Ok(message)
    }
}

impl Notifier for SmtpNotifier {
    fn report_error(&self, record: &ErrorRecord) -> std::result::Result<(), NotifyError> {
        let message = self.compose(record)?;
        // Identify as the local hostname in EHLO.
        let client_id = ClientId::default();
        let transport = SmtpTransport::builder_dangerous(self.host.as_str())
            .port(self.port)
            .hello_name(client_id)
            .build();
        transport
            .send(&message)
            .map_err(|source| NotifyError::Transport {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;
        info!(relay = %self.host, port = self.port, to = %self.to, "failure report sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LogNotifier
// ---------------------------------------------------------------------------

/// Used when no relay is configured: the report only goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn report_error(&self, record: &ErrorRecord) -> std::result::Result<(), NotifyError> {
        error!(subject = %record.subject(), "no mail relay configured\n{record}");
        Ok(())
    }
}
