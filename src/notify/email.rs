use lettre::address::Envelope;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use log::{debug, error, info};
use std::fmt::Display;
use url::Url;

use super::describe_event;
use crate::config::EmailConfig;
use crate::error::{Error, Result};
use crate::tracker::NotificationEvent;

const SUBJECT_ONLINE: &str = "[Ojala Cita Previa] Website is online!";
const SUBJECT_OFFLINE: &str = "[Ojala Cita Previa] Website is offline";

/// Sends a plain-text UTF-8 email per notification over STARTTLS.
///
/// Every recipient gets its own SMTP session, so a refused address does not
/// keep the message from the others.
pub struct EmailNotifier {
    website_url: Url,
    config: EmailConfig,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl EmailNotifier {
    /// # Errors
    ///
    /// Fails when the sender or a recipient is not a valid address.
    pub fn new(website_url: Url, config: EmailConfig) -> Result<Self> {
        let from = config.from_email.parse()?;
        let to = config
            .recipients
            .iter()
            .map(|recipient| recipient.parse())
            .collect::<std::result::Result<Vec<Mailbox>, _>>()?;

        Ok(Self {
            website_url,
            config,
            from,
            to,
        })
    }

    pub(crate) fn build_message(&self, event: &NotificationEvent) -> Result<Message> {
        let subject = match event {
            NotificationEvent::Success => SUBJECT_ONLINE,
            NotificationEvent::Error(_) => SUBJECT_OFFLINE,
        };

        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(recipient.clone());
        }

        Ok(builder.body(describe_event(&self.website_url, event))?)
    }

    pub(crate) async fn send(&self, event: &NotificationEvent) -> Result<()> {
        let message = self.build_message(event)?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.host)?
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(self.config.timeout))
            .build();

        debug!(
            "Sending email through {}:{} to {} recipients",
            self.config.host,
            self.config.port,
            self.to.len()
        );
        let delivered = self.deliver(&transport, &message).await?;
        info!("Email delivered to {delivered} of {} recipients", self.to.len());
        Ok(())
    }

    /// Sends `message` to each recipient in a separate envelope and returns
    /// how many accepted it. Refused recipients are logged.
    ///
    /// Fails only when nobody accepted the message.
    async fn deliver<T>(&self, transport: &T, message: &Message) -> Result<usize>
    where
        T: AsyncTransport + Sync,
        T::Error: Display,
    {
        let raw = message.formatted();
        let mut delivered = 0;
        let mut last_failure = None;

        for recipient in &self.to {
            let envelope =
                Envelope::new(Some(self.from.email.clone()), vec![recipient.email.clone()])?;
            match transport.send_raw(&envelope, &raw).await {
                Ok(_) => {
                    debug!("Email accepted for {recipient}");
                    delivered += 1;
                }
                Err(e) => {
                    error!("The recipient {recipient} could not be reached: {e}");
                    last_failure = Some(e.to_string());
                }
            }
        }

        match (delivered, last_failure) {
            (0, Some(failure)) => Err(Error::Delivery(format!(
                "none of the {} recipients could be reached, last error: {failure}",
                self.to.len()
            ))),
            (delivered, _) => Ok(delivered),
        }
    }
}
