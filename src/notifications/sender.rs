use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

/// Outbound channel for user notifications.
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

pub struct SmtpSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpSender {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .context("create smtp relay")?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        };
        let builder = builder.port(config.port);
        let builder = if config.user.is_empty() {
            builder
        } else {
            builder.credentials(Credentials::new(
                config.user.clone(),
                config.password.clone(),
            ))
        };

        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("invalid SMTP_FROM address {:?}", config.from))?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl MessageSender for SmtpSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let to_mailbox: Mailbox = to
            .parse()
            .with_context(|| format!("invalid recipient {to:?}"))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .context("build email")?;

        self.transport.send(message).await.context("smtp send")?;
        info!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}
