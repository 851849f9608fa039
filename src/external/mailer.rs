use crate::config::SmtpConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    /// Returns `None` when SMTP is not configured.
    pub fn from_config(config: &SmtpConfig) -> AppResult<Option<Self>> {
        if !config.is_configured() {
            return Ok(None);
        }

        let host = config.host.clone().unwrap_or_default();
        let port = config.port.unwrap_or(587);
        let credentials = Credentials::new(
            config.user.clone().unwrap_or_default(),
            config.pass.clone().unwrap_or_default(),
        );

        // 465 is implicit TLS, everything else negotiates STARTTLS
        let builder = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
        }
        .map_err(|e| AppError::ConfigError(format!("Invalid SMTP host {host}: {e}")))?;

        let transport = builder.port(port).credentials(credentials).build();

        log::info!("SMTP transport configured for {host}:{port}");
        Ok(Some(Self {
            transport,
            from: config.from_header(),
        }))
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> AppResult<()> {
        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| AppError::ConfigError(format!("Invalid sender address: {e}")))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| AppError::validation(format!("Invalid recipient {}: {e}", email.to)))?)
            .subject(email.subject.clone())
            .header(ContentType::TEXT_HTML)
            .body(email.html.clone())
            .map_err(|e| AppError::InternalError(format!("Failed to build email: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::ExternalApiError(format!("SMTP send failed: {e}")))?;
        Ok(())
    }
}
