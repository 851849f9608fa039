use super::notification_templates::{self as templates, MailContext, RenderedEmail};
use crate::external::{MailTransport, OutgoingEmail};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Sends customer emails. Delivery problems are logged and reported as
/// `false`; they never fail the caller.
#[derive(Clone)]
pub struct NotificationService {
    transport: Option<Arc<dyn MailTransport>>,
    public_url: String,
}

impl NotificationService {
    pub fn new(transport: Option<Arc<dyn MailTransport>>, public_url: impl Into<String>) -> Self {
        if transport.is_none() {
            log::warn!("SMTP not configured, emails will be simulated");
        }
        Self {
            transport,
            public_url: public_url.into(),
        }
    }

    pub async fn send_payment_reminder(
        &self,
        to: &str,
        ctx: &MailContext,
        amount_cents: i64,
        due_date: DateTime<Utc>,
        days_until_due: i64,
    ) -> bool {
        let email = templates::payment_reminder(
            &self.public_url,
            ctx,
            amount_cents,
            due_date,
            days_until_due,
        );
        self.deliver(to, email).await
    }

    pub async fn send_payment_overdue(
        &self,
        to: &str,
        ctx: &MailContext,
        amount_cents: i64,
        due_date: DateTime<Utc>,
        days_overdue: i64,
    ) -> bool {
        let email = templates::payment_overdue(
            &self.public_url,
            ctx,
            amount_cents,
            due_date,
            days_overdue,
        );
        self.deliver(to, email).await
    }

    pub async fn send_renewal_success(
        &self,
        to: &str,
        ctx: &MailContext,
        amount_cents: i64,
        next_due_date: DateTime<Utc>,
    ) -> bool {
        let email = templates::renewal_success(
            &self.public_url,
            ctx,
            amount_cents,
            next_due_date,
        );
        self.deliver(to, email).await
    }

    pub async fn send_renewal_failure(
        &self,
        to: &str,
        ctx: &MailContext,
        amount_cents: i64,
        reason: &str,
    ) -> bool {
        let email = templates::renewal_failure(
            &self.public_url,
            ctx,
            amount_cents,
            reason,
        );
        self.deliver(to, email).await
    }

    async fn deliver(&self, to: &str, email: RenderedEmail) -> bool {
        let Some(transport) = &self.transport else {
            log::info!("[simulated email] to={to} subject={}", email.subject);
            return true;
        };

        let outgoing = OutgoingEmail {
            to: to.to_string(),
            subject: email.subject,
            html: email.html,
        };
        match transport.send(&outgoing).await {
            Ok(()) => {
                log::info!("Email sent to {to}: {}", outgoing.subject);
                true
            }
            Err(e) => {
                log::error!("Failed to send email to {to}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult};
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<OutgoingEmail>>,
        fail: bool,
    }

    #[async_trait]
    impl MailTransport for Recording {
        async fn send(&self, email: &OutgoingEmail) -> AppResult<()> {
            if self.fail {
                return Err(AppError::ExternalApiError("smtp down".into()));
            }
            self.sent.lock().unwrap().push(email.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_simulated_send_succeeds() {
        let service = NotificationService::new(None, "https://u.test");
        assert!(
            service
                .send_renewal_failure("a@b.com", &MailContext::default(), 100, "sem cartão")
                .await
        );
    }

    #[tokio::test]
    async fn test_transport_failure_returns_false() {
        let transport = Arc::new(Recording {
            fail: true,
            ..Default::default()
        });
        let service = NotificationService::new(Some(transport), "https://u.test");
        assert!(
            !service
                .send_renewal_success("a@b.com", &MailContext::default(), 100, Utc::now())
                .await
        );
    }

    #[tokio::test]
    async fn test_email_reaches_transport() {
        let transport = Arc::new(Recording::default());
        let service = NotificationService::new(Some(transport.clone()), "https://u.test");
        assert!(
            service
                .send_payment_overdue("a@b.com", &MailContext::default(), 100, Utc::now(), 3)
                .await
        );
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@b.com");
    }
}
