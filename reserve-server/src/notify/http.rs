//! Mail relay client

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{CONFIRMATION_SUBJECT, NotificationSink, NotifyError, ReservationNotice};
use crate::core::config::NotifyConfig;

#[derive(Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html_body: String,
}

/// Posts confirmations as JSON to an HTTP mail relay
pub struct HttpEmailNotifier {
    client: Client,
    config: NotifyConfig,
}

impl HttpEmailNotifier {
    /// Every request, connect included, is bounded by `config.timeout`
    pub fn new(config: NotifyConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl NotificationSink for HttpEmailNotifier {
    async fn reservation_confirmed(&self, notice: &ReservationNotice) -> Result<(), NotifyError> {
        let payload = EmailPayload {
            from: &self.config.from,
            to: &notice.recipient_email,
            subject: CONFIRMATION_SUBJECT,
            html_body: super::render_confirmation(notice),
        };

        let res = self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            reservation_id = notice.reservation_id,
            to = %notice.recipient_email,
            "Confirmation email accepted by relay"
        );
        Ok(())
    }
}
