//! Booking confirmations
//!
//! Delivery is best-effort: [`NotificationSink`] errors are reported to the
//! caller, which logs and drops them.

mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::ReservationDetail;
use thiserror::Error;

pub use http::HttpEmailNotifier;

pub const CONFIRMATION_SUBJECT: &str = "Welcome To WeReserve";

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail relay unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("mail relay rejected message: status {status}, body {body}")]
    Rejected { status: u16, body: String },
}

/// What the guest is told about a new booking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationNotice {
    pub reservation_id: i64,
    pub recipient_name: String,
    pub recipient_email: String,
    pub table_name: String,
    pub reservation_datetime: DateTime<Utc>,
    pub number_of_people: i32,
}

impl From<&ReservationDetail> for ReservationNotice {
    fn from(detail: &ReservationDetail) -> Self {
        Self {
            reservation_id: detail.reservation.id,
            recipient_name: detail.user.name.clone(),
            recipient_email: detail.user.email.clone(),
            table_name: detail.table.name.clone(),
            reservation_datetime: detail.reservation.reservation_datetime,
            number_of_people: detail.reservation.number_of_people,
        }
    }
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn reservation_confirmed(&self, notice: &ReservationNotice) -> Result<(), NotifyError>;
}

/// Records notices in the log only
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn reservation_confirmed(&self, notice: &ReservationNotice) -> Result<(), NotifyError> {
        tracing::info!(
            reservation_id = notice.reservation_id,
            to = %notice.recipient_email,
            table = %notice.table_name,
            at = %notice.reservation_datetime.format(DATETIME_FORMAT),
            "Reservation confirmation (log only)"
        );
        Ok(())
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// HTML body of the confirmation email
pub fn render_confirmation(notice: &ReservationNotice) -> String {
    let cell = "border: 1px solid #dddddd; padding: 10px;";
    let head = "border: 1px solid #dddddd; padding: 10px; text-align: left; background-color: #f9f9f9;";
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Reservation Details</title></head>
<body style="font-family: Arial, sans-serif; background-color: #f4f4f4;">
  <div style="max-width: 600px; margin: 0 auto; background-color: #ffffff; border-radius: 8px;">
    <div style="background-color: #007bff; color: #ffffff; text-align: center; padding: 20px; font-size: 24px;">Reservation Details</div>
    <div style="padding: 20px;">
      <p>Hello {name},</p>
      <p>Here are the details of your reservation:</p>
      <table style="width: 100%; border-collapse: collapse;">
        <thead><tr><th style="{head}">Table Name</th><th style="{head}">Reservation Date &amp; Time</th><th style="{head}">Guests</th></tr></thead>
        <tbody><tr><td style="{cell}">{table}</td><td style="{cell}">{at}</td><td style="{cell}">{people}</td></tr></tbody>
      </table>
    </div>
    <div style="text-align: center; padding: 15px; font-size: 12px; color: #666666;">This is an automated email. Please do not reply directly to this message.</div>
  </div>
</body>
</html>"#,
        name = escape_html(&notice.recipient_name),
        table = escape_html(&notice.table_name),
        at = notice.reservation_datetime.format(DATETIME_FORMAT),
        people = notice.number_of_people,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn notice() -> ReservationNotice {
        ReservationNotice {
            reservation_id: 7,
            recipient_name: "Ana <Admin>".into(),
            recipient_email: "ana@example.com".into(),
            table_name: "Patio & Bar".into(),
            reservation_datetime: Utc.with_ymd_and_hms(2024, 6, 1, 19, 0, 0).unwrap(),
            number_of_people: 2,
        }
    }

    #[test]
    fn test_render_confirmation() {
        let html = render_confirmation(&notice());
        assert!(html.contains("2024-06-01 19:00"));
        assert!(html.contains("Patio &amp; Bar"));
        assert!(html.contains("Hello Ana &lt;Admin&gt;,"));
        assert!(!html.contains("<Admin>"));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        assert!(LogNotifier.reservation_confirmed(&notice()).await.is_ok());
    }
}
