//! Staff notifications for payments and bookings.
//!
//! Message builders are pure; [`Notifier`] sends them and only logs delivery
//! failures so a webhook is never rejected because the chat is unreachable.

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{error, info};

use crate::calendly::{CanceledInvitee, InviteePayload};
use crate::event_comment::{session_title_from_comment, transaction_id_from_comment};
use crate::formatters::{format_visit_datetime, VisitFormat};
use crate::i18n::Language;
use crate::telegram::{escape_markdown, ParseMode, TelegramClient};

pub const PAYMENT_SUCCESS_STICKERS: [&str; 10] = [
    "CAACAgIAAxkBAAMFaTNYePmlrNHkc5VM5tMuZZB7lRwAAlYBAAIOJwwFKG2zp5BXJ8g2BA",
    "CAACAgEAAxkBAAMQaUBWHNOqbDTPOFtMrSdZbTBTNvsAAi4BAAL9CpAE1mHiF4Wfccc2BA",
    "CAACAgEAAxkBAAMRaUBWJJYhXAK78_prVRkYPCyzQdYAAp4BAAL9CpAEd56LO1ffyT42BA",
    "CAACAgIAAxkBAAMSaUBWMsmrBcnypdu4h5CbSGSNrWcAAn4dAAKhFnlLR--GTeP0ubM2BA",
    "CAACAgIAAxkBAAMTaUBWOGm8qbSmioO7ZFSb26jftBYAAoMZAALn7QhIKibTwGhK8LU2BA",
    "CAACAgIAAxkBAAMUaUBWRhR35087lhro3fsDcP5l7ggAAmcBAAIOJwwFTwf4IYEgPNY2BA",
    "CAACAgQAAxkBAAMVaUBWZF9PXxzGQwLoKu2jOsX6ZK4AAkoCAAK3Vj8AAcIlLY_0JKpKNgQ",
    "CAACAgIAAxkBAAMWaUBWcnoQ-J064y3ukjVsxL33ICkAAuAcAAI9OhFIRLpeZp_sx6k2BA",
    "CAACAgIAAxkBAAMXaUBWkw1wvVrqRL_3d1jST4GaZH8AAlwBAAI9DegEAAEyy_vxsi0ENgQ",
    "CAACAgIAAxkBAAMYaUBWmNaUqt9hQqksac_SF3HKRUcAAl0BAAI9DegEKNM9H_ZQfmU2BA",
];

pub fn random_success_sticker() -> &'static str {
    let index = rand::thread_rng().gen_range(0..PAYMENT_SUCCESS_STICKERS.len());
    PAYMENT_SUCCESS_STICKERS[index]
}

/// Payment dashboard page of a transaction.
pub fn dashboard_payment_url(account: Option<&str>, transaction_id: &str) -> String {
    match account {
        Some(account) => format!(
            "https://dashboard.stripe.com/{}/payments/{}",
            account, transaction_id
        ),
        None => format!("https://dashboard.stripe.com/payments/{}", transaction_id),
    }
}

fn transaction_link(account: Option<&str>, transaction_id: &str) -> String {
    format!(
        "Transaction ID: [{}]({})",
        escape_markdown(transaction_id),
        dashboard_payment_url(account, transaction_id)
    )
}

/// Cents as "90.00 €".
fn format_amount(amount_in_cents: i64) -> String {
    let sign = if amount_in_cents < 0 { "-" } else { "" };
    let cents = amount_in_cents.unsigned_abs();
    format!("{}{}.{:02} €", sign, cents / 100, cents % 100)
}

pub fn payment_success_message(
    amount_in_cents: i64,
    session_title: &str,
    transaction_id: &str,
    dashboard_account: Option<&str>,
) -> String {
    let mut message = String::from("💰 *New Payment Received!*\n\n");
    message += &format!("Amount: *{}*\n", format_amount(amount_in_cents));

    if !session_title.is_empty() {
        message += &format!("Event: {}\n", escape_markdown(session_title));
    }
    if !transaction_id.is_empty() {
        message += &transaction_link(dashboard_account, transaction_id);
        message += "\n";
    }

    message += "\nStatus: ✅ Payment Successful";
    message
}

pub fn invitee_created_message(invitee: &InviteePayload) -> String {
    let time = format_visit_datetime(
        invitee.scheduled_event.start_time,
        VisitFormat::Short,
        Language::En,
    );

    let mut message = if invitee.rescheduled {
        String::from("↔️ *Calendly event rescheduled*\n")
    } else {
        String::from("✅ *Calendly event created*\n")
    };
    message += &format!(
        "Guest: {}, ({})\n",
        escape_markdown(&invitee.name),
        invitee.email
    );
    message += &format!("Time: {}\n", escape_markdown(&time));
    message
}

pub fn invitee_canceled_message(canceled: &CanceledInvitee, dashboard_account: Option<&str>) -> String {
    let comment = canceled.invitee.comment();
    let transaction_id = transaction_id_from_comment(comment);
    let session_title = session_title_from_comment(comment);
    let cancellation = &canceled.cancellation;

    let mut message = String::from("‼️ *Event cancelled*\n");
    message += &format!("Event: {}\n", escape_markdown(session_title));
    message += &format!(
        "Guest: {} ({})\n",
        escape_markdown(&canceled.invitee.name),
        canceled.invitee.email
    );

    if !cancellation.canceled_by.is_empty() {
        message += &format!("Cancelled by: {}\n", escape_markdown(&cancellation.canceled_by));
    }
    if let Some(reason) = cancellation.reason.as_deref().filter(|r| !r.is_empty()) {
        message += &format!("Reason: {}", escape_markdown(reason));
    }

    if transaction_id.is_empty() {
        message += "\n⚠️ No transaction ID found - manual check required";
    } else {
        message += "\n💳 *Refund Required*\n";
        message += &transaction_link(dashboard_account, &transaction_id);
    }
    message
}

/// Details of a paid session that could not be booked.
#[derive(Debug, Clone, Copy)]
pub struct FailedBooking<'a> {
    pub session_title: &'a str,
    pub start_time: Option<DateTime<Utc>>,
    pub name: &'a str,
    pub email: &'a str,
    pub transaction_id: &'a str,
    pub reason: &'a str,
}

pub fn booking_failed_message(failed: &FailedBooking<'_>, dashboard_account: Option<&str>) -> String {
    let mut message = String::from("🚨 *Booking failed after payment*\n");
    message += &format!("Event: {}\n", escape_markdown(failed.session_title));
    message += &format!("Guest: {} ({})\n", escape_markdown(failed.name), failed.email);
    if let Some(start_time) = failed.start_time {
        let time = format_visit_datetime(start_time, VisitFormat::Short, Language::En);
        message += &format!("Time: {}\n", escape_markdown(&time));
    }
    message += &format!("Reason: {}\n", escape_markdown(failed.reason));
    if !failed.transaction_id.is_empty() {
        message += &transaction_link(dashboard_account, failed.transaction_id);
        message += "\n";
    }
    message += "\n⚠️ Book manually or refund";
    message
}

/// Sends staff notifications to the configured chat.
pub struct Notifier {
    telegram: TelegramClient,
    dashboard_account: Option<String>,
}

impl Notifier {
    pub fn new(telegram: TelegramClient, dashboard_account: Option<String>) -> Self {
        Self {
            telegram,
            dashboard_account,
        }
    }

    async fn send(&self, kind: &'static str, text: &str) {
        match self.telegram.send_message(text, ParseMode::Markdown).await {
            Ok(_) => info!(kind, "Notification sent"),
            Err(e) => error!(kind, error = %e, "Failed to send notification"),
        }
    }

    /// Celebration sticker followed by the payment summary.
    pub async fn payment_received(&self, amount_in_cents: i64, session_title: &str, transaction_id: &str) {
        if let Err(e) = self.telegram.send_sticker(random_success_sticker()).await {
            error!(error = %e, "Failed to send payment sticker");
        }
        let message = payment_success_message(
            amount_in_cents,
            session_title,
            transaction_id,
            self.dashboard_account.as_deref(),
        );
        self.send("payment", &message).await;
    }

    pub async fn invitee_created(&self, invitee: &InviteePayload) {
        self.send("invitee_created", &invitee_created_message(invitee))
            .await;
    }

    pub async fn invitee_canceled(&self, canceled: &CanceledInvitee) {
        let message = invitee_canceled_message(canceled, self.dashboard_account.as_deref());
        self.send("invitee_canceled", &message).await;
    }

    pub async fn booking_failed(&self, failed: &FailedBooking<'_>) {
        let message = booking_failed_message(failed, self.dashboard_account.as_deref());
        self.send("booking_failed", &message).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendly::{Cancellation, QuestionAndAnswer, ScheduledEvent};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn start_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-12-05T14:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn invitee(comment: &str) -> InviteePayload {
        InviteePayload {
            name: "Ana_Maria".to_string(),
            email: "ana@example.com".to_string(),
            scheduled_event: ScheduledEvent {
                uri: "https://api.calendly.com/scheduled_events/1".to_string(),
                start_time: start_time(),
            },
            rescheduled: false,
            questions_and_answers: vec![QuestionAndAnswer {
                question: "Comment".to_string(),
                answer: comment.to_string(),
                position: 0,
            }],
        }
    }

    fn canceled(comment: &str, reason: Option<&str>) -> CanceledInvitee {
        CanceledInvitee {
            invitee: invitee(comment),
            cancellation: Cancellation {
                reason: reason.map(str::to_string),
                canceled_by: "Ana".to_string(),
                created_at: start_time(),
            },
        }
    }

    #[test]
    fn test_sticker_comes_from_the_set() {
        for _ in 0..20 {
            assert!(PAYMENT_SUCCESS_STICKERS.contains(&random_success_sticker()));
        }
    }

    #[test]
    fn test_payment_success_message() {
        let message = payment_success_message(9000, "Friends session", "pi_123", Some("acct_1"));

        assert_eq!(
            message,
            "💰 *New Payment Received!*\n\n\
             Amount: *90.00 €*\n\
             Event: Friends session\n\
             Transaction ID: [pi\\_123](https://dashboard.stripe.com/acct_1/payments/pi_123)\n\
             \nStatus: ✅ Payment Successful"
        );
    }

    #[test]
    fn test_payment_success_message_without_details() {
        let message = payment_success_message(6050, "", "", None);
        assert!(message.contains("Amount: *60.50 €*"));
        assert!(!message.contains("Event:"));
        assert!(!message.contains("Transaction ID"));
    }

    #[test]
    fn test_invitee_created_message() {
        let message = invitee_created_message(&invitee(""));
        assert_eq!(
            message,
            "✅ *Calendly event created*\nGuest: Ana\\_Maria, (ana@example.com)\nTime: 05/12/2025, 15:00\n"
        );

        let mut rescheduled = invitee("");
        rescheduled.rescheduled = true;
        assert!(invitee_created_message(&rescheduled).starts_with("↔️ *Calendly event rescheduled*\n"));
    }

    #[test]
    fn test_invitee_canceled_message_with_transaction() {
        let message = invitee_canceled_message(
            &canceled("Couples session\nTransaction ID: pi_9", Some("Sick")),
            None,
        );

        assert!(message.starts_with("‼️ *Event cancelled*\nEvent: Couples session\n"));
        assert!(message.contains("Cancelled by: Ana\n"));
        assert!(message.contains("Reason: Sick"));
        assert!(message.contains("💳 *Refund Required*"));
        assert!(message.contains("(https://dashboard.stripe.com/payments/pi_9)"));
    }

    #[test]
    fn test_invitee_canceled_message_without_transaction() {
        let message = invitee_canceled_message(&canceled("", None), None);
        assert!(!message.contains("Reason:"));
        assert!(message.ends_with("⚠️ No transaction ID found - manual check required"));
    }

    #[test]
    fn test_booking_failed_message() {
        let failed = FailedBooking {
            session_title: "Individual session",
            start_time: Some(start_time()),
            name: "Ana",
            email: "ana@example.com",
            transaction_id: "pi_1",
            reason: "slot taken",
        };
        let message = booking_failed_message(&failed, None);

        assert!(message.contains("Time: 05/12/2025, 15:00"));
        assert!(message.contains("Reason: slot taken"));
        assert!(message.contains("payments/pi_1"));
    }

    #[tokio::test]
    async fn test_notifier_sends_sticker_then_message() {
        let server = MockServer::start().await;
        let ok = serde_json::json!({
            "ok": true,
            "result": {"message_id": 1, "chat": {"id": 1, "type": "private"}, "date": 0}
        });
        Mock::given(method("POST"))
            .and(path("/bottoken/sendSticker"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok.clone()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/bottoken/sendMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ok))
            .expect(1)
            .mount(&server)
            .await;

        let telegram = TelegramClient::new(reqwest::Client::new(), "token".to_string(), 1)
            .with_base_url(server.uri());
        Notifier::new(telegram, None)
            .payment_received(9000, "Friends", "pi_1")
            .await;
    }

    #[tokio::test]
    async fn test_notifier_swallows_delivery_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let telegram = TelegramClient::new(reqwest::Client::new(), "token".to_string(), 1)
            .with_base_url(server.uri());
        Notifier::new(telegram, None)
            .invitee_created(&invitee(""))
            .await;
    }
}
