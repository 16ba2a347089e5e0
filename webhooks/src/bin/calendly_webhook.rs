//! Calendly Webhook Lambda - Relays booking changes to staff.
//!
//! Verifies the `Calendly-Webhook-Signature` header and forwards new,
//! rescheduled and cancelled bookings to the staff chat. Cancellation notices
//! link the payment to refund when the booking comment carries one.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{body_text, header, json_response, text_response};
use shared::models::WebhookReceived;
use shared::signature::verify;
use shared::{get_booking_secrets, CalendlyWebhookEvent, Config, Notifier, TelegramClient};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    webhook_secret: String,
    notifier: Notifier,
}

impl AppState {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws_region.clone()))
            .load()
            .await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);
        let secrets = get_booking_secrets(&secrets_client, &config.secrets_arn).await?;

        let telegram = TelegramClient::new(
            reqwest::Client::new(),
            secrets.telegram_bot_token,
            config.telegram_chat_id,
        );

        Ok(Self {
            webhook_secret: secrets.calendly_webhook_secret,
            notifier: Notifier::new(telegram, config.stripe_dashboard_account),
        })
    }
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let Some(signature) = header(&event, "calendly-webhook-signature") else {
        return text_response(401, "Webhook Error: Signature not found");
    };
    let payload = match body_text(event.body()) {
        Ok(payload) => payload,
        Err(e) => return text_response(400, format!("Webhook Error: {}", e)),
    };

    if let Err(e) = verify(signature, payload, &state.webhook_secret, None) {
        warn!(error = %e, "Rejected scheduling webhook");
        return text_response(401, "Webhook Error: Invalid signature");
    }

    let webhook_event = match CalendlyWebhookEvent::from_body(payload) {
        Ok(webhook_event) => webhook_event,
        Err(e) => {
            warn!(error = %e, "Unexpected scheduling webhook payload");
            return text_response(400, "Webhook Error: Unexpected event format");
        }
    };

    match &webhook_event {
        CalendlyWebhookEvent::InviteeCreated(invitee) => {
            info!(rescheduled = invitee.rescheduled, "Invitee created");
            state.notifier.invitee_created(invitee).await;
        }
        CalendlyWebhookEvent::InviteeCanceled(canceled) => {
            info!(canceled_by = %canceled.cancellation.canceled_by, "Invitee canceled");
            state.notifier.invitee_canceled(canceled).await;
        }
    }

    json_response(200, &WebhookReceived::default())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let state = Arc::new(AppState::new().await?);
    let state_clone = state.clone();

    run(service_fn(move |event| {
        let state = state_clone.clone();
        async move { handler(state, event).await }
    }))
    .await
}
