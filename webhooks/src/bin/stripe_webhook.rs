//! Stripe Webhook Lambda - Handles completed payments.
//!
//! This Lambda receives payment webhooks, verifies their signature, notifies
//! staff of the payment and books the paid slot on the scheduling service.
//!
//! Once the signature checks out the webhook is always acknowledged;
//! notification and booking failures are logged and reported to staff.

use chrono::Utc;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::calendly::BookingRequest;
use shared::event_comment::format_event_comment;
use shared::http::{body_text, header, json_response, text_response};
use shared::models::{BookingMetadata, WebhookReceived};
use shared::notifications::FailedBooking;
use shared::stripe::{construct_event, payment_intent_id, CheckoutSession, CHECKOUT_SESSION_COMPLETED};
use shared::{get_booking_secrets, CalendlyClient, Config, Notifier, TelegramClient};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    webhook_secret: String,
    calendly: CalendlyClient,
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

        let http_client = reqwest::Client::new();
        let telegram = TelegramClient::new(
            http_client.clone(),
            secrets.telegram_bot_token,
            config.telegram_chat_id,
        );

        Ok(Self {
            webhook_secret: secrets.stripe_webhook_secret,
            calendly: CalendlyClient::new(
                http_client,
                secrets.calendly_token,
                config.event_type_ids,
                config.venue_address,
            ),
            notifier: Notifier::new(telegram, config.stripe_dashboard_account),
        })
    }
}

/// Book the paid slot from the booking details stored on the session.
async fn book_paid_session(state: &AppState, session: &CheckoutSession, transaction_id: &str) {
    if session.metadata_value("eventType").is_none() {
        info!(session_id = %session.id, "Checkout session is not a booking");
        return;
    }

    let session_title = session.metadata_value("sessionTitle").unwrap_or_default();
    let failed = move |reason: &'static str| FailedBooking {
        session_title,
        start_time: None,
        name: session.metadata_value("fullName").unwrap_or_default(),
        email: session.metadata_value("email").unwrap_or_default(),
        transaction_id,
        reason,
    };

    let metadata = match BookingMetadata::from_metadata(&session.metadata) {
        Ok(metadata) => metadata,
        Err(e) => {
            error!(session_id = %session.id, error = %e, "Invalid booking metadata");
            state.notifier.booking_failed(&failed("Invalid booking details")).await;
            return;
        }
    };

    let (Some(name), Some(email)) = (metadata.full_name.clone(), metadata.email.clone()) else {
        warn!(session_id = %session.id, "Booking has no invitee name or email");
        let failed = FailedBooking {
            start_time: Some(metadata.datetime),
            ..failed("Missing invitee name or email")
        };
        state.notifier.booking_failed(&failed).await;
        return;
    };

    let booking = BookingRequest {
        start_time: metadata.datetime,
        name,
        email,
        phone: metadata.phone.clone(),
        comment: format_event_comment(transaction_id, &metadata.session_title),
    };

    if let Err(e) = state.calendly.book_event(metadata.event_type, &booking).await {
        error!(session_id = %session.id, error = %e, "Failed to book paid session");
        let reason = e.to_string();
        let failed = FailedBooking {
            session_title: &metadata.session_title,
            start_time: Some(booking.start_time),
            name: &booking.name,
            email: &booking.email,
            transaction_id,
            reason: &reason,
        };
        state.notifier.booking_failed(&failed).await;
    }
}

async fn handle_checkout_completed(state: &AppState, session: &CheckoutSession) {
    let session_title = session.metadata_value("sessionTitle").unwrap_or_default();
    let transaction_id = payment_intent_id(session);

    if let Some(amount) = session.amount_total.filter(|amount| *amount != 0) {
        state
            .notifier
            .payment_received(amount, session_title, transaction_id)
            .await;
    }

    if session.payment_status != "paid" {
        warn!(
            session_id = %session.id,
            payment_status = %session.payment_status,
            "Checkout completed without payment"
        );
        return;
    }

    book_paid_session(state, session, transaction_id).await;
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let Some(signature) = header(&event, "stripe-signature") else {
        return text_response(400, "Webhook Error: Signature not found");
    };
    let payload = match body_text(event.body()) {
        Ok(payload) => payload,
        Err(e) => return text_response(400, format!("Webhook Error: {}", e)),
    };

    let stripe_event = match construct_event(payload, signature, &state.webhook_secret, Utc::now()) {
        Ok(stripe_event) => stripe_event,
        Err(e) => {
            warn!(error = %e, "Rejected payment webhook");
            return text_response(400, format!("Webhook Error: {}", e));
        }
    };

    info!(event_id = %stripe_event.id, event_type = %stripe_event.event_type, "Payment webhook received");

    if stripe_event.event_type == CHECKOUT_SESSION_COMPLETED {
        match stripe_event.object::<CheckoutSession>() {
            Ok(session) => handle_checkout_completed(&state, &session).await,
            Err(e) => error!(event_id = %stripe_event.id, error = %e, "Unexpected checkout session payload"),
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
