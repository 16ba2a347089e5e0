//! Payment Session Lambda - Opens an embedded checkout for a booking.
//!
//! Endpoints:
//! - POST /api/payment-session
//!
//! The price is quoted here from the selected option; amounts sent by the
//! client are ignored. Booking details travel as checkout metadata so the
//! payment webhook can book the slot once the payment completes.

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{domain_error_response, error_response, json_response};
use shared::i18n::localized_path;
use shared::models::{BookingMetadata, CreatePaymentSessionRequest, CreatePaymentSessionResponse};
use shared::stripe::CheckoutSessionParams;
use shared::{get_booking_secrets, parse_body, quote, Config, PricingData, StripeClient};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use validator::Validate;

/// Application state
struct AppState {
    stripe: StripeClient,
    site_url: String,
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

        Ok(Self {
            stripe: StripeClient::new(reqwest::Client::new(), secrets.stripe_secret_key),
            site_url: config.site_url,
        })
    }
}

fn checkout_params(
    site_url: &str,
    request: &CreatePaymentSessionRequest,
    pricing: &PricingData,
) -> shared::Result<CheckoutSessionParams> {
    let lang = request.lang.unwrap_or_default();
    let metadata = BookingMetadata {
        session_title: pricing.product_name.clone(),
        event_type: request.option.event_type(),
        datetime: request.datetime,
        lang,
        calendar_id: request.calendar_id,
        full_name: request.full_name.clone(),
        email: request.email.clone(),
        phone: request.phone.clone(),
    };

    Ok(CheckoutSessionParams {
        amount: pricing.amount,
        product_name: pricing.product_name.clone(),
        customer_email: request.email.clone(),
        return_url: format!(
            "{}{}?session_id={{CHECKOUT_SESSION_ID}}",
            site_url,
            localized_path("/complete", lang)
        ),
        metadata: metadata.to_metadata()?,
    })
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let request: CreatePaymentSessionRequest = parse_body!(event.body());

    if let Err(e) = request.validate() {
        warn!(error = %e, "Invalid payment session request");
        return domain_error_response(&e.into());
    }

    let lang = request.lang.unwrap_or_default();
    let pricing = match quote(&request.option, lang) {
        Ok(pricing) => pricing,
        Err(e) => return domain_error_response(&e),
    };
    let params = match checkout_params(&state.site_url, &request, &pricing) {
        Ok(params) => params,
        Err(e) => return domain_error_response(&e),
    };

    info!(
        event_type = %request.option.event_type(),
        amount = pricing.amount,
        "Creating checkout session"
    );

    match state.stripe.create_checkout_session(&params).await {
        Ok(session) => match session.client_secret {
            Some(client_secret) => json_response(200, &CreatePaymentSessionResponse { client_secret }),
            None => {
                error!(session_id = %session.id, "Checkout session has no client secret");
                error_response(502, "Payment provider returned no client secret")
            }
        },
        Err(e) => domain_error_response(&e),
    }
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
