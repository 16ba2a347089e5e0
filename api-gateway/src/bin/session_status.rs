//! Session Status Lambda - Reports the outcome of a checkout.
//!
//! Endpoints:
//! - GET /api/get-session-status?session_id={id}

use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::http::{domain_error_response, error_response, json_response, query_param};
use shared::models::SessionStatusResponse;
use shared::{get_booking_secrets, Config, StripeClient};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState {
    stripe: StripeClient,
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
        })
    }
}

/// Session IDs are interpolated into the request path.
fn is_session_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

async fn handler(state: Arc<AppState>, event: Request) -> Result<Response<Body>, Error> {
    let Some(session_id) = query_param(&event, "session_id").filter(|id| is_session_id(id)) else {
        return error_response(404, "Session not found");
    };

    info!(session_id = %session_id, "Session status request");

    match state.stripe.retrieve_checkout_session(&session_id).await {
        Ok(session) => json_response(200, &SessionStatusResponse::from(&session)),
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
