//! Availability Lambda - Bookable slots for an experience.
//!
//! Endpoints:
//! - GET /api/availability?eventType={couples|family|friends|individual}
//!
//! Slots are cached per event type for the lifetime of the warm container.

use chrono::Duration;
use lambda_http::{run, service_fn, Body, Error, Request, Response};
use shared::cache::{Clock, SystemClock};
use shared::http::{domain_error_response, error_response, json_response, query_param};
use shared::models::AvailabilityResponse;
use shared::{get_booking_secrets, AvailabilityService, CalendlyClient, Config, EventType};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Application state
struct AppState<C: Clock> {
    availability: AvailabilityService<C>,
}

impl AppState<SystemClock> {
    async fn new() -> Result<Self, Error> {
        let config = Config::from_env()?;
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws_region.clone()))
            .load()
            .await;
        let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);
        let secrets = get_booking_secrets(&secrets_client, &config.secrets_arn).await?;

        let calendly = CalendlyClient::new(
            reqwest::Client::new(),
            secrets.calendly_token,
            config.event_type_ids.clone(),
            config.venue_address.clone(),
        );

        Ok(Self {
            availability: AvailabilityService::new(
                calendly,
                SystemClock,
                Duration::seconds(config.availability_cache_ttl_secs),
                config.book_in_advance_days,
            ),
        })
    }
}

async fn handler<C: Clock>(state: Arc<AppState<C>>, event: Request) -> Result<Response<Body>, Error> {
    let Some(raw_event_type) = query_param(&event, "eventType") else {
        return error_response(400, "Missing eventType");
    };
    let event_type: EventType = match raw_event_type.parse() {
        Ok(event_type) => event_type,
        Err(e) => return domain_error_response(&e),
    };

    info!(%event_type, "Availability request");

    match state.availability.calendar(event_type).await {
        Ok(calendar) => json_response(200, &AvailabilityResponse::from(calendar)),
        Err(e) => {
            error!(%event_type, error = %e, "Error fetching availability");
            error_response(500, "Failed to fetch availability")
        }
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
