//! Scheduling API client (Calendly).
//!
//! Fetches bookable slots per event type, books invitees after payment, and
//! decodes the webhook events the scheduling service sends us.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::calendar::{add_days, sunday_of};
use crate::config::EventTypeIds;
use crate::formatters::BUSINESS_TIMEZONE;
use crate::pricing::EventType;
use crate::{Error, Result};

pub const CALENDLY_URL: &str = "https://api.calendly.com";

/// Longest range the available-times endpoint accepts per request.
const BATCH_SIZE_IN_DAYS: u32 = 7;

/// A bookable slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTime {
    pub invitees_remaining: u32,
    pub scheduling_url: String,
    pub start_time: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct AvailableTimesResponse {
    collection: Vec<AvailableTime>,
}

/// Invitee details needed to book a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub start_time: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    /// Booking comment, always the first question of the form
    pub comment: String,
}

#[derive(Debug, Serialize)]
struct CreateInviteeBody<'a> {
    event_type: String,
    start_time: String,
    location: Location<'a>,
    invitee: Invitee<'a>,
    questions_and_answers: [QuestionAndAnswer; 1],
}

#[derive(Debug, Serialize)]
struct Location<'a> {
    kind: &'static str,
    location: &'a str,
}

#[derive(Debug, Serialize)]
struct Invitee<'a> {
    name: &'a str,
    email: &'a str,
    timezone: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text_reminder_number: Option<&'a str>,
}

/// Start and end of each available-times request covering `days` from
/// tomorrow, rounded up to whole weeks.
pub fn availability_batches(today: NaiveDate, days: u32) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    // One extra batch reaches the end of the last week.
    let batch_count = days.div_ceil(BATCH_SIZE_IN_DAYS) + 1;
    let first_day = add_days(today, 1);

    (0..batch_count)
        .map(|i| {
            let start_day = add_days(first_day, (i * BATCH_SIZE_IN_DAYS) as i64);
            let end_day = if i == batch_count - 1 {
                add_days(sunday_of(start_day), 1)
            } else {
                add_days(start_day, BATCH_SIZE_IN_DAYS as i64)
            };
            (midnight_utc(start_day), midnight_utc(end_day))
        })
        .collect()
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn iso(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Client for the scheduling API.
pub struct CalendlyClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
    event_type_ids: EventTypeIds,
    venue_address: String,
}

impl CalendlyClient {
    pub fn new(
        http_client: reqwest::Client,
        token: String,
        event_type_ids: EventTypeIds,
        venue_address: String,
    ) -> Self {
        Self {
            http_client,
            base_url: CALENDLY_URL.to_string(),
            token,
            event_type_ids,
            venue_address,
        }
    }

    /// Point the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Full URI of an event type.
    ///
    /// Always built on the public API host, since the scheduling service
    /// compares it verbatim.
    pub fn event_type_uri(&self, event_type: EventType) -> String {
        format!(
            "{}/event_types/{}",
            CALENDLY_URL,
            self.event_type_ids.get(event_type)
        )
    }

    /// Bookable slots from tomorrow through the end of the week `days` ahead.
    ///
    /// Batches answered with a non-200 status or an unexpected body are logged
    /// and skipped. A transport error on any batch fails the whole fetch.
    /// The result is sorted by start time without duplicates.
    pub async fn available_times(
        &self,
        event_type: EventType,
        days: u32,
        today: NaiveDate,
    ) -> Result<Vec<AvailableTime>> {
        let event_type_uri = self.event_type_uri(event_type);
        let url = format!("{}/event_type_available_times", self.base_url);

        let requests = availability_batches(today, days)
            .into_iter()
            .map(|(start, end)| {
                self.http_client
                    .get(&url)
                    .bearer_auth(&self.token)
                    .query(&[
                        ("start_time", iso(start)),
                        ("end_time", iso(end)),
                        ("event_type", event_type_uri.clone()),
                    ])
                    .send()
            });

        let mut times = Vec::new();
        for response in join_all(requests).await {
            let response = response?;
            let status = response.status();
            if status != reqwest::StatusCode::OK {
                warn!(%event_type, status = status.as_u16(), "Available times batch failed");
                continue;
            }

            match response.json::<AvailableTimesResponse>().await {
                Ok(body) => times.extend(body.collection),
                Err(e) => error!(%event_type, error = %e, "Unexpected available times payload"),
            }
        }

        times.sort_by_key(|time| time.start_time);
        times.dedup_by_key(|time| time.start_time);

        info!(%event_type, slots = times.len(), "Fetched available times");
        Ok(times)
    }

    /// Book an invitee on a slot.
    pub async fn book_event(&self, event_type: EventType, booking: &BookingRequest) -> Result<()> {
        let body = CreateInviteeBody {
            event_type: self.event_type_uri(event_type),
            start_time: iso(booking.start_time),
            location: Location {
                kind: "physical",
                location: &self.venue_address,
            },
            invitee: Invitee {
                name: &booking.name,
                email: &booking.email,
                timezone: BUSINESS_TIMEZONE.name(),
                text_reminder_number: booking.phone.as_deref(),
            },
            questions_and_answers: [QuestionAndAnswer {
                question: "Comment".to_string(),
                answer: booking.comment.clone(),
                position: 0,
            }],
        };

        let response = self
            .http_client
            .post(format!("{}/invitees", self.base_url))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            error!(%event_type, status = status.as_u16(), "Failed to create scheduled event");
            return Err(Error::upstream("Calendly", status.as_u16(), text));
        }

        info!(%event_type, "Scheduled event created");
        Ok(())
    }
}

/// A custom question answered by the invitee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionAndAnswer {
    pub question: String,
    pub answer: String,
    pub position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ScheduledEvent {
    pub uri: String,
    pub start_time: DateTime<Utc>,
}

/// Invitee fields common to every webhook event.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InviteePayload {
    pub name: String,
    pub email: String,
    pub scheduled_event: ScheduledEvent,
    pub rescheduled: bool,
    pub questions_and_answers: Vec<QuestionAndAnswer>,
}

impl InviteePayload {
    /// Answer to the booking comment question.
    pub fn comment(&self) -> &str {
        self.questions_and_answers
            .iter()
            .find(|qa| qa.position == 0)
            .or_else(|| self.questions_and_answers.first())
            .map(|qa| qa.answer.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Cancellation {
    pub reason: Option<String>,
    pub canceled_by: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CanceledInvitee {
    #[serde(flatten)]
    pub invitee: InviteePayload,
    pub cancellation: Cancellation,
}

/// Webhook events we subscribe to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendlyWebhookEvent {
    InviteeCreated(InviteePayload),
    InviteeCanceled(CanceledInvitee),
}

#[derive(Debug, Deserialize)]
struct WebhookEnvelope {
    event: String,
    payload: serde_json::Value,
}

impl CalendlyWebhookEvent {
    /// Decode a raw webhook body.
    pub fn from_body(body: &str) -> Result<Self> {
        let envelope: WebhookEnvelope = serde_json::from_str(body)?;
        match envelope.event.as_str() {
            "invitee.created" => Ok(Self::InviteeCreated(serde_json::from_value(envelope.payload)?)),
            "invitee.canceled" => Ok(Self::InviteeCanceled(serde_json::from_value(envelope.payload)?)),
            other => Err(Error::Validation(format!("Unexpected webhook event: {}", other))),
        }
    }
}
