//! Request and response payloads of the public API.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::availability::AvailabilityCalendar;
use crate::calendar::WeekSequence;
use crate::calendly::AvailableTime;
use crate::i18n::Language;
use crate::pricing::{EventType, PricingOption};
use crate::stripe::{payment_intent_id, CheckoutSession};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotResponse {
    pub invitees_remaining: u32,
    pub scheduling_url: String,
    pub start_time: DateTime<Utc>,
    pub status: String,
}

impl From<AvailableTime> for AvailableSlotResponse {
    fn from(time: AvailableTime) -> Self {
        Self {
            invitees_remaining: time.invitees_remaining,
            scheduling_url: time.scheduling_url,
            start_time: time.start_time,
            status: time.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub slots: Vec<AvailableSlotResponse>,
    pub weeks: WeekSequence,
}

impl From<AvailabilityCalendar> for AvailabilityResponse {
    fn from(calendar: AvailabilityCalendar) -> Self {
        Self {
            slots: calendar.slots.into_iter().map(Into::into).collect(),
            weeks: calendar.weeks,
        }
    }
}

/// Booking form submitted before payment.
///
/// Prices are quoted from `option` on the server.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentSessionRequest {
    pub option: PricingOption,
    pub datetime: DateTime<Utc>,
    #[serde(default)]
    pub lang: Option<Language>,
    pub calendar_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub full_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 6, max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentSessionResponse {
    pub client_secret: String,
}

/// Booking details carried on the checkout session until payment completes.
///
/// Stored as flat string metadata, so every field serializes to a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingMetadata {
    pub session_title: String,
    pub event_type: EventType,
    pub datetime: DateTime<Utc>,
    pub lang: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl BookingMetadata {
    pub fn to_metadata(&self) -> Result<BTreeMap<String, String>> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(fields) => Ok(fields
                .into_iter()
                .filter_map(|(key, value)| match value {
                    serde_json::Value::String(text) => Some((key, text)),
                    _ => None,
                })
                .collect()),
            _ => Err(Error::Internal("Booking metadata is not an object".to_string())),
        }
    }

    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::to_value(metadata)?)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatusResponse {
    pub status: Option<String>,
    pub payment_status: String,
    pub payment_intent_id: Option<String>,
    pub payment_intent_status: Option<String>,
}

impl From<&CheckoutSession> for SessionStatusResponse {
    fn from(session: &CheckoutSession) -> Self {
        let intent_id = payment_intent_id(session);
        Self {
            status: session.status.clone(),
            payment_status: session.payment_status.clone(),
            payment_intent_id: (!intent_id.is_empty()).then(|| intent_id.to_string()),
            payment_intent_status: session.payment_intent_status().map(str::to_string),
        }
    }
}

/// Acknowledgement returned to webhook senders.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct WebhookReceived {
    pub received: bool,
}

impl Default for WebhookReceived {
    fn default() -> Self {
        Self { received: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_is_camel_case() {
        let slot = AvailableSlotResponse::from(AvailableTime {
            invitees_remaining: 2,
            scheduling_url: "https://calendly.com/x".to_string(),
            start_time: DateTime::parse_from_rfc3339("2025-12-05T14:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            status: "available".to_string(),
        });

        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["inviteesRemaining"], 2);
        assert_eq!(json["schedulingUrl"], "https://calendly.com/x");
        assert_eq!(json["startTime"], "2025-12-05T14:00:00Z");
    }

    #[test]
    fn test_payment_request_parses_and_validates() {
        let request: CreatePaymentSessionRequest = serde_json::from_value(serde_json::json!({
            "option": {"eventType": "friends", "canvases": 3},
            "datetime": "2025-12-05T14:00:00Z",
            "lang": "en",
            "calendarId": "7f3c8a1e-59a4-4b59-9d44-5a0c1d7c9e10",
            "fullName": "Ana",
            "email": "ana@example.com"
        }))
        .unwrap();

        assert_eq!(request.option.event_type(), EventType::Friends);
        assert_eq!(request.lang, Some(Language::En));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_payment_request_rejects_bad_email() {
        let request: CreatePaymentSessionRequest = serde_json::from_value(serde_json::json!({
            "option": {"eventType": "individual"},
            "datetime": "2025-12-05T14:00:00Z",
            "email": "not-an-email"
        }))
        .unwrap();

        assert!(request.validate().is_err());
    }

    #[test]
    fn test_payment_request_ignores_client_amount() {
        let request: CreatePaymentSessionRequest = serde_json::from_value(serde_json::json!({
            "option": {"eventType": "couples", "picture": "one_small"},
            "datetime": "2025-12-05T14:00:00Z",
            "amount": 1
        }))
        .unwrap();

        assert!(request.lang.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_booking_metadata_as_flat_strings() {
        let metadata = BookingMetadata {
            session_title: "Friends session: 3 canvases".to_string(),
            event_type: EventType::Friends,
            datetime: DateTime::parse_from_rfc3339("2025-12-05T14:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            lang: Language::Ca,
            calendar_id: None,
            full_name: Some("Ana".to_string()),
            email: Some("ana@example.com".to_string()),
            phone: None,
        };

        let map = metadata.to_metadata().unwrap();
        assert_eq!(map["sessionTitle"], "Friends session: 3 canvases");
        assert_eq!(map["eventType"], "friends");
        assert_eq!(map["datetime"], "2025-12-05T14:00:00Z");
        assert_eq!(map["lang"], "ca");
        assert!(!map.contains_key("phone"));

        assert_eq!(BookingMetadata::from_metadata(&map).unwrap(), metadata);
    }

    #[test]
    fn test_booking_metadata_requires_event_type() {
        let map = BTreeMap::from([("sessionTitle".to_string(), "x".to_string())]);
        assert!(BookingMetadata::from_metadata(&map).is_err());
    }

    #[test]
    fn test_session_status_from_session() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1",
            "status": "complete",
            "payment_status": "paid",
            "payment_intent": {"id": "pi_1", "status": "succeeded"}
        }))
        .unwrap();

        let json = serde_json::to_value(SessionStatusResponse::from(&session)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "complete",
                "payment_status": "paid",
                "payment_intent_id": "pi_1",
                "payment_intent_status": "succeeded"
            })
        );
    }
}
