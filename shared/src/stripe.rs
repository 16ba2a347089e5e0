//! Payment API client (Stripe).

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{error, info};

use crate::signature::{verify, Tolerance};
use crate::{Error, Result};

pub const STRIPE_URL: &str = "https://api.stripe.com";
pub const STRIPE_API_VERSION: &str = "2025-10-29.clover";

/// Oldest webhook signature we accept.
const WEBHOOK_TOLERANCE_SECS: i64 = 300;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Everything needed to open an embedded checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionParams {
    /// Amount in euro cents
    pub amount: u32,
    pub product_name: String,
    pub customer_email: Option<String>,
    pub return_url: String,
    pub metadata: BTreeMap<String, String>,
}

impl CheckoutSessionParams {
    fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            ("ui_mode".to_string(), "custom".to_string()),
            ("billing_address_collection".to_string(), "auto".to_string()),
            ("return_url".to_string(), self.return_url.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("line_items[0][price_data][currency]".to_string(), "eur".to_string()),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                self.amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                self.product_name.clone(),
            ),
        ];
        if let Some(email) = &self.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        form.extend(
            self.metadata
                .iter()
                .map(|(key, value)| (format!("metadata[{}]", key), value.clone())),
        );
        form
    }
}

/// Either an object ID or the expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
}

impl Expandable<PaymentIntent> {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(intent) => &intent.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: Option<String>,
    pub payment_status: String,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub payment_intent: Option<Expandable<PaymentIntent>>,
}

impl CheckoutSession {
    /// Status of the payment intent, when it was expanded.
    pub fn payment_intent_status(&self) -> Option<&str> {
        match &self.payment_intent {
            Some(Expandable::Object(intent)) => Some(&intent.status),
            _ => None,
        }
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Payment intent ID of a session, or an empty string.
pub fn payment_intent_id(session: &CheckoutSession) -> &str {
    session
        .payment_intent
        .as_ref()
        .map(Expandable::id)
        .unwrap_or_default()
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// A verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

impl StripeEvent {
    /// Decode the event's object.
    pub fn object<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.object.clone())?)
    }
}

/// Verify a webhook signature and decode the event.
pub fn construct_event(
    payload: &str,
    signature_header: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<StripeEvent> {
    verify(
        signature_header,
        payload,
        secret,
        Some(Tolerance {
            now,
            max_age: Duration::seconds(WEBHOOK_TOLERANCE_SECS),
        }),
    )?;
    Ok(serde_json::from_str(payload)?)
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Client for the payment API.
pub struct StripeClient {
    http_client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(http_client: reqwest::Client, secret_key: String) -> Self {
        Self {
            http_client,
            base_url: STRIPE_URL.to_string(),
            secret_key,
        }
    }

    /// Point the client at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CheckoutSession> {
        let response = self
            .http_client
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", STRIPE_API_VERSION)
            .form(&params.form())
            .send()
            .await?;

        let session: CheckoutSession = Self::decode(response).await?;
        info!(session_id = %session.id, amount = params.amount, "Checkout session created");
        Ok(session)
    }

    /// Fetch a session with its payment intent expanded.
    pub async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession> {
        let response = self
            .http_client
            .get(format!("{}/v1/checkout/sessions/{}", self.base_url, session_id))
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", STRIPE_API_VERSION)
            .query(&[("expand[]", "payment_intent")])
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error.message)
            .unwrap_or(text);
        error!(status = status.as_u16(), message = %message, "Stripe request failed");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound(message));
        }
        Err(Error::upstream("Stripe", status.as_u16(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::compute_signature;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn params() -> CheckoutSessionParams {
        CheckoutSessionParams {
            amount: 9000,
            product_name: "Friends session: 2 canvases".to_string(),
            customer_email: Some("ana@example.com".to_string()),
            return_url: "https://splashplay.es/complete?session_id={CHECKOUT_SESSION_ID}".to_string(),
            metadata: BTreeMap::from([("eventType".to_string(), "friends".to_string())]),
        }
    }

    #[test]
    fn test_form_fields() {
        let form = params().form();
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(get("ui_mode"), Some("custom"));
        assert_eq!(get("line_items[0][price_data][currency]"), Some("eur"));
        assert_eq!(get("line_items[0][price_data][unit_amount]"), Some("9000"));
        assert_eq!(get("metadata[eventType]"), Some("friends"));
        assert_eq!(get("customer_email"), Some("ana@example.com"));
    }

    #[test]
    fn test_payment_intent_id() {
        let session: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_1", "payment_status": "paid", "payment_intent": "pi_1"
        }))
        .unwrap();
        assert_eq!(payment_intent_id(&session), "pi_1");
        assert_eq!(session.payment_intent_status(), None);

        let expanded: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_2", "payment_status": "paid",
            "payment_intent": {"id": "pi_2", "status": "succeeded", "amount": 9000}
        }))
        .unwrap();
        assert_eq!(payment_intent_id(&expanded), "pi_2");
        assert_eq!(expanded.payment_intent_status(), Some("succeeded"));

        let none: CheckoutSession = serde_json::from_value(serde_json::json!({
            "id": "cs_3", "payment_status": "unpaid", "payment_intent": null
        }))
        .unwrap();
        assert_eq!(payment_intent_id(&none), "");
    }

    #[tokio::test]
    async fn test_create_checkout_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .and(header("authorization", "Bearer sk_test"))
            .and(header("stripe-version", STRIPE_API_VERSION))
            .and(body_string_contains("ui_mode=custom"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_1",
                "client_secret": "cs_test_1_secret",
                "status": "open",
                "payment_status": "unpaid",
                "amount_total": 9000,
                "payment_intent": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = StripeClient::new(reqwest::Client::new(), "sk_test".to_string())
            .with_base_url(server.uri());
        let session = client.create_checkout_session(&params()).await.unwrap();

        assert_eq!(session.client_secret.as_deref(), Some("cs_test_1_secret"));
        assert_eq!(session.amount_total, Some(9000));
    }

    #[tokio::test]
    async fn test_retrieve_checkout_session_expands_payment_intent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_test_1"))
            .and(query_param("expand[]", "payment_intent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "cs_test_1",
                "status": "complete",
                "payment_status": "paid",
                "payment_intent": {"id": "pi_1", "status": "succeeded"}
            })))
            .mount(&server)
            .await;

        let client = StripeClient::new(reqwest::Client::new(), "sk_test".to_string())
            .with_base_url(server.uri());
        let session = client.retrieve_checkout_session("cs_test_1").await.unwrap();

        assert_eq!(session.status.as_deref(), Some("complete"));
        assert_eq!(payment_intent_id(&session), "pi_1");
    }

    #[tokio::test]
    async fn test_missing_session_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/checkout/sessions/cs_missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"message": "No such checkout.session: 'cs_missing'"}
            })))
            .mount(&server)
            .await;

        let client = StripeClient::new(reqwest::Client::new(), "sk_test".to_string())
            .with_base_url(server.uri());
        let err = client.retrieve_checkout_session("cs_missing").await.unwrap_err();

        assert!(matches!(err, Error::NotFound(ref m) if m.contains("cs_missing")));
    }

    #[tokio::test]
    async fn test_server_error_is_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/checkout/sessions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let client = StripeClient::new(reqwest::Client::new(), "sk_test".to_string())
            .with_base_url(server.uri());
        let err = client.create_checkout_session(&params()).await.unwrap_err();

        assert!(matches!(err, Error::Upstream { service: "Stripe", status: 500, .. }));
    }

    const EVENT: &str = r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1","payment_status":"paid","amount_total":9000,"metadata":{"sessionTitle":"Friends"},"payment_intent":"pi_1"}}}"#;

    #[test]
    fn test_construct_event() {
        let now = DateTime::from_timestamp(1_700_000_100, 0).unwrap();
        let signature = compute_signature("whsec", 1_700_000_000, EVENT).unwrap();
        let header = format!("t=1700000000,v1={}", signature);

        let event = construct_event(EVENT, &header, "whsec", now).unwrap();
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);

        let session: CheckoutSession = event.object().unwrap();
        assert_eq!(session.amount_total, Some(9000));
        assert_eq!(session.metadata_value("sessionTitle"), Some("Friends"));
    }

    #[test]
    fn test_construct_event_rejects_stale_signature() {
        let now = DateTime::from_timestamp(1_700_000_301, 0).unwrap();
        let signature = compute_signature("whsec", 1_700_000_000, EVENT).unwrap();
        let header = format!("t=1700000000,v1={}", signature);

        assert!(matches!(
            construct_event(EVENT, &header, "whsec", now),
            Err(Error::Signature(_))
        ));
    }
}
