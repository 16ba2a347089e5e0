//! AWS Secrets Manager integration.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;

use crate::{Error, Result};

/// Third-party API credentials, stored as one JSON secret.
#[derive(Deserialize)]
pub struct BookingSecrets {
    pub stripe_secret_key: String,
    pub stripe_webhook_secret: String,
    pub calendly_token: String,
    pub calendly_webhook_secret: String,
    pub telegram_bot_token: String,
}

impl std::fmt::Debug for BookingSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingSecrets").finish_non_exhaustive()
    }
}

/// Get a secret value from Secrets Manager.
pub async fn get_secret(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let response = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to get secret: {}", e)))?;

    response
        .secret_string()
        .map(str::to_string)
        .ok_or_else(|| Error::Aws("Secret has no string value".to_string()))
}

/// Get the API credentials from Secrets Manager.
///
/// Lambdas call this once during cold start and keep the result in their
/// state.
pub async fn get_booking_secrets(client: &SecretsClient, secret_arn: &str) -> Result<BookingSecrets> {
    let secret_string = get_secret(client, secret_arn).await?;
    parse_booking_secrets(&secret_string)
}

fn parse_booking_secrets(secret_string: &str) -> Result<BookingSecrets> {
    serde_json::from_str(secret_string)
        .map_err(|e| Error::Aws(format!("Failed to parse booking secrets: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secrets() {
        let json = r#"{
            "stripe_secret_key": "sk_test_1",
            "stripe_webhook_secret": "whsec_1",
            "calendly_token": "cal_1",
            "calendly_webhook_secret": "calwh_1",
            "telegram_bot_token": "123:abc"
        }"#;
        let secrets = parse_booking_secrets(json).unwrap();
        assert_eq!(secrets.stripe_secret_key, "sk_test_1");
        assert_eq!(secrets.telegram_bot_token, "123:abc");
    }

    #[test]
    fn test_debug_hides_values() {
        let secrets = BookingSecrets {
            stripe_secret_key: "sk_live_secret".to_string(),
            stripe_webhook_secret: String::new(),
            calendly_token: String::new(),
            calendly_webhook_secret: String::new(),
            telegram_bot_token: String::new(),
        };
        assert!(!format!("{:?}", secrets).contains("sk_live_secret"));
    }

    #[test]
    fn test_parse_secrets_missing_field() {
        assert!(matches!(
            parse_booking_secrets(r#"{"stripe_secret_key":"sk"}"#),
            Err(Error::Aws(_))
        ));
    }
}
