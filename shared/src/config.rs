//! Configuration management for Lambda functions.

use std::env;

use crate::pricing::EventType;
use crate::{Error, Result};

const DEFAULT_SITE_URL: &str = "https://splashplay.es";
const DEFAULT_VENUE_ADDRESS: &str = "Carrer del Concili de Trento, 7, Barcelona";
const DEFAULT_BOOK_IN_ADVANCE_DAYS: u32 = 30;
const DEFAULT_CACHE_TTL_SECS: i64 = 60 * 60;

/// Scheduling event type ID for each bookable experience.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTypeIds {
    pub couples: String,
    pub family: String,
    pub friends: String,
    pub individual: String,
}

impl EventTypeIds {
    pub fn get(&self, event_type: EventType) -> &str {
        match event_type {
            EventType::Couples => &self.couples,
            EventType::Family => &self.family,
            EventType::Friends => &self.friends,
            EventType::Individual => &self.individual,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// ARN of the secret holding API credentials
    pub secrets_arn: String,
    /// AWS region
    pub aws_region: String,
    /// Scheduling event types
    pub event_type_ids: EventTypeIds,
    /// Chat that receives booking and payment notifications
    pub telegram_chat_id: i64,
    /// Public site URL used for checkout return links
    pub site_url: String,
    /// Payment dashboard account used for transaction links
    pub stripe_dashboard_account: Option<String>,
    /// How many days ahead customers can book
    pub book_in_advance_days: u32,
    /// Lifetime of cached availability, in seconds
    pub availability_cache_ttl_secs: i64,
    /// Studio address sent with every booking
    pub venue_address: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| Error::Config(format!("{} not set", key)))
        };

        let telegram_chat_id = required("TELEGRAM_CHAT_ID")?
            .parse()
            .map_err(|e| Error::Config(format!("TELEGRAM_CHAT_ID is not an integer: {}", e)))?;

        let book_in_advance_days = match lookup("BOOK_IN_ADVANCE_DAYS") {
            Some(value) => value
                .parse()
                .map_err(|e| Error::Config(format!("Invalid BOOK_IN_ADVANCE_DAYS: {}", e)))?,
            None => DEFAULT_BOOK_IN_ADVANCE_DAYS,
        };

        let availability_cache_ttl_secs = match lookup("AVAILABILITY_CACHE_TTL_SECS") {
            Some(value) => value.parse().map_err(|e| {
                Error::Config(format!("Invalid AVAILABILITY_CACHE_TTL_SECS: {}", e))
            })?,
            None => DEFAULT_CACHE_TTL_SECS,
        };

        Ok(Self {
            secrets_arn: required("BOOKING_SECRETS_ARN")?,
            aws_region: lookup("AWS_REGION").unwrap_or_else(|| "eu-west-1".to_string()),
            event_type_ids: EventTypeIds {
                couples: required("CALENDLY_COUPLES_EVENT_TYPE_ID")?,
                family: required("CALENDLY_FAMILY_EVENT_TYPE_ID")?,
                friends: required("CALENDLY_FRIENDS_EVENT_TYPE_ID")?,
                individual: required("CALENDLY_INDIVIDUAL_EVENT_TYPE_ID")?,
            },
            telegram_chat_id,
            site_url: lookup("PUBLIC_SITE_URL")
                .unwrap_or_else(|| DEFAULT_SITE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            stripe_dashboard_account: lookup("STRIPE_DASHBOARD_ACCOUNT"),
            book_in_advance_days,
            availability_cache_ttl_secs,
            venue_address: lookup("VENUE_ADDRESS")
                .unwrap_or_else(|| DEFAULT_VENUE_ADDRESS.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("BOOKING_SECRETS_ARN", "arn:aws:secretsmanager:eu-west-1:1:secret:booking"),
            ("CALENDLY_COUPLES_EVENT_TYPE_ID", "couples-id"),
            ("CALENDLY_FAMILY_EVENT_TYPE_ID", "family-id"),
            ("CALENDLY_FRIENDS_EVENT_TYPE_ID", "friends-id"),
            ("CALENDLY_INDIVIDUAL_EVENT_TYPE_ID", "individual-id"),
            ("TELEGRAM_CHAT_ID", "-100123"),
        ])
    }

    fn load(vars: &HashMap<&'static str, &'static str>) -> Result<Config> {
        Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_vars()).unwrap();

        assert_eq!(config.telegram_chat_id, -100123);
        assert_eq!(config.site_url, "https://splashplay.es");
        assert_eq!(config.book_in_advance_days, 30);
        assert_eq!(config.availability_cache_ttl_secs, 3600);
        assert_eq!(config.aws_region, "eu-west-1");
        assert_eq!(config.event_type_ids.get(EventType::Friends), "friends-id");
        assert!(config.stripe_dashboard_account.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = base_vars();
        vars.insert("PUBLIC_SITE_URL", "https://staging.splashplay.es/");
        vars.insert("BOOK_IN_ADVANCE_DAYS", "14");
        vars.insert("STRIPE_DASHBOARD_ACCOUNT", "acct_123");

        let config = load(&vars).unwrap();

        assert_eq!(config.site_url, "https://staging.splashplay.es");
        assert_eq!(config.book_in_advance_days, 14);
        assert_eq!(config.stripe_dashboard_account.as_deref(), Some("acct_123"));
    }

    #[test]
    fn test_missing_required_variable() {
        let mut vars = base_vars();
        vars.remove("CALENDLY_FAMILY_EVENT_TYPE_ID");

        let err = load(&vars).unwrap_err();
        assert!(err.to_string().contains("CALENDLY_FAMILY_EVENT_TYPE_ID"));
    }

    #[test]
    fn test_invalid_chat_id() {
        let mut vars = base_vars();
        vars.insert("TELEGRAM_CHAT_ID", "my-chat");
        assert!(matches!(load(&vars), Err(Error::Config(_))));
    }
}
