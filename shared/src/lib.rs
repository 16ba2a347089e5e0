//! Shared library for the Splash Play booking Lambda functions.
//!
//! This crate provides the booking domain (pricing, week grouping, formatting),
//! the third-party API clients, and the HTTP helpers used across all Lambda functions.

pub mod availability;
pub mod cache;
pub mod calendar;
pub mod calendly;
pub mod config;
pub mod error;
pub mod event_comment;
pub mod formatters;
pub mod http;
pub mod i18n;
pub mod models;
pub mod notifications;
pub mod pricing;
pub mod secrets;
pub mod signature;
pub mod stripe;
pub mod telegram;

pub use availability::{AvailabilityCalendar, AvailabilityService};
pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use calendar::{group_weeks, Day, Week, WeekSequence};
pub use calendly::{BookingRequest, CalendlyClient, CalendlyWebhookEvent};
pub use config::Config;
pub use error::{Error, Result};
pub use http::ApiResponse;
pub use i18n::Language;
pub use notifications::Notifier;
pub use pricing::{quote, EventType, PricingData, PricingOption};
pub use secrets::{get_booking_secrets, get_secret, BookingSecrets};
pub use stripe::StripeClient;
pub use telegram::TelegramClient;
