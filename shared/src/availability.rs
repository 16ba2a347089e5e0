//! Cached availability per event type.

use chrono::Duration;
use tracing::{debug, info};

use crate::cache::{Clock, TtlCache};
use crate::calendar::{group_weeks, WeekSequence};
use crate::calendly::{AvailableTime, CalendlyClient};
use crate::pricing::EventType;
use crate::Result;

/// Bookable slots and the same slots grouped into calendar weeks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityCalendar {
    pub slots: Vec<AvailableTime>,
    pub weeks: WeekSequence,
}

pub struct AvailabilityService<C: Clock> {
    calendly: CalendlyClient,
    cache: TtlCache<EventType, Vec<AvailableTime>, C>,
    book_in_advance_days: u32,
}

impl<C: Clock> AvailabilityService<C> {
    pub fn new(calendly: CalendlyClient, clock: C, ttl: Duration, book_in_advance_days: u32) -> Self {
        Self {
            calendly,
            cache: TtlCache::new(ttl, clock),
            book_in_advance_days,
        }
    }

    pub fn calendly(&self) -> &CalendlyClient {
        &self.calendly
    }

    /// Slots for an event type, from the cache while fresh.
    pub async fn available_times(&self, event_type: EventType) -> Result<Vec<AvailableTime>> {
        if let Some(times) = self.cache.get(&event_type).await {
            debug!(%event_type, "Availability cache hit");
            return Ok(times);
        }

        info!(%event_type, "Availability cache miss");
        let today = self.cache.clock().now().date_naive();
        let times = self
            .calendly
            .available_times(event_type, self.book_in_advance_days, today)
            .await?;

        self.cache.put(event_type, times.clone()).await;
        Ok(times)
    }

    pub async fn invalidate(&self, event_type: EventType) {
        self.cache.invalidate(&event_type).await;
    }

    pub async fn invalidate_all(&self) {
        self.cache.clear().await;
    }

    pub async fn calendar(&self, event_type: EventType) -> Result<AvailabilityCalendar> {
        let slots = self.available_times(event_type).await?;
        let starts: Vec<_> = slots.iter().map(|slot| slot.start_time).collect();
        let weeks = group_weeks(&starts);
        Ok(AvailabilityCalendar { slots, weeks })
    }
}
