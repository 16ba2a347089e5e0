//! Date and time formatting for customers and notifications.
//!
//! Slot times are presented in the business timezone (DST aware). Calendar
//! dates produced by week grouping are already UTC days and are formatted
//! as-is.
//!
//! Notifications use [`format_visit_datetime`]. The week, weekday and time
//! labels are library surface for the booking site's calendar.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

use crate::calendar::weekday_position;
use crate::i18n::{month_names, short_month_names, short_weekday_names, weekday_names, Language};

/// Timezone the studio operates in.
pub const BUSINESS_TIMEZONE: Tz = chrono_tz::Europe::Madrid;

/// Layout of [`format_visit_datetime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFormat {
    /// "Friday 5 December at 15:00"
    Long,
    /// "05/12/2025, 15:00"
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeekdayStyle {
    #[default]
    Long,
    Short,
}

/// "HH:MM" in the business timezone.
pub fn format_time(instant: DateTime<Utc>) -> String {
    instant
        .with_timezone(&BUSINESS_TIMEZONE)
        .format("%H:%M")
        .to_string()
}

/// Hour (0-23) in the business timezone.
pub fn hour_in_business_timezone(instant: DateTime<Utc>) -> u32 {
    instant.with_timezone(&BUSINESS_TIMEZONE).hour()
}

fn month_name(language: Language, month0: u32) -> &'static str {
    month_names(language)[month0 as usize]
}

/// "de " before a Catalan month, elided before a vowel.
fn catalan_of(month: &str) -> String {
    match month.chars().next() {
        Some('a' | 'e' | 'i' | 'o' | 'u') => format!("d'{}", month),
        _ => format!("de {}", month),
    }
}

/// Visit date and time in the business timezone.
pub fn format_visit_datetime(
    instant: DateTime<Utc>,
    format: VisitFormat,
    language: Language,
) -> String {
    let local = instant.with_timezone(&BUSINESS_TIMEZONE);

    match format {
        VisitFormat::Short => local.format("%d/%m/%Y, %H:%M").to_string(),
        VisitFormat::Long => {
            let weekday = weekday_names(language)[weekday_position(local.date_naive())];
            let month = month_name(language, local.month0());
            let day = local.day();
            let time = local.format("%H:%M");
            match language {
                Language::En => format!("{} {} {} at {}", weekday, day, month, time),
                Language::Es => format!("{}, {} de {}, {}", weekday, day, month, time),
                Language::Ca => format!("{}, {} {}, {}", weekday, day, catalan_of(month), time),
            }
        }
    }
}

/// Date range of a week, e.g. "24–30 de noviembre".
pub fn format_week(start: NaiveDate, end: NaiveDate, language: Language) -> String {
    let start_month = month_name(language, start.month0());
    let end_month = month_name(language, end.month0());
    let same_month = start.year() == end.year() && start.month() == end.month();

    match (language, same_month) {
        (Language::En, true) => format!("{} {} – {}", start_month, start.day(), end.day()),
        (Language::En, false) => format!(
            "{} {} – {} {}",
            start_month,
            start.day(),
            end_month,
            end.day()
        ),
        (Language::Es, true) => format!("{}–{} de {}", start.day(), end.day(), end_month),
        (Language::Es, false) => format!(
            "{} de {} – {} de {}",
            start.day(),
            start_month,
            end.day(),
            end_month
        ),
        (Language::Ca, true) => format!("{}–{} {}", start.day(), end.day(), catalan_of(end_month)),
        (Language::Ca, false) => format!(
            "{} {} – {} {}",
            start.day(),
            catalan_of(start_month),
            end.day(),
            catalan_of(end_month)
        ),
    }
}

/// Weekday name and "day month" label for a calendar column header.
pub fn format_weekday(date: NaiveDate, language: Language, style: WeekdayStyle) -> (String, String) {
    let position = weekday_position(date);
    let (weekday, month) = match style {
        WeekdayStyle::Long => (
            weekday_names(language)[position],
            month_names(language)[date.month0() as usize],
        ),
        WeekdayStyle::Short => (
            short_weekday_names(language)[position],
            short_month_names(language)[date.month0() as usize],
        ),
    };

    let label = match language {
        Language::En => format!("{} {}", month, date.day()),
        Language::Es | Language::Ca => format!("{} {}", date.day(), month),
    };
    (weekday.to_string(), label)
}
