//! Event types and their pricing rules.
//!
//! Amounts are EUR cents. Prices are always computed server-side from the
//! selected option; amounts sent by the browser are never trusted.
//!
//! [`format_price`] and [`new_canvas_count`] are library surface for the
//! booking site and are not called by the Lambdas.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::i18n::{translate, Language, TranslationKey};
use crate::{Error, Result};

/// Price of one canvas beyond the tiered range.
pub const CANVAS_PRICE: u32 = 3000;
/// Fixed price of an individual session.
pub const INDIVIDUAL_PRICE: u32 = 6000;
/// Most people allowed in a family session.
pub const FAMILY_MAX_PEOPLE: i32 = 7;
pub const FAMILY_MAX_CANVASES: i32 = 10;
pub const FRIENDS_MIN_CANVASES: i32 = 1;
pub const FRIENDS_MAX_CANVASES: i32 = 6;

/// Shared tier prices for 1..=6 canvases.
const TIER_PRICES: [u32; 6] = [6000, 9000, 12000, 14000, 16000, 18000];

/// A category of bookable experience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Couples,
    Family,
    Friends,
    Individual,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Couples,
        EventType::Family,
        EventType::Friends,
        EventType::Individual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Couples => "couples",
            EventType::Family => "family",
            EventType::Friends => "friends",
            EventType::Individual => "individual",
        }
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "couples" => Ok(EventType::Couples),
            "family" => Ok(EventType::Family),
            "friends" => Ok(EventType::Friends),
            "individual" => Ok(EventType::Individual),
            other => Err(Error::Validation(format!("Unknown event type: {}", other))),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas options offered to couples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouplesPicture {
    /// One shared 30x40 canvas
    OneSmall,
    /// One shared 60x80 canvas
    #[default]
    OneBig,
    /// Two individual 30x40 canvases
    Individual,
}

impl CouplesPicture {
    pub fn price(self) -> u32 {
        match self {
            CouplesPicture::OneSmall => 6000,
            CouplesPicture::OneBig => 8000,
            CouplesPicture::Individual => 9000,
        }
    }

    fn translation_key(self) -> TranslationKey {
        match self {
            CouplesPicture::OneSmall => TranslationKey::CouplesOneSmall,
            CouplesPicture::OneBig => TranslationKey::CouplesOneBig,
            CouplesPicture::Individual => TranslationKey::CouplesIndividual,
        }
    }
}

/// Price for a friends session; out-of-range counts are clamped.
pub fn friends_price(canvases: i32) -> u32 {
    let canvases = canvases.clamp(FRIENDS_MIN_CANVASES, FRIENDS_MAX_CANVASES);
    TIER_PRICES[(canvases - 1) as usize]
}

/// Price for a family session; each canvas past the tiers costs [`CANVAS_PRICE`].
///
/// Counts are clamped to `1..=FAMILY_MAX_CANVASES`.
pub fn family_price(canvases: i32) -> u32 {
    let canvases = canvases.clamp(1, FAMILY_MAX_CANVASES);
    let tiers = TIER_PRICES.len() as i32;
    if canvases <= tiers {
        TIER_PRICES[(canvases - 1) as usize]
    } else {
        TIER_PRICES[TIER_PRICES.len() - 1] + (canvases - tiers) as u32 * CANVAS_PRICE
    }
}

/// One canvas per kid by default, never fewer than one.
pub fn default_canvas_count(kids: i32) -> i32 {
    kids.max(1)
}

/// At least one adult and one kid, at most [`FAMILY_MAX_PEOPLE`] in total.
pub fn validate_people_count(adults: i32, kids: i32) -> bool {
    adults >= 1
        && kids >= 1
        && adults
            .checked_add(kids)
            .is_some_and(|total| total <= FAMILY_MAX_PEOPLE)
}

/// Canvas count after the kid count changes.
///
/// Canvases follow the kids while they matched, or while they lagged behind
/// and more kids were added. A count the user raised above the kids is kept.
pub fn new_canvas_count(canvases: i32, old_kids: i32, new_kids: i32) -> i32 {
    let follows = canvases == old_kids || (canvases < old_kids && new_kids > old_kids);
    if follows {
        default_canvas_count(new_kids)
    } else {
        canvases.max(1)
    }
}

/// The pricing choice made in the booking form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", rename_all = "lowercase")]
pub enum PricingOption {
    Couples {
        #[serde(default)]
        picture: CouplesPicture,
    },
    Family {
        adults: i32,
        kids: i32,
        canvases: i32,
    },
    Friends {
        canvases: i32,
    },
    Individual,
}

impl PricingOption {
    pub fn event_type(&self) -> EventType {
        match self {
            PricingOption::Couples { .. } => EventType::Couples,
            PricingOption::Family { .. } => EventType::Family,
            PricingOption::Friends { .. } => EventType::Friends,
            PricingOption::Individual => EventType::Individual,
        }
    }
}

/// Amount and display name of the selected option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingData {
    pub amount: u32,
    pub product_name: String,
}

/// Price an option and name it in `language`.
pub fn quote(option: &PricingOption, language: Language) -> Result<PricingData> {
    let t = |key| translate(language, key);

    match *option {
        PricingOption::Couples { picture } => Ok(PricingData {
            amount: picture.price(),
            product_name: t(picture.translation_key()).to_string(),
        }),
        PricingOption::Family {
            adults,
            kids,
            canvases,
        } => {
            if !validate_people_count(adults, kids) {
                return Err(Error::Validation(format!(
                    "Family sessions need at least one adult and one kid and at most {} people",
                    FAMILY_MAX_PEOPLE
                )));
            }
            if !(1..=FAMILY_MAX_CANVASES).contains(&canvases) {
                return Err(Error::Validation(format!(
                    "Canvases must be between 1 and {}",
                    FAMILY_MAX_CANVASES
                )));
            }
            Ok(PricingData {
                amount: family_price(canvases),
                product_name: format!(
                    "{}: {} {}, {} {}, {} {}",
                    t(TranslationKey::FamilySession),
                    adults,
                    t(TranslationKey::Adults),
                    kids,
                    t(TranslationKey::Kids),
                    canvases,
                    t(TranslationKey::Canvases)
                ),
            })
        }
        PricingOption::Friends { canvases } => {
            if !(FRIENDS_MIN_CANVASES..=FRIENDS_MAX_CANVASES).contains(&canvases) {
                return Err(Error::Validation(format!(
                    "Canvases must be between {} and {}",
                    FRIENDS_MIN_CANVASES, FRIENDS_MAX_CANVASES
                )));
            }
            Ok(PricingData {
                amount: friends_price(canvases),
                product_name: format!(
                    "{}: {} {}",
                    t(TranslationKey::FriendsSession),
                    canvases,
                    t(TranslationKey::Canvases)
                ),
            })
        }
        PricingOption::Individual => Ok(PricingData {
            amount: INDIVIDUAL_PRICE,
            product_name: t(TranslationKey::IndividualSession).to_string(),
        }),
    }
}

/// Whole-euro price as shown on the site.
pub fn format_price(amount_in_cents: u32, language: Language) -> String {
    let euros = (amount_in_cents + 50) / 100;
    match language {
        Language::En => format!("€{}", euros),
        Language::Es | Language::Ca => format!("{}\u{a0}€", euros),
    }
}
