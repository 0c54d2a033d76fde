//! # Stay Pricing
//!
//! Pure calculation of a stay's base charge from room tariffs and stay
//! parameters. No I/O, no side effects; the ledger service feeds it the room
//! it already fetched inside its transaction.
//!
//! ## Tariff Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  stay_type = daily        → base_price × nights                         │
//! │  stay_type = three_hours  → short_stay_3h_price, nights forced to 1     │
//! │  stay_type = six_hours    → short_stay_6h_price, nights forced to 1     │
//! │                                                                         │
//! │  total = tariff total + additional_income (extras agreed at check-in)   │
//! │                                                                         │
//! │  A room without the requested short-stay tariff rejects the booking     │
//! │  before anything is written.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Room, StayType};

/// Longest bookable stay, in nights.
pub const MAX_NIGHTS: i64 = 365;

/// Parameters that determine a stay's price.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StayParams {
    pub stay_type: StayType,

    /// Number of nights; ignored (forced to 1) for short stays.
    pub nights: i64,

    /// Extras agreed at check-in, added on top of the tariff.
    pub additional_income: Money,
}

/// The priced breakdown of a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StayQuote {
    /// Price per night / per short-stay block.
    pub unit_price: Money,

    /// Billable nights (1 for short stays).
    pub nights: i64,

    /// unit_price × nights.
    pub stay_total: Money,

    /// stay_total + additional_income. This becomes the booking's initial
    /// total_amount.
    pub total: Money,
}

/// Computes a stay's base charge.
pub struct PricingCalculator;

impl PricingCalculator {
    /// Quotes a stay on the given room.
    ///
    /// ## Errors
    /// - `nights` out of [1, MAX_NIGHTS] for a daily stay
    /// - negative `additional_income`
    /// - the room does not offer the requested short-stay tariff
    pub fn quote(room: &Room, params: &StayParams) -> CoreResult<StayQuote> {
        if params.additional_income.is_negative() {
            return Err(ValidationError::MustNotBeNegative {
                field: "additional_income",
            }
            .into());
        }

        let (unit_price, nights) = match params.stay_type {
            StayType::Daily => {
                if params.nights < 1 || params.nights > MAX_NIGHTS {
                    return Err(ValidationError::OutOfRange {
                        field: "nights",
                        min: 1,
                        max: MAX_NIGHTS,
                    }
                    .into());
                }
                (room.base_price(), params.nights)
            }
            StayType::ThreeHours => (Self::tariff(room, room.short_stay_3h_price_cents, "3h")?, 1),
            StayType::SixHours => (Self::tariff(room, room.short_stay_6h_price_cents, "6h")?, 1),
        };

        let stay_total = unit_price.multiply_quantity(nights);

        Ok(StayQuote {
            unit_price,
            nights,
            stay_total,
            total: stay_total + params.additional_income,
        })
    }

    fn tariff(room: &Room, cents: Option<i64>, tier: &'static str) -> CoreResult<Money> {
        match cents {
            Some(cents) => Ok(Money::from_cents(cents)),
            None => Err(ValidationError::TariffNotConfigured {
                room_number: room.room_number.clone(),
                tier,
            }
            .into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
