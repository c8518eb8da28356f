//! Command and query structs for engine operations.
//!
//! These types group parameters for write operations and filtered reads,
//! keeping call sites readable and avoiding long argument lists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{AccountType, AssetType, EngineError, ResultEngine};

/// Offset/limit window for paginated listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Page {
    pub const DEFAULT_LIMIT: u64 = 20;
    pub const DEFINITIONS_DEFAULT_LIMIT: u64 = 50;
    pub const MAX_LIMIT: u64 = 100;

    /// Clamps raw values: a missing or non-positive limit falls back to
    /// `default_limit`, a limit above [`Page::MAX_LIMIT`] is capped, a negative
    /// offset becomes zero.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>, default_limit: u64) -> Self {
        let limit = match limit {
            Some(l) if l > 0 => (l as u64).min(Self::MAX_LIMIT),
            _ => default_limit,
        };
        let offset = offset.filter(|o| *o > 0).map_or(0, |o| o as u64);
        Self { limit, offset }
    }

    /// Listing window for accounts and transactions.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self::clamped(limit, offset, Self::DEFAULT_LIMIT)
    }

    /// Listing window for the definitions catalog.
    pub fn definitions(limit: Option<i64>, offset: Option<i64>) -> Self {
        Self::clamped(limit, offset, Self::DEFINITIONS_DEFAULT_LIMIT)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Inclusive date window `[from, to]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> ResultEngine<Self> {
        if from > to {
            return Err(EngineError::Validation(
                "start date must not be after end date".to_string(),
            ));
        }
        Ok(Self { from, to })
    }
}

#[derive(Clone, Debug)]
pub struct AccountNew {
    pub name: String,
    pub kind: AccountType,
    pub balance: Decimal,
    pub currency: String,
}

/// Partial account update. `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub kind: Option<AccountType>,
    pub balance: Option<Decimal>,
    pub currency: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AccountFilter {
    pub kind: Option<AccountType>,
    pub currency: Option<String>,
    pub min_balance: Option<Decimal>,
    pub max_balance: Option<Decimal>,
    pub page: Page,
}

#[derive(Clone, Debug)]
pub struct AssetNew {
    pub account_id: Uuid,
    pub definition_id: Uuid,
    pub kind: AssetType,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    /// Defaults to the purchase price.
    pub current_price: Option<Decimal>,
    pub notes: Option<String>,
    /// Defaults to now.
    pub purchase_date: Option<DateTime<Utc>>,
}

/// Partial asset update. `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct AssetUpdate {
    pub kind: Option<AssetType>,
    pub quantity: Option<Decimal>,
    /// Price paid for the units added by a quantity increase.
    pub price: Option<Decimal>,
    pub notes: Option<String>,
    pub purchase_date: Option<DateTime<Utc>>,
}

/// In-memory predicates over a user's assets, combined with AND.
///
/// `offset`/`limit` are applied after filtering; `limit` of `None` or `0`
/// returns everything from `offset` on.
#[derive(Clone, Debug, Default)]
pub struct AssetFilter {
    pub account_id: Option<Uuid>,
    pub kind: Option<AssetType>,
    pub min_quantity: Option<Decimal>,
    pub max_quantity: Option<Decimal>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct DefinitionNew {
    pub name: String,
    pub abbreviation: String,
    pub suffix: String,
}

#[derive(Clone, Debug)]
pub struct UserNew {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_clamps() {
        assert_eq!(Page::new(None, None), Page { limit: 20, offset: 0 });
        assert_eq!(Page::new(Some(0), Some(-5)), Page { limit: 20, offset: 0 });
        assert_eq!(Page::new(Some(-3), Some(7)), Page { limit: 20, offset: 7 });
        assert_eq!(Page::new(Some(500), None).limit, 100);
        assert_eq!(Page::new(Some(1), None).limit, 1);
    }

    #[test]
    fn definitions_page_defaults_to_fifty() {
        assert_eq!(Page::definitions(None, None).limit, 50);
        assert_eq!(Page::definitions(Some(1000), None).limit, 100);
    }

    #[test]
    fn date_range_rejects_inverted_bounds() {
        let now = Utc::now();
        let earlier = now - chrono::Duration::days(1);
        assert!(DateRange::new(now, earlier).is_err());
        let range = DateRange::new(earlier, now).unwrap();
        assert_eq!(range.from, earlier);
        assert_eq!(range.to, now);
        assert!(DateRange::new(now, now).is_ok());
    }
}
