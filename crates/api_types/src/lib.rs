//! Wire shapes shared by the HTTP server and its clients.
//!
//! Field names are camelCase. Ids travel as strings, timestamps as RFC3339
//! and decimal amounts as strings so no precision is lost in JSON. Enum
//! values (account, asset and transaction types) are SCREAMING_SNAKE_CASE
//! strings validated by the server.

use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `{"error": "..."}` body of every failed request.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// `limit`/`offset` query parameters. Values are kept as raw strings so that
/// a malformed number falls back to the default instead of failing.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Names of a closed enumeration, e.g. every account type.
#[derive(Debug, Serialize, Deserialize)]
pub struct TypeList {
    pub types: Vec<String>,
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Register {
        pub email: String,
        pub password: String,
        pub first_name: String,
        #[serde(default)]
        pub last_name: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Login {
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UserView {
        pub id: String,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    /// Returned by register and login.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AuthResponse {
        pub token: String,
        pub expires_at: DateTime<Utc>,
        pub user: UserView,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct UserUpdate {
        pub email: Option<String>,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ChangePassword {
        pub old_password: String,
        pub new_password: String,
    }

    /// Body of password validation and account deletion.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct PasswordCheck {
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PasswordValid {
        pub valid: bool,
    }
}

pub mod account {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountNew {
        pub name: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub balance: Option<Decimal>,
        pub currency: String,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountUpdate {
        pub name: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub balance: Option<Decimal>,
        pub currency: Option<String>,
    }

    /// Signed amount added to the cash balance.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceDelta {
        pub delta: Decimal,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountFilter {
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub currency: Option<String>,
        pub min_balance: Option<String>,
        pub max_balance: Option<String>,
        pub limit: Option<String>,
        pub offset: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountView {
        pub id: String,
        pub user_id: String,
        pub name: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub balance: Decimal,
        pub currency: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountList {
        pub accounts: Vec<AccountView>,
        pub count: usize,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct HoldingView {
        pub asset_id: String,
        pub definition_id: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub quantity: Decimal,
        pub symbol: String,
        pub name: String,
        pub suffix: String,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountWithAssetsView {
        pub account: AccountView,
        pub holdings: Vec<HoldingView>,
        pub total_balances: BTreeMap<String, Decimal>,
        pub asset_counts: BTreeMap<String, u64>,
        pub last_updated: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AccountSummary {
        pub total_accounts: u64,
        pub total_balance: Decimal,
        pub by_type: BTreeMap<String, u64>,
        pub by_currency: BTreeMap<String, Decimal>,
        pub holdings_by_suffix: BTreeMap<String, Decimal>,
    }
}

pub mod asset {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AssetNew {
        pub account_id: String,
        pub definition_id: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub quantity: Decimal,
        #[serde(default)]
        pub purchase_price: Decimal,
        pub current_price: Option<Decimal>,
        pub notes: Option<String>,
        pub purchase_date: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AssetUpdate {
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub quantity: Option<Decimal>,
        /// Unit price of the added quantity; re-averages the purchase price.
        pub price: Option<Decimal>,
        pub notes: Option<String>,
        pub purchase_date: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PriceUpdate {
        pub current_price: Decimal,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AssetFilter {
        pub account_id: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub min_quantity: Option<String>,
        pub max_quantity: Option<String>,
        pub created_from: Option<String>,
        pub created_to: Option<String>,
        pub limit: Option<String>,
        pub offset: Option<String>,
    }

    /// `from`/`to` window, both RFC3339.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct DateWindow {
        pub from: Option<String>,
        pub to: Option<String>,
    }

    /// Comma separated asset types; empty means all of them.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TotalValueQuery {
        pub types: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TotalValue {
        pub total_value: Decimal,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct AssetView {
        pub id: String,
        pub user_id: String,
        pub account_id: String,
        pub definition_id: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub quantity: Decimal,
        pub purchase_price: Decimal,
        pub current_price: Decimal,
        pub current_value: Decimal,
        pub purchase_value: Decimal,
        pub profit_loss: Decimal,
        pub profit_loss_percentage: Decimal,
        pub notes: Option<String>,
        pub purchase_date: DateTime<Utc>,
        pub last_updated: DateTime<Utc>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AssetList {
        pub assets: Vec<AssetView>,
        pub count: usize,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct PerformanceView {
        pub asset_id: String,
        pub name: String,
        pub symbol: String,
        pub suffix: String,
        #[serde(rename = "type")]
        pub kind: String,
        pub quantity: Decimal,
        pub purchase_date: DateTime<Utc>,
        pub initial_value: Decimal,
        pub current_value: Decimal,
        pub profit_loss: Decimal,
        pub profit_loss_percentage: Decimal,
    }
}

pub mod transaction {
    use super::*;

    /// Create and full-replace body.
    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionNew {
        pub account_id: String,
        pub asset_id: Option<String>,
        #[serde(rename = "type")]
        pub kind: String,
        pub amount: Decimal,
        #[serde(default)]
        pub quantity: Decimal,
        #[serde(default)]
        pub price: Decimal,
        #[serde(default)]
        pub fee: Decimal,
        pub currency: String,
        pub description: Option<String>,
        pub category: Option<String>,
        /// RFC3339 timestamp; the server uses now() when absent.
        pub date: Option<DateTime<FixedOffset>>,
        pub to_account_id: Option<String>,
        pub transaction_hash: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TransactionView {
        pub id: String,
        pub user_id: String,
        pub account_id: String,
        pub asset_id: Option<String>,
        #[serde(rename = "type")]
        pub kind: String,
        pub amount: Decimal,
        pub quantity: Decimal,
        pub price: Decimal,
        pub fee: Decimal,
        pub total_amount: Decimal,
        pub currency: String,
        pub description: Option<String>,
        pub category: Option<String>,
        pub date: DateTime<Utc>,
        pub to_account_id: Option<String>,
        pub transaction_hash: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransactionList {
        pub transactions: Vec<TransactionView>,
        pub limit: u64,
        pub offset: u64,
        pub count: usize,
    }

    /// Listing query. `from`/`to` narrow to a date window, `type` and
    /// `category` filter; they are mutually exclusive, checked in that order.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct TransactionQuery {
        pub limit: Option<String>,
        pub offset: Option<String>,
        pub from: Option<String>,
        pub to: Option<String>,
        #[serde(rename = "type")]
        pub kind: Option<String>,
        pub category: Option<String>,
    }

    /// Totals query: `groupBy` is `category` (default) or `type`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct TotalsQuery {
        pub group_by: Option<String>,
        pub from: Option<String>,
        pub to: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TotalView {
        pub key: String,
        pub net: Decimal,
        pub gross: Decimal,
        pub count: u64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MonthlyTotalView {
        pub year: i32,
        pub month: u32,
        pub total_in: Decimal,
        pub total_out: Decimal,
        pub net: Decimal,
    }
}

pub mod definition {
    use super::*;

    /// Create and full-replace body.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct DefinitionNew {
        pub name: String,
        pub abbreviation: String,
        #[serde(default)]
        pub suffix: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct DefinitionView {
        pub id: String,
        pub name: String,
        pub abbreviation: String,
        pub suffix: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct DefinitionList {
        pub definitions: Vec<DefinitionView>,
        pub limit: u64,
        pub offset: u64,
        pub count: usize,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct SearchQuery {
        pub q: Option<String>,
        pub limit: Option<String>,
        pub offset: Option<String>,
    }
}
