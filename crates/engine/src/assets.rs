//! Asset primitives.
//!
//! An `Asset` is a quantity of a [`Definition`](crate::Definition) held inside
//! one account. Valuation is derived from `quantity` and the two price fields.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError,
    util::{decimal_text, parse_decimal, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Cash,
    TermDeposit,
    Stock,
    Etf,
    Fund,
    Bond,
    Option,
    Future,
    Cryptocurrency,
    Nft,
    DefiToken,
    PreciousMetal,
    RealEstate,
    Debt,
    Receivable,
    Salary,
    Other,
}

impl AssetType {
    pub const ALL: [Self; 17] = [
        Self::Cash,
        Self::TermDeposit,
        Self::Stock,
        Self::Etf,
        Self::Fund,
        Self::Bond,
        Self::Option,
        Self::Future,
        Self::Cryptocurrency,
        Self::Nft,
        Self::DefiToken,
        Self::PreciousMetal,
        Self::RealEstate,
        Self::Debt,
        Self::Receivable,
        Self::Salary,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::TermDeposit => "TERM_DEPOSIT",
            Self::Stock => "STOCK",
            Self::Etf => "ETF",
            Self::Fund => "FUND",
            Self::Bond => "BOND",
            Self::Option => "OPTION",
            Self::Future => "FUTURE",
            Self::Cryptocurrency => "CRYPTOCURRENCY",
            Self::Nft => "NFT",
            Self::DefiToken => "DEFI_TOKEN",
            Self::PreciousMetal => "PRECIOUS_METAL",
            Self::RealEstate => "REAL_ESTATE",
            Self::Debt => "DEBT",
            Self::Receivable => "RECEIVABLE",
            Self::Salary => "SALARY",
            Self::Other => "OTHER",
        }
    }
}

impl TryFrom<&str> for AssetType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| EngineError::Validation(format!("invalid asset type: {value}")))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Asset {
    pub id: Uuid,
    pub user_id: String,
    pub account_id: Uuid,
    pub definition_id: Uuid,
    pub kind: AssetType,
    pub quantity: Decimal,
    pub purchase_price: Decimal,
    pub current_price: Decimal,
    pub notes: Option<String>,
    pub purchase_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub fn current_value(&self) -> Decimal {
        self.quantity * self.current_price
    }

    pub fn purchase_value(&self) -> Decimal {
        self.quantity * self.purchase_price
    }

    pub fn profit_loss(&self) -> Decimal {
        self.current_value() - self.purchase_value()
    }

    /// Profit/loss relative to the purchase value, in percent.
    ///
    /// Zero when nothing was paid for the holding.
    pub fn profit_loss_percentage(&self) -> Decimal {
        let purchase_value = self.purchase_value();
        if purchase_value.is_zero() {
            return Decimal::ZERO;
        }
        self.profit_loss() / purchase_value * Decimal::ONE_HUNDRED
    }

    /// Overwrites the market price.
    pub fn update_price(&mut self, price: Decimal, at: DateTime<Utc>) {
        self.current_price = price;
        self.last_updated = at;
        self.updated_at = at;
    }

    /// Sets a new quantity.
    ///
    /// When the holding grows and a positive `price` is supplied for the added
    /// units, the purchase price becomes the weighted average of the old
    /// holding and the new units.
    pub fn update_quantity(&mut self, quantity: Decimal, price: Option<Decimal>, at: DateTime<Utc>) {
        if let Some(price) = price
            && quantity > self.quantity
            && price > Decimal::ZERO
        {
            let added = quantity - self.quantity;
            self.purchase_price =
                (self.quantity * self.purchase_price + added * price) / quantity;
        }
        self.quantity = quantity;
        self.updated_at = at;
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "assets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub definition_id: String,
    pub kind: String,
    pub quantity: String,
    pub purchase_price: String,
    pub current_price: String,
    pub notes: Option<String>,
    pub purchase_date: DateTimeUtc,
    pub last_updated: DateTimeUtc,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::definitions::Entity",
        from = "Column::DefinitionId",
        to = "super::definitions::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    Definitions,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::definitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Definitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Asset> for ActiveModel {
    fn from(asset: &Asset) -> Self {
        Self {
            id: ActiveValue::Set(asset.id.to_string()),
            user_id: ActiveValue::Set(asset.user_id.clone()),
            account_id: ActiveValue::Set(asset.account_id.to_string()),
            definition_id: ActiveValue::Set(asset.definition_id.to_string()),
            kind: ActiveValue::Set(asset.kind.as_str().to_string()),
            quantity: ActiveValue::Set(decimal_text(asset.quantity)),
            purchase_price: ActiveValue::Set(decimal_text(asset.purchase_price)),
            current_price: ActiveValue::Set(decimal_text(asset.current_price)),
            notes: ActiveValue::Set(asset.notes.clone()),
            purchase_date: ActiveValue::Set(asset.purchase_date),
            last_updated: ActiveValue::Set(asset.last_updated),
            created_at: ActiveValue::Set(asset.created_at),
            updated_at: ActiveValue::Set(asset.updated_at),
        }
    }
}

impl TryFrom<Model> for Asset {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "asset")?,
            account_id: parse_uuid(&model.account_id, "account")?,
            definition_id: parse_uuid(&model.definition_id, "definition")?,
            kind: AssetType::try_from(model.kind.as_str())?,
            quantity: parse_decimal(&model.quantity, "asset quantity")?,
            purchase_price: parse_decimal(&model.purchase_price, "purchase price")?,
            current_price: parse_decimal(&model.current_price, "current price")?,
            user_id: model.user_id,
            notes: model.notes,
            purchase_date: model.purchase_date,
            last_updated: model.last_updated,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn holding(quantity: Decimal, purchase_price: Decimal, current_price: Decimal) -> Asset {
        let now = Utc::now();
        Asset {
            id: Uuid::new_v4(),
            user_id: "u".to_string(),
            account_id: Uuid::new_v4(),
            definition_id: Uuid::new_v4(),
            kind: AssetType::Stock,
            quantity,
            purchase_price,
            current_price,
            notes: None,
            purchase_date: now,
            last_updated: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn weighted_average_on_quantity_increase() {
        let mut asset = holding(dec!(10), dec!(100), dec!(100));
        asset.update_quantity(dec!(15), Some(dec!(130)), Utc::now());
        assert_eq!(asset.quantity, dec!(15));
        assert_eq!(asset.purchase_price, dec!(110));
    }

    #[test]
    fn quantity_decrease_keeps_purchase_price() {
        let mut asset = holding(dec!(10), dec!(100), dec!(100));
        asset.update_quantity(dec!(4), Some(dec!(130)), Utc::now());
        assert_eq!(asset.quantity, dec!(4));
        assert_eq!(asset.purchase_price, dec!(100));
    }

    #[test]
    fn zero_price_skips_recompute() {
        let mut asset = holding(dec!(10), dec!(100), dec!(100));
        asset.update_quantity(dec!(20), Some(dec!(0)), Utc::now());
        assert_eq!(asset.purchase_price, dec!(100));
    }

    #[test]
    fn profit_and_loss() {
        let asset = holding(dec!(2), dec!(50), dec!(80));
        assert_eq!(asset.current_value(), dec!(160));
        assert_eq!(asset.purchase_value(), dec!(100));
        assert_eq!(asset.profit_loss(), dec!(60));
        assert_eq!(asset.profit_loss_percentage(), dec!(60));
    }

    #[test]
    fn zero_purchase_value_has_zero_percentage() {
        let asset = holding(dec!(3), dec!(0), dec!(10));
        assert_eq!(asset.profit_loss(), dec!(30));
        assert_eq!(asset.profit_loss_percentage(), Decimal::ZERO);
    }

    #[test]
    fn update_price_bumps_last_updated() {
        let mut asset = holding(dec!(1), dec!(10), dec!(10));
        let later = asset.last_updated + chrono::Duration::seconds(5);
        asset.update_price(dec!(12), later);
        assert_eq!(asset.current_price, dec!(12));
        assert_eq!(asset.last_updated, later);
    }
}
