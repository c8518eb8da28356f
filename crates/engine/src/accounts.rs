//! The module contains `Account` struct and its implementation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{decimal_text, parse_decimal, parse_uuid},
};

/// Classification of an account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    BankAccount,
    Savings,
    Checking,
    CreditCard,
    Investment,
    CryptoWallet,
    CryptoExchange,
    Broker,
    Pension,
    Insurance,
    Home,
    Safe,
    Other,
}

impl AccountType {
    pub const ALL: [Self; 13] = [
        Self::BankAccount,
        Self::Savings,
        Self::Checking,
        Self::CreditCard,
        Self::Investment,
        Self::CryptoWallet,
        Self::CryptoExchange,
        Self::Broker,
        Self::Pension,
        Self::Insurance,
        Self::Home,
        Self::Safe,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::BankAccount => "BANK_ACCOUNT",
            Self::Savings => "SAVINGS",
            Self::Checking => "CHECKING",
            Self::CreditCard => "CREDIT_CARD",
            Self::Investment => "INVESTMENT",
            Self::CryptoWallet => "CRYPTO_WALLET",
            Self::CryptoExchange => "CRYPTO_EXCHANGE",
            Self::Broker => "BROKER",
            Self::Pension => "PENSION",
            Self::Insurance => "INSURANCE",
            Self::Home => "HOME",
            Self::Safe => "SAFE",
            Self::Other => "OTHER",
        }
    }
}

impl TryFrom<&str> for AccountType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| EngineError::Validation(format!("invalid account type: {value}")))
    }
}

/// An account.
///
/// An account is where a user keeps value: a bank account, a broker, a
/// crypto wallet, a safe. It carries a cash balance in one currency and
/// may hold any number of assets.
#[derive(Clone, Debug, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub kind: AccountType,
    pub balance: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        user_id: String,
        name: String,
        kind: AccountType,
        balance: Decimal,
        currency: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            kind,
            balance,
            currency,
            created_at: now,
            updated_at: now,
        }
    }

    /// Balance after applying `delta`, refusing to go below zero.
    pub fn balance_after(&self, delta: Decimal) -> ResultEngine<Decimal> {
        let next = self.balance + delta;
        if next < Decimal::ZERO {
            return Err(EngineError::InsufficientFunds(format!(
                "balance {} cannot absorb {delta}",
                self.balance
            )));
        }
        Ok(next)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub kind: String,
    pub balance: String,
    pub currency: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::assets::Entity")]
    Assets,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::assets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assets.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        Self {
            id: ActiveValue::Set(account.id.to_string()),
            user_id: ActiveValue::Set(account.user_id.clone()),
            name: ActiveValue::Set(account.name.clone()),
            kind: ActiveValue::Set(account.kind.as_str().to_string()),
            balance: ActiveValue::Set(decimal_text(account.balance)),
            currency: ActiveValue::Set(account.currency.clone()),
            created_at: ActiveValue::Set(account.created_at),
            updated_at: ActiveValue::Set(account.updated_at),
        }
    }
}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "account")?,
            kind: AccountType::try_from(model.kind.as_str())?,
            balance: parse_decimal(&model.balance, "account balance")?,
            user_id: model.user_id,
            name: model.name,
            currency: model.currency,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn account_type_round_trips_wire_names() {
        for kind in AccountType::ALL {
            assert_eq!(AccountType::try_from(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn unknown_account_type_is_rejected() {
        let err = AccountType::try_from("PIGGY_BANK").unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(AccountType::try_from("savings").is_err());
    }

    #[test]
    fn balance_after_refuses_negative() {
        let account = Account::new(
            "u".to_string(),
            "Main".to_string(),
            AccountType::Checking,
            dec!(50),
            "EUR".to_string(),
        );
        assert_eq!(account.balance_after(dec!(-50)).unwrap(), dec!(0));
        assert!(matches!(
            account.balance_after(dec!(-100)),
            Err(EngineError::InsufficientFunds(_))
        ));
    }
}
