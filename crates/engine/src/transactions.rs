//! Transaction primitives.
//!
//! A `Transaction` records a directional monetary or quantity event against an
//! account. It never moves balances by itself; it only classifies its own
//! effect as credit and/or debit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine,
    util::{decimal_text, parse_decimal, parse_optional_uuid, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
    Buy,
    Sell,
    Dividend,
    Interest,
    Fee,
    Income,
    Expense,
    Tax,
    Rebalance,
    Split,
    Merger,
    Staking,
    Mining,
    Airdrop,
    Lending,
    Borrowing,
    Repayment,
}

impl TransactionType {
    pub const ALL: [Self; 20] = [
        Self::Deposit,
        Self::Withdrawal,
        Self::Transfer,
        Self::Buy,
        Self::Sell,
        Self::Dividend,
        Self::Interest,
        Self::Fee,
        Self::Income,
        Self::Expense,
        Self::Tax,
        Self::Rebalance,
        Self::Split,
        Self::Merger,
        Self::Staking,
        Self::Mining,
        Self::Airdrop,
        Self::Lending,
        Self::Borrowing,
        Self::Repayment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "DEPOSIT",
            Self::Withdrawal => "WITHDRAWAL",
            Self::Transfer => "TRANSFER",
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Dividend => "DIVIDEND",
            Self::Interest => "INTEREST",
            Self::Fee => "FEE",
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::Tax => "TAX",
            Self::Rebalance => "REBALANCE",
            Self::Split => "SPLIT",
            Self::Merger => "MERGER",
            Self::Staking => "STAKING",
            Self::Mining => "MINING",
            Self::Airdrop => "AIRDROP",
            Self::Lending => "LENDING",
            Self::Borrowing => "BORROWING",
            Self::Repayment => "REPAYMENT",
        }
    }

    /// Outflow types. `Borrowing` is both debit and credit.
    pub fn is_debit(self) -> bool {
        matches!(
            self,
            Self::Withdrawal
                | Self::Buy
                | Self::Transfer
                | Self::Fee
                | Self::Expense
                | Self::Tax
                | Self::Borrowing
                | Self::Repayment
                | Self::Lending
        )
    }

    /// Inflow types. `Borrowing` is both debit and credit.
    pub fn is_credit(self) -> bool {
        matches!(
            self,
            Self::Deposit
                | Self::Sell
                | Self::Dividend
                | Self::Interest
                | Self::Income
                | Self::Staking
                | Self::Mining
                | Self::Airdrop
                | Self::Borrowing
        )
    }

    pub fn is_transfer(self) -> bool {
        matches!(self, Self::Transfer)
    }

    /// Types that act on a specific holding.
    pub fn is_asset_transaction(self) -> bool {
        matches!(
            self,
            Self::Buy
                | Self::Sell
                | Self::Dividend
                | Self::Split
                | Self::Merger
                | Self::Staking
                | Self::Mining
                | Self::Airdrop
        )
    }

    /// Cost-like types whose sign convention is left to the caller, so a
    /// zero or negative amount is accepted.
    pub fn allows_non_positive_amount(self) -> bool {
        matches!(
            self,
            Self::Withdrawal | Self::Expense | Self::Fee | Self::Tax | Self::Repayment
        )
    }

    /// Signed contribution of `amount` to a net figure: debit counts
    /// negative, anything else positive.
    pub fn signed(self, amount: Decimal) -> Decimal {
        if self.is_debit() { -amount } else { amount }
    }

    /// Signed contribution to a monthly net: credit is checked first.
    pub fn monthly_net(self, amount: Decimal) -> Decimal {
        if self.is_credit() {
            amount
        } else if self.is_debit() {
            -amount
        } else {
            Decimal::ZERO
        }
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| EngineError::Validation(format!("invalid transaction type: {value}")))
    }
}

/// Fields a caller supplies for a transaction, shared by create and update.
#[derive(Clone, Debug, PartialEq)]
pub struct TransactionFields {
    pub account_id: Uuid,
    pub asset_id: Option<Uuid>,
    pub kind: TransactionType,
    pub amount: Decimal,
    pub quantity: Decimal,
    pub price: Decimal,
    pub fee: Decimal,
    pub currency: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: DateTime<Utc>,
    pub to_account_id: Option<Uuid>,
    pub transaction_hash: Option<String>,
}

impl TransactionFields {
    /// Checks the type-specific rules before anything touches the store.
    pub fn validate(&self) -> ResultEngine<()> {
        if self.amount <= Decimal::ZERO && !self.kind.allows_non_positive_amount() {
            return Err(EngineError::Validation(format!(
                "amount must be > 0 for {}",
                self.kind.as_str()
            )));
        }
        if self.fee < Decimal::ZERO {
            return Err(EngineError::Validation("fee must be >= 0".to_string()));
        }
        if self.kind.is_transfer() && self.to_account_id.is_none() {
            return Err(EngineError::Validation(
                "transfer requires to_account_id".to_string(),
            ));
        }
        if matches!(self.kind, TransactionType::Buy | TransactionType::Sell)
            && self.asset_id.is_none()
        {
            return Err(EngineError::Validation(format!(
                "{} requires asset_id",
                self.kind.as_str()
            )));
        }
        if self.currency.trim().is_empty() {
            return Err(EngineError::Validation(
                "currency code must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub fields: TransactionFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(user_id: String, fields: TransactionFields) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            fields,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_debit(&self) -> bool {
        self.fields.kind.is_debit()
    }

    pub fn is_credit(&self) -> bool {
        self.fields.kind.is_credit()
    }

    /// Fee-adjusted total: the fee adds to an outflow and eats into an inflow.
    pub fn total_amount(&self) -> Decimal {
        let fields = &self.fields;
        if self.is_debit() {
            fields.amount + fields.fee
        } else {
            fields.amount - fields.fee
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub account_id: String,
    pub asset_id: Option<String>,
    pub kind: String,
    pub amount: String,
    pub quantity: String,
    pub price: String,
    pub fee: String,
    pub currency: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub date: DateTimeUtc,
    pub to_account_id: Option<String>,
    pub transaction_hash: Option<String>,
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
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        let fields = &tx.fields;
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            account_id: ActiveValue::Set(fields.account_id.to_string()),
            asset_id: ActiveValue::Set(fields.asset_id.map(|id| id.to_string())),
            kind: ActiveValue::Set(fields.kind.as_str().to_string()),
            amount: ActiveValue::Set(decimal_text(fields.amount)),
            quantity: ActiveValue::Set(decimal_text(fields.quantity)),
            price: ActiveValue::Set(decimal_text(fields.price)),
            fee: ActiveValue::Set(decimal_text(fields.fee)),
            currency: ActiveValue::Set(fields.currency.clone()),
            description: ActiveValue::Set(fields.description.clone()),
            category: ActiveValue::Set(fields.category.clone()),
            date: ActiveValue::Set(fields.date),
            to_account_id: ActiveValue::Set(fields.to_account_id.map(|id| id.to_string())),
            transaction_hash: ActiveValue::Set(fields.transaction_hash.clone()),
            created_at: ActiveValue::Set(tx.created_at),
            updated_at: ActiveValue::Set(tx.updated_at),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let fields = TransactionFields {
            account_id: parse_uuid(&model.account_id, "account")?,
            asset_id: parse_optional_uuid(model.asset_id.as_deref(), "asset")?,
            kind: TransactionType::try_from(model.kind.as_str())?,
            amount: parse_decimal(&model.amount, "amount")?,
            quantity: parse_decimal(&model.quantity, "quantity")?,
            price: parse_decimal(&model.price, "price")?,
            fee: parse_decimal(&model.fee, "fee")?,
            currency: model.currency,
            description: model.description,
            category: model.category,
            date: model.date,
            to_account_id: parse_optional_uuid(model.to_account_id.as_deref(), "to account")?,
            transaction_hash: model.transaction_hash,
        };
        Ok(Self {
            id: parse_uuid(&model.id, "transaction")?,
            user_id: model.user_id,
            fields,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn fields(kind: TransactionType, amount: Decimal) -> TransactionFields {
        TransactionFields {
            account_id: Uuid::new_v4(),
            asset_id: None,
            kind,
            amount,
            quantity: Decimal::ZERO,
            price: Decimal::ZERO,
            fee: Decimal::ZERO,
            currency: "EUR".to_string(),
            description: None,
            category: None,
            date: Utc::now(),
            to_account_id: None,
            transaction_hash: None,
        }
    }

    #[test]
    fn total_amount_adds_fee_on_debit_and_subtracts_on_credit() {
        let mut withdrawal = fields(TransactionType::Withdrawal, dec!(100));
        withdrawal.fee = dec!(5);
        assert_eq!(Transaction::new("u".into(), withdrawal).total_amount(), dec!(105));

        let mut deposit = fields(TransactionType::Deposit, dec!(100));
        deposit.fee = dec!(5);
        assert_eq!(Transaction::new("u".into(), deposit).total_amount(), dec!(95));
    }

    #[test]
    fn borrowing_is_both_debit_and_credit() {
        assert!(TransactionType::Borrowing.is_debit());
        assert!(TransactionType::Borrowing.is_credit());
        assert_eq!(TransactionType::Borrowing.monthly_net(dec!(10)), dec!(10));
        assert_eq!(TransactionType::Borrowing.signed(dec!(10)), dec!(-10));
    }

    #[test]
    fn neutral_types_are_neither() {
        for kind in [
            TransactionType::Rebalance,
            TransactionType::Split,
            TransactionType::Merger,
        ] {
            assert!(!kind.is_debit() && !kind.is_credit());
            assert_eq!(kind.monthly_net(dec!(3)), Decimal::ZERO);
        }
    }

    #[test]
    fn transfer_requires_destination() {
        let err = fields(TransactionType::Transfer, dec!(10)).validate().unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let mut ok = fields(TransactionType::Transfer, dec!(10));
        ok.to_account_id = Some(Uuid::new_v4());
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn buy_and_sell_require_asset() {
        for kind in [TransactionType::Buy, TransactionType::Sell] {
            assert!(fields(kind, dec!(10)).validate().is_err());
            let mut ok = fields(kind, dec!(10));
            ok.asset_id = Some(Uuid::new_v4());
            assert!(ok.validate().is_ok());
        }
    }

    #[test]
    fn zero_amount_only_for_cost_types() {
        assert!(fields(TransactionType::Deposit, dec!(0)).validate().is_err());
        assert!(fields(TransactionType::Expense, dec!(0)).validate().is_ok());
        assert!(fields(TransactionType::Fee, dec!(0)).validate().is_ok());
        assert!(fields(TransactionType::Expense, dec!(-1)).validate().is_ok());
        assert!(fields(TransactionType::Income, dec!(-1)).validate().is_err());
    }

    #[test]
    fn asset_transaction_classification() {
        assert!(TransactionType::Dividend.is_asset_transaction());
        assert!(!TransactionType::Deposit.is_asset_transaction());
        assert!(TransactionType::Transfer.is_transfer());
    }
}
