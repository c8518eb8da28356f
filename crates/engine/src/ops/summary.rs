//! Aggregate reads across a user's accounts, assets and transactions.
//!
//! Amounts are stored as decimal text, so every aggregate is folded in Rust
//! over the fetched rows rather than summed by SQLite.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    Account, AccountType, Caller, DateRange, EngineError, ResultEngine, Transaction, accounts,
    assets, definitions, transactions,
    util::parse_decimal,
};

use super::{Engine, with_tx};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AccountSummary {
    pub total_accounts: u64,
    /// Sum of cash balances, regardless of currency.
    pub total_balance: Decimal,
    pub by_type: BTreeMap<AccountType, u64>,
    /// Summed cash balance per account currency.
    pub by_currency: BTreeMap<String, Decimal>,
    /// Summed asset quantity per definition suffix. A proxy for holdings, not
    /// a converted amount.
    pub holdings_by_suffix: BTreeMap<String, Decimal>,
}

impl AccountSummary {
    fn add_account(&mut self, account: &Account) {
        self.total_accounts += 1;
        self.total_balance += account.balance;
        *self.by_type.entry(account.kind).or_default() += 1;
        *self
            .by_currency
            .entry(account.currency.clone())
            .or_default() += account.balance;
    }
}

/// What transaction totals are grouped by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TotalsGroup {
    Category,
    Type,
}

pub const UNCATEGORIZED: &str = "uncategorized";

/// One group of [`Engine::transaction_totals`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeTotal {
    pub key: String,
    /// Debit types count negative, everything else positive.
    pub net: Decimal,
    /// Unsigned sum of amounts.
    pub gross: Decimal,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub net: Decimal,
}

pub(crate) fn group_totals(txs: &[Transaction], group: TotalsGroup) -> Vec<TypeTotal> {
    let mut totals: BTreeMap<String, TypeTotal> = BTreeMap::new();
    for tx in txs {
        let key = match group {
            TotalsGroup::Type => tx.fields.kind.as_str().to_string(),
            TotalsGroup::Category => tx
                .fields
                .category
                .clone()
                .unwrap_or_else(|| UNCATEGORIZED.to_string()),
        };
        let entry = totals.entry(key.clone()).or_insert_with(|| TypeTotal {
            key,
            ..Default::default()
        });
        entry.net += tx.fields.kind.signed(tx.fields.amount);
        entry.gross += tx.fields.amount;
        entry.count += 1;
    }
    totals.into_values().collect()
}

pub(crate) fn monthly_totals(txs: &[Transaction]) -> Vec<MonthlyTotal> {
    let mut months: BTreeMap<(i32, u32), MonthlyTotal> = BTreeMap::new();
    for tx in txs {
        let (year, month) = (tx.fields.date.year(), tx.fields.date.month());
        let entry = months.entry((year, month)).or_insert_with(|| MonthlyTotal {
            year,
            month,
            ..Default::default()
        });
        let kind = tx.fields.kind;
        let amount = tx.fields.amount;
        if kind.is_credit() {
            entry.total_in += amount;
        }
        if kind.is_debit() {
            entry.total_out += amount;
        }
        entry.net += kind.monthly_net(amount);
    }
    months.into_values().collect()
}

impl Engine {
    /// Counts and sums over the caller's accounts and holdings.
    pub async fn account_summary(&self, caller: &Caller) -> ResultEngine<AccountSummary> {
        with_tx!(self, caller, |db_tx| {
            let account_models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(caller.user_id.clone()))
                .all(&db_tx)
                .await?;
            let mut summary = AccountSummary::default();
            for model in account_models {
                summary.add_account(&Account::try_from(model)?);
            }

            let holdings = assets::Entity::find()
                .filter(assets::Column::UserId.eq(caller.user_id.clone()))
                .find_also_related(definitions::Entity)
                .all(&db_tx)
                .await?;
            for (asset, definition) in holdings {
                let definition = definition.ok_or_else(|| {
                    EngineError::KeyNotFound(format!("definition {}", asset.definition_id))
                })?;
                let quantity = parse_decimal(&asset.quantity, "asset quantity")?;
                *summary
                    .holdings_by_suffix
                    .entry(definition.suffix)
                    .or_default() += quantity;
            }
            Ok(summary)
        })
    }

    async fn transactions_in_range(
        &self,
        caller: &Caller,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<Vec<Transaction>> {
        if let (Some(from), Some(to)) = (from, to) {
            DateRange::new(from, to)?;
        }
        with_tx!(self, caller, |db_tx| {
            let mut query = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(caller.user_id.clone()));
            if let Some(from) = from {
                query = query.filter(transactions::Column::Date.gte(from));
            }
            if let Some(to) = to {
                query = query.filter(transactions::Column::Date.lte(to));
            }
            query
                .order_by_asc(transactions::Column::Date)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Transaction::try_from)
                .collect()
        })
    }

    /// Net, gross and count per category or per type, ordered by key. Either
    /// bound of the date window may be left open.
    pub async fn transaction_totals(
        &self,
        caller: &Caller,
        group: TotalsGroup,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<Vec<TypeTotal>> {
        let txs = self.transactions_in_range(caller, from, to).await?;
        Ok(group_totals(&txs, group))
    }

    /// Inflow, outflow and net per calendar month (UTC), oldest month first.
    pub async fn monthly_totals(
        &self,
        caller: &Caller,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ResultEngine<Vec<MonthlyTotal>> {
        let txs = self.transactions_in_range(caller, from, to).await?;
        Ok(monthly_totals(&txs))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;
    use crate::{TransactionFields, TransactionType};

    fn tx(kind: TransactionType, amount: Decimal, category: Option<&str>, month: u32) -> Transaction {
        let date = Utc.with_ymd_and_hms(2024, month, 10, 12, 0, 0).unwrap();
        Transaction::new(
            "u".to_string(),
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
                category: category.map(ToString::to_string),
                date,
                to_account_id: None,
                transaction_hash: None,
            },
        )
    }

    #[test]
    fn category_totals_are_signed_by_direction() {
        let txs = vec![
            tx(TransactionType::Income, dec!(1000), Some("salary"), 1),
            tx(TransactionType::Expense, dec!(40), Some("food"), 1),
            tx(TransactionType::Expense, dec!(10), Some("food"), 2),
            tx(TransactionType::Deposit, dec!(5), None, 2),
        ];
        let totals = group_totals(&txs, TotalsGroup::Category);
        let keys: Vec<&str> = totals.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, ["food", "salary", UNCATEGORIZED]);
        assert_eq!(totals[0].net, dec!(-50));
        assert_eq!(totals[0].gross, dec!(50));
        assert_eq!(totals[0].count, 2);
        assert_eq!(totals[1].net, dec!(1000));
    }

    #[test]
    fn type_totals_use_wire_names() {
        let txs = vec![
            tx(TransactionType::Fee, dec!(3), None, 1),
            tx(TransactionType::Rebalance, dec!(7), None, 1),
        ];
        let totals = group_totals(&txs, TotalsGroup::Type);
        assert_eq!(totals[0].key, "FEE");
        assert_eq!(totals[0].net, dec!(-3));
        assert_eq!(totals[1].key, "REBALANCE");
        assert_eq!(totals[1].net, dec!(7));
    }

    #[test]
    fn monthly_totals_split_in_and_out() {
        let txs = vec![
            tx(TransactionType::Income, dec!(100), None, 1),
            tx(TransactionType::Expense, dec!(30), None, 1),
            tx(TransactionType::Borrowing, dec!(50), None, 1),
            tx(TransactionType::Split, dec!(9), None, 3),
        ];
        let months = monthly_totals(&txs);
        assert_eq!(months.len(), 2);
        let jan = &months[0];
        assert_eq!((jan.year, jan.month), (2024, 1));
        assert_eq!(jan.total_in, dec!(150));
        assert_eq!(jan.total_out, dec!(80));
        assert_eq!(jan.net, dec!(120));
        let mar = &months[1];
        assert_eq!(mar.month, 3);
        assert_eq!(mar.net, Decimal::ZERO);
    }
}
