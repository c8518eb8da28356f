use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Account, AccountFilter, AccountNew, AccountType, AccountUpdate, AssetType, Caller,
    EngineError, ResultEngine, accounts, assets, definitions, transactions,
    util::{decimal_text, ensure_non_negative, normalize_currency, parse_decimal, parse_uuid},
};

use super::{Engine, normalize_required_name, with_tx};

const MAX_BALANCE_ATTEMPTS: usize = 5;

/// One asset line inside an [`AccountWithAssets`] view.
#[derive(Clone, Debug, PartialEq)]
pub struct Holding {
    pub asset_id: Uuid,
    pub definition_id: Uuid,
    pub kind: AssetType,
    pub quantity: Decimal,
    pub symbol: String,
    pub name: String,
    pub suffix: String,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized account view joining its holdings with their definitions.
#[derive(Clone, Debug, PartialEq)]
pub struct AccountWithAssets {
    pub account: Account,
    pub holdings: Vec<Holding>,
    /// Summed quantity per definition suffix.
    pub total_balances: BTreeMap<String, Decimal>,
    pub asset_counts: BTreeMap<AssetType, u64>,
    /// Latest update across the account and its holdings.
    pub last_updated: DateTime<Utc>,
}

impl AccountWithAssets {
    fn assemble(
        account: Account,
        rows: Vec<(assets::Model, Option<definitions::Model>)>,
    ) -> ResultEngine<Self> {
        let mut holdings = Vec::with_capacity(rows.len());
        let mut total_balances: BTreeMap<String, Decimal> = BTreeMap::new();
        let mut asset_counts: BTreeMap<AssetType, u64> = BTreeMap::new();
        let mut last_updated = account.updated_at;

        for (asset, definition) in rows {
            let definition = definition.ok_or_else(|| {
                EngineError::KeyNotFound(format!("definition {}", asset.definition_id))
            })?;
            let holding = Holding {
                asset_id: parse_uuid(&asset.id, "asset")?,
                definition_id: parse_uuid(&definition.id, "definition")?,
                kind: AssetType::try_from(asset.kind.as_str())?,
                quantity: parse_decimal(&asset.quantity, "asset quantity")?,
                symbol: definition.abbreviation,
                name: definition.name,
                suffix: definition.suffix,
                updated_at: asset.updated_at,
            };
            *total_balances.entry(holding.suffix.clone()).or_default() += holding.quantity;
            *asset_counts.entry(holding.kind).or_default() += 1;
            last_updated = last_updated.max(holding.updated_at);
            holdings.push(holding);
        }

        Ok(Self {
            account,
            holdings,
            total_balances,
            asset_counts,
            last_updated,
        })
    }
}

fn account_list(models: Vec<accounts::Model>) -> ResultEngine<Vec<Account>> {
    models.into_iter().map(Account::try_from).collect()
}

impl Engine {
    /// Opens a new account for the caller.
    pub async fn new_account(&self, caller: &Caller, cmd: AccountNew) -> ResultEngine<Account> {
        let name = normalize_required_name(&cmd.name, "account name")?;
        let currency = normalize_currency(&cmd.currency)?;
        ensure_non_negative(cmd.balance, "balance")?;

        with_tx!(self, caller, |db_tx| {
            self.require_user(&db_tx, &caller.user_id).await?;
            let account = Account::new(
                caller.user_id.clone(),
                name,
                cmd.kind,
                cmd.balance,
                currency,
            );
            let model: accounts::ActiveModel = (&account).into();
            model.insert(&db_tx).await?;
            Ok(account)
        })
    }

    /// Applies the supplied fields to an owned account.
    pub async fn update_account(
        &self,
        caller: &Caller,
        account_id: Uuid,
        cmd: AccountUpdate,
    ) -> ResultEngine<Account> {
        let name = cmd
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "account name"))
            .transpose()?;
        let currency = cmd.currency.as_deref().map(normalize_currency).transpose()?;
        if let Some(balance) = cmd.balance {
            ensure_non_negative(balance, "balance")?;
        }

        with_tx!(self, caller, |db_tx| {
            let model = self
                .require_account(&db_tx, account_id, &caller.user_id)
                .await?;
            let mut account = Account::try_from(model)?;
            if let Some(name) = name {
                account.name = name;
            }
            if let Some(kind) = cmd.kind {
                account.kind = kind;
            }
            if let Some(balance) = cmd.balance {
                account.balance = balance;
            }
            if let Some(currency) = currency {
                account.currency = currency;
            }
            account.updated_at = Utc::now();

            let active: accounts::ActiveModel = (&account).into();
            active.update(&db_tx).await?;
            Ok(account)
        })
    }

    /// Deletes an owned account together with its assets and every
    /// transaction that references the account or those assets.
    pub async fn delete_account(&self, caller: &Caller, account_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, caller, |db_tx| {
            self.require_account(&db_tx, account_id, &caller.user_id)
                .await?;
            self.purge_account(&db_tx, &account_id.to_string()).await
        })
    }

    pub(super) async fn purge_account(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
    ) -> ResultEngine<()> {
        let asset_ids: Vec<String> = assets::Entity::find()
            .filter(assets::Column::AccountId.eq(account_id))
            .all(db)
            .await?
            .into_iter()
            .map(|asset| asset.id)
            .collect();

        transactions::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(transactions::Column::AccountId.eq(account_id))
                    .add(transactions::Column::ToAccountId.eq(account_id))
                    .add(transactions::Column::AssetId.is_in(asset_ids)),
            )
            .exec(db)
            .await?;
        assets::Entity::delete_many()
            .filter(assets::Column::AccountId.eq(account_id))
            .exec(db)
            .await?;
        accounts::Entity::delete_by_id(account_id.to_string())
            .exec(db)
            .await?;
        Ok(())
    }

    /// Return an account snapshot from DB.
    pub async fn account(&self, caller: &Caller, account_id: Uuid) -> ResultEngine<Account> {
        with_tx!(self, caller, |db_tx| {
            let model = self
                .require_account(&db_tx, account_id, &caller.user_id)
                .await?;
            Account::try_from(model)
        })
    }

    /// All accounts of the caller, newest first.
    pub async fn accounts(&self, caller: &Caller) -> ResultEngine<Vec<Account>> {
        with_tx!(self, caller, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(caller.user_id.clone()))
                .order_by_desc(accounts::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            account_list(models)
        })
    }

    pub async fn accounts_by_type(
        &self,
        caller: &Caller,
        kind: AccountType,
    ) -> ResultEngine<Vec<Account>> {
        with_tx!(self, caller, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(caller.user_id.clone()))
                .filter(accounts::Column::Kind.eq(kind.as_str()))
                .order_by_desc(accounts::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            account_list(models)
        })
    }

    pub async fn accounts_by_currency(
        &self,
        caller: &Caller,
        currency: &str,
    ) -> ResultEngine<Vec<Account>> {
        let currency = normalize_currency(currency)?;
        with_tx!(self, caller, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(caller.user_id.clone()))
                .filter(accounts::Column::Currency.eq(currency))
                .order_by_desc(accounts::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            account_list(models)
        })
    }

    /// Filters the caller's accounts. All supplied predicates must hold; the
    /// page window is applied last.
    pub async fn filter_accounts(
        &self,
        caller: &Caller,
        filter: AccountFilter,
    ) -> ResultEngine<Vec<Account>> {
        let currency = filter
            .currency
            .as_deref()
            .map(normalize_currency)
            .transpose()?;
        if let (Some(min), Some(max)) = (filter.min_balance, filter.max_balance)
            && min > max
        {
            return Err(EngineError::Validation(
                "min_balance must not exceed max_balance".to_string(),
            ));
        }

        with_tx!(self, caller, |db_tx| {
            let mut query =
                accounts::Entity::find().filter(accounts::Column::UserId.eq(caller.user_id.clone()));
            if let Some(kind) = filter.kind {
                query = query.filter(accounts::Column::Kind.eq(kind.as_str()));
            }
            if let Some(currency) = currency {
                query = query.filter(accounts::Column::Currency.eq(currency));
            }
            let models = query
                .order_by_desc(accounts::Column::CreatedAt)
                .all(&db_tx)
                .await?;

            let page = filter.page;
            let matching = account_list(models)?
                .into_iter()
                .filter(|a| filter.min_balance.is_none_or(|min| a.balance >= min))
                .filter(|a| filter.max_balance.is_none_or(|max| a.balance <= max))
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect();
            Ok(matching)
        })
    }

    /// Applies a signed delta to the cash balance.
    ///
    /// The write is a compare-and-swap on the previously read balance, so two
    /// concurrent deltas can never both apply against the same old value. A
    /// lost race retries with a fresh read in a new transaction. A delta that
    /// would take the balance below zero fails with `InsufficientFunds` and
    /// leaves the balance unchanged.
    pub async fn update_balance(
        &self,
        caller: &Caller,
        account_id: Uuid,
        delta: Decimal,
    ) -> ResultEngine<Account> {
        for attempt in 1..=MAX_BALANCE_ATTEMPTS {
            caller.ensure_active()?;
            if let Some(account) = self.try_update_balance(caller, account_id, delta).await? {
                return Ok(account);
            }
            tracing::debug!(%account_id, attempt, "balance changed concurrently, retrying");
        }
        Err(EngineError::Aborted(format!(
            "balance of account {account_id} kept changing"
        )))
    }

    /// One compare-and-swap attempt. `None` means another writer got there
    /// first.
    async fn try_update_balance(
        &self,
        caller: &Caller,
        account_id: Uuid,
        delta: Decimal,
    ) -> ResultEngine<Option<Account>> {
        with_tx!(self, caller, |db_tx| {
            let model = self
                .require_account(&db_tx, account_id, &caller.user_id)
                .await?;
            let previous = model.balance.clone();
            let mut account = Account::try_from(model)?;
            let next = account.balance_after(delta)?;
            let now = Utc::now();

            let res = accounts::Entity::update_many()
                .col_expr(accounts::Column::Balance, Expr::value(decimal_text(next)))
                .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
                .filter(accounts::Column::Id.eq(account_id.to_string()))
                .filter(accounts::Column::Balance.eq(previous))
                .exec(&db_tx)
                .await?;
            if res.rows_affected == 1 {
                account.balance = next;
                account.updated_at = now;
                Ok(Some(account))
            } else {
                Ok(None)
            }
        })
    }

    async fn holdings_rows(
        &self,
        db: &DatabaseTransaction,
        account_id: &str,
    ) -> ResultEngine<Vec<(assets::Model, Option<definitions::Model>)>> {
        assets::Entity::find()
            .filter(assets::Column::AccountId.eq(account_id))
            .order_by_asc(assets::Column::CreatedAt)
            .find_also_related(definitions::Entity)
            .all(db)
            .await
            .map_err(Into::into)
    }

    /// An owned account with its holdings.
    pub async fn account_with_assets(
        &self,
        caller: &Caller,
        account_id: Uuid,
    ) -> ResultEngine<AccountWithAssets> {
        with_tx!(self, caller, |db_tx| {
            let model = self
                .require_account(&db_tx, account_id, &caller.user_id)
                .await?;
            let rows = self.holdings_rows(&db_tx, &model.id).await?;
            AccountWithAssets::assemble(Account::try_from(model)?, rows)
        })
    }

    /// Every account of the caller with its holdings.
    ///
    /// Holdings are read one account at a time; the caller's cancellation is
    /// checked between accounts so an abandoned request stops early.
    pub async fn accounts_with_assets(
        &self,
        caller: &Caller,
    ) -> ResultEngine<Vec<AccountWithAssets>> {
        let accounts = self.accounts(caller).await?;
        let mut out = Vec::with_capacity(accounts.len());
        for account in accounts {
            caller.ensure_active()?;
            let account_id = account.id.to_string();
            let rows = with_tx!(self, caller, |db_tx| {
                self.holdings_rows(&db_tx, &account_id).await
            })?;
            out.push(AccountWithAssets::assemble(account, rows)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn definition_model(suffix: &str) -> definitions::Model {
        let now = Utc::now();
        definitions::Model {
            id: Uuid::new_v4().to_string(),
            name: format!("{suffix} unit"),
            abbreviation: suffix.to_string(),
            abbreviation_key: suffix.to_lowercase(),
            name_key: format!("{suffix} unit").to_lowercase(),
            suffix: suffix.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn asset_model(
        account: &Account,
        definition: &definitions::Model,
        kind: AssetType,
        quantity: &str,
        updated_at: DateTime<Utc>,
    ) -> assets::Model {
        assets::Model {
            id: Uuid::new_v4().to_string(),
            user_id: account.user_id.clone(),
            account_id: account.id.to_string(),
            definition_id: definition.id.clone(),
            kind: kind.as_str().to_string(),
            quantity: quantity.to_string(),
            purchase_price: "1".to_string(),
            current_price: "1".to_string(),
            notes: None,
            purchase_date: updated_at,
            last_updated: updated_at,
            created_at: updated_at,
            updated_at,
        }
    }

    #[test]
    fn assemble_groups_by_suffix_and_type() {
        let account = Account::new(
            "u".to_string(),
            "Broker".to_string(),
            AccountType::Broker,
            dec!(0),
            "USD".to_string(),
        );
        let usd = definition_model("USD");
        let btc = definition_model("BTC");
        let later = account.updated_at + chrono::Duration::minutes(3);
        let rows = vec![
            (
                asset_model(&account, &usd, AssetType::Cash, "10.5", account.updated_at),
                Some(usd.clone()),
            ),
            (
                asset_model(&account, &usd, AssetType::Cash, "4.5", account.updated_at),
                Some(usd),
            ),
            (
                asset_model(&account, &btc, AssetType::Cryptocurrency, "0.25", later),
                Some(btc),
            ),
        ];

        let view = AccountWithAssets::assemble(account, rows).unwrap();
        assert_eq!(view.holdings.len(), 3);
        assert_eq!(view.total_balances["USD"], dec!(15));
        assert_eq!(view.total_balances["BTC"], dec!(0.25));
        assert_eq!(view.asset_counts[&AssetType::Cash], 2);
        assert_eq!(view.asset_counts[&AssetType::Cryptocurrency], 1);
        assert_eq!(view.last_updated, later);
    }

    #[test]
    fn assemble_requires_definition() {
        let account = Account::new(
            "u".to_string(),
            "Broker".to_string(),
            AccountType::Broker,
            dec!(0),
            "USD".to_string(),
        );
        let usd = definition_model("USD");
        let rows = vec![(
            asset_model(&account, &usd, AssetType::Cash, "1", account.updated_at),
            None,
        )];
        assert!(matches!(
            AccountWithAssets::assemble(account, rows),
            Err(EngineError::KeyNotFound(_))
        ));
    }
}
