use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, Select, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    Caller, DateRange, Page, ResultEngine, Transaction, TransactionFields, TransactionType,
    transactions,
    util::normalize_currency,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

fn normalize_fields(mut fields: TransactionFields) -> ResultEngine<TransactionFields> {
    fields.validate()?;
    fields.currency = normalize_currency(&fields.currency)?;
    fields.description = normalize_optional_text(fields.description.as_deref());
    fields.category = normalize_optional_text(fields.category.as_deref());
    fields.transaction_hash = normalize_optional_text(fields.transaction_hash.as_deref());
    Ok(fields)
}

impl Engine {
    /// Checks that every entity a transaction points at belongs to the caller.
    async fn require_transaction_refs(
        &self,
        db: &DatabaseTransaction,
        fields: &TransactionFields,
        user_id: &str,
    ) -> ResultEngine<()> {
        self.require_account(db, fields.account_id, user_id).await?;
        if let Some(to_account_id) = fields.to_account_id {
            self.require_account(db, to_account_id, user_id).await?;
        }
        if let Some(asset_id) = fields.asset_id {
            self.require_asset(db, asset_id, user_id).await?;
        }
        Ok(())
    }

    async fn transaction_page(
        &self,
        db: &DatabaseTransaction,
        query: Select<transactions::Entity>,
        page: Page,
    ) -> ResultEngine<Vec<Transaction>> {
        query
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::CreatedAt)
            .offset(page.offset)
            .limit(page.limit)
            .all(db)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    fn owned_transactions(user_id: &str) -> Select<transactions::Entity> {
        transactions::Entity::find().filter(transactions::Column::UserId.eq(user_id.to_string()))
    }

    /// Records a transaction. Balances are not touched.
    pub async fn new_transaction(
        &self,
        caller: &Caller,
        fields: TransactionFields,
    ) -> ResultEngine<Transaction> {
        let fields = normalize_fields(fields)?;
        with_tx!(self, caller, |db_tx| {
            self.require_transaction_refs(&db_tx, &fields, &caller.user_id)
                .await?;
            let tx = Transaction::new(caller.user_id.clone(), fields);
            let model: transactions::ActiveModel = (&tx).into();
            model.insert(&db_tx).await?;
            Ok(tx)
        })
    }

    /// Replaces the fields of an owned transaction after the same checks as
    /// creation.
    pub async fn update_transaction(
        &self,
        caller: &Caller,
        transaction_id: Uuid,
        fields: TransactionFields,
    ) -> ResultEngine<Transaction> {
        let fields = normalize_fields(fields)?;
        with_tx!(self, caller, |db_tx| {
            let model = self
                .require_transaction(&db_tx, transaction_id, &caller.user_id)
                .await?;
            self.require_transaction_refs(&db_tx, &fields, &caller.user_id)
                .await?;
            let mut tx = Transaction::try_from(model)?;
            tx.fields = fields;
            tx.updated_at = Utc::now();
            let active: transactions::ActiveModel = (&tx).into();
            active.update(&db_tx).await?;
            Ok(tx)
        })
    }

    pub async fn delete_transaction(
        &self,
        caller: &Caller,
        transaction_id: Uuid,
    ) -> ResultEngine<()> {
        with_tx!(self, caller, |db_tx| {
            self.require_transaction(&db_tx, transaction_id, &caller.user_id)
                .await?;
            transactions::Entity::delete_by_id(transaction_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    pub async fn transaction(
        &self,
        caller: &Caller,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, caller, |db_tx| {
            let model = self
                .require_transaction(&db_tx, transaction_id, &caller.user_id)
                .await?;
            Transaction::try_from(model)
        })
    }

    /// The caller's transactions, most recent first.
    pub async fn transactions(&self, caller: &Caller, page: Page) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, caller, |db_tx| {
            self.transaction_page(&db_tx, Self::owned_transactions(&caller.user_id), page)
                .await
        })
    }

    pub async fn transactions_by_account(
        &self,
        caller: &Caller,
        account_id: Uuid,
        page: Page,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, caller, |db_tx| {
            self.require_account(&db_tx, account_id, &caller.user_id)
                .await?;
            let query = Self::owned_transactions(&caller.user_id)
                .filter(transactions::Column::AccountId.eq(account_id.to_string()));
            self.transaction_page(&db_tx, query, page).await
        })
    }

    pub async fn transactions_by_asset(
        &self,
        caller: &Caller,
        asset_id: Uuid,
        page: Page,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, caller, |db_tx| {
            self.require_asset(&db_tx, asset_id, &caller.user_id)
                .await?;
            let query = Self::owned_transactions(&caller.user_id)
                .filter(transactions::Column::AssetId.eq(asset_id.to_string()));
            self.transaction_page(&db_tx, query, page).await
        })
    }

    /// Transactions dated inside `[from, to]`.
    pub async fn transactions_by_date_range(
        &self,
        caller: &Caller,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        page: Page,
    ) -> ResultEngine<Vec<Transaction>> {
        let range = DateRange::new(from, to)?;
        with_tx!(self, caller, |db_tx| {
            let query = Self::owned_transactions(&caller.user_id)
                .filter(transactions::Column::Date.between(range.from, range.to));
            self.transaction_page(&db_tx, query, page).await
        })
    }

    pub async fn transactions_by_type(
        &self,
        caller: &Caller,
        kind: TransactionType,
        page: Page,
    ) -> ResultEngine<Vec<Transaction>> {
        with_tx!(self, caller, |db_tx| {
            let query = Self::owned_transactions(&caller.user_id)
                .filter(transactions::Column::Kind.eq(kind.as_str()));
            self.transaction_page(&db_tx, query, page).await
        })
    }

    pub async fn transactions_by_category(
        &self,
        caller: &Caller,
        category: &str,
        page: Page,
    ) -> ResultEngine<Vec<Transaction>> {
        let category = normalize_required_name(category, "category")?;
        with_tx!(self, caller, |db_tx| {
            let query = Self::owned_transactions(&caller.user_id)
                .filter(transactions::Column::Category.eq(category));
            self.transaction_page(&db_tx, query, page).await
        })
    }
}
