use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Asset, AssetFilter, AssetNew, AssetType, AssetUpdate, Caller, DateRange, EngineError,
    ResultEngine, assets, definitions, transactions,
    util::{ensure_non_negative, ensure_positive},
};

use super::{Engine, normalize_optional_text, with_tx};

/// Valuation of one holding bought inside a date window.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetPerformance {
    pub asset_id: Uuid,
    pub name: String,
    pub symbol: String,
    pub suffix: String,
    pub kind: AssetType,
    pub quantity: Decimal,
    pub purchase_date: DateTime<Utc>,
    pub initial_value: Decimal,
    pub current_value: Decimal,
    pub profit_loss: Decimal,
    pub profit_loss_percentage: Decimal,
}

impl AssetPerformance {
    fn new(asset: &Asset, definition: definitions::Model) -> Self {
        Self {
            asset_id: asset.id,
            name: definition.name,
            symbol: definition.abbreviation,
            suffix: definition.suffix,
            kind: asset.kind,
            quantity: asset.quantity,
            purchase_date: asset.purchase_date,
            initial_value: asset.purchase_value(),
            current_value: asset.current_value(),
            profit_loss: asset.profit_loss(),
            profit_loss_percentage: asset.profit_loss_percentage(),
        }
    }
}

impl AssetFilter {
    fn matches(&self, asset: &Asset) -> bool {
        self.account_id.is_none_or(|id| asset.account_id == id)
            && self.kind.is_none_or(|kind| asset.kind == kind)
            && self.min_quantity.is_none_or(|min| asset.quantity >= min)
            && self.max_quantity.is_none_or(|max| asset.quantity <= max)
            && self.created_from.is_none_or(|from| asset.created_at >= from)
            && self.created_to.is_none_or(|to| asset.created_at <= to)
    }

    /// Keeps the matching assets, then slices `[offset, offset + limit)`.
    pub fn apply(&self, assets: Vec<Asset>) -> Vec<Asset> {
        let matching = assets.into_iter().filter(|a| self.matches(a)).skip(self.offset);
        match self.limit {
            Some(limit) if limit > 0 => matching.take(limit).collect(),
            _ => matching.collect(),
        }
    }
}

fn asset_list(models: Vec<assets::Model>) -> ResultEngine<Vec<Asset>> {
    models.into_iter().map(Asset::try_from).collect()
}

impl Engine {
    /// Records a new holding inside one of the caller's accounts.
    pub async fn new_asset(&self, caller: &Caller, cmd: AssetNew) -> ResultEngine<Asset> {
        ensure_positive(cmd.quantity, "quantity")?;
        ensure_non_negative(cmd.purchase_price, "purchase price")?;
        let current_price = cmd.current_price.unwrap_or(cmd.purchase_price);
        ensure_non_negative(current_price, "current price")?;

        with_tx!(self, caller, |db_tx| {
            self.require_account(&db_tx, cmd.account_id, &caller.user_id)
                .await?;
            self.require_definition(&db_tx, cmd.definition_id).await?;

            let now = Utc::now();
            let asset = Asset {
                id: Uuid::new_v4(),
                user_id: caller.user_id.clone(),
                account_id: cmd.account_id,
                definition_id: cmd.definition_id,
                kind: cmd.kind,
                quantity: cmd.quantity,
                purchase_price: cmd.purchase_price,
                current_price,
                notes: normalize_optional_text(cmd.notes.as_deref()),
                purchase_date: cmd.purchase_date.unwrap_or(now),
                last_updated: now,
                created_at: now,
                updated_at: now,
            };
            let model: assets::ActiveModel = (&asset).into();
            model.insert(&db_tx).await?;
            Ok(asset)
        })
    }

    /// Updates an owned asset.
    ///
    /// A quantity increase with a positive `price` re-averages the purchase
    /// price over the old and added units.
    pub async fn update_asset(
        &self,
        caller: &Caller,
        asset_id: Uuid,
        cmd: AssetUpdate,
    ) -> ResultEngine<Asset> {
        if let Some(quantity) = cmd.quantity {
            ensure_positive(quantity, "quantity")?;
        }
        if let Some(price) = cmd.price {
            ensure_non_negative(price, "price")?;
        }

        with_tx!(self, caller, |db_tx| {
            let model = self
                .require_asset(&db_tx, asset_id, &caller.user_id)
                .await?;
            let mut asset = Asset::try_from(model)?;
            let now = Utc::now();

            if let Some(kind) = cmd.kind {
                asset.kind = kind;
            }
            if let Some(quantity) = cmd.quantity {
                asset.update_quantity(quantity, cmd.price, now);
            }
            if cmd.notes.is_some() {
                asset.notes = normalize_optional_text(cmd.notes.as_deref());
            }
            if let Some(purchase_date) = cmd.purchase_date {
                asset.purchase_date = purchase_date;
            }
            asset.updated_at = now;

            let active: assets::ActiveModel = (&asset).into();
            active.update(&db_tx).await?;
            Ok(asset)
        })
    }

    /// Overwrites the market price of an owned asset.
    pub async fn update_asset_price(
        &self,
        caller: &Caller,
        asset_id: Uuid,
        price: Decimal,
    ) -> ResultEngine<Asset> {
        ensure_non_negative(price, "price")?;
        with_tx!(self, caller, |db_tx| {
            let model = self
                .require_asset(&db_tx, asset_id, &caller.user_id)
                .await?;
            let mut asset = Asset::try_from(model)?;
            asset.update_price(price, Utc::now());
            let active: assets::ActiveModel = (&asset).into();
            active.update(&db_tx).await?;
            Ok(asset)
        })
    }

    /// Deletes an owned asset and the transactions that reference it.
    pub async fn delete_asset(&self, caller: &Caller, asset_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, caller, |db_tx| {
            self.require_asset(&db_tx, asset_id, &caller.user_id)
                .await?;
            transactions::Entity::delete_many()
                .filter(transactions::Column::AssetId.eq(asset_id.to_string()))
                .exec(&db_tx)
                .await?;
            assets::Entity::delete_by_id(asset_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(())
        })
    }

    pub async fn asset(&self, caller: &Caller, asset_id: Uuid) -> ResultEngine<Asset> {
        with_tx!(self, caller, |db_tx| {
            let model = self
                .require_asset(&db_tx, asset_id, &caller.user_id)
                .await?;
            Asset::try_from(model)
        })
    }

    /// All assets of the caller, newest first.
    pub async fn assets(&self, caller: &Caller) -> ResultEngine<Vec<Asset>> {
        with_tx!(self, caller, |db_tx| {
            let models = assets::Entity::find()
                .filter(assets::Column::UserId.eq(caller.user_id.clone()))
                .order_by_desc(assets::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            asset_list(models)
        })
    }

    pub async fn assets_by_account(
        &self,
        caller: &Caller,
        account_id: Uuid,
    ) -> ResultEngine<Vec<Asset>> {
        with_tx!(self, caller, |db_tx| {
            self.require_account(&db_tx, account_id, &caller.user_id)
                .await?;
            let models = assets::Entity::find()
                .filter(assets::Column::AccountId.eq(account_id.to_string()))
                .order_by_desc(assets::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            asset_list(models)
        })
    }

    pub async fn assets_by_type(
        &self,
        caller: &Caller,
        kind: AssetType,
    ) -> ResultEngine<Vec<Asset>> {
        with_tx!(self, caller, |db_tx| {
            let models = assets::Entity::find()
                .filter(assets::Column::UserId.eq(caller.user_id.clone()))
                .filter(assets::Column::Kind.eq(kind.as_str()))
                .order_by_desc(assets::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            asset_list(models)
        })
    }

    /// Filters the caller's assets in memory. See [`AssetFilter`].
    pub async fn filter_assets(
        &self,
        caller: &Caller,
        filter: &AssetFilter,
    ) -> ResultEngine<Vec<Asset>> {
        if let (Some(min), Some(max)) = (filter.min_quantity, filter.max_quantity)
            && min > max
        {
            return Err(EngineError::Validation(
                "min_quantity must not exceed max_quantity".to_string(),
            ));
        }
        let all = self.assets(caller).await?;
        Ok(filter.apply(all))
    }

    /// Performance of the holdings purchased inside `[from, to]`, most recent
    /// purchase first.
    pub async fn asset_performance(
        &self,
        caller: &Caller,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ResultEngine<Vec<AssetPerformance>> {
        let range = DateRange::new(from, to)?;
        with_tx!(self, caller, |db_tx| {
            let rows = assets::Entity::find()
                .filter(assets::Column::UserId.eq(caller.user_id.clone()))
                .filter(assets::Column::PurchaseDate.between(range.from, range.to))
                .order_by_desc(assets::Column::PurchaseDate)
                .find_also_related(definitions::Entity)
                .all(&db_tx)
                .await?;

            let mut out = Vec::with_capacity(rows.len());
            for (model, definition) in rows {
                let asset = Asset::try_from(model)?;
                let definition = definition.ok_or_else(|| {
                    EngineError::KeyNotFound(format!("definition {}", asset.definition_id))
                })?;
                out.push(AssetPerformance::new(&asset, definition));
            }
            Ok(out)
        })
    }

    /// Sum of current values across the caller's assets, optionally restricted
    /// to some asset types. An empty restriction means every type.
    pub async fn total_value(
        &self,
        caller: &Caller,
        kinds: &[AssetType],
    ) -> ResultEngine<Decimal> {
        let assets = self.assets(caller).await?;
        Ok(assets
            .iter()
            .filter(|a| kinds.is_empty() || kinds.contains(&a.kind))
            .map(Asset::current_value)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn asset(account_id: Uuid, kind: AssetType, quantity: Decimal) -> Asset {
        let now = Utc::now();
        Asset {
            id: Uuid::new_v4(),
            user_id: "u".to_string(),
            account_id,
            definition_id: Uuid::new_v4(),
            kind,
            quantity,
            purchase_price: dec!(1),
            current_price: dec!(1),
            notes: None,
            purchase_date: now,
            last_updated: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> (Uuid, Vec<Asset>) {
        let account = Uuid::new_v4();
        let other = Uuid::new_v4();
        let items = vec![
            asset(account, AssetType::Stock, dec!(5)),
            asset(account, AssetType::Cash, dec!(50)),
            asset(other, AssetType::Stock, dec!(12)),
            asset(account, AssetType::Stock, dec!(20)),
        ];
        (account, items)
    }

    #[test]
    fn empty_filter_returns_everything() {
        let (_, items) = sample();
        let out = AssetFilter::default().apply(items.clone());
        assert_eq!(out, items);
    }

    #[test]
    fn predicates_are_combined() {
        let (account, items) = sample();
        let filter = AssetFilter {
            account_id: Some(account),
            kind: Some(AssetType::Stock),
            min_quantity: Some(dec!(10)),
            ..Default::default()
        };
        let out = filter.apply(items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quantity, dec!(20));
    }

    #[test]
    fn offset_and_limit_apply_after_filtering() {
        let (_, items) = sample();
        let filter = AssetFilter {
            kind: Some(AssetType::Stock),
            offset: 1,
            limit: Some(1),
            ..Default::default()
        };
        let out = filter.apply(items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].quantity, dec!(12));
    }

    #[test]
    fn offset_past_end_is_empty() {
        let (_, items) = sample();
        let filter = AssetFilter {
            offset: 10,
            ..Default::default()
        };
        assert!(filter.apply(items).is_empty());
    }

    #[test]
    fn oversized_limit_returns_remaining() {
        let (_, items) = sample();
        let filter = AssetFilter {
            offset: 2,
            limit: Some(50),
            ..Default::default()
        };
        assert_eq!(filter.apply(items).len(), 2);
    }
}
