//! Assets API endpoints.

use api_types::{
    TypeList,
    asset::{
        AssetFilter, AssetList, AssetNew, AssetUpdate, AssetView, DateWindow, PerformanceView,
        PriceUpdate, TotalValue, TotalValueQuery,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{Asset, AssetType, Caller};

use crate::{
    ServerError,
    params::{self, Body, Params},
    server::ServerState,
};

fn view(asset: Asset) -> AssetView {
    AssetView {
        id: asset.id.to_string(),
        current_value: asset.current_value(),
        purchase_value: asset.purchase_value(),
        profit_loss: asset.profit_loss(),
        profit_loss_percentage: asset.profit_loss_percentage(),
        user_id: asset.user_id,
        account_id: asset.account_id.to_string(),
        definition_id: asset.definition_id.to_string(),
        kind: asset.kind.as_str().to_string(),
        quantity: asset.quantity,
        purchase_price: asset.purchase_price,
        current_price: asset.current_price,
        notes: asset.notes,
        purchase_date: asset.purchase_date,
        last_updated: asset.last_updated,
        created_at: asset.created_at,
        updated_at: asset.updated_at,
    }
}

fn list_view(assets: Vec<Asset>) -> AssetList {
    let assets: Vec<AssetView> = assets.into_iter().map(view).collect();
    AssetList {
        count: assets.len(),
        assets,
    }
}

fn kind(raw: &str) -> Result<AssetType, ServerError> {
    Ok(AssetType::try_from(raw.trim())?)
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Body(payload): Body<AssetNew>,
) -> Result<(StatusCode, Json<AssetView>), ServerError> {
    let cmd = engine::AssetNew {
        account_id: params::id(&payload.account_id)?,
        definition_id: params::id(&payload.definition_id)?,
        kind: kind(&payload.kind)?,
        quantity: payload.quantity,
        purchase_price: payload.purchase_price,
        current_price: payload.current_price,
        notes: payload.notes,
        purchase_date: payload.purchase_date.map(|at| at.with_timezone(&Utc)),
    };
    let asset = state.engine.new_asset(&caller, cmd).await?;
    Ok((StatusCode::CREATED, Json(view(asset))))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(asset_id): Path<String>,
    Body(payload): Body<AssetUpdate>,
) -> Result<Json<AssetView>, ServerError> {
    let asset_id = params::id(&asset_id)?;
    let cmd = engine::AssetUpdate {
        kind: payload.kind.as_deref().map(kind).transpose()?,
        quantity: payload.quantity,
        price: payload.price,
        notes: payload.notes,
        purchase_date: payload.purchase_date.map(|at| at.with_timezone(&Utc)),
    };
    let asset = state.engine.update_asset(&caller, asset_id, cmd).await?;
    Ok(Json(view(asset)))
}

pub async fn update_price(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(asset_id): Path<String>,
    Body(payload): Body<PriceUpdate>,
) -> Result<Json<AssetView>, ServerError> {
    let asset_id = params::id(&asset_id)?;
    let asset = state
        .engine
        .update_asset_price(&caller, asset_id, payload.current_price)
        .await?;
    Ok(Json(view(asset)))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(asset_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let asset_id = params::id(&asset_id)?;
    state.engine.delete_asset(&caller, asset_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(asset_id): Path<String>,
) -> Result<Json<AssetView>, ServerError> {
    let asset_id = params::id(&asset_id)?;
    let asset = state.engine.asset(&caller, asset_id).await?;
    Ok(Json(view(asset)))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<AssetList>, ServerError> {
    let assets = state.engine.assets(&caller).await?;
    Ok(Json(list_view(assets)))
}

pub async fn by_account(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
) -> Result<Json<AssetList>, ServerError> {
    let account_id = params::id(&account_id)?;
    let assets = state.engine.assets_by_account(&caller, account_id).await?;
    Ok(Json(list_view(assets)))
}

pub async fn by_type(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(raw): Path<String>,
) -> Result<Json<AssetList>, ServerError> {
    let assets = state.engine.assets_by_type(&caller, kind(&raw)?).await?;
    Ok(Json(list_view(assets)))
}

pub async fn filter(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Params(query): Params<AssetFilter>,
) -> Result<Json<AssetList>, ServerError> {
    let (offset, limit) = params::slice(query.limit.as_deref(), query.offset.as_deref());
    let filter = engine::AssetFilter {
        account_id: params::opt_id(query.account_id.as_deref())?,
        kind: query
            .kind
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(kind)
            .transpose()?,
        min_quantity: params::opt_decimal(query.min_quantity.as_deref())?,
        max_quantity: params::opt_decimal(query.max_quantity.as_deref())?,
        created_from: params::opt_instant(query.created_from.as_deref(), false)?,
        created_to: params::opt_instant(query.created_to.as_deref(), true)?,
        offset,
        limit,
    };
    let assets = state.engine.filter_assets(&caller, &filter).await?;
    Ok(Json(list_view(assets)))
}

pub async fn performance(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Params(window): Params<DateWindow>,
) -> Result<Json<Vec<PerformanceView>>, ServerError> {
    let (Some(from), Some(to)) = (window.from.as_deref(), window.to.as_deref()) else {
        return Err(ServerError::Generic(
            "from and to are required".to_string(),
        ));
    };
    let from = params::instant(from, false)?;
    let to = params::instant(to, true)?;
    let rows = state.engine.asset_performance(&caller, from, to).await?;
    Ok(Json(
        rows.into_iter()
            .map(|row| PerformanceView {
                asset_id: row.asset_id.to_string(),
                name: row.name,
                symbol: row.symbol,
                suffix: row.suffix,
                kind: row.kind.as_str().to_string(),
                quantity: row.quantity,
                purchase_date: row.purchase_date,
                initial_value: row.initial_value,
                current_value: row.current_value,
                profit_loss: row.profit_loss,
                profit_loss_percentage: row.profit_loss_percentage,
            })
            .collect(),
    ))
}

pub async fn total_value(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Params(query): Params<TotalValueQuery>,
) -> Result<Json<TotalValue>, ServerError> {
    let kinds = query
        .types
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(kind)
        .collect::<Result<Vec<_>, _>>()?;
    let total_value = state.engine.total_value(&caller, &kinds).await?;
    Ok(Json(TotalValue { total_value }))
}

pub async fn types() -> Json<TypeList> {
    Json(TypeList {
        types: AssetType::ALL
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect(),
    })
}
