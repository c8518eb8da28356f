//! Accounts API endpoints.

use api_types::{
    TypeList,
    account::{
        AccountFilter, AccountList, AccountNew, AccountSummary, AccountUpdate, AccountView,
        AccountWithAssetsView, BalanceDelta, HoldingView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Account, AccountType, AccountWithAssets, Caller};
use rust_decimal::Decimal;

use crate::{
    ServerError,
    params::{self, Body, Params},
    server::ServerState,
};

pub(crate) fn view(account: Account) -> AccountView {
    AccountView {
        id: account.id.to_string(),
        user_id: account.user_id,
        name: account.name,
        kind: account.kind.as_str().to_string(),
        balance: account.balance,
        currency: account.currency,
        created_at: account.created_at,
        updated_at: account.updated_at,
    }
}

fn list_view(accounts: Vec<Account>) -> AccountList {
    let accounts: Vec<AccountView> = accounts.into_iter().map(view).collect();
    AccountList {
        count: accounts.len(),
        accounts,
    }
}

fn with_assets_view(item: AccountWithAssets) -> AccountWithAssetsView {
    AccountWithAssetsView {
        account: view(item.account),
        holdings: item
            .holdings
            .into_iter()
            .map(|h| HoldingView {
                asset_id: h.asset_id.to_string(),
                definition_id: h.definition_id.to_string(),
                kind: h.kind.as_str().to_string(),
                quantity: h.quantity,
                symbol: h.symbol,
                name: h.name,
                suffix: h.suffix,
                updated_at: h.updated_at,
            })
            .collect(),
        total_balances: item.total_balances,
        asset_counts: item
            .asset_counts
            .into_iter()
            .map(|(kind, count)| (kind.as_str().to_string(), count))
            .collect(),
        last_updated: item.last_updated,
    }
}

fn kind(raw: &str) -> Result<AccountType, ServerError> {
    Ok(AccountType::try_from(raw.trim())?)
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Body(payload): Body<AccountNew>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let account = state
        .engine
        .new_account(
            &caller,
            engine::AccountNew {
                name: payload.name,
                kind: kind(&payload.kind)?,
                balance: payload.balance.unwrap_or(Decimal::ZERO),
                currency: payload.currency,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(view(account))))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    Body(payload): Body<AccountUpdate>,
) -> Result<Json<AccountView>, ServerError> {
    let account_id = params::id(&account_id)?;
    let cmd = engine::AccountUpdate {
        name: payload.name,
        kind: payload.kind.as_deref().map(kind).transpose()?,
        balance: payload.balance,
        currency: payload.currency,
    };
    let account = state
        .engine
        .update_account(&caller, account_id, cmd)
        .await?;
    Ok(Json(view(account)))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let account_id = params::id(&account_id)?;
    state.engine.delete_account(&caller, account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountView>, ServerError> {
    let account_id = params::id(&account_id)?;
    let account = state.engine.account(&caller, account_id).await?;
    Ok(Json(view(account)))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<AccountList>, ServerError> {
    let accounts = state.engine.accounts(&caller).await?;
    Ok(Json(list_view(accounts)))
}

pub async fn by_type(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(raw): Path<String>,
) -> Result<Json<AccountList>, ServerError> {
    let accounts = state.engine.accounts_by_type(&caller, kind(&raw)?).await?;
    Ok(Json(list_view(accounts)))
}

pub async fn by_currency(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(currency): Path<String>,
) -> Result<Json<AccountList>, ServerError> {
    let accounts = state
        .engine
        .accounts_by_currency(&caller, &currency)
        .await?;
    Ok(Json(list_view(accounts)))
}

pub async fn filter(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Params(query): Params<AccountFilter>,
) -> Result<Json<AccountList>, ServerError> {
    let filter = engine::AccountFilter {
        kind: query
            .kind
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(kind)
            .transpose()?,
        currency: query.currency.filter(|s| !s.trim().is_empty()),
        min_balance: params::opt_decimal(query.min_balance.as_deref())?,
        max_balance: params::opt_decimal(query.max_balance.as_deref())?,
        page: params::page(query.limit.as_deref(), query.offset.as_deref()),
    };
    let accounts = state.engine.filter_accounts(&caller, filter).await?;
    Ok(Json(list_view(accounts)))
}

pub async fn update_balance(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    Body(payload): Body<BalanceDelta>,
) -> Result<Json<AccountView>, ServerError> {
    let account_id = params::id(&account_id)?;
    let account = state
        .engine
        .update_balance(&caller, account_id, payload.delta)
        .await?;
    Ok(Json(view(account)))
}

pub async fn summary(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<AccountSummary>, ServerError> {
    let summary = state.engine.account_summary(&caller).await?;
    Ok(Json(AccountSummary {
        total_accounts: summary.total_accounts,
        total_balance: summary.total_balance,
        by_type: summary
            .by_type
            .into_iter()
            .map(|(kind, count)| (kind.as_str().to_string(), count))
            .collect(),
        by_currency: summary.by_currency,
        holdings_by_suffix: summary.holdings_by_suffix,
    }))
}

pub async fn with_assets(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
) -> Result<Json<AccountWithAssetsView>, ServerError> {
    let account_id = params::id(&account_id)?;
    let item = state
        .engine
        .account_with_assets(&caller, account_id)
        .await?;
    Ok(Json(with_assets_view(item)))
}

pub async fn list_with_assets(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<AccountWithAssetsView>>, ServerError> {
    let items = state.engine.accounts_with_assets(&caller).await?;
    Ok(Json(items.into_iter().map(with_assets_view).collect()))
}

pub async fn types() -> Json<TypeList> {
    Json(TypeList {
        types: AccountType::ALL
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect(),
    })
}
