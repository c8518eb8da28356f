//! Transactions API endpoints.

use api_types::{
    PageQuery, TypeList,
    transaction::{
        MonthlyTotalView, TotalView, TotalsQuery, TransactionList, TransactionNew,
        TransactionQuery, TransactionView,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{Caller, Page, TotalsGroup, Transaction, TransactionFields, TransactionType};

use crate::{
    ServerError,
    params::{self, Body, Params},
    server::ServerState,
};

fn view(tx: Transaction) -> TransactionView {
    let total_amount = tx.total_amount();
    let fields = tx.fields;
    TransactionView {
        id: tx.id.to_string(),
        user_id: tx.user_id,
        account_id: fields.account_id.to_string(),
        asset_id: fields.asset_id.map(|id| id.to_string()),
        kind: fields.kind.as_str().to_string(),
        amount: fields.amount,
        quantity: fields.quantity,
        price: fields.price,
        fee: fields.fee,
        total_amount,
        currency: fields.currency,
        description: fields.description,
        category: fields.category,
        date: fields.date,
        to_account_id: fields.to_account_id.map(|id| id.to_string()),
        transaction_hash: fields.transaction_hash,
        created_at: tx.created_at,
        updated_at: tx.updated_at,
    }
}

fn list_view(transactions: Vec<Transaction>, page: Page) -> TransactionList {
    let transactions: Vec<TransactionView> = transactions.into_iter().map(view).collect();
    TransactionList {
        count: transactions.len(),
        transactions,
        limit: page.limit,
        offset: page.offset,
    }
}

fn kind(raw: &str) -> Result<TransactionType, ServerError> {
    Ok(TransactionType::try_from(raw.trim())?)
}

fn fields(payload: TransactionNew) -> Result<TransactionFields, ServerError> {
    Ok(TransactionFields {
        account_id: params::id(&payload.account_id)?,
        asset_id: params::opt_id(payload.asset_id.as_deref())?,
        kind: kind(&payload.kind)?,
        amount: payload.amount,
        quantity: payload.quantity,
        price: payload.price,
        fee: payload.fee,
        currency: payload.currency,
        description: payload.description,
        category: payload.category,
        date: payload
            .date
            .map_or_else(Utc::now, |at| at.with_timezone(&Utc)),
        to_account_id: params::opt_id(payload.to_account_id.as_deref())?,
        transaction_hash: payload.transaction_hash,
    })
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Body(payload): Body<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let tx = state
        .engine
        .new_transaction(&caller, fields(payload)?)
        .await?;
    Ok((StatusCode::CREATED, Json(view(tx))))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<String>,
    Body(payload): Body<TransactionNew>,
) -> Result<Json<TransactionView>, ServerError> {
    let transaction_id = params::id(&transaction_id)?;
    let tx = state
        .engine
        .update_transaction(&caller, transaction_id, fields(payload)?)
        .await?;
    Ok(Json(view(tx)))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let transaction_id = params::id(&transaction_id)?;
    state
        .engine
        .delete_transaction(&caller, transaction_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(transaction_id): Path<String>,
) -> Result<Json<TransactionView>, ServerError> {
    let transaction_id = params::id(&transaction_id)?;
    let tx = state.engine.transaction(&caller, transaction_id).await?;
    Ok(Json(view(tx)))
}

/// Lists the caller's transactions. A `from`/`to` pair wins over `type`,
/// which wins over `category`.
pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Params(query): Params<TransactionQuery>,
) -> Result<Json<TransactionList>, ServerError> {
    let page = params::page(query.limit.as_deref(), query.offset.as_deref());
    let from = params::opt_instant(query.from.as_deref(), false)?;
    let to = params::opt_instant(query.to.as_deref(), true)?;
    let category = query.category.as_deref().filter(|s| !s.trim().is_empty());
    let kind_filter = query.kind.as_deref().filter(|s| !s.trim().is_empty());

    let transactions = match (from, to, kind_filter, category) {
        (Some(from), Some(to), _, _) => {
            state
                .engine
                .transactions_by_date_range(&caller, from, to, page)
                .await?
        }
        (Some(_), None, _, _) | (None, Some(_), _, _) => {
            return Err(ServerError::Generic(
                "from and to must be given together".to_string(),
            ));
        }
        (None, None, Some(raw), _) => {
            state
                .engine
                .transactions_by_type(&caller, kind(raw)?, page)
                .await?
        }
        (None, None, None, Some(category)) => {
            state
                .engine
                .transactions_by_category(&caller, category, page)
                .await?
        }
        (None, None, None, None) => state.engine.transactions(&caller, page).await?,
    };
    Ok(Json(list_view(transactions, page)))
}

pub async fn by_account(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(account_id): Path<String>,
    Params(query): Params<PageQuery>,
) -> Result<Json<TransactionList>, ServerError> {
    let account_id = params::id(&account_id)?;
    let page = params::page(query.limit.as_deref(), query.offset.as_deref());
    let transactions = state
        .engine
        .transactions_by_account(&caller, account_id, page)
        .await?;
    Ok(Json(list_view(transactions, page)))
}

pub async fn by_asset(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(asset_id): Path<String>,
    Params(query): Params<PageQuery>,
) -> Result<Json<TransactionList>, ServerError> {
    let asset_id = params::id(&asset_id)?;
    let page = params::page(query.limit.as_deref(), query.offset.as_deref());
    let transactions = state
        .engine
        .transactions_by_asset(&caller, asset_id, page)
        .await?;
    Ok(Json(list_view(transactions, page)))
}

pub async fn totals(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Params(query): Params<TotalsQuery>,
) -> Result<Json<Vec<TotalView>>, ServerError> {
    let group = match query.group_by.as_deref().map(str::trim) {
        None | Some("") | Some("category") => TotalsGroup::Category,
        Some("type") => TotalsGroup::Type,
        Some(other) => {
            return Err(ServerError::Generic(format!(
                "groupBy must be category or type, got {other}"
            )));
        }
    };
    let from = params::opt_instant(query.from.as_deref(), false)?;
    let to = params::opt_instant(query.to.as_deref(), true)?;
    let totals = state
        .engine
        .transaction_totals(&caller, group, from, to)
        .await?;
    Ok(Json(
        totals
            .into_iter()
            .map(|t| TotalView {
                key: t.key,
                net: t.net,
                gross: t.gross,
                count: t.count,
            })
            .collect(),
    ))
}

pub async fn monthly(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Params(query): Params<TotalsQuery>,
) -> Result<Json<Vec<MonthlyTotalView>>, ServerError> {
    let from = params::opt_instant(query.from.as_deref(), false)?;
    let to = params::opt_instant(query.to.as_deref(), true)?;
    let months = state.engine.monthly_totals(&caller, from, to).await?;
    Ok(Json(
        months
            .into_iter()
            .map(|m| MonthlyTotalView {
                year: m.year,
                month: m.month,
                total_in: m.total_in,
                total_out: m.total_out,
                net: m.net,
            })
            .collect(),
    ))
}

pub async fn types() -> Json<TypeList> {
    Json(TypeList {
        types: TransactionType::ALL
            .iter()
            .map(|kind| kind.as_str().to_string())
            .collect(),
    })
}
