//! Definitions catalog endpoints.

use api_types::definition::{DefinitionList, DefinitionNew, DefinitionView, SearchQuery};
use api_types::PageQuery;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{Caller, Definition, Page};

use crate::{
    ServerError,
    params::{self, Body, Params},
    server::ServerState,
};

fn view(definition: Definition) -> DefinitionView {
    DefinitionView {
        id: definition.id.to_string(),
        name: definition.name,
        abbreviation: definition.abbreviation,
        suffix: definition.suffix,
        created_at: definition.created_at,
        updated_at: definition.updated_at,
    }
}

fn list_view(definitions: Vec<Definition>, page: Page) -> DefinitionList {
    let definitions: Vec<DefinitionView> = definitions.into_iter().map(view).collect();
    DefinitionList {
        count: definitions.len(),
        definitions,
        limit: page.limit,
        offset: page.offset,
    }
}

fn command(payload: DefinitionNew) -> engine::DefinitionNew {
    engine::DefinitionNew {
        name: payload.name,
        abbreviation: payload.abbreviation,
        suffix: payload.suffix,
    }
}

pub async fn create(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Body(payload): Body<DefinitionNew>,
) -> Result<(StatusCode, Json<DefinitionView>), ServerError> {
    let definition = state
        .engine
        .new_definition(&caller, command(payload))
        .await?;
    Ok((StatusCode::CREATED, Json(view(definition))))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(definition_id): Path<String>,
    Body(payload): Body<DefinitionNew>,
) -> Result<Json<DefinitionView>, ServerError> {
    let definition_id = params::id(&definition_id)?;
    let definition = state
        .engine
        .update_definition(&caller, definition_id, command(payload))
        .await?;
    Ok(Json(view(definition)))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(definition_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    let definition_id = params::id(&definition_id)?;
    state
        .engine
        .delete_definition(&caller, definition_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(definition_id): Path<String>,
) -> Result<Json<DefinitionView>, ServerError> {
    let definition_id = params::id(&definition_id)?;
    let definition = state.engine.definition(&caller, definition_id).await?;
    Ok(Json(view(definition)))
}

pub async fn by_abbreviation(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Path(abbreviation): Path<String>,
) -> Result<Json<DefinitionView>, ServerError> {
    let definition = state
        .engine
        .definition_by_abbreviation(&caller, &abbreviation)
        .await?;
    Ok(Json(view(definition)))
}

pub async fn list(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Params(query): Params<PageQuery>,
) -> Result<Json<DefinitionList>, ServerError> {
    let page = params::definitions_page(query.limit.as_deref(), query.offset.as_deref());
    let definitions = state.engine.definitions(&caller, page).await?;
    Ok(Json(list_view(definitions, page)))
}

pub async fn search(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Params(query): Params<SearchQuery>,
) -> Result<Json<DefinitionList>, ServerError> {
    let page = params::definitions_page(query.limit.as_deref(), query.offset.as_deref());
    let term = query.q.unwrap_or_default();
    let definitions = state
        .engine
        .search_definitions(&caller, &term, page)
        .await?;
    Ok(Json(list_view(definitions, page)))
}
