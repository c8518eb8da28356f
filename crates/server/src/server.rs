use axum::{
    Router,
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use engine::{CancelSignal, Caller, Engine, EngineError, cancel_pair};

use std::{sync::Arc, time::Duration};

use crate::{
    ServerError, accounts, assets, auth::AuthManager, definitions, transactions, users,
};

/// Runtime knobs of the HTTP layer.
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// Once elapsed, the in-flight engine operation is cancelled.
    pub request_timeout: Duration,
}

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub auth: Arc<AuthManager>,
    pub request_timeout: Duration,
}

/// Arms a per-request deadline and hands its signal to the handlers.
async fn deadline(
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Response {
    let (handle, signal) = cancel_pair();
    request.extensions_mut().insert(signal);

    let timeout = state.request_timeout;
    let path = request.uri().path().to_string();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        tracing::warn!(%path, ?timeout, "request deadline reached, cancelling");
        handle.cancel();
    });

    let response = next.run(request).await;
    timer.abort();
    response
}

/// Resolves the bearer token into the [`Caller`] every protected handler
/// receives.
async fn auth(
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let unauthorized =
        || ServerError::from(EngineError::Unauthorized("missing or invalid token".to_string()));
    let Ok(TypedHeader(Authorization(bearer))) = bearer else {
        return Err(unauthorized());
    };
    let claims = state.auth.verify(bearer.token()).ok_or_else(unauthorized)?;

    let cancel = request
        .extensions()
        .get::<CancelSignal>()
        .cloned()
        .unwrap_or_default();
    request
        .extensions_mut()
        .insert(Caller::new(claims.sub).with_cancel(cancel));
    Ok(next.run(request).await)
}

pub fn router(engine: Engine, options: ServerOptions) -> Router {
    let state = ServerState {
        engine: Arc::new(engine),
        auth: Arc::new(AuthManager::new(&options.jwt_secret, options.token_ttl)),
        request_timeout: options.request_timeout,
    };

    let public = Router::new()
        .route("/auth/register", post(users::register))
        .route("/auth/login", post(users::login));

    let protected = Router::new()
        .route(
            "/users/me",
            get(users::me).put(users::update).delete(users::delete),
        )
        .route("/users/me/password", put(users::change_password))
        .route(
            "/users/me/password/validate",
            post(users::validate_password),
        )
        .route("/accounts", get(accounts::list).post(accounts::create))
        .route("/accounts/types", get(accounts::types))
        .route("/accounts/filter", get(accounts::filter))
        .route("/accounts/summary", get(accounts::summary))
        .route("/accounts/with-assets", get(accounts::list_with_assets))
        .route("/accounts/type/{kind}", get(accounts::by_type))
        .route("/accounts/currency/{currency}", get(accounts::by_currency))
        .route(
            "/accounts/{id}",
            get(accounts::get)
                .put(accounts::update)
                .delete(accounts::delete),
        )
        .route("/accounts/{id}/balance", post(accounts::update_balance))
        .route("/accounts/{id}/assets", get(accounts::with_assets))
        .route("/assets", get(assets::list).post(assets::create))
        .route("/assets/types", get(assets::types))
        .route("/assets/filter", get(assets::filter))
        .route("/assets/performance", get(assets::performance))
        .route("/assets/total-value", get(assets::total_value))
        .route("/assets/type/{kind}", get(assets::by_type))
        .route("/assets/account/{account_id}", get(assets::by_account))
        .route(
            "/assets/{id}",
            get(assets::get).put(assets::update).delete(assets::delete),
        )
        .route("/assets/{id}/price", put(assets::update_price))
        .route(
            "/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route("/transactions/types", get(transactions::types))
        .route("/transactions/totals", get(transactions::totals))
        .route("/transactions/monthly", get(transactions::monthly))
        .route(
            "/transactions/account/{account_id}",
            get(transactions::by_account),
        )
        .route("/transactions/asset/{asset_id}", get(transactions::by_asset))
        .route(
            "/transactions/{id}",
            get(transactions::get)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route(
            "/definitions",
            get(definitions::list).post(definitions::create),
        )
        .route("/definitions/search", get(definitions::search))
        .route(
            "/definitions/abbreviation/{abbreviation}",
            get(definitions::by_abbreviation),
        )
        .route(
            "/definitions/{id}",
            get(definitions::get)
                .put(definitions::update)
                .delete(definitions::delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    public
        .merge(protected)
        .layer(middleware::from_fn_with_state(state.clone(), deadline))
        .with_state(state)
}

pub async fn run_with_listener(
    engine: Engine,
    options: ServerOptions,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(engine, options)).await
}
