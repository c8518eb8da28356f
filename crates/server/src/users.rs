//! Registration, login and the caller's own profile.

use api_types::user::{
    AuthResponse, ChangePassword, Login, PasswordCheck, PasswordValid, Register, UserUpdate,
    UserView,
};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{CancelSignal, Caller, User};

use crate::{ServerError, params::Body, server::ServerState};

pub(crate) fn view(user: User) -> UserView {
    UserView {
        id: user.id.to_string(),
        email: user.email,
        first_name: user.first_name,
        last_name: user.last_name,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

fn authenticated(state: &ServerState, user: User) -> Result<AuthResponse, ServerError> {
    let (token, expires_at) = state.auth.issue(&user)?;
    Ok(AuthResponse {
        token,
        expires_at,
        user: view(user),
    })
}

pub async fn register(
    Extension(cancel): Extension<CancelSignal>,
    State(state): State<ServerState>,
    Body(payload): Body<Register>,
) -> Result<(StatusCode, Json<AuthResponse>), ServerError> {
    let user = state
        .engine
        .register(
            &cancel,
            engine::UserNew {
                email: payload.email,
                password: payload.password,
                first_name: payload.first_name,
                last_name: payload.last_name,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(authenticated(&state, user)?)))
}

pub async fn login(
    Extension(cancel): Extension<CancelSignal>,
    State(state): State<ServerState>,
    Body(payload): Body<Login>,
) -> Result<Json<AuthResponse>, ServerError> {
    let user = state
        .engine
        .login(&cancel, &payload.email, &payload.password)
        .await?;
    Ok(Json(authenticated(&state, user)?))
}

pub async fn me(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
) -> Result<Json<UserView>, ServerError> {
    let user = state.engine.user(&caller).await?;
    Ok(Json(view(user)))
}

pub async fn update(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Body(payload): Body<UserUpdate>,
) -> Result<Json<UserView>, ServerError> {
    let user = state
        .engine
        .update_user(
            &caller,
            engine::UserUpdate {
                email: payload.email,
                first_name: payload.first_name,
                last_name: payload.last_name,
            },
        )
        .await?;
    Ok(Json(view(user)))
}

pub async fn change_password(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Body(payload): Body<ChangePassword>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .change_password(&caller, &payload.old_password, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn validate_password(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Body(payload): Body<PasswordCheck>,
) -> Result<Json<PasswordValid>, ServerError> {
    let valid = state
        .engine
        .validate_password(&caller, &payload.password)
        .await?;
    Ok(Json(PasswordValid { valid }))
}

pub async fn delete(
    Extension(caller): Extension<Caller>,
    State(state): State<ServerState>,
    Body(payload): Body<PasswordCheck>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_user(&caller, &payload.password).await?;
    Ok(StatusCode::NO_CONTENT)
}
