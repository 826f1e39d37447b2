use axum::{extract::State, http::StatusCode, Extension, Json};

use crate::auth::{
    middleware::AuthUser,
    password::{hash_password, verify_password},
};
use crate::dto::{
    LoginRequest, LoginResponse, SignupRequest, SignupResponse, UserSnapshot, VerifyResponse,
};
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::models::user::normalize_email;
use crate::storage::StorageError;
use crate::AppState;

pub async fn signup(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let email = normalize_email(&body.email);

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::AlreadyExists("User already exists".into()));
    }

    let pwd_hash = hash_password(&body.password)?;

    // The pre-check can race another signup; the unique index decides.
    let user_id = match state.store.create_user(&email, &pwd_hash).await {
        Ok(id) => id,
        Err(StorageError::Conflict(msg)) => return Err(AppError::AlreadyExists(msg)),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user_id, "User signed up");
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created successfully".into(),
            user_id,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let email = normalize_email(&body.email);

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&body.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Password mismatch");
        return Err(AppError::InvalidCredentials);
    }

    let (mood_data, tasks) =
        tokio::try_join!(state.store.moods(user.id), state.store.tasks(user.id))?;
    let token = state.sessions.issue(user.id, &user.email)?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse {
        token,
        user: UserSnapshot {
            id: user.id,
            email: user.email,
            mood_data,
            tasks,
        },
    }))
}

pub async fn verify(Extension(auth_user): Extension<AuthUser>) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        valid: true,
        user_id: auth_user.id,
        email: auth_user.email,
    })
}
