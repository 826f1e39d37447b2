use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{authorization::Bearer, Authorization, HeaderMapExt};
use uuid::Uuid;

use crate::auth::jwt::Identity;
use crate::error::AppError;
use crate::AppState;

/// Identity of the caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

impl From<Identity> for AuthUser {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.user_id,
            email: identity.email,
        }
    }
}

/// A missing bearer token is 401; a token that fails verification is 403.
/// Either way the handler never runs.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Authorization(bearer) = req
        .headers()
        .typed_get::<Authorization<Bearer>>()
        .ok_or(AppError::Unauthorized)?;

    let identity = state.sessions.verify(bearer.token()).map_err(|e| {
        tracing::debug!(error = %e, path = %req.uri().path(), "Token rejected");
        AppError::from(e)
    })?;

    req.extensions_mut().insert(AuthUser::from(identity));
    Ok(next.run(req).await)
}
