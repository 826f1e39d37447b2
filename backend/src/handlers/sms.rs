use std::time::Duration;

use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::dto::{
    AccessRequestBody, AccessRequestResponse, ScheduleSmsRequest, ScheduleSmsResponse,
};
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::models::user::normalize_email;
use crate::services::access_requests::{self, AccessApplication};
use crate::AppState;

const NEW_REQUEST_MESSAGE: &str =
    "Your SMS access request has been submitted successfully for manual review.";
const KNOWN_REQUEST_MESSAGE: &str =
    "Your request has been noted. You are already an existing user for SMS access.";

pub async fn schedule_sms(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ValidJson(body): ValidJson<ScheduleSmsRequest>,
) -> AppResult<Json<ScheduleSmsResponse>> {
    let delay_ms = body
        .delay
        .filter(|d| d.is_finite())
        .ok_or_else(|| AppError::Validation("Missing or invalid parameters".into()))?;
    if delay_ms < 0.0 {
        return Err(AppError::Validation("Delay must be non-negative".into()));
    }
    let delay = Duration::try_from_secs_f64(delay_ms / 1000.0)
        .map_err(|_| AppError::Validation("Delay is too large".into()))?;

    let scheduler = state
        .sms
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("SMS service is not configured".into()))?;

    tracing::info!(user_id = %auth_user.id, "Scheduling SMS reminder");
    // Detached: the send outlives this request and is never cancelled.
    drop(scheduler.schedule(body.phone, body.message, delay));

    Ok(Json(ScheduleSmsResponse {
        success: true,
        message: "SMS scheduled successfully".into(),
    }))
}

pub async fn request_access(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<AccessRequestBody>,
) -> AppResult<Json<AccessRequestResponse>> {
    let application = AccessApplication {
        username: body.user_name.trim().to_string(),
        email: normalize_email(&body.user_email),
        phone_number: body.user_phone.trim().to_string(),
        company: body
            .user_company
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    };

    let outcome = access_requests::submit(state.store.as_ref(), application).await?;

    let message = if outcome.is_new_user {
        NEW_REQUEST_MESSAGE
    } else {
        KNOWN_REQUEST_MESSAGE
    };

    Ok(Json(AccessRequestResponse {
        success: true,
        reference_id: outcome.reference_id,
        is_new_user: outcome.is_new_user,
        message: message.into(),
    }))
}
