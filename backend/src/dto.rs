//! # MoodSync request and response DTOs
//!
//! All API contract types in one module. Field names follow the browser
//! client's JSON (camelCase where it uses camelCase).
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON body
//! - `*Response` → serialized to client JSON (and read back by `client`)
//! - Validation is expressed via `validator` derive macros and enforced by
//!   [`crate::extract::ValidJson`]
//! - Required text fields use `#[serde(default)]` so a missing field reports
//!   the same message as an empty one

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::mood::MoodMap;
use crate::models::task::{NewTask, TaskEntry};

// ============================================================================
// Auth
// ============================================================================

/// Surrounding whitespace is dropped before validation runs, so a pasted
/// `" a@x.com "` is checked as `a@x.com`.
fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().to_string())
}

/// POST /api/signup
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(email(message = "A valid email is required"))]
    #[validate(length(max = 254, message = "Email too long"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 128, message = "Password is required (max 128 characters)"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub message: String,
    pub user_id: Uuid,
}

/// POST /api/login
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Email and password are required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Email and password are required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSnapshot,
}

/// The user's profile plus everything the client renders.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub id: Uuid,
    pub email: String,
    pub mood_data: MoodMap,
    pub tasks: Vec<TaskEntry>,
}

/// GET /api/verify
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub user_id: Uuid,
    pub email: String,
}

// ============================================================================
// User data
// ============================================================================

/// GET /api/user/data
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataResponse {
    pub id: Uuid,
    pub email: String,
    pub mood_data: MoodMap,
    pub tasks: Vec<TaskEntry>,
    pub created_at: DateTime<Utc>,
}

/// PUT /api/user/mood. The complete map, not a delta.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MoodUpdateRequest {
    pub mood_data: MoodMap,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodDataResponse {
    pub mood_data: MoodMap,
}

/// PUT /api/user/tasks. The complete list, not a delta.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TasksUpdateRequest {
    #[validate]
    pub tasks: Vec<NewTask>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TasksResponse {
    pub tasks: Vec<TaskEntry>,
}

// ============================================================================
// SMS
// ============================================================================

/// POST /api/schedule-sms
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ScheduleSmsRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 20, message = "Missing or invalid parameters"))]
    pub phone: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 1600, message = "Missing or invalid parameters"))]
    pub message: String,

    /// Milliseconds to wait before sending.
    pub delay: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScheduleSmsResponse {
    pub success: bool,
    pub message: String,
}

/// POST /api/twilio-access-request
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestBody {
    #[serde(default)]
    #[validate(length(min = 1, message = "Full Name, Email, and Phone Number are required."))]
    #[validate(length(max = 100, message = "Name must be under 100 characters"))]
    pub user_name: String,

    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, message = "Full Name, Email, and Phone Number are required."))]
    #[validate(length(max = 254, message = "Email too long"))]
    pub user_email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "Full Name, Email, and Phone Number are required."))]
    #[validate(length(max = 20, message = "Phone number too long"))]
    pub user_phone: String,

    #[validate(length(max = 100, message = "Company must be under 100 characters"))]
    pub user_company: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequestResponse {
    pub success: bool,
    pub reference_id: Option<String>,
    pub is_new_user: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_requires_email_and_password() {
        let empty: SignupRequest = serde_json::from_str("{}").unwrap();
        let errors = empty.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));

        let ok: SignupRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"p1"}"#).unwrap();
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn access_request_uses_camel_case() {
        let body: AccessRequestBody = serde_json::from_str(
            r#"{"userName":"Ada","userEmail":"ada@x.com","userPhone":"+15550001"}"#,
        )
        .unwrap();
        assert!(body.validate().is_ok());
        assert_eq!(body.user_company, None);

        let response = AccessRequestResponse {
            success: true,
            reference_id: None,
            is_new_user: false,
            message: "noted".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["referenceId"].is_null());
        assert_eq!(json["isNewUser"], false);
    }

    #[test]
    fn padded_email_is_trimmed_before_validation() {
        let body: SignupRequest =
            serde_json::from_str(r#"{"email":"  Ada@X.com ","password":"p1"}"#).unwrap();
        assert_eq!(body.email, "Ada@X.com");
        assert!(body.validate().is_ok());

        let body: LoginRequest =
            serde_json::from_str(r#"{"email":"\tada@x.com\n","password":"p1"}"#).unwrap();
        assert_eq!(body.email, "ada@x.com");
    }

    #[test]
    fn nested_task_validation_reaches_each_task() {
        let body: TasksUpdateRequest = serde_json::from_str(
            r#"{"tasks":[{"text":"ok","date":"2024-01-01T00:00:00Z"},{"text":" ","date":"2024-01-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        assert!(body.validate().is_err());
    }
}
