use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A request for SMS access awaiting manual review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccessRequest {
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub company: Option<String>,
    /// Human-facing code quoted during manual review. Not a secret.
    pub reference_id: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AccessRequest {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone_number: String,
    pub company: Option<String>,
    pub reference_id: String,
    pub created_at: DateTime<Utc>,
}

/// Result of submitting to the registry. A repeat email is an
/// acknowledgement, never an error, and carries no reference id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessOutcome {
    pub is_new_user: bool,
    pub reference_id: Option<String>,
}
