use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use crate::error::AppError;

/// `Json<T>` that also runs `T`'s `validator` rules. Any failure, from a
/// missing content type to a bad field, becomes a 400 before the handler runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;

        value
            .validate()
            .map_err(|errors| AppError::Validation(describe(&errors)))?;

        Ok(ValidJson(value))
    }
}

/// Flatten nested validation errors into one sorted, de-duplicated sentence.
pub fn describe(errors: &ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect(errors, &mut messages);
    messages.sort();
    messages.dedup();
    messages.join("; ")
}

fn collect(errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    out.push(
                        err.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{field} is invalid")),
                    );
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, out),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect(nested, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{AccessRequestBody, TasksUpdateRequest};

    #[test]
    fn repeated_messages_collapse() {
        let body: AccessRequestBody = serde_json::from_str("{}").unwrap();
        let errors = body.validate().unwrap_err();
        assert_eq!(
            describe(&errors),
            "Full Name, Email, and Phone Number are required."
        );
    }

    #[test]
    fn nested_list_messages_surface() {
        let body: TasksUpdateRequest =
            serde_json::from_str(r#"{"tasks":[{"text":"","date":"2024-01-01T00:00:00Z"}]}"#)
                .unwrap();
        let errors = body.validate().unwrap_err();
        assert_eq!(describe(&errors), "Task text must not be empty");
    }
}
