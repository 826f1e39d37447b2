use axum::{extract::State, Extension, Json};

use crate::auth::middleware::AuthUser;
use crate::dto::{
    MoodDataResponse, MoodUpdateRequest, TasksResponse, TasksUpdateRequest, UserDataResponse,
};
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::AppState;

pub async fn get_user_data(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> AppResult<Json<UserDataResponse>> {
    let user = state
        .store
        .find_user_by_id(auth_user.id)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    let (mood_data, tasks) =
        tokio::try_join!(state.store.moods(user.id), state.store.tasks(user.id))?;

    Ok(Json(UserDataResponse {
        id: user.id,
        email: user.email,
        mood_data,
        tasks,
        created_at: user.created_at,
    }))
}

/// Full replace: days missing from the body are deleted.
pub async fn put_mood(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ValidJson(body): ValidJson<MoodUpdateRequest>,
) -> AppResult<Json<MoodDataResponse>> {
    state
        .store
        .replace_moods(auth_user.id, &body.mood_data)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %auth_user.id, error = %e, "Mood replace failed");
            e
        })?;

    let mood_data = state.store.moods(auth_user.id).await?;
    Ok(Json(MoodDataResponse { mood_data }))
}

/// Full replace: the stored list becomes exactly the body's list.
pub async fn put_tasks(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    ValidJson(body): ValidJson<TasksUpdateRequest>,
) -> AppResult<Json<TasksResponse>> {
    state
        .store
        .replace_tasks(auth_user.id, &body.tasks)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %auth_user.id, error = %e, "Task replace failed");
            e
        })?;

    let tasks = state.store.tasks(auth_user.id).await?;
    Ok(Json(TasksResponse { tasks }))
}
