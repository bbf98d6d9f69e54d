use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};

use social_types::api::{CreateUserRequest, MessageResponse, UpdateUserRequest};
use social_types::validation::{validate_new_user, validate_user_patch};

use crate::error::ApiError;
use crate::{AppState, blocking, parse_id};

const NO_USER_THAT: &str = "No user with that ID";
const NO_USER_THIS: &str = "No user with this ID";
const NO_USER_FOUND: &str = "No user found with that ID";

/// GET /users — every user with friends and thoughts populated.
pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = blocking(&state, |db| db.list_users()).await?;
    Ok(Json(users))
}

/// GET /users/{user_id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&user_id, NO_USER_THAT)?;
    let user = blocking(&state, move |db| db.get_user(id))
        .await?
        .ok_or(ApiError::NotFound(NO_USER_THAT))?;
    Ok(Json(user))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateUserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let new_user = validate_new_user(req)?;
    let user = blocking(&state, move |db| db.create_user(&new_user)).await?;

    info!("Created user {} ({})", user.username, user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// PUT /users/{user_id} — partial update, changed fields re-validated.
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateUserRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&user_id, NO_USER_THIS)?;
    let patch = validate_user_patch(req)?;
    let user = blocking(&state, move |db| db.update_user(id, &patch))
        .await?
        .ok_or(ApiError::NotFound(NO_USER_THIS))?;
    Ok(Json(user))
}

/// DELETE /users/{user_id} — also deletes every thought the user lists.
/// The two deletes are separate writes; a failure between them leaves orphans.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&user_id, NO_USER_THIS)?;
    let user = blocking(&state, move |db| db.delete_user(id))
        .await?
        .ok_or(ApiError::NotFound(NO_USER_THIS))?;

    let listed = user.thoughts.len();
    let thought_ids = user.thoughts;
    let deleted = blocking(&state, move |db| db.delete_thoughts(&thought_ids)).await?;
    if deleted < listed {
        warn!(
            "User {} listed {} thoughts but only {} existed",
            user.id, listed, deleted
        );
    }

    info!("Deleted user {} and {} thoughts", user.id, deleted);
    Ok(Json(MessageResponse::new("User and associated thoughts deleted!")))
}

/// POST /users/{user_id}/friends/{friend_id}
pub async fn add_friend(
    State(state): State<AppState>,
    Path((user_id, friend_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&user_id, NO_USER_FOUND)?;
    let friend_id = parse_id(&friend_id, NO_USER_FOUND)?;
    let user = blocking(&state, move |db| db.add_friend(id, friend_id))
        .await?
        .ok_or(ApiError::NotFound(NO_USER_FOUND))?;
    Ok(Json(user))
}

/// DELETE /users/{user_id}/friends/{friend_id} — absent friend is a no-op.
pub async fn remove_friend(
    State(state): State<AppState>,
    Path((user_id, friend_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&user_id, NO_USER_FOUND)?;
    let friend_id = parse_id(&friend_id, NO_USER_FOUND)?;
    let user = blocking(&state, move |db| db.remove_friend(id, friend_id))
        .await?
        .ok_or(ApiError::NotFound(NO_USER_FOUND))?;
    Ok(Json(user))
}
