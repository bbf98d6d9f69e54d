use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{debug, info, warn};
use uuid::Uuid;

use social_types::api::{
    AddReactionRequest, CreateThoughtRequest, MessageResponse, UpdateThoughtRequest,
};
use social_types::validation::{validate_new_reaction, validate_new_thought, validate_thought_patch};

use crate::error::ApiError;
use crate::{AppState, blocking, parse_id};

const NO_THOUGHT_THAT: &str = "No thought with that ID";
const NO_THOUGHT_THIS: &str = "No thought with this ID";

/// GET /thoughts
pub async fn list_thoughts(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let thoughts = blocking(&state, |db| db.list_thoughts()).await?;
    Ok(Json(thoughts))
}

/// GET /thoughts/{thought_id}
pub async fn get_thought(
    State(state): State<AppState>,
    Path(thought_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&thought_id, NO_THOUGHT_THAT)?;
    let thought = blocking(&state, move |db| db.get_thought(id))
        .await?
        .ok_or(ApiError::NotFound(NO_THOUGHT_THAT))?;
    Ok(Json(thought))
}

/// POST /thoughts — create, then append the id to the owner's `thoughts`.
///
/// The second write is best effort: if it fails the thought is kept without
/// any user pointing at it.
pub async fn create_thought(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<CreateThoughtRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let new_thought = validate_new_thought(&req)?;
    let thought = blocking(&state, move |db| db.create_thought(&new_thought)).await?;
    info!("Created thought {} by {}", thought.id, thought.username);

    match req.user_id.as_deref().map(str::parse::<Uuid>) {
        Some(Ok(user_id)) => {
            let thought_id = thought.id;
            match blocking(&state, move |db| db.push_thought(user_id, thought_id)).await {
                Ok(true) => debug!("Linked thought {} to user {}", thought_id, user_id),
                Ok(false) => warn!("Thought {} left unlinked: no user {}", thought_id, user_id),
                Err(e) => warn!("Thought {} left unlinked: {}", thought_id, e),
            }
        }
        Some(Err(_)) => warn!(
            "Thought {} left unlinked: malformed userId {:?}",
            thought.id, req.user_id
        ),
        None => warn!("Thought {} left unlinked: no userId given", thought.id),
    }

    Ok((StatusCode::CREATED, Json(thought)))
}

/// PUT /thoughts/{thought_id}
pub async fn update_thought(
    State(state): State<AppState>,
    Path(thought_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateThoughtRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&thought_id, NO_THOUGHT_THIS)?;
    let patch = validate_thought_patch(req)?;
    let thought = blocking(&state, move |db| db.update_thought(id, &patch))
        .await?
        .ok_or(ApiError::NotFound(NO_THOUGHT_THIS))?;
    Ok(Json(thought))
}

/// DELETE /thoughts/{thought_id}
///
/// The owner is found by the thought's stored `username`, not by id, so a
/// renamed author keeps the dangling reference.
pub async fn delete_thought(
    State(state): State<AppState>,
    Path(thought_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&thought_id, NO_THOUGHT_THIS)?;
    let thought = blocking(&state, move |db| db.delete_thought(id))
        .await?
        .ok_or(ApiError::NotFound(NO_THOUGHT_THIS))?;

    let username = thought.username.clone();
    let owner = blocking(&state, move |db| db.pull_thought_by_username(&username, id)).await?;
    match owner {
        Some(user_id) => debug!("Unlinked thought {} from user {}", id, user_id),
        None => debug!("No user named {} to unlink thought {} from", thought.username, id),
    }

    info!("Deleted thought {}", id);
    Ok(Json(MessageResponse::new("Thought deleted!")))
}

/// POST /thoughts/{thought_id}/reactions
pub async fn add_reaction(
    State(state): State<AppState>,
    Path(thought_id): Path<String>,
    WithRejection(Json(req), _): WithRejection<Json<AddReactionRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&thought_id, NO_THOUGHT_THIS)?;
    let reaction = validate_new_reaction(req)?;
    let thought = blocking(&state, move |db| db.add_reaction(id, &reaction))
        .await?
        .ok_or(ApiError::NotFound(NO_THOUGHT_THIS))?;
    Ok(Json(thought))
}

/// DELETE /thoughts/{thought_id}/reactions/{reaction_id}
///
/// A well-formed reaction id that matches nothing leaves the thought as it was.
pub async fn remove_reaction(
    State(state): State<AppState>,
    Path((thought_id, reaction_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_id(&thought_id, NO_THOUGHT_THIS)?;
    let reaction_id = parse_id(&reaction_id, NO_THOUGHT_THIS)?;
    let thought = blocking(&state, move |db| db.remove_reaction(id, reaction_id))
        .await?
        .ok_or(ApiError::NotFound(NO_THOUGHT_THIS))?;
    Ok(Json(thought))
}
