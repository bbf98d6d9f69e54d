pub mod error;
pub mod thoughts;
pub mod users;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use uuid::Uuid;

use social_db::Database;

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self { db })
    }
}

/// All REST routes, bound to the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{user_id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/users/{user_id}/friends/{friend_id}",
            post(users::add_friend).delete(users::remove_friend),
        )
        .route("/thoughts", get(thoughts::list_thoughts).post(thoughts::create_thought))
        .route(
            "/thoughts/{thought_id}",
            get(thoughts::get_thought)
                .put(thoughts::update_thought)
                .delete(thoughts::delete_thought),
        )
        .route("/thoughts/{thought_id}/reactions", post(thoughts::add_reaction))
        .route(
            "/thoughts/{thought_id}/reactions/{reaction_id}",
            delete(thoughts::remove_reaction),
        )
        .with_state(state)
}

/// Run a store call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> social_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.db)).await?;
    Ok(result?)
}

/// An id that cannot name a record is the same as one that names nothing.
pub(crate) fn parse_id(raw: &str, missing: &'static str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::NotFound(missing))
}
