use serde::{Deserialize, Serialize};

// -- Users --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub sex: Option<String>,
}

/// Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub sex: Option<String>,
}

// -- Thoughts --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThoughtRequest {
    pub thought_text: Option<String>,
    pub username: Option<String>,
    /// Owner whose `thoughts` list receives the new id. Not validated.
    pub user_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateThoughtRequest {
    pub thought_text: Option<String>,
    pub username: Option<String>,
}

// -- Reactions --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReactionRequest {
    pub reaction_id: Option<String>,
    pub reaction_body: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
