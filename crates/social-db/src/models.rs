//! Row types as they come out of SQLite, before ids and timestamps are parsed.

use chrono::{DateTime, Utc};
use social_types::models::{Reaction, Sex, Thought, User};
use uuid::Uuid;

use crate::{Result, StoreError};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub sex: String,
}

impl UserRow {
    pub fn into_user(self, thoughts: Vec<Uuid>, friends: Vec<Uuid>) -> Result<User> {
        let sex = self
            .sex
            .parse::<Sex>()
            .map_err(|_| StoreError::Corrupt(format!("sex '{}' on user '{}'", self.sex, self.id)))?;
        Ok(User {
            id: parse_uuid(&self.id)?,
            username: self.username,
            email: self.email,
            sex,
            thoughts,
            friends,
        })
    }
}

pub struct ThoughtRow {
    pub id: String,
    pub thought_text: String,
    pub username: String,
    pub created_at: String,
}

impl ThoughtRow {
    pub fn into_thought(self, reactions: Vec<Reaction>) -> Result<Thought> {
        Ok(Thought {
            id: parse_uuid(&self.id)?,
            thought_text: self.thought_text,
            username: self.username,
            created_at: parse_timestamp(&self.created_at)?,
            reactions,
        })
    }
}

pub struct ReactionRow {
    pub thought_id: String,
    pub reaction_id: String,
    pub reaction_body: String,
    pub username: String,
    pub created_at: String,
}

impl ReactionRow {
    pub fn into_reaction(self) -> Result<Reaction> {
        Ok(Reaction {
            reaction_id: parse_uuid(&self.reaction_id)?,
            reaction_body: self.reaction_body,
            username: self.username,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid> {
    raw.parse()
        .map_err(|e| StoreError::Corrupt(format!("id '{}': {}", raw, e)))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp '{}': {}", raw, e)))
}

pub(crate) fn timestamp_now() -> String {
    Utc::now().to_rfc3339()
}
