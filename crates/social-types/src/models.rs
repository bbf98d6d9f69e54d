use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use uuid::Uuid;

/// Render a timestamp the way every `createdAt` field is shown to clients,
/// e.g. `Apr 22, 2025, 12:47 PM`. Always UTC.
pub fn format_date(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%b %-d, %Y, %-I:%M %p").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Sex::Male),
            "Female" => Ok(Sex::Female),
            _ => Err(()),
        }
    }
}

/// A user document with its reference arrays left as ids.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub sex: Sex,
    pub thoughts: Vec<Uuid>,
    pub friends: Vec<Uuid>,
}

impl User {
    pub fn friend_count(&self) -> usize {
        self.friends.len()
    }
}

impl Serialize for User {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("User", 7)?;
        doc.serialize_field("id", &self.id)?;
        doc.serialize_field("username", &self.username)?;
        doc.serialize_field("email", &self.email)?;
        doc.serialize_field("sex", &self.sex)?;
        doc.serialize_field("thoughts", &self.thoughts)?;
        doc.serialize_field("friends", &self.friends)?;
        doc.serialize_field("friendCount", &self.friend_count())?;
        doc.end()
    }
}

/// A user with `thoughts` and `friends` replaced by the records they point at.
/// Friends are embedded unpopulated.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulatedUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub sex: Sex,
    pub thoughts: Vec<Thought>,
    pub friends: Vec<User>,
}

impl PopulatedUser {
    pub fn friend_count(&self) -> usize {
        self.friends.len()
    }
}

impl Serialize for PopulatedUser {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("User", 7)?;
        doc.serialize_field("id", &self.id)?;
        doc.serialize_field("username", &self.username)?;
        doc.serialize_field("email", &self.email)?;
        doc.serialize_field("sex", &self.sex)?;
        doc.serialize_field("thoughts", &self.thoughts)?;
        doc.serialize_field("friends", &self.friends)?;
        doc.serialize_field("friendCount", &self.friend_count())?;
        doc.end()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Thought {
    pub id: Uuid,
    pub thought_text: String,
    /// Copied from the author at creation time, never re-derived.
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<Reaction>,
}

impl Thought {
    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }
}

impl Serialize for Thought {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("Thought", 6)?;
        doc.serialize_field("id", &self.id)?;
        doc.serialize_field("thoughtText", &self.thought_text)?;
        doc.serialize_field("username", &self.username)?;
        doc.serialize_field("createdAt", &format_date(&self.created_at))?;
        doc.serialize_field("reactions", &self.reactions)?;
        doc.serialize_field("reactionCount", &self.reaction_count())?;
        doc.end()
    }
}

/// Embedded in a thought; has no row of its own outside its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub reaction_id: Uuid,
    pub reaction_body: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Serialize for Reaction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut doc = serializer.serialize_struct("Reaction", 4)?;
        doc.serialize_field("reactionId", &self.reaction_id)?;
        doc.serialize_field("reactionBody", &self.reaction_body)?;
        doc.serialize_field("username", &self.username)?;
        doc.serialize_field("createdAt", &format_date(&self.created_at))?;
        doc.end()
    }
}
