//! Schema rules applied before anything reaches the store.
//!
//! Messages mirror document-database validator output so they can be handed
//! to clients verbatim.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use uuid::Uuid;

use crate::api::{
    AddReactionRequest, CreateThoughtRequest, CreateUserRequest, UpdateThoughtRequest,
    UpdateUserRequest,
};
use crate::models::Sex;

pub const THOUGHT_TEXT_MAX: usize = 280;
pub const THOUGHT_TEXT_MIN: usize = 1;
pub const REACTION_BODY_MAX: usize = 280;

const EMAIL_MESSAGE: &str = "Please enter a valid email address";

struct FieldError {
    path: &'static str,
    message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    fn new(prefix: &str, fields: Vec<FieldError>) -> Self {
        let details = fields
            .iter()
            .map(|f| format!("{}: {}", f.path, f.message))
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            message: format!("{prefix}: {details}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub sex: Sex,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub sex: Option<Sex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewThought {
    pub thought_text: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThoughtPatch {
    pub thought_text: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReaction {
    /// Client-supplied id, if any. The store generates one otherwise.
    pub reaction_id: Option<Uuid>,
    pub reaction_body: String,
    pub username: String,
}

/// `.+@.+\..+` with `.` narrowed to what it matches in the document store's
/// validator: anything but a line terminator.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\n\r\u{2028}\u{2029}]+@[^\n\r\u{2028}\u{2029}]+\.[^\n\r\u{2028}\u{2029}]+")
        .expect("email pattern compiles")
});

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

#[derive(Default)]
struct Checker {
    fields: Vec<FieldError>,
}

impl Checker {
    fn push(&mut self, path: &'static str, message: String) {
        self.fields.push(FieldError { path, message });
    }

    fn required(&mut self, path: &'static str) {
        self.push(path, format!("Path `{path}` is required."));
    }

    /// Empty strings fail `required`, same as a missing value.
    fn string(&mut self, path: &'static str, value: Option<String>) -> Option<String> {
        match value {
            Some(v) if !v.is_empty() => Some(v),
            _ => {
                self.required(path);
                None
            }
        }
    }

    fn max_len(&mut self, path: &'static str, value: &str, max: usize) -> bool {
        if value.chars().count() > max {
            self.push(
                path,
                format!(
                    "Path `{path}` (`{value}`) is longer than the maximum allowed length ({max})."
                ),
            );
            return false;
        }
        true
    }

    fn min_len(&mut self, path: &'static str, value: &str, min: usize) -> bool {
        if value.chars().count() < min {
            self.push(
                path,
                format!(
                    "Path `{path}` (`{value}`) is shorter than the minimum allowed length ({min})."
                ),
            );
            return false;
        }
        true
    }

    fn email(&mut self, value: &str) -> bool {
        if !is_valid_email(value) {
            self.push("email", EMAIL_MESSAGE.to_string());
            return false;
        }
        true
    }

    fn sex(&mut self, value: &str) -> Option<Sex> {
        match value.parse::<Sex>() {
            Ok(sex) => Some(sex),
            Err(()) => {
                self.push(
                    "sex",
                    format!("`{value}` is not a valid enum value for path `sex`."),
                );
                None
            }
        }
    }

    fn thought_text(&mut self, value: String) -> Option<String> {
        let ok = self.min_len("thoughtText", &value, THOUGHT_TEXT_MIN)
            && self.max_len("thoughtText", &value, THOUGHT_TEXT_MAX);
        ok.then_some(value)
    }

    fn finish<T>(self, prefix: &str, value: impl FnOnce() -> Option<T>) -> Result<T, ValidationError> {
        if !self.fields.is_empty() {
            return Err(ValidationError::new(prefix, self.fields));
        }
        value().ok_or_else(|| ValidationError::new(prefix, Vec::new()))
    }
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

pub fn validate_new_user(req: CreateUserRequest) -> Result<NewUser, ValidationError> {
    let mut check = Checker::default();

    let username = check.string("username", trimmed(req.username));
    let email = check
        .string("email", req.email)
        .filter(|e| check.email(e));
    let sex = check.string("sex", req.sex).and_then(|s| check.sex(&s));

    check.finish("User validation failed", || {
        Some(NewUser {
            username: username?,
            email: email?,
            sex: sex?,
        })
    })
}

pub fn validate_user_patch(req: UpdateUserRequest) -> Result<UserPatch, ValidationError> {
    let mut check = Checker::default();
    let mut patch = UserPatch::default();

    if let Some(username) = trimmed(req.username) {
        patch.username = check.string("username", Some(username));
    }
    if let Some(email) = req.email {
        patch.email = check.string("email", Some(email)).filter(|e| check.email(e));
    }
    if let Some(sex) = req.sex {
        patch.sex = check.string("sex", Some(sex)).and_then(|s| check.sex(&s));
    }

    check.finish("Validation failed", || Some(patch))
}

pub fn validate_new_thought(req: &CreateThoughtRequest) -> Result<NewThought, ValidationError> {
    let mut check = Checker::default();

    let thought_text = check
        .string("thoughtText", req.thought_text.clone())
        .and_then(|t| check.thought_text(t));
    let username = check.string("username", req.username.clone());

    check.finish("Thought validation failed", || {
        Some(NewThought {
            thought_text: thought_text?,
            username: username?,
        })
    })
}

pub fn validate_thought_patch(req: UpdateThoughtRequest) -> Result<ThoughtPatch, ValidationError> {
    let mut check = Checker::default();
    let mut patch = ThoughtPatch::default();

    if let Some(text) = req.thought_text {
        patch.thought_text = check
            .string("thoughtText", Some(text))
            .and_then(|t| check.thought_text(t));
    }
    if let Some(username) = req.username {
        patch.username = check.string("username", Some(username));
    }

    check.finish("Validation failed", || Some(patch))
}

pub fn validate_new_reaction(req: AddReactionRequest) -> Result<NewReaction, ValidationError> {
    let mut check = Checker::default();

    let reaction_id = match req.reaction_id {
        Some(raw) => match raw.parse::<Uuid>() {
            Ok(id) => Some(id),
            Err(_) => {
                check.push(
                    "reactionId",
                    format!("Cast to UUID failed for value \"{raw}\" at path `reactionId`"),
                );
                None
            }
        },
        None => None,
    };
    let reaction_body = check
        .string("reactionBody", req.reaction_body)
        .filter(|b| check.max_len("reactionBody", b, REACTION_BODY_MAX));
    let username = check.string("username", req.username);

    check.finish("Validation failed", || {
        Some(NewReaction {
            reaction_id,
            reaction_body: reaction_body?,
            username: username?,
        })
    })
}
