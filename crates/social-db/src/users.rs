use rusqlite::Connection;
use social_types::models::{PopulatedUser, User};
use social_types::validation::{NewUser, UserPatch};
use uuid::Uuid;

use crate::models::{UserRow, parse_uuid};
use crate::thoughts::query_thoughts_by_ids;
use crate::{Database, OptionalExt, Result, StoreError};

impl Database {
    // -- Reads --

    pub fn list_users(&self) -> Result<Vec<PopulatedUser>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM users ORDER BY rowid")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let mut users = Vec::with_capacity(ids.len());
            for raw in ids {
                if let Some(user) = query_user(conn, parse_uuid(&raw)?)? {
                    users.push(populate(conn, user)?);
                }
            }
            Ok(users)
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<PopulatedUser>> {
        self.with_conn(|conn| match query_user(conn, id)? {
            Some(user) => Ok(Some(populate(conn, user)?)),
            None => Ok(None),
        })
    }

    // -- Writes --

    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, sex) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), &new.username, &new.email, new.sex.as_str()),
            )
            .map_err(|e| unique_violation(e, Some(&new.username), Some(&new.email)))?;

            Ok(User {
                id,
                username: new.username.clone(),
                email: new.email.clone(),
                sex: new.sex,
                thoughts: vec![],
                friends: vec![],
            })
        })
    }

    pub fn update_user(&self, id: Uuid, patch: &UserPatch) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE users
                     SET username = COALESCE(?2, username),
                         email = COALESCE(?3, email),
                         sex = COALESCE(?4, sex)
                     WHERE id = ?1",
                    (
                        id.to_string(),
                        &patch.username,
                        &patch.email,
                        patch.sex.map(|s| s.as_str()),
                    ),
                )
                .map_err(|e| unique_violation(e, patch.username.as_deref(), patch.email.as_deref()))?;

            if changed == 0 {
                return Ok(None);
            }
            query_user(conn, id)
        })
    }

    /// Removes the user and its own reference lists. Thoughts it pointed at
    /// are left for the caller; other users' `friends` entries are untouched.
    pub fn delete_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let Some(user) = query_user(conn, id)? else {
                return Ok(None);
            };
            conn.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            Ok(Some(user))
        })
    }

    /// Set-add. The friend id is not checked against the users table.
    pub fn add_friend(&self, id: Uuid, friend_id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            if !user_exists(conn, id)? {
                return Ok(None);
            }
            conn.execute(
                "INSERT OR IGNORE INTO user_friends (user_id, friend_id) VALUES (?1, ?2)",
                (id.to_string(), friend_id.to_string()),
            )?;
            query_user(conn, id)
        })
    }

    pub fn remove_friend(&self, id: Uuid, friend_id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            if !user_exists(conn, id)? {
                return Ok(None);
            }
            conn.execute(
                "DELETE FROM user_friends WHERE user_id = ?1 AND friend_id = ?2",
                (id.to_string(), friend_id.to_string()),
            )?;
            query_user(conn, id)
        })
    }

    /// Append a thought id to a user's list. Repeats are allowed.
    /// Returns false when the user does not exist.
    pub fn push_thought(&self, user_id: Uuid, thought_id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            if !user_exists(conn, user_id)? {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO user_thoughts (user_id, thought_id) VALUES (?1, ?2)",
                (user_id.to_string(), thought_id.to_string()),
            )?;
            Ok(true)
        })
    }

    /// Pull a thought id from the first user whose username matches.
    /// Returns that user's id, if any matched.
    pub fn pull_thought_by_username(&self, username: &str, thought_id: Uuid) -> Result<Option<Uuid>> {
        self.with_conn(|conn| {
            let owner: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE username = ?1 ORDER BY rowid LIMIT 1",
                    [username],
                    |row| row.get(0),
                )
                .optional()?;

            let Some(owner) = owner else {
                return Ok(None);
            };
            conn.execute(
                "DELETE FROM user_thoughts WHERE user_id = ?1 AND thought_id = ?2",
                (&owner, thought_id.to_string()),
            )?;
            Ok(Some(parse_uuid(&owner)?))
        })
    }
}

fn user_exists(conn: &Connection, id: Uuid) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id.to_string()], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn query_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let row = conn
        .query_row(
            "SELECT id, username, email, sex FROM users WHERE id = ?1",
            [id.to_string()],
            |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    email: row.get(2)?,
                    sex: row.get(3)?,
                })
            },
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };
    let thoughts = query_refs(
        conn,
        "SELECT thought_id FROM user_thoughts WHERE user_id = ?1 ORDER BY seq",
        id,
    )?;
    let friends = query_refs(
        conn,
        "SELECT friend_id FROM user_friends WHERE user_id = ?1 ORDER BY seq",
        id,
    )?;
    Ok(Some(row.into_user(thoughts, friends)?))
}

fn query_refs(conn: &Connection, sql: &str, user_id: Uuid) -> Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let raw = stmt
        .query_map([user_id.to_string()], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    raw.iter().map(|s| parse_uuid(s)).collect()
}

/// Resolve `thoughts` and `friends` into full records. Dangling ids drop out.
fn populate(conn: &Connection, user: User) -> Result<PopulatedUser> {
    let thoughts = query_thoughts_by_ids(conn, &user.thoughts)?;

    let mut friends = Vec::with_capacity(user.friends.len());
    for friend_id in &user.friends {
        if let Some(friend) = query_user(conn, *friend_id)? {
            friends.push(friend);
        }
    }

    Ok(PopulatedUser {
        id: user.id,
        username: user.username,
        email: user.email,
        sex: user.sex,
        thoughts,
        friends,
    })
}

/// Turn a UNIQUE failure on `users` into a duplicate-key error naming the field.
fn unique_violation(err: rusqlite::Error, username: Option<&str>, email: Option<&str>) -> StoreError {
    if let rusqlite::Error::SqliteFailure(code, Some(msg)) = &err {
        if code.code == rusqlite::ErrorCode::ConstraintViolation {
            let field = if msg.contains("users.username") {
                Some(("username", username))
            } else if msg.contains("users.email") {
                Some(("email", email))
            } else {
                None
            };
            if let Some((field, value)) = field {
                return StoreError::Duplicate {
                    field: field.to_string(),
                    value: value.unwrap_or_default().to_string(),
                };
            }
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use social_types::models::Sex;
    use social_types::validation::NewThought;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: format!("{username}@example.com"),
            sex: Sex::Female,
        }
    }

    #[test]
    fn duplicate_username_is_rejected_and_not_stored() {
        let db = db();
        db.create_user(&new_user("ada")).unwrap();

        let mut clash = new_user("ada");
        clash.email = "other@example.com".into();
        let err = db.create_user(&clash).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref field, .. } if field == "username"));
        assert!(err.to_string().contains("dup key: { username: \"ada\" }"));

        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = db();
        db.create_user(&new_user("ada")).unwrap();

        let mut clash = new_user("bob");
        clash.email = "ada@example.com".into();
        let err = db.create_user(&clash).unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { ref field, .. } if field == "email"));
    }

    #[test]
    fn update_can_collide_with_another_user() {
        let db = db();
        db.create_user(&new_user("ada")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();

        let patch = UserPatch {
            username: Some("ada".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_user(bob.id, &patch),
            Err(StoreError::Duplicate { .. })
        ));

        let patch = UserPatch {
            sex: Some(Sex::Male),
            ..Default::default()
        };
        let updated = db.update_user(bob.id, &patch).unwrap().unwrap();
        assert_eq!(updated.sex, Sex::Male);
        assert_eq!(updated.username, "bob");
    }

    #[test]
    fn friends_are_a_set() {
        let db = db();
        let ada = db.create_user(&new_user("ada")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();

        db.add_friend(ada.id, bob.id).unwrap();
        let ada_now = db.add_friend(ada.id, bob.id).unwrap().unwrap();
        assert_eq!(ada_now.friends, vec![bob.id]);
        assert_eq!(ada_now.friend_count(), 1);

        // Not symmetric
        let bob_now = db.get_user(bob.id).unwrap().unwrap();
        assert!(bob_now.friends.is_empty());

        let unchanged = db.remove_friend(ada.id, Uuid::new_v4()).unwrap().unwrap();
        assert_eq!(unchanged.friends, vec![bob.id]);

        let removed = db.remove_friend(ada.id, bob.id).unwrap().unwrap();
        assert!(removed.friends.is_empty());
    }

    #[test]
    fn friend_ops_on_missing_user_yield_none() {
        let db = db();
        assert!(db.add_friend(Uuid::new_v4(), Uuid::new_v4()).unwrap().is_none());
        assert!(db.remove_friend(Uuid::new_v4(), Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn populate_resolves_and_drops_dangling_refs() {
        let db = db();
        let ada = db.create_user(&new_user("ada")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();
        let thought = db
            .create_thought(&NewThought {
                thought_text: "hi".into(),
                username: "ada".into(),
            })
            .unwrap();

        db.push_thought(ada.id, thought.id).unwrap();
        db.push_thought(ada.id, Uuid::new_v4()).unwrap();
        db.add_friend(ada.id, bob.id).unwrap();
        db.add_friend(ada.id, Uuid::new_v4()).unwrap();

        let populated = db.get_user(ada.id).unwrap().unwrap();
        assert_eq!(populated.thoughts.len(), 1);
        assert_eq!(populated.thoughts[0].thought_text, "hi");
        assert_eq!(populated.friends.len(), 1);
        assert_eq!(populated.friends[0].username, "bob");
        assert_eq!(populated.friend_count(), 1);
    }

    #[test]
    fn push_thought_allows_repeats() {
        let db = db();
        let ada = db.create_user(&new_user("ada")).unwrap();
        let thought_id = Uuid::new_v4();

        assert!(db.push_thought(ada.id, thought_id).unwrap());
        assert!(db.push_thought(ada.id, thought_id).unwrap());
        assert!(!db.push_thought(Uuid::new_v4(), thought_id).unwrap());

        let user = db.delete_user(ada.id).unwrap().unwrap();
        assert_eq!(user.thoughts, vec![thought_id, thought_id]);
    }

    #[test]
    fn pull_thought_matches_by_username() {
        let db = db();
        let ada = db.create_user(&new_user("ada")).unwrap();
        let thought_id = Uuid::new_v4();
        db.push_thought(ada.id, thought_id).unwrap();
        db.push_thought(ada.id, thought_id).unwrap();

        assert_eq!(db.pull_thought_by_username("ada", thought_id).unwrap(), Some(ada.id));
        assert!(db.get_user(ada.id).unwrap().unwrap().thoughts.is_empty());

        assert_eq!(db.pull_thought_by_username("nobody", thought_id).unwrap(), None);
    }

    #[test]
    fn delete_user_leaves_friend_refs_elsewhere() {
        let db = db();
        let ada = db.create_user(&new_user("ada")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();
        db.add_friend(bob.id, ada.id).unwrap();

        assert!(db.delete_user(ada.id).unwrap().is_some());
        assert!(db.delete_user(ada.id).unwrap().is_none());

        // The stored reference survives; population simply drops it.
        let bob_now = db.get_user(bob.id).unwrap().unwrap();
        assert!(bob_now.friends.is_empty());
        let raw = db.remove_friend(bob.id, Uuid::new_v4()).unwrap().unwrap();
        assert_eq!(raw.friends, vec![ada.id]);
    }
}
