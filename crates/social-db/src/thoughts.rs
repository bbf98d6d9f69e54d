use std::collections::HashMap;

use rusqlite::{Connection, params_from_iter};
use social_types::models::{Reaction, Thought};
use social_types::validation::{NewReaction, NewThought, ThoughtPatch};
use uuid::Uuid;

use crate::models::{ReactionRow, ThoughtRow, timestamp_now};
use crate::{Database, OptionalExt, Result};

/// Upper bound on ids bound into one `IN (...)` list; well under SQLite's
/// host parameter limit.
pub(crate) const MAX_IN_PARAMS: usize = 500;

impl Database {
    pub fn list_thoughts(&self) -> Result<Vec<Thought>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, thought_text, username, created_at FROM thoughts ORDER BY rowid",
            )?;
            let rows = stmt
                .query_map([], thought_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            attach_reactions(conn, rows)
        })
    }

    pub fn get_thought(&self, id: Uuid) -> Result<Option<Thought>> {
        self.with_conn(|conn| query_thought(conn, id))
    }

    pub fn create_thought(&self, new: &NewThought) -> Result<Thought> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO thoughts (id, thought_text, username, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), &new.thought_text, &new.username, timestamp_now()),
            )?;
            query_thought(conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows.into())
        })
    }

    pub fn update_thought(&self, id: Uuid, patch: &ThoughtPatch) -> Result<Option<Thought>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE thoughts
                 SET thought_text = COALESCE(?2, thought_text),
                     username = COALESCE(?3, username)
                 WHERE id = ?1",
                (id.to_string(), &patch.thought_text, &patch.username),
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_thought(conn, id)
        })
    }

    /// Returns the removed thought so callers can unlink it from its author.
    pub fn delete_thought(&self, id: Uuid) -> Result<Option<Thought>> {
        self.with_conn(|conn| {
            let Some(thought) = query_thought(conn, id)? else {
                return Ok(None);
            };
            conn.execute("DELETE FROM thoughts WHERE id = ?1", [id.to_string()])?;
            Ok(Some(thought))
        })
    }

    /// Delete every listed thought that still exists. Returns how many went.
    pub fn delete_thoughts(&self, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        self.with_conn(|conn| {
            let mut deleted = 0;
            for batch in ids.chunks(MAX_IN_PARAMS) {
                let sql = format!("DELETE FROM thoughts WHERE id IN ({})", placeholders(batch.len()));
                deleted +=
                    conn.execute(&sql, params_from_iter(batch.iter().map(|id| id.to_string())))?;
            }
            Ok(deleted)
        })
    }

    /// Set-add: a reaction identical to one already embedded is not added twice.
    pub fn add_reaction(&self, thought_id: Uuid, new: &NewReaction) -> Result<Option<Thought>> {
        self.with_conn(|conn| {
            if !thought_exists(conn, thought_id)? {
                return Ok(None);
            }

            let duplicate = match new.reaction_id {
                Some(reaction_id) => conn
                    .query_row(
                        "SELECT 1 FROM reactions
                         WHERE thought_id = ?1 AND reaction_id = ?2
                           AND reaction_body = ?3 AND username = ?4",
                        (
                            thought_id.to_string(),
                            reaction_id.to_string(),
                            &new.reaction_body,
                            &new.username,
                        ),
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some(),
                None => false,
            };

            if !duplicate {
                let reaction_id = new.reaction_id.unwrap_or_else(Uuid::new_v4);
                conn.execute(
                    "INSERT INTO reactions (thought_id, reaction_id, reaction_body, username, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    (
                        thought_id.to_string(),
                        reaction_id.to_string(),
                        &new.reaction_body,
                        &new.username,
                        timestamp_now(),
                    ),
                )?;
            }

            query_thought(conn, thought_id)
        })
    }

    /// Pull every embedded reaction with this id. No match is not an error.
    pub fn remove_reaction(&self, thought_id: Uuid, reaction_id: Uuid) -> Result<Option<Thought>> {
        self.with_conn(|conn| {
            if !thought_exists(conn, thought_id)? {
                return Ok(None);
            }
            conn.execute(
                "DELETE FROM reactions WHERE thought_id = ?1 AND reaction_id = ?2",
                (thought_id.to_string(), reaction_id.to_string()),
            )?;
            query_thought(conn, thought_id)
        })
    }
}

fn thought_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThoughtRow> {
    Ok(ThoughtRow {
        id: row.get(0)?,
        thought_text: row.get(1)?,
        username: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}

fn thought_exists(conn: &Connection, id: Uuid) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM thoughts WHERE id = ?1", [id.to_string()], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn query_thought(conn: &Connection, id: Uuid) -> Result<Option<Thought>> {
    let row = conn
        .query_row(
            "SELECT id, thought_text, username, created_at FROM thoughts WHERE id = ?1",
            [id.to_string()],
            thought_row,
        )
        .optional()?;

    match row {
        Some(row) => Ok(attach_reactions(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

/// Resolve thought ids in order. Ids with no record are dropped; repeats are kept.
pub(crate) fn query_thoughts_by_ids(conn: &Connection, ids: &[Uuid]) -> Result<Vec<Thought>> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let mut distinct = ids.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    let mut rows = Vec::with_capacity(distinct.len());
    for batch in distinct.chunks(MAX_IN_PARAMS) {
        let sql = format!(
            "SELECT id, thought_text, username, created_at FROM thoughts WHERE id IN ({})",
            placeholders(batch.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let found = stmt
            .query_map(params_from_iter(batch.iter().map(|id| id.to_string())), thought_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.extend(found);
    }

    let by_id: HashMap<Uuid, Thought> = attach_reactions(conn, rows)?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
}

/// Batch-fetch reactions for a set of thought rows and embed them.
fn attach_reactions(conn: &Connection, rows: Vec<ThoughtRow>) -> Result<Vec<Thought>> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    // Order within a thought comes from `seq`; batches never split a thought.
    let mut grouped: HashMap<String, Vec<Reaction>> = HashMap::new();
    for batch in rows.chunks(MAX_IN_PARAMS) {
        let sql = format!(
            "SELECT thought_id, reaction_id, reaction_body, username, created_at
             FROM reactions WHERE thought_id IN ({}) ORDER BY seq",
            placeholders(batch.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let reaction_rows = stmt
            .query_map(params_from_iter(batch.iter().map(|r| r.id.as_str())), |row| {
                Ok(ReactionRow {
                    thought_id: row.get(0)?,
                    reaction_id: row.get(1)?,
                    reaction_body: row.get(2)?,
                    username: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for r in reaction_rows {
            let key = r.thought_id.clone();
            grouped.entry(key).or_default().push(r.into_reaction()?);
        }
    }

    rows.into_iter()
        .map(|row| {
            let reactions = grouped.remove(&row.id).unwrap_or_default();
            row.into_thought(reactions)
        })
        .collect()
}
