//! Persisted auth session.
//!
//! The auth collaborator keeps at most one session; it is stored as JSON in
//! the single-row `auth_session` table so a restart can resume it.

use rusqlite::{params, OptionalExtension};

use secondserve_shared::models::Session;

use crate::database::Database;
use crate::error::Result;

impl Database {
    pub fn save_session(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session)?;
        self.conn().execute(
            "INSERT INTO auth_session (id, json) VALUES (1, ?1)
             ON CONFLICT(id) DO UPDATE SET json = excluded.json",
            params![json],
        )?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<Session>> {
        let json: Option<String> = self
            .conn()
            .query_row("SELECT json FROM auth_session WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn clear_session(&self) -> Result<()> {
        self.conn().execute("DELETE FROM auth_session", [])?;
        Ok(())
    }
}
