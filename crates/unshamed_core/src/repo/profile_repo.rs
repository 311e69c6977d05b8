//! Jurisdiction profile repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over `state_profiles` storage.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `StateProfile::validate()` before SQL mutations.
//! - Deleting a profile cascades to its obligations via foreign keys.
//! - Listing is deterministic: `state_code ASC, uuid ASC`.

use crate::model::profile::{ProfileId, StateProfile};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};

const PROFILE_SELECT_SQL: &str = "SELECT
    uuid,
    state_code,
    display_name
FROM state_profiles";

/// Repository interface for jurisdiction profile CRUD operations.
pub trait ProfileRepository {
    fn create_profile(&self, profile: &StateProfile) -> RepoResult<ProfileId>;
    fn get_profile(&self, id: ProfileId) -> RepoResult<Option<StateProfile>>;
    fn list_profiles(&self) -> RepoResult<Vec<StateProfile>>;
    fn update_profile(&self, profile: &StateProfile) -> RepoResult<()>;
    /// Deletes the profile and, through FK cascade, every obligation and
    /// document reference it owns.
    fn delete_profile(&self, id: ProfileId) -> RepoResult<()>;
}

/// SQLite-backed jurisdiction profile repository.
pub struct SqliteProfileRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProfileRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[("state_profiles", &["uuid", "state_code", "display_name"])],
        )?;
        Ok(Self { conn })
    }
}

impl ProfileRepository for SqliteProfileRepository<'_> {
    fn create_profile(&self, profile: &StateProfile) -> RepoResult<ProfileId> {
        insert_profile_row(self.conn, profile)?;
        Ok(profile.uuid)
    }

    fn get_profile(&self, id: ProfileId) -> RepoResult<Option<StateProfile>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PROFILE_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_profile_row(row)?));
        }
        Ok(None)
    }

    fn list_profiles(&self) -> RepoResult<Vec<StateProfile>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROFILE_SELECT_SQL} ORDER BY state_code ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut profiles = Vec::new();
        while let Some(row) = rows.next()? {
            profiles.push(parse_profile_row(row)?);
        }
        Ok(profiles)
    }

    fn update_profile(&self, profile: &StateProfile) -> RepoResult<()> {
        profile.validate()?;

        let changed = self.conn.execute(
            "UPDATE state_profiles
             SET
                state_code = ?1,
                display_name = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?3;",
            params![
                profile.state_code.as_str(),
                profile.display_name.as_str(),
                profile.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::ProfileNotFound(profile.uuid));
        }

        Ok(())
    }

    fn delete_profile(&self, id: ProfileId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM state_profiles WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::ProfileNotFound(id));
        }

        Ok(())
    }
}

/// Inserts one profile row. Shared with the snapshot import path, which
/// runs inside its own transaction.
pub(crate) fn insert_profile_row(conn: &Connection, profile: &StateProfile) -> RepoResult<()> {
    profile.validate()?;
    conn.execute(
        "INSERT INTO state_profiles (uuid, state_code, display_name)
         VALUES (?1, ?2, ?3);",
        params![
            profile.uuid.to_string(),
            profile.state_code.as_str(),
            profile.display_name.as_str(),
        ],
    )?;
    Ok(())
}

fn parse_profile_row(row: &Row<'_>) -> RepoResult<StateProfile> {
    let uuid_text: String = row.get("uuid")?;
    let profile = StateProfile {
        uuid: parse_uuid(&uuid_text, "state_profiles.uuid")?,
        state_code: row.get("state_code")?,
        display_name: row.get("display_name")?,
    };
    profile.validate()?;
    Ok(profile)
}
