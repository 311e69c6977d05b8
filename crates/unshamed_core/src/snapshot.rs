//! Whole-state JSON snapshot adapter.
//!
//! # Responsibility
//! - Serialize every jurisdiction profile with its full obligation
//!   collection into one versioned JSON document.
//! - Restore a snapshot by full replacement in one transaction.
//!
//! # Invariants
//! - Import is all-or-nothing: a failing row leaves the database untouched.
//! - Base obligations are inserted before their generated occurrences so
//!   the parent foreign key always resolves.
//! - Snapshots with a newer format version are rejected, not migrated.

use crate::model::obligation::ComplianceObligation;
use crate::model::profile::StateProfile;
use crate::repo::obligation_repo::{
    insert_document_row, insert_obligation_row, ObligationListQuery, ObligationRepository,
    SqliteObligationRepository,
};
use crate::repo::profile_repo::{
    insert_profile_row, ProfileRepository, SqliteProfileRepository,
};
use crate::repo::RepoError;
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Format version written into every exported snapshot.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One jurisdiction profile with its full obligation collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub profile: StateProfile,
    pub obligations: Vec<ComplianceObligation>,
}

/// Complete application state as one serializable document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub profiles: Vec<ProfileSnapshot>,
}

/// Errors from snapshot export/import operations.
#[derive(Debug)]
pub enum SnapshotError {
    /// Snapshot was written by a newer format than this binary supports.
    UnsupportedFormatVersion {
        snapshot_version: u32,
        latest_supported: u32,
    },
    /// Persistence-layer failure.
    Repo(RepoError),
    /// JSON encoding/decoding failure.
    Json(serde_json::Error),
    /// Snapshot file I/O failure.
    Io(std::io::Error),
}

impl Display for SnapshotError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormatVersion {
                snapshot_version,
                latest_supported,
            } => write!(
                f,
                "snapshot format version {snapshot_version} is newer than supported {latest_supported}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SnapshotError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnsupportedFormatVersion { .. } => None,
            Self::Repo(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<RepoError> for SnapshotError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for SnapshotError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// Exports the whole application state from a migrated connection.
pub fn export_snapshot(conn: &Connection) -> Result<Snapshot, SnapshotError> {
    let profile_repo = SqliteProfileRepository::try_new(conn)?;
    let obligation_repo = SqliteObligationRepository::try_new(conn)?;

    let mut profiles = Vec::new();
    for profile in profile_repo.list_profiles()? {
        let obligations = obligation_repo.list_obligations(&ObligationListQuery {
            profile_uuid: Some(profile.uuid),
            ..ObligationListQuery::default()
        })?;
        profiles.push(ProfileSnapshot {
            profile,
            obligations,
        });
    }

    Ok(Snapshot {
        format_version: SNAPSHOT_FORMAT_VERSION,
        exported_at: Utc::now(),
        profiles,
    })
}

/// Replaces the whole application state with the snapshot contents.
///
/// # Side effects
/// - Deletes every profile (and, via FK cascade, every obligation and
///   document reference) before inserting the snapshot rows.
/// - Emits a `snapshot_import` logging event on success.
pub fn import_snapshot(conn: &Connection, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
        return Err(SnapshotError::UnsupportedFormatVersion {
            snapshot_version: snapshot.format_version,
            latest_supported: SNAPSHOT_FORMAT_VERSION,
        });
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM state_profiles;", [])?;

    let mut obligation_count = 0usize;
    for entry in &snapshot.profiles {
        insert_profile_row(&tx, &entry.profile)?;

        // Parent FK requires bases before their generated occurrences.
        for obligation in entry.obligations.iter().filter(|item| item.is_base()) {
            insert_obligation_row(&tx, obligation)?;
        }
        for obligation in entry.obligations.iter().filter(|item| !item.is_base()) {
            insert_obligation_row(&tx, obligation)?;
        }

        for obligation in &entry.obligations {
            for document in &obligation.documents {
                insert_document_row(&tx, obligation.uuid, document)?;
            }
            obligation_count += 1;
        }
    }
    tx.commit()?;

    info!(
        "event=snapshot_import module=snapshot status=ok profiles={} obligations={obligation_count}",
        snapshot.profiles.len()
    );
    Ok(())
}

/// Writes one snapshot as pretty-printed JSON.
pub fn write_snapshot_file(path: impl AsRef<Path>, snapshot: &Snapshot) -> Result<(), SnapshotError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), snapshot)?;
    Ok(())
}

/// Reads one snapshot from a JSON file.
pub fn read_snapshot_file(path: impl AsRef<Path>) -> Result<Snapshot, SnapshotError> {
    let file = File::open(path)?;
    let snapshot = serde_json::from_reader(BufReader::new(file))?;
    Ok(snapshot)
}
