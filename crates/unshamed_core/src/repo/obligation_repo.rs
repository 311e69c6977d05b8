//! Obligation repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD APIs over canonical `obligations` storage.
//! - Persist whole recurring families and regenerate them atomically.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `ComplianceObligation::validate()` before SQL
//!   mutations.
//! - Read paths must reject invalid persisted state instead of masking it,
//!   except for the documented monthly frequency fallback.
//! - Deleting a base obligation removes its children in the same statement
//!   via `ON DELETE CASCADE`.
//! - Listing is deterministic: `due_at ASC, uuid ASC`.

use crate::model::obligation::{
    ComplianceObligation, DocumentRef, Frequency, ObligationId, Priority, RecurrencePattern,
};
use crate::model::profile::ProfileId;
use crate::recurrence::series::FALLBACK_FREQUENCY;
use crate::repo::{
    bool_to_int, datetime_to_db, ensure_connection_ready, parse_bool, parse_datetime, parse_uuid,
    RepoError, RepoResult,
};
use chrono::{DateTime, Utc};
use log::warn;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const OBLIGATION_SELECT_SQL: &str = "SELECT
    uuid,
    profile_uuid,
    title,
    description,
    due_at,
    completed,
    priority,
    is_recurring,
    frequency,
    recur_interval,
    end_by,
    end_after,
    parent_uuid
FROM obligations";

const OBLIGATION_COLUMNS: &[&str] = &[
    "uuid",
    "profile_uuid",
    "title",
    "description",
    "due_at",
    "completed",
    "priority",
    "is_recurring",
    "frequency",
    "recur_interval",
    "end_by",
    "end_after",
    "parent_uuid",
];

/// Query options for listing obligations.
#[derive(Debug, Clone, Default)]
pub struct ObligationListQuery {
    /// Restrict to one jurisdiction profile.
    pub profile_uuid: Option<ProfileId>,
    /// Restrict to generated occurrences of one base obligation.
    pub parent_uuid: Option<ObligationId>,
    /// Restrict by completion state. `None` returns both.
    pub completed: Option<bool>,
    /// Inclusive lower due-date bound.
    pub due_after: Option<DateTime<Utc>>,
    /// Inclusive upper due-date bound.
    pub due_before: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Repository interface for obligation CRUD and family operations.
pub trait ObligationRepository {
    fn create_obligation(&self, obligation: &ComplianceObligation) -> RepoResult<ObligationId>;
    /// Persists a base obligation together with its generated occurrences
    /// in one transaction.
    fn create_family(
        &self,
        base: &ComplianceObligation,
        generated: &[ComplianceObligation],
    ) -> RepoResult<()>;
    fn get_obligation(&self, id: ObligationId) -> RepoResult<Option<ComplianceObligation>>;
    fn list_obligations(
        &self,
        query: &ObligationListQuery,
    ) -> RepoResult<Vec<ComplianceObligation>>;
    fn update_obligation(&self, obligation: &ComplianceObligation) -> RepoResult<()>;
    /// Deletes one obligation. When the target is a base, FK cascade
    /// removes its generated occurrences in the same statement.
    fn delete_obligation(&self, id: ObligationId) -> RepoResult<()>;
    /// Updates the base row, discards every existing child and inserts the
    /// fresh generated set, all in one transaction.
    fn regenerate_family(
        &self,
        base: &ComplianceObligation,
        generated: &[ComplianceObligation],
    ) -> RepoResult<()>;
    fn attach_document(
        &self,
        obligation_uuid: ObligationId,
        document: &DocumentRef,
    ) -> RepoResult<()>;
    fn remove_document(&self, document_uuid: Uuid) -> RepoResult<()>;
    /// Cross-table probe used by services to report a semantic
    /// `ProfileNotFound` instead of a raw FK violation.
    fn profile_exists(&self, profile_uuid: ProfileId) -> RepoResult<bool>;
}

/// SQLite-backed obligation repository.
pub struct SqliteObligationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObligationRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(
            conn,
            &[
                ("obligations", OBLIGATION_COLUMNS),
                (
                    "obligation_documents",
                    &["document_uuid", "obligation_uuid", "file_name"],
                ),
            ],
        )?;
        Ok(Self { conn })
    }
}

impl ObligationRepository for SqliteObligationRepository<'_> {
    fn create_obligation(&self, obligation: &ComplianceObligation) -> RepoResult<ObligationId> {
        insert_obligation_row(self.conn, obligation)?;
        Ok(obligation.uuid)
    }

    fn create_family(
        &self,
        base: &ComplianceObligation,
        generated: &[ComplianceObligation],
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_obligation_row(&tx, base)?;
        for occurrence in generated {
            insert_obligation_row(&tx, occurrence)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn get_obligation(&self, id: ObligationId) -> RepoResult<Option<ComplianceObligation>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{OBLIGATION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let mut obligation = parse_obligation_row(row)?;
            obligation.documents = load_documents(self.conn, obligation.uuid)?;
            return Ok(Some(obligation));
        }
        Ok(None)
    }

    fn list_obligations(
        &self,
        query: &ObligationListQuery,
    ) -> RepoResult<Vec<ComplianceObligation>> {
        let mut sql = format!("{OBLIGATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(profile_uuid) = query.profile_uuid {
            sql.push_str(" AND profile_uuid = ?");
            bind_values.push(Value::Text(profile_uuid.to_string()));
        }

        if let Some(parent_uuid) = query.parent_uuid {
            sql.push_str(" AND parent_uuid = ?");
            bind_values.push(Value::Text(parent_uuid.to_string()));
        }

        if let Some(completed) = query.completed {
            sql.push_str(" AND completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }

        if let Some(due_after) = query.due_after {
            sql.push_str(" AND due_at >= ?");
            bind_values.push(Value::Text(datetime_to_db(due_after)));
        }

        if let Some(due_before) = query.due_before {
            sql.push_str(" AND due_at <= ?");
            bind_values.push(Value::Text(datetime_to_db(due_before)));
        }

        sql.push_str(" ORDER BY due_at ASC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut obligations = Vec::new();

        while let Some(row) = rows.next()? {
            let mut obligation = parse_obligation_row(row)?;
            obligation.documents = load_documents(self.conn, obligation.uuid)?;
            obligations.push(obligation);
        }

        Ok(obligations)
    }

    fn update_obligation(&self, obligation: &ComplianceObligation) -> RepoResult<()> {
        update_obligation_row(self.conn, obligation)
    }

    fn delete_obligation(&self, id: ObligationId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM obligations WHERE uuid = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::ObligationNotFound(id));
        }

        Ok(())
    }

    fn regenerate_family(
        &self,
        base: &ComplianceObligation,
        generated: &[ComplianceObligation],
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        update_obligation_row(&tx, base)?;
        tx.execute(
            "DELETE FROM obligations WHERE parent_uuid = ?1;",
            [base.uuid.to_string()],
        )?;
        for occurrence in generated {
            insert_obligation_row(&tx, occurrence)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn attach_document(
        &self,
        obligation_uuid: ObligationId,
        document: &DocumentRef,
    ) -> RepoResult<()> {
        if !obligation_exists(self.conn, obligation_uuid)? {
            return Err(RepoError::ObligationNotFound(obligation_uuid));
        }
        insert_document_row(self.conn, obligation_uuid, document)
    }

    fn remove_document(&self, document_uuid: Uuid) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM obligation_documents WHERE document_uuid = ?1;",
            [document_uuid.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::DocumentNotFound(document_uuid));
        }

        Ok(())
    }

    fn profile_exists(&self, profile_uuid: ProfileId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM state_profiles
                WHERE uuid = ?1
            );",
            [profile_uuid.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

/// Inserts one obligation row. Shared with the snapshot import path, which
/// runs inside its own transaction.
pub(crate) fn insert_obligation_row(
    conn: &Connection,
    obligation: &ComplianceObligation,
) -> RepoResult<()> {
    obligation.validate()?;

    let pattern = obligation.recurrence.as_ref();
    conn.execute(
        "INSERT INTO obligations (
            uuid,
            profile_uuid,
            title,
            description,
            due_at,
            completed,
            priority,
            is_recurring,
            frequency,
            recur_interval,
            end_by,
            end_after,
            parent_uuid
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
        params![
            obligation.uuid.to_string(),
            obligation.profile_uuid.to_string(),
            obligation.title.as_str(),
            obligation.description.as_str(),
            datetime_to_db(obligation.due_at),
            bool_to_int(obligation.completed),
            priority_to_db(obligation.priority),
            bool_to_int(obligation.is_recurring),
            pattern.map(|p| frequency_to_db(p.frequency)),
            pattern.map(|p| i64::from(p.interval)),
            pattern.and_then(|p| p.end_by).map(datetime_to_db),
            pattern.and_then(|p| p.end_after_occurrences).map(i64::from),
            obligation.parent_uuid.map(|value| value.to_string()),
        ],
    )?;
    Ok(())
}

/// Inserts one document reference row. Shared with the snapshot import
/// path.
pub(crate) fn insert_document_row(
    conn: &Connection,
    obligation_uuid: ObligationId,
    document: &DocumentRef,
) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO obligation_documents (document_uuid, obligation_uuid, file_name)
         VALUES (?1, ?2, ?3);",
        params![
            document.uuid.to_string(),
            obligation_uuid.to_string(),
            document.file_name.as_str(),
        ],
    )?;
    Ok(())
}

fn update_obligation_row(conn: &Connection, obligation: &ComplianceObligation) -> RepoResult<()> {
    obligation.validate()?;

    let pattern = obligation.recurrence.as_ref();
    let changed = conn.execute(
        "UPDATE obligations
         SET
            profile_uuid = ?1,
            title = ?2,
            description = ?3,
            due_at = ?4,
            completed = ?5,
            priority = ?6,
            is_recurring = ?7,
            frequency = ?8,
            recur_interval = ?9,
            end_by = ?10,
            end_after = ?11,
            parent_uuid = ?12,
            updated_at = (strftime('%s', 'now') * 1000)
         WHERE uuid = ?13;",
        params![
            obligation.profile_uuid.to_string(),
            obligation.title.as_str(),
            obligation.description.as_str(),
            datetime_to_db(obligation.due_at),
            bool_to_int(obligation.completed),
            priority_to_db(obligation.priority),
            bool_to_int(obligation.is_recurring),
            pattern.map(|p| frequency_to_db(p.frequency)),
            pattern.map(|p| i64::from(p.interval)),
            pattern.and_then(|p| p.end_by).map(datetime_to_db),
            pattern.and_then(|p| p.end_after_occurrences).map(i64::from),
            obligation.parent_uuid.map(|value| value.to_string()),
            obligation.uuid.to_string(),
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::ObligationNotFound(obligation.uuid));
    }

    Ok(())
}

fn obligation_exists(conn: &Connection, id: ObligationId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM obligations
            WHERE uuid = ?1
        );",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_documents(conn: &Connection, obligation_uuid: ObligationId) -> RepoResult<Vec<DocumentRef>> {
    let mut stmt = conn.prepare(
        "SELECT document_uuid, file_name
         FROM obligation_documents
         WHERE obligation_uuid = ?1
         ORDER BY added_at ASC, document_uuid ASC;",
    )?;
    let mut rows = stmt.query([obligation_uuid.to_string()])?;
    let mut documents = Vec::new();
    while let Some(row) = rows.next()? {
        let uuid_text: String = row.get("document_uuid")?;
        documents.push(DocumentRef {
            uuid: parse_uuid(&uuid_text, "obligation_documents.document_uuid")?,
            file_name: row.get("file_name")?,
        });
    }
    Ok(documents)
}

fn parse_obligation_row(row: &Row<'_>) -> RepoResult<ComplianceObligation> {
    let uuid_text: String = row.get("uuid")?;
    let uuid = parse_uuid(&uuid_text, "obligations.uuid")?;

    let profile_uuid_text: String = row.get("profile_uuid")?;
    let profile_uuid = parse_uuid(&profile_uuid_text, "obligations.profile_uuid")?;

    let parent_uuid = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "obligations.parent_uuid"))
        .transpose()?;

    let due_at_text: String = row.get("due_at")?;
    let due_at = parse_datetime(&due_at_text, "obligations.due_at")?;

    let priority_text: String = row.get("priority")?;
    let priority = parse_priority(&priority_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid priority `{priority_text}` in obligations.priority"
        ))
    })?;

    let completed = parse_bool(row.get("completed")?, "obligations.completed")?;
    let is_recurring = parse_bool(row.get("is_recurring")?, "obligations.is_recurring")?;

    let recurrence = if is_recurring {
        Some(parse_pattern_columns(row, uuid)?)
    } else {
        None
    };

    let obligation = ComplianceObligation {
        uuid,
        profile_uuid,
        title: row.get("title")?,
        description: row.get("description")?,
        due_at,
        completed,
        priority,
        is_recurring,
        recurrence,
        parent_uuid,
        documents: Vec::new(),
    };
    obligation.validate()?;
    Ok(obligation)
}

fn parse_pattern_columns(row: &Row<'_>, uuid: ObligationId) -> RepoResult<RecurrencePattern> {
    let frequency_text: Option<String> = row.get("frequency")?;
    let frequency = match frequency_text.as_deref() {
        Some(value) => parse_frequency_lossy(value, uuid),
        None => {
            return Err(RepoError::InvalidData(format!(
                "recurring obligation {uuid} has no frequency in obligations.frequency"
            )));
        }
    };

    let interval_raw: Option<i64> = row.get("recur_interval")?;
    let interval = interval_raw
        .and_then(|value| u32::try_from(value).ok())
        .filter(|value| *value > 0)
        .ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid recurrence interval for obligation {uuid} in obligations.recur_interval"
            ))
        })?;

    let end_by = row
        .get::<_, Option<String>>("end_by")?
        .map(|value| parse_datetime(&value, "obligations.end_by"))
        .transpose()?;

    let end_after_raw: Option<i64> = row.get("end_after")?;
    let end_after_occurrences = end_after_raw
        .map(|value| {
            u32::try_from(value)
                .ok()
                .filter(|cap| *cap > 0)
                .ok_or_else(|| {
                    RepoError::InvalidData(format!(
                        "invalid occurrence cap for obligation {uuid} in obligations.end_after"
                    ))
                })
        })
        .transpose()?;

    Ok(RecurrencePattern {
        frequency,
        interval,
        end_by,
        end_after_occurrences,
    })
}

fn priority_to_db(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

fn parse_priority(value: &str) -> Option<Priority> {
    match value {
        "low" => Some(Priority::Low),
        "medium" => Some(Priority::Medium),
        "high" => Some(Priority::High),
        _ => None,
    }
}

fn frequency_to_db(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Daily => "daily",
        Frequency::Weekly => "weekly",
        Frequency::Monthly => "monthly",
        Frequency::Quarterly => "quarterly",
        Frequency::Yearly => "yearly",
    }
}

/// Parses a persisted frequency value, substituting the documented monthly
/// fallback for unrecognized text so obligations generated by earlier
/// versions keep loading.
fn parse_frequency_lossy(value: &str, uuid: ObligationId) -> Frequency {
    match value {
        "daily" => Frequency::Daily,
        "weekly" => Frequency::Weekly,
        "monthly" => Frequency::Monthly,
        "quarterly" => Frequency::Quarterly,
        "yearly" => Frequency::Yearly,
        other => {
            warn!(
                "event=frequency_fallback module=repo status=warn obligation={uuid} value={other} fallback={}",
                frequency_to_db(FALLBACK_FREQUENCY)
            );
            FALLBACK_FREQUENCY
        }
    }
}
