//! Compliance obligation domain model.
//!
//! # Responsibility
//! - Define the obligation record shared by base tasks and their generated
//!   recurring occurrences.
//! - Define the recurrence pattern that drives series expansion.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another obligation.
//! - `is_recurring` is true exactly when `recurrence` is present.
//! - A generated occurrence (`parent_uuid` set) never carries its own
//!   recurrence pattern.

use crate::model::profile::ProfileId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one compliance obligation.
pub type ObligationId = Uuid;

/// Display/sort priority of an obligation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Calendar unit one recurrence step is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

/// Recurrence configuration carried by a base obligation.
///
/// `interval` multiplies the frequency unit: `interval = 2` with
/// `Frequency::Weekly` means every two weeks. At most one of the two end
/// conditions is usually set; when both are absent the engine falls back to
/// its named defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    /// Positive multiplier applied to `frequency`.
    pub interval: u32,
    /// Hard cutoff: no generated occurrence may be due after this instant.
    pub end_by: Option<DateTime<Utc>>,
    /// Cap on total family size, base included.
    pub end_after_occurrences: Option<u32>,
}

impl RecurrencePattern {
    /// Checks the numeric bounds a pattern must satisfy before it is
    /// persisted or expanded.
    pub fn validate(&self) -> Result<(), ObligationValidationError> {
        if self.interval == 0 {
            return Err(ObligationValidationError::ZeroInterval);
        }
        if self.end_after_occurrences == Some(0) {
            return Err(ObligationValidationError::ZeroOccurrenceCap);
        }
        Ok(())
    }
}

/// Reference to a document attached to an obligation.
///
/// Attachment bookkeeping only; recurrence never copies documents onto
/// generated occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub uuid: Uuid,
    pub file_name: String,
}

/// Validation failures for obligation records and recurrence patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObligationValidationError {
    /// `uuid` or `profile_uuid` is the nil UUID.
    NilUuid,
    /// Title is empty after trimming.
    BlankTitle,
    /// `is_recurring` is set but no pattern is present.
    MissingPattern,
    /// A pattern is present but `is_recurring` is not set.
    UnexpectedPattern,
    /// A generated occurrence carries its own recurrence pattern.
    PatternOnGeneratedInstance,
    /// `interval` must be at least 1.
    ZeroInterval,
    /// `end_after_occurrences` must be at least 1 when present.
    ZeroOccurrenceCap,
}

impl Display for ObligationValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "obligation uuid must not be nil"),
            Self::BlankTitle => write!(f, "obligation title must not be blank"),
            Self::MissingPattern => {
                write!(f, "recurring obligation requires a recurrence pattern")
            }
            Self::UnexpectedPattern => write!(
                f,
                "non-recurring obligation must not carry a recurrence pattern"
            ),
            Self::PatternOnGeneratedInstance => write!(
                f,
                "generated occurrence must not carry its own recurrence pattern"
            ),
            Self::ZeroInterval => write!(f, "recurrence interval must be at least 1"),
            Self::ZeroOccurrenceCap => {
                write!(f, "end_after_occurrences must be at least 1 when set")
            }
        }
    }
}

impl Error for ObligationValidationError {}

/// Canonical compliance obligation record.
///
/// One shape covers both the user-created base task and the occurrences the
/// recurrence engine derives from it; `parent_uuid` distinguishes the two.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceObligation {
    /// Stable global ID used for linking, cascade lookups and auditing.
    pub uuid: ObligationId,
    /// Owning jurisdiction profile. Relational reference, not ownership.
    pub profile_uuid: ProfileId,
    pub title: String,
    pub description: String,
    /// Absolute due instant; the anchor for recurrence arithmetic.
    pub due_at: DateTime<Utc>,
    pub completed: bool,
    pub priority: Priority,
    /// True exactly when `recurrence` is present.
    pub is_recurring: bool,
    pub recurrence: Option<RecurrencePattern>,
    /// Back-reference to the base obligation; `None` on the base itself.
    pub parent_uuid: Option<ObligationId>,
    /// Attached document references. Empty at creation.
    pub documents: Vec<DocumentRef>,
}

impl ComplianceObligation {
    /// Creates a non-recurring obligation with a generated stable ID and
    /// default lifecycle state.
    pub fn new(
        profile_uuid: ProfileId,
        title: impl Into<String>,
        due_at: DateTime<Utc>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            profile_uuid,
            title: title.into(),
            description: String::new(),
            due_at,
            completed: false,
            priority: Priority::default(),
            is_recurring: false,
            recurrence: None,
            parent_uuid: None,
            documents: Vec::new(),
        }
    }

    /// Creates an obligation with a caller-provided stable ID.
    ///
    /// Used by import paths where identity already exists externally.
    pub fn with_id(
        uuid: ObligationId,
        profile_uuid: ProfileId,
        title: impl Into<String>,
        due_at: DateTime<Utc>,
    ) -> Result<Self, ObligationValidationError> {
        let obligation = Self {
            uuid,
            ..Self::new(profile_uuid, title, due_at)
        };
        obligation.validate()?;
        Ok(obligation)
    }

    /// Returns true for the user-created base of a family (or any
    /// standalone non-recurring obligation).
    pub fn is_base(&self) -> bool {
        self.parent_uuid.is_none()
    }

    /// Checks structural invariants. Write paths must call this before any
    /// persistence mutation.
    pub fn validate(&self) -> Result<(), ObligationValidationError> {
        if self.uuid.is_nil() || self.profile_uuid.is_nil() {
            return Err(ObligationValidationError::NilUuid);
        }
        if self.title.trim().is_empty() {
            return Err(ObligationValidationError::BlankTitle);
        }
        match (&self.recurrence, self.is_recurring) {
            (Some(_), false) => return Err(ObligationValidationError::UnexpectedPattern),
            (None, true) => return Err(ObligationValidationError::MissingPattern),
            _ => {}
        }
        if let Some(pattern) = &self.recurrence {
            if self.parent_uuid.is_some() {
                return Err(ObligationValidationError::PatternOnGeneratedInstance);
            }
            pattern.validate()?;
        }
        Ok(())
    }
}
