//! Compliance obligation use-case service.
//!
//! # Responsibility
//! - Provide add/update/remove lifecycle entry points for obligations,
//!   including recurring-family expansion, regeneration and cascade.
//! - Scope every operation to the owning jurisdiction profile.
//!
//! # Invariants
//! - Adding a recurring obligation persists the base and its generated
//!   occurrences atomically.
//! - Patching a base with a new pattern discards all existing children and
//!   regenerates the full set; no incremental reconciliation.
//! - Patching a generated occurrence never triggers regeneration, and a
//!   pattern in such a patch is rejected.
//! - Due-date-only edits to a base leave existing children unchanged.

use crate::model::obligation::{
    ComplianceObligation, DocumentRef, ObligationId, ObligationValidationError, Priority,
    RecurrencePattern,
};
use crate::model::profile::ProfileId;
use crate::recurrence::series::expand_series;
use crate::repo::obligation_repo::{ObligationListQuery, ObligationRepository};
use crate::repo::RepoError;
use chrono::{DateTime, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Request model for creating an obligation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewObligation {
    pub title: String,
    pub description: String,
    pub due_at: DateTime<Utc>,
    pub priority: Priority,
    /// Present for recurring obligations; triggers series expansion.
    pub recurrence: Option<RecurrencePattern>,
}

impl NewObligation {
    /// Creates a non-recurring request with default priority.
    pub fn new(title: impl Into<String>, due_at: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            due_at,
            priority: Priority::default(),
            recurrence: None,
        }
    }
}

/// Field-wise patch for one obligation. `None` leaves a field unchanged.
///
/// A present `recurrence` is only valid on a base obligation and replaces
/// the whole generated family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObligationPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub recurrence: Option<RecurrencePattern>,
}

/// Result of an add operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    /// The persisted base obligation.
    pub base: ComplianceObligation,
    /// Number of generated occurrences persisted alongside it.
    pub generated: usize,
}

/// Result of an update operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// The obligation after the patch was applied.
    pub obligation: ComplianceObligation,
    /// Size of the freshly generated set when the family was regenerated.
    pub regenerated: Option<usize>,
}

/// Errors from obligation use-case operations.
#[derive(Debug)]
pub enum ComplianceServiceError {
    /// Owning jurisdiction profile does not exist.
    ProfileNotFound(ProfileId),
    /// Target obligation does not exist in the given profile.
    ObligationNotFound(ObligationId),
    /// Target document reference does not exist.
    DocumentNotFound(Uuid),
    /// Obligation or pattern fields failed validation.
    InvalidObligation(ObligationValidationError),
    /// The patch carries a pattern but the target is a generated
    /// occurrence.
    PatternOnGeneratedInstance(ObligationId),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ComplianceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProfileNotFound(id) => write!(f, "profile not found: {id}"),
            Self::ObligationNotFound(id) => write!(f, "obligation not found: {id}"),
            Self::DocumentNotFound(id) => write!(f, "document not found: {id}"),
            Self::InvalidObligation(err) => write!(f, "{err}"),
            Self::PatternOnGeneratedInstance(id) => write!(
                f,
                "cannot set a recurrence pattern on generated occurrence {id}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ComplianceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidObligation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ComplianceServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ProfileNotFound(id) => Self::ProfileNotFound(id),
            RepoError::ObligationNotFound(id) => Self::ObligationNotFound(id),
            RepoError::DocumentNotFound(id) => Self::DocumentNotFound(id),
            RepoError::ObligationValidation(err) => Self::InvalidObligation(err),
            other => Self::Repo(other),
        }
    }
}

impl From<ObligationValidationError> for ComplianceServiceError {
    fn from(value: ObligationValidationError) -> Self {
        Self::InvalidObligation(value)
    }
}

/// Use-case service wrapper for obligation lifecycle operations.
pub struct ComplianceService<R: ObligationRepository> {
    repo: R,
}

impl<R: ObligationRepository> ComplianceService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Adds one obligation to a jurisdiction profile.
    ///
    /// # Contract
    /// - Assigns a fresh stable ID to the base.
    /// - When the request carries a pattern, expands the series and
    ///   persists base plus occurrences in one transaction.
    /// - Returns the stored base and the generated count.
    pub fn add_obligation(
        &self,
        profile_uuid: ProfileId,
        request: &NewObligation,
    ) -> Result<AddOutcome, ComplianceServiceError> {
        if !self.repo.profile_exists(profile_uuid)? {
            return Err(ComplianceServiceError::ProfileNotFound(profile_uuid));
        }

        let base = ComplianceObligation {
            uuid: Uuid::new_v4(),
            profile_uuid,
            title: request.title.clone(),
            description: request.description.clone(),
            due_at: request.due_at,
            completed: false,
            priority: request.priority,
            is_recurring: request.recurrence.is_some(),
            recurrence: request.recurrence,
            parent_uuid: None,
            documents: Vec::new(),
        };
        base.validate()?;

        let generated = match &base.recurrence {
            Some(pattern) => {
                let series = expand_series(&base, pattern)?;
                self.repo.create_family(&base, &series)?;
                series.len()
            }
            None => {
                self.repo.create_obligation(&base)?;
                0
            }
        };

        info!(
            "event=obligation_add module=service status=ok profile={profile_uuid} obligation={} generated={generated}",
            base.uuid
        );
        Ok(AddOutcome { base, generated })
    }

    /// Applies a field patch to one obligation.
    ///
    /// # Contract
    /// - A pattern in the patch regenerates the base's whole family from
    ///   scratch in one transaction.
    /// - Any other patch (due date included) updates only the target row.
    pub fn update_obligation(
        &self,
        profile_uuid: ProfileId,
        obligation_uuid: ObligationId,
        patch: &ObligationPatch,
    ) -> Result<UpdateOutcome, ComplianceServiceError> {
        let existing = self.get_scoped(profile_uuid, obligation_uuid)?;

        if patch.recurrence.is_some() && !existing.is_base() {
            return Err(ComplianceServiceError::PatternOnGeneratedInstance(
                obligation_uuid,
            ));
        }

        let mut updated = existing;
        if let Some(title) = &patch.title {
            updated.title = title.clone();
        }
        if let Some(description) = &patch.description {
            updated.description = description.clone();
        }
        if let Some(due_at) = patch.due_at {
            updated.due_at = due_at;
        }
        if let Some(completed) = patch.completed {
            updated.completed = completed;
        }
        if let Some(priority) = patch.priority {
            updated.priority = priority;
        }

        let regenerated = match patch.recurrence {
            Some(pattern) => {
                updated.is_recurring = true;
                updated.recurrence = Some(pattern);
                updated.validate()?;

                let series = expand_series(&updated, &pattern)?;
                self.repo.regenerate_family(&updated, &series)?;
                info!(
                    "event=obligation_regenerate module=service status=ok profile={profile_uuid} obligation={obligation_uuid} generated={}",
                    series.len()
                );
                Some(series.len())
            }
            None => {
                updated.validate()?;
                self.repo.update_obligation(&updated)?;
                None
            }
        };

        Ok(UpdateOutcome {
            obligation: updated,
            regenerated,
        })
    }

    /// Removes one obligation.
    ///
    /// Removing a base removes its whole generated family atomically;
    /// removing a generated occurrence removes only that occurrence.
    pub fn remove_obligation(
        &self,
        profile_uuid: ProfileId,
        obligation_uuid: ObligationId,
    ) -> Result<(), ComplianceServiceError> {
        let existing = self.get_scoped(profile_uuid, obligation_uuid)?;
        self.repo.delete_obligation(existing.uuid)?;
        info!(
            "event=obligation_remove module=service status=ok profile={profile_uuid} obligation={obligation_uuid} cascade={}",
            existing.is_base() && existing.is_recurring
        );
        Ok(())
    }

    /// Toggles completion on one obligation without touching its family.
    pub fn set_completed(
        &self,
        profile_uuid: ProfileId,
        obligation_uuid: ObligationId,
        completed: bool,
    ) -> Result<ComplianceObligation, ComplianceServiceError> {
        let mut obligation = self.get_scoped(profile_uuid, obligation_uuid)?;
        obligation.completed = completed;
        self.repo.update_obligation(&obligation)?;
        Ok(obligation)
    }

    /// Attaches a document reference to one obligation.
    pub fn attach_document(
        &self,
        profile_uuid: ProfileId,
        obligation_uuid: ObligationId,
        file_name: impl Into<String>,
    ) -> Result<DocumentRef, ComplianceServiceError> {
        self.get_scoped(profile_uuid, obligation_uuid)?;
        let document = DocumentRef {
            uuid: Uuid::new_v4(),
            file_name: file_name.into(),
        };
        self.repo.attach_document(obligation_uuid, &document)?;
        Ok(document)
    }

    /// Removes a document reference by its stable ID.
    pub fn remove_document(&self, document_uuid: Uuid) -> Result<(), ComplianceServiceError> {
        self.repo.remove_document(document_uuid)?;
        Ok(())
    }

    /// Gets one obligation scoped to its owning profile.
    pub fn get_obligation(
        &self,
        profile_uuid: ProfileId,
        obligation_uuid: ObligationId,
    ) -> Result<Option<ComplianceObligation>, ComplianceServiceError> {
        match self.repo.get_obligation(obligation_uuid)? {
            Some(obligation) if obligation.profile_uuid == profile_uuid => Ok(Some(obligation)),
            _ => Ok(None),
        }
    }

    /// Lists obligations using filter and pagination options.
    pub fn list_obligations(
        &self,
        query: &ObligationListQuery,
    ) -> Result<Vec<ComplianceObligation>, ComplianceServiceError> {
        Ok(self.repo.list_obligations(query)?)
    }

    fn get_scoped(
        &self,
        profile_uuid: ProfileId,
        obligation_uuid: ObligationId,
    ) -> Result<ComplianceObligation, ComplianceServiceError> {
        self.get_obligation(profile_uuid, obligation_uuid)?
            .ok_or(ComplianceServiceError::ObligationNotFound(obligation_uuid))
    }
}
