//! Jurisdiction profile use-case service.
//!
//! # Responsibility
//! - Provide profile create/get/list/rename/delete entry points.
//! - Delegate persistence to repository implementations.
//!
//! # Invariants
//! - Deleting a profile removes every obligation it owns (FK cascade at
//!   the storage layer).

use crate::model::profile::{ProfileId, ProfileValidationError, StateProfile};
use crate::repo::profile_repo::ProfileRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from profile use-case operations.
#[derive(Debug)]
pub enum ProfileServiceError {
    /// Target profile does not exist.
    ProfileNotFound(ProfileId),
    /// Profile fields failed validation.
    InvalidProfile(ProfileValidationError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ProfileServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProfileNotFound(id) => write!(f, "profile not found: {id}"),
            Self::InvalidProfile(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProfileServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidProfile(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ProfileNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ProfileServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ProfileNotFound(id) => Self::ProfileNotFound(id),
            RepoError::ProfileValidation(err) => Self::InvalidProfile(err),
            other => Self::Repo(other),
        }
    }
}

/// Use-case service wrapper for jurisdiction profile operations.
pub struct ProfileService<R: ProfileRepository> {
    repo: R,
}

impl<R: ProfileRepository> ProfileService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates a jurisdiction profile and returns the stored record.
    pub fn create_profile(
        &self,
        state_code: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<StateProfile, ProfileServiceError> {
        let profile = StateProfile::new(state_code, display_name);
        self.repo.create_profile(&profile)?;
        info!(
            "event=profile_create module=service status=ok profile={} state={}",
            profile.uuid, profile.state_code
        );
        Ok(profile)
    }

    /// Gets one profile by stable ID.
    pub fn get_profile(&self, id: ProfileId) -> Result<Option<StateProfile>, ProfileServiceError> {
        Ok(self.repo.get_profile(id)?)
    }

    /// Lists all profiles in `state_code ASC, uuid ASC` order.
    pub fn list_profiles(&self) -> Result<Vec<StateProfile>, ProfileServiceError> {
        Ok(self.repo.list_profiles()?)
    }

    /// Renames one profile.
    pub fn rename_profile(
        &self,
        id: ProfileId,
        display_name: impl Into<String>,
    ) -> Result<StateProfile, ProfileServiceError> {
        let mut profile = self
            .repo
            .get_profile(id)?
            .ok_or(ProfileServiceError::ProfileNotFound(id))?;
        profile.display_name = display_name.into();
        self.repo.update_profile(&profile)?;
        Ok(profile)
    }

    /// Deletes one profile and, transitively, its whole obligation
    /// collection.
    pub fn delete_profile(&self, id: ProfileId) -> Result<(), ProfileServiceError> {
        self.repo.delete_profile(id)?;
        info!("event=profile_delete module=service status=ok profile={id}");
        Ok(())
    }
}
