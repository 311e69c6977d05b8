//! Jurisdiction profile domain model.
//!
//! # Responsibility
//! - Define the per-state record that owns an obligation collection.
//!
//! # Invariants
//! - `state_code` is two ASCII letters, stored uppercase.
//! - Deleting a profile deletes every obligation it owns.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for one jurisdiction profile.
pub type ProfileId = Uuid;

/// Validation failures for jurisdiction profile records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileValidationError {
    /// `uuid` is the nil UUID.
    NilUuid,
    /// Display name is empty after trimming.
    BlankDisplayName,
    /// `state_code` is not two ASCII letters.
    InvalidStateCode(String),
}

impl Display for ProfileValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilUuid => write!(f, "profile uuid must not be nil"),
            Self::BlankDisplayName => write!(f, "profile display name must not be blank"),
            Self::InvalidStateCode(value) => {
                write!(f, "invalid state code `{value}`; expected two ASCII letters")
            }
        }
    }
}

impl Error for ProfileValidationError {}

/// Per-state (licensing board) record owning a compliance collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateProfile {
    /// Stable global profile ID.
    pub uuid: ProfileId,
    /// Two-letter postal code of the jurisdiction, uppercase.
    pub state_code: String,
    /// User-facing profile label.
    pub display_name: String,
}

impl StateProfile {
    /// Creates a profile with a generated stable ID. The state code is
    /// normalized to uppercase.
    pub fn new(state_code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            state_code: state_code.into().trim().to_ascii_uppercase(),
            display_name: display_name.into(),
        }
    }

    /// Creates a profile with a caller-provided stable ID.
    pub fn with_id(
        uuid: ProfileId,
        state_code: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Result<Self, ProfileValidationError> {
        let profile = Self {
            uuid,
            ..Self::new(state_code, display_name)
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Checks structural invariants. Write paths must call this before any
    /// persistence mutation.
    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if self.uuid.is_nil() {
            return Err(ProfileValidationError::NilUuid);
        }
        if self.display_name.trim().is_empty() {
            return Err(ProfileValidationError::BlankDisplayName);
        }
        let code = self.state_code.as_str();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ProfileValidationError::InvalidStateCode(
                self.state_code.clone(),
            ));
        }
        Ok(())
    }
}
