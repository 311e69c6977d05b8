//! Core domain logic for the UnShamed compliance tracker.
//! This crate is the single source of truth for business invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod recurrence;
pub mod repo;
pub mod service;
pub mod snapshot;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::obligation::{
    ComplianceObligation, DocumentRef, Frequency, ObligationId, ObligationValidationError,
    Priority, RecurrencePattern,
};
pub use model::profile::{ProfileId, ProfileValidationError, StateProfile};
pub use recurrence::series::{
    expand_series, next_due, DEFAULT_HORIZON_MONTHS, DEFAULT_OCCURRENCE_CAP, FALLBACK_FREQUENCY,
};
pub use repo::obligation_repo::{
    ObligationListQuery, ObligationRepository, SqliteObligationRepository,
};
pub use repo::profile_repo::{ProfileRepository, SqliteProfileRepository};
pub use repo::{RepoError, RepoResult};
pub use service::compliance_service::{
    AddOutcome, ComplianceService, ComplianceServiceError, NewObligation, ObligationPatch,
    UpdateOutcome,
};
pub use service::profile_service::{ProfileService, ProfileServiceError};
pub use snapshot::{
    export_snapshot, import_snapshot, read_snapshot_file, write_snapshot_file, ProfileSnapshot,
    Snapshot, SnapshotError, SNAPSHOT_FORMAT_VERSION,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
