//! Domain model for multi-state compliance tracking.
//!
//! # Responsibility
//! - Define the canonical obligation and jurisdiction-profile records used
//!   by core business logic.
//! - Keep recurrence configuration attached to the obligation it governs.
//!
//! # Invariants
//! - Every domain object is identified by a stable v4 UUID.
//! - Exactly one obligation per recurring family has no parent reference.

pub mod obligation;
pub mod profile;
