//! Recurrence engine entry points.
//!
//! # Responsibility
//! - Expand one base obligation into its bounded series of generated
//!   occurrences.
//! - Keep all termination defaults as named constants.

pub mod series;
