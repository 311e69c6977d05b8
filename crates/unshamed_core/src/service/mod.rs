//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and series expansion into use-case level
//!   APIs.
//! - Keep UI layers decoupled from storage details.

pub mod compliance_service;
pub mod profile_service;
