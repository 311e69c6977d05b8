//! Series expansion for recurring compliance obligations.
//!
//! # Responsibility
//! - Compute the full set of generated occurrences for one base obligation
//!   and one recurrence pattern.
//! - Enforce the occurrence cap, the end-by cutoff, and the implicit
//!   horizon.
//!
//! # Invariants
//! - The base itself is occurrence index 0 and is never re-emitted.
//! - Generated due dates are strictly increasing.
//! - Generated occurrences start incomplete, carry no pattern of their own,
//!   and reference the base via `parent_uuid`.

use crate::model::obligation::{
    ComplianceObligation, Frequency, ObligationValidationError, RecurrencePattern,
};
use chrono::{DateTime, Days, Months, Utc};
use uuid::Uuid;

/// Cap on total family size (base included) when the pattern sets no
/// explicit `end_after_occurrences`.
pub const DEFAULT_OCCURRENCE_CAP: u32 = 12;

/// Implicit safety bound, measured from the base due date, applied when the
/// pattern sets no explicit `end_by` cutoff.
pub const DEFAULT_HORIZON_MONTHS: u32 = 24;

/// Frequency substituted when a persisted frequency value is unrecognized.
///
/// Compatibility behavior inherited from earlier generated data, applied at
/// the storage boundary and logged as `event=frequency_fallback`; not an
/// endorsed way to request monthly recurrence.
pub const FALLBACK_FREQUENCY: Frequency = Frequency::Monthly;

/// Expands `base` into its generated occurrences under `pattern`.
///
/// Pure computation: nothing is persisted and `base` is not mutated. The
/// caller merges the result into the owning collection.
///
/// # Contract
/// - Each occurrence copies title/description/priority from the base, gets
///   a fresh v4 UUID, `completed = false`, an empty document list, and
///   `parent_uuid = base.uuid`.
/// - Generation stops once the family would exceed the occurrence cap
///   (`end_after_occurrences`, default [`DEFAULT_OCCURRENCE_CAP`]) or once
///   the next due date would pass `end_by` (default: base due date plus
///   [`DEFAULT_HORIZON_MONTHS`]); an overshooting occurrence is discarded,
///   not clamped.
/// - Calendar arithmetic overflow ends generation early.
///
/// # Errors
/// - Returns the pattern's validation error when its numeric bounds are
///   violated.
pub fn expand_series(
    base: &ComplianceObligation,
    pattern: &RecurrencePattern,
) -> Result<Vec<ComplianceObligation>, ObligationValidationError> {
    pattern.validate()?;

    let cap = pattern
        .end_after_occurrences
        .unwrap_or(DEFAULT_OCCURRENCE_CAP);
    let horizon = match pattern.end_by {
        Some(end_by) => end_by,
        None => match base
            .due_at
            .checked_add_months(Months::new(DEFAULT_HORIZON_MONTHS))
        {
            Some(bound) => bound,
            // Base due date is already at the edge of representable time.
            None => return Ok(Vec::new()),
        },
    };

    let mut series = Vec::new();
    let mut due_at = base.due_at;
    for _ in 1..cap {
        due_at = match next_due(due_at, pattern.frequency, pattern.interval) {
            Some(next) => next,
            None => break,
        };
        if due_at > horizon {
            break;
        }
        series.push(occurrence_of(base, due_at));
    }

    Ok(series)
}

/// Advances one due date by a single recurrence step.
///
/// Month-based frequencies use calendar-aware addition: the day of month is
/// preserved where valid and clamps to the month end otherwise. Returns
/// `None` on calendar overflow.
pub fn next_due(
    due_at: DateTime<Utc>,
    frequency: Frequency,
    interval: u32,
) -> Option<DateTime<Utc>> {
    match frequency {
        Frequency::Daily => due_at.checked_add_days(Days::new(u64::from(interval))),
        Frequency::Weekly => {
            due_at.checked_add_days(Days::new(u64::from(interval).checked_mul(7)?))
        }
        Frequency::Monthly => due_at.checked_add_months(Months::new(interval)),
        Frequency::Quarterly => {
            due_at.checked_add_months(Months::new(interval.checked_mul(3)?))
        }
        Frequency::Yearly => {
            due_at.checked_add_months(Months::new(interval.checked_mul(12)?))
        }
    }
}

fn occurrence_of(base: &ComplianceObligation, due_at: DateTime<Utc>) -> ComplianceObligation {
    ComplianceObligation {
        uuid: Uuid::new_v4(),
        profile_uuid: base.profile_uuid,
        title: base.title.clone(),
        description: base.description.clone(),
        due_at,
        completed: false,
        priority: base.priority,
        is_recurring: false,
        recurrence: None,
        parent_uuid: Some(base.uuid),
        documents: Vec::new(),
    }
}
