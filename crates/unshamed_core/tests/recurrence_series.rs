use chrono::{DateTime, TimeZone, Utc};
use unshamed_core::{
    expand_series, ComplianceObligation, Frequency, ObligationValidationError, RecurrencePattern,
    DEFAULT_OCCURRENCE_CAP,
};
use uuid::Uuid;

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

fn base_obligation(due_at: DateTime<Utc>, pattern: RecurrencePattern) -> ComplianceObligation {
    let mut base = ComplianceObligation::new(Uuid::new_v4(), "renewal filing", due_at);
    base.is_recurring = true;
    base.recurrence = Some(pattern);
    base
}

#[test]
fn monthly_cap_three_generates_two_occurrences() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Monthly,
        interval: 1,
        end_by: None,
        end_after_occurrences: Some(3),
    };
    let base = base_obligation(day(2024, 1, 1), pattern);

    let series = expand_series(&base, &pattern).unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].due_at, day(2024, 2, 1));
    assert_eq!(series[1].due_at, day(2024, 3, 1));
    for occurrence in &series {
        assert_eq!(occurrence.parent_uuid, Some(base.uuid));
        assert!(!occurrence.completed);
    }
}

#[test]
fn quarterly_end_by_discards_overshooting_occurrence() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Quarterly,
        interval: 1,
        end_by: Some(day(2024, 10, 1)),
        end_after_occurrences: None,
    };
    let base = base_obligation(day(2024, 1, 15), pattern);

    let series = expand_series(&base, &pattern).unwrap();

    let due_dates: Vec<_> = series.iter().map(|item| item.due_at).collect();
    assert_eq!(due_dates, vec![day(2024, 4, 15), day(2024, 7, 15)]);
}

#[test]
fn generated_dates_are_strictly_increasing() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Daily,
        interval: 3,
        end_by: None,
        end_after_occurrences: Some(8),
    };
    let base = base_obligation(day(2024, 6, 1), pattern);

    let series = expand_series(&base, &pattern).unwrap();

    assert_eq!(series.len(), 7);
    let mut previous = base.due_at;
    for occurrence in &series {
        assert!(occurrence.due_at > previous);
        previous = occurrence.due_at;
    }
}

#[test]
fn default_cap_applies_when_no_end_condition_is_set() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Weekly,
        interval: 1,
        end_by: None,
        end_after_occurrences: None,
    };
    let base = base_obligation(day(2024, 1, 1), pattern);

    let series = expand_series(&base, &pattern).unwrap();

    // Family size is base + generated, capped by the default.
    assert_eq!(series.len() as u32, DEFAULT_OCCURRENCE_CAP - 1);
}

#[test]
fn implicit_horizon_bounds_sparse_frequencies() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Monthly,
        interval: 6,
        end_by: None,
        end_after_occurrences: None,
    };
    let base = base_obligation(day(2024, 1, 1), pattern);

    let series = expand_series(&base, &pattern).unwrap();

    // Two-year horizon admits +6, +12, +18 and +24 months, nothing beyond.
    let due_dates: Vec<_> = series.iter().map(|item| item.due_at).collect();
    assert_eq!(
        due_dates,
        vec![
            day(2024, 7, 1),
            day(2025, 1, 1),
            day(2025, 7, 1),
            day(2026, 1, 1),
        ]
    );
}

#[test]
fn month_end_days_clamp_and_stay_clamped() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Monthly,
        interval: 1,
        end_by: None,
        end_after_occurrences: Some(3),
    };
    let base = base_obligation(day(2024, 1, 31), pattern);

    let series = expand_series(&base, &pattern).unwrap();

    // Each step advances from the previous occurrence's date, so the
    // leap-February clamp carries forward.
    let due_dates: Vec<_> = series.iter().map(|item| item.due_at).collect();
    assert_eq!(due_dates, vec![day(2024, 2, 29), day(2024, 3, 29)]);
}

#[test]
fn yearly_interval_two_spaces_by_two_years() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Yearly,
        interval: 2,
        end_by: Some(day(2030, 1, 1)),
        end_after_occurrences: None,
    };
    let base = base_obligation(day(2024, 3, 10), pattern);

    let series = expand_series(&base, &pattern).unwrap();

    let due_dates: Vec<_> = series.iter().map(|item| item.due_at).collect();
    assert_eq!(
        due_dates,
        vec![day(2026, 3, 10), day(2028, 3, 10)],
        "2030-03-10 exceeds the end-by cutoff"
    );
}

#[test]
fn occurrences_reset_completion_and_carry_no_pattern() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Weekly,
        interval: 2,
        end_by: None,
        end_after_occurrences: Some(4),
    };
    let mut base = base_obligation(day(2024, 5, 1), pattern);
    base.completed = true;
    base.description = "submit CE hours".to_string();

    let series = expand_series(&base, &pattern).unwrap();

    assert_eq!(series.len(), 3);
    for occurrence in &series {
        assert!(!occurrence.completed);
        assert!(!occurrence.is_recurring);
        assert!(occurrence.recurrence.is_none());
        assert!(occurrence.documents.is_empty());
        assert_eq!(occurrence.title, base.title);
        assert_eq!(occurrence.description, base.description);
        assert_eq!(occurrence.priority, base.priority);
        assert_ne!(occurrence.uuid, base.uuid);
    }
}

#[test]
fn cap_of_one_generates_nothing() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Daily,
        interval: 1,
        end_by: None,
        end_after_occurrences: Some(1),
    };
    let base = base_obligation(day(2024, 1, 1), pattern);

    let series = expand_series(&base, &pattern).unwrap();
    assert!(series.is_empty());
}

#[test]
fn zero_interval_is_rejected() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Monthly,
        interval: 0,
        end_by: None,
        end_after_occurrences: None,
    };
    let base = base_obligation(day(2024, 1, 1), pattern);

    let err = expand_series(&base, &pattern).unwrap_err();
    assert_eq!(err, ObligationValidationError::ZeroInterval);
}

#[test]
fn zero_occurrence_cap_is_rejected() {
    let pattern = RecurrencePattern {
        frequency: Frequency::Weekly,
        interval: 1,
        end_by: None,
        end_after_occurrences: Some(0),
    };
    let base = base_obligation(day(2024, 1, 1), pattern);

    let err = expand_series(&base, &pattern).unwrap_err();
    assert_eq!(err, ObligationValidationError::ZeroOccurrenceCap);
}
