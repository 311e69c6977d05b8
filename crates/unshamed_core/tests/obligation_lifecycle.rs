use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use unshamed_core::db::open_db_in_memory;
use unshamed_core::{
    ComplianceService, ComplianceServiceError, Frequency, NewObligation, ObligationListQuery,
    ObligationPatch, ObligationRepository, ProfileRepository, RecurrencePattern,
    SqliteObligationRepository, SqliteProfileRepository, StateProfile,
};
use uuid::Uuid;

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

fn seeded_profile(conn: &Connection) -> StateProfile {
    let repo = SqliteProfileRepository::try_new(conn).unwrap();
    let profile = StateProfile::new("CA", "California BRN");
    repo.create_profile(&profile).unwrap();
    profile
}

fn service(conn: &Connection) -> ComplianceService<SqliteObligationRepository<'_>> {
    ComplianceService::new(SqliteObligationRepository::try_new(conn).unwrap())
}

fn children_of(
    conn: &Connection,
    base_uuid: Uuid,
) -> Vec<unshamed_core::ComplianceObligation> {
    let repo = SqliteObligationRepository::try_new(conn).unwrap();
    repo.list_obligations(&ObligationListQuery {
        parent_uuid: Some(base_uuid),
        ..ObligationListQuery::default()
    })
    .unwrap()
}

#[test]
fn adding_recurring_obligation_persists_the_whole_family() {
    let conn = open_db_in_memory().unwrap();
    let profile = seeded_profile(&conn);
    let service = service(&conn);

    let mut request = NewObligation::new("monthly probation report", day(2024, 1, 1));
    request.recurrence = Some(RecurrencePattern {
        frequency: Frequency::Monthly,
        interval: 1,
        end_by: None,
        end_after_occurrences: Some(3),
    });

    let outcome = service.add_obligation(profile.uuid, &request).unwrap();
    assert_eq!(outcome.generated, 2);
    assert!(outcome.base.is_recurring);

    let children = children_of(&conn, outcome.base.uuid);
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].due_at, day(2024, 2, 1));
    assert_eq!(children[1].due_at, day(2024, 3, 1));
    for child in &children {
        assert!(child.recurrence.is_none());
        assert!(!child.completed);
    }
}

#[test]
fn add_rejects_unknown_profile() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let missing = Uuid::new_v4();
    let request = NewObligation::new("orphan", day(2024, 1, 1));
    let err = service.add_obligation(missing, &request).unwrap_err();
    assert!(matches!(err, ComplianceServiceError::ProfileNotFound(id) if id == missing));
}

#[test]
fn removing_base_cascades_removing_child_does_not() {
    let conn = open_db_in_memory().unwrap();
    let profile = seeded_profile(&conn);
    let service = service(&conn);

    let mut request = NewObligation::new("weekly drug screen", day(2024, 1, 1));
    request.recurrence = Some(RecurrencePattern {
        frequency: Frequency::Weekly,
        interval: 1,
        end_by: None,
        end_after_occurrences: Some(4),
    });
    let outcome = service.add_obligation(profile.uuid, &request).unwrap();
    let children = children_of(&conn, outcome.base.uuid);
    assert_eq!(children.len(), 3);

    // Removing one occurrence leaves the base and its siblings alone.
    service
        .remove_obligation(profile.uuid, children[0].uuid)
        .unwrap();
    assert!(service
        .get_obligation(profile.uuid, outcome.base.uuid)
        .unwrap()
        .is_some());
    assert_eq!(children_of(&conn, outcome.base.uuid).len(), 2);

    // Removing the base takes the remaining occurrences with it.
    service
        .remove_obligation(profile.uuid, outcome.base.uuid)
        .unwrap();
    assert!(children_of(&conn, outcome.base.uuid).is_empty());
    assert!(service
        .get_obligation(profile.uuid, children[1].uuid)
        .unwrap()
        .is_none());
}

#[test]
fn patching_pattern_regenerates_family_from_scratch() {
    let conn = open_db_in_memory().unwrap();
    let profile = seeded_profile(&conn);
    let service = service(&conn);

    let mut request = NewObligation::new("supervision meeting", day(2024, 1, 1));
    request.recurrence = Some(RecurrencePattern {
        frequency: Frequency::Weekly,
        interval: 1,
        end_by: None,
        end_after_occurrences: Some(4),
    });
    let outcome = service.add_obligation(profile.uuid, &request).unwrap();
    assert_eq!(outcome.generated, 3);
    let old_children = children_of(&conn, outcome.base.uuid);

    let patch = ObligationPatch {
        recurrence: Some(RecurrencePattern {
            frequency: Frequency::Monthly,
            interval: 1,
            end_by: None,
            end_after_occurrences: Some(3),
        }),
        ..ObligationPatch::default()
    };
    let updated = service
        .update_obligation(profile.uuid, outcome.base.uuid, &patch)
        .unwrap();
    assert_eq!(updated.regenerated, Some(2));

    let new_children = children_of(&conn, outcome.base.uuid);
    assert_eq!(new_children.len(), 2);
    assert_eq!(new_children[0].due_at, day(2024, 2, 1));
    assert_eq!(new_children[1].due_at, day(2024, 3, 1));

    // None of the weekly occurrences survived the regeneration.
    for old in &old_children {
        assert!(service
            .get_obligation(profile.uuid, old.uuid)
            .unwrap()
            .is_none());
    }
}

#[test]
fn patching_pattern_on_generated_occurrence_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let profile = seeded_profile(&conn);
    let service = service(&conn);

    let mut request = NewObligation::new("quarterly audit", day(2024, 1, 1));
    request.recurrence = Some(RecurrencePattern {
        frequency: Frequency::Quarterly,
        interval: 1,
        end_by: None,
        end_after_occurrences: Some(3),
    });
    let outcome = service.add_obligation(profile.uuid, &request).unwrap();
    let child = &children_of(&conn, outcome.base.uuid)[0];

    let patch = ObligationPatch {
        recurrence: Some(RecurrencePattern {
            frequency: Frequency::Monthly,
            interval: 1,
            end_by: None,
            end_after_occurrences: Some(2),
        }),
        ..ObligationPatch::default()
    };
    let err = service
        .update_obligation(profile.uuid, child.uuid, &patch)
        .unwrap_err();
    assert!(
        matches!(err, ComplianceServiceError::PatternOnGeneratedInstance(id) if id == child.uuid)
    );
}

#[test]
fn due_date_only_patch_leaves_children_untouched() {
    let conn = open_db_in_memory().unwrap();
    let profile = seeded_profile(&conn);
    let service = service(&conn);

    let mut request = NewObligation::new("license renewal", day(2024, 1, 1));
    request.recurrence = Some(RecurrencePattern {
        frequency: Frequency::Monthly,
        interval: 1,
        end_by: None,
        end_after_occurrences: Some(3),
    });
    let outcome = service.add_obligation(profile.uuid, &request).unwrap();
    let before = children_of(&conn, outcome.base.uuid);

    let patch = ObligationPatch {
        due_at: Some(day(2024, 1, 20)),
        ..ObligationPatch::default()
    };
    let updated = service
        .update_obligation(profile.uuid, outcome.base.uuid, &patch)
        .unwrap();
    assert_eq!(updated.regenerated, None);
    assert_eq!(updated.obligation.due_at, day(2024, 1, 20));

    let after = children_of(&conn, outcome.base.uuid);
    assert_eq!(before, after);
}

#[test]
fn operations_are_scoped_to_the_owning_profile() {
    let conn = open_db_in_memory().unwrap();
    let profile = seeded_profile(&conn);
    let profile_repo = SqliteProfileRepository::try_new(&conn).unwrap();
    let other = StateProfile::new("NY", "New York OP");
    profile_repo.create_profile(&other).unwrap();
    let service = service(&conn);

    let request = NewObligation::new("jurisprudence exam", day(2024, 5, 1));
    let outcome = service.add_obligation(profile.uuid, &request).unwrap();

    // The obligation is invisible through the wrong profile.
    assert!(service
        .get_obligation(other.uuid, outcome.base.uuid)
        .unwrap()
        .is_none());

    let err = service
        .remove_obligation(other.uuid, outcome.base.uuid)
        .unwrap_err();
    assert!(
        matches!(err, ComplianceServiceError::ObligationNotFound(id) if id == outcome.base.uuid)
    );
    assert!(service
        .get_obligation(profile.uuid, outcome.base.uuid)
        .unwrap()
        .is_some());
}

#[test]
fn set_completed_toggles_one_row() {
    let conn = open_db_in_memory().unwrap();
    let profile = seeded_profile(&conn);
    let service = service(&conn);

    let request = NewObligation::new("pay reinstatement fee", day(2024, 9, 1));
    let outcome = service.add_obligation(profile.uuid, &request).unwrap();

    let done = service
        .set_completed(profile.uuid, outcome.base.uuid, true)
        .unwrap();
    assert!(done.completed);

    let reopened = service
        .set_completed(profile.uuid, outcome.base.uuid, false)
        .unwrap();
    assert!(!reopened.completed);
}

#[test]
fn document_attach_and_remove_through_the_service() {
    let conn = open_db_in_memory().unwrap();
    let profile = seeded_profile(&conn);
    let service = service(&conn);

    let request = NewObligation::new("submit court records", day(2024, 8, 1));
    let outcome = service.add_obligation(profile.uuid, &request).unwrap();

    let document = service
        .attach_document(profile.uuid, outcome.base.uuid, "order.pdf")
        .unwrap();
    assert_eq!(document.file_name, "order.pdf");

    let loaded = service
        .get_obligation(profile.uuid, outcome.base.uuid)
        .unwrap()
        .unwrap();
    assert_eq!(loaded.documents, vec![document.clone()]);

    service.remove_document(document.uuid).unwrap();
    let err = service.remove_document(document.uuid).unwrap_err();
    assert!(matches!(err, ComplianceServiceError::DocumentNotFound(id) if id == document.uuid));
}
