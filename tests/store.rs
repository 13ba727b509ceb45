//! Query-level tests for the student ledger, course, lesson, and progress
//! stores, focusing on the status transition and idempotency guards.

mod common;

use common::*;
use onecourse::db::queries::{FailureOutcome, PaidOutcome};

fn paid_fields(transaction_id: &str) -> PaidPaymentFields {
    PaidPaymentFields {
        transaction_id: transaction_id.to_string(),
        amount_cents: Some(2500),
        currency: Some("eur".to_string()),
        paid_at: now(),
    }
}

#[test]
fn apply_paid_payment_updates_ledger() {
    let conn = setup_test_db();
    create_test_student(&conn, "u1");

    let outcome = queries::apply_paid_payment(&conn, "u1", &paid_fields("tx_1")).unwrap();
    assert_eq!(outcome, PaidOutcome::Applied);

    let s = queries::get_student_by_user_id(&conn, "u1").unwrap().unwrap();
    assert_eq!(s.payment_status, PaymentStatus::Paid);
    assert_eq!(s.transaction_id.as_deref(), Some("tx_1"));
    assert_eq!(s.amount_cents, Some(2500));
}

#[test]
fn reapplying_same_transaction_is_a_noop() {
    let conn = setup_test_db();
    create_test_student(&conn, "u1");

    queries::apply_paid_payment(&conn, "u1", &paid_fields("tx_1")).unwrap();
    let before = queries::get_student_by_user_id(&conn, "u1").unwrap().unwrap();

    let outcome = queries::apply_paid_payment(&conn, "u1", &paid_fields("tx_1")).unwrap();
    assert_eq!(outcome, PaidOutcome::AlreadyApplied);

    let after = queries::get_student_by_user_id(&conn, "u1").unwrap().unwrap();
    assert_eq!(after.updated_at, before.updated_at);
    assert_eq!(after.payment_date, before.payment_date);
}

#[test]
fn different_transaction_still_wins() {
    let conn = setup_test_db();
    create_test_student(&conn, "u1");

    queries::apply_paid_payment(&conn, "u1", &paid_fields("tx_1")).unwrap();
    let outcome = queries::apply_paid_payment(&conn, "u1", &paid_fields("tx_2")).unwrap();
    assert_eq!(outcome, PaidOutcome::Applied);

    let s = queries::get_student_by_user_id(&conn, "u1").unwrap().unwrap();
    assert_eq!(s.transaction_id.as_deref(), Some("tx_2"));
}

#[test]
fn apply_paid_payment_for_unknown_student() {
    let conn = setup_test_db();

    let outcome = queries::apply_paid_payment(&conn, "ghost", &paid_fields("tx_1")).unwrap();
    assert_eq!(outcome, PaidOutcome::StudentMissing);
}

#[test]
fn mark_payment_failed_records_attempt() {
    let conn = setup_test_db();
    create_test_student(&conn, "u1");

    let attempted_at = now();
    let outcome = queries::mark_payment_failed(&conn, "u1", attempted_at).unwrap();
    assert_eq!(outcome, FailureOutcome::Marked);

    let s = queries::get_student_by_user_id(&conn, "u1").unwrap().unwrap();
    assert_eq!(s.payment_status, PaymentStatus::Failed);
    assert_eq!(s.last_payment_attempt, Some(attempted_at));
}

#[test]
fn mark_payment_failed_never_downgrades_paid() {
    let conn = setup_test_db();
    create_test_student(&conn, "u1");

    queries::apply_paid_payment(&conn, "u1", &paid_fields("tx_1")).unwrap();
    let outcome = queries::mark_payment_failed(&conn, "u1", now()).unwrap();
    assert_eq!(outcome, FailureOutcome::SkippedAlreadyPaid);

    let s = queries::get_student_by_user_id(&conn, "u1").unwrap().unwrap();
    assert_eq!(s.payment_status, PaymentStatus::Paid);
    assert_eq!(s.transaction_id.as_deref(), Some("tx_1"));
}

#[test]
fn mark_payment_failed_for_unknown_student() {
    let conn = setup_test_db();

    let outcome = queries::mark_payment_failed(&conn, "ghost", now()).unwrap();
    assert_eq!(outcome, FailureOutcome::StudentMissing);
}

#[test]
fn failed_then_paid_retry_succeeds() {
    let conn = setup_test_db();
    create_test_student(&conn, "u1");

    queries::mark_payment_failed(&conn, "u1", now()).unwrap();
    let outcome = queries::apply_paid_payment(&conn, "u1", &paid_fields("tx_retry")).unwrap();
    assert_eq!(outcome, PaidOutcome::Applied);

    let s = queries::get_student_by_user_id(&conn, "u1").unwrap().unwrap();
    assert_eq!(s.payment_status, PaymentStatus::Paid);
    // The failed attempt stays on record.
    assert!(s.last_payment_attempt.is_some());
}

#[test]
fn student_has_paid_gates_on_status() {
    let conn = setup_test_db();
    create_test_student(&conn, "u1");

    assert!(!queries::student_has_paid(&conn, "u1").unwrap());
    assert!(!queries::student_has_paid(&conn, "ghost").unwrap());

    queries::apply_paid_payment(&conn, "u1", &paid_fields("tx_1")).unwrap();
    assert!(queries::student_has_paid(&conn, "u1").unwrap());
}

#[test]
fn get_course_returns_oldest_row() {
    let conn = setup_test_db();
    let first = create_test_course(&conn, 2500);
    // A second row should never exist, but if it does the oldest wins.
    conn.execute(
        "INSERT INTO courses (id, title, description, price_cents, currency, created_at, updated_at)
         VALUES ('c2', 'Later', 'Later course', 9900, 'eur', ?1, ?1)",
        rusqlite::params![first.created_at + 100],
    )
    .unwrap();

    let course = queries::get_course(&conn).unwrap().unwrap();
    assert_eq!(course.id, first.id);
}

#[test]
fn update_course_price_persists_and_keeps_stripe_id() {
    let conn = setup_test_db();
    let course = create_test_course(&conn, 2500);

    let updated = queries::update_course_price(&conn, &course.id, 4900, Some("price_new"))
        .unwrap()
        .unwrap();
    assert_eq!(updated.price_cents, 4900);
    assert_eq!(updated.stripe_price_id.as_deref(), Some("price_new"));

    // A later edit without a freshly minted Stripe price keeps the old id.
    let updated = queries::update_course_price(&conn, &course.id, 5900, None)
        .unwrap()
        .unwrap();
    assert_eq!(updated.price_cents, 5900);
    assert_eq!(updated.stripe_price_id.as_deref(), Some("price_new"));
}

#[test]
fn update_course_price_for_unknown_course() {
    let conn = setup_test_db();
    assert!(queries::update_course_price(&conn, "ghost", 4900, None)
        .unwrap()
        .is_none());
}

#[test]
fn lessons_are_listed_in_position_order() {
    let conn = setup_test_db();
    let course = create_test_course(&conn, 2500);

    create_test_lesson(&conn, &course.id, "Third", 3);
    create_test_lesson(&conn, &course.id, "First", 1);
    create_test_lesson(&conn, &course.id, "Second", 2);

    let lessons = queries::list_lessons(&conn, &course.id).unwrap();
    let titles: Vec<&str> = lessons.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);
}

#[test]
fn list_lessons_for_empty_course_is_empty() {
    let conn = setup_test_db();
    let course = create_test_course(&conn, 2500);

    let lessons = queries::list_lessons(&conn, &course.id).unwrap();
    assert!(lessons.is_empty());
}

#[test]
fn deleting_a_course_cascades_to_lessons() {
    let conn = setup_test_db();
    let course = create_test_course(&conn, 2500);
    create_test_lesson(&conn, &course.id, "Lesson", 1);

    conn.execute("DELETE FROM courses WHERE id = ?1", rusqlite::params![course.id])
        .unwrap();
    let lessons = queries::list_lessons(&conn, &course.id).unwrap();
    assert!(lessons.is_empty());
}

#[test]
fn marking_a_lesson_complete_twice_is_idempotent() {
    let conn = setup_test_db();
    let course = create_test_course(&conn, 2500);
    let lesson = create_test_lesson(&conn, &course.id, "Lesson", 1);
    create_test_student(&conn, "u1");

    let input = MarkComplete {
        user_id: "u1".to_string(),
        course_id: course.id.clone(),
        lesson_id: lesson.id.clone(),
    };

    let first = queries::mark_lesson_complete(&conn, &input).unwrap();
    let second = queries::mark_lesson_complete(&conn, &input).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(first.completed_at, second.completed_at);

    // The duplicate call hands back the stored row, not a fresh one.
    let stored_id: String = conn
        .query_row(
            "SELECT id FROM progress WHERE user_id = ?1 AND lesson_id = ?2",
            rusqlite::params!["u1", lesson.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(second.id, stored_id);

    let completed = queries::completed_lesson_ids(&conn, "u1").unwrap();
    assert_eq!(completed, vec![lesson.id]);
}

#[test]
fn completed_lesson_ids_for_fresh_student_is_empty() {
    let conn = setup_test_db();
    create_test_student(&conn, "u1");

    let completed = queries::completed_lesson_ids(&conn, "u1").unwrap();
    assert!(completed.is_empty());
}
