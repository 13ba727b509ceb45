use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{
    query_all, query_one, COURSE_COLS, LESSON_COLS, PROGRESS_COLS, STUDENT_COLS,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Courses ============

/// Create the course record. Stripe ids are passed in because the handler
/// mirrors the course to Stripe before persisting it.
pub fn create_course(
    conn: &Connection,
    input: &CreateCourse,
    stripe_product_id: Option<&str>,
    stripe_price_id: Option<&str>,
) -> Result<Course> {
    let id = gen_id();
    let ts = now();
    let currency = input.currency();
    conn.execute(
        "INSERT INTO courses (id, title, description, price_cents, currency, thumbnail_url, creator_id, stripe_product_id, stripe_price_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            id,
            input.title,
            input.description,
            input.price_cents,
            currency,
            input.thumbnail_url,
            input.creator_id,
            stripe_product_id,
            stripe_price_id,
            ts,
        ],
    )?;

    Ok(Course {
        id,
        title: input.title.clone(),
        description: input.description.clone(),
        price_cents: input.price_cents,
        currency,
        thumbnail_url: input.thumbnail_url.clone(),
        creator_id: input.creator_id.clone(),
        stripe_product_id: stripe_product_id.map(|s| s.to_string()),
        stripe_price_id: stripe_price_id.map(|s| s.to_string()),
        created_at: ts,
        updated_at: ts,
    })
}

/// The singleton course: oldest row wins if there are somehow several.
pub fn get_course(conn: &Connection) -> Result<Option<Course>> {
    query_one(
        conn,
        &format!("SELECT {COURSE_COLS} FROM courses ORDER BY created_at LIMIT 1"),
        &[],
    )
}

pub fn get_course_by_id(conn: &Connection, id: &str) -> Result<Option<Course>> {
    query_one(
        conn,
        &format!("SELECT {COURSE_COLS} FROM courses WHERE id = ?1"),
        &[&id],
    )
}

pub fn course_exists(conn: &Connection) -> Result<bool> {
    Ok(get_course(conn)?.is_some())
}

/// Price edit. The new Stripe price id (if a fresh one was minted) replaces
/// the stored one.
pub fn update_course_price(
    conn: &Connection,
    id: &str,
    price_cents: i64,
    stripe_price_id: Option<&str>,
) -> Result<Option<Course>> {
    let affected = conn.execute(
        "UPDATE courses SET price_cents = ?2, stripe_price_id = COALESCE(?3, stripe_price_id), updated_at = ?4 WHERE id = ?1",
        params![id, price_cents, stripe_price_id, now()],
    )?;
    if affected == 0 {
        return Ok(None);
    }
    get_course_by_id(conn, id)
}

// ============ Students ============

pub fn create_student(conn: &Connection, input: &CreateStudent) -> Result<Student> {
    let id = gen_id();
    let ts = now();
    conn.execute(
        "INSERT INTO students (id, user_id, email, name, payment_status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'unpaid', ?5, ?5)",
        params![id, input.user_id, input.email, input.name, ts],
    )?;

    Ok(Student {
        id,
        user_id: input.user_id.clone(),
        email: input.email.clone(),
        name: input.name.clone(),
        payment_status: PaymentStatus::Unpaid,
        transaction_id: None,
        payment_date: None,
        amount_cents: None,
        currency: None,
        last_payment_attempt: None,
        created_at: ts,
        updated_at: ts,
    })
}

pub fn get_student_by_user_id(conn: &Connection, user_id: &str) -> Result<Option<Student>> {
    query_one(
        conn,
        &format!("SELECT {STUDENT_COLS} FROM students WHERE user_id = ?1"),
        &[&user_id],
    )
}

pub fn student_exists(conn: &Connection, user_id: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM students WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Whether downstream pages should unlock content for this identity.
pub fn student_has_paid(conn: &Connection, user_id: &str) -> Result<bool> {
    Ok(get_student_by_user_id(conn, user_id)?
        .map(|s| s.payment_status == PaymentStatus::Paid)
        .unwrap_or(false))
}

/// Outcome of applying a successful payment to the ledger.
#[derive(Debug, PartialEq, Eq)]
pub enum PaidOutcome {
    /// The ledger row was updated.
    Applied,
    /// This transaction id was already applied - redelivery, nothing to do.
    AlreadyApplied,
    /// No ledger row for this identity.
    StudentMissing,
}

/// Upsert the paid fields for a student, idempotent on transaction id.
///
/// A single guarded UPDATE: re-applying the same transaction to an already
/// paid row matches zero rows, so concurrent duplicate deliveries are safe.
/// A *different* transaction id still wins (last write), which is fine -
/// it's a genuine retry after a failed attempt.
pub fn apply_paid_payment(
    conn: &Connection,
    user_id: &str,
    fields: &PaidPaymentFields,
) -> Result<PaidOutcome> {
    let affected = conn.execute(
        "UPDATE students
         SET payment_status = 'paid', transaction_id = ?2, payment_date = ?3,
             amount_cents = ?4, currency = ?5, updated_at = ?6
         WHERE user_id = ?1
           AND NOT (payment_status = 'paid' AND transaction_id IS ?2)",
        params![
            user_id,
            fields.transaction_id,
            fields.paid_at,
            fields.amount_cents,
            fields.currency,
            now(),
        ],
    )?;

    if affected > 0 {
        return Ok(PaidOutcome::Applied);
    }
    if student_exists(conn, user_id)? {
        Ok(PaidOutcome::AlreadyApplied)
    } else {
        Ok(PaidOutcome::StudentMissing)
    }
}

/// Outcome of recording a failed payment attempt.
#[derive(Debug, PartialEq, Eq)]
pub enum FailureOutcome {
    Marked,
    /// The student already paid - a late failure event must not downgrade.
    SkippedAlreadyPaid,
    StudentMissing,
}

/// Mark a failed payment attempt. Never reverts a `paid` status, which
/// guards against out-of-order webhook delivery.
pub fn mark_payment_failed(
    conn: &Connection,
    user_id: &str,
    attempted_at: i64,
) -> Result<FailureOutcome> {
    let affected = conn.execute(
        "UPDATE students
         SET payment_status = 'failed', last_payment_attempt = ?2, updated_at = ?3
         WHERE user_id = ?1 AND payment_status != 'paid'",
        params![user_id, attempted_at, now()],
    )?;

    if affected > 0 {
        return Ok(FailureOutcome::Marked);
    }
    match get_student_by_user_id(conn, user_id)? {
        Some(s) if s.payment_status == PaymentStatus::Paid => Ok(FailureOutcome::SkippedAlreadyPaid),
        Some(_) => Ok(FailureOutcome::Marked),
        None => Ok(FailureOutcome::StudentMissing),
    }
}

// ============ Lessons ============

pub fn create_lesson(
    conn: &Connection,
    input: &CreateLesson,
    playback_id: &str,
    duration_secs: Option<i64>,
) -> Result<Lesson> {
    let id = gen_id();
    let ts = now();
    conn.execute(
        "INSERT INTO lessons (id, course_id, title, description, position, playback_id, duration_secs, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            input.course_id,
            input.title,
            input.description,
            input.position,
            playback_id,
            duration_secs,
            ts,
        ],
    )?;

    Ok(Lesson {
        id,
        course_id: input.course_id.clone(),
        title: input.title.clone(),
        description: input.description.clone(),
        position: input.position,
        playback_id: playback_id.to_string(),
        duration_secs,
        created_at: ts,
        updated_at: ts,
    })
}

pub fn get_lesson_by_id(conn: &Connection, id: &str) -> Result<Option<Lesson>> {
    query_one(
        conn,
        &format!("SELECT {LESSON_COLS} FROM lessons WHERE id = ?1"),
        &[&id],
    )
}

/// Lessons for a course in display order. Empty vec when there are none.
pub fn list_lessons(conn: &Connection, course_id: &str) -> Result<Vec<Lesson>> {
    query_all(
        conn,
        &format!("SELECT {LESSON_COLS} FROM lessons WHERE course_id = ?1 ORDER BY position, created_at"),
        &[&course_id],
    )
}

pub fn update_lesson(
    conn: &Connection,
    id: &str,
    input: &UpdateLesson,
) -> Result<Option<Lesson>> {
    let affected = conn.execute(
        "UPDATE lessons
         SET title = COALESCE(?2, title),
             description = COALESCE(?3, description),
             position = COALESCE(?4, position),
             updated_at = ?5
         WHERE id = ?1",
        params![id, input.title, input.description, input.position, now()],
    )?;
    if affected == 0 {
        return Ok(None);
    }
    get_lesson_by_id(conn, id)
}

pub fn delete_lesson(conn: &Connection, id: &str) -> Result<bool> {
    let affected = conn.execute("DELETE FROM lessons WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

// ============ Progress ============

/// Record a lesson completion. Idempotent per (user, lesson): marking an
/// already-completed lesson returns the existing row.
pub fn mark_lesson_complete(
    conn: &Connection,
    input: &MarkComplete,
) -> Result<LessonProgress> {
    let id = gen_id();
    let ts = now();
    let affected = conn.execute(
        "INSERT INTO progress (id, user_id, course_id, lesson_id, completed_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(user_id, lesson_id) DO NOTHING",
        params![id, input.user_id, input.course_id, input.lesson_id, ts],
    )?;

    if affected > 0 {
        return Ok(LessonProgress {
            id,
            user_id: input.user_id.clone(),
            course_id: input.course_id.clone(),
            lesson_id: input.lesson_id.clone(),
            completed_at: ts,
        });
    }

    // The conflict guard fired: an earlier (possibly concurrent) call owns
    // the row, so return what's actually stored.
    query_one::<LessonProgress>(
        conn,
        &format!("SELECT {PROGRESS_COLS} FROM progress WHERE user_id = ?1 AND lesson_id = ?2"),
        &[&input.user_id, &input.lesson_id],
    )?
    .ok_or_else(|| crate::error::AppError::Database(rusqlite::Error::QueryReturnedNoRows))
}

/// Completed lesson ids for a student. Empty vec when there are none.
pub fn completed_lesson_ids(conn: &Connection, user_id: &str) -> Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT lesson_id FROM progress WHERE user_id = ?1 ORDER BY completed_at")?;
    let rows = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    Ok(rows)
}
