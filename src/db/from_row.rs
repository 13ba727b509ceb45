//! Row mapping trait and helpers for reducing boilerplate in queries.

use rusqlite::{Connection, OptionalExtension, Row, ToSql};

use crate::models::*;

/// Parse a string column into an enum type, converting parse errors to
/// rusqlite errors instead of panicking on corrupt data.
fn parse_enum<T: std::str::FromStr>(row: &Row, col: usize, col_name: &str) -> rusqlite::Result<T> {
    row.get::<_, String>(col)?.parse::<T>().map_err(|_| {
        rusqlite::Error::InvalidColumnType(col, col_name.to_string(), rusqlite::types::Type::Text)
    })
}

/// Trait for constructing a type from a database row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

/// Query for a single optional result.
pub fn query_one<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Option<T>> {
    conn.query_row(sql, params, T::from_row)
        .optional()
        .map_err(Into::into)
}

/// Query for multiple results.
pub fn query_all<T: FromRow>(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> crate::error::Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ============ SQL SELECT Constants ============

pub const COURSE_COLS: &str = "id, title, description, price_cents, currency, thumbnail_url, creator_id, stripe_product_id, stripe_price_id, created_at, updated_at";

pub const STUDENT_COLS: &str = "id, user_id, email, name, payment_status, transaction_id, payment_date, amount_cents, currency, last_payment_attempt, created_at, updated_at";

pub const LESSON_COLS: &str =
    "id, course_id, title, description, position, playback_id, duration_secs, created_at, updated_at";

pub const PROGRESS_COLS: &str = "id, user_id, course_id, lesson_id, completed_at";

// ============ FromRow Implementations ============

impl FromRow for Course {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Course {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            price_cents: row.get(3)?,
            currency: row.get(4)?,
            thumbnail_url: row.get(5)?,
            creator_id: row.get(6)?,
            stripe_product_id: row.get(7)?,
            stripe_price_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

impl FromRow for Student {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Student {
            id: row.get(0)?,
            user_id: row.get(1)?,
            email: row.get(2)?,
            name: row.get(3)?,
            payment_status: parse_enum(row, 4, "payment_status")?,
            transaction_id: row.get(5)?,
            payment_date: row.get(6)?,
            amount_cents: row.get(7)?,
            currency: row.get(8)?,
            last_payment_attempt: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}

impl FromRow for Lesson {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Lesson {
            id: row.get(0)?,
            course_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            position: row.get(4)?,
            playback_id: row.get(5)?,
            duration_secs: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

impl FromRow for LessonProgress {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(LessonProgress {
            id: row.get(0)?,
            user_id: row.get(1)?,
            course_id: row.get(2)?,
            lesson_id: row.get(3)?,
            completed_at: row.get(4)?,
        })
    }
}
