use rusqlite::Connection;

/// Initialize the database schema.
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        -- The singleton course (first row wins; price in minor units)
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            price_cents INTEGER NOT NULL,
            currency TEXT NOT NULL DEFAULT 'eur',
            thumbnail_url TEXT,
            creator_id TEXT,
            stripe_product_id TEXT,
            stripe_price_id TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        -- Student ledger: one row per external auth identity.
        -- payment_status transitions: unpaid -> paid, unpaid -> failed -> paid.
        CREATE TABLE IF NOT EXISTS students (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            name TEXT NOT NULL,
            payment_status TEXT NOT NULL DEFAULT 'unpaid'
                CHECK (payment_status IN ('unpaid', 'paid', 'failed')),
            transaction_id TEXT,
            payment_date INTEGER,
            amount_cents INTEGER,
            currency TEXT,
            last_payment_attempt INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_students_user ON students(user_id);
        CREATE INDEX IF NOT EXISTS idx_students_transaction ON students(transaction_id);

        -- Lessons within the course, listed by position
        CREATE TABLE IF NOT EXISTS lessons (
            id TEXT PRIMARY KEY,
            course_id TEXT NOT NULL REFERENCES courses(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0,
            playback_id TEXT NOT NULL,
            duration_secs INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_lessons_course ON lessons(course_id, position);

        -- Lesson completion, one row per (student, lesson)
        CREATE TABLE IF NOT EXISTS progress (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            lesson_id TEXT NOT NULL REFERENCES lessons(id) ON DELETE CASCADE,
            completed_at INTEGER NOT NULL,
            UNIQUE(user_id, lesson_id)
        );
        CREATE INDEX IF NOT EXISTS idx_progress_user ON progress(user_id);
        "#,
    )
}
