mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::payments::StripeClient;
use crate::video::MuxClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and the outbound clients.
///
/// Clients are constructed once at startup and injected here; handlers never
/// reach for process-wide singletons.
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Public base URL for checkout success/cancel redirects.
    pub base_url: String,
    pub stripe: StripeClient,
    pub video: Option<MuxClient>,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    // Foreign keys are off by default in SQLite, per connection.
    let manager = SqliteConnectionManager::file(database_path)
        .with_init(|c| c.execute_batch("PRAGMA foreign_keys = ON;"));
    Pool::builder().max_size(10).build(manager)
}
