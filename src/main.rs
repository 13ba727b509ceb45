use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use onecourse::config::Config;
use onecourse::db::{create_pool, init_db, queries, AppState};
use onecourse::handlers;
use onecourse::models::{CreateCourse, CreateStudent};
use onecourse::payments::StripeClient;
use onecourse::video::MuxClient;

#[derive(Parser, Debug)]
#[command(name = "onecourse")]
#[command(about = "Backend for selling and delivering a single online course")]
struct Cli {
    /// Seed the database with dev data (a course and a test student)
    #[arg(long)]
    seed: bool,

    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

/// Seeds the database with a course and a test student for local testing.
/// Only runs in dev mode and when the database is empty.
fn seed_dev_data(state: &AppState) {
    let conn = state.db.get().expect("Failed to get db connection for seeding");

    if queries::course_exists(&conn).expect("Failed to check for existing course") {
        tracing::info!("Database already has a course, skipping seed");
        return;
    }

    let course = queries::create_course(
        &conn,
        &CreateCourse {
            title: "Dev Course".to_string(),
            description: "Seeded course for local testing".to_string(),
            price_cents: 2500,
            currency: None,
            thumbnail_url: None,
            creator_id: Some("dev-instructor".to_string()),
        },
        None,
        None,
    )
    .expect("Failed to create dev course");

    let student = queries::create_student(
        &conn,
        &CreateStudent {
            user_id: "dev-user".to_string(),
            email: "dev@onecourse.local".to_string(),
            name: "Dev Student".to_string(),
        },
    )
    .expect("Failed to create dev student");

    tracing::info!("============================================");
    tracing::info!("DEV DATA SEEDED");
    tracing::info!("Course: {} (id: {})", course.title, course.id);
    tracing::info!("Student: {} ({})", student.user_id, student.email);
    tracing::info!("============================================");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onecourse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if config.stripe.secret_key.is_none() {
        tracing::warn!("STRIPE_SECRET_KEY not set, checkout will fail until it is configured");
    }
    if config.stripe.webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set, webhooks will fail until it is configured");
    }
    if config.mux.is_none() {
        tracing::warn!("Mux credentials not set, lesson creation will fail until configured");
    }

    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        base_url: config.base_url.clone(),
        stripe: StripeClient::new(&config.stripe),
        video: config.mux.as_ref().map(MuxClient::new),
    };

    if cli.seed {
        if !config.dev_mode {
            tracing::warn!("--seed flag ignored: not in dev mode (set ONECOURSE_ENV=dev)");
        } else {
            seed_dev_data(&state);
        }
    }

    let app = Router::new()
        .merge(handlers::router())
        .merge(handlers::webhooks::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("onecourse server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
