use axum::extract::State;

use crate::db::{queries, AppState};
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::{Json, Path};
use crate::models::{Course, CreateCourse, UpdateCoursePrice};

/// Create the course. There is exactly one; a second create is rejected.
///
/// The course is mirrored to Stripe as a product and price when a secret
/// key is configured, purely for dashboard organization. Checkout charges
/// the stored price directly, so a missing mirror costs nothing.
pub async fn create_course(
    State(state): State<AppState>,
    Json(input): Json<CreateCourse>,
) -> Result<Json<Course>> {
    input.validate()?;

    let conn = state.db.get()?;

    if queries::course_exists(&conn)? {
        return Err(AppError::Validation(
            "a course already exists; edit it instead".into(),
        ));
    }

    let (stripe_product_id, stripe_price_id) = if state.stripe.is_configured() {
        let product_id = state
            .stripe
            .create_product(&input.title, &input.description, input.thumbnail_url.as_deref())
            .await?;
        let price_id = state
            .stripe
            .create_price(&product_id, input.price_cents, &input.currency())
            .await?;
        (Some(product_id), Some(price_id))
    } else {
        tracing::warn!("Stripe not configured, course created without provider mirror");
        (None, None)
    };

    let course = queries::create_course(
        &conn,
        &input,
        stripe_product_id.as_deref(),
        stripe_price_id.as_deref(),
    )?;
    tracing::info!("Course created: {} ({})", course.title, course.id);
    Ok(Json(course))
}

pub async fn get_course(State(state): State<AppState>) -> Result<Json<Course>> {
    let conn = state.db.get()?;
    let course = queries::get_course(&conn)?.or_not_found("No course available")?;
    Ok(Json(course))
}

/// Change the course price. Stripe prices are immutable, so a configured
/// mirror gets a fresh price object rather than an update.
pub async fn update_course_price(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateCoursePrice>,
) -> Result<Json<Course>> {
    input.validate()?;

    let conn = state.db.get()?;

    let course = queries::get_course_by_id(&conn, &id)?.or_not_found("No such course")?;

    let stripe_price_id = match (&course.stripe_product_id, state.stripe.is_configured()) {
        (Some(product_id), true) => Some(
            state
                .stripe
                .create_price(product_id, input.price_cents, &course.currency)
                .await?,
        ),
        _ => None,
    };

    let updated = queries::update_course_price(
        &conn,
        &id,
        input.price_cents,
        stripe_price_id.as_deref(),
    )?
    .or_not_found("No such course")?;

    tracing::info!(
        "Course {} price changed: {} -> {}",
        id,
        course.price_cents,
        updated.price_cents
    );
    Ok(Json(updated))
}
