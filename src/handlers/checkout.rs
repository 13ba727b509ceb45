use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::db::{queries, AppState};
use crate::error::{AppError, OptionExt, Result};
use crate::extractors::Form;
use crate::models::validate_email_format;
use crate::payments::MIN_CHARGE_CENTS;

/// Browser form submit from the course landing page.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// External auth identity of the buyer.
    pub user_id: String,
    /// Pre-filled on the hosted checkout page.
    pub email: String,
}

impl CheckoutRequest {
    fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::Validation("user_id is required".into()));
        }
        validate_email_format(&self.email)
    }
}

/// Start a hosted checkout for the singleton course.
///
/// No local state is written here. The session lives entirely in Stripe
/// until a webhook reports its outcome, so the buyer identity and course id
/// ride along in the session metadata.
pub async fn initiate_checkout(
    State(state): State<AppState>,
    Form(request): Form<CheckoutRequest>,
) -> Result<Response> {
    request.validate()?;

    let conn = state.db.get()?;

    let course = queries::get_course(&conn)?.or_not_found("No course available")?;

    // The buyer must already have a ledger row; enrollment happens on first
    // site visit, not here.
    if !queries::student_exists(&conn, &request.user_id)? {
        return Err(AppError::NotFound(format!(
            "No student record for user {}",
            request.user_id
        )));
    }

    if course.price_cents < MIN_CHARGE_CENTS {
        return Err(AppError::InvalidPricing(format!(
            "course price {} is below the minimum chargeable amount of {}",
            course.price_cents, MIN_CHARGE_CENTS
        )));
    }

    let success_url = format!("{}/success?session_id={{CHECKOUT_SESSION_ID}}", state.base_url);
    let cancel_url = format!("{}/cancel", state.base_url);

    let (session_id, checkout_url) = state
        .stripe
        .create_checkout_session(
            &course,
            &request.user_id,
            &request.email,
            &success_url,
            &cancel_url,
        )
        .await?;

    tracing::info!(
        "Checkout session {} created for user {} (course {})",
        session_id,
        request.user_id,
        course.id
    );

    // 303 so the browser re-issues as GET to the hosted page.
    Ok((StatusCode::SEE_OTHER, [(header::LOCATION, checkout_url)]).into_response())
}
