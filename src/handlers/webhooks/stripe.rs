//! Stripe webhook endpoint.
//!
//! Verification happens over the exact raw body bytes, so the handler takes
//! `Bytes` rather than a typed extractor. Once an event is verified and
//! dispatched the response is always `200 {"received": true}`: a ledger
//! write failure must not make Stripe retry-storm the endpoint, so it is
//! logged here and left for out-of-band remediation.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde_json::json;

use crate::db::{
    queries::{self, FailureOutcome, PaidOutcome},
    AppState,
};
use crate::error::AppError;
use crate::models::PaidPaymentFields;
use crate::payments::{StripeCheckoutSession, StripePaymentIntent, StripeWebhookEvent};

/// What dispatching a verified event did to the ledger. Logged as the inner
/// result; the provider only ever sees the outer acknowledgment.
#[derive(Debug)]
enum DispatchOutcome {
    /// Ledger row moved to paid.
    PaymentApplied {
        user_id: String,
        transaction_id: String,
    },
    /// Same transaction already applied - redelivery, no-op.
    DuplicateDelivery {
        user_id: String,
        transaction_id: String,
    },
    FailureRecorded {
        user_id: String,
    },
    /// A failure event landed after the payment succeeded; kept paid.
    FailureAfterPaid {
        user_id: String,
    },
    /// Event verified fine but carries no usable buyer identity or
    /// transaction id.
    MissingMetadata {
        event_type: String,
    },
    /// The payload object didn't have the expected shape.
    MalformedObject {
        event_type: String,
    },
    /// No ledger row for the identity in the event.
    UnknownStudent {
        user_id: String,
    },
    /// Event kinds we log but deliberately don't act on.
    Observed {
        event_type: String,
    },
    Ignored {
        event_type: String,
    },
    /// The ledger write itself failed. Acknowledged anyway.
    WriteFailed {
        event_type: String,
        error: AppError,
    },
}

fn log_outcome(outcome: &DispatchOutcome) {
    match outcome {
        DispatchOutcome::PaymentApplied {
            user_id,
            transaction_id,
        } => {
            tracing::info!(
                "Payment applied for user {} (transaction {})",
                user_id,
                transaction_id
            );
        }
        DispatchOutcome::DuplicateDelivery {
            user_id,
            transaction_id,
        } => {
            tracing::info!(
                "Duplicate delivery for user {} (transaction {}), no-op",
                user_id,
                transaction_id
            );
        }
        DispatchOutcome::FailureRecorded { user_id } => {
            tracing::info!("Payment failure recorded for user {}", user_id);
        }
        DispatchOutcome::FailureAfterPaid { user_id } => {
            tracing::warn!(
                "Failure event for user {} arrived after payment succeeded, keeping paid",
                user_id
            );
        }
        DispatchOutcome::MissingMetadata { event_type } => {
            tracing::warn!(
                "{} event missing buyer identity or transaction id, acknowledged",
                event_type
            );
        }
        DispatchOutcome::MalformedObject { event_type } => {
            tracing::warn!("{} event with malformed object, acknowledged", event_type);
        }
        DispatchOutcome::UnknownStudent { user_id } => {
            tracing::warn!("Webhook for unknown student {}, acknowledged", user_id);
        }
        DispatchOutcome::Observed { event_type } => {
            tracing::info!("Observed {} event, no state change", event_type);
        }
        DispatchOutcome::Ignored { event_type } => {
            tracing::debug!("Ignoring {} event", event_type);
        }
        DispatchOutcome::WriteFailed { event_type, error } => {
            tracing::error!(
                "Ledger write failed dispatching {} event: {} (event acknowledged, needs manual reconciliation)",
                event_type,
                error
            );
        }
    }
}

fn dispatch_completed(state: &AppState, event: &StripeWebhookEvent) -> DispatchOutcome {
    let event_type = event.event_type.clone();

    let session: StripeCheckoutSession = match serde_json::from_value(event.data.object.clone()) {
        Ok(s) => s,
        Err(_) => return DispatchOutcome::MalformedObject { event_type },
    };

    let user_id = match session.metadata.user_id {
        Some(id) => id,
        None => return DispatchOutcome::MissingMetadata { event_type },
    };

    // The payment intent is the durable transaction id. Without it there is
    // nothing to key idempotent redelivery on, so log and acknowledge
    // rather than inventing one.
    let transaction_id = match session.payment_intent {
        Some(id) => id,
        None => return DispatchOutcome::MissingMetadata { event_type },
    };

    let fields = PaidPaymentFields {
        transaction_id: transaction_id.clone(),
        amount_cents: session.amount_total,
        currency: session.currency,
        paid_at: Utc::now().timestamp(),
    };

    let result = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| queries::apply_paid_payment(&conn, &user_id, &fields));

    match result {
        Ok(PaidOutcome::Applied) => DispatchOutcome::PaymentApplied {
            user_id,
            transaction_id,
        },
        Ok(PaidOutcome::AlreadyApplied) => DispatchOutcome::DuplicateDelivery {
            user_id,
            transaction_id,
        },
        Ok(PaidOutcome::StudentMissing) => DispatchOutcome::UnknownStudent { user_id },
        Err(error) => DispatchOutcome::WriteFailed { event_type, error },
    }
}

fn dispatch_payment_failed(state: &AppState, event: &StripeWebhookEvent) -> DispatchOutcome {
    let event_type = event.event_type.clone();

    let intent: StripePaymentIntent = match serde_json::from_value(event.data.object.clone()) {
        Ok(i) => i,
        Err(_) => return DispatchOutcome::MalformedObject { event_type },
    };

    let user_id = match intent.metadata.user_id {
        Some(id) => id,
        None => return DispatchOutcome::MissingMetadata { event_type },
    };

    let result = state
        .db
        .get()
        .map_err(AppError::from)
        .and_then(|conn| queries::mark_payment_failed(&conn, &user_id, Utc::now().timestamp()));

    match result {
        Ok(FailureOutcome::Marked) => DispatchOutcome::FailureRecorded { user_id },
        Ok(FailureOutcome::SkippedAlreadyPaid) => DispatchOutcome::FailureAfterPaid { user_id },
        Ok(FailureOutcome::StudentMissing) => DispatchOutcome::UnknownStudent { user_id },
        Err(error) => DispatchOutcome::WriteFailed { event_type, error },
    }
}

fn dispatch(state: &AppState, event: &StripeWebhookEvent) -> DispatchOutcome {
    match event.event_type.as_str() {
        "checkout.session.completed" => dispatch_completed(state, event),
        "payment_intent.payment_failed" => dispatch_payment_failed(state, event),
        // Reserved: the session carries everything needed, the intent-level
        // success adds nothing today.
        "payment_intent.succeeded" | "checkout.session.expired" => DispatchOutcome::Observed {
            event_type: event.event_type.clone(),
        },
        _ => DispatchOutcome::Ignored {
            event_type: event.event_type.clone(),
        },
    }
}

pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = match headers.get("stripe-signature").map(|v| v.to_str()) {
        Some(Ok(s)) => s.to_string(),
        Some(Err(_)) => {
            return AppError::Validation("invalid stripe-signature header".into()).into_response();
        }
        None => {
            return AppError::Validation("missing stripe-signature header".into()).into_response();
        }
    };

    match state.stripe.verify_webhook_signature(&body, &signature) {
        Ok(true) => {}
        Ok(false) => return AppError::SignatureInvalid.into_response(),
        // Validation (malformed header) answers 400, a missing shared
        // secret answers 500.
        Err(e) => return e.into_response(),
    }

    let event: StripeWebhookEvent = match serde_json::from_slice(&body) {
        Ok(e) => e,
        Err(e) => {
            tracing::error!("Failed to parse Stripe webhook body: {}", e);
            return AppError::Validation("invalid webhook payload".into()).into_response();
        }
    };

    let outcome = dispatch(&state, &event);
    log_outcome(&outcome);

    (StatusCode::OK, axum::Json(json!({ "received": true }))).into_response()
}
