use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Payment status of a student. The only transitions are
/// `unpaid -> paid` and `unpaid -> failed -> paid` (a retry after a failed
/// attempt). Nothing ever moves back to `unpaid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(PaymentStatus::Unpaid),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(()),
        }
    }
}

/// The per-student ledger row: one record per external auth identity,
/// holding payment status and entitlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    /// External auth system's unique user identifier.
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// When the successful payment webhook landed (epoch seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Most recent failed payment attempt (epoch seconds).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_attempt: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Basic email format validation: one @, non-empty local part, dotted domain.
/// Intentionally permissive - not RFC 5322, just a sanity check.
pub fn validate_email_format(email: &str) -> Result<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return Err(AppError::Validation("invalid email format".into()));
    }

    let (local, domain) = (parts[0], parts[1]);
    if local.is_empty() || local.contains(' ') {
        return Err(AppError::Validation("invalid email format".into()));
    }
    if domain.is_empty()
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
    {
        return Err(AppError::Validation("invalid email format".into()));
    }

    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateStudent {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

impl CreateStudent {
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(AppError::Validation("user_id is required".into()));
        }
        validate_email_format(&self.email)?;
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name is required".into()));
        }
        Ok(())
    }
}

/// Fields written by a successful checkout webhook.
#[derive(Debug, Clone)]
pub struct PaidPaymentFields {
    pub transaction_id: String,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub paid_at: i64,
}
