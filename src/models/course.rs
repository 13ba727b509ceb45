use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// The singleton course record. Created once by the instructor, price edits
/// are rare, never deleted.
///
/// Pricing lives here: checkout sessions charge `price_cents` directly. The
/// mirrored Stripe product/price ids keep the provider dashboard organized
/// but are not the pricing source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Price in minor currency units (e.g. cents).
    pub price_cents: i64,
    /// Lowercase ISO currency code (e.g. "eur").
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_price_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCourse {
    pub title: String,
    pub description: String,
    pub price_cents: i64,
    /// Defaults to "eur" when omitted.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub creator_id: Option<String>,
}

impl CreateCourse {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".into()));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::Validation("description is required".into()));
        }
        if self.price_cents < 0 {
            return Err(AppError::Validation("price_cents must not be negative".into()));
        }
        if let Some(ref currency) = self.currency {
            if currency.len() != 3 {
                return Err(AppError::Validation(
                    "currency must be a 3-letter ISO code".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn currency(&self) -> String {
        self.currency
            .as_deref()
            .unwrap_or("eur")
            .to_lowercase()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCoursePrice {
    pub price_cents: i64,
}

impl UpdateCoursePrice {
    pub fn validate(&self) -> Result<()> {
        if self.price_cents < 0 {
            return Err(AppError::Validation("price_cents must not be negative".into()));
        }
        Ok(())
    }
}
