use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result};
use crate::models::Course;

use super::CHECKOUT_EXPIRY_SECS;

type HmacSha256 = Hmac<Sha256>;

/// Stripe credentials from the environment. Both are optional at startup;
/// requests that need a missing one fail with a ConfigurationError.
#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub secret_key: Option<String>,
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    // Stripe can return a session without a URL in degenerate cases.
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedObject {
    id: String,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: Option<String>,
    webhook_secret: Option<String>,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(),
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
        }
    }

    /// Whether outbound API calls can be made at all.
    pub fn is_configured(&self) -> bool {
        self.secret_key.is_some()
    }

    fn secret_key(&self) -> Result<&str> {
        self.secret_key
            .as_deref()
            .ok_or_else(|| AppError::Configuration("STRIPE_SECRET_KEY is not set".into()))
    }

    /// Create a hosted checkout session for the course at its stored price.
    ///
    /// The course record is the pricing source of truth, so the line item
    /// uses ad-hoc price_data rather than the mirrored Stripe price. The
    /// buyer identity and course id ride in the metadata of BOTH the session
    /// and the payment intent: webhook delivery is an independent callback
    /// and Stripe may hand either object to the handler as the payload.
    pub async fn create_checkout_session(
        &self,
        course: &Course,
        user_id: &str,
        customer_email: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<(String, String)> {
        let expires_at = (chrono::Utc::now().timestamp() + CHECKOUT_EXPIRY_SECS).to_string();
        let unit_amount = course.price_cents.to_string();

        let response = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(self.secret_key()?, None::<&str>)
            .form(&[
                ("mode", "payment"),
                ("success_url", success_url),
                ("cancel_url", cancel_url),
                ("customer_email", customer_email),
                ("expires_at", &expires_at),
                ("line_items[0][price_data][currency]", &course.currency),
                ("line_items[0][price_data][unit_amount]", &unit_amount),
                ("line_items[0][price_data][product_data][name]", &course.title),
                (
                    "line_items[0][price_data][product_data][description]",
                    &course.description,
                ),
                ("line_items[0][quantity]", "1"),
                ("metadata[user_id]", user_id),
                ("metadata[course_id]", &course.id),
                ("payment_intent_data[metadata][user_id]", user_id),
                ("payment_intent_data[metadata][course_id]", &course.id),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Stripe API error: {}", error_text)));
        }

        let session: CreateCheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))?;

        let url = session
            .url
            .ok_or_else(|| AppError::Upstream("No checkout URL returned by Stripe".into()))?;

        Ok((session.id, url))
    }

    /// Mirror the course as a Stripe product (for dashboard organization).
    pub async fn create_product(
        &self,
        name: &str,
        description: &str,
        image_url: Option<&str>,
    ) -> Result<String> {
        let mut form = vec![("name", name), ("description", description)];
        if let Some(image) = image_url {
            form.push(("images[0]", image));
        }

        let response = self
            .client
            .post("https://api.stripe.com/v1/products")
            .basic_auth(self.secret_key()?, None::<&str>)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Stripe API error: {}", error_text)));
        }

        let product: CreatedObject = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))?;
        Ok(product.id)
    }

    /// Mirror the course price as a Stripe price object.
    pub async fn create_price(
        &self,
        product_id: &str,
        unit_amount: i64,
        currency: &str,
    ) -> Result<String> {
        let unit_amount = unit_amount.to_string();
        let response = self
            .client
            .post("https://api.stripe.com/v1/prices")
            .basic_auth(self.secret_key()?, None::<&str>)
            .form(&[
                ("product", product_id),
                ("unit_amount", &unit_amount),
                ("currency", currency),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Stripe API error: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Stripe API error: {}", error_text)));
        }

        let price: CreatedObject = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Stripe response: {}", e)))?;
        Ok(price.id)
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    /// Verify the `stripe-signature` header against the raw request body.
    ///
    /// Verification must use the exact bytes Stripe sent; re-serializing the
    /// JSON would change them and spuriously fail.
    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        let webhook_secret = self
            .webhook_secret
            .as_deref()
            .ok_or_else(|| AppError::Configuration("STRIPE_WEBHOOK_SECRET is not set".into()))?;

        // Stripe signature format: t=timestamp,v1=signature
        let mut timestamp = None;
        let mut sig_v1 = None;
        for part in signature.split(',') {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::Validation("invalid signature format".into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::Validation("invalid signature format".into()))?;

        // Reject stale timestamps so captured webhooks can't be replayed.
        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::Validation("invalid timestamp in signature".into()))?;

        let age = chrono::Utc::now().timestamp() - timestamp;
        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }
        // Clock skew tolerance for timestamps from the future: 60 seconds
        if age < -60 {
            tracing::warn!("Stripe webhook rejected: timestamp in the future (age={}s)", age);
            return Ok(false);
        }

        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

        let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
            .map_err(|_| AppError::Configuration("invalid webhook secret".into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        // Constant-time comparison. The length check isn't constant-time,
        // but the length is not secret (always 64 hex chars for SHA-256).
        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();
        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

// ============ Webhook event payloads ============

/// Generic Stripe webhook event - object is parsed based on event_type.
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// checkout.session.completed / checkout.session.expired
#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: StripeMetadata,
}

/// payment_intent.payment_failed / payment_intent.succeeded
#[derive(Debug, Deserialize)]
pub struct StripePaymentIntent {
    pub id: String,
    #[serde(default)]
    pub metadata: StripeMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeMetadata {
    pub user_id: Option<String>,
    pub course_id: Option<String>,
}
