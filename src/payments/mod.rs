mod stripe;

pub use stripe::*;

/// Minimum chargeable amount in minor currency units. Stripe rejects
/// charges below roughly this for every supported currency.
pub const MIN_CHARGE_CENTS: i64 = 50;

/// Hosted checkout sessions expire this long after creation.
pub const CHECKOUT_EXPIRY_SECS: i64 = 30 * 60;
