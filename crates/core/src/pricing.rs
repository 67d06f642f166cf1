//! Fix pricing policy.
//!
//! Prices are integer minor currency units (cents). The quote is a pure
//! function of the user's cumulative completed-fix counter and must be
//! recomputed from the freshly loaded users row on every quote; nothing
//! here caches.

/// Price per fix while a user is inside the promotional window, in cents.
pub const PROMO_FIX_PRICE_CENTS: i32 = 300;

/// Price per fix once the promotional window is exhausted, in cents.
pub const STANDARD_FIX_PRICE_CENTS: i32 = 500;

/// Number of completed fixes covered by the promotional rate.
pub const PROMO_FIX_LIMIT: i64 = 30;

/// Quote the price for a user's next fix given how many fixes they have
/// already completed.
pub fn fix_price_cents(completed_fixes: i64) -> i32 {
    if completed_fixes < PROMO_FIX_LIMIT {
        PROMO_FIX_PRICE_CENTS
    } else {
        STANDARD_FIX_PRICE_CENTS
    }
}
