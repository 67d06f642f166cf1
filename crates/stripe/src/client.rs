//! REST client for the Stripe HTTP API.
//!
//! Stripe's API is form-encoded; nested fields use bracket notation
//! (`metadata[fix_request_id]`).

use patchdock_core::types::DbId;
use serde::Deserialize;

/// Default API base; overridable for tests.
const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Charge currency. Prices everywhere are integer cents.
const CURRENCY: &str = "usd";

/// HTTP client for the Stripe API.
pub struct StripeClient {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

/// Errors from the Stripe API layer.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Stripe returned a non-2xx status code.
    #[error("Stripe API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

/// A payment customer handle.
#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
}

/// A created charge intent. `client_secret` goes back to the dashboard so
/// the owner can complete payment.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub amount: i64,
}

impl StripeClient {
    /// Create a client from `STRIPE_SECRET_KEY`.
    ///
    /// # Panics
    ///
    /// Panics if `STRIPE_SECRET_KEY` is not set.
    pub fn from_env() -> Self {
        let secret_key =
            std::env::var("STRIPE_SECRET_KEY").expect("STRIPE_SECRET_KEY must be set");
        Self::new(DEFAULT_API_BASE.to_string(), secret_key)
    }

    /// Create a client against an explicit API base (tests use this).
    pub fn new(api_base: String, secret_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            secret_key,
        }
    }

    /// Create a payment customer carrying our user id in metadata.
    pub async fn create_customer(
        &self,
        user_id: DbId,
        email: &str,
        name: Option<&str>,
    ) -> Result<Customer, StripeError> {
        let user_id = user_id.to_string();
        let mut form: Vec<(&str, &str)> = vec![
            ("email", email),
            ("metadata[patchdock_user_id]", &user_id),
        ];
        if let Some(name) = name {
            form.push(("name", name));
        }

        let response = self
            .client
            .post(format!("{}/v1/customers", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Create a charge intent for one fix. The fix id rides in metadata so
    /// the asynchronous completion event can be tied back to the entity.
    pub async fn create_fix_payment_intent(
        &self,
        customer_id: &str,
        fix_request_id: DbId,
        amount_cents: i32,
    ) -> Result<PaymentIntent, StripeError> {
        let amount = amount_cents.to_string();
        let fix_id = fix_request_id.to_string();
        let form: Vec<(&str, &str)> = vec![
            ("customer", customer_id),
            ("amount", &amount),
            ("currency", CURRENCY),
            ("automatic_payment_methods[enabled]", "true"),
            ("metadata[type]", "fix"),
            ("metadata[fix_request_id]", &fix_id),
        ];

        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&form)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Parse a successful JSON response body into the expected type, or
    /// surface the status and body text on failure.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, StripeError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(StripeError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<T>().await?)
    }
}
