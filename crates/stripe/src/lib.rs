//! Payment capability: a typed client for the Stripe REST API plus
//! webhook signature verification and strongly-typed webhook events.

mod client;
pub mod webhook;

pub use client::{Customer, PaymentIntent, StripeClient, StripeError};
