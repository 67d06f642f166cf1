//! Token verification. Tokens are issued by the external identity
//! provider; this service only validates them.

pub mod jwt;
