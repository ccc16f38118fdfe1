//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Throttle clients
//! - Short-circuit requests (reject unauthorized or excessive traffic)

/// Bearer token authentication and admin guard
pub mod auth;
/// In-memory fixed-window rate limiting
pub mod rate_limit;
