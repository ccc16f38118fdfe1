//! Shared application state handed to every handler and middleware.

use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;

use crate::{
    config::Config, db::DbPool, middleware::rate_limit::RateLimiter,
    services::xendit::XenditClient,
};

/// State shared across requests.
///
/// Cheap to clone: the pool, HTTP client and limiter are all reference
/// counted internally.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<Config>,

    /// Payment gateway client
    pub xendit: XenditClient,

    /// HTTP client for WhatsApp providers
    pub http: reqwest::Client,

    /// Best-effort per-client request limiter; resets on restart
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Build the state from a connected pool and loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(pool: DbPool, config: Config) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.http_timeout_secs);
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        let xendit = XenditClient::new(
            http.clone(),
            config.xendit_api_url.clone(),
            config.xendit_secret_key.clone(),
        );

        let rate_limiter = RateLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        );

        Ok(Self {
            pool,
            config: Arc::new(config),
            xendit,
            http,
            rate_limiter,
        })
    }
}

impl FromRef<AppState> for DbPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}
