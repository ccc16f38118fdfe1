//! Runtime settings read from the process environment (and `.env` in
//! development) through `envy`.

use serde::Deserialize;

/// Field names map to upper-case variables.
///
/// # Variables
///
/// - `DATABASE_URL` (required): Postgres connection string
/// - `SERVER_PORT` (optional): listen port, 3000 if unset
/// - `JWT_SECRET` (required): HS256 signing secret for session tokens
/// - `JWT_TTL_HOURS` (optional): session lifetime, defaults to 24
/// - `XENDIT_SECRET_KEY` (required): payment gateway secret API key
/// - `XENDIT_CALLBACK_TOKEN` (required): token the gateway sends with every callback
/// - `XENDIT_API_URL` (optional): gateway base URL, defaults to `https://api.xendit.co`
/// - `INVOICE_DURATION_SECS` (optional): invoice lifetime, defaults to one day
/// - `SITE_URL` (optional): storefront origin used for invoice redirects
/// - `ADMIN_WHATSAPP` (optional): admin phone notified when an order is paid
/// - `RATE_LIMIT_MAX_REQUESTS` / `RATE_LIMIT_WINDOW_SECS` (optional): limiter settings
/// - `HTTP_TIMEOUT_SECS` (optional): timeout for outbound HTTP calls
/// - `DB_MAX_CONNECTIONS` (optional): pool size, defaults to 10
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    pub jwt_secret: String,

    #[serde(default = "default_jwt_ttl_hours")]
    pub jwt_ttl_hours: i64,

    pub xendit_secret_key: String,

    pub xendit_callback_token: String,

    #[serde(default = "default_xendit_api_url")]
    pub xendit_api_url: String,

    #[serde(default = "default_invoice_duration_secs")]
    pub invoice_duration_secs: u64,

    #[serde(default = "default_site_url")]
    pub site_url: String,

    #[serde(default)]
    pub admin_whatsapp: Option<String>,

    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,

    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
}

fn default_port() -> u16 {
    3000
}

fn default_jwt_ttl_hours() -> i64 {
    24
}

fn default_xendit_api_url() -> String {
    "https://api.xendit.co".to_string()
}

fn default_invoice_duration_secs() -> u64 {
    86_400
}

fn default_site_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_rate_limit_max_requests() -> u32 {
    10
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_db_max_connections() -> u32 {
    10
}

impl Config {
    /// Read settings from the environment after merging a `.env` file, if
    /// one exists.
    ///
    /// # Errors
    ///
    /// Fails when:
    /// - Required environment variables are missing (e.g., DATABASE_URL, JWT_SECRET)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        envy::from_env::<Config>()
    }

    /// Build a configuration from explicit key/value pairs.
    ///
    /// Same field mapping and defaults as `from_env`, without touching the
    /// process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        envy::from_iter(pairs.into_iter().map(|(k, v)| (k.into(), v.into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DATABASE_URL", "postgres://localhost/market"),
            ("JWT_SECRET", "secret"),
            ("XENDIT_SECRET_KEY", "xnd_development_key"),
            ("XENDIT_CALLBACK_TOKEN", "callback-token"),
        ]
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let config = Config::from_pairs(required()).unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.jwt_ttl_hours, 24);
        assert_eq!(config.xendit_api_url, "https://api.xendit.co");
        assert_eq!(config.invoice_duration_secs, 86_400);
        assert_eq!(config.rate_limit_max_requests, 10);
        assert_eq!(config.rate_limit_window_secs, 60);
        assert_eq!(config.db_max_connections, 10);
        assert!(config.admin_whatsapp.is_none());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = required();
        pairs.push(("SERVER_PORT", "8080"));
        pairs.push(("ADMIN_WHATSAPP", "081234567890"));
        pairs.push(("RATE_LIMIT_MAX_REQUESTS", "3"));

        let config = Config::from_pairs(pairs).unwrap();

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.admin_whatsapp.as_deref(), Some("081234567890"));
        assert_eq!(config.rate_limit_max_requests, 3);
    }

    #[test]
    fn missing_callback_token_is_an_error() {
        let pairs: Vec<_> = required()
            .into_iter()
            .filter(|(k, _)| *k != "XENDIT_CALLBACK_TOKEN")
            .collect();

        assert!(Config::from_pairs(pairs).is_err());
    }
}
