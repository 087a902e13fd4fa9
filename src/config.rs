use std::env;

use anyhow::Context;

/// Longest session a token may grant: one year.
pub const MAX_JWT_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Service credential accepted by operational endpoints in place of an admin session.
    pub service_role_key: Option<String>,
    /// Origin used when building redirect targets.
    pub public_url: String,
    pub require_email_confirmation: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_ttl_hours = ttl_hours(env::var("JWT_TTL_HOURS").ok().as_deref());
        let service_role_key = env::var("SERVICE_ROLE_KEY").ok().filter(|k| !k.is_empty());
        let public_url = env::var("PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let require_email_confirmation = env::var("AUTH_REQUIRE_EMAIL_CONFIRMATION")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            service_role_key,
            public_url,
            require_email_confirmation,
        })
    }

    /// Configuration for tests and tools that only need a database.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "test-secret".into(),
            jwt_ttl_hours: 1,
            service_role_key: None,
            public_url: "http://localhost:3000".into(),
            require_email_confirmation: false,
        }
    }
}

/// Session length in hours: 24 when unset or not a positive number, capped at a year.
fn ttl_hours(raw: Option<&str>) -> i64 {
    raw.and_then(|h| h.trim().parse::<i64>().ok())
        .filter(|h| *h > 0)
        .map_or(24, |h| h.min(MAX_JWT_TTL_HOURS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_defaults_and_caps() {
        assert_eq!(ttl_hours(None), 24);
        assert_eq!(ttl_hours(Some("0")), 24);
        assert_eq!(ttl_hours(Some("soon")), 24);
        assert_eq!(ttl_hours(Some(" 12 ")), 12);
        assert_eq!(ttl_hours(Some("9223372036854775807")), MAX_JWT_TTL_HOURS);
    }
}
