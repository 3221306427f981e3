use serde::Deserialize;
use time::{Date, OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Fallback offset used to derive "today" when the client sends no local date.
    pub local_utc_offset_minutes: i32,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "road2".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "road2-patients".into()),
            ttl_minutes: env_number("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_number("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let local_utc_offset_minutes = env_number("LOCAL_UTC_OFFSET_MINUTES").unwrap_or(0) as i32;
        Ok(Self {
            database_url,
            jwt,
            local_utc_offset_minutes,
        })
    }

    pub fn local_offset(&self) -> UtcOffset {
        UtcOffset::from_whole_seconds(self.local_utc_offset_minutes * 60).unwrap_or(UtcOffset::UTC)
    }

    /// Calendar date in the configured local offset.
    pub fn local_today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.local_offset()).date()
    }
}

fn env_number(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|v| v.parse::<i64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_offset(minutes: i32) -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/road2".into(),
            jwt: JwtConfig {
                secret: "s".into(),
                issuer: "i".into(),
                audience: "a".into(),
                ttl_minutes: 5,
                refresh_ttl_minutes: 60,
            },
            local_utc_offset_minutes: minutes,
        }
    }

    #[test]
    fn offset_is_built_from_minutes() {
        let cfg = config_with_offset(600);
        assert_eq!(cfg.local_offset().whole_hours(), 10);
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        let cfg = config_with_offset(60 * 30);
        assert_eq!(cfg.local_offset(), UtcOffset::UTC);
    }
}
