use std::env;

const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";
const MAX_JWT_EXPIRY_DAYS: i64 = 3650;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub db_max_connections: u32,
    pub db_connect_timeout_secs: u64,
    pub host: String,
    pub port: u16,
    /// `production` hides internal error text and enforces the CORS allow-list.
    pub environment: String,
    pub allowed_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut allowed_origins = parse_origins(
            &env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.into()),
        );
        if let Some(frontend) = env::var("FRONTEND_URL").ok().filter(|s| !s.is_empty()) {
            allowed_origins.push(frontend);
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_days: parse_expiry_days(
                &env::var("JWT_EXPIRY_DAYS").unwrap_or_else(|_| "7".into()),
            )?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".into())
                .parse()?,
            db_connect_timeout_secs: env::var("DB_CONNECT_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3001".into())
                .parse()?,
            environment: env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            allowed_origins,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

fn parse_expiry_days(raw: &str) -> anyhow::Result<i64> {
    let days: i64 = raw.trim().parse()?;
    if !(1..=MAX_JWT_EXPIRY_DAYS).contains(&days) {
        anyhow::bail!("JWT_EXPIRY_DAYS must be between 1 and {MAX_JWT_EXPIRY_DAYS}, got {days}");
    }
    Ok(days)
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_trimmed_and_blank_entries_dropped() {
        let origins = parse_origins(" http://a.test , ,https://b.test,");
        assert_eq!(origins, vec!["http://a.test", "https://b.test"]);
    }

    #[test]
    fn expiry_days_must_be_in_range() {
        assert_eq!(parse_expiry_days("7").unwrap(), 7);
        assert_eq!(parse_expiry_days(" 3650 ").unwrap(), 3650);
        assert!(parse_expiry_days("0").is_err());
        assert!(parse_expiry_days("-3").is_err());
        assert!(parse_expiry_days("106751991167300").is_err());
        assert!(parse_expiry_days("week").is_err());
    }

    #[test]
    fn production_flag_is_case_insensitive() {
        let mut config = Config {
            database_url: String::new(),
            jwt_secret: String::new(),
            jwt_expiry_days: 7,
            db_max_connections: 1,
            db_connect_timeout_secs: 1,
            host: "127.0.0.1".into(),
            port: 0,
            environment: "Production".into(),
            allowed_origins: vec![],
        };
        assert!(config.is_production());
        config.environment = "development".into();
        assert!(!config.is_production());
    }
}
