pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";
const DEFAULT_IDENTITY_PROVIDER_URL: &str = "https://demobackend.emergentagent.com/auth/v1/env";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_name: Option<String>,
    /// Loaded for deployments that still set it; sessions are opaque and never signed.
    pub jwt_secret: String,
    pub cors_origins: Vec<String>,
    pub identity_provider_url: String,
    pub session_ttl_days: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend = match std::env::var("STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("postgres") | Err(_) => StoreBackend::Postgres,
            Ok(other) => anyhow::bail!("unknown STORE_BACKEND {other:?}"),
        };
        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set for the postgres store");
        }

        Ok(Self {
            store_backend,
            database_url,
            database_name: std::env::var("DB_NAME").ok().filter(|v| !v.is_empty()),
            jwt_secret: std::env::var("JWT_SECRET").unwrap_or_else(|_| DEFAULT_JWT_SECRET.into()),
            cors_origins: parse_origins(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".into()),
            ),
            identity_provider_url: std::env::var("IDENTITY_PROVIDER_URL")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_PROVIDER_URL.into()),
            session_ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .filter(|d| *d > 0)
                .unwrap_or(7),
        })
    }

    pub fn session_ttl(&self) -> time::Duration {
        time::Duration::days(self.session_ttl_days)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.iter().any(|o| o == "*")
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins("https://a.com, https://b.com,,"),
            vec!["https://a.com", "https://b.com"]
        );
        assert_eq!(parse_origins("*"), vec!["*"]);
    }
}
