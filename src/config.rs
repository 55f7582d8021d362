use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base URL objects are publicly reachable under, without trailing slash.
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginLimits {
    pub max_attempts: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub admin: AdminSeed,
    pub login_limits: LoginLimits,
    pub trust_proxy_headers: bool,
    pub static_dir: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "showcase".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "showcase-clients".into()),
            ttl_minutes: parsed_or("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: parsed_or("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };

        let endpoint = std::env::var("STORAGE_ENDPOINT").context("STORAGE_ENDPOINT is not set")?;
        let bucket = std::env::var("STORAGE_BUCKET").context("STORAGE_BUCKET is not set")?;
        let public_url = std::env::var("STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let storage = StorageConfig {
            access_key: std::env::var("STORAGE_ACCESS_KEY")
                .context("STORAGE_ACCESS_KEY is not set")?,
            secret_key: std::env::var("STORAGE_SECRET_KEY")
                .context("STORAGE_SECRET_KEY is not set")?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".into()),
            public_url: public_url.trim_end_matches('/').to_string(),
            endpoint,
            bucket,
        };

        let admin = AdminSeed {
            username: std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into()),
            password: std::env::var("ADMIN_PASSWORD")
                .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.into()),
        };

        let login_limits = LoginLimits {
            max_attempts: parsed_or("LOGIN_MAX_ATTEMPTS", 5),
            window_secs: parsed_or("LOGIN_WINDOW_SECS", 15 * 60),
        };

        Ok(Self {
            database_url,
            database_max_connections: parsed_or("DATABASE_MAX_CONNECTIONS", 10),
            jwt,
            storage,
            admin,
            login_limits,
            trust_proxy_headers: parsed_or("TRUST_PROXY_HEADERS", false),
            static_dir: std::env::var("STATIC_DIR").ok().filter(|v| !v.is_empty()),
        })
    }
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
