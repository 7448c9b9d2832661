use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
    pub currency: String,
}

/// Credentials for one mockup vendor. A vendor without a key is not offered.
#[derive(Debug, Clone, Deserialize)]
pub struct VendorKey {
    pub api_key: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MockupConfig {
    pub printful: Option<VendorKey>,
    pub dynamic_mockups: Option<VendorKey>,
    pub mediamodifier: Option<VendorKey>,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl MockupConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.max_polls >= 1, "MOCKUP_MAX_POLLS must be at least 1");
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub admin_code: Option<String>,
    pub stripe: StripeConfig,
    pub storage: StorageConfig,
    pub mockups: MockupConfig,
    pub static_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("missing environment variable {name}"))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Unset or blank means `default`; anything else must parse.
fn parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(name) {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .with_context(|| format!("invalid value {v:?} for environment variable {name}")),
    }
}

fn vendor(key_var: &str, base_var: &str, default_base: &str) -> Option<VendorKey> {
    optional(key_var).map(|api_key| VendorKey {
        api_key,
        api_base: optional(base_var).unwrap_or_else(|| default_base.into()),
    })
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "printpack".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "printpack-users".into()),
            ttl_minutes: parsed("JWT_TTL_MINUTES", 60)?,
        };
        let stripe = StripeConfig {
            secret_key: required("STRIPE_SECRET_KEY")?,
            api_base: optional("STRIPE_API_BASE")
                .unwrap_or_else(|| "https://api.stripe.com".into()),
            currency: optional("STRIPE_CURRENCY").unwrap_or_else(|| "usd".into()),
        };
        let storage = StorageConfig {
            endpoint: required("MINIO_ENDPOINT")?,
            bucket: required("MINIO_BUCKET")?,
            access_key: required("MINIO_ACCESS_KEY")?,
            secret_key: required("MINIO_SECRET_KEY")?,
            region: optional("MINIO_REGION").unwrap_or_else(|| "us-east-1".into()),
        };
        let mockups = MockupConfig {
            printful: vendor(
                "PRINTFUL_API_KEY",
                "PRINTFUL_API_BASE",
                "https://api.printful.com",
            ),
            dynamic_mockups: vendor(
                "DYNAMIC_MOCKUPS_API_KEY",
                "DYNAMIC_MOCKUPS_API_BASE",
                "https://app.dynamicmockups.com/api/v1",
            ),
            mediamodifier: vendor(
                "MEDIAMODIFIER_API_KEY",
                "MEDIAMODIFIER_API_BASE",
                "https://api.mediamodifier.com/v2",
            ),
            poll_interval_ms: parsed("MOCKUP_POLL_INTERVAL_MS", 1000)?,
            max_polls: parsed("MOCKUP_MAX_POLLS", 60)?,
        };

        mockups.validate()?;

        Ok(Self {
            database_url,
            jwt,
            admin_code: optional("ADMIN_CODE"),
            stripe,
            storage,
            mockups,
            static_dir: optional("STATIC_DIR")
                .unwrap_or_else(|| "client/build".into())
                .into(),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parsed("PORT", 8080)?,
        })
    }
}
