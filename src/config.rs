use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub gateway: GatewayConfig,
    pub fees: FeesConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    pub secret_key: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Fee schedule inputs. Percentages are fractions, e.g. 0.05 for 5%.
#[derive(Debug, Clone, Deserialize)]
pub struct FeesConfig {
    pub platform_fee_percent: Decimal,
    pub gateway_fee_percent: Decimal,
    pub gateway_fee_fixed: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub max_attempts: u32,
    pub window_secs: u64,
}

fn env_decimal(name: &str, default: &str) -> Result<Decimal> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    Decimal::from_str(&raw).with_context(|| format!("{} must be a valid decimal", name))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let server = ServerConfig {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .context("PORT not set")?
                .parse()
                .context("PORT must be a valid number")?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").context("DATABASE_URL not set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a valid number")?,
        };

        let redis = RedisConfig {
            url: env::var("REDIS_URL").context("REDIS_URL not set")?,
        };

        let gateway = GatewayConfig {
            secret_key: env::var("GATEWAY_SECRET_KEY").context("GATEWAY_SECRET_KEY not set")?,
            base_url: env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("GATEWAY_TIMEOUT_SECS must be a valid number")?,
        };

        let fees = FeesConfig {
            platform_fee_percent: env_decimal("PLATFORM_FEE_PERCENT", "0.05")?,
            gateway_fee_percent: env_decimal("GATEWAY_FEE_PERCENT", "0.029")?,
            gateway_fee_fixed: env_decimal("GATEWAY_FEE_FIXED", "0.30")?,
        };

        let rate_limit = RateLimitConfig {
            max_attempts: env::var("RATE_LIMIT_ATTEMPTS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("RATE_LIMIT_ATTEMPTS must be a valid number")?,
            window_secs: env::var("RATE_LIMIT_WINDOW")
                .unwrap_or_else(|_| "3600".to_string())
                .parse()
                .context("RATE_LIMIT_WINDOW must be a valid number")?,
        };

        let config = Config {
            server,
            database,
            redis,
            gateway,
            fees,
            rate_limit,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.database.url.trim().is_empty() {
            return Err(anyhow!("DATABASE_URL cannot be empty"));
        }

        if self.redis.url.trim().is_empty() {
            return Err(anyhow!("REDIS_URL cannot be empty"));
        }

        if self.gateway.secret_key.trim().is_empty() {
            return Err(anyhow!("GATEWAY_SECRET_KEY cannot be empty"));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(anyhow!("GATEWAY_TIMEOUT_SECS must be greater than 0"));
        }

        let one = Decimal::ONE;
        for (name, pct) in [
            ("PLATFORM_FEE_PERCENT", self.fees.platform_fee_percent),
            ("GATEWAY_FEE_PERCENT", self.fees.gateway_fee_percent),
        ] {
            if pct < Decimal::ZERO || pct >= one {
                return Err(anyhow!("{} must be in [0, 1), got {}", name, pct));
            }
        }

        if self.fees.gateway_fee_fixed < Decimal::ZERO {
            return Err(anyhow!("GATEWAY_FEE_FIXED cannot be negative"));
        }

        if self.rate_limit.max_attempts == 0 {
            return Err(anyhow!("RATE_LIMIT_ATTEMPTS must be greater than 0"));
        }

        if self.rate_limit.window_secs == 0 {
            return Err(anyhow!("RATE_LIMIT_WINDOW must be greater than 0"));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow!("DATABASE_MAX_CONNECTIONS must be greater than 0"));
        }

        Ok(())
    }
}
