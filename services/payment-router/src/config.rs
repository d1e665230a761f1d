use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub processors: ProcessorConfig,
    pub dispatcher: DispatcherConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProcessorConfig {
    pub primary_url: String,
    pub secondary_url: String,
    pub timeout_ms: u64, // Per call; an unresponsive processor must not stall dispatch
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DispatcherConfig {
    pub batch_size: usize,
    pub poll_interval_ms: u64,
    pub startup_delay_ms: u64,
    pub cooldown_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            batch_size: 250,
            poll_interval_ms: 10,
            startup_delay_ms: 250,
            cooldown_secs: payment_queue::store::ttl::COOLDOWN,
        }
    }
}

impl DispatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

impl ProcessorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let dispatcher = DispatcherConfig::default();

        let mut builder = config::Config::builder()
            // Start with default configuration
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 9999)?
            .set_default("server.workers", 2)?
            .set_default("redis.url", "redis://redis:6379")?
            .set_default("processors.primary_url", "http://payment-processor-default:8080")?
            .set_default("processors.secondary_url", "http://payment-processor-fallback:8080")?
            .set_default("processors.timeout_ms", 1500)?
            .set_default("dispatcher.batch_size", dispatcher.batch_size as i64)?
            .set_default("dispatcher.poll_interval_ms", dispatcher.poll_interval_ms as i64)?
            .set_default("dispatcher.startup_delay_ms", dispatcher.startup_delay_ms as i64)?
            .set_default("dispatcher.cooldown_secs", dispatcher.cooldown_secs as i64)?;

        // Add environment-specific config file if it exists
        if let Ok(config_file) = env::var("CONFIG_FILE") {
            builder = builder.add_source(File::with_name(&config_file).required(false));
        } else {
            builder = builder.add_source(
                File::with_name(&format!("config/{}", environment)).required(false),
            );
        }

        // Override with environment variables
        builder = builder.add_source(Environment::with_prefix("PAYMENT_ROUTER").separator("__"));

        // Special handling for common env vars
        if let Ok(redis_url) = env::var("REDIS_URL") {
            builder = builder.set_override("redis.url", redis_url)?;
        }

        if let Ok(url) = env::var("PRIMARY_PROCESSOR_URL") {
            builder = builder.set_override("processors.primary_url", url)?;
        }

        if let Ok(url) = env::var("SECONDARY_PROCESSOR_URL") {
            builder = builder.set_override("processors.secondary_url", url)?;
        }

        if let Ok(port) = env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".to_string());
        }

        if self.server.workers == 0 {
            return Err("At least one HTTP worker is required".to_string());
        }

        if self.redis.url.is_empty() {
            return Err("Redis URL is required".to_string());
        }

        if self.processors.primary_url.is_empty() || self.processors.secondary_url.is_empty() {
            return Err("Both processor URLs are required".to_string());
        }

        if self.processors.timeout_ms == 0 {
            return Err("Processor timeout must be greater than 0".to_string());
        }

        if self.dispatcher.batch_size == 0 {
            return Err("Dispatcher batch size must be greater than 0".to_string());
        }

        Ok(())
    }
}
