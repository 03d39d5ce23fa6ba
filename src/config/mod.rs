use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub http_port: u16,
    pub grpc_port: u16,
    /// Drain window for the HTTP server on shutdown, in seconds
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Worker pool size; 0 falls back to the default (10)
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    /// Probability in [0, 1] that a synthetic delivery attempt fails
    pub failure_rate: f64,
    /// Synthetic processing delay is drawn uniformly from
    /// [min_processing_delay_ms, max_processing_delay_ms)
    pub min_processing_delay_ms: u64,
    pub max_processing_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: "development".to_string(),
            http_port: 8080,
            grpc_port: 50051,
            shutdown_timeout_secs: 10,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            worker_count: 10,
            queue_capacity: 1000,
            max_retries: 3,
            initial_backoff_ms: 100,
            failure_rate: 0.1,
            min_processing_delay_ms: 10,
            max_processing_delay_ms: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        Config {
            app: AppConfig {
                env: std::env::var("APP_ENV").unwrap_or(defaults.app.env),
                http_port: env_or("HTTP_PORT", defaults.app.http_port),
                grpc_port: env_or("GRPC_PORT", defaults.app.grpc_port),
                shutdown_timeout_secs: env_or(
                    "SHUTDOWN_TIMEOUT_SECS",
                    defaults.app.shutdown_timeout_secs,
                ),
            },
            delivery: DeliveryConfig {
                worker_count: env_or("WORKER_COUNT", defaults.delivery.worker_count),
                queue_capacity: env_or("QUEUE_CAPACITY", defaults.delivery.queue_capacity),
                max_retries: env_or("MAX_RETRIES", defaults.delivery.max_retries),
                initial_backoff_ms: env_or(
                    "INITIAL_BACKOFF_MS",
                    defaults.delivery.initial_backoff_ms,
                ),
                failure_rate: env_or("FAILURE_RATE", defaults.delivery.failure_rate),
                min_processing_delay_ms: env_or(
                    "MIN_PROCESSING_DELAY_MS",
                    defaults.delivery.min_processing_delay_ms,
                ),
                max_processing_delay_ms: env_or(
                    "MAX_PROCESSING_DELAY_MS",
                    defaults.delivery.max_processing_delay_ms,
                ),
            },
        }
    }

    /// Seed demo users and posts outside production deployments.
    pub fn seed_demo_data(&self) -> bool {
        self.app.env != "production"
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Invalid value for {}, using default", key);
                default
            }
        },
        Err(_) => default,
    }
}
