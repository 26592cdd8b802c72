use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string (queue transport)
    pub redis_url: String,

    /// Socket address the API server binds to (default: 0.0.0.0:8080)
    pub api_bind_addr: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 10)
    pub db_max_connections: u32,

    /// Name of the Redis list used as the durable notification queue
    pub queue_name: String,

    /// Blocking receive timeout for the worker, in seconds (default: 5)
    pub worker_poll_timeout_secs: u64,

    /// Per-send timeout in milliseconds. `0` disables the timeout.
    pub send_timeout_ms: u64,

    /// Telegram bot token
    pub telegram_bot_token: Option<String>,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            api_bind_addr: std::env::var("API_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            queue_name: std::env::var("QUEUE_NAME")
                .unwrap_or_else(|_| "notifyhub_queue".to_string()),
            worker_poll_timeout_secs: std::env::var("WORKER_POLL_TIMEOUT_SECS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("WORKER_POLL_TIMEOUT_SECS must be a valid u64"))?,
            send_timeout_ms: std::env::var("SEND_TIMEOUT_MS")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SEND_TIMEOUT_MS must be a valid u64"))?,
            telegram_bot_token: non_empty_var("TELEGRAM_BOT_TOKEN"),
            resend_api_key: non_empty_var("RESEND_API_KEY"),
            email_from: non_empty_var("EMAIL_FROM"),
        })
    }

    /// Per-send timeout, or `None` when disabled.
    pub fn send_timeout(&self) -> Option<std::time::Duration> {
        (self.send_timeout_ms > 0).then(|| std::time::Duration::from_millis(self.send_timeout_ms))
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
