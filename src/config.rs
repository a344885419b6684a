use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub secure_cookies: bool,
    pub users_file: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub seed_sample_data: bool,
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let session_secret = env_required("ESTOP_SESSION_SECRET")?;

        let url = env_or("DATABASE_URL", "sqlite://estop.db");

        let max_connections: u32 = env_or("ESTOP_DB_MAX_CONNECTIONS", "5")
            .parse()
            .map_err(|e| format!("Invalid ESTOP_DB_MAX_CONNECTIONS: {e}"))?;

        let acquire_timeout_secs: u64 = env_or("ESTOP_DB_ACQUIRE_TIMEOUT_SECS", "10")
            .parse()
            .map_err(|e| format!("Invalid ESTOP_DB_ACQUIRE_TIMEOUT_SECS: {e}"))?;

        let session_ttl_minutes: u64 = env_or("ESTOP_SESSION_TTL_MINUTES", "480")
            .parse()
            .map_err(|e| format!("Invalid ESTOP_SESSION_TTL_MINUTES: {e}"))?;

        let secure_cookies = env_flag("ESTOP_SECURE_COOKIES", true)?;
        let seed_sample_data = env_flag("ESTOP_SEED_SAMPLE_DATA", true)?;

        let users_file = PathBuf::from(env_or("ESTOP_USERS_FILE", "users.json"));

        let host: IpAddr = env_or("ESTOP_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid ESTOP_HOST: {e}"))?;

        let port: u16 = env_or("ESTOP_PORT", "5000")
            .parse()
            .map_err(|e| format!("Invalid ESTOP_PORT: {e}"))?;

        let log_level = env_or("ESTOP_LOG_LEVEL", "info");

        Ok(Config {
            database: DatabaseConfig {
                url,
                max_connections,
                acquire_timeout: Duration::from_secs(acquire_timeout_secs),
            },
            session_secret,
            session_ttl: Duration::from_secs(session_ttl_minutes * 60),
            secure_cookies,
            users_file,
            host,
            port,
            seed_sample_data,
            log_level,
        })
    }
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str, default: bool) -> Result<bool, String> {
    match std::env::var(key) {
        Err(_) => Ok(default),
        Ok(v) => match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(format!("Invalid {key}: expected a boolean, got '{other}'")),
        },
    }
}
