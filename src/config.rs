use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings, read once at startup. Every variable has a default
/// that suits local development, so a bare `cargo run` works.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub trusted_key_prefixes: Vec<String>,
    pub allowed_audiences: Vec<String>,
    pub timestamp_tolerance: Duration,
    pub static_key_url: Option<String>,
    pub static_key_b64: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(8787);

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| {
            let base = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let default_path = base.join("data").join("manhunt.db");
            format!("sqlite://{}", default_path.display())
        });

        // 0 disables the issued-at freshness check entirely.
        let tolerance_secs = env::var("AUTH_TIMESTAMP_TOLERANCE_SECS")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(300);

        Self {
            port,
            database_url,
            trusted_key_prefixes: list_var("AUTH_TRUSTED_KEY_PREFIXES", "https://"),
            allowed_audiences: list_var("AUTH_ALLOWED_AUDIENCES", "manhunt"),
            timestamp_tolerance: Duration::from_secs(tolerance_secs),
            static_key_url: env::var("AUTH_STATIC_KEY_URL").ok(),
            static_key_b64: env::var("AUTH_STATIC_KEY").ok(),
        }
    }
}

fn list_var(name: &str, default: &str) -> Vec<String> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    split_list(&raw)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
