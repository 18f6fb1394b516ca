// src/config.rs

use dotenvy::dotenv;
use std::env;

/// Leaderboard page size when the caller passes no limit.
pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 50;
/// Hard cap on a single leaderboard read.
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            database_url,
            rust_log,
        }
    }
}
