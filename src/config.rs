use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings, read once at startup from the environment (a `.env`
/// file is honored when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub media_root: PathBuf,
    pub posts_per_page: i64,
    pub cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> AppConfig {
        dotenvy::dotenv().ok();
        AppConfig {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "yatube.sqlite3".to_string()),
            media_root: env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
            posts_per_page: env::var("POSTS_PER_PAGE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            cache_ttl: Duration::from_secs(
                env::var("CACHE_TTL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            ),
        }
    }
}
