//! Client construction with bounded retry.

use std::time::Duration;

use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use mongodb::{Client, Database};
use tracing::{info, instrument, warn};

use crate::config::MongoConfig;
use crate::error::{MongoError, Result, is_auth_error};

const DEFAULT_DATABASE: &str = "pbcms";
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Delay before retry number `attempt` (1-based): 2^attempt seconds, capped.
pub fn backoff_delay(attempt: u32) -> Duration {
    let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    Duration::from_secs(secs).min(MAX_BACKOFF)
}

/// Connects and pings the server, retrying with exponential backoff.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn connect(config: &MongoConfig) -> Result<Database> {
    let mut options = ClientOptions::parse(&config.url).await?;
    let timeout = Duration::from_millis(config.connect_timeout_ms);
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);
    options.max_pool_size = Some(config.max_pool_size);
    options.app_name = Some("pbcms".to_string());

    let database_name = config
        .database
        .clone()
        .or_else(|| options.default_database.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let client = Client::with_options(options)?;
    let database = client.database(&database_name);

    let attempts = config.connect_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                info!(database = %database_name, "Connected to MongoDB");
                return Ok(database);
            }
            Err(e) if is_auth_error(&e) => return Err(MongoError::Driver(e)),
            Err(e) if attempt >= attempts => {
                return Err(MongoError::Unreachable {
                    attempts,
                    message: e.to_string(),
                });
            }
            Err(e) => {
                let delay = backoff_delay(attempt);
                warn!(
                    attempt,
                    retry_in_secs = delay.as_secs(),
                    error = %e,
                    "MongoDB not reachable, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Masks the password in a connection URL for logging.
pub(crate) fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@')
        && let Some(colon_pos) = url[..at_pos].rfind(':')
    {
        let scheme_end = url.find("://").map(|p| p + 3).unwrap_or(0);
        if colon_pos > scheme_end {
            return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
        }
    }
    url.to_string()
}
