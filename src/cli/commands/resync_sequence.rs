use anyhow::Result;
use sea_orm::Database;
use tracing::{debug, error, info, trace};

use crate::config::AppConfig;

/// Move the bill number counter up to the highest number already issued.
pub async fn resync_sequence(config: &AppConfig) -> Result<()> {
    trace!("Entering resync_sequence function");
    debug!("Database URL: {}", config.database_url);

    let db = match Database::connect(&config.database_url).await {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to database '{}': {}", config.database_url, e);
            return Err(e.into());
        }
    };

    match billing::resync_sequence(&db).await {
        Ok(next) => {
            info!("Next bill will use sequence {}", next);
            Ok(())
        }
        Err(e) => {
            error!("Failed to resynchronise bill sequence: {}", e);
            Err(e.into())
        }
    }
}
