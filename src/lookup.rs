use std::sync::Arc;

use log::{debug, Logger};
use tokio::time::timeout;
use uuid::Uuid;

use crate::environment::{Config, Environment, SafeDb};
use crate::errors::{BackendError, DbError, ValidationError};
use crate::whisper::Whisper;

/// Retrieves single whispers by ID.
pub struct Lookup {
    logger: Arc<Logger>,
    db: Arc<SafeDb>,
    config: Config,
}

impl Lookup {
    pub fn new(environment: &Environment) -> Self {
        Lookup {
            logger: environment.logger.clone(),
            db: environment.db.clone(),
            config: environment.config,
        }
    }

    pub async fn get_by_id(&self, raw_id: &str) -> Result<Whisper, BackendError> {
        let id = Uuid::parse_str(raw_id.trim())
            .map_err(|e| ValidationError::new("whisperId", format!("{:?}: {}", raw_id, e)))?;

        debug!(self.logger, "Retrieving whisper..."; "id" => %id);

        let result = match timeout(self.config.query_timeout, self.db.find_by_id(&id)).await {
            Ok(result) => result,
            Err(_) => Err(DbError::TimedOut),
        };

        result
            .map_err(BackendError::Persistence)?
            .ok_or(BackendError::NotFound(id))
    }
}
