use std::sync::Arc;

use futures::stream::StreamExt;
use log::{debug, warn, Logger};
use tokio::time::{timeout_at, Instant};

use crate::coordinates::Coordinates;
use crate::environment::{Config, Environment, MalformedRecords, SafeDb};
use crate::errors::{BackendError, DbError, ValidationError};
use crate::whisper::Whisper;

/// Finds eligible whispers within a radius of a point by scanning the
/// whole repository.
pub struct ProximityQuery {
    logger: Arc<Logger>,
    db: Arc<SafeDb>,
    config: Config,
}

impl ProximityQuery {
    pub fn new(environment: &Environment) -> Self {
        ProximityQuery {
            logger: environment.logger.clone(),
            db: environment.db.clone(),
            config: environment.config,
        }
    }

    /// Parses the query parameters and runs the scan. A bad location
    /// fails before the repository is touched; a missing or bad radius
    /// falls back to the configured default.
    pub async fn find_nearby(
        &self,
        location: &str,
        radius: Option<&str>,
    ) -> Result<Vec<Whisper>, BackendError> {
        let origin: Coordinates = location
            .parse()
            .map_err(|e| ValidationError::new("location", format!("{:?}: {}", location, e)))?;

        let radius = self.resolve_radius(radius);

        self.scan(origin, radius).await
    }

    /// Streams every whisper and keeps those within `radius` of `origin`
    /// that still have listens left, in repository order.
    pub async fn scan(&self, origin: Coordinates, radius: f64) -> Result<Vec<Whisper>, BackendError> {
        let deadline = Instant::now() + self.config.query_timeout;
        let mut whispers = self.db.iterate_all();
        let mut admitted = vec![];

        debug!(self.logger, "Scanning whispers..."; "origin" => %origin, "radius" => radius);

        loop {
            let next = match timeout_at(deadline, whispers.next()).await {
                Ok(next) => next,
                Err(_) => return Err(BackendError::Query(DbError::TimedOut)),
            };

            let whisper = match next {
                None => break,
                Some(Ok(whisper)) => whisper,
                Some(Err(DbError::MalformedRecord { id, reason }))
                    if self.config.malformed_records == MalformedRecords::Skip =>
                {
                    warn!(self.logger, "Skipping malformed whisper"; "id" => %id, "reason" => reason);
                    continue;
                }
                Some(Err(e)) => return Err(BackendError::Query(e)),
            };

            if admits(&whisper, &origin, radius) {
                admitted.push(whisper);
            }
        }

        debug!(self.logger, "Scan complete"; "admitted" => admitted.len());

        Ok(admitted)
    }

    fn resolve_radius(&self, raw: Option<&str>) -> f64 {
        let raw = match raw {
            Some(raw) => raw,
            None => return self.config.default_radius,
        };

        match raw.trim().parse::<f64>() {
            Ok(radius) if radius.is_finite() && radius > 0.0 => radius,
            _ => {
                warn!(self.logger, "Ignoring invalid radius"; "radius" => raw, "default" => self.config.default_radius);
                self.config.default_radius
            }
        }
    }
}

/// The admission rule: inside the radius (boundary included) and with
/// listens left.
pub fn admits(whisper: &Whisper, origin: &Coordinates, radius: f64) -> bool {
    whisper.location().distance_to(origin) <= radius && whisper.is_eligible()
}
