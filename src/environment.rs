use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::Logger;

use crate::db::Db;
use crate::store::Store;
use crate::urls::Urls;

pub type SafeDb = dyn Db + Send + Sync;
pub type SafeStore = dyn Store + Send + Sync;

/// Everything a request handler needs, cloned into every route.
#[derive(Clone)]
pub struct Environment {
    pub logger: Arc<Logger>,
    pub db: Arc<SafeDb>,
    pub urls: Arc<Urls>,
    pub store: Arc<SafeStore>,
    pub config: Config,
}

impl Environment {
    pub fn new(
        logger: Arc<Logger>,
        db: Arc<SafeDb>,
        urls: Arc<Urls>,
        store: Arc<SafeStore>,
        config: Config,
    ) -> Self {
        Self {
            logger,
            db,
            urls,
            store,
            config,
        }
    }
}

/// What to do with a stored whisper that can't be read during a scan.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MalformedRecords {
    /// Log a warning and leave it out of the results.
    Skip,

    /// Abort the whole scan.
    Fail,
}

impl FromStr for MalformedRecords {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(MalformedRecords::Skip),
            "fail" => Ok(MalformedRecords::Fail),
            other => Err(format!("expected 'skip' or 'fail', got {:?}", other)),
        }
    }
}

/// Policy knobs for ingestion and retrieval.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// The radius used when a proximity query has none or an invalid one.
    pub(crate) default_radius: f64,

    /// The budget for all I/O of one ingestion.
    pub(crate) ingestion_timeout: Duration,

    /// The budget for a proximity scan or a lookup.
    pub(crate) query_timeout: Duration,

    /// Whether a whisper must carry at least one emotion.
    pub(crate) require_emotions: bool,

    pub(crate) malformed_records: MalformedRecords,
}

impl Config {
    pub fn new(
        default_radius: f64,
        ingestion_timeout: Duration,
        query_timeout: Duration,
        require_emotions: bool,
        malformed_records: MalformedRecords,
    ) -> Self {
        Self {
            default_radius,
            ingestion_timeout,
            query_timeout,
            require_emotions,
            malformed_records,
        }
    }

    /// Reads the configuration from `WHISPR_*` environment variables,
    /// using the defaults for anything unset.
    pub fn from_env() -> Self {
        use crate::config::{parse_flag_or, parse_variable_or};

        let defaults = Config::default();

        let default_radius: f64 = parse_variable_or("WHISPR_DEFAULT_RADIUS", defaults.default_radius);
        assert!(
            default_radius.is_finite() && default_radius > 0.0,
            "WHISPR_DEFAULT_RADIUS must be a positive number"
        );

        Config::new(
            default_radius,
            Duration::from_secs(parse_variable_or(
                "WHISPR_INGESTION_TIMEOUT_SECONDS",
                defaults.ingestion_timeout.as_secs(),
            )),
            Duration::from_secs(parse_variable_or(
                "WHISPR_QUERY_TIMEOUT_SECONDS",
                defaults.query_timeout.as_secs(),
            )),
            parse_flag_or("WHISPR_REQUIRE_EMOTIONS", defaults.require_emotions),
            parse_variable_or("WHISPR_MALFORMED_RECORDS", defaults.malformed_records),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new(
            5000.0,
            Duration::from_secs(90),
            Duration::from_secs(10),
            true,
            MalformedRecords::Skip,
        )
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::{BoxFuture, FutureExt};
    use futures::stream::{BoxStream, StreamExt};
    use tokio::time::sleep;
    use url::{ParseError, Url};
    use uuid::Uuid;

    use super::{Config, Environment, SafeDb, SafeStore};
    use crate::db::memory::MemoryDb;
    use crate::db::Db;
    use crate::errors::{DbError, StoreError};
    use crate::store::memory::MemoryStore;
    use crate::store::{Store, StoredObject};
    use crate::urls::Urls;
    use crate::whisper::{NewWhisper, Whisper};

    pub(crate) const STORE_BASE_URL: &str = "http://localhost:9000/";

    /// An environment backed by in-memory collaborators, returned along
    /// with handles to them.
    pub(crate) fn in_memory(config: Config) -> (Environment, Arc<MemoryDb>, Arc<MemoryStore>) {
        let db = Arc::new(MemoryDb::new());
        let store = memory_store();

        let environment = with_collaborators(db.clone(), store.clone(), config);

        (environment, db, store)
    }

    pub(crate) fn memory_store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(
            "whispers",
            Url::parse(STORE_BASE_URL).expect("parse store URL"),
        ))
    }

    pub(crate) fn with_collaborators(
        db: Arc<SafeDb>,
        store: Arc<SafeStore>,
        config: Config,
    ) -> Environment {
        let urls = Urls::new(Url::parse("https://www.example.com/").expect("parse base URL"))
            .expect("build URLs");

        Environment::new(Arc::new(log::discard()), db, Arc::new(urls), store, config)
    }

    /// Wraps a collaborator so every operation takes `delay` longer.
    /// Writes land before the delay, as if only the acknowledgement
    /// were slow.
    pub(crate) struct Slow<T> {
        pub(crate) inner: Arc<T>,
        pub(crate) delay: Duration,
    }

    impl<T> Slow<T> {
        pub(crate) fn new(inner: Arc<T>, delay: Duration) -> Arc<Self> {
            Arc::new(Slow { inner, delay })
        }
    }

    impl Db for Slow<MemoryDb> {
        fn insert(&self, whisper: NewWhisper) -> BoxFuture<Result<Whisper, DbError>> {
            async move {
                let result = self.inner.insert(whisper).await;
                sleep(self.delay).await;
                result
            }
            .boxed()
        }

        fn find_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Whisper>, DbError>> {
            let id = *id;

            async move {
                sleep(self.delay).await;
                self.inner.find_by_id(&id).await
            }
            .boxed()
        }

        fn iterate_all(&self) -> BoxStream<Result<Whisper, DbError>> {
            let delay = self.delay;

            self.inner
                .iterate_all()
                .then(move |row| async move {
                    sleep(delay).await;
                    row
                })
                .boxed()
        }
    }

    impl Store for Slow<MemoryStore> {
        fn bucket(&self) -> &str {
            self.inner.bucket()
        }

        fn delete(&self, object_name: &str) -> BoxFuture<Result<(), StoreError>> {
            self.inner.delete(object_name)
        }

        fn get_url(&self, object_name: &str) -> Result<Url, ParseError> {
            self.inner.get_url(object_name)
        }

        fn save(
            &self,
            object_name: &str,
            content_type: &str,
            raw: Vec<u8>,
        ) -> BoxFuture<Result<StoredObject, StoreError>> {
            let object_name = object_name.to_owned();
            let content_type = content_type.to_owned();

            async move {
                sleep(self.delay).await;
                self.inner.save(&object_name, &content_type, raw).await
            }
            .boxed()
        }
    }
}
