use futures::future::BoxFuture;
use futures::stream::BoxStream;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::coordinates::Coordinates;
use crate::errors::DbError;
use crate::whisper::{DataType, NewWhisper, Whisper};

pub mod memory;

/// Persistent storage for whispers.
pub trait Db {
    /// Stores a new whisper and returns it with its assigned ID.
    fn insert(&self, whisper: NewWhisper) -> BoxFuture<Result<Whisper, DbError>>;

    /// Looks up a single whisper.
    fn find_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Whisper>, DbError>>;

    /// Streams every whisper. Each call opens a fresh cursor. Rows that
    /// can't be read come through as `DbError::MalformedRecord` items
    /// without ending the stream.
    fn iterate_all(&self) -> BoxStream<Result<Whisper, DbError>>;
}

pub use self::postgres::*;

/// A whisper as it sits in storage, before its columns are checked.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RawWhisper {
    pub id: Uuid,
    pub location: String,
    pub data_type: String,
    pub data: Option<String>,
    pub media_url: Option<String>,
    pub max_listens: i32,
    pub amount_listens: i32,
    pub emotions: Vec<String>,
    pub created_at: OffsetDateTime,
}

impl RawWhisper {
    /// The columns that would be written for a new whisper.
    pub fn from_new(id: Uuid, created_at: OffsetDateTime, whisper: &NewWhisper) -> Self {
        RawWhisper {
            id,
            location: whisper.location().to_string(),
            data_type: whisper.payload().data_type().as_str().to_owned(),
            data: whisper.payload().data().map(str::to_owned),
            media_url: whisper.payload().media_url().map(Url::to_string),
            max_listens: whisper.max_listens(),
            amount_listens: 0,
            emotions: whisper.emotions().to_vec(),
            created_at,
        }
    }

    /// Checks the columns and builds the whisper they describe.
    pub fn decode(self) -> Result<Whisper, DbError> {
        let id = self.id;
        let malformed = |reason: String| DbError::MalformedRecord { id, reason };

        let location: Coordinates = self
            .location
            .parse()
            .map_err(|e| malformed(format!("location {:?}: {}", self.location, e)))?;

        let data_type: DataType = self
            .data_type
            .parse()
            .map_err(|e| malformed(format!("{}", e)))?;

        let (data, media_url) = match data_type {
            DataType::Text => match self.data {
                Some(data) if !data.is_empty() => (Some(data), None),
                _ => return Err(malformed("text whisper without data".to_owned())),
            },
            DataType::Image | DataType::Video => {
                let raw_url = self
                    .media_url
                    .ok_or_else(|| malformed("media whisper without URL".to_owned()))?;
                let url = Url::parse(&raw_url)
                    .map_err(|e| malformed(format!("media URL {:?}: {}", raw_url, e)))?;

                (None, Some(url))
            }
        };

        if self.amount_listens < 0 {
            return Err(malformed(format!(
                "negative listen count {}",
                self.amount_listens
            )));
        }

        Ok(Whisper {
            id,
            location,
            data_type,
            data,
            media_url,
            max_listens: self.max_listens,
            amount_listens: self.amount_listens,
            emotions: self.emotions,
            created_at: self.created_at,
        })
    }
}

mod postgres {
    use futures::future::BoxFuture;
    use futures::stream::BoxStream;
    use futures::{FutureExt, StreamExt};
    use sqlx::{self, postgres::PgPool};
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::RawWhisper;
    use crate::errors::DbError;
    use crate::whisper::{NewWhisper, Whisper};

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn insert(&self, whisper: NewWhisper) -> BoxFuture<Result<Whisper, DbError>> {
            async move {
                let query = sqlx::query_as(include_str!("queries/create.sql"));

                let (id, created_at): (Uuid, OffsetDateTime) = query
                    .bind(whisper.location().to_string())
                    .bind(whisper.payload().data_type().as_str())
                    .bind(whisper.payload().data().map(str::to_owned))
                    .bind(whisper.payload().media_url().map(|u| u.to_string()))
                    .bind(whisper.max_listens())
                    .bind(whisper.emotions().to_vec())
                    .fetch_one(&self.pool)
                    .await?;

                Ok(whisper.persisted(id, created_at))
            }
            .boxed()
        }

        fn find_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Whisper>, DbError>> {
            let id = *id;

            async move {
                let query =
                    sqlx::query_as::<_, RawWhisper>(include_str!("queries/retrieve.sql"));

                let raw = query.bind(id).fetch_optional(&self.pool).await?;

                raw.map(RawWhisper::decode).transpose()
            }
            .boxed()
        }

        fn iterate_all(&self) -> BoxStream<Result<Whisper, DbError>> {
            sqlx::query_as::<_, RawWhisper>(include_str!("queries/retrieve_all.sql"))
                .fetch(&self.pool)
                .map(|row| row.map_err(DbError::from).and_then(RawWhisper::decode))
                .boxed()
        }
    }
}
