use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, BoxStream, StreamExt};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Db, RawWhisper};
use crate::errors::DbError;
use crate::whisper::{NewWhisper, Whisper};

/// A repository that keeps rows in memory, in insertion order. Used in
/// tests and for running without a database.
pub struct MemoryDb {
    rows: RwLock<Vec<RawWhisper>>,
    scans: AtomicUsize,
    unavailable: AtomicBool,
    scan_breaks_after: AtomicUsize,
}

impl Default for MemoryDb {
    fn default() -> Self {
        MemoryDb {
            rows: RwLock::new(vec![]),
            scans: AtomicUsize::new(0),
            unavailable: AtomicBool::new(false),
            scan_breaks_after: AtomicUsize::new(usize::MAX),
        }
    }
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a row as-is, bypassing every check.
    pub fn insert_raw(&self, row: RawWhisper) {
        self.rows
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// How many times [`Db::iterate_all`] was called.
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }

    /// Makes every following call fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes scans fail after yielding `rows` rows.
    pub fn break_scans_after(&self, rows: usize) {
        self.scan_breaks_after.store(rows, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), DbError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

impl Db for MemoryDb {
    fn insert(&self, whisper: NewWhisper) -> BoxFuture<Result<Whisper, DbError>> {
        async move {
            self.check_available()?;

            let id = Uuid::new_v4();
            let created_at = OffsetDateTime::now_utc();

            self.insert_raw(RawWhisper::from_new(id, created_at, &whisper));

            Ok(whisper.persisted(id, created_at))
        }
        .boxed()
    }

    fn find_by_id(&self, id: &Uuid) -> BoxFuture<Result<Option<Whisper>, DbError>> {
        let id = *id;

        async move {
            self.check_available()?;

            let row = self
                .rows
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .find(|row| row.id == id)
                .cloned();

            row.map(RawWhisper::decode).transpose()
        }
        .boxed()
    }

    fn iterate_all(&self) -> BoxStream<Result<Whisper, DbError>> {
        self.scans.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = self.check_available() {
            return stream::iter(vec![Err(e)]).boxed();
        }

        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner()).clone();
        let breaks_after = self.scan_breaks_after.load(Ordering::SeqCst);

        let mut items: Vec<Result<Whisper, DbError>> = rows
            .into_iter()
            .take(breaks_after)
            .map(RawWhisper::decode)
            .collect();

        if breaks_after != usize::MAX {
            items.push(Err(unavailable()));
        }

        stream::iter(items).boxed()
    }
}

fn unavailable() -> DbError {
    DbError::Unavailable {
        reason: "memory database switched off".to_owned(),
    }
}
