//! Durable local cache for movies and recent searches.
//!
//! Movies live in two logical partitions of one table: the trending list
//! (`is_trending = 1`), replaced wholesale on every successful refresh, and
//! everything else (search results), upserted by id.

mod sqlite;
mod types;

pub use sqlite::SqliteCache;
pub use types::*;

use chrono::{DateTime, Utc};

use crate::movie::CachedMovie;

/// Trait for movie cache storage.
pub trait MovieCache: Send + Sync {
    /// Trending partition, most popular first.
    fn get_trending(&self) -> Result<Vec<CachedMovie>, CacheError>;

    /// Point lookup by movie id.
    fn get_by_id(&self, id: i64) -> Result<Option<CachedMovie>, CacheError>;

    /// Case-insensitive substring match on titles, most popular first.
    fn search_by_title(&self, text: &str) -> Result<Vec<CachedMovie>, CacheError>;

    /// Upsert rows by id. An existing row is replaced wholesale, including
    /// its partition marker.
    fn insert_all(&self, movies: &[CachedMovie]) -> Result<(), CacheError>;

    /// Delete the trending partition. Returns the number of rows removed.
    fn delete_trending(&self) -> Result<usize, CacheError>;

    /// Delete the trending partition and insert `movies` in one transaction.
    fn replace_trending(&self, movies: &[CachedMovie]) -> Result<(), CacheError>;

    /// Delete every cached movie.
    fn delete_all(&self) -> Result<(), CacheError>;

    /// Delete rows cached before `cutoff`. Returns the number of rows removed.
    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError>;

    /// Number of cached movies.
    fn count(&self) -> Result<u64, CacheError>;
}

/// Trait for recent-search storage.
pub trait SearchHistoryStore: Send + Sync {
    /// Most recent searches first, at most `limit`.
    fn recent(&self, limit: usize) -> Result<Vec<SearchRecord>, CacheError>;

    /// Upsert a record by query.
    fn insert(&self, record: &SearchRecord) -> Result<(), CacheError>;

    /// Upsert a record and trim to the `keep` most recent, atomically.
    fn insert_and_trim(&self, record: &SearchRecord, keep: usize) -> Result<(), CacheError>;

    /// Delete a record by exact query. Deleting a missing record is not an error.
    fn delete(&self, query: &str) -> Result<(), CacheError>;

    /// Delete every record.
    fn delete_all(&self) -> Result<(), CacheError>;

    /// Keep only the `keep` most recent records. Returns the number removed.
    fn trim_to_most_recent(&self, keep: usize) -> Result<usize, CacheError>;
}
