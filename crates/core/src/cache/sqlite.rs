//! SQLite-backed cache implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};

use super::{CacheError, MovieCache, SearchHistoryStore, SearchRecord};
use crate::movie::{CachedMovie, Movie};

const MOVIE_COLUMNS: &str = "id, title, overview, poster_path, backdrop_path, release_date,
     vote_average, vote_count, popularity, original_language, original_title,
     is_trending, cached_at";

/// SQLite-backed movie and search-history cache.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open the cache, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            -- Cached movies (one row per TMDB id)
            CREATE TABLE IF NOT EXISTS movies (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                overview TEXT NOT NULL,
                poster_path TEXT,
                backdrop_path TEXT,
                release_date TEXT,
                vote_average REAL NOT NULL DEFAULT 0,
                vote_count INTEGER NOT NULL DEFAULT 0,
                popularity REAL NOT NULL DEFAULT 0,
                original_language TEXT,
                original_title TEXT,
                is_trending INTEGER NOT NULL DEFAULT 0,
                cached_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_movies_trending ON movies(is_trending, popularity);
            CREATE INDEX IF NOT EXISTS idx_movies_cached_at ON movies(cached_at);

            -- Recent search queries
            CREATE TABLE IF NOT EXISTS search_history (
                query TEXT PRIMARY KEY,
                searched_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_search_history_searched_at ON search_history(searched_at);
            "#,
        )?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Internal("cache connection lock poisoned".to_string()))
    }

    fn row_to_cached_movie(row: &rusqlite::Row) -> rusqlite::Result<CachedMovie> {
        let cached_at_ms: i64 = row.get(12)?;
        let cached_at = DateTime::from_timestamp_millis(cached_at_ms).unwrap_or_else(Utc::now);

        Ok(CachedMovie {
            movie: Movie {
                id: row.get(0)?,
                title: row.get(1)?,
                overview: row.get(2)?,
                poster_path: row.get(3)?,
                backdrop_path: row.get(4)?,
                release_date: row.get(5)?,
                vote_average: row.get(6)?,
                vote_count: row.get(7)?,
                popularity: row.get(8)?,
                original_language: row.get(9)?,
                original_title: row.get(10)?,
            },
            is_trending: row.get(11)?,
            cached_at,
        })
    }

    fn row_to_search_record(row: &rusqlite::Row) -> rusqlite::Result<SearchRecord> {
        let searched_at_ms: i64 = row.get(1)?;
        Ok(SearchRecord {
            query: row.get(0)?,
            searched_at: DateTime::from_timestamp_millis(searched_at_ms).unwrap_or_else(Utc::now),
        })
    }

    fn query_movies(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CachedMovie>, CacheError> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, Self::row_to_cached_movie)?;

        let mut movies = Vec::new();
        for row in rows {
            movies.push(row?);
        }
        Ok(movies)
    }

    fn upsert_movies(tx: &Transaction, movies: &[CachedMovie]) -> Result<(), CacheError> {
        let mut stmt = tx.prepare(&format!(
            "INSERT OR REPLACE INTO movies ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            MOVIE_COLUMNS
        ))?;

        for cached in movies {
            let m = &cached.movie;
            stmt.execute(params![
                m.id,
                &m.title,
                &m.overview,
                &m.poster_path,
                &m.backdrop_path,
                &m.release_date,
                m.vote_average,
                m.vote_count,
                m.popularity,
                &m.original_language,
                &m.original_title,
                cached.is_trending,
                cached.cached_at.timestamp_millis(),
            ])?;
        }
        Ok(())
    }

    fn upsert_search(conn: &Connection, record: &SearchRecord) -> Result<(), CacheError> {
        conn.execute(
            "INSERT OR REPLACE INTO search_history (query, searched_at) VALUES (?, ?)",
            params![&record.query, record.searched_at.timestamp_millis()],
        )?;
        Ok(())
    }

    /// Ties on `searched_at` go to the most recently inserted row: a replaced
    /// row is re-inserted with a fresh rowid.
    fn trim_history(conn: &Connection, keep: usize) -> Result<usize, CacheError> {
        let removed = conn.execute(
            "DELETE FROM search_history
             WHERE query NOT IN (
                 SELECT query FROM search_history
                 ORDER BY searched_at DESC, rowid DESC
                 LIMIT ?
             )",
            params![keep as i64],
        )?;
        Ok(removed)
    }
}

/// Escape LIKE wildcards so user text matches literally (used with `ESCAPE '\'`).
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl MovieCache for SqliteCache {
    fn get_trending(&self) -> Result<Vec<CachedMovie>, CacheError> {
        let conn = self.conn()?;
        Self::query_movies(
            &conn,
            &format!(
                "SELECT {} FROM movies WHERE is_trending = 1 ORDER BY popularity DESC",
                MOVIE_COLUMNS
            ),
            [],
        )
    }

    fn get_by_id(&self, id: i64) -> Result<Option<CachedMovie>, CacheError> {
        let conn = self.conn()?;
        let result = conn.query_row(
            &format!("SELECT {} FROM movies WHERE id = ?", MOVIE_COLUMNS),
            params![id],
            Self::row_to_cached_movie,
        );

        match result {
            Ok(movie) => Ok(Some(movie)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn search_by_title(&self, text: &str) -> Result<Vec<CachedMovie>, CacheError> {
        let conn = self.conn()?;
        let pattern = format!("%{}%", escape_like(text));
        Self::query_movies(
            &conn,
            &format!(
                "SELECT {} FROM movies WHERE title LIKE ?1 ESCAPE '\\' ORDER BY popularity DESC",
                MOVIE_COLUMNS
            ),
            params![&pattern],
        )
    }

    fn insert_all(&self, movies: &[CachedMovie]) -> Result<(), CacheError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        Self::upsert_movies(&tx, movies)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_trending(&self) -> Result<usize, CacheError> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM movies WHERE is_trending = 1", [])?;
        Ok(removed)
    }

    fn replace_trending(&self, movies: &[CachedMovie]) -> Result<(), CacheError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM movies WHERE is_trending = 1", [])?;
        Self::upsert_movies(&tx, movies)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_all(&self) -> Result<(), CacheError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM movies", [])?;
        Ok(())
    }

    fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, CacheError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM movies WHERE cached_at < ?",
            params![cutoff.timestamp_millis()],
        )?;
        Ok(removed)
    }

    fn count(&self) -> Result<u64, CacheError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM movies", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl SearchHistoryStore for SqliteCache {
    fn recent(&self, limit: usize) -> Result<Vec<SearchRecord>, CacheError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT query, searched_at FROM search_history
             ORDER BY searched_at DESC, rowid DESC
             LIMIT ?",
        )?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_search_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn insert(&self, record: &SearchRecord) -> Result<(), CacheError> {
        let conn = self.conn()?;
        Self::upsert_search(&conn, record)
    }

    fn insert_and_trim(&self, record: &SearchRecord, keep: usize) -> Result<(), CacheError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        Self::upsert_search(&tx, record)?;
        Self::trim_history(&tx, keep)?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, query: &str) -> Result<(), CacheError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM search_history WHERE query = ?", params![query])?;
        Ok(())
    }

    fn delete_all(&self) -> Result<(), CacheError> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM search_history", [])?;
        Ok(())
    }

    fn trim_to_most_recent(&self, keep: usize) -> Result<usize, CacheError> {
        let conn = self.conn()?;
        Self::trim_history(&conn, keep)
    }
}
