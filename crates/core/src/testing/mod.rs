//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the remote source and the
//! connectivity monitor, allowing the reconciliation engine and coordinator
//! to be exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use cinecache_core::testing::{fixtures, MockConnectivity, MockMovieSource};
//!
//! let source = MockMovieSource::new();
//! source.set_trending(vec![fixtures::movie_dto(1, "Dune", 90.0)]).await;
//!
//! let connectivity = MockConnectivity::new(true);
//! connectivity.set_online(false);
//! ```

mod mock_connectivity;
mod mock_movie_source;

pub use mock_connectivity::MockConnectivity;
pub use mock_movie_source::{MockMovieSource, RecordedSourceCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, Utc};

    use crate::movie::{CachedMovie, Movie, MovieDto, MoviePage};

    /// Create a remote movie with reasonable defaults.
    pub fn movie_dto(id: i64, title: &str, popularity: f64) -> MovieDto {
        MovieDto {
            id,
            title: title.to_string(),
            overview: Some(format!("A movie about {}.", title.to_lowercase())),
            poster_path: Some(format!("/poster-{}.jpg", id)),
            backdrop_path: None,
            release_date: Some("2024-06-15".to_string()),
            vote_average: Some(7.5),
            vote_count: Some(1200),
            popularity: Some(popularity),
            original_language: Some("en".to_string()),
            original_title: None,
        }
    }

    /// Create a domain movie with reasonable defaults.
    pub fn movie(id: i64, title: &str, popularity: f64) -> Movie {
        movie_dto(id, title, popularity).into()
    }

    /// Create a cache row.
    pub fn cached_movie(
        id: i64,
        title: &str,
        popularity: f64,
        is_trending: bool,
        cached_at: DateTime<Utc>,
    ) -> CachedMovie {
        CachedMovie::new(movie(id, title, popularity), is_trending, cached_at)
    }

    /// Wrap results in a first page.
    pub fn page(results: Vec<MovieDto>) -> MoviePage {
        let total = results.len() as u32;
        MoviePage {
            page: 1,
            results,
            total_pages: 1,
            total_results: total,
        }
    }
}
