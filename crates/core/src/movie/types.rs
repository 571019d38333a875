use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default TMDB image host used by the URL helpers.
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/";

/// Poster/backdrop size segments understood by the image host.
pub const IMAGE_SIZE_W200: &str = "w200";
pub const IMAGE_SIZE_W500: &str = "w500";
pub const IMAGE_SIZE_ORIGINAL: &str = "original";

/// A movie as shown to the presentation layer.
///
/// Immutable once built; a newer copy from the network replaces the cached
/// record wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    /// TMDB movie ID (primary key in the cache).
    pub id: i64,
    pub title: String,
    pub overview: String,
    /// Poster path fragment, relative to the image base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    /// Backdrop path fragment, relative to the image base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backdrop_path: Option<String>,
    /// Release date (YYYY-MM-DD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub vote_average: f64,
    pub vote_count: i64,
    pub popularity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
}

impl Movie {
    /// Full poster URL for the given size, if the movie has a poster.
    pub fn poster_url(&self, image_base_url: &str, size: &str) -> Option<String> {
        self.poster_path
            .as_ref()
            .map(|p| format!("{}{}{}", image_base_url, size, p))
    }

    /// Full backdrop URL for the given size, if the movie has a backdrop.
    pub fn backdrop_url(&self, image_base_url: &str, size: &str) -> Option<String> {
        self.backdrop_path
            .as_ref()
            .map(|p| format!("{}{}{}", image_base_url, size, p))
    }

    /// Release year taken from the release date.
    pub fn release_year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .filter(|d| d.len() >= 4)
            .map(|d| &d[..4])
    }

    /// Vote average with one decimal, e.g. "8.5".
    pub fn formatted_rating(&self) -> String {
        format!("{:.1}", self.vote_average)
    }
}

/// A movie row in the local cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedMovie {
    pub movie: Movie,
    /// Partition marker: part of the current trending list.
    pub is_trending: bool,
    /// When the row was written.
    pub cached_at: DateTime<Utc>,
}

impl CachedMovie {
    pub fn new(movie: Movie, is_trending: bool, cached_at: DateTime<Utc>) -> Self {
        Self {
            movie,
            is_trending,
            cached_at,
        }
    }
}

/// A movie as returned by the remote source. Numeric fields may be missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDto {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<i64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub original_title: Option<String>,
}

impl MovieDto {
    /// Convert into a cache row stamped with `cached_at`.
    pub fn into_cached(self, is_trending: bool, cached_at: DateTime<Utc>) -> CachedMovie {
        CachedMovie::new(self.into(), is_trending, cached_at)
    }
}

impl From<MovieDto> for Movie {
    fn from(d: MovieDto) -> Self {
        Self {
            id: d.id,
            title: d.title,
            overview: d.overview.unwrap_or_default(),
            poster_path: d.poster_path,
            backdrop_path: d.backdrop_path,
            release_date: d.release_date,
            vote_average: d.vote_average.unwrap_or(0.0),
            vote_count: d.vote_count.unwrap_or(0),
            popularity: d.popularity.unwrap_or(0.0),
            original_language: d.original_language,
            original_title: d.original_title,
        }
    }
}

impl From<CachedMovie> for Movie {
    fn from(c: CachedMovie) -> Self {
        c.movie
    }
}

/// One page of a remote movie listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePage {
    pub page: u32,
    #[serde(default)]
    pub results: Vec<MovieDto>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}
