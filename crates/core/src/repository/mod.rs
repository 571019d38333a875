//! Cache-reconciliation engine.
//!
//! Every read answers with a stream of [`Resource`] envelopes: `Loading`
//! first, then cached data when there is any, then whatever the network
//! brings. A cache hit always wins over a later network failure.

mod engine;

pub use engine::{MovieRepository, MovieStream, RepositoryConfig};

use thiserror::Error;

use crate::cache::CacheError;
use crate::remote::RemoteError;

/// Why a reconciliation stream ended without (fresh) data.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The remote source failed and nothing local could stand in.
    #[error("{0}")]
    NetworkFailure(#[from] RemoteError),

    /// Offline with an empty trending partition.
    #[error("no connection and no cached data")]
    NoConnectivityAndNoCache,

    /// Offline and the local search found nothing.
    #[error("offline, results may be limited")]
    NoConnectivityLimitedResults,

    /// The local cache failed.
    #[error("cache error: {0}")]
    Storage(#[from] CacheError),
}
