//! Tri-state result envelope emitted by every reconciliation stream.

use std::sync::Arc;

use serde::Serialize;

use crate::repository::RepositoryError;

/// One emission of a reconciliation stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Resource<T> {
    /// Work started, nothing to show yet.
    Loading,
    /// Data to display.
    Success { data: T },
    /// Nothing (more) to display.
    Error {
        message: String,
        #[serde(skip_serializing)]
        cause: Option<Arc<RepositoryError>>,
    },
}

impl<T> Resource<T> {
    pub fn success(data: T) -> Self {
        Resource::Success { data }
    }

    /// Error envelope whose message is the cause's display text.
    pub fn from_error(cause: RepositoryError) -> Self {
        Resource::Error {
            message: cause.to_string(),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Resource::Loading)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Resource::Success { .. })
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Resource::Error { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Resource::Success { data } => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Resource::Success { data } => Some(data),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Resource::Error { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn cause(&self) -> Option<&RepositoryError> {
        match self {
            Resource::Error { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resource<U> {
        match self {
            Resource::Loading => Resource::Loading,
            Resource::Success { data } => Resource::Success { data: f(data) },
            Resource::Error { message, cause } => Resource::Error { message, cause },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let loading: Resource<Vec<i32>> = Resource::Loading;
        assert!(loading.is_loading());
        assert!(loading.data().is_none());

        let ok = Resource::success(vec![1, 2]);
        assert!(ok.is_success());
        assert_eq!(ok.data(), Some(&vec![1, 2]));

        let err: Resource<Vec<i32>> = Resource::from_error(RepositoryError::NoConnectivityAndNoCache);
        assert!(err.is_error());
        assert_eq!(err.error_message(), Some("no connection and no cached data"));
        assert!(matches!(
            err.cause(),
            Some(RepositoryError::NoConnectivityAndNoCache)
        ));
    }

    #[test]
    fn test_map_keeps_variant() {
        let ok = Resource::success(2).map(|n| n * 10);
        assert_eq!(ok.into_data(), Some(20));

        let err: Resource<i32> = Resource::from_error(RepositoryError::NoConnectivityLimitedResults);
        let mapped = err.map(|n| n.to_string());
        assert_eq!(mapped.error_message(), Some("offline, results may be limited"));
    }

    #[test]
    fn test_serialization_is_tagged() {
        let ok = serde_json::to_value(Resource::success(vec!["a"])).unwrap();
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["data"][0], "a");

        let loading = serde_json::to_value(Resource::<Vec<String>>::Loading).unwrap();
        assert_eq!(loading["status"], "loading");

        let err = serde_json::to_value(Resource::<()>::from_error(
            RepositoryError::NoConnectivityAndNoCache,
        ))
        .unwrap();
        assert_eq!(err["status"], "error");
        assert_eq!(err["message"], "no connection and no cached data");
        assert!(err.get("cause").is_none());
    }
}
