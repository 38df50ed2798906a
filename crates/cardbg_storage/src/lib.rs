use std::path::Path;
use std::sync::Arc;
use cardbg_core::{Error, ProfileStore, Result};

pub mod backends;

pub use backends::*;

pub const AVAILABLE_BACKENDS: &[&str] = &["memory", "sqlite"];

/// Opens the named profile store backend.
///
/// `database` is only read by the `sqlite` backend; when it is absent the
/// database lives in memory for the lifetime of the process.
pub async fn create_store(backend: &str, database: Option<&Path>) -> Result<Arc<dyn ProfileStore>> {
    match backend {
        "memory" => Ok(Arc::new(InMemoryProfileStore::new())),
        #[cfg(feature = "sqlite")]
        "sqlite" => {
            let store = match database {
                Some(path) => SqliteProfileStore::open(path).await?,
                None => SqliteProfileStore::in_memory().await?,
            };
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "sqlite"))]
        "sqlite" => {
            let _ = database;
            Err(Error::Validation(
                "sqlite storage requires building with the `sqlite` feature".to_string(),
            ))
        }
        other => Err(Error::Validation(format!(
            "unknown storage backend {:?}, expected one of {}",
            other,
            AVAILABLE_BACKENDS.join(", ")
        ))),
    }
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::create_store;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_memory_store() {
        let store = create_store("memory", None).await.unwrap();
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_backend_is_rejected() {
        let err = create_store("qdrant", None).await.err().unwrap();
        assert!(matches!(err, Error::Validation(_)));
    }
}
