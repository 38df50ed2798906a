use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use cardbg_core::{CardProfile, Error, ProfileStore, ProfileUpdate, Result};

/// Process-local profile store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, CardProfile>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: impl IntoIterator<Item = CardProfile>) -> Self {
        let map = profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
        Self {
            profiles: Arc::new(RwLock::new(map)),
        }
    }

    /// Inserts or replaces a whole profile.
    pub async fn insert(&self, profile: CardProfile) {
        self.profiles.write().await.insert(profile.id.clone(), profile);
    }

    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, id: &str) -> Result<Option<CardProfile>> {
        Ok(self.profiles.read().await.get(id).cloned())
    }

    async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<()> {
        let mut profiles = self.profiles.write().await;
        let profile = profiles
            .get_mut(id)
            .ok_or_else(|| Error::Persistence(format!("profile {} not found", id)))?;
        update.merge_into(profile);
        profile.updated_at = Some(Utc::now());
        tracing::debug!("💾 Updated profile {} ({})", id, update.fields().join(", "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbg_core::GeneratedImage;

    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn jane() -> CardProfile {
        CardProfile {
            id: "p1".to_string(),
            name: "Jane Doe".to_string(),
            role: "Engineer".to_string(),
            company: "Acme Corp".to_string(),
            email: "jane@example.com".to_string(),
            ..CardProfile::default()
        }
    }

    #[tokio::test]
    async fn test_update_merges_background_only() {
        let store = InMemoryProfileStore::with_profiles([jane()]);
        let image = GeneratedImage::from_data_uri(PNG_URI).unwrap();

        store
            .update("p1", &ProfileUpdate::card_background(&image))
            .await
            .unwrap();

        let profile = store.get("p1").await.unwrap().unwrap();
        assert_eq!(profile.card_background_url.as_deref(), Some(PNG_URI));
        assert_eq!(profile.name, "Jane Doe");
        assert_eq!(profile.company, "Acme Corp");
        assert!(profile.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_update_unknown_profile_fails() {
        let store = InMemoryProfileStore::new();
        let err = store
            .update("missing", &ProfileUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemoryProfileStore::new();
        let other = store.clone();
        store.insert(jane()).await;
        assert_eq!(other.len().await, 1);
        assert!(other.get("p1").await.unwrap().is_some());
    }
}
