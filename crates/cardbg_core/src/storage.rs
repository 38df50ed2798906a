use async_trait::async_trait;
use crate::types::{CardProfile, ProfileUpdate};
use crate::Result;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Get a profile by id
    async fn get(&self, id: &str) -> Result<Option<CardProfile>>;

    /// Merge the set fields of `update` into the stored profile
    async fn update(&self, id: &str, update: &ProfileUpdate) -> Result<()>;
}
