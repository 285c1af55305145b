//! Server-reconciled entity collections.
//!
//! Characters and locations live in plain keyed collections inside the
//! composed state. `EntityStore` holds the reconciliation rules: the remote
//! call always goes first, and local state changes only from what the server
//! returned. A failed call leaves the collection value-identical to its
//! pre-call state, and no locally fabricated id ever enters a collection.

use async_trait::async_trait;
use reverie_api::{
    CharacterPatch, CharacterRecord, Error as ApiError, LocationPatch, LocationRecord,
};
use thiserror::Error;

use crate::remote::Remote;

/// Errors from collection operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no entity with the requested id")]
    UnknownId,

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// A record type managed through the remote CRUD surface.
#[async_trait]
pub trait Stored: Clone + Send + Sync + Sized {
    type Patch: Send + Sync;

    fn id(&self) -> &str;
    fn name(&self) -> &str;

    async fn fetch_all(remote: &dyn Remote) -> Result<Vec<Self>, ApiError>;
    async fn remote_create(remote: &dyn Remote, draft: &Self::Patch) -> Result<Self, ApiError>;
    async fn remote_update(
        remote: &dyn Remote,
        id: &str,
        patch: &Self::Patch,
    ) -> Result<Self, ApiError>;
    async fn remote_delete(remote: &dyn Remote, id: &str) -> Result<(), ApiError>;
}

#[async_trait]
impl Stored for CharacterRecord {
    type Patch = CharacterPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_all(remote: &dyn Remote) -> Result<Vec<Self>, ApiError> {
        remote.characters().await
    }

    async fn remote_create(remote: &dyn Remote, draft: &Self::Patch) -> Result<Self, ApiError> {
        remote.create_character(draft).await
    }

    async fn remote_update(
        remote: &dyn Remote,
        id: &str,
        patch: &Self::Patch,
    ) -> Result<Self, ApiError> {
        remote.update_character(id, patch).await
    }

    async fn remote_delete(remote: &dyn Remote, id: &str) -> Result<(), ApiError> {
        remote.delete_character(id).await
    }
}

#[async_trait]
impl Stored for LocationRecord {
    type Patch = LocationPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_all(remote: &dyn Remote) -> Result<Vec<Self>, ApiError> {
        remote.locations().await
    }

    async fn remote_create(remote: &dyn Remote, draft: &Self::Patch) -> Result<Self, ApiError> {
        remote.create_location(draft).await
    }

    async fn remote_update(
        remote: &dyn Remote,
        id: &str,
        patch: &Self::Patch,
    ) -> Result<Self, ApiError> {
        remote.update_location(id, patch).await
    }

    async fn remote_delete(remote: &dyn Remote, id: &str) -> Result<(), ApiError> {
        remote.delete_location(id).await
    }
}

/// Stateless CRUD reconciliation over a keyed collection.
pub struct EntityStore;

impl EntityStore {
    /// Create via the remote, then append the server-returned entity.
    ///
    /// There is no optimistic insert: the client holds no id until the
    /// server assigns one, so a failure leaves nothing to roll back.
    pub async fn create<T: Stored>(
        remote: &dyn Remote,
        items: &mut Vec<T>,
        draft: &T::Patch,
    ) -> Result<(), StoreError> {
        let created = T::remote_create(remote, draft).await?;
        tracing::debug!("created entity {} ({})", created.name(), created.id());
        items.push(created);
        Ok(())
    }

    /// Update via the remote, then replace the local entity at `id` with
    /// the server's representation. The id must already be present locally.
    pub async fn update<T: Stored>(
        remote: &dyn Remote,
        items: &mut Vec<T>,
        id: &str,
        patch: &T::Patch,
    ) -> Result<(), StoreError> {
        let slot = items
            .iter()
            .position(|entity| entity.id() == id)
            .ok_or(StoreError::UnknownId)?;
        let updated = T::remote_update(remote, id, patch).await?;
        items[slot] = updated;
        Ok(())
    }

    /// Delete via the remote; the local entry is removed only on success.
    pub async fn delete<T: Stored>(
        remote: &dyn Remote,
        items: &mut Vec<T>,
        id: &str,
    ) -> Result<(), StoreError> {
        if !items.iter().any(|entity| entity.id() == id) {
            return Err(StoreError::UnknownId);
        }
        T::remote_delete(remote, id).await?;
        items.retain(|entity| entity.id() != id);
        Ok(())
    }

    /// Replace the whole collection from a fresh remote fetch.
    pub async fn refresh<T: Stored>(
        remote: &dyn Remote,
        items: &mut Vec<T>,
    ) -> Result<(), StoreError> {
        *items = T::fetch_all(remote).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRemote;

    #[tokio::test]
    async fn test_create_appends_server_entity() {
        let remote = MockRemote::new();
        let mut characters: Vec<CharacterRecord> = Vec::new();

        EntityStore::create(&remote, &mut characters, &CharacterPatch::named("Mira"))
            .await
            .unwrap();

        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].name, "Mira");
        // The id came from the server, not from the client.
        assert!(!characters[0].id.is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_leaves_collection_untouched() {
        let remote = MockRemote::new();
        let mut characters: Vec<CharacterRecord> = Vec::new();
        EntityStore::create(&remote, &mut characters, &CharacterPatch::named("Mira"))
            .await
            .unwrap();
        let before = characters.clone();

        remote.go_offline();
        let result =
            EntityStore::create(&remote, &mut characters, &CharacterPatch::named("Orin")).await;

        assert!(matches!(result, Err(StoreError::Api(_))));
        assert_eq!(characters, before);
    }

    #[tokio::test]
    async fn test_update_replaces_with_server_representation() {
        let remote = MockRemote::new();
        let mut characters: Vec<CharacterRecord> = Vec::new();
        EntityStore::create(&remote, &mut characters, &CharacterPatch::named("Mira"))
            .await
            .unwrap();
        let id = characters[0].id.clone();

        let patch = CharacterPatch {
            role: Some("Herbalist".to_string()),
            ..CharacterPatch::default()
        };
        EntityStore::update(&remote, &mut characters, &id, &patch)
            .await
            .unwrap();

        assert_eq!(characters.len(), 1);
        assert_eq!(characters[0].role.as_deref(), Some("Herbalist"));
        assert_eq!(characters[0].name, "Mira");
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_value() {
        let remote = MockRemote::new();
        let mut characters: Vec<CharacterRecord> = Vec::new();
        EntityStore::create(&remote, &mut characters, &CharacterPatch::named("Mira"))
            .await
            .unwrap();
        let id = characters[0].id.clone();
        let before = characters.clone();

        remote.go_offline();
        let patch = CharacterPatch {
            role: Some("Herbalist".to_string()),
            ..CharacterPatch::default()
        };
        let result = EntityStore::update(&remote, &mut characters, &id, &patch).await;

        assert!(matches!(result, Err(StoreError::Api(_))));
        assert_eq!(characters, before);
    }

    #[tokio::test]
    async fn test_update_unknown_id_rejected_before_remote_call() {
        let remote = MockRemote::new();
        let mut characters: Vec<CharacterRecord> = Vec::new();

        let result = EntityStore::update(
            &remote,
            &mut characters,
            "character-999",
            &CharacterPatch::named("Ghost"),
        )
        .await;

        assert!(matches!(result, Err(StoreError::UnknownId)));
        assert!(remote.characters_snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_only_on_success() {
        let remote = MockRemote::new();
        let mut locations: Vec<LocationRecord> = Vec::new();
        EntityStore::create(&remote, &mut locations, &LocationPatch::named("The Docks"))
            .await
            .unwrap();
        let id = locations[0].id.clone();

        remote.go_offline();
        let result = EntityStore::delete(&remote, &mut locations, &id).await;
        assert!(matches!(result, Err(StoreError::Api(_))));
        assert_eq!(locations.len(), 1);

        remote.go_online();
        EntityStore::delete(&remote, &mut locations, &id)
            .await
            .unwrap();
        assert!(locations.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_collection() {
        let remote = MockRemote::new();
        remote.set_locations(vec![
            LocationRecord {
                id: "docks".to_string(),
                name: "The Docks".to_string(),
                kind: None,
                district: None,
                description: None,
                atmosphere: None,
                notable_features: None,
                npcs_present: None,
                image_url: None,
            },
        ]);

        let mut locations: Vec<LocationRecord> = Vec::new();
        EntityStore::refresh(&remote, &mut locations).await.unwrap();

        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].id, "docks");
    }
}
