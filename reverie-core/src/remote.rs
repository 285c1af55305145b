//! The remote boundary.
//!
//! Everything the coordinator needs from the backend is expressed as one
//! object-safe trait, so the core depends only on success/failure and the
//! JSON-shaped payloads — never on transport details. `reverie_api::Api` is
//! the production implementation; `testing::MockRemote` is the scripted one.

use async_trait::async_trait;
use reverie_api::{
    Api, CharacterPatch, CharacterRecord, Error as ApiError, GeneratedImage, LocationPatch,
    LocationRecord, NarrativeTurn, ProfileDocument, SessionRecord, TurnRecord,
};

/// Remote operations consumed by the coordinator.
#[async_trait]
pub trait Remote: Send + Sync {
    // Game messaging
    async fn send_message(&self, text: &str) -> Result<NarrativeTurn, ApiError>;
    async fn history(&self) -> Result<Vec<TurnRecord>, ApiError>;

    // Player profile
    async fn player_profile(&self) -> Result<ProfileDocument, ApiError>;
    async fn save_player_profile(&self, content: &str) -> Result<(), ApiError>;
    async fn add_player_note(&self, note: &str) -> Result<(), ApiError>;
    async fn upload_player_image(
        &self,
        image_data: &str,
        mime_type: &str,
    ) -> Result<String, ApiError>;

    // Sessions
    async fn sessions(&self) -> Result<Vec<SessionRecord>, ApiError>;
    async fn current_session(&self) -> Result<SessionRecord, ApiError>;
    async fn create_session(
        &self,
        name: &str,
        participant_name: &str,
        participant_role: &str,
    ) -> Result<SessionRecord, ApiError>;
    async fn activate_session(&self, id: &str) -> Result<SessionRecord, ApiError>;
    async fn delete_session(&self, id: &str) -> Result<(), ApiError>;

    // Characters
    async fn characters(&self) -> Result<Vec<CharacterRecord>, ApiError>;
    async fn create_character(&self, draft: &CharacterPatch) -> Result<CharacterRecord, ApiError>;
    async fn update_character(
        &self,
        id: &str,
        patch: &CharacterPatch,
    ) -> Result<CharacterRecord, ApiError>;
    async fn delete_character(&self, id: &str) -> Result<(), ApiError>;

    // Locations
    async fn locations(&self) -> Result<Vec<LocationRecord>, ApiError>;
    async fn create_location(&self, draft: &LocationPatch) -> Result<LocationRecord, ApiError>;
    async fn update_location(
        &self,
        id: &str,
        patch: &LocationPatch,
    ) -> Result<LocationRecord, ApiError>;
    async fn delete_location(&self, id: &str) -> Result<(), ApiError>;

    // Generation
    async fn generate_character(
        &self,
        name: &str,
        existing: Option<&str>,
    ) -> Result<CharacterPatch, ApiError>;
    async fn generate_location(
        &self,
        name: &str,
        existing: Option<&str>,
    ) -> Result<LocationPatch, ApiError>;
    async fn generate_image(
        &self,
        prompt: &str,
        category: Option<&str>,
        id: Option<&str>,
    ) -> Result<GeneratedImage, ApiError>;
}

#[async_trait]
impl Remote for Api {
    async fn send_message(&self, text: &str) -> Result<NarrativeTurn, ApiError> {
        Api::send_message(self, text).await
    }

    async fn history(&self) -> Result<Vec<TurnRecord>, ApiError> {
        Api::history(self).await
    }

    async fn player_profile(&self) -> Result<ProfileDocument, ApiError> {
        Api::player_profile(self).await
    }

    async fn save_player_profile(&self, content: &str) -> Result<(), ApiError> {
        Api::update_player_profile(self, content).await
    }

    async fn add_player_note(&self, note: &str) -> Result<(), ApiError> {
        Api::add_player_note(self, note).await
    }

    async fn upload_player_image(
        &self,
        image_data: &str,
        mime_type: &str,
    ) -> Result<String, ApiError> {
        Api::upload_player_image(self, image_data, mime_type).await
    }

    async fn sessions(&self) -> Result<Vec<SessionRecord>, ApiError> {
        Api::sessions(self).await
    }

    async fn current_session(&self) -> Result<SessionRecord, ApiError> {
        Api::current_session(self).await
    }

    async fn create_session(
        &self,
        name: &str,
        participant_name: &str,
        participant_role: &str,
    ) -> Result<SessionRecord, ApiError> {
        Api::create_session(self, name, participant_name, participant_role).await
    }

    async fn activate_session(&self, id: &str) -> Result<SessionRecord, ApiError> {
        Api::activate_session(self, id).await
    }

    async fn delete_session(&self, id: &str) -> Result<(), ApiError> {
        Api::delete_session(self, id).await
    }

    async fn characters(&self) -> Result<Vec<CharacterRecord>, ApiError> {
        Api::characters(self).await
    }

    async fn create_character(&self, draft: &CharacterPatch) -> Result<CharacterRecord, ApiError> {
        Api::create_character(self, draft).await
    }

    async fn update_character(
        &self,
        id: &str,
        patch: &CharacterPatch,
    ) -> Result<CharacterRecord, ApiError> {
        Api::update_character(self, id, patch).await
    }

    async fn delete_character(&self, id: &str) -> Result<(), ApiError> {
        Api::delete_character(self, id).await
    }

    async fn locations(&self) -> Result<Vec<LocationRecord>, ApiError> {
        Api::locations(self).await
    }

    async fn create_location(&self, draft: &LocationPatch) -> Result<LocationRecord, ApiError> {
        Api::create_location(self, draft).await
    }

    async fn update_location(
        &self,
        id: &str,
        patch: &LocationPatch,
    ) -> Result<LocationRecord, ApiError> {
        Api::update_location(self, id, patch).await
    }

    async fn delete_location(&self, id: &str) -> Result<(), ApiError> {
        Api::delete_location(self, id).await
    }

    async fn generate_character(
        &self,
        name: &str,
        existing: Option<&str>,
    ) -> Result<CharacterPatch, ApiError> {
        Api::generate_character(self, name, existing).await
    }

    async fn generate_location(
        &self,
        name: &str,
        existing: Option<&str>,
    ) -> Result<LocationPatch, ApiError> {
        Api::generate_location(self, name, existing).await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        category: Option<&str>,
        id: Option<&str>,
    ) -> Result<GeneratedImage, ApiError> {
        Api::generate_image(self, prompt, category, id).await
    }
}
