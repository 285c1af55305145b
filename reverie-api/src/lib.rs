//! Minimal HTTP client for the Reverie roleplay backend.
//!
//! This crate provides a focused client for the backend REST API with:
//! - Narrative turns and conversation history
//! - Player profile document fetch/update and image upload
//! - Session (roleplay) management
//! - Character and location CRUD
//! - AI content and image generation
//!
//! The wire types here mirror the backend JSON field-for-field; everything
//! else in the system treats them as the authoritative record shapes.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use thiserror::Error;

const DEFAULT_ENV_VAR: &str = "REVERIE_BACKEND_URL";

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum Error {
    #[error("backend URL not configured")]
    NoBaseUrl,

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),
}

// ============================================================================
// Wire types
// ============================================================================

/// One persisted exchange: what the participant said and how the narrator
/// replied. Sequence order defines conversation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    #[serde(rename = "player", default)]
    pub participant: String,

    #[serde(rename = "gm", default)]
    pub narrator: String,
}

impl TurnRecord {
    pub fn new(participant: impl Into<String>, narrator: impl Into<String>) -> Self {
        Self {
            participant: participant.into(),
            narrator: narrator.into(),
        }
    }
}

/// The narrator's reply to a sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeTurn {
    pub narrative: String,
}

/// The raw player profile document plus its optional portrait reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDocument {
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub image_url: Option<String>,
}

/// A saved session (one narrative continuity the player can switch between).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "playerName", default)]
    pub participant_name: String,

    #[serde(rename = "playerRole", default)]
    pub participant_role: String,

    #[serde(rename = "createdAt", default)]
    pub created_at_ms: u64,

    #[serde(rename = "lastPlayed", default)]
    pub last_active_ms: u64,
}

/// A non-player character managed by the backend.
///
/// `id` is server-assigned and stable for the entity's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterRecord {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub first_encountered: Option<String>,
    #[serde(default)]
    pub appearance: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub motivations: Option<String>,
    #[serde(default)]
    pub personality: Option<String>,
    #[serde(default)]
    pub knows: Option<String>,
    #[serde(default)]
    pub doesnt_know: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A partial character: fields to set on create or change on update.
/// `None` fields are left out of the wire payload entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_encountered: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appearance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub motivations: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knows: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doesnt_know: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CharacterPatch {
    /// A patch carrying only a name, the minimum needed to create.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// A location managed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub id: String,
    pub name: String,

    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub atmosphere: Option<String>,
    #[serde(default)]
    pub notable_features: Option<String>,
    #[serde(default)]
    pub npcs_present: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A partial location for create/update calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atmosphere: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notable_features: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npcs_present: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl LocationPatch {
    /// A patch carrying only a name, the minimum needed to create.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// A generated (or uploaded) image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub image_url: String,
}

// ============================================================================
// Client
// ============================================================================

/// Reverie backend API client.
#[derive(Clone)]
pub struct Api {
    client: reqwest::Client,
    base_url: String,
}

impl Api {
    /// Create a new client against the given base URL (scheme + host + port).
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url,
        }
    }

    /// Create a client from the `REVERIE_BACKEND_URL` environment variable.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var(DEFAULT_ENV_VAR).map_err(|_| Error::NoBaseUrl)?;
        Ok(Self::new(base_url))
    }

    /// The configured base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ------------------------------------------------------------------
    // Game messaging
    // ------------------------------------------------------------------

    /// Send participant input and get the narrator's reply.
    pub async fn send_message(&self, text: &str) -> Result<NarrativeTurn, Error> {
        self.post("/api/message", &json!({ "message": text })).await
    }

    /// Fetch the full turn history for the current session.
    pub async fn history(&self) -> Result<Vec<TurnRecord>, Error> {
        self.get("/api/history").await
    }

    // ------------------------------------------------------------------
    // Player profile
    // ------------------------------------------------------------------

    /// Fetch the player profile document.
    pub async fn player_profile(&self) -> Result<ProfileDocument, Error> {
        self.get("/api/player").await
    }

    /// Replace the player profile document.
    pub async fn update_player_profile(&self, content: &str) -> Result<(), Error> {
        self.put_unit("/api/player", &json!({ "content": content }))
            .await
    }

    /// Append a note to the player profile.
    pub async fn add_player_note(&self, note: &str) -> Result<(), Error> {
        self.post_unit("/api/player/note", &json!({ "note": note }))
            .await
    }

    /// Upload a player portrait (base64 payload); returns the stored URL.
    pub async fn upload_player_image(
        &self,
        image_data: &str,
        mime_type: &str,
    ) -> Result<String, Error> {
        let body = json!({ "imageData": image_data, "mimeType": mime_type });
        let image: GeneratedImage = self.post("/api/player/image", &body).await?;
        Ok(image.image_url)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// List all saved sessions.
    pub async fn sessions(&self) -> Result<Vec<SessionRecord>, Error> {
        self.get("/api/roleplays").await
    }

    /// Fetch the currently active session.
    pub async fn current_session(&self) -> Result<SessionRecord, Error> {
        self.get("/api/roleplay/current").await
    }

    /// Create (and activate) a new session.
    pub async fn create_session(
        &self,
        name: &str,
        participant_name: &str,
        participant_role: &str,
    ) -> Result<SessionRecord, Error> {
        let body = json!({
            "name": name,
            "playerName": participant_name,
            "playerRole": participant_role,
        });
        self.post("/api/roleplays", &body).await
    }

    /// Activate a saved session by id.
    pub async fn activate_session(&self, id: &str) -> Result<SessionRecord, Error> {
        self.put(&format!("/api/roleplays/{id}/load"), &json!({}))
            .await
    }

    /// Delete a saved session by id.
    pub async fn delete_session(&self, id: &str) -> Result<(), Error> {
        self.delete_unit(&format!("/api/roleplays/{id}")).await
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    /// List all characters in the current session.
    pub async fn characters(&self) -> Result<Vec<CharacterRecord>, Error> {
        self.get("/api/characters").await
    }

    /// Fetch a single character by id.
    pub async fn character(&self, id: &str) -> Result<CharacterRecord, Error> {
        self.get(&format!("/api/characters/{id}")).await
    }

    /// Create a character; the server assigns the id.
    pub async fn create_character(&self, draft: &CharacterPatch) -> Result<CharacterRecord, Error> {
        self.post("/api/characters", draft).await
    }

    /// Update a character; returns the server's representation.
    pub async fn update_character(
        &self,
        id: &str,
        patch: &CharacterPatch,
    ) -> Result<CharacterRecord, Error> {
        self.put(&format!("/api/characters/{id}"), patch).await
    }

    /// Delete a character by id.
    pub async fn delete_character(&self, id: &str) -> Result<(), Error> {
        self.delete_unit(&format!("/api/characters/{id}")).await
    }

    // ------------------------------------------------------------------
    // Locations
    // ------------------------------------------------------------------

    /// List all locations in the current session.
    pub async fn locations(&self) -> Result<Vec<LocationRecord>, Error> {
        self.get("/api/locations").await
    }

    /// Fetch a single location by id.
    pub async fn location(&self, id: &str) -> Result<LocationRecord, Error> {
        self.get(&format!("/api/locations/{id}")).await
    }

    /// Create a location; the server assigns the id.
    pub async fn create_location(&self, draft: &LocationPatch) -> Result<LocationRecord, Error> {
        self.post("/api/locations", draft).await
    }

    /// Update a location; returns the server's representation.
    pub async fn update_location(
        &self,
        id: &str,
        patch: &LocationPatch,
    ) -> Result<LocationRecord, Error> {
        self.put(&format!("/api/locations/{id}"), patch).await
    }

    /// Delete a location by id.
    pub async fn delete_location(&self, id: &str) -> Result<(), Error> {
        self.delete_unit(&format!("/api/locations/{id}")).await
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Generate character content; the response mirrors the character
    /// fields, so it lands as a patch the caller can apply or edit.
    pub async fn generate_character(
        &self,
        name: &str,
        existing: Option<&str>,
    ) -> Result<CharacterPatch, Error> {
        self.post("/api/generate/character", &json!({ "name": name, "existing": existing }))
            .await
    }

    /// Generate location content as a patch.
    pub async fn generate_location(
        &self,
        name: &str,
        existing: Option<&str>,
    ) -> Result<LocationPatch, Error> {
        self.post("/api/generate/location", &json!({ "name": name, "existing": existing }))
            .await
    }

    /// Generate an image for the given prompt. `category` and `id` tell the
    /// server which record to attach the stored image to.
    pub async fn generate_image(
        &self,
        prompt: &str,
        category: Option<&str>,
        id: Option<&str>,
    ) -> Result<GeneratedImage, Error> {
        let body = json!({ "prompt": prompt, "category": category, "id": id });
        self.post("/api/generate/image", &body).await
    }

    // ------------------------------------------------------------------
    // Request plumbing
    // ------------------------------------------------------------------

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        tracing::debug!("GET {path}");
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Self::parse_json(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        tracing::debug!("POST {path}");
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .headers(Self::headers())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Self::parse_json(response).await
    }

    async fn put<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        tracing::debug!("PUT {path}");
        let response = self
            .client
            .put(format!("{}{path}", self.base_url))
            .headers(Self::headers())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Self::parse_json(response).await
    }

    async fn post_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), Error> {
        tracing::debug!("POST {path}");
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .headers(Self::headers())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Self::check_status(response).await
    }

    async fn put_unit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), Error> {
        tracing::debug!("PUT {path}");
        let response = self
            .client
            .put(format!("{}{path}", self.base_url))
            .headers(Self::headers())
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Self::check_status(response).await
    }

    async fn delete_unit(&self, path: &str) -> Result<(), Error> {
        tracing::debug!("DELETE {path}");
        let response = self
            .client
            .delete(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        Self::check_status(response).await
    }

    async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }

        response.json().await.map_err(|e| Error::Parse(e.to_string()))
    }

    async fn check_status(response: reqwest::Response) -> Result<(), Error> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status,
                message: body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let api = Api::new("http://localhost:8080/");
        assert_eq!(api.base_url(), "http://localhost:8080");

        let api = Api::new("http://localhost:8080");
        assert_eq!(api.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_turn_record_wire_names() {
        let turn: TurnRecord =
            serde_json::from_str(r#"{"player":"I open the door","gm":"It creaks."}"#).unwrap();
        assert_eq!(turn.participant, "I open the door");
        assert_eq!(turn.narrator, "It creaks.");

        // Missing halves default to empty rather than failing the whole list.
        let turn: TurnRecord = serde_json::from_str(r#"{"player":"hello"}"#).unwrap();
        assert_eq!(turn.narrator, "");
    }

    #[test]
    fn test_session_record_wire_names() {
        let json = r#"{
            "id": "session-1",
            "name": "Mystery Manor",
            "playerName": "Alex",
            "playerRole": "Investigator",
            "createdAt": 1700000000000,
            "lastPlayed": 1700000500000
        }"#;
        let session: SessionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(session.participant_name, "Alex");
        assert_eq!(session.participant_role, "Investigator");
        assert_eq!(session.last_active_ms, 1_700_000_500_000);
    }

    #[test]
    fn test_character_record_camel_case() {
        let json = r#"{
            "id": "mira",
            "name": "Mira",
            "firstEncountered": "The herbalist's shop",
            "doesntKnow": "Who broke in",
            "imageUrl": "/images/characters/mira.png"
        }"#;
        let character: CharacterRecord = serde_json::from_str(json).unwrap();
        assert_eq!(character.first_encountered.as_deref(), Some("The herbalist's shop"));
        assert_eq!(character.doesnt_know.as_deref(), Some("Who broke in"));
        assert_eq!(character.image_url.as_deref(), Some("/images/characters/mira.png"));
        assert!(character.role.is_none());
    }

    #[test]
    fn test_location_kind_maps_to_type() {
        let json = r#"{"id":"docks","name":"The Docks","type":"Harbor","npcsPresent":"Dockworkers"}"#;
        let location: LocationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(location.kind.as_deref(), Some("Harbor"));
        assert_eq!(location.npcs_present.as_deref(), Some("Dockworkers"));

        let patch = LocationPatch {
            kind: Some("Harbor".to_string()),
            ..LocationPatch::default()
        };
        let wire = serde_json::to_string(&patch).unwrap();
        assert_eq!(wire, r#"{"type":"Harbor"}"#);
    }

    #[test]
    fn test_patch_skips_absent_fields() {
        let patch = CharacterPatch::named("Mira");
        let wire = serde_json::to_string(&patch).unwrap();
        assert_eq!(wire, r#"{"name":"Mira"}"#);
    }

    #[test]
    fn test_from_env_missing() {
        std::env::remove_var("REVERIE_BACKEND_URL");
        assert!(matches!(Api::from_env(), Err(Error::NoBaseUrl)));
    }
}
