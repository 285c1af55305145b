//! Testing utilities.
//!
//! This module provides tools for exercising the coordinator without a
//! backend:
//! - `MockRemote`: an in-memory scripted implementation of [`Remote`]
//! - `TestHarness`: a coordinator wired to a `MockRemote`
//! - Assertion helpers for verifying composed state
//!
//! The mock behaves like a small well-behaved server: ids are assigned on
//! create, updates return the stored representation, and `go_offline`
//! makes every call fail the way a dropped connection would.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use reverie_api::{
    CharacterPatch, CharacterRecord, Error as ApiError, GeneratedImage, LocationPatch,
    LocationRecord, NarrativeTurn, ProfileDocument, SessionRecord, TurnRecord,
};

use crate::coordinator::{GameCoordinator, GameState};
use crate::remote::Remote;

/// A scripted in-memory backend.
pub struct MockRemote {
    inner: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    narratives: VecDeque<String>,
    history: Vec<TurnRecord>,
    profile_content: String,
    profile_image_url: Option<String>,
    saved_profiles: Vec<String>,
    notes: Vec<String>,
    sessions: Vec<SessionRecord>,
    current: Option<SessionRecord>,
    characters: Vec<CharacterRecord>,
    locations: Vec<LocationRecord>,
    next_id: u32,
    offline: bool,
}

const DEFAULT_NARRATIVE: &str = "The narrator has no more scripted replies.";

impl MockRemote {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MockState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().expect("mock remote state poisoned")
    }

    /// Queue the next narrator reply.
    pub fn queue_narrative(&self, text: impl Into<String>) {
        self.state().narratives.push_back(text.into());
    }

    /// Replace the stored turn history.
    pub fn set_history(&self, turns: Vec<TurnRecord>) {
        self.state().history = turns;
    }

    /// Replace the stored profile document.
    pub fn set_profile_document(&self, content: impl Into<String>) {
        self.state().profile_content = content.into();
    }

    /// Replace the stored character collection.
    pub fn set_characters(&self, characters: Vec<CharacterRecord>) {
        self.state().characters = characters;
    }

    /// Replace the stored location collection.
    pub fn set_locations(&self, locations: Vec<LocationRecord>) {
        self.state().locations = locations;
    }

    /// Add a session server-side and make it current; returns the record.
    pub fn create_session_record(
        &self,
        name: &str,
        participant_name: &str,
        participant_role: &str,
    ) -> SessionRecord {
        let mut state = self.state();
        let session = state.new_session(name, participant_name, participant_role);
        state.sessions.push(session.clone());
        state.current = Some(session.clone());
        session
    }

    /// Add a character server-side, as another client would; returns it.
    pub fn create_character_record(&self, name: &str) -> CharacterRecord {
        let mut state = self.state();
        let record = state.new_character(&CharacterPatch::named(name));
        state.characters.push(record.clone());
        record
    }

    /// Everything the "server" currently holds for characters.
    pub fn characters_snapshot(&self) -> Vec<CharacterRecord> {
        self.state().characters.clone()
    }

    /// The most recently uploaded profile document, if any.
    pub fn last_saved_profile(&self) -> Option<String> {
        self.state().saved_profiles.last().cloned()
    }

    /// Notes received via the note endpoint, in order.
    pub fn notes_recorded(&self) -> Vec<String> {
        self.state().notes.clone()
    }

    /// Make every call fail with a network error until [`go_online`].
    ///
    /// [`go_online`]: MockRemote::go_online
    pub fn go_offline(&self) {
        self.state().offline = true;
    }

    /// Restore connectivity.
    pub fn go_online(&self) {
        self.state().offline = false;
    }

    fn check_online(&self) -> Result<MutexGuard<'_, MockState>, ApiError> {
        let state = self.state();
        if state.offline {
            return Err(ApiError::Network("offline (scripted)".to_string()));
        }
        Ok(state)
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MockState {
    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn new_session(
        &mut self,
        name: &str,
        participant_name: &str,
        participant_role: &str,
    ) -> SessionRecord {
        let n = self.next_id();
        SessionRecord {
            id: format!("session-{n}"),
            name: name.to_string(),
            participant_name: participant_name.to_string(),
            participant_role: participant_role.to_string(),
            created_at_ms: 1_700_000_000_000 + u64::from(n) * 1_000,
            last_active_ms: 1_700_000_000_000 + u64::from(n) * 1_000,
        }
    }

    fn new_character(&mut self, draft: &CharacterPatch) -> CharacterRecord {
        let n = self.next_id();
        CharacterRecord {
            id: format!("character-{n}"),
            name: draft.name.clone().unwrap_or_default(),
            role: draft.role.clone(),
            first_encountered: draft.first_encountered.clone(),
            appearance: draft.appearance.clone(),
            background: draft.background.clone(),
            motivations: draft.motivations.clone(),
            personality: draft.personality.clone(),
            knows: draft.knows.clone(),
            doesnt_know: draft.doesnt_know.clone(),
            image_url: draft.image_url.clone(),
        }
    }

    fn new_location(&mut self, draft: &LocationPatch) -> LocationRecord {
        let n = self.next_id();
        LocationRecord {
            id: format!("location-{n}"),
            name: draft.name.clone().unwrap_or_default(),
            kind: draft.kind.clone(),
            district: draft.district.clone(),
            description: draft.description.clone(),
            atmosphere: draft.atmosphere.clone(),
            notable_features: draft.notable_features.clone(),
            npcs_present: draft.npcs_present.clone(),
            image_url: draft.image_url.clone(),
        }
    }
}

fn apply_character_patch(record: &mut CharacterRecord, patch: &CharacterPatch) {
    if let Some(name) = &patch.name {
        record.name = name.clone();
    }
    if patch.role.is_some() {
        record.role = patch.role.clone();
    }
    if patch.first_encountered.is_some() {
        record.first_encountered = patch.first_encountered.clone();
    }
    if patch.appearance.is_some() {
        record.appearance = patch.appearance.clone();
    }
    if patch.background.is_some() {
        record.background = patch.background.clone();
    }
    if patch.motivations.is_some() {
        record.motivations = patch.motivations.clone();
    }
    if patch.personality.is_some() {
        record.personality = patch.personality.clone();
    }
    if patch.knows.is_some() {
        record.knows = patch.knows.clone();
    }
    if patch.doesnt_know.is_some() {
        record.doesnt_know = patch.doesnt_know.clone();
    }
    if patch.image_url.is_some() {
        record.image_url = patch.image_url.clone();
    }
}

fn apply_location_patch(record: &mut LocationRecord, patch: &LocationPatch) {
    if let Some(name) = &patch.name {
        record.name = name.clone();
    }
    if patch.kind.is_some() {
        record.kind = patch.kind.clone();
    }
    if patch.district.is_some() {
        record.district = patch.district.clone();
    }
    if patch.description.is_some() {
        record.description = patch.description.clone();
    }
    if patch.atmosphere.is_some() {
        record.atmosphere = patch.atmosphere.clone();
    }
    if patch.notable_features.is_some() {
        record.notable_features = patch.notable_features.clone();
    }
    if patch.npcs_present.is_some() {
        record.npcs_present = patch.npcs_present.clone();
    }
    if patch.image_url.is_some() {
        record.image_url = patch.image_url.clone();
    }
}

fn not_found() -> ApiError {
    ApiError::Api {
        status: 404,
        message: "not found".to_string(),
    }
}

#[async_trait]
impl Remote for MockRemote {
    async fn send_message(&self, text: &str) -> Result<NarrativeTurn, ApiError> {
        let mut state = self.check_online()?;
        let narrative = state
            .narratives
            .pop_front()
            .unwrap_or_else(|| DEFAULT_NARRATIVE.to_string());
        state.history.push(TurnRecord::new(text, narrative.clone()));
        Ok(NarrativeTurn { narrative })
    }

    async fn history(&self) -> Result<Vec<TurnRecord>, ApiError> {
        Ok(self.check_online()?.history.clone())
    }

    async fn player_profile(&self) -> Result<ProfileDocument, ApiError> {
        let state = self.check_online()?;
        Ok(ProfileDocument {
            content: state.profile_content.clone(),
            image_url: state.profile_image_url.clone(),
        })
    }

    async fn save_player_profile(&self, content: &str) -> Result<(), ApiError> {
        let mut state = self.check_online()?;
        state.profile_content = content.to_string();
        state.saved_profiles.push(content.to_string());
        Ok(())
    }

    async fn add_player_note(&self, note: &str) -> Result<(), ApiError> {
        self.check_online()?.notes.push(note.to_string());
        Ok(())
    }

    async fn upload_player_image(
        &self,
        _image_data: &str,
        _mime_type: &str,
    ) -> Result<String, ApiError> {
        let mut state = self.check_online()?;
        let n = state.next_id();
        let url = format!("/images/player-{n}.png");
        state.profile_image_url = Some(url.clone());
        Ok(url)
    }

    async fn sessions(&self) -> Result<Vec<SessionRecord>, ApiError> {
        Ok(self.check_online()?.sessions.clone())
    }

    async fn current_session(&self) -> Result<SessionRecord, ApiError> {
        self.check_online()?.current.clone().ok_or_else(not_found)
    }

    async fn create_session(
        &self,
        name: &str,
        participant_name: &str,
        participant_role: &str,
    ) -> Result<SessionRecord, ApiError> {
        let mut state = self.check_online()?;
        let session = state.new_session(name, participant_name, participant_role);
        state.sessions.push(session.clone());
        state.current = Some(session.clone());
        Ok(session)
    }

    async fn activate_session(&self, id: &str) -> Result<SessionRecord, ApiError> {
        let mut state = self.check_online()?;
        let session = state
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(not_found)?;
        state.current = Some(session.clone());
        Ok(session)
    }

    async fn delete_session(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.check_online()?;
        let before = state.sessions.len();
        state.sessions.retain(|s| s.id != id);
        if state.sessions.len() == before {
            return Err(not_found());
        }
        if state.current.as_ref().is_some_and(|s| s.id == id) {
            state.current = None;
        }
        Ok(())
    }

    async fn characters(&self) -> Result<Vec<CharacterRecord>, ApiError> {
        Ok(self.check_online()?.characters.clone())
    }

    async fn create_character(&self, draft: &CharacterPatch) -> Result<CharacterRecord, ApiError> {
        let mut state = self.check_online()?;
        let record = state.new_character(draft);
        state.characters.push(record.clone());
        Ok(record)
    }

    async fn update_character(
        &self,
        id: &str,
        patch: &CharacterPatch,
    ) -> Result<CharacterRecord, ApiError> {
        let mut state = self.check_online()?;
        let record = state
            .characters
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(not_found)?;
        apply_character_patch(record, patch);
        Ok(record.clone())
    }

    async fn delete_character(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.check_online()?;
        let before = state.characters.len();
        state.characters.retain(|c| c.id != id);
        if state.characters.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn locations(&self) -> Result<Vec<LocationRecord>, ApiError> {
        Ok(self.check_online()?.locations.clone())
    }

    async fn create_location(&self, draft: &LocationPatch) -> Result<LocationRecord, ApiError> {
        let mut state = self.check_online()?;
        let record = state.new_location(draft);
        state.locations.push(record.clone());
        Ok(record)
    }

    async fn update_location(
        &self,
        id: &str,
        patch: &LocationPatch,
    ) -> Result<LocationRecord, ApiError> {
        let mut state = self.check_online()?;
        let record = state
            .locations
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(not_found)?;
        apply_location_patch(record, patch);
        Ok(record.clone())
    }

    async fn delete_location(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.check_online()?;
        let before = state.locations.len();
        state.locations.retain(|l| l.id != id);
        if state.locations.len() == before {
            return Err(not_found());
        }
        Ok(())
    }

    async fn generate_character(
        &self,
        name: &str,
        _existing: Option<&str>,
    ) -> Result<CharacterPatch, ApiError> {
        self.check_online()?;
        Ok(CharacterPatch {
            appearance: Some(format!("{name} has a face you would remember.")),
            background: Some(format!("{name} has lived here longer than anyone admits.")),
            personality: Some("Guarded, but warm once trusted.".to_string()),
            motivations: Some("Keep the past buried.".to_string()),
            ..CharacterPatch::default()
        })
    }

    async fn generate_location(
        &self,
        name: &str,
        _existing: Option<&str>,
    ) -> Result<LocationPatch, ApiError> {
        self.check_online()?;
        Ok(LocationPatch {
            description: Some(format!("{name} sits where the old road ends.")),
            atmosphere: Some("Quiet in a way that feels deliberate.".to_string()),
            notable_features: Some("A door that is always freshly painted.".to_string()),
            ..LocationPatch::default()
        })
    }

    async fn generate_image(
        &self,
        _prompt: &str,
        category: Option<&str>,
        _id: Option<&str>,
    ) -> Result<GeneratedImage, ApiError> {
        let mut state = self.check_online()?;
        let n = state.next_id();
        Ok(GeneratedImage {
            image_url: format!("/images/{}/{n}.png", category.unwrap_or("misc")),
        })
    }
}

/// A coordinator wired to a scripted backend.
pub struct TestHarness {
    pub game: GameCoordinator<MockRemote>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self {
            game: GameCoordinator::new(MockRemote::new()),
        }
    }

    /// The scripted backend.
    pub fn remote(&self) -> &MockRemote {
        self.game.remote()
    }

    /// The composed state record.
    pub fn state(&self) -> &GameState {
        self.game.state()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert that no command is in flight.
#[track_caller]
pub fn assert_idle(harness: &TestHarness) {
    assert!(!harness.state().busy, "Expected coordinator to be idle");
}

/// Assert the timeline holds exactly `expected` messages.
#[track_caller]
pub fn assert_message_count(harness: &TestHarness, expected: usize) {
    let actual = harness.state().messages.len();
    assert_eq!(
        actual, expected,
        "Expected {expected} messages in the timeline, got {actual}"
    );
}

/// Assert the profile is currently named `expected`.
#[track_caller]
pub fn assert_profile_name(harness: &TestHarness, expected: &str) {
    let actual = &harness.state().profile.name;
    assert_eq!(
        actual, expected,
        "Expected profile name {expected:?}, got {actual:?}"
    );
}
