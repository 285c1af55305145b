//! Game state coordination.
//!
//! `GameCoordinator` owns the composed state record consumed by the
//! presentation layer and is its only writer. Every user action is a command
//! method: validate, mark busy, make the remote call, reconcile, settle.
//! While a command is in flight all other mutating commands are rejected
//! with [`CommandError::Busy`], and the effects of a command are written to
//! the record between suspension points, so a reader never observes the
//! partial result of a single command.

use reverie_api::{
    CharacterPatch, CharacterRecord, Error as ApiError, LocationPatch, LocationRecord,
    ProfileDocument, SessionRecord,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::{self, Message};
use crate::profile::{PlayerProfile, ProfilePatch};
use crate::remote::Remote;
use crate::store::{EntityStore, StoreError};

/// Errors from coordinator commands.
///
/// None of these are fatal: the composed record is left untouched (or, for
/// a failed send, keeps only the already-appended participant message) and
/// the caller decides what to surface.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("another command is already in flight")]
    Busy,

    #[error("name must not be empty")]
    EmptyName,

    #[error("no entity with id {0}")]
    UnknownId(String),

    #[error("remote call failed: {0}")]
    Remote(#[from] ApiError),
}

/// The composed state record: the single source of truth for rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub session: Option<SessionRecord>,
    pub messages: Vec<Message>,
    pub profile: PlayerProfile,
    pub characters: Vec<CharacterRecord>,
    pub locations: Vec<LocationRecord>,
    pub busy: bool,
}

/// Which record a generated image should be attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    Profile,
    Character(String),
    Location(String),
}

/// The state machine composing codec, replay, and entity store over one
/// owned [`GameState`].
pub struct GameCoordinator<R: Remote> {
    remote: R,
    state: GameState,
}

impl<R: Remote> GameCoordinator<R> {
    /// Create a coordinator with an empty state. Call [`initialize`] to
    /// load the active session, or [`start_session`] to begin a new one.
    ///
    /// [`initialize`]: GameCoordinator::initialize
    /// [`start_session`]: GameCoordinator::start_session
    pub fn new(remote: R) -> Self {
        Self {
            remote,
            state: GameState::default(),
        }
    }

    /// The composed state record.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access to the composed state.
    ///
    /// Use with caution - direct modifications bypass the command layer.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// The remote boundary this coordinator talks to.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Cold-start load: current session, history, profile, and both entity
    /// collections. Each piece degrades independently - a missing history
    /// just means an empty timeline - so this only fails when a command is
    /// already in flight.
    pub async fn initialize(&mut self) -> Result<(), CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        let session = match self.remote.current_session().await {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("no active session: {e}");
                None
            }
        };
        self.state = self.load_composed(session).await;
        Ok(())
    }

    /// Create and enter a new session. On success the entire composed
    /// record is replaced: messages and entity collections cleared, profile
    /// reset to the given identity. On failure nothing changes.
    pub async fn start_session(
        &mut self,
        name: &str,
        participant_name: &str,
        participant_role: &str,
    ) -> Result<(), CommandError> {
        self.ensure_idle()?;
        if name.trim().is_empty() || participant_name.trim().is_empty() {
            return Err(CommandError::EmptyName);
        }
        self.state.busy = true;

        match self
            .remote
            .create_session(name, participant_name, participant_role)
            .await
        {
            Ok(session) => {
                self.state = GameState {
                    session: Some(session),
                    profile: PlayerProfile::named(participant_name, participant_role),
                    ..GameState::default()
                };
                Ok(())
            }
            Err(e) => {
                self.state.busy = false;
                Err(CommandError::Remote(e))
            }
        }
    }

    /// Activate a saved session and reload everything for it, the same
    /// cold-start sequence as [`initialize`](GameCoordinator::initialize).
    pub async fn switch_session(&mut self, id: &str) -> Result<(), CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        match self.remote.activate_session(id).await {
            Ok(session) => {
                self.state = self.load_composed(Some(session)).await;
                Ok(())
            }
            Err(e) => {
                self.state.busy = false;
                Err(CommandError::Remote(e))
            }
        }
    }

    /// Delete a saved session. Deleting the current session clears
    /// `state.session`; the rest of the record stays until the caller
    /// switches or starts another session.
    pub async fn delete_session(&mut self, id: &str) -> Result<(), CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        let result = self.remote.delete_session(id).await;
        self.state.busy = false;
        match result {
            Ok(()) => {
                if self.state.session.as_ref().is_some_and(|s| s.id == id) {
                    self.state.session = None;
                }
                Ok(())
            }
            Err(e) => Err(CommandError::Remote(e)),
        }
    }

    /// List saved sessions. Read-only passthrough; not gated by `busy`.
    pub async fn sessions(&self) -> Result<Vec<SessionRecord>, CommandError> {
        Ok(self.remote.sessions().await?)
    }

    // ------------------------------------------------------------------
    // Messaging
    // ------------------------------------------------------------------

    /// Send participant input to the narrator.
    ///
    /// The participant message is appended optimistically before the remote
    /// call. On success the narrator's reply is appended (stamped strictly
    /// after the participant message) and the profile is re-fetched, since
    /// the narrative turn may have changed it server-side. On failure the
    /// participant message stays: the action was sent, and a retried send
    /// must not duplicate it.
    pub async fn send_message(&mut self, text: &str) -> Result<(), CommandError> {
        self.ensure_idle()?;
        self.state.messages.push(Message::participant(text));
        self.state.busy = true;

        match self.remote.send_message(text).await {
            Ok(turn) => {
                let after_ms = self
                    .state
                    .messages
                    .last()
                    .map(|m| m.timestamp_ms)
                    .unwrap_or(0);
                let narrator = Message::narrator_after(turn.narrative, after_ms);

                let profile = match self.remote.player_profile().await {
                    Ok(doc) => Some(profile_from_document(&doc)),
                    Err(e) => {
                        tracing::warn!("profile refresh failed after send: {e}");
                        None
                    }
                };

                self.state.messages.push(narrator);
                if let Some(profile) = profile {
                    self.state.profile = profile;
                }
                self.state.busy = false;
                Ok(())
            }
            Err(e) => {
                self.state.busy = false;
                Err(CommandError::Remote(e))
            }
        }
    }

    // ------------------------------------------------------------------
    // Player profile
    // ------------------------------------------------------------------

    /// Apply a profile edit and upload the serialized document. The edit is
    /// committed to local state only once the upload succeeds.
    pub async fn save_profile(&mut self, patch: ProfilePatch) -> Result<(), CommandError> {
        self.ensure_idle()?;
        let mut next = self.state.profile.clone();
        next.apply(patch);
        if next.name.trim().is_empty() {
            return Err(CommandError::EmptyName);
        }
        self.state.busy = true;

        let result = self.remote.save_player_profile(&next.to_document()).await;
        self.state.busy = false;
        match result {
            Ok(()) => {
                self.state.profile = next;
                Ok(())
            }
            Err(e) => Err(CommandError::Remote(e)),
        }
    }

    /// Append a note to the player's sheet.
    pub async fn add_note(&mut self, note: &str) -> Result<(), CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        let result = self.remote.add_player_note(note).await;
        self.state.busy = false;
        match result {
            Ok(()) => {
                self.state.profile.notes.push(note.to_string());
                Ok(())
            }
            Err(e) => Err(CommandError::Remote(e)),
        }
    }

    /// Upload a player portrait; returns the stored URL.
    pub async fn upload_profile_image(
        &mut self,
        image_data: &str,
        mime_type: &str,
    ) -> Result<String, CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        let result = self.remote.upload_player_image(image_data, mime_type).await;
        self.state.busy = false;
        match result {
            Ok(url) => {
                self.state.profile.image_url = Some(url.clone());
                Ok(url)
            }
            Err(e) => Err(CommandError::Remote(e)),
        }
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    /// Create a character from a draft patch. The draft must carry a
    /// non-empty name.
    pub async fn create_character(&mut self, draft: CharacterPatch) -> Result<(), CommandError> {
        require_name(draft.name.as_deref())?;
        self.ensure_idle()?;
        self.state.busy = true;

        let result = EntityStore::create(&self.remote, &mut self.state.characters, &draft).await;
        self.state.busy = false;
        result.map_err(|e| store_error(e, None))
    }

    /// Update an existing character.
    pub async fn update_character(
        &mut self,
        id: &str,
        patch: CharacterPatch,
    ) -> Result<(), CommandError> {
        reject_blank_name(patch.name.as_deref())?;
        self.ensure_idle()?;
        self.state.busy = true;

        let result =
            EntityStore::update(&self.remote, &mut self.state.characters, id, &patch).await;
        self.state.busy = false;
        result.map_err(|e| store_error(e, Some(id)))
    }

    /// Delete a character.
    pub async fn delete_character(&mut self, id: &str) -> Result<(), CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        let result = EntityStore::delete(&self.remote, &mut self.state.characters, id).await;
        self.state.busy = false;
        result.map_err(|e| store_error(e, Some(id)))
    }

    /// Replace the character collection from a fresh remote fetch.
    pub async fn refresh_characters(&mut self) -> Result<(), CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        let result = EntityStore::refresh(&self.remote, &mut self.state.characters).await;
        self.state.busy = false;
        result.map_err(|e| store_error(e, None))
    }

    // ------------------------------------------------------------------
    // Locations
    // ------------------------------------------------------------------

    /// Create a location from a draft patch with a non-empty name.
    pub async fn create_location(&mut self, draft: LocationPatch) -> Result<(), CommandError> {
        require_name(draft.name.as_deref())?;
        self.ensure_idle()?;
        self.state.busy = true;

        let result = EntityStore::create(&self.remote, &mut self.state.locations, &draft).await;
        self.state.busy = false;
        result.map_err(|e| store_error(e, None))
    }

    /// Update an existing location.
    pub async fn update_location(
        &mut self,
        id: &str,
        patch: LocationPatch,
    ) -> Result<(), CommandError> {
        reject_blank_name(patch.name.as_deref())?;
        self.ensure_idle()?;
        self.state.busy = true;

        let result = EntityStore::update(&self.remote, &mut self.state.locations, id, &patch).await;
        self.state.busy = false;
        result.map_err(|e| store_error(e, Some(id)))
    }

    /// Delete a location.
    pub async fn delete_location(&mut self, id: &str) -> Result<(), CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        let result = EntityStore::delete(&self.remote, &mut self.state.locations, id).await;
        self.state.busy = false;
        result.map_err(|e| store_error(e, Some(id)))
    }

    /// Replace the location collection from a fresh remote fetch.
    pub async fn refresh_locations(&mut self) -> Result<(), CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        let result = EntityStore::refresh(&self.remote, &mut self.state.locations).await;
        self.state.busy = false;
        result.map_err(|e| store_error(e, None))
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Generate character content for an editor to apply or discard.
    /// Does not touch the composed record.
    pub async fn generate_character(
        &mut self,
        name: &str,
        existing: Option<&str>,
    ) -> Result<CharacterPatch, CommandError> {
        require_name(Some(name))?;
        self.ensure_idle()?;
        self.state.busy = true;

        let result = self.remote.generate_character(name, existing).await;
        self.state.busy = false;
        Ok(result?)
    }

    /// Generate location content for an editor to apply or discard.
    pub async fn generate_location(
        &mut self,
        name: &str,
        existing: Option<&str>,
    ) -> Result<LocationPatch, CommandError> {
        require_name(Some(name))?;
        self.ensure_idle()?;
        self.state.busy = true;

        let result = self.remote.generate_location(name, existing).await;
        self.state.busy = false;
        Ok(result?)
    }

    /// Generate an image and, when a target is given, attach the returned
    /// URL to the matching record. Returns the URL either way.
    pub async fn generate_image(
        &mut self,
        prompt: &str,
        target: Option<ImageTarget>,
    ) -> Result<String, CommandError> {
        self.ensure_idle()?;
        self.state.busy = true;

        let (category, id) = match &target {
            None => (None, None),
            Some(ImageTarget::Profile) => (Some("player"), None),
            Some(ImageTarget::Character(id)) => (Some("characters"), Some(id.as_str())),
            Some(ImageTarget::Location(id)) => (Some("locations"), Some(id.as_str())),
        };
        let result = self.remote.generate_image(prompt, category, id).await;
        self.state.busy = false;
        match result {
            Ok(image) => {
                let url = image.image_url;
                match target {
                    Some(ImageTarget::Profile) => {
                        self.state.profile.image_url = Some(url.clone());
                    }
                    Some(ImageTarget::Character(id)) => {
                        if let Some(c) = self.state.characters.iter_mut().find(|c| c.id == id) {
                            c.image_url = Some(url.clone());
                        }
                    }
                    Some(ImageTarget::Location(id)) => {
                        if let Some(l) = self.state.locations.iter_mut().find(|l| l.id == id) {
                            l.image_url = Some(url.clone());
                        }
                    }
                    None => {}
                }
                Ok(url)
            }
            Err(e) => Err(CommandError::Remote(e)),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_idle(&self) -> Result<(), CommandError> {
        if self.state.busy {
            Err(CommandError::Busy)
        } else {
            Ok(())
        }
    }

    /// Fetch everything a session's composed record needs. Failures degrade
    /// to empty pieces; `busy` comes back false.
    async fn load_composed(&self, session: Option<SessionRecord>) -> GameState {
        let messages = match self.remote.history().await {
            Ok(turns) => history::replay(&turns),
            Err(e) => {
                tracing::warn!("history unavailable: {e}");
                Vec::new()
            }
        };
        let profile = match self.remote.player_profile().await {
            Ok(doc) => profile_from_document(&doc),
            Err(e) => {
                tracing::warn!("profile unavailable: {e}");
                PlayerProfile::default()
            }
        };
        let characters = match self.remote.characters().await {
            Ok(characters) => characters,
            Err(e) => {
                tracing::warn!("characters unavailable: {e}");
                Vec::new()
            }
        };
        let locations = match self.remote.locations().await {
            Ok(locations) => locations,
            Err(e) => {
                tracing::warn!("locations unavailable: {e}");
                Vec::new()
            }
        };

        GameState {
            session,
            messages,
            profile,
            characters,
            locations,
            busy: false,
        }
    }
}

/// Parse a profile document, preferring an image reference embedded in the
/// document over the one riding alongside it.
fn profile_from_document(doc: &ProfileDocument) -> PlayerProfile {
    let mut profile = PlayerProfile::from_document(&doc.content);
    if profile.image_url.is_none() {
        profile.image_url = doc.image_url.clone();
    }
    profile
}

fn require_name(name: Option<&str>) -> Result<(), CommandError> {
    match name {
        Some(name) if !name.trim().is_empty() => Ok(()),
        _ => Err(CommandError::EmptyName),
    }
}

fn reject_blank_name(name: Option<&str>) -> Result<(), CommandError> {
    match name {
        Some(name) if name.trim().is_empty() => Err(CommandError::EmptyName),
        _ => Ok(()),
    }
}

fn store_error(err: StoreError, id: Option<&str>) -> CommandError {
    match err {
        StoreError::UnknownId => CommandError::UnknownId(id.unwrap_or_default().to_string()),
        StoreError::Api(e) => CommandError::Remote(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Origin;
    use crate::testing::{assert_idle, assert_message_count, TestHarness};

    #[tokio::test]
    async fn test_start_session_resets_composed_state() {
        let mut harness = TestHarness::new();
        harness.remote().queue_narrative("You arrive at the manor.");
        harness.game.send_message("I arrive").await.unwrap();
        assert_message_count(&harness, 2);

        harness
            .game
            .start_session("Mystery Manor", "Alex", "Investigator")
            .await
            .unwrap();

        let state = harness.state();
        assert!(state.messages.is_empty());
        assert_eq!(state.profile.name, "Alex");
        assert_eq!(state.profile.role, "Investigator");
        assert!(state.characters.is_empty());
        assert!(state.locations.is_empty());
        assert_eq!(
            state.session.as_ref().map(|s| s.name.as_str()),
            Some("Mystery Manor")
        );
        assert_idle(&harness);
    }

    #[tokio::test]
    async fn test_start_session_rejects_empty_names() {
        let mut harness = TestHarness::new();

        let result = harness.game.start_session("", "Alex", "Investigator").await;
        assert!(matches!(result, Err(CommandError::EmptyName)));

        let result = harness.game.start_session("Manor", "  ", "Investigator").await;
        assert!(matches!(result, Err(CommandError::EmptyName)));

        // Nothing was created remotely and nothing changed locally.
        assert!(harness.game.sessions().await.unwrap().is_empty());
        assert!(harness.state().session.is_none());
    }

    #[tokio::test]
    async fn test_failed_start_session_leaves_state_unchanged() {
        let mut harness = TestHarness::new();
        harness
            .game
            .start_session("First", "Alex", "Investigator")
            .await
            .unwrap();
        let before = harness.state().clone();

        harness.remote().go_offline();
        let result = harness.game.start_session("Second", "Sam", "Thief").await;

        assert!(matches!(result, Err(CommandError::Remote(_))));
        assert_eq!(harness.state(), &before);
    }

    #[tokio::test]
    async fn test_send_message_appends_exchange() {
        let mut harness = TestHarness::new();
        harness.remote().set_profile_document(
            "Name: Alex\nRole: Investigator\n\n# Inventory\n- Brass key\n",
        );
        harness.remote().queue_narrative("The door creaks open.");

        harness.game.send_message("I open the door").await.unwrap();

        let state = harness.state();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[0].origin, Origin::Participant);
        assert_eq!(state.messages[0].text, "I open the door");
        assert_eq!(state.messages[1].origin, Origin::Narrator);
        assert_eq!(state.messages[1].text, "The door creaks open.");
        assert!(state.messages[0].timestamp_ms < state.messages[1].timestamp_ms);

        // The narrative turn may change the sheet server-side, so the
        // profile was re-fetched and re-parsed.
        assert_eq!(state.profile.name, "Alex");
        assert_eq!(state.profile.inventory.len(), 1);
        assert_idle(&harness);
    }

    #[tokio::test]
    async fn test_failed_send_keeps_participant_message() {
        let mut harness = TestHarness::new();
        harness.remote().go_offline();

        let result = harness.game.send_message("I shout into the dark").await;

        assert!(matches!(result, Err(CommandError::Remote(_))));
        let state = harness.state();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].origin, Origin::Participant);
        assert_eq!(state.messages[0].text, "I shout into the dark");
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn test_commands_rejected_while_busy() {
        let mut harness = TestHarness::new();
        harness.game.state_mut().busy = true;

        assert!(matches!(
            harness.game.send_message("hello").await,
            Err(CommandError::Busy)
        ));
        assert!(matches!(
            harness.game.start_session("Manor", "Alex", "Scout").await,
            Err(CommandError::Busy)
        ));
        assert!(matches!(
            harness
                .game
                .create_character(CharacterPatch::named("Mira"))
                .await,
            Err(CommandError::Busy)
        ));
        assert!(matches!(
            harness.game.save_profile(ProfilePatch::default()).await,
            Err(CommandError::Busy)
        ));

        // Nothing landed in the timeline or the collections.
        assert!(harness.state().messages.is_empty());
        assert!(harness.state().characters.is_empty());
    }

    #[tokio::test]
    async fn test_initialize_replays_history_and_loads_collections() {
        let mut harness = TestHarness::new();
        let remote = harness.remote();
        remote.set_history(vec![
            reverie_api::TurnRecord::new("I look around", "A dim hallway."),
            reverie_api::TurnRecord::new("I listen", "Silence."),
        ]);
        remote.set_profile_document("Name: Alex\nRole: Investigator\n");
        remote
            .create_session_record("Mystery Manor", "Alex", "Investigator");

        harness.game.initialize().await.unwrap();

        let state = harness.state();
        assert_eq!(state.messages.len(), 4);
        assert_eq!(state.messages[0].text, "I look around");
        assert_eq!(state.profile.name, "Alex");
        assert_eq!(
            state.session.as_ref().map(|s| s.name.as_str()),
            Some("Mystery Manor")
        );
        assert_idle(&harness);
    }

    #[tokio::test]
    async fn test_initialize_degrades_offline() {
        let mut harness = TestHarness::new();
        harness.remote().go_offline();

        harness.game.initialize().await.unwrap();

        let state = harness.state();
        assert!(state.session.is_none());
        assert!(state.messages.is_empty());
        assert_eq!(state.profile, PlayerProfile::default());
        assert!(!state.busy);
    }

    #[tokio::test]
    async fn test_switch_session_reloads_composed_state() {
        let mut harness = TestHarness::new();
        let session = harness
            .remote()
            .create_session_record("Harbor Story", "Sam", "Smuggler");
        harness.remote().set_history(vec![reverie_api::TurnRecord::new(
            "I board the ship",
            "The deck sways underfoot.",
        )]);
        harness
            .remote()
            .set_profile_document("Name: Sam\nRole: Smuggler\n");

        harness.game.switch_session(&session.id).await.unwrap();

        let state = harness.state();
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.profile.name, "Sam");
        assert_eq!(state.session.as_ref().map(|s| s.id.as_str()), Some(session.id.as_str()));
    }

    #[tokio::test]
    async fn test_delete_current_session_clears_it() {
        let mut harness = TestHarness::new();
        harness
            .game
            .start_session("Mystery Manor", "Alex", "Investigator")
            .await
            .unwrap();
        let id = harness.state().session.as_ref().unwrap().id.clone();

        harness.game.delete_session(&id).await.unwrap();

        assert!(harness.state().session.is_none());
        assert!(harness.game.sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_profile_commits_only_on_success() {
        let mut harness = TestHarness::new();
        harness
            .game
            .start_session("Manor", "Alex", "Investigator")
            .await
            .unwrap();

        harness
            .game
            .save_profile(ProfilePatch {
                appearance: Some("Tall, weathered coat.".to_string()),
                ..ProfilePatch::default()
            })
            .await
            .unwrap();
        assert_eq!(
            harness.state().profile.appearance.as_deref(),
            Some("Tall, weathered coat.")
        );

        // The uploaded document is the serialized form of the new profile.
        let uploaded = harness.remote().last_saved_profile().unwrap();
        assert_eq!(
            PlayerProfile::from_document(&uploaded),
            harness.state().profile
        );

        let before = harness.state().profile.clone();
        harness.remote().go_offline();
        let result = harness
            .game
            .save_profile(ProfilePatch {
                goals: Some("Escape.".to_string()),
                ..ProfilePatch::default()
            })
            .await;
        assert!(matches!(result, Err(CommandError::Remote(_))));
        assert_eq!(harness.state().profile, before);
    }

    #[tokio::test]
    async fn test_save_profile_rejects_blank_name() {
        let mut harness = TestHarness::new();
        harness
            .game
            .start_session("Manor", "Alex", "Investigator")
            .await
            .unwrap();

        let result = harness
            .game
            .save_profile(ProfilePatch {
                name: Some("   ".to_string()),
                ..ProfilePatch::default()
            })
            .await;

        assert!(matches!(result, Err(CommandError::EmptyName)));
        assert_eq!(harness.state().profile.name, "Alex");
        assert!(harness.remote().last_saved_profile().is_none());
    }

    #[tokio::test]
    async fn test_add_note_appends_on_success() {
        let mut harness = TestHarness::new();

        harness.game.add_note("The butler lied.").await.unwrap();
        assert_eq!(harness.state().profile.notes, vec!["The butler lied.".to_string()]);
        assert_eq!(harness.remote().notes_recorded(), vec!["The butler lied.".to_string()]);

        harness.remote().go_offline();
        let result = harness.game.add_note("Unsent note").await;
        assert!(matches!(result, Err(CommandError::Remote(_))));
        assert_eq!(harness.state().profile.notes.len(), 1);
    }

    #[tokio::test]
    async fn test_entity_commands_round_trip() {
        let mut harness = TestHarness::new();

        harness
            .game
            .create_character(CharacterPatch::named("Mira"))
            .await
            .unwrap();
        let id = harness.state().characters[0].id.clone();

        harness
            .game
            .update_character(
                &id,
                CharacterPatch {
                    role: Some("Herbalist".to_string()),
                    ..CharacterPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            harness.state().characters[0].role.as_deref(),
            Some("Herbalist")
        );

        harness.game.delete_character(&id).await.unwrap();
        assert!(harness.state().characters.is_empty());

        // The id is gone for good; later lookups must not resolve it.
        let result = harness
            .game
            .update_character(&id, CharacterPatch::named("Ghost"))
            .await;
        assert!(matches!(result, Err(CommandError::UnknownId(_))));
    }

    #[tokio::test]
    async fn test_create_character_requires_name() {
        let mut harness = TestHarness::new();

        let result = harness.game.create_character(CharacterPatch::default()).await;
        assert!(matches!(result, Err(CommandError::EmptyName)));

        let result = harness.game.create_character(CharacterPatch::named("  ")).await;
        assert!(matches!(result, Err(CommandError::EmptyName)));

        assert!(harness.state().characters.is_empty());
        assert!(harness.remote().characters_snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failed_create_leaves_collection_identical() {
        let mut harness = TestHarness::new();
        harness
            .game
            .create_location(LocationPatch::named("The Docks"))
            .await
            .unwrap();
        let before = harness.state().locations.clone();

        harness.remote().go_offline();
        let result = harness
            .game
            .create_location(LocationPatch::named("Old Town"))
            .await;

        assert!(matches!(result, Err(CommandError::Remote(_))));
        assert_eq!(harness.state().locations, before);
        assert!(!harness.state().busy);
    }

    #[tokio::test]
    async fn test_refresh_replaces_collection_wholesale() {
        let mut harness = TestHarness::new();
        harness
            .game
            .create_character(CharacterPatch::named("Mira"))
            .await
            .unwrap();

        // Another client added a character server-side.
        harness.remote().create_character_record("Orin");

        harness.game.refresh_characters().await.unwrap();
        assert_eq!(harness.state().characters.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_image_attaches_to_profile() {
        let mut harness = TestHarness::new();

        let url = harness
            .game
            .generate_image("a detective in the rain", Some(ImageTarget::Profile))
            .await
            .unwrap();

        assert_eq!(harness.state().profile.image_url.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn test_generate_image_attaches_to_character() {
        let mut harness = TestHarness::new();
        harness
            .game
            .create_character(CharacterPatch::named("Mira"))
            .await
            .unwrap();
        let id = harness.state().characters[0].id.clone();

        let url = harness
            .game
            .generate_image("a herbalist at dusk", Some(ImageTarget::Character(id)))
            .await
            .unwrap();

        assert_eq!(
            harness.state().characters[0].image_url.as_deref(),
            Some(url.as_str())
        );
    }

    #[tokio::test]
    async fn test_generate_character_returns_patch_without_touching_state() {
        let mut harness = TestHarness::new();

        let patch = harness.game.generate_character("Mira", None).await.unwrap();
        assert!(patch.appearance.is_some());
        assert!(harness.state().characters.is_empty());

        let result = harness.game.generate_character("  ", None).await;
        assert!(matches!(result, Err(CommandError::EmptyName)));
    }

    #[tokio::test]
    async fn test_upload_profile_image_sets_reference() {
        let mut harness = TestHarness::new();

        let url = harness
            .game
            .upload_profile_image("aGVsbG8=", "image/png")
            .await
            .unwrap();

        assert_eq!(harness.state().profile.image_url.as_deref(), Some(url.as_str()));
    }
}
