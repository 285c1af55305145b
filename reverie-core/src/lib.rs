//! Client-side core for an AI-narrated roleplay game.
//!
//! This crate provides:
//! - A plain-text player profile codec with a stable round-trip contract
//! - Conversation history replay with deterministic, position-derived timestamps
//! - Server-reconciled CRUD collections for characters and locations
//! - A coordinator owning the composed game state behind explicit commands
//!
//! # Quick Start
//!
//! ```ignore
//! use reverie_api::Api;
//! use reverie_core::GameCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = Api::from_env()?;
//!     let mut game = GameCoordinator::new(api);
//!     game.initialize().await?;
//!
//!     game.send_message("I examine the locked drawer").await?;
//!     for message in &game.state().messages {
//!         println!("{:?}: {}", message.origin, message.text);
//!     }
//!     Ok(())
//! }
//! ```

pub mod coordinator;
pub mod history;
pub mod profile;
pub mod remote;
pub mod store;
pub mod testing;

// Re-export the wire types; they double as the record shapes everywhere.
pub use reverie_api::{
    CharacterPatch, CharacterRecord, Error as ApiError, GeneratedImage, LocationPatch,
    LocationRecord, NarrativeTurn, ProfileDocument, SessionRecord, TurnRecord,
};

// Primary public API
pub use coordinator::{CommandError, GameCoordinator, GameState, ImageTarget};
pub use history::{replay, Message, MessageId, Origin};
pub use profile::{Item, PlayerProfile, ProfilePatch, Quest};
pub use remote::Remote;
pub use store::{EntityStore, StoreError, Stored};
pub use testing::{MockRemote, TestHarness};
