// Use cases layer: application workflows for the match server.

pub mod game;
pub mod lobby;
pub mod session;
pub mod types;

pub use lobby::{LobbyError, LobbyHandle, LobbyRegistry, LobbySettings};
pub use session::GameSession;
pub use types::{ClientIntent, GameEvent, IntentOutcome, WorldUpdate};
