// Domain layer: match rules, entity ownership and change notifications.

pub mod arbiter;
pub mod clock;
pub mod events;
pub mod machine;
pub mod projection;
pub mod registry;
pub mod state;

pub use arbiter::{CollectOutcome, RejectReason, request_collect};
pub use events::{ChangeFeed, EventSink, FieldChange, ServerEvent};
pub use machine::{ConfigError, MatchStateMachine};
pub use projection::SessionProjection;
pub use registry::EntityRegistry;
pub use state::{
    AreaBounds, CollectibleEntity, Difficulty, EndCheckOrder, EntityId, EntitySnapshot,
    MatchResult, MatchSettings, Position, SessionPhase, SessionSnapshot, SettingsError,
};
