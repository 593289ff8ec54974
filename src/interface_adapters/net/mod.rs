// Network adapter modules split by client sockets vs lobby management HTTP routes.

pub mod client;
pub mod internal;

pub use client::{spawn_lobby_serializer, ws_handler};
pub use internal::{create_lobby_handler, get_lobby_handler};
