//! `layer-client` implementations of the bot and auth seams.
//!
//! * [`LayerConnector`] / [`LayerAuthClient`]: one user-account client per chat,
//!   persisted with `BinaryFileBackend` to `<sessions_dir>/<chat_id>.session`.
//! * [`LayerBot`]: the bot's own connection, used for every outbound message.
//! * [`updates::to_event`]: turns raw updates into controller [`crate::Event`]s.

mod auth;
mod bot;
pub mod updates;

pub use auth::{LayerAuthClient, LayerConnector};
pub use bot::LayerBot;
