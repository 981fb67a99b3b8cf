//! Twitch EventSub webhook receiver that notifies users about their
//! favourite streamers.

pub mod app;
pub mod background;
pub mod bootstrap;
pub mod config;
pub mod notification;
pub mod server;
pub mod services;
pub mod shutdown;

#[cfg(test)]
mod test_support;

pub use bootstrap::init_foundation;
