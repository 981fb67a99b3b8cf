//! Webhook pipeline, token lifecycle and subscription management.

pub mod batching;
pub mod cache;
pub mod dispatcher;
pub mod favourites;
pub mod helix;
pub mod jobs;
pub mod live;
pub mod reconciler;
pub mod token_manager;
pub mod verifier;
