//! Jitsi Bridge Library
//!
//! This library turns a chat-platform text command into a Jitsi meeting:
//! it resolves a meeting name from the requester's preferences, optionally
//! gates room entry behind a signed access token, shortens the join link
//! and emits the meeting notification back into the channel.
//!
//! # Modules
//!
//! - `config` - Immutable configuration snapshots and the reloadable store
//! - `errors` - Error types
//! - `models` - Data models (preferences, sessions, naming schemes)
//! - `naming` - Meeting identifier / topic resolution
//! - `token` - Room-access token signing and verification
//! - `platform` - Host chat-platform collaborator interface
//! - `settings` - Per-user settings store
//! - `services` - Meeting orchestration and URL shortening
//! - `handlers` - Text command dispatch
//! - `observability` - Tracing initialization

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod naming;
pub mod observability;
pub mod platform;
pub mod services;
pub mod settings;
pub mod token;
