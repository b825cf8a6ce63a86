//! Service layer for the Jitsi bridge.
//!
//! # Components
//!
//! - `meeting` - Meeting orchestration: routing, naming, token issuance,
//!   link shortening and notification delivery
//! - `shortener` - HTTP client for the external URL-shortening service

pub mod meeting;
pub mod shortener;

pub use meeting::MeetingService;
pub use shortener::ShortenerClient;
