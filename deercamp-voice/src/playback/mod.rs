//! Voice-note playback session management

pub mod backend;
pub mod clip;
pub mod events;
pub mod manager;

pub use backend::{PlaybackBackend, PlaybackHandle};
pub use clip::ClipRef;
pub use events::{BackendEvent, BackendEvents};
pub use manager::PlaybackSessionManager;
