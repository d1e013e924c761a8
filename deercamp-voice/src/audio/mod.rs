//! Symphonia playback backend and its audio pipeline

pub mod backend;
pub mod decoder;
#[cfg(feature = "device-output")]
pub mod output;
pub mod renderer;
#[cfg(feature = "device-output")]
pub mod resampler;
pub mod source;

pub use backend::{SymphoniaBackend, SymphoniaHandle};
pub use decoder::{ClipDecoder, DecodedClip};
pub use renderer::{ClipRenderer, PlayCursor};
pub use source::ClipSource;
