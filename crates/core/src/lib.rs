//! Core library for the Spectrum Ring visualiser.
//!
//! Audio flows one way per frame: the [`AudioEngine`] plays the live clip
//! into the shared [`AnalyzerNode`], the [`FrequencySampler`] copies the
//! analyzer's magnitudes into a fixed snapshot, and the [`ParameterMapper`]
//! turns that snapshot into heights, positions and colours for the
//! [`RingScene`] the renderer draws.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod decode;
pub mod error;
pub mod mapping;
pub mod pipeline;
pub mod render;
pub mod sampler;
pub mod scene;
pub mod timeline;

#[cfg(test)]
pub(crate) mod test_utils;

pub use analysis::{AnalyzerNode, SharedAnalyzer, MAX_BYTE_MAGNITUDE};
pub use audio::{
    AudioEngine, AudioSession, LoadEvent, LoadTicket, PlaybackHandle, PlaybackState, SessionId,
};
pub use config::{AnalyzerConfig, AppConfig, AudioConfig, RingConfig};
pub use decode::{decode_bytes, DecodedClip};
pub use error::{DecodeError, Result, VisualiserError};
pub use mapping::{map_frequencies, resample_indices, ParameterMapper, ParameterUpdate, RingLayout};
pub use pipeline::Visualiser;
pub use render::{Renderer, TextRenderer};
pub use sampler::{FrequencySampler, FrequencySnapshot, SamplerStatus};
pub use scene::{Hsl, RingScene, VisualElement};
pub use timeline::{FrameClock, PlaybackClock};

pub use glam::Vec3;
