//! Stream backend abstractions for the audio engine.
//!
//! A backend opens a platform output stream that drives an
//! [`OutputCallback`]. The engine only ever talks to the stream through
//! [`OutputStream`], so the lifecycle logic is shared between Oboe on
//! Android, CPAL on desktop and the in-process stub used by tests.

use crate::config::AudioConfig;
use crate::error::AudioError;

use super::callback::OutputCallback;

/// Handle to an opened output stream, exclusively owned by the engine
pub trait OutputStream {
    /// Begin (or resume) callbacks
    fn start(&mut self) -> Result<(), AudioError>;

    /// Suspend callbacks, keeping the stream open
    fn pause(&mut self) -> Result<(), AudioError>;

    /// Stop callbacks and release the stream. Blocks until closed.
    fn close(self) -> Result<(), AudioError>;
}

/// Trait implemented by platform-specific audio backends.
pub trait StreamBackend {
    type Stream: OutputStream;

    /// Open a stopped stereo float stream that will invoke `callback`
    fn open(
        &mut self,
        callback: OutputCallback,
        config: &AudioConfig,
    ) -> Result<Self::Stream, AudioError>;

    /// Short name for log lines
    fn name(&self) -> &'static str;
}

#[cfg(target_os = "android")]
mod oboe;
#[cfg(target_os = "android")]
pub use oboe::{OboeBackend, OboeStream};

#[cfg(not(target_os = "android"))]
mod cpal;
#[cfg(not(target_os = "android"))]
pub use cpal::{CpalBackend, CpalStream};

mod stub;
pub use stub::{StubBackend, StubStream};
