use std::sync::{Arc, Mutex, MutexGuard};

use crate::audio::callback::OutputCallback;
use crate::config::AudioConfig;
use crate::error::AudioError;

use super::{OutputStream, StreamBackend};

/// In-process backend used for deterministic testing and CLI dry runs.
///
/// No device is opened. The callback is held in shared state and driven
/// synchronously with [`StubBackend::pump`], so tests can observe exactly
/// what a real stream would have played.
#[derive(Clone, Default)]
pub struct StubBackend {
    shared: Arc<Mutex<StubShared>>,
}

#[derive(Default)]
struct StubShared {
    callback: Option<OutputCallback>,
    playing: bool,
    opened: u32,
    fail_next_open: bool,
    fail_next_start: bool,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StubShared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the next `open` fail with `StreamOpenFailed`
    pub fn fail_next_open(&self) {
        self.lock().fail_next_open = true;
    }

    /// Make the next `start` fail with `HardwareError`
    pub fn fail_next_start(&self) {
        self.lock().fail_next_start = true;
    }

    pub fn is_open(&self) -> bool {
        self.lock().callback.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.lock().playing
    }

    /// Number of streams opened so far
    pub fn open_count(&self) -> u32 {
        self.lock().opened
    }

    /// Run one stereo period of `frames` frames on the calling thread
    ///
    /// # Returns
    /// The rendered frames, or `None` if no stream is open and playing.
    pub fn pump(&self, frames: usize) -> Option<Vec<(f32, f32)>> {
        let mut shared = self.lock();
        if !shared.playing {
            return None;
        }
        let callback = shared.callback.as_mut()?;

        let mut out = vec![(0.0, 0.0); frames];
        callback.render_stereo(&mut out);
        Some(out)
    }
}

/// Stream handle returned by [`StubBackend`]
pub struct StubStream {
    shared: Arc<Mutex<StubShared>>,
}

impl StubStream {
    fn lock(&self) -> MutexGuard<'_, StubShared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StreamBackend for StubBackend {
    type Stream = StubStream;

    fn open(
        &mut self,
        callback: OutputCallback,
        _config: &AudioConfig,
    ) -> Result<StubStream, AudioError> {
        let mut shared = self.lock();
        if std::mem::take(&mut shared.fail_next_open) {
            return Err(AudioError::StreamOpenFailed {
                reason: "stub open failure".to_string(),
            });
        }

        shared.callback = Some(callback);
        shared.playing = false;
        shared.opened += 1;

        Ok(StubStream {
            shared: Arc::clone(&self.shared),
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

impl OutputStream for StubStream {
    fn start(&mut self) -> Result<(), AudioError> {
        let mut shared = self.lock();
        if std::mem::take(&mut shared.fail_next_start) {
            return Err(AudioError::HardwareError {
                details: "stub start failure".to_string(),
            });
        }
        shared.playing = true;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.lock().playing = false;
        Ok(())
    }

    fn close(self) -> Result<(), AudioError> {
        let mut shared = self.lock();
        shared.playing = false;
        shared.callback = None;
        Ok(())
    }
}
