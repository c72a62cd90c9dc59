// AudioEngineManager: process-wide owner of the audio engine
//
// Single Responsibility: serialise lifecycle calls coming from the host
// application's control thread and log every failure with its error code.
// The JNI exports ignore the returned Result; nothing is ever thrown back
// into the JVM.

use std::sync::{Mutex, MutexGuard};

use log::debug;

use crate::audio::backend::StreamBackend;
use crate::audio::engine::{AudioEngine, EngineState};
use crate::audio::source::SampleSource;
use crate::error::{log_audio_error, AudioError};

/// Manages audio engine lifecycle behind a lock
///
/// The audio callback never takes this lock, so a control call blocked on
/// a slow `stop` cannot stall audio of another stream.
///
/// # Example
/// ```ignore
/// let manager = AudioEngineManager::new(AudioEngine::new(backend, config));
/// let _ = manager.start(cpu_ids, Box::new(source));
/// let _ = manager.pause();
/// let _ = manager.stop();
/// ```
pub struct AudioEngineManager<B: StreamBackend> {
    engine: Mutex<AudioEngine<B>>,
}

impl<B: StreamBackend> AudioEngineManager<B> {
    pub fn new(engine: AudioEngine<B>) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }

    /// Start the engine on the given cores
    ///
    /// # Returns
    /// * `Ok(())` - Stream opened and started
    /// * `Err(AudioError)` - Already logged; safe to discard
    pub fn start(
        &self,
        cpu_ids: Vec<usize>,
        source: Box<dyn SampleSource>,
    ) -> Result<(), AudioError> {
        let mut engine = self.lock_engine("startAudioEngine")?;
        engine
            .start(cpu_ids, source)
            .map_err(|err| Self::logged(err, "startAudioEngine"))
    }

    /// Stop the engine; a no-op when already stopped
    pub fn stop(&self) -> Result<(), AudioError> {
        let mut engine = self.lock_engine("stopAudioEngine")?;
        engine
            .stop()
            .map_err(|err| Self::logged(err, "stopAudioEngine"))
    }

    pub fn pause(&self) -> Result<(), AudioError> {
        let mut engine = self.lock_engine("pauseAudioEngine")?;
        engine
            .pause()
            .map_err(|err| Self::logged(err, "pauseAudioEngine"))
    }

    pub fn resume(&self) -> Result<(), AudioError> {
        let mut engine = self.lock_engine("resumeAudioEngine")?;
        engine
            .resume()
            .map_err(|err| Self::logged(err, "resumeAudioEngine"))
    }

    /// Current engine state, or `Stopped` if the lock is poisoned
    pub fn state(&self) -> EngineState {
        self.lock_engine("state")
            .map(|engine| engine.state())
            .unwrap_or(EngineState::Stopped)
    }

    /// Run `f` with the engine locked
    pub fn with_engine<R>(&self, f: impl FnOnce(&AudioEngine<B>) -> R) -> Result<R, AudioError> {
        let engine = self.lock_engine("with_engine")?;
        Ok(f(&engine))
    }

    // ========================================================================
    // PRIVATE HELPER METHODS
    // ========================================================================

    /// Safely acquire lock on the engine
    ///
    /// # Returns
    /// * `Ok(MutexGuard)` - Lock acquired successfully
    /// * `Err(AudioError::LockPoisoned)` - A previous holder panicked
    fn lock_engine(&self, context: &str) -> Result<MutexGuard<'_, AudioEngine<B>>, AudioError> {
        self.engine.lock().map_err(|_| {
            let err = AudioError::LockPoisoned {
                component: "audio_engine".to_string(),
            };
            log_audio_error(&err, context);
            err
        })
    }

    fn logged(err: AudioError, context: &str) -> AudioError {
        match err {
            // Expected when the host calls pause/resume around a failed start
            AudioError::NotRunning => debug!("{} ignored: engine not running", context),
            _ => log_audio_error(&err, context),
        }
        err
    }
}
