//! AudioEngine - lifecycle of the single output stream
//!
//! The engine owns at most one open stream. `start` opens it and begins
//! callbacks, `stop` closes it and clears the handle, `pause`/`resume` toggle
//! callbacks without closing.
//!
//! Thread safety:
//! - Control methods take `&mut self`; callers serialise them
//!   (see [`crate::managers::AudioEngineManager`])
//! - The callback thread shares only the affinity flag and the frame
//!   counter with the engine, both atomics

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};

use super::affinity::ThreadAffinity;
use super::backend::{OutputStream, StreamBackend};
use super::callback::OutputCallback;
use super::source::SampleSource;
use crate::config::AudioConfig;
use crate::error::AudioError;

/// Observable engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No stream handle
    Stopped,
    /// Stream open and calling back
    Running,
    /// Stream open, callbacks suspended
    Paused,
}

/// Audio engine relaying a [`SampleSource`] to a platform output stream
///
/// # Example
/// ```ignore
/// let mut engine = AudioEngine::new(OboeBackend::new(), AudioConfig::default());
/// engine.start(vec![4, 5], Box::new(source))?;
/// engine.pause()?;
/// engine.resume()?;
/// engine.stop()?;
/// ```
pub struct AudioEngine<B: StreamBackend> {
    backend: B,
    config: AudioConfig,
    /// Exclusively owned stream handle; `None` when stopped
    stream: Option<B::Stream>,
    state: EngineState,
    /// Cores the callback thread is pinned to, fixed by the last `start`
    cpu_ids: Vec<usize>,
    /// Set by the first callback of this engine instance, never cleared
    affinity_applied: Arc<AtomicBool>,
    /// Frames rendered across all streams of this engine
    frame_counter: Arc<AtomicU64>,
}

impl<B: StreamBackend> AudioEngine<B> {
    pub fn new(backend: B, config: AudioConfig) -> Self {
        Self {
            backend,
            config,
            stream: None,
            state: EngineState::Stopped,
            cpu_ids: Vec::new(),
            affinity_applied: Arc::new(AtomicBool::new(false)),
            frame_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Open the output stream and begin callbacks
    ///
    /// # Arguments
    /// * `cpu_ids` - Cores to pin the callback thread to; empty means "the
    ///   core the callback first runs on"
    /// * `source` - Supplier of the next mono buffer for every period
    ///
    /// # Errors
    /// - `AlreadyRunning` if a stream is open (running or paused)
    /// - `StreamOpenFailed` / `HardwareError` from the backend; the engine
    ///   stays stopped
    pub fn start(
        &mut self,
        cpu_ids: Vec<usize>,
        source: Box<dyn SampleSource>,
    ) -> Result<(), AudioError> {
        debug!("AudioEngine start() on {} backend", self.backend.name());
        if self.stream.is_some() {
            return Err(AudioError::AlreadyRunning);
        }

        let affinity = ThreadAffinity::new(cpu_ids.clone(), Arc::clone(&self.affinity_applied));
        let callback = OutputCallback::new(
            source,
            affinity,
            Arc::clone(&self.frame_counter),
            self.config.log_every_n_failures,
        );

        let mut stream = self.backend.open(callback, &self.config)?;
        if let Err(err) = stream.start() {
            // Leave no half-open handle behind
            let _ = stream.close();
            return Err(err);
        }

        info!("Audio stream started (cpu_ids={:?})", cpu_ids);
        self.cpu_ids = cpu_ids;
        self.stream = Some(stream);
        self.state = EngineState::Running;
        Ok(())
    }

    /// Close the stream and invalidate the handle
    ///
    /// Safe to call when already stopped.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        debug!("AudioEngine stop()");
        self.state = EngineState::Stopped;
        match self.stream.take() {
            Some(stream) => stream.close(),
            None => Ok(()),
        }
    }

    /// Suspend callbacks without closing the stream
    ///
    /// # Errors
    /// `NotRunning` if no stream is open
    pub fn pause(&mut self) -> Result<(), AudioError> {
        debug!("AudioEngine pause()");
        let stream = self.stream.as_mut().ok_or(AudioError::NotRunning)?;
        if self.state == EngineState::Paused {
            return Ok(());
        }
        stream.pause()?;
        self.state = EngineState::Paused;
        Ok(())
    }

    /// Resume callbacks on a paused stream
    ///
    /// # Errors
    /// `NotRunning` if no stream is open
    pub fn resume(&mut self) -> Result<(), AudioError> {
        debug!("AudioEngine resume()");
        let stream = self.stream.as_mut().ok_or(AudioError::NotRunning)?;
        if self.state == EngineState::Running {
            return Ok(());
        }
        stream.start()?;
        self.state = EngineState::Running;
        Ok(())
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub fn cpu_ids(&self) -> &[usize] {
        &self.cpu_ids
    }

    /// Whether the callback thread has been pinned (or pinning attempted)
    pub fn affinity_applied(&self) -> bool {
        self.affinity_applied.load(Ordering::Acquire)
    }

    /// Total frames rendered since the engine was created
    pub fn frames_rendered(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[cfg(test)]
mod tests;
