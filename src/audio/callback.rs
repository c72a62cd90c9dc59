//! Audio Output Callback - per-period relay from the sample source to the stream
//!
//! Each period the callback:
//! 1. pins its own thread once per engine instance ([`ThreadAffinity`]),
//! 2. asks the [`SampleSource`] for the next mono buffer,
//! 3. copies it into the output, duplicating mono to every channel.
//!
//! # Architecture
//! ```text
//! AudioEngine::start()
//!   └─> OutputCallback::new()
//!       └─> StreamBackend::open()
//!           └─> OutputCallback::render_stereo() / render_interleaved() [Real-time thread]
//!               ├─> ThreadAffinity::apply_once()
//!               ├─> SampleSource::next_buffer()
//!               └─> frames::copy_mono_to_*()
//! ```
//!
//! A failing source produces a silent period; the stream is never stopped
//! from inside the callback.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::warn;

use super::affinity::ThreadAffinity;
use super::frames::{copy_mono_to_interleaved, copy_mono_to_stereo};
use super::source::SampleSource;
use crate::error::{AudioError, ErrorCode};

/// Output callback state, owned by the platform stream
pub struct OutputCallback {
    source: Box<dyn SampleSource>,
    affinity: ThreadAffinity,
    /// Frames written since the engine was created, shared with the engine
    frame_counter: Arc<AtomicU64>,
    /// Consecutive failed periods
    failures: u64,
    log_every_n_failures: u64,
}

impl OutputCallback {
    pub fn new(
        source: Box<dyn SampleSource>,
        affinity: ThreadAffinity,
        frame_counter: Arc<AtomicU64>,
        log_every_n_failures: u64,
    ) -> Self {
        Self {
            source,
            affinity,
            frame_counter,
            failures: 0,
            log_every_n_failures: log_every_n_failures.max(1),
        }
    }

    /// Fill planar stereo frames (Oboe's `(f32, Stereo)` frame type)
    pub fn render_stereo(&mut self, frames: &mut [(f32, f32)]) {
        self.affinity.apply_once();

        match self.source.next_buffer(frames.len()) {
            Ok(buffer) => {
                copy_mono_to_stereo(buffer, frames);
                self.failures = 0;
            }
            Err(err) => {
                frames.fill((0.0, 0.0));
                self.report_failure(&err);
            }
        }

        self.frame_counter
            .fetch_add(frames.len() as u64, Ordering::Relaxed);
    }

    /// Fill an interleaved buffer with `channels` channels per frame
    pub fn render_interleaved(&mut self, out: &mut [f32], channels: usize) {
        self.affinity.apply_once();

        let period = if channels == 0 { 0 } else { out.len() / channels };
        match self.source.next_buffer(period) {
            Ok(buffer) => {
                copy_mono_to_interleaved(buffer, out, channels);
                self.failures = 0;
            }
            Err(err) => {
                out.fill(0.0);
                self.report_failure(&err);
            }
        }

        self.frame_counter
            .fetch_add(period as u64, Ordering::Relaxed);
    }

    fn report_failure(&mut self, err: &AudioError) {
        if self.failures % self.log_every_n_failures == 0 {
            warn!(
                "Sample source failed (code={}, {} consecutive): {}",
                err.code(),
                self.failures + 1,
                err.message()
            );
        }
        self.failures += 1;
    }
}

#[cfg(target_os = "android")]
impl oboe::AudioOutputCallback for OutputCallback {
    type FrameType = (f32, oboe::Stereo);

    fn on_audio_ready(
        &mut self,
        _stream: &mut dyn oboe::AudioOutputStreamSafe,
        frames: &mut [(f32, f32)],
    ) -> oboe::DataCallbackResult {
        self.render_stereo(frames);
        oboe::DataCallbackResult::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::ring_source;
    use std::sync::atomic::AtomicBool;

    /// Source that fails every call
    struct BrokenSource;

    impl SampleSource for BrokenSource {
        fn next_buffer(&mut self, _frames: usize) -> Result<&[f32], AudioError> {
            Err(AudioError::JniFailure {
                reason: "audioBuffer threw".to_string(),
            })
        }
    }

    fn affinity() -> (ThreadAffinity, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (ThreadAffinity::new(Vec::new(), Arc::clone(&flag)), flag)
    }

    #[test]
    fn test_render_stereo_relays_source() {
        let (mut producer, source) = ring_source(64, 16);
        let (affinity, flag) = affinity();
        let counter = Arc::new(AtomicU64::new(0));
        let mut callback =
            OutputCallback::new(Box::new(source), affinity, Arc::clone(&counter), 10);

        producer.push_slice(&[0.25, -0.25]);
        let mut frames: [(f32, f32); 4] = [(1.0, 1.0); 4];

        // Keep the test runner thread unpinned
        let frames = std::thread::spawn(move || {
            callback.render_stereo(&mut frames);
            frames
        })
        .join()
        .unwrap();

        assert_eq!(frames, [(0.25, 0.25), (-0.25, -0.25), (0.0, 0.0), (0.0, 0.0)]);
        assert_eq!(counter.load(Ordering::Relaxed), 4);
        assert!(flag.load(Ordering::Acquire), "Affinity should be attempted");
    }

    #[test]
    fn test_render_interleaved_counts_frames() {
        let (mut producer, source) = ring_source(64, 16);
        let (affinity, _flag) = affinity();
        let counter = Arc::new(AtomicU64::new(0));
        let mut callback =
            OutputCallback::new(Box::new(source), affinity, Arc::clone(&counter), 10);

        producer.push_slice(&[0.5, 0.5, 0.5]);

        let out = std::thread::spawn(move || {
            let mut out: [f32; 8] = [9.0; 8];
            callback.render_interleaved(&mut out, 2);
            out
        })
        .join()
        .unwrap();

        assert_eq!(out, [0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.0, 0.0]);
        assert_eq!(counter.load(Ordering::Relaxed), 4);
    }

    #[test]
    fn test_failing_source_renders_silence() {
        let (affinity, _flag) = affinity();
        let counter = Arc::new(AtomicU64::new(0));
        let mut callback =
            OutputCallback::new(Box::new(BrokenSource), affinity, Arc::clone(&counter), 2);

        let (frames, failures) = std::thread::spawn(move || {
            let mut frames: [(f32, f32); 3] = [(0.7, 0.7); 3];
            for _ in 0..5 {
                frames.fill((0.7, 0.7));
                callback.render_stereo(&mut frames);
            }
            (frames, callback.failures)
        })
        .join()
        .unwrap();

        assert_eq!(frames, [(0.0, 0.0); 3]);
        assert_eq!(failures, 5);
        assert_eq!(counter.load(Ordering::Relaxed), 15, "Silent periods still count");
    }

    #[test]
    fn test_affinity_attempted_once_across_periods() {
        let (_producer, source) = ring_source(8, 8);
        let flag = Arc::new(AtomicBool::new(false));
        let affinity = ThreadAffinity::new(Vec::new(), Arc::clone(&flag));
        let shared = affinity.clone();
        let mut callback =
            OutputCallback::new(Box::new(source), affinity, Arc::new(AtomicU64::new(0)), 10);

        std::thread::spawn(move || {
            let mut frames = [(0.0, 0.0); 2];
            callback.render_stereo(&mut frames);
            callback.render_stereo(&mut frames);
        })
        .join()
        .unwrap();

        assert!(shared.is_applied());
        assert!(shared.apply_once().is_none(), "Flag must already be consumed");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_affinity_failure_keeps_audio_flowing() {
        let (mut producer, source) = ring_source(16, 16);
        let flag = Arc::new(AtomicBool::new(false));
        let affinity = ThreadAffinity::new(vec![1000], Arc::clone(&flag));
        let counter = Arc::new(AtomicU64::new(0));
        let mut callback =
            OutputCallback::new(Box::new(source), affinity, Arc::clone(&counter), 10);

        producer.push_slice(&[0.5, 0.5]);

        let frames = std::thread::spawn(move || {
            let mut frames: [(f32, f32); 2] = [(0.0, 0.0); 2];
            callback.render_stereo(&mut frames);
            frames
        })
        .join()
        .unwrap();

        assert_eq!(frames, [(0.5, 0.5), (0.5, 0.5)]);
        assert_eq!(counter.load(Ordering::Relaxed), 2);
        assert!(flag.load(Ordering::Acquire));
    }
}
