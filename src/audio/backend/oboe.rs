use log::debug;
use oboe::{
    AudioStream, AudioStreamAsync, AudioStreamBase, AudioStreamBuilder, Output,
    PerformanceMode as OboePerformanceMode, SharingMode, Stereo, Usage,
};

use crate::audio::callback::OutputCallback;
use crate::config::{AudioConfig, PerformanceMode, StreamUsage};
use crate::error::AudioError;

use super::{OutputStream, StreamBackend};

/// Android backend that drives the Oboe output stream.
#[derive(Debug, Default)]
pub struct OboeBackend;

impl OboeBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Opened Oboe stream; dropping it closes the underlying AAudio/OpenSL stream
pub struct OboeStream {
    stream: AudioStreamAsync<Output, OutputCallback>,
}

fn performance_mode(mode: PerformanceMode) -> OboePerformanceMode {
    match mode {
        PerformanceMode::None => OboePerformanceMode::None,
        PerformanceMode::LowLatency => OboePerformanceMode::LowLatency,
        PerformanceMode::PowerSaving => OboePerformanceMode::PowerSaving,
    }
}

fn stream_usage(usage: StreamUsage) -> Usage {
    match usage {
        StreamUsage::Game => Usage::Game,
        StreamUsage::Media => Usage::Media,
    }
}

impl StreamBackend for OboeBackend {
    type Stream = OboeStream;

    fn open(
        &mut self,
        callback: OutputCallback,
        config: &AudioConfig,
    ) -> Result<OboeStream, AudioError> {
        let sharing_mode = if config.exclusive {
            SharingMode::Exclusive
        } else {
            SharingMode::Shared
        };

        let stream = AudioStreamBuilder::default()
            .set_performance_mode(performance_mode(config.performance_mode))
            .set_usage(stream_usage(config.usage))
            .set_sharing_mode(sharing_mode)
            .set_direction::<Output>()
            .set_format::<f32>()
            .set_channel_count::<Stereo>()
            .set_callback(callback)
            .open_stream()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Output stream: {:?}", e),
            })?;

        debug!(
            "Opened Oboe stream: {} Hz, {} frames per burst",
            stream.get_sample_rate(),
            stream.get_frames_per_burst()
        );

        Ok(OboeStream { stream })
    }

    fn name(&self) -> &'static str {
        "oboe"
    }
}

impl OutputStream for OboeStream {
    fn start(&mut self) -> Result<(), AudioError> {
        self.stream
            .request_start()
            .map_err(|e| AudioError::HardwareError {
                details: format!("Failed to start output stream: {:?}", e),
            })
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.stream.pause().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to pause output stream: {:?}", e),
        })
    }

    fn close(mut self) -> Result<(), AudioError> {
        let result = self.stream.stop().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to stop output stream: {:?}", e),
        });
        // Dropping the stream closes it whether or not stop succeeded
        drop(self);
        result
    }
}
