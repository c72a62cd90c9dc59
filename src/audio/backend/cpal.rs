//! CPAL-based audio backend for desktop platforms (Linux, macOS, Windows)
//!
//! Opens the default (or a named) output device with its default config.
//! Only `f32` devices are supported; the callback writes interleaved frames
//! for however many channels the device reports.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use log::{debug, error};

use crate::audio::callback::OutputCallback;
use crate::config::AudioConfig;
use crate::error::AudioError;

use super::{OutputStream, StreamBackend};

/// CPAL output backend
#[derive(Debug, Default)]
pub struct CpalBackend {
    device_name: Option<String>,
}

impl CpalBackend {
    /// Backend using the host's default output device
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend using the output device with the given name
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }

    fn find_device(&self, host: &cpal::Host) -> Result<cpal::Device, AudioError> {
        match &self.device_name {
            None => host
                .default_output_device()
                .ok_or_else(|| AudioError::StreamOpenFailed {
                    reason: "No default output device found".to_string(),
                }),
            Some(wanted) => {
                let mut devices =
                    host.output_devices()
                        .map_err(|e| AudioError::StreamOpenFailed {
                            reason: format!("Failed to enumerate output devices: {}", e),
                        })?;
                devices
                    .find(|d| d.name().map(|n| &n == wanted).unwrap_or(false))
                    .ok_or_else(|| AudioError::StreamOpenFailed {
                        reason: format!("Output device {:?} not found", wanted),
                    })
            }
        }
    }
}

/// Opened CPAL stream; dropping it closes the device stream
pub struct CpalStream {
    stream: cpal::Stream,
}

impl StreamBackend for CpalBackend {
    type Stream = CpalStream;

    fn open(
        &mut self,
        mut callback: OutputCallback,
        _config: &AudioConfig,
    ) -> Result<CpalStream, AudioError> {
        let host = cpal::default_host();
        let device = self.find_device(&host)?;

        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to get default output config: {:?}", e),
            })?;

        if supported.sample_format() != cpal::SampleFormat::F32 {
            return Err(AudioError::StreamOpenFailed {
                reason: format!("Unsupported sample format {:?}", supported.sample_format()),
            });
        }

        let stream_config: cpal::StreamConfig = supported.into();
        let channels = stream_config.channels as usize;
        debug!(
            "Opening CPAL stream: {} Hz, {} channels",
            stream_config.sample_rate.0, channels
        );

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback.render_interleaved(data, channels);
                },
                |err| error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Output stream: {:?}", e),
            })?;

        Ok(CpalStream { stream })
    }

    fn name(&self) -> &'static str {
        "cpal"
    }
}

impl OutputStream for CpalStream {
    fn start(&mut self) -> Result<(), AudioError> {
        self.stream.play().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to start output stream: {}", e),
        })
    }

    fn pause(&mut self) -> Result<(), AudioError> {
        self.stream.pause().map_err(|e| AudioError::HardwareError {
            details: format!("Failed to pause output stream: {}", e),
        })
    }

    fn close(self) -> Result<(), AudioError> {
        drop(self.stream);
        Ok(())
    }
}
