// Error types for the KTNES audio bridge
//
// This module defines the audio error type shared by the engine, the stream
// backends and the JNI layer, with numeric codes for structured logging.

mod audio;

pub use audio::{log_audio_error, AudioError, AudioErrorCodes};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, so every failure that is swallowed at the
/// JNI boundary still leaves a greppable log line.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
