// Audio error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;

/// Audio error code constants
///
/// These constants are the single source of truth for the codes written to
/// the log when a failure is swallowed at the JNI boundary.
///
/// Error code range: 2001-2009
pub struct AudioErrorCodes {}

impl AudioErrorCodes {
    /// Audio engine already has an open stream
    pub const ALREADY_RUNNING: i32 = 2001;

    /// Audio engine has no open stream
    pub const NOT_RUNNING: i32 = 2002;

    /// Failed to open the output stream
    pub const STREAM_OPEN_FAILED: i32 = 2003;

    /// Stream state change (start/pause/close) was rejected by the platform
    pub const HARDWARE_ERROR: i32 = 2004;

    /// Mutex was poisoned
    pub const LOCK_POISONED: i32 = 2005;

    /// A JNI call (class lookup, method call, array access) failed
    pub const JNI_FAILURE: i32 = 2006;

    /// The callback thread could not be attached to the JVM
    pub const THREAD_ATTACH_FAILED: i32 = 2007;

    /// sched_setaffinity rejected the requested core set
    pub const AFFINITY_FAILED: i32 = 2008;

    /// Operation is not available on this platform
    pub const UNSUPPORTED: i32 = 2009;
}

/// Log an audio error with structured context
///
/// This function logs audio errors with structured fields including:
/// - error_code: Numeric error code for programmatic handling
/// - component: The component where the error occurred
/// - message: Human-readable error message
/// - context: Additional contextual information
///
/// The logging is non-blocking and will not panic on failure.
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: code={}, component=AudioEngine, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio-related errors
///
/// These errors cover the engine lifecycle, the platform stream, the JVM
/// bridge and callback-thread tuning.
///
/// Error code ranges: 2001-2009
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Audio engine already has an open stream
    AlreadyRunning,

    /// Audio engine has no open stream
    NotRunning,

    /// Failed to open the output stream
    StreamOpenFailed { reason: String },

    /// Stream state change was rejected by the platform
    HardwareError { details: String },

    /// Mutex was poisoned
    LockPoisoned { component: String },

    /// A JNI call failed
    JniFailure { reason: String },

    /// The callback thread could not be attached to the JVM
    ThreadAttachFailed { reason: String },

    /// sched_setaffinity failed with the given errno
    AffinityFailed { errno: i32 },

    /// Operation is not available on this platform
    Unsupported { operation: String },
}

impl ErrorCode for AudioError {
    fn code(&self) -> i32 {
        match self {
            AudioError::AlreadyRunning => AudioErrorCodes::ALREADY_RUNNING,
            AudioError::NotRunning => AudioErrorCodes::NOT_RUNNING,
            AudioError::StreamOpenFailed { .. } => AudioErrorCodes::STREAM_OPEN_FAILED,
            AudioError::HardwareError { .. } => AudioErrorCodes::HARDWARE_ERROR,
            AudioError::LockPoisoned { .. } => AudioErrorCodes::LOCK_POISONED,
            AudioError::JniFailure { .. } => AudioErrorCodes::JNI_FAILURE,
            AudioError::ThreadAttachFailed { .. } => AudioErrorCodes::THREAD_ATTACH_FAILED,
            AudioError::AffinityFailed { .. } => AudioErrorCodes::AFFINITY_FAILED,
            AudioError::Unsupported { .. } => AudioErrorCodes::UNSUPPORTED,
        }
    }

    fn message(&self) -> String {
        match self {
            AudioError::AlreadyRunning => {
                "Audio engine already running. Call stopAudioEngine() first.".to_string()
            }
            AudioError::NotRunning => {
                "Audio engine not running. Call startAudioEngine() first.".to_string()
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => {
                format!("Hardware error: {}", details)
            }
            AudioError::LockPoisoned { component } => {
                format!("Lock poisoned on {}", component)
            }
            AudioError::JniFailure { reason } => {
                format!("JNI call failed: {}", reason)
            }
            AudioError::ThreadAttachFailed { reason } => {
                format!("Failed to attach audio thread to the JVM: {}", reason)
            }
            AudioError::AffinityFailed { errno } => {
                format!("Error setting thread affinity (errno {})", errno)
            }
            AudioError::Unsupported { operation } => {
                format!("{} is not supported on this platform", operation)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AudioError::{:?} (code {}): {}",
            self,
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_error_codes() {
        assert_eq!(
            AudioError::AlreadyRunning.code(),
            AudioErrorCodes::ALREADY_RUNNING
        );
        assert_eq!(AudioError::NotRunning.code(), AudioErrorCodes::NOT_RUNNING);
        assert_eq!(
            AudioError::StreamOpenFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::STREAM_OPEN_FAILED
        );
        assert_eq!(
            AudioError::HardwareError {
                details: "test".to_string()
            }
            .code(),
            AudioErrorCodes::HARDWARE_ERROR
        );
        assert_eq!(
            AudioError::LockPoisoned {
                component: "test".to_string()
            }
            .code(),
            AudioErrorCodes::LOCK_POISONED
        );
        assert_eq!(
            AudioError::JniFailure {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::JNI_FAILURE
        );
        assert_eq!(
            AudioError::ThreadAttachFailed {
                reason: "test".to_string()
            }
            .code(),
            AudioErrorCodes::THREAD_ATTACH_FAILED
        );
        assert_eq!(
            AudioError::AffinityFailed { errno: 22 }.code(),
            AudioErrorCodes::AFFINITY_FAILED
        );
        assert_eq!(
            AudioError::Unsupported {
                operation: "test".to_string()
            }
            .code(),
            AudioErrorCodes::UNSUPPORTED
        );
    }

    #[test]
    fn test_audio_error_messages() {
        let err = AudioError::AlreadyRunning;
        assert!(err.message().contains("already running"));

        let err = AudioError::NotRunning;
        assert!(err.message().contains("not running"));

        let err = AudioError::HardwareError {
            details: "test error".to_string(),
        };
        assert_eq!(err.message(), "Hardware error: test error");

        let err = AudioError::AffinityFailed { errno: 22 };
        assert_eq!(err.message(), "Error setting thread affinity (errno 22)");

        let err = AudioError::Unsupported {
            operation: "Thread affinity".to_string(),
        };
        assert_eq!(
            err.message(),
            "Thread affinity is not supported on this platform"
        );
    }

    #[test]
    fn test_audio_error_display() {
        let err = AudioError::StreamOpenFailed {
            reason: "no device".to_string(),
        };
        let display = format!("{}", err);
        assert!(display.contains("AudioError"));
        assert!(display.contains(&err.code().to_string()));
        assert!(display.contains("no device"));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::other("test io error");
        let audio_err: AudioError = io_err.into();
        match audio_err {
            AudioError::HardwareError { details } => {
                assert!(details.contains("test io error"));
            }
            _ => panic!("Expected HardwareError"),
        }
    }
}
