// KTNES Audio - native audio relay for the KTNES emulator
// Real-time output stream fed from the emulator's sample buffers

// Module declarations
pub mod audio;
pub mod config;
pub mod error;
pub mod managers;

#[cfg(target_os = "android")]
pub mod jni_bridge;

// Re-exports for convenience
pub use audio::{AudioEngine, EngineState, OutputCallback, SampleSource};
pub use config::AppConfig;
pub use error::{AudioError, ErrorCode};
pub use managers::AudioEngineManager;
