// Managers Module
//
// - AudioEngineManager: lock-guarded engine lifecycle behind the JNI exports

pub mod audio_engine_manager;

pub use audio_engine_manager::AudioEngineManager;
