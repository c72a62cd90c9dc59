// Audio module - output stream lifecycle and the per-period sample relay

pub mod affinity;
pub mod backend;
pub mod callback;
pub mod engine;
pub mod frames;
pub mod source;

// Re-export commonly used types for convenience
pub use affinity::ThreadAffinity;
pub use backend::{OutputStream, StreamBackend, StubBackend};
pub use callback::OutputCallback;
pub use engine::{AudioEngine, EngineState};
pub use source::{ring_source, RetryGate, RingSource, SampleProducer, SampleSource};
