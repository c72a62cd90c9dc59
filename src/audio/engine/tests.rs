use super::*;
use crate::audio::backend::StubBackend;
use crate::audio::source::ring_source;

fn engine() -> (AudioEngine<StubBackend>, StubBackend) {
    let backend = StubBackend::new();
    let engine = AudioEngine::new(backend.clone(), AudioConfig::default());
    (engine, backend)
}

fn silent_source() -> Box<dyn SampleSource> {
    let (_producer, source) = ring_source(8, 8);
    Box::new(source)
}

#[test]
fn test_audio_engine_creation() {
    let (engine, backend) = engine();
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(!engine.is_open());
    assert!(!engine.affinity_applied());
    assert_eq!(engine.frames_rendered(), 0);
    assert_eq!(backend.open_count(), 0);
}

#[test]
fn test_start_opens_and_plays() {
    let (mut engine, backend) = engine();

    engine.start(vec![1, 2], silent_source()).unwrap();

    assert_eq!(engine.state(), EngineState::Running);
    assert!(engine.is_open());
    assert_eq!(engine.cpu_ids(), &[1, 2]);
    assert!(backend.is_playing());
    assert_eq!(backend.open_count(), 1);
}

#[test]
fn test_start_twice_is_rejected() {
    let (mut engine, backend) = engine();
    engine.start(Vec::new(), silent_source()).unwrap();

    let result = engine.start(Vec::new(), silent_source());

    assert_eq!(result, Err(AudioError::AlreadyRunning));
    assert_eq!(backend.open_count(), 1, "No second stream should be opened");
}

#[test]
fn test_start_while_paused_is_rejected() {
    let (mut engine, _backend) = engine();
    engine.start(Vec::new(), silent_source()).unwrap();
    engine.pause().unwrap();

    assert_eq!(
        engine.start(Vec::new(), silent_source()),
        Err(AudioError::AlreadyRunning)
    );
    assert_eq!(engine.state(), EngineState::Paused);
}

#[test]
fn test_stop_closes_stream() {
    let (mut engine, backend) = engine();
    engine.start(Vec::new(), silent_source()).unwrap();

    engine.stop().unwrap();

    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(!engine.is_open());
    assert!(!backend.is_open());
    assert!(backend.pump(4).is_none());
}

#[test]
fn test_stop_when_stopped_is_noop() {
    let (mut engine, _backend) = engine();
    assert!(engine.stop().is_ok());
    assert!(engine.stop().is_ok());
}

#[test]
fn test_pause_and_resume() {
    let (mut engine, backend) = engine();
    engine.start(Vec::new(), silent_source()).unwrap();

    engine.pause().unwrap();
    assert_eq!(engine.state(), EngineState::Paused);
    assert!(engine.is_open(), "Pause must keep the handle");
    assert!(!backend.is_playing());

    // Pausing twice is harmless
    engine.pause().unwrap();

    engine.resume().unwrap();
    assert_eq!(engine.state(), EngineState::Running);
    assert!(backend.is_playing());

    // Resuming a running stream is harmless
    engine.resume().unwrap();
    assert_eq!(backend.open_count(), 1);
}

#[test]
fn test_pause_resume_require_stream() {
    let (mut engine, _backend) = engine();
    assert_eq!(engine.pause(), Err(AudioError::NotRunning));
    assert_eq!(engine.resume(), Err(AudioError::NotRunning));
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn test_open_failure_leaves_engine_stopped() {
    let (mut engine, backend) = engine();
    backend.fail_next_open();

    let result = engine.start(Vec::new(), silent_source());

    assert!(matches!(result, Err(AudioError::StreamOpenFailed { .. })));
    assert_eq!(engine.state(), EngineState::Stopped);
    assert!(!engine.is_open());

    // Next attempt succeeds
    engine.start(Vec::new(), silent_source()).unwrap();
    assert_eq!(engine.state(), EngineState::Running);
}

#[test]
fn test_start_failure_closes_stream() {
    let (mut engine, backend) = engine();
    backend.fail_next_start();

    let result = engine.start(Vec::new(), silent_source());

    assert!(matches!(result, Err(AudioError::HardwareError { .. })));
    assert!(!engine.is_open());
    assert!(!backend.is_open(), "Half-open stream must be closed");
}

#[test]
fn test_callback_relays_samples() {
    let (mut engine, backend) = engine();
    let (mut producer, source) = ring_source(64, 32);
    engine.start(Vec::new(), Box::new(source)).unwrap();

    producer.push_slice(&[0.1, 0.2, 0.3]);
    let frames = std::thread::spawn(move || backend.pump(4))
        .join()
        .unwrap()
        .expect("Running stream should render");

    assert_eq!(frames, vec![(0.1, 0.1), (0.2, 0.2), (0.3, 0.3), (0.0, 0.0)]);
    assert_eq!(engine.frames_rendered(), 4);
    assert!(engine.affinity_applied());
}

#[test]
fn test_paused_stream_does_not_render() {
    let (mut engine, backend) = engine();
    engine.start(Vec::new(), silent_source()).unwrap();
    engine.pause().unwrap();

    assert!(backend.pump(4).is_none());
    assert_eq!(engine.frames_rendered(), 0);
}

#[test]
fn test_affinity_not_reapplied_after_restart() {
    let (mut engine, backend) = engine();

    engine.start(Vec::new(), silent_source()).unwrap();
    let pump = backend.clone();
    std::thread::spawn(move || pump.pump(2)).join().unwrap();
    assert!(engine.affinity_applied());
    engine.stop().unwrap();

    engine.start(vec![0], silent_source()).unwrap();
    assert!(
        engine.affinity_applied(),
        "Flag belongs to the engine and survives stop/start"
    );
    assert_eq!(engine.cpu_ids(), &[0]);
    assert_eq!(backend.open_count(), 2);
}
