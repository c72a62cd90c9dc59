//! Desktop harness for the audio relay
//!
//! Drives the same engine, callback and affinity code the Android library
//! uses, with a test tone standing in for the emulator's sample buffers.

cfg_if::cfg_if! {
    if #[cfg(target_os = "android")] {
        fn main() {
            eprintln!("ktnes_audio_cli is a desktop tool; on Android load the JNI library instead");
        }
    } else {
        use std::path::PathBuf;
        use std::process::ExitCode;
        use std::thread;
        use std::time::{Duration, Instant};

        use anyhow::{anyhow, Context, Result};
        use clap::{Parser, Subcommand};
        use cpal::traits::{DeviceTrait, HostTrait};
        use ktnes_audio::audio::backend::CpalBackend;
        use ktnes_audio::audio::{ring_source, AudioEngine, SampleProducer, StubBackend};
        use ktnes_audio::config::AppConfig;
        use ktnes_audio::managers::AudioEngineManager;

        #[derive(Parser, Debug)]
        #[command(
            name = "ktnes_audio_cli",
            about = "Play test signals through the KTNES audio relay"
        )]
        struct Cli {
            /// JSON configuration file (defaults to assets/audio_config.json)
            #[arg(long)]
            config: Option<PathBuf>,
            #[command(subcommand)]
            command: Commands,
        }

        #[derive(Subcommand, Debug)]
        enum Commands {
            /// Play a sine tone on an output device
            Play {
                #[arg(long, default_value_t = 440.0)]
                frequency: f32,
                #[arg(long, default_value_t = 3.0)]
                seconds: f32,
                /// Core to pin the callback thread to (repeatable)
                #[arg(long = "cpu")]
                cpu_ids: Vec<usize>,
                /// Pause for one second after this many seconds
                #[arg(long)]
                pause_after: Option<f32>,
                /// Output device name (defaults to the host default)
                #[arg(long)]
                device: Option<String>,
            },
            /// Render periods through the stub backend and print statistics
            DryRun {
                #[arg(long, default_value_t = 100)]
                periods: usize,
                #[arg(long, default_value_t = 256)]
                frames: usize,
                #[arg(long = "cpu")]
                cpu_ids: Vec<usize>,
            },
            /// List output devices
            Devices,
        }

        fn main() -> ExitCode {
            tracing_subscriber::fmt::init();

            match run() {
                Ok(()) => ExitCode::SUCCESS,
                Err(err) => {
                    eprintln!("Error: {err:?}");
                    ExitCode::from(1)
                }
            }
        }

        fn run() -> Result<()> {
            let cli = Cli::parse();
            let config = match &cli.config {
                Some(path) => AppConfig::load_from_file(path),
                None => AppConfig::load(),
            };

            match cli.command {
                Commands::Play {
                    frequency,
                    seconds,
                    cpu_ids,
                    pause_after,
                    device,
                } => play(&config, frequency, seconds, cpu_ids, pause_after, device),
                Commands::DryRun {
                    periods,
                    frames,
                    cpu_ids,
                } => dry_run(&config, periods, frames, cpu_ids),
                Commands::Devices => list_devices(),
            }
        }

        fn output_sample_rate(device: Option<&str>) -> Result<u32> {
            let host = cpal::default_host();
            let device = match device {
                None => host.default_output_device(),
                Some(wanted) => host
                    .output_devices()
                    .context("Failed to enumerate output devices")?
                    .find(|d| d.name().map(|n| n == wanted).unwrap_or(false)),
            }
            .ok_or_else(|| anyhow!("Output device not found"))?;

            let config = device
                .default_output_config()
                .context("Failed to query default output config")?;
            Ok(config.sample_rate().0)
        }

        /// Sine generator feeding the ring buffer the callback drains
        struct Tone {
            phase: f32,
            step: f32,
            chunk: Vec<f32>,
        }

        impl Tone {
            fn new(frequency: f32, sample_rate: u32) -> Self {
                Self {
                    phase: 0.0,
                    step: frequency * std::f32::consts::TAU / sample_rate as f32,
                    chunk: vec![0.0; 256],
                }
            }

            fn fill(&mut self, producer: &mut SampleProducer) {
                while producer.slots() >= self.chunk.len() {
                    for sample in self.chunk.iter_mut() {
                        *sample = 0.25 * self.phase.sin();
                        self.phase = (self.phase + self.step) % std::f32::consts::TAU;
                    }
                    producer.push_slice(&self.chunk);
                }
            }
        }

        fn play(
            config: &AppConfig,
            frequency: f32,
            seconds: f32,
            cpu_ids: Vec<usize>,
            pause_after: Option<f32>,
            device: Option<String>,
        ) -> Result<()> {
            let sample_rate = output_sample_rate(device.as_deref())?;
            let backend = match &device {
                Some(name) => CpalBackend::with_device(name.clone()),
                None => CpalBackend::new(),
            };
            let manager = AudioEngineManager::new(AudioEngine::new(backend, config.audio.clone()));

            let (mut producer, source) = ring_source(
                (sample_rate as usize / 5).max(1),
                config.audio.buffer_capacity.max(1),
            );
            let mut tone = Tone::new(frequency, sample_rate);
            tone.fill(&mut producer);

            manager
                .start(cpu_ids, Box::new(source))
                .context("Failed to start audio engine")?;
            tracing::info!(frequency, sample_rate, "Playing test tone");

            let started = Instant::now();
            let total = Duration::from_secs_f32(seconds);
            let mut paused_once = false;
            while started.elapsed() < total {
                if let Some(after) = pause_after {
                    if !paused_once && started.elapsed() >= Duration::from_secs_f32(after) {
                        paused_once = true;
                        manager.pause().context("Failed to pause")?;
                        tracing::info!("Paused");
                        thread::sleep(Duration::from_secs(1));
                        manager.resume().context("Failed to resume")?;
                        tracing::info!("Resumed");
                    }
                }
                tone.fill(&mut producer);
                thread::sleep(Duration::from_millis(5));
            }

            let (frames, pinned, cores) = manager
                .with_engine(|e| (e.frames_rendered(), e.affinity_applied(), e.cpu_ids().to_vec()))?;
            manager.stop().context("Failed to stop audio engine")?;

            println!("frames_rendered={frames} affinity_applied={pinned} cpu_ids={cores:?}");
            Ok(())
        }

        fn dry_run(
            config: &AppConfig,
            periods: usize,
            frames: usize,
            cpu_ids: Vec<usize>,
        ) -> Result<()> {
            if frames == 0 || periods == 0 {
                return Err(anyhow!("--frames and --periods must be greater than 0"));
            }

            let backend = StubBackend::new();
            let mut engine = AudioEngine::new(backend.clone(), config.audio.clone());
            let (mut producer, source) = ring_source(frames * 4, config.audio.buffer_capacity.max(1));
            let mut tone = Tone::new(440.0, 48_000);

            engine.start(cpu_ids, Box::new(source))?;

            // Render on a dedicated thread so pinning does not touch the main thread
            let render = thread::spawn(move || {
                let mut filled = 0usize;
                let mut silent = 0usize;
                for _ in 0..periods {
                    tone.fill(&mut producer);
                    let out = backend.pump(frames).unwrap_or_default();
                    let audible = out.iter().filter(|(l, r)| *l != 0.0 || *r != 0.0).count();
                    filled += audible;
                    silent += out.len() - audible;
                }
                (filled, silent)
            });
            let (filled, silent) = render
                .join()
                .map_err(|_| anyhow!("Render thread panicked"))?;

            println!(
                "periods={periods} frames_rendered={} audible={filled} silent={silent} affinity_applied={}",
                engine.frames_rendered(),
                engine.affinity_applied()
            );
            engine.stop()?;
            Ok(())
        }

        fn list_devices() -> Result<()> {
            let host = cpal::default_host();
            println!("host: {:?}", host.id());
            for device in host
                .output_devices()
                .context("Failed to enumerate output devices")?
            {
                let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
                match device.default_output_config() {
                    Ok(config) => println!(
                        "{name}: {} Hz, {} channels, {:?}",
                        config.sample_rate().0,
                        config.channels(),
                        config.sample_format()
                    ),
                    Err(err) => println!("{name}: no default config ({err})"),
                }
            }
            Ok(())
        }

        #[cfg(test)]
        mod tests {
            use super::*;

            #[test]
            fn test_dry_run_rejects_zero_frames() {
                let err = dry_run(&AppConfig::default(), 4, 0, Vec::new()).unwrap_err();
                assert!(err.to_string().contains("--frames"));
            }

            #[test]
            fn test_dry_run_with_zero_buffer_capacity() {
                let mut config = AppConfig::default();
                config.audio.buffer_capacity = 0;

                assert!(dry_run(&config, 4, 64, Vec::new()).is_ok());
            }
        }
    }
}
