// SampleSource - where the output callback pulls the next mono buffer from
//
// On Android the source calls back into the JVM (see jni_bridge). Rust-side
// producers, the desktop harness and the tests use RingSource, a lock-free
// SPSC ring buffer:
//
// - Producer thread: SampleProducer::push_slice() writes decoded samples
// - Audio thread: RingSource::next_buffer() drains at most one period (capped
//   by the scratch size) into a pre-allocated scratch buffer
//
// Neither side allocates or blocks after construction.

use rtrb::{Consumer, Producer, RingBuffer};

use crate::error::AudioError;

/// Supplier of the next mono sample buffer, called once per audio period
///
/// Implementations run on the real-time callback thread and should avoid
/// allocating or blocking.
pub trait SampleSource: Send {
    /// Return the samples to play for the next period of `frames` frames
    ///
    /// The slice may be shorter or longer than the period; the callback
    /// copies what fits and silences the rest.
    fn next_buffer(&mut self, frames: usize) -> Result<&[f32], AudioError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn next_buffer(&mut self, frames: usize) -> Result<&[f32], AudioError> {
        (**self).next_buffer(frames)
    }
}

/// Create a connected producer/source pair
///
/// # Arguments
/// * `capacity` - Ring buffer capacity in samples
/// * `period_capacity` - Most samples handed out per `next_buffer` call,
///   whatever the period size
///
/// # Panics
/// Panics if either size is 0
pub fn ring_source(capacity: usize, period_capacity: usize) -> (SampleProducer, RingSource) {
    assert!(capacity > 0, "capacity must be greater than 0");
    assert!(period_capacity > 0, "period_capacity must be greater than 0");

    let (producer, consumer) = RingBuffer::new(capacity);
    (
        SampleProducer { producer },
        RingSource {
            consumer,
            scratch: vec![0.0; period_capacity],
        },
    )
}

/// Writing half of a ring source
pub struct SampleProducer {
    producer: Producer<f32>,
}

impl SampleProducer {
    /// Push as many samples as fit
    ///
    /// # Returns
    /// Number of samples accepted; the rest are dropped.
    pub fn push_slice(&mut self, samples: &[f32]) -> usize {
        let mut written = 0;
        for &sample in samples {
            if self.producer.push(sample).is_err() {
                break;
            }
            written += 1;
        }
        written
    }

    /// Free space in samples
    pub fn slots(&self) -> usize {
        self.producer.slots()
    }

    /// True once the source has been dropped (stream closed)
    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}

/// Reading half of a ring source, owned by the output callback
pub struct RingSource {
    consumer: Consumer<f32>,
    scratch: Vec<f32>,
}

impl RingSource {
    /// Samples waiting to be played
    pub fn available(&self) -> usize {
        self.consumer.slots()
    }
}

impl SampleSource for RingSource {
    fn next_buffer(&mut self, frames: usize) -> Result<&[f32], AudioError> {
        let wanted = frames.min(self.scratch.len());
        let mut filled = 0;
        for slot in self.scratch[..wanted].iter_mut() {
            match self.consumer.pop() {
                Ok(sample) => {
                    *slot = sample;
                    filled += 1;
                }
                Err(_) => break,
            }
        }
        Ok(&self.scratch[..filled])
    }
}

/// Throttle for a lookup that can keep failing on the callback thread
///
/// After a failure the next `period` calls to [`RetryGate::ready`] return
/// false, so a missing class or method is retried about once per `period`
/// periods instead of every period.
#[derive(Debug, Clone)]
pub struct RetryGate {
    period: u32,
    skip: u32,
}

impl RetryGate {
    pub fn new(period: u32) -> Self {
        Self { period, skip: 0 }
    }

    /// True when an attempt should be made this period
    pub fn ready(&mut self) -> bool {
        if self.skip == 0 {
            return true;
        }
        self.skip -= 1;
        false
    }

    pub fn failed(&mut self) {
        self.skip = self.period;
    }

    pub fn succeeded(&mut self) {
        self.skip = 0;
    }
}
