//! Mono-to-stereo hand-off between the producer's buffer and the output stream
//!
//! The emulator produces one mono sample per output frame. Both copy routines
//! honour the shorter of the two buffers and write silence past the end of
//! the source so a short producer buffer never replays the previous period.

/// Copy `source` into stereo `frames`, duplicating each sample to both channels
///
/// # Returns
/// Number of frames filled from `source`; the remaining frames are silent.
pub fn copy_mono_to_stereo(source: &[f32], frames: &mut [(f32, f32)]) -> usize {
    let filled = source.len().min(frames.len());
    let (head, tail) = frames.split_at_mut(filled);

    for (frame, &sample) in head.iter_mut().zip(source) {
        *frame = (sample, sample);
    }
    tail.fill((0.0, 0.0));

    filled
}

/// Copy `source` into an interleaved buffer with `channels` channels per frame
///
/// Every channel of frame `i` receives `source[i]`. A trailing partial frame
/// in `out` is silenced. With `channels == 0` nothing is written.
///
/// # Returns
/// Number of frames filled from `source`.
pub fn copy_mono_to_interleaved(source: &[f32], out: &mut [f32], channels: usize) -> usize {
    if channels == 0 {
        return 0;
    }

    let mut filled = 0;
    let mut chunks = out.chunks_exact_mut(channels);
    for (i, frame) in chunks.by_ref().enumerate() {
        match source.get(i) {
            Some(&sample) => {
                frame.fill(sample);
                filled += 1;
            }
            None => frame.fill(0.0),
        }
    }
    chunks.into_remainder().fill(0.0);

    filled
}
