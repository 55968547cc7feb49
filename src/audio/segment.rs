//! Silence segmenter (C2): detect sustained silences in PCM, yield chunk
//! boundaries at their midpoints (spec.md §4.2).
//!
//! Not directly grounded in the teacher — `audio/chunker.rs`'s
//! `ProgressiveChunker` chunks on a fixed target duration with optional VAD,
//! a materially different algorithm from fixed-frame RMS-threshold silence
//! detection with midpoint splitting. It informs the *shape* of this module
//! (a small per-frame state machine over a buffered stream) more than its
//! literal logic, which follows spec.md §4.2 step by step instead.

use serde::{Deserialize, Serialize};

/// Parameters driving segmentation (spec.md §4.2/§4.10).
#[derive(Debug, Clone, Copy)]
pub struct SegmentParams {
    pub frame_seconds: f64,
    pub silence_threshold: f64,
    pub min_silence_duration_s: f64,
    pub min_chunk_duration_s: f64,
}

impl Default for SegmentParams {
    fn default() -> Self {
        Self {
            frame_seconds: crate::config::defaults::DEFAULT_FRAME_SECONDS,
            silence_threshold: crate::config::defaults::DEFAULT_SILENCE_THRESHOLD,
            min_silence_duration_s: crate::config::defaults::DEFAULT_MIN_SILENCE_DURATION_S,
            min_chunk_duration_s: crate::config::defaults::DEFAULT_MIN_CHUNK_DURATION_S,
        }
    }
}

/// A half-open `[start_s, end_s)` interval over a source recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChunkRange {
    pub chunk_index: usize,
    pub start_s: f64,
    pub end_s: f64,
}

impl ChunkRange {
    pub fn duration_s(&self) -> f64 {
        self.end_s - self.start_s
    }
}

/// Per-frame state machine (spec.md §4.2): `SPEECH` or a run of
/// `IN_SILENCE(n)` consecutive silent frames.
enum FrameState {
    Speech,
    InSilence { run_start_s: f64 },
}

/// Segment `samples` (mono PCM at `sample_rate`) into contiguous,
/// non-overlapping [`ChunkRange`]s covering `[0, duration)` exactly.
///
/// Always yields at least one chunk (spec.md §4.2 "Failure modes: none
/// intrinsic").
pub fn segment(samples: &[f32], sample_rate: u32, params: &SegmentParams) -> Vec<ChunkRange> {
    let frame_len = ((sample_rate as f64 * params.frame_seconds).round() as usize).max(1);
    let total_duration_s = samples.len() as f64 / sample_rate as f64;

    let mut boundaries: Vec<f64> = Vec::new();
    let mut state = FrameState::Speech;
    let mut elapsed_s = 0.0f64;

    for frame in samples.chunks(frame_len) {
        let frame_duration_s = frame.len() as f64 / sample_rate as f64;
        let is_silent = rms_energy(frame) < params.silence_threshold;

        match (&state, is_silent) {
            (FrameState::Speech, true) => {
                state = FrameState::InSilence { run_start_s: elapsed_s };
            }
            (FrameState::InSilence { .. }, true) => {
                // run continues
            }
            (FrameState::InSilence { run_start_s }, false) => {
                let run_duration_s = elapsed_s - run_start_s;
                if run_duration_s >= params.min_silence_duration_s {
                    boundaries.push(round6(run_start_s + run_duration_s / 2.0));
                }
                state = FrameState::Speech;
            }
            (FrameState::Speech, false) => {}
        }

        elapsed_s += frame_duration_s;
    }

    let raw_chunks = boundaries_to_ranges(&boundaries, round6(total_duration_s));
    let merged = merge_undersized(raw_chunks, params.min_chunk_duration_s);

    merged
        .into_iter()
        .enumerate()
        .map(|(chunk_index, (start_s, end_s))| ChunkRange {
            chunk_index,
            start_s,
            end_s,
        })
        .collect()
}

fn rms_energy(frame: &[f32]) -> f64 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = frame.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / frame.len() as f64).sqrt()
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

fn boundaries_to_ranges(boundaries: &[f64], total_duration_s: f64) -> Vec<(f64, f64)> {
    let mut ranges = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0.0;
    for &b in boundaries {
        ranges.push((start, b));
        start = b;
    }
    ranges.push((start, total_duration_s));
    ranges
}

/// Merge chunks shorter than `min_chunk_duration_s` into a neighbor
/// (spec.md §4.2 step 5): predecessor, except the first chunk merges
/// forward into its successor.
fn merge_undersized(mut ranges: Vec<(f64, f64)>, min_chunk_duration_s: f64) -> Vec<(f64, f64)> {
    if ranges.len() <= 1 {
        return ranges;
    }

    while ranges.len() > 1 && (ranges[0].1 - ranges[0].0) < min_chunk_duration_s {
        let (start, _) = ranges[0];
        let (_, end) = ranges[1];
        ranges[1] = (start, end);
        ranges.remove(0);
    }

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        let duration = end - start;
        if duration < min_chunk_duration_s
            && let Some(prev) = merged.last_mut()
        {
            prev.1 = end;
        } else {
            merged.push((start, end));
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(duration_s: f64, amplitude: f32, sample_rate: u32) -> Vec<f32> {
        let n = (duration_s * sample_rate as f64).round() as usize;
        (0..n)
            .map(|i| amplitude * ((i as f32) * 0.1).sin())
            .collect()
    }

    fn silence(duration_s: f64, amplitude: f32, sample_rate: u32) -> Vec<f32> {
        vec![amplitude; (duration_s * sample_rate as f64).round() as usize]
    }

    fn default_params() -> SegmentParams {
        SegmentParams {
            frame_seconds: 0.025,
            silence_threshold: 0.01,
            min_silence_duration_s: 25.0,
            min_chunk_duration_s: 5.0,
        }
    }

    /// Scenario A: continuous speech, no splits.
    #[test]
    fn continuous_speech_yields_one_chunk() {
        let sample_rate = 16_000;
        let samples = tone(60.0, 0.2, sample_rate);
        let chunks = segment(&samples, sample_rate, &default_params());

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_s, 0.0);
        assert!((chunks[0].end_s - 60.0).abs() < 0.01);
    }

    /// Scenario B: one clean split at the silence midpoint.
    #[test]
    fn one_clean_split_at_midpoint() {
        let sample_rate = 16_000;
        let mut samples = tone(30.0, 0.3, sample_rate);
        samples.extend(silence(30.0, 0.0005, sample_rate));
        samples.extend(tone(30.0, 0.3, sample_rate));

        let chunks = segment(&samples, sample_rate, &default_params());

        assert_eq!(chunks.len(), 2);
        assert!((chunks[0].end_s - 45.0).abs() < 0.01);
        assert_eq!(chunks[0].end_s, chunks[1].start_s);
        for c in &chunks {
            assert!(c.duration_s() >= 5.0);
        }
    }

    /// Scenario C: a too-short silence is ignored.
    #[test]
    fn too_short_silence_is_ignored() {
        let sample_rate = 16_000;
        let mut samples = tone(20.0, 0.3, sample_rate);
        samples.extend(silence(10.0, 0.0005, sample_rate));
        samples.extend(tone(20.0, 0.3, sample_rate));

        let chunks = segment(&samples, sample_rate, &default_params());

        assert_eq!(chunks.len(), 1);
        assert!((chunks[0].end_s - 50.0).abs() < 0.01);
    }

    /// Invariant 1: chunks cover [0, D) exactly, contiguous and ordered.
    #[test]
    fn chunks_cover_recording_contiguously() {
        let sample_rate = 16_000;
        let mut samples = tone(40.0, 0.3, sample_rate);
        samples.extend(silence(30.0, 0.0005, sample_rate));
        samples.extend(tone(2.0, 0.3, sample_rate));

        let chunks = segment(&samples, sample_rate, &default_params());
        assert_eq!(chunks[0].start_s, 0.0);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end_s, pair[1].start_s);
        }
        let total_duration_s = samples.len() as f64 / sample_rate as f64;
        assert!((chunks.last().unwrap().end_s - total_duration_s).abs() < 1e-6);
    }

    /// Boundary: a recording shorter than min_chunk_duration_s is one chunk.
    #[test]
    fn short_recording_yields_single_chunk() {
        let sample_rate = 16_000;
        let samples = tone(2.0, 0.3, sample_rate);
        let chunks = segment(&samples, sample_rate, &default_params());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_s, 0.0);
    }

    /// A trailing undersized fragment after a real split merges into its
    /// predecessor rather than staying its own chunk.
    #[test]
    fn trailing_short_fragment_merges_into_predecessor() {
        let sample_rate = 16_000;
        let mut samples = tone(40.0, 0.3, sample_rate);
        samples.extend(silence(30.0, 0.0005, sample_rate));
        samples.extend(tone(3.0, 0.3, sample_rate));

        let chunks = segment(&samples, sample_rate, &default_params());
        assert_eq!(chunks.len(), 1);
        let total_duration_s = samples.len() as f64 / sample_rate as f64;
        assert!((chunks[0].end_s - total_duration_s).abs() < 1e-6);
    }
}
