//! Resampling to the pipeline's target sample rate.
//!
//! Ported from the teacher's `resample.rs` batch path (`resample_to_16k`),
//! generalized to an arbitrary target rate since spec.md §4.10 allows
//! `sample_rate` to be one of 8k/16k/22050/44100/48k rather than a fixed
//! 16 kHz. The teacher's real-time `FrameResampler` (for live mic callbacks)
//! is not ported: this crate never records live audio, only decodes files.

use crate::error::{NeuravoxError, Result};
use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{Fft, FixedSync, Resampler};

/// Resample already-mono f32 samples from `source_rate` to `target_rate`.
pub fn resample_to_target(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler = Fft::<f32>::new(
        source_rate as usize,
        target_rate as usize,
        1024,
        2,
        1,
        FixedSync::Input,
    )
    .map_err(|e| NeuravoxError::Encode(format!("failed to create resampler: {e}")))?;

    let chunk_size = resampler.input_frames_max();
    let mut output = Vec::new();

    for chunk in samples.chunks(chunk_size) {
        let mut padded = chunk.to_vec();
        if padded.len() < chunk_size {
            padded.resize(chunk_size, 0.0);
        }

        let adapter = InterleavedSlice::new(&padded, 1, padded.len())
            .map_err(|e| NeuravoxError::Encode(format!("failed to build audio adapter: {e}")))?;
        let result = resampler
            .process(&adapter, 0, None)
            .map_err(|e| NeuravoxError::Encode(format!("resampling failed: {e}")))?;
        output.extend_from_slice(&result.take_data());
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let samples = vec![0.1, 0.2, -0.3, 0.4];
        let out = resample_to_target(&samples, 16_000, 16_000).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn resampling_changes_length_proportionally() {
        let samples = vec![0.0f32; 48_000]; // 1 second at 48kHz
        let out = resample_to_target(&samples, 48_000, 16_000).unwrap();
        // Roughly 16000 samples (1 second at 16kHz), allow resampler edge slack.
        assert!((out.len() as i64 - 16_000).abs() < 2048);
    }
}
