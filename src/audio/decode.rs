//! Decoder adapter (C1): decode an arbitrary container/codec to mono f32 PCM
//! at a target sample rate.
//!
//! Grounded in the pack's general `symphonia`-based decode pattern (the
//! teacher itself only ever decodes MP3 via `minimp3` for its local-whisper
//! path and records live via `cpal`; neither covers "decode an arbitrary
//! file on disk", which this component requires). `symphonia` is pulled in
//! from the broader example pack rather than the teacher for this reason.

use crate::error::{NeuravoxError, Result};
use std::fs::File;
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DECODER_TYPE_NULL;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Extensions the orchestrator accepts (spec.md §4.9 validation).
pub const SUPPORTED_EXTENSIONS: &[&str] =
    &["mp3", "wav", "flac", "m4a", "ogg", "opus", "wma", "aac", "mp4"];

/// Preamble describing the decoded source, forwarded to C2 so it can drive
/// progress against a known total.
#[derive(Debug, Clone, Copy)]
pub struct DecodedAudioInfo {
    pub source_sample_rate: u32,
    pub channels: u16,
    pub approx_total_frames: u64,
}

/// Fully decoded, resampled, mono PCM plus the preamble describing the
/// source before resampling. The decode is eager (the whole file is read
/// into memory as f32 samples) because C2's streaming segmenter operates
/// over a `&[f32]` slice rather than an async source; the decode itself is
/// still forward-only and non-restartable in the sense that a fresh
/// `decode_to_mono_f32` call is required to read the file again.
pub struct DecodedAudio {
    pub info: DecodedAudioInfo,
    pub samples: Vec<f32>,
}

/// Decode `path` to mono f32 PCM at `target_sample_rate`, down-mixing
/// multi-channel audio by channel averaging and, when `normalize` is true,
/// normalizing amplitude to `[-1, 1]` (spec.md §4.1, `processing.normalize`
/// per §4.10's option table).
pub fn decode_to_mono_f32(
    path: &Path,
    target_sample_rate: u32,
    normalize: bool,
) -> Result<DecodedAudio> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| NeuravoxError::UnsupportedFormat(format!("{}: {e}", path.display())))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != DECODER_TYPE_NULL)
        .ok_or_else(|| NeuravoxError::UnsupportedFormat(format!("no audio track in {}", path.display())))?
        .clone();

    let source_sample_rate = track.codec_params.sample_rate.ok_or_else(|| {
        NeuravoxError::UnsupportedFormat(format!("unknown sample rate in {}", path.display()))
    })?;
    let channels = track
        .codec_params
        .channels
        .map(|c| c.count() as u16)
        .unwrap_or(1);
    let approx_total_frames = track.codec_params.n_frames.unwrap_or(0);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &Default::default())
        .map_err(|e| NeuravoxError::Decode {
            path: path.to_path_buf(),
            offset: 0,
            message: e.to_string(),
        })?;

    let track_id = track.id;
    let mut mono_samples: Vec<f32> = Vec::new();
    let mut byte_offset: u64 = 0;

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(e) => {
                return Err(NeuravoxError::Decode {
                    path: path.to_path_buf(),
                    offset: byte_offset,
                    message: e.to_string(),
                });
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        byte_offset += packet.data.len() as u64;

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                downmix_into(sample_buf.samples(), spec.channels.count(), &mut mono_samples);
            }
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(NeuravoxError::Decode {
                    path: path.to_path_buf(),
                    offset: byte_offset,
                    message: e.to_string(),
                });
            }
        }
    }

    if mono_samples.is_empty() {
        return Err(NeuravoxError::EmptyAudio(path.to_path_buf()));
    }

    if normalize {
        normalize_in_place(&mut mono_samples);
    }

    let samples = if source_sample_rate == target_sample_rate {
        mono_samples
    } else {
        crate::audio::resample::resample_to_target(&mono_samples, source_sample_rate, target_sample_rate)?
    };

    Ok(DecodedAudio {
        info: DecodedAudioInfo {
            source_sample_rate,
            channels,
            approx_total_frames,
        },
        samples,
    })
}

fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

fn normalize_in_place(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, &s| acc.max(s.abs()));
    if peak > 1.0 {
        let scale = 1.0 / peak;
        for s in samples.iter_mut() {
            *s *= scale;
        }
    }
}

pub fn is_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn validate_extension(path: &Path) -> Result<()> {
    if !is_supported_extension(path) {
        return Err(NeuravoxError::validation(format!(
            "unsupported file extension: {}",
            path.display()
        )));
    }
    Ok(())
}
