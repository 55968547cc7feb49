//! Transcript combiner (C7): stitch ordered chunk transcriptions into one
//! document (spec.md §4.7).
//!
//! Unlike the teacher's `transcribe.rs::merge_transcriptions`/`remove_overlap`
//! (built for overlapping sliding-window captures, so it has to de-duplicate
//! repeated words at chunk boundaries), chunks here are non-overlapping by
//! construction — C2 never produces two ranges that share a timestamp. The
//! combiner's only job is ordering, headers, and failure markers.

use crate::metadata::ProcessingMetadata;
use crate::scheduler::ChunkOutcome;

/// Render `h:mm:ss` from a second count, per spec.md §4.7's header format.
fn format_duration(total_s: f64) -> String {
    let total_s = total_s.max(0.0).round() as u64;
    let hours = total_s / 3600;
    let minutes = (total_s % 3600) / 60;
    let seconds = total_s % 60;
    format!("{hours}:{minutes:02}:{seconds:02}")
}

fn format_timestamp(start_s: f64, end_s: f64) -> String {
    format!("{start_s:.3} – {end_s:.3}")
}

/// Combine `outcomes` (already reordered by chunk_index by the scheduler)
/// into the final transcript document.
///
/// `outcomes` must contain exactly one entry per chunk in `metadata.chunks`,
/// in matching order — the orchestrator is responsible for that invariant
/// (e.g. when resuming, it reconstructs outcomes for chunks that were
/// already transcribed in a prior run alongside freshly-scheduled ones).
pub fn combine(
    metadata: &ProcessingMetadata,
    backend_id: &str,
    backend_model_id: &str,
    outcomes: &[ChunkOutcome],
) -> String {
    let total = metadata.chunks.len();
    let total_duration_s = metadata
        .chunks
        .last()
        .map(|c| c.end_s)
        .unwrap_or(0.0);

    let mut doc = String::new();
    doc.push_str(&format!("# {}\n", metadata.file_id));
    doc.push_str(&format!("- source: {}\n", metadata.original_file));
    doc.push_str(&format!("- duration: {}\n", format_duration(total_duration_s)));
    doc.push_str(&format!("- backend: {backend_id} / {backend_model_id}\n"));

    for (i, outcome) in outcomes.iter().enumerate() {
        doc.push('\n');
        let (start_s, end_s) = match outcome {
            ChunkOutcome::Success(c) => (c.start_s, c.end_s),
            ChunkOutcome::Failure(c) => (c.start_s, c.end_s),
        };
        doc.push_str(&format!(
            "## Chunk {} of {total}  [{}]\n",
            i + 1,
            format_timestamp(start_s, end_s)
        ));

        match outcome {
            ChunkOutcome::Success(c) => {
                doc.push_str(c.result.text.trim_end());
                doc.push('\n');
            }
            ChunkOutcome::Failure(c) => {
                doc.push_str(&format!("[FAILED: {}]\n", c.reason));
            }
        }

        if i + 1 < outcomes.len() {
            doc.push_str("\n---\n");
        }
    }

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AudioInfo, ProcessingChunkEntry, ProcessingParams};
    use crate::provider::TranscriptionResult;
    use crate::scheduler::{ChunkFailure, ChunkTranscription};

    fn sample_metadata(n: usize) -> ProcessingMetadata {
        ProcessingMetadata {
            file_id: "lecture-abcd1234".to_string(),
            original_file: "/input/lecture.mp3".to_string(),
            processed_at: "2026-07-27T12:00:00Z".parse().unwrap(),
            processing_time_s: 1.0,
            audio_info: AudioInfo {
                duration_s: n as f64 * 10.0,
                sample_rate: 16_000,
                channels: 1,
            },
            processing_params: ProcessingParams {
                silence_threshold: 0.01,
                min_silence_duration: 25.0,
                sample_rate: 16_000,
                output_format: "flac".to_string(),
            },
            chunks: (0..n)
                .map(|i| ProcessingChunkEntry {
                    chunk_index: i,
                    total_chunks: n,
                    start_s: i as f64 * 10.0,
                    end_s: (i + 1) as f64 * 10.0,
                    duration_s: 10.0,
                    file_path: format!("chunk_{i:03}.flac"),
                    source_file: "/input/lecture.mp3".to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn combines_successful_chunks_in_order_with_headers() {
        let metadata = sample_metadata(2);
        let outcomes = vec![
            ChunkOutcome::Success(ChunkTranscription {
                chunk_index: 0,
                start_s: 0.0,
                end_s: 10.0,
                result: TranscriptionResult {
                    text: "hello there  \n".to_string(),
                    segments: None,
                    words: None,
                    tokens_used: None,
                },
                elapsed_s: 0.5,
            }),
            ChunkOutcome::Success(ChunkTranscription {
                chunk_index: 1,
                start_s: 10.0,
                end_s: 20.0,
                result: TranscriptionResult {
                    text: "general kenobi".to_string(),
                    segments: None,
                    words: None,
                    tokens_used: None,
                },
                elapsed_s: 0.5,
            }),
        ];

        let doc = combine(&metadata, "cloud-a", "nova-2", &outcomes);

        assert!(doc.starts_with("# lecture-abcd1234\n"));
        assert!(doc.contains("- source: /input/lecture.mp3\n"));
        assert!(doc.contains("- backend: cloud-a / nova-2\n"));
        assert!(doc.contains("## Chunk 1 of 2  [0.000 – 10.000]\n"));
        assert!(doc.contains("hello there\n"));
        assert!(!doc.contains("hello there  \n"));
        assert!(doc.contains("---"));
        assert!(doc.contains("## Chunk 2 of 2  [10.000 – 20.000]\n"));
        assert!(doc.trim_end().ends_with("general kenobi"));
    }

    #[test]
    fn failed_chunk_renders_failure_marker_in_place() {
        let metadata = sample_metadata(2);
        let outcomes = vec![
            ChunkOutcome::Success(ChunkTranscription {
                chunk_index: 0,
                start_s: 0.0,
                end_s: 10.0,
                result: TranscriptionResult {
                    text: "ok text".to_string(),
                    segments: None,
                    words: None,
                    tokens_used: None,
                },
                elapsed_s: 0.2,
            }),
            ChunkOutcome::Failure(ChunkFailure {
                chunk_index: 1,
                start_s: 10.0,
                end_s: 20.0,
                reason: "rate limited".to_string(),
            }),
        ];

        let doc = combine(&metadata, "cloud-b", "whisper-1", &outcomes);

        assert!(doc.contains("## Chunk 2 of 2  [10.000 – 20.000]\n[FAILED: rate limited]\n"));
    }

    #[test]
    fn duration_header_formats_as_h_mm_ss() {
        assert_eq!(format_duration(0.0), "0:00:00");
        assert_eq!(format_duration(65.0), "0:01:05");
        assert_eq!(format_duration(3725.0), "1:02:05");
    }
}
