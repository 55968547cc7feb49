//! Metadata store (C4): serialize/deserialize ProcessingMetadata,
//! TranscriptionMetadata, and a combined manifest as JSON under
//! `<workspace>/processed/<file_id>/` and `<workspace>/transcribed/<file_id>/`
//! (spec.md §4.4/§6).
//!
//! Readers tolerate unknown fields (no `deny_unknown_fields` anywhere in
//! this module) since the store does not enforce schema evolution.

use crate::audio::ChunkRange;
use crate::error::{NeuravoxError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Processing parameters actually used for a run, persisted alongside the
/// chunk list so a later `resume()` or audit knows exactly what produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingParams {
    pub silence_threshold: f64,
    pub min_silence_duration: f64,
    pub sample_rate: u32,
    pub output_format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AudioInfo {
    pub duration_s: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// One entry in `processing_metadata.json`'s `chunks` array: a ChunkRange
/// plus the ChunkArtifact it produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingChunkEntry {
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub start_s: f64,
    pub end_s: f64,
    pub duration_s: f64,
    pub file_path: String,
    pub source_file: String,
}

/// `processing_metadata.json` (spec.md §3/§6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessingMetadata {
    pub file_id: String,
    pub original_file: String,
    pub processed_at: DateTime<Utc>,
    pub processing_time_s: f64,
    pub audio_info: AudioInfo,
    pub processing_params: ProcessingParams,
    pub chunks: Vec<ProcessingChunkEntry>,
}

impl ProcessingMetadata {
    pub fn chunk_ranges(&self) -> Vec<ChunkRange> {
        self.chunks
            .iter()
            .map(|c| ChunkRange {
                chunk_index: c.chunk_index,
                start_s: c.start_s,
                end_s: c.end_s,
            })
            .collect()
    }
}

/// Status of one chunk's transcription attempt, for
/// `transcription_metadata.json`'s `chunks` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionChunkEntry {
    pub chunk_index: usize,
    pub status: ChunkStatus,
    pub elapsed_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `transcription_metadata.json` (spec.md §3/§6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionMetadata {
    pub file_id: String,
    pub backend_id: String,
    pub backend_model_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub chunks: Vec<TranscriptionChunkEntry>,
    pub total_words: usize,
    pub failures: usize,
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| NeuravoxError::State(format!("failed to parse {}: {e}", path.display())))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let contents = serde_json::to_string_pretty(value)
        .map_err(|e| NeuravoxError::State(format!("failed to serialize {}: {e}", path.display())))?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn processing_metadata_path(processed_dir: &Path) -> std::path::PathBuf {
    processed_dir.join("processing_metadata.json")
}

pub fn transcription_metadata_path(transcribed_dir: &Path) -> std::path::PathBuf {
    transcribed_dir.join("transcription_metadata.json")
}

pub fn write_processing_metadata(processed_dir: &Path, metadata: &ProcessingMetadata) -> Result<()> {
    write_json(&processing_metadata_path(processed_dir), metadata)
}

pub fn read_processing_metadata(processed_dir: &Path) -> Result<ProcessingMetadata> {
    read_json(&processing_metadata_path(processed_dir))
}

pub fn write_transcription_metadata(
    transcribed_dir: &Path,
    metadata: &TranscriptionMetadata,
) -> Result<()> {
    write_json(&transcription_metadata_path(transcribed_dir), metadata)
}

pub fn read_transcription_metadata(transcribed_dir: &Path) -> Result<TranscriptionMetadata> {
    read_json(&transcription_metadata_path(transcribed_dir))
}
