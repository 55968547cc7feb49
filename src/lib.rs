//! Neuravox audio-to-transcript pipeline core.
//!
//! Ingests long-form spoken-audio recordings, segments them at sustained
//! silences, encodes the resulting ranges to FLAC, and drives a pool of
//! transcription backends over the chunks with bounded concurrency. The
//! crate owns a durable state store so a crashed run can resume exactly
//! where it left off.
//!
//! This crate is a library: the command-line shell, HTTP API, and web
//! client are external collaborators built on top of [`orchestrator`].

pub mod audio;
pub mod combiner;
pub mod config;
pub mod error;
pub mod http;
pub mod metadata;
pub mod orchestrator;
pub mod provider;
pub mod scheduler;
pub mod state;
pub mod workspace;

pub use config::Config;
pub use error::{NeuravoxError, Result};
pub use orchestrator::{Orchestrator, PipelineResult, PipelineStatus};
pub use tokio_util::sync::CancellationToken;
