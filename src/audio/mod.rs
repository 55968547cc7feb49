//! Audio pipeline: decode (C1), silence segmentation (C2), and FLAC chunk
//! writing (C3).

pub mod decode;
pub mod encode;
pub mod resample;
pub mod segment;

pub use decode::{DecodedAudio, DecodedAudioInfo, decode_to_mono_f32};
pub use encode::write_chunk;
pub use segment::{ChunkRange, SegmentParams, segment};
