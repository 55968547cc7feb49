//! Workspace filesystem layout and `file_id` derivation.
//!
//! Shared by the metadata store (C4), the state store (C8), and the
//! orchestrator (C9) so all three agree on the same on-disk paths, mirroring
//! the teacher's single shared `dirs`-based path-resolution helper
//! (`model::default_models_dir`) rather than duplicating path logic per module.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Root of a Neuravox workspace: `input/`, `processed/`, `transcribed/`, and
/// the pipeline state database.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default workspace root: `~/.neuravox/workspace`.
    pub fn default_root() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".neuravox")
            .join("workspace")
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn input_dir(&self) -> PathBuf {
        self.root.join("input")
    }

    pub fn processed_dir(&self, file_id: &str) -> PathBuf {
        self.root.join("processed").join(file_id)
    }

    pub fn transcribed_dir(&self, file_id: &str) -> PathBuf {
        self.root.join("transcribed").join(file_id)
    }

    pub fn state_db_path(&self) -> PathBuf {
        self.root.join(".pipeline_state.db")
    }

    /// Create `input/`, `processed/`, `transcribed/` if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.input_dir())?;
        std::fs::create_dir_all(self.root.join("processed"))?;
        std::fs::create_dir_all(self.root.join("transcribed"))?;
        Ok(())
    }
}

/// Derive the stable `file_id` for a source recording: `<basename>-<first 8
/// hex of content hash>`. The hash covers the first and last megabyte plus
/// the total byte size so it is cheap to compute even for multi-gigabyte
/// recordings, per spec.md §6.
pub fn file_id(path: &Path) -> std::io::Result<String> {
    let basename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("recording")
        .to_string();

    let bytes = std::fs::metadata(path)?.len();
    let mut file = std::fs::File::open(path)?;
    let digest = content_digest(&mut file, bytes)?;

    Ok(format!("{basename}-{}", &digest[..8]))
}

const SAMPLE_WINDOW: u64 = 1024 * 1024;

fn content_digest(file: &mut std::fs::File, total_len: u64) -> std::io::Result<String> {
    use std::io::{Read, Seek, SeekFrom};

    let mut hasher = Sha256::new();
    hasher.update(total_len.to_le_bytes());

    let head_len = total_len.min(SAMPLE_WINDOW);
    let mut head = vec![0u8; head_len as usize];
    file.read_exact(&mut head)?;
    hasher.update(&head);

    if total_len > SAMPLE_WINDOW {
        let tail_len = total_len.min(SAMPLE_WINDOW);
        file.seek(SeekFrom::End(-(tail_len as i64)))?;
        let mut tail = vec![0u8; tail_len as usize];
        file.read_exact(&mut tail)?;
        hasher.update(&tail);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_id_is_stable_for_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lecture.mp3");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&vec![7u8; 4096]).unwrap();
        drop(f);

        let a = file_id(&path).unwrap();
        let b = file_id(&path).unwrap();
        assert_eq!(a, b);
        assert!(a.starts_with("lecture-"));
    }

    #[test]
    fn file_id_differs_for_different_content() {
        let dir = tempfile::tempdir().unwrap();
        let p1 = dir.path().join("a.wav");
        let p2 = dir.path().join("b.wav");
        std::fs::write(&p1, vec![1u8; 2048]).unwrap();
        std::fs::write(&p2, vec![2u8; 2048]).unwrap();

        assert_ne!(file_id(&p1).unwrap(), file_id(&p2).unwrap());
    }

    #[test]
    fn workspace_paths_nest_under_root() {
        let ws = Workspace::new("/tmp/ws");
        assert_eq!(ws.input_dir(), PathBuf::from("/tmp/ws/input"));
        assert_eq!(
            ws.processed_dir("foo-abcd1234"),
            PathBuf::from("/tmp/ws/processed/foo-abcd1234")
        );
        assert_eq!(ws.state_db_path(), PathBuf::from("/tmp/ws/.pipeline_state.db"));
    }
}
