use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;

use crate::assets::sequence::FrameSequence;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};

/// Where encoded frame bytes come from.
///
/// Implementations are called from loader worker threads, one call per frame.
pub trait FrameSource: Send + Sync {
    /// Fetch the encoded bytes for `index`.
    fn fetch(&self, sequence: &FrameSequence, index: FrameIndex) -> ReelResult<Vec<u8>>;
}

/// Reads frames from a directory on disk.
#[derive(Clone, Debug)]
pub struct FsFrameSource {
    root: PathBuf,
}

impl FsFrameSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, sequence: &FrameSequence, index: FrameIndex) -> ReelResult<PathBuf> {
        Ok(self.root.join(sequence.frame_path(index)?))
    }
}

impl FrameSource for FsFrameSource {
    fn fetch(&self, sequence: &FrameSequence, index: FrameIndex) -> ReelResult<Vec<u8>> {
        let path = self.resolve(sequence, index)?;
        let bytes = std::fs::read(&path)
            .with_context(|| format!("read frame {} from '{}'", index.0, path.display()))?;
        Ok(bytes)
    }
}

/// Serves pre-encoded frames from memory. Indices without bytes fail to load.
#[derive(Clone, Debug, Default)]
pub struct MemoryFrameSource {
    frames: HashMap<FrameIndex, Arc<Vec<u8>>>,
}

impl MemoryFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: FrameIndex, bytes: Vec<u8>) {
        self.frames.insert(index, Arc::new(bytes));
    }

    pub fn with_frame(mut self, index: FrameIndex, bytes: Vec<u8>) -> Self {
        self.insert(index, bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for MemoryFrameSource {
    fn fetch(&self, _sequence: &FrameSequence, index: FrameIndex) -> ReelResult<Vec<u8>> {
        self.frames
            .get(&index)
            .map(|b| b.as_ref().clone())
            .ok_or_else(|| ReelError::load(format!("no bytes for frame {}", index.0)))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
