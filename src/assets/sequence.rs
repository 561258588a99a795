use crate::foundation::core::FrameIndex;
use crate::foundation::error::{ReelError, ReelResult};

/// Ordered, immutable set of frame assets addressed by a zero-padded counter.
///
/// Frame `i` lives at `{prefix}{i + first_number:0pad_width}.{extension}`, so the defaults
/// produce `frames/ezgif-frame-001.jpg` for index 0.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FrameSequence {
    /// Number of frames, `N`.
    pub frame_count: u32,
    /// Relative path prefix shared by every frame.
    pub prefix: String,
    /// Minimum digit count of the numeric suffix.
    pub pad_width: usize,
    /// Number used for index 0.
    pub first_number: u32,
    /// File extension without the leading dot.
    pub extension: String,
}

impl Default for FrameSequence {
    fn default() -> Self {
        Self {
            frame_count: 120,
            prefix: "frames/ezgif-frame-".to_string(),
            pad_width: 3,
            first_number: 1,
            extension: "jpg".to_string(),
        }
    }
}

impl FrameSequence {
    pub fn validate(&self) -> ReelResult<()> {
        if self.frame_count == 0 {
            return Err(ReelError::validation("frame_count must be > 0"));
        }
        if self.extension.is_empty() || self.extension.contains(['/', '\\', '.']) {
            return Err(ReelError::validation(
                "extension must be non-empty and contain no separators or dots",
            ));
        }
        if self.first_number.checked_add(self.frame_count - 1).is_none() {
            return Err(ReelError::validation("frame numbering overflows u32"));
        }
        normalize_rel_prefix(&self.prefix)?;
        Ok(())
    }

    pub fn contains(&self, index: FrameIndex) -> bool {
        index.0 < self.frame_count
    }

    pub fn last(&self) -> FrameIndex {
        FrameIndex(self.frame_count.saturating_sub(1))
    }

    /// Relative path of frame `index`, with `/` separators.
    pub fn frame_path(&self, index: FrameIndex) -> ReelResult<String> {
        if !self.contains(index) {
            return Err(ReelError::validation(format!(
                "frame {} outside sequence of {} frames",
                index.0, self.frame_count
            )));
        }
        let prefix = normalize_rel_prefix(&self.prefix)?;
        let number = self.first_number + index.0;
        Ok(format!(
            "{prefix}{number:0width$}.{ext}",
            width = self.pad_width,
            ext = self.extension
        ))
    }

    pub fn indices(&self) -> impl Iterator<Item = FrameIndex> + use<> {
        (0..self.frame_count).map(FrameIndex)
    }
}

/// Normalize a relative path prefix.
///
/// Separators become `/`, `.` segments are dropped, and absolute prefixes or parent traversals
/// (`..`) are rejected. A trailing separator is preserved because the prefix is glued directly
/// onto the frame number.
pub(crate) fn normalize_rel_prefix(prefix: &str) -> ReelResult<String> {
    let s = prefix.replace('\\', "/");
    if s.starts_with('/') {
        return Err(ReelError::validation("sequence prefix must be relative"));
    }

    let trailing_sep = s.ends_with('/');
    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(ReelError::validation("sequence prefix must not contain '..'"));
        }
        out.push(part);
    }

    let mut joined = out.join("/");
    if trailing_sep && !joined.is_empty() {
        joined.push('/');
    }
    Ok(joined)
}

#[cfg(test)]
#[path = "../../tests/unit/assets/sequence.rs"]
mod tests;
