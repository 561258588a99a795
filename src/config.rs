use std::path::Path;

use anyhow::Context as _;

use crate::assets::sequence::FrameSequence;
use crate::foundation::error::{ReelError, ReelResult};
use crate::loader::LoadingOpts;
use crate::overlay::OverlayConfig;
use crate::render::renderer::RenderOpts;
use crate::scroll::ViewportOpts;
use crate::smoothing::Smoothing;

/// Complete player configuration. Every section falls back to its defaults when omitted.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub sequence: FrameSequence,
    pub loading: LoadingOpts,
    pub viewport: ViewportOpts,
    pub smoothing: Smoothing,
    pub render: RenderOpts,
    pub overlays: OverlayConfig,
}

impl PlayerConfig {
    pub fn from_path(path: &Path) -> ReelResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read player config '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> ReelResult<Self> {
        let cfg: Self = serde_json::from_str(text)
            .map_err(|e| ReelError::serde(format!("parse player config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_json_pretty(&self) -> ReelResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ReelError::serde(e.to_string()))
    }

    pub fn validate(&self) -> ReelResult<()> {
        self.sequence.validate()?;
        self.loading.validate()?;
        self.viewport.validate()?;
        self.smoothing.validate()?;
        self.render.validate()?;
        self.overlays.validate()?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
