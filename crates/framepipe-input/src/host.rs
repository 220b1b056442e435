//! Script host boundary: turns a script file into a running frame source.

use framepipe_core::{FramePipeError, Result};
use framepipe_media::{ClipSpec, PatternEngine};
use framepipe_pipeline::FrameSource;
use std::path::Path;

/// Evaluates script files into frame sources.
pub trait ScriptHost: Send + Sync {
    type Source: FrameSource;

    /// Short name for diagnostics.
    fn name(&self) -> &str;

    /// Evaluate `path` and return its output node.
    fn evaluate(&self, path: &Path) -> Result<Self::Source>;
}

/// Host for pattern clip description files.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternHost;

impl ScriptHost for PatternHost {
    type Source = PatternEngine;

    fn name(&self) -> &str {
        "pattern"
    }

    fn evaluate(&self, path: &Path) -> Result<PatternEngine> {
        let spec = ClipSpec::load(path).map_err(|e| match e {
            FramePipeError::Io(err) => {
                FramePipeError::ScriptEvaluation(format!("{}: {err}", path.display()))
            }
            other => other,
        })?;
        PatternEngine::new(spec).map_err(|e| FramePipeError::NoOutput(e.to_string()))
    }
}
