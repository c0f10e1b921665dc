pub mod capture;
pub mod display;
pub mod error;
pub mod pipeline;

use serde::{Deserialize, Serialize};

use crate::capture::source::SourceId;

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub display: DisplayConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: SourceId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Key that requests graceful shutdown.
    pub exit_key: char,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Width every frame is resized to before handoff to the display.
    pub target_width: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                id: SourceId::default(),
            },
            display: DisplayConfig { exit_key: 'q' },
            pipeline: PipelineConfig { target_width: 1080 },
        }
    }
}
