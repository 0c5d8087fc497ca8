use serde::{Deserialize, Serialize};

/// Which process-wide failure hooks to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HookTargets {
    /// Main execution context only.
    Main,
    /// Secondary contexts (spawned threads) only.
    Secondary,
    Both,
    None,
}

/// Order in which frames appear in a rendered report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameOrder {
    InnermostFirst,
    OutermostFirst,
}

/// ANSI color policy for rendered reports. `Never` keeps output
/// byte-deterministic; tests rely on that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorMode {
    Never,
    Always,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub hooks: HookTargets,
    /// Context lines shown before and after the failing line.
    pub context_lines: usize,
    /// Length budget for one rendered value before truncation kicks in.
    pub max_value_len: usize,
    pub frame_order: FrameOrder,
    pub color: ColorMode,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            hooks: HookTargets::Both,
            context_lines: 2,
            max_value_len: 100,
            frame_order: FrameOrder::InnermostFirst,
            color: ColorMode::Never,
        }
    }
}
