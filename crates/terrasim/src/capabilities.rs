//! Backend capabilities, resolved once when a simulation is created.

use serde::{Deserialize, Serialize};

/// What the surrounding terrain system supports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// The terrain accepts external height/sediment/splat edits. When false
    /// every mutation entry point is a no-op.
    pub terraform: bool,
    /// Additive writes can be applied in place. When false they are routed
    /// through an accumulation buffer and combined in a separate pass.
    pub additive_blend: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            terraform: true,
            additive_blend: true,
        }
    }
}

/// How `Add` brush writes reach the terrain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrushWriteStrategy {
    /// Write straight into the active buffers.
    Direct,
    /// Accumulate, then combine before the next non-additive write or step.
    Accumulate,
    /// Drop all writes.
    Disabled,
}

impl Capabilities {
    pub fn write_strategy(&self) -> BrushWriteStrategy {
        match (self.terraform, self.additive_blend) {
            (false, _) => BrushWriteStrategy::Disabled,
            (true, true) => BrushWriteStrategy::Direct,
            (true, false) => BrushWriteStrategy::Accumulate,
        }
    }
}
