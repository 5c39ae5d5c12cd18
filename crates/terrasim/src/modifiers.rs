//! Brush edits and the explicit modifier registry.
//!
//! Callers own a [`ModifierRegistry`] and pass it to every step; the
//! simulation keeps no brush state between steps.

use crate::brush::{BlendOp, HeightSpace, ModifierBrush};
use serde::{Deserialize, Serialize};

/// Height change on one layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeightEdit {
    pub brush: ModifierBrush,
    pub op: BlendOp,
    pub layer: usize,
    /// Rate (height/s) for `Add`, target height otherwise.
    pub strength: f32,
    /// How `strength` is read for Set/Min/Max.
    #[serde(default)]
    pub space: HeightSpace,
    /// Also paint this splat channel (layer 0 only).
    #[serde(default)]
    pub splat_channel: Option<usize>,
}

impl HeightEdit {
    pub fn add(brush: ModifierBrush, layer: usize, rate: f32) -> Self {
        Self {
            brush,
            op: BlendOp::Add,
            layer,
            strength: rate,
            space: HeightSpace::Relative,
            splat_channel: None,
        }
    }

    pub fn set(brush: ModifierBrush, layer: usize, target: f32, space: HeightSpace) -> Self {
        Self::target(brush, BlendOp::Set, layer, target, space)
    }

    pub fn min(brush: ModifierBrush, layer: usize, target: f32, space: HeightSpace) -> Self {
        Self::target(brush, BlendOp::Min, layer, target, space)
    }

    pub fn max(brush: ModifierBrush, layer: usize, target: f32, space: HeightSpace) -> Self {
        Self::target(brush, BlendOp::Max, layer, target, space)
    }

    fn target(brush: ModifierBrush, op: BlendOp, layer: usize, target: f32, space: HeightSpace) -> Self {
        Self {
            brush,
            op,
            layer,
            strength: target,
            space,
            splat_channel: None,
        }
    }

    pub fn with_splat(mut self, channel: usize) -> Self {
        self.splat_channel = Some(channel);
        self
    }
}

/// Suspended-sediment change on one layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SedimentEdit {
    pub brush: ModifierBrush,
    pub op: BlendOp,
    pub layer: usize,
    /// Rate for `Add`, target amount otherwise.
    pub strength: f32,
}

/// Splat-only paint, or erase when `subtract` is set.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplatEdit {
    pub brush: ModifierBrush,
    pub op: BlendOp,
    pub channel: usize,
    /// Lower the channel by the brush weight instead of painting it; `op` is
    /// ignored.
    #[serde(default)]
    pub subtract: bool,
}

impl SplatEdit {
    pub fn paint(brush: ModifierBrush, op: BlendOp, channel: usize) -> Self {
        Self {
            brush,
            op,
            channel,
            subtract: false,
        }
    }

    pub fn subtract(brush: ModifierBrush, channel: usize) -> Self {
        Self {
            brush,
            op: BlendOp::Add,
            channel,
            subtract: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Modifier {
    Height(HeightEdit),
    Sediment(SedimentEdit),
    Splat(SplatEdit),
}

impl From<HeightEdit> for Modifier {
    fn from(edit: HeightEdit) -> Self {
        Modifier::Height(edit)
    }
}

impl From<SedimentEdit> for Modifier {
    fn from(edit: SedimentEdit) -> Self {
        Modifier::Sediment(edit)
    }
}

impl From<SplatEdit> for Modifier {
    fn from(edit: SplatEdit) -> Self {
        Modifier::Splat(edit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModifierId(pub u64);

/// Insertion-ordered set of active modifiers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModifierRegistry {
    next_id: u64,
    entries: Vec<(ModifierId, Modifier)>,
}

impl ModifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, modifier: impl Into<Modifier>) -> ModifierId {
        let id = ModifierId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, modifier.into()));
        id
    }

    pub fn remove(&mut self, id: ModifierId) -> Option<Modifier> {
        let pos = self.entries.iter().position(|(i, _)| *i == id)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, id: ModifierId) -> Option<&Modifier> {
        self.entries.iter().find(|(i, _)| *i == id).map(|(_, m)| m)
    }

    pub fn get_mut(&mut self, id: ModifierId) -> Option<&mut Modifier> {
        self.entries.iter_mut().find(|(i, _)| *i == id).map(|(_, m)| m)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModifierId, &Modifier)> {
        self.entries.iter().map(|(id, m)| (*id, m))
    }
}
