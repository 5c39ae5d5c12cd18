//! Brush shapes and per-cell weight evaluation.
//!
//! A [`ModifierBrush`] is a world-space shape. Evaluating it over a grid gives
//! a [`BrushFootprint`]: the clipped cell rectangle it touches plus one weight
//! per cell in that rectangle. Weights are 1 at the core and fall to 0 at the
//! boundary as `1 - r^falloff`, where `r` is the normalised distance from the
//! core. Image brushes use the remapped image value instead.

use crate::constants::{HEIGHT_EPSILON, MIN_FALLOFF};
use crate::grid::{sample_scalar_uv, GridDims};
use crate::serde_utils;
use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BrushShape {
    #[default]
    Circle,
    Box,
    /// Footprint weight read from a [`BrushImage`].
    Image,
    Sphere,
    Cube,
    /// Axis along local Y.
    Cylinder,
    /// Axis along local Y, radius `min(size.x, size.z) / 2`.
    Capsule,
}

impl BrushShape {
    /// 3-D primitives gate by whether the cell's vertical column meets the volume.
    pub fn is_volume(self) -> bool {
        matches!(
            self,
            BrushShape::Sphere | BrushShape::Cube | BrushShape::Cylinder | BrushShape::Capsule
        )
    }
}

/// How a brush weight combines with the existing value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlendOp {
    /// `dest + weight * strength * dt`
    #[default]
    Add,
    Min,
    Max,
    /// `lerp(dest, target, weight)`
    Set,
}

/// Coordinate space of a Set/Min/Max height target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightSpace {
    /// Target is the world surface height; the layer is adjusted so the
    /// surface reaches it.
    #[default]
    Absolute,
    /// Target is the layer's own thickness.
    Relative,
}

/// Combine `dest` with `value` at `weight`.
///
/// For [`BlendOp::Add`] `value` is the already-scaled `strength * dt`.
#[inline]
pub fn blend(op: BlendOp, dest: f32, value: f32, weight: f32) -> f32 {
    match op {
        BlendOp::Add => dest + weight * value,
        BlendOp::Set => dest * (1.0 - weight) + value * weight,
        BlendOp::Min => {
            let t = dest.min(value);
            dest + (t - dest) * weight
        }
        BlendOp::Max => {
            let t = dest.max(value);
            dest + (t - dest) * weight
        }
    }
}

/// Greyscale stamp for [`BrushShape::Image`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrushImage {
    pub width: usize,
    pub height: usize,
    /// Row-major samples, `width * height` long.
    pub data: Vec<f32>,
    /// Sample value mapped to weight 0.
    pub remap_min: f32,
    /// Sample value mapped to weight 1.
    pub remap_max: f32,
}

impl BrushImage {
    /// `None` when `data` does not cover `width * height` samples.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
            remap_min: 0.0,
            remap_max: 1.0,
        })
    }

    pub fn with_remap(mut self, min: f32, max: f32) -> Self {
        self.remap_min = min;
        self.remap_max = max;
        self
    }

    /// Remapped weight at normalised image coordinates.
    pub fn weight(&self, uv: Vec2) -> f32 {
        let s = sample_scalar_uv(&self.data, self.width, self.height, uv);
        (self.remap_min + s * (self.remap_max - self.remap_min)).clamp(0.0, 1.0)
    }
}

/// Inclusive cell rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRect {
    pub x0: usize,
    pub z0: usize,
    pub x1: usize,
    pub z1: usize,
}

impl CellRect {
    pub fn width(&self) -> usize {
        self.x1 - self.x0 + 1
    }

    pub fn depth(&self) -> usize {
        self.z1 - self.z0 + 1
    }

    pub fn cell_count(&self) -> usize {
        self.width() * self.depth()
    }

    pub fn contains(&self, x: usize, z: usize) -> bool {
        x >= self.x0 && x <= self.x1 && z >= self.z0 && z <= self.z1
    }
}

/// Evaluated weights of a brush over a grid.
#[derive(Clone, Debug)]
pub struct BrushFootprint {
    pub rect: CellRect,
    /// Row-major over `rect`.
    pub weights: Vec<f32>,
    width: usize,
}

impl BrushFootprint {
    /// Grid cells with a non-zero weight, as `(grid index, weight)`.
    pub fn cells(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        let rect = self.rect;
        let width = self.width;
        self.weights.iter().enumerate().filter_map(move |(i, &w)| {
            if w <= 0.0 {
                return None;
            }
            let x = rect.x0 + i % rect.width();
            let z = rect.z0 + i / rect.width();
            Some((z * width + x, w))
        })
    }

    /// Weight at a grid cell, 0 outside the rectangle.
    pub fn weight_at(&self, x: usize, z: usize) -> f32 {
        if !self.rect.contains(x, z) {
            return 0.0;
        }
        self.weights[(z - self.rect.z0) * self.rect.width() + (x - self.rect.x0)]
    }
}

/// A world-space shaped brush.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifierBrush {
    pub shape: BrushShape,
    /// Centre in world space.
    #[serde(with = "serde_utils::vec3")]
    pub position: Vec3,
    /// Full extent along each local axis.
    #[serde(with = "serde_utils::vec3")]
    pub size: Vec3,
    #[serde(with = "serde_utils::quat")]
    pub rotation: Quat,
    /// Edge sharpness. Higher is sharper.
    pub falloff: f32,
    #[serde(default)]
    pub image: Option<BrushImage>,
}

impl Default for ModifierBrush {
    fn default() -> Self {
        Self {
            shape: BrushShape::Circle,
            position: Vec3::ZERO,
            size: Vec3::ONE,
            rotation: Quat::IDENTITY,
            falloff: 1.0,
            image: None,
        }
    }
}

impl ModifierBrush {
    /// Flat circle of `radius` centred at world XZ `center`.
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self {
            shape: BrushShape::Circle,
            position: Vec3::new(center.x, 0.0, center.y),
            size: Vec3::new(radius * 2.0, 0.0, radius * 2.0),
            ..Default::default()
        }
    }

    /// Flat rectangle of full `size` centred at world XZ `center`.
    pub fn rect(center: Vec2, size: Vec2) -> Self {
        Self {
            shape: BrushShape::Box,
            position: Vec3::new(center.x, 0.0, center.y),
            size: Vec3::new(size.x, 0.0, size.y),
            ..Default::default()
        }
    }

    /// Image stamp covering `size` at world XZ `center`.
    pub fn image(center: Vec2, size: Vec2, image: BrushImage) -> Self {
        Self {
            shape: BrushShape::Image,
            position: Vec3::new(center.x, 0.0, center.y),
            size: Vec3::new(size.x, 0.0, size.y),
            image: Some(image),
            ..Default::default()
        }
    }

    /// 3-D primitive centred at `position` with full extent `size`.
    pub fn volume(shape: BrushShape, position: Vec3, size: Vec3) -> Self {
        Self {
            shape,
            position,
            size,
            ..Default::default()
        }
    }

    pub fn with_falloff(mut self, falloff: f32) -> Self {
        self.falloff = falloff;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    fn half_extent(&self) -> Vec3 {
        (self.size.abs() * 0.5).max(Vec3::splat(HEIGHT_EPSILON))
    }

    fn inverse_rotation(&self) -> Quat {
        let q = self.rotation.normalize();
        if q.is_finite() {
            q.inverse()
        } else {
            Quat::IDENTITY
        }
    }

    /// World-space XZ bounds of the rotated shape.
    pub fn world_bounds(&self) -> (Vec2, Vec2) {
        let h = self.half_extent();
        let hy = if self.shape.is_volume() { h.y } else { 0.0 };
        let rotation = self.rotation.normalize();
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for sx in [-1.0, 1.0] {
            for sy in [-1.0, 1.0] {
                for sz in [-1.0, 1.0] {
                    let corner = rotation * Vec3::new(sx * h.x, sy * hy, sz * h.z);
                    let p = Vec2::new(self.position.x + corner.x, self.position.z + corner.z);
                    min = min.min(p);
                    max = max.max(p);
                }
            }
        }
        (min, max)
    }

    /// Cells whose centres lie inside the world bounds, clipped to the grid.
    pub fn cell_rect(&self, dims: GridDims) -> Option<CellRect> {
        let (min, max) = self.world_bounds();
        if !min.is_finite() || !max.is_finite() || dims.cell_size <= 0.0 {
            return None;
        }
        let lo = dims.world_to_grid(min);
        let hi = dims.world_to_grid(max);
        let x0 = (lo.x.ceil() as i64).max(0);
        let z0 = (lo.y.ceil() as i64).max(0);
        let x1 = (hi.x.floor() as i64).min(dims.width as i64 - 1);
        let z1 = (hi.y.floor() as i64).min(dims.depth as i64 - 1);
        if x0 > x1 || z0 > z1 {
            return None;
        }
        Some(CellRect {
            x0: x0 as usize,
            z0: z0 as usize,
            x1: x1 as usize,
            z1: z1 as usize,
        })
    }

    /// Weight at a world XZ position.
    pub fn weight_at(&self, world: Vec2) -> f32 {
        let inv = self.inverse_rotation();
        let h = self.half_extent();
        let falloff = self.falloff.max(MIN_FALLOFF);

        if self.shape.is_volume() {
            let origin = inv * Vec3::new(world.x - self.position.x, -self.position.y, world.y - self.position.z);
            let dir = inv * Vec3::Y;
            let r = match self.shape {
                BrushShape::Sphere => sphere_reach(origin / h, dir / h),
                BrushShape::Cube => cube_reach(origin / h, dir / h),
                BrushShape::Cylinder => cylinder_reach(origin / h, dir / h),
                _ => capsule_reach(origin, dir, h),
            };
            return falloff_weight(r, falloff);
        }

        let local = inv * Vec3::new(world.x - self.position.x, 0.0, world.y - self.position.z);
        let planar = Vec2::new(local.x / h.x, local.z / h.z);
        match self.shape {
            BrushShape::Circle => falloff_weight(planar.length(), falloff),
            BrushShape::Box => falloff_weight(planar.abs().max_element(), falloff),
            _ => {
                let uv = planar * 0.5 + Vec2::splat(0.5);
                if uv.x < 0.0 || uv.y < 0.0 || uv.x > 1.0 || uv.y > 1.0 {
                    return 0.0;
                }
                self.image.as_ref().map_or(0.0, |img| img.weight(uv))
            }
        }
    }

    /// Evaluate the brush over `dims`. `None` when it touches no cell.
    pub fn footprint(&self, dims: GridDims) -> Option<BrushFootprint> {
        let rect = self.cell_rect(dims)?;
        let mut weights = Vec::with_capacity(rect.cell_count());
        for z in rect.z0..=rect.z1 {
            for x in rect.x0..=rect.x1 {
                weights.push(self.weight_at(dims.cell_center(x, z)));
            }
        }
        Some(BrushFootprint {
            rect,
            weights,
            width: dims.width,
        })
    }
}

#[inline]
fn falloff_weight(r: f32, falloff: f32) -> f32 {
    if !r.is_finite() || r >= 1.0 {
        return 0.0;
    }
    1.0 - r.max(0.0).powf(falloff)
}

// =============================================================================
// VOLUME REACH
// =============================================================================
//
// Each function takes the cell's vertical line `origin + t * dir` in the
// brush's local frame and returns the smallest normalised distance the line
// gets to the primitive's core (<= 1 means the column meets the volume).

/// Unit sphere: closest approach of the line to the origin.
fn sphere_reach(origin: Vec3, dir: Vec3) -> f32 {
    let dd = dir.length_squared();
    if dd <= f32::EPSILON {
        return origin.length();
    }
    let t = -origin.dot(dir) / dd;
    (origin + dir * t).length()
}

/// Unit cube: minimum Chebyshev norm along the line.
///
/// The norm is convex and piecewise linear in `t`, so its minimum lies at a
/// breakpoint: a zero of one component or a crossing of two.
fn cube_reach(origin: Vec3, dir: Vec3) -> f32 {
    let o = origin.to_array();
    let d = dir.to_array();
    let norm = |t: f32| (origin + dir * t).abs().max_element();

    let mut best = norm(0.0);
    for i in 0..3 {
        if d[i].abs() > f32::EPSILON {
            best = best.min(norm(-o[i] / d[i]));
        }
        for j in (i + 1)..3 {
            let diff = d[i] - d[j];
            if diff.abs() > f32::EPSILON {
                best = best.min(norm(-(o[i] - o[j]) / diff));
            }
            let sum = d[i] + d[j];
            if sum.abs() > f32::EPSILON {
                best = best.min(norm(-(o[i] + o[j]) / sum));
            }
        }
    }
    best
}

/// Unit cylinder along Y: radial distance over the span where `|y| <= 1`.
fn cylinder_reach(origin: Vec3, dir: Vec3) -> f32 {
    let (t0, t1) = if dir.y.abs() <= f32::EPSILON {
        if origin.y.abs() > 1.0 {
            return f32::INFINITY;
        }
        (f32::NEG_INFINITY, f32::INFINITY)
    } else {
        let a = (-1.0 - origin.y) / dir.y;
        let b = (1.0 - origin.y) / dir.y;
        (a.min(b), a.max(b))
    };

    let o = Vec2::new(origin.x, origin.z);
    let d = Vec2::new(dir.x, dir.z);
    let dd = d.length_squared();
    let t = if dd <= f32::EPSILON {
        0.0_f32.clamp(t0, t1)
    } else {
        (-o.dot(d) / dd).clamp(t0, t1)
    };
    (o + d * t).length()
}

/// Capsule along local Y in unnormalised space: line-to-segment distance
/// over the radius.
fn capsule_reach(origin: Vec3, dir: Vec3, half: Vec3) -> f32 {
    let radius = half.x.min(half.z).max(HEIGHT_EPSILON);
    let seg = (half.y - radius).max(0.0);
    let dir = dir.normalize_or_zero();

    let ad = origin.dot(dir);
    let parallel = 1.0 - dir.y * dir.y;
    let s = if parallel <= f32::EPSILON {
        0.0
    } else {
        ((origin.y - ad * dir.y) / parallel).clamp(-seg, seg)
    };
    let w = origin - Vec3::Y * s;
    let wd = w.dot(dir);
    let dist_sq = (w.length_squared() - wd * wd).max(0.0);
    dist_sq.sqrt() / radius
}
