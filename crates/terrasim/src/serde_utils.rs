//! Serde adapters for the glam types carried by brushes.
//!
//! Use with `#[serde(with = "crate::serde_utils::vec3")]` and friends so
//! persisted modifiers read as plain `{ x, y, z }` objects.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Vec3Repr {
    x: f32,
    y: f32,
    z: f32,
}

#[derive(Serialize, Deserialize)]
struct QuatRepr {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

pub mod vec3 {
    use super::Vec3Repr;
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(v: &Vec3, s: S) -> Result<S::Ok, S::Error> {
        Vec3Repr { x: v.x, y: v.y, z: v.z }.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec3, D::Error> {
        let r = Vec3Repr::deserialize(d)?;
        Ok(Vec3::new(r.x, r.y, r.z))
    }
}

/// Quaternions are renormalised on load; a zero quaternion becomes identity.
pub mod quat {
    use super::QuatRepr;
    use glam::Quat;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(q: &Quat, s: S) -> Result<S::Ok, S::Error> {
        let [x, y, z, w] = q.to_array();
        QuatRepr { x, y, z, w }.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Quat, D::Error> {
        let r = QuatRepr::deserialize(d)?;
        Ok(super::normalize_or_identity(Quat::from_xyzw(r.x, r.y, r.z, r.w)))
    }
}

fn normalize_or_identity(q: Quat) -> Quat {
    let len = q.length();
    if len.is_finite() && len > 1e-6 {
        q / len
    } else {
        Quat::IDENTITY
    }
}
