//! Quaternion helpers for pointing the camera axis at an observed target.
//!
//! The camera looks along body +x. Quaternions are unit, `(x, y, z, w)`.

use glam::{DQuat, DVec3};

const EPS: f64 = 1e-6;

pub const FORWARD: DVec3 = DVec3::X;

/// Minimal rotation taking `FORWARD` onto the direction of `v`.
///
/// A zero vector yields the identity. The anti-parallel case is ambiguous and
/// resolves to a half turn about +y.
pub fn quaternion_from_direction(v: DVec3) -> DQuat {
    let len = v.length();
    if len.is_nan() || len < EPS {
        return DQuat::IDENTITY;
    }
    let v = v / len;
    let dot = FORWARD.dot(v);
    if dot <= -1.0 + EPS {
        return DQuat::from_xyzw(0.0, 1.0, 0.0, 0.0);
    }
    if dot >= 1.0 - EPS {
        return DQuat::IDENTITY;
    }
    let axis = FORWARD.cross(v).normalize();
    let half = dot.acos() / 2.0;
    let s = half.sin();
    DQuat::from_xyzw(axis.x * s, axis.y * s, axis.z * s, half.cos())
}

/// `q * (v, 0) * q⁻¹`.
pub fn rotate(q: DQuat, v: DVec3) -> DVec3 {
    q * v
}

/// Hamilton product; `compose(a, b)` applies `b` first.
pub fn compose(q1: DQuat, q2: DQuat) -> DQuat {
    q1 * q2
}

/// Conjugate, the inverse of a unit quaternion.
pub fn inverse(q: DQuat) -> DQuat {
    q.conjugate()
}

/// Angle in radians between `FORWARD` and `v`; zero for a zero vector.
pub fn angle_to_forward(v: DVec3) -> f64 {
    let len = v.length();
    if len.is_nan() || len < EPS {
        return 0.0;
    }
    let dot = FORWARD.dot(v / len);
    if dot <= -1.0 + EPS {
        std::f64::consts::PI
    } else if dot >= 1.0 - EPS {
        0.0
    } else {
        dot.acos()
    }
}

/// Whether the target seen along `direction` is at least `tolerance_deg` off axis.
pub fn needs_realignment(direction: DVec3, tolerance_deg: f64) -> bool {
    angle_to_forward(direction).to_degrees() >= tolerance_deg
}

/// World orientation that points the camera at a target observed along
/// `observed` in the body frame of a robot oriented `orientation`.
pub fn corrective_rotation(orientation: DQuat, observed: DVec3) -> DQuat {
    quaternion_from_direction(rotate(orientation, observed))
}

/// World position of a body-frame `offset` from a robot at `position`.
pub fn world_point(position: DVec3, orientation: DQuat, offset: DVec3) -> DVec3 {
    position + rotate(orientation, offset)
}
