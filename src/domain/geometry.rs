// Small 2D helpers shared by the systems.

use std::f32::consts::PI;

pub fn distance(ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    (dx * dx + dy * dy).sqrt()
}

/// Wraps an angle into `[-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let mut a = (angle + PI).rem_euclid(2.0 * PI) - PI;
    if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Clamps `pos` into `[min, max]` and reflects the outward velocity, scaled by `damping`.
/// Returns true when a wall was hit.
pub fn reflect_axis(pos: &mut f32, vel: &mut f32, min: f32, max: f32, damping: f32) -> bool {
    if *pos < min {
        *pos = min;
        if *vel < 0.0 {
            *vel = -*vel * damping;
        }
        true
    } else if *pos > max {
        *pos = max;
        if *vel > 0.0 {
            *vel = -*vel * damping;
        }
        true
    } else {
        false
    }
}
