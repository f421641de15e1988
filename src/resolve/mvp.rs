// Modified Voltage Potential pairwise resolution kernel
//
// Works in a local east/north/up frame centred on the ownship. All inputs are SI.

use nalgebra::{Vector2, Vector3};

use crate::config::{ResolutionDirection, ResolutionParameters};
use crate::conflict::Conflict;
use crate::constants::{MAX_DV_VERTICAL, MIN_MISS_DIRECTION, MIN_MISS_DISTANCE, MIN_TCPA};
use crate::traffic::AircraftState;

/// Velocity change that resolves the conflict between `ownship` and `intruder`
///
/// The returned vector (east, north, up in m/s) pushes the intruder away from the
/// ownship along the predicted miss vector at the closest point of approach. The
/// ownship applies its negative, so resolving the pair from the other viewpoint
/// yields the same vector with the opposite sign.
///
/// # Arguments
/// * `params` - Separation minima and resolution direction
/// * `ownship`, `intruder` - Current kinematic states
/// * `distance` - Current horizontal separation (m)
/// * `bearing` - Bearing from ownship to intruder (degrees)
/// * `tcpa` - Time to closest point of approach (s); the sign never flips the correction
///
/// # Panics
/// On non-finite geometry, a negative distance or non-finite aircraft state.
pub fn resolve_pair(
    params: &ResolutionParameters,
    ownship: &AircraftState,
    intruder: &AircraftState,
    distance: f64,
    bearing: f64,
    tcpa: f64,
) -> Vector3<f64> {
    assert!(distance.is_finite() && distance >= 0.0, "invalid pair distance {}", distance);
    assert!(bearing.is_finite() && tcpa.is_finite(), "non-finite pair geometry");
    ownship.check();
    intruder.check();

    let vertical_only = params.direction == ResolutionDirection::Vertical;

    // Relative position of the intruder
    let qdr = bearing.to_radians();
    let d = Vector3::new(qdr.sin() * distance, qdr.cos() * distance, intruder.alt - ownship.alt);

    // Relative velocity and predicted miss vector at CPA
    let v = intruder.velocity() - ownship.velocity();
    let mut dcpa = d + v * tcpa;
    let mut dabs_h = dcpa.xy().norm();
    let mut dabs_v = dcpa.z.abs();

    // Intrusion depths
    let mut i_h = params.rm - dabs_h;
    let i_v = params.dhm - dabs_v;

    // Already inside the protected zone on either axis: full-strength escape
    if d.x.abs() < params.rm || d.y.abs() < params.rm {
        i_h = params.rm;
    }

    // Head-on geometry, avoid dividing by a vanishing miss distance
    if dabs_h <= MIN_MISS_DISTANCE {
        let lateral = head_on_direction(&dcpa.xy(), &d.xy(), qdr);
        dcpa.x = lateral.x * MIN_MISS_DISTANCE;
        dcpa.y = lateral.y * MIN_MISS_DISTANCE;
        dabs_h = MIN_MISS_DISTANCE;
    }
    if dabs_v <= MIN_MISS_DISTANCE {
        dabs_v = MIN_MISS_DISTANCE;
        if vertical_only {
            let side = if dcpa.z != 0.0 { dcpa.z } else { d.z };
            dcpa.z = MIN_MISS_DISTANCE.copysign(side);
        }
    }

    let t = tcpa.abs().max(MIN_TCPA);
    let mut dv = Vector3::new(
        i_h * dcpa.x / (t * dabs_h),
        i_h * dcpa.y / (t * dabs_h),
        i_v * dcpa.z / (t * dabs_v),
    );

    // Damp vertical corrections so both aircraft keep coordinating over several ticks
    if !vertical_only {
        dv.z = dv.z.clamp(-MAX_DV_VERTICAL, MAX_DV_VERTICAL);
    }

    // Intruder outside the protected zone: a plain MVP vector undershoots
    if params.rm < distance && dabs_h < distance {
        let factor = outside_zone_factor(params.rm, distance, dabs_h);
        dv.x *= factor;
        dv.y *= factor;
    }

    dv
}

/// [`resolve_pair`] with the geometry of a detector record
pub fn resolve_conflict(
    params: &ResolutionParameters,
    fleet: &[AircraftState],
    conflict: &Conflict,
) -> Vector3<f64> {
    resolve_pair(
        params,
        &fleet[conflict.ownship],
        &fleet[conflict.intruder],
        conflict.distance,
        conflict.bearing,
        conflict.tcpa,
    )
}

/// Scaling of the horizontal correction for an intruder outside the protected zone
///
/// Requires `rm < distance` and `dabs_h < distance`. The result is finite, at least
/// 1, decreases strictly with `distance` and tends to `rm / dabs_h` as `distance`
/// approaches `rm` from above.
pub(crate) fn outside_zone_factor(rm: f64, distance: f64, dabs_h: f64) -> f64 {
    1.0 / ((rm / distance).asin() - (dabs_h / distance).asin()).cos()
}

/// Unit horizontal direction for a head-on miss vector
///
/// Keeps the miss vector's own direction while it is meaningful. Otherwise both
/// aircraft are sent to their right of the line of sight, which flips sign with the
/// viewpoint like the miss vector does. Co-located aircraft use the bearing `qdr`
/// (radians) in place of the vanishing line of sight.
fn head_on_direction(miss: &Vector2<f64>, los: &Vector2<f64>, qdr: f64) -> Vector2<f64> {
    let miss_len = miss.norm();
    if miss_len >= MIN_MISS_DIRECTION {
        return miss / miss_len;
    }
    let los_len = los.norm();
    if los_len > 0.0 {
        Vector2::new(-los.y, los.x) / los_len
    } else {
        Vector2::new(-qdr.cos(), qdr.sin())
    }
}
