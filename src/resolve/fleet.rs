// Fleet resolution: accumulate pair corrections and turn them into autopilot targets

use nalgebra::Vector3;
use tracing::debug;

use crate::aero::{vcas2tas, vtas2cas};
use crate::config::{ResolutionDirection, ResolutionParameters};
use crate::conflict::Conflict;
use crate::constants::ALT_TARGET_LOOKAHEAD_FACTOR;
use crate::resolve::strategy::strategy_for;
use crate::traffic::{AircraftState, Resolution};

/// Counters for one resolution pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionSummary {
    /// Conflict records received
    pub conflicts: usize,
    /// Kernel evaluations
    pub evaluated: usize,
    /// Aircraft whose resolution fields were written
    pub aircraft: usize,
    /// Of those, aircraft that received a non-zero correction
    pub manoeuvring: usize,
}

/// Run one resolution pass over the fleet
///
/// Writes `resolution` for every aircraft that appears in `conflicts` and leaves
/// all other aircraft untouched. Does nothing when resolution is disabled.
///
/// # Panics
/// When a conflict references an aircraft outside `fleet`, carries non-finite or
/// negative geometry, or involves an aircraft with non-finite state.
pub fn resolve_fleet(
    params: &ResolutionParameters,
    fleet: &mut [AircraftState],
    conflicts: &[Conflict],
) -> ResolutionSummary {
    if !params.enabled {
        return ResolutionSummary::default();
    }

    let n = fleet.len();
    for conflict in conflicts {
        conflict.check(n);
        fleet[conflict.ownship].check();
        fleet[conflict.intruder].check();
    }

    // Accumulators start from zero every tick
    let mut dv = vec![Vector3::zeros(); n];
    let evaluated = strategy_for(params.coordination).accumulate(params, fleet, conflicts, &mut dv);

    // Earliest loss of separation per aircraft, None when not involved
    let mut tlos_min: Vec<Option<f64>> = vec![None; n];
    for conflict in conflicts {
        for idx in [conflict.ownship, conflict.intruder] {
            let t = tlos_min[idx].map_or(conflict.tlos, |t| t.min(conflict.tlos));
            tlos_min[idx] = Some(t);
        }
    }

    let mut summary = ResolutionSummary {
        conflicts: conflicts.len(),
        evaluated,
        ..Default::default()
    };

    for (idx, ac) in fleet.iter_mut().enumerate() {
        let Some(tlos) = tlos_min[idx] else {
            continue;
        };
        let correction = restrict(params.direction, dv[idx]);
        let resolution = if correction == Vector3::zeros() {
            ac.nominal()
        } else {
            summary.manoeuvring += 1;
            targets(params, ac, &correction, tlos)
        };
        ac.resolution = Some(resolution);
        summary.aircraft += 1;
    }

    debug!(
        conflicts = summary.conflicts,
        evaluated = summary.evaluated,
        aircraft = summary.aircraft,
        manoeuvring = summary.manoeuvring,
        "Resolution pass"
    );

    summary
}

/// Drop the components the resolution direction does not allow
fn restrict(direction: ResolutionDirection, mut dv: Vector3<f64>) -> Vector3<f64> {
    match direction {
        ResolutionDirection::Horizontal => dv.z = 0.0,
        ResolutionDirection::Vertical => {
            dv.x = 0.0;
            dv.y = 0.0;
        }
        ResolutionDirection::Both => {}
    }
    dv
}

/// Autopilot targets for one aircraft from its accumulated correction
fn targets(params: &ResolutionParameters, ac: &AircraftState, dv: &Vector3<f64>, tlos: f64) -> Resolution {
    let newv = ac.velocity() + dv;

    let heading = newv.x.atan2(newv.y).to_degrees().rem_euclid(360.0);

    // Speed limits are calibrated; the velocity vector is true (no wind)
    let gs = newv.xy().norm();
    let cas = vtas2cas(gs, ac.alt).clamp(params.vmin, params.vmax);
    let airspeed = vcas2tas(cas, ac.alt);

    let vertical_speed = newv.z.clamp(params.vsmin, params.vsmax);

    let mut altitude = ac.resolution.map_or(ac.selalt, |r| r.altitude);
    if tlos < ALT_TARGET_LOOKAHEAD_FACTOR * params.lookahead {
        altitude = ac.alt + vertical_speed * tlos;
    }
    // Climbing or descending towards a cleared level: never aim beyond it
    if ac.alt != ac.selalt {
        altitude = ac.selalt;
    }

    Resolution {
        heading,
        airspeed,
        vertical_speed,
        altitude,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Coordination;
    use crate::constants::{FPM, KTS, NM};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn head_on() -> (Vec<AircraftState>, Vec<Conflict>) {
        let fleet = vec![
            AircraftState::new("A", 52.0, 4.0, 10000.0).with_velocity(90.0, 230.0, 0.0),
            AircraftState::new("B", 52.0, 4.4, 10000.0).with_velocity(270.0, 230.0, 0.0),
        ];
        let conflicts = vec![Conflict::between(&fleet, 0, 1, 55.0).with_tlos(40.0)];
        (fleet, conflicts)
    }

    #[test]
    fn test_disabled_is_noop() {
        let params = ResolutionParameters { enabled: false, ..Default::default() };
        let (mut fleet, conflicts) = head_on();
        let summary = resolve_fleet(&params, &mut fleet, &conflicts);
        assert_eq!(summary, ResolutionSummary::default());
        assert!(fleet.iter().all(|ac| ac.resolution.is_none()));
    }

    #[test]
    fn test_uninvolved_aircraft_untouched() {
        let params = ResolutionParameters::default();
        let (mut fleet, conflicts) = head_on();
        fleet.push(AircraftState::new("C", 40.0, -74.0, 3000.0).with_velocity(10.0, 150.0, 0.0));
        let summary = resolve_fleet(&params, &mut fleet, &conflicts);
        assert_eq!(summary.aircraft, 2);
        assert_eq!(summary.manoeuvring, 2);
        assert!(fleet[2].resolution.is_none());
    }

    #[test]
    fn test_head_on_turns_apart() {
        let params = ResolutionParameters::default();
        let (mut fleet, conflicts) = head_on();
        resolve_fleet(&params, &mut fleet, &conflicts);
        let a = fleet[0].resolution.unwrap();
        let b = fleet[1].resolution.unwrap();
        // Both turn right by the same angle
        let turn_a = (a.heading - 90.0 + 180.0).rem_euclid(360.0) - 180.0;
        let turn_b = (b.heading - 270.0 + 180.0).rem_euclid(360.0) - 180.0;
        assert!(turn_a.abs() > 0.1, "heading {}", a.heading);
        assert!((turn_a - turn_b).abs() < 1e-6, "{} vs {}", turn_a, turn_b);
        assert_eq!(a.vertical_speed, 0.0);
    }

    #[test]
    fn test_priority_level_aircraft_undisturbed() {
        let params = ResolutionParameters { priority: true, ..Default::default() };
        let mut fleet = vec![
            AircraftState::new("LEVEL", 52.0, 4.0, 10000.0).with_velocity(90.0, 230.0, 0.0),
            AircraftState::new("CLIMB", 52.0, 4.4, 9800.0)
                .with_velocity(270.0, 230.0, 1500.0 * FPM)
                .with_selalt(11000.0),
        ];
        let conflicts = vec![Conflict::between(&fleet, 0, 1, 55.0).with_tlos(30.0)];
        let nominal = fleet[0].nominal();

        let mut dv = vec![Vector3::zeros(); 2];
        strategy_for(params.coordination).accumulate(&params, &fleet, &conflicts, &mut dv);
        assert_eq!(dv[0], Vector3::zeros());
        assert!(dv[1].norm() > 0.0);

        let summary = resolve_fleet(&params, &mut fleet, &conflicts);
        assert_eq!(summary.manoeuvring, 1);
        assert_eq!(fleet[0].resolution, Some(nominal));
        assert_ne!(fleet[1].resolution.unwrap().heading, 270.0);
    }

    #[test]
    fn test_past_cleared_altitude_resets_target() {
        let params = ResolutionParameters::default();
        let (mut fleet, conflicts) = head_on();
        // Already 200 m above its cleared level
        fleet[0].selalt = 9800.0;
        resolve_fleet(&params, &mut fleet, &conflicts);
        assert_eq!(fleet[0].resolution.unwrap().altitude, 9800.0);
    }

    #[test]
    fn test_altitude_target_from_vertical_correction() {
        let params = ResolutionParameters { direction: ResolutionDirection::Vertical, ..Default::default() };
        let mut fleet = vec![
            AircraftState::new("A", 52.0, 4.0, 10000.0).with_velocity(90.0, 230.0, 0.0),
            AircraftState::new("B", 52.0, 4.4, 10050.0)
                .with_velocity(270.0, 230.0, 0.0)
                .with_selalt(10050.0),
        ];
        let conflicts = vec![Conflict::between(&fleet, 0, 1, 55.0).with_tlos(40.0)];
        resolve_fleet(&params, &mut fleet, &conflicts);

        let a = fleet[0].resolution.unwrap();
        let b = fleet[1].resolution.unwrap();
        // Vertical only: tracks kept, lower aircraft descends, upper climbs
        assert!((a.heading - 90.0).abs() < 1e-9);
        assert!((b.heading - 270.0).abs() < 1e-9);
        assert!(a.vertical_speed < 0.0 && b.vertical_speed > 0.0);
        assert!((a.altitude - (10000.0 + a.vertical_speed * 40.0)).abs() < 1e-9);
        assert!((b.altitude - (10050.0 + b.vertical_speed * 40.0)).abs() < 1e-9);
    }

    #[test]
    fn test_late_conflict_keeps_previous_altitude() {
        let params = ResolutionParameters::default();
        let (mut fleet, mut conflicts) = head_on();
        conflicts[0].tlos = 2.0 * params.lookahead;
        fleet[0].resolution = Some(Resolution { heading: 90.0, airspeed: 230.0, vertical_speed: 0.0, altitude: 10300.0 });
        resolve_fleet(&params, &mut fleet, &conflicts);
        assert_eq!(fleet[0].resolution.unwrap().altitude, 10300.0);
        assert_eq!(fleet[1].resolution.unwrap().altitude, 10000.0);
    }

    #[test]
    fn test_horizontal_mode_keeps_vertical_speed() {
        let params = ResolutionParameters { direction: ResolutionDirection::Horizontal, ..Default::default() };
        let mut fleet = vec![
            AircraftState::new("A", 52.0, 4.0, 10000.0).with_velocity(90.0, 230.0, 0.0),
            AircraftState::new("B", 52.0, 4.4, 10100.0).with_velocity(270.0, 230.0, 0.0).with_selalt(10100.0),
        ];
        let conflicts = vec![Conflict::between(&fleet, 0, 1, 55.0).with_tlos(40.0)];
        resolve_fleet(&params, &mut fleet, &conflicts);
        assert_eq!(fleet[0].resolution.unwrap().vertical_speed, 0.0);
        assert_eq!(fleet[1].resolution.unwrap().vertical_speed, 0.0);
    }

    #[test]
    fn test_limits_never_violated() {
        let mut rng = StdRng::seed_from_u64(7);
        let base = ResolutionParameters {
            vmin: 180.0 * KTS,
            vmax: 320.0 * KTS,
            vsmin: -1500.0 * FPM,
            vsmax: 1500.0 * FPM,
            ..Default::default()
        };
        for coordination in [Coordination::Symmetric, Coordination::Independent] {
            let params = ResolutionParameters { coordination, ..base.clone() };
            for direction in [ResolutionDirection::Both, ResolutionDirection::Vertical] {
                let params = ResolutionParameters { direction, ..params.clone() };
                for _ in 0..50 {
                    let n = 6;
                    let mut fleet: Vec<AircraftState> = (0..n)
                        .map(|i| {
                            AircraftState::new(format!("AC{}", i), 52.0 + rng.gen_range(-0.2..0.2), 4.0 + rng.gen_range(-0.3..0.3), rng.gen_range(2000.0..12000.0))
                                .with_velocity(rng.gen_range(0.0..360.0), rng.gen_range(60.0..300.0), rng.gen_range(-20.0..20.0))
                        })
                        .collect();
                    let mut conflicts = Vec::new();
                    for i in 0..n {
                        for j in (i + 1)..n {
                            // Tiny |tcpa| drives the raw correction magnitude up
                            let tcpa = rng.gen_range(-5.0..5.0);
                            conflicts.push(Conflict::between(&fleet, i, j, tcpa).with_tlos(rng.gen_range(0.0..400.0)));
                            conflicts.push(Conflict::between(&fleet, j, i, tcpa));
                        }
                    }
                    resolve_fleet(&params, &mut fleet, &conflicts);
                    for ac in &fleet {
                        let r = ac.resolution.unwrap();
                        if r == ac.nominal() {
                            continue;
                        }
                        let cas = vtas2cas(r.airspeed, ac.alt);
                        assert!(cas >= params.vmin - 1e-6 && cas <= params.vmax + 1e-6, "cas {}", cas / KTS);
                        assert!(r.vertical_speed >= params.vsmin && r.vertical_speed <= params.vsmax);
                        assert!(r.heading >= 0.0 && r.heading < 360.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_independent_mode_matches_symmetric_targets() {
        let sym = ResolutionParameters::default();
        let ind = ResolutionParameters { coordination: Coordination::Independent, ..Default::default() };
        let (mut fleet_sym, conflicts) = head_on();
        let mut fleet_ind = fleet_sym.clone();
        let both: Vec<Conflict> = vec![conflicts[0].clone(), conflicts[0].mirrored()];
        resolve_fleet(&sym, &mut fleet_sym, &conflicts);
        resolve_fleet(&ind, &mut fleet_ind, &both);
        for (a, b) in fleet_sym.iter().zip(&fleet_ind) {
            let (a, b) = (a.resolution.unwrap(), b.resolution.unwrap());
            assert!((a.heading - b.heading).abs() < 1e-6);
            assert!((a.airspeed - b.airspeed).abs() < 1e-6);
        }
    }

    #[test]
    #[should_panic(expected = "outside a fleet")]
    fn test_unknown_aircraft_fails_fast() {
        let params = ResolutionParameters::default();
        let (mut fleet, _) = head_on();
        resolve_fleet(&params, &mut fleet, &[Conflict::new(0, 7, 5.0 * NM, 90.0, 60.0)]);
    }

    #[test]
    #[should_panic(expected = "non-finite state")]
    fn test_non_finite_aircraft_fails_fast() {
        let params = ResolutionParameters::default();
        let (mut fleet, conflicts) = head_on();
        fleet[0].alt = f64::NAN;
        fleet[1].trk = f64::INFINITY;
        resolve_fleet(&params, &mut fleet, &conflicts);
    }

    #[test]
    fn test_non_finite_uninvolved_aircraft_ignored() {
        let params = ResolutionParameters::default();
        let (mut fleet, conflicts) = head_on();
        let mut idle = fleet[0].clone();
        idle.id = "IDLE".to_string();
        idle.vs = f64::NAN;
        fleet.push(idle);
        resolve_fleet(&params, &mut fleet, &conflicts);
        assert!(fleet[2].resolution.is_none());
        assert!(fleet[0].resolution.is_some());
    }
}
