// Pair coordination strategies
//
// A strategy decides how kernel results are distributed over the per-aircraft
// accumulators. Kernel calls are evaluated in parallel, then applied in conflict
// list order so the accumulated sums never depend on thread scheduling.

use std::collections::HashSet;

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::config::{Coordination, ResolutionParameters};
use crate::conflict::Conflict;
use crate::resolve::mvp::resolve_conflict;
use crate::traffic::AircraftState;

/// Which members of a pair take part in resolving it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Share {
    /// Both aircraft apply complementary halves
    Both,
    /// Only the ownship manoeuvres
    OwnshipOnly,
    /// Only the intruder manoeuvres
    IntruderOnly,
}

impl Share {
    #[inline]
    pub fn ownship(self) -> bool {
        matches!(self, Share::Both | Share::OwnshipOnly)
    }

    #[inline]
    pub fn intruder(self) -> bool {
        matches!(self, Share::Both | Share::IntruderOnly)
    }
}

/// Priority rule: a cruising aircraft is left alone when its opponent is
/// climbing or descending. Without priority, or when both are in the same
/// phase, both aircraft resolve.
pub fn share(params: &ResolutionParameters, ownship: &AircraftState, intruder: &AircraftState) -> Share {
    if !params.priority {
        return Share::Both;
    }
    let threshold = params.cruise_vs_threshold;
    match (ownship.is_cruising(threshold), intruder.is_cruising(threshold)) {
        (true, false) => Share::IntruderOnly,
        (false, true) => Share::OwnshipOnly,
        _ => Share::Both,
    }
}

/// Distributes kernel results into per-aircraft velocity corrections
pub trait CoordinationStrategy: Send + Sync {
    /// Add every conflict's contribution to `dv` (indexed like `fleet`).
    ///
    /// Returns the number of kernel evaluations.
    fn accumulate(
        &self,
        params: &ResolutionParameters,
        fleet: &[AircraftState],
        conflicts: &[Conflict],
        dv: &mut [Vector3<f64>],
    ) -> usize;
}

/// One kernel call per unordered pair, complementary corrections for both members
#[derive(Debug, Default, Clone, Copy)]
pub struct Symmetric;

impl CoordinationStrategy for Symmetric {
    fn accumulate(
        &self,
        params: &ResolutionParameters,
        fleet: &[AircraftState],
        conflicts: &[Conflict],
        dv: &mut [Vector3<f64>],
    ) -> usize {
        // (a, b) and (b, a) are the same conflict, keep the first one reported
        let mut seen = HashSet::with_capacity(conflicts.len());
        let pairs: Vec<&Conflict> = conflicts.iter().filter(|c| seen.insert(c.key())).collect();

        let results: Vec<Vector3<f64>> = pairs
            .par_iter()
            .map(|c| resolve_conflict(params, fleet, c))
            .collect();

        for (c, dv_pair) in pairs.iter().zip(&results) {
            let share = share(params, &fleet[c.ownship], &fleet[c.intruder]);
            if share.ownship() {
                dv[c.ownship] -= dv_pair;
            }
            if share.intruder() {
                dv[c.intruder] += dv_pair;
            }
        }

        pairs.len()
    }
}

/// Every record resolved from its ownship's viewpoint, applied to the ownship only
#[derive(Debug, Default, Clone, Copy)]
pub struct Independent;

impl CoordinationStrategy for Independent {
    fn accumulate(
        &self,
        params: &ResolutionParameters,
        fleet: &[AircraftState],
        conflicts: &[Conflict],
        dv: &mut [Vector3<f64>],
    ) -> usize {
        let results: Vec<Vector3<f64>> = conflicts
            .par_iter()
            .map(|c| resolve_conflict(params, fleet, c))
            .collect();

        for (c, dv_pair) in conflicts.iter().zip(&results) {
            if share(params, &fleet[c.ownship], &fleet[c.intruder]).ownship() {
                dv[c.ownship] -= dv_pair;
            }
        }

        conflicts.len()
    }
}

/// Strategy selected by the coordination setting
pub fn strategy_for(coordination: Coordination) -> &'static dyn CoordinationStrategy {
    match coordination {
        Coordination::Symmetric => &Symmetric,
        Coordination::Independent => &Independent,
    }
}
