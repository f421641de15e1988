// Field formatting for the datalog record types

use crate::config::ResolutionParameters;
use crate::conflict::Conflict;
use crate::geodesy;
use crate::traffic::AircraftState;

/// `hh:mm:ss.ss` rendering of simulation time
pub fn sim_time_text(t: f64) -> String {
    let t = t.max(0.0);
    let hours = (t / 3600.0).floor();
    let minutes = ((t - hours * 3600.0) / 60.0).floor();
    let seconds = t - hours * 3600.0 - minutes * 60.0;
    format!("{:02}:{:02}:{:05.2}", hours as u64, minutes as u64, seconds)
}

/// lat, lon, trk, alt, tas, gs, vs, type
fn state_fields(ac: &AircraftState) -> String {
    format!(
        "{:.6},{:.6},{:.2},{:.1},{:.2},{:.2},{:.2},{}",
        ac.lat, ac.lon, ac.trk, ac.alt, ac.tas, ac.gs, ac.vs, ac.actype
    )
}

/// Predicted position at `t` seconds, straight and steady
fn predicted_position(ac: &AircraftState, t: f64) -> (f64, f64, f64) {
    let (lat, lon) = geodesy::kwikpos(ac.lat, ac.lon, ac.trk, ac.gs * t);
    (lat, lon, ac.alt + ac.vs * t)
}

fn format_time(t: Option<f64>) -> String {
    t.map(|t| format!("{:.2}", t)).unwrap_or_default()
}

pub fn sky_fields(ntraf: usize, nconf: usize, nlos: usize) -> String {
    format!("{},{},{}", ntraf, nconf, nlos)
}

pub fn snap_fields(ac: &AircraftState) -> String {
    format!(
        "{},{},{:.6},{:.6},{:.1},{:.2},{:.2},{:.2},{:.2}",
        ac.id, ac.actype, ac.lat, ac.lon, ac.alt, ac.tas, ac.gs, ac.vs, ac.trk
    )
}

pub fn inst_fields(ntraf: usize, ncruise: usize, nclimb: usize, nconf: usize) -> String {
    format!("{},{},{},{}", ntraf, ncruise, nclimb, nconf)
}

/// Conflict line: identities, timing, CPA positions and both states
pub fn conflict_fields(fleet: &[AircraftState], conflict: &Conflict) -> String {
    let (own, intr) = (&fleet[conflict.ownship], &fleet[conflict.intruder]);
    let (lat1, lon1, alt1) = predicted_position(own, conflict.tcpa);
    let (lat2, lon2, alt2) = predicted_position(intr, conflict.tcpa);
    format!(
        "{},{},{:.2},{},{},{:.6},{:.6},{:.1},{:.6},{:.6},{:.1},{},{}",
        own.id,
        intr.id,
        conflict.tcpa,
        format_time(Some(conflict.tlos)),
        format_time(conflict.tout),
        lat1,
        lon1,
        alt1,
        lat2,
        lon2,
        alt2,
        state_fields(own),
        state_fields(intr)
    )
}

/// Horizontal and vertical intrusion severity, 0 at the zone edge and 1 at full overlap
pub fn intrusion_severity(params: &ResolutionParameters, fleet: &[AircraftState], conflict: &Conflict) -> (f64, f64) {
    let dalt = (fleet[conflict.intruder].alt - fleet[conflict.ownship].alt).abs();
    let hsev = ((params.rm - conflict.distance) / params.rm).max(0.0);
    let vsev = ((params.dhm - dalt) / params.dhm).max(0.0);
    (hsev, vsev)
}

/// True when the pair is inside both protected dimensions right now
pub fn is_intrusion(params: &ResolutionParameters, fleet: &[AircraftState], conflict: &Conflict) -> bool {
    let (hsev, vsev) = intrusion_severity(params, fleet, conflict);
    hsev > 0.0 && vsev > 0.0
}

/// Intrusion line: identities, severities, timing and both states
pub fn intrusion_fields(params: &ResolutionParameters, fleet: &[AircraftState], conflict: &Conflict) -> String {
    let (own, intr) = (&fleet[conflict.ownship], &fleet[conflict.intruder]);
    let (hsev, vsev) = intrusion_severity(params, fleet, conflict);
    format!(
        "{},{},{:.4},{:.4},{},{},{},{}",
        own.id,
        intr.id,
        hsev,
        vsev,
        format_time(Some(conflict.tlos)),
        format_time(conflict.tout),
        state_fields(own),
        state_fields(intr)
    )
}
