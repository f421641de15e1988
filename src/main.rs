// MVP Resolver - Main Entry Point
// Copyright (C) 2026 - mvp-resolver contributors
// Licensed under AGPL v3
//
// Replays recorded traffic and detector output through the resolver

use std::collections::{HashMap, HashSet};

use clap::Parser;
use tracing::{error, info, warn};

use mvp_resolver::config::Config;
use mvp_resolver::conflict::Conflict;
use mvp_resolver::datalog::{Datalog, LogCategory};
use mvp_resolver::output::{self, CsvOutput, JsonOutput, OutputHandler};
use mvp_resolver::replay::Replay;
use mvp_resolver::resolve::resolve_fleet;
use mvp_resolver::traffic::{AircraftState, Resolution};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_logging(config.verbose);

    let replay = Replay::load(&config.input)?;
    let params = match &replay.params {
        Some(params) => {
            info!("Using resolution settings from {}", config.input);
            params.clone()
        }
        None => config.resolution_parameters(),
    };
    info!(
        "Loaded {} frames, resolution {} ({:?}, {:?}, priority {})",
        replay.frames.len(),
        if params.enabled { "on" } else { "off" },
        params.direction,
        params.coordination,
        params.priority
    );

    // Outputs
    let mut outputs: Vec<Box<dyn OutputHandler>> = Vec::new();
    for filename in &config.write_csv {
        info!("Writing CSV resolutions to {}", filename);
        match CsvOutput::new(filename) {
            Ok(csv_out) => outputs.push(Box::new(csv_out)),
            Err(e) => error!("Failed to open CSV output file {}: {}", filename, e),
        }
    }
    if config.json {
        outputs.push(Box::new(JsonOutput::stdout()));
    }

    let mut datalog = open_datalog(&config, replay.scenario.as_deref().unwrap_or(""));

    // Resolutions persist between ticks; the replay only records traffic
    let mut carried: HashMap<String, Resolution> = HashMap::new();
    let mut logged_conflicts: HashSet<(String, String)> = HashSet::new();
    let mut logged_intrusions: HashSet<(String, String)> = HashSet::new();
    let mut resolved_total = 0;

    for frame in replay.frames {
        let simt = frame.simt;
        let mut fleet = frame.aircraft;
        for ac in fleet.iter_mut() {
            if ac.resolution.is_none() {
                ac.resolution = carried.get(&ac.id).copied();
            }
        }

        let summary = resolve_fleet(&params, &mut fleet, &frame.conflicts);
        resolved_total += summary.aircraft;
        output::publish(&mut outputs, simt, &fleet);

        carried = fleet
            .iter()
            .filter_map(|ac| ac.resolution.map(|r| (ac.id.clone(), r)))
            .collect();

        if let Some(log) = datalog.as_mut() {
            let nconf = distinct_pairs(&frame.conflicts);
            let intrusions: Vec<&Conflict> = frame
                .conflicts
                .iter()
                .filter(|c| mvp_resolver::datalog::records::is_intrusion(&params, &fleet, c))
                .collect();
            let nlos = intrusions.iter().map(|c| c.key()).collect::<HashSet<_>>().len();

            log.sky_save(simt, fleet.len(), nconf, nlos);
            log.snap_save(simt, &fleet);
            log.inst_save(simt, &fleet, params.cruise_vs_threshold, nconf);

            let new_conflicts = frame
                .conflicts
                .iter()
                .filter(|c| logged_conflicts.insert(pair_ids(&fleet, c)));
            log.log_conflicts(simt, &fleet, new_conflicts);

            let new_intrusions = intrusions
                .into_iter()
                .filter(|c| logged_intrusions.insert(pair_ids(&fleet, c)));
            log.log_intrusions(simt, &params, &fleet, new_intrusions);

            // Pairs no longer in conflict are logged again when they return
            let active: HashSet<(String, String)> = frame.conflicts.iter().map(|c| pair_ids(&fleet, c)).collect();
            logged_conflicts.retain(|k| active.contains(k));
            logged_intrusions.retain(|k| active.contains(k));

            if let Err(e) = log.clear_buffer(simt) {
                warn!("Datalog flush failed: {}", e);
            }
        }
    }

    for handler in outputs.iter_mut() {
        handler.flush();
    }
    if let Some(log) = datalog.as_mut() {
        if let Err(e) = log.flush_all() {
            warn!("Datalog flush failed: {}", e);
        }
    }

    info!("Replay finished: {} aircraft resolutions written", resolved_total);
    Ok(())
}

/// Datalog with the requested categories enabled, None when logging is off
fn open_datalog(config: &Config, scenario: &str) -> Option<Datalog> {
    let dir = config.log_dir.as_ref()?;
    let mut datalog = Datalog::new(dir, scenario);
    for name in &config.log {
        let enabled = name
            .parse::<LogCategory>()
            .and_then(|category| datalog.set_logger(category, true));
        match enabled {
            Ok(()) => info!("Datalog {} enabled in {}", name, dir),
            Err(e) => warn!("Datalog {} not enabled: {}", name, e),
        }
    }
    Some(datalog)
}

/// Number of distinct unordered pairs among the conflict records
fn distinct_pairs(conflicts: &[Conflict]) -> usize {
    conflicts.iter().map(Conflict::key).collect::<HashSet<_>>().len()
}

/// Callsign pair of a conflict, independent of record direction and fleet order
fn pair_ids(fleet: &[AircraftState], conflict: &Conflict) -> (String, String) {
    let (a, b) = (&fleet[conflict.ownship].id, &fleet[conflict.intruder].id);
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    if verbose {
        subscriber.with_max_level(tracing::Level::DEBUG).init();
        info!("Verbose logging enabled (DEBUG level)");
    } else {
        subscriber.with_max_level(tracing::Level::INFO).init();
    }
}
