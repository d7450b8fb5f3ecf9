use std::{
    error::Error,
    fs::File,
    io::Write,
    process::exit,
    sync::PoisonError,
    time::Instant,
};

use dsim::VirtualTime;
use galois::{CumulativeStats, GaloisConfig, GaloisError, GaloisSimulation, SharedStats};
use log::{error, warn};
use rayon::prelude::*;

const BENCHMARK_SETTINGS: [(usize, usize); 4] = [(4, 64), (8, 96), (16, 128), (32, 256)];

fn usage() -> ! {
    eprintln!("usage: galois [machineCount] [frameCount|unbounded]");
    eprintln!("       galois benchmark");
    exit(2)
}

fn parse_args() -> Vec<GaloisConfig> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.first().is_some_and(|arg| arg == "benchmark") {
        return BENCHMARK_SETTINGS
            .iter()
            .map(|&(machines, frames)| GaloisConfig::for_machines(machines, Some(frames)))
            .collect();
    }

    let machine_count = match args.first() {
        None => 16,
        Some(arg) => arg.parse().unwrap_or_else(|_| usage()),
    };
    let frame_count = match args.get(1).map(String::as_str) {
        None => Some(128),
        Some("unbounded") => None,
        Some(arg) => Some(arg.parse().unwrap_or_else(|_| usage())),
    };
    vec![GaloisConfig::for_machines(machine_count, frame_count)]
}

// Resident set size of the driver process in MB.
fn resident_memory_mb(_at: VirtualTime) -> Option<f64> {
    match procfs::process::Process::myself().and_then(|me| me.statm()) {
        Ok(statm) => Some((statm.resident * procfs::page_size()) as f64 / (1024.0 * 1024.0)),
        Err(e) => {
            warn!("Skipping memory sample: {e}");
            None
        }
    }
}

fn avg(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

fn run_simulation(
    sim_id: usize,
    h: usize,
    config: &GaloisConfig,
    cumulative: &SharedStats,
) -> Result<(), GaloisError> {
    let start = Instant::now();
    let seed = ((sim_id + 1) * (h + 1)) as u64;
    let mut sim = GaloisSimulation::new(seed, config.clone())?.with_memory_sampler(resident_memory_mb);
    sim.store_all_code_packets()?;
    sim.run()?;

    let stats = sim.stats();
    println!(
        "Stats for simulation {sim_id} (h = {h}), elapsed: {} millis:\n \
         * Average client requests: {:.1}\n \
         * Average client time waited: {:.1} ms\n \
         * Reconstructed files: {}\n \
         * Lost switch messages: {}\n \
         * Average used memory: {:.0} MB",
        start.elapsed().as_millis(),
        avg(stats.client_requests_avg),
        avg(stats.client_time_waited_avg) / 1000.0,
        stats.reconstructed_files,
        stats.lost_switch_messages,
        avg(stats.used_memory_avg),
    );

    cumulative
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .record_run(&sim.run_stats());
    Ok(())
}

fn run_simulations(config: &GaloisConfig) -> Result<Option<f64>, Box<dyn Error>> {
    let frames = config
        .frame_count
        .map_or_else(|| "inf".to_string(), |frames| frames.to_string());
    let output_name = format!("output-mc{}-fc{}.txt", config.machine_count, frames);
    let mut output = File::create(&output_name)?;
    let cumulative = CumulativeStats::shared();

    for h in 0..config.machine_count - config.request_count {
        let config = config.clone().with_extra_requests(h);
        println!("### Simulating with h = {h}");

        (0..config.sim_count)
            .into_par_iter()
            .map(|sim_id| run_simulation(sim_id, h, &config, &cumulative))
            .collect::<Result<(), _>>()?;

        let mut stats = cumulative.lock().unwrap_or_else(PoisonError::into_inner);
        let totals = stats.totals();
        let cr = avg(totals.client_requests_avg);
        let ct = avg(totals.client_time_waited_avg) / 1000.0;
        let rf = avg(totals.reconstructed_files_avg);
        let lm = avg(totals.lost_switch_messages_avg);
        println!(
            "Total stats for simulation with h = {h}:\n \
             * Average client requests: {cr:.1}\n \
             * Average client time waited: {ct:.1} ms\n \
             * Average reconstructed files: {rf:.0}\n \
             * Average lost switch messages: {lm:.0}"
        );
        writeln!(output, "{h} {cr} {ct} {rf} {lm}")?;
        output.flush()?;
        stats.reset_experiment();
    }

    let memory = cumulative
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take_used_memory_avg();
    Ok(memory)
}

fn main() {
    for config in parse_args() {
        if let Err(e) = config.validate() {
            eprintln!("{e}");
            usage();
        }
        match run_simulations(&config) {
            Ok(memory) => println!(
                "Machines: {}, frames: {:?}, average used memory: {:.0} MB",
                config.machine_count,
                config.frame_count,
                avg(memory)
            ),
            Err(e) => {
                error!("Simulation failed: {e}");
                exit(1)
            }
        }
    }
}
