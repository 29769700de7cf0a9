//! Olfsim Application
//!
//! Command-line driver for the olfactory circuit model. Loads parameters and
//! ORN calibration data from JSON, runs the staged pipeline and writes the
//! KC results as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Full run with default parameters
//! olfsim run --data hallem.json --out results.json
//!
//! # Override parameters by dotted name, fix the seed, use 8 threads
//! olfsim run --data hallem.json --set kc.sp_target=0.05 --set kc.N=1000 --seed 3 --threads 8
//!
//! # Print every parameter after overrides
//! olfsim params --params base.json --set kc.enable_apl=false
//! ```
//!
//! The data file holds spontaneous rates and per-odor deltas:
//!
//! ```text
//! { "spont": [g0, g1, ...], "delta": [[g0 odor0, g0 odor1, ...], [g1 odor0, ...], ...] }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use olfsim_core::{ModelParams, OrnData, PARAM_NAMES};
use olfsim_native::{remove_all_pretime, run_all, RunShape, RunVars, TuningReport};

/// Olfsim
#[derive(Parser, Debug)]
#[command(name = "olfsim")]
#[command(author, version, about = "Olfactory circuit simulator (ORN -> LN -> PN -> KC)", long_about = None)]
struct Cli {
    /// Logging verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the full pipeline and write KC results
    Run {
        #[command(flatten)]
        params: ParamArgs,

        /// ORN calibration data (JSON)
        #[arg(short, long)]
        data: PathBuf,

        /// Root seed; overrides the parameter file
        #[arg(long)]
        seed: Option<u64>,

        /// Worker threads (default: one per core)
        #[arg(short, long)]
        threads: Option<usize>,

        /// Append the run log to this file
        #[arg(long)]
        run_log: Option<PathBuf>,

        /// Drop settling columns from the layer series after the run
        #[arg(long)]
        trim: bool,

        /// Results file (default: stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Print every parameter as name=value
    Params {
        #[command(flatten)]
        params: ParamArgs,
    },
}

#[derive(Args, Debug)]
struct ParamArgs {
    /// Parameter file (JSON); missing fields keep their defaults
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Override one parameter, e.g. `kc.sp_target=0.05` (repeatable)
    #[arg(short, long = "set", value_name = "NAME=VALUE")]
    set: Vec<String>,
}

impl ParamArgs {
    fn load(&self) -> anyhow::Result<ModelParams> {
        let mut p = match &self.params {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading parameter file {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("parsing parameter file {}", path.display()))?
            }
            None => ModelParams::default(),
        };
        for assignment in &self.set {
            p.apply_override(assignment)
                .with_context(|| format!("applying --set {assignment}"))?;
        }
        Ok(p)
    }
}

// ============================================================================
// Input and Output Files
// ============================================================================

/// ORN calibration data as stored on disk
#[derive(Debug, Deserialize)]
struct DataFile {
    spont: Vec<f64>,
    delta: Vec<Vec<f64>>,
}

impl DataFile {
    fn into_orn_data(self) -> anyhow::Result<OrnData> {
        let n_gloms = self.spont.len();
        if self.delta.len() != n_gloms {
            bail!("delta has {} rows, spont has {n_gloms} glomeruli", self.delta.len());
        }
        let n_odors = self.delta.first().map_or(0, Vec::len);
        if let Some((g, row)) = self.delta.iter().enumerate().find(|(_, r)| r.len() != n_odors) {
            bail!("delta row {g} has {} odors, expected {n_odors}", row.len());
        }
        let delta = DMatrix::from_fn(n_gloms, n_odors, |g, o| self.delta[g][o]);
        Ok(OrnData::new(DVector::from_vec(self.spont), delta)?)
    }
}

fn load_data(path: &Path) -> anyhow::Result<OrnData> {
    let text = fs::read_to_string(path).with_context(|| format!("reading data file {}", path.display()))?;
    let file: DataFile =
        serde_json::from_str(&text).with_context(|| format!("parsing data file {}", path.display()))?;
    file.into_orn_data()
        .with_context(|| format!("invalid data in {}", path.display()))
}

/// KC results written after a run
#[derive(Debug, Serialize)]
struct RunSummary {
    seed: u64,
    shape: RunShape,
    tuning: Option<TuningReport>,
    tuning_iters: usize,
    /// Fraction of (KC, odor) pairs that responded
    sparsity: f64,
    thresholds: Vec<f64>,
    /// Per odor: 1 for each KC that spiked at least once
    responses: Vec<Vec<u8>>,
    /// Per odor: spike count of each KC
    spike_counts: Vec<Vec<u32>>,
}

impl RunSummary {
    fn new(rv: &RunVars, tuning: Option<TuningReport>) -> Self {
        let kc = &rv.kc;
        Self {
            seed: rv.seed(),
            shape: rv.shape(),
            tuning,
            tuning_iters: kc.tuning_iters,
            sparsity: kc.response_rate(),
            thresholds: kc.circuit.thr.iter().copied().collect(),
            responses: kc
                .responses
                .column_iter()
                .map(|c| c.iter().map(|r| u8::from(*r > 0.0)).collect())
                .collect(),
            spike_counts: kc
                .spike_counts
                .column_iter()
                .map(|c| c.iter().map(|n| *n as u32).collect())
                .collect(),
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn run(
    params: &ParamArgs,
    data: &Path,
    seed: Option<u64>,
    threads: Option<usize>,
    run_log: Option<&Path>,
    trim: bool,
    out: Option<&Path>,
) -> anyhow::Result<()> {
    let mut p = params.load()?;
    p.orn.data = Some(load_data(data)?);
    if seed.is_some() {
        p.seed = seed;
    }

    if let Some(n) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("configuring worker threads")?;
    }
    info!(
        threads = rayon::current_num_threads(),
        gloms = p.n_gloms(),
        odors = p.n_odors(),
        kcs = p.kc.n,
        "starting run"
    );

    let mut rv = RunVars::new(&p)?;
    if let Some(path) = run_log {
        // A broken run log is reported but never stops the simulation
        if let Err(e) = rv.log.redirect(path) {
            warn!(path = %path.display(), error = %e, "continuing without run log");
        }
    }

    let tuning = run_all(&p, &mut rv)?;
    if let Some(report) = &tuning {
        if !report.converged && report.sparsity.is_some() {
            warn!(iterations = report.iterations, "sparsity did not reach tolerance");
        }
    }
    if trim {
        remove_all_pretime(&p, &mut rv)?;
    }

    let summary = RunSummary::new(&rv, tuning);
    let json = serde_json::to_string_pretty(&summary)?;
    match out {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("writing results to {}", path.display()))?;
            info!(path = %path.display(), "results written");
        }
        None => println!("{json}"),
    }

    info!(seed = rv.seed(), sparsity = summary.sparsity, "run complete");
    Ok(())
}

fn print_params(params: &ParamArgs) -> anyhow::Result<()> {
    let p = params.load()?;
    for name in PARAM_NAMES {
        println!("{name}={}", p.get_param(name)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Olfsim v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Run {
            params,
            data,
            seed,
            threads,
            run_log,
            trim,
            out,
        } => run(
            &params,
            &data,
            seed,
            threads,
            run_log.as_deref(),
            trim,
            out.as_deref(),
        ),
        Commands::Params { params } => print_params(&params),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_file_conversion() {
        let file: DataFile =
            serde_json::from_str(r#"{ "spont": [1.0, 2.0], "delta": [[10.0, 0.0, 5.0], [0.0, 20.0, 5.0]] }"#).unwrap();
        let data = file.into_orn_data().unwrap();
        assert_eq!(data.n_gloms(), 2);
        assert_eq!(data.n_odors(), 3);
        assert_eq!(data.delta()[(1, 1)], 20.0);
    }

    #[test]
    fn test_ragged_delta_rejected() {
        let file: DataFile =
            serde_json::from_str(r#"{ "spont": [1.0, 2.0], "delta": [[10.0, 0.0], [0.0]] }"#).unwrap();
        assert!(file.into_orn_data().is_err());
    }

    #[test]
    fn test_param_overrides_applied_in_order() {
        let args = ParamArgs {
            params: None,
            set: vec!["kc.N=100".into(), "kc.N=200".into(), "pn.noise.sd=0.5".into()],
        };
        let p = args.load().unwrap();
        assert_eq!(p.kc.n, 200);
        assert!((p.pn.noise.sd - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from([
            "olfsim", "run", "--data", "d.json", "--set", "kc.N=10", "--threads", "2", "--trim",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { params, threads, trim, .. } => {
                assert_eq!(params.set, vec!["kc.N=10".to_string()]);
                assert_eq!(threads, Some(2));
                assert!(trim);
            }
            Commands::Params { .. } => panic!("expected run"),
        }
    }
}
