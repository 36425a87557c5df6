//! Spectra CLI
//!
//! Eigen decomposition of an adjacency matrix, PCA projection of its
//! eigenvectors and an optional complex fit.
//!
//! Writes `vectors.dat`, `vectors.png` and (with `--neural`) `cost.png` into
//! the output directory, then prints a report, or a JSON summary with
//! `--json`. Errors go to stderr, as JSON under `--json`.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use spectra::{write_report, Analysis, RunConfig, Spectra};
use spectra_core::SpectraError;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spectra")]
#[command(author, version, about = "Spectral geometry of adjacency matrices")]
struct Cli {
    /// Fit a complex linear map to the spectral data
    #[arg(long)]
    neural: bool,

    /// Seed for the weight initialisation
    #[arg(long)]
    seed: Option<u64>,

    /// Gradient descent iterations
    #[arg(long)]
    iterations: Option<usize>,

    /// Gradient descent step size
    #[arg(long)]
    learning_rate: Option<f64>,

    /// Principal components kept by the projection
    #[arg(short = 'k', long)]
    components: Option<usize>,

    /// Directory receiving the plots and vectors.dat
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// JSON config file, applied before the environment and these flags
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print a JSON summary instead of the text report
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Defaults, then the config file, then the environment, then flags
    fn resolve(&self) -> Result<RunConfig, SpectraError> {
        let base = match &self.config {
            Some(path) => RunConfig::load(path)?,
            None => RunConfig::default(),
        };
        Ok(self.apply(base.with_env()))
    }

    fn apply(&self, mut config: RunConfig) -> RunConfig {
        if self.neural {
            config.neural = true;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(components) = self.components {
            config.components = components;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn render_summary(analysis: &Analysis) -> Result<String, SpectraError> {
    serde_json::to_string_pretty(&analysis.summary()).map_err(SpectraError::serialization)
}

fn run(cli: &Cli) -> Result<(), SpectraError> {
    let config = cli.resolve()?;
    tracing::info!(?config, "resolved configuration");

    let (analysis, written) = Spectra::new(config).run()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if cli.json {
        let summary = render_summary(&analysis)?;
        writeln!(out, "{}", summary)?;
    } else {
        write_report(&mut out, &analysis)?;
        for path in &written {
            writeln!(out, "wrote {}", path.display())?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if cli.json => {
            match serde_json::to_string(&e) {
                Ok(report) => eprintln!("{}", report),
                Err(_) => eprintln!("error [{}]: {}", e.code(), e),
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error [{}]: {}", e.code(), e);
            if let Some(hint) = e.suggestion() {
                eprintln!("  hint: {}", hint);
            }
            ExitCode::FAILURE
        }
    }
}
