use access_bench::{
    render, select_device_or_exit, AccessMatrix, BenchConfig, CaseDriver, DeviceCategory, OutputFormat, TimeUnit,
    TimingMode,
};
use access_tracing::{init_global_tracing, TracingConfig};
use clap::Parser;
use std::process::ExitCode;

/// Host/accelerator buffer access benchmark.
///
/// Selects the first dedicated or integrated GPU that can run offloaded
/// work, then times the identity kernel over {subrange, full} x
/// {device-resident, host-round-trip} across a geometric size sweep.
/// Flags override the ACCESS_BENCH_* environment.
#[derive(Parser, Debug)]
#[command(name = "buffer-access", version)]
struct Cli {
    /// Device category to benchmark (dedicated or integrated)
    category: DeviceCategory,

    /// Smallest accessed extent, in elements
    #[arg(long)]
    min: Option<usize>,

    /// Largest accessed extent, in elements
    #[arg(long)]
    max: Option<usize>,

    /// Geometric step between sizes
    #[arg(long)]
    multiplier: Option<usize>,

    /// Timed repetitions per size
    #[arg(long)]
    repetitions: Option<usize>,

    /// Clock driving the measurement (wall or process)
    #[arg(long)]
    timing: Option<TimingMode>,

    /// Unit for reported times (ns, us, ms or s)
    #[arg(long)]
    unit: Option<TimeUnit>,

    /// Skip the asymptotic complexity fit
    #[arg(long)]
    no_complexity: bool,

    /// Backing store length for subrange cases
    #[arg(long)]
    store: Option<usize>,

    /// Work-group size for the identity kernel
    #[arg(long)]
    group: Option<usize>,

    /// Report format (text or json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,
}

impl Cli {
    fn apply(&self, config: &mut BenchConfig) {
        if let Some(v) = self.min {
            config.min_elements = v;
        }
        if let Some(v) = self.max {
            config.max_elements = v;
            if self.store.is_none() {
                config.subrange_store_elements = config.subrange_store_elements.max(v);
            }
        }
        if let Some(v) = self.multiplier {
            config.multiplier = v;
        }
        if let Some(v) = self.repetitions {
            config.repetitions = v;
        }
        if let Some(v) = self.timing {
            config.timing_mode = v;
        }
        if let Some(v) = self.unit {
            config.unit = v;
        }
        if self.no_complexity {
            config.complexity = false;
        }
        if let Some(v) = self.store {
            config.subrange_store_elements = v;
        }
        if let Some(v) = self.group {
            config.group_size = v;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_global_tracing(&TracingConfig::from_env()) {
        eprintln!("warning: tracing disabled: {err}");
    }

    let mut config = match BenchConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(2);
        }
    };
    cli.apply(&mut config);
    if let Err(err) = config.validate() {
        eprintln!("error: {err}");
        return ExitCode::from(2);
    }
    tracing::debug!(?config, "configuration");

    let device = select_device_or_exit(cli.category);
    let matrix = AccessMatrix::for_category(cli.category, &config);
    let driver = CaseDriver::new(device, config);
    let reports = driver.run_matrix(&matrix);

    match render(&reports, driver.config().unit, cli.format) {
        Ok(out) => print!("{out}"),
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    }

    if reports.iter().any(|report| report.has_failures()) {
        ExitCode::from(3)
    } else {
        ExitCode::SUCCESS
    }
}
