use tether_core::config::DriverConfig;
use tether_core::entry::EntryPoint;
use tether_core::error::DriverError;
use tether_core::harness::Harness;

use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    #[clap(long, default_value = "info")]
    log_level: String,
    /// Input file for standalone runs; stdin when omitted.
    input: Option<PathBuf>,
}

/// Demo target: a tiny record parser with two planted bugs.
#[derive(Default)]
struct DemoTarget {
    executions: u64,
}

impl Harness for DemoTarget {
    fn test_one_input(&mut self, data: &[u8]) -> Result<i32, DriverError> {
        self.executions += 1;
        if data.starts_with(b"BAD") {
            panic!("BAD input detected by harness!");
        }
        if data.starts_with(b"CRAS") {
            panic!("CRASH input detected by harness!");
        }
        let fields = data.split(|b| *b == b'\n').filter(|l| l.contains(&b'=')).count();
        tracing::trace!(execution = self.executions, len = data.len(), fields, "input processed");
        Ok(0)
    }
}

fn init_logging(level: &str) {
    let filter = format!("tether={level},tether_core={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .init();
}

fn load_config(cli: &Cli) -> Result<DriverConfig, anyhow::Error> {
    match &cli.config_file {
        Some(path) => {
            tracing::info!("Loading configuration from {:?}", path);
            DriverConfig::load_from_file(path)
        }
        None => Ok(DriverConfig::default()),
    }
}

fn main() -> Result<ExitCode, anyhow::Error> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config = load_config(&cli)?;
    tracing::debug!("Effective configuration: {config:?}");

    // The driver takes the trailing argument as the standalone input file, so
    // hand it only the program name and the positional input. Flags are
    // consumed by clap above; `Harness::initialize` never sees them.
    let mut args: Vec<String> = std::env::args().take(1).collect();
    if let Some(input) = &cli.input {
        args.push(input.display().to_string());
    }

    let mut target = DemoTarget::default();
    Ok(EntryPoint::new(config).run(&mut target, args))
}
