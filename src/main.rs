//! fmusim CLI Entry Point
//!
//! Provides command-line interface for model inspection and simulation runs.
//!
//! # Usage
//!
//! ```bash
//! # List the variables and default experiment of a model
//! fmusim inspect bouncingBall.fmu
//!
//! # Run a simulation with overrides
//! fmusim run bouncingBall.fmu --stop-time 1.0 --step-size 0.1 --set g=9.81
//!
//! # Tighten the execution budget and choose the export file
//! fmusim run plant.fmu --budget 30 --output plant.csv
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use log::{error, info};

use fmusim::execution::{ExecutionOutcome, ExecutionRequest, RunnerPool, Supervisor};
use fmusim::model::{inspect, ScalarValue};
use fmusim::{APP_NAME, VERSION};

/// Default simulation stop time in seconds.
const DEFAULT_STOP_TIME: f64 = 1.0;

/// Default communication step size in seconds.
const DEFAULT_STEP_SIZE: f64 = 0.1;

/// Default execution budget in seconds.
const DEFAULT_BUDGET_SECS: f64 = 10.0;

/// Default export file for the result table.
const DEFAULT_OUTPUT: &str = "simulation_result.csv";

/// Subcommand selected on the command line.
#[derive(Debug)]
enum Command {
    Inspect { model: PathBuf },
    Run(RunConfig),
}

/// Configuration for the `run` subcommand.
#[derive(Debug)]
struct RunConfig {
    model: PathBuf,
    stop_time: f64,
    step_size: f64,
    overrides: Vec<(String, ScalarValue)>,
    budget: Duration,
    pool_size: Option<usize>,
    output: PathBuf,
}

/// Configures the logging system with appropriate formatting.
fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format(|buf, record| {
            use std::io::Write;

            match record.level() {
                log::Level::Warn | log::Level::Error => {
                    writeln!(buf, "[{}] {}", record.level(), record.args())
                }
                _ => writeln!(buf, "{}", record.args()),
            }
        })
        .init();
}

/// Prints the application banner with version information.
fn print_banner() {
    println!();
    println!("{} v{}", APP_NAME, VERSION);
    println!("Bounded FMU Simulation Harness");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: fmusim <COMMAND> <MODEL_FILE> [OPTIONS]");
    println!();
    println!("Commands:");
    println!("  inspect <MODEL_FILE>   List model variables and default experiment");
    println!("  run <MODEL_FILE>       Run a simulation and export the result table");
    println!();
    println!("Run options:");
    println!("  --stop-time T       Simulation stop time in seconds (default: {})", DEFAULT_STOP_TIME);
    println!("  --step-size H       Communication step size in seconds (default: {})", DEFAULT_STEP_SIZE);
    println!("  --set NAME=VALUE    Override a start value (repeatable)");
    println!("  --budget SECS       Wall-clock budget per run (default: {})", DEFAULT_BUDGET_SECS);
    println!("  --pool N            Worker pool size (default: logical CPUs)");
    println!("  --output FILE       CSV export path (default: {})", DEFAULT_OUTPUT);
    println!();
    println!("Options:");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Examples:");
    println!("  fmusim inspect bouncingBall.fmu");
    println!("  fmusim run bouncingBall.fmu --set g=9.81 --set e=0.7");
    println!("  fmusim run plant.fmu --stop-time 60 --step-size 0.5 --budget 30");
}

/// Parses a `name=value` override into a typed scalar.
///
/// Values are interpreted as bool, integer, then real, in that order;
/// anything else stays a string.
fn parse_override(arg: &str) -> Result<(String, ScalarValue), String> {
    let (name, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("Invalid override '{}': expected NAME=VALUE", arg))?;

    if name.is_empty() {
        return Err(format!("Invalid override '{}': empty variable name", arg));
    }

    let value = match raw {
        "true" => ScalarValue::Boolean(true),
        "false" => ScalarValue::Boolean(false),
        _ => {
            if let Ok(i) = raw.parse::<i64>() {
                ScalarValue::Integer(i)
            } else if let Ok(r) = raw.parse::<f64>() {
                ScalarValue::Real(r)
            } else {
                ScalarValue::Text(raw.to_string())
            }
        }
    };

    Ok((name.to_string(), value))
}

/// Parses command-line arguments into a command plus the verbose flag.
fn parse_arguments(args: &[String]) -> Result<(Command, bool), String> {
    let mut verbose = false;
    let mut positionals: Vec<String> = Vec::new();

    let mut stop_time = DEFAULT_STOP_TIME;
    let mut step_size = DEFAULT_STEP_SIZE;
    let mut budget_secs = DEFAULT_BUDGET_SECS;
    let mut pool_size = None;
    let mut output = PathBuf::from(DEFAULT_OUTPUT);
    let mut overrides = Vec::new();

    let mut i = 1; // Skip program name
    while i < args.len() {
        let arg = &args[i];

        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{} {}", APP_NAME, VERSION);
                std::process::exit(0);
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            "--stop-time" => {
                i += 1;
                stop_time = parse_value_arg(args, i, "--stop-time")?;
            }
            "--step-size" => {
                i += 1;
                step_size = parse_value_arg(args, i, "--step-size")?;
            }
            "--budget" => {
                i += 1;
                budget_secs = parse_value_arg(args, i, "--budget")?;
            }
            "--pool" => {
                i += 1;
                let n: usize = parse_value_arg(args, i, "--pool")?;
                pool_size = Some(n);
            }
            "--output" => {
                i += 1;
                if i >= args.len() {
                    return Err("--output requires a path argument".to_string());
                }
                output = PathBuf::from(&args[i]);
            }
            "--set" => {
                i += 1;
                if i >= args.len() {
                    return Err("--set requires a NAME=VALUE argument".to_string());
                }
                overrides.push(parse_override(&args[i])?);
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => positionals.push(arg.clone()),
        }
        i += 1;
    }

    if positionals.len() != 2 {
        return Err("Expected a command and a model file".to_string());
    }

    let model = PathBuf::from(&positionals[1]);

    match positionals[0].as_str() {
        "inspect" => Ok((Command::Inspect { model }, verbose)),
        "run" => {
            if !budget_secs.is_finite() || budget_secs <= 0.0 {
                return Err(format!("Invalid budget: {}", budget_secs));
            }
            Ok((
                Command::Run(RunConfig {
                    model,
                    stop_time,
                    step_size,
                    overrides,
                    budget: Duration::from_secs_f64(budget_secs),
                    pool_size,
                    output,
                }),
                verbose,
            ))
        }
        other => Err(format!("Unknown command: {}", other)),
    }
}

/// Parses the value following a flag.
fn parse_value_arg<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
    let raw = args
        .get(i)
        .ok_or_else(|| format!("{} requires a value argument", flag))?;
    raw.parse()
        .map_err(|_| format!("Invalid value for {}: {}", flag, raw))
}

/// Prints model metadata for the `inspect` subcommand.
fn run_inspect(model: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let description = inspect(model)?;

    println!(
        "Model: {}",
        description.model_name.as_deref().unwrap_or("(unnamed)")
    );
    if let Some(version) = &description.fmi_version {
        println!("FMI version: {}", version);
    }

    if let Some(exp) = &description.default_experiment {
        println!(
            "Default experiment: start {}, stop {}, step {}",
            format_optional(exp.start_time),
            format_optional(exp.stop_time),
            format_optional(exp.step_size)
        );
    }

    println!();
    println!("{:<28} {:<12} {:<8} {}", "NAME", "CAUSALITY", "TYPE", "START");
    for var in &description.variables {
        let start = var
            .start
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} {:<12} {:<8} {}",
            var.name, var.causality, var.var_type, start
        );
    }

    println!();
    println!(
        "{} variables, {} settable",
        description.variables.len(),
        description.settable_variables().len()
    );

    Ok(())
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Executes the `run` subcommand.
fn run_simulation(config: RunConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pool = match config.pool_size {
        Some(n) => RunnerPool::with_capacity(n),
        None => RunnerPool::new(),
    };

    let mut supervisor = Supervisor::new(pool);
    supervisor.set_budget(config.budget);

    let mut request = ExecutionRequest::new(&config.model, config.stop_time, config.step_size);
    for (name, value) in config.overrides {
        request = request.with_override(name, value);
    }

    info!(
        "Running {} (stop {}, step {}, budget {:?})",
        config.model.display(),
        config.stop_time,
        config.step_size,
        config.budget
    );

    match supervisor.run(request) {
        ExecutionOutcome::Success(table) => {
            table.write_csv(&config.output)?;

            let times: Vec<f64> = table.time().iter().filter_map(|v| v.as_f64()).collect();
            println!();
            println!("Simulation completed");
            println!("  Samples: {}", table.len());
            println!("  Columns: {}", table.columns().join(", "));
            if let (Some(first), Some(last)) = (times.first(), times.last()) {
                println!("  Time range: {} .. {}", first, last);
            }
            println!("  Exported: {}", config.output.display());
            Ok(())
        }
        ExecutionOutcome::Timeout => {
            error!("Simulation took too long to run. Please try again.");
            Err("simulation timed out".into())
        }
        ExecutionOutcome::Failure(detail) => {
            error!("Error running simulation: {}", detail);
            Err("simulation failed".into())
        }
    }
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    let (command, verbose) = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(verbose);
    print_banner();

    match command {
        Command::Inspect { model } => run_inspect(&model),
        Command::Run(config) => run_simulation(config),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
