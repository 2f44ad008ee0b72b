//! CLI entry point for the `simcpu` simulator runner.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use serde as _;
use serde_json as _;
use sim_cli::report::{CoreReport, RunReport, TaskReport};
use sim_cli::source::{check_source, load_program, read, ProgramSpec};
use sim_cli::{logging, source::SourceError};
use sim_core::CoreConfig;
use sim_scheduler::{Scheduler, SchedulerConfig, TaskId};
#[cfg(test)]
use tempfile as _;
use thiserror as _;
use tracing_subscriber as _;

const USAGE_TEXT: &str = "\
Usage: simcpu <command> [options]

Commands:
  run [options] <file[@priority]>...  Run programs on the simulated cores
  check <file>                        Decode a program and report errors

Options (run):
  --cores <n>          Number of cores (default: 2)
  --memory <n>         Memory cells per core (default: 256)
  --budget <n|none>    Instruction budget per task (default: 1000000)
  --interval-ms <n>    Scheduler tick interval (default: 100)
  --json               Print the report as JSON
  -h, --help           Show this help message

Program files hold one instruction per line; `;` and `#` start comments.
Priorities default to 1; higher runs first.

Examples:
  simcpu run add.asm@2 loop.asm
  simcpu run --cores 4 --budget none --json *.asm
  simcpu check add.asm

Set RUST_LOG=debug to trace scheduling.
";

const IDLE_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Run(RunArgs),
    Check(CheckArgs),
}

#[derive(Debug, PartialEq, Eq)]
struct RunArgs {
    programs: Vec<ProgramSpec>,
    config: SchedulerConfig,
    json: bool,
}

#[derive(Debug, PartialEq, Eq)]
struct CheckArgs {
    input: PathBuf,
}

#[derive(Debug)]
enum ParseResult {
    Command(Command),
    Help,
}

fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let first = args.next().ok_or_else(|| "missing command".to_string())?;

    if first == "--help" || first == "-h" {
        return Ok(ParseResult::Help);
    }

    let command_str = first.to_string_lossy().to_string();

    match command_str.as_str() {
        "run" => parse_run_args(args)
            .map(Command::Run)
            .map(ParseResult::Command),
        "check" => parse_check_args(args)
            .map(Command::Check)
            .map(ParseResult::Command),
        other => Err(format!("unknown command: {other}")),
    }
}

fn option_value<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = OsString>,
    name: &str,
) -> Result<T, String> {
    let value = args
        .next()
        .ok_or_else(|| format!("missing value for {name}"))?;
    let value = value.to_string_lossy();
    value
        .parse()
        .map_err(|_| format!("invalid value for {name}: {value}"))
}

#[allow(clippy::while_let_on_iterator)]
fn parse_run_args(mut args: impl Iterator<Item = OsString>) -> Result<RunArgs, String> {
    let mut programs = Vec::new();
    let mut config = SchedulerConfig::default();
    let mut json = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg == "--json" {
            json = true;
            continue;
        }

        if arg == "--cores" {
            config.cores = option_value(&mut args, "--cores")?;
            if config.cores == 0 {
                return Err("--cores must be at least 1".to_string());
            }
            continue;
        }

        if arg == "--memory" {
            config.core.memory_cells = option_value(&mut args, "--memory")?;
            continue;
        }

        if arg == "--budget" {
            let value: String = option_value(&mut args, "--budget")?;
            config.core.step_budget = if value == "none" {
                None
            } else {
                Some(
                    value
                        .parse()
                        .map_err(|_| format!("invalid value for --budget: {value}"))?,
                )
            };
            continue;
        }

        if arg == "--interval-ms" {
            config.tick_interval = Duration::from_millis(option_value(&mut args, "--interval-ms")?);
            continue;
        }

        let arg = arg.to_string_lossy();
        if arg.starts_with('-') {
            return Err(format!("unknown option: {arg}"));
        }

        programs.push(ProgramSpec::parse(&arg).map_err(|e| e.to_string())?);
    }

    if programs.is_empty() {
        return Err("missing program files".to_string());
    }
    Ok(RunArgs {
        programs,
        config,
        json,
    })
}

fn parse_check_args(args: impl Iterator<Item = OsString>) -> Result<CheckArgs, String> {
    let mut input: Option<PathBuf> = None;

    for arg in args {
        if arg == "--help" || arg == "-h" {
            return Err(USAGE_TEXT.to_string());
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(CheckArgs { input })
}

fn report_source_error(e: &SourceError) {
    eprintln!("error: {e}");
}

fn run_programs(args: RunArgs) -> Result<(), i32> {
    let mut failed = false;
    let mut scheduler = match Scheduler::new(args.config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("error: {e}");
            return Err(1);
        }
    };

    let mut submitted: Vec<(TaskId, PathBuf)> = Vec::new();
    for spec in args.programs {
        let program = match load_program(&spec.path) {
            Ok(program) => program,
            Err(e) => {
                report_source_error(&e);
                failed = true;
                continue;
            }
        };
        match scheduler.submit_task(program, spec.priority) {
            Ok(id) => submitted.push((id, spec.path)),
            Err(e) => {
                eprintln!("{}: error: {e}", spec.path.display());
                failed = true;
            }
        }
    }

    if let Err(e) = scheduler.start() {
        eprintln!("error: {e}");
        return Err(1);
    }
    while !scheduler.wait_idle(IDLE_POLL) {
        tracing::debug!("waiting for tasks to drain");
    }
    if let Err(e) = scheduler.stop() {
        eprintln!("error: {e}");
        failed = true;
    }

    let report = RunReport {
        tasks: submitted
            .iter()
            .filter_map(|(id, path)| scheduler.task(*id).map(|record| TaskReport::new(path, &record)))
            .collect(),
        cores: scheduler
            .cores()
            .iter()
            .enumerate()
            .map(|(index, core)| CoreReport::new(index, core))
            .collect(),
    };

    if args.json {
        match report.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to serialize report: {e}");
                return Err(1);
            }
        }
    } else {
        print!("{report}");
    }

    if failed || report.has_failures() {
        Err(1)
    } else {
        Ok(())
    }
}

fn run_check(args: &CheckArgs) -> Result<(), i32> {
    let source = match read(&args.input) {
        Ok(source) => source,
        Err(e) => {
            report_source_error(&e);
            return Err(1);
        }
    };

    let diagnostics = check_source(&source);
    for diagnostic in &diagnostics {
        eprintln!(
            "{}:{}: error: {} ({})",
            args.input.display(),
            diagnostic.line,
            diagnostic.reason,
            diagnostic.reason.code()
        );
    }

    if diagnostics.is_empty() {
        let instructions = sim_core::extract_source_lines(&source).len();
        let capacity = CoreConfig::default().memory_cells;
        println!(
            "{}: ok ({instructions} instructions, {capacity} cells)",
            args.input.display()
        );
        Ok(())
    } else {
        Err(1)
    }
}

fn main() {
    logging::init();

    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParseResult::Command(Command::Run(args))) => match run_programs(args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Ok(ParseResult::Command(Command::Check(args))) => match run_check(&args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            if error.starts_with("Usage:") {
                println!("{error}");
            } else {
                eprintln!("error: {error}");
                eprintln!("{USAGE_TEXT}");
            }
            1
        }
    };

    std::process::exit(exit_code);
}
