//! TaskWeave CLI Entry Point
//!
//! Runs a YAML workflow file with the built-in tools.
//!
//! # Usage
//!
//! ```bash
//! # Execute a workflow
//! taskweave workflow.yaml
//!
//! # Print the execution order only
//! taskweave workflow.yaml --dry-run
//!
//! # Run up to 8 tasks at once and show a Gantt chart
//! taskweave workflow.yaml --parallel 8 --timeline
//!
//! # Record task results across runs
//! taskweave workflow.yaml --memory results.json
//! ```

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use log::{error, info};

use taskweave::execution::{AgentExecutor, OrchestratorConfig, TaskExecutor};
use taskweave::tools::DEFAULT_REGISTRY;
use taskweave::workflow::{load_workflow, DependencyGraph};
use taskweave::{MemoryStore, Orchestrator, APP_NAME, VERSION};

/// Default workflow file used when none is specified.
const DEFAULT_WORKFLOW: &str = "workflow.yaml";

/// Name of the agent used with `--memory`.
const AGENT_NAME: &str = "cli-agent";

/// Command-line configuration parsed from arguments.
#[derive(Debug, Default)]
struct Config {
    workflow_path: Option<String>,
    sequential: bool,
    max_parallel: Option<usize>,
    timeout_ms: Option<u64>,
    retries: Option<u32>,
    memory_path: Option<PathBuf>,
    dry_run: bool,
    timeline: bool,
    verbose: bool,
}

impl Config {
    /// Applies command-line overrides to the settings from the workflow file.
    fn apply(&self, mut settings: OrchestratorConfig) -> OrchestratorConfig {
        if let Some(n) = self.max_parallel {
            settings = settings.parallel(n);
        }
        if self.sequential {
            settings = settings.sequential();
        }
        if let Some(ms) = self.timeout_ms {
            settings = settings.with_timeout(Some(Duration::from_millis(ms)));
        }
        if let Some(n) = self.retries {
            let backoff = settings.retry_backoff();
            settings = settings.with_retries(n, backoff);
        }
        settings
    }
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
    println!("{} v{}", APP_NAME.bold(), VERSION);
    println!("Dependency-Aware Task Orchestration");
    println!();
}

/// Prints usage information.
fn print_usage() {
    println!("Usage: taskweave [OPTIONS] <WORKFLOW_FILE>");
    println!();
    println!("Arguments:");
    println!("  <WORKFLOW_FILE>     Path to workflow YAML file (default: {})", DEFAULT_WORKFLOW);
    println!();
    println!("Options:");
    println!("  --sequential        Run one task at a time");
    println!("  --parallel N        Run up to N tasks at once");
    println!("  --timeout MS        Per-task timeout in milliseconds (0 disables)");
    println!("  --retries N         Retry failed tasks up to N times");
    println!("  --memory PATH       Record task results in a JSON memory file");
    println!("  --dry-run           Print the execution order without running");
    println!("  --timeline          Print a Gantt chart of the run");
    println!("  --verbose           Enable debug logging");
    println!("  --help              Show this help message");
    println!("  --version           Show version information");
    println!();
    println!("Tools:");
    for tool in DEFAULT_REGISTRY.list() {
        println!("  {:19} {}", tool.name, tool.description);
    }
}

/// Returns the value following an option.
fn option_value<'a>(args: &'a [String], i: &mut usize, option: &str) -> Result<&'a str, String> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires a value", option))
}

fn parse_number<T: std::str::FromStr>(value: &str, option: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("Invalid {} value: {}", option, value))
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut config = Config::default();
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
            "--sequential" => config.sequential = true,
            "--dry-run" => config.dry_run = true,
            "--timeline" => config.timeline = true,
            "--verbose" | "-v" => config.verbose = true,
            "--parallel" => {
                let value = option_value(args, &mut i, "--parallel")?;
                config.max_parallel = Some(parse_number(value, "--parallel")?);
            }
            "--timeout" => {
                let value = option_value(args, &mut i, "--timeout")?;
                config.timeout_ms = Some(parse_number(value, "--timeout")?);
            }
            "--retries" => {
                let value = option_value(args, &mut i, "--retries")?;
                config.retries = Some(parse_number(value, "--retries")?);
            }
            "--memory" => {
                let value = option_value(args, &mut i, "--memory")?;
                config.memory_path = Some(PathBuf::from(value));
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            _ => {
                if config.workflow_path.is_some() {
                    return Err(format!("Unexpected argument: {}", arg));
                }
                config.workflow_path = Some(arg.clone());
            }
        }
        i += 1;
    }

    if config.sequential && config.max_parallel.is_some() {
        return Err("--sequential and --parallel cannot be combined".to_string());
    }

    Ok(config)
}

/// Main application entry point.
fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);
    print_banner();

    let workflow_path = config
        .workflow_path
        .clone()
        .unwrap_or_else(|| DEFAULT_WORKFLOW.to_string());

    let loaded = load_workflow(&workflow_path, &DEFAULT_REGISTRY).map_err(|e| {
        error!("Failed to load workflow: {}", e);
        format!("Could not load workflow from '{}': {}", workflow_path, e)
    })?;
    let workflow = loaded.workflow;
    let settings = config.apply(loaded.config);

    info!(
        "Workflow '{}' loaded: {} tasks ({:?} mode)",
        workflow.name,
        workflow.len(),
        settings.mode
    );

    if config.dry_run {
        let graph = DependencyGraph::build(&workflow)?;
        println!("{}", "Execution order:".bold());
        for (position, id) in graph.order_ids().into_iter().enumerate() {
            let deps = workflow.dependencies_of(id).unwrap_or(&[]);
            if deps.is_empty() {
                println!("  {:>3}. {}", position + 1, id);
            } else {
                println!("  {:>3}. {} (after {})", position + 1, id, deps.join(", "));
            }
        }
        return Ok(true);
    }

    let memory = match &config.memory_path {
        Some(path) => Some(Arc::new(MemoryStore::load_or_new(path)?)),
        None => None,
    };
    let executor: Option<Arc<dyn TaskExecutor>> = memory.as_ref().map(|memory| {
        let agent = AgentExecutor::new(AGENT_NAME).with_memory(Arc::clone(memory));
        Arc::new(agent) as Arc<dyn TaskExecutor>
    });

    let orchestrator = Orchestrator::new(settings);
    let outcome = orchestrator.execute_with_input(&workflow, loaded.input, executor);

    if let (Some(memory), Some(path)) = (&memory, &config.memory_path) {
        memory.save(path)?;
    }

    let succeeded = match outcome {
        Ok(result) => {
            println!();
            println!("{} in {} ms", "Workflow completed".green().bold(), result.duration);
            println!("{}", serde_json::to_string_pretty(&result)?);

            if config.timeline {
                println!("{}", result.timeline.gantt_chart());
            }
            true
        }
        Err(failure) => {
            eprintln!();
            eprintln!("{} {}", "Workflow failed:".red().bold(), failure);
            false
        }
    };

    println!();
    println!("{}", "Metrics:".bold());
    println!("{}", serde_json::to_string_pretty(&orchestrator.metrics())?);

    Ok(succeeded)
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!();
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskweave::execution::ExecutionMode;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("taskweave")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_parse_defaults() {
        let config = parse_arguments(&args(&[])).unwrap();
        assert!(config.workflow_path.is_none());
        assert!(!config.dry_run);
        assert!(config.memory_path.is_none());
    }

    #[test]
    fn test_parse_options() {
        let config = parse_arguments(&args(&[
            "flow.yaml",
            "--parallel",
            "3",
            "--timeout",
            "0",
            "--retries",
            "2",
            "--memory",
            "mem.json",
            "--timeline",
        ]))
        .unwrap();

        assert_eq!(config.workflow_path.as_deref(), Some("flow.yaml"));
        assert_eq!(config.max_parallel, Some(3));
        assert_eq!(config.timeout_ms, Some(0));
        assert_eq!(config.retries, Some(2));
        assert_eq!(config.memory_path, Some(PathBuf::from("mem.json")));
        assert!(config.timeline);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_arguments(&args(&["--parallel"])).is_err());
        assert!(parse_arguments(&args(&["--parallel", "many"])).is_err());
        assert!(parse_arguments(&args(&["--bogus"])).is_err());
        assert!(parse_arguments(&args(&["a.yaml", "b.yaml"])).is_err());
        assert!(parse_arguments(&args(&["--sequential", "--parallel", "2"])).is_err());
    }

    #[test]
    fn test_overrides_applied() {
        let config =
            parse_arguments(&args(&["--parallel", "2", "--timeout", "0", "--retries", "4"]))
                .unwrap();
        let settings = config.apply(OrchestratorConfig::default());

        assert_eq!(settings.mode, ExecutionMode::Parallel);
        assert_eq!(settings.max_parallel, 2);
        assert_eq!(settings.timeout(), None);
        assert_eq!(settings.max_retries, 4);

        let file_settings = OrchestratorConfig::default().parallel(6);
        let config = parse_arguments(&args(&["--sequential"])).unwrap();
        assert_eq!(config.apply(file_settings).mode, ExecutionMode::Sequential);
    }
}
