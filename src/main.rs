//! opsflow CLI Entry Point
//!
//! Provides the command-line interface for resolving and executing
//! workflows.
//!
//! # Usage
//!
//! ```bash
//! # Execute a workflow
//! opsflow run deploy-operator
//!
//! # Override variables at invocation time
//! opsflow run deploy-operator --var REGISTRY_TAG=v2 --var NAMESPACE=staging
//!
//! # Preview the resolved plan without executing
//! opsflow run deploy-operator --dry-run
//!
//! # Inspect the final merged variables
//! opsflow variables deploy-operator
//!
//! # List available workflows
//! opsflow list
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use colored::Colorize;
use log::{error, info};

use opsflow::execution::{StepOutcome, WorkflowEngine};
use opsflow::workflow::VariableMap;
use opsflow::{APP_NAME, VERSION};

/// Subcommand selected on the command line.
#[derive(Debug, PartialEq)]
enum Action {
    Run(String),
    Variables(String),
    List,
}

/// Command-line configuration parsed from arguments.
#[derive(Debug)]
struct Config {
    action: Action,
    project_root: PathBuf,
    overrides: VariableMap,
    dry_run: bool,
    report_path: Option<PathBuf>,
    verbose: bool,
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

/// Prints usage information.
fn print_usage() {
    println!("Usage: opsflow [OPTIONS] <COMMAND>");
    println!();
    println!("Commands:");
    println!("  run <WORKFLOW>        Resolve and execute a workflow");
    println!("  variables <WORKFLOW>  Show the final merged variables for a workflow");
    println!("  list                  List available workflows");
    println!();
    println!("Options:");
    println!("  --var KEY=VALUE       Runtime variable override (repeatable)");
    println!("  --dry-run             Resolve the plan but execute nothing");
    println!("  --report PATH         Write the execution report as JSON");
    println!("  --project-root PATH   Project root (default: current directory)");
    println!("  --verbose             Enable debug logging");
    println!("  --help                Show this help message");
    println!("  --version             Show version information");
    println!();
    println!("Examples:");
    println!("  opsflow run deploy-operator");
    println!("  opsflow run deploy-operator --var REGISTRY_TAG=v2 --dry-run");
    println!("  opsflow variables deploy-operator");
}

/// Parses a `KEY=VALUE` override argument.
fn parse_override(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid --var value '{}', expected KEY=VALUE", arg)),
    }
}

/// Parses command-line arguments into a Config struct.
fn parse_arguments(args: &[String]) -> Result<Config, String> {
    let mut action: Option<Action> = None;
    let mut pending_workflow: Option<fn(String) -> Action> = None;
    let mut project_root = PathBuf::from(".");
    let mut overrides = VariableMap::new();
    let mut dry_run = false;
    let mut report_path = None;
    let mut verbose = false;

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
            "--dry-run" => {
                dry_run = true;
            }
            "--verbose" | "-v" => {
                verbose = true;
            }
            "--var" => {
                i += 1;
                if i >= args.len() {
                    return Err("--var requires a KEY=VALUE argument".to_string());
                }
                let (key, value) = parse_override(&args[i])?;
                overrides.insert(key, value);
            }
            "--report" => {
                i += 1;
                if i >= args.len() {
                    return Err("--report requires a path argument".to_string());
                }
                report_path = Some(PathBuf::from(&args[i]));
            }
            "--project-root" => {
                i += 1;
                if i >= args.len() {
                    return Err("--project-root requires a path argument".to_string());
                }
                project_root = PathBuf::from(&args[i]);
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            "run" if action.is_none() && pending_workflow.is_none() => {
                pending_workflow = Some(Action::Run);
            }
            "variables" if action.is_none() && pending_workflow.is_none() => {
                pending_workflow = Some(Action::Variables);
            }
            "list" if action.is_none() && pending_workflow.is_none() => {
                action = Some(Action::List);
            }
            _ => match pending_workflow.take() {
                Some(make) => action = Some(make(arg.clone())),
                None => return Err(format!("Unexpected argument: {}", arg)),
            },
        }
        i += 1;
    }

    if pending_workflow.is_some() {
        return Err("Missing workflow name".to_string());
    }

    let action = action.ok_or_else(|| "No command specified".to_string())?;

    Ok(Config {
        action,
        project_root,
        overrides,
        dry_run,
        report_path,
        verbose,
    })
}

/// Prints the per-step summary of a finished run.
fn print_report(report: &opsflow::ExecutionReport) {
    println!();
    for record in &report.records {
        let marker = match &record.outcome {
            StepOutcome::Succeeded => "✓".green(),
            StepOutcome::Failed(_) => "✗".red(),
            StepOutcome::Skipped => "-".dimmed(),
        };
        println!(
            "  {} [{}] {} ({} ms)",
            marker, record.source, record.name, record.duration_ms
        );
    }
    println!();

    if report.success {
        println!(
            "{}",
            format!("Workflow '{}' completed successfully", report.workflow).green()
        );
    } else {
        println!(
            "{}",
            format!(
                "Workflow '{}' failed at step '{}'",
                report.workflow,
                report.failed_step.as_deref().unwrap_or("?")
            )
            .red()
        );
    }
}

/// Main application entry point.
fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let config = parse_arguments(&args).map_err(|e| {
        eprintln!("Error: {}", e);
        eprintln!();
        print_usage();
        e
    })?;

    setup_logging(config.verbose);

    println!("{} v{}", APP_NAME, VERSION);
    println!();

    let mut engine = WorkflowEngine::new(&config.project_root)?;

    match &config.action {
        Action::List => {
            let names = engine.list_workflows()?;
            if names.is_empty() {
                println!("No workflows found in {:?}", engine.project_root());
            } else {
                println!("Available workflows:");
                for name in names {
                    println!("  {}", name);
                }
            }
        }
        Action::Variables(name) => {
            let vars = engine.preview_variables(name, &config.overrides)?;
            println!("Resolved variables for '{}':", name);
            for (key, value) in &vars {
                println!("  {}: {}", key, value);
            }
        }
        Action::Run(name) => {
            if config.dry_run {
                info!("Mode: DRY RUN (commands will not execute)");
                engine.set_dry_run(true);
            }

            let report = engine.execute_workflow(name, &config.overrides)?;
            print_report(&report);

            if let Some(path) = &config.report_path {
                fs::write(path, serde_json::to_string_pretty(&report)?)?;
                info!("Execution report written to {}", path.display());
            }

            if let Err(e) = report.as_result() {
                error!("{}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
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

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("opsflow")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_parse_run() {
        let config = parse_arguments(&args(&["run", "deploy"])).unwrap();
        assert_eq!(config.action, Action::Run("deploy".to_string()));
        assert!(!config.dry_run);
        assert!(config.overrides.is_empty());
    }

    #[test]
    fn test_parse_run_with_options() {
        let config = parse_arguments(&args(&[
            "run",
            "deploy",
            "--var",
            "TAG=v2",
            "--var",
            "NS=staging",
            "--dry-run",
            "--project-root",
            "/srv/project",
        ]))
        .unwrap();

        assert_eq!(config.action, Action::Run("deploy".to_string()));
        assert!(config.dry_run);
        assert_eq!(config.overrides.get("TAG").unwrap(), "v2");
        assert_eq!(config.overrides.get("NS").unwrap(), "staging");
        assert_eq!(config.project_root, PathBuf::from("/srv/project"));
    }

    #[test]
    fn test_parse_variables_command() {
        let config = parse_arguments(&args(&["variables", "deploy"])).unwrap();
        assert_eq!(config.action, Action::Variables("deploy".to_string()));
    }

    #[test]
    fn test_parse_list() {
        let config = parse_arguments(&args(&["list"])).unwrap();
        assert_eq!(config.action, Action::List);
    }

    #[test]
    fn test_parse_missing_command() {
        assert!(parse_arguments(&args(&[])).is_err());
    }

    #[test]
    fn test_parse_missing_workflow_name() {
        assert!(parse_arguments(&args(&["run"])).is_err());
    }

    #[test]
    fn test_parse_unknown_option() {
        assert!(parse_arguments(&args(&["run", "deploy", "--what"])).is_err());
    }

    #[test]
    fn test_parse_override_valid() {
        assert_eq!(
            parse_override("KEY=VALUE").unwrap(),
            ("KEY".to_string(), "VALUE".to_string())
        );
        // Values may contain '='
        assert_eq!(
            parse_override("KEY=a=b").unwrap(),
            ("KEY".to_string(), "a=b".to_string())
        );
    }

    #[test]
    fn test_parse_override_invalid() {
        assert!(parse_override("NOVALUE").is_err());
        assert!(parse_override("=VALUE").is_err());
    }

    #[test]
    fn test_parse_var_requires_argument() {
        assert!(parse_arguments(&args(&["run", "deploy", "--var"])).is_err());
    }
}
