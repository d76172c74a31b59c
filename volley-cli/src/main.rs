use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use volley_config::{ConfigLoader, LoggingConfig, VolleyConfig};
use volley_control::{FilePlanLoader, PlanLoader, PlanNode, ResolveMode};
use volley_core::Variables;
use volley_execution::{LoggingExecutor, RunSummary, StopSignal, ThreadGroup};
use volley_logging::init_logging_from_config;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::GenerateConfig = cli.command {
        print!("{}", VolleyConfig::generate_sample());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging, cli.log_level.as_deref())?;

    match cli.command {
        Commands::Run {
            plan,
            threads,
            loops,
            seed,
            vars,
            json,
        } => run_command(config, &plan, threads, loops, seed, &vars, json),
        Commands::Validate { plan } => validate_command(config, &plan),
        Commands::GenerateConfig => Ok(()),
    }
}

/// Load configuration from file or use defaults
fn load_config(config_path: Option<&Path>) -> Result<VolleyConfig> {
    let loader = ConfigLoader::new();
    match config_path {
        Some(path) if path.exists() => loader
            .from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        Some(path) => {
            eprintln!(
                "Configuration file not found: {}. Using defaults.",
                path.display()
            );
            loader
                .from_env()
                .context("Failed to load configuration from environment")
        }
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

/// Initialize logging, letting `--log-level` override the configured level
fn init_logging(config: &LoggingConfig, log_level: Option<&str>) -> Result<()> {
    let mut logging = config.clone();
    if let Some(level) = log_level {
        match level.parse() {
            Ok(level) => logging.level = level,
            Err(e) => eprintln!("{}, keeping '{}'", e, logging.level),
        }
    }
    init_logging_from_config(&logging)?;
    debug!(level = %logging.level, format = ?logging.format, "Logging initialized");
    Ok(())
}

fn load_plan(path: &Path) -> Result<PlanNode> {
    FilePlanLoader::new(None)
        .load(&path.to_string_lossy())
        .with_context(|| format!("Failed to load plan {}", path.display()))
}

/// Relative includes resolve against the plan's directory unless configured otherwise
fn default_include_dir(config: &mut VolleyConfig, plan_path: &Path) {
    if config.include.base_dir.is_none() {
        config.include.base_dir = plan_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(PathBuf::from);
    }
}

fn parse_vars(pairs: &[String]) -> Result<Variables> {
    pairs
        .iter()
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.to_string()))
            }
            _ => bail!("Invalid variable '{}', expected NAME=VALUE", pair),
        })
        .collect()
}

fn run_command(
    mut config: VolleyConfig,
    plan_path: &Path,
    threads: Option<usize>,
    loops: Option<i64>,
    seed: Option<u64>,
    vars: &[String],
    json: bool,
) -> Result<()> {
    if let Some(threads) = threads {
        config.threads.num_threads = threads;
    }
    if let Some(loops) = loops {
        config.threads.loops = loops;
    }
    if seed.is_some() {
        config.engine.random_seed = seed;
    }
    default_include_dir(&mut config, plan_path);
    config
        .validate_all()
        .context("Invalid configuration after command line overrides")?;

    let plan = load_plan(plan_path)?;
    let group = ThreadGroup::new(plan, &config).with_variables(parse_vars(vars)?);
    info!(plan = %plan_path.display(), "Running test plan");

    let summary = group
        .run(Arc::new(LoggingExecutor::new()), &StopSignal::new())
        .context("Test run failed")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if summary.failed_users().next().is_some() {
        bail!("{} virtual user(s) stopped on an error", summary.failed_users().count());
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Run {} ({})", summary.run_id, summary.group);
    for warning in &summary.report.warnings {
        println!("  warning: {}", warning);
    }
    for user in &summary.users {
        println!(
            "  {:<24} iterations={:<6} samples={:<8} failures={:<6} {}ms{}",
            user.thread_name,
            user.iterations,
            user.samples,
            user.failures,
            user.duration_ms,
            user.error
                .as_deref()
                .map(|e| format!("  error: {}", e))
                .unwrap_or_default()
        );
    }
    let elapsed = summary.finished_at - summary.started_at;
    println!(
        "Total: {} samples, {} failures in {}ms",
        summary.total_samples(),
        summary.total_failures(),
        elapsed.num_milliseconds()
    );
}

fn validate_command(mut config: VolleyConfig, plan_path: &Path) -> Result<()> {
    default_include_dir(&mut config, plan_path);
    let plan = load_plan(plan_path)?;
    let group = ThreadGroup::new(plan, &config);

    let (compiled, report) = group
        .prepare(ResolveMode::Validating)
        .context("Plan does not compile")?;

    print!("{}", compiled.render_tree());
    for warning in &report.warnings {
        println!("warning: {}", warning);
    }
    for error in &report.errors {
        println!("error: {}", error);
    }

    if !report.errors.is_empty() {
        bail!("Plan has {} error(s)", report.errors.len());
    }
    println!("Plan is valid ({} elements)", compiled.len());
    Ok(())
}
