use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dacdoc_pipeline::{Pipeline, PipelineConfig, RunReport};
use dacdoc_protocol::serialize_json_pretty;
use dacdoc_resolver::{CheckEvaluator, StaticEvaluator};
use report::{display_path, render_listing, render_warnings, CheckOutput, CompileOutput};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod report;
mod resources;
mod write;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "dacdoc")]
#[command(about = "Replace check placeholders in README files with status indicators", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ROOT/dacdoc.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON file mapping check ids to pass/fail/stale/unknown; replaces the [checks] commands
    #[arg(long, global = true)]
    results: Option<PathBuf>,

    /// Print a JSON report on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision indicator assets, resolve every anchor and write changed documents
    Compile(RootArgs),

    /// Fail when a compile would change any document or raise any warning
    Check(RootArgs),

    /// Print anchors and malformed markers without evaluating checks
    List(RootArgs),
}

#[derive(Args)]
struct RootArgs {
    /// Documentation tree root
    #[arg(default_value = ".")]
    root: PathBuf,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet || cli.json {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match &cli.command {
        Commands::Compile(args) => run_compile(&cli, &args.root).await?,
        Commands::Check(args) => run_check(&cli, &args.root).await?,
        Commands::List(args) => run_list(&cli, &args.root).await?,
    }

    Ok(())
}

fn load_config(cli: &Cli, root: &Path) -> Result<PipelineConfig> {
    match &cli.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => PipelineConfig::load_for_root(root)
            .with_context(|| format!("Failed to load config for {}", root.display())),
    }
}

async fn build_evaluator(
    cli: &Cli,
    config: &PipelineConfig,
    root: &Path,
) -> Result<Arc<dyn CheckEvaluator>> {
    if let Some(path) = &cli.results {
        let evaluator = StaticEvaluator::load(path)
            .await
            .with_context(|| format!("Failed to load results {}", path.display()))?;
        log::debug!("Loaded {} check outcomes from {}", evaluator.len(), path.display());
        return Ok(Arc::new(evaluator));
    }

    if config.checks.is_empty() {
        log::info!("No check results or [checks] commands configured; anchors render as unknown");
    }
    Ok(Arc::new(config.command_evaluator(root)))
}

async fn run_pipeline(cli: &Cli, root: &Path) -> Result<(PipelineConfig, RunReport)> {
    let config = load_config(cli, root)?;
    let evaluator = build_evaluator(cli, &config, root).await?;
    let pipeline = Pipeline::new(config.clone(), evaluator).context("Invalid configuration")?;
    let report = pipeline
        .run(root)
        .await
        .with_context(|| format!("Failed to scan {}", root.display()))?;
    Ok((config, report))
}

async fn run_compile(cli: &Cli, root: &Path) -> Result<()> {
    let (config, report) = run_pipeline(cli, root).await?;

    let assets =
        resources::provision(&config.resource_path(&report.root), &config.indicators).await?;

    let mut written = Vec::new();
    let mut failed = 0usize;
    for (path, content) in report.changed_outputs() {
        match write::write_atomic(path, content).await {
            Ok(()) => {
                log::info!("Updated {}", display_path(&report.root, path));
                written.push(path.clone());
            }
            Err(err) => {
                log::error!("{err:#}");
                failed += 1;
            }
        }
    }

    let output = CompileOutput::new(&report, &written, &assets);
    if cli.json {
        print_stdout(&format!("{}\n", serialize_json_pretty(&output)?))?;
    } else {
        for path in &output.written {
            print_stdout(&format!("updated {path}\n"))?;
        }
        eprint!("{}", render_warnings(&report.root, &report.warnings));
        print_stdout(&format!(
            "{} documents, {} updated, {} anchors, {} warnings\n",
            output.stats.documents,
            output.written.len(),
            output.stats.anchors,
            output.warnings.len()
        ))?;
    }

    if failed > 0 {
        anyhow::bail!("Failed to write {failed} documents");
    }
    Ok(())
}

async fn run_check(cli: &Cli, root: &Path) -> Result<()> {
    let (_, report) = run_pipeline(cli, root).await?;
    let output = CheckOutput::new(&report);

    if cli.json {
        print_stdout(&format!("{}\n", serialize_json_pretty(&output)?))?;
    } else {
        for path in &output.outdated {
            print_stdout(&format!("outdated {path}\n"))?;
        }
        eprint!("{}", render_warnings(&report.root, &report.warnings));
    }

    if !output.clean {
        if !cli.json {
            eprintln!(
                "Error: {} documents outdated, {} warnings",
                output.outdated.len(),
                output.warnings.len()
            );
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run_list(cli: &Cli, root: &Path) -> Result<()> {
    let config = load_config(cli, root)?;
    let evaluator = Arc::new(StaticEvaluator::new());
    let pipeline = Pipeline::new(config, evaluator).context("Invalid configuration")?;
    let report = pipeline
        .inspect(root)
        .await
        .with_context(|| format!("Failed to scan {}", root.display()))?;

    if cli.json {
        print_stdout(&format!("{}\n", serialize_json_pretty(&report)?))?;
    } else {
        print_stdout(&render_listing(&report))?;
    }
    Ok(())
}
